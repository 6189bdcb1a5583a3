//! Turn what the transport received into the canonical [`Request`] the registry matches on.
use std::collections::HashMap;
use std::convert::Infallible;

use futures::stream;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, Method, Uri};
use hyper::body::Bytes;
use serde_json::Value;
use url::form_urlencoded;

use crate::{Error, Request};

const MULTIPART_FORM_DATA: &str = "multipart/form-data";
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const APPLICATION_JSON: &str = "application/json";

/// Build the canonical [`Request`] out of the raw method, URL, headers and body.
///
/// - the query string is decoded into `url_params`; when a key is repeated the last
///   occurrence wins;
/// - header names are lower-cased, repeated headers are joined with `", "`;
/// - `form_fields` depends on the declared content type:
///   - `multipart/form-data`: every non-file part, by name;
///   - `application/x-www-form-urlencoded`: every decoded pair, last occurrence wins;
///   - `application/json`: the scalar members of a top-level object;
///   - anything else: empty.
///
/// The raw body is always kept, as text, in `body`.
///
/// A multipart or JSON body that cannot be parsed yields [`Error::BodyParse`]: the server
/// answers it with a `500` without involving the registry.
pub async fn normalize(
    method: Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Request, Error> {
    let url_params = uri
        .query()
        .map(|query| parse_pairs(query.as_bytes()))
        .unwrap_or_default();

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let form_fields = match essence(content_type).as_str() {
        MULTIPART_FORM_DATA => parse_multipart(content_type, body.clone()).await?,
        FORM_URLENCODED => parse_pairs(&body),
        APPLICATION_JSON => parse_json_fields(&body)?,
        _ => HashMap::new(),
    };

    Ok(Request {
        method,
        url_path: uri.path().to_string(),
        url_params,
        form_fields,
        headers: flatten_headers(headers),
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

/// The `type/subtype` part of a content type, lower-cased and without parameters.
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn parse_pairs(input: &[u8]) -> HashMap<String, String> {
    form_urlencoded::parse(input).into_owned().collect()
}

fn flatten_headers(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .keys()
        .map(|name| {
            let values = headers
                .get_all(name)
                .iter()
                .map(|value| String::from_utf8_lossy(value.as_bytes()))
                .collect::<Vec<_>>();
            (name.as_str().to_string(), values.join(", "))
        })
        .collect()
}

async fn parse_multipart(
    content_type: &str,
    body: Bytes,
) -> Result<HashMap<String, String>, Error> {
    let boundary = multer::parse_boundary(content_type)
        .map_err(|e| Error::body_parse(MULTIPART_FORM_DATA, e))?;
    let mut multipart = multer::Multipart::new(
        stream::once(async move { Ok::<_, Infallible>(body) }),
        boundary,
    );

    let mut fields = HashMap::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::body_parse(MULTIPART_FORM_DATA, e))?
    {
        // Uploaded files are not part of the matching surface.
        if field.file_name().is_some() {
            continue;
        }
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        let value = field
            .text()
            .await
            .map_err(|e| Error::body_parse(MULTIPART_FORM_DATA, e))?;
        fields.insert(name, value);
    }
    Ok(fields)
}

fn parse_json_fields(body: &[u8]) -> Result<HashMap<String, String>, Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(HashMap::new());
    }
    let value: Value =
        serde_json::from_slice(body).map_err(|e| Error::body_parse(APPLICATION_JSON, e))?;

    let Value::Object(members) = value else {
        return Ok(HashMap::new());
    };
    Ok(members
        .into_iter()
        .filter_map(|(name, value)| match value {
            Value::String(s) => Some((name, s)),
            Value::Number(n) => Some((name, n.to_string())),
            Value::Bool(b) => Some((name, b.to_string())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        })
        .collect())
}
