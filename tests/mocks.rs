use std::net::TcpStream;
use std::sync::{Arc, Mutex};

use reqwest::multipart::Form;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use server_mocker::matchers::{
    any, body_partial_json, form_field, header, method, path, query_param, query_params,
};
use server_mocker::{html, json, text, MockServer, Request};

#[async_std::test]
async fn new_starts_the_server() {
    // Act
    let mock_server = MockServer::start().await;

    // Assert
    assert!(TcpStream::connect(mock_server.address()).is_ok())
}

#[async_std::test]
async fn returns_404_with_a_description_if_nothing_matches() {
    // Arrange - nothing registered
    let mock_server = MockServer::start().await;

    // Act
    let response = reqwest::get(format!("{}/missing?message=ping", mock_server.uri()))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), 404);
    let body = response.text().await.unwrap();
    assert!(body.starts_with("response not found for request"));
    assert!(body.contains("GET /missing"));
    assert!(body.contains("?message=ping"));
}

#[async_std::test]
async fn simple_route_stub() {
    // Arrange
    let mock_server = MockServer::start().await;
    mock_server
        .stub(method("GET"))
        .and(path("hello"))
        .returns(text("world"));

    // Act
    let response = reqwest::get(format!("{}/hello", mock_server.uri()))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "text/plain");
    assert_eq!(response.text().await.unwrap(), "world");
}

#[async_std::test]
async fn two_route_stubs() {
    // Arrange
    let mock_server = MockServer::start().await;
    mock_server.stub(path("first")).returns(text("aaa"));
    mock_server.stub(path("second")).returns(text("bbb"));

    // Act
    let first = reqwest::get(format!("{}/first", mock_server.uri()))
        .await
        .unwrap();
    let second = reqwest::get(format!("{}/second", mock_server.uri()))
        .await
        .unwrap();

    // Assert
    assert_eq!(first.text().await.unwrap(), "aaa");
    assert_eq!(second.text().await.unwrap(), "bbb");
}

#[async_std::test]
async fn ping_pong_on_query_params() {
    // Arrange
    let mock_server = MockServer::start().await;
    mock_server
        .stub(query_param("message", "ping"))
        .returns(text("pong"));

    // Act
    let body = reqwest::get(format!("{}?message=ping", mock_server.uri()))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    // Assert
    assert_eq!(body, "pong");
}

#[async_std::test]
async fn the_last_query_param_occurrence_wins() {
    // Arrange
    let mock_server = MockServer::start().await;
    mock_server
        .stub(query_params([("a", "2"), ("b", "x")]))
        .returns(text("matched"));

    // Act
    let status = reqwest::get(format!("{}?a=1&b=x&a=2", mock_server.uri()))
        .await
        .unwrap()
        .status();

    // Assert
    assert_eq!(status, 200);
}

#[async_std::test]
async fn json_and_html_builders_set_their_content_type() {
    #[derive(Deserialize, Debug, PartialEq)]
    struct User {
        name: String,
    }

    // Arrange
    let mock_server = MockServer::start().await;
    mock_server
        .stub(path("/user"))
        .returns(json(&json!({"name": "Jane"})));
    mock_server
        .stub(path("/page"))
        .returns(html("<h1>hi</h1>").insert_header("X-Extra", "1"));

    // Act
    let user = reqwest::get(format!("{}/user", mock_server.uri()))
        .await
        .unwrap();
    let page = reqwest::get(format!("{}/page", mock_server.uri()))
        .await
        .unwrap();

    // Assert
    assert_eq!(user.headers()["content-type"], "application/json");
    assert_eq!(
        user.json::<User>().await.unwrap(),
        User {
            name: "Jane".into()
        }
    );
    assert_eq!(page.headers()["content-type"], "text/html");
    assert_eq!(page.headers()["x-extra"], "1");
    assert_eq!(page.text().await.unwrap(), "<h1>hi</h1>");
}

#[async_std::test]
async fn custom_status_and_headers_override_the_defaults() {
    // Arrange
    let mock_server = MockServer::start().await;
    mock_server.stub(any()).returns(
        text("created")
            .with_status(201)
            .insert_header("Content-Type", "text/csv"),
    );

    // Act
    let response = reqwest::get(mock_server.uri()).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()["content-type"], "text/csv");
}

#[async_std::test]
async fn the_most_recent_registration_wins_and_clearing_uncovers_the_previous_one() {
    // Arrange
    let mock_server = MockServer::start().await;
    mock_server.stub(method("GET")).returns(text("stub1"));
    let stub2 = mock_server.stub(method("GET")).returns(text("stub2"));

    // Act
    let before = reqwest::get(mock_server.uri())
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    stub2.clear();
    let after = reqwest::get(mock_server.uri())
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    // Assert
    assert_eq!(before, "stub2");
    assert_eq!(after, "stub1");
}

#[async_std::test]
async fn mock_guards_count_the_requests_they_answered() {
    // Arrange
    let mock_server = MockServer::start().await;
    let ping = mock_server
        .mock(query_param("message", "ping"))
        .returns(text("pong"));
    let other = mock_server
        .mock(query_param("message", "other"))
        .returns(text("other"));

    // Act
    reqwest::get(format!("{}?message=ping", mock_server.uri()))
        .await
        .unwrap();

    // Assert
    assert!(ping.called());
    assert!(ping.called_once());
    assert_eq!(ping.call_count(), 1);
    assert!(!other.called());

    // Act
    reqwest::get(format!("{}?message=ping", mock_server.uri()))
        .await
        .unwrap();

    // Assert
    assert!(!ping.called_once());
    assert_eq!(ping.call_count(), 2);
}

#[async_std::test]
async fn request_log_keeps_every_request_in_arrival_order() {
    // Arrange
    let mock_server = MockServer::builder()
        .on_response_not_found(|_| {})
        .start()
        .await;
    mock_server.stub(path("/known")).returns(text("ok"));

    // Act
    reqwest::get(format!("{}/known", mock_server.uri()))
        .await
        .unwrap();
    reqwest::get(format!("{}/unknown", mock_server.uri()))
        .await
        .unwrap();

    // Assert
    let paths: Vec<String> = mock_server
        .requests()
        .into_iter()
        .map(|request| request.url_path)
        .collect();
    assert_eq!(paths, vec!["/known", "/unknown"]);

    // Act
    mock_server.clear_all();

    // Assert
    assert!(mock_server.requests().is_empty());
}

#[async_std::test]
async fn not_found_handler_receives_the_unmatched_request() {
    // Arrange
    let unmatched: Arc<Mutex<Vec<Request>>> = Arc::new(Mutex::new(Vec::new()));
    let recorder = unmatched.clone();
    let mock_server = MockServer::builder()
        .on_response_not_found(move |request| recorder.lock().unwrap().push(request.clone()))
        .start()
        .await;

    // Act
    let response = reqwest::get(format!("{}/nowhere?message=hi", mock_server.uri()))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), 404);
    assert!(response.text().await.unwrap().is_empty());
    let unmatched = unmatched.lock().unwrap();
    assert_eq!(unmatched.len(), 1);
    assert_eq!(unmatched[0].url_path, "/nowhere");
    assert_eq!(unmatched[0].url_param("message"), Some("hi"));
}

#[async_std::test]
async fn mock_implementation_computes_the_response() {
    // Arrange
    let mock_server = MockServer::start().await;
    mock_server.mock_implementation(path("/echo"), |request: &Request| {
        text(request.url_param("message").unwrap_or_default())
    });

    // Act
    let body = reqwest::get(format!("{}/echo?message=hello", mock_server.uri()))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    // Assert
    assert_eq!(body, "hello");
}

#[async_std::test]
async fn urlencoded_bodies_are_exposed_as_form_fields() {
    // Arrange
    let mock_server = MockServer::start().await;
    let submit = mock_server
        .mock(method("POST"))
        .and(form_field("test1", "1"))
        .and(form_field("test2", "2"))
        .returns(text("ok"));

    // Act
    let status = reqwest::Client::new()
        .post(mock_server.uri())
        .form(&[("test1", "1"), ("test2", "2")])
        .send()
        .await
        .unwrap()
        .status();

    // Assert
    assert_eq!(status, 200);
    let calls = submit.calls();
    let request = &calls[0];
    assert_eq!(request.body, "test1=1&test2=2");
    assert_eq!(request.form_fields.len(), 2);
}

#[async_std::test]
async fn multipart_bodies_are_exposed_as_form_fields() {
    // Arrange
    let mock_server = MockServer::start().await;
    mock_server
        .stub(form_field("title", "hello"))
        .returns(text("uploaded"));
    let form = Form::new().text("title", "hello").part(
        "file",
        reqwest::multipart::Part::bytes(b"content".to_vec()).file_name("a.txt"),
    );

    // Act
    let response = reqwest::Client::new()
        .post(mock_server.uri())
        .multipart(form)
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), 200);
    let requests = mock_server.requests();
    let request = &requests[0];
    assert_eq!(request.form_field("title"), Some("hello"));
    assert_eq!(request.form_field("file"), None);
}

#[async_std::test]
async fn json_bodies_can_be_matched_partially_and_as_fields() {
    // Arrange
    let mock_server = MockServer::start().await;
    mock_server
        .stub(body_partial_json(json!({ "a": 1, "c": { "e": 2 } })))
        .and(form_field("name", "jane"))
        .returns(text("matched"));

    // Act
    let response = reqwest::Client::new()
        .post(mock_server.uri())
        .json(&json!({ "a": 1, "b": 2, "name": "jane", "c": { "d": 1, "e": 2 } }))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
}

#[async_std::test]
async fn malformed_json_is_answered_with_a_500_and_not_logged() {
    // Arrange
    let mock_server = MockServer::start().await;
    let catch_all = mock_server.mock(any()).returns(text("never"));

    // Act
    let response = reqwest::Client::new()
        .post(mock_server.uri())
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.text().await.unwrap().contains("application/json"));
    assert!(!catch_all.called());
    assert!(mock_server.requests().is_empty());
}

#[async_std::test]
async fn a_panicking_predicate_fails_its_request_only() {
    // Arrange
    let mock_server = MockServer::start().await;
    let exploding = mock_server
        .stub(|request: &Request| -> bool {
            if request.url_path == "/explode" {
                panic!("predicate exploded");
            }
            false
        })
        .returns(text("never"));
    mock_server.stub(path("/fine")).returns(text("fine"));

    // Act
    let exploded = reqwest::get(format!("{}/explode", mock_server.uri()))
        .await
        .unwrap();

    // Assert
    assert_eq!(exploded.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(exploded
        .text()
        .await
        .unwrap()
        .contains("predicate exploded"));

    // `/fine` is scanned first: the exploding predicate is not evaluated.
    let fine = reqwest::get(format!("{}/fine", mock_server.uri()))
        .await
        .unwrap();
    assert_eq!(fine.text().await.unwrap(), "fine");

    exploding.clear();
    assert_eq!(mock_server.requests().len(), 2);
}

#[async_std::test]
async fn header_matching_is_case_insensitive_on_the_wire() {
    // Arrange
    let mock_server = MockServer::start().await;
    mock_server
        .stub(header("X-Api-Key", "secret"))
        .returns(text("ok"));

    // Act
    let status = reqwest::Client::new()
        .get(mock_server.uri())
        .header("x-api-key", "secret")
        .send()
        .await
        .unwrap()
        .status();

    // Assert
    assert_eq!(status, 200);
    assert_eq!(
        mock_server.requests()[0].header("X-API-KEY"),
        Some("secret")
    );
}

#[should_panic(expected = "server-mocker can't match the path `abcd?` because it contains a `?`.")]
#[async_std::test]
async fn query_parameter_is_not_accepted_in_path() {
    path("abcd?");
}

#[async_std::test]
async fn http_crate_method_can_be_used_directly() {
    use server_mocker::http::Method;

    // Arrange
    let mock_server = MockServer::start().await;
    mock_server
        .stub(method(Method::GET))
        .and(path("hello"))
        .returns(text("world"));

    // Act
    let response = reqwest::get(format!("{}/hello", mock_server.uri()))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "world");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_requests_are_all_recorded() {
    // Arrange
    const REQUESTS: usize = 200;
    let mock_server = MockServer::start().await;
    let catch_all = mock_server.mock(any()).returns(text("ok"));
    let client = reqwest::Client::new();

    // Act
    let mut in_flight = tokio::task::JoinSet::new();
    for i in 0..REQUESTS {
        let client = client.clone();
        let url = format!("{}/item/{}", mock_server.uri(), i);
        in_flight.spawn(async move { client.get(url).send().await.unwrap().status() });
    }
    let mut statuses = Vec::with_capacity(REQUESTS);
    while let Some(status) = in_flight.join_next().await {
        statuses.push(status.unwrap());
    }

    // Assert
    assert!(statuses.iter().all(|status| *status == StatusCode::OK));
    assert_eq!(statuses.len(), REQUESTS);
    assert_eq!(mock_server.requests().len(), REQUESTS);
    assert_eq!(catch_all.call_count(), REQUESTS);
}
