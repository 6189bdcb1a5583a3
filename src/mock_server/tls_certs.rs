//! Throw-away certificates to serve HTTPS from a [`MockServer`](crate::MockServer).
//!
//! ```rust
//! use server_mocker::tls_certs::MockTlsCertificates;
//! use server_mocker::{text, MockServer};
//! use server_mocker::matchers::path;
//!
//! #[async_std::main]
//! async fn main() {
//!     // Arrange
//!     let certificates = MockTlsCertificates::random();
//!     let mock_server = MockServer::builder()
//!         .tls(certificates.server_config().unwrap())
//!         .start()
//!         .await;
//!     mock_server.stub(path("/hello")).returns(text("world"));
//!
//!     let root = reqwest::Certificate::from_der(certificates.root_cert_der()).unwrap();
//!     let client = reqwest::Client::builder()
//!         .add_root_certificate(root)
//!         .build()
//!         .unwrap();
//!
//!     // Act
//!     let body = client
//!         .get(format!("{}/hello", mock_server.uri()))
//!         .send()
//!         .await
//!         .unwrap()
//!         .text()
//!         .await
//!         .unwrap();
//!
//!     // Assert
//!     assert!(mock_server.uri().starts_with("https://"));
//!     assert_eq!(body, "world");
//! }
//! ```
use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DistinguishedName, DnType,
    ExtendedKeyUsagePurpose, IsCa, KeyPair, KeyUsagePurpose, SanType, SerialNumber,
    SignatureAlgorithm, PKCS_ED25519,
};
use rustls_pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio_rustls::rustls::{self, ServerConfig};

const ALGORITHM: &SignatureAlgorithm = &PKCS_ED25519;

const ISSUER_KEY_USAGES: &[KeyUsagePurpose; 3] = &[
    KeyUsagePurpose::CrlSign,
    KeyUsagePurpose::KeyCertSign,
    KeyUsagePurpose::DigitalSignature,
];

const SERVER_KEY_USAGES: &[KeyUsagePurpose; 2] = &[
    KeyUsagePurpose::DigitalSignature,
    KeyUsagePurpose::KeyEncipherment,
];

static SERIAL_NUMBER: AtomicU64 = AtomicU64::new(1);

/// A root CA and a server certificate it signed, valid for `localhost` and `127.0.0.1`.
///
/// Trust [`root_cert_der`](MockTlsCertificates::root_cert_der) in your client and pass
/// [`server_config`](MockTlsCertificates::server_config) to
/// [`MockServerBuilder::tls`](crate::MockServerBuilder::tls).
pub struct MockTlsCertificates {
    root_cert: Certificate,
    server_cert: Certificate,
    server_keypair: KeyPair,
}

impl MockTlsCertificates {
    /// Generate a fresh set of certificates. Panics if `rcgen` fails, which only happens on
    /// a broken crypto backend.
    pub fn random() -> Self {
        Self::try_random().expect("Failed to generate test certificates")
    }

    /// Fallible twin of [`random`](MockTlsCertificates::random).
    pub fn try_random() -> Result<Self, rcgen::Error> {
        let (root_cert, root_keypair) = root_cert()?;
        let (server_cert, server_keypair) = server_cert(&root_cert, &root_keypair)?;
        Ok(Self {
            root_cert,
            server_cert,
            server_keypair,
        })
    }

    /// The root CA certificate, DER-encoded: the one your client should trust.
    pub fn root_cert_der(&self) -> &[u8] {
        self.root_cert.der()
    }

    /// The server certificate, DER-encoded.
    pub fn server_cert_der(&self) -> CertificateDer<'static> {
        self.server_cert.der().clone()
    }

    /// The server private key, PKCS#8 DER-encoded.
    pub fn server_private_key_der(&self) -> PrivateKeyDer<'static> {
        PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(self.server_keypair.serialize_der()))
    }

    /// A `rustls` server configuration presenting the server certificate, offering HTTP/2 and
    /// HTTP/1.1 through ALPN.
    pub fn server_config(&self) -> Result<Arc<ServerConfig>, rustls::Error> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let mut config = ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .with_no_client_auth()
            .with_single_cert(
                vec![self.server_cert_der()],
                self.server_private_key_der(),
            )?;
        config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
        Ok(Arc::new(config))
    }
}

fn root_cert() -> Result<(Certificate, KeyPair), rcgen::Error> {
    let keypair = KeyPair::generate_for(ALGORITHM)?;
    let serial = SERIAL_NUMBER.fetch_add(1, Ordering::SeqCst);

    let mut params = CertificateParams::default();
    params.distinguished_name = common_name(format!("server-mocker test root CA #{serial}"));
    params.serial_number = Some(SerialNumber::from_slice(&serial.to_be_bytes()[..]));
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = ISSUER_KEY_USAGES.to_vec();

    let cert = params.self_signed(&keypair)?;
    Ok((cert, keypair))
}

fn server_cert(
    signer_cert: &Certificate,
    signer_keypair: &KeyPair,
) -> Result<(Certificate, KeyPair), rcgen::Error> {
    let keypair = KeyPair::generate_for(ALGORITHM)?;
    let serial = SERIAL_NUMBER.fetch_add(1, Ordering::SeqCst);

    let mut params = CertificateParams::new(vec!["localhost".to_string()])?;
    params
        .subject_alt_names
        .push(SanType::IpAddress(IpAddr::V4(Ipv4Addr::LOCALHOST)));
    params.distinguished_name = common_name(format!("server-mocker test server #{serial}"));
    params.use_authority_key_identifier_extension = true;
    params.serial_number = Some(SerialNumber::from_slice(&serial.to_be_bytes()[..]));
    params.is_ca = IsCa::NoCa;
    params.key_usages = SERVER_KEY_USAGES.to_vec();
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];

    let cert = params.signed_by(&keypair, signer_cert, signer_keypair)?;
    Ok((cert, keypair))
}

fn common_name(name: impl Display) -> DistinguishedName {
    let mut distinguished_name = DistinguishedName::new();
    distinguished_name.push(DnType::CommonName, name.to_string());
    distinguished_name
}
