//! TCP and TLS transport setup.

use crate::error::{EngineError, Result};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::rustls;
use tokio_rustls::TlsConnector;

/// Anything a Connection can run over.
pub trait IrcStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> IrcStream for T {}

pub type BoxedStream = Box<dyn IrcStream>;

/// Where a Connection points. Kept on the Connection so a reconnect can
/// open an equivalent transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub use_tls: bool,
}

impl ConnectionParams {
    pub fn new(host: impl Into<String>, port: u16, use_tls: bool) -> Self {
        Self {
            host: host.into(),
            port,
            use_tls,
        }
    }
}

/// Open the socket and, if requested, complete the TLS handshake.
pub async fn establish(params: &ConnectionParams, accept_invalid_certs: bool) -> Result<BoxedStream> {
    let mode = if params.use_tls { "TLS" } else { "plain" };
    tracing::debug!("Connecting to {}:{} ({mode})", params.host, params.port);

    let tcp = TcpStream::connect((params.host.as_str(), params.port))
        .await
        .map_err(|source| EngineError::Connect {
            host: params.host.clone(),
            port: params.port,
            source,
        })?;

    if !params.use_tls {
        return Ok(Box::new(tcp));
    }

    let tls_config = if accept_invalid_certs {
        tracing::debug!("TLS: skipping certificate verification for {}", params.host);
        insecure_config()
    } else {
        default_config()
    };
    let connector = TlsConnector::from(Arc::new(tls_config));
    let server_name = rustls::pki_types::ServerName::try_from(params.host.clone())
        .map_err(|_| EngineError::InvalidServerName(params.host.clone()))?;
    let tls = connector
        .connect(server_name, tcp)
        .await
        .map_err(|source| EngineError::Tls {
            host: params.host.clone(),
            source,
        })?;
    tracing::debug!("TLS handshake with {} complete", params.host);
    Ok(Box::new(tls))
}

fn install_crypto_provider() {
    // Fails only when a provider is already installed.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

fn default_config() -> rustls::ClientConfig {
    install_crypto_provider();
    let roots = rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth()
}

fn insecure_config() -> rustls::ClientConfig {
    install_crypto_provider();
    rustls::ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCert))
        .with_no_client_auth()
}

#[derive(Debug)]
struct AcceptAnyCert;

impl rustls::client::danger::ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::CryptoProvider::get_default()
            .map(|p| p.signature_verification_algorithms.supported_schemes())
            .unwrap_or_default()
    }
}
