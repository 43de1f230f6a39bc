//! TLS for explicit FTPS (RFC 4217).
//!
//! One `FtpTls` is built per connection and reused for every data
//! channel, so data connections present the same client config (and its
//! session cache) as the control connection. Servers that require TLS
//! session reuse on the data channel depend on that.

use crate::ftp::error::tls_failed;
use crate::ftp::protocol::{FtpCodec, ReadHalf, WriteHalf};
use filedeck_core::RemoteResult;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{ring, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

/// Connector plus the server name every handshake on this connection uses.
#[derive(Clone)]
pub struct FtpTls {
    connector: TlsConnector,
    server_name: ServerName<'static>,
}

impl FtpTls {
    pub fn new(host: &str, accept_invalid_certs: bool) -> RemoteResult<Self> {
        let provider = Arc::new(ring::default_provider());
        let builder = ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()
            .map_err(|e| tls_failed(format!("TLS setup failed: {}", e)))?;

        let config = if accept_invalid_certs {
            log::warn!("[ftp] certificate verification disabled for {}", host);
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoCertVerifier { provider }))
                .with_no_client_auth()
        } else {
            let mut roots = RootCertStore::empty();
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            builder.with_root_certificates(roots).with_no_client_auth()
        };

        let server_name = ServerName::try_from(host.to_string())
            .map_err(|e| tls_failed(format!("Invalid TLS server name '{}': {}", host, e)))?;

        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
            server_name,
        })
    }

    /// Upgrade a plain control connection after a `234` reply to AUTH TLS.
    pub async fn upgrade(&self, codec: FtpCodec) -> RemoteResult<FtpCodec> {
        let tcp = reunite_plain(codec)?;
        let tls = self
            .connector
            .connect(self.server_name.clone(), tcp)
            .await
            .map_err(|e| tls_failed(format!("TLS handshake failed: {}", e)))?;
        Ok(FtpCodec::from_tls(tls))
    }

    /// Wrap a freshly opened data connection (PROT P).
    pub async fn wrap_data(&self, tcp: TcpStream) -> RemoteResult<TlsStream<TcpStream>> {
        self.connector
            .connect(self.server_name.clone(), tcp)
            .await
            .map_err(|e| tls_failed(format!("Data channel TLS handshake failed: {}", e)))
    }
}

/// Reunite the read + write halves back into a `TcpStream`.
fn reunite_plain(codec: FtpCodec) -> RemoteResult<TcpStream> {
    match (codec.reader, codec.writer) {
        (ReadHalf::Plain(rd), WriteHalf::Plain(wr)) => rd
            .into_inner()
            .reunite(wr)
            .map_err(|e| tls_failed(format!("Cannot upgrade control channel: {}", e))),
        _ => Err(tls_failed("Control channel is already TLS")),
    }
}

// ─── NoCertVerifier (acceptInvalidCerts) ─────────────────────────────

/// Accepts any certificate but still checks handshake signatures.
#[derive(Debug)]
struct NoCertVerifier {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for NoCertVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
