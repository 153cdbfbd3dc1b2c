//! TLS for PostgreSQL connections and cancel requests.

use crate::config::DatabaseConfig;
use crate::error::{DatabaseError, DbResult};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, ring, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use std::sync::Arc;
use tokio_postgres::{CancelToken, NoTls};
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::warn;

/// Connector used for both pooled connections and cancel requests.
#[derive(Clone)]
pub enum PgTls {
    Disabled,
    Rustls(MakeRustlsConnect),
}

impl PgTls {
    pub fn from_config(config: &DatabaseConfig) -> DbResult<Self> {
        if !config.ssl {
            return Ok(Self::Disabled);
        }
        Ok(Self::Rustls(MakeRustlsConnect::new(client_config(
            config.ssl_reject_unauthorized,
        )?)))
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Rustls(_))
    }

    /// Send a cancel request for the session behind `token`.
    pub async fn cancel(&self, token: &CancelToken) -> Result<(), tokio_postgres::Error> {
        match self {
            Self::Disabled => token.cancel_query(NoTls).await,
            Self::Rustls(connector) => token.cancel_query(connector.clone()).await,
        }
    }
}

fn client_config(verify: bool) -> DbResult<ClientConfig> {
    let provider = Arc::new(ring::default_provider());
    let builder = ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()
        .map_err(|e| DatabaseError::ConnectionFailed(format!("TLS setup failed: {}", e)))?;

    if verify {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        Ok(builder.with_root_certificates(roots).with_no_client_auth())
    } else {
        warn!("TLS enabled without server certificate verification");
        Ok(builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate { provider }))
            .with_no_client_auth())
    }
}

/// Accepts any server certificate but still checks handshake signatures.
#[derive(Debug)]
struct AcceptAnyCertificate {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyCertificate {
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
        verify_tls12_signature(
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
        verify_tls13_signature(
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfigBuilder;

    #[test]
    fn test_disabled_by_default() {
        let tls = PgTls::from_config(&DatabaseConfig::default()).unwrap();
        assert!(!tls.is_enabled());
    }

    #[test]
    fn test_enabled_with_and_without_verification() {
        for verify in [true, false] {
            let config = DatabaseConfigBuilder::new()
                .ssl(true)
                .ssl_reject_unauthorized(verify)
                .build()
                .unwrap();
            assert!(PgTls::from_config(&config).unwrap().is_enabled());
        }
    }

    #[test]
    fn test_unverified_config_keeps_signature_schemes() {
        let provider = Arc::new(ring::default_provider());
        let verifier = AcceptAnyCertificate { provider };
        assert!(!verifier.supported_verify_schemes().is_empty());
    }
}
