//! TLS material loading for the HTTPS listener.

use std::sync::Arc;

use rustls::pki_types::{pem::PemObject, CertificateDer, PrivateKeyDer};
use ssecast_core::config::TlsConfig;
use ssecast_core::error::{RelayError, Result};
use tracing::info;

/// Build a rustls server config from the PEM files named in `tls`.
///
/// Unreadable or malformed material is a startup failure; there is no
/// fallback to plain HTTP.
pub fn load_server_config(tls: &TlsConfig) -> Result<Arc<rustls::ServerConfig>> {
    let certs = CertificateDer::pem_file_iter(&tls.cert_path)
        .map_err(|e| RelayError::Tls(format!("cannot read certificate {}: {e}", tls.cert_path)))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| RelayError::Tls(format!("malformed certificate {}: {e}", tls.cert_path)))?;
    if certs.is_empty() {
        return Err(RelayError::Tls(format!(
            "no certificate found in {}",
            tls.cert_path
        )));
    }

    let key = PrivateKeyDer::from_pem_file(&tls.key_path)
        .map_err(|e| RelayError::Tls(format!("cannot read private key {}: {e}", tls.key_path)))?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| RelayError::Tls(e.to_string()))?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| RelayError::Tls(format!("certificate/key mismatch: {e}")))?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    info!(cert = %tls.cert_path, "TLS material loaded");
    Ok(Arc::new(config))
}
