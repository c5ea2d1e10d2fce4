//! TLS for the inbound listener.
//!
//! The messaging platform only delivers webhooks over HTTPS, so a relay that
//! is not behind a terminating proxy needs its own certificate.

use axum_server::tls_rustls::RustlsConfig;
use std::io;
use std::path::Path;

use crate::config::TlsConfig;

/// Load the listener certificate chain and private key (PEM).
pub async fn load_tls_config(tls: &TlsConfig) -> Result<RustlsConfig, io::Error> {
    let cert_path = Path::new(&tls.cert_path);
    let key_path = Path::new(&tls.key_path);

    for (what, path) in [("Certificate", cert_path), ("Private key", key_path)] {
        if !path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} file not found: {:?}", what, path),
            ));
        }
    }

    RustlsConfig::from_pem_file(cert_path, key_path).await
}
