//! TLS trust configuration for LDAPS and STARTTLS

use dirq_core::{Error, Result};
use rustls::{Certificate, ClientConfig, RootCertStore};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Build a client config that trusts only the CA certificates in `ca_file`
pub fn client_config(ca_file: &Path) -> Result<Arc<ClientConfig>> {
    let roots = load_root_store(ca_file)?;

    let config = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(Arc::new(config))
}

fn load_root_store(path: &Path) -> Result<RootCertStore> {
    let certs = load_certs(path)?;
    info!("Loaded {} CA certificate(s) from {:?}", certs.len(), path);

    let mut store = RootCertStore::empty();
    for cert in &certs {
        store
            .add(cert)
            .map_err(|e| Error::Tls(format!("Failed to add CA cert: {}", e)))?;
    }
    Ok(store)
}

/// Load certificates from PEM file
fn load_certs(path: &Path) -> Result<Vec<Certificate>> {
    let file = File::open(path).map_err(|e| {
        Error::Tls(format!("Failed to open certificate file {:?}: {}", path, e))
    })?;
    let mut reader = BufReader::new(file);

    let certs: Vec<Certificate> = rustls_pemfile::certs(&mut reader)
        .map_err(|e| Error::Tls(format!("Failed to parse certificates: {}", e)))?
        .into_iter()
        .map(Certificate)
        .collect();

    if certs.is_empty() {
        return Err(Error::Tls(format!("No certificates found in {:?}", path)));
    }

    Ok(certs)
}

#[cfg(test)]
pub(crate) fn test_ca_path() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata/ca.pem")
}
