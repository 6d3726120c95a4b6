//! Opening the TCP connection and, when configured, the TLS layer.

use cabal_proto::Transport;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tracing::{debug, warn};

use crate::error::SessionError;

/// Build a client config trusting the platform's root certificates.
pub fn client_config() -> Result<ClientConfig, SessionError> {
    let mut roots = RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    for cert in native.certs {
        if let Err(e) = roots.add(cert) {
            warn!(error = %e, "failed to add root cert");
        }
    }
    for e in &native.errors {
        warn!(error = %e, "error loading native certs");
    }
    if roots.is_empty() {
        return Err(SessionError::Tls("no usable root certificates".to_string()));
    }

    Ok(ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth())
}

/// Connect to `host:port`, wrapping in TLS when a client config is given.
/// Both handshakes share the `connect_timeout` budget.
pub async fn open_transport(
    host: &str,
    port: u16,
    tls: Option<Arc<ClientConfig>>,
    connect_timeout: Duration,
) -> Result<Transport, SessionError> {
    match timeout(connect_timeout, connect(host, port, tls)).await {
        Ok(result) => result,
        Err(_) => Err(SessionError::Connect(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("connecting to {host}:{port} timed out"),
        ))),
    }
}

async fn connect(
    host: &str,
    port: u16,
    tls: Option<Arc<ClientConfig>>,
) -> Result<Transport, SessionError> {
    let stream = TcpStream::connect((host, port))
        .await
        .map_err(SessionError::Connect)?;
    debug!(host = %host, port, tls = tls.is_some(), "tcp connected");

    let Some(config) = tls else {
        return Ok(Transport::tcp(stream));
    };

    let server_name = ServerName::try_from(host.to_string())
        .map_err(|e| SessionError::Tls(format!("invalid server name {host:?}: {e}")))?;
    let tls_stream = TlsConnector::from(config)
        .connect(server_name, stream)
        .await
        .map_err(SessionError::Connect)?;
    Ok(Transport::client_tls(tls_stream))
}
