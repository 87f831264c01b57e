// src/server/initialization.rs

//! One-time startup: raise the fd limit, load TLS material, bind the
//! transport listener, and assemble the [`SchedulerState`] (§10).

use super::context::ServerContext;
use crate::config::{Config, TlsConfig};
use crate::core::state::SchedulerState;
use crate::transport::adapter::TransportEventSink;
use crate::transport::PeerDirectory;
use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Semaphore};
use tokio_rustls::{rustls, TlsAcceptor};
use tracing::{info, warn};

pub async fn setup(config: Config) -> Result<ServerContext> {
    raise_fd_limit(config.fd_limit);

    let acceptor = setup_tls(&config.tls)?;

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;

    let directory = Arc::new(PeerDirectory::new());
    let controllers = Arc::new(crate::core::registry::ControllerRegistry::new());
    let sink = Arc::new(TransportEventSink::new(directory.clone(), controllers.clone()));
    let state = SchedulerState::new(sink);

    let (shutdown_tx, _) = broadcast::channel(1);

    Ok(ServerContext {
        connection_permits: Arc::new(Semaphore::new(config.max_connections)),
        config,
        state,
        directory,
        listener,
        acceptor,
        shutdown_tx,
    })
}

/// Best-effort `RLIMIT_NOFILE` override (§10). Failure is logged, never fatal
/// — a scheduler that can't raise its limit still runs, just with fewer
/// concurrently acceptable connections.
fn raise_fd_limit(requested: Option<u64>) {
    let Some(limit) = requested else { return };

    #[cfg(unix)]
    {
        use nix::sys::resource::{setrlimit, Resource};
        match setrlimit(Resource::RLIMIT_NOFILE, limit, limit) {
            Ok(()) => info!(limit, "raised RLIMIT_NOFILE"),
            Err(e) => warn!(limit, "failed to raise RLIMIT_NOFILE: {e}"),
        }
    }

    #[cfg(not(unix))]
    {
        warn!(limit, "fd_limit override is only supported on Unix; ignoring");
    }
}

/// Builds a `TlsAcceptor` when both `cert_path` and `ca_path` are configured
/// (§10); otherwise the listener runs in plaintext, development-only mode.
fn setup_tls(tls: &TlsConfig) -> Result<Option<TlsAcceptor>> {
    if !tls.is_enabled() {
        warn!("TLS is not configured; the transport listener will accept plaintext connections");
        return Ok(None);
    }

    let cert_path = tls.cert_path.as_deref().expect("checked by is_enabled");
    let ca_path = tls.ca_path.as_deref().expect("checked by is_enabled");
    let key_path = tls
        .key_path
        .as_deref()
        .ok_or_else(|| anyhow!("tls.key_path must be set alongside tls.cert_path"))?;

    let certs = load_certs(cert_path)?;
    let key = load_key(key_path)?;
    let client_verifier = build_client_verifier(ca_path)?;

    let server_config = rustls::ServerConfig::builder()
        .with_client_cert_verifier(client_verifier)
        .with_single_cert(certs, key)
        .context("failed to build TLS server config")?;

    info!(
        cert = cert_path,
        cacert = ca_path,
        "TLS enabled for the transport listener (mutual auth required)"
    );
    Ok(Some(TlsAcceptor::from(Arc::new(server_config))))
}

fn load_certs(path: &str) -> Result<Vec<rustls::pki_types::CertificateDer<'static>>> {
    let file = File::open(path).with_context(|| format!("failed to open cert file '{path}'"))?;
    let mut reader = BufReader::new(file);
    let certs = rustls_pemfile::certs(&mut reader).collect::<Result<Vec<_>, _>>()?;
    if certs.is_empty() {
        return Err(anyhow!("no certificates found in '{path}'"));
    }
    Ok(certs)
}

fn load_key(path: &str) -> Result<rustls::pki_types::PrivateKeyDer<'static>> {
    let file = File::open(path).with_context(|| format!("failed to open key file '{path}'"))?;
    let mut reader = BufReader::new(file);
    rustls_pemfile::private_key(&mut reader)?
        .ok_or_else(|| anyhow!("no private key found in '{path}'"))
}

/// Builds a client-certificate verifier from the CA bundle at `ca_path`, so
/// every accepted connection must present a cert signed by the cluster's own
/// CA before the adapter ever sees a `Connect` frame (§1, "TLS-authenticated,
/// role-tagged" transport).
fn build_client_verifier(
    ca_path: &str,
) -> Result<Arc<dyn rustls::server::danger::ClientCertVerifier>> {
    let file = File::open(ca_path)
        .with_context(|| format!("failed to open CA bundle '{ca_path}'"))?;
    let mut reader = BufReader::new(file);

    let mut roots = rustls::RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut reader) {
        roots.add(cert?).context("invalid CA certificate")?;
    }
    if roots.is_empty() {
        return Err(anyhow!("no CA certificates found in '{ca_path}'"));
    }

    rustls::server::WebPkiClientVerifier::builder(Arc::new(roots))
        .build()
        .context("failed to build client certificate verifier")
}
