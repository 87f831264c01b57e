// src/server/context.rs

use crate::config::Config;
use crate::core::state::SchedulerState;
use crate::transport::PeerDirectory;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Semaphore};
use tokio_rustls::TlsAcceptor;

/// Everything [`super::run`] needs to start serving, assembled once by
/// [`super::initialization::setup`].
pub struct ServerContext {
    pub config: Config,
    pub state: Arc<SchedulerState>,
    pub directory: Arc<PeerDirectory>,
    pub listener: TcpListener,
    pub acceptor: Option<TlsAcceptor>,
    pub connection_permits: Arc<Semaphore>,
    pub shutdown_tx: broadcast::Sender<()>,
}
