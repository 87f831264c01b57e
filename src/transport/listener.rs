// src/transport/listener.rs

//! The accept loop and plaintext/TLS stream abstraction (§1, "underlying
//! secure message transport... out of scope" — this is that collaborator).
//! Accepted connections are handed to [`crate::transport::peer::handle_connection`]
//! without the core ever seeing a raw socket.

use crate::core::state::SchedulerState;
use crate::transport::peer;
use crate::transport::PeerDirectory;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, Semaphore};
use tokio_rustls::server::TlsStream;
use tokio_rustls::TlsAcceptor;
use tracing::{error, info, warn};

/// Wraps a plaintext or TLS-terminated stream behind one `AsyncRead +
/// AsyncWrite` type so [`peer::handle_connection`] stays generic over both
/// without needing its own branch per transport kind.
pub enum AnyStream {
    Tcp(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for AnyStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            AnyStream::Tcp(s) => Pin::new(s).poll_read(cx, buf),
            AnyStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for AnyStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            AnyStream::Tcp(s) => Pin::new(s).poll_write(cx, buf),
            AnyStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            AnyStream::Tcp(s) => Pin::new(s).poll_flush(cx),
            AnyStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            AnyStream::Tcp(s) => Pin::new(s).poll_shutdown(cx),
            AnyStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Accepts connections off `tcp` until `shutdown_tx` fires, handing each one
/// (TLS-terminated first, if `acceptor` is set) to its own connection task.
/// `max_connections` bounds concurrently accepted peers (§10); a permit is
/// held for the lifetime of the spawned task, not just the handshake.
pub async fn serve(
    tcp: TcpListener,
    acceptor: Option<TlsAcceptor>,
    state: Arc<SchedulerState>,
    directory: Arc<PeerDirectory>,
    max_connections: Arc<Semaphore>,
    shutdown_tx: broadcast::Sender<()>,
) {
    let mut shutdown_rx = shutdown_tx.subscribe();

    loop {
        tokio::select! {
            biased;

            _ = shutdown_rx.recv() => {
                info!("transport listener shutting down");
                break;
            }

            accepted = tcp.accept() => {
                let (socket, addr) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!("failed to accept connection: {e}");
                        continue;
                    }
                };

                let Ok(permit) = max_connections.clone().try_acquire_owned() else {
                    warn!(%addr, "max_connections reached; dropping new connection");
                    continue;
                };

                let state = state.clone();
                let directory = directory.clone();
                let conn_shutdown_rx = shutdown_tx.subscribe();
                let acceptor = acceptor.clone();

                tokio::spawn(async move {
                    let _permit = permit;
                    match acceptor {
                        Some(acceptor) => match acceptor.accept(socket).await {
                            Ok(tls_stream) => {
                                let stream = AnyStream::Tls(Box::new(tls_stream));
                                peer::handle_connection(stream, addr, state, directory, conn_shutdown_rx)
                                    .await;
                            }
                            Err(e) => warn!(%addr, "TLS handshake failed: {e}"),
                        },
                        None => {
                            let stream = AnyStream::Tcp(socket);
                            peer::handle_connection(stream, addr, state, directory, conn_shutdown_rx)
                                .await;
                        }
                    }
                });
            }
        }
    }
}
