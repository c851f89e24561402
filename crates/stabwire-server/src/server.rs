//! TCP listener: one task per connection, one request at a time per connection.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use stabwire_proto::frame::{read_frame, write_frame};
use stabwire_proto::{FrameError, Handler, Response};

use crate::config::{Config, ServerConfig};
use crate::dispatcher::Dispatcher;
use crate::error::Result;

/// A bound listener ready to serve.
pub struct Server {
    listener: TcpListener,
    dispatcher: Dispatcher,
    config: ServerConfig,
}

impl Server {
    /// Bind the configured address with a fresh registry.
    pub async fn bind(config: &Config) -> Result<Self> {
        let dispatcher = Dispatcher::new(config.engine.clone());
        Self::bind_with(config, dispatcher).await
    }

    /// Bind the configured address, serving through `dispatcher`.
    pub async fn bind_with(config: &Config, dispatcher: Dispatcher) -> Result<Self> {
        let addr = config.socket_address()?;
        let listener = TcpListener::bind(addr).await?;
        info!("stabwire server listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            dispatcher,
            config: config.server.clone(),
        })
    }

    /// Actual bound address (useful when binding port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Serve until the process ends.
    pub async fn serve(self) -> Result<()> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Serve until `shutdown` resolves, then let open connections finish
    /// their current request for up to the configured shutdown timeout.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let slots = Arc::new(Semaphore::new(self.config.max_connections));
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!(error = %e, "accept failed");
                            continue;
                        }
                    };
                    let Ok(permit) = slots.clone().try_acquire_owned() else {
                        warn!(%peer, max = self.config.max_connections, "connection limit reached, refusing");
                        continue;
                    };

                    debug!(%peer, "connection opened");
                    let dispatcher = self.dispatcher.clone();
                    let limit = self.config.max_message_size_bytes;
                    let stop = stop_rx.clone();
                    connections.spawn(async move {
                        let _permit = permit;
                        match serve_connection(stream, &dispatcher, limit, stop).await {
                            Ok(()) => debug!(%peer, "connection closed"),
                            Err(e) => debug!(%peer, error = %e, "connection dropped"),
                        }
                    });
                }
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        info!(open = connections.len(), "shutting down");
        let _ = stop_tx.send(true);
        let grace = Duration::from_secs(self.config.shutdown_timeout_seconds);
        let drained = tokio::time::timeout(grace, async {
            while connections.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(open = connections.len(), "shutdown timeout, aborting connections");
            connections.abort_all();
        }
        info!("stabwire server stopped");
        Ok(())
    }
}

/// Serve one connection in strict lock-step until the peer hangs up.
async fn serve_connection(
    stream: TcpStream,
    dispatcher: &Dispatcher,
    limit: usize,
    mut stop: watch::Receiver<bool>,
) -> std::result::Result<(), FrameError> {
    stream.set_nodelay(true)?;
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    loop {
        let frame = tokio::select! {
            frame = read_frame(&mut reader, limit) => frame,
            _ = stop.changed() => return Ok(()),
        };

        let reply = match frame {
            Ok(Some(request)) => dispatcher.handle(&request).await,
            Ok(None) => return Ok(()),
            Err(FrameError::TooLarge { limit }) => {
                warn!(limit, "oversized request rejected");
                Response::failure(format!("Request exceeds {limit} bytes")).encode()
            }
            Err(e) => return Err(e),
        };
        write_frame(&mut write_half, &reply).await?;
    }
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT"),
        () = terminate => info!("Received SIGTERM"),
    }
}
