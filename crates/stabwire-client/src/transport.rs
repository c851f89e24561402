//! Channels that carry one framed request and bring back one framed reply.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::{debug, warn};

use stabwire_proto::Handler;
use stabwire_proto::frame::{DEFAULT_MAX_MESSAGE_SIZE, read_frame, write_frame};

use crate::error::TransportError;

/// A lock-step message channel.
///
/// `round_trip` borrows the channel mutably, so a second request cannot be
/// issued until the reply to the first has been received.
#[async_trait]
pub trait Transport: Send {
    /// Deliver one NUL-terminated request and return the reply.
    async fn round_trip(&mut self, request: Vec<u8>) -> Result<Vec<u8>, TransportError>;

    /// Short description for log lines.
    fn describe(&self) -> String;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn round_trip(&mut self, request: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        (**self).round_trip(request).await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// NUL-framed JSON over a TCP stream.
pub struct TcpTransport {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    peer: String,
    timeout: Option<Duration>,
    max_reply: usize,
    poisoned: bool,
}

impl TcpTransport {
    /// Connect to a server. `timeout` bounds both the connect and every
    /// later reply.
    pub async fn connect(
        addr: impl ToSocketAddrs,
        timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        let connecting = TcpStream::connect(addr);
        let stream = match timeout {
            Some(limit) => tokio::time::timeout(limit, connecting)
                .await
                .map_err(|_| TransportError::Timeout(limit))??,
            None => connecting.await?,
        };
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?.to_string();
        debug!(%peer, "connected");

        let (read_half, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer,
            peer,
            timeout,
            max_reply: DEFAULT_MAX_MESSAGE_SIZE,
            poisoned: false,
        })
    }

    /// Refuse replies larger than `bytes`.
    pub fn with_max_reply(mut self, bytes: usize) -> Self {
        self.max_reply = bytes;
        self
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    async fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        write_frame(&mut self.writer, request).await?;
        read_frame(&mut self.reader, self.max_reply)
            .await?
            .ok_or(TransportError::Closed)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn round_trip(&mut self, request: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        if self.poisoned {
            return Err(TransportError::Poisoned);
        }

        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.exchange(&request)).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(limit)),
            },
            None => self.exchange(&request).await,
        };

        if let Err(e) = &outcome {
            warn!(peer = %self.peer, error = %e, "channel poisoned");
            self.poisoned = true;
        }
        outcome
    }

    fn describe(&self) -> String {
        format!("tcp://{}", self.peer)
    }
}

/// Delivers messages straight to an in-process handler.
#[derive(Clone)]
pub struct LoopbackTransport {
    handler: Arc<dyn Handler>,
}

impl LoopbackTransport {
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn round_trip(&mut self, request: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        Ok(self.handler.handle(&request).await)
    }

    fn describe(&self) -> String {
        "loopback".to_string()
    }
}
