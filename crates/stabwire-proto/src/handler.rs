use async_trait::async_trait;

/// Anything that answers framed requests with framed replies.
///
/// The reference server's dispatcher implements this; in-process transports
/// call it directly instead of going through a socket.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Answer one NUL-terminated request with one NUL-terminated reply.
    ///
    /// Never fails: every problem becomes an `error` reply.
    async fn handle(&self, request: &[u8]) -> Vec<u8>;
}
