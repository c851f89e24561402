//! NUL-delimited message framing over byte streams.
//!
//! JSON text never contains a raw NUL byte, so a single NUL marks the end of
//! each message in both directions.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::FrameError;

/// Message terminator.
pub const TERMINATOR: u8 = 0;

/// Default upper bound on the size of one message.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Body of a framed message, or `None` if the terminator is missing.
pub fn strip_terminator(bytes: &[u8]) -> Option<&[u8]> {
    bytes.strip_suffix(&[TERMINATOR])
}

/// Read one message including its terminator.
///
/// Returns `Ok(None)` on a clean end of stream between messages. A message
/// longer than `limit` is read through its terminator and dropped, so the
/// stream stays aligned on the next message.
pub async fn read_frame<R>(reader: &mut R, limit: usize) -> Result<Option<Vec<u8>>, FrameError>
where
    R: AsyncBufRead + Unpin,
{
    let mut message = Vec::new();
    let mut received = 0usize;

    loop {
        let buf = reader.fill_buf().await?;
        if buf.is_empty() {
            if received == 0 {
                return Ok(None);
            }
            return Err(FrameError::UnexpectedEof { received });
        }

        let (chunk, done) = match buf.iter().position(|b| *b == TERMINATOR) {
            Some(pos) => (&buf[..=pos], true),
            None => (buf, false),
        };
        let consumed = chunk.len();
        received += consumed;
        if received <= limit.saturating_add(1) {
            message.extend_from_slice(chunk);
        }
        reader.consume(consumed);

        if done {
            // The terminator itself does not count against the limit.
            if received > limit.saturating_add(1) {
                return Err(FrameError::TooLarge { limit });
            }
            return Ok(Some(message));
        }
    }
}

/// Write one already-terminated message and flush it.
pub async fn write_frame<W>(writer: &mut W, message: &[u8]) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    debug_assert_eq!(message.last(), Some(&TERMINATOR));
    writer.write_all(message).await?;
    writer.flush().await?;
    Ok(())
}
