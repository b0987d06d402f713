//! Frame Codec
//!
//! One JSON object per line, UTF-8, capped at `MAX_FRAME_LEN`.

use crate::error::IpcError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest accepted frame, newline included
pub const MAX_FRAME_LEN: usize = 4 * 1024 * 1024;

/// Read the next frame.
///
/// Returns `Ok(None)` on a clean end of stream between frames. Not cancel
/// safe: callers that need `select!` read from a dedicated task.
///
/// # Errors
/// - `IpcError::FrameTooLarge` if no newline appears within the limit
/// - `IpcError::Truncated` if the stream ends inside a frame
/// - `IpcError::Codec` if the line is not a valid message
pub async fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>, IpcError>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    let mut line = String::new();
    let n = (&mut *reader)
        .take(MAX_FRAME_LEN as u64)
        .read_line(&mut line)
        .await?;
    if n == 0 {
        return Ok(None);
    }
    if !line.ends_with('\n') {
        if n >= MAX_FRAME_LEN {
            return Err(IpcError::FrameTooLarge {
                limit: MAX_FRAME_LEN,
            });
        }
        return Err(IpcError::Truncated);
    }
    Ok(Some(serde_json::from_str(line.trim_end())?))
}

/// Write one frame and flush it
pub async fn write_frame<W, T>(writer: &mut W, message: &T) -> Result<(), IpcError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut buf = serde_json::to_vec(message)?;
    buf.push(b'\n');
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}
