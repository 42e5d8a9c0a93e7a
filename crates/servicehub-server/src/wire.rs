//! Length-prefixed binary framing.
//!
//! All integers are big-endian. A string frame is a `u32` byte length
//! followed by that many UTF-8 bytes. Upload payloads are raw bytes,
//! streamed in bounded chunks, with an explicit `u64` length field sent
//! ahead of them.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest accepted string frame.
pub const MAX_STRING_LEN: usize = 16 * 1024 * 1024;

/// Largest accepted upload payload.
pub const MAX_UPLOAD_BYTES: u64 = 64 * 1024 * 1024;

/// Chunk size for payload streaming.
pub const TRANSFER_CHUNK: usize = 8 * 1024;

/// Protocol-level failures. Any of these terminates the session they occur
/// on; none of them touch other sessions or the registry.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the stream in the middle of a frame or payload.
    #[error("stream closed mid-frame")]
    UnexpectedEof,

    #[error("frame of {0} bytes exceeds the limit")]
    FrameTooLarge(usize),

    #[error("frame is not valid UTF-8")]
    InvalidUtf8(#[source] std::string::FromUtf8Error),

    #[error("declared upload size of {0} bytes exceeds the limit")]
    UploadTooLarge(u64),
}

fn map_eof(e: std::io::Error) -> ProtocolError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        ProtocolError::UnexpectedEof
    } else {
        ProtocolError::Io(e)
    }
}

/// Write one string frame.
pub async fn write_string<W>(writer: &mut W, s: &str) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    if s.len() > MAX_STRING_LEN {
        return Err(ProtocolError::FrameTooLarge(s.len()));
    }
    writer.write_u32(s.len() as u32).await?;
    writer.write_all(s.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one string frame.
pub async fn read_string<R>(reader: &mut R) -> Result<String, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let len = reader.read_u32().await.map_err(map_eof)? as usize;
    if len > MAX_STRING_LEN {
        return Err(ProtocolError::FrameTooLarge(len));
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await.map_err(map_eof)?;
    String::from_utf8(buf).map_err(ProtocolError::InvalidUtf8)
}

/// Read one string frame, distinguishing a clean close from a truncated
/// frame.
///
/// Returns `Ok(None)` when the stream is closed before a single byte of the
/// length prefix arrives. An EOF after that point, inside the prefix or the
/// body, is [`ProtocolError::UnexpectedEof`].
pub async fn try_read_string<R>(reader: &mut R) -> Result<Option<String>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < len_buf.len() {
        let n = reader.read(&mut len_buf[filled..]).await.map_err(map_eof)?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(ProtocolError::UnexpectedEof);
        }
        filled += n;
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_STRING_LEN {
        return Err(ProtocolError::FrameTooLarge(len));
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await.map_err(map_eof)?;
    String::from_utf8(buf)
        .map(Some)
        .map_err(ProtocolError::InvalidUtf8)
}

pub async fn write_u32<W: AsyncWrite + Unpin>(writer: &mut W, v: u32) -> Result<(), ProtocolError> {
    writer.write_u32(v).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_u32<R: AsyncRead + Unpin>(reader: &mut R) -> Result<u32, ProtocolError> {
    reader.read_u32().await.map_err(map_eof)
}

pub async fn write_i32<W: AsyncWrite + Unpin>(writer: &mut W, v: i32) -> Result<(), ProtocolError> {
    writer.write_i32(v).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_i32<R: AsyncRead + Unpin>(reader: &mut R) -> Result<i32, ProtocolError> {
    reader.read_i32().await.map_err(map_eof)
}

pub async fn write_u64<W: AsyncWrite + Unpin>(writer: &mut W, v: u64) -> Result<(), ProtocolError> {
    writer.write_u64(v).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_u64<R: AsyncRead + Unpin>(reader: &mut R) -> Result<u64, ProtocolError> {
    reader.read_u64().await.map_err(map_eof)
}

/// Stream exactly `len` payload bytes from `reader` to `writer` in bounded
/// chunks. An early close of `reader` is a transfer failure.
pub async fn copy_exact<R, W>(reader: &mut R, writer: &mut W, len: u64) -> Result<(), ProtocolError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = [0u8; TRANSFER_CHUNK];
    let mut remaining = len;
    while remaining > 0 {
        let n = remaining.min(TRANSFER_CHUNK as u64) as usize;
        reader.read_exact(&mut buf[..n]).await.map_err(map_eof)?;
        writer.write_all(&buf[..n]).await?;
        remaining -= n as u64;
    }
    writer.flush().await?;
    Ok(())
}

/// Write `bytes` as an upload payload, chunked like [`copy_exact`] expects.
pub async fn write_payload<W>(writer: &mut W, bytes: &[u8]) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    for chunk in bytes.chunks(TRANSFER_CHUNK) {
        writer.write_all(chunk).await?;
    }
    writer.flush().await?;
    Ok(())
}
