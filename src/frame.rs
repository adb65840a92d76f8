//! Length-prefixed wire framing
//!
//! Every frame is a 10-byte ASCII decimal length header (left-justified,
//! space-padded) followed by exactly that many payload bytes.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::FrameError;

/// Width of the length header in bytes
pub const HEADER_LENGTH: usize = 10;

/// Largest payload length expressible in the header
pub const MAX_ENCODABLE_LEN: u64 = 9_999_999_999;

/// Encode a payload into a complete frame
pub fn encode(payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    let len = payload.len() as u64;
    if len > MAX_ENCODABLE_LEN {
        return Err(FrameError::FrameTooLarge {
            len,
            limit: MAX_ENCODABLE_LEN,
        });
    }

    let mut frame = Vec::with_capacity(HEADER_LENGTH + payload.len());
    frame.extend_from_slice(format!("{:<width$}", len, width = HEADER_LENGTH).as_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Parse a length header
///
/// Surrounding whitespace is trimmed; what remains must be plain digits.
pub fn decode_header(header: &[u8; HEADER_LENGTH]) -> Result<u64, FrameError> {
    let malformed = || FrameError::MalformedHeader(String::from_utf8_lossy(header).into_owned());

    let text = std::str::from_utf8(header).map_err(|_| malformed())?;
    let digits = text.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    digits.parse().map_err(|_| malformed())
}

/// Read one frame
///
/// Returns `Ok(None)` when the peer closed the stream cleanly at a frame
/// boundary. Payloads longer than `max_len` are refused before allocating.
pub async fn read_frame<R>(reader: &mut R, max_len: u64) -> Result<Option<Vec<u8>>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LENGTH];
    let mut filled = 0;
    while filled < HEADER_LENGTH {
        let n = reader.read(&mut header[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(FrameError::Io(std::io::ErrorKind::UnexpectedEof.into()));
        }
        filled += n;
    }

    let len = decode_header(&header)?;
    if len > max_len {
        return Err(FrameError::FrameTooLarge { len, limit: max_len });
    }

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

/// Encode and write one frame
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode(payload)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}
