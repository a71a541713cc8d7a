//! MLLP wire framing
//!
//! The minimal lower layer protocol wraps one message per frame:
//! ```text
//! <0x0B> payload <0x1C><0x0D>
//! ```
//! A frame that does not open with the start byte, or that ends
//! without the two-byte trailer, is malformed and unrecoverable on
//! this connection.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::common::{Error, Result};

/// Start-of-block byte (VT)
pub const START_BLOCK: u8 = 0x0B;
/// End-of-block byte (FS)
pub const END_BLOCK: u8 = 0x1C;
/// Trailer byte following the end-of-block (CR)
pub const CARRIAGE_RETURN: u8 = 0x0D;

// Sanity cap - no conformance response comes near this
const MAX_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Read exactly one MLLP frame and return its payload
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<String> {
    let first = reader.read_u8().await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::Connection("connection closed before a frame was received".to_string())
        } else {
            Error::Io(e)
        }
    })?;

    if first != START_BLOCK {
        return Err(Error::Framing(format!(
            "expected start-of-block 0x0B, got 0x{first:02X}"
        )));
    }

    let mut payload = Vec::new();
    loop {
        let byte = reader.read_u8().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::Framing("connection closed mid-frame".to_string())
            } else {
                Error::Io(e)
            }
        })?;

        if byte == END_BLOCK {
            break;
        }

        if payload.len() >= MAX_FRAME_SIZE {
            return Err(Error::Framing(format!(
                "frame exceeds {MAX_FRAME_SIZE} bytes without an end-of-block"
            )));
        }
        payload.push(byte);
    }

    let trailer = reader.read_u8().await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::Framing("connection closed before the frame trailer".to_string())
        } else {
            Error::Io(e)
        }
    })?;
    if trailer != CARRIAGE_RETURN {
        return Err(Error::Framing(format!(
            "expected trailer 0x0D after end-of-block, got 0x{trailer:02X}"
        )));
    }

    String::from_utf8(payload).map_err(|e| Error::Framing(format!("invalid UTF-8 payload: {e}")))
}

/// Wrap a payload in MLLP framing and write it
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, payload: &str) -> Result<()> {
    if payload.bytes().any(|b| b == START_BLOCK || b == END_BLOCK) {
        return Err(Error::Framing(
            "payload contains MLLP control bytes".to_string(),
        ));
    }

    writer.write_all(&[START_BLOCK]).await?;
    writer.write_all(payload.as_bytes()).await?;
    writer.write_all(&[END_BLOCK, CARRIAGE_RETURN]).await?;
    writer.flush().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn test_read_frame() {
        let data = b"\x0BMSH|^~\\&|A\rMSA|AA|1\x1C\x0D";
        let mut reader = BufReader::new(Cursor::new(data.to_vec()));

        let payload = read_frame(&mut reader).await.unwrap();
        assert_eq!(payload, "MSH|^~\\&|A\rMSA|AA|1");
    }

    #[tokio::test]
    async fn test_write_frame() {
        let mut output = Vec::new();
        write_frame(&mut output, "MSA|AA|1").await.unwrap();
        assert_eq!(output, b"\x0BMSA|AA|1\x1C\x0D");
    }

    #[tokio::test]
    async fn test_round_trip() {
        let mut buf = Vec::new();
        write_frame(&mut buf, "MSH|^~\\&|X").await.unwrap();
        let mut reader = BufReader::new(Cursor::new(buf));
        assert_eq!(read_frame(&mut reader).await.unwrap(), "MSH|^~\\&|X");
    }

    #[tokio::test]
    async fn test_bad_start_byte() {
        let mut reader = BufReader::new(Cursor::new(b"MSA|AA|1\x1C\x0D".to_vec()));
        let err = read_frame(&mut reader).await.unwrap_err();
        assert!(matches!(err, Error::Framing(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_missing_trailer() {
        let mut reader = BufReader::new(Cursor::new(b"\x0BMSA|AA|1\x1CX".to_vec()));
        let err = read_frame(&mut reader).await.unwrap_err();
        assert!(matches!(err, Error::Framing(_)));
    }

    #[tokio::test]
    async fn test_eof_before_frame_is_connection_error() {
        let mut reader = BufReader::new(Cursor::new(Vec::new()));
        let err = read_frame(&mut reader).await.unwrap_err();
        assert!(matches!(err, Error::Connection(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_eof_mid_frame_is_framing_error() {
        let mut reader = BufReader::new(Cursor::new(b"\x0BMSA|AA".to_vec()));
        let err = read_frame(&mut reader).await.unwrap_err();
        assert!(matches!(err, Error::Framing(_)));
    }

    #[tokio::test]
    async fn test_rejects_control_bytes_in_payload() {
        let mut output = Vec::new();
        let err = write_frame(&mut output, "MSA|\x1C|1").await.unwrap_err();
        assert!(matches!(err, Error::Framing(_)));
        assert!(output.is_empty());
    }
}
