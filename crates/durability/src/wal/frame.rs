//! Record framing
//!
//! ```text
//! +----------------+----------------+---------------------+
//! | len: u32 LE    | crc32: u32 LE  | payload (len bytes) |
//! +----------------+----------------+---------------------+
//! ```
//!
//! The CRC covers the payload only. A frame whose header or payload runs
//! past the end of the buffer is `Incomplete` (a torn write).

use super::WalError;
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

/// Bytes of header preceding each payload.
pub const FRAME_HEADER_LEN: usize = 8;

/// Largest payload accepted in one frame.
pub const MAX_FRAME_PAYLOAD: usize = 64 * 1024 * 1024;

/// Outcome of decoding one frame at the start of a buffer.
#[derive(Debug, PartialEq, Eq)]
pub enum FrameRead<'a> {
    /// A whole, checksum-valid frame
    Frame {
        /// Payload bytes
        payload: &'a [u8],
        /// Bytes consumed including header
        consumed: usize,
    },
    /// Buffer ends inside the frame
    Incomplete,
    /// Payload does not match its checksum
    ChecksumMismatch {
        /// CRC stored in the header
        expected: u32,
        /// CRC computed over the payload
        actual: u32,
    },
    /// Header announces a payload larger than `MAX_FRAME_PAYLOAD`
    Oversized {
        /// Announced length
        len: usize,
    },
}

/// Frame a payload.
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, WalError> {
    if payload.len() > MAX_FRAME_PAYLOAD {
        return Err(WalError::FrameTooLarge {
            len: payload.len(),
            max: MAX_FRAME_PAYLOAD,
        });
    }
    let mut buf = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    // Writes into a Vec cannot fail
    let _ = buf.write_u32::<LittleEndian>(payload.len() as u32);
    let _ = buf.write_u32::<LittleEndian>(crc32fast::hash(payload));
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Decode the frame at the start of `buf`.
pub fn read_frame(buf: &[u8]) -> FrameRead<'_> {
    if buf.len() < FRAME_HEADER_LEN {
        return FrameRead::Incomplete;
    }
    let len = LittleEndian::read_u32(&buf[0..4]) as usize;
    let expected = LittleEndian::read_u32(&buf[4..8]);

    if len > MAX_FRAME_PAYLOAD {
        return FrameRead::Oversized { len };
    }
    let end = FRAME_HEADER_LEN + len;
    if buf.len() < end {
        return FrameRead::Incomplete;
    }

    let payload = &buf[FRAME_HEADER_LEN..end];
    let actual = crc32fast::hash(payload);
    if actual != expected {
        return FrameRead::ChecksumMismatch { expected, actual };
    }

    FrameRead::Frame {
        payload,
        consumed: end,
    }
}
