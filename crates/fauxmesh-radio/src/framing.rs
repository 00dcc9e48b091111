//! Length-prefixed framing on the client stream.
//!
//! A frame is `0x94 0xC3`, a big-endian 16-bit payload length, then the
//! protobuf payload. The transport may interleave human-readable debug text
//! with frames, so the decoder scans byte-wise for the two start bytes and
//! discards everything else. A length header above [`MAX_FRAME_PAYLOAD`] is
//! treated as corruption: the header is dropped and scanning resumes.

use bytes::{Buf, BytesMut};
use prost::Message;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::{RadioError, Result};

/// First start byte of a frame header.
pub const START1: u8 = 0x94;
/// Second start byte of a frame header.
pub const START2: u8 = 0xC3;
/// Largest payload a frame may carry.
pub const MAX_FRAME_PAYLOAD: usize = 512;

const READ_CHUNK_SIZE: usize = 512;

/// Decodes framed protobuf messages from a byte stream, resynchronizing
/// across debug noise and corrupt headers.
pub struct FrameReader<R> {
    reader: R,
    buf: BytesMut,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wrap the read half of a stream.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: BytesMut::with_capacity(READ_CHUNK_SIZE),
        }
    }

    /// Pull one byte, refilling the buffer from the stream as needed.
    ///
    /// Returns [`RadioError::StreamClosed`] on EOF.
    async fn read_byte(&mut self) -> Result<u8> {
        while self.buf.is_empty() {
            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let n = self.reader.read(&mut chunk).await?;
            if n == 0 {
                return Err(RadioError::StreamClosed);
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
        Ok(self.buf.get_u8())
    }

    /// Consume bytes until a complete header has been seen and return the
    /// payload length it announces.
    async fn read_header(&mut self) -> Result<usize> {
        loop {
            // Scan for START1; anything else is debug noise.
            let mut byte = self.read_byte().await?;
            loop {
                if byte == START1 {
                    let next = self.read_byte().await?;
                    if next == START2 {
                        break;
                    }
                    // The follow-up byte may itself start a header.
                    byte = next;
                } else {
                    byte = self.read_byte().await?;
                }
            }

            let hi = self.read_byte().await?;
            let lo = self.read_byte().await?;
            let len = u16::from_be_bytes([hi, lo]) as usize;
            if len > MAX_FRAME_PAYLOAD {
                trace!(len, "discarding frame header with oversized length");
                continue;
            }
            return Ok(len);
        }
    }

    /// Read the next framed message.
    ///
    /// A payload that fails to deserialize yields [`RadioError::FrameDecode`];
    /// the frame has been consumed and the stream remains usable. EOF yields
    /// [`RadioError::StreamClosed`].
    pub async fn read_frame<M: Message + Default>(&mut self) -> Result<M> {
        let len = self.read_header().await?;
        let mut payload = vec![0u8; len];
        for slot in payload.iter_mut() {
            *slot = self.read_byte().await?;
        }
        M::decode(payload.as_slice()).map_err(|e| RadioError::FrameDecode(e.to_string()))
    }
}

/// Encodes framed protobuf messages onto a byte stream.
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Wrap the write half of a stream.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write one message as a single buffered header-plus-payload write.
    pub async fn write_frame<M: Message>(&mut self, msg: &M) -> Result<()> {
        let payload = msg.encode_to_vec();
        if payload.len() > MAX_FRAME_PAYLOAD {
            return Err(RadioError::FrameTooLarge {
                len: payload.len(),
                max: MAX_FRAME_PAYLOAD,
            });
        }

        let mut frame = Vec::with_capacity(4 + payload.len());
        frame.push(START1);
        frame.push(START2);
        frame.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        frame.extend_from_slice(&payload);

        self.writer.write_all(&frame).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

/// Frame a raw payload, for callers assembling wire bytes by hand.
pub fn frame_payload(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.push(START1);
    frame.push(START2);
    frame.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}
