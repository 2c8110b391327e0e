//! MAVLink framing over byte streams.
//!
//! Serial ports and TCP sockets deliver arbitrary chunks, and a UDP datagram
//! may carry several frames. [`FrameDecoder`] buffers bytes, finds frame
//! boundaries from the magic byte and length field, and hands each complete
//! frame to the `mavlink` codec.

use mavlink::MavHeader;
use mavlink::common::MavMessage;
use mavlink::error::MessageReadError;
use mavlink::peek_reader::PeekReader;
use std::io::Cursor;
use tracing::trace;

use crate::{GcsError, Result};

/// Start-of-frame marker for MAVLink v1
pub const MAGIC_V1: u8 = 0xFE;
/// Start-of-frame marker for MAVLink v2
pub const MAGIC_V2: u8 = 0xFD;

const V1_OVERHEAD: usize = 8;
const V2_OVERHEAD: usize = 12;
const V2_SIGNATURE_LEN: usize = 13;
const V2_FLAG_SIGNED: u8 = 0x01;

/// Upper bound on a single encoded frame (v2, full payload, signed)
pub const MAX_FRAME_LEN: usize = V2_OVERHEAD + 255 + V2_SIGNATURE_LEN;

/// Incremental decoder for a MAVLink byte stream
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    dropped: u64,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self { buf: Vec::with_capacity(2 * MAX_FRAME_LEN), dropped: 0 }
    }

    /// Append raw bytes read from the transport
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Number of bytes waiting for the rest of their frame
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Frame candidates discarded while resyncing
    pub fn dropped_frames(&self) -> u64 {
        self.dropped
    }

    /// Pop the next complete, decodable message
    ///
    /// Returns `None` when more bytes are needed. A magic byte whose frame
    /// fails to decode costs one byte, not the span its length field claims.
    pub fn next_message(&mut self) -> Option<(MavHeader, MavMessage)> {
        loop {
            let Some(pos) = self.magic_from(0) else {
                self.buf.clear();
                return None;
            };
            if pos > 0 {
                self.buf.drain(..pos);
            }
            let frame_len = self.frame_len_at(0)?;

            if self.buf.len() < frame_len {
                // A stray magic byte may claim a length that never arrives
                let start = self.complete_frame_after(0)?;
                trace!("Resyncing past {} bytes ahead of a complete frame", start);
                self.dropped += 1;
                self.buf.drain(..start);
                continue;
            }

            match self.decode_at(0, frame_len) {
                Ok(message) => {
                    self.buf.drain(..frame_len);
                    return Some(message);
                }
                Err(e) => {
                    trace!("Dropping undecodable frame candidate ({} bytes): {:?}", frame_len, e);
                    self.dropped += 1;
                    self.buf.drain(..1);
                }
            }
        }
    }

    fn magic_from(&self, from: usize) -> Option<usize> {
        let tail = self.buf.get(from..)?;
        tail.iter().position(|&b| b == MAGIC_V1 || b == MAGIC_V2).map(|pos| pos + from)
    }

    /// Frame length claimed by the header at `start`, once three bytes are in
    fn frame_len_at(&self, start: usize) -> Option<usize> {
        let head = self.buf.get(start..start + 3)?;
        let payload_len = head[1] as usize;
        Some(if head[0] == MAGIC_V2 {
            let base = V2_OVERHEAD + payload_len;
            if head[2] & V2_FLAG_SIGNED != 0 { base + V2_SIGNATURE_LEN } else { base }
        } else {
            V1_OVERHEAD + payload_len
        })
    }

    fn decode_at(
        &self,
        start: usize,
        frame_len: usize,
    ) -> std::result::Result<(MavHeader, MavMessage), MessageReadError> {
        let mut reader = PeekReader::new(Cursor::new(&self.buf[start..start + frame_len]));
        if self.buf[start] == MAGIC_V2 {
            mavlink::read_v2_msg::<MavMessage, _>(&mut reader)
        } else {
            mavlink::read_v1_msg::<MavMessage, _>(&mut reader)
        }
    }

    /// First magic byte after `start` that begins a complete, decodable frame
    fn complete_frame_after(&self, start: usize) -> Option<usize> {
        let mut from = start + 1;
        while let Some(candidate) = self.magic_from(from) {
            if let Some(len) = self.frame_len_at(candidate) {
                if candidate + len <= self.buf.len() && self.decode_at(candidate, len).is_ok() {
                    return Some(candidate);
                }
            }
            from = candidate + 1;
        }
        None
    }
}

/// Encode a message as a MAVLink v2 frame
pub fn encode_v2(header: MavHeader, message: &MavMessage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::with_capacity(MAX_FRAME_LEN));
    mavlink::write_v2_msg(&mut buf, header, message)
        .map_err(|e| GcsError::codec(format!("{e:?}")))?;
    Ok(buf.into_inner())
}
