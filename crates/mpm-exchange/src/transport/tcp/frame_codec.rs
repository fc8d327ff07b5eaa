// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

//! Length-prefix framing for rank-to-rank TCP streams.
//!
//! ```text
//! +----------------+------------------------------------------+
//! | Length (4B BE) | Body                                     |
//! +----------------+------------------------------------------+
//! ```
//!
//! The length counts body bytes only. Bodies larger than the codec's
//! maximum are rejected before any allocation.

use std::io::{self, Read, Write};

/// Frame header size (4 bytes for length).
pub const FRAME_HEADER_SIZE: usize = 4;

/// Incremental frame decoder with anti-OOM size limit.
#[derive(Debug)]
pub struct FrameCodec {
    state: ReadState,
    buffer: Vec<u8>,
    max_size: usize,
    frames_decoded: u64,
    bytes_decoded: u64,
    frames_rejected: u64,
}

#[derive(Debug, Clone, Copy)]
enum ReadState {
    ReadingLength { bytes_read: usize },
    ReadingBody { expected_len: usize, bytes_read: usize },
}

impl Default for ReadState {
    fn default() -> Self {
        ReadState::ReadingLength { bytes_read: 0 }
    }
}

impl FrameCodec {
    pub fn new(max_size: usize) -> Self {
        Self {
            state: ReadState::default(),
            buffer: vec![0u8; FRAME_HEADER_SIZE],
            max_size,
            frames_decoded: 0,
            bytes_decoded: 0,
            frames_rejected: 0,
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    pub fn bytes_decoded(&self) -> u64 {
        self.bytes_decoded
    }

    /// Frames refused for exceeding the maximum size.
    pub fn frames_rejected(&self) -> u64 {
        self.frames_rejected
    }

    /// Encode a body into a framed buffer: `[length: u32 BE][body]`.
    pub fn encode(body: &[u8]) -> Vec<u8> {
        let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + body.len());
        Self::encode_into(body, &mut frame);
        frame
    }

    pub fn encode_into(body: &[u8], buf: &mut Vec<u8>) {
        buf.extend_from_slice(&(body.len() as u32).to_be_bytes());
        buf.extend_from_slice(body);
    }

    /// Write one frame to `writer` and flush it.
    pub fn write_frame<W: Write + ?Sized>(&self, writer: &mut W, body: &[u8]) -> io::Result<()> {
        if body.len() > self.max_size || body.len() > u32::MAX as usize {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("frame too large: {} bytes (max {})", body.len(), self.max_size),
            ));
        }
        writer.write_all(&Self::encode(body))?;
        writer.flush()
    }

    /// Read one complete frame body.
    ///
    /// Returns `Ok(None)` only on a non-blocking reader that has no more data
    /// yet; partial progress is kept for the next call. EOF at a frame
    /// boundary is `UnexpectedEof` with "connection closed".
    pub fn decode<R: Read + ?Sized>(&mut self, reader: &mut R) -> io::Result<Option<Vec<u8>>> {
        loop {
            let (start, end) = match self.state {
                ReadState::ReadingLength { bytes_read } => (bytes_read, FRAME_HEADER_SIZE),
                ReadState::ReadingBody {
                    expected_len,
                    bytes_read,
                } => (bytes_read, expected_len),
            };

            let n = match reader.read(&mut self.buffer[start..end]) {
                Ok(0) => {
                    let what = match self.state {
                        ReadState::ReadingLength { bytes_read: 0 } => "connection closed",
                        ReadState::ReadingLength { .. } => "incomplete frame header",
                        ReadState::ReadingBody { .. } => "incomplete frame body",
                    };
                    return Err(io::Error::new(io::ErrorKind::UnexpectedEof, what));
                }
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };

            let total = start + n;
            match self.state {
                ReadState::ReadingLength { .. } if total < FRAME_HEADER_SIZE => {
                    self.state = ReadState::ReadingLength { bytes_read: total };
                }
                ReadState::ReadingLength { .. } => {
                    let len = u32::from_be_bytes([
                        self.buffer[0],
                        self.buffer[1],
                        self.buffer[2],
                        self.buffer[3],
                    ]) as usize;

                    if len > self.max_size {
                        self.frames_rejected += 1;
                        self.state = ReadState::default();
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("frame too large: {} bytes (max {})", len, self.max_size),
                        ));
                    }
                    if len == 0 {
                        self.frames_decoded += 1;
                        self.state = ReadState::default();
                        return Ok(Some(Vec::new()));
                    }
                    self.buffer.resize(len, 0);
                    self.state = ReadState::ReadingBody {
                        expected_len: len,
                        bytes_read: 0,
                    };
                }
                ReadState::ReadingBody { expected_len, .. } if total < expected_len => {
                    self.state = ReadState::ReadingBody {
                        expected_len,
                        bytes_read: total,
                    };
                }
                ReadState::ReadingBody { expected_len, .. } => {
                    let body = self.buffer[..expected_len].to_vec();
                    self.frames_decoded += 1;
                    self.bytes_decoded += expected_len as u64;
                    self.buffer.resize(FRAME_HEADER_SIZE, 0);
                    self.state = ReadState::default();
                    return Ok(Some(body));
                }
            }
        }
    }

    /// Blocking read of one frame; treats `Ok(None)` as a protocol error.
    pub fn read_frame<R: Read + ?Sized>(&mut self, reader: &mut R) -> io::Result<Vec<u8>> {
        self.decode(reader)?.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::WouldBlock,
                "frame read on a non-blocking stream",
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_encode_simple() {
        let frame = FrameCodec::encode(b"hello");
        assert_eq!(frame.len(), 4 + 5);
        assert_eq!(&frame[..4], &5u32.to_be_bytes());
        assert_eq!(&frame[4..], b"hello");
    }

    #[test]
    fn test_decode_multiple() {
        let mut codec = FrameCodec::new(1024);
        let mut buf = Vec::new();
        FrameCodec::encode_into(b"first", &mut buf);
        FrameCodec::encode_into(b"", &mut buf);
        FrameCodec::encode_into(b"third", &mut buf);
        let mut cursor = Cursor::new(buf);

        assert_eq!(codec.read_frame(&mut cursor).unwrap(), b"first");
        assert_eq!(codec.read_frame(&mut cursor).unwrap(), b"");
        assert_eq!(codec.read_frame(&mut cursor).unwrap(), b"third");
        assert_eq!(codec.frames_decoded(), 3);
        assert_eq!(codec.bytes_decoded(), 10);

        let err = codec.read_frame(&mut cursor).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(err.to_string(), "connection closed");
    }

    #[test]
    fn test_decode_too_large() {
        let mut codec = FrameCodec::new(10);
        let frame = FrameCodec::encode(b"this body is longer than ten bytes");
        let err = codec.decode(&mut Cursor::new(frame)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert_eq!(codec.frames_rejected(), 1);
    }

    #[test]
    fn test_decode_partial_body() {
        let mut codec = FrameCodec::new(1024);
        let frame = FrameCodec::encode(b"hello, world!");
        let err = codec.decode(&mut Cursor::new(&frame[..8])).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(err.to_string(), "incomplete frame body");
    }

    #[test]
    fn test_write_frame_respects_limit() {
        let codec = FrameCodec::new(4);
        let mut out = Vec::new();
        codec.write_frame(&mut out, b"1234").unwrap();
        assert_eq!(out, FrameCodec::encode(b"1234"));
        assert!(codec.write_frame(&mut out, b"12345").is_err());
    }
}
