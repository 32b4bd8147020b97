//! Newline-delimited framing over a byte stream.
//!
//! A frame is one UTF-8 line terminated by `\n` (a trailing `\r` is dropped).
//! The decoder keeps partial input across reads, so a frame split over many
//! reads or several frames arriving in one read decode the same way.
//!
//! Bad input never ends the stream: an over-long line or a line that is not
//! UTF-8 comes out as [`Frame::Malformed`] and decoding resumes at the next
//! line.

use std::cmp;

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{FrameError, MalformedMessage};

/// Default upper bound on a single frame, excluding the terminator
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 64 * 1024;

/// One decoded unit
#[derive(Debug)]
pub enum Frame {
    Line(String),
    Malformed(MalformedMessage),
}

/// Codec for newline-delimited frames
#[derive(Debug, Clone)]
pub struct FrameCodec {
    /// Index into the buffer up to which no newline was found yet
    next_index: usize,
    max_length: usize,
    /// Set while skipping the rest of an over-long line
    discarding: bool,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::with_max_length(DEFAULT_MAX_FRAME_LENGTH)
    }

    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            next_index: 0,
            max_length,
            discarding: false,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    fn too_long(&self) -> Frame {
        Frame::Malformed(MalformedMessage::TooLong {
            limit: self.max_length,
        })
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn without_carriage_return(line: &[u8]) -> &[u8] {
    match line.last() {
        Some(b'\r') => &line[..line.len() - 1],
        _ => line,
    }
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

fn to_frame(line: &[u8]) -> Frame {
    match std::str::from_utf8(line) {
        Ok(text) => Frame::Line(text.to_string()),
        Err(_) => Frame::Malformed(MalformedMessage::InvalidUtf8),
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        loop {
            // Room past the limit for the `\n` and an optional `\r` before it.
            let read_to = cmp::min(self.max_length.saturating_add(2), buf.len());
            let newline = buf[self.next_index..read_to]
                .iter()
                .position(|b| *b == b'\n')
                .map(|offset| offset + self.next_index);

            match (self.discarding, newline) {
                (true, Some(index)) => {
                    buf.advance(index + 1);
                    self.discarding = false;
                    self.next_index = 0;
                    return Ok(Some(self.too_long()));
                }
                (true, None) => {
                    buf.advance(read_to);
                    self.next_index = 0;
                    if buf.is_empty() {
                        return Ok(None);
                    }
                }
                (false, Some(index)) => {
                    self.next_index = 0;
                    let line = buf.split_to(index + 1);
                    let line = without_carriage_return(&line[..line.len() - 1]);
                    if line.len() > self.max_length {
                        return Ok(Some(self.too_long()));
                    }
                    if is_blank(line) {
                        continue;
                    }
                    return Ok(Some(to_frame(line)));
                }
                (false, None) if buf.len() > self.max_length.saturating_add(1) => {
                    self.discarding = true;
                }
                (false, None) => {
                    self.next_index = read_to;
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        if let Some(frame) = self.decode(buf)? {
            return Ok(Some(frame));
        }
        self.next_index = 0;
        // The stream ended inside an over-long line.
        if std::mem::take(&mut self.discarding) {
            buf.clear();
            return Ok(Some(self.too_long()));
        }
        if buf.is_empty() {
            return Ok(None);
        }

        // Unterminated trailing line.
        let rest = buf.split();
        let rest = without_carriage_return(&rest);
        if rest.len() > self.max_length {
            return Ok(Some(self.too_long()));
        }
        if is_blank(rest) {
            return Ok(None);
        }
        Ok(Some(to_frame(rest)))
    }
}

impl<T: AsRef<str>> Encoder<T> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, payload: T, buf: &mut BytesMut) -> Result<(), FrameError> {
        let payload = payload.as_ref();
        if payload.contains('\n') {
            return Err(FrameError::EmbeddedNewline);
        }
        buf.reserve(payload.len() + 1);
        buf.put(payload.as_bytes());
        buf.put_u8(b'\n');
        Ok(())
    }
}
