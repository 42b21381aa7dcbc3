//! Length-prefixed JSON frames.
//!
//! ```text
//! ┌──────────────────┬─────────────────────┐
//! │ Length (4 bytes) │ JSON body           │
//! │ Big-endian u32   │ (variable size)     │
//! └──────────────────┴─────────────────────┘
//! ```
//!
//! Inbound bodies are either a bus envelope (`{"topic", "payload"}`) or a
//! client message (`{"type": ...}`). Outbound bodies are notifications.

use std::io::{ErrorKind, Read, Write};

use serde_json::Value;

use crate::error::{Error, Result};
use crate::messages::{ClientMessage, Envelope};

/// Largest accepted frame body.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Message for a bus topic
    Bus(Envelope),
    /// Message from a browser client
    Client(ClientMessage),
}

impl Inbound {
    /// Decode a frame body.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(body).map_err(|e| Error::decode("frame", e))?;
        if value.get("topic").is_some() {
            let envelope = serde_json::from_value(value).map_err(|e| Error::decode("frame", e))?;
            Ok(Inbound::Bus(envelope))
        } else if value.get("type").is_some() {
            let msg = serde_json::from_value(value).map_err(|e| Error::decode("client", e))?;
            Ok(Inbound::Client(msg))
        } else {
            Err(Error::decode("frame", "neither \"topic\" nor \"type\" present"))
        }
    }
}

/// Incremental frame reader.
///
/// Keeps a partially received length prefix or body across read timeouts, so
/// a slow sender never desynchronizes the stream.
#[derive(Debug, Default)]
pub struct FrameReader {
    prefix: [u8; 4],
    prefix_len: usize,
    body: Vec<u8>,
    body_len: usize,
    in_body: bool,
}

impl FrameReader {
    /// Reader with nothing buffered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue reading the current frame.
    ///
    /// Returns `Ok(true)` once a whole frame is available in [`body`](Self::body),
    /// `Ok(false)` when the reader timed out first. Progress is kept either way.
    /// End of stream surfaces as `ErrorKind::UnexpectedEof`.
    pub fn read_from<R: Read>(&mut self, reader: &mut R) -> Result<bool> {
        loop {
            if self.in_body && self.body_len == self.body.len() {
                self.in_body = false;
                return Ok(true);
            }

            let target = if self.in_body {
                &mut self.body[self.body_len..]
            } else {
                &mut self.prefix[self.prefix_len..]
            };
            let n = match reader.read(target) {
                Ok(0) => return Err(Error::Io(ErrorKind::UnexpectedEof.into())),
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                    return Ok(false);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            };

            if self.in_body {
                self.body_len += n;
                continue;
            }

            self.prefix_len += n;
            if self.prefix_len == self.prefix.len() {
                let len = u32::from_be_bytes(self.prefix) as usize;
                self.prefix_len = 0;
                if len > MAX_FRAME_LEN {
                    return Err(Error::Other(format!("Frame too large: {} bytes", len)));
                }
                self.body.clear();
                self.body.resize(len, 0);
                self.body_len = 0;
                self.in_body = true;
            }
        }
    }

    /// Body of the last complete frame.
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Write one frame.
pub fn write_frame<W: Write>(writer: &mut W, body: &[u8]) -> Result<()> {
    if body.len() > MAX_FRAME_LEN {
        return Err(Error::Other(format!("Frame too large: {} bytes", body.len())));
    }
    writer.write_all(&(body.len() as u32).to_be_bytes())?;
    writer.write_all(body)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::Cursor;

    /// Hands out scripted chunks; `None` is a read timeout.
    struct Stuttering {
        chunks: VecDeque<Option<Vec<u8>>>,
    }

    impl Stuttering {
        fn new(chunks: Vec<Option<Vec<u8>>>) -> Self {
            Self {
                chunks: chunks.into(),
            }
        }
    }

    impl Read for Stuttering {
        fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
            match self.chunks.pop_front() {
                None => Ok(0),
                Some(None) => Err(ErrorKind::WouldBlock.into()),
                Some(Some(mut chunk)) => {
                    let n = chunk.len().min(out.len());
                    out[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        self.chunks.push_front(Some(chunk.split_off(n)));
                    }
                    Ok(n)
                }
            }
        }
    }

    fn framed(body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        write_frame(&mut out, body).unwrap();
        out
    }

    #[test]
    fn test_length_prefix_is_big_endian() {
        let out = framed(b"{}");
        assert_eq!(&out[..4], &[0, 0, 0, 2]);
        assert_eq!(&out[4..], b"{}");
    }

    #[test]
    fn test_read_consecutive_frames() {
        let mut bytes = framed(b"first");
        bytes.extend(framed(b"second"));
        let mut cursor = Cursor::new(bytes);
        let mut frames = FrameReader::new();

        assert!(frames.read_from(&mut cursor).unwrap());
        assert_eq!(frames.body(), b"first");
        assert!(frames.read_from(&mut cursor).unwrap());
        assert_eq!(frames.body(), b"second");

        match frames.read_from(&mut cursor) {
            Err(Error::Io(e)) => assert_eq!(e.kind(), ErrorKind::UnexpectedEof),
            other => panic!("expected EOF, got {:?}", other),
        }
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let len = (MAX_FRAME_LEN as u32 + 1).to_be_bytes();
        let mut cursor = Cursor::new(len.to_vec());
        assert!(matches!(
            FrameReader::new().read_from(&mut cursor),
            Err(Error::Other(_))
        ));
    }

    #[test]
    fn test_timeout_inside_prefix_keeps_bytes() {
        let bytes = framed(br#"{"type":"request_map_update"}"#);
        let mut reader = Stuttering::new(vec![
            Some(bytes[..2].to_vec()),
            None,
            Some(bytes[2..].to_vec()),
        ]);
        let mut frames = FrameReader::new();

        assert!(!frames.read_from(&mut reader).unwrap());
        assert!(frames.read_from(&mut reader).unwrap());
        assert_eq!(frames.body(), &bytes[4..]);
    }

    #[test]
    fn test_timeout_inside_body_keeps_bytes() {
        let mut bytes = framed(b"0123456789abcdef");
        bytes.extend(framed(b"next"));
        let mut reader = Stuttering::new(vec![
            Some(bytes[..10].to_vec()),
            None,
            None,
            Some(bytes[10..].to_vec()),
        ]);
        let mut frames = FrameReader::new();

        assert!(!frames.read_from(&mut reader).unwrap());
        assert!(!frames.read_from(&mut reader).unwrap());
        assert!(frames.read_from(&mut reader).unwrap());
        assert_eq!(frames.body(), b"0123456789abcdef");
        assert!(frames.read_from(&mut reader).unwrap());
        assert_eq!(frames.body(), b"next");
    }

    #[test]
    fn test_empty_body_frame() {
        let mut cursor = Cursor::new(framed(b""));
        let mut frames = FrameReader::new();
        assert!(frames.read_from(&mut cursor).unwrap());
        assert!(frames.body().is_empty());
    }

    #[test]
    fn test_inbound_kinds() {
        let bus = Inbound::parse(br#"{"topic":"turtlebot3/odom","payload":{"x":1,"y":2}}"#).unwrap();
        assert!(matches!(bus, Inbound::Bus(ref e) if e.topic == "turtlebot3/odom"));

        let client = Inbound::parse(br#"{"type":"request_map_update"}"#).unwrap();
        assert_eq!(client, Inbound::Client(ClientMessage::RequestMapUpdate));

        assert!(Inbound::parse(br#"{"hello":1}"#).is_err());
        assert!(Inbound::parse(b"not json").is_err());
    }
}
