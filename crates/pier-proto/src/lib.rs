//! Wire framing for the pier terminal bridge.
//!
//! Every client-to-server message is one frame: a single control byte
//! followed by the payload. The server side sends no framing at all — its
//! output is a raw byte stream that must reach the emulator's parser
//! unmodified, so the inbound direction uses a byte-preserving decode
//! rather than UTF-8.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Control byte for a keystroke data frame.
pub const CONTROL_DATA: u8 = 0x00;
/// Control byte for a dimension-change frame.
pub const CONTROL_RESIZE: u8 = 0x01;

/// Terminal dimensions as carried on the wire.
///
/// Field order matters: the resize payload is serialised as
/// `{"cols":c,"rows":r}` and peers may compare bytes in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    pub cols: u16,
    pub rows: u16,
}

/// One outbound client-to-server message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Raw keystroke payload, UTF-8 bytes of the reported input text.
    Data(Vec<u8>),
    /// Dimension change.
    Resize(WindowSize),
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("empty frame")]
    Empty,
    #[error("unknown control byte {0:#04x}")]
    UnknownControl(u8),
    #[error("malformed resize payload: {0}")]
    MalformedResize(#[from] serde_json::Error),
}

impl Frame {
    /// Serialise the frame: one control byte, then the payload.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Frame::Data(bytes) => {
                let mut out = Vec::with_capacity(1 + bytes.len());
                out.push(CONTROL_DATA);
                out.extend_from_slice(bytes);
                out
            }
            Frame::Resize(size) => {
                // Serialising a two-field struct of integers cannot fail.
                let json = serde_json::to_vec(size).unwrap_or_default();
                let mut out = Vec::with_capacity(1 + json.len());
                out.push(CONTROL_RESIZE);
                out.extend_from_slice(&json);
                out
            }
        }
    }

    /// Parse a frame as the server side would. Used by the reference-peer
    /// tests and available to local harnesses.
    pub fn parse(bytes: &[u8]) -> Result<Self, FrameError> {
        let (&control, payload) = bytes.split_first().ok_or(FrameError::Empty)?;
        match control {
            CONTROL_DATA => Ok(Frame::Data(payload.to_vec())),
            CONTROL_RESIZE => Ok(Frame::Resize(serde_json::from_slice(payload)?)),
            other => Err(FrameError::UnknownControl(other)),
        }
    }
}

/// Encode one keystroke input event.
pub fn encode_data(text: &str) -> Vec<u8> {
    Frame::Data(text.as_bytes().to_vec()).encode()
}

/// Encode one dimension change.
pub fn encode_resize(cols: u16, rows: u16) -> Vec<u8> {
    Frame::Resize(WindowSize { cols, rows }).encode()
}

/// Byte-preserving decode of remote output.
///
/// Each byte maps to the char of the same code point. This is deliberately
/// not a UTF-8 decode: remote output may contain 8-bit terminal control
/// sequences (e.g. 0x9b CSI) that a UTF-8 decode would reject or mangle
/// before they reach the emulator's parser.
pub fn decode_output(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_frame_prepends_zero_control_byte() {
        assert_eq!(encode_data("A"), vec![0x00, 0x41]);
        assert_eq!(encode_data(""), vec![0x00]);
    }

    #[test]
    fn data_frame_is_utf8_of_input_text() {
        // Outbound text is UTF-8, multi-byte for non-ASCII.
        let frame = encode_data("é");
        assert_eq!(frame, vec![0x00, 0xc3, 0xa9]);
    }

    #[test]
    fn resize_frame_has_fixed_json_shape() {
        let frame = encode_resize(80, 24);
        assert_eq!(frame[0], 0x01);
        assert_eq!(&frame[1..], br#"{"cols":80,"rows":24}"#);
    }

    #[test]
    fn resize_frame_accepts_zero_dimensions() {
        let frame = encode_resize(0, 0);
        assert_eq!(&frame[1..], br#"{"cols":0,"rows":0}"#);
    }

    #[test]
    fn reference_peer_recovers_input_text() {
        let text = "ls -la\r";
        let parsed = Frame::parse(&encode_data(text)).expect("parse ok");
        match parsed {
            Frame::Data(bytes) => assert_eq!(String::from_utf8(bytes).unwrap(), text),
            other => panic!("expected data frame, got {:?}", other),
        }
    }

    #[test]
    fn reference_peer_recovers_dimensions() {
        let parsed = Frame::parse(&encode_resize(132, 43)).expect("parse ok");
        assert_eq!(parsed, Frame::Resize(WindowSize { cols: 132, rows: 43 }));
    }

    #[test]
    fn parse_rejects_empty_and_unknown_frames() {
        assert!(matches!(Frame::parse(&[]), Err(FrameError::Empty)));
        assert!(matches!(
            Frame::parse(&[0x7f, 0x00]),
            Err(FrameError::UnknownControl(0x7f))
        ));
        assert!(matches!(
            Frame::parse(&[CONTROL_RESIZE, b'{']),
            Err(FrameError::MalformedResize(_))
        ));
    }

    #[test]
    fn decode_output_preserves_every_byte() {
        let all: Vec<u8> = (0u8..=255).collect();
        let text = decode_output(&all);
        assert_eq!(text.chars().count(), all.len());
        for (i, ch) in text.chars().enumerate() {
            assert_eq!(ch as u32, all[i] as u32);
        }
    }

    #[test]
    fn decode_output_is_not_utf8() {
        // 0x9b is the 8-bit CSI introducer; a UTF-8 decode would reject it.
        let text = decode_output(&[0x9b, b'2', b'J']);
        assert_eq!(text, "\u{9b}2J");
    }

    #[test]
    fn decode_output_ascii() {
        assert_eq!(decode_output(&[0x68, 0x69]), "hi");
    }
}
