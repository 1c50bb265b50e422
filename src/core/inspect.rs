//! Directional hex/ASCII traces for operator debugging.
//!
//! Rendering only: nothing here mutates the data it inspects. The session
//! decides when to emit these strings based on the dump toggle.

use crate::core::frame::{FIELD_SPANS, FRAME_LEN, HEADER_LEN, TRAILER_LEN};

/// Direction of the traffic being traced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Bytes received from the host under test.
    Read,
    /// Bytes transmitted to the host under test.
    Write,
}

impl Direction {
    fn marker(self) -> char {
        match self {
            Self::Read => '>',
            Self::Write => '<',
        }
    }
}

fn printable(byte: u8) -> char {
    if byte.is_ascii_graphic() || byte == b' ' {
        byte as char
    } else {
        '.'
    }
}

/// Render a generic hex dump of `data` with an ASCII sidebar.
pub fn dump(dir: Direction, data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 4 + 8);
    out.push(dir.marker());
    for byte in data {
        out.push(' ');
        out.push_str(&format!("{byte:02X}"));
    }
    out.push_str("  |");
    for &byte in data {
        out.push(printable(byte));
    }
    out.push('|');
    out
}

/// Render the fixed-layout decoded trace of one outbound telemetry sentence:
/// raw ASCII header, the ten hex field groups, raw ASCII trailer.
///
/// Buffers that are not exactly one frame long fall back to [`dump`].
pub fn dump_sentence(frame: &[u8]) -> String {
    if frame.len() != FRAME_LEN {
        return dump(Direction::Write, frame);
    }

    let mut out = String::with_capacity(FRAME_LEN * 2 + 16);
    out.push(Direction::Write.marker());
    out.push(' ');
    for &byte in &frame[..HEADER_LEN] {
        out.push(printable(byte));
    }
    for (i, (start, len)) in FIELD_SPANS.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        for byte in &frame[*start..start + len] {
            out.push_str(&format!("{byte:02X}"));
        }
    }
    for &byte in &frame[FRAME_LEN - TRAILER_LEN..] {
        out.push(printable(byte));
    }
    out
}
