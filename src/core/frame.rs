//! Fixed-format IMU telemetry frame layout.
//!
//! The simulated device emits one binary sentence per tick: 9 ASCII header
//! bytes, ten packed hex fields, and a 5-byte ASCII trailer whose middle two
//! bytes carry the checksum digits.

/// Length of one telemetry frame in bytes.
pub const FRAME_LEN: usize = 58;

/// Length of the ASCII sentence header (`$TSC,BIN,`-style).
pub const HEADER_LEN: usize = 9;

/// Length of the ASCII trailer (`*` + two checksum digits + CR/LF).
pub const TRAILER_LEN: usize = 5;

/// `(offset, length)` spans of the packed binary fields between header and
/// trailer, in wire order.
pub const FIELD_SPANS: [(usize, usize); 10] = [
    (9, 2),
    (11, 2),
    (13, 2),
    (15, 6),
    (21, 6),
    (27, 6),
    (33, 4),
    (37, 8),
    (45, 6),
    (51, 2),
];

/// Offsets from the end of a frame of the two checksum digits that fault
/// injection overwrites. For a 58-byte frame these are bytes 54 and 55; the
/// final CR/LF pair is left intact.
pub const CHECKSUM_TAIL_OFFSETS: [usize; 2] = [3, 4];

/// Byte written over each checksum digit when fault injection is active.
pub const CHECKSUM_FILL: u8 = b'?';

/// Overwrite the checksum digits of `frame` in place, simulating a device
/// that computes its checksum wrong. All other bytes are untouched.
pub fn corrupt_checksum(frame: &mut [u8]) {
    for offset in CHECKSUM_TAIL_OFFSETS {
        if let Some(idx) = frame.len().checked_sub(offset) {
            if let Some(byte) = frame.get_mut(idx) {
                *byte = CHECKSUM_FILL;
            }
        }
    }
}
