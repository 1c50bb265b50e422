//! Simulator core: serial channel, frame log replay, session state machine,
//! and trace inspection.

pub mod channel;
pub mod frame;
pub mod inspect;
pub mod session;
pub mod source;

pub use channel::{list_ports, ChannelError, ChannelOpener, Link, SerialOpener};
pub use frame::{corrupt_checksum, CHECKSUM_TAIL_OFFSETS, FRAME_LEN};
pub use inspect::Direction;
pub use session::{
    DiagnosticToggles, SessionController, SessionError, SessionState, STREAM_COMMAND, TICK_PERIOD,
};
pub use source::{FrameSource, LogCatalog, SourceError};
