//! # imu-sim Core Library
//!
//! Emulates an inertial measurement unit attached over a serial link, so
//! that host software can be exercised without physical hardware:
//!
//! - opens a named serial device and runs a single-threaded session loop
//! - detects the `$TSC,BIN,30` command and switches into streaming mode
//! - replays a prerecorded log of 58-byte telemetry frames cyclically at 30 Hz
//! - optionally corrupts checksum bytes and traces traffic for debugging
//! - tears the session down cooperatively from a separate control thread
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use imu_sim::{LogCatalog, SerialOpener, SessionController};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = LogCatalog::new("logs").open("sample.bin")?;
//!     let mut session = SessionController::new(Arc::new(SerialOpener::default()));
//!
//!     session.start("/dev/ttyUSB0", source)?;
//!     // ... the host under test sends "$TSC,BIN,30\r\n" and frames flow ...
//!     session.stop();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod core;

// Re-exports for convenience
pub use crate::cli::{start_exit_code, ExitCodes};
pub use crate::config::{DiagnosticsConfig, SimConfig};
pub use crate::core::channel::{list_ports, ChannelError, ChannelOpener, Link, SerialOpener};
pub use crate::core::frame::{corrupt_checksum, CHECKSUM_TAIL_OFFSETS, FRAME_LEN};
pub use crate::core::inspect::Direction;
pub use crate::core::session::{
    DiagnosticToggles, SessionController, SessionError, SessionState, STREAM_COMMAND, TICK_PERIOD,
};
pub use crate::core::source::{FrameSource, LogCatalog, SourceError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
