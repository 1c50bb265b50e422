//! CLI Module
//!
//! Exit codes for automation; the argument surface lives in the binary.

pub mod exit_codes;

pub use exit_codes::{start_exit_code, ExitCodes};
