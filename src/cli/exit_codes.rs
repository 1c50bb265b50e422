//! CLI exit codes.
//!
//! Start failures surface as POSIX-style codes so automation can tell a
//! missing device from a missing log or a permission problem.

use crate::core::channel::ChannelError;
use crate::core::session::SessionError;
use crate::core::source::SourceError;

/// Exit code constants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCodes;

impl ExitCodes {
    /// Success
    pub const SUCCESS: u8 = 0;

    /// General error
    pub const ERROR: u8 = 1;

    /// Device or frame log missing (mirrors `ENOENT`)
    pub const NO_SUCH_ENTRY: u8 = 2;

    /// Transport or log read failure (mirrors `EIO`)
    pub const IO_ERROR: u8 = 5;

    /// Device cannot be opened by this user (mirrors `EACCES`)
    pub const PERMISSION_DENIED: u8 = 13;

    /// A session is already running (mirrors `EBUSY`)
    pub const BUSY: u8 = 16;
}

/// Map a session start failure onto a process exit code.
pub fn start_exit_code(err: &SessionError) -> u8 {
    match err {
        SessionError::AlreadyRunning => ExitCodes::BUSY,
        SessionError::Open(ChannelError::NotFound(_)) => ExitCodes::NO_SUCH_ENTRY,
        SessionError::Open(ChannelError::PermissionDenied(_)) => ExitCodes::PERMISSION_DENIED,
        SessionError::Open(_) => ExitCodes::IO_ERROR,
        SessionError::Source(SourceError::NotFound(_)) => ExitCodes::NO_SUCH_ENTRY,
        SessionError::Source(_) => ExitCodes::IO_ERROR,
        SessionError::Launch(_) => ExitCodes::ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_device_maps_to_enoent() {
        let err = SessionError::Open(ChannelError::NotFound("/dev/null0".into()));
        assert_eq!(start_exit_code(&err), ExitCodes::NO_SUCH_ENTRY);
    }

    #[test]
    fn missing_log_maps_to_enoent() {
        let err = SessionError::Source(SourceError::NotFound("ghost.bin".into()));
        assert_eq!(start_exit_code(&err), ExitCodes::NO_SUCH_ENTRY);
    }

    #[test]
    fn permission_denied_maps_to_eacces() {
        let err = SessionError::Open(ChannelError::PermissionDenied("/dev/ttyS0".into()));
        assert_eq!(start_exit_code(&err), ExitCodes::PERMISSION_DENIED);
    }

    #[test]
    fn double_start_maps_to_ebusy() {
        assert_eq!(start_exit_code(&SessionError::AlreadyRunning), ExitCodes::BUSY);
    }
}
