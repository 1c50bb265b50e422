//! Serial link ownership and the opener seam.
//!
//! The session only needs a byte-level duplex [`Link`]; real devices come
//! from [`SerialOpener`], tests substitute an in-memory pair through the same
//! [`ChannelOpener`] trait.

use std::io;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, StopBits};

/// Channel open and enumeration errors.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The named device node does not exist.
    #[error("device not found: {0}")]
    NotFound(String),

    /// The device exists but cannot be opened by this user.
    #[error("permission denied opening device: {0}")]
    PermissionDenied(String),

    /// Any other open failure (device busy, driver fault).
    #[error("failed to open device {device}: {message}")]
    OpenFailed {
        /// Device name as configured.
        device: String,
        /// Underlying driver message.
        message: String,
    },

    /// Port enumeration failed.
    #[error("serial port enumeration failed: {0}")]
    Enumerate(String),
}

/// Byte-level duplex link to the host under test.
pub trait Link: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin + 'static> Link for T {}

/// Opens a named device as a [`Link`]. Called on the session's own execution
/// context, so implementations may register I/O with the ambient reactor.
#[async_trait]
pub trait ChannelOpener: Send + Sync {
    /// Open `device`, returning the link the session will own exclusively
    /// until stop.
    async fn open(&self, device: &str) -> Result<Box<dyn Link>, ChannelError>;
}

/// Opens real serial devices at the fixed framing the simulated IMU uses
/// (8 data bits, no parity, one stop bit, no flow control).
#[derive(Debug, Clone)]
pub struct SerialOpener {
    baud: u32,
}

impl SerialOpener {
    /// Create an opener at the given baud rate.
    pub fn new(baud: u32) -> Self {
        Self { baud }
    }
}

impl Default for SerialOpener {
    fn default() -> Self {
        Self::new(115_200)
    }
}

#[async_trait]
impl ChannelOpener for SerialOpener {
    async fn open(&self, device: &str) -> Result<Box<dyn Link>, ChannelError> {
        let stream = tokio_serial::new(device, self.baud)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .open_native_async()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => ChannelError::NotFound(device.to_string()),
                serialport::ErrorKind::Io(io::ErrorKind::NotFound) => {
                    ChannelError::NotFound(device.to_string())
                }
                serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied) => {
                    ChannelError::PermissionDenied(device.to_string())
                }
                _ => ChannelError::OpenFailed {
                    device: device.to_string(),
                    message: e.to_string(),
                },
            })?;

        Ok(Box::new(stream))
    }
}

/// List serial ports visible on this host.
pub fn list_ports() -> Result<Vec<serialport::SerialPortInfo>, ChannelError> {
    serialport::available_ports().map_err(|e| ChannelError::Enumerate(e.to_string()))
}
