//! Hardware port traits.
//!
//! The control unit never touches hardware directly; it reads and writes
//! through these ports. Implementations live in `flm_hal` (simulation) or a
//! target-specific crate. All methods take `&self`: ports are shared between
//! the periodic tasks and an asynchronous injector, so implementations use
//! interior mutability.

use thiserror::Error;

/// Error type for port operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    /// Channel id outside the configured range.
    #[error("channel {0} out of range")]
    ChannelOutOfRange(u8),
    /// Conversion did not complete.
    #[error("conversion failed on channel {0}")]
    ConversionFailed(u8),
}

/// Digital output bank (relay drivers).
pub trait DigitalOutput: Send + Sync {
    /// Drive `channel` to `level`.
    fn write(&self, channel: u8, level: bool) -> Result<(), PortError>;

    /// Read back the commanded level of `channel`.
    fn read_back(&self, channel: u8) -> Result<bool, PortError>;
}

/// Analog input bank (12-bit ADC).
///
/// Conversions are synchronous: the value is available when `read` returns.
pub trait AnalogInput: Send + Sync {
    /// Sample `channel`. Returns the raw 12-bit value (0..=4095).
    fn read(&self, channel: u8) -> Result<u16, PortError>;
}
