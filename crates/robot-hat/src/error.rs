//! Error types for the robot hat library.
//!
//! Every fallible operation in the crate returns [`HatError`]. Transport
//! failures coming back from a [`RegisterBus`](crate::bus::RegisterBus) are
//! wrapped without being interpreted, so the bus error stays reachable
//! through [`std::error::Error::source`].

use thiserror::Error;

/// Boxed error produced by a register bus implementation.
pub type BusError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while configuring the board.
#[derive(Debug, Error)]
pub enum HatError {
    /// A PWM or ADC channel was outside its valid range or could not be parsed.
    #[error("invalid channel {value:?}: expected {expected}")]
    InvalidChannel {
        /// The rejected input, as given.
        value: String,
        /// Human readable description of the accepted range.
        expected: &'static str,
    },

    /// A pin name or BCM number is not in the board's pin table.
    #[error("invalid pin {0:?}")]
    InvalidPin(String),

    /// A register value does not fit the 16-bit register width.
    #[error("{register} value {value} does not fit the register (allowed {min}..={max})")]
    InvalidRange {
        /// Which register the value was meant for.
        register: &'static str,
        /// The rejected value after rounding.
        value: f64,
        /// Smallest accepted value.
        min: u32,
        /// Largest accepted value.
        max: u32,
    },

    /// A requested frequency was zero, negative or not finite.
    #[error("invalid frequency {0} Hz: must be positive and finite")]
    InvalidFrequency(f64),

    /// The grayscale reference must hold exactly three values.
    #[error("grayscale reference must have 3 values, got {0}")]
    InvalidReference(usize),

    /// A color string could not be parsed as `#rrggbb`.
    #[error("invalid color {0:?}")]
    InvalidColor(String),

    /// The injected register bus failed. The source is passed through unchanged.
    #[error("register bus write to 0x{address:02X} failed")]
    Transport {
        /// Register address of the failed write.
        address: u8,
        /// The error reported by the bus.
        #[source]
        source: BusError,
    },

    /// Reading or writing the fileDB backing file failed.
    #[error("file database {path:?}: {source}")]
    Io {
        /// Path of the backing file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl HatError {
    pub(crate) fn invalid_channel(value: impl ToString, expected: &'static str) -> Self {
        HatError::InvalidChannel {
            value: value.to_string(),
            expected,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HatError>;
