//! Register bus port.
//!
//! The board's MCU is configured by writing 16-bit values to 8-bit register
//! addresses. The library never talks to a transport directly: every write
//! goes through a [`RegisterBus`] handed in by the caller.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

use crate::error::{BusError, HatError, Result};

/// I2C addresses the board MCU may answer on.
pub const MCU_ADDRESSES: [u8; 3] = [0x14, 0x15, 0x16];

/// A single register write request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterWrite {
    /// Register address.
    pub address: u8,
    /// Value written to the register.
    pub value: u16,
}

/// Sink for register writes.
///
/// Implementations may fail; the error is handed back to whoever triggered
/// the write without retrying.
pub trait RegisterBus: Send + Sync {
    /// Write `value` to the register at `address`.
    fn write(&self, address: u8, value: u16) -> std::result::Result<(), BusError>;
}

/// Shared handle to a register bus.
pub type SharedBus = Arc<dyn RegisterBus>;

/// Forward a write to `bus`, wrapping a failure in [`HatError::Transport`].
pub(crate) fn write_register(bus: &dyn RegisterBus, address: u8, value: u16) -> Result<()> {
    bus.write(address, value)
        .map_err(|source| HatError::Transport { address, source })
}

/// Bus that accepts and discards every write.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBus;

impl RegisterBus for NullBus {
    fn write(&self, _address: u8, _value: u16) -> std::result::Result<(), BusError> {
        Ok(())
    }
}

/// Bus that logs every write at debug level and otherwise does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingBus;

impl RegisterBus for TracingBus {
    fn write(&self, address: u8, value: u16) -> std::result::Result<(), BusError> {
        let [high, low] = value.to_be_bytes();
        debug!(address, value, high, low, "register write");
        Ok(())
    }
}

/// Bus that keeps every write in order, for inspection.
#[derive(Debug, Default)]
pub struct RecordingBus {
    writes: Mutex<Vec<RegisterWrite>>,
}

impl RecordingBus {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all writes seen so far.
    pub fn writes(&self) -> Vec<RegisterWrite> {
        self.writes.lock().clone()
    }

    /// The most recent write, if any.
    pub fn last(&self) -> Option<RegisterWrite> {
        self.writes.lock().last().copied()
    }

    /// Remove and return all writes seen so far.
    pub fn take(&self) -> Vec<RegisterWrite> {
        std::mem::take(&mut *self.writes.lock())
    }
}

impl RegisterBus for RecordingBus {
    fn write(&self, address: u8, value: u16) -> std::result::Result<(), BusError> {
        self.writes.lock().push(RegisterWrite { address, value });
        Ok(())
    }
}
