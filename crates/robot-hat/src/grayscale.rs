//! Three-channel grayscale (line following) module.

use crate::adc::Adc;
use crate::error::{HatError, Result};

/// Reference used when none is given.
pub const REFERENCE_DEFAULT: [u16; 3] = [1000; 3];

/// Position of a sensor on the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Left sensor.
    Left = 0,
    /// Middle sensor.
    Middle = 1,
    /// Right sensor.
    Right = 2,
}

/// What a sensor sees relative to its reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStatus {
    /// Reading above the reference.
    White = 0,
    /// Reading at or below the reference.
    Black = 1,
}

/// Grayscale module on three ADC channels.
#[derive(Debug)]
pub struct GrayscaleModule {
    adcs: [Adc; 3],
    reference: [u16; 3],
}

impl GrayscaleModule {
    /// Build a module from its left, middle and right ADC channels.
    pub fn new(adcs: [Adc; 3], reference: Option<[u16; 3]>) -> Self {
        GrayscaleModule {
            adcs,
            reference: reference.unwrap_or(REFERENCE_DEFAULT),
        }
    }

    /// Per-channel black/white threshold.
    pub fn reference(&self) -> [u16; 3] {
        self.reference
    }

    /// Replace the threshold. Exactly three values are required.
    pub fn set_reference(&mut self, reference: &[u16]) -> Result<()> {
        self.reference = reference
            .try_into()
            .map_err(|_| HatError::InvalidReference(reference.len()))?;
        Ok(())
    }

    /// Read one sensor.
    pub fn read_channel(&self, side: Side) -> u16 {
        self.adcs[side as usize].read()
    }

    /// Read all three sensors, left to right.
    pub fn read(&self) -> [u16; 3] {
        [Side::Left, Side::Middle, Side::Right].map(|side| self.read_channel(side))
    }

    /// Classify `data` (or a fresh reading) against the reference.
    pub fn read_status(&self, data: Option<[u16; 3]>) -> [LineStatus; 3] {
        let data = data.unwrap_or_else(|| self.read());
        std::array::from_fn(|i| {
            if data[i] > self.reference[i] {
                LineStatus::White
            } else {
                LineStatus::Black
            }
        })
    }
}
