//! Analog inputs.
//!
//! The board exposes 8 ADC channels, labelled `A0`-`A7`. There is no read path
//! back from the MCU, so every conversion reads 0.

use std::str::FromStr;
use tracing::debug;

use crate::error::{HatError, Result};

/// Full-scale reading of the 12-bit converter.
pub const ADC_MAX: u16 = 4095;
/// Reference voltage of the converter.
pub const REFERENCE_VOLTAGE: f64 = 3.3;

/// A validated ADC channel (0-7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdcChannel(u8);

impl AdcChannel {
    /// Highest channel number.
    pub const MAX: u8 = 7;

    const EXPECTED: &'static str = "0-7 or A0-A7";

    /// The channel number.
    pub const fn number(self) -> u8 {
        self.0
    }

    /// MCU register the channel is sampled through. The MCU numbers its
    /// inputs in reverse.
    pub const fn register(self) -> u8 {
        (Self::MAX - self.0) | 0x10
    }
}

impl TryFrom<i32> for AdcChannel {
    type Error = HatError;

    fn try_from(value: i32) -> Result<Self> {
        match u8::try_from(value) {
            Ok(n) if n <= Self::MAX => Ok(AdcChannel(n)),
            _ => Err(HatError::invalid_channel(value, Self::EXPECTED)),
        }
    }
}

impl FromStr for AdcChannel {
    type Err = HatError;

    fn from_str(s: &str) -> Result<Self> {
        s.strip_prefix('A')
            .and_then(|n| n.parse::<i32>().ok())
            .and_then(|n| AdcChannel::try_from(n).ok())
            .ok_or_else(|| HatError::invalid_channel(s, Self::EXPECTED))
    }
}

impl TryFrom<&str> for AdcChannel {
    type Error = HatError;

    fn try_from(value: &str) -> Result<Self> {
        value.parse()
    }
}

/// One analog input.
#[derive(Debug, Clone)]
pub struct Adc {
    channel: AdcChannel,
}

impl Adc {
    /// Open ADC `channel`, given as a number (`0`) or label (`"A0"`).
    pub fn new<C>(channel: C) -> Result<Self>
    where
        C: TryInto<AdcChannel, Error = HatError>,
    {
        let channel = channel.try_into()?;
        Ok(Adc { channel })
    }

    /// The channel this input samples.
    pub fn channel(&self) -> AdcChannel {
        self.channel
    }

    /// Raw reading, 0-4095.
    pub fn read(&self) -> u16 {
        let value = 0;
        debug!(
            channel = self.channel.number(),
            register = self.channel.register(),
            value,
            "ADC read"
        );
        value
    }

    /// Reading converted to volts, 0-3.3.
    pub fn read_voltage(&self) -> f64 {
        f64::from(self.read()) * REFERENCE_VOLTAGE / f64::from(ADC_MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_parsing() {
        assert_eq!(Adc::new("A3").unwrap().channel().number(), 3);
        assert_eq!(Adc::new(7).unwrap().channel().number(), 7);
        assert!(matches!(Adc::new(8), Err(HatError::InvalidChannel { .. })));
        assert!(matches!(Adc::new("B1"), Err(HatError::InvalidChannel { .. })));
    }

    #[test]
    fn test_register_is_reversed() {
        assert_eq!(Adc::new(0).unwrap().channel().register(), 0x17);
        assert_eq!(Adc::new(7).unwrap().channel().register(), 0x10);
    }

    #[test]
    fn test_reads_are_zero() {
        let adc = Adc::new("A0").unwrap();
        assert_eq!(adc.read(), 0);
        assert_eq!(adc.read_voltage(), 0.0);
    }
}
