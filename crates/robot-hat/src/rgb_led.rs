//! Three-pin RGB LED on PWM channels.

use std::str::FromStr;

use crate::error::{HatError, Result};
use crate::pwm::Pwm;

/// Which LED terminal is shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Common {
    /// Shared anode: a channel at 100% duty is off.
    #[default]
    Anode,
    /// Shared cathode: a channel at 100% duty is fully on.
    Cathode,
}

/// An 8-bit-per-component color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
}

impl Rgb {
    /// Build a color from components.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }
}

impl From<u32> for Rgb {
    /// Take the low 24 bits as `0xRRGGBB`.
    fn from(value: u32) -> Self {
        let [_, r, g, b] = value.to_be_bytes();
        Rgb { r, g, b }
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Rgb { r, g, b }
    }
}

impl FromStr for Rgb {
    type Err = HatError;

    /// Parse a hex color, with or without a leading `#`.
    fn from_str(s: &str) -> Result<Self> {
        let hex = s.trim().trim_start_matches('#');
        if hex.is_empty() || hex.len() > 6 {
            return Err(HatError::InvalidColor(s.to_string()));
        }
        u32::from_str_radix(hex, 16)
            .map(Rgb::from)
            .map_err(|_| HatError::InvalidColor(s.to_string()))
    }
}

/// An RGB LED with one PWM channel per component.
#[derive(Debug)]
pub struct RgbLed {
    r: Pwm,
    g: Pwm,
    b: Pwm,
    common: Common,
}

impl RgbLed {
    /// Wrap three PWM channels.
    pub fn new(r: Pwm, g: Pwm, b: Pwm, common: Common) -> Self {
        RgbLed { r, g, b, common }
    }

    /// Show `color`.
    pub fn color(&mut self, color: impl Into<Rgb>) -> Result<()> {
        let Rgb { r, g, b } = color.into();
        let invert = |c: u8| match self.common {
            Common::Anode => 255 - c,
            Common::Cathode => c,
        };
        let percent = |c: u8| f64::from(c) / 255.0 * 100.0;

        let (r, g, b) = (percent(invert(r)), percent(invert(g)), percent(invert(b)));
        self.r.set_pulse_width_percent(r)?;
        self.g.set_pulse_width_percent(g)?;
        self.b.set_pulse_width_percent(b)
    }

    /// Show a color given as a hex string such as `"#ff8800"`.
    pub fn color_hex(&mut self, color: &str) -> Result<()> {
        self.color(color.parse::<Rgb>()?)
    }

    /// Turn every component off.
    pub fn off(&mut self) -> Result<()> {
        self.color(Rgb::default())
    }

    /// The red, green and blue channels.
    pub fn channels(&self) -> [&Pwm; 3] {
        [&self.r, &self.g, &self.b]
    }
}
