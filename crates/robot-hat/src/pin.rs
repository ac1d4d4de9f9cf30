//! GPIO pins.
//!
//! Pins are named after the board silkscreen (`"D0"`, `"MCURST"`, ...) and map
//! onto Raspberry Pi BCM numbers. There is no GPIO backend: a pin remembers
//! the level last written to it and reports that level back.

use std::fmt;
use tracing::{debug, info};

use crate::error::{HatError, Result};

/// Board pin names and their BCM numbers.
///
/// Several names share a BCM number; looking a pin up by number picks every
/// name that maps to it.
pub const PIN_TABLE: &[(&str, u8)] = &[
    ("D0", 17),
    ("D1", 4),
    ("D2", 27),
    ("D3", 22),
    ("D4", 23),
    ("D5", 24),
    ("D6", 25),
    ("D7", 4),
    ("D8", 5),
    ("D9", 6),
    ("D10", 12),
    ("D11", 13),
    ("D12", 19),
    ("D13", 16),
    ("D14", 26),
    ("D15", 20),
    ("D16", 21),
    ("SW", 25),
    ("USER", 25),
    ("LED", 26),
    ("BOARD_TYPE", 12),
    ("RST", 16),
    ("BLEINT", 13),
    ("BLERST", 20),
    ("MCURST", 5),
    ("CE", 8),
];

/// Direction of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Driven by the board.
    Out,
    /// Sampled by the board.
    In,
}

/// Internal pull resistor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pull {
    /// No pull resistor.
    #[default]
    None,
    /// Pull up to 3.3 V.
    Up,
    /// Pull down to ground.
    Down,
}

/// Edge(s) an interrupt fires on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// High to low.
    Falling,
    /// Low to high.
    Rising,
    /// Either edge.
    RisingFalling,
}

/// Interrupt configuration recorded by [`Pin::irq`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrqConfig {
    /// Edge(s) to fire on.
    pub trigger: Trigger,
    /// Debounce time in milliseconds.
    pub bouncetime_ms: u32,
}

/// A GPIO pin.
#[derive(Debug, Clone)]
pub struct Pin {
    bcm: u8,
    names: Vec<&'static str>,
    mode: Option<Mode>,
    pull: Pull,
    level: bool,
    irq: Option<IrqConfig>,
}

impl Pin {
    /// Open a pin by board name, e.g. `"D4"` or `"MCURST"`.
    pub fn new(name: &str) -> Result<Self> {
        let (name, bcm) = PIN_TABLE
            .iter()
            .find(|(n, _)| *n == name)
            .copied()
            .ok_or_else(|| HatError::InvalidPin(name.to_string()))?;
        Ok(Self::open(bcm, vec![name]))
    }

    /// Open a pin by BCM number. The number must appear in [`PIN_TABLE`].
    pub fn from_bcm(bcm: u8) -> Result<Self> {
        let names: Vec<_> = PIN_TABLE
            .iter()
            .filter(|(_, b)| *b == bcm)
            .map(|(n, _)| *n)
            .collect();
        if names.is_empty() {
            return Err(HatError::InvalidPin(bcm.to_string()));
        }
        Ok(Self::open(bcm, names))
    }

    fn open(bcm: u8, names: Vec<&'static str>) -> Self {
        let pin = Pin {
            bcm,
            names,
            mode: None,
            pull: Pull::None,
            level: false,
            irq: None,
        };
        info!(pin = %pin.name(), "pin init finished");
        pin
    }

    /// Set direction and pull resistor.
    pub fn setup(&mut self, mode: Option<Mode>, pull: Pull) {
        self.mode = mode;
        self.pull = pull;
    }

    /// Builder form of [`setup`](Self::setup).
    pub fn with_setup(mut self, mode: Option<Mode>, pull: Pull) -> Self {
        self.setup(mode, pull);
        self
    }

    /// BCM number of this pin.
    pub fn bcm(&self) -> u8 {
        self.bcm
    }

    /// Board names mapping to this pin.
    pub fn board_names(&self) -> &[&'static str] {
        &self.names
    }

    /// `"GPIO<n>"`.
    pub fn name(&self) -> String {
        format!("GPIO{}", self.bcm)
    }

    /// Current direction, if one was set.
    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    /// Current pull resistor.
    pub fn pull(&self) -> Pull {
        self.pull
    }

    /// Level last driven or read, leaving the mode as it is.
    pub fn level(&self) -> bool {
        self.level
    }

    /// Read the pin. An output (or unconfigured) pin is switched to input first.
    pub fn value(&mut self) -> bool {
        if self.mode != Some(Mode::In) {
            self.setup(Some(Mode::In), self.pull);
        }
        debug!(pin = %self.name(), level = self.level, "read pin");
        self.level
    }

    /// Drive the pin. An input pin is switched to output first.
    pub fn set_value(&mut self, level: bool) -> bool {
        if self.mode == Some(Mode::In) {
            self.setup(Some(Mode::Out), self.pull);
        }
        self.level = level;
        level
    }

    /// Drive high.
    pub fn on(&mut self) -> bool {
        self.set_value(true)
    }

    /// Drive low.
    pub fn off(&mut self) -> bool {
        self.set_value(false)
    }

    /// Alias of [`on`](Self::on).
    pub fn high(&mut self) -> bool {
        self.on()
    }

    /// Alias of [`off`](Self::off).
    pub fn low(&mut self) -> bool {
        self.off()
    }

    /// Configure an interrupt. Only the configuration is recorded; nothing
    /// services it.
    pub fn irq(&mut self, trigger: Trigger, bouncetime_ms: u32, pull: Pull) {
        self.pull = pull;
        self.irq = Some(IrqConfig {
            trigger,
            bouncetime_ms,
        });
    }

    /// Interrupt configuration, if [`irq`](Self::irq) was called.
    pub fn irq_config(&self) -> Option<IrqConfig> {
        self.irq
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPIO{}", self.bcm)
    }
}
