//! Board handle tying the shared timer table to a register bus.

use std::sync::Arc;

use crate::bus::{RegisterBus, SharedBus};
use crate::timer::{SharedTimerBank, TimerBank};

/// One robot hat: the bus its registers are written through and the timer
/// table its PWM channels share.
///
/// Cloning a `Board` is cheap and yields a handle to the same board.
#[derive(Clone)]
pub struct Board {
    bus: SharedBus,
    timers: SharedTimerBank,
}

impl Board {
    /// Create a board that writes its registers through `bus`.
    pub fn new(bus: impl RegisterBus + 'static) -> Self {
        Self::with_shared_bus(Arc::new(bus))
    }

    /// Create a board from an already shared bus, e.g. to keep a handle to a
    /// [`RecordingBus`](crate::bus::RecordingBus) for inspection.
    pub fn with_shared_bus(bus: SharedBus) -> Self {
        Board {
            bus,
            timers: Arc::new(TimerBank::new()),
        }
    }

    /// The register bus of this board.
    pub fn bus(&self) -> &SharedBus {
        &self.bus
    }

    /// The shared timer table of this board.
    pub fn timers(&self) -> &SharedTimerBank {
        &self.timers
    }
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("timers", &self.timers)
            .finish_non_exhaustive()
    }
}
