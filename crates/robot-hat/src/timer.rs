//! Shared timer table.
//!
//! The board MCU drives its 20 PWM outputs from 7 hardware timers. Every
//! channel on the same timer shares one prescaler and one period, so a change
//! made through one channel is seen by all of its neighbours. [`TimerBank`]
//! holds that shared state; channels get a handle to it instead of reaching
//! for a global.

use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Number of hardware timers on the board.
pub const TIMER_COUNT: usize = 7;

/// Prescaler register prefix for timers 0-3.
pub const REG_PSC: u8 = 0x40;
/// Period register prefix for timers 0-3.
pub const REG_ARR: u8 = 0x44;
/// Prescaler register prefix for timers 4-6.
pub const REG_PSC2: u8 = 0x50;
/// Period register prefix for timers 4-6.
pub const REG_ARR2: u8 = 0x54;

/// Index of the hardware timer that serves a PWM channel.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerGroup(u8);

impl TimerGroup {
    /// Timer serving PWM channel `channel` (0-19).
    ///
    /// Channels 0-15 are grouped four to a timer, 16 and 17 share timer 4,
    /// 18 and 19 each have a timer of their own.
    pub const fn for_channel(channel: u8) -> Self {
        match channel {
            0..=15 => TimerGroup(channel / 4),
            16 | 17 => TimerGroup(4),
            18 => TimerGroup(5),
            _ => TimerGroup(6),
        }
    }

    /// Position of this timer in the [`TimerBank`].
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Address of this timer's prescaler register.
    pub const fn prescaler_register(self) -> u8 {
        if self.0 < 4 {
            REG_PSC + self.0
        } else {
            REG_PSC2 + self.0 - 4
        }
    }

    /// Address of this timer's period (auto-reload) register.
    pub const fn period_register(self) -> u8 {
        if self.0 < 4 {
            REG_ARR + self.0
        } else {
            REG_ARR2 + self.0 - 4
        }
    }
}

/// Prescaler and period currently programmed into one timer.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSlot {
    /// Clock divider applied before the timer counts.
    pub prescaler: u16,
    /// Count at which the timer wraps.
    pub period: u16,
}

impl Default for TimerSlot {
    fn default() -> Self {
        TimerSlot {
            prescaler: 1,
            period: 1,
        }
    }
}

/// The 7 timer slots of one board, each behind its own lock.
#[derive(Debug, Default)]
pub struct TimerBank {
    slots: [Mutex<TimerSlot>; TIMER_COUNT],
}

impl TimerBank {
    /// A bank with every timer at prescaler 1, period 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one timer.
    pub fn slot(&self, group: TimerGroup) -> TimerSlot {
        *self.slots[group.index()].lock()
    }

    /// Snapshot of every timer, in index order.
    pub fn snapshot(&self) -> [TimerSlot; TIMER_COUNT] {
        std::array::from_fn(|i| *self.slots[i].lock())
    }

    /// Exclusive access to one timer for a read-modify-write.
    pub(crate) fn lock(&self, group: TimerGroup) -> MutexGuard<'_, TimerSlot> {
        self.slots[group.index()].lock()
    }
}

/// Shared handle to a timer bank.
pub type SharedTimerBank = Arc<TimerBank>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_to_group_mapping() {
        let expected = [
            0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 5, 6,
        ];
        for (channel, group) in expected.iter().enumerate() {
            assert_eq!(
                TimerGroup::for_channel(channel as u8).index(),
                *group,
                "channel {channel}"
            );
        }
    }

    #[test]
    fn test_register_addresses() {
        assert_eq!(TimerGroup::for_channel(0).prescaler_register(), 0x40);
        assert_eq!(TimerGroup::for_channel(13).prescaler_register(), 0x43);
        assert_eq!(TimerGroup::for_channel(13).period_register(), 0x47);
        assert_eq!(TimerGroup::for_channel(16).prescaler_register(), 0x50);
        assert_eq!(TimerGroup::for_channel(17).period_register(), 0x54);
        assert_eq!(TimerGroup::for_channel(18).prescaler_register(), 0x51);
        assert_eq!(TimerGroup::for_channel(19).period_register(), 0x56);
    }

    #[test]
    fn test_bank_defaults_and_isolation() {
        let bank = TimerBank::new();
        assert!(bank.snapshot().iter().all(|s| *s == TimerSlot::default()));

        bank.lock(TimerGroup::for_channel(4)).period = 300;
        assert_eq!(bank.slot(TimerGroup::for_channel(5)).period, 300);
        assert_eq!(bank.slot(TimerGroup::for_channel(0)).period, 1);

        // A second bank does not see the first one's state.
        let other = TimerBank::new();
        assert_eq!(other.slot(TimerGroup::for_channel(4)).period, 1);
    }
}
