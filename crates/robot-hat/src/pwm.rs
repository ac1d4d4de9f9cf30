//! PWM channels and the frequency resolver.
//!
//! A PWM output frequency is set by two integers: the prescaler dividing the
//! 72 MHz reference clock and the period the timer counts to. For a requested
//! frequency [`resolve_frequency`] searches a small window of prescalers around
//! `sqrt(clock / freq)` and keeps the pair with the smallest frequency error.
//!
//! Prescaler and period live in the board's [`TimerBank`](crate::timer::TimerBank)
//! and are shared by every channel on the same timer. The pulse width belongs
//! to the channel alone.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::board::Board;
use crate::bus::{SharedBus, write_register};
use crate::error::{HatError, Result};
use crate::timer::{SharedTimerBank, TimerGroup, TimerSlot};

/// Reference clock of the board's timers, in Hz.
pub const CLOCK_HZ: f64 = 72_000_000.0;

/// Frequency every channel resolves when it is created, in Hz.
pub const DEFAULT_FREQUENCY_HZ: f64 = 50.0;

/// Duty (pulse width) register prefix.
pub const REG_CHN: u8 = 0x20;

/// Largest value a 16-bit timer register can hold.
pub const REGISTER_MAX: u32 = u16::MAX as u32;

// Search window: SEARCH_WIDTH prescalers starting SEARCH_BACKOFF below the seed.
const SEARCH_BACKOFF: i64 = 5;
const SEARCH_WIDTH: u64 = 10;

/// A validated PWM channel number (0-19).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PwmChannel(u8);

impl PwmChannel {
    /// Highest channel number on the board.
    pub const MAX: u8 = 19;

    const EXPECTED: &'static str = "0-19 or P0-P19";

    /// The channel number.
    pub const fn number(self) -> u8 {
        self.0
    }

    /// The timer serving this channel.
    pub const fn timer(self) -> TimerGroup {
        TimerGroup::for_channel(self.0)
    }

    /// Address of this channel's duty register.
    pub const fn duty_register(self) -> u8 {
        REG_CHN + self.0
    }
}

impl TryFrom<i32> for PwmChannel {
    type Error = HatError;

    fn try_from(value: i32) -> Result<Self> {
        match u8::try_from(value) {
            Ok(n) if n <= Self::MAX => Ok(PwmChannel(n)),
            _ => Err(HatError::invalid_channel(value, Self::EXPECTED)),
        }
    }
}

impl FromStr for PwmChannel {
    type Err = HatError;

    fn from_str(s: &str) -> Result<Self> {
        let number = s
            .strip_prefix('P')
            .and_then(|n| n.parse::<i32>().ok())
            .ok_or_else(|| HatError::invalid_channel(s, Self::EXPECTED))?;
        PwmChannel::try_from(number).map_err(|_| HatError::invalid_channel(s, Self::EXPECTED))
    }
}

impl TryFrom<&str> for PwmChannel {
    type Error = HatError;

    fn try_from(value: &str) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for PwmChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Prescaler/period pair chosen for a requested frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    /// Clock divider.
    pub prescaler: u64,
    /// Timer period (auto-reload value).
    pub period: u64,
    /// Absolute difference between the requested and achieved frequency, in Hz.
    pub error: f64,
}

impl Resolution {
    /// Output frequency produced by this pair on `clock`.
    pub fn frequency(&self, clock: f64) -> f64 {
        clock / (self.prescaler as f64 * self.period as f64)
    }
}

/// Find the prescaler/period pair that best reproduces `freq` on `clock`.
///
/// Ten consecutive prescalers are tried, starting five below
/// `floor(sqrt(clock / freq))` (but never below 1). For each the period is
/// `floor(clock / freq / prescaler)`. The pair with the smallest absolute
/// frequency error wins; on a tie the smaller prescaler is kept.
///
/// A candidate whose period comes out as zero has an infinite error. The
/// returned values are not checked against the register width.
///
/// # Errors
///
/// Returns [`HatError::InvalidFrequency`] if `freq` is not positive and finite.
pub fn resolve_frequency(clock: f64, freq: f64) -> Result<Resolution> {
    if !(freq.is_finite() && freq > 0.0) {
        return Err(HatError::InvalidFrequency(freq));
    }

    let seed = (clock / freq).sqrt().floor() as i64;
    let start = (seed - SEARCH_BACKOFF).max(1) as u64;

    let candidate = |prescaler: u64| {
        let period = (clock / freq / prescaler as f64).floor() as u64;
        let error = (freq - clock / (prescaler as f64 * period as f64)).abs();
        Resolution {
            prescaler,
            period,
            error,
        }
    };

    let best = (start + 1..start + SEARCH_WIDTH)
        .map(candidate)
        .fold(candidate(start), |best, next| {
            if next.error < best.error { next } else { best }
        });
    Ok(best)
}

/// Round `value` half to even and check it fits `min..=REGISTER_MAX`.
fn register_value(register: &'static str, value: f64, min: u32) -> Result<u16> {
    let rounded = value.round_ties_even();
    if !(rounded >= min as f64 && rounded <= REGISTER_MAX as f64) {
        return Err(HatError::InvalidRange {
            register,
            value: rounded,
            min,
            max: REGISTER_MAX,
        });
    }
    Ok(rounded as u16)
}

/// One PWM output of the board.
pub struct Pwm {
    channel: PwmChannel,
    timer: TimerGroup,
    timers: SharedTimerBank,
    bus: SharedBus,
    frequency: f64,
    pulse_width: u16,
    pulse_width_percent: f64,
}

impl Pwm {
    /// Open PWM `channel` on `board` and resolve the default 50 Hz.
    ///
    /// `channel` may be a number (`3`) or a board label (`"P3"`).
    ///
    /// # Errors
    ///
    /// Returns [`HatError::InvalidChannel`] for anything outside 0-19, and
    /// propagates bus failures from the initial frequency setup.
    pub fn new<C>(channel: C, board: &Board) -> Result<Self>
    where
        C: TryInto<PwmChannel, Error = HatError>,
    {
        let channel = channel.try_into()?;
        let mut pwm = Pwm {
            channel,
            timer: channel.timer(),
            timers: board.timers().clone(),
            bus: board.bus().clone(),
            frequency: DEFAULT_FREQUENCY_HZ,
            pulse_width: 0,
            pulse_width_percent: 0.0,
        };
        pwm.set_frequency(DEFAULT_FREQUENCY_HZ)?;
        debug!(%channel, timer = pwm.timer.index(), "PWM channel ready");
        Ok(pwm)
    }

    /// The channel this output drives.
    pub fn channel(&self) -> PwmChannel {
        self.channel
    }

    /// The timer this output shares with its neighbours.
    pub fn timer(&self) -> TimerGroup {
        self.timer
    }

    /// Output frequency as of the last prescaler, period or frequency change.
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Resolve `freq` into a prescaler and period and program both.
    ///
    /// The prescaler is written before the period. Afterwards
    /// [`frequency`](Self::frequency) reports what the pair actually produces,
    /// which is not necessarily `freq`.
    ///
    /// # Errors
    ///
    /// [`HatError::InvalidFrequency`] for a non-positive `freq`,
    /// [`HatError::InvalidRange`] if the resolved pair does not fit the
    /// registers (nothing is written in that case), or a bus error.
    pub fn set_frequency(&mut self, freq: f64) -> Result<()> {
        let resolution = resolve_frequency(CLOCK_HZ, freq)?;
        let prescaler = register_value("prescaler", resolution.prescaler as f64, 1)?;
        let period = register_value("period", resolution.period as f64, 1)?;
        debug!(
            channel = %self.channel,
            freq,
            prescaler,
            period,
            error = resolution.error,
            "resolved frequency"
        );
        // One guard for both writes so a concurrent change on the same timer
        // cannot land between them.
        let timers = Arc::clone(&self.timers);
        let mut slot = timers.lock(self.timer);
        self.store_prescaler(&mut slot, prescaler)?;
        self.store_period(&mut slot, period)
    }

    /// Prescaler of this output's timer.
    pub fn prescaler(&self) -> u16 {
        self.timers.slot(self.timer).prescaler
    }

    /// Set the prescaler of this output's timer.
    ///
    /// The frequency is recomputed with the period currently on the timer.
    /// The register receives `prescaler - 1`, as the MCU counts from zero.
    pub fn set_prescaler(&mut self, prescaler: f64) -> Result<()> {
        let prescaler = register_value("prescaler", prescaler, 1)?;
        let timers = Arc::clone(&self.timers);
        let mut slot = timers.lock(self.timer);
        self.store_prescaler(&mut slot, prescaler)
    }

    /// Period of this output's timer.
    pub fn period(&self) -> u16 {
        self.timers.slot(self.timer).period
    }

    /// Set the period of this output's timer.
    ///
    /// Every channel on the same timer sees the new period.
    pub fn set_period(&mut self, period: f64) -> Result<()> {
        let period = register_value("period", period, 1)?;
        let timers = Arc::clone(&self.timers);
        let mut slot = timers.lock(self.timer);
        self.store_period(&mut slot, period)
    }

    // The slot is updated even if the register write then fails.
    fn store_prescaler(&mut self, slot: &mut TimerSlot, prescaler: u16) -> Result<()> {
        slot.prescaler = prescaler;
        self.frequency = CLOCK_HZ / f64::from(prescaler) / f64::from(slot.period);
        debug!(channel = %self.channel, prescaler, "set prescaler");
        write_register(&*self.bus, self.timer.prescaler_register(), prescaler - 1)
    }

    fn store_period(&mut self, slot: &mut TimerSlot, period: u16) -> Result<()> {
        slot.period = period;
        self.frequency = CLOCK_HZ / f64::from(slot.prescaler) / f64::from(period);
        debug!(channel = %self.channel, period, "set period");
        write_register(&*self.bus, self.timer.period_register(), period)
    }

    /// Last pulse width written to this channel.
    pub fn pulse_width(&self) -> u16 {
        self.pulse_width
    }

    /// Write an absolute pulse width (duty count).
    pub fn set_pulse_width(&mut self, pulse_width: f64) -> Result<()> {
        let pulse_width = register_value("pulse width", pulse_width, 0)?;
        let period = self.period();
        if pulse_width > period {
            warn!(channel = %self.channel, pulse_width, period, "pulse width exceeds period");
        }
        self.pulse_width = pulse_width;
        write_register(&*self.bus, self.channel.duty_register(), pulse_width)
    }

    /// Last percentage passed to [`set_pulse_width_percent`](Self::set_pulse_width_percent).
    pub fn pulse_width_percent(&self) -> f64 {
        self.pulse_width_percent
    }

    /// Write the pulse width as a percentage of the timer period.
    ///
    /// `percent` is not clamped; keeping it in 0-100 is up to the caller.
    pub fn set_pulse_width_percent(&mut self, percent: f64) -> Result<()> {
        self.pulse_width_percent = percent;
        let pulse_width = percent / 100.0 * f64::from(self.period());
        self.set_pulse_width(pulse_width)
    }
}

impl fmt::Debug for Pwm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pwm")
            .field("channel", &self.channel)
            .field("timer", &self.timer)
            .field("frequency", &self.frequency)
            .field("pulse_width", &self.pulse_width)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{RecordingBus, RegisterBus, RegisterWrite};
    use crate::error::BusError;
    use std::error::Error as _;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    const EPSILON: f64 = 1e-9;

    /// Accepts every write after a short delay, like a real I2C transfer.
    struct SlowBus;

    impl RegisterBus for SlowBus {
        fn write(&self, _address: u8, _value: u16) -> std::result::Result<(), BusError> {
            std::thread::sleep(Duration::from_micros(100));
            Ok(())
        }
    }

    #[derive(Default)]
    struct FlakyBus {
        failing: AtomicBool,
    }

    impl RegisterBus for FlakyBus {
        fn write(&self, _address: u8, _value: u16) -> std::result::Result<(), BusError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err("bus down".into());
            }
            Ok(())
        }
    }

    fn recording_board() -> (Arc<RecordingBus>, Board) {
        let bus = Arc::new(RecordingBus::new());
        let board = Board::with_shared_bus(bus.clone());
        (bus, board)
    }

    #[test]
    fn test_resolve_50hz_baseline() {
        let resolution = resolve_frequency(CLOCK_HZ, 50.0).unwrap();
        assert_eq!(resolution.prescaler, 1200);
        assert_eq!(resolution.period, 1200);
        assert!(resolution.error < EPSILON);
        assert!((resolution.frequency(CLOCK_HZ) - 50.0).abs() < EPSILON);
    }

    #[test]
    fn test_resolve_is_minimal_within_window() {
        for freq in (1..=5000).step_by(7).map(f64::from) {
            let resolution = resolve_frequency(CLOCK_HZ, freq).unwrap();
            let seed = (CLOCK_HZ / freq).sqrt().floor() as i64;
            let start = (seed - 5).max(1) as u64;
            for psc in start..start + 10 {
                let arr = (CLOCK_HZ / freq / psc as f64).floor();
                let error = (freq - CLOCK_HZ / (psc as f64 * arr)).abs();
                assert!(
                    resolution.error <= error,
                    "freq {freq}: psc {psc} beats chosen {resolution:?}"
                );
            }
        }
    }

    #[test]
    fn test_resolve_clamps_search_start_to_one() {
        // sqrt(7.2) is below 5, so the window starts at prescaler 1.
        let resolution = resolve_frequency(CLOCK_HZ, 10_000_000.0).unwrap();
        assert_eq!(resolution.prescaler, 1);
        assert_eq!(resolution.period, 7);
    }

    #[test]
    fn test_resolve_rejects_bad_frequency() {
        for freq in [0.0, -50.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                resolve_frequency(CLOCK_HZ, freq),
                Err(HatError::InvalidFrequency(_))
            ));
        }
    }

    #[test]
    fn test_new_resolves_default_frequency() {
        let (bus, board) = recording_board();
        let pwm = Pwm::new(0, &board).unwrap();
        assert_eq!(pwm.prescaler(), 1200);
        assert_eq!(pwm.period(), 1200);
        assert!((pwm.frequency() - 50.0).abs() < EPSILON);
        assert_eq!(
            bus.writes(),
            vec![
                RegisterWrite { address: 0x40, value: 1199 },
                RegisterWrite { address: 0x44, value: 1200 },
            ]
        );
    }

    #[test]
    fn test_invalid_channels() {
        let board = Board::new(crate::bus::NullBus);
        assert!(matches!(Pwm::new(20, &board), Err(HatError::InvalidChannel { .. })));
        assert!(matches!(Pwm::new(-1, &board), Err(HatError::InvalidChannel { .. })));
        assert!(matches!(Pwm::new("Q3", &board), Err(HatError::InvalidChannel { .. })));
        assert!(matches!(Pwm::new("P20", &board), Err(HatError::InvalidChannel { .. })));
        assert!(matches!(Pwm::new("P", &board), Err(HatError::InvalidChannel { .. })));
    }

    #[test]
    fn test_string_channel_matches_number() {
        let board = Board::new(crate::bus::NullBus);
        let pwm = Pwm::new("P19", &board).unwrap();
        assert_eq!(pwm.channel(), PwmChannel::try_from(19).unwrap());
        assert_eq!(pwm.timer().index(), 6);
        assert_eq!(pwm.channel().to_string(), "P19");
    }

    #[test]
    fn test_prescaler_then_period_emits_two_writes() {
        let (bus, board) = recording_board();
        let mut pwm = Pwm::new(17, &board).unwrap();
        bus.take();

        pwm.set_prescaler(10.0).unwrap();
        pwm.set_period(4095.0).unwrap();
        assert_eq!(
            bus.writes(),
            vec![
                RegisterWrite { address: 0x50, value: 9 },
                RegisterWrite { address: 0x54, value: 4095 },
            ]
        );
        assert!((pwm.frequency() - CLOCK_HZ / 10.0 / 4095.0).abs() < EPSILON);
    }

    #[test]
    fn test_prescaler_uses_current_period() {
        let (_bus, board) = recording_board();
        let mut pwm = Pwm::new(5, &board).unwrap();
        pwm.set_prescaler(600.0).unwrap();
        // period is still 1200 from the default resolution
        assert!((pwm.frequency() - 100.0).abs() < EPSILON);
    }

    #[test]
    fn test_values_are_rounded_half_to_even() {
        let (_bus, board) = recording_board();
        let mut pwm = Pwm::new(8, &board).unwrap();
        pwm.set_prescaler(351.6).unwrap();
        assert_eq!(pwm.prescaler(), 352);
        pwm.set_period(2.5).unwrap();
        assert_eq!(pwm.period(), 2);
    }

    #[test]
    fn test_channels_share_timer_period() {
        let (_bus, board) = recording_board();
        let mut a = Pwm::new(0, &board).unwrap();
        let b = Pwm::new(1, &board).unwrap();
        let other = Pwm::new(4, &board).unwrap();

        a.set_period(1000.0).unwrap();
        assert_eq!(b.period(), 1000);
        assert_eq!(other.period(), 1200);
    }

    #[test]
    fn test_separate_boards_do_not_share_timers() {
        let (_bus_a, board_a) = recording_board();
        let (_bus_b, board_b) = recording_board();
        let mut a = Pwm::new(0, &board_a).unwrap();
        let b = Pwm::new(0, &board_b).unwrap();
        a.set_period(500.0).unwrap();
        assert_eq!(b.period(), 1200);
    }

    #[test]
    fn test_channels_can_be_driven_from_threads() {
        let pair = |freq| {
            let r = resolve_frequency(CLOCK_HZ, freq).unwrap();
            (r.prescaler as u16, r.period as u16)
        };
        let (slow, fast) = (pair(50.0), pair(1000.0));

        let board = Board::new(SlowBus);
        for round in 0..50 {
            let a = board.clone();
            let b = board.clone();
            let fast_writer = std::thread::spawn(move || {
                Pwm::new(0, &a).unwrap().set_frequency(1000.0).unwrap();
            });
            let slow_writer = std::thread::spawn(move || {
                let mut pwm = Pwm::new(1, &b).unwrap();
                pwm.set_prescaler(600.0).unwrap();
                pwm.set_frequency(50.0).unwrap();
            });
            fast_writer.join().unwrap();
            slow_writer.join().unwrap();

            let slot = board.timers().slot(TimerGroup::for_channel(0));
            let got = (slot.prescaler, slot.period);
            assert!(got == slow || got == fast, "round {round}: mixed pair {got:?}");
        }
    }

    #[test]
    fn test_bus_failure_surfaces_as_transport() {
        let bus = Arc::new(FlakyBus::default());
        let board = Board::with_shared_bus(bus.clone());
        let mut pwm = Pwm::new(9, &board).unwrap();
        bus.failing.store(true, Ordering::SeqCst);

        let err = pwm.set_period(1000.0).unwrap_err();
        assert!(matches!(err, HatError::Transport { address: 0x46, .. }));
        assert_eq!(err.source().unwrap().to_string(), "bus down");
        // the timer table is updated before the write is attempted
        assert_eq!(pwm.period(), 1000);

        let err = pwm.set_pulse_width(10.0).unwrap_err();
        assert!(matches!(err, HatError::Transport { address: 0x29, .. }));
        assert_eq!(err.source().unwrap().to_string(), "bus down");
        assert_eq!(pwm.pulse_width(), 10);
    }

    #[test]
    fn test_pulse_width_percent() {
        let (bus, board) = recording_board();
        let mut pwm = Pwm::new(3, &board).unwrap();
        pwm.set_pulse_width_percent(50.0).unwrap();
        assert_eq!(pwm.pulse_width(), 600);
        assert_eq!(pwm.pulse_width_percent(), 50.0);
        assert_eq!(bus.last(), Some(RegisterWrite { address: 0x23, value: 600 }));

        pwm.set_period(4095.0).unwrap();
        pwm.set_pulse_width_percent(50.0).unwrap();
        assert_eq!(pwm.pulse_width(), 2048);
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        let (bus, board) = recording_board();
        let mut pwm = Pwm::new(2, &board).unwrap();
        bus.take();

        assert!(matches!(pwm.set_prescaler(0.0), Err(HatError::InvalidRange { .. })));
        assert!(matches!(pwm.set_period(70_000.0), Err(HatError::InvalidRange { .. })));
        assert!(matches!(pwm.set_pulse_width(-3.0), Err(HatError::InvalidRange { .. })));
        // too low for a 16-bit prescaler
        assert!(matches!(pwm.set_frequency(0.001), Err(HatError::InvalidRange { .. })));
        // every candidate period rounds down to zero
        assert!(matches!(pwm.set_frequency(1e8), Err(HatError::InvalidRange { .. })));

        assert!(bus.writes().is_empty());
        assert_eq!(pwm.period(), 1200);
        assert_eq!(pwm.prescaler(), 1200);
    }
}
