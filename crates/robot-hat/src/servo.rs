//! Hobby servos driven from a PWM channel.
//!
//! A servo channel runs at ~50 Hz with a period of 4095 counts. Angles from
//! -90 to 90 degrees map linearly onto pulses of 500 to 2500 µs.

use tracing::debug;

use crate::board::Board;
use crate::error::{HatError, Result};
use crate::pwm::{CLOCK_HZ, Pwm, PwmChannel};
use crate::utils::mapping;

/// Longest pulse, in microseconds.
pub const MAX_PULSE_US: f64 = 2500.0;
/// Shortest pulse, in microseconds.
pub const MIN_PULSE_US: f64 = 500.0;
/// Servo refresh rate, in Hz.
pub const FREQUENCY_HZ: f64 = 50.0;
/// Timer period used for servo channels.
pub const PERIOD: u16 = 4095;

const MAX_ANGLE: f64 = 90.0;
const FRAME_US: f64 = 20_000.0;

/// A servo on one PWM channel.
#[derive(Debug)]
pub struct Servo {
    pwm: Pwm,
    angle: f64,
}

impl Servo {
    /// Open a servo on `channel` and program its timer for servo pulses.
    ///
    /// This reprograms the period and prescaler of the whole timer group.
    pub fn new<C>(channel: C, board: &Board) -> Result<Self>
    where
        C: TryInto<PwmChannel, Error = HatError>,
    {
        let mut pwm = Pwm::new(channel, board)?;
        pwm.set_period(f64::from(PERIOD))?;
        pwm.set_prescaler(CLOCK_HZ / FREQUENCY_HZ / f64::from(PERIOD))?;
        Ok(Servo { pwm, angle: 0.0 })
    }

    /// Last commanded angle, in degrees.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Move to `angle` degrees, clamped to -90..=90.
    pub fn set_angle(&mut self, angle: f64) -> Result<()> {
        let angle = angle.clamp(-MAX_ANGLE, MAX_ANGLE);
        debug!(channel = %self.pwm.channel(), angle, "set servo angle");
        let pulse_us = mapping(angle, -MAX_ANGLE, MAX_ANGLE, MIN_PULSE_US, MAX_PULSE_US);
        self.set_pulse_width_time(pulse_us)?;
        self.angle = angle;
        Ok(())
    }

    /// Output a pulse of `pulse_us` microseconds, clamped to 500..=2500.
    pub fn set_pulse_width_time(&mut self, pulse_us: f64) -> Result<()> {
        let pulse_us = pulse_us.clamp(MIN_PULSE_US, MAX_PULSE_US);
        let rate = pulse_us / FRAME_US;
        let value = (rate * f64::from(PERIOD)).trunc();
        debug!(rate, value, "servo pulse width");
        self.pwm.set_pulse_width(value)
    }

    /// The underlying PWM channel.
    pub fn pwm(&self) -> &Pwm {
        &self.pwm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{RecordingBus, RegisterWrite};
    use std::sync::Arc;

    #[test]
    fn test_new_programs_servo_timer() {
        let bus = Arc::new(RecordingBus::new());
        let board = Board::with_shared_bus(bus.clone());
        let servo = Servo::new("P2", &board).unwrap();

        assert_eq!(servo.pwm().period(), 4095);
        assert_eq!(servo.pwm().prescaler(), 352);
        let writes = bus.writes();
        assert_eq!(
            &writes[writes.len() - 2..],
            &[
                RegisterWrite { address: 0x44, value: 4095 },
                RegisterWrite { address: 0x40, value: 351 },
            ]
        );
        assert!((servo.pwm().frequency() - 49.95).abs() < 0.01);
    }

    #[test]
    fn test_angle_maps_to_pulse_width() {
        let board = Board::new(crate::bus::NullBus);
        let mut servo = Servo::new(0, &board).unwrap();

        servo.set_angle(0.0).unwrap();
        // 1500 µs of a 20 ms frame
        assert_eq!(servo.pwm().pulse_width(), 307);

        servo.set_angle(90.0).unwrap();
        assert_eq!(servo.pwm().pulse_width(), 511);

        servo.set_angle(-90.0).unwrap();
        assert_eq!(servo.pwm().pulse_width(), 102);
    }

    #[test]
    fn test_angle_and_pulse_are_clamped() {
        let board = Board::new(crate::bus::NullBus);
        let mut servo = Servo::new(1, &board).unwrap();

        servo.set_angle(135.0).unwrap();
        assert_eq!(servo.angle(), 90.0);
        assert_eq!(servo.pwm().pulse_width(), 511);

        servo.set_pulse_width_time(100.0).unwrap();
        assert_eq!(servo.pwm().pulse_width(), 102);
    }
}
