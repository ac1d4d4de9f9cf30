//! HC-SR04 style ultrasonic ranger.
//!
//! Echo timing needs edge capture the board does not provide, so a reading
//! never completes and [`Ultrasonic::read`] reports no distance.

use std::time::Duration;
use tracing::debug;

use crate::pin::{Mode, Pin, Pull};

/// Speed of sound, in m/s.
pub const SOUND_SPEED: f64 = 343.3;

/// Default time to wait for an echo.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(20);

/// An ultrasonic ranger on a trigger and an echo pin.
#[derive(Debug)]
pub struct Ultrasonic {
    trig: Pin,
    echo: Pin,
    timeout: Duration,
}

impl Ultrasonic {
    /// Take over `trig` and `echo`. The trigger becomes an output and the
    /// echo pin a pulled-down input.
    pub fn new(trig: Pin, echo: Pin, timeout: Duration) -> Self {
        let trig = trig.with_setup(Some(Mode::Out), Pull::None);
        let echo = echo.with_setup(Some(Mode::In), Pull::Down);
        Ultrasonic {
            trig,
            echo,
            timeout,
        }
    }

    /// Time to wait for an echo.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The trigger and echo pins.
    pub fn pins(&self) -> (&Pin, &Pin) {
        (&self.trig, &self.echo)
    }

    /// Distance in centimetres from a round-trip echo time.
    pub fn distance_cm(round_trip: Duration) -> f64 {
        round_trip.as_secs_f64() * SOUND_SPEED / 2.0 * 100.0
    }

    /// Try up to `times` measurements and return the first distance, in cm.
    pub fn read(&mut self, times: u32) -> Option<f64> {
        (0..times).find_map(|_| self.read_once())
    }

    fn read_once(&mut self) -> Option<f64> {
        self.trig.off();
        self.trig.on();
        self.trig.off();
        debug!(timeout = ?self.timeout, "no echo");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_new_configures_echo_input() {
        let sensor = Ultrasonic::new(
            Pin::new("D2").unwrap(),
            Pin::new("D3").unwrap(),
            DEFAULT_TIMEOUT,
        );
        let (trig, echo) = sensor.pins();
        assert_eq!(trig.mode(), Some(Mode::Out));
        assert_eq!(echo.mode(), Some(Mode::In));
        assert_eq!(echo.pull(), Pull::Down);
        assert_eq!(sensor.timeout(), Duration::from_millis(20));
    }

    #[test]
    fn test_read_reports_no_distance() {
        let mut sensor = Ultrasonic::new(
            Pin::new("D2").unwrap(),
            Pin::new("D3").unwrap(),
            DEFAULT_TIMEOUT,
        );
        assert_eq!(sensor.read(10), None);
        assert_eq!(sensor.read(0), None);
    }

    #[test]
    fn test_distance_from_round_trip() {
        // 1 ms there and back is ~17 cm
        let cm = Ultrasonic::distance_cm(Duration::from_millis(1));
        assert!((cm - 17.165).abs() < EPSILON);
    }
}
