//! Small helpers shared by the drivers.

use spin_sleep::SpinSleeper;
use std::time::Duration;
use tracing::info;

use crate::error::Result;
use crate::pin::{Mode, Pin, Pull};

/// How long the MCU reset line is held in each state.
const RESET_HOLD: Duration = Duration::from_millis(10);

/// Battery voltage reported while no fuel gauge is wired up.
const NOMINAL_BATTERY_VOLTAGE: f64 = 7.4;

/// Linearly map `x` from `in_min..in_max` onto `out_min..out_max`.
///
/// Values outside the input range extrapolate; nothing is clamped.
pub fn mapping(x: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// Battery voltage in volts.
pub fn battery_voltage() -> f64 {
    NOMINAL_BATTERY_VOLTAGE
}

/// Pulse the MCU reset line low then high.
///
/// Useful when the MCU got stuck mid-transfer and register writes keep
/// failing.
pub fn reset_mcu() -> Result<Pin> {
    let sleeper = SpinSleeper::default();
    let mut reset = Pin::new("MCURST")?.with_setup(Some(Mode::Out), Pull::None);
    reset.off();
    sleeper.sleep(RESET_HOLD);
    reset.on();
    sleeper.sleep(RESET_HOLD);
    info!("MCU reset");
    Ok(reset)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_mapping() {
        assert!((mapping(0.0, -90.0, 90.0, 500.0, 2500.0) - 1500.0).abs() < EPSILON);
        assert!((mapping(90.0, -90.0, 90.0, 500.0, 2500.0) - 2500.0).abs() < EPSILON);
        assert!((mapping(5.0, 0.0, 10.0, 100.0, 0.0) - 50.0).abs() < EPSILON);
        // extrapolates past the input range
        assert!((mapping(20.0, 0.0, 10.0, 0.0, 1.0) - 2.0).abs() < EPSILON);
    }

    #[test]
    fn test_reset_mcu_leaves_line_high() {
        let mut pin = reset_mcu().unwrap();
        assert_eq!(pin.bcm(), 5);
        assert!(pin.value());
    }

    #[test]
    fn test_battery_voltage() {
        assert!((battery_voltage() - 7.4).abs() < EPSILON);
    }
}
