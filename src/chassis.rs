use anyhow::Context;
use robot_hat::{Board, FileDb, Mode, Pin, Pull, Pwm, Servo};
use tracing::{debug, info, warn};

use crate::config::ChassisSettings;

/// Inner-wheel slow down stops growing past this steering angle.
const MAX_DIFFERENTIAL_ANGLE: f64 = 40.0;

/// Steering offset and motor polarity, as stored in the calibration file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub steering_offset: f64,
    pub motor_direction: [f64; 2],
}

impl Default for Calibration {
    fn default() -> Self {
        Calibration {
            steering_offset: 0.0,
            motor_direction: [1.0, 1.0],
        }
    }
}

impl Calibration {
    pub fn load(db: &FileDb) -> anyhow::Result<Self> {
        let offset = db.get("picarx_dir_servo", "0")?;
        let steering_offset = offset
            .parse()
            .with_context(|| format!("bad picarx_dir_servo {offset:?}"))?;

        let directions = db.get("picarx_dir_motor", "[1, 1]")?;
        let parsed: Vec<f64> = directions
            .trim_matches(|c| c == '[' || c == ']')
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .with_context(|| format!("bad picarx_dir_motor {directions:?}"))?;
        let motor_direction: [f64; 2] = parsed
            .try_into()
            .map_err(|v: Vec<f64>| anyhow::anyhow!("picarx_dir_motor needs 2 values, got {}", v.len()))?;

        Ok(Calibration {
            steering_offset,
            motor_direction,
        })
    }
}

struct Motor {
    speed: Pwm,
    direction: Pin,
    polarity: f64,
}

impl Motor {
    /// `speed` is -100..=100; any non-zero speed maps onto 50-100% duty.
    fn set_speed(&mut self, speed: f64) -> robot_hat::Result<()> {
        let speed = speed.clamp(-100.0, 100.0);
        let reverse = speed * self.polarity < 0.0;
        let mut duty = speed.abs();
        if duty != 0.0 {
            duty = (duty / 2.0).trunc() + 50.0;
        }
        if reverse {
            self.direction.high();
        } else {
            self.direction.low();
        }
        self.speed.set_pulse_width_percent(duty)
    }
}

/// The car: one steering servo and two rear drive motors.
pub struct Chassis {
    steering: Servo,
    motors: [Motor; 2],
    steering_angle: f64,
    max_steering_angle: f64,
    steering_offset: f64,
}

impl Chassis {
    pub fn new(
        board: &Board,
        settings: &ChassisSettings,
        calibration: Calibration,
    ) -> anyhow::Result<Self> {
        let steering = Servo::new(settings.steering_channel.as_str(), board)
            .context("opening steering servo")?;

        let motor = |channel: &str, pin: &str, polarity: f64| -> anyhow::Result<Motor> {
            let mut speed = Pwm::new(channel, board)
                .with_context(|| format!("opening motor channel {channel}"))?;
            speed.set_period(f64::from(settings.motor_period))?;
            speed.set_prescaler(f64::from(settings.motor_prescaler))?;
            let direction = Pin::new(pin)?.with_setup(Some(Mode::Out), Pull::None);
            Ok(Motor {
                speed,
                direction,
                polarity,
            })
        };
        let [left_polarity, right_polarity] = calibration.motor_direction;
        let motors = [
            motor(&settings.left_motor_channel, &settings.left_direction_pin, left_polarity)?,
            motor(&settings.right_motor_channel, &settings.right_direction_pin, right_polarity)?,
        ];

        let mut chassis = Chassis {
            steering,
            motors,
            steering_angle: 0.0,
            max_steering_angle: settings.max_steering_angle,
            steering_offset: calibration.steering_offset,
        };
        chassis.set_dir_servo_angle(0.0)?;
        chassis.stop()?;
        info!("Chassis ready");
        Ok(chassis)
    }

    pub fn steering_angle(&self) -> f64 {
        self.steering_angle
    }

    /// Point the front wheels. Positive angles steer right.
    pub fn set_dir_servo_angle(&mut self, angle: f64) -> robot_hat::Result<()> {
        let limit = self.max_steering_angle;
        let clamped = angle.clamp(-limit, limit);
        if clamped != angle {
            warn!(requested = angle, applied = clamped, "steering angle clamped");
        }
        self.steering_angle = clamped;
        self.steering.set_angle(clamped + self.steering_offset)
    }

    pub fn forward(&mut self, speed: f64) -> robot_hat::Result<()> {
        debug!(speed, angle = self.steering_angle, "forward");
        self.drive(speed)
    }

    pub fn backward(&mut self, speed: f64) -> robot_hat::Result<()> {
        debug!(speed, angle = self.steering_angle, "backward");
        self.drive(-speed)
    }

    pub fn stop(&mut self) -> robot_hat::Result<()> {
        debug!("stop");
        for motor in &mut self.motors {
            motor.set_speed(0.0)?;
        }
        Ok(())
    }

    /// The left motor is mounted mirrored, so it gets the negated speed. While
    /// steering, the wheel on the inside of the turn is slowed down.
    fn drive(&mut self, speed: f64) -> robot_hat::Result<()> {
        let angle = self.steering_angle;
        let scale = (100.0 - angle.abs().min(MAX_DIFFERENTIAL_ANGLE)) / 100.0;
        let (left, right) = if angle > 0.0 {
            (-speed, speed * scale)
        } else if angle < 0.0 {
            (-speed * scale, speed)
        } else {
            (-speed, speed)
        };
        let [l, r] = &mut self.motors;
        l.set_speed(left)?;
        r.set_speed(right)
    }

    #[cfg(test)]
    fn motor_duty(&self) -> [f64; 2] {
        [
            self.motors[0].speed.pulse_width_percent(),
            self.motors[1].speed.pulse_width_percent(),
        ]
    }

    #[cfg(test)]
    fn motor_reverse(&self) -> [bool; 2] {
        self.motors.each_ref().map(|m| m.direction.level())
    }
}
