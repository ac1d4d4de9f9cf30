use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::chassis::Chassis;
use crate::config::ManeuverSettings;

/// One timed step of a scripted maneuver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    Steer(f64),
    Forward(f64),
    Backward(f64),
    Wait(Duration),
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Maneuver {
    ForwardBackward,
    ParallelPark,
    ThreePointTurn,
}

impl Maneuver {
    pub const ALL: [Maneuver; 3] = [
        Maneuver::ForwardBackward,
        Maneuver::ParallelPark,
        Maneuver::ThreePointTurn,
    ];

    pub fn steps(self, settings: &ManeuverSettings) -> Vec<Step> {
        use Step::*;
        let angle = settings.steering_angle;
        let secs = Duration::from_secs_f64;
        match self {
            Maneuver::ForwardBackward => {
                let speed = settings.drive_speed;
                vec![
                    Forward(speed),
                    Wait(secs(2.0)),
                    Backward(speed),
                    Wait(secs(2.0)),
                    Stop,
                ]
            }
            Maneuver::ParallelPark => {
                let speed = settings.park_speed;
                vec![
                    Steer(-angle),
                    Backward(speed),
                    Wait(secs(1.5)),
                    Steer(0.0),
                    Wait(secs(1.0)),
                    Steer(angle),
                    Wait(secs(2.15)),
                    Steer(0.0),
                    Forward(speed),
                    Wait(secs(1.0)),
                    Stop,
                ]
            }
            Maneuver::ThreePointTurn => {
                let speed = settings.turn_speed;
                vec![
                    Steer(-angle),
                    Forward(speed),
                    Wait(secs(1.0)),
                    Steer(angle),
                    Backward(speed),
                    Wait(secs(1.0)),
                    Steer(-angle),
                    Forward(speed),
                    Wait(secs(1.0)),
                    Steer(0.0),
                    Wait(secs(1.0)),
                    Stop,
                ]
            }
        }
    }
}

impl FromStr for Maneuver {
    type Err = anyhow::Error;

    /// Accepts the menu number or the maneuver name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" | "forward-backward" => Ok(Maneuver::ForwardBackward),
            "2" | "parallel-park" => Ok(Maneuver::ParallelPark),
            "3" | "three-point-turn" => Ok(Maneuver::ThreePointTurn),
            other => anyhow::bail!("unknown maneuver {other:?}"),
        }
    }
}

impl fmt::Display for Maneuver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Maneuver::ForwardBackward => "forward/backward",
            Maneuver::ParallelPark => "parallel park",
            Maneuver::ThreePointTurn => "three point turn",
        };
        f.write_str(name)
    }
}

/// Play `steps` on `chassis`, handing every wait to `pause`.
///
/// The car is stopped if a step fails part way through.
pub fn run(
    chassis: &mut Chassis,
    steps: &[Step],
    mut pause: impl FnMut(Duration),
) -> robot_hat::Result<()> {
    let result = steps.iter().try_for_each(|step| match *step {
        Step::Steer(angle) => chassis.set_dir_servo_angle(angle),
        Step::Forward(speed) => chassis.forward(speed),
        Step::Backward(speed) => chassis.backward(speed),
        Step::Wait(duration) => {
            pause(duration);
            Ok(())
        }
        Step::Stop => chassis.stop(),
    });
    if result.is_err() {
        chassis.stop()?;
    }
    result
}

pub fn perform(
    chassis: &mut Chassis,
    maneuver: Maneuver,
    settings: &ManeuverSettings,
    pause: impl FnMut(Duration),
) -> robot_hat::Result<()> {
    info!("running {}", maneuver);
    run(chassis, &maneuver.steps(settings), pause)?;
    info!(steering = chassis.steering_angle(), "{} finished", maneuver);
    Ok(())
}
