use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use tracing::{error, info};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Top-level settings, read from `config/default.toml` and `PICAR__*` env vars.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// `name = value` file holding steering and motor calibration.
    pub calibration_path: String,
    pub chassis: ChassisSettings,
    pub maneuvers: ManeuverSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            calibration_path: "config/calibration.db".into(),
            chassis: ChassisSettings::default(),
            maneuvers: ManeuverSettings::default(),
        }
    }
}

/// Where the drive hardware is wired and how it is driven.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChassisSettings {
    pub steering_channel: String,
    pub left_motor_channel: String,
    pub right_motor_channel: String,
    pub left_direction_pin: String,
    pub right_direction_pin: String,
    pub motor_period: u16,
    pub motor_prescaler: u16,
    /// Steering commands are clamped to +/- this many degrees.
    pub max_steering_angle: f64,
}

impl Default for ChassisSettings {
    fn default() -> Self {
        ChassisSettings {
            steering_channel: "P2".into(),
            left_motor_channel: "P13".into(),
            right_motor_channel: "P12".into(),
            left_direction_pin: "D4".into(),
            right_direction_pin: "D5".into(),
            motor_period: 4095,
            motor_prescaler: 10,
            max_steering_angle: 30.0,
        }
    }
}

/// Drive speeds (percent) used by the scripted maneuvers.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ManeuverSettings {
    pub drive_speed: f64,
    pub park_speed: f64,
    pub turn_speed: f64,
    /// Steering angle the maneuvers ask for; the chassis limit still applies.
    pub steering_angle: f64,
}

impl Default for ManeuverSettings {
    fn default() -> Self {
        ManeuverSettings {
            drive_speed: 50.0,
            park_speed: 40.0,
            turn_speed: 30.0,
            steering_angle: 60.0,
        }
    }
}

pub fn load_settings() -> Result<Settings, ConfigError> {
    info!("Attempting to load configuration from {}", DEFAULT_CONFIG_PATH);

    let settings = Config::builder()
        .add_source(File::new(DEFAULT_CONFIG_PATH, FileFormat::Toml).required(false))
        .add_source(Environment::with_prefix("PICAR").separator("__"))
        .build()
        .and_then(|config| config.try_deserialize::<Settings>());

    match settings {
        Ok(settings) => {
            info!("Successfully loaded configuration: {:?}", settings);
            Ok(settings)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            Err(e)
        }
    }
}
