#![warn(missing_docs)]
#![doc = "Mock hardware abstraction layer for the robot hat controller board."]
#![doc = ""]
#![doc = "The board's MCU is driven by 16-bit register writes. This crate turns PWM,"]
#![doc = "servo, LED and sensor operations into those writes and hands them to an"]
#![doc = "injected [`RegisterBus`], so no real transport is needed to use or test it."]
#![doc = ""]
#![doc = "```"]
#![doc = "use robot_hat::{Board, NullBus, Pwm};"]
#![doc = ""]
#![doc = "let board = Board::new(NullBus);"]
#![doc = "let mut pwm = Pwm::new(\"P0\", &board)?;"]
#![doc = "pwm.set_frequency(1000.0)?;"]
#![doc = "pwm.set_pulse_width_percent(25.0)?;"]
#![doc = "# Ok::<(), robot_hat::HatError>(())"]
#![doc = "```"]

pub mod adc;
pub mod board;
pub mod bus;
pub mod error;
pub mod filedb;
pub mod grayscale;
pub mod pin;
pub mod pwm;
pub mod rgb_led;
pub mod servo;
pub mod timer;
pub mod ultrasonic;
pub mod utils;

pub use adc::{Adc, AdcChannel};
pub use board::Board;
pub use bus::{NullBus, RecordingBus, RegisterBus, RegisterWrite, SharedBus, TracingBus};
pub use error::{BusError, HatError, Result};
pub use filedb::FileDb;
pub use grayscale::{GrayscaleModule, LineStatus, Side};
pub use pin::{Mode, Pin, Pull, Trigger};
pub use pwm::{CLOCK_HZ, Pwm, PwmChannel, Resolution, resolve_frequency};
pub use rgb_led::{Common, Rgb, RgbLed};
pub use servo::Servo;
pub use timer::{TimerBank, TimerGroup, TimerSlot};
pub use ultrasonic::Ultrasonic;
