mod chassis; // steering servo plus the two drive motors
mod config;
mod maneuvers;

use anyhow::Context;
use robot_hat::{Board, FileDb, TracingBus};
use spin_sleep::SpinSleeper;
use std::io::{self, BufRead, Write};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};

use chassis::{Calibration, Chassis};
use maneuvers::Maneuver;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let settings = config::load_settings().context("loading settings")?;

    let board = Board::new(TracingBus);
    let db = FileDb::new(&settings.calibration_path)
        .with_context(|| format!("opening {}", settings.calibration_path))?;
    let calibration = Calibration::load(&db)?;
    info!(?calibration, "calibration loaded");
    let mut car = Chassis::new(&board, &settings.chassis, calibration)?;

    let sleeper = SpinSleeper::default();
    let pause = |d: Duration| sleeper.sleep(d);

    if let Some(arg) = std::env::args().nth(1) {
        let maneuver: Maneuver = arg.parse()?;
        maneuvers::perform(&mut car, maneuver, &settings.maneuvers, pause)?;
        return Ok(());
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        println!("select one of the following using 1/2/3:");
        for (i, maneuver) in Maneuver::ALL.iter().enumerate() {
            println!("  {}: {}", i + 1, maneuver);
        }
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            info!("input closed, stopping");
            car.stop()?;
            return Ok(());
        };
        match line?.parse::<Maneuver>() {
            Ok(maneuver) => maneuvers::perform(&mut car, maneuver, &settings.maneuvers, pause)?,
            Err(e) => {
                warn!("{e}");
                println!("invalid selection, try again");
            }
        }
    }
}
