use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;

use sat_mount::control::{run_control_loop, HomingState};
use sat_mount::hardware::sim::SimMount;
use sat_mount::predict::{julian_date, ObserverSite, Propagator, Sgp4Propagator};
use sat_mount::shared::{GpsFix, UtcStamp};
use sat_mount::tracker::{parse_tle_file, run_tracking_loop, ElementSet};
use sat_mount::{Config, Mount};

/// Simulated slew rate at full duty.
const SIM_FULL_SPEED_DEG_S: f64 = 30.0;
/// Simulated index marks sit this far below the starting position.
const SIM_INDEX_OFFSET_DEG: f64 = 10.0;

#[derive(Parser)]
#[command(name = "sat-mount")]
#[command(about = "Two-axis satellite tracking mount controller")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a TLE file and load every set into SGP4
    CheckTle { tle: PathBuf },
    /// Print look angles of the first satellite in a TLE file
    Predict {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        tle: PathBuf,
        /// RFC 3339 time, defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// Run the mount against simulated hardware
    Run {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        tle: Option<PathBuf>,
        /// Stop after this long, e.g. "90s"
        #[arg(long, value_parser = humantime::parse_duration)]
        duration: Option<Duration>,
        #[arg(long)]
        no_homing: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::CheckTle { tle } => check_tle(&tle),
        Commands::Predict { config, tle, at } => predict(&config, &tle, at),
        Commands::Run {
            config,
            tle,
            duration,
            no_homing,
        } => run(&config, tle.as_deref(), duration, no_homing).await,
    }
}

fn load_tle(path: &Path) -> Option<Vec<ElementSet>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading {}: {}", path.display(), e);
            return None;
        }
    };
    match parse_tle_file(&content) {
        Ok(sets) => Some(sets),
        Err(e) => {
            eprintln!("Parse error: {}", e);
            None
        }
    }
}

fn load_config(path: &Path) -> Option<(Config, ObserverSite)> {
    let config = match Config::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return None;
        }
    };
    let Some(site) =
        ObserverSite::from_coordinates(&config.station.coordinates, config.station.altitude_m)
    else {
        eprintln!(
            "Config error: invalid station coordinates {:?}",
            config.station.coordinates
        );
        return None;
    };
    Some((config, site))
}

fn check_tle(path: &Path) -> ExitCode {
    let Some(sets) = load_tle(path) else {
        return ExitCode::FAILURE;
    };

    let mut failed = false;
    for set in &sets {
        match Sgp4Propagator::new().init(set) {
            Ok(()) => println!("  {}: ok", set.name()),
            Err(e) => {
                println!("  {}: {}", set.name(), e);
                failed = true;
            }
        }
    }
    println!("{} element sets checked", sets.len());

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn predict(config: &Path, tle: &Path, at: Option<DateTime<Utc>>) -> ExitCode {
    let Some((_, site)) = load_config(config) else {
        return ExitCode::FAILURE;
    };
    let Some(set) = load_tle(tle).and_then(|sets| sets.into_iter().next()) else {
        return ExitCode::FAILURE;
    };

    let mut propagator = Sgp4Propagator::new();
    propagator.set_site(site);
    let result = propagator.init(&set).and_then(|()| {
        let time = at.unwrap_or_else(Utc::now);
        propagator.position_at(julian_date(&UtcStamp::from_datetime(time))?)
    });

    match result {
        Ok(look) => match serde_json::to_string(&look) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Serialization error: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("Prediction error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn gps_fix(site: &ObserverSite) -> GpsFix {
    GpsFix {
        latitude_deg: site.latitude_deg,
        longitude_deg: site.longitude_deg,
        altitude_m: site.altitude_m,
        time: UtcStamp::from_datetime(Utc::now()),
        valid: true,
    }
}

async fn run(
    config_path: &Path,
    tle: Option<&Path>,
    duration: Option<Duration>,
    no_homing: bool,
) -> ExitCode {
    let Some((config, site)) = load_config(config_path) else {
        return ExitCode::FAILURE;
    };
    let mut pending_tle = match tle {
        Some(path) => match load_tle(path).and_then(|sets| sets.into_iter().next()) {
            Some(set) => Some(set),
            None => return ExitCode::FAILURE,
        },
        None => None,
    };

    let degrees_per_pulse = config.mount.degrees_per_pulse();
    let sim = Arc::new(SimMount::new(
        SIM_FULL_SPEED_DEG_S / degrees_per_pulse,
        -SIM_INDEX_OFFSET_DEG / degrees_per_pulse,
    ));
    let (mount, drive, tracking) = Mount::new(&config, sim.hardware(), Sgp4Propagator::new());
    let shared = mount.shared().clone();
    shared.update_gps(gps_fix(&site));

    let running = Arc::new(AtomicBool::new(true));
    let plant = {
        let sim = sim.clone();
        let running = running.clone();
        let period = config.control.period();
        thread::spawn(move || {
            while running.load(Ordering::Relaxed) {
                sim.step(period.as_secs_f64());
                thread::sleep(period);
            }
        })
    };

    let (control_stop, control_stop_rx) = crossbeam::channel::bounded(1);
    let control_period = config.control.period();
    let control = thread::spawn(move || run_control_loop(drive, control_period, control_stop_rx));

    let (tracking_stop, tracking_stop_rx) = oneshot::channel();
    let tracker = tokio::spawn(run_tracking_loop(
        tracking,
        config.tracking.period(),
        tracking_stop_rx,
    ));

    let gps = {
        let shared = shared.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            loop {
                ticker.tick().await;
                shared.update_gps(gps_fix(&site));
            }
        })
    };

    if !no_homing {
        if let Err(e) = mount.begin_homing() {
            log::error!("Could not start homing: {}", e);
        }
    }

    let deadline = async {
        match duration {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut status_ticker = tokio::time::interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            _ = status_ticker.tick() => {
                let homed = no_homing
                    || matches!(shared.homing(), HomingState::Completed { .. } | HomingState::Aborted);
                if homed {
                    if let Some(set) = pending_tle.take() {
                        if let Err(e) = mount.submit_tle(set) {
                            log::error!("TLE submission failed: {}", e);
                        }
                    }
                }
                match serde_json::to_string(&mount.status()) {
                    Ok(json) => println!("{}", json),
                    Err(e) => log::warn!("Status serialization failed: {}", e),
                }
            }
            _ = &mut ctrl_c => {
                log::info!("Interrupted");
                break;
            }
            _ = &mut deadline => break,
        }
    }

    if let Err(e) = mount.stop_all_motors() {
        log::warn!("Stop failed: {}", e);
    }
    gps.abort();
    let _ = tracking_stop.send(());
    if let Err(e) = tracker.await {
        log::warn!("Tracking loop ended abnormally: {}", e);
    }
    let _ = control_stop.send(());
    if control.join().is_err() {
        log::error!("Control loop panicked");
    }
    running.store(false, Ordering::Relaxed);
    if plant.join().is_err() {
        log::error!("Simulation thread panicked");
    }

    ExitCode::SUCCESS
}
