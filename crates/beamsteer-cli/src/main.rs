//! Command-line frontend for the beamsteer turret.
//!
//! The detector and the video window stay external; where the desktop UI
//! delivered key presses, mouse clicks, and per-frame detections, this
//! frontend reads newline-delimited tokens from stdin. That keeps the
//! calibration protocol and the targeting loop fully exercisable from a
//! terminal or a pipe, with or without hardware (`--spoof`).

use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::{Parser, Subcommand};
use log::{warn, LevelFilter};

use beamsteer_control::{
    Actuator, ActuatorLink, GridSession, ManualCommand, SessionError, SessionState, SpoofLink,
    TargetingController, TcpLink, TickOutcome, TurretConfig, XAxisSession,
};
use beamsteer_core::{init_with_level, load_mesh, CalibrationMesh, CoordinateMapper, TargetSample};

#[derive(Parser)]
#[command(name = "beamsteer", about = "Calibrated pan/elevation turret control")]
struct Cli {
    /// Turret config JSON; stock hardware defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log commands instead of connecting to the actuator.
    #[arg(long, global = true)]
    spoof: bool,
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Query the calibration mapping without touching the hardware.
    Map {
        /// Mesh file to query; defaults to the config's mesh path.
        #[arg(long)]
        mesh: Option<PathBuf>,
        /// Query the inverse (servo to video) direction.
        #[arg(long)]
        inverse: bool,
        x: f64,
        y: Option<f64>,
    },
    /// Run the interactive two-axis grid calibration.
    Calibrate,
    /// Run the single-axis click-driven calibration.
    CalibrateX {
        #[arg(long, default_value_t = 10)]
        points: usize,
    },
    /// Drive the turret manually from stdin key tokens.
    Manual,
    /// Run the targeting loop on detections read from stdin
    /// (`<vx> <vy> [confidence]` per line, blank line for a frame with no
    /// detection).
    Track,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let log_level = LevelFilter::from_str(&cli.log_level).unwrap_or(LevelFilter::Info);
    init_with_level(log_level)?;

    let config = match &cli.config {
        Some(path) => TurretConfig::load_json(path)?,
        None => TurretConfig::default(),
    };

    match cli.command {
        CliCommand::Map {
            mesh,
            inverse,
            x,
            y,
        } => run_map(&config, mesh, inverse, x, y),
        CliCommand::Calibrate => run_calibrate(&config, cli.spoof),
        CliCommand::CalibrateX { points } => run_calibrate_x(&config, cli.spoof, points),
        CliCommand::Manual => run_manual(&config, cli.spoof),
        CliCommand::Track => run_track(&config, cli.spoof),
    }
}

fn connect(config: &TurretConfig, spoof: bool) -> Result<Actuator<Box<dyn ActuatorLink>>, Box<dyn Error>> {
    let link: Box<dyn ActuatorLink> = if spoof || config.spoof {
        Box::new(SpoofLink::new())
    } else {
        // connection failure here is fatal: nothing below can run blind
        Box::new(TcpLink::connect(&config.actuator_addr)?)
    };
    Ok(Actuator::new(config.actuator_state(), link))
}

/// Load the mesh, degrading to the uncalibrated (empty) state on failure.
fn mapper_from_disk(config: &TurretConfig) -> CoordinateMapper {
    match load_mesh(&config.mesh_path) {
        Ok(mesh) => CoordinateMapper::new(&mesh),
        Err(e) => {
            warn!("{e}; running uncalibrated");
            CoordinateMapper::new(&CalibrationMesh::new())
        }
    }
}

fn run_map(
    config: &TurretConfig,
    mesh: Option<PathBuf>,
    inverse: bool,
    x: f64,
    y: Option<f64>,
) -> Result<(), Box<dyn Error>> {
    let path = mesh.unwrap_or_else(|| config.mesh_path.clone());
    let mapper = CoordinateMapper::new(&load_mesh(&path)?);

    let (mx, my) = if inverse {
        (mapper.inverse_x(x), y.and_then(|y| mapper.inverse_y(y)))
    } else {
        (mapper.forward_x(x), y.and_then(|y| mapper.forward_y(y)))
    };
    match (mx, my) {
        (Some(mx), Some(my)) => println!("x={mx} y={my}"),
        (Some(mx), None) => println!("x={mx}"),
        _ => {
            println!("unavailable: mesh holds no calibration data");
        }
    }
    Ok(())
}

fn run_calibrate(config: &TurretConfig, spoof: bool) -> Result<(), Box<dyn Error>> {
    let mut turret = connect(config, spoof)?;
    let mut session = GridSession::new(config.grid);

    let mut marker = session.begin();
    while let Some(point) = marker {
        println!(
            "align beam to ({}, {}), steer with up/down/left/right/q/w/e/a/s/d, \
             empty line to confirm, 'abort' to cancel",
            point.vx, point.vy
        );
        marker = loop {
            let Some(line) = read_line()? else {
                session.abort();
                return Ok(());
            };
            let token = line.trim();
            if token == "abort" {
                session.abort();
                println!("calibration aborted");
                return Ok(());
            }
            if token.is_empty() {
                break session.confirm(turret.state().pos())?;
            }
            match ManualCommand::from_key(token) {
                Some(cmd) => {
                    cmd.apply(&mut turret);
                }
                None => println!("unmapped key: {token}"),
            }
        };
    }

    if session.state() == SessionState::Complete
        && save_with_retry(|| session.save(&config.mesh_path), &config.mesh_path)?
    {
        println!(
            "calibration saved to {} ({} points)",
            config.mesh_path.display(),
            session.mesh().len()
        );
    }
    Ok(())
}

fn run_calibrate_x(config: &TurretConfig, spoof: bool, points: usize) -> Result<(), Box<dyn Error>> {
    let mut turret = connect(config, spoof)?;
    let mut session = XAxisSession::new(points);

    for i in 0..points {
        print!("target {}/{points}: video x (0-100): ", i + 1);
        io::stdout().flush()?;
        let Some(line) = read_line()? else {
            session.abort();
            return Ok(());
        };
        let video_x: f64 = match line.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                session.abort();
                println!("not a number, calibration aborted");
                return Ok(());
            }
        };
        session.click(video_x)?;

        println!("steer the beam onto it, empty line to confirm");
        loop {
            let Some(line) = read_line()? else {
                session.abort();
                return Ok(());
            };
            let token = line.trim();
            if token.is_empty() {
                session.confirm(turret.state().x())?;
                break;
            }
            match ManualCommand::from_key(token) {
                Some(cmd) => {
                    cmd.apply(&mut turret);
                }
                None => println!("unmapped key: {token}"),
            }
        }
    }

    if save_with_retry(|| session.save(&config.mesh_path), &config.mesh_path)? {
        println!("calibration saved to {}", config.mesh_path.display());
    }
    Ok(())
}

/// Offer retries until the mesh is persisted or the operator gives up; the
/// session keeps the mesh in memory across failed attempts. Returns whether
/// the save eventually succeeded.
fn save_with_retry<F>(mut attempt: F, path: &Path) -> Result<bool, Box<dyn Error>>
where
    F: FnMut() -> Result<(), SessionError>,
{
    loop {
        match attempt() {
            Ok(()) => return Ok(true),
            Err(e) => {
                println!("saving to {} failed: {e}", path.display());
                println!("empty line to retry, 'discard' to give up");
                loop {
                    let Some(line) = read_line()? else {
                        return Ok(false);
                    };
                    match line.trim() {
                        "" => break,
                        "discard" => return Ok(false),
                        other => println!("unrecognized: {other}"),
                    }
                }
            }
        }
    }
}

fn run_manual(config: &TurretConfig, spoof: bool) -> Result<(), Box<dyn Error>> {
    let mut turret = connect(config, spoof)?;
    println!("keys: up/down/left/right, q/w/e/a/s/d presets, space = solenoid, x = exit");

    while let Some(line) = read_line()? {
        let token = line.trim();
        if token == "x" {
            break;
        }
        match ManualCommand::from_key(token) {
            Some(cmd) => {
                let pos = cmd.apply(&mut turret);
                println!("{} (x={}, y={})", cmd.action_name(), pos.sx, pos.sy);
            }
            None => println!("unmapped key: {token}"),
        }
    }
    Ok(())
}

fn run_track(config: &TurretConfig, spoof: bool) -> Result<(), Box<dyn Error>> {
    let mut turret = connect(config, spoof)?;
    let controller = TargetingController::new(mapper_from_disk(config), config.y_policy, config.invert_x);

    while let Some(line) = read_line()? {
        let sample = parse_sample(&line);
        match controller.tick(sample, &mut turret) {
            TickOutcome::Commanded { x, y } => println!("commanded x={x} y={y}"),
            TickOutcome::NoTarget => println!("no target"),
            TickOutcome::NotCalibrated => println!("uncalibrated, skipped"),
        }
    }
    Ok(())
}

/// `<vx> <vy> [confidence]`; anything that does not parse counts as a frame
/// without a detection.
fn parse_sample(line: &str) -> Option<TargetSample> {
    let mut fields = line.split_whitespace();
    let vx: f64 = fields.next()?.parse().ok()?;
    let vy: f64 = fields.next()?.parse().ok()?;
    let confidence: f32 = match fields.next() {
        Some(raw) => raw.parse().ok()?,
        None => 1.0,
    };
    Some(TargetSample::new(vx, vy, confidence))
}

fn read_line() -> io::Result<Option<String>> {
    let mut line = String::new();
    let n = io::stdin().lock().read_line(&mut line)?;
    Ok((n > 0).then_some(line))
}
