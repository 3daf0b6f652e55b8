//! `scout-cli` – Scout robot command line interface.
//!
//! This binary:
//!
//! 1. Loads `~/.scout/config.toml`, writing the defaults on first run.
//! 2. Opens the motor link (serial device or simulator) and the frame source
//!    (recorded detector output or an endless simulated camera).
//! 3. Runs the frame loop on a worker thread.
//! 4. Drops the operator into an **interactive shell** with slash-commands
//!    (`/auto`, `/manual`, `/drive`, `/prompt`, `/status`, `/help`).
//! 5. Intercepts **Ctrl-C** to stop the frame loop, which sends a final stop
//!    to the motors.

mod config;
mod replay;
mod repl;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use colored::Colorize;
use scout_hal::sim::{SimCamera, SimDetector, SimMotorController};
use scout_hal::{Camera, CommandDispatcher, Detector, MotorController, SerialMotorController};
use scout_runtime::{ControlPlane, Pipeline};
use tracing::{info, warn};

use crate::config::Config;
use crate::replay::Recording;

fn main() {
    // Hold the guard until exit so pending spans are flushed.
    let _telemetry = scout_runtime::init_tracing("scout");

    print_banner();

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping the robot …".yellow().bold());
        println!("  Press Enter to leave the shell.");
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; Ctrl-C will not stop the motors");
    }

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = load_config();

    // ── Hardware ──────────────────────────────────────────────────────────
    let motor = open_motor(&cfg);
    println!("  Motor link   : {}", motor.id().bold());
    let dispatcher = CommandDispatcher::new(motor, cfg.dispatcher.clone()).shared();
    let control = Arc::new(ControlPlane::new(dispatcher));

    let (camera, detector) = open_frame_source(&cfg);
    println!("  Frame source : {}", camera.id().bold());

    let mut pipeline = Pipeline::new(camera, detector, Arc::clone(&control))
        .with_config(cfg.pipeline.clone())
        .with_tracker(cfg.tracker.clone())
        .with_navigation(cfg.navigation.clone());

    // ── Frame loop ────────────────────────────────────────────────────────
    let loop_shutdown = Arc::clone(&shutdown);
    let frame_loop = match thread::Builder::new()
        .name("frame-loop".to_string())
        .spawn(move || pipeline.run(&loop_shutdown))
    {
        Ok(handle) => handle,
        Err(e) => {
            println!("{}: {}", "Failed to start frame loop".red(), e);
            std::process::exit(1);
        }
    };

    println!();
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    // ── Interactive shell ─────────────────────────────────────────────────
    repl::run(Arc::clone(&control), Arc::clone(&shutdown));
    shutdown.store(true, Ordering::SeqCst);

    match frame_loop.join() {
        Ok(summary) => {
            info!(?summary, "shutdown complete");
            println!(
                "  {} {} frames processed, {} skipped, {} commands sent.",
                "✓".green().bold(),
                summary.processed,
                summary.skipped,
                summary.commands
            );
        }
        Err(_) => println!("{}", "Frame loop panicked; motors may still be moving.".red().bold()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Startup helpers
// ─────────────────────────────────────────────────────────────────────────────

fn load_config() -> Config {
    match config::load() {
        Ok(Some(cfg)) => {
            println!("  Config loaded from {}", config::config_path().display().to_string().bold());
            cfg
        }
        Ok(None) => {
            let mut cfg = Config::default();
            match config::save(&cfg) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Error saving config".red(), e),
            }
            config::apply_env_overrides(&mut cfg);
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    }
}

fn open_motor(cfg: &Config) -> Box<dyn MotorController> {
    let Some(device) = cfg.serial_device.as_deref() else {
        return Box::new(SimMotorController::new("sim_drive"));
    };
    match SerialMotorController::open(device, cfg.baud_rate) {
        Ok(motor) => Box::new(motor),
        Err(e) => {
            println!("{}: {}", "Serial link unavailable".red(), e);
            println!("  Falling back to the simulated motor controller.");
            Box::new(SimMotorController::new("sim_drive"))
        }
    }
}

fn open_frame_source(cfg: &Config) -> (Box<dyn Camera>, Box<dyn Detector>) {
    if let Some(path) = cfg.replay.as_deref() {
        match Recording::open(path) {
            Ok(recording) if recording.is_empty() => {
                println!("{}: {} has no frames", "Replay".yellow(), path.display());
            }
            Ok(recording) => {
                println!("  Replaying {} frames from {}", recording.len(), path.display().to_string().bold());
                let (camera, detector) = recording.into_drivers(cfg.frame_width, cfg.frame_height);
                return (Box::new(camera), Box::new(detector));
            }
            Err(e) => println!("{}: {}", "Replay error".red(), e),
        }
        println!("  Using the simulated camera.");
    }
    (
        Box::new(SimCamera::endless("sim_camera", cfg.frame_width, cfg.frame_height)),
        Box::new(SimDetector::new()),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   ____                  __ "#.bold().cyan());
    println!("{}", r#"  / __/______  __ ______/ /_"#.bold().cyan());
    println!("{}", r#" _\ \/ __/ _ \/ // / __/ __/"#.bold().cyan());
    println!("{}", r#"/___/\__/\___/\_,_/\__/\__/ "#.bold().cyan());
    println!();
    println!("  {} {}", "Scout".bold(), format!("v{}", env!("CARGO_PKG_VERSION")).dimmed());
    println!("  Search-and-rescue rover control");
    println!();
}
