//! # FLM Host Supervisor
//!
//! Runs the front light management control unit against simulated hardware:
//! wires the ports, spawns the deterministic millisecond dispatcher, feeds
//! it stimuli from the input injector, and reports a periodic status line.
//!
//! # Usage
//!
//! ```bash
//! # Run with defaults (real-time pacing, status line every 100 ms)
//! flm
//!
//! # Faster than real time, custom run config, verbose logs
//! flm --config config/flm_run.toml -v
//!
//! # JSON logs for machine consumption
//! flm --json
//! ```
//!
//! Exit code 0 on a graceful stop (Ctrl-C or tick limit), 1 on an
//! initialization failure.

mod sim;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use flm_common::consts::TICK_MS;
use flm_common::hal::{AnalogInput, DigitalOutput};
use flm_control_unit::config::{load_run_config, RunConfig};
use flm_control_unit::sched::Dispatcher;
use flm_hal::{FrameLatch, SimAdc, SimDio};

use crate::sim::InputInjector;

/// Front light management ECU — simulation host
#[derive(Parser, Debug)]
#[command(name = "flm")]
#[command(version)]
#[command(about = "Front light management control unit on simulated hardware")]
struct Args {
    /// Path to the run configuration (TOML). Missing file means defaults.
    #[arg(short, long, default_value = "config/flm_run.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    match run(&args) {
        Ok(()) => info!("flm shutdown complete"),
        Err(e) => {
            error!("flm startup failed: {e}");
            std::process::exit(1);
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    info!("flm v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = load_run_config(&args.config)?;
    info!(
        "run config: tick_limit={}, real_time={}, ambient_adc={}",
        config.tick_limit, config.real_time, config.ambient_adc
    );

    // Ports.
    let latch = Arc::new(FrameLatch::new());
    let adc = Arc::new(SimAdc::new());
    let dio = Arc::new(SimDio::new());

    let mut dispatcher = Dispatcher::new(
        Arc::clone(&latch),
        Arc::clone(&adc) as Arc<dyn AnalogInput>,
        Arc::clone(&dio) as Arc<dyn DigitalOutput>,
    );
    let mut injector = InputInjector::new(latch, adc, config.ambient_adc);

    // Stop flag cleared by Ctrl-C.
    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || {
            info!("received shutdown signal");
            running.store(false, Ordering::SeqCst);
        })?;
    }

    run_loop(&config, &running, &mut dispatcher, &mut injector);

    let stats = dispatcher.stats();
    info!(
        "final state: ticks={}, decision={:?}, safety={:?}",
        stats.ticks,
        dispatcher.decision_state(),
        dispatcher.safety_status()
    );
    Ok(())
}

fn run_loop(
    config: &RunConfig,
    running: &AtomicBool,
    dispatcher: &mut Dispatcher,
    injector: &mut InputInjector,
) {
    let tick_duration = Duration::from_millis(u64::from(TICK_MS));
    let mut ticks: u64 = 0;

    while running.load(Ordering::SeqCst) {
        let (low, high) = dispatcher.relay_outputs();
        injector.step(dispatcher.now(), low || high);
        dispatcher.tick();

        if config.status_interval_ms != 0
            && dispatcher.now() % config.status_interval_ms == 0
        {
            log_status(dispatcher);
        }

        ticks += 1;
        if config.tick_limit != 0 && ticks >= config.tick_limit {
            info!("tick limit reached");
            break;
        }

        if config.real_time {
            std::thread::sleep(tick_duration);
        }
    }
}

fn log_status(dispatcher: &Dispatcher) {
    let switch = dispatcher.switch_status();
    let ambient = dispatcher.ambient_output();
    info!(
        tick = dispatcher.now(),
        state = ?dispatcher.decision_state(),
        switch = ?switch.command,
        switch_valid = switch.is_valid,
        ambient = ambient.adc,
        ambient_valid = ambient.is_valid,
        headlight = ?dispatcher.headlight_command(),
        safety = ?dispatcher.safety_status(),
        "status"
    );
}

fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
