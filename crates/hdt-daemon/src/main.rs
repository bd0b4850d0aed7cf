//! HDT - Headless Human Digital Twin host
//!
//! Loads a scene snapshot, runs the model-ready sequence and then drives
//! animation frames and the 1 Hz vital simulation for a fixed time.

mod config;

use anyhow::{bail, Context, Result};
use clap::Parser;
use hdt_core::classify::ClassifyMode;
use hdt_core::scene::SceneGraph;
use hdt_runtime::{ModelSession, VitalSimService};
use std::path::PathBuf;
use tokio::time::{interval, sleep, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "hdt")]
#[command(about = "Human Digital Twin anatomical core, headless host")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "hdt.toml")]
    config: PathBuf,

    /// Scene snapshot (JSON); overrides the configured scene
    #[arg(short, long)]
    scene: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Seconds to run the frame loop (0 runs until Ctrl-C)
    #[arg(long, default_value_t = 10)]
    seconds: u64,

    /// Initial heart rate in bpm
    #[arg(long)]
    heart_rate: Option<u32>,

    /// Start the treadmill immediately
    #[arg(long)]
    run: bool,

    /// Classify the scene, print the report and exit
    #[arg(long)]
    classify_only: bool,

    /// Classify by node-name substrings instead of material names
    #[arg(long)]
    name_mode: bool,

    /// Write a default configuration file and exit
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("HDT v{}", env!("CARGO_PKG_VERSION"));

    if args.init_config {
        config::save_default_config(&args.config)?;
        println!("Wrote default configuration to {}", args.config.display());
        return Ok(());
    }

    let mut config = config::load_config(&args.config)?;
    if args.name_mode {
        config.runtime.classify_mode = ClassifyMode::NameSubstring;
    }

    let Some(scene_path) = args.scene.clone().or_else(|| config.runtime.scene.clone()) else {
        bail!("No scene given; pass --scene or set runtime.scene in {}", args.config.display());
    };
    let scene = SceneGraph::from_file(&scene_path)
        .with_context(|| format!("Failed to load scene {}", scene_path.display()))?;
    info!(
        path = %scene_path.display(),
        nodes = scene.nodes.len(),
        materials = scene.materials.len(),
        "Scene loaded"
    );

    let rules = config.load_rules()?;
    let mut session = ModelSession::load(scene, &rules, &config.to_session_config())?;

    if args.classify_only {
        println!("{}", serde_json::to_string_pretty(session.report())?);
        return Ok(());
    }

    let service = VitalSimService::spawn(config.vitals.clone());
    if let Some(bpm) = args.heart_rate {
        service.set_heart_rate(bpm).await?;
    }
    if args.run && !service.start_running().await? {
        warn!("Treadmill could not be started");
    }

    // Forward vital events to the log
    let mut events = service.subscribe();
    let forwarder = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            debug!(event = ?event.kind, at = %event.timestamp, "Vital event");
        }
    });

    let vitals = service.watch();
    let frame_period = Duration::from_secs_f64(1.0 / f64::from(config.runtime.frame_rate_hz.max(1)));
    let mut frames = interval(frame_period);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let run_for = (args.seconds > 0).then(|| Duration::from_secs(args.seconds));
    let deadline = sleep(run_for.unwrap_or(Duration::MAX));
    tokio::pin!(deadline);

    let start = Instant::now();
    let mut frame_count: u64 = 0;
    loop {
        tokio::select! {
            _ = frames.tick() => {
                let t = start.elapsed().as_secs_f64();
                let current = vitals.borrow().clone();
                session.frame(t, &current);
                session.camera_step();
                frame_count += 1;
            }
            _ = &mut deadline, if run_for.is_some() => break,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    let final_state = service.shutdown().await?;
    forwarder.abort();
    info!(frames = frame_count, "Frame loop finished");

    println!("{}", serde_json::to_string_pretty(&final_state)?);
    session.teardown();
    Ok(())
}
