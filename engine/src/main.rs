//! dwell-replay: run landmark scripts through the dwell interaction engine
//! and print the resulting events as s-expressions.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;

use dwell_engine::interaction::landmarks::{HandLandmarkSet, Landmark};
use dwell_engine::interaction::mapper::DisplayRect;
use dwell_engine::interaction::source::{drive, ScriptedSource, TimedFrame};
use dwell_engine::replay::{Replay, Script};
use dwell_engine::{
    EngineConfig, HitPolicy, InteractionEngine, LandmarkFrame, Shape, Surface, TargetSpec,
};

#[derive(Parser, Debug)]
#[command(name = "dwell-replay", about = "Replay hand landmark scripts through the dwell engine")]
struct Cli {
    /// Script of surface/target/frame commands, one plist per line
    #[arg(long)]
    script: Option<PathBuf>,

    /// Engine config plist (default: built-in defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Misses shorter than this keep the hover episode alive
    #[arg(long)]
    gap_tolerance_ms: Option<f64>,

    /// Minimum time between an activation and the next episode
    #[arg(long)]
    cooldown_ms: Option<f64>,

    /// Run the built-in hover button scenario instead of a script
    #[arg(long)]
    demo: bool,

    /// Show version and exit
    #[arg(long)]
    version: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("dwell-replay {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dwell_engine=info,dwell_replay=info".into()),
        )
        .init();

    info!("dwell-replay v{} starting", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;
    info!("config: {}", config.config_sexp());
    let mut engine = InteractionEngine::new(config);

    if cli.demo {
        return run_demo(&mut engine);
    }

    let Some(path) = cli.script.as_ref() else {
        bail!("nothing to do: pass --script FILE or --demo");
    };
    let script = Script::load(path)
        .with_context(|| format!("failed to load script {}", path.display()))?;
    let lines = Replay::new()
        .run(&script, &mut engine)
        .with_context(|| format!("replay of {} failed", path.display()))?;

    for line in &lines {
        println!("{line}");
    }
    println!("{}", engine.status_sexp());
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let mut config = match cli.config.as_ref() {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    if let Some(ms) = cli.gap_tolerance_ms {
        config.dwell.gap_tolerance_ms = checked_ms("--gap-tolerance-ms", ms)?;
    }
    if let Some(ms) = cli.cooldown_ms {
        config.dwell.reactivation_cooldown_ms = checked_ms("--cooldown-ms", ms)?;
    }
    Ok(config)
}

fn checked_ms(flag: &str, ms: f64) -> anyhow::Result<f64> {
    if !ms.is_finite() || ms < 0.0 {
        bail!("{flag} must be a non-negative number of milliseconds, got {ms}");
    }
    Ok(ms)
}

/// Round button at 20% / 70% of a mirrored 640x480 view; the hand idles
/// for a second, then holds over the button for three.
fn run_demo(engine: &mut InteractionEngine) -> anyhow::Result<()> {
    const FRAME_MS: f64 = 33.0;

    let surface = Surface::new(640.0, 480.0, true);
    let canvas = DisplayRect::new(0.0, 0.0, 640.0, 480.0);
    let element = DisplayRect::new(0.2 * 640.0, 0.7 * 480.0, 100.0, 100.0);
    let button = surface
        .scale_display_rect(&element, &canvas)
        .context("demo canvas has no displayed area")?;

    let dwell_ms = engine.config().default_dwell_ms;
    engine.register_target(TargetSpec::new(
        "room",
        Shape::inscribed_circle(&button),
        dwell_ms,
        HitPolicy::AnyLandmark,
    ))?;

    // Mirrored view: surface x = width - x * width
    let over_button = Landmark::new(1.0 - 178.0 / 640.0, 386.0 / 480.0, 0.0);
    let elsewhere = Landmark::new(0.5, 0.3, 0.0);

    let mut source = ScriptedSource::new(Vec::new(), engine.config().source.clone());
    for i in 0..=120 {
        let t = i as f64 * FRAME_MS;
        let point = if t < 1000.0 { elsewhere } else { over_button };
        source.push(TimedFrame::new(
            LandmarkFrame::new(vec![HandLandmarkSet::uniform(point)]),
            t,
        ));
    }

    let report = drive(engine, &mut source, surface, |event| {
        println!("{}", event.to_sexp());
    });
    println!("{}", engine.status_sexp());

    if report.activations == 0 {
        bail!("demo finished without an activation");
    }
    Ok(())
}
