mod sim;

use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};
use pinwheel_core::{
    AppConfig, AudioCommand, PinwheelAssets, PinwheelError, RenderLoopController, ScreenPoint,
    UiSignal,
};
use sim::{Action, LevelPoint, Script, SimulatedBundle, SimulatedHost, SimulatedMic};
use tracing_subscriber::EnvFilter;

fn main() -> pinwheel_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::Simulate { script, fps } => {
            let contents = std::fs::read_to_string(&script)?;
            let script: Script = serde_json::from_str(&contents)?;
            run_simulation(config, script, fps)
        }
        Commands::Scenario { fps } => run_simulation(config, builtin_scenario(), fps),
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

/// Five readings one second apart, the third of which crosses the default
/// threshold, followed by silence until the trigger window has passed.
fn builtin_scenario() -> Script {
    let levels = [-10.0, -7.0, -5.9, -6.0, -3.0, -40.0]
        .into_iter()
        .enumerate()
        .map(|(second, db)| LevelPoint {
            at: second as f32,
            db,
        })
        .collect();

    Script {
        duration_seconds: 25.0,
        levels,
        ..Script::default()
    }
}

fn run_simulation(config: AppConfig, mut script: Script, fps: u32) -> pinwheel_core::Result<()> {
    if fps == 0 {
        return Err(PinwheelError::Config("fps must be non-zero".into()));
    }
    let timing = script.timing()?;
    script.sort();
    tracing::info!(
        fps,
        duration = script.duration_seconds,
        events = script.events.len(),
        "starting simulation"
    );

    let mut mic = SimulatedMic::default();
    let mut bundle = SimulatedBundle::default();
    let mut controller =
        RenderLoopController::setup(config, &PinwheelAssets::default(), &mut mic, &mut bundle)?;
    let mut host = SimulatedHost::new(timing.surface_at, timing.clip_length);

    let total_frames = (timing.duration.as_secs_f64() * fps as f64).ceil() as u64;
    let mut next_event = 0;

    for index in 0..=total_frames {
        let seconds = index as f64 / fps as f64;
        let now = Duration::from_secs_f64(seconds);
        host.advance_to(now);
        host.target = controller.anchors().object().map(|object| object.id);

        while let Some(event) = script.events.get(next_event) {
            if event.at as f64 > seconds {
                break;
            }
            apply_action(&mut controller, &mut host, &event.action);
            next_event += 1;
        }

        mic.emit(script.level_at(seconds as f32))?;
        let report = controller.on_frame(now, &mut host)?;

        if let Some(command) = report.command {
            let label = match command {
                AudioCommand::Play => "trigger fired",
                AudioCommand::Stop => "trigger released",
            };
            tracing::info!(
                at = seconds,
                level = %report.level,
                state = ?report.state,
                "{label}"
            );
        }
    }

    let orientation = controller
        .anchors()
        .object()
        .map(|object| object.orientation().to_axis_angle());
    tracing::info!(
        plays = host.plays,
        stops = host.stops,
        anchored = controller.is_anchored(),
        ?orientation,
        "simulation finished"
    );
    Ok(())
}

fn apply_action(controller: &mut RenderLoopController, host: &mut SimulatedHost, action: &Action) {
    match action {
        Action::Spin => controller.handle_signal(UiSignal::Spin, host),
        Action::Reset => controller.handle_signal(UiSignal::ResetAnchor, host),
        Action::Tap => match controller.tap(ScreenPoint::new(0.0, 0.0), &*host) {
            Some(handle) => tracing::info!(entity = handle.id.0, name = %handle.name, "tap"),
            None => tracing::info!("tap missed"),
        },
        Action::Drag { dx } => {
            controller.touch_began(ScreenPoint::new(0.0, 0.0));
            controller.touch_moved(ScreenPoint::new(*dx, 0.0));
            controller.touch_ended();
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Sound-reactive AR pinwheel driver", long_about = None)]
struct Cli {
    /// JSON configuration file. Defaults are used when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Drive the update loop from a JSON script of levels and user actions.
    Simulate {
        /// Path to the simulation script.
        script: PathBuf,
        /// Frames per simulated second.
        #[arg(long, default_value_t = 60)]
        fps: u32,
    },
    /// Run the built-in threshold scenario.
    Scenario {
        #[arg(long, default_value_t = 1)]
        fps: u32,
    },
    /// Print the effective configuration as JSON.
    Config,
}
