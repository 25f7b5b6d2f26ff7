//! euclidfx CLI — run Euclidean-rhythm note effects over a lookahead transport.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{info, warn};

use euclidfx::config::SessionConfig;
use euclidfx::euclid::{pattern, Traces};
use euclidfx::event::{Beat, EventScheduler, NoteEvent, RawEvent, ScanWindow, Timeline, PPQN};

/// One scheduler tick per 60 Hz frame.
const FRAME_SECS: f64 = 1.0 / 60.0;

/// C minor pentatonic, two octaves from C3.
const SCALE: [i64; 10] = [48, 51, 53, 55, 58, 60, 63, 65, 67, 70];

#[derive(Parser)]
#[command(name = "euclidfx", version)]
#[command(about = "Euclidean-rhythm MIDI note effects", long_about = None)]
struct Cli {
    /// Session file (default: ~/.euclidfx/session.yaml)
    #[arg(short, long, global = true)]
    session: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the processor chain offline with a simulated clock
    Render {
        #[command(flatten)]
        input: InputArgs,

        /// Print per-scan trace records as JSON lines
        #[arg(long)]
        traces: bool,
    },

    /// Print a Euclidean pattern as x/.
    Pattern {
        steps: usize,
        pulses: usize,
        #[arg(default_value = "0", allow_hyphen_values = true)]
        rotation: i64,
    },

    /// Run the processor chain against the wall clock until done or Ctrl-C
    Play {
        #[command(flatten)]
        input: InputArgs,
    },
}

#[derive(clap::Args)]
struct InputArgs {
    /// YAML list of input events (default: seeded random notes)
    #[arg(short, long)]
    events: Option<PathBuf>,

    /// Length to run, in beats
    #[arg(short, long, default_value = "16")]
    beats: u32,

    /// Seed for generated notes
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Override the session tempo
    #[arg(long)]
    bpm: Option<f64>,
}

#[derive(Serialize)]
struct TraceLine<'a> {
    window: ScanWindow,
    traces: &'a Traces,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Pattern {
            steps,
            pulses,
            rotation,
        } => {
            let base = pattern::generate(steps, pulses.min(steps));
            println!("{}", pattern::to_ascii(&pattern::rotate(&base, rotation)));
        }
        Commands::Render { input, traces } => {
            let mut scheduler = build_scheduler(cli.session.as_deref(), &input)?;
            let duration = run_secs(&scheduler, input.beats);
            for scan in scheduler.render(duration, FRAME_SECS) {
                if traces && !scan.traces.is_empty() {
                    let line = TraceLine {
                        window: scan.window,
                        traces: &scan.traces,
                    };
                    println!("{}", serde_json::to_string(&line)?);
                }
                print_notes(&scan.events);
            }
        }
        Commands::Play { input } => {
            let mut scheduler = build_scheduler(cli.session.as_deref(), &input)?;
            let duration = run_secs(&scheduler, input.beats);

            let running = Arc::new(AtomicBool::new(true));
            let flag = running.clone();
            ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))?;

            info!(bpm = scheduler.transport().bpm(), beats = input.beats, "playing");
            scheduler.play();
            let mut last = Instant::now();
            let mut played = 0.0;
            while running.load(Ordering::SeqCst) && played < duration {
                thread::sleep(Duration::from_secs_f64(FRAME_SECS));
                let now = Instant::now();
                let elapsed = now.duration_since(last).as_secs_f64();
                last = now;
                played += elapsed;
                if let Some(scan) = scheduler.tick(elapsed) {
                    print_notes(&scan.events);
                }
            }
            scheduler.pause();
            info!(position = scheduler.transport().position().ticks(), "stopped");
        }
    }

    Ok(())
}

fn build_scheduler(
    session: Option<&Path>,
    input: &InputArgs,
) -> Result<EventScheduler<Timeline>, Box<dyn std::error::Error>> {
    let mut config = match session {
        Some(path) => SessionConfig::load_from(path)?,
        None => SessionConfig::load().unwrap_or_default(),
    };
    if let Some(bpm) = input.bpm {
        config.bpm = bpm;
        config.validate()?;
    }

    let mut timeline = Timeline::new();
    match &input.events {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            let events: Vec<RawEvent> = serde_yaml::from_str(&content)?;
            timeline.insert_batch(events);
        }
        None => timeline.insert_batch(random_notes(input.seed, input.beats)),
    }
    if timeline.is_empty() {
        warn!("no input events");
    }
    Ok(config.scheduler(timeline))
}

/// Wall-clock length of `beats` at the scheduler's tempo. Loops do not shorten it.
fn run_secs(scheduler: &EventScheduler<Timeline>, beats: u32) -> f64 {
    Beat::from_beats(beats).to_seconds(scheduler.transport().bpm())
}

/// Sixteenth-note grid with random gaps, pitches from [`SCALE`].
fn random_notes(seed: u64, beats: u32) -> Vec<RawEvent> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let sixteenth = PPQN / 4;
    (0..beats as u64 * 4)
        .filter_map(|i| {
            if !rng.gen_bool(0.7) {
                return None;
            }
            let pitch = SCALE[rng.gen_range(0..SCALE.len())];
            let velocity = rng.gen_range(64..=110);
            Some(RawEvent::from(NoteEvent::new(i * sixteenth, sixteenth, 1, velocity, pitch)))
        })
        .collect()
}

fn print_notes(notes: &[NoteEvent]) {
    for n in notes {
        println!(
            "{:>7}  ch {:>2}  pitch {:>3}  vel {:>3}  len {:>4}",
            n.timestamp_ticks, n.channel, n.pitch, n.velocity, n.duration_ticks
        );
    }
}
