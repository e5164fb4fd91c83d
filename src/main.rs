//! Barline — headless loop player and MIDI exporter.
//!
//! `barline export` turns a generator payload into a `.mid` file.
//! `barline play` runs the session loop with OSC control until Ctrl-C.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};

use barline::control::{control_channel, ControlRegistry};
use barline::generate::SeededGenerator;
use barline::osc::{OscFeedback, OscListener};
use barline::playback::{queue_sink, Firing};
use barline::session::{Session, SessionConfig, Track, BARS_PER_REQUEST};

const BLOCK_SIZE: u32 = 1024;

#[derive(Parser)]
#[command(name = "barline", version)]
#[command(about = "Bar-arranging loop sequencer", long_about = None)]
struct Cli {
    /// Config file (default: ~/.barline/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Arrange the bars of a payload file and write them as MIDI
    Export {
        /// Generator payload (JSON or YAML)
        input: PathBuf,

        /// Track the bars belong to
        #[arg(short, long, value_enum)]
        track: Track,

        /// Output .mid path
        #[arg(short, long)]
        output: PathBuf,

        /// Tempo (defaults to the config tempo)
        #[arg(short, long)]
        bpm: Option<f64>,
    },

    /// Run the loop headless, controlled over OSC
    Play {
        /// Generator seed
        #[arg(short, long, default_value = "0")]
        seed: u64,

        /// Stop after this many seconds
        #[arg(short, long)]
        duration: Option<f64>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => SessionConfig::load_from(path)?,
        None => SessionConfig::load().unwrap_or_default(),
    };

    match cli.command {
        Commands::Export {
            input,
            track,
            output,
            bpm,
        } => export(&config, &input, track, &output, bpm),
        Commands::Play { seed, duration } => play(&config, seed, duration),
    }
}

fn export(
    config: &SessionConfig,
    input: &std::path::Path,
    track: Track,
    output: &std::path::Path,
    bpm: Option<f64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(input)?;
    let mut session = Session::new(config, Box::new(SeededGenerator::default()))?;
    if let Some(bpm) = bpm {
        session.set_bpm(bpm)?;
    }

    let count = session.ingest_payload(track, &text)?;
    for index in 0..count {
        if session.add_from_pool(track, index)?.is_none() {
            eprintln!("arrangement full, {} bars left out", count - index);
            break;
        }
    }
    session.write_midi(track, output)?;
    println!(
        "wrote {} ({} bars at {} BPM)",
        output.display(),
        session.arrangement(track).occupied(),
        session.bpm()
    );
    Ok(())
}

fn play(
    config: &SessionConfig,
    seed: u64,
    duration: Option<f64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let generator = SeededGenerator::new(seed).with_instruments(config.drum_kit()?.len());
    let mut session = Session::new(config, Box::new(generator))?;
    for track in Track::ALL {
        session.request_bars(track, BARS_PER_REQUEST)?;
        session.add_from_pool(track, 0)?;
    }

    let mut registry = ControlRegistry::new();
    session.register_controls(&mut registry);

    let (tx, controls) = control_channel();
    let _listener = OscListener::start(&config.osc, tx)?;
    let feedback = match &config.osc.feedback {
        Some(target) => Some(OscFeedback::connect(target)?),
        None => None,
    };

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || r.store(false, Ordering::SeqCst))?;

    let (mut sink, mut firings) = queue_sink(1024);
    let block = Duration::from_secs_f64(BLOCK_SIZE as f64 / config.sample_rate as f64);
    let max_blocks = duration.map(|secs| (secs / block.as_secs_f64()).ceil() as u64);

    println!(
        "barline v{}: {} BPM, OSC on port {}, Ctrl-C to stop",
        env!("CARGO_PKG_VERSION"),
        session.bpm(),
        config.osc.listen_port
    );
    session.start();

    let mut blocks = 0u64;
    while running.load(Ordering::SeqCst) && max_blocks.map_or(true, |max| blocks < max) {
        let mut changed = false;
        for message in controls.drain() {
            match registry.dispatch_message(&mut session, &message) {
                Ok(()) => changed = true,
                Err(e) => log::warn!("{e}"),
            }
        }
        if changed {
            registry.sync("/drums/threshold", session.threshold());
            registry.sync("/transport/bpm", session.bpm() as f32);
            if let Some(feedback) = &feedback {
                if let Err(e) = feedback.send(registry.values()) {
                    log::warn!("feedback failed: {e}");
                }
            }
        }

        session.advance(BLOCK_SIZE, &mut sink);
        for firing in firings.drain() {
            match firing {
                Firing::Drum(hit) => {
                    log::info!("{} drum {} v{:.2}", hit.time, hit.instrument, hit.velocity)
                }
                Firing::Note(note) => {
                    log::info!("{} note {} ({:.1} Hz)", note.time, note.pitch, note.frequency)
                }
                Firing::Sample(trigger) => log::info!("{} sample {}", trigger.time, trigger.sample_id),
            }
        }

        blocks += 1;
        thread::sleep(block);
    }

    session.stop();
    registry.clear();
    println!("stopped.");
    Ok(())
}
