//! beatbox: a drum machine on the default audio device.
//!
//! Usage:
//!   beatbox [--config beatbox.yaml]            play live until Enter
//!   beatbox [--config ...] --wav out.wav [--bars 4]   render offline

mod config;

use anyhow::{bail, Context, Result};
use bb_master::{bounce, samples_to_wav, BeatBox, CpalSink, DrumKit, SoftwareVolume};
use config::Config;
use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;
use std::{env, fs, io, thread};

const DEFAULT_BARS: usize = 4;
const HEALTH_POLL: Duration = Duration::from_millis(50);

struct Args {
    config: Option<String>,
    wav: Option<String>,
    bars: usize,
}

fn parse_args(args: &[String]) -> Result<Args> {
    let value_of = |flag: &str| {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .cloned()
    };

    let bars = match value_of("--bars") {
        Some(bars) => bars
            .parse()
            .with_context(|| format!("--bars expects a number, got {:?}", bars))?,
        None => DEFAULT_BARS,
    };

    Ok(Args {
        config: value_of("--config"),
        wav: value_of("--wav"),
        bars,
    })
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        eprintln!("beatbox: {:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("Usage: beatbox [--config path] [--wav out.wav] [--bars N]");
        return Ok(());
    }
    let args = parse_args(&args)?;

    let config = match &args.config {
        Some(path) => Config::load(Path::new(path))?,
        None => Config::default(),
    };
    let kit = DrumKit::load(&config.kit_paths()).context("cannot load drum sounds")?;

    match &args.wav {
        Some(path) => render_to_wav(&config, &kit, path, args.bars),
        None => play_live(&config, kit),
    }
}

fn play_live(config: &Config, kit: DrumKit) -> Result<()> {
    let settings = config.settings()?;
    let volume = SoftwareVolume::new(0);
    let opener = CpalSink::opener(config.sink_config(), volume.clone());
    let beatbox = BeatBox::start(kit, &settings, opener, Box::new(volume))
        .context("cannot start playback")?;

    println!("Playing {} at {} bpm. Press Enter to quit.", settings.mode, settings.tempo);

    let (quit_tx, quit_rx) = mpsc::channel();
    thread::spawn(move || {
        let mut line = String::new();
        let _ = io::stdin().read_line(&mut line);
        let _ = quit_tx.send(());
    });

    loop {
        match quit_rx.recv_timeout(HEALTH_POLL) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => {}
        }
        if !beatbox.is_healthy() {
            break;
        }
    }

    beatbox.shutdown().context("playback ended with an error")?;
    println!("Done.");
    Ok(())
}

fn render_to_wav(config: &Config, kit: &DrumKit, path: &str, bars: usize) -> Result<()> {
    if bars == 0 {
        bail!("--bars must be at least 1");
    }
    let sink = config.sink_config();
    let mode = config.beat_mode()?;
    println!("Rendering {} bar(s) of {} to {} at {} Hz...", bars, mode, path, sink.sample_rate);

    let samples = bounce(
        kit,
        mode,
        config.tempo,
        bars,
        sink.sample_rate,
        sink.block_size_hint(),
    )?;
    let wav = samples_to_wav(&samples, sink.sample_rate);
    fs::write(path, &wav).with_context(|| format!("cannot write {}", path))?;

    println!("Wrote {} bytes", wav.len());
    Ok(())
}
