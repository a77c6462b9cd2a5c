//! tts-highlight command line entry point
//!
//! Drives the speech adapter from a terminal:
//!   tts-highlight voices
//!   tts-highlight speak <text> [--rate R] [--pitch P] [--voice V] [--id ID]
//!
//! Events relayed by the adapter are printed as JSON lines.

use anyhow::{bail, Context};
use log::{debug, error, info};
use std::process;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tts_highlight::config::Config;
use tts_highlight::speech::{EventChannel, SpeakRequest, SpeechAdapter};

/// How long `speak` waits for the utterance to finish
const SPEAK_TIMEOUT: Duration = Duration::from_secs(60);

enum Command {
    Voices,
    Speak { text: String, request: SpeakRequest },
}

struct Args {
    debug: bool,
    config: Option<String>,
    command: Command,
}

fn usage() -> ! {
    eprintln!("Usage: tts-highlight [--debug] [--config PATH] voices");
    eprintln!(
        "       tts-highlight [--debug] [--config PATH] speak <text> \
         [--rate R] [--pitch P] [--voice V] [--id ID]"
    );
    process::exit(2);
}

fn parse_args(raw: Vec<String>) -> anyhow::Result<Args> {
    let mut debug = false;
    let mut config = None;
    let mut positional = Vec::new();
    let mut request = SpeakRequest::new();

    let mut iter = raw.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--debug" | "-d" => debug = true,
            "--config" => config = Some(iter.next().context("--config needs a path")?),
            "--rate" => {
                let v = iter.next().context("--rate needs a value")?;
                request = request.rate(v.parse().context("invalid --rate")?);
            }
            "--pitch" => {
                let v = iter.next().context("--pitch needs a value")?;
                request = request.pitch(v.parse().context("invalid --pitch")?);
            }
            "--voice" => request = request.voice(iter.next().context("--voice needs a value")?),
            "--id" => request = request.utterance_id(iter.next().context("--id needs a value")?),
            _ => positional.push(arg),
        }
    }

    let command = match positional.first().map(String::as_str) {
        Some("voices") => Command::Voices,
        Some("speak") => {
            let text = positional[1..].join(" ");
            if text.is_empty() {
                bail!("speak needs some text");
            }
            Command::Speak { text, request }
        }
        _ => usage(),
    };

    Ok(Args {
        debug,
        config,
        command,
    })
}

fn init_logging(debug_mode: bool, config: &Config) {
    if debug_mode {
        // Debug mode: write to tts-highlight.log file
        use std::fs::OpenOptions;
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open("tts-highlight.log")
        {
            Ok(log_file) => {
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Debug)
                    .target(env_logger::Target::Pipe(Box::new(log_file)))
                    .init();
            }
            Err(e) => {
                eprintln!(
                    "Warning: Failed to open tts-highlight.log for debug logging: {}",
                    e
                );
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Warn)
                    .init();
            }
        }
        info!(
            "tts-highlight version {} starting (debug mode)",
            tts_highlight::VERSION
        );
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(config.log_level())
            .init();
    }
}

fn main() {
    let args = match parse_args(std::env::args().skip(1).collect()) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            usage();
        }
    };

    if let Err(e) = run(args) {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("loading configuration")?;

    init_logging(args.debug, &config);
    debug!("Config loaded from {:?}", config.path());

    let channel = Arc::new(EventChannel::new());
    let events = channel.subscribe();
    let adapter = SpeechAdapter::native(&config, channel.clone());

    if !adapter.wait_until_ready(config.init_timeout()) {
        // Initialization failure is reported as an event
        for event in events.try_iter() {
            println!("{}", event.to_json());
        }
        bail!("speech engine did not become ready");
    }

    match args.command {
        Command::Voices => {
            for voice in adapter.get_voices()? {
                println!("{}", serde_json::to_string(&voice)?);
            }
        }
        Command::Speak { text, request } => {
            let id = adapter.speak_with_fallback(&text, request)?;
            info!("Speaking utterance {}", id);

            let deadline = Instant::now() + SPEAK_TIMEOUT;
            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    adapter.stop()?;
                    bail!("utterance {} did not finish in time", id);
                }
                let Ok(event) = events.recv_timeout(remaining) else {
                    continue;
                };
                println!("{}", event.to_json());
                if event.is_terminal() && event.utterance_id() == Some(id.as_str()) {
                    break;
                }
            }
        }
    }

    adapter.shutdown();
    Ok(())
}
