// Replay - Feed newline-delimited JSON snapshots through the detection engine
//
// Usage:
//   replay [--config <PATH>] [SNAPSHOTS.jsonl]
//
// Reads stdin when no file is given. Emitted events go to stdout as JSON lines,
// logs go to stderr. Cooldowns run on snapshot time so replays are repeatable.

use market_events::core::types::CooldownClock;
use market_events::{setup_logging, ConfigManager, DetectionEngine, EventRecord, MarketSnapshot};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use tracing::{info, warn};

struct ReplayArgs {
    config_path: Option<String>,
    input_path: Option<String>,
}

impl ReplayArgs {
    fn from_args() -> Result<Self, String> {
        let mut config_path = None;
        let mut input_path = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    config_path = Some(args.next().ok_or("--config requires a path")?);
                }
                "--help" | "-h" => {
                    return Err("usage: replay [--config <PATH>] [SNAPSHOTS.jsonl]".to_string());
                }
                other if input_path.is_none() => input_path = Some(other.to_string()),
                other => return Err(format!("unexpected argument: {}", other)),
            }
        }

        Ok(Self { config_path, input_path })
    }
}

fn main() {
    let args = match ReplayArgs::from_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            std::process::exit(2);
        }
    };

    if let Err(e) = run(args) {
        eprintln!("replay failed: {}", e);
        std::process::exit(1);
    }
}

fn run(args: ReplayArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigManager::new(args.config_path.as_deref())?;
    let mut engine_config = config.engine();
    setup_logging(Some(&engine_config.log_level), engine_config.json_logs);
    config.validate()?;

    engine_config.cooldown_clock = CooldownClock::EventTime;
    let mut engine = DetectionEngine::with_default_detectors(engine_config, &config.thresholds());

    let reader: Box<dyn BufRead> = match &args.input_path {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let stdout = io::stdout();
    let sink = |event: EventRecord| match serde_json::to_string(&event) {
        Ok(line) => {
            if let Err(e) = writeln!(stdout.lock(), "{}", line) {
                warn!(error = %e, "Failed to write event");
            }
        }
        Err(e) => warn!(error = %e, "Failed to serialize event"),
    };

    let mut malformed = 0u64;
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let snapshot: MarketSnapshot = match serde_json::from_str(&line) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(line = line_no + 1, error = %e, "Skipping malformed snapshot");
                malformed += 1;
                continue;
            }
        };
        let symbol = snapshot.symbol.clone();
        engine.process_and_publish(&symbol, snapshot, &sink);
    }

    let stats = engine.stats();
    info!(malformed = malformed, "Replay finished: {}", stats);
    for (detector, detector_stats) in &stats.detectors {
        info!(detector = *detector, events = detector_stats.events, failures = detector_stats.failures, "Detector summary");
    }
    Ok(())
}
