//! REPL – Read-Eval-Print Loop for the Vista interactive shell.
//!
//! Supported slash-commands:
//!   /scan <fixture> – replay a recorded frame through the engine
//!   /last           – describe the current snapshot again
//!   /config         – print the effective perception settings
//!   /schema         – print the JSON schema of a snapshot
//!   /help           – show this list
//!   /quit | /exit   – gracefully exit the CLI

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::runtime::Runtime;
use tracing::info;
use vista_runtime::{EventBus, PerceptionEngine, Topic, TopicReceiver};
use vista_types::{EventPayload, Snapshot};

use crate::config::Config;
use crate::replay::{Fixture, ReplayRecognizer};

/// A parsed REPL input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Scan(String),
    Last,
    Config,
    Schema,
    Help,
    Quit,
    Unknown(String),
}

/// Parse one trimmed, non-empty input line.
pub fn parse_command(line: &str) -> Command {
    let mut parts = line.splitn(2, char::is_whitespace);
    let head = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::trim).unwrap_or_default();

    match head {
        "/scan" if !arg.is_empty() => Command::Scan(arg.to_string()),
        "/last" => Command::Last,
        "/config" => Command::Config,
        "/schema" => Command::Schema,
        "/help" => Command::Help,
        "/quit" | "/exit" => Command::Quit,
        _ => Command::Unknown(line.to_string()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// What one `/scan` produced.
#[derive(Debug)]
pub struct ScanReport {
    pub snapshot: Snapshot,
    pub sentence: String,
    /// Recognizer failures reported on the diagnostics topic.
    pub degraded: Vec<String>,
}

/// Engine plus the replay recognizer feeding it.
pub struct Session {
    engine: PerceptionEngine,
    replay: Arc<ReplayRecognizer>,
    diagnostics: TopicReceiver,
    fixture_dir: PathBuf,
}

impl Session {
    pub fn new(cfg: Config) -> Self {
        let replay = Arc::new(ReplayRecognizer::new());
        let engine = PerceptionEngine::with_bus(
            replay.clone(),
            replay.clone(),
            cfg.perception,
            EventBus::new(cfg.event_capacity),
        );
        let diagnostics = engine.subscribe(Topic::Diagnostics);
        Self {
            engine,
            replay,
            diagnostics,
            fixture_dir: PathBuf::from(cfg.fixture_dir),
        }
    }

    /// Resolve `arg` as given, falling back to the fixture directory.
    pub fn resolve(&self, arg: &str) -> PathBuf {
        let direct = PathBuf::from(arg);
        if direct.exists() {
            return direct;
        }
        let in_dir = self.fixture_dir.join(arg);
        if in_dir.exists() || Path::new(arg).extension().is_some() {
            return in_dir;
        }
        self.fixture_dir.join(format!("{arg}.json"))
    }

    /// Replay `fixture` through the engine and collect what happened.
    pub async fn scan(&mut self, fixture: Fixture) -> ScanReport {
        let frame = fixture.frame();
        self.replay.load(fixture);

        let snapshot = self.engine.perceive(frame).await;
        let sentence = self.engine.describe(&snapshot);

        let mut degraded = Vec::new();
        while let Ok(event) = self.diagnostics.try_recv() {
            if let EventPayload::RecognizerDegraded { source, reason } = event.payload {
                degraded.push(format!("{source}: {reason}"));
            }
        }

        info!(entities = snapshot.len(), degraded = degraded.len(), "scan complete");
        ScanReport {
            snapshot,
            sentence,
            degraded,
        }
    }

    pub fn engine(&self) -> &PerceptionEngine {
        &self.engine
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Loop
// ─────────────────────────────────────────────────────────────────────────────

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(runtime: &Runtime, cfg: Config, shutdown: Arc<AtomicBool>) {
    let mut session = Session::new(cfg);
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "vista>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        let cmd = line.trim();
        if cmd.is_empty() {
            continue;
        }

        match parse_command(cmd) {
            Command::Scan(arg) => cmd_scan(runtime, &mut session, &arg),
            Command::Last => cmd_last(&session),
            Command::Config => cmd_config(&session),
            Command::Schema => cmd_schema(),
            Command::Help => cmd_help(),
            Command::Quit => {
                println!("{}", "Goodbye.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            Command::Unknown(other) => {
                println!(
                    "{} '{}'. Type {} for available commands.",
                    "Unknown command:".red(),
                    other.yellow(),
                    "/help".bold()
                );
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "Vista Commands".bold().underline());
    println!("  {} – replay a recorded frame", "/scan <fixture>".bold().cyan());
    println!("  {}           – describe the current snapshot", "/last".bold().cyan());
    println!("  {}         – show perception settings", "/config".bold().cyan());
    println!("  {}         – snapshot JSON schema", "/schema".bold().cyan());
    println!("  {}    – exit the CLI", "/quit  /exit".bold().cyan());
    println!();
}

fn cmd_scan(runtime: &Runtime, session: &mut Session, arg: &str) {
    let path = session.resolve(arg);
    let fixture = match Fixture::from_path(&path) {
        Ok(f) => f,
        Err(e) => {
            println!("{}: {}", "Fixture error".red(), e);
            return;
        }
    };

    let report = runtime.block_on(session.scan(fixture));

    for reason in &report.degraded {
        println!("  {} {}", "degraded".yellow().bold(), reason.dimmed());
    }
    if report.snapshot.is_empty() {
        println!("  {}", "(no entities)".dimmed());
    } else {
        for entity in &report.snapshot.entities {
            println!(
                "  {:<24} {:>4}%  {}",
                entity.label.bold(),
                entity.confidence_percent(),
                entity.sector.tag().cyan()
            );
        }
    }
    println!();
    println!("  {} {}", "»".green().bold(), report.sentence);
    println!();
}

fn cmd_last(session: &Session) {
    println!("  {} {}", "»".green().bold(), session.engine().describe_current());
}

fn cmd_config(session: &Session) {
    match toml::to_string_pretty(session.engine().config()) {
        Ok(raw) => println!("{}", raw),
        Err(e) => println!("{}: {}", "Error rendering config".red(), e),
    }
}

fn cmd_schema() {
    let schema = schemars::schema_for!(Snapshot);
    match serde_json::to_string_pretty(&schema) {
        Ok(raw) => println!("{}", raw),
        Err(e) => println!("{}: {}", "Error rendering schema".red(), e),
    }
}
