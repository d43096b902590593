//! `vista-cli` – Vista Command Line Interface
//!
//! This binary is a bench for the perception engine.  It:
//!
//! 1. Checks for `~/.vista/config.toml`; runs a **First-Run Wizard** when the
//!    file is absent.
//! 2. Builds a [`PerceptionEngine`][vista_runtime::PerceptionEngine] fed by a
//!    replay recognizer that plays back recorded fixtures.
//! 3. Drops the user into an **interactive REPL** with slash-commands
//!    (`/scan`, `/last`, `/config`, `/schema`, `/help`).
//! 4. Intercepts **Ctrl-C** to exit cleanly.

mod config;
mod repl;
mod replay;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, warn};

fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG filters (default "info"), VISTA_LOG_FORMAT=json switches to
    // JSON lines, OTEL_EXPORTER_OTLP_ENDPOINT enables span export.
    let _telemetry = vista_runtime::init_tracing("vista");

    print_banner();

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – shutting down …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler");
    }

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(None) => run_first_run_wizard(),
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::default()
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("vista-worker")
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to start async runtime");
            return;
        }
    };

    println!();
    println!(
        "  Type {} for a list of commands.\n",
        "/help".bold().cyan()
    );

    // ── Interactive REPL ──────────────────────────────────────────────────
    repl::run(&runtime, cfg, shutdown);
}

// ─────────────────────────────────────────────────────────────────────────────
// First-Run Wizard
// ─────────────────────────────────────────────────────────────────────────────

fn run_first_run_wizard() -> config::Config {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║        Vista First-Run Wizard        ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
    println!("  No configuration found.  Let's set up Vista.\n");

    let mut cfg = config::Config::default();
    config::apply_env_overrides(&mut cfg);

    let verbose = prompt_line("  Mention confidence in descriptions? [y/N]: ", "n");
    cfg.perception.include_confidence = matches!(verbose.to_lowercase().as_str(), "y" | "yes");

    let timeout_str = prompt_line(
        &format!(
            "  Recognizer timeout in ms, 0 to wait forever [{}]: ",
            cfg.perception.branch_timeout_ms
        ),
        &cfg.perception.branch_timeout_ms.to_string(),
    );
    if let Ok(ms) = timeout_str.trim().parse::<u64>() {
        cfg.perception.branch_timeout_ms = ms;
    }

    cfg.fixture_dir = prompt_line(
        &format!("  Fixture directory [{}]: ", cfg.fixture_dir),
        &cfg.fixture_dir,
    );

    match config::save(&cfg) {
        Ok(()) => println!(
            "\n  {} Config saved to {}\n",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
    cfg
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#" _    ___      __      "#.bold().cyan());
    println!("{}", r#"| |  / (_)____/ /_____ _"#.bold().cyan());
    println!("{}", r#"| | / / / ___/ __/ __ `/"#.bold().cyan());
    println!("{}", r#"| |/ / (__  ) /_/ /_/ / "#.bold().cyan());
    println!("{}", r#"|___/_/____/\__/\__,_/  "#.bold().cyan());
    println!();
    println!("  {} {}",
        "Vista".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Scene perception and description engine");
    println!();
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn prompt_line(msg: &str, default: &str) -> String {
    use std::io::{BufRead, Write};
    print!("{}", msg);
    std::io::stdout().flush().ok();
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(_) => {
            let t = line.trim().to_string();
            if t.is_empty() { default.to_string() } else { t }
        }
        Err(_) => default.to_string(),
    }
}
