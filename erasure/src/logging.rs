// erasure/src/logging.rs
//
// RUST_LOG=debug erasure serve ... to see the details.

use anyhow::Context;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Where human-readable logs go besides the log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Console {
    Stdout,
    /// Keeps stdout clean for command output.
    Stderr,
}

/// Installs the global subscriber: `RUST_LOG` filter (default `info`), a console layer,
/// and an append-only file layer served by `GET /api/logs`.
pub fn init(log_path: &Path, console: Console) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = fmt::layer().with_ansi(false).with_writer(Mutex::new(file));
    let console_layer = match console {
        Console::Stdout => fmt::layer().with_writer(io::stdout).boxed(),
        Console::Stderr => fmt::layer().with_writer(io::stderr).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(())
}
