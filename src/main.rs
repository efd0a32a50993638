mod attendance;
mod auth;
mod config;
mod grades;
mod ipc;

use anyhow::Context;
use std::io::{self, BufRead, Write};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

// stdout carries responses, so logs go to stderr.
fn init_logging(cfg: &config::Config) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_filter))
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cfg = config::Config::from_env();
    init_logging(&cfg);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        score_policy = ?cfg.score_policy,
        "schoold starting"
    );

    let mut state = ipc::AppState::new(cfg);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line.context("read request line")?;
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                warn!(error = %e, "malformed request line");
                writeln!(stdout, "{}", ipc::bad_json(e.to_string()))?;
                stdout.flush()?;
                continue;
            }
        };

        debug!(id = %req.id, method = %req.method, "request");
        let resp = ipc::handle_request(&mut state, req);
        writeln!(stdout, "{}", resp).context("write response")?;
        stdout.flush()?;
    }

    info!("stdin closed, shutting down");
    Ok(())
}
