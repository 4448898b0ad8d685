mod config;
mod directory;
mod identity;
mod ipc;
mod logging;
mod page;
mod registration;
mod schedule;
mod workbook;

use std::io::{self, BufRead, Write};

fn main() {
    // A broken config must not take the form down; fall back to defaults.
    let (cfg, cfg_result) = match config::load() {
        Ok((cfg, source)) => (cfg, Ok(source)),
        Err(e) => (config::AppConfig::default(), Err(e)),
    };
    logging::init(&cfg.log_level);
    match &cfg_result {
        Ok(Some(path)) => tracing::info!(path = %path.to_string_lossy(), "loaded config"),
        Ok(None) => tracing::info!("no config file; using defaults"),
        Err(e) => tracing::error!(error = %format!("{e:#}"), "invalid config; using defaults"),
    }
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = ?cfg.backend,
        "salidasd starting"
    );

    let mut state = ipc::AppState::new(cfg);
    tracing::debug!(identity_dir = %state.identity.dir().to_string_lossy(), "identity store");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                tracing::warn!(error = %e, "bad request line");
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
    tracing::info!("stdin closed; exiting");
}
