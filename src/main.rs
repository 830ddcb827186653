pub mod app;
pub mod auth;
pub mod backend;
pub mod client;
pub mod config;
pub mod console;
pub mod dispatch;
pub mod models;
pub mod query;
pub mod render;
pub mod report;
pub mod repository {
    pub mod activities;
    pub mod farms;
    pub mod harvests;
    pub mod profiles;
    pub mod soil;
    pub mod validate;
}
pub mod secrets;
pub mod session;

#[cfg(test)]
mod testing;

use crate::app::App;
use crate::client::SupabaseClient;
use crate::config::{Config, DEFAULT_SECRETS_FILE};
use crate::secrets::SecretStore;
use crate::session::MemorySessionStore;
use log::{error, info, warn};
use std::io::Write;
use std::path::PathBuf;

pub fn run(secrets: &SecretStore) -> Result<(), String> {
    let cfg = Config::from_secrets(secrets).map_err(|e| e.to_string())?;
    info!("Config loaded (backend={})", cfg.supabase_url);

    let client = SupabaseClient::new(cfg);
    let mut app = App::new(&client, MemorySessionStore::new());

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    console::run(&mut app, stdin.lock(), stdout.lock()).map_err(|e| format!("console I/O failed: {}", e))?;

    if app.view().is_logged_in() {
        warn!("Console closed while still logged in; session discarded");
    }
    Ok(())
}

fn secrets_from_cli() -> Result<SecretStore, String> {
    let mut args = std::env::args_os();
    args.next(); // skip program name

    let mut secrets_file: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        match arg.to_str() {
            Some("--secrets-file") => {
                if secrets_file.is_some() {
                    return Err("`--secrets-file` provided more than once".to_string());
                }
                let value = args
                    .next()
                    .ok_or_else(|| "`--secrets-file` requires a path argument".to_string())?;
                secrets_file = Some(PathBuf::from(value));
            }
            Some(s) if s.starts_with("--secrets-file=") => {
                if secrets_file.is_some() {
                    return Err("`--secrets-file` provided more than once".to_string());
                }
                let path_str = &s["--secrets-file=".len()..];
                if path_str.is_empty() {
                    return Err("`--secrets-file` requires a path argument".to_string());
                }
                secrets_file = Some(PathBuf::from(path_str));
            }
            Some("--") => break,
            Some(other) => return Err(format!("unrecognised argument: {}", other)),
            None => return Err("argument contains invalid UTF-8".to_string()),
        }
    }

    match secrets_file {
        Some(path) => SecretStore::load_file(&path).map_err(|e| e.to_string()),
        None => {
            let cwd = std::env::current_dir().map_err(|e| format!("unable to read current directory: {}", e))?;
            let default_path = cwd.join(DEFAULT_SECRETS_FILE);
            if default_path.is_file() {
                SecretStore::load_file(&default_path).map_err(|e| e.to_string())
            } else {
                Ok(SecretStore::from_env())
            }
        }
    }
}

fn main() {
    let secrets = match secrets_from_cli() {
        Ok(store) => store,
        Err(err) => {
            report_fatal(&err, &mut std::io::stderr());
            std::process::exit(1);
        }
    };

    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    match secrets.source() {
        Some(path) => info!("Secrets loaded from {}", path.display()),
        None => info!("No secrets file found; using the process environment only"),
    }

    info!(
        "coffee-lab {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );
    if let Err(e) = run(&secrets) {
        report_fatal(&e, &mut std::io::stderr());
        std::process::exit(1);
    }
}

/// Logged and also written to `out`, which the log filter cannot silence.
fn report_fatal(message: &str, out: &mut impl Write) {
    error!("fatal: {}", message);
    let _ = writeln!(out, "fatal: {}", message);
}
