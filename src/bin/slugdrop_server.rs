//!
//! slugdrop server binary
//! ----------------------
//! Command-line entry point for the HTTP server and its background sweeper.
//! Settings come from an optional JSON file, `SLUGDROP_*` environment variables
//! and finally the flags below.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use slugdrop::config::Settings;

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag {
            return args.get(i + 1).cloned();
        }
        i += 1;
    }
    None
}

fn parse_port_arg(args: &[String], flag: &str) -> Result<Option<u16>> {
    match arg_value(args, flag) {
        Some(v) => Ok(Some(v.parse::<u16>().with_context(|| format!("{flag} expects a port number, got '{v}'"))?)),
        None => Ok(None),
    }
}

fn has_flag(args: &[String], flag: &str) -> bool { args.iter().any(|a| a == flag) }

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("slugdrop Server\n\nUSAGE:\n  slugdrop_server [--config FILE] [--http-port N] [--upload-dir PATH] [--database FILE]\n\nOPTIONS:\n  --config FILE       JSON settings file (applied before the environment)\n  --http-port N       HTTP port (env: SLUGDROP_HTTP_PORT, default 8000)\n  --upload-dir PATH   Storage root (env: SLUGDROP_UPLOAD_DIR, default uploads)\n  --database FILE     SQLite link table (env: SLUGDROP_DATABASE, default files.db)\n\nThe upload secret must be set with SLUGDROP_UPLOAD_SECRET or SLUGDROP_UPLOAD_SECRET_HASH.\n");
        return Ok(());
    }

    slugdrop::init_tracing();

    let config = arg_value(&args, "--config").map(PathBuf::from);
    let mut settings = Settings::load(config.as_deref())?;
    if let Some(port) = parse_port_arg(&args, "--http-port")? { settings.http_port = port; }
    if let Some(dir) = arg_value(&args, "--upload-dir") { settings.upload_dir = PathBuf::from(dir); }
    if let Some(db) = arg_value(&args, "--database") { settings.database_path = PathBuf::from(db); }
    settings.validate()?;

    println!("slugdrop starting: http={}, upload_dir={}, database={}", settings.http_port, settings.upload_dir.display(), settings.database_path.display());
    slugdrop::server::run(settings).await
}
