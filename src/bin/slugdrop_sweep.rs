//! One-shot sweep for cron: reclaims expired links and stray temporaries, prints
//! the pass report and exits. Reads the same settings as the server, and refuses
//! to run while a server (or another sweep) holds the upload dir; a running
//! server sweeps on its own schedule.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use slugdrop::config::Settings;
use slugdrop::sweeper::Sweeper;
use slugdrop::LinkManager;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("slugdrop sweep\n\nUSAGE:\n  slugdrop_sweep [--config FILE]\n\nRuns one expiry sweep over the configured upload dir and database.\nExits with an error if a slugdrop server is running on the same upload dir.\n");
        return Ok(());
    }
    slugdrop::init_tracing();

    let config = args.iter().position(|a| a == "--config").and_then(|i| args.get(i + 1)).map(PathBuf::from);
    let settings = Settings::load(config.as_deref())?;
    let manager = Arc::new(LinkManager::from_settings(&settings)?);
    let rep = Sweeper::new(manager, Duration::from_secs(settings.sweep_interval_secs)).run_once();
    println!(
        "scanned={} reclaimed={} files_removed={} dirs_removed={} temps_removed={} errors={}",
        rep.scanned, rep.reclaimed, rep.files_removed, rep.dirs_removed, rep.temps_removed, rep.errors
    );
    if rep.errors > 0 {
        anyhow::bail!("sweep finished with {} error(s)", rep.errors);
    }
    Ok(())
}
