//! slugdrop: ephemeral file sharing. Uploads are stored under a short slug,
//! served while the link is live, and reclaimed once it expires.

pub mod clock;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod link_store;
pub mod packager;
pub mod security;
pub mod server;
pub mod storage;
pub mod sweeper;
pub mod validate;

pub use error::{AppError, AppResult};
pub use lifecycle::LinkManager;

// Test-only printing helper: expands to eprintln! during tests and is absent otherwise.
// Usage in tests: tprintln!("debug: {}", value);
#[cfg(any(test, debug_assertions))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ( eprintln!($($arg)*) );
}

// In non-test builds, provide a no-op tprintln! so calls compile without effect.
#[cfg(not(any(test, debug_assertions)))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ({
        if false { let _ = format!($($arg)*); }
    });
}

/// Install the `tracing` subscriber used by the binaries: `RUST_LOG` when set,
/// `info` otherwise.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).try_init();
}
