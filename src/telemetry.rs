//! Tracing subscriber setup shared by the CLI and the web viewer.

use std::io::IsTerminal;
use std::sync::OnceLock;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

static INITIALISED: OnceLock<()> = OnceLock::new();

/// Installs a fmt subscriber filtered by `RUST_LOG` (default `info`).
/// Later calls are no-ops.
pub fn init_tracing() {
    init_tracing_with_default("info");
}

fn init_tracing_with_default(default_filter: &str) {
    if INITIALISED.set(()).is_err() {
        return;
    }

    let ansi = std::io::stderr().is_terminal();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(ansi)
        .with_writer(std::io::stderr);
    // Another subscriber may already own the global slot (e.g. in tests).
    let _ = Registry::default().with(filter).with(fmt_layer).try_init();
}
