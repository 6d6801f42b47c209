//! Tracing subscriber setup.
//!
//! The engine emits structured [`tracing`] events throughout (node
//! execution, routing decisions, checkpoint saves); this module wires a
//! reasonable default subscriber for binaries and examples. Libraries
//! embedding the engine should install their own subscriber instead and
//! skip [`init`].

use std::io::IsTerminal;

use tracing_error::ErrorLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the default subscriber: `RUST_LOG`-driven filtering (falling
/// back to `info`), compact formatting with ANSI colors when stderr is a
/// terminal, plus span-trace capture for error reports.
///
/// Idempotent: a second call (or a subscriber installed elsewhere) is a
/// no-op rather than a panic.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let ansi = std::io::stderr().is_terminal();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_ansi(ansi))
        .with(ErrorLayer::default())
        .try_init()
        .ok();
}
