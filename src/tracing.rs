//! Subscriber setup for the middleware's structured log output.
//!
//! Installs a `tracing-subscriber` fmt layer with file names, line numbers and levels,
//! and reports span timings on close. The filter level is read once at init time.

use std::sync::atomic::{AtomicU8, Ordering};

use tracing_subscriber::{
    Layer, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt,
};

pub use tracing::level_filters::LevelFilter;

static TRACING_LEVEL: AtomicU8 = AtomicU8::new(4);

/// Sets the level used by the next call to [`init_tracing`].
pub fn set_tracing_level(level_filter: LevelFilter) {
    TRACING_LEVEL.store(encode(level_filter), Ordering::Relaxed);
}

/// Initializes the global tracing subscriber with formatted output.
///
/// Does nothing if a global subscriber is already installed.
pub fn init_tracing() {
    let level = decode(TRACING_LEVEL.load(Ordering::Relaxed));
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_span_events(FmtSpan::CLOSE)
                .with_file(true)
                .with_line_number(true)
                .with_level(true)
                .with_filter(level),
        )
        .try_init();
}

fn encode(level: LevelFilter) -> u8 {
    [
        LevelFilter::OFF,
        LevelFilter::ERROR,
        LevelFilter::WARN,
        LevelFilter::INFO,
        LevelFilter::DEBUG,
    ]
    .iter()
    .position(|l| *l == level)
    .unwrap_or(5) as u8
}

fn decode(raw: u8) -> LevelFilter {
    match raw {
        0 => LevelFilter::OFF,
        1 => LevelFilter::ERROR,
        2 => LevelFilter::WARN,
        3 => LevelFilter::INFO,
        4 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}
