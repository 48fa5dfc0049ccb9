//! Planwatch tracks subscription plan state per website and fires one-time
//! payment warnings as trial and billing deadlines approach.
//!
//! The crate exposes a small authenticated REST surface for recording plan
//! state, and runs a periodic scheduler that evaluates every tracked plan
//! against day-offset thresholds, dispatching notifications to a backend
//! service and downgrading plans whose trial has ended.

pub mod app;
pub mod config;
pub mod error;
pub mod health;
pub mod notifier;
pub mod plan;
pub mod scheduler;
pub mod security;
pub mod settings;
pub mod utils;

pub use app::{AppContext, AppContextBuilder, build_router};
pub use config::{Config, ConfigBuilder};
pub use error::{PlanwatchError, Result};
pub use scheduler::Scheduler;

use tracing_subscriber::EnvFilter;

/// Initialises the global tracing subscriber from the environment.
///
/// `RUST_LOG` controls the filter; `PLANWATCH_LOG_JSON=true` switches the
/// output to structured JSON lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,planwatch=debug"));

    let json = std::env::var("PLANWATCH_LOG_JSON")
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Like [`init_tracing`] but driven by an already-loaded [`Config`].
pub fn init_tracing_with_config(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
