//! Cohorta — follow-up tracking for longitudinal observation protocols.
//!
//! Expands each enrolled patient's parameters into a dense daily due
//! matrix over a one-year horizon, reconciles it against the ledger of
//! tests actually completed, and rolls the result into due lists,
//! per-patient timelines, and cohort adherence statistics. Everything is
//! exposed as data; rendering belongs to the caller.

pub mod config;
pub mod db;
pub mod ledger;
pub mod models;
pub mod reconcile;
pub mod registry;
pub mod schedule;
pub mod stats;
pub mod store;
pub mod tracker;

use tracing_subscriber::EnvFilter;

pub use tracker::{Tracker, TrackerError};

/// Initialize tracing for binaries embedding the tracker. Honors
/// RUST_LOG, falling back to the built-in filter.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
}
