//! Casewright: document → validated simulation cases → sequential dispatch.
//!
//! ```text
//! document text ──▶ enumeration ──▶ operator selection ──▶ structured JSON
//!        ──▶ tolerant extraction + schema validation ──▶ CaseRegistry
//!        ──▶ mesh boundaries ──▶ CaseDispatcher ──▶ CaseRunner
//! ```
//!
//! `pipeline::session::ExtractionSession` owns one conversation and its
//! stage machine; completion providers sit behind
//! `pipeline::completion::CompletionClient`.

pub mod config;
pub mod models;
pub mod pipeline;

use tracing_subscriber::EnvFilter;

pub use pipeline::session::{ExtractionSession, SessionError, Stage};

/// Install the global `tracing` subscriber. `RUST_LOG` wins over the
/// default filter. Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let result = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();

    if result.is_ok() {
        tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
    }
}
