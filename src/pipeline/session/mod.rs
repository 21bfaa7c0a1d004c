//! Per-session extraction protocol.
//!
//! ```text
//! Idle ─load_document─▶ CasesEnumerated ─▶ AwaitingSelection
//!   ─interpret_user_selection─▶ SelectionInterpreted
//!   ─extract_structured_case─▶ CasesStructured
//!   ─receive_mesh─▶ AwaitingMesh ─▶ Dispatching
//!   ─begin_dispatch─▶ (PerCaseRunning ⇄ Dispatching)* ─▶ Completed
//! ```

pub mod stage;
pub mod inflight;
pub mod conversation;
pub mod export;
pub mod machine;

pub use stage::{IllegalTransition, Stage, StageLog, StageTransition};
pub use inflight::{AbortHandle, ActiveCall, InFlightTracker, SettledCall};
pub use conversation::ConversationLog;
pub use export::{export_file_name, ExportError, ExportMetadata, SessionExport};
pub use machine::ExtractionSession;

use thiserror::Error;

use crate::pipeline::completion::CompletionError;
use crate::pipeline::dispatch::DispatchError;
use crate::pipeline::ingest::{DocumentError, MeshError};
use crate::pipeline::structuring::{ExtractionError, FatalConfigError, ValidationError};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Fatal configuration error: {0}")]
    Fatal(#[from] FatalConfigError),

    #[error("Operation {operation} is not allowed in stage {stage}")]
    InvalidTransition {
        operation: &'static str,
        stage: Stage,
    },

    #[error("This session has already dispatched its cases")]
    AlreadyDispatched,

    #[error("Another completion call is already in flight")]
    CallInFlight,

    #[error("Mesh error: {0}")]
    Mesh(#[from] MeshError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

impl SessionError {
    /// True when the failed action may simply be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Completion(_) | Self::Extraction(_) | Self::Validation(_) | Self::CallInFlight
        )
    }
}
