pub mod types;
pub mod openai;
pub mod mock;

pub use types::*;
pub use openai::*;
pub use mock::*;

use thiserror::Error;

/// Provider or transport failure of one completion call.
///
/// The session treats every variant the same way: no stage advance, and the
/// triggering operator action may be retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    #[error("Completion provider unreachable at {0}")]
    Connection(String),

    #[error("Completion request timed out after {0}s")]
    Timeout(u64),

    #[error("Completion provider rejected credentials (status {status})")]
    Auth { status: u16 },

    #[error("Completion provider returned error (status {status}): {body}")]
    Provider { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Malformed completion response: {0}")]
    MalformedResponse(String),

    #[error("Completion response is empty")]
    EmptyResponse,

    #[error("Completion call aborted by operator")]
    Aborted,

    #[error("Completion worker stopped without a result")]
    WorkerLost,

    #[error("Completion client configuration error: {0}")]
    Config(String),
}
