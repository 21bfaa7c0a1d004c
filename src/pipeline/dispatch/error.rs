use thiserror::Error;

/// Failure of one dispatched case, or of setting up the dispatch.
///
/// Per-case errors are captured in the report; they never stop the batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Case registry is empty")]
    EmptyRegistry,

    #[error("Case setup failed: {0}")]
    Setup(String),

    #[error("Simulation failed: {0}")]
    Simulation(String),

    #[error("Case runner unavailable: {0}")]
    RunnerUnavailable(String),
}
