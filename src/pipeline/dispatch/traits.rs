use super::error::DispatchError;
use super::types::CaseContext;

/// External execution collaborator: sets up and runs one case, blocking.
pub trait CaseRunner: Send + Sync {
    fn run(&self, context: &CaseContext) -> Result<(), DispatchError>;
}

impl<F> CaseRunner for F
where
    F: Fn(&CaseContext) -> Result<(), DispatchError> + Send + Sync,
{
    fn run(&self, context: &CaseContext) -> Result<(), DispatchError> {
        self(context)
    }
}
