//! Sequential hand-off of validated cases to the simulation runner.
//!
//! ```text
//! CaseRegistry ──▶ CaseDispatcher ──▶ CaseRunner (one case at a time)
//!                        │
//!                        └──▶ DispatchReport + DispatchEvent stream
//! ```
//!
//! A failing case is recorded and the batch moves on.

pub mod error;
pub mod types;
pub mod traits;
pub mod runner;

pub use error::DispatchError;
pub use types::*;
pub use traits::*;
pub use runner::CaseDispatcher;
