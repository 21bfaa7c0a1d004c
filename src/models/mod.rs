pub mod enums;
pub mod conversation;
pub mod case;
pub mod usage;

pub use enums::*;
pub use conversation::*;
pub use case::*;
pub use usage::*;

use thiserror::Error;

/// A string did not name any variant of a string-backed enum.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid value for {field}: {value}")]
pub struct InvalidEnum {
    pub field: String,
    pub value: String,
}
