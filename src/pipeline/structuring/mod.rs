pub mod prompt;
pub mod parser;
pub mod validation;

pub use prompt::*;
pub use parser::*;
pub use validation::*;

use thiserror::Error;

/// No usable JSON object could be recovered from a model response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Model response is empty")]
    Empty,

    #[error("Model response contains truncated JSON: {0}")]
    Truncated(String),

    #[error("Model response contains no JSON object: {0}")]
    NotJson(String),
}

/// One field that failed schema validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Top-level key of the offending case; `None` for registry-wide problems.
    pub case_label: Option<String>,
    pub field: String,
    pub reason: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.case_label {
            Some(label) => write!(f, "{label}.{}: {}", self.field, self.reason),
            None => write!(f, "{}: {}", self.field, self.reason),
        }
    }
}

/// Fail-closed schema rejection with every violated field listed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Case validation failed: {}", format_violations(.violations))]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    /// Names of the violated fields, in report order.
    pub fn fields(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.field.as_str()).collect()
    }

    pub fn names_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Allowed solver/model lists are unusable. The session cannot continue.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FatalConfigError {
    #[error("Allowed {0} list is empty")]
    EmptyList(&'static str),

    #[error("Allowed {list} entry {entry:?} is malformed: {reason}")]
    MalformedEntry {
        list: &'static str,
        entry: String,
        reason: &'static str,
    },

    #[error("Allowed {list} entry {entry:?} is listed twice")]
    DuplicateEntry { list: &'static str, entry: String },
}
