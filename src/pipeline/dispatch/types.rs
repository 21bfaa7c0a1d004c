use serde::{Deserialize, Serialize};

use crate::models::CaseRecord;

// ═══════════════════════════════════════════
// Runner input
// ═══════════════════════════════════════════

/// Everything the runner needs for one case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseContext {
    pub case: CaseRecord,
    pub boundary_names: Vec<String>,
    /// 0-based position in the batch.
    pub index: usize,
    pub total: usize,
}

impl CaseContext {
    pub fn case_id(&self) -> &str {
        &self.case.case_id
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 == self.total
    }
}

// ═══════════════════════════════════════════
// Outcomes
// ═══════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CaseOutcome {
    Success,
    Failure { reason: String },
}

impl CaseOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchEntry {
    pub case_id: String,
    pub outcome: CaseOutcome,
    pub duration_ms: u64,
}

/// Ordered per-case results of one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub entries: Vec<DispatchEntry>,
    pub duration_ms: u64,
}

impl DispatchReport {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.entries.len() - self.succeeded()
    }

    pub fn case_ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.case_id.as_str()).collect()
    }

    pub fn outcome_of(&self, case_id: &str) -> Option<&CaseOutcome> {
        self.entries
            .iter()
            .find(|e| e.case_id == case_id)
            .map(|e| &e.outcome)
    }
}

// ═══════════════════════════════════════════
// Progress events
// ═══════════════════════════════════════════

/// Emitted while a dispatch runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DispatchEvent {
    Started {
        case_count: usize,
    },
    CaseStarted {
        index: usize,
        case_id: String,
    },
    CaseFinished {
        index: usize,
        case_id: String,
        outcome: CaseOutcome,
    },
    Completed {
        succeeded: usize,
        failed: usize,
        duration_ms: u64,
    },
}
