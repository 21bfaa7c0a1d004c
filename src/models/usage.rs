use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::CallPurpose;

/// Token counts reported by the provider for one completion call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Ledger entry for one completed call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub purpose: CallPurpose,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub timestamp: NaiveDateTime,
}

/// Append-only usage ledger owned by a single session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UsageLedger {
    records: Vec<UsageRecord>,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, purpose: CallPurpose, usage: TokenUsage) {
        self.records.push(UsageRecord {
            purpose,
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
            timestamp: chrono::Local::now().naive_local(),
        });
    }

    pub fn records(&self) -> &[UsageRecord] {
        &self.records
    }

    pub fn total_tokens(&self) -> u64 {
        self.records.iter().map(|r| r.total_tokens).sum()
    }

    /// Total tokens spent on calls of one purpose.
    pub fn tokens_for(&self, purpose: CallPurpose) -> u64 {
        self.records
            .iter()
            .filter(|r| r.purpose == purpose)
            .map(|r| r.total_tokens)
            .sum()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
