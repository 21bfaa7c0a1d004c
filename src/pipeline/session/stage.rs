use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;

/// Discrete protocol state of one extraction session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    DocumentLoaded,
    CasesEnumerated,
    AwaitingSelection,
    SelectionInterpreted,
    CasesStructured,
    AwaitingMesh,
    Dispatching,
    PerCaseRunning { index: usize },
    Completed,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::DocumentLoaded => "document_loaded",
            Self::CasesEnumerated => "cases_enumerated",
            Self::AwaitingSelection => "awaiting_selection",
            Self::SelectionInterpreted => "selection_interpreted",
            Self::CasesStructured => "cases_structured",
            Self::AwaitingMesh => "awaiting_mesh",
            Self::Dispatching => "dispatching",
            Self::PerCaseRunning { .. } => "per_case_running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Transition table. Forward edges follow the protocol; `Failed` is
    /// reachable from everywhere; `Idle` is the explicit reset target.
    pub fn can_transition_to(&self, next: Stage) -> bool {
        use Stage::*;

        if self.is_terminal() {
            return false;
        }
        if next == Failed {
            return true;
        }
        if next == Idle {
            return !matches!(self, Idle | PerCaseRunning { .. });
        }

        matches!(
            (*self, next),
            (Idle, DocumentLoaded)
                | (DocumentLoaded, CasesEnumerated)
                | (CasesEnumerated, AwaitingSelection)
                | (AwaitingSelection, SelectionInterpreted)
                | (AwaitingSelection, CasesStructured)
                | (SelectionInterpreted, CasesStructured)
                | (CasesStructured, AwaitingMesh)
                | (AwaitingMesh, Dispatching)
                | (Dispatching, PerCaseRunning { .. })
                | (Dispatching, Completed)
                | (PerCaseRunning { .. }, Dispatching)
        )
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PerCaseRunning { index } => write!(f, "per_case_running({index})"),
            other => f.write_str(other.as_str()),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Stage transition {from} -> {to} is not allowed")]
pub struct IllegalTransition {
    pub from: Stage,
    pub to: Stage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageTransition {
    pub from: Stage,
    pub to: Stage,
    pub at: NaiveDateTime,
}

/// Current stage plus the ordered record of every change.
#[derive(Debug, Clone)]
pub struct StageLog {
    current: Stage,
    transitions: Vec<StageTransition>,
}

impl StageLog {
    pub fn new() -> Self {
        Self {
            current: Stage::Idle,
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> Stage {
        self.current
    }

    pub fn transitions(&self) -> &[StageTransition] {
        &self.transitions
    }

    /// Move to `to` if the table allows it. The log is unchanged on error.
    pub fn advance(&mut self, to: Stage) -> Result<(), IllegalTransition> {
        let from = self.current;
        if !from.can_transition_to(to) {
            return Err(IllegalTransition { from, to });
        }
        tracing::debug!(from = %from, to = %to, "Stage transition");
        self.transitions.push(StageTransition {
            from,
            to,
            at: chrono::Local::now().naive_local(),
        });
        self.current = to;
        Ok(())
    }
}

impl Default for StageLog {
    fn default() -> Self {
        Self::new()
    }
}
