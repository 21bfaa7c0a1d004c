//! CaseDispatcher: runs every case of a registry, one after another.

use std::time::Instant;

use super::error::DispatchError;
use super::traits::CaseRunner;
use super::types::*;
use crate::models::CaseRegistry;

/// Owns a validated registry until it has been dispatched.
///
/// `run` consumes the dispatcher, so a registry is dispatched at most once.
pub struct CaseDispatcher {
    registry: CaseRegistry,
    boundary_names: Vec<String>,
}

impl CaseDispatcher {
    pub fn new(registry: CaseRegistry, boundary_names: Vec<String>) -> Result<Self, DispatchError> {
        if registry.is_empty() {
            return Err(DispatchError::EmptyRegistry);
        }
        Ok(Self {
            registry,
            boundary_names,
        })
    }

    pub fn case_count(&self) -> usize {
        self.registry.len()
    }

    /// Run all cases in registry order. A failing case is recorded in the
    /// report and the next case starts.
    pub fn run(
        self,
        runner: &dyn CaseRunner,
        mut progress_fn: Option<&mut dyn FnMut(DispatchEvent)>,
    ) -> DispatchReport {
        let start = Instant::now();
        let total = self.registry.len();
        let mut emit = |event: DispatchEvent| {
            if let Some(progress) = progress_fn.as_deref_mut() {
                progress(event);
            }
        };

        emit(DispatchEvent::Started { case_count: total });

        let mut report = DispatchReport::default();
        let boundary_names = self.boundary_names;

        for (index, case) in self.registry.into_iter().enumerate() {
            let case_id = case.case_id.clone();
            emit(DispatchEvent::CaseStarted {
                index,
                case_id: case_id.clone(),
            });

            let context = CaseContext {
                case,
                boundary_names: boundary_names.clone(),
                index,
                total,
            };

            let case_start = Instant::now();
            let outcome = match runner.run(&context) {
                Ok(()) => {
                    tracing::info!(case_id = %case_id, index, total, "Case finished");
                    CaseOutcome::Success
                }
                Err(e) => {
                    tracing::warn!(
                        case_id = %case_id,
                        index,
                        error = %e,
                        "Case failed, continuing with next case"
                    );
                    CaseOutcome::Failure {
                        reason: e.to_string(),
                    }
                }
            };
            let duration_ms = case_start.elapsed().as_millis() as u64;

            emit(DispatchEvent::CaseFinished {
                index,
                case_id: case_id.clone(),
                outcome: outcome.clone(),
            });

            report.entries.push(DispatchEntry {
                case_id,
                outcome,
                duration_ms,
            });
        }

        report.duration_ms = start.elapsed().as_millis() as u64;

        emit(DispatchEvent::Completed {
            succeeded: report.succeeded(),
            failed: report.failed(),
            duration_ms: report.duration_ms,
        });

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CaseRecord;
    use std::sync::Mutex;

    fn registry(ids: &[&str]) -> CaseRegistry {
        CaseRegistry::from_validated(
            ids.iter()
                .enumerate()
                .map(|(i, id)| CaseRecord {
                    case_id: id.to_string(),
                    source_label: format!("Case_{}", i + 1),
                    solver: "simpleFoam".into(),
                    turbulence_model: "kOmegaSST".into(),
                    other_physical_model: None,
                    distinguishing_description: format!("AoA={}", i * 5),
                })
                .collect(),
        )
    }

    #[test]
    fn empty_registry_is_rejected() {
        let result = CaseDispatcher::new(CaseRegistry::empty(), vec![]);
        assert!(matches!(result, Err(DispatchError::EmptyRegistry)));
    }

    #[test]
    fn runs_cases_in_registry_order() {
        let seen = Mutex::new(Vec::new());
        let runner = |ctx: &CaseContext| -> Result<(), DispatchError> {
            seen.lock().unwrap().push(ctx.case_id().to_string());
            Ok(())
        };

        let dispatcher = CaseDispatcher::new(registry(&["c", "a", "b"]), vec![]).unwrap();
        let report = dispatcher.run(&runner, None);

        assert_eq!(*seen.lock().unwrap(), vec!["c", "a", "b"]);
        assert_eq!(report.case_ids(), vec!["c", "a", "b"]);
        assert_eq!(report.succeeded(), 3);
    }

    #[test]
    fn failed_case_does_not_stop_batch() {
        let runner = |ctx: &CaseContext| -> Result<(), DispatchError> {
            if ctx.index == 1 {
                Err(DispatchError::Simulation("solver diverged".into()))
            } else {
                Ok(())
            }
        };

        let dispatcher = CaseDispatcher::new(registry(&["a", "b", "c"]), vec![]).unwrap();
        let report = dispatcher.run(&runner, None);

        assert_eq!(report.len(), 3);
        assert!(report.entries[0].outcome.is_success());
        assert_eq!(
            report.entries[1].outcome,
            CaseOutcome::Failure {
                reason: "Simulation failed: solver diverged".into()
            }
        );
        assert!(report.entries[2].outcome.is_success());
    }

    #[test]
    fn context_carries_boundaries_and_position() {
        let contexts = Mutex::new(Vec::new());
        let runner = |ctx: &CaseContext| -> Result<(), DispatchError> {
            contexts.lock().unwrap().push(ctx.clone());
            Ok(())
        };

        let boundaries = vec!["inlet".to_string(), "wall".to_string()];
        let dispatcher = CaseDispatcher::new(registry(&["a", "b"]), boundaries.clone()).unwrap();
        dispatcher.run(&runner, None);

        let contexts = contexts.lock().unwrap();
        assert_eq!(contexts[0].boundary_names, boundaries);
        assert_eq!(contexts[1].index, 1);
        assert_eq!(contexts[1].total, 2);
        assert!(contexts[1].is_last());
    }

    #[test]
    fn progress_events_bracket_each_case() {
        let runner = |_: &CaseContext| -> Result<(), DispatchError> { Ok(()) };
        let mut events = Vec::new();
        let mut record = |event: DispatchEvent| events.push(event);

        let dispatcher = CaseDispatcher::new(registry(&["a", "b"]), vec![]).unwrap();
        dispatcher.run(&runner, Some(&mut record));

        assert_eq!(events.len(), 6);
        assert_eq!(events[0], DispatchEvent::Started { case_count: 2 });
        assert!(matches!(&events[1], DispatchEvent::CaseStarted { index: 0, case_id } if case_id == "a"));
        assert!(matches!(&events[2], DispatchEvent::CaseFinished { index: 0, .. }));
        assert!(matches!(
            events[5],
            DispatchEvent::Completed { succeeded: 2, failed: 0, .. }
        ));
    }
}
