//! At-most-one completion call per session, with operator abort.
//!
//! `InFlightTracker` lives behind an `Arc` shared by the session and every
//! `AbortHandle` cloned from it, so another thread can see what is running
//! and ask for it to stop.
//!
//! An aborted call's worker keeps running until the provider answers. The
//! tracker holds on to it, and the session stays busy, until it finishes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use serde::Serialize;

use crate::models::CallPurpose;
use crate::pipeline::completion::{CompletionError, CompletionResponse};

pub type CompletionResult = Result<CompletionResponse, CompletionError>;

/// Snapshot of the call currently in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveCall {
    pub purpose: CallPurpose,
    /// When the call started (ISO 8601).
    pub started_at: String,
}

/// Worker of an aborted call that has not returned yet.
struct AbandonedCall {
    call: ActiveCall,
    result: Receiver<CompletionResult>,
    worker: JoinHandle<()>,
}

/// What an abandoned worker produced once it finished.
#[derive(Debug)]
pub struct SettledCall {
    pub call: ActiveCall,
    pub result: CompletionResult,
}

pub struct InFlightTracker {
    lock: Mutex<()>,
    current: Mutex<Option<ActiveCall>>,
    abort_requested: AtomicBool,
    abandoned: Mutex<Option<AbandonedCall>>,
}

impl InFlightTracker {
    pub fn new() -> Self {
        Self {
            lock: Mutex::new(()),
            current: Mutex::new(None),
            abort_requested: AtomicBool::new(false),
            abandoned: Mutex::new(None),
        }
    }

    /// Mark a call as in flight. Returns `None` if one already is, or if
    /// an aborted call's worker is still running.
    pub fn try_acquire(&self, purpose: CallPurpose) -> Option<InFlightGuard<'_>> {
        let guard = self.lock.try_lock().ok()?;
        if self.abandoned_pending() {
            return None;
        }
        if let Ok(mut current) = self.current.lock() {
            *current = Some(ActiveCall {
                purpose,
                started_at: chrono::Utc::now().to_rfc3339(),
            });
        }
        Some(InFlightGuard {
            _guard: guard,
            tracker: self,
        })
    }

    /// The running call, or the aborted one whose worker is still out.
    pub fn current_call(&self) -> Option<ActiveCall> {
        if let Some(call) = self.current.lock().ok()?.clone() {
            return Some(call);
        }
        let abandoned = self.abandoned.lock().ok()?;
        abandoned
            .as_ref()
            .filter(|a| !a.worker.is_finished())
            .map(|a| a.call.clone())
    }

    pub fn is_busy(&self) -> bool {
        self.lock.try_lock().is_err() || self.abandoned_pending()
    }

    /// Keep an aborted call's worker until it returns.
    pub fn abandon(&self, result: Receiver<CompletionResult>, worker: JoinHandle<()>) {
        let Some(call) = self.current.lock().ok().and_then(|c| c.clone()) else {
            return;
        };
        if let Ok(mut abandoned) = self.abandoned.lock() {
            *abandoned = Some(AbandonedCall {
                call,
                result,
                worker,
            });
        }
    }

    /// Take the abandoned call if its worker has finished. A worker that
    /// died without sending reports `WorkerLost`.
    pub fn take_settled(&self) -> Option<SettledCall> {
        let mut abandoned = self.abandoned.lock().ok()?;
        if !abandoned.as_ref()?.worker.is_finished() {
            return None;
        }
        let AbandonedCall { call, result, .. } = abandoned.take()?;
        let result = result.try_recv().unwrap_or(Err(CompletionError::WorkerLost));
        Some(SettledCall { call, result })
    }

    fn abandoned_pending(&self) -> bool {
        self.abandoned
            .lock()
            .map(|a| a.as_ref().is_some_and(|a| !a.worker.is_finished()))
            .unwrap_or(false)
    }

    pub fn abort_requested(&self) -> bool {
        self.abort_requested.load(Ordering::SeqCst)
    }

    // Abort and clear both hold `current`, so a request never outlives its call.
    fn request_abort(&self) -> bool {
        let Ok(current) = self.current.lock() else {
            return false;
        };
        if current.is_none() {
            return false;
        }
        self.abort_requested.store(true, Ordering::SeqCst);
        true
    }

    fn clear(&self) {
        if let Ok(mut current) = self.current.lock() {
            *current = None;
            self.abort_requested.store(false, Ordering::SeqCst);
        }
    }
}

impl Default for InFlightTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII marker for the in-flight call. Dropping it frees the slot and
/// clears any pending abort request.
pub struct InFlightGuard<'a> {
    _guard: MutexGuard<'a, ()>,
    tracker: &'a InFlightTracker,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.tracker.clear();
    }
}

/// Cloneable handle for aborting a session's pending call from another thread.
#[derive(Clone)]
pub struct AbortHandle {
    tracker: Arc<InFlightTracker>,
}

impl AbortHandle {
    pub(crate) fn new(tracker: Arc<InFlightTracker>) -> Self {
        Self { tracker }
    }

    /// Ask the pending call to stop. Returns false when nothing is in flight.
    pub fn abort(&self) -> bool {
        let requested = self.tracker.request_abort();
        if requested {
            tracing::info!("Abort requested for in-flight completion call");
        }
        requested
    }

    pub fn is_in_flight(&self) -> bool {
        self.tracker.is_busy()
    }

    pub fn current_call(&self) -> Option<ActiveCall> {
        self.tracker.current_call()
    }
}
