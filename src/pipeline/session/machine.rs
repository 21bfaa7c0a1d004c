//! ExtractionSession: drives one document from upload to dispatched cases.
//!
//! Every operation checks the current stage first and returns
//! `InvalidTransition` without touching state when it does not apply.
//! Completion calls run on a worker thread; the session waits on a channel
//! and gives up early when its `AbortHandle` fires.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use super::conversation::ConversationLog;
use super::export::SessionExport;
use super::inflight::{AbortHandle, InFlightTracker};
use super::stage::{Stage, StageLog, StageTransition};
use super::SessionError;
use crate::config::{AppConfig, SchemaConfig};
use crate::models::{CallPurpose, CaseRegistry, ConversationMessage, MessageRole, UsageLedger};
use crate::pipeline::completion::{
    CompletionClient, CompletionError, CompletionResponse, WireMessage,
};
use crate::pipeline::dispatch::{
    CaseDispatcher, CaseRunner, DispatchError, DispatchEvent, DispatchReport,
};
use crate::pipeline::ingest::{
    DocumentError, DocumentTextExtractor, MeshBoundaryExtractor, MeshError,
};
use crate::pipeline::structuring::{
    build_case_summary, build_enumeration_prompt, build_mesh_notice, build_selection_prompt,
    build_structuring_prompt, extract_json_object, revalidate_registry, validate_registry,
    CaseSchema, FatalConfigError, CHOOSE_CASE_MESSAGE, SESSION_SYSTEM_PROMPT,
};

/// How often a waiting session checks for an abort request.
const ABORT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Stages in which the operator may chat freely with the model.
const CONVERSATION_STAGES: &[Stage] = &[
    Stage::AwaitingSelection,
    Stage::SelectionInterpreted,
    Stage::CasesStructured,
    Stage::AwaitingMesh,
];

pub struct ExtractionSession {
    id: Uuid,
    client: Arc<dyn CompletionClient>,
    schema: CaseSchema,
    system_prompt: String,
    stages: StageLog,
    history: ConversationLog,
    document_text: Option<String>,
    /// Enumeration reply, quoted back to the model during selection.
    case_descriptions: Option<String>,
    registry: CaseRegistry,
    boundary_names: Vec<String>,
    usage: UsageLedger,
    inflight: Arc<InFlightTracker>,
    dispatched: bool,
    dispatch_report: Option<DispatchReport>,
}

impl ExtractionSession {
    pub fn new(client: Arc<dyn CompletionClient>, schema: CaseSchema) -> Self {
        let id = Uuid::new_v4();
        tracing::info!(session_id = %id, "Extraction session created");
        Self {
            id,
            client,
            schema,
            system_prompt: SESSION_SYSTEM_PROMPT.trim().to_string(),
            stages: StageLog::new(),
            history: ConversationLog::new(),
            document_text: None,
            case_descriptions: None,
            registry: CaseRegistry::empty(),
            boundary_names: Vec::new(),
            usage: UsageLedger::new(),
            inflight: Arc::new(InFlightTracker::new()),
            dispatched: false,
            dispatch_report: None,
        }
    }

    /// Build a session whose schema comes from the loaded configuration.
    pub fn from_config(
        client: Arc<dyn CompletionClient>,
        config: &AppConfig,
    ) -> Result<Self, FatalConfigError> {
        Ok(Self::new(client, config.schema()?))
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    // ═══════════════════════════════════════════════════════════
    // Protocol operations
    // ═══════════════════════════════════════════════════════════

    /// Send the document for case enumeration. Valid only from `Idle`.
    ///
    /// Returns the model's case list. On success the session posts the
    /// case-choice prompt and waits for the operator's selection.
    pub fn load_document(&mut self, text: &str) -> Result<String, SessionError> {
        let _span = tracing::info_span!("load_document", session_id = %self.id).entered();
        self.require("load_document", &[Stage::Idle])?;
        if text.trim().is_empty() {
            return Err(DocumentError::Empty.into());
        }

        let prompt = build_enumeration_prompt(text);
        let response = self.request_completion(CallPurpose::Enumeration, &prompt)?;
        self.commit_exchange(CallPurpose::Enumeration, &prompt, true, &response, false);

        self.document_text = Some(text.to_string());
        self.advance("load_document", Stage::DocumentLoaded)?;

        self.case_descriptions = Some(response.text.clone());
        self.registry = CaseRegistry::empty();
        self.advance("load_document", Stage::CasesEnumerated)?;

        self.history.add_assistant_message(CHOOSE_CASE_MESSAGE);
        self.advance("load_document", Stage::AwaitingSelection)?;

        tracing::info!(
            chars = text.chars().count(),
            tokens = response.usage.total_tokens,
            "Cases enumerated"
        );
        Ok(response.text)
    }

    /// Extract text with `extractor`, then `load_document`.
    pub fn load_document_bytes(
        &mut self,
        file_bytes: &[u8],
        extractor: &dyn DocumentTextExtractor,
    ) -> Result<String, SessionError> {
        self.require("load_document", &[Stage::Idle])?;
        let text = extractor.extract(file_bytes)?;
        self.load_document(&text)
    }

    /// Ask the model which enumerated case the operator means. The reply is
    /// echoed back unvalidated.
    pub fn interpret_user_selection(&mut self, freeform_text: &str) -> Result<String, SessionError> {
        let _span =
            tracing::info_span!("interpret_user_selection", session_id = %self.id).entered();
        self.require("interpret_user_selection", &[Stage::AwaitingSelection])?;

        let descriptions = self.case_descriptions.as_deref().unwrap_or_default();
        let prompt = build_selection_prompt(descriptions, freeform_text);
        let response = self.request_completion(CallPurpose::Selection, &prompt)?;
        self.commit_exchange(CallPurpose::Selection, &prompt, false, &response, false);

        self.advance("interpret_user_selection", Stage::SelectionInterpreted)?;
        Ok(response.text)
    }

    /// Request strict JSON for the operator's cases, then recover and
    /// validate it. A rejected reply leaves the stage and registry as they
    /// were; the operator decides whether to try again.
    pub fn extract_structured_case(
        &mut self,
        freeform_text: &str,
    ) -> Result<&CaseRegistry, SessionError> {
        let _span = tracing::info_span!(
            "extract_structured_case",
            session_id = %self.id,
            stage = %self.stage()
        )
        .entered();
        self.require(
            "extract_structured_case",
            &[Stage::AwaitingSelection, Stage::SelectionInterpreted],
        )?;

        let prompt = build_structuring_prompt(freeform_text, &self.schema);
        let response = self.request_completion(CallPurpose::Structuring, &prompt)?;
        self.commit_exchange(CallPurpose::Structuring, &prompt, true, &response, true);

        let object = extract_json_object(&response.text).inspect_err(|e| {
            tracing::warn!(error = %e, "Structured reply rejected: no usable JSON object");
        })?;
        let registry = validate_registry(&object, &self.schema).inspect_err(|e| {
            tracing::warn!(
                violations = e.violations.len(),
                error = %e,
                "Structured reply rejected: schema violations"
            );
        })?;

        self.history
            .add_assistant_message(&build_case_summary(&registry.to_markdown()));
        self.registry = registry;
        self.advance("extract_structured_case", Stage::CasesStructured)?;

        tracing::info!(
            cases = self.registry.len(),
            case_ids = ?self.registry.case_ids(),
            "Cases structured"
        );
        Ok(&self.registry)
    }

    /// Free-form follow-up question. Never changes the stage.
    pub fn converse(&mut self, text: &str) -> Result<String, SessionError> {
        let _span = tracing::info_span!("converse", session_id = %self.id).entered();
        self.require("converse", CONVERSATION_STAGES)?;

        let response = self.request_completion(CallPurpose::Conversation, text)?;
        self.commit_exchange(CallPurpose::Conversation, text, false, &response, false);
        Ok(response.text)
    }

    /// Record mesh boundary names (order kept, blanks and repeats dropped)
    /// and move on to `Dispatching`.
    pub fn receive_mesh(&mut self, boundary_names: &[String]) -> Result<&[String], SessionError> {
        let _span = tracing::info_span!("receive_mesh", session_id = %self.id).entered();
        self.require("receive_mesh", &[Stage::CasesStructured])?;

        let mut names: Vec<String> = Vec::with_capacity(boundary_names.len());
        for name in boundary_names {
            let name = name.trim();
            if !name.is_empty() && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        if names.is_empty() {
            return Err(MeshError::NoBoundaries.into());
        }

        self.advance("receive_mesh", Stage::AwaitingMesh)?;
        self.history.add_assistant_message(&build_mesh_notice(&names));
        self.boundary_names = names;
        self.advance("receive_mesh", Stage::Dispatching)?;

        tracing::info!(boundaries = ?self.boundary_names, "Mesh boundaries recorded");
        Ok(&self.boundary_names)
    }

    /// Read boundary names with `extractor`, then `receive_mesh`.
    pub fn load_mesh(
        &mut self,
        mesh_path: &Path,
        extractor: &dyn MeshBoundaryExtractor,
    ) -> Result<&[String], SessionError> {
        self.require("receive_mesh", &[Stage::CasesStructured])?;
        let names = extractor.extract_boundaries(mesh_path)?;
        self.receive_mesh(&names)
    }

    /// Run every case once, in registry order.
    pub fn begin_dispatch(&mut self, runner: &dyn CaseRunner) -> Result<DispatchReport, SessionError> {
        self.begin_dispatch_observed(runner, None)
    }

    /// `begin_dispatch`, forwarding every dispatch event to `observer`.
    pub fn begin_dispatch_observed(
        &mut self,
        runner: &dyn CaseRunner,
        mut observer: Option<&mut dyn FnMut(&DispatchEvent)>,
    ) -> Result<DispatchReport, SessionError> {
        let _span = tracing::info_span!("begin_dispatch", session_id = %self.id).entered();
        self.require("begin_dispatch", &[Stage::Dispatching])?;
        if self.dispatched {
            return Err(SessionError::AlreadyDispatched);
        }
        if self.registry.is_empty() {
            return Err(DispatchError::EmptyRegistry.into());
        }
        revalidate_registry(&self.registry, &self.schema)?;

        let registry = std::mem::take(&mut self.registry);
        let dispatcher = CaseDispatcher::new(registry, self.boundary_names.clone())?;
        self.dispatched = true;
        tracing::info!(cases = dispatcher.case_count(), "Dispatch started");

        let stages = &mut self.stages;
        let mut on_event = |event: DispatchEvent| {
            let next = match &event {
                DispatchEvent::Started { .. } => None,
                DispatchEvent::CaseStarted { index, .. } => {
                    Some(Stage::PerCaseRunning { index: *index })
                }
                DispatchEvent::CaseFinished { .. } => Some(Stage::Dispatching),
                DispatchEvent::Completed { .. } => Some(Stage::Completed),
            };
            if let Some(next) = next {
                if let Err(e) = stages.advance(next) {
                    tracing::error!(error = %e, "Dispatch event out of order");
                }
            }
            if let Some(observer) = observer.as_deref_mut() {
                observer(&event);
            }
        };
        let report = dispatcher.run(runner, Some(&mut on_event));

        self.history.add_assistant_message(&format!(
            "All cases have been processed: {} succeeded, {} failed.",
            report.succeeded(),
            report.failed()
        ));
        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            duration_ms = report.duration_ms,
            "Dispatch completed"
        );
        self.dispatch_report = Some(report.clone());
        Ok(report)
    }

    /// Return to `Idle`, dropping document, registry and boundaries.
    /// History and usage are kept.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        let _span = tracing::info_span!("reset", session_id = %self.id).entered();
        self.advance("reset", Stage::Idle)?;
        self.document_text = None;
        self.case_descriptions = None;
        self.registry = CaseRegistry::empty();
        self.boundary_names.clear();
        tracing::info!(messages = self.history.len(), "Session reset");
        Ok(())
    }

    /// Swap in new allowed solver/model lists. A malformed pair fails the
    /// session for good.
    pub fn reload_schema(&mut self, config: &SchemaConfig) -> Result<(), SessionError> {
        let _span = tracing::info_span!("reload_schema", session_id = %self.id).entered();
        let stage = self.stage();
        if stage.is_terminal() {
            return Err(SessionError::InvalidTransition {
                operation: "reload_schema",
                stage,
            });
        }

        match CaseSchema::new(&config.solvers, &config.turbulence_models) {
            Ok(schema) => {
                self.schema = schema;
                tracing::info!(
                    solvers = config.solvers.len(),
                    turbulence_models = config.turbulence_models.len(),
                    "Schema reloaded"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, stage = %stage, "Schema reload failed, session failed");
                if let Err(t) = self.stages.advance(Stage::Failed) {
                    tracing::error!(error = %t, "Cannot mark session failed");
                }
                Err(e.into())
            }
        }
    }

    // ═══════════════════════════════════════════════════════════
    // Observers
    // ═══════════════════════════════════════════════════════════

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stage(&self) -> Stage {
        self.stages.current()
    }

    pub fn transitions(&self) -> &[StageTransition] {
        self.stages.transitions()
    }

    pub fn history(&self) -> &[ConversationMessage] {
        self.history.messages()
    }

    pub fn visible_messages(&self) -> Vec<&ConversationMessage> {
        self.history.visible().collect()
    }

    pub fn document_text(&self) -> Option<&str> {
        self.document_text.as_deref()
    }

    pub fn registry(&self) -> &CaseRegistry {
        &self.registry
    }

    pub fn schema(&self) -> &CaseSchema {
        &self.schema
    }

    pub fn boundary_names(&self) -> &[String] {
        &self.boundary_names
    }

    pub fn usage(&self) -> &UsageLedger {
        &self.usage
    }

    pub fn total_tokens(&self) -> u64 {
        self.usage.total_tokens()
    }

    pub fn dispatch_report(&self) -> Option<&DispatchReport> {
        self.dispatch_report.as_ref()
    }

    /// Handle for aborting this session's pending call from another thread.
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle::new(Arc::clone(&self.inflight))
    }

    pub fn export(&self) -> Result<SessionExport, SessionError> {
        Ok(SessionExport::new(
            self.history.messages(),
            self.total_tokens(),
            chrono::Local::now().naive_local(),
        )?)
    }

    /// Write the transcript as `chatlog_<timestamp>.json` under `dir`.
    pub fn export_to_dir(&self, dir: &Path) -> Result<PathBuf, SessionError> {
        Ok(self.export()?.write_to_dir(dir)?)
    }

    // ── Internal ────────────────────────────────────────────

    fn require(&self, operation: &'static str, allowed: &[Stage]) -> Result<(), SessionError> {
        let stage = self.stage();
        if allowed.contains(&stage) {
            Ok(())
        } else {
            tracing::debug!(operation, stage = %stage, "Operation rejected in current stage");
            Err(SessionError::InvalidTransition { operation, stage })
        }
    }

    fn advance(&mut self, operation: &'static str, to: Stage) -> Result<(), SessionError> {
        self.stages
            .advance(to)
            .map_err(|e| SessionError::InvalidTransition {
                operation,
                stage: e.from,
            })
    }

    /// Append prompt + reply to history and the reply's usage to the ledger.
    /// Visibility is set per message: a hidden prompt may get a visible reply.
    fn commit_exchange(
        &mut self,
        purpose: CallPurpose,
        prompt: &str,
        prompt_internal: bool,
        response: &CompletionResponse,
        reply_internal: bool,
    ) {
        self.history.append(MessageRole::User, prompt, prompt_internal);
        self.history
            .append(MessageRole::Assistant, &response.text, reply_internal);
        self.usage.record(purpose, response.usage);
    }

    /// Book the usage of an aborted call whose worker has since returned.
    /// Its reply is never added to the history.
    fn settle_abandoned_call(&mut self) {
        let Some(settled) = self.inflight.take_settled() else {
            return;
        };
        match settled.result {
            Ok(response) => {
                tracing::info!(
                    purpose = %settled.call.purpose,
                    tokens = response.usage.total_tokens,
                    "Aborted completion call returned, usage recorded"
                );
                self.usage.record(CallPurpose::Aborted, response.usage);
            }
            Err(e) => {
                tracing::debug!(purpose = %settled.call.purpose, error = %e, "Aborted completion call failed");
            }
        }
    }

    /// One completion call over the full history plus `prompt`. Nothing is
    /// committed here; callers append the exchange only on success.
    /// Refused with `CallInFlight` while an aborted call is still running.
    fn request_completion(
        &mut self,
        purpose: CallPurpose,
        prompt: &str,
    ) -> Result<CompletionResponse, SessionError> {
        self.settle_abandoned_call();

        let mut messages = self.history.wire_history();
        messages.push(WireMessage::user(prompt));

        let _guard = self
            .inflight
            .try_acquire(purpose)
            .ok_or(SessionError::CallInFlight)?;

        let started = Instant::now();
        let result = self.run_on_worker(messages);
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(response) if response.text.trim().is_empty() => {
                tracing::warn!(purpose = %purpose, duration_ms, "Completion reply is empty");
                Err(CompletionError::EmptyResponse.into())
            }
            Ok(response) => {
                tracing::debug!(
                    purpose = %purpose,
                    tokens = response.usage.total_tokens,
                    duration_ms,
                    "Completion call finished"
                );
                Ok(response)
            }
            Err(e) => {
                tracing::warn!(purpose = %purpose, error = %e, duration_ms, "Completion call failed");
                Err(e.into())
            }
        }
    }

    fn run_on_worker(&self, messages: Vec<WireMessage>) -> Result<CompletionResponse, CompletionError> {
        let client = Arc::clone(&self.client);
        let system_prompt = self.system_prompt.clone();
        let (tx, rx) = mpsc::channel();

        let worker = std::thread::Builder::new()
            .name("casewright-completion".into())
            .spawn(move || {
                // Receiver is gone once the session is dropped.
                let _ = tx.send(client.get_completion(&system_prompt, &messages));
            })
            .map_err(|e| {
                tracing::error!(error = %e, "Cannot spawn completion worker");
                CompletionError::WorkerLost
            })?;

        loop {
            match rx.recv_timeout(ABORT_POLL_INTERVAL) {
                Ok(result) => return result,
                Err(RecvTimeoutError::Timeout) => {
                    if self.inflight.abort_requested() {
                        tracing::info!("Completion call aborted by operator");
                        self.inflight.abandon(rx, worker);
                        return Err(CompletionError::Aborted);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return Err(CompletionError::WorkerLost),
            }
        }
    }
}
