//! Scan orchestration.
//!
//! Configuration is resolved before anything is loaded. Units are then
//! loaded and dispatched on a bounded rayon pool; every per-file outcome
//! travels over a crossbeam channel to one reducer thread that owns the
//! aggregator, so workers never contend on shared result state.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::time::Instant;

use aegis_core::config::AegisConfig;
use aegis_core::constants::{IO_ERROR_RULE_ID, PARSE_ERROR_RULE_ID};
use aegis_core::errors::{AegisErrorCode, ParseError, PipelineError, ScanError};
use aegis_core::traits::{Cancellable, CancellationToken};
use aegis_core::types::Severity;
use crossbeam_channel::Sender;
use rayon::prelude::*;

use super::provider::{SourceEntry, SourceProvider};
use super::state::PipelineState;
use crate::engine::{panic_message, Diagnostic, DiagnosticAggregator, Dispatcher, FileOutcome, ResolvedConfig, ScanResult};
use crate::patterns::PatternContext;
use crate::rules::RuleRegistry;

/// Outcomes buffered between workers and the reducer.
const CHANNEL_CAPACITY: usize = 1024;

enum WorkerMessage {
    Outcome(FileOutcome),
    Skipped(Diagnostic),
}

/// Runs scans against one registry. Reusable across runs.
pub struct ScanPipeline {
    registry: RuleRegistry,
    patterns: PatternContext,
    state: PipelineState,
    history: Vec<PipelineState>,
}

impl Default for ScanPipeline {
    fn default() -> Self {
        Self::new(RuleRegistry::builtin())
    }
}

impl ScanPipeline {
    pub fn new(registry: RuleRegistry) -> Self {
        Self {
            registry,
            patterns: PatternContext::new(),
            state: PipelineState::Idle,
            history: vec![PipelineState::Idle],
        }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Every state entered so far, starting with `Idle`.
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    fn transition(&mut self, next: PipelineState) {
        if !self.state.can_transition_to(next) {
            tracing::warn!(from = %self.state, to = %next, "unexpected pipeline transition");
        }
        tracing::debug!(from = %self.state, to = %next, "pipeline state");
        self.state = next;
        self.history.push(next);
    }

    /// Resolve `config` against the registry without scanning.
    pub fn validate(&self, config: &AegisConfig) -> Result<ResolvedConfig, PipelineError> {
        Ok(ResolvedConfig::resolve(config, &self.registry)?)
    }

    /// Scan every unit of `provider`.
    ///
    /// Only configuration problems return `Err`; per-file failures become
    /// diagnostics. A cancelled run returns the partial result with
    /// `cancelled` set and skips whole-program rules.
    pub fn run(
        &mut self,
        config: &AegisConfig,
        provider: &dyn SourceProvider,
        cancel: &CancellationToken,
    ) -> Result<ScanResult, PipelineError> {
        let started = Instant::now();
        let span = tracing::info_span!("scan");
        let _guard = span.enter();

        self.transition(PipelineState::Validating);
        let resolved = match self.validate(config) {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::error!(error = %e.coded_string(), "configuration rejected");
                self.transition(PipelineState::Failed);
                return Err(e);
            }
        };

        let entries: Vec<SourceEntry> = provider
            .list()
            .into_iter()
            .filter(|e| {
                let excluded = resolved.is_excluded(&e.id);
                if excluded {
                    tracing::debug!(unit = %e.id, "excluded by config");
                }
                !excluded
            })
            .collect();

        self.transition(PipelineState::Scanning);
        tracing::info!(units = entries.len(), threads = resolved.threads, "scanning");

        let mut aggregator = match self.scan_units(&resolved, provider, &entries, cancel) {
            Ok(aggregator) => aggregator,
            Err(e) => {
                self.transition(PipelineState::Failed);
                return Err(e);
            }
        };

        let cancelled = cancel.is_cancelled();
        if cancelled {
            tracing::warn!(scanned = aggregator.files_scanned(), "scan cancelled, reporting partial result");
        } else {
            self.transition(PipelineState::Reducing);
            aggregator.reduce(&self.registry, &resolved, &self.patterns);
        }

        self.transition(PipelineState::Reporting);
        let duration_ms = started.elapsed().as_millis() as u64;
        let result = aggregator.finish(cancelled, duration_ms);
        tracing::info!(
            diagnostics = result.diagnostics.len(),
            errors = result.counts.error,
            files_scanned = result.files_scanned,
            files_skipped = result.files_skipped,
            duration_ms,
            "scan complete"
        );
        self.transition(PipelineState::Done);
        Ok(result)
    }

    fn scan_units(
        &self,
        resolved: &ResolvedConfig,
        provider: &dyn SourceProvider,
        entries: &[SourceEntry],
        cancel: &CancellationToken,
    ) -> Result<DiagnosticAggregator, PipelineError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(resolved.threads)
            .thread_name(|i| format!("aegis-worker-{i}"))
            .build()
            .map_err(|e| PipelineError::WorkerPool(e.to_string()))?;

        let dispatcher = Dispatcher::new(&self.registry, resolved, &self.patterns);
        let (tx, rx) = crossbeam_channel::bounded::<WorkerMessage>(CHANNEL_CAPACITY);

        std::thread::scope(|scope| {
            let reducer = scope.spawn(move || {
                let mut aggregator = DiagnosticAggregator::new();
                for message in rx {
                    match message {
                        WorkerMessage::Outcome(outcome) => aggregator.add_outcome(outcome),
                        WorkerMessage::Skipped(diagnostic) => aggregator.add_skipped(diagnostic),
                    }
                }
                aggregator
            });

            pool.install(|| {
                entries.par_iter().for_each_with(tx, |tx, entry| {
                    if cancel.is_cancelled() {
                        return;
                    }
                    let message = catch_unwind(AssertUnwindSafe(|| {
                        scan_one(&dispatcher, provider, entry, resolved, cancel)
                    }))
                    .unwrap_or_else(|payload| {
                        let error = PipelineError::Parse(ParseError::InvalidTree {
                            path: PathBuf::from(&entry.id),
                            message: panic_message(&*payload),
                        });
                        tracing::error!(unit = %entry.id, error = %error.coded_string(), "unit aborted");
                        WorkerMessage::Skipped(load_failure(&entry.id, &error))
                    });
                    send(tx, message);
                });
            });

            reducer
                .join()
                .map_err(|_| PipelineError::WorkerPool("reducer thread panicked".to_string()))
        })
    }
}

fn send(tx: &Sender<WorkerMessage>, message: WorkerMessage) {
    if tx.send(message).is_err() {
        tracing::error!("reducer hung up, dropping file outcome");
    }
}

fn scan_one(
    dispatcher: &Dispatcher<'_>,
    provider: &dyn SourceProvider,
    entry: &SourceEntry,
    resolved: &ResolvedConfig,
    cancel: &CancellationToken,
) -> WorkerMessage {
    let span = tracing::debug_span!("file", unit = %entry.id);
    let _guard = span.enter();

    match provider.load(entry, resolved.max_file_size) {
        Ok(unit) => {
            let outcome = dispatcher.run(&unit, cancel);
            tracing::debug!(
                status = ?outcome.status,
                diagnostics = outcome.diagnostics.len(),
                nodes = unit.tree.len(),
                "file done"
            );
            WorkerMessage::Outcome(outcome)
        }
        Err(e) => {
            tracing::warn!(error = %e.coded_string(), "file skipped");
            WorkerMessage::Skipped(load_failure(&entry.id, &e))
        }
    }
}

/// The single diagnostic recorded for a unit that could not be loaded.
pub fn load_failure(unit: &str, error: &PipelineError) -> Diagnostic {
    let (rule_id, message_id) = match error {
        PipelineError::Scan(ScanError::MaxFileSizeExceeded { .. }) => (IO_ERROR_RULE_ID, "fileTooLarge"),
        PipelineError::Scan(_) => (IO_ERROR_RULE_ID, "ioError"),
        PipelineError::Parse(_) => (PARSE_ERROR_RULE_ID, "parseError"),
        _ => (IO_ERROR_RULE_ID, "loadError"),
    };
    let mut diagnostic = Diagnostic::internal(rule_id, message_id, unit, Severity::Warning, error.to_string());
    diagnostic
        .data
        .insert("code".to_string(), error.error_code().to_string());
    diagnostic
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::MemoryProvider;
    use crate::tree::Language;

    #[test]
    fn test_state_history_on_success() {
        let provider = MemoryProvider::new().with_source("a.js", Language::JavaScript, "let x = 1;\n");
        let mut pipeline = ScanPipeline::default();
        let result = pipeline
            .run(&AegisConfig::default(), &provider, &CancellationToken::new())
            .unwrap();
        assert_eq!(result.files_scanned, 1);
        assert_eq!(
            pipeline.history(),
            &[
                PipelineState::Idle,
                PipelineState::Validating,
                PipelineState::Scanning,
                PipelineState::Reducing,
                PipelineState::Reporting,
                PipelineState::Done,
            ]
        );
    }

    #[test]
    fn test_load_failure_diagnostic() {
        let err = PipelineError::Scan(ScanError::MaxFileSizeExceeded {
            path: "big.js".into(),
            size: 10,
            max: 5,
        });
        let d = load_failure("big.js", &err);
        assert_eq!(d.rule_id, IO_ERROR_RULE_ID);
        assert_eq!(d.message_id, "fileTooLarge");
        assert_eq!(d.severity, Severity::Warning);
        assert_eq!(d.unit, "big.js");
    }

    #[test]
    fn test_cancelled_before_start_scans_nothing() {
        let provider = MemoryProvider::new().with_source("a.js", Language::JavaScript, "let x = 1;\n");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut pipeline = ScanPipeline::default();
        let result = pipeline.run(&AegisConfig::default(), &provider, &cancel).unwrap();
        assert!(result.cancelled);
        assert_eq!(result.files_scanned, 0);
        assert!(!pipeline.history().contains(&PipelineState::Reducing));
        assert_eq!(pipeline.state(), PipelineState::Done);
    }
}
