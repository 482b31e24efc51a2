//! The polling loop.
//!
//! Drives every discovered artifact through the stage state machine
//! exactly once per discovery: claim it into `processing`, analyze,
//! filter findings by the confidence threshold, persist qualifying ones,
//! and land the artifact in the terminal stage the outcome dictates.
//!
//! Single-threaded and blocking throughout. Each artifact is fully
//! finished - including its own inter-step sleep - before the next
//! begins. One artifact's failure never takes the loop down; the worst
//! case is a best-effort move to the error stage and a log line.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use vigil_protocol::{LogRecord, Stage, SuccessPolicy};
use vigil_sinks::RecordSink;
use vigil_tracker::StageTracker;
use vigil_vision::Analyzer;

/// Tunables for the loop, resolved from config before construction.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Sleep between empty polls and between artifacts
    pub poll_interval: Duration,
    /// Inclusive lower bound for a finding to qualify
    pub confidence_threshold: f64,
    pub success_policy: SuccessPolicy,
}

/// How one artifact's trip through the machine ended. Terminal stage
/// moves are observable on disk; this mirrors them for logs and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactOutcome {
    /// Claim into `processing` failed; artifact untouched in `input`,
    /// naturally retried on the next poll
    LeftInInput,
    /// Analyzed clean (or nothing above threshold); now in `processed`
    NoFindings,
    /// Qualifying findings persisted per policy; now in `detected`
    Detected {
        persisted: usize,
        failed: usize,
        discarded: usize,
    },
    /// Analysis or persistence failed; best-effort move to `error`
    Failed(String),
}

/// The agent owns the tracker, one analyzer, and one sink connection for
/// the lifetime of the loop. `run` consumes self - the loop can only be
/// started once.
pub struct Agent<A: Analyzer, S: RecordSink> {
    tracker: StageTracker,
    analyzer: A,
    sink: S,
    settings: AgentSettings,
    shutdown: Arc<AtomicBool>,
}

impl<A: Analyzer, S: RecordSink> Agent<A, S> {
    pub fn new(
        tracker: StageTracker,
        analyzer: A,
        sink: S,
        settings: AgentSettings,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            tracker,
            analyzer,
            sink,
            settings,
            shutdown,
        }
    }

    /// Run until the shutdown flag is set, then release the sink.
    pub fn run(mut self) {
        info!(
            input = %self.tracker.stage_path(Stage::Input).display(),
            interval_secs = self.settings.poll_interval.as_secs(),
            threshold = self.settings.confidence_threshold,
            policy = %self.settings.success_policy,
            "Watching input stage"
        );

        while !self.shutdown.load(Ordering::Relaxed) {
            let outcomes = self.poll_once();
            if outcomes.is_empty() {
                self.sleep_interval();
            }
        }

        info!("Stop requested, shutting down");
        self.sink.close();
    }

    /// One poll pass, then release the sink. For `vigil run --once`.
    pub fn run_once(mut self) {
        let outcomes = self.poll_once();
        info!(artifacts = outcomes.len(), "Single poll pass finished");
        self.sink.close();
    }

    /// List the input stage and process each artifact sequentially.
    /// Returns the per-artifact outcomes in processing order.
    pub fn poll_once(&mut self) -> Vec<(String, ArtifactOutcome)> {
        let pending = match self.tracker.list_pending() {
            Ok(pending) => pending,
            Err(err) => {
                error!(%err, "Failed to list input stage");
                return Vec::new();
            }
        };

        let mut outcomes = Vec::with_capacity(pending.len());
        for name in pending {
            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }
            let outcome = self.process_artifact(&name);
            debug!(artifact = %name, outcome = ?outcome, "Artifact finished");
            outcomes.push((name, outcome));
            // Uniform inter-artifact sleep, not only between empty polls.
            self.sleep_interval();
        }
        outcomes
    }

    /// Drive one artifact from `input` to a terminal stage.
    fn process_artifact(&mut self, name: &str) -> ArtifactOutcome {
        let processing_path = match self.tracker.advance(name, Stage::Input, Stage::Processing) {
            Ok(path) => path,
            Err(err) => {
                // Transient claim failure: the artifact stays in input
                // and is retried on the next discovery.
                warn!(artifact = name, %err, "Could not claim artifact, skipping");
                return ArtifactOutcome::LeftInInput;
            }
        };

        info!(artifact = name, "Analyzing");
        let result = match self.analyzer.analyze(&processing_path) {
            Ok(result) => result,
            Err(err) => {
                error!(artifact = name, %err, "Analysis failed");
                return self.quarantine(name, format!("analysis failed: {err}"));
            }
        };

        let threshold = self.settings.confidence_threshold;
        let (qualifying, discarded): (Vec<_>, Vec<_>) = result
            .findings
            .into_iter()
            .partition(|finding| finding.qualifies(threshold));
        for finding in &discarded {
            info!(
                artifact = name,
                label = %finding.detail.label(),
                confidence = finding.confidence,
                threshold,
                "Finding below threshold, discarded"
            );
        }

        if qualifying.is_empty() {
            return match self.tracker.advance(name, Stage::Processing, Stage::Processed) {
                Ok(_) => {
                    info!(artifact = name, "No qualifying findings");
                    ArtifactOutcome::NoFindings
                }
                Err(err) => {
                    error!(artifact = name, %err, "Could not move clean artifact to processed");
                    self.quarantine(name, format!("move to processed failed: {err}"))
                }
            };
        }

        let mut persisted = 0usize;
        let mut failed = 0usize;
        for finding in qualifying {
            let label = finding.detail.label().to_string();
            let record = LogRecord::new(name, finding);
            match self.sink.persist(&record) {
                Ok(()) => {
                    persisted += 1;
                    info!(artifact = name, label = %label, "Finding persisted");
                }
                Err(err) => {
                    // Accepted data loss for this one finding; whether it
                    // fails the artifact is the policy's call below.
                    failed += 1;
                    warn!(artifact = name, label = %label, %err, "Failed to persist finding");
                }
            }
        }

        if self.settings.success_policy.is_met(persisted, failed) {
            match self.tracker.advance(name, Stage::Processing, Stage::Detected) {
                Ok(_) => {
                    info!(artifact = name, persisted, failed, "Findings logged");
                    ArtifactOutcome::Detected {
                        persisted,
                        failed,
                        discarded: discarded.len(),
                    }
                }
                Err(err) => {
                    error!(artifact = name, %err, "Could not move artifact to detected");
                    self.quarantine(name, format!("move to detected failed: {err}"))
                }
            }
        } else {
            error!(
                artifact = name,
                persisted, failed,
                policy = %self.settings.success_policy,
                "Persistence did not meet the success policy"
            );
            self.quarantine(name, "findings detected but persistence failed".to_string())
        }
    }

    /// Best-effort move to the error stage. If that also fails (the file
    /// was already moved or deleted), log and move on - never crash the
    /// loop for one artifact.
    fn quarantine(&self, name: &str, reason: String) -> ArtifactOutcome {
        if let Err(err) = self.tracker.advance(name, Stage::Processing, Stage::Error) {
            error!(artifact = name, %err, "Could not move artifact to error stage");
        }
        ArtifactOutcome::Failed(reason)
    }

    /// Sleep the poll interval in short slices so an interrupt lands
    /// promptly instead of waiting out the full interval.
    fn sleep_interval(&self) {
        let slice = Duration::from_millis(100);
        let mut remaining = self.settings.poll_interval;
        while !remaining.is_zero() && !self.shutdown.load(Ordering::Relaxed) {
            let step = remaining.min(slice);
            std::thread::sleep(step);
            remaining -= step;
        }
    }
}
