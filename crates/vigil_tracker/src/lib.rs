//! Directory-Stage Tracker
//!
//! Owns the five stage directories an artifact moves through and performs
//! the only legal transitions between them. The tracker is the sole owner
//! of filesystem placement; the agent loop decides *which* transition
//! follows an analysis outcome, the tracker decides whether it is legal
//! and carries it out.
//!
//! Moves use `fs::rename`, so within one filesystem they are atomic: an
//! artifact is never visible in two stages at once and never lost between
//! stages. A failed move leaves the artifact exactly where it was.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use vigil_protocol::Stage;

/// Tracker operation result type.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Errors from stage-directory operations.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Transition not in the legal table (caller bug, never retried)
    #[error("illegal stage transition: {from} -> {to}")]
    IllegalTransition { from: Stage, to: Stage },

    /// Artifact not present at the expected source stage
    #[error("artifact '{name}' not found in stage '{stage}'")]
    Missing { name: String, stage: Stage },

    /// An artifact with the same name already occupies the target stage
    #[error("artifact '{name}' already present in stage '{stage}'")]
    AlreadyPresent { name: String, stage: Stage },

    /// Stage layout unusable (aliased directory names)
    #[error("invalid stage layout: {0}")]
    Layout(String),

    /// Underlying filesystem failure (permissions, disk full, ...)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where the stage directories live. Directory names are configurable so
/// the success stage can carry a domain name ("infractions", "meals");
/// the defaults match the canonical stage names.
#[derive(Debug, Clone)]
pub struct StageLayout {
    pub root: PathBuf,
    pub input: String,
    pub processing: String,
    pub processed: String,
    pub detected: String,
    pub error: String,
}

impl StageLayout {
    /// Layout rooted at `root` with the default directory names.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            input: Stage::Input.as_str().to_string(),
            processing: Stage::Processing.as_str().to_string(),
            processed: Stage::Processed.as_str().to_string(),
            detected: Stage::Detected.as_str().to_string(),
            error: Stage::Error.as_str().to_string(),
        }
    }

    /// Directory name for a stage.
    pub fn dir_name(&self, stage: Stage) -> &str {
        match stage {
            Stage::Input => &self.input,
            Stage::Processing => &self.processing,
            Stage::Processed => &self.processed,
            Stage::Detected => &self.detected,
            Stage::Error => &self.error,
        }
    }

    /// Absolute path of a stage directory.
    pub fn stage_path(&self, stage: Stage) -> PathBuf {
        self.root.join(self.dir_name(stage))
    }

    /// All five directory names must be distinct, or two stages would
    /// alias the same directory and the state machine collapses.
    pub fn names_are_distinct(&self) -> bool {
        let names = [
            &self.input,
            &self.processing,
            &self.processed,
            &self.detected,
            &self.error,
        ];
        for (i, a) in names.iter().enumerate() {
            if names[i + 1..].contains(a) {
                return false;
            }
        }
        true
    }
}

/// Maintains the fixed set of stage directories and performs the only
/// legal transitions between them.
pub struct StageTracker {
    layout: StageLayout,
}

impl StageTracker {
    /// Create a tracker, creating every stage directory if needed.
    pub fn new(layout: StageLayout) -> Result<Self> {
        if !layout.names_are_distinct() {
            return Err(TrackerError::Layout(
                "stage directory names must be distinct".to_string(),
            ));
        }
        for stage in Stage::all() {
            fs::create_dir_all(layout.stage_path(stage))?;
        }
        Ok(Self { layout })
    }

    pub fn layout(&self) -> &StageLayout {
        &self.layout
    }

    /// Path of a stage directory.
    pub fn stage_path(&self, stage: Stage) -> PathBuf {
        self.layout.stage_path(stage)
    }

    /// Path an artifact would have inside a stage.
    pub fn artifact_path(&self, name: &str, stage: Stage) -> PathBuf {
        self.stage_path(stage).join(name)
    }

    /// File names currently waiting in the input stage, in directory
    /// listing order. Subdirectories and non-UTF-8 names are skipped.
    pub fn list_pending(&self) -> Result<Vec<String>> {
        let mut pending = Vec::new();
        for entry in fs::read_dir(self.stage_path(Stage::Input))? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => pending.push(name),
                Err(raw) => {
                    warn!(name = ?raw, "Skipping non-UTF-8 file name in input stage");
                }
            }
        }
        Ok(pending)
    }

    /// Number of artifacts currently in a stage.
    pub fn count(&self, stage: Stage) -> Result<usize> {
        let mut n = 0;
        for entry in fs::read_dir(self.stage_path(stage))? {
            if entry?.file_type()?.is_file() {
                n += 1;
            }
        }
        Ok(n)
    }

    /// Move an artifact from one stage to a legal successor.
    ///
    /// Preconditions are checked before anything touches the filesystem:
    /// the transition must be in the legal table, the artifact must exist
    /// at `from`, and the target slot must be free (a move never
    /// overwrites a previously staged artifact). On any failure the
    /// artifact's location is unchanged.
    pub fn advance(&self, name: &str, from: Stage, to: Stage) -> Result<PathBuf> {
        if !from.can_advance_to(to) {
            return Err(TrackerError::IllegalTransition { from, to });
        }

        let src = self.artifact_path(name, from);
        if !src.is_file() {
            return Err(TrackerError::Missing {
                name: name.to_string(),
                stage: from,
            });
        }

        let dst = self.artifact_path(name, to);
        if dst.exists() {
            return Err(TrackerError::AlreadyPresent {
                name: name.to_string(),
                stage: to,
            });
        }

        fs::rename(&src, &dst)?;
        debug!(artifact = name, %from, %to, "Artifact advanced");
        Ok(dst)
    }

    /// Which stage currently holds the artifact, if any. Diagnostic
    /// helper; the loop itself never searches, it always knows `from`.
    pub fn locate(&self, name: &str) -> Option<Stage> {
        Stage::all()
            .into_iter()
            .find(|stage| self.artifact_path(name, *stage).is_file())
    }
}

/// Seed a file into a stage directory. Test helper for this crate and
/// the pipeline tests downstream.
pub fn seed_artifact(tracker: &StageTracker, name: &str, stage: Stage) -> PathBuf {
    let path = tracker.artifact_path(name, stage);
    fs::write(&path, b"fake image bytes").expect("seed artifact");
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tracker() -> (TempDir, StageTracker) {
        let dir = TempDir::new().unwrap();
        let tracker = StageTracker::new(StageLayout::new(dir.path())).unwrap();
        (dir, tracker)
    }

    /// The artifact must be in exactly one stage directory.
    fn assert_only_in(tracker: &StageTracker, name: &str, expected: Stage) {
        for stage in Stage::all() {
            let here = tracker.artifact_path(name, stage).is_file();
            assert_eq!(
                here,
                stage == expected,
                "artifact '{}' presence in {} was {}",
                name,
                stage,
                here
            );
        }
    }

    #[test]
    fn test_new_creates_stage_dirs() {
        let (_dir, tracker) = tracker();
        for stage in Stage::all() {
            assert!(tracker.stage_path(stage).is_dir());
        }
    }

    #[test]
    fn test_list_pending_only_sees_input_files() {
        let (_dir, tracker) = tracker();
        assert!(tracker.list_pending().unwrap().is_empty());

        seed_artifact(&tracker, "a.jpg", Stage::Input);
        seed_artifact(&tracker, "b.jpg", Stage::Input);
        seed_artifact(&tracker, "c.jpg", Stage::Processing);
        fs::create_dir(tracker.stage_path(Stage::Input).join("subdir")).unwrap();

        let mut pending = tracker.list_pending().unwrap();
        pending.sort();
        assert_eq!(pending, vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn test_advance_moves_exactly_once() {
        let (_dir, tracker) = tracker();
        seed_artifact(&tracker, "photo.jpg", Stage::Input);

        let dst = tracker
            .advance("photo.jpg", Stage::Input, Stage::Processing)
            .unwrap();
        assert_eq!(dst, tracker.artifact_path("photo.jpg", Stage::Processing));
        assert_only_in(&tracker, "photo.jpg", Stage::Processing);
    }

    #[test]
    fn test_advance_rejects_illegal_transition() {
        let (_dir, tracker) = tracker();
        seed_artifact(&tracker, "photo.jpg", Stage::Input);

        let err = tracker
            .advance("photo.jpg", Stage::Input, Stage::Detected)
            .unwrap_err();
        assert!(matches!(err, TrackerError::IllegalTransition { .. }));
        assert_only_in(&tracker, "photo.jpg", Stage::Input);
    }

    #[test]
    fn test_advance_with_stale_from_fails_cleanly() {
        let (_dir, tracker) = tracker();
        seed_artifact(&tracker, "photo.jpg", Stage::Processed);

        // The artifact is long gone from processing; the move must fail
        // without touching its actual location.
        let err = tracker
            .advance("photo.jpg", Stage::Processing, Stage::Error)
            .unwrap_err();
        assert!(matches!(err, TrackerError::Missing { .. }));
        assert_only_in(&tracker, "photo.jpg", Stage::Processed);
    }

    #[test]
    fn test_advance_never_overwrites() {
        let (_dir, tracker) = tracker();
        seed_artifact(&tracker, "photo.jpg", Stage::Input);
        seed_artifact(&tracker, "photo.jpg", Stage::Processing);

        let err = tracker
            .advance("photo.jpg", Stage::Input, Stage::Processing)
            .unwrap_err();
        assert!(matches!(err, TrackerError::AlreadyPresent { .. }));
        // Both copies still where they were.
        assert!(tracker.artifact_path("photo.jpg", Stage::Input).is_file());
        assert!(tracker
            .artifact_path("photo.jpg", Stage::Processing)
            .is_file());
    }

    #[test]
    fn test_terminal_path_through_the_machine() {
        let (_dir, tracker) = tracker();
        seed_artifact(&tracker, "photo.jpg", Stage::Input);

        tracker
            .advance("photo.jpg", Stage::Input, Stage::Processing)
            .unwrap();
        tracker
            .advance("photo.jpg", Stage::Processing, Stage::Detected)
            .unwrap();
        assert_only_in(&tracker, "photo.jpg", Stage::Detected);
        assert_eq!(tracker.locate("photo.jpg"), Some(Stage::Detected));

        // Terminal means terminal.
        let err = tracker
            .advance("photo.jpg", Stage::Detected, Stage::Input)
            .unwrap_err();
        assert!(matches!(err, TrackerError::IllegalTransition { .. }));
    }

    #[test]
    fn test_custom_stage_names() {
        let dir = TempDir::new().unwrap();
        let mut layout = StageLayout::new(dir.path());
        layout.detected = "infractions".to_string();
        let tracker = StageTracker::new(layout).unwrap();

        assert!(dir.path().join("infractions").is_dir());
        assert_eq!(
            tracker.artifact_path("x.jpg", Stage::Detected),
            dir.path().join("infractions").join("x.jpg")
        );
    }

    #[test]
    fn test_aliased_stage_names_rejected() {
        let dir = TempDir::new().unwrap();
        let mut layout = StageLayout::new(dir.path());
        layout.error = "processed".to_string();
        assert!(StageTracker::new(layout).is_err());
    }

    #[test]
    fn test_count() {
        let (_dir, tracker) = tracker();
        seed_artifact(&tracker, "a.jpg", Stage::Input);
        seed_artifact(&tracker, "b.jpg", Stage::Input);
        assert_eq!(tracker.count(Stage::Input).unwrap(), 2);
        assert_eq!(tracker.count(Stage::Error).unwrap(), 0);
    }
}
