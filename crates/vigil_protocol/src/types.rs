//! Core domain types shared across the workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Stage state machine
// ============================================================================

/// Pipeline stage an artifact occupies - one named directory per stage.
/// This is the CANONICAL definition of the state machine; the tracker
/// enforces it, the agent loop drives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Artifact dropped in by an operator, not yet picked up
    Input,
    /// Artifact claimed by the loop, analysis in flight
    Processing,
    /// Terminal: analyzed, nothing qualifying found
    Processed,
    /// Terminal: qualifying findings persisted (the domain success stage)
    Detected,
    /// Terminal: analysis or persistence failed
    Error,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Input => "input",
            Stage::Processing => "processing",
            Stage::Processed => "processed",
            Stage::Detected => "detected",
            Stage::Error => "error",
        }
    }

    /// All stages, in pipeline order.
    pub fn all() -> [Stage; 5] {
        [
            Stage::Input,
            Stage::Processing,
            Stage::Processed,
            Stage::Detected,
            Stage::Error,
        ]
    }

    /// Terminal stages are never left once reached; there is no automatic
    /// retry or re-ingestion.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Processed | Stage::Detected | Stage::Error)
    }

    /// The legal transition table. Anything not listed here is a bug in
    /// the caller and is rejected by the tracker.
    pub fn can_advance_to(&self, to: Stage) -> bool {
        matches!(
            (self, to),
            (Stage::Input, Stage::Processing)
                | (Stage::Processing, Stage::Processed)
                | (Stage::Processing, Stage::Detected)
                | (Stage::Processing, Stage::Error)
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "input" => Ok(Stage::Input),
            "processing" => Ok(Stage::Processing),
            "processed" => Ok(Stage::Processed),
            "detected" => Ok(Stage::Detected),
            "error" => Ok(Stage::Error),
            _ => Err(format!(
                "Invalid stage: '{}'. Expected: input, processing, processed, detected, or error",
                s
            )),
        }
    }
}

// ============================================================================
// Findings
// ============================================================================

/// Nutrition facts per serving, from the built-in reconciliation table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

/// Profile-specific payload of one detection. Tagged so malformed
/// external replies fail deserialization instead of propagating nulls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FindingDetail {
    /// One illegally parked vehicle.
    Violation {
        violation: String,
        plate: Option<String>,
        vehicle_color: Option<String>,
        vehicle_make: Option<String>,
        plate_confidence: f64,
    },
    /// One food item on the plate.
    FoodItem {
        name: String,
        portion: Option<String>,
        nutrition: Option<Nutrition>,
    },
}

impl FindingDetail {
    /// Short human label for logs and the records table.
    pub fn label(&self) -> &str {
        match self {
            FindingDetail::Violation { violation, .. } => violation,
            FindingDetail::FoodItem { name, .. } => name,
        }
    }

    /// The profile this detail belongs to.
    pub fn profile(&self) -> ProfileKind {
        match self {
            FindingDetail::Violation { .. } => ProfileKind::Parking,
            FindingDetail::FoodItem { .. } => ProfileKind::FoodScan,
        }
    }
}

/// One structured detection reported by the analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub detail: FindingDetail,
    /// Model self-reported confidence, clamped to [0.0, 1.0].
    pub confidence: f64,
}

impl Finding {
    pub fn new(detail: FindingDetail, confidence: f64) -> Self {
        Self {
            detail,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Threshold is inclusive: a finding at exactly the threshold counts.
    pub fn qualifies(&self, threshold: f64) -> bool {
        self.confidence >= threshold
    }
}

/// Everything the analyzer had to say about one artifact. An empty
/// findings list is the normal "nothing detected" outcome, not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub findings: Vec<Finding>,
}

impl AnalysisResult {
    pub fn new(findings: Vec<Finding>) -> Self {
        Self { findings }
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }
}

// ============================================================================
// Persisted records
// ============================================================================

/// The persisted unit: one qualifying finding plus artifact metadata.
/// Written once, never updated by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Artifact file name (unique within a stage at any instant)
    pub artifact: String,
    pub captured_at: DateTime<Utc>,
    pub finding: Finding,
}

impl LogRecord {
    pub fn new(artifact: impl Into<String>, finding: Finding) -> Self {
        Self {
            artifact: artifact.into(),
            captured_at: Utc::now(),
            finding,
        }
    }
}

// ============================================================================
// Policies & profiles
// ============================================================================

/// What counts as a successful artifact when some findings persisted and
/// some did not. The source variants disagreed, so this is configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SuccessPolicy {
    /// At least one qualifying finding persisted => success.
    #[default]
    AtLeastOne,
    /// Every qualifying finding must persist => success.
    RequireAll,
}

impl SuccessPolicy {
    /// Decide the artifact outcome given persist results. Only called
    /// when there was at least one qualifying finding.
    pub fn is_met(&self, persisted: usize, failed: usize) -> bool {
        match self {
            SuccessPolicy::AtLeastOne => persisted > 0,
            SuccessPolicy::RequireAll => persisted > 0 && failed == 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SuccessPolicy::AtLeastOne => "at-least-one",
            SuccessPolicy::RequireAll => "require-all",
        }
    }
}

impl fmt::Display for SuccessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SuccessPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "at-least-one" => Ok(SuccessPolicy::AtLeastOne),
            "require-all" => Ok(SuccessPolicy::RequireAll),
            _ => Err(format!(
                "Invalid success policy: '{}'. Expected: at-least-one or require-all",
                s
            )),
        }
    }
}

/// Which detection profile the agent runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    /// Parking violation detection
    #[default]
    Parking,
    /// Meal / nutrition detection
    FoodScan,
}

impl ProfileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileKind::Parking => "parking",
            ProfileKind::FoodScan => "foodscan",
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProfileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "parking" => Ok(ProfileKind::Parking),
            "foodscan" => Ok(ProfileKind::FoodScan),
            _ => Err(format!(
                "Invalid profile: '{}'. Expected: parking or foodscan",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_transition_table() {
        assert!(Stage::Input.can_advance_to(Stage::Processing));
        assert!(Stage::Processing.can_advance_to(Stage::Processed));
        assert!(Stage::Processing.can_advance_to(Stage::Detected));
        assert!(Stage::Processing.can_advance_to(Stage::Error));

        // Nothing leaves a terminal stage, nothing skips processing.
        assert!(!Stage::Input.can_advance_to(Stage::Processed));
        assert!(!Stage::Input.can_advance_to(Stage::Error));
        assert!(!Stage::Processed.can_advance_to(Stage::Input));
        assert!(!Stage::Detected.can_advance_to(Stage::Error));
        assert!(!Stage::Error.can_advance_to(Stage::Processing));
        assert!(!Stage::Processing.can_advance_to(Stage::Input));
    }

    #[test]
    fn test_stage_terminal() {
        assert!(!Stage::Input.is_terminal());
        assert!(!Stage::Processing.is_terminal());
        assert!(Stage::Processed.is_terminal());
        assert!(Stage::Detected.is_terminal());
        assert!(Stage::Error.is_terminal());
    }

    #[test]
    fn test_stage_roundtrip() {
        for stage in Stage::all() {
            assert_eq!(stage.as_str().parse::<Stage>().unwrap(), stage);
        }
        assert!("limbo".parse::<Stage>().is_err());
    }

    #[test]
    fn test_finding_confidence_clamped() {
        let detail = FindingDetail::FoodItem {
            name: "toast".to_string(),
            portion: None,
            nutrition: None,
        };
        assert_eq!(Finding::new(detail.clone(), 1.7).confidence, 1.0);
        assert_eq!(Finding::new(detail, -0.2).confidence, 0.0);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let finding = Finding::new(
            FindingDetail::Violation {
                violation: "double parked".to_string(),
                plate: None,
                vehicle_color: None,
                vehicle_make: None,
                plate_confidence: 0.0,
            },
            0.7,
        );
        assert!(finding.qualifies(0.7));
        assert!(!Finding { confidence: 0.69, ..finding }.qualifies(0.7));
    }

    #[test]
    fn test_success_policy() {
        assert!(SuccessPolicy::AtLeastOne.is_met(1, 1));
        assert!(!SuccessPolicy::AtLeastOne.is_met(0, 2));
        assert!(SuccessPolicy::RequireAll.is_met(2, 0));
        assert!(!SuccessPolicy::RequireAll.is_met(1, 1));
        assert!(!SuccessPolicy::RequireAll.is_met(0, 0));
    }

    #[test]
    fn test_finding_detail_is_tagged() {
        let detail = FindingDetail::Violation {
            violation: "on sidewalk".to_string(),
            plate: Some("ABCD-12".to_string()),
            vehicle_color: Some("gray".to_string()),
            vehicle_make: None,
            plate_confidence: 0.88,
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["kind"], "violation");
        let back: FindingDetail = serde_json::from_value(json).unwrap();
        assert_eq!(back, detail);
    }
}
