//! Per-profile prompts and reply parsing.
//!
//! Both profiles ask the model for a bare JSON array, one object per
//! detection, with an explicit `confidence` in [0.0, 1.0]. Parsing is
//! tolerant per item: a malformed element is logged and skipped, a reply
//! that is not a JSON array at all is a malformed-reply error.

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use vigil_protocol::{Finding, FindingDetail, ProfileKind};

use crate::nutrition;
use crate::{AnalyzerError, Result};

const PARKING_PROMPT: &str = r#"You are an expert on urban traffic regulations, specialized in detecting illegal parking.
Analyze the image and identify every vehicle committing a parking violation.
Common violations: double parking, parking on the sidewalk or a pedestrian area, on a crosswalk, in a bike lane, in a no-parking zone, blocking a garage entrance or accessibility ramp, within 5 meters of a corner or bus stop, obstructing a traffic lane.

For each offending vehicle produce one JSON object with exactly these fields:
- "violation_detected": true
- "violation_type": short description of the violation (e.g. "double parked", "on sidewalk")
- "plate": the license plate as printed, or null if not clearly legible
- "vehicle_color": predominant color, or null if not discernible
- "vehicle_make": manufacturer, or null if not discernible
- "confidence": float 0.0-1.0, your confidence in the violation
- "plate_confidence": float 0.0-1.0, your confidence in the plate reading (0.0 when "plate" is null)

Respond with ONLY a JSON array of those objects. If no parking violation is visible, respond with an empty array: []"#;

const FOODSCAN_PROMPT: &str = r#"You are a nutritionist's assistant. Analyze the photo of a meal and identify every distinct food item on the plate.

For each food item produce one JSON object with exactly these fields:
- "name": the food item in simple lowercase English (e.g. "cooked rice", "scrambled eggs")
- "portion": an approximate portion description (e.g. "1 cup", "2 slices"), or null
- "confidence": float 0.0-1.0, your confidence in the identification

Respond with ONLY a JSON array of those objects. If the photo contains no food, respond with an empty array: []"#;

/// Prompt sent alongside the image for a profile.
pub(crate) fn prompt(profile: ProfileKind) -> &'static str {
    match profile {
        ProfileKind::Parking => PARKING_PROMPT,
        ProfileKind::FoodScan => FOODSCAN_PROMPT,
    }
}

/// Parse a (fence-stripped) model reply into findings.
pub fn parse_reply(profile: ProfileKind, reply: &str) -> Result<Vec<Finding>> {
    let items: Vec<Value> = match serde_json::from_str(reply) {
        Ok(Value::Array(items)) => items,
        Ok(other) => {
            return Err(AnalyzerError::MalformedReply(format!(
                "expected a JSON array, got {}",
                kind_of(&other)
            )))
        }
        Err(err) => {
            return Err(AnalyzerError::MalformedReply(format!(
                "reply is not valid JSON: {}",
                err
            )))
        }
    };

    let mut findings = Vec::with_capacity(items.len());
    for item in items {
        match parse_item(profile, item) {
            Some(finding) => findings.push(finding),
            None => continue,
        }
    }
    Ok(findings)
}

fn parse_item(profile: ProfileKind, item: Value) -> Option<Finding> {
    match profile {
        ProfileKind::Parking => {
            let raw: RawViolation = match serde_json::from_value(item) {
                Ok(raw) => raw,
                Err(err) => {
                    warn!(%err, "Skipping malformed violation entry in model reply");
                    return None;
                }
            };
            if !raw.violation_detected {
                info!("Skipping reply entry without a detected violation");
                return None;
            }
            let violation = raw.violation_type.unwrap_or_else(|| "unknown".to_string());
            Some(Finding::new(
                FindingDetail::Violation {
                    violation,
                    plate: raw.plate,
                    vehicle_color: raw.vehicle_color,
                    vehicle_make: raw.vehicle_make,
                    plate_confidence: raw.plate_confidence.clamp(0.0, 1.0),
                },
                raw.confidence,
            ))
        }
        ProfileKind::FoodScan => {
            let raw: RawFoodItem = match serde_json::from_value(item) {
                Ok(raw) => raw,
                Err(err) => {
                    warn!(%err, "Skipping malformed food entry in model reply");
                    return None;
                }
            };
            let name = match raw.name {
                Some(name) if !name.trim().is_empty() => name,
                _ => {
                    warn!("Skipping food entry without a name");
                    return None;
                }
            };
            let nutrition = nutrition::lookup_nutrition(&name);
            if nutrition.is_none() {
                info!(food = %name, "No nutrition table entry, logging without facts");
            }
            Some(Finding::new(
                FindingDetail::FoodItem {
                    name,
                    portion: raw.portion,
                    nutrition,
                },
                raw.confidence,
            ))
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Raw reply item for the parking profile. Missing confidences default to
/// 0.0 and fall out at the threshold filter downstream.
#[derive(Deserialize)]
struct RawViolation {
    #[serde(default)]
    violation_detected: bool,
    violation_type: Option<String>,
    plate: Option<String>,
    vehicle_color: Option<String>,
    vehicle_make: Option<String>,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    plate_confidence: f64,
}

/// Raw reply item for the foodscan profile.
#[derive(Deserialize)]
struct RawFoodItem {
    name: Option<String>,
    portion: Option<String>,
    #[serde(default)]
    confidence: f64,
}
