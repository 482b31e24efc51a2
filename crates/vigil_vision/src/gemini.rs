//! Blocking client for the Gemini `generateContent` REST endpoint.
//!
//! One request per artifact: a profile prompt plus the image inlined as
//! base64. The model is instructed to answer with a bare JSON array;
//! replies wrapped in markdown code fences are unwrapped before parsing.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use vigil_protocol::{AnalysisResult, ProfileKind};

use crate::profile;
use crate::{Analyzer, AnalyzerError, Result};

const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Connection settings for the hosted model.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    /// Model name, e.g. "gemini-1.5-flash"
    pub model: String,
    /// API base, e.g. "https://generativelanguage.googleapis.com/v1beta"
    pub endpoint: String,
}

/// Vision analyzer backed by the Gemini API.
pub struct GeminiAnalyzer {
    http: reqwest::blocking::Client,
    config: GeminiConfig,
    profile: ProfileKind,
}

impl GeminiAnalyzer {
    pub fn new(config: GeminiConfig, profile: ProfileKind) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            config,
            profile,
        })
    }

    fn request_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Send one prompt+image request and return the model's text reply.
    fn generate(&self, prompt: &str, mime_type: &str, image: &[u8]) -> Result<String> {
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::Text { text: prompt },
                    RequestPart::Inline {
                        inline_data: InlineData {
                            mime_type,
                            data: BASE64.encode(image),
                        },
                    },
                ],
            }],
        };

        let response: GenerateResponse = self
            .http
            .post(self.request_url())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()?
            .error_for_status()?
            .json()?;

        response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
            .ok_or_else(|| AnalyzerError::MalformedReply("reply carried no text part".to_string()))
    }
}

impl Analyzer for GeminiAnalyzer {
    fn analyze(&self, artifact: &Path) -> Result<AnalysisResult> {
        let mime_type = mime_from_extension(artifact)?;
        let image = fs::read(artifact).map_err(|source| AnalyzerError::Io {
            path: artifact.display().to_string(),
            source,
        })?;

        debug!(artifact = %artifact.display(), profile = %self.profile, "Requesting analysis");
        let reply = self.generate(profile::prompt(self.profile), mime_type, &image)?;
        let reply = strip_code_fences(&reply);

        let findings = profile::parse_reply(self.profile, reply)?;
        if findings.is_empty() {
            debug!(artifact = %artifact.display(), "Model reported no findings");
        }
        Ok(AnalysisResult::new(findings))
    }
}

/// Infer the upload mime type from the artifact's file extension.
fn mime_from_extension(path: &Path) -> Result<&'static str> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "png" => Ok("image/png"),
        "webp" => Ok("image/webp"),
        "gif" => Ok("image/gif"),
        other => Err(AnalyzerError::UnsupportedImage(other.to_string())),
    }
}

/// Models often ignore "answer with only JSON" and wrap the array in
/// markdown fences anyway. Accept both.
fn strip_code_fences(reply: &str) -> &str {
    let mut text = reply.trim();
    for prefix in ["```json", "```", "json"] {
        if let Some(rest) = text.strip_prefix(prefix) {
            text = rest;
            break;
        }
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

// ============================================================================
// Wire types (generateContent)
// ============================================================================

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text { text: &'a str },
    Inline { inline_data: InlineData<'a> },
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ReplyContent>,
}

#[derive(Deserialize)]
struct ReplyContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Deserialize)]
struct ReplyPart {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("[]"), "[]");
        assert_eq!(strip_code_fences("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("```\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("json\n[1]"), "[1]");
        assert_eq!(strip_code_fences("  [1, 2]  "), "[1, 2]");
    }

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(mime_from_extension(Path::new("a.JPG")).unwrap(), "image/jpeg");
        assert_eq!(mime_from_extension(Path::new("a.jpeg")).unwrap(), "image/jpeg");
        assert_eq!(mime_from_extension(Path::new("a.png")).unwrap(), "image/png");
        assert!(matches!(
            mime_from_extension(Path::new("a.bmp")),
            Err(AnalyzerError::UnsupportedImage(_))
        ));
        assert!(matches!(
            mime_from_extension(Path::new("noext")),
            Err(AnalyzerError::UnsupportedImage(_))
        ));
    }

    #[test]
    fn test_reply_extraction_shapes() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"[]"}]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(json).unwrap();
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().find_map(|p| p.text));
        assert_eq!(text.as_deref(), Some("[]"));

        let empty: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.candidates.is_empty());
    }
}
