//! # color_oracle
//!
//! Turns three poured colors into a poetic [`Reading`] by asking a
//! generative-text endpoint for a name and interpretation.
//!
//! The public entry point, [`OracleClient::brew`], is *total*: a missing API
//! key, a network failure, a non-2xx status, or a malformed response all
//! degrade to the same fixed fallback reading. Callers can rely on always
//! getting a reading back — the game must always reach its result screen.

use card_palette::Color;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

// ════════════════════════════════════════════════════════════════════════════
// Reading
// ════════════════════════════════════════════════════════════════════════════

/// The final artifact of a session: a named, described color blend.
#[derive(Clone, Debug, PartialEq)]
pub struct Reading {
    pub name: String,
    pub name_en: String,
    pub description: String,
    /// The three poured colors, in Past / Present / Future order.
    pub colors: [Color; 3],
}

/// The reading used whenever the oracle cannot be reached or talks nonsense.
pub fn fallback_reading(colors: [Color; 3]) -> Reading {
    Reading {
        name: "Soul Echo".to_string(),
        name_en: "Soul Echo".to_string(),
        description: "In the flow of these colors an inner voice is heard. \
                      May their quiet blend bring you calm, and the strength \
                      to carry what you have seen into the days ahead."
            .to_string(),
        colors,
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("no API key configured")]
    MissingKey,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("endpoint returned status {0}")]
    Status(u16),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed response: {0}")]
    Malformed(String),
}

// ════════════════════════════════════════════════════════════════════════════
// Wire format (generateContent-style endpoint)
// ════════════════════════════════════════════════════════════════════════════

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

/// The JSON object the model is asked to produce.
#[derive(Deserialize)]
struct ReadingJson {
    name: String,
    #[serde(rename = "nameEn")]
    name_en: String,
    description: String,
}

// ════════════════════════════════════════════════════════════════════════════
// OracleClient
// ════════════════════════════════════════════════════════════════════════════

pub const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Blocking client for the interpretation endpoint.
///
/// Cheap to clone; each brewing task gets its own copy to carry onto its
/// worker thread.
#[derive(Clone, Debug)]
pub struct OracleClient {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl OracleClient {
    pub fn new(api_key: Option<String>) -> Self {
        OracleClient {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key,
        }
    }

    /// Produce a reading for the three poured colors. Never fails.
    pub fn brew(&self, colors: [Color; 3]) -> Reading {
        match self.try_brew(colors) {
            Ok(reading) => reading,
            Err(e) => {
                log::warn!("oracle unavailable ({}), using fallback reading", e);
                fallback_reading(colors)
            }
        }
    }

    fn try_brew(&self, colors: [Color; 3]) -> Result<Reading, OracleError> {
        let key = self.api_key.as_deref().ok_or(OracleError::MissingKey)?;

        let url = format!(
            "{}/{}:generateContent?key={}",
            self.endpoint, self.model, key
        );
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![Part {
                    text: brew_prompt(&colors),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let response = client.post(&url).json(&request).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(OracleError::Status(status.as_u16()));
        }

        parse_reading(&response.text()?, colors)
    }
}

/// The instruction sent to the model.
fn brew_prompt(colors: &[Color; 3]) -> String {
    format!(
        "A seeker drew three soul colors during a card reading: {} (past), \
         {} (present), {} (future). Reply with a JSON object containing: \
         \"name\" — a poetic two-to-four word name for this blend; \
         \"nameEn\" — a matching English name; \
         \"description\" — a supportive interpretation of about 35 words \
         explaining how the colors reflect the seeker's past experiences, \
         present state, and future path.",
        colors[0].hex(),
        colors[1].hex(),
        colors[2].hex()
    )
}

/// Parse an endpoint response body into a [`Reading`].
///
/// Split out from the HTTP path so the shape handling is testable offline.
pub fn parse_reading(body: &str, colors: [Color; 3]) -> Result<Reading, OracleError> {
    let response: GenerateResponse = serde_json::from_str(body)?;
    let text = response
        .candidates
        .first()
        .and_then(|c| c.content.parts.first())
        .map(|p| p.text.as_str())
        .ok_or_else(|| OracleError::Malformed("no candidate text".to_string()))?;

    let meta: ReadingJson = serde_json::from_str(text)?;
    if meta.name.trim().is_empty() || meta.description.trim().is_empty() {
        return Err(OracleError::Malformed("empty name or description".to_string()));
    }

    Ok(Reading {
        name: meta.name,
        name_en: meta.name_en,
        description: meta.description,
        colors,
    })
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
