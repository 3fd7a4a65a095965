use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::GenerationError;
use crate::traits::QueryGenerator;

const API_KEY_HEADER: &str = "x-goog-api-key";
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    /// Base URL of the API, without the `/models/...` suffix.
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    /// Extra attempts after the first one; `0` means a single attempt.
    pub max_retries: u32,
    pub timeout: Duration,
}

/// [`QueryGenerator`] backed by the Gemini `generateContent` API.
pub struct GeminiGenerator {
    client: reqwest::blocking::Client,
    url: String,
    api_key: String,
    max_retries: u32,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn text(self) -> Option<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

impl GeminiGenerator {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(settings: GeminiSettings) -> Result<Self, GenerationError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(GenerationError::Request)?;

        Ok(Self {
            client,
            url: generate_url(&settings.endpoint, &settings.model),
            api_key: settings.api_key,
            max_retries: settings.max_retries,
        })
    }

    fn attempt(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };
        let response = self
            .client
            .post(&self.url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .map_err(GenerationError::Request)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<GenerateResponse>()
            .map_err(GenerationError::Request)?
            .text()
            .ok_or(GenerationError::EmptyResponse)
    }
}

impl QueryGenerator for GeminiGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let attempts = self.max_retries.saturating_add(1);
        let mut attempt = 1;
        loop {
            debug!(attempt, url = %self.url, "requesting generation");
            match self.attempt(prompt) {
                Ok(text) => return Ok(text),
                Err(err) if err.is_transient() && attempt < attempts => {
                    warn!(attempt, error = %err, "generation attempt failed, retrying");
                    thread::sleep(RETRY_BACKOFF * attempt);
                    attempt += 1;
                }
                Err(err) if attempt > 1 => {
                    return Err(GenerationError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn generate_url(endpoint: &str, model: &str) -> String {
    format!(
        "{}/models/{}:generateContent",
        endpoint.trim_end_matches('/'),
        model
    )
}
