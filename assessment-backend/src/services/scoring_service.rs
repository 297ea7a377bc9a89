use crate::models::assessment::Answer;
use crate::models::candidate::{Candidate, ProfileType};
use crate::models::report::AnalysisReport;
use crate::services::report_normalizer::normalize_response;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;
use reqwest::Client;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
/// Inline payloads above this size are rejected by the scoring API.
pub const MAX_INLINE_AUDIO_BYTES: usize = 20 * 1024 * 1024;

const SYSTEM_INSTRUCTION: &str = r#"ROLE: You are a senior talent analyst specialised in psychometric screening.
LANGUAGE: Every free-text field of your output MUST be written in Spanish (Mexico).

MODE 1: FORENSIC ANALYSIS (ADMINISTRATIVE PROFILES)
When answers are narrative, assess coherence, leadership, MBTI and Big Five. Be critical and look for inconsistencies between answers.

MODE 2: STABILITY SCAN (FIELD PROFILES)
When answers respond to situational questions (guard, cleaning, plant operator):
- Judge integrity from the situations (found money, missing relief shift, covering for a friend).
- Keeping the money or clocking in for a friend is an immediate integrity red flag.
- Leaving the post when the relief does not arrive means low responsibility.
- flightRisk is high when the commute exceeds 90 minutes or needs three or more transfers.
- Ignore spelling mistakes.

GENERAL RULES:
- Return a single JSON object that follows the response schema. Never return broken JSON.
- When information is missing, infer from tone; do not leave fields empty.
- One-word answers indicate low communication or possible apathy.
- Scores are 0-100 except emotionalIntelligence sub-scores, which are 0-10."#;

#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("scoring API key is not configured")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("scoring API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("scoring API returned no text content")]
    EmptyResponse,

    #[error("media fetch failed: {0}")]
    Media(String),
}

#[derive(Debug, Clone)]
pub struct ScoringSettings {
    pub api_key: Option<String>,
    pub model_field: String,
    pub model_administrative: String,
    pub timeout: Duration,
    pub audio_path_marker: String,
}

impl ScoringSettings {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            api_key: config.gemini_api_key.clone(),
            model_field: config.scoring_model_field.clone(),
            model_administrative: config.scoring_model_administrative.clone(),
            timeout: Duration::from_secs(config.scoring_timeout_secs),
            audio_path_marker: config.audio_path_marker.clone(),
        }
    }

    pub fn model_for(&self, mode: ProfileType) -> &str {
        match mode {
            ProfileType::Field => &self.model_field,
            ProfileType::Administrative => &self.model_administrative,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    InlineAudio { mime_type: String, data: Bytes },
}

/// Everything the external scoring capability receives for one candidate.
#[derive(Debug, Clone)]
pub struct ScoringRequest {
    pub analysis_id: Uuid,
    pub mode: ProfileType,
    pub model: String,
    pub system_instruction: String,
    pub parts: Vec<ContentPart>,
}

/// How an answer value is presented to the scoring capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerContent {
    Text(String),
    Audio(Url),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScoringBackend: Send + Sync {
    /// Returns the raw text produced by the model.
    async fn generate(&self, request: &ScoringRequest) -> Result<String, ScoringError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Bytes, ScoringError>;
}

#[derive(Clone)]
pub struct ScoringClient {
    backend: Arc<dyn ScoringBackend>,
    media: Arc<dyn MediaFetcher>,
    settings: Arc<ScoringSettings>,
}

impl ScoringClient {
    pub fn new(
        backend: Arc<dyn ScoringBackend>,
        media: Arc<dyn MediaFetcher>,
        settings: ScoringSettings,
    ) -> Self {
        Self {
            backend,
            media,
            settings: Arc::new(settings),
        }
    }

    /// Scores one submission. Every failure mode resolves to a report.
    pub async fn analyze(&self, candidate: &Candidate, answers: &[Answer]) -> AnalysisReport {
        let request = self.build_request(candidate, answers).await;
        tracing::info!(
            analysis_id = %request.analysis_id,
            mode = candidate.profile_type.as_str(),
            model = %request.model,
            parts = request.parts.len(),
            "dispatching scoring request"
        );

        match self.backend.generate(&request).await {
            Ok(raw) => normalize_response(&raw),
            Err(e) => {
                tracing::error!(
                    analysis_id = %request.analysis_id,
                    candidate = %candidate.email,
                    error = %e,
                    "scoring call failed, using fallback report"
                );
                AnalysisReport::fallback()
            }
        }
    }

    pub fn classify(&self, response: &str) -> AnswerContent {
        let trimmed = response.trim();
        if let Ok(url) = Url::parse(trimmed) {
            let is_http = matches!(url.scheme(), "http" | "https");
            if is_http && url.path().contains(&self.settings.audio_path_marker) {
                return AnswerContent::Audio(url);
            }
        }
        AnswerContent::Text(response.to_string())
    }

    pub async fn build_request(&self, candidate: &Candidate, answers: &[Answer]) -> ScoringRequest {
        let analysis_id = Uuid::new_v4();
        let mode = candidate.profile_type;
        let mut parts = vec![ContentPart::Text(context_text(analysis_id, candidate))];

        for answer in answers {
            parts.push(ContentPart::Text(format!("\nQUESTION: {}\n", answer.question)));

            match self.classify(&answer.response) {
                AnswerContent::Audio(url) => match self.media.fetch(&url).await {
                    Ok(data) => {
                        parts.push(ContentPart::Text(
                            "ANSWER (AUDIO - ANALYZE TONE AND CONTENT):".to_string(),
                        ));
                        parts.push(ContentPart::InlineAudio {
                            mime_type: audio_mime_type(&url).to_string(),
                            data,
                        });
                    }
                    Err(e) => {
                        tracing::warn!(%url, error = %e, "audio answer could not be loaded");
                        parts.push(ContentPart::Text(format!(
                            "ANSWER (audio could not be loaded): {}",
                            url
                        )));
                    }
                },
                AnswerContent::Text(text) => {
                    parts.push(ContentPart::Text(format!(
                        "ANSWER: \"{}\"",
                        text.replace('"', "'")
                    )));
                }
            }
        }

        ScoringRequest {
            analysis_id,
            mode,
            model: self.settings.model_for(mode).to_string(),
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            parts,
        }
    }
}

fn context_text(analysis_id: Uuid, candidate: &Candidate) -> String {
    let location = match &candidate.location {
        Some(loc) => format!("CANDIDATE LOCATION: Lat {}, Lng {}", loc.lat, loc.lng),
        None => "CANDIDATE LOCATION: not provided".to_string(),
    };

    let (profile, instructions) = match candidate.profile_type {
        ProfileType::Field => (
            "FIELD (guard, plant operator, cleaning)",
            "FIELD MODE INSTRUCTIONS:\n\
             - Analyze TEXT and AUDIO answers jointly.\n\
             - In AUDIO answers, detect tone of voice: confidence, hesitation, aggressiveness, evasiveness.\n\
             - Look for honesty and willingness to work.\n\
             - Raise flight risk if the candidate lives far away or has a long commute.",
        ),
        ProfileType::Administrative => (
            "ADMINISTRATIVE (manager, supervisor, office)",
            "ADMINISTRATIVE MODE INSTRUCTIONS:\n\
             - Evaluate strategic leadership, communication and narrative coherence.",
        ),
    };

    format!(
        "ANALYSIS ID: {}\nPROFILE TYPE: {}\nCANDIDATE: {}\nROLE: {}\n{}\n\n{}\n\n\
         GENERAL INSTRUCTION:\n\
         - STRICT JSON OUTPUT.\n\
         - INFER PERSONALITY FROM CONTENT AND TONE OF VOICE.",
        analysis_id, profile, candidate.name, candidate.role, location, instructions
    )
}

fn audio_mime_type(url: &Url) -> &'static str {
    let ext = url
        .path()
        .rsplit('.')
        .next()
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" | "oga" => "audio/ogg",
        "m4a" | "mp4" => "audio/mp4",
        _ => "audio/webm",
    }
}

/// Output schema the model is constrained to; mirrors `AnalysisReport`.
pub fn report_schema() -> JsonValue {
    let number = json!({ "type": "NUMBER" });
    let string = json!({ "type": "STRING" });
    let strings = json!({ "type": "ARRAY", "items": { "type": "STRING" } });

    json!({
        "type": "OBJECT",
        "properties": {
            "scores": {
                "type": "OBJECT",
                "properties": {
                    "aptitude": number,
                    "integrity": number,
                    "performancePotential": number,
                    "culturalFit": number,
                    "flightRisk": number
                },
                "required": ["aptitude", "integrity", "performancePotential", "culturalFit", "flightRisk"]
            },
            "psychology": {
                "type": "OBJECT",
                "properties": {
                    "mbti": string,
                    "bigFive": {
                        "type": "OBJECT",
                        "properties": {
                            "openness": number,
                            "conscientiousness": number,
                            "extraversion": number,
                            "agreeableness": number,
                            "neuroticism": number
                        },
                        "required": ["openness", "conscientiousness", "extraversion", "agreeableness", "neuroticism"]
                    },
                    "enneagram": string
                },
                "required": ["mbti", "bigFive"]
            },
            "emotionalIntelligence": {
                "type": "OBJECT",
                "properties": {
                    "selfAwareness": number,
                    "selfRegulation": number,
                    "empathy": number,
                    "motivation": number,
                    "socialSkills": number
                },
                "required": ["selfAwareness", "selfRegulation", "empathy", "motivation", "socialSkills"]
            },
            "coherence": {
                "type": "OBJECT",
                "properties": {
                    "score": number,
                    "narrativeAnalysis": string,
                    "honestyScore": number,
                    "honestyAnalysis": string,
                    "inconsistencies": strings,
                    "locusOfControl": { "type": "STRING", "enum": ["Internal", "External"] }
                },
                "required": ["score", "narrativeAnalysis", "honestyScore", "honestyAnalysis", "inconsistencies", "locusOfControl"]
            },
            "leadership": {
                "type": "OBJECT",
                "properties": {
                    "primaryStyle": string,
                    "secondaryStyle": string,
                    "strengths": strings,
                    "weaknesses": strings,
                    "developmentPlan": string
                },
                "required": ["primaryStyle", "strengths", "weaknesses", "developmentPlan"]
            },
            "flags": {
                "type": "OBJECT",
                "properties": {
                    "redFlags": strings,
                    "greenFlags": strings
                },
                "required": ["redFlags", "greenFlags"]
            },
            "motivation": {
                "type": "OBJECT",
                "properties": {
                    "surfaceLevel": string,
                    "deepLevel": string,
                    "roleAlignment": { "type": "BOOLEAN" },
                    "retentionRiskLevel": { "type": "STRING", "enum": ["Low", "Medium", "High"] }
                },
                "required": ["surfaceLevel", "deepLevel", "roleAlignment", "retentionRiskLevel"]
            },
            "recommendation": {
                "type": "OBJECT",
                "properties": {
                    "decision": { "type": "STRING", "enum": ["HIRE", "VALIDATE", "REJECT"] },
                    "reason": string,
                    "nextSteps": strings
                },
                "required": ["decision", "reason", "nextSteps"]
            }
        }
    })
}

/// Gemini `generateContent` adapter.
#[derive(Clone)]
pub struct GeminiBackend {
    client: Client,
    api_key: Option<String>,
    timeout: Duration,
}

impl GeminiBackend {
    pub fn new(client: Client, settings: &ScoringSettings) -> Self {
        Self {
            client,
            api_key: settings.api_key.clone(),
            timeout: settings.timeout,
        }
    }

    fn request_body(request: &ScoringRequest) -> JsonValue {
        let parts: Vec<JsonValue> = request
            .parts
            .iter()
            .map(|part| match part {
                ContentPart::Text(text) => json!({ "text": text }),
                ContentPart::InlineAudio { mime_type, data } => json!({
                    "inlineData": { "mimeType": mime_type, "data": BASE64.encode(data) }
                }),
            })
            .collect();

        json!({
            "systemInstruction": { "parts": [{ "text": request.system_instruction }] },
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": report_schema()
            }
        })
    }
}

#[async_trait]
impl ScoringBackend for GeminiBackend {
    async fn generate(&self, request: &ScoringRequest) -> Result<String, ScoringError> {
        let api_key = self.api_key.as_deref().ok_or(ScoringError::MissingApiKey)?;

        let res = self
            .client
            .post(format!("{}/{}:generateContent", GEMINI_API_BASE, request.model))
            .header("x-goog-api-key", api_key)
            .json(&Self::request_body(request))
            .timeout(self.timeout)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let message = res.text().await.unwrap_or_default();
            return Err(ScoringError::Api { status, message });
        }

        let body: JsonValue = res.json().await?;
        let text: String = body
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ScoringError::EmptyResponse);
        }
        Ok(text)
    }
}

/// Downloads answer media referenced by URL.
#[derive(Clone)]
pub struct HttpMediaFetcher {
    client: Client,
}

impl HttpMediaFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, url: &Url) -> Result<Bytes, ScoringError> {
        let res = self.client.get(url.clone()).send().await?;
        if !res.status().is_success() {
            return Err(ScoringError::Media(format!("{} returned {}", url, res.status())));
        }
        if res
            .content_length()
            .is_some_and(|len| len as usize > MAX_INLINE_AUDIO_BYTES)
        {
            return Err(ScoringError::Media(format!("{} exceeds inline size limit", url)));
        }
        let data = res.bytes().await?;
        if data.len() > MAX_INLINE_AUDIO_BYTES {
            return Err(ScoringError::Media(format!("{} exceeds inline size limit", url)));
        }
        Ok(data)
    }
}
