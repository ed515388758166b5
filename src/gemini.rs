use crate::config::Config;
use crate::models::{MoodImage, PortfolioDirection, UserProfile};
use crate::schema::{portfolio_response_schema, validate_direction, SchemaViolation};
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("no Gemini API key configured")] MissingCredential,
    #[error("provider returned an empty response")] EmptyResponse,
    #[error("parse error: {0}")] Parse(String),
    #[error("response violates the portfolio contract: {0}")] Schema(#[from] SchemaViolation),
    #[error("transport error: {0}")] Transport(String),
    #[error("provider error: status={status} body={body}")] Api { status: u16, body: String },
    #[error("image generation failed: {0}")] ImageGeneration(String),
}

impl GeminiError {
    /// Stable label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GeminiError::MissingCredential => "missing_credential",
            GeminiError::EmptyResponse => "empty_response",
            GeminiError::Parse(_) => "parse",
            GeminiError::Schema(_) => "schema",
            GeminiError::Transport(_) => "transport",
            GeminiError::Api { .. } => "api",
            GeminiError::ImageGeneration(_) => "image_generation",
        }
    }
}

/// The two provider calls a generation cycle makes.
#[async_trait]
pub trait AestheticModel: Send + Sync {
    /// Fails with [`GeminiError::MissingCredential`] when no key is configured.
    fn ensure_credential(&self) -> Result<(), GeminiError>;

    async fn request_portfolio_plan(&self, profile: &UserProfile) -> Result<PortfolioDirection, GeminiError>;

    /// `Ok(None)` means the provider answered without any image data.
    async fn request_mood_image(&self, direction: &PortfolioDirection) -> Result<Option<MoodImage>, GeminiError>;
}

pub const SYSTEM_INSTRUCTION: &str = "\
You are a world-class Art Director and Portfolio Curator for high-end fashion and fine art photographers.
Your specialty is blending Eastern and Western aesthetics: The melancholy of \"Mono no Aware\", the emptiness of Ni Zan, the light of Vermeer, and the chic edge of YSL.

Your goal is to create a Portfolio Direction and Slide Outline for a photographer based on their specific stylistic influences.
The tone of your writing should be poetic, sophisticated, minimal, and deeply humanistic.

Construct a JSON response.";

pub fn build_plan_prompt(profile: &UserProfile) -> String {
    format!(
        "Analyze this photographer's profile:\n\
        - Interests: {interests}\n\
        - Icons: {icons} (Note: Tang Wei, Gong Li imply depth, emotion, cinema).\n\
        - Fashion: {fashion} (Note: YSL implies structure, black, androgyny, elegance).\n\
        - Movies: {movies} (Note: Aftersun, Summer 1993 imply nostalgia, subtle grief, sun-drenched melancholy).\n\
        - Art: {art} (Note: Vermeer = Light; Xu Wei/Ni Zan = Ink, wildness, isolation).\n\
        - Photo Style: {photo}\n\n\
        Create a \"Portfolio Direction\" that unifies these diverse elements into a singular artistic identity.\n\
        Then, outline a 8-10 slide presentation structure for their portfolio.",
        interests = profile.interests,
        icons = profile.style_icons,
        fashion = profile.fashion,
        movies = profile.movies,
        art = profile.art,
        photo = profile.photography_style,
    )
}

pub fn build_mood_prompt(direction: &PortfolioDirection) -> String {
    format!(
        "An abstract, artistic mood board image for a photography portfolio.\n\
        Style mixture: {keywords}.\n\n\
        Visual Elements:\n\
        - Lighting reminiscent of Vermeer (soft, window light).\n\
        - Textures reminiscent of Xu Wei and Ni Zan (ink wash, rough paper, negative space).\n\
        - Fashion attitude of Yves Saint Laurent (sharp, black, elegant).\n\
        - Cinematic grain like the movie Aftersun.\n\n\
        Composition: Minimalist, wide angle, serene, highly atmospheric.\n\
        Colors: {palette}.\n\
        High quality, 4k, artistic masterpiece.",
        keywords = direction.aesthetic_keywords.join(", "),
        palette = direction.color_palette_description,
    )
}

// Helper function to truncate base64 data in JSON for cleaner logging
fn truncate_base64_in_json(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                match val {
                    Value::String(s) if key == "data" && s.chars().count() > 100 => {
                        let head: String = s.chars().take(50).collect();
                        let rest = s.chars().count() - 50;
                        *val = Value::String(format!("{}...[truncated {} chars]", head, rest));
                    }
                    _ => truncate_base64_in_json(val),
                }
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(truncate_base64_in_json),
        _ => {}
    }
}

pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    text_model: String,
    image_model: String,
}

impl GeminiClient {
    pub fn from_config(config: &Config) -> Result<Self, GeminiError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GeminiError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.api_base.clone(),
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
        })
    }

    fn api_key(&self) -> Result<&str, GeminiError> {
        self.api_key.as_deref().ok_or(GeminiError::MissingCredential)
    }

    async fn generate_content(&self, model: &str, body: &GenerateContentRequest) -> Result<GeminiResponse, GeminiError> {
        let api_key = self.api_key()?;
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        info!("🔗 Making request to: {}", url);

        let response = self.client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| GeminiError::Transport(e.to_string()))?;

        let status = response.status();
        info!("📥 Response status: {}", status);

        let response_text = response.text().await
            .map_err(|e| GeminiError::Transport(e.to_string()))?;

        if !status.is_success() {
            error!("❌ API Error response: {}", response_text);
            return Err(GeminiError::Api { status: status.as_u16(), body: response_text });
        }
        if response_text.trim().is_empty() {
            return Err(GeminiError::EmptyResponse);
        }

        if tracing::enabled!(tracing::Level::DEBUG) {
            let logged = match serde_json::from_str::<Value>(&response_text) {
                Ok(mut json_value) => {
                    truncate_base64_in_json(&mut json_value);
                    json_value.to_string()
                }
                Err(_) => response_text.chars().take(1000).collect(),
            };
            debug!("📥 Raw Gemini API response: {}", logged);
        }

        serde_json::from_str(&response_text).map_err(|e| GeminiError::Parse(format!("envelope: {}", e)))
    }
}

#[async_trait]
impl AestheticModel for GeminiClient {
    fn ensure_credential(&self) -> Result<(), GeminiError> {
        self.api_key().map(|_| ())
    }

    async fn request_portfolio_plan(&self, profile: &UserProfile) -> Result<PortfolioDirection, GeminiError> {
        self.ensure_credential()?;
        info!("🎯 Requesting portfolio plan from {}", self.text_model);
        let body = plan_request(profile);
        let parsed = self.generate_content(&self.text_model, &body).await?;
        let direction = parse_direction(&parsed)?;
        info!("✅ Portfolio plan '{}' with {} slides", direction.title, direction.slides.len());
        Ok(direction)
    }

    async fn request_mood_image(&self, direction: &PortfolioDirection) -> Result<Option<MoodImage>, GeminiError> {
        self.ensure_credential()?;
        info!("🖼️ Requesting mood image from {}", self.image_model);
        let body = mood_request(direction);
        let parsed = self.generate_content(&self.image_model, &body)
            .await
            .map_err(|e| GeminiError::ImageGeneration(format!("{}: {}", e.kind(), e)))?;
        Ok(extract_mood_image(&parsed))
    }
}

// --- Request Bodies ---

#[skip_serializing_none]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Option<RequestContent>,
    contents: Vec<RequestContent>,
    generation_config: Option<GenerationConfig>,
}

#[skip_serializing_none]
#[derive(Debug, Serialize)]
struct RequestContent {
    role: Option<&'static str>,
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
struct TextPart { text: String }

#[skip_serializing_none]
#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: Option<&'static str>,
    response_schema: Option<Value>,
    response_modalities: Option<Vec<&'static str>>,
    candidate_count: Option<u32>,
}

fn plan_request(profile: &UserProfile) -> GenerateContentRequest {
    GenerateContentRequest {
        system_instruction: Some(RequestContent {
            role: None,
            parts: vec![TextPart { text: SYSTEM_INSTRUCTION.to_string() }],
        }),
        contents: vec![RequestContent {
            role: Some("user"),
            parts: vec![TextPart { text: build_plan_prompt(profile) }],
        }],
        generation_config: Some(GenerationConfig {
            response_mime_type: Some("application/json"),
            response_schema: Some(portfolio_response_schema()),
            ..Default::default()
        }),
    }
}

fn mood_request(direction: &PortfolioDirection) -> GenerateContentRequest {
    GenerateContentRequest {
        system_instruction: None,
        contents: vec![RequestContent {
            role: None,
            parts: vec![TextPart { text: build_mood_prompt(direction) }],
        }],
        generation_config: Some(GenerationConfig {
            response_modalities: Some(vec!["TEXT", "IMAGE"]),
            candidate_count: Some(1),
            ..Default::default()
        }),
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default, rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(default, rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate { #[serde(default)] content: Content }

#[derive(Debug, Deserialize, Default)]
struct Content { #[serde(default)] parts: Vec<Part> }

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Part {
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData
    },
    Text { text: String },
    #[allow(dead_code)]
    Other(Value)
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
    #[serde(default, rename = "mimeType")]
    mime_type: String,
}

impl GeminiResponse {
    fn first_parts(&self) -> &[Part] {
        self.candidates.first().map(|c| c.content.parts.as_slice()).unwrap_or(&[])
    }

    fn log_block_reason(&self) {
        if let Some(reason) = self.prompt_feedback.as_ref().and_then(|f| f.block_reason.as_deref()) {
            warn!("⚠️ Prompt blocked by provider: {}", reason);
        }
    }
}

fn parse_direction(resp: &GeminiResponse) -> Result<PortfolioDirection, GeminiError> {
    let text: String = resp.first_parts()
        .iter()
        .filter_map(|p| match p {
            Part::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect();

    if text.trim().is_empty() {
        resp.log_block_reason();
        return Err(GeminiError::EmptyResponse);
    }

    let direction: PortfolioDirection = serde_json::from_str(text.trim())
        .map_err(|e| GeminiError::Parse(e.to_string()))?;
    validate_direction(&direction)?;

    if !direction.has_contiguous_numbering() {
        let numbers: Vec<u32> = direction.slides.iter().map(|s| s.slide_number).collect();
        warn!(?numbers, "slide numbers are not contiguous from 1; keeping them as given");
    }
    Ok(direction)
}

fn extract_mood_image(resp: &GeminiResponse) -> Option<MoodImage> {
    for p in resp.first_parts() {
        if let Part::Inline { inline_data } = p {
            let detected = sniff_format(&inline_data.data)
                .map(|f| format!("{:?}", f))
                .unwrap_or_else(|| "Unknown".to_string());
            info!(
                "🎯 Found image data with mime type: {} (detected {}, {} chars)",
                inline_data.mime_type, detected, inline_data.data.len()
            );
            return Some(MoodImage::from_base64_png(&inline_data.data));
        }
    }
    resp.log_block_reason();
    info!("⚠️ No inline image data found in response structure");
    None
}

/// Guesses the image format from the first decoded bytes of a base64 payload.
fn sniff_format(payload: &str) -> Option<image::ImageFormat> {
    let head: String = payload.chars().take(64).collect();
    let bytes = base64::engine::general_purpose::STANDARD.decode(head.as_bytes()).ok()?;
    image::guess_format(&bytes).ok()
}
