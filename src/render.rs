//! Server-rendered pages for each generation state.

use handlebars::Handlebars;
use include_dir::{include_dir, Dir};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{PortfolioDirection, PortfolioSlide, ProfileField};
use crate::session::{GenerationState, Session};

static TEMPLATES: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/templates");
static ASSETS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/static");

/// Seconds between reloads while a cycle is in flight.
const REFRESH_SECS: u32 = 2;

#[derive(Debug, Error)]
pub enum PageError {
    #[error("template {0} is not valid UTF-8")]
    Encoding(String),
    #[error(transparent)]
    Template(#[from] handlebars::TemplateError),
    #[error(transparent)]
    Render(#[from] handlebars::RenderError),
}

/// Embedded static file with its content type.
pub fn asset(name: &str) -> Option<(&'static str, &'static [u8])> {
    let file = ASSETS.get_file(name)?;
    let mime = match file.path().extension().and_then(|e| e.to_str()) {
        Some("css") => "text/css; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    };
    Some((mime, file.contents()))
}

fn field_meta(field: ProfileField) -> (&'static str, &'static str, bool) {
    match field {
        ProfileField::Interests => ("Music & Atmosphere", "e.g., Rock bands, Classical music, beauty in sadness...", true),
        ProfileField::StyleIcons => ("Muses & Icons", "e.g., Tang Wei, Gong Li...", true),
        ProfileField::Fashion => ("Fashion & Aesthetics", "e.g., YSL style...", false),
        ProfileField::Movies => ("Cinema", "e.g., Aftersun, Summer 1993...", false),
        ProfileField::Art => ("Art (Painting & Calligraphy)", "e.g., Vermeer, Xu Wei, Ni Zan...", false),
        ProfileField::PhotographyStyle => ("Photography Style", "e.g., Quiet, humanistic, serene...", false),
    }
}

#[derive(Serialize)]
struct FieldView<'a> {
    name: &'static str,
    label: &'static str,
    placeholder: &'static str,
    value: &'a str,
    multiline: bool,
}

#[derive(Serialize)]
struct SlideView<'a> {
    number: String,
    title: &'a str,
    layout: &'static str,
    glyph: &'static str,
    content_guide: &'a str,
    visual_prompt: &'a str,
}

impl<'a> From<&'a PortfolioSlide> for SlideView<'a> {
    fn from(slide: &'a PortfolioSlide) -> Self {
        Self {
            number: format!("{:02}", slide.slide_number),
            title: &slide.title,
            layout: slide.layout.as_str(),
            glyph: slide.layout.glyph(),
            content_guide: &slide.content_guide,
            visual_prompt: &slide.visual_prompt,
        }
    }
}

#[derive(Serialize)]
struct PageContext<'a> {
    session_id: Uuid,
    status: &'static str,
    idle: bool,
    loading: bool,
    complete: bool,
    failed: bool,
    refresh_secs: Option<u32>,
    loading_headline: &'static str,
    fields: Vec<FieldView<'a>>,
    direction: Option<&'a PortfolioDirection>,
    slides: Vec<SlideView<'a>>,
    slide_count: usize,
    mood_image: Option<&'a str>,
    mood_placeholder: &'static str,
    error_message: Option<&'a str>,
}

impl<'a> PageContext<'a> {
    fn from_session(session: &'a Session) -> Self {
        let state = &session.state;
        let direction = state.direction();
        let slides: Vec<SlideView<'a>> = direction
            .map(|d| d.slides.iter().map(SlideView::from).collect())
            .unwrap_or_default();

        Self {
            session_id: session.id,
            status: state.label(),
            idle: matches!(state, GenerationState::Idle),
            loading: state.is_in_flight(),
            complete: matches!(state, GenerationState::Complete { .. }),
            failed: matches!(state, GenerationState::Error { .. }),
            refresh_secs: state.is_in_flight().then_some(REFRESH_SECS),
            loading_headline: match state {
                GenerationState::Analyzing => "Analyzing aesthetic influences...",
                _ => "Synthesizing visual identity...",
            },
            fields: ProfileField::ALL
                .into_iter()
                .map(|field| {
                    let (label, placeholder, multiline) = field_meta(field);
                    FieldView { name: field.as_str(), label, placeholder, value: session.profile.get(field), multiline }
                })
                .collect(),
            direction,
            slide_count: slides.len(),
            slides,
            mood_image: state.mood_image().map(|m| m.as_data_uri()),
            mood_placeholder: if state.is_in_flight() { "Synthesizing mood image..." } else { "Mood image unavailable" },
            error_message: match state {
                GenerationState::Error { message } => Some(message.as_str()),
                _ => None,
            },
        }
    }
}

#[derive(Serialize)]
struct FailureContext<'a> {
    code: u16,
    reason: &'a str,
    message: &'a str,
}

/// Standalone error page for the browser routes. Needs no [`Renderer`], so it
/// can be produced from an `IntoResponse` impl.
pub fn failure_page(code: u16, reason: &str, message: &str) -> String {
    let context = FailureContext { code, reason, message };
    TEMPLATES
        .get_file("failure.hbs")
        .and_then(|f| f.contents_utf8())
        .and_then(|source| Handlebars::new().render_template(source, &context).ok())
        .unwrap_or_else(|| format!("{} {}: {}", code, reason, handlebars::html_escape(message)))
}

pub struct Renderer {
    hbs: Handlebars<'static>,
}

impl Renderer {
    /// Registers every embedded template under its file stem.
    pub fn new() -> Result<Self, PageError> {
        let mut hbs = Handlebars::new();
        for file in TEMPLATES.files() {
            let path = file.path();
            if path.extension().and_then(|e| e.to_str()) != Some("hbs") {
                continue;
            }
            let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string();
            let source = file
                .contents_utf8()
                .ok_or_else(|| PageError::Encoding(path.display().to_string()))?;
            hbs.register_template_string(&name, source)?;
            tracing::debug!(template = %name, "Registered template");
        }
        Ok(Self { hbs })
    }

    pub fn page(&self, session: &Session) -> Result<String, PageError> {
        Ok(self.hbs.render("page", &PageContext::from_session(session))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::sample_direction;
    use crate::models::{MoodImage, UserProfile};
    use crate::session::SessionStore;

    fn render(state: GenerationState) -> String {
        let mut session = SessionStore::new().create();
        session.state = state;
        Renderer::new().unwrap().page(&session).unwrap()
    }

    #[test]
    fn idle_shows_the_form_with_profile_values() {
        let html = render(GenerationState::Idle);
        assert!(html.contains("Define Your Essence"));
        assert!(html.contains("name=\"styleIcons\""));
        assert!(html.contains("Tang Wei, Gong Li"));
        assert!(html.contains("Art (Painting &amp; Calligraphy)"));
        assert!(!html.contains("http-equiv=\"refresh\""));
    }

    #[test]
    fn loading_states_refresh_and_name_the_step() {
        let html = render(GenerationState::Analyzing);
        assert!(html.contains("Analyzing aesthetic influences..."));
        assert!(html.contains("http-equiv=\"refresh\""));
        assert!(!html.contains("Define Your Essence"));

        let html = render(GenerationState::GeneratingImages { direction: sample_direction() });
        assert!(html.contains("Synthesizing visual identity..."));
        assert!(html.contains("Synthesizing mood image..."));
        assert!(html.contains("Portfolio Flow"));
    }

    #[test]
    fn complete_renders_board_and_deck() {
        let html = render(GenerationState::Complete {
            direction: sample_direction(),
            mood_image: Some(MoodImage::from_base64_png("iVBORw0KGgo")),
        });
        assert!(html.contains("Ink &amp; Light"));
        assert!(html.contains("negative space"));
        assert!(html.contains("2 Slides Generated"));
        assert!(html.contains("Slide 01"));
        assert!(html.contains("Slide 02"));
        assert!(html.contains("Grid Layout"));
        assert!(html.contains("data:image/png;base64,iVBORw0KGgo"));
        assert!(html.contains("Curate New Direction"));
        assert!(html.contains("portfolio.pdf"));
        assert!(!html.contains("http-equiv=\"refresh\""));
    }

    #[test]
    fn complete_without_image_shows_placeholder() {
        let html = render(GenerationState::Complete { direction: sample_direction(), mood_image: None });
        assert!(html.contains("Mood image unavailable"));
        assert!(!html.contains("<img"));
    }

    #[test]
    fn provider_text_is_escaped() {
        let html = render(GenerationState::Complete { direction: sample_direction(), mood_image: None });
        assert!(html.contains("Opening &lt;Silence&gt;"));
        assert!(!html.contains("<Silence>"));
    }

    #[test]
    fn duplicate_slide_numbers_render_as_given() {
        let mut direction = sample_direction();
        let mut extra = direction.slides[0].clone();
        extra.title = "Echo".into();
        direction.slides.insert(1, extra);
        let html = render(GenerationState::Complete { direction, mood_image: None });
        assert_eq!(html.matches("Slide 01").count(), 2);
        assert!(html.contains("3 Slides Generated"));
    }

    #[test]
    fn error_shows_message_and_retry() {
        let html = render(GenerationState::Error { message: "Failed to curate portfolio.".into() });
        assert!(html.contains("Failed to curate portfolio."));
        assert!(html.contains("Try Again"));
        assert!(!html.contains("Portfolio Flow"));
    }

    #[test]
    fn empty_profile_renders_empty_inputs() {
        let store = SessionStore::new();
        let session = store.create_with(UserProfile::default());
        let html = Renderer::new().unwrap().page(&session).unwrap();
        assert!(html.contains("name=\"fashion\" value=\"\""));
    }

    #[test]
    fn failure_page_escapes_and_links_home() {
        let html = failure_page(404, "Not Found", "session <b>gone</b>");
        assert!(html.contains("<!DOCTYPE html>"));
        assert!(html.contains("404 · Not Found"));
        assert!(html.contains("session &lt;b&gt;gone&lt;/b&gt;"));
        assert!(html.contains(r#"href="/""#));
    }

    #[test]
    fn stylesheet_is_embedded() {
        let (mime, body) = asset("style.css").unwrap();
        assert!(mime.starts_with("text/css"));
        assert!(!body.is_empty());
        assert!(asset("missing.js").is_none());
    }
}
