//! Scripted stand-in for the Gemini client, for pipeline and route tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::gemini::{AestheticModel, GeminiError};
use crate::models::{MoodImage, PortfolioDirection, PortfolioSlide, SlideLayout, UserProfile};

pub fn sample_direction() -> PortfolioDirection {
    PortfolioDirection {
        title: "Ink & Light".into(),
        concept_statement: "Between the brush and the shutter, a quiet grief takes shape.".into(),
        aesthetic_keywords: vec!["melancholy".into(), "structure".into(), "negative space".into()],
        color_palette_description: "Charcoal, Vermeer Blue, Old Parchment".into(),
        slides: vec![
            PortfolioSlide {
                slide_number: 1,
                title: "Opening <Silence>".into(),
                layout: SlideLayout::Title,
                content_guide: "Name, title and a single line of statement.".into(),
                visual_prompt: "An empty room lit from a north window.".into(),
            },
            PortfolioSlide {
                slide_number: 2,
                title: "Ink".into(),
                layout: SlideLayout::Grid,
                content_guide: "Four frames of hands and fabric.".into(),
                visual_prompt: "Black wool against rough paper.".into(),
            },
        ],
    }
}

enum PlanScript {
    Return(PortfolioDirection),
    Fail(fn() -> GeminiError),
}

enum ImageScript {
    Return(Option<MoodImage>),
    Fail(fn() -> GeminiError),
}

pub struct ScriptedModel {
    credential: bool,
    plan: PlanScript,
    image: ImageScript,
    image_gate: Option<Arc<Notify>>,
    plan_calls: AtomicUsize,
    image_calls: AtomicUsize,
    last_profile: Mutex<Option<UserProfile>>,
    image_direction: Mutex<Option<PortfolioDirection>>,
}

impl ScriptedModel {
    /// Returns [`sample_direction`] and a tiny PNG payload.
    pub fn succeeding() -> Self {
        Self::returning(sample_direction())
    }

    pub fn returning(direction: PortfolioDirection) -> Self {
        Self {
            credential: true,
            plan: PlanScript::Return(direction),
            image: ImageScript::Return(Some(MoodImage::from_base64_png("iVBORw0KGgo="))),
            image_gate: None,
            plan_calls: AtomicUsize::new(0),
            image_calls: AtomicUsize::new(0),
            last_profile: Mutex::new(None),
            image_direction: Mutex::new(None),
        }
    }

    pub fn without_credential(mut self) -> Self {
        self.credential = false;
        self
    }

    pub fn plan_fails_with(mut self, err: fn() -> GeminiError) -> Self {
        self.plan = PlanScript::Fail(err);
        self
    }

    pub fn image_fails_with(mut self, err: fn() -> GeminiError) -> Self {
        self.image = ImageScript::Fail(err);
        self
    }

    pub fn without_image(mut self) -> Self {
        self.image = ImageScript::Return(None);
        self
    }

    /// Image requests wait until [`ScriptedModel::image_gate`] is notified.
    pub fn gated_image(mut self) -> Self {
        self.image_gate = Some(Arc::new(Notify::new()));
        self
    }

    pub fn image_gate(&self) -> Arc<Notify> {
        self.image_gate.clone().expect("model built without gated_image()")
    }

    pub fn plan_calls(&self) -> usize {
        self.plan_calls.load(Ordering::SeqCst)
    }

    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }

    pub fn last_profile(&self) -> Option<UserProfile> {
        self.last_profile.lock().clone()
    }

    pub fn image_requested_for(&self) -> Option<PortfolioDirection> {
        self.image_direction.lock().clone()
    }
}

#[async_trait]
impl AestheticModel for ScriptedModel {
    fn ensure_credential(&self) -> Result<(), GeminiError> {
        if self.credential { Ok(()) } else { Err(GeminiError::MissingCredential) }
    }

    async fn request_portfolio_plan(&self, profile: &UserProfile) -> Result<PortfolioDirection, GeminiError> {
        self.plan_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_profile.lock() = Some(profile.clone());
        match &self.plan {
            PlanScript::Return(direction) => Ok(direction.clone()),
            PlanScript::Fail(err) => Err(err()),
        }
    }

    async fn request_mood_image(&self, direction: &PortfolioDirection) -> Result<Option<MoodImage>, GeminiError> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        *self.image_direction.lock() = Some(direction.clone());
        if let Some(gate) = &self.image_gate {
            gate.notified().await;
        }
        match &self.image {
            ImageScript::Return(image) => Ok(image.clone()),
            ImageScript::Fail(err) => Err(err()),
        }
    }
}
