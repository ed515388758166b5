//! The structured-output contract for the portfolio plan.
//!
//! The same contract is sent to the provider as `responseSchema` and checked
//! locally once the response has been deserialized.

use serde_json::{json, Value};
use thiserror::Error;

use crate::models::{PortfolioDirection, SlideLayout};

pub const DIRECTION_REQUIRED: [&str; 5] = [
    "title",
    "concept_statement",
    "aesthetic_keywords",
    "color_palette_description",
    "slides",
];

pub const SLIDE_REQUIRED: [&str; 5] = ["slideNumber", "title", "layout", "contentGuide", "visualPrompt"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaViolation {
    #[error("portfolio has no slides")]
    NoSlides,
    #[error("slide at position {position} has non-positive slideNumber")]
    ZeroSlideNumber { position: usize },
}

/// Gemini `responseSchema` for [`PortfolioDirection`].
pub fn portfolio_response_schema() -> Value {
    let layouts: Vec<&str> = SlideLayout::ALL.iter().map(SlideLayout::as_str).collect();
    json!({
        "type": "OBJECT",
        "properties": {
            "title": {
                "type": "STRING",
                "description": "A poetic title for the portfolio (e.g., 'Ink & Light', 'The Blue Hour')"
            },
            "concept_statement": {
                "type": "STRING",
                "description": "A 100-word sophisticated artist statement connecting rock, calligraphy, and YSL aesthetics."
            },
            "aesthetic_keywords": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "5 words describing the vibe."
            },
            "color_palette_description": {
                "type": "STRING",
                "description": "Description of colors (e.g., 'Charcoal, Vermeer Blue, Old Parchment')."
            },
            "slides": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "slideNumber": { "type": "INTEGER" },
                        "title": { "type": "STRING" },
                        "layout": { "type": "STRING", "enum": layouts },
                        "contentGuide": {
                            "type": "STRING",
                            "description": "What text or specific content goes here."
                        },
                        "visualPrompt": {
                            "type": "STRING",
                            "description": "A prompt describing the visual layout or mood image for this slide."
                        }
                    },
                    "required": SLIDE_REQUIRED
                }
            }
        },
        "required": DIRECTION_REQUIRED
    })
}

/// Checks what serde cannot: the shape is already enforced by deserialization.
///
/// Any string satisfies a `STRING` property, blank ones included. Duplicate or
/// out-of-order slide numbers are accepted and rendered as given.
pub fn validate_direction(direction: &PortfolioDirection) -> Result<(), SchemaViolation> {
    if direction.slides.is_empty() {
        return Err(SchemaViolation::NoSlides);
    }
    if let Some(position) = direction.slides.iter().position(|s| s.slide_number == 0) {
        return Err(SchemaViolation::ZeroSlideNumber { position });
    }
    Ok(())
}
