use serde::{Serialize, Deserialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A photographer's stated influences. Every field is free text and may be empty.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub interests: String,
    #[serde(default)]
    pub style_icons: String,
    #[serde(default)]
    pub fashion: String,
    #[serde(default)]
    pub movies: String,
    #[serde(default)]
    pub art: String,
    #[serde(default)]
    pub photography_style: String,
}

impl UserProfile {
    /// The profile a new session starts from.
    pub fn starter() -> Self {
        Self {
            interests: "Rock bands, Classical music, I like everything beautiful and melancholic.".into(),
            style_icons: "Tang Wei, Gong Li".into(),
            fashion: "YSL style (sharp, elegant, black)".into(),
            movies: "Aftersun, Summer 1993".into(),
            art: "Painter: Vermeer. Calligraphy: Xu Wei, Ni Zan.".into(),
            photography_style: "Quiet, still, humanistic care.".into(),
        }
    }

    pub fn get(&self, field: ProfileField) -> &str {
        match field {
            ProfileField::Interests => &self.interests,
            ProfileField::StyleIcons => &self.style_icons,
            ProfileField::Fashion => &self.fashion,
            ProfileField::Movies => &self.movies,
            ProfileField::Art => &self.art,
            ProfileField::PhotographyStyle => &self.photography_style,
        }
    }

    pub fn set(&mut self, field: ProfileField, value: String) {
        let slot = match field {
            ProfileField::Interests => &mut self.interests,
            ProfileField::StyleIcons => &mut self.style_icons,
            ProfileField::Fashion => &mut self.fashion,
            ProfileField::Movies => &mut self.movies,
            ProfileField::Art => &mut self.art,
            ProfileField::PhotographyStyle => &mut self.photography_style,
        };
        *slot = value;
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ProfileField {
    Interests,
    StyleIcons,
    Fashion,
    Movies,
    Art,
    PhotographyStyle,
}

impl ProfileField {
    pub const ALL: [ProfileField; 6] = [
        ProfileField::Interests,
        ProfileField::StyleIcons,
        ProfileField::Fashion,
        ProfileField::Movies,
        ProfileField::Art,
        ProfileField::PhotographyStyle,
    ];

    /// Wire name, as used in JSON bodies and HTML form inputs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileField::Interests => "interests",
            ProfileField::StyleIcons => "styleIcons",
            ProfileField::Fashion => "fashion",
            ProfileField::Movies => "movies",
            ProfileField::Art => "art",
            ProfileField::PhotographyStyle => "photographyStyle",
        }
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown profile field '{0}'")]
pub struct UnknownField(pub String);

impl FromStr for ProfileField {
    type Err = UnknownField;

    // Accepts the camelCase wire names and their snake_case spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "interests" => Ok(ProfileField::Interests),
            "styleIcons" | "style_icons" => Ok(ProfileField::StyleIcons),
            "fashion" => Ok(ProfileField::Fashion),
            "movies" => Ok(ProfileField::Movies),
            "art" => Ok(ProfileField::Art),
            "photographyStyle" | "photography_style" => Ok(ProfileField::PhotographyStyle),
            other => Err(UnknownField(other.to_string())),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum SlideLayout {
    Title,
    FullImage,
    Split,
    Grid,
    TextFocused,
}

impl SlideLayout {
    pub const ALL: [SlideLayout; 5] = [
        SlideLayout::Title,
        SlideLayout::FullImage,
        SlideLayout::Split,
        SlideLayout::Grid,
        SlideLayout::TextFocused,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SlideLayout::Title => "Title",
            SlideLayout::FullImage => "FullImage",
            SlideLayout::Split => "Split",
            SlideLayout::Grid => "Grid",
            SlideLayout::TextFocused => "TextFocused",
        }
    }

    /// Glyph shown in the slide card header.
    pub fn glyph(&self) -> &'static str {
        match self {
            SlideLayout::Title => "▭",
            SlideLayout::FullImage => "⤢",
            SlideLayout::Split => "◧",
            SlideLayout::Grid => "▦",
            SlideLayout::TextFocused => "¶",
        }
    }
}

impl fmt::Display for SlideLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSlide {
    pub slide_number: u32,
    pub title: String,
    pub layout: SlideLayout,
    pub content_guide: String,
    pub visual_prompt: String,
}

/// Field names match the provider's response schema, hence snake_case on the wire.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PortfolioDirection {
    pub title: String,
    pub concept_statement: String,
    pub aesthetic_keywords: Vec<String>,
    pub color_palette_description: String,
    pub slides: Vec<PortfolioSlide>,
}

impl PortfolioDirection {
    /// True when slide numbers run 1, 2, 3, ... in order with no gaps or repeats.
    pub fn has_contiguous_numbering(&self) -> bool {
        self.slides
            .iter()
            .enumerate()
            .all(|(i, s)| s.slide_number as usize == i + 1)
    }
}

/// A mood image as a `data:` URI ready to drop into an `<img src>`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct MoodImage(String);

impl MoodImage {
    const PNG_PREFIX: &'static str = "data:image/png;base64,";

    /// Wraps a raw base64 payload. The provider's payload is always labelled PNG.
    pub fn from_base64_png(payload: &str) -> Self {
        Self(format!("{}{}", Self::PNG_PREFIX, payload))
    }

    pub fn as_data_uri(&self) -> &str {
        &self.0
    }
}
