use crate::models::PortfolioDirection;
use printpdf::*;
use std::io::BufWriter;
use thiserror::Error;

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN: f32 = 15.0;

#[derive(Debug, Error)]
#[error("pdf export failed: {0}")]
pub struct PdfError(String);

/// Text-only PDF of a direction: a cover page, then one page per slide.
/// The mood image stays in the web view.
pub fn generate_pdf(direction: &PortfolioDirection) -> Result<Vec<u8>, PdfError> {
    let (doc, cover, layer) = PdfDocument::new(
        truncate(&direction.title, 48),
        Mm(PAGE_W),
        Mm(PAGE_H),
        "Cover",
    );
    let font = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(|e| PdfError(format!("{e:?}")))?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(|e| PdfError(format!("{e:?}")))?;

    let cover = doc.get_page(cover).get_layer(layer);
    let mut y = 275.0;
    cover.use_text("PORTFOLIO DIRECTION", 9.0, Mm(MARGIN), Mm(y), &font);
    y -= 12.0;
    cover.use_text(truncate(&direction.title, 60), 24.0, Mm(MARGIN), Mm(y), &bold);
    y -= 14.0;
    y = write_block(&cover, &font, &direction.concept_statement, 11.0, y, 95);
    y -= 6.0;
    cover.use_text("Keywords", 9.0, Mm(MARGIN), Mm(y), &bold);
    y -= 6.0;
    y = write_block(&cover, &font, &direction.aesthetic_keywords.join("  ·  "), 10.0, y, 100);
    y -= 6.0;
    cover.use_text("Palette", 9.0, Mm(MARGIN), Mm(y), &bold);
    y -= 6.0;
    y = write_block(&cover, &font, &direction.color_palette_description, 10.0, y, 100);
    y -= 6.0;
    cover.use_text(format!("{} slides", direction.slides.len()), 9.0, Mm(MARGIN), Mm(y), &font);

    for slide in &direction.slides {
        let (page, layer) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), format!("Slide {:02}", slide.slide_number));
        let layer_ref = doc.get_page(page).get_layer(layer);
        let mut y = 275.0;
        layer_ref.use_text(
            format!("SLIDE {:02}  ·  {} LAYOUT", slide.slide_number, slide.layout.as_str().to_uppercase()),
            9.0,
            Mm(MARGIN),
            Mm(y),
            &font,
        );
        y -= 12.0;
        layer_ref.use_text(truncate(&slide.title, 70), 18.0, Mm(MARGIN), Mm(y), &bold);
        y -= 14.0;
        layer_ref.use_text("Content Direction", 9.0, Mm(MARGIN), Mm(y), &bold);
        y -= 6.0;
        y = write_block(&layer_ref, &font, &slide.content_guide, 11.0, y, 95);
        y -= 6.0;
        layer_ref.use_text("Visual Cue", 9.0, Mm(MARGIN), Mm(y), &bold);
        y -= 6.0;
        write_block(&layer_ref, &font, &format!("\"{}\"", slide.visual_prompt), 11.0, y, 95);
    }

    let mut buf: Vec<u8> = Vec::new();
    {
        let mut writer = BufWriter::new(&mut buf);
        doc.save(&mut writer).map_err(|e| PdfError(format!("{e:?}")))?;
    }
    Ok(buf)
}

/// Writes wrapped text downward from `y` (mm) and returns the next free baseline.
fn write_block(layer: &PdfLayerReference, font: &IndirectFontRef, text: &str, size: f32, mut y: f32, width: usize) -> f32 {
    let line_height = size * 0.5;
    for line in wrap(text, width) {
        if y < MARGIN {
            break;
        }
        layer.use_text(line, size, Mm(MARGIN), Mm(y), font);
        y -= line_height;
    }
    y
}

/// Greedy word wrap on character counts.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() { word.chars().count() } else { current.chars().count() + 1 + word.chars().count() };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max { s.to_string() } else { format!("{}…", s.chars().take(max).collect::<String>()) }
}
