//! Brief rendering: subject brief → printable single-column PDF.
//!
//! Layout is computed by the pure [`layout`] function and only then painted
//! with pdfium, so pagination is testable without the native library.
//!
//! ```text
//! ┌──────────────── A4 595 × 842 pt ────────────────┐
//! │  50 pt margin                                   │
//! │  Economy - 2024-03-01            Helvetica-Bold 16
//! │                                                 │
//! │  - RBI holds repo rate at 6.5%   Helvetica 12   │
//! │  - …wrapped to the 495 pt content width         │
//! │                                    50 pt margin │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! ## Why spawn_blocking?
//!
//! Same reason as extraction: pdfium is a thread-affine C++ library, so the
//! document is built on the blocking pool.

use crate::engine;
use crate::error::PipelineError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use pdfium_render::prelude::*;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A4 page width in points.
pub const PAGE_WIDTH: f32 = 595.0;
/// A4 page height in points.
pub const PAGE_HEIGHT: f32 = 842.0;
/// Margin on every side, in points.
pub const MARGIN: f32 = 50.0;
/// Heading font size.
pub const TITLE_SIZE: f32 = 16.0;
/// Body font size.
pub const BODY_SIZE: f32 = 12.0;

const LINE_SPACING: f32 = 1.2;
/// Average Helvetica glyph advance as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;

/// Rendered artifact bytes plus the page count the persister records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifact {
    pub bytes: Vec<u8>,
    pub page_count: u32,
}

/// Turns a heading and a brief body into a document artifact.
#[async_trait]
pub trait ArtifactRenderer: Send + Sync {
    async fn render(&self, heading: &str, body: &str) -> Result<RenderedArtifact, PipelineError>;
}

/// [`ArtifactRenderer`] producing A4 PDFs with pdfium's built-in Helvetica.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfArtifactRenderer;

#[async_trait]
impl ArtifactRenderer for PdfArtifactRenderer {
    async fn render(&self, heading: &str, body: &str) -> Result<RenderedArtifact, PipelineError> {
        let pages = layout(heading, body);
        let title = heading.to_string();

        tokio::task::spawn_blocking(move || paint_blocking(&title, &pages))
            .await
            .map_err(|e| PipelineError::Internal(format!("Render task panicked: {}", e)))?
    }
}

fn paint_blocking(
    title: &str,
    pages: &[Vec<PlacedLine>],
) -> Result<RenderedArtifact, PipelineError> {
    let render_err = |e: PdfiumError| PipelineError::RenderFailed {
        title: title.to_string(),
        detail: format!("{:?}", e),
    };

    let pdfium = engine::bind()?;
    let mut document = pdfium.create_new_pdf().map_err(render_err)?;
    let regular = document.fonts_mut().helvetica();
    let bold = document.fonts_mut().helvetica_bold();

    for lines in pages {
        let mut page = document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::a4())
            .map_err(render_err)?;

        for line in lines.iter().filter(|l| !l.text.is_empty()) {
            let font = if line.bold { bold } else { regular };
            page.objects_mut()
                .create_text_object(
                    PdfPoints::new(line.x),
                    PdfPoints::new(line.y),
                    &line.text,
                    font,
                    PdfPoints::new(line.size),
                )
                .map_err(render_err)?;
        }
    }

    let bytes = document.save_to_bytes().map_err(render_err)?;
    debug!("Rendered '{}': {} pages, {} bytes", title, pages.len(), bytes.len());

    Ok(RenderedArtifact {
        bytes,
        page_count: pages.len() as u32,
    })
}

// ── Layout ───────────────────────────────────────────────────────────────

/// One line of text positioned on a page. `y` is the baseline, measured
/// from the bottom edge as PDF coordinates are.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub bold: bool,
}

/// Lay out a heading followed by a blank line and the wrapped body.
///
/// Always returns at least one page. The body is written verbatim: markdown
/// bullets stay as `- ` text.
pub fn layout(heading: &str, body: &str) -> Vec<Vec<PlacedLine>> {
    let mut cursor = Cursor::new();

    for line in wrap_lines(heading, TITLE_SIZE) {
        cursor.place(line, TITLE_SIZE, true);
    }
    cursor.skip(BODY_SIZE);

    for paragraph in body.lines() {
        if paragraph.trim().is_empty() {
            cursor.skip(BODY_SIZE);
            continue;
        }
        for line in wrap_lines(paragraph, BODY_SIZE) {
            cursor.place(line, BODY_SIZE, false);
        }
    }

    cursor.finish()
}

struct Cursor {
    pages: Vec<Vec<PlacedLine>>,
    current: Vec<PlacedLine>,
    top: f32,
}

impl Cursor {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            top: PAGE_HEIGHT - MARGIN,
        }
    }

    fn advance(&mut self, size: f32) -> f32 {
        let height = size * LINE_SPACING;
        if self.top - height < MARGIN && !self.current.is_empty() {
            self.pages.push(std::mem::take(&mut self.current));
            self.top = PAGE_HEIGHT - MARGIN;
        }
        self.top -= height;
        // Baseline sits one font size below the top of the line box.
        self.top + height - size
    }

    fn place(&mut self, text: String, size: f32, bold: bool) {
        let y = self.advance(size);
        self.current.push(PlacedLine {
            text,
            x: MARGIN,
            y,
            size,
            bold,
        });
    }

    fn skip(&mut self, size: f32) {
        // Blank lines never open a page on their own.
        if self.top - size * LINE_SPACING >= MARGIN {
            self.top -= size * LINE_SPACING;
        }
    }

    fn finish(mut self) -> Vec<Vec<PlacedLine>> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}

/// Greedy word wrap to the content width at `size`.
///
/// Words longer than a whole line are hard-split.
pub fn wrap_lines(text: &str, size: f32) -> Vec<String> {
    let content_width = PAGE_WIDTH - 2.0 * MARGIN;
    let max_chars = ((content_width / (size * AVG_GLYPH_WIDTH)) as usize).max(1);

    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_chars = 0usize;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if line_chars > 0 {
                lines.push(std::mem::take(&mut line));
                line_chars = 0;
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        if word.is_empty() {
            continue;
        }

        let needed = if line_chars == 0 { word.len() } else { line_chars + 1 + word.len() };
        if needed > max_chars {
            lines.push(std::mem::take(&mut line));
            line_chars = 0;
        }
        if line_chars > 0 {
            line.push(' ');
            line_chars += 1;
        }
        line.extend(word.iter());
        line_chars += word.len();
    }

    if line_chars > 0 {
        lines.push(line);
    }
    lines
}

// ── Artifact paths ───────────────────────────────────────────────────────

static NON_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

static NON_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]+").expect("valid regex"));

/// Lowercase, collapse every run of non-`[a-z0-9]` characters to `-`, and
/// trim `-` from both ends. Falls back to `brief` when nothing survives.
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    let slug = NON_SLUG.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "brief".to_string()
    } else {
        slug.to_string()
    }
}

/// Where one brief's artifact lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPath {
    /// Location on disk.
    pub absolute: PathBuf,
    /// `summaries/<date>/<slug>.pdf`, as recorded on the article.
    pub relative: String,
}

impl ArtifactPath {
    pub fn dir(&self) -> &Path {
        self.absolute.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Artifact location for `subject` on `date` under `output_root`.
///
/// The same subject and date always map to the same file, so reprocessing a
/// day overwrites that day's brief.
pub fn artifact_path(output_root: &Path, date: &str, subject: &str) -> ArtifactPath {
    let mut date = NON_DATE.replace_all(date.trim(), "-").into_owned();
    if date.trim_matches('-').is_empty() {
        date = "undated".to_string();
    }
    let file_name = format!("{}.pdf", slugify(subject));
    ArtifactPath {
        absolute: output_root.join("summaries").join(&date).join(&file_name),
        relative: format!("summaries/{}/{}", date, file_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_and_trims() {
        assert_eq!(slugify("Economy"), "economy");
        assert_eq!(slugify("Science & Technology"), "science-technology");
        assert_eq!(slugify("  International   Relations! "), "international-relations");
        assert_eq!(slugify("--GS-II (Polity)--"), "gs-ii-polity");
        assert_eq!(slugify("???"), "brief");
    }

    #[test]
    fn artifact_path_is_deterministic() {
        let a = artifact_path(Path::new("/srv/uploads"), "2024-03-01", "Science & Technology");
        assert_eq!(a.relative, "summaries/2024-03-01/science-technology.pdf");
        assert_eq!(
            a.absolute,
            PathBuf::from("/srv/uploads/summaries/2024-03-01/science-technology.pdf")
        );
        assert_eq!(a.dir(), Path::new("/srv/uploads/summaries/2024-03-01"));
        assert_eq!(a, artifact_path(Path::new("/srv/uploads"), "2024-03-01", "science technology"));
    }

    #[test]
    fn artifact_path_cannot_escape_output_root() {
        let a = artifact_path(Path::new("/srv/uploads"), "../../etc", "Economy");
        assert_eq!(a.relative, "summaries/-etc/economy.pdf");
        assert!(a.absolute.starts_with("/srv/uploads/summaries"));

        let a = artifact_path(Path::new("out"), "", "Economy");
        assert_eq!(a.relative, "summaries/undated/economy.pdf");
    }

    #[test]
    fn wrap_respects_width_and_keeps_words() {
        let text = "word ".repeat(60);
        let lines = wrap_lines(&text, BODY_SIZE);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.chars().count() <= 82));
        assert_eq!(lines.join(" ").split_whitespace().count(), 60);
    }

    #[test]
    fn wrap_hard_splits_long_words() {
        let long = "x".repeat(200);
        let lines = wrap_lines(&format!("a {long} b"), BODY_SIZE);
        assert_eq!(lines[0], "a");
        assert_eq!(lines[1].len(), 82);
        assert!(lines.last().unwrap().ends_with(" b"));
        assert!(wrap_lines("   ", BODY_SIZE).is_empty());
    }

    #[test]
    fn layout_places_heading_first_in_bold() {
        let pages = layout("Economy - 2024-03-01", "- RBI holds repo rate\n- GDP at 7%");
        assert_eq!(pages.len(), 1);
        let first = &pages[0][0];
        assert!(first.bold);
        assert_eq!(first.size, TITLE_SIZE);
        assert_eq!(first.x, MARGIN);
        assert_eq!(first.y, PAGE_HEIGHT - MARGIN - TITLE_SIZE);
        assert_eq!(pages[0][1].text, "- RBI holds repo rate");
        assert!(pages[0][1].y < first.y - BODY_SIZE);
    }

    #[test]
    fn layout_paginates_long_bodies_within_margins() {
        let body = (0..200).map(|i| format!("- bullet {i}")).collect::<Vec<_>>().join("\n");
        let pages = layout("History - 2024-03-01", &body);
        assert!(pages.len() >= 4);
        for line in pages.iter().flatten() {
            assert!(line.y >= MARGIN);
            assert!(line.y <= PAGE_HEIGHT - MARGIN);
        }
        let placed: usize = pages.iter().map(|p| p.len()).sum();
        assert_eq!(placed, 201);
    }

    #[test]
    fn empty_body_still_yields_one_page() {
        let pages = layout("Geography - 2024-03-01", "");
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].len(), 1);
    }
}
