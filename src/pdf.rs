use printpdf::{BuiltinFont, Mm, PdfDocument};
use thiserror::Error;
use crate::model::MovieRecord;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const LINE_HEIGHT_MM: f32 = 8.0;
const FONT_SIZE: f32 = 12.0;

#[derive(Debug, Error)]
#[error("document render failed: {0}")]
pub struct RenderError(String);

/// Turns one record into a downloadable document.
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, movie: &MovieRecord) -> Result<Vec<u8>, RenderError>;

    fn content_type(&self) -> &'static str {
        "application/pdf"
    }

    fn file_name(&self, movie: &MovieRecord) -> String {
        format!("movie_{}.pdf", movie.id)
    }
}

/// Single A4 page, one line per field.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfRenderer;

impl DocumentRenderer for PdfRenderer {
    fn render(&self, movie: &MovieRecord) -> Result<Vec<u8>, RenderError> {
        let (doc, page, layer) = PdfDocument::new(
            format!("Movie {}", movie.id),
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "Layer 1",
        );
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| RenderError(e.to_string()))?;
        let layer = doc.get_page(page).get_layer(layer);

        let mut y = PAGE_HEIGHT_MM - MARGIN_MM;
        for line in document_lines(movie) {
            layer.use_text(line, FONT_SIZE, Mm(MARGIN_MM), Mm(y), &font);
            y -= LINE_HEIGHT_MM;
        }

        doc.save_to_bytes().map_err(|e| RenderError(e.to_string()))
    }
}

pub fn document_lines(movie: &MovieRecord) -> Vec<String> {
    vec![
        format!("Movie ID: {}", movie.id),
        format!("Title: {}", movie.title),
        format!("Director: {}", movie.director),
        format!("Release year: {}", movie.release_year),
        format!("Genre: {}", movie.genre),
        format!("Rating: {}", movie.rating),
        format!("Duration (minutes): {}", movie.duration_minutes),
        format!("Language: {}", movie.language),
    ]
}
