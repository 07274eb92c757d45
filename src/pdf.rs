//! Minimal A4 page writer over printpdf builtin fonts.
//!
//! Coordinates are given in millimetres from the top-left corner; printpdf's
//! bottom-left origin is handled here. Text width is estimated from an average
//! Helvetica glyph width, which is close enough for the fixed layouts we draw.

use anyhow::{Context, Result};
use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
    Point,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

pub const PAGE_WIDTH: f64 = 210.0;
pub const PAGE_HEIGHT: f64 = 297.0;
pub const MARGIN: f64 = 10.0;

/// Points to millimetres (1 pt = 1/72 inch).
pub const PT_TO_MM: f64 = 25.4 / 72.0;

/// Rough advance width of Helvetica as a fraction of the font size.
const AVG_GLYPH_FRACTION: f64 = 0.5;

pub struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    pub page_number: usize,
}

impl PageWriter {
    pub fn new(title: &str) -> Result<Self> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH as f32), Mm(PAGE_HEIGHT as f32), "Layer 1");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .context("add Helvetica")?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .context("add Helvetica-Bold")?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            page_number: 1,
        })
    }

    /// Start a fresh page; subsequent drawing lands on it.
    pub fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH as f32), Mm(PAGE_HEIGHT as f32), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.page_number += 1;
    }

    fn y(from_top: f64) -> Mm {
        Mm((PAGE_HEIGHT - from_top) as f32)
    }

    pub fn text(&self, text: &str, size: f64, x: f64, y_top: f64) {
        self.layer
            .use_text(text, size as f32, Mm(x as f32), Self::y(y_top), &self.regular);
    }

    pub fn bold_text(&self, text: &str, size: f64, x: f64, y_top: f64) {
        self.layer
            .use_text(text, size as f32, Mm(x as f32), Self::y(y_top), &self.bold);
    }

    /// Right-aligned regular text; `x_right` is the right edge.
    pub fn text_right(&self, text: &str, size: f64, x_right: f64, y_top: f64) {
        let x = x_right - approx_text_width(text, size);
        self.text(text, size, x, y_top);
    }

    pub fn bold_text_right(&self, text: &str, size: f64, x_right: f64, y_top: f64) {
        let x = x_right - approx_text_width(text, size);
        self.bold_text(text, size, x, y_top);
    }

    fn stroke(&self, from: (f64, f64), to: (f64, f64)) {
        self.layer.set_outline_thickness(0.5);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(from.0 as f32), Self::y(from.1)), false),
                (Point::new(Mm(to.0 as f32), Self::y(to.1)), false),
            ],
            is_closed: false,
        });
    }

    pub fn hline(&self, x1: f64, x2: f64, y_top: f64) {
        self.stroke((x1, y_top), (x2, y_top));
    }

    pub fn vline(&self, x: f64, y1_top: f64, y2_top: f64) {
        self.stroke((x, y1_top), (x, y2_top));
    }

    /// Hairline grid: column boundaries at `x_bounds`, row boundaries at `y_bounds`
    /// (both in ascending order, from-top coordinates for y).
    pub fn grid(&self, x_bounds: &[f64], y_bounds: &[f64]) {
        let (Some(&x_first), Some(&x_last)) = (x_bounds.first(), x_bounds.last()) else {
            return;
        };
        let (Some(&y_first), Some(&y_last)) = (y_bounds.first(), y_bounds.last()) else {
            return;
        };
        for &y in y_bounds {
            self.hline(x_first, x_last, y);
        }
        for &x in x_bounds {
            self.vline(x, y_first, y_last);
        }
    }

    /// Write the finished document to `path`.
    pub fn save(self, path: &Path) -> Result<()> {
        let file =
            File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
        let mut writer = BufWriter::new(file);
        self.doc
            .save(&mut writer)
            .with_context(|| format!("Failed to write PDF {:?}", path))?;
        Ok(())
    }
}

/// Estimated rendered width in mm.
pub fn approx_text_width(text: &str, size: f64) -> f64 {
    text.chars().count() as f64 * size * AVG_GLYPH_FRACTION * PT_TO_MM
}

/// Line height in mm for a font size in points, with a little leading.
pub fn line_height(size: f64) -> f64 {
    size * 1.25 * PT_TO_MM
}

/// Break `text` into lines that fit `max_width` mm at `size` pt, on word
/// boundaries; a single oversized word is hard-broken.
pub fn wrap_text(text: &str, size: f64, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if approx_text_width(&candidate, size) <= max_width || current.is_empty() {
            current = candidate;
            // Hard-break a single word that overflows on its own
            while approx_text_width(&current, size) > max_width && current.chars().count() > 1 {
                let fit = (max_width / (size * AVG_GLYPH_FRACTION * PT_TO_MM)).max(1.0) as usize;
                let head: String = current.chars().take(fit).collect();
                let tail: String = current.chars().skip(fit).collect();
                lines.push(head);
                current = tail;
            }
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
