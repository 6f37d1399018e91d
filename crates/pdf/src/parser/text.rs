//! Content-stream walker: PDF text operators to positioned fragments.
//!
//! ```text
//! content ops -> text-state machine -> RawFragment[] (per page) -> RawDocument
//! ```
//!
//! PDF user space has its origin at the bottom-left with `y` growing upward.
//! Fragments are emitted in top-left coordinates so that `y0` grows down the
//! page.

use outline_core::types::{BBox, RawDocument, RawFragment, RawPage};

use super::backend::{
    decode_pdf_string, ContentOp, FontResource, MediaBox, Operand, PageId, PdfBackend,
    DEFAULT_MEDIA_BOX,
};
use crate::PdfError;

/// Approximate glyph advance as a fraction of the font size. Real glyph
/// widths are not consulted.
const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;

/// A `TJ` kerning step wider than this fraction of a glyph is a word gap.
const TJ_SPACE_FACTOR: f32 = 0.3;

type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// `m` applied after `n` (`m x n` in PDF row-vector convention).
fn multiply(m: &Matrix, n: &Matrix) -> Matrix {
    [
        m[0] * n[0] + m[1] * n[2],
        m[0] * n[1] + m[1] * n[3],
        m[2] * n[0] + m[3] * n[2],
        m[2] * n[1] + m[3] * n[3],
        m[4] * n[0] + m[5] * n[2] + n[4],
        m[4] * n[1] + m[5] * n[3] + n[5],
    ]
}

fn matrix_from(operands: &[Operand]) -> Option<Matrix> {
    let vals: Vec<f32> = operands.iter().take(6).filter_map(Operand::as_number).collect();
    match vals[..] {
        [a, b, c, d, e, f] => Some([a, b, c, d, e, f]),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Text state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct TextState {
    font: Option<FontResource>,
    font_name: String,
    font_size: f32,
    is_bold: bool,
    text_matrix: Matrix,
    line_matrix: Matrix,
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    text_rise: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: None,
            font_name: String::new(),
            font_size: 0.0,
            is_bold: false,
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            text_rise: 0.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    fn translate_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = multiply(&[1.0, 0.0, 0.0, 1.0, tx, ty], &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.translate_line(0.0, -self.leading);
    }

    fn advance(&mut self, dx: f32) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }

    fn glyph_width(&self) -> f32 {
        self.font_size * APPROX_CHAR_WIDTH_RATIO * self.horiz_scale
    }

    fn advance_for(&self, text: &str) -> f32 {
        text.chars()
            .map(|c| {
                let w = self.glyph_width() + self.char_spacing;
                if c == ' ' {
                    w + self.word_spacing
                } else {
                    w
                }
            })
            .sum()
    }
}

// ---------------------------------------------------------------------------
// Page walker
// ---------------------------------------------------------------------------

/// Collects fragments for one page while the operators are replayed.
struct PageWalker<'a> {
    backend: &'a dyn PdfBackend,
    fonts: Vec<FontResource>,
    media: MediaBox,
    ctm: Matrix,
    ctm_stack: Vec<Matrix>,
    state: TextState,
    fragments: Vec<RawFragment>,
}

impl<'a> PageWalker<'a> {
    fn new(backend: &'a dyn PdfBackend, fonts: Vec<FontResource>, media: MediaBox) -> Self {
        Self {
            backend,
            fonts,
            media,
            ctm: IDENTITY,
            ctm_stack: Vec::new(),
            state: TextState::default(),
            fragments: Vec::new(),
        }
    }

    fn number(operands: &[Operand], i: usize) -> Option<f32> {
        operands.get(i).and_then(Operand::as_number)
    }

    fn apply(&mut self, op: &ContentOp) {
        let ops = &op.operands;
        match op.operator.as_str() {
            "q" => self.ctm_stack.push(self.ctm),
            "Q" => {
                if let Some(m) = self.ctm_stack.pop() {
                    self.ctm = m;
                }
            }
            "cm" => {
                if let Some(m) = matrix_from(ops) {
                    self.ctm = multiply(&m, &self.ctm);
                }
            }
            "BT" => {
                self.state.text_matrix = IDENTITY;
                self.state.line_matrix = IDENTITY;
            }
            "Tf" => self.set_font(ops),
            "Tm" => {
                if let Some(m) = matrix_from(ops) {
                    self.state.text_matrix = m;
                    self.state.line_matrix = m;
                }
            }
            "Td" | "TD" => {
                if let (Some(tx), Some(ty)) = (Self::number(ops, 0), Self::number(ops, 1)) {
                    if op.operator == "TD" {
                        self.state.leading = -ty;
                    }
                    self.state.translate_line(tx, ty);
                }
            }
            "T*" => self.state.next_line(),
            "TL" => {
                if let Some(v) = Self::number(ops, 0) {
                    self.state.leading = v;
                }
            }
            "Tc" => {
                if let Some(v) = Self::number(ops, 0) {
                    self.state.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(v) = Self::number(ops, 0) {
                    self.state.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some(v) = Self::number(ops, 0) {
                    self.state.horiz_scale = v / 100.0;
                }
            }
            "Ts" => {
                if let Some(v) = Self::number(ops, 0) {
                    self.state.text_rise = v;
                }
            }
            "Tj" => {
                if let Some(Operand::Str(bytes)) = ops.first() {
                    self.show(bytes);
                }
            }
            "'" => {
                self.state.next_line();
                if let Some(Operand::Str(bytes)) = ops.first() {
                    self.show(bytes);
                }
            }
            "\"" => {
                if let Some(aw) = Self::number(ops, 0) {
                    self.state.word_spacing = aw;
                }
                if let Some(ac) = Self::number(ops, 1) {
                    self.state.char_spacing = ac;
                }
                self.state.next_line();
                if let Some(Operand::Str(bytes)) = ops.get(2) {
                    self.show(bytes);
                }
            }
            "TJ" => {
                if let Some(Operand::Array(items)) = ops.first() {
                    self.show_array(items);
                }
            }
            _ => {}
        }
    }

    fn set_font(&mut self, ops: &[Operand]) {
        let key = match ops.first() {
            Some(Operand::Name(n)) => n.clone(),
            _ => return,
        };
        let size = Self::number(ops, 1).unwrap_or(0.0);
        let font = self.fonts.iter().find(|f| f.key == key).cloned();

        self.state.font_name = font
            .as_ref()
            .and_then(|f| f.base_font.clone())
            .unwrap_or_else(|| String::from_utf8_lossy(&key).into_owned());
        self.state.is_bold = match &font {
            Some(f) => f.is_bold(),
            None => super::backend::name_looks_bold(&self.state.font_name),
        };
        self.state.font_size = size;
        self.state.font = font;
    }

    fn decode(&self, bytes: &[u8]) -> String {
        let decoded = self.backend.decode_text(self.state.font.as_ref(), bytes);
        if decoded.is_empty() {
            decode_pdf_string(bytes)
        } else {
            decoded
        }
    }

    fn show(&mut self, bytes: &[u8]) {
        let text = self.decode(bytes);
        if text.is_empty() {
            return;
        }
        let origin = self.state.text_matrix;
        let advance = self.state.advance_for(&text);
        self.emit(text, origin, advance);
        self.state.advance(advance);
    }

    /// `TJ`: strings interleaved with kerning in thousandths of text space.
    /// One fragment per array; large negative kerns become spaces.
    fn show_array(&mut self, items: &[Operand]) {
        let origin = self.state.text_matrix;
        let start_x = origin[4];
        let mut text = String::new();

        for item in items {
            match item {
                Operand::Str(bytes) => {
                    let piece = self.decode(bytes);
                    let advance = self.state.advance_for(&piece);
                    text.push_str(&piece);
                    self.state.advance(advance);
                }
                other => {
                    if let Some(adj) = other.as_number() {
                        let dx = -adj / 1000.0 * self.state.font_size * self.state.horiz_scale;
                        if dx > self.state.glyph_width() * TJ_SPACE_FACTOR
                            && !text.is_empty()
                            && !text.ends_with(' ')
                        {
                            text.push(' ');
                        }
                        self.state.advance(dx);
                    }
                }
            }
        }

        let advance = (self.state.text_matrix[4] - start_x) / origin[0].abs().max(f32::EPSILON);
        let text = text.trim_end().to_string();
        if !text.is_empty() {
            self.emit(text, origin, advance);
        }
    }

    /// Record a fragment whose baseline starts at `origin` (text space) and
    /// extends `advance` text-space units.
    fn emit(&mut self, text: String, origin: Matrix, advance: f32) {
        let rendering = multiply(&origin, &self.ctm);
        let baseline_x = rendering[4];
        let baseline_y = rendering[5] + self.state.text_rise * rendering[3];
        let scale_y = (rendering[1].powi(2) + rendering[3].powi(2)).sqrt();
        let scale_x = (rendering[0].powi(2) + rendering[2].powi(2)).sqrt();
        let font_size = (self.state.font_size * scale_y).abs();
        let width = (advance * scale_x).abs();

        let x0 = baseline_x - self.media.llx;
        let top = self.media.ury - (baseline_y + font_size);
        let bottom = self.media.ury - baseline_y;

        self.fragments.push(RawFragment {
            text,
            font_name: Some(self.state.font_name.clone()),
            font_size: Some(font_size),
            is_bold: Some(self.state.is_bold),
            bbox: BBox::new(x0, top, x0 + width, bottom),
        });
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Replay one page's content stream and collect its text fragments.
pub fn extract_page(
    backend: &dyn PdfBackend,
    number: u32,
    page_id: PageId,
) -> Result<RawPage, PdfError> {
    let media = backend.media_box(page_id).unwrap_or(DEFAULT_MEDIA_BOX);
    let content = backend.page_content(page_id)?;
    let ops = backend.decode_content(&content)?;
    let fonts = backend.page_fonts(page_id).unwrap_or_else(|e| {
        log::debug!("page {}: no font resources ({})", number, e);
        Vec::new()
    });

    let mut walker = PageWalker::new(backend, fonts, media);
    for op in &ops {
        walker.apply(op);
    }

    Ok(RawPage {
        number,
        width: media.width(),
        height: media.height(),
        fragments: walker.fragments,
    })
}

/// Extract every page in page-number order.
///
/// A page whose content stream cannot be read is kept with no fragments so
/// page numbers stay aligned with the document.
pub fn extract_all_pages(backend: &dyn PdfBackend) -> RawDocument {
    let pages = backend
        .pages()
        .into_iter()
        .map(|(number, page_id)| {
            extract_page(backend, number, page_id).unwrap_or_else(|e| {
                log::warn!("page {}: skipping unreadable content: {}", number, e);
                let media = backend.media_box(page_id).unwrap_or(DEFAULT_MEDIA_BOX);
                RawPage {
                    number,
                    width: media.width(),
                    height: media.height(),
                    fragments: Vec::new(),
                }
            })
        })
        .collect();

    RawDocument { pages }
}
