//! Fragment normalizer: raw parser fragments to cleaned [`TextSpan`]s.
//!
//! ```text
//! RawDocument  ->  clean text  ->  merge same-style neighbours  ->  SpanDocument
//! ```

use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::config::OutlineConfig;
use crate::types::{BBox, PageInfo, RawDocument, RawFragment, SpanDocument, TextSpan};

/// Two fragments whose tops differ by less than this sit on the same line.
pub const LINE_TOLERANCE: f32 = 2.0;

/// Font sizes closer than this are treated as identical.
const SIZE_EPSILON: f32 = 0.01;

// ---------------------------------------------------------------------------
// Text cleanup
// ---------------------------------------------------------------------------

/// Normalize one fragment's text: NFC, ligature expansion, replacement
/// character removal, whitespace collapse, trim.
pub fn clean_text(text: &str) -> String {
    let mut result: String = text.nfc().collect();

    let ligatures = [
        ("\u{FB00}", "ff"),
        ("\u{FB01}", "fi"),
        ("\u{FB02}", "fl"),
        ("\u{FB03}", "ffi"),
        ("\u{FB04}", "ffl"),
    ];
    for (lig, replacement) in &ligatures {
        result = result.replace(lig, replacement);
    }

    result = result.replace('\u{FFFD}', "");

    static RE_SPACES: OnceLock<Regex> = OnceLock::new();
    let re_spaces = RE_SPACES.get_or_init(|| Regex::new(r"\s+").unwrap());
    re_spaces.replace_all(&result, " ").trim().to_string()
}

/// Returns `true` if `c` belongs to a script that does not use inter-word
/// spaces (CJK ideographs, kana, Hangul, Thai and neighbours).
pub fn is_spaceless_script_char(c: char) -> bool {
    matches!(
        c as u32,
        0x4E00..=0x9FFF
        | 0x3400..=0x4DBF
        | 0x20000..=0x2A6DF
        | 0xF900..=0xFAFF
        | 0x3040..=0x309F
        | 0x30A0..=0x30FF
        | 0x31F0..=0x31FF
        | 0xAC00..=0xD7AF
        | 0x1100..=0x11FF
        | 0x3130..=0x318F
        | 0x3000..=0x303F
        | 0xFF00..=0xFFEF
        | 0x0E00..=0x0E7F
        | 0x0E80..=0x0EFF
        | 0x1000..=0x109F
        | 0x1780..=0x17FF
        | 0x0F00..=0x0FFF
    )
}

fn sanitize_size(size: Option<f32>) -> f32 {
    match size {
        Some(s) if s.is_finite() && s > 0.0 => s,
        _ => 0.0,
    }
}

// ---------------------------------------------------------------------------
// Merging
// ---------------------------------------------------------------------------

/// Intermediate span before ids are assigned.
struct PendingSpan {
    text: String,
    font_name: String,
    font_size: f32,
    is_bold: bool,
    bbox: BBox,
}

impl PendingSpan {
    fn from_fragment(fragment: &RawFragment, text: String) -> Self {
        PendingSpan {
            text,
            font_name: fragment.font_name.clone().unwrap_or_default(),
            font_size: sanitize_size(fragment.font_size),
            is_bold: fragment.is_bold.unwrap_or(false),
            bbox: fragment.bbox,
        }
    }

    fn same_style(&self, other: &PendingSpan) -> bool {
        self.font_name == other.font_name
            && (self.font_size - other.font_size).abs() < SIZE_EPSILON
            && self.is_bold == other.is_bold
    }

    /// Whether `next` continues this span on the same line within `tolerance`.
    fn is_adjacent(&self, next: &PendingSpan, tolerance: f32) -> bool {
        if (self.bbox.y0 - next.bbox.y0).abs() > LINE_TOLERANCE {
            return false;
        }
        let gap = next.bbox.x0 - self.bbox.x1;
        gap <= tolerance && gap >= -self.font_size.max(LINE_TOLERANCE)
    }

    fn absorb(&mut self, next: PendingSpan) {
        let spaceless = match (self.text.chars().next_back(), next.text.chars().next()) {
            (Some(l), Some(f)) => is_spaceless_script_char(l) && is_spaceless_script_char(f),
            _ => false,
        };
        if !spaceless {
            self.text.push(' ');
        }
        self.text.push_str(&next.text);
        self.bbox = BBox {
            x0: self.bbox.x0.min(next.bbox.x0),
            y0: self.bbox.y0.min(next.bbox.y0),
            x1: self.bbox.x1.max(next.bbox.x1),
            y1: self.bbox.y1.max(next.bbox.y1),
        };
    }
}

/// Normalize the raw fragment stream of one document.
///
/// Consecutive fragments with identical style on the same page that are
/// horizontally adjacent become one span joined by a single space. Fragments
/// whose cleaned text is empty are dropped. Missing font metadata falls back
/// to `font_size = 0` and `is_bold = false`.
pub fn normalize(doc: &RawDocument, config: &OutlineConfig) -> SpanDocument {
    let mut pages = Vec::with_capacity(doc.pages.len());
    let mut spans: Vec<TextSpan> = Vec::new();

    for page in &doc.pages {
        let mut pending: Vec<PendingSpan> = Vec::new();

        for fragment in &page.fragments {
            let text = clean_text(&fragment.text);
            if text.is_empty() {
                continue;
            }
            let next = PendingSpan::from_fragment(fragment, text);

            if let Some(prev) = pending.last_mut() {
                if prev.same_style(&next) && prev.is_adjacent(&next, config.merge_gap_tolerance) {
                    prev.absorb(next);
                    continue;
                }
            }
            pending.push(next);
        }

        let height = if page.height > 0.0 {
            page.height
        } else {
            pending.iter().map(|s| s.bbox.y1).fold(0.0, f32::max)
        };
        pages.push(PageInfo {
            number: page.number,
            width: page.width,
            height,
        });

        for p in pending {
            spans.push(TextSpan {
                id: spans.len(),
                text: p.text,
                font_name: p.font_name,
                font_size: p.font_size,
                is_bold: p.is_bold,
                page: page.number,
                bbox: p.bbox,
            });
        }
    }

    log::debug!(
        "normalized {} pages into {} spans",
        pages.len(),
        spans.len()
    );

    SpanDocument { pages, spans }
}
