use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Axis-aligned bounding box in points.
///
/// The origin is the top-left corner of the page and `y` grows downward, so a
/// smaller `y0` means "higher on the page".
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        BBox { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

// ---------------------------------------------------------------------------
// Raw fragment stream (parser output)
// ---------------------------------------------------------------------------

/// One primitive text run as emitted by the document parser.
///
/// Font metadata is optional because some producers omit it; the normalizer
/// substitutes defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawFragment {
    pub text: String,
    pub font_name: Option<String>,
    pub font_size: Option<f32>,
    pub is_bold: Option<bool>,
    pub bbox: BBox,
}

/// All fragments of a single page, in content-stream order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawPage {
    /// 1-based page number.
    pub number: u32,
    pub width: f32,
    /// Page height in points. Zero or negative when unknown.
    pub height: f32,
    pub fragments: Vec<RawFragment>,
}

/// The complete fragment stream for one document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawDocument {
    pub pages: Vec<RawPage>,
}

impl RawDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

// ---------------------------------------------------------------------------
// Normalized spans
// ---------------------------------------------------------------------------

/// A contiguous run of text sharing one font, size, and style on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    /// Position in the normalized document order. Stable for the lifetime
    /// of one pipeline run.
    pub id: usize,
    pub text: String,
    pub font_name: String,
    pub font_size: f32,
    pub is_bold: bool,
    pub page: u32,
    pub bbox: BBox,
}

/// Page geometry retained after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    pub number: u32,
    pub width: f32,
    pub height: f32,
}

/// Output of the fragment normalizer: cleaned spans plus page geometry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpanDocument {
    pub pages: Vec<PageInfo>,
    pub spans: Vec<TextSpan>,
}

impl SpanDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn first_page(&self) -> Option<u32> {
        self.pages.iter().map(|p| p.number).min()
    }

    /// Height of the given page, or `None` if the page is unknown.
    pub fn page_height(&self, page: u32) -> Option<f32> {
        self.pages
            .iter()
            .find(|p| p.number == page)
            .map(|p| p.height)
    }

    pub fn spans_on_page(&self, page: u32) -> impl Iterator<Item = &TextSpan> {
        self.spans.iter().filter(move |s| s.page == page)
    }
}

// ---------------------------------------------------------------------------
// Headings
// ---------------------------------------------------------------------------

/// Outline heading level. Serialized as `"H1"`, `"H2"`, `"H3"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
}

impl HeadingLevel {
    /// Depth in the hierarchy, 1 for `H1`.
    pub fn depth(&self) -> u8 {
        match self {
            HeadingLevel::H1 => 1,
            HeadingLevel::H2 => 2,
            HeadingLevel::H3 => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HeadingLevel::H1 => "H1",
            HeadingLevel::H2 => "H2",
            HeadingLevel::H3 => "H3",
        }
    }
}

impl fmt::Display for HeadingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A span together with the level the classifier assigned to it.
///
/// `level == None` marks body text. The post-processor may rewrite `text`
/// when merging but never changes `page`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadingCandidate {
    pub span: TextSpan,
    pub level: Option<HeadingLevel>,
    /// Index of the font tier the span's size falls into, if any.
    pub tier: Option<usize>,
}

impl HeadingCandidate {
    pub fn is_heading(&self) -> bool {
        self.level.is_some()
    }
}

/// A single emitted outline entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingEntry {
    pub level: HeadingLevel,
    pub text: String,
    pub page: u32,
}

/// Final output for one document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub title: String,
    pub outline: Vec<HeadingEntry>,
}

impl ExtractionResult {
    /// The value emitted for empty documents and for documents that failed
    /// to parse.
    pub fn empty() -> Self {
        ExtractionResult::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_level_serializes_as_tag() {
        let json = serde_json::to_string(&HeadingLevel::H2).unwrap();
        assert_eq!(json, "\"H2\"");
    }

    #[test]
    fn test_heading_level_ordering_follows_depth() {
        assert!(HeadingLevel::H1 < HeadingLevel::H2);
        assert!(HeadingLevel::H2 < HeadingLevel::H3);
        assert_eq!(HeadingLevel::H3.depth(), 3);
    }

    #[test]
    fn test_empty_result_schema() {
        let json = serde_json::to_value(ExtractionResult::empty()).unwrap();
        assert_eq!(json, serde_json::json!({"title": "", "outline": []}));
    }

    #[test]
    fn test_entry_schema() {
        let entry = HeadingEntry {
            level: HeadingLevel::H1,
            text: "Chapter One".to_string(),
            page: 3,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"level": "H1", "text": "Chapter One", "page": 3})
        );
    }

    #[test]
    fn test_bbox_dimensions() {
        let b = BBox::new(10.0, 20.0, 40.0, 32.0);
        assert_eq!(b.width(), 30.0);
        assert_eq!(b.height(), 12.0);
    }

    #[test]
    fn test_span_document_page_lookup() {
        let doc = SpanDocument {
            pages: vec![
                PageInfo {
                    number: 1,
                    width: 612.0,
                    height: 792.0,
                },
                PageInfo {
                    number: 2,
                    width: 612.0,
                    height: 700.0,
                },
            ],
            spans: Vec::new(),
        };
        assert_eq!(doc.first_page(), Some(1));
        assert_eq!(doc.page_height(2), Some(700.0));
        assert_eq!(doc.page_height(3), None);
    }
}
