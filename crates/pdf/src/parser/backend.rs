use std::collections::BTreeMap;

use lopdf::{self, content::Content};

use crate::PdfError;

/// A page identifier mirroring `lopdf::ObjectId`: (object number, generation number).
pub type PageId = (u32, u16);

/// US Letter, used when a page has no usable MediaBox.
pub const DEFAULT_MEDIA_BOX: MediaBox = MediaBox {
    llx: 0.0,
    lly: 0.0,
    urx: 612.0,
    ury: 792.0,
};

/// Page rectangle in PDF user space (origin bottom-left, `y` up).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaBox {
    pub llx: f32,
    pub lly: f32,
    pub urx: f32,
    pub ury: f32,
}

impl MediaBox {
    pub fn width(&self) -> f32 {
        (self.urx - self.llx).abs()
    }

    pub fn height(&self) -> f32 {
        (self.ury - self.lly).abs()
    }
}

/// A font entry from a page's resource dictionary.
#[derive(Debug, Clone, Default)]
pub struct FontResource {
    /// Resource key as used by `Tf` (e.g. `b"F1"`).
    pub key: Vec<u8>,
    /// `BaseFont` with any subset prefix (`ABCDEF+`) removed.
    pub base_font: Option<String>,
    pub encoding: Option<String>,
    /// `FontWeight` from the font descriptor.
    pub weight: Option<f32>,
    /// `Flags` from the font descriptor.
    pub flags: Option<i64>,
}

/// Font descriptor flag bit 19: ForceBold.
const FLAG_FORCE_BOLD: i64 = 1 << 18;

const BOLD_NAME_MARKERS: &[&str] = &["BOLD", "BLD", "BLACK", "HEAVY", "SEMIBOLD", "DEMI"];

impl FontResource {
    /// Best guess at whether glyphs in this font render bold.
    ///
    /// The descriptor weight wins when present; otherwise the `ForceBold`
    /// flag or a weight marker in the base-font name.
    pub fn is_bold(&self) -> bool {
        if let Some(weight) = self.weight {
            return weight >= 600.0;
        }
        if self.flags.is_some_and(|f| f & FLAG_FORCE_BOLD != 0) {
            return true;
        }
        self.base_font.as_deref().is_some_and(name_looks_bold)
    }
}

pub fn name_looks_bold(name: &str) -> bool {
    let upper = name.to_uppercase();
    BOLD_NAME_MARKERS.iter().any(|m| upper.contains(m))
}

/// Remove the six-letter subset tag that embedded fonts carry.
pub fn strip_subset_prefix(name: &str) -> &str {
    match name.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.chars().all(|c| c.is_ascii_uppercase()) => rest,
        _ => name,
    }
}

/// A lopdf-independent content-stream operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<Operand>),
    Other,
}

impl Operand {
    pub fn as_number(&self) -> Option<f32> {
        match self {
            Operand::Integer(i) => Some(*i as f32),
            Operand::Real(f) => Some(*f),
            _ => None,
        }
    }
}

impl From<&lopdf::Object> for Operand {
    fn from(obj: &lopdf::Object) -> Self {
        match obj {
            lopdf::Object::Null => Operand::Null,
            lopdf::Object::Boolean(b) => Operand::Bool(*b),
            lopdf::Object::Integer(i) => Operand::Integer(*i),
            lopdf::Object::Real(f) => Operand::Real(*f),
            lopdf::Object::Name(n) => Operand::Name(n.clone()),
            lopdf::Object::String(s, _) => Operand::Str(s.clone()),
            lopdf::Object::Array(arr) => Operand::Array(arr.iter().map(Operand::from).collect()),
            _ => Operand::Other,
        }
    }
}

/// One content-stream operation.
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<Operand>,
}

impl ContentOp {
    pub fn new(operator: &str, operands: Vec<Operand>) -> Self {
        Self {
            operator: operator.to_string(),
            operands,
        }
    }
}

/// Decode string bytes without font knowledge: UTF-16BE with BOM, then
/// UTF-8, then Latin-1.
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(payload) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = payload
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

// ---------------------------------------------------------------------------
// PdfBackend trait
// ---------------------------------------------------------------------------

/// Abstraction over the PDF parser so the content walker can be tested
/// against hand-built operation lists.
pub trait PdfBackend {
    /// Mapping from 1-based page number to [`PageId`].
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Fonts referenced by the page's resources.
    fn page_fonts(&self, page: PageId) -> Result<Vec<FontResource>, PdfError>;

    /// The page's MediaBox, inherited from the page tree if necessary.
    fn media_box(&self, page: PageId) -> Option<MediaBox>;

    /// Raw (decompressed) content stream bytes.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError>;

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError>;

    /// Decode string bytes from a text-showing operator using whatever the
    /// backend knows about the font.
    fn decode_text(&self, font: Option<&FontResource>, bytes: &[u8]) -> String;
}

// ---------------------------------------------------------------------------
// LopdfBackend
// ---------------------------------------------------------------------------

pub struct LopdfBackend {
    doc: lopdf::Document,
}

impl LopdfBackend {
    pub fn load_bytes(data: &[u8]) -> Result<Self, PdfError> {
        let doc = lopdf::Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        if doc.is_encrypted() {
            return Err(PdfError::Encrypted);
        }

        Ok(Self { doc })
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Follow one level of indirection.
    fn resolve<'a>(&'a self, obj: &'a lopdf::Object) -> Option<&'a lopdf::Object> {
        match obj {
            lopdf::Object::Reference(id) => self.doc.get_object(*id).ok(),
            other => Some(other),
        }
    }

    fn number(&self, obj: &lopdf::Object) -> Option<f32> {
        match self.resolve(obj)? {
            lopdf::Object::Integer(i) => Some(*i as f32),
            lopdf::Object::Real(f) => Some(*f),
            _ => None,
        }
    }

    /// Walk up the page tree until a MediaBox is found.
    fn find_media_box(&self, dict: &lopdf::Dictionary, depth: usize) -> Option<MediaBox> {
        if let Some(arr) = dict
            .get(b"MediaBox")
            .ok()
            .and_then(|o| self.resolve(o))
            .and_then(|o| o.as_array().ok())
        {
            let nums: Vec<f32> = arr.iter().filter_map(|o| self.number(o)).collect();
            if let [llx, lly, urx, ury] = nums[..] {
                return Some(MediaBox { llx, lly, urx, ury });
            }
        }

        // Page trees are shallow; the bound guards against reference cycles.
        if depth >= 32 {
            return None;
        }
        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        let parent_dict = self.doc.get_object(parent).ok()?.as_dict().ok()?;
        self.find_media_box(parent_dict, depth + 1)
    }

    fn font_descriptor<'a>(&'a self, font: &'a lopdf::Dictionary) -> Option<&'a lopdf::Dictionary> {
        let obj = font.get(b"FontDescriptor").ok()?;
        self.resolve(obj)?.as_dict().ok()
    }
}

fn name_string(obj: &lopdf::Object) -> Option<String> {
    obj.as_name()
        .ok()
        .map(|n| String::from_utf8_lossy(n).into_owned())
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn page_fonts(&self, page: PageId) -> Result<Vec<FontResource>, PdfError> {
        let fonts = self
            .doc
            .get_page_fonts(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page fonts: {}", e)))?;

        Ok(fonts
            .iter()
            .map(|(key, dict)| {
                let descriptor = self.font_descriptor(dict);
                FontResource {
                    key: key.clone(),
                    base_font: dict
                        .get(b"BaseFont")
                        .ok()
                        .and_then(name_string)
                        .map(|n| strip_subset_prefix(&n).to_string()),
                    encoding: dict.get(b"Encoding").ok().and_then(name_string),
                    weight: descriptor
                        .and_then(|d| d.get(b"FontWeight").ok())
                        .and_then(|o| self.number(o)),
                    flags: descriptor
                        .and_then(|d| d.get(b"Flags").ok())
                        .and_then(|o| self.number(o))
                        .map(|f| f as i64),
                }
            })
            .collect())
    }

    fn media_box(&self, page: PageId) -> Option<MediaBox> {
        let dict = self.doc.get_object(page).ok()?.as_dict().ok()?;
        self.find_media_box(dict, 0)
    }

    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError> {
        self.doc
            .get_page_content(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page content: {}", e)))
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError> {
        let content = Content::decode(data)
            .map_err(|e| PdfError::Parse(format!("content stream decode error: {}", e)))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operands: op.operands.iter().map(Operand::from).collect(),
                operator: op.operator,
            })
            .collect())
    }

    fn decode_text(&self, font: Option<&FontResource>, bytes: &[u8]) -> String {
        let identity = font
            .and_then(|f| f.encoding.as_deref())
            .is_some_and(|e| e.starts_with("Identity"));

        // Two-byte CIDs under Identity-H/V frequently coincide with UCS-2.
        if identity && bytes.len() >= 2 && bytes.len() % 2 == 0 {
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect();
            let decoded = String::from_utf16_lossy(&units);
            if decoded.chars().any(|c| c != '\u{FFFD}' && c != '\0') {
                return decoded;
            }
        }

        decode_pdf_string(bytes)
    }
}
