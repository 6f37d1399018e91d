use std::path::Path;

use outline_core::types::RawDocument;
use thiserror::Error;

use parser::backend::{LopdfBackend, PdfBackend};

pub mod parser;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse PDF bytes into the per-page fragment stream.
///
/// Only document-level failures (unparseable file, encryption) are errors.
/// Individual pages with unreadable content come back empty.
pub fn extract_document(bytes: &[u8]) -> Result<RawDocument, PdfError> {
    let backend = LopdfBackend::load_bytes(bytes)?;
    let doc = parser::text::extract_all_pages(&backend);
    log::debug!(
        "extracted {} fragments from {} pages",
        doc.pages.iter().map(|p| p.fragments.len()).sum::<usize>(),
        doc.page_count()
    );
    Ok(doc)
}

/// Read and parse a PDF file.
pub fn extract_file(path: impl AsRef<Path>) -> Result<RawDocument, PdfError> {
    let bytes = std::fs::read(path)?;
    extract_document(&bytes)
}

/// Number of pages without walking any content stream.
pub fn page_count(bytes: &[u8]) -> Result<usize, PdfError> {
    let backend = LopdfBackend::load_bytes(bytes)?;
    Ok(backend.pages().len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    /// A one-page A4 document with one bold heading and one body line.
    fn sample_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let bold_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
        });
        let regular_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => bold_id,
                "F2" => regular_id,
            },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal("Annual Report")]),
                Operation::new("Tf", vec!["F2".into(), 10.into()]),
                Operation::new("Td", vec![0.into(), (-40).into()]),
                Operation::new("Tj", vec![Object::string_literal("Body text")]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_extract_generated_document() {
        let raw = extract_document(&sample_pdf()).unwrap();
        assert_eq!(raw.page_count(), 1);

        let page = &raw.pages[0];
        assert_eq!(page.number, 1);
        assert_eq!(page.height, 842.0);
        assert_eq!(page.fragments.len(), 2);

        let heading = &page.fragments[0];
        assert_eq!(heading.text, "Annual Report");
        assert_eq!(heading.is_bold, Some(true));
        assert_eq!(heading.font_size, Some(24.0));
        assert_eq!(heading.bbox.y0, 842.0 - 624.0);

        let body = &page.fragments[1];
        assert_eq!(body.is_bold, Some(false));
        assert!(body.bbox.y0 > heading.bbox.y0);
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(&sample_pdf()).unwrap(), 1);
    }

    #[test]
    fn test_empty_bytes_rejected() {
        assert!(matches!(extract_document(&[]), Err(PdfError::Parse(_))));
    }

    #[test]
    fn test_garbage_rejected() {
        let garbage = b"%PDF-1.4\nthis is not really a pdf";
        assert!(extract_document(garbage).is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract_file(dir.path().join("missing.pdf")).unwrap_err();
        assert!(matches!(err, PdfError::Io(_)));
    }

    #[test]
    fn test_extract_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, sample_pdf()).unwrap();
        let raw = extract_file(&path).unwrap();
        assert_eq!(raw.pages[0].fragments[0].text, "Annual Report");
    }
}
