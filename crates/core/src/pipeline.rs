//! Result assembly: the whole layout-to-structure pass for one document.
//!
//! ```text
//! RawDocument -> normalize -> stats -> title -> classify -> post_process
//!             -> ExtractionResult
//! ```
//!
//! Every stage is a pure function of its inputs, so running the pipeline
//! twice on the same document yields byte-identical JSON.

use serde::Serialize;

use crate::classify;
use crate::config::{ConfigError, DenyList, OutlineConfig};
use crate::normalize;
use crate::postprocess;
use crate::stats::{self, FontStatistics};
use crate::title::{self, TitleSelection};
use crate::types::{ExtractionResult, HeadingCandidate, HeadingEntry, HeadingLevel, RawDocument};

/// Pre-compiled form of an [`OutlineConfig`].
///
/// Compiling the deny patterns once lets a batch share one `Pipeline` across
/// every document.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: OutlineConfig,
    title_deny: DenyList,
    heading_deny: DenyList,
}

/// Intermediate results of one run, kept for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentAnalysis {
    pub page_count: usize,
    pub span_count: usize,
    pub stats: FontStatistics,
    pub title: TitleSelection,
    /// Classifier output before post-processing, body spans included.
    pub candidates: Vec<HeadingCandidate>,
    pub result: ExtractionResult,
}

impl DocumentAnalysis {
    /// Classifier candidates that received a level, before post-processing.
    pub fn raw_heading_count(&self) -> usize {
        self.candidates.iter().filter(|c| c.is_heading()).count()
    }

    /// Number of outline entries at `level`.
    pub fn count_level(&self, level: HeadingLevel) -> usize {
        self.result
            .outline
            .iter()
            .filter(|e| e.level == level)
            .count()
    }
}

impl Pipeline {
    pub fn new(config: OutlineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let title_deny = DenyList::compile(&config.title_deny_patterns)?;
        let heading_deny = DenyList::compile(&config.heading_deny_patterns)?;
        Ok(Self {
            config,
            title_deny,
            heading_deny,
        })
    }

    pub fn config(&self) -> &OutlineConfig {
        &self.config
    }

    /// Run every stage and keep the intermediate results.
    pub fn analyze(&self, raw: &RawDocument) -> DocumentAnalysis {
        let doc = normalize::normalize(raw, &self.config);
        let stats = stats::compute(&doc.spans, &self.config);
        let title = title::detect_title(&doc, &stats, &self.config, &self.title_deny);
        let candidates = classify::classify(&doc, &stats, &title, &self.config);
        let outline = postprocess::post_process(
            candidates.clone(),
            &doc,
            &title.text,
            &self.config,
            &self.heading_deny,
        );

        log::debug!(
            "assembled outline: title={:?}, {} entries",
            title.text,
            outline.len()
        );

        DocumentAnalysis {
            page_count: doc.page_count(),
            span_count: doc.spans.len(),
            result: assemble(title.text.clone(), outline),
            stats,
            title,
            candidates,
        }
    }

    /// Run the pipeline and return only the final result.
    pub fn extract(&self, raw: &RawDocument) -> ExtractionResult {
        self.analyze(raw).result
    }
}

/// Combine the title and the ordered entries into the output record.
pub fn assemble(title: String, outline: Vec<HeadingEntry>) -> ExtractionResult {
    ExtractionResult { title, outline }
}

/// One-shot convenience over [`Pipeline`].
pub fn extract_outline(
    raw: &RawDocument,
    config: &OutlineConfig,
) -> Result<ExtractionResult, ConfigError> {
    Ok(Pipeline::new(config.clone())?.extract(raw))
}

/// Serialize a result as pretty-printed JSON.
pub fn to_json(result: &ExtractionResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BBox, RawFragment, RawPage};

    fn frag(text: &str, y0: f32, size: f32, bold: bool) -> RawFragment {
        RawFragment {
            text: text.to_string(),
            font_name: Some(if bold { "Times-Bold" } else { "Times-Roman" }.to_string()),
            font_size: Some(size),
            is_bold: Some(bold),
            bbox: BBox::new(72.0, y0, 72.0 + text.len() as f32 * size * 0.5, y0 + size),
        }
    }

    fn page(number: u32, fragments: Vec<RawFragment>) -> RawPage {
        RawPage {
            number,
            width: 612.0,
            height: 792.0,
            fragments,
        }
    }

    fn body_lines(start: f32, count: usize) -> Vec<RawFragment> {
        (0..count)
            .map(|i| {
                frag(
                    "Lorem ipsum dolor sit amet consectetur",
                    start + i as f32 * 14.0,
                    10.0,
                    false,
                )
            })
            .collect()
    }

    fn sample_document() -> RawDocument {
        let mut p1 = vec![frag("Field Guide to Layout", 60.0, 24.0, true)];
        p1.push(frag("Introduction", 140.0, 16.0, true));
        p1.extend(body_lines(170.0, 10));
        p1.push(frag("Scope", 330.0, 12.0, true));
        p1.extend(body_lines(350.0, 5));

        let mut p2 = vec![frag("Methods", 60.0, 16.0, true)];
        p2.extend(body_lines(90.0, 10));
        p2.push(frag("Sampling", 250.0, 12.0, true));
        p2.push(frag("Random draws", 280.0, 11.0, true));
        p2.extend(body_lines(300.0, 5));

        RawDocument {
            pages: vec![page(1, p1), page(2, p2)],
        }
    }

    fn run(raw: &RawDocument) -> ExtractionResult {
        extract_outline(raw, &OutlineConfig::default()).unwrap()
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(run(&RawDocument::default()), ExtractionResult::empty());
    }

    #[test]
    fn test_pages_without_text() {
        let raw = RawDocument {
            pages: vec![page(1, Vec::new()), page(2, Vec::new())],
        };
        assert_eq!(run(&raw), ExtractionResult::empty());
    }

    #[test]
    fn test_full_document() {
        let result = run(&sample_document());
        assert_eq!(result.title, "Field Guide to Layout");

        let got: Vec<(HeadingLevel, &str, u32)> = result
            .outline
            .iter()
            .map(|e| (e.level, e.text.as_str(), e.page))
            .collect();
        assert_eq!(
            got,
            vec![
                (HeadingLevel::H1, "Introduction", 1),
                (HeadingLevel::H2, "Scope", 1),
                (HeadingLevel::H1, "Methods", 2),
                (HeadingLevel::H2, "Sampling", 2),
                (HeadingLevel::H3, "Random draws", 2),
            ]
        );
    }

    #[test]
    fn test_title_excluded_from_outline() {
        let result = run(&sample_document());
        assert!(result.outline.iter().all(|e| e.text != result.title));
    }

    #[test]
    fn test_single_size_document_has_no_size_headings() {
        let raw = RawDocument {
            pages: vec![page(1, body_lines(100.0, 20))],
        };
        let result = run(&raw);
        assert!(result.outline.is_empty());
    }

    #[test]
    fn test_single_size_document_keeps_only_bold_lines() {
        let mut fragments: Vec<RawFragment> = (0..20)
            .map(|i| frag("Plain sentence of body copy", 100.0 + i as f32 * 14.0, 11.0, false))
            .collect();
        fragments.push(frag("Key Findings", 500.0, 11.0, true));
        let result = run(&RawDocument {
            pages: vec![page(1, fragments)],
        });

        assert_eq!(result.title, "");
        assert_eq!(
            result.outline,
            vec![HeadingEntry {
                level: HeadingLevel::H1,
                text: "Key Findings".to_string(),
                page: 1,
            }]
        );
    }

    #[test]
    fn test_running_header_removed_from_outline() {
        let sections = ["Overview", "Details", "Summary"];
        let pages = sections
            .iter()
            .enumerate()
            .map(|(i, section)| {
                let mut fragments = vec![frag("Quarterly Review", 30.0, 12.0, true)];
                if i == 0 {
                    fragments.push(frag("Fiscal Year Results", 80.0, 24.0, true));
                }
                fragments.push(frag(section, 150.0, 16.0, true));
                fragments.extend(body_lines(180.0, 10));
                page(i as u32 + 1, fragments)
            })
            .collect();

        let result = run(&RawDocument { pages });
        assert_eq!(result.title, "Fiscal Year Results");
        let texts: Vec<&str> = result.outline.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["Overview", "Details", "Summary"]);
        assert!(result.outline.iter().all(|e| e.level == HeadingLevel::H1));
    }

    #[test]
    fn test_repeated_mid_page_heading_kept() {
        let pages = (1..=3)
            .map(|number| {
                let mut fragments = body_lines(100.0, 15);
                fragments.push(frag("Key Takeaways", 400.0, 16.0, true));
                fragments.extend(body_lines(430.0, 10));
                page(number, fragments)
            })
            .collect();

        let result = run(&RawDocument { pages });
        let got: Vec<(&str, u32)> = result
            .outline
            .iter()
            .map(|e| (e.text.as_str(), e.page))
            .collect();
        assert_eq!(
            got,
            vec![("Key Takeaways", 1), ("Key Takeaways", 2), ("Key Takeaways", 3)]
        );
    }

    #[test]
    fn test_deterministic_json() {
        let raw = sample_document();
        let a = to_json(&run(&raw)).unwrap();
        let b = to_json(&run(&raw)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_pages_monotone() {
        let result = run(&sample_document());
        let pages: Vec<u32> = result.outline.iter().map(|e| e.page).collect();
        let mut sorted = pages.clone();
        sorted.sort();
        assert_eq!(pages, sorted);
    }

    #[test]
    fn test_analysis_counts() {
        let pipeline = Pipeline::new(OutlineConfig::default()).unwrap();
        let analysis = pipeline.analyze(&sample_document());
        assert_eq!(analysis.page_count, 2);
        assert_eq!(analysis.count_level(HeadingLevel::H1), 2);
        assert_eq!(analysis.stats.body_size, 10.0);
        assert_eq!(analysis.raw_heading_count(), 5);
        assert!(analysis.candidates.iter().all(|c| !analysis.title.contains(c.span.id)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = OutlineConfig {
            max_tiers: 0,
            ..OutlineConfig::default()
        };
        assert!(Pipeline::new(config).is_err());
    }
}
