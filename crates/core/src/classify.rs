//! Heading classification.
//!
//! Each span is judged on its own against document-level statistics using an
//! ordered table of [`LevelRule`]s. The first matching rule wins.
//!
//! | Level | Condition (ratio = size / body) |
//! |-------|---------------------------------|
//! | H1    | ratio >= 1.4 AND bold AND size >= 14 |
//! | H2    | ratio >= 1.2 AND bold AND size >= 12 |
//! | H3    | ratio >= 1.1 AND (bold OR size >= 11) |

use crate::config::{LevelRule, OutlineConfig};
use crate::stats::{in_size_range, FontStatistics};
use crate::title::TitleSelection;
use crate::types::{HeadingCandidate, HeadingLevel, SpanDocument, TextSpan};

/// Level assigned to bold spans when statistics are degenerate.
const BOLD_FALLBACK_LEVEL: HeadingLevel = HeadingLevel::H1;

/// Whether the span's text length is acceptable for a heading.
pub fn passes_length_filter(text: &str, config: &OutlineConfig) -> bool {
    let len = text.trim().chars().count();
    len >= config.min_heading_length && len <= config.max_heading_length
}

/// Evaluate the decision table for one span's metrics.
///
/// Rules are tried in slice order; the first match wins.
pub fn evaluate_rules(
    rules: &[LevelRule],
    font_size: f32,
    body_size: f32,
    is_bold: bool,
) -> Option<HeadingLevel> {
    if body_size <= 0.0 {
        return None;
    }
    let ratio = font_size / body_size;
    rules
        .iter()
        .find(|rule| rule.matches(ratio, font_size, is_bold))
        .map(|rule| rule.level)
}

/// Classify a single span. Pure: no state beyond the arguments.
pub fn classify_span(
    span: &TextSpan,
    stats: &FontStatistics,
    config: &OutlineConfig,
) -> Option<HeadingLevel> {
    if !passes_length_filter(&span.text, config) {
        return None;
    }
    if !in_size_range(span.font_size, config) {
        return None;
    }
    if stats.is_degenerate() {
        return span.is_bold.then_some(BOLD_FALLBACK_LEVEL);
    }
    evaluate_rules(
        &config.level_rules,
        span.font_size,
        stats.body_size,
        span.is_bold,
    )
}

/// Classify every span that is not part of the title.
///
/// Returns candidates for all remaining spans (body text included, with
/// `level == None`) ordered by page, then top-to-bottom, then left-to-right.
pub fn classify(
    doc: &SpanDocument,
    stats: &FontStatistics,
    title: &TitleSelection,
    config: &OutlineConfig,
) -> Vec<HeadingCandidate> {
    if stats.is_degenerate() {
        log::debug!("degenerate font statistics, using boldness-only classification");
    }

    let mut candidates: Vec<HeadingCandidate> = doc
        .spans
        .iter()
        .filter(|span| !title.contains(span.id))
        .map(|span| HeadingCandidate {
            span: span.clone(),
            level: classify_span(span, stats, config),
            tier: stats.tier_of(span.font_size),
        })
        .collect();

    candidates.sort_by(|a, b| {
        a.span
            .page
            .cmp(&b.span.page)
            .then(a.span.bbox.y0.total_cmp(&b.span.bbox.y0))
            .then(a.span.bbox.x0.total_cmp(&b.span.bbox.x0))
            .then(a.span.id.cmp(&b.span.id))
    });

    log::debug!(
        "classified {} spans, {} headings",
        candidates.len(),
        candidates.iter().filter(|c| c.is_heading()).count()
    );

    candidates
}
