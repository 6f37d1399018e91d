//! Title detection on the first page.
//!
//! The title is the largest (bold-preferring) text in the upper half of the
//! first page. Multi-line titles are reassembled from neighbouring lines of
//! similar size.

use serde::{Deserialize, Serialize};

use crate::config::{DenyList, OutlineConfig};
use crate::normalize::LINE_TOLERANCE;
use crate::stats::{in_size_range, FontStatistics};
use crate::types::{SpanDocument, TextSpan};

/// Two title lines further apart than this multiple of the line height are
/// separate blocks.
const TITLE_GAP_FACTOR: f32 = 2.0;

/// Nearest-rank percentile used for the "top decile" size threshold.
const TOP_DECILE: f32 = 0.9;

/// Title candidates are never smaller than this fraction of the largest
/// size on the first page.
const LARGEST_SIZE_FRACTION: f32 = 0.8;

/// Detected title plus the spans that produced it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TitleSelection {
    pub text: String,
    /// Ids of the spans absorbed into the title, in visual order.
    pub span_ids: Vec<usize>,
}

impl TitleSelection {
    pub fn contains(&self, span_id: usize) -> bool {
        self.span_ids.contains(&span_id)
    }
}

/// A visual line of title candidates.
struct CandidateLine<'a> {
    spans: Vec<&'a TextSpan>,
}

impl CandidateLine<'_> {
    fn top(&self) -> f32 {
        self.spans.iter().map(|s| s.bbox.y0).fold(f32::INFINITY, f32::min)
    }

    fn bottom(&self) -> f32 {
        self.spans
            .iter()
            .map(|s| s.bbox.y1)
            .fold(f32::NEG_INFINITY, f32::max)
    }

    fn height(&self) -> f32 {
        let h = self.bottom() - self.top();
        if h > 0.0 {
            h
        } else {
            self.font_size()
        }
    }

    fn font_size(&self) -> f32 {
        self.spans.iter().map(|s| s.font_size).fold(0.0, f32::max)
    }

    fn text(&self) -> String {
        self.spans
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Nearest-rank percentile of `values` (`p` in `(0, 1]`).
fn percentile(values: &[f32], p: f32) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);
    let rank = (p * sorted.len() as f32).ceil() as usize;
    Some(sorted[rank.clamp(1, sorted.len()) - 1])
}

/// Smallest size a title span may have on the page holding `spans`.
///
/// The decile is taken over distinct sizes (rounded to 0.1pt) and capped at
/// a fixed fraction of the page maximum.
fn size_threshold(spans: &[&TextSpan]) -> Option<f32> {
    let mut sizes: Vec<f32> = spans
        .iter()
        .map(|s| (s.font_size * 10.0).round() / 10.0)
        .collect();
    sizes.sort_by(f32::total_cmp);
    sizes.dedup();
    let largest = *sizes.last()?;
    let decile = percentile(&sizes, TOP_DECILE)?;
    Some(decile.min(largest * LARGEST_SIZE_FRACTION))
}

/// Size similarity of two lines as `smaller / larger`.
fn similarity(a: f32, b: f32) -> f32 {
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    if hi <= 0.0 {
        return 0.0;
    }
    lo / hi
}

/// Whether `text` can never be (part of) a title.
fn is_denied(text: &str, deny: &DenyList) -> bool {
    text.chars().filter(|c| !c.is_whitespace()).count() <= 1 || deny.is_denied(text)
}

/// Group spans (sorted top-to-bottom) into visual lines.
fn group_lines<'a>(spans: &[&'a TextSpan]) -> Vec<CandidateLine<'a>> {
    let mut lines: Vec<CandidateLine<'a>> = Vec::new();
    for &span in spans {
        let same_line = lines
            .last()
            .is_some_and(|line| (span.bbox.y0 - line.top()).abs() <= LINE_TOLERANCE);
        if let (true, Some(line)) = (same_line, lines.last_mut()) {
            line.spans.push(span);
        } else {
            lines.push(CandidateLine { spans: vec![span] });
        }
    }
    for line in &mut lines {
        line.spans.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));
    }
    lines
}

/// Detect the document title from the first page.
///
/// Returns an empty selection when no span qualifies.
pub fn detect_title(
    doc: &SpanDocument,
    stats: &FontStatistics,
    config: &OutlineConfig,
    deny: &DenyList,
) -> TitleSelection {
    let Some(first_page) = doc.first_page() else {
        return TitleSelection::default();
    };

    let page_spans: Vec<&TextSpan> = doc
        .spans_on_page(first_page)
        .filter(|s| in_size_range(s.font_size, config))
        .collect();
    let Some(threshold) = size_threshold(&page_spans) else {
        return TitleSelection::default();
    };

    let height = doc
        .page_height(first_page)
        .filter(|h| *h > 0.0)
        .unwrap_or(f32::INFINITY);

    let mut candidates: Vec<&TextSpan> = page_spans
        .into_iter()
        .filter(|s| s.font_size >= threshold)
        .filter(|s| s.bbox.y0 < height / 2.0)
        .filter(|s| s.font_size > stats.body_size || s.is_bold)
        .filter(|s| !is_denied(&s.text, deny))
        .collect();

    if candidates.iter().any(|s| s.is_bold) {
        candidates.retain(|s| s.is_bold);
    }
    if candidates.is_empty() {
        return TitleSelection::default();
    }

    candidates.sort_by(|a, b| {
        a.bbox
            .y0
            .total_cmp(&b.bbox.y0)
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });
    let lines = group_lines(&candidates);

    // Anchor: largest size, then earliest line.
    let anchor = lines
        .iter()
        .enumerate()
        .fold(None::<(usize, f32)>, |best, (i, line)| match best {
            Some((_, size)) if line.font_size() <= size => best,
            _ => Some((i, line.font_size())),
        })
        .map(|(i, _)| i)
        .unwrap_or(0);

    let joins = |upper: &CandidateLine, lower: &CandidateLine| -> bool {
        let gap = lower.top() - upper.bottom();
        let max_gap = TITLE_GAP_FACTOR * upper.height().max(lower.height());
        similarity(upper.font_size(), lower.font_size()) >= config.title_similarity
            && gap <= max_gap
    };

    let mut start = anchor;
    while start > 0 && joins(&lines[start - 1], &lines[start]) {
        start -= 1;
    }
    let mut end = anchor;
    while end + 1 < lines.len() && joins(&lines[end], &lines[end + 1]) {
        end += 1;
    }

    let selected = &lines[start..=end];
    let text = selected
        .iter()
        .map(|l| l.text())
        .collect::<Vec<_>>()
        .join(" ");
    let span_ids = selected
        .iter()
        .flat_map(|l| l.spans.iter().map(|s| s.id))
        .collect();

    log::debug!("title detected on page {}: {:?}", first_page, text);

    TitleSelection { text, span_ids }
}
