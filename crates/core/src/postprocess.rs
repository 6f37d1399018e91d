//! Post-processing of classified candidates into outline entries.
//!
//! ```text
//! candidates -> merge split/wrapped runs -> drop body text
//!            -> drop running headers/footers -> noise filter
//!            -> hierarchy check -> entries
//! ```
//!
//! Every step preserves the input order (page ascending, then visual order).

use std::collections::{BTreeSet, HashMap};

use crate::config::{DenyList, HierarchyMode, OutlineConfig};
use crate::normalize::LINE_TOLERANCE;
use crate::types::{BBox, HeadingCandidate, HeadingEntry, HeadingLevel, SpanDocument};

/// Number of vertical buckets a page is divided into for header/footer
/// detection.
const VERTICAL_BUCKETS: f32 = 20.0;

/// Page height assumed when the page geometry is unknown (US Letter).
const DEFAULT_PAGE_HEIGHT: f32 = 792.0;

/// Wrapped heading lines may be separated by at most this fraction of the
/// font size.
const WRAP_GAP_FACTOR: f32 = 0.5;

/// Fonts within this many points count as the same size for wrap merging.
const WRAP_SIZE_TOLERANCE: f32 = 0.5;

// ---------------------------------------------------------------------------
// Merging
// ---------------------------------------------------------------------------

fn union(a: BBox, b: BBox) -> BBox {
    BBox {
        x0: a.x0.min(b.x0),
        y0: a.y0.min(b.y0),
        x1: a.x1.max(b.x1),
        y1: a.y1.max(b.y1),
    }
}

/// `next` continues `prev` on the same visual line.
fn same_line(prev: &HeadingCandidate, next: &HeadingCandidate) -> bool {
    let tolerance = LINE_TOLERANCE.max(prev.span.font_size * 0.25);
    (prev.span.bbox.y0 - next.span.bbox.y0).abs() <= tolerance
}

/// `next` is the wrapped continuation of `prev` on the following line.
fn wrapped_line(prev: &HeadingCandidate, next: &HeadingCandidate) -> bool {
    let gap = next.span.bbox.y0 - prev.span.bbox.y1;
    next.span.bbox.y0 > prev.span.bbox.y0 + LINE_TOLERANCE
        && gap <= prev.span.font_size * WRAP_GAP_FACTOR
        && (prev.span.font_size - next.span.font_size).abs() <= WRAP_SIZE_TOLERANCE
}

/// Merge consecutive heading candidates that form one visual heading.
///
/// Two neighbours merge when they sit on the same page with the same level
/// and either share a line or (with `merge_wrapped_lines`) the second is the
/// wrapped continuation of the first. Body candidates break a run. The merged
/// candidate keeps the first span's id and page.
pub fn merge_split_headings(
    candidates: Vec<HeadingCandidate>,
    config: &OutlineConfig,
) -> Vec<HeadingCandidate> {
    let mut merged: Vec<HeadingCandidate> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        if let Some(prev) = merged.last_mut() {
            let joinable = prev.level.is_some()
                && prev.level == candidate.level
                && prev.span.page == candidate.span.page
                && (same_line(prev, &candidate)
                    || (config.merge_wrapped_lines && wrapped_line(prev, &candidate)));
            if joinable {
                prev.span.text.push(' ');
                prev.span.text.push_str(&candidate.span.text);
                prev.span.bbox = union(prev.span.bbox, candidate.span.bbox);
                continue;
            }
        }
        merged.push(candidate);
    }

    merged
}

// ---------------------------------------------------------------------------
// Header / footer removal
// ---------------------------------------------------------------------------

fn normalized_key(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn vertical_bucket(y0: f32, height: f32) -> u32 {
    let rel = (y0 / height).clamp(0.0, 1.0);
    ((rel * VERTICAL_BUCKETS) as u32).min(VERTICAL_BUCKETS as u32 - 1)
}

/// Whether `bucket` lies in the top or bottom `margin` buckets of a page.
fn in_margin_band(bucket: u32, margin: u32) -> bool {
    let last = VERTICAL_BUCKETS as u32 - 1;
    bucket < margin || bucket + margin > last
}

/// Drop headings that repeat at the same vertical position on a strict
/// majority of pages (and on at least two pages), when that position lies in
/// the top or bottom `margin_buckets` of the page.
pub fn remove_running_headers(
    headings: Vec<HeadingCandidate>,
    doc: &SpanDocument,
    margin_buckets: u32,
) -> Vec<HeadingCandidate> {
    let page_count = doc.page_count();
    let key_of = |c: &HeadingCandidate| {
        let height = doc
            .page_height(c.span.page)
            .filter(|h| *h > 0.0)
            .unwrap_or(DEFAULT_PAGE_HEIGHT);
        (
            normalized_key(&c.span.text),
            vertical_bucket(c.span.bbox.y0, height),
        )
    };

    let mut pages_by_key: HashMap<(String, u32), BTreeSet<u32>> = HashMap::new();
    for c in &headings {
        pages_by_key.entry(key_of(c)).or_default().insert(c.span.page);
    }

    let running: HashMap<(String, u32), usize> = pages_by_key
        .into_iter()
        .filter(|((_, bucket), _)| in_margin_band(*bucket, margin_buckets))
        .filter(|(_, pages)| pages.len() >= 2 && pages.len() * 2 > page_count)
        .map(|(key, pages)| (key, pages.len()))
        .collect();

    for ((text, bucket), pages) in &running {
        log::debug!(
            "dropping running header/footer {:?} (bucket {}, {} pages)",
            text,
            bucket,
            pages
        );
    }

    headings
        .into_iter()
        .filter(|c| !running.contains_key(&key_of(c)))
        .collect()
}

// ---------------------------------------------------------------------------
// Noise filter
// ---------------------------------------------------------------------------

/// Text that carries no words: digits with separators, or punctuation only.
pub fn is_noise_text(text: &str) -> bool {
    let trimmed = text.trim();
    if !trimmed.chars().any(|c| c.is_alphanumeric()) {
        return true;
    }
    trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || c.is_whitespace() || c == '.' || c == ',')
}

/// Drop numeric/punctuation-only entries, entries equal to the title, and
/// entries matching the configured deny patterns.
pub fn filter_noise(
    headings: Vec<HeadingCandidate>,
    title: &str,
    deny: &DenyList,
) -> Vec<HeadingCandidate> {
    let title_key = normalized_key(title);
    headings
        .into_iter()
        .filter(|c| {
            let text = &c.span.text;
            let keep = !is_noise_text(text)
                && (title_key.is_empty() || normalized_key(text) != title_key)
                && !deny.is_denied(text);
            if !keep {
                log::trace!("noise filter dropped {:?}", text);
            }
            keep
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Hierarchy
// ---------------------------------------------------------------------------

/// Apply the configured hierarchy policy to headings whose parent level has
/// not been seen yet.
pub fn enforce_hierarchy(
    headings: Vec<HeadingCandidate>,
    mode: HierarchyMode,
) -> Vec<HeadingCandidate> {
    let mut seen_h1 = false;
    let mut seen_h2 = false;
    let mut result = Vec::with_capacity(headings.len());

    for mut c in headings {
        let Some(level) = c.level else {
            continue;
        };
        let orphan = match level {
            HeadingLevel::H1 => false,
            HeadingLevel::H2 => !seen_h1,
            HeadingLevel::H3 => !seen_h1 && !seen_h2,
        };

        if orphan {
            match mode {
                HierarchyMode::Lenient => {
                    log::debug!(
                        "orphan {} on page {}: {:?}",
                        level,
                        c.span.page,
                        c.span.text
                    );
                }
                HierarchyMode::Promote => {
                    if level == HeadingLevel::H3 {
                        c.level = Some(HeadingLevel::H2);
                    }
                }
                HierarchyMode::Strict => continue,
            }
        }

        // Strict mode also requires an H2 parent for every H3.
        if mode == HierarchyMode::Strict && level == HeadingLevel::H3 && !seen_h2 {
            continue;
        }

        match c.level {
            Some(HeadingLevel::H1) => {
                seen_h1 = true;
                if mode == HierarchyMode::Strict {
                    seen_h2 = false;
                }
            }
            Some(HeadingLevel::H2) => seen_h2 = true,
            _ => {}
        }
        result.push(c);
    }

    result
}

// ---------------------------------------------------------------------------
// Full post-pass
// ---------------------------------------------------------------------------

/// Turn ordered classifier output into final outline entries.
pub fn post_process(
    candidates: Vec<HeadingCandidate>,
    doc: &SpanDocument,
    title: &str,
    config: &OutlineConfig,
    deny: &DenyList,
) -> Vec<HeadingEntry> {
    let merged = merge_split_headings(candidates, config);
    let headings: Vec<HeadingCandidate> = merged.into_iter().filter(|c| c.is_heading()).collect();
    let headings = remove_running_headers(headings, doc, config.header_margin_buckets);
    let headings = filter_noise(headings, title, deny);
    let headings = enforce_hierarchy(headings, config.hierarchy);

    let pages = 1..=doc.page_count() as u32;

    headings
        .into_iter()
        .filter(|c| pages.contains(&c.span.page))
        .filter_map(|c| {
            c.level.map(|level| HeadingEntry {
                level,
                text: c.span.text,
                page: c.span.page,
            })
        })
        .collect()
}
