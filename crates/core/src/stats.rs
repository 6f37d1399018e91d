//! Font statistics: body-text size and typographic tiers.
//!
//! Statistics are a pure function of one document's spans. Nothing here is
//! cached between documents.

use serde::{Deserialize, Serialize};

use crate::config::OutlineConfig;
use crate::types::TextSpan;

/// Body size used when a document has no usable font sizes at all.
pub const FALLBACK_BODY_SIZE: f32 = 12.0;

/// Lloyd iterations are capped at this count.
const MAX_KMEANS_ITERATIONS: usize = 100;

/// A cluster of font sizes treated as typographically equivalent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontTier {
    pub centroid: f32,
    /// Distinct member sizes, ascending.
    pub sizes: Vec<f32>,
}

/// Document-level font statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontStatistics {
    /// Median size of the body-candidate spans. Always strictly positive.
    pub body_size: f32,
    /// Tiers ordered by descending centroid.
    pub tiers: Vec<FontTier>,
    /// Number of distinct in-range sizes.
    pub distinct_sizes: usize,
    /// Number of spans that fed the median.
    pub body_span_count: usize,
}

impl FontStatistics {
    /// Statistics too thin to support relative-size classification. The
    /// classifier then falls back to boldness alone.
    pub fn is_degenerate(&self) -> bool {
        self.distinct_sizes < 2 || self.tiers.len() < 2 || self.body_span_count == 0
    }

    /// Index of the tier whose centroid is nearest to `size`.
    pub fn tier_of(&self, size: f32) -> Option<usize> {
        self.tiers
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (a.centroid - size)
                    .abs()
                    .total_cmp(&(b.centroid - size).abs())
            })
            .map(|(i, _)| i)
    }
}

/// Whether `size` falls inside the configured font-size range.
pub fn in_size_range(size: f32, config: &OutlineConfig) -> bool {
    size >= config.min_font_size && size <= config.max_font_size
}

/// Median of a slice. Returns `None` for empty input.
pub fn median(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Round a size to 0.1pt so that renderer jitter does not create new tiers.
fn quantize(size: f32) -> f32 {
    (size * 10.0).round() / 10.0
}

/// Compute body size and tiers for the given spans.
///
/// Body size is the median over non-bold in-range spans. Title and headings
/// are not known yet at this point, so a non-bold title or heading counts as
/// body text and shifts the median only when it outnumbers the body lines.
pub fn compute(spans: &[TextSpan], config: &OutlineConfig) -> FontStatistics {
    let in_range: Vec<&TextSpan> = spans
        .iter()
        .filter(|s| in_size_range(s.font_size, config))
        .collect();

    let mut body_sizes: Vec<f32> = in_range
        .iter()
        .filter(|s| !s.is_bold)
        .map(|s| s.font_size)
        .collect();
    if body_sizes.is_empty() {
        body_sizes = in_range.iter().map(|s| s.font_size).collect();
    }

    let body_size = median(&body_sizes)
        .filter(|m| *m > 0.0)
        .unwrap_or(FALLBACK_BODY_SIZE);

    let mut distinct: Vec<f32> = in_range.iter().map(|s| quantize(s.font_size)).collect();
    distinct.sort_by(f32::total_cmp);
    distinct.dedup();

    let tiers = if distinct.len() < 2 {
        // A single size is both body and the only tier.
        distinct
            .first()
            .map(|&s| {
                vec![FontTier {
                    centroid: s,
                    sizes: vec![s],
                }]
            })
            .unwrap_or_default()
    } else {
        let k = config.max_tiers.min(distinct.len());
        kmeans_1d(&distinct, k)
    };

    let stats = FontStatistics {
        body_size,
        tiers,
        distinct_sizes: distinct.len(),
        body_span_count: body_sizes.len(),
    };

    log::debug!(
        "font statistics: body={:.2} distinct={} tiers={:?}",
        stats.body_size,
        stats.distinct_sizes,
        stats.tiers.iter().map(|t| t.centroid).collect::<Vec<_>>()
    );

    stats
}

/// Deterministic one-dimensional k-means over sorted distinct values.
///
/// Centroids start at evenly spaced quantiles so that repeated runs on the
/// same input produce identical tiers. Empty clusters keep their previous
/// centroid. Returns tiers ordered by descending centroid with empty tiers
/// removed.
pub fn kmeans_1d(values: &[f32], k: usize) -> Vec<FontTier> {
    if values.is_empty() || k == 0 {
        return Vec::new();
    }
    let k = k.min(values.len());

    let mut centroids: Vec<f32> = (0..k)
        .map(|i| {
            let idx = if k == 1 {
                values.len() / 2
            } else {
                i * (values.len() - 1) / (k - 1)
            };
            values[idx]
        })
        .collect();

    let nearest = |v: f32, centroids: &[f32]| -> usize {
        centroids
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (*a - v).abs().total_cmp(&(*b - v).abs()))
            .map(|(i, _)| i)
            .unwrap_or(0)
    };

    let mut assignments: Vec<usize> = values.iter().map(|&v| nearest(v, &centroids)).collect();

    for _ in 0..MAX_KMEANS_ITERATIONS {
        let mut sums = vec![0.0f32; k];
        let mut counts = vec![0usize; k];
        for (&v, &c) in values.iter().zip(&assignments) {
            sums[c] += v;
            counts[c] += 1;
        }
        for c in 0..k {
            if counts[c] > 0 {
                centroids[c] = sums[c] / counts[c] as f32;
            }
        }

        let next: Vec<usize> = values.iter().map(|&v| nearest(v, &centroids)).collect();
        if next == assignments {
            break;
        }
        assignments = next;
    }

    let mut tiers: Vec<FontTier> = (0..k)
        .map(|c| FontTier {
            centroid: centroids[c],
            sizes: values
                .iter()
                .zip(&assignments)
                .filter(|(_, a)| **a == c)
                .map(|(&v, _)| v)
                .collect(),
        })
        .filter(|t| !t.sizes.is_empty())
        .collect();

    tiers.sort_by(|a, b| b.centroid.total_cmp(&a.centroid));
    tiers
}
