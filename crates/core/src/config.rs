//! Tunable thresholds for the outline pipeline.
//!
//! Every constant the pipeline uses lives in [`OutlineConfig`]. The
//! [`Default`] implementation is the reference configuration; a TOML file may
//! override any subset of keys.

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::HeadingLevel;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid deny pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Heading rules
// ---------------------------------------------------------------------------

/// How a [`LevelRule`] combines boldness with its absolute size floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emphasis {
    /// The span must be bold AND at least `min_size`.
    BoldRequired,
    /// The span must be bold OR at least `min_size`.
    BoldOrMinSize,
}

/// One row of the heading decision table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelRule {
    pub level: HeadingLevel,
    /// Minimum `font_size / body_size`.
    pub min_ratio: f32,
    /// Absolute size floor in points.
    pub min_size: f32,
    pub emphasis: Emphasis,
}

impl LevelRule {
    /// Whether a span with the given metrics satisfies this rule.
    pub fn matches(&self, ratio: f32, font_size: f32, is_bold: bool) -> bool {
        if ratio < self.min_ratio {
            return false;
        }
        let big_enough = font_size >= self.min_size;
        match self.emphasis {
            Emphasis::BoldRequired => is_bold && big_enough,
            Emphasis::BoldOrMinSize => is_bold || big_enough,
        }
    }
}

/// The reference decision table, in evaluation order.
pub fn default_level_rules() -> Vec<LevelRule> {
    vec![
        LevelRule {
            level: HeadingLevel::H1,
            min_ratio: 1.4,
            min_size: 14.0,
            emphasis: Emphasis::BoldRequired,
        },
        LevelRule {
            level: HeadingLevel::H2,
            min_ratio: 1.2,
            min_size: 12.0,
            emphasis: Emphasis::BoldRequired,
        },
        LevelRule {
            level: HeadingLevel::H3,
            min_ratio: 1.1,
            min_size: 11.0,
            emphasis: Emphasis::BoldOrMinSize,
        },
    ]
}

/// What the post-processor does with headings whose parent level has not
/// appeared yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HierarchyMode {
    /// Keep orphans, log them.
    #[default]
    Lenient,
    /// Lift an orphan `H3` to `H2`.
    Promote,
    /// Drop `H2` without a prior `H1` and `H3` without a prior `H2`.
    Strict,
}

// ---------------------------------------------------------------------------
// OutlineConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlineConfig {
    pub min_heading_length: usize,
    pub max_heading_length: usize,
    pub min_font_size: f32,
    pub max_font_size: f32,
    /// Size similarity (`smaller / larger`) above which two consecutive
    /// title lines belong to the same title.
    pub title_similarity: f32,
    pub max_tiers: usize,
    /// Largest horizontal gap, in points, across which two fragments with the
    /// same style are merged.
    pub merge_gap_tolerance: f32,
    pub merge_wrapped_lines: bool,
    /// Number of the 20 vertical buckets at the top and at the bottom of a
    /// page in which repeated text counts as a running header or footer.
    pub header_margin_buckets: u32,
    pub hierarchy: HierarchyMode,
    pub level_rules: Vec<LevelRule>,
    pub title_deny_patterns: Vec<String>,
    pub heading_deny_patterns: Vec<String>,
}

impl Default for OutlineConfig {
    fn default() -> Self {
        Self {
            min_heading_length: 3,
            max_heading_length: 200,
            min_font_size: 8.0,
            max_font_size: 72.0,
            title_similarity: 0.85,
            max_tiers: 3,
            merge_gap_tolerance: 2.0,
            merge_wrapped_lines: true,
            header_margin_buckets: 2,
            hierarchy: HierarchyMode::default(),
            level_rules: default_level_rules(),
            title_deny_patterns: vec![
                r"^\d+$".to_string(),
                r"(?i)^page\s+\d+(\s+of\s+\d+)?$".to_string(),
                r"^\d{1,2}[/.\-]\d{1,2}[/.\-]\d{2,4}$".to_string(),
                r"^\d{4}-\d{2}-\d{2}$".to_string(),
                r"(?i)^(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2},?\s+\d{4}$"
                    .to_string(),
                r"(?i)^\d{1,2}\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?,?\s+\d{4}$"
                    .to_string(),
                r"(?i)^(copyright|©|all rights reserved)".to_string(),
            ],
            heading_deny_patterns: vec![
                r"(?i)^page\s+\d+(\s+of\s+\d+)?$".to_string(),
                r"(?i)^(copyright|©|all rights reserved)".to_string(),
                r"(?i)^(strictly\s+)?(confidential|draft)(\s*[-–:|].*)?$".to_string(),
            ],
        }
    }
}

impl OutlineConfig {
    /// Parse a TOML document. Missing keys keep their default values.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: OutlineConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check thresholds and compile the deny patterns once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_heading_length > self.max_heading_length {
            return Err(ConfigError::Invalid(format!(
                "min_heading_length ({}) exceeds max_heading_length ({})",
                self.min_heading_length, self.max_heading_length
            )));
        }
        if !(self.min_font_size >= 0.0 && self.min_font_size < self.max_font_size) {
            return Err(ConfigError::Invalid(format!(
                "font size range [{}, {}] is empty",
                self.min_font_size, self.max_font_size
            )));
        }
        if !(self.title_similarity > 0.0 && self.title_similarity <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "title_similarity must be in (0, 1], got {}",
                self.title_similarity
            )));
        }
        if self.header_margin_buckets > 10 {
            return Err(ConfigError::Invalid(format!(
                "header_margin_buckets must be at most 10, got {}",
                self.header_margin_buckets
            )));
        }
        if self.max_tiers == 0 {
            return Err(ConfigError::Invalid("max_tiers must be at least 1".into()));
        }
        for (i, rule) in self.level_rules.iter().enumerate() {
            if !(rule.min_ratio > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "rule for {} has non-positive min_ratio",
                    rule.level
                )));
            }
            if self.level_rules[..i].iter().any(|r| r.level == rule.level) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate rule for {}",
                    rule.level
                )));
            }
        }
        DenyList::compile(&self.title_deny_patterns)?;
        DenyList::compile(&self.heading_deny_patterns)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DenyList
// ---------------------------------------------------------------------------

/// A compiled set of patterns; a text is denied when any pattern matches.
#[derive(Debug, Clone, Default)]
pub struct DenyList {
    patterns: Vec<Regex>,
}

impl DenyList {
    pub fn compile(patterns: &[String]) -> Result<Self, ConfigError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|source| ConfigError::InvalidPattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_denied(&self, text: &str) -> bool {
        let trimmed = text.trim();
        self.patterns.iter().any(|re| re.is_match(trimmed))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_matches_reference_constants() {
        let c = OutlineConfig::default();
        assert_eq!(c.min_heading_length, 3);
        assert_eq!(c.max_heading_length, 200);
        assert_eq!(c.min_font_size, 8.0);
        assert_eq!(c.max_font_size, 72.0);
        assert_eq!(c.title_similarity, 0.85);
        assert_eq!(c.max_tiers, 3);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_default_rules_in_priority_order() {
        let levels: Vec<HeadingLevel> = default_level_rules().iter().map(|r| r.level).collect();
        assert_eq!(
            levels,
            vec![HeadingLevel::H1, HeadingLevel::H2, HeadingLevel::H3]
        );
    }

    #[test]
    fn test_rule_bold_required() {
        let h1 = &default_level_rules()[0];
        assert!(h1.matches(1.5, 18.0, true));
        assert!(!h1.matches(1.5, 18.0, false));
        assert!(!h1.matches(1.5, 13.0, true));
        assert!(!h1.matches(1.39, 18.0, true));
    }

    #[test]
    fn test_rule_bold_or_min_size() {
        let h3 = &default_level_rules()[2];
        assert!(h3.matches(1.1, 10.0, true));
        assert!(h3.matches(1.1, 11.0, false));
        assert!(!h3.matches(1.1, 10.0, false));
        assert!(!h3.matches(1.0, 20.0, true));
    }

    #[test]
    fn test_rule_nesting() {
        // Anything that passes H1 also passes the H2 and H3 ratio floors.
        let rules = default_level_rules();
        assert!(rules[0].min_ratio >= rules[1].min_ratio);
        assert!(rules[1].min_ratio >= rules[2].min_ratio);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let c = OutlineConfig::from_toml_str("max_tiers = 2\nhierarchy = \"strict\"\n").unwrap();
        assert_eq!(c.max_tiers, 2);
        assert_eq!(c.hierarchy, HierarchyMode::Strict);
        assert_eq!(c.min_heading_length, 3);
        assert_eq!(c.level_rules.len(), 3);
    }

    #[test]
    fn test_toml_rule_table() {
        let toml = r#"
[[level_rules]]
level = "H1"
min_ratio = 1.8
min_size = 20.0
emphasis = "bold_required"
"#;
        let c = OutlineConfig::from_toml_str(toml).unwrap();
        assert_eq!(c.level_rules.len(), 1);
        assert_eq!(c.level_rules[0].min_ratio, 1.8);
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = OutlineConfig::from_toml_str("heading_deny_patterns = [\"(unclosed\"]")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn test_inverted_length_range_rejected() {
        let err = OutlineConfig::from_toml_str("min_heading_length = 500").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_duplicate_rule_rejected() {
        let mut c = OutlineConfig::default();
        c.level_rules.push(c.level_rules[0].clone());
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "title_similarity = 0.9").unwrap();
        let c = OutlineConfig::from_file(file.path()).unwrap();
        assert_eq!(c.title_similarity, 0.9);
    }

    #[test]
    fn test_from_missing_file() {
        let err = OutlineConfig::from_file("/nonexistent/outline.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_default_title_denylist() {
        let deny = DenyList::compile(&OutlineConfig::default().title_deny_patterns).unwrap();
        assert!(deny.is_denied("12"));
        assert!(deny.is_denied("Page 3 of 10"));
        assert!(deny.is_denied("12/05/2023"));
        assert!(deny.is_denied("2023-05-12"));
        assert!(deny.is_denied("March 21, 2003"));
        assert!(deny.is_denied("21 March 2003"));
        assert!(deny.is_denied("Copyright 2020 Acme"));
        assert!(!deny.is_denied("Annual Report 2023"));
    }

    #[test]
    fn test_default_heading_denylist_markers() {
        let deny = DenyList::compile(&OutlineConfig::default().heading_deny_patterns).unwrap();
        assert!(deny.is_denied("CONFIDENTIAL"));
        assert!(deny.is_denied("Strictly Confidential"));
        assert!(deny.is_denied("Draft - do not distribute"));
        assert!(deny.is_denied("Page 4"));
        assert!(!deny.is_denied("Draft Recommendations"));
        assert!(!deny.is_denied("Confidentiality Requirements"));
    }

    #[test]
    fn test_margin_band_bounded() {
        let err = OutlineConfig::from_toml_str("header_margin_buckets = 11").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let c = OutlineConfig::from_toml_str("header_margin_buckets = 0").unwrap();
        assert_eq!(c.header_margin_buckets, 0);
    }
}
