//! Core library for pdfoutline
//!
//! This crate implements the **Functional Core** of the pdfoutline application,
//! following the Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! - **`outline_core`** (this crate): Pure layout-to-structure classification
//!   with zero I/O
//! - **`pdf`**: Turns PDF bytes into a [`types::RawDocument`]
//! - **`pdfoutline`**: Directory walking, JSON output and orchestration (the
//!   Imperative Shell)
//!
//! ## Functional Core Principles
//!
//! - **Pure functions**: The same fragment stream always produces the same
//!   outline
//! - **No side effects**: No file or network access; logging only
//! - **Testable**: Every stage is tested with hand-built fixture fragments
//!
//! # Module Organization
//!
//! The pipeline runs left to right:
//!
//! ```text
//! normalize -> stats -> title -> classify -> postprocess -> pipeline
//! ```
//!
//! - [`types`]: Fragments, spans, headings and the output record
//! - [`config`]: Thresholds, the heading rule table and deny patterns
//! - [`normalize`]: Text cleanup and same-style fragment merging
//! - [`stats`]: Body-size estimation and font-size tiers
//! - [`title`]: Title detection on the first page
//! - [`classify`]: Per-span heading level assignment
//! - [`postprocess`]: Merging, header/footer removal, noise and hierarchy
//! - [`pipeline`]: Runs every stage and assembles the result
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use outline_core::{Pipeline, OutlineConfig, RawDocument};
//!
//! let pipeline = Pipeline::new(OutlineConfig::default())?;
//! let result = pipeline.extract(&raw_document);
//! println!("{}", outline_core::to_json(&result)?);
//! ```

pub mod classify;
pub mod config;
pub mod normalize;
pub mod pipeline;
pub mod postprocess;
pub mod stats;
pub mod title;
pub mod types;

pub use config::{ConfigError, HierarchyMode, OutlineConfig};
pub use pipeline::{extract_outline, to_json, DocumentAnalysis, Pipeline};
pub use types::{
    BBox, ExtractionResult, HeadingEntry, HeadingLevel, RawDocument, RawFragment, RawPage,
};
