use std::path::{Path, PathBuf};

use colored::Colorize;
use outline_core::{DocumentAnalysis, ExtractionResult, HeadingLevel, Pipeline};

use crate::prelude::{println, *};

#[derive(Debug, clap::Args, Clone)]
pub struct FileOptions {
    /// Path to the PDF file
    pub path: PathBuf,

    /// Print the outline as an indented tree instead of JSON
    #[arg(long)]
    pub tree: bool,
}

#[derive(Debug, clap::Args, Clone)]
pub struct StatsOptions {
    /// Path to the PDF file
    pub path: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Read, parse and analyze one document. Blocking.
pub fn analyze_file(pipeline: &Pipeline, path: &Path) -> Result<DocumentAnalysis, Error> {
    let bytes = std::fs::read(path)?;
    let raw = pdf::extract_document(&bytes)?;
    Ok(pipeline.analyze(&raw))
}

/// Read, parse and extract one document. Blocking.
pub fn process_file(pipeline: &Pipeline, path: &Path) -> Result<ExtractionResult, Error> {
    analyze_file(pipeline, path).map(|analysis| analysis.result)
}

async fn analyze_blocking(global: &crate::Global, path: PathBuf) -> Result<DocumentAnalysis> {
    let pipeline = crate::settings::pipeline(global)?;
    let analysis = tokio::task::spawn_blocking(move || analyze_file(&pipeline, &path)).await??;
    Ok(analysis)
}

pub async fn file(options: FileOptions, global: crate::Global) -> Result<()> {
    let analysis = analyze_blocking(&global, options.path.clone()).await?;

    if options.tree {
        print_tree(&analysis.result);
    } else {
        println!("{}", outline_core::to_json(&analysis.result)?);
    }

    if global.verbose {
        log::info!(
            "{}: {} pages, {} spans, {} entries",
            options.path.display(),
            analysis.page_count,
            analysis.span_count,
            analysis.result.outline.len()
        );
    }

    Ok(())
}

fn print_tree(result: &ExtractionResult) {
    if result.title.is_empty() {
        println!("{}", "(untitled)".bright_black());
    } else {
        println!("{}", result.title.bold().cyan());
    }
    for entry in &result.outline {
        let indent = "  ".repeat(entry.level.depth() as usize);
        let label = match entry.level {
            HeadingLevel::H1 => entry.text.bold().to_string(),
            HeadingLevel::H2 => entry.text.clone(),
            HeadingLevel::H3 => entry.text.bright_black().to_string(),
        };
        println!(
            "{}{} {} {}",
            indent,
            entry.level.as_str().bright_yellow(),
            label,
            format!("(p. {})", entry.page).bright_black()
        );
    }
}

pub async fn stats(options: StatsOptions, global: crate::Global) -> Result<()> {
    let analysis = analyze_blocking(&global, options.path.clone()).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&analysis.stats)?);
        return Ok(());
    }

    println!("\n{}", "== Font Statistics ==".bold().cyan());

    let mut table = crate::prelude::new_table();
    table.add_row(prettytable::row!["Pages".bold().cyan(), analysis.page_count]);
    table.add_row(prettytable::row!["Spans".bold().cyan(), analysis.span_count]);
    table.add_row(prettytable::row![
        "Body size".bold().cyan(),
        format!("{:.2}pt", analysis.stats.body_size)
    ]);
    table.add_row(prettytable::row![
        "Distinct sizes".bold().cyan(),
        analysis.stats.distinct_sizes
    ]);
    table.add_row(prettytable::row![
        "Degenerate".bold().cyan(),
        analysis.stats.is_degenerate()
    ]);
    table.add_row(prettytable::row![
        "Title".bold().cyan(),
        if analysis.title.text.is_empty() {
            "-".to_string()
        } else {
            analysis.title.text.clone()
        }
    ]);
    table.printstd();

    println!("\n{}", "== Tiers ==".bold().cyan());
    let mut tiers = crate::prelude::new_table();
    tiers.add_row(prettytable::row![
        "#".bold(),
        "Centroid".bold(),
        "Sizes".bold()
    ]);
    for (i, tier) in analysis.stats.tiers.iter().enumerate() {
        let sizes = tier
            .sizes
            .iter()
            .map(|s| format!("{:.1}", s))
            .collect::<Vec<_>>()
            .join(", ");
        tiers.add_row(prettytable::row![i, format!("{:.2}", tier.centroid), sizes]);
    }
    tiers.printstd();

    println!("\n{}", "== Headings ==".bold().cyan());
    let mut counts = crate::prelude::new_table();
    counts.add_row(prettytable::row![
        "Classified".bold().cyan(),
        analysis.raw_heading_count()
    ]);
    for level in [HeadingLevel::H1, HeadingLevel::H2, HeadingLevel::H3] {
        counts.add_row(prettytable::row![
            level.as_str().bold().cyan(),
            analysis.count_level(level)
        ]);
    }
    counts.printstd();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use outline_core::OutlineConfig;

    #[test]
    fn test_missing_file_is_io_error() {
        let pipeline = Pipeline::new(OutlineConfig::default()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let err = process_file(&pipeline, &dir.path().join("absent.pdf")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_garbage_file_is_pdf_error() {
        let pipeline = Pipeline::new(OutlineConfig::default()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf at all").unwrap();
        let err = process_file(&pipeline, &path).unwrap_err();
        assert!(matches!(err, Error::Pdf(_)));
        assert_eq!(err.kind(), "parse");
    }
}
