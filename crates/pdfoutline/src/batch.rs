use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::Colorize;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use outline_core::{ExtractionResult, Pipeline};

use crate::prelude::{println, *};

#[derive(Debug, clap::Args, Clone)]
pub struct RunOptions {
    /// Directory containing the PDF files
    #[arg(short, long, env = "PDFOUTLINE_INPUT", default_value = "/app/input")]
    pub input: PathBuf,

    /// Directory receiving one JSON file per PDF
    #[arg(short, long, env = "PDFOUTLINE_OUTPUT", default_value = "/app/output")]
    pub output: PathBuf,

    /// Documents processed in parallel (default: available CPUs)
    #[arg(short, long, env = "PDFOUTLINE_JOBS")]
    pub jobs: Option<usize>,

    /// Per-document time budget in seconds
    #[arg(short, long, env = "PDFOUTLINE_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Do not draw a progress bar
    #[arg(long)]
    pub no_progress: bool,
}

/// Outcome of one document.
#[derive(Debug)]
pub struct DocumentReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub elapsed: Duration,
    pub outcome: std::result::Result<ExtractionResult, Error>,
}

impl DocumentReport {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// PDFs directly inside `dir` (case-insensitive extension), sorted by name.
pub fn discover_pdfs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// `<output_dir>/<stem>.json` for an input document.
pub fn output_path(output_dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "document".into());
    let mut name = stem;
    name.push(".json");
    output_dir.join(name)
}

/// Write `result` as pretty-printed UTF-8 JSON.
pub fn write_result(path: &Path, result: &ExtractionResult) -> std::result::Result<(), Error> {
    let json = outline_core::to_json(result).map_err(std::io::Error::from)?;
    std::fs::write(path, json).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Run one document on the blocking pool, bounded by `timeout`.
async fn process_one(
    pipeline: Arc<Pipeline>,
    input: PathBuf,
    timeout: Option<Duration>,
) -> std::result::Result<ExtractionResult, Error> {
    let task = tokio::task::spawn_blocking({
        let input = input.clone();
        move || crate::document::process_file(&pipeline, &input)
    });

    match timeout {
        Some(budget) => match tokio::time::timeout(budget, task).await {
            Ok(joined) => joined?,
            Err(_) => Err(Error::Timeout(budget.as_secs())),
        },
        None => task.await?,
    }
}

/// Process every document and write its result file.
///
/// Per-document failures are logged and produce the empty result. A failed
/// output write is recorded in that document's report. Only failures to read
/// the input directory or create the output directory abort.
pub async fn process_directory(
    pipeline: Arc<Pipeline>,
    input_dir: &Path,
    output_dir: &Path,
    jobs: usize,
    timeout: Option<Duration>,
    progress: Option<&ProgressBar>,
) -> Result<Vec<DocumentReport>> {
    let files = discover_pdfs(input_dir)
        .wrap_err_with(|| format!("Failed to read input directory {}", input_dir.display()))?;
    std::fs::create_dir_all(output_dir)
        .wrap_err_with(|| format!("Failed to create output directory {}", output_dir.display()))?;

    log::info!(
        "processing {} documents from {} with {} workers",
        files.len(),
        input_dir.display(),
        jobs
    );
    if let Some(pb) = progress {
        pb.set_length(files.len() as u64);
    }

    let mut results = stream::iter(files)
        .map(|input| {
            let pipeline = Arc::clone(&pipeline);
            async move {
                let started = Instant::now();
                let outcome = process_one(pipeline, input.clone(), timeout).await;
                (input, started.elapsed(), outcome)
            }
        })
        .buffer_unordered(jobs.max(1));

    let mut reports = Vec::new();
    while let Some((input, elapsed, outcome)) = results.next().await {
        let output = output_path(output_dir, &input);
        let name = input.display().to_string();

        let written = match &outcome {
            Ok(result) => {
                log::info!(
                    "{}: title={:?}, {} headings ({:.2}s)",
                    name,
                    result.title,
                    result.outline.len(),
                    elapsed.as_secs_f64()
                );
                write_result(&output, result)
            }
            Err(e) => {
                log::error!("{}: {}", name, e);
                write_result(&output, &ExtractionResult::empty())
            }
        };
        let outcome = match written {
            Ok(()) => outcome,
            Err(e) => {
                log::error!("{}: {}", name, e);
                Err(e)
            }
        };

        if let Some(pb) = progress {
            pb.set_message(
                input
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            );
            pb.inc(1);
        }

        reports.push(DocumentReport {
            input,
            output,
            elapsed,
            outcome,
        });
    }

    reports.sort_by(|a, b| a.input.cmp(&b.input));
    Ok(reports)
}

fn print_summary(reports: &[DocumentReport]) {
    let mut table = crate::prelude::new_table();
    table.add_row(prettytable::row![
        "File".bold(),
        "Status".bold(),
        "Title".bold(),
        "Headings".bold(),
        "Time".bold(),
        "Output".bold()
    ]);

    for report in reports {
        let file = report
            .input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let time = format!("{:.2}s", report.elapsed.as_secs_f64());
        let output = report.output.display().to_string();
        match &report.outcome {
            Ok(result) => table.add_row(prettytable::row![
                file,
                "ok".green(),
                result.title,
                result.outline.len(),
                time,
                output
            ]),
            Err(e) => table.add_row(prettytable::row![
                file,
                e.kind().red(),
                "-",
                "-",
                time,
                output
            ]),
        };
    }

    table.printstd();

    let failed = reports.iter().filter(|r| !r.is_ok()).count();
    println!(
        "\n{} processed, {} failed",
        reports.len().to_string().bold(),
        if failed == 0 {
            failed.to_string().green()
        } else {
            failed.to_string().red()
        }
    );
}

pub async fn run(options: RunOptions, global: crate::Global) -> Result<()> {
    let pipeline = Arc::new(crate::settings::pipeline(&global)?);
    let jobs = options.jobs.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });
    let timeout = options.timeout.map(Duration::from_secs);

    let progress = if options.no_progress {
        None
    } else {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("=> "),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    };

    let reports = process_directory(
        pipeline,
        &options.input,
        &options.output,
        jobs,
        timeout,
        progress.as_ref(),
    )
    .await?;

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    if global.verbose || reports.iter().any(|r| !r.is_ok()) {
        print_summary(&reports);
    } else {
        println!(
            "{} {} documents -> {}",
            "done:".green().bold(),
            reports.len(),
            options.output.display()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use outline_core::OutlineConfig;

    fn pipeline() -> Arc<Pipeline> {
        Arc::new(Pipeline::new(OutlineConfig::default()).unwrap())
    }

    #[test]
    fn test_output_path_replaces_extension() {
        let out = output_path(Path::new("/app/output"), Path::new("/app/input/report.PDF"));
        assert_eq!(out, PathBuf::from("/app/output/report.json"));
    }

    #[test]
    fn test_output_path_keeps_inner_dots() {
        let out = output_path(Path::new("out"), Path::new("in/v1.2.final.pdf"));
        assert_eq!(out, PathBuf::from("out/v1.2.final.json"));
    }

    #[test]
    fn test_discover_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "a.PDF", "notes.txt", "c.pdf.bak"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let found: Vec<String> = discover_pdfs(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(found, vec!["a.PDF", "b.pdf"]);
    }

    #[test]
    fn test_discover_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_pdfs(&dir.path().join("missing")).is_err());
    }

    #[tokio::test]
    async fn test_broken_document_yields_empty_result() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        std::fs::write(input.path().join("broken.pdf"), b"garbage").unwrap();

        let reports = process_directory(pipeline(), input.path(), output.path(), 2, None, None)
            .await
            .unwrap();

        assert_eq!(reports.len(), 1);
        assert!(!reports[0].is_ok());

        let written = std::fs::read_to_string(output.path().join("broken.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value, serde_json::json!({"title": "", "outline": []}));
    }

    #[tokio::test]
    async fn test_creates_output_directory() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let nested = output.path().join("deep").join("er");
        std::fs::write(input.path().join("one.pdf"), b"x").unwrap();
        std::fs::write(input.path().join("two.pdf"), b"y").unwrap();

        let reports = process_directory(pipeline(), input.path(), &nested, 1, None, None)
            .await
            .unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].input.file_name().unwrap(), "one.pdf");
        assert!(nested.join("one.json").exists());
        assert!(nested.join("two.json").exists());
    }

    #[tokio::test]
    async fn test_unwritable_output_does_not_stop_batch() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        std::fs::write(input.path().join("a.pdf"), b"x").unwrap();
        std::fs::write(input.path().join("b.pdf"), b"y").unwrap();
        std::fs::create_dir(output.path().join("a.json")).unwrap();

        let reports = process_directory(pipeline(), input.path(), output.path(), 1, None, None)
            .await
            .unwrap();

        assert_eq!(reports.len(), 2);
        let a = reports[0].outcome.as_ref().unwrap_err();
        assert!(matches!(a, Error::Write { .. }));
        assert_eq!(a.kind(), "write");

        let written = std::fs::read_to_string(output.path().join("b.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value, serde_json::json!({"title": "", "outline": []}));
    }

    #[test]
    fn test_write_result_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("missing").join("out.json");
        let err = write_result(&target, &ExtractionResult::empty()).unwrap_err();
        match err {
            Error::Write { path, .. } => assert_eq!(path, target),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_empty_directory() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let reports = process_directory(pipeline(), input.path(), output.path(), 4, None, None)
            .await
            .unwrap();
        assert!(reports.is_empty());
    }
}
