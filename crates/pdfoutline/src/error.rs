/// Why a single document produced no outline.
///
/// These never abort a batch: the error is logged and recorded in the
/// document's report, and the document gets an empty result file when one
/// can be written.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("PDF error: {0}")]
    Pdf(#[from] pdf::PdfError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("Worker failed: {0}")]
    Join(String),
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Error::Join(e.to_string())
    }
}

impl Error {
    /// Short label for summary tables.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Pdf(pdf::PdfError::Encrypted) => "encrypted",
            Error::Pdf(_) => "parse",
            Error::Io(_) => "io",
            Error::Write { .. } => "write",
            Error::Timeout(_) => "timeout",
            Error::Join(_) => "worker",
        }
    }
}
