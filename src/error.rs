//! Error types for lyricmood.

use std::path::PathBuf;

use crate::config::ConfigError;

/// Errors that can occur while building, persisting, or running a model.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration. Fatal at construction time.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Input text was empty or whitespace-only.
    #[error("input text is empty")]
    EmptyInput,

    /// Restore was requested from a directory that does not exist.
    #[error("model directory {} does not exist", .0.display())]
    MissingModelDirectory(PathBuf),

    /// A required encoder or tokenizer artifact is absent.
    #[error("{kind} artifact missing at {}", path.display())]
    MissingArtifact {
        /// Which sub-resource the artifact belongs to.
        kind: &'static str,
        /// Where it was expected.
        path: PathBuf,
    },

    /// Non-empty text tokenized to nothing, so no window could be encoded.
    #[error("no token windows produced from non-empty text")]
    DegenerateChunking,

    /// The classifier produced a logit that cannot be ranked.
    #[error("classifier produced a NaN logit at index {index}")]
    DegenerateLogits {
        /// First offending position.
        index: usize,
    },

    /// The encoder summary vector has the wrong width.
    #[error("encoder summary vector has width {actual}, expected {expected}")]
    SummaryWidth {
        /// The model's hidden size.
        expected: usize,
        /// Width actually returned.
        actual: usize,
    },

    /// A class index has no name in the label set.
    #[error("class index {index} out of range for {len} labels")]
    LabelOutOfRange {
        /// The offending index.
        index: usize,
        /// Number of labels known.
        len: usize,
    },

    /// Tensor runtime error.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// Tokenizer backend error.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// Filesystem error.
    #[error("i/o error at {}: {source}", path.display())]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV parse error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Weight download failed.
    #[error("download of {repo} failed: {message}")]
    Download {
        /// Hub repository id.
        repo: String,
        /// Backend error text.
        message: String,
    },
}

impl Error {
    /// Whether this error concerns a single document and a batch may skip it.
    #[must_use]
    pub fn is_per_document(&self) -> bool {
        matches!(self, Self::EmptyInput | Self::DegenerateChunking)
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for lyricmood operations.
pub type Result<T> = std::result::Result<T, Error>;
