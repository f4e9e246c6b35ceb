//! Model configuration.
//!
//! ## The Budget
//!
//! Every encoder window carries two boundary tokens around its content:
//!
//! ```text
//! max_length = 512
//!
//! [CLS] t0 t1 ... t509 [SEP]
//!   1  +     510      +  1   = 512  <- fits
//!
//! chunk_size = 511 -> 513 tokens   <- rejected at construction
//! ```
//!
//! So `chunk_size + 2 <= max_length` must hold. The tokenizer owns
//! `max_length`, which is why that check runs in
//! [`LyricsModel::construct`](crate::LyricsModel::construct) and not in
//! [`LyricsConfig::validate`]. A bad configuration fails before any text is
//! seen, never halfway through a batch.
//!
//! ## Stride
//!
//! `stride <= chunk_size` overlaps adjacent windows. `stride > chunk_size`
//! leaves gaps between windows. The gaps are allowed but rarely what you want.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::pool::Pooling;
use crate::{Error, Result};

/// Identifier of the default encoder family.
pub const DEFAULT_ENCODER: &str = "xlm-roberta-base";

/// Number of tokens injected around each window's content.
pub const BOUNDARY_TOKENS: usize = 2;

/// Immutable per-model configuration.
///
/// # Examples
///
/// ```rust
/// use lyricmood::LyricsConfig;
///
/// let config = LyricsConfig::new(7)
///     .with_encoder("bert-base-multilingual-cased")
///     .with_window(254, 128)
///     .with_max_pooling(false);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.chunk_size, 254);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LyricsConfig {
    /// Number of mood classes.
    pub num_labels: usize,
    /// Encoder family identifier, resolved against an
    /// [`EncoderRegistry`](crate::EncoderRegistry).
    pub encoder: String,
    /// Content tokens per window, excluding the two boundary tokens.
    pub chunk_size: usize,
    /// Step between successive window start offsets.
    pub stride: usize,
    /// Max-pool window summaries when true, mean-pool when false.
    pub use_max_pooling: bool,
}

impl LyricsConfig {
    /// Default configuration with `num_labels` classes.
    #[must_use]
    pub fn new(num_labels: usize) -> Self {
        Self {
            num_labels,
            ..Self::default()
        }
    }

    /// Select the encoder family.
    #[must_use]
    pub fn with_encoder(mut self, encoder: impl Into<String>) -> Self {
        self.encoder = encoder.into();
        self
    }

    /// Set window size and stride.
    #[must_use]
    pub fn with_window(mut self, chunk_size: usize, stride: usize) -> Self {
        self.chunk_size = chunk_size;
        self.stride = stride;
        self
    }

    /// Choose max (true) or mean (false) pooling.
    #[must_use]
    pub fn with_max_pooling(mut self, use_max_pooling: bool) -> Self {
        self.use_max_pooling = use_max_pooling;
        self
    }

    /// The pooling strategy this configuration selects.
    #[must_use]
    pub fn pooling(&self) -> Pooling {
        if self.use_max_pooling {
            Pooling::Max
        } else {
            Pooling::Mean
        }
    }

    /// Check the fields that need no encoder to validate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Zero`] for a zero `num_labels`, `chunk_size`, or
    /// `stride`.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        for (field, value) in [
            ("num_labels", self.num_labels),
            ("chunk_size", self.chunk_size),
            ("stride", self.stride),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero { field });
            }
        }
        Ok(())
    }

    /// Check that a window fits the tokenizer's maximum input length.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ChunkTooLarge`] when
    /// `chunk_size + 2 > max_length`.
    pub fn check_capacity(&self, max_length: usize) -> std::result::Result<(), ConfigError> {
        if self.chunk_size.saturating_add(BOUNDARY_TOKENS) > max_length {
            Err(ConfigError::ChunkTooLarge {
                chunk_size: self.chunk_size,
                max_length,
            })
        } else {
            Ok(())
        }
    }

    /// Parse a configuration from TOML. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML, or a validation error.
    pub fn from_toml_str(text: &str) -> std::result::Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or any
    /// [`from_toml_str`](Self::from_toml_str) error.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Ok(Self::from_toml_str(&text)?)
    }
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            num_labels: 7,
            encoder: DEFAULT_ENCODER.to_string(),
            chunk_size: 510,
            stride: 256,
            use_max_pooling: true,
        }
    }
}

/// Invalid configuration. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The encoder identifier matches no registered family.
    #[error("unsupported model family: {0}")]
    UnsupportedModelFamily(String),

    /// A window plus its boundary tokens exceeds the encoder's capacity.
    #[error("chunk size {chunk_size} + 2 boundary tokens exceeds max input length {max_length}")]
    ChunkTooLarge {
        /// Configured content tokens per window.
        chunk_size: usize,
        /// The tokenizer's maximum input length.
        max_length: usize,
    },

    /// A field that must be positive was zero.
    #[error("{field} must be > 0")]
    Zero {
        /// Name of the field.
        field: &'static str,
    },

    /// The label set and `num_labels` disagree.
    #[error("label set has {actual} names but the model has {expected} classes")]
    LabelCountMismatch {
        /// `num_labels` from the configuration.
        expected: usize,
        /// Names supplied.
        actual: usize,
    },

    /// A label set with no names.
    #[error("label set is empty")]
    EmptyLabelSet,

    /// The same name appears twice in a label set.
    #[error("duplicate label: {0}")]
    DuplicateLabel(String),

    /// The boundary tokens the tokenizer needs are not in its vocabulary.
    #[error("tokenizer has no {0} token")]
    MissingSpecialToken(&'static str),

    /// TOML could not be parsed.
    #[error("invalid config file: {0}")]
    Parse(String),
}
