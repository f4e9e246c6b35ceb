//! Tokenizer and encoder boundaries.
//!
//! The core never looks inside a transformer. It needs four things from a
//! model family:
//!
//! - a [`TextTokenizer`] that turns text into content ids and knows its
//!   boundary ids and maximum input length,
//! - an [`Encoder`] that turns one wrapped window into per-position vectors,
//! - a [`SummaryConvention`] naming which position summarizes the window,
//! - a way to persist both in their native formats.
//!
//! A [`BackboneFactory`] bundles these for one family. Factories are
//! registered by identifier in an [`EncoderRegistry`](crate::EncoderRegistry).
//! Backends (candle, ONNX, a test double) plug in behind the traits.

use std::path::Path;

use candle_core::{Device, IndexOp, Tensor};

use crate::chunk::SpecialTokens;
use crate::{Error, Result};

/// Subword tokenizer capability.
pub trait TextTokenizer: Send + Sync {
    /// Content token ids for `text`, without boundary tokens.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tokenizer`] if the backend fails.
    fn tokenize(&self, text: &str) -> Result<Vec<u32>>;

    /// Ids prepended and appended to every window.
    fn special_tokens(&self) -> SpecialTokens;

    /// Longest sequence the paired encoder accepts, boundary tokens included.
    fn max_length(&self) -> usize;

    /// Persist vocabulary and settings under `dir`.
    ///
    /// # Errors
    ///
    /// Returns an I/O or backend error.
    fn save(&self, dir: &Path) -> Result<()>;
}

/// Transformer encoder capability.
pub trait Encoder: Send + Sync {
    /// Width of each output vector.
    fn hidden_size(&self) -> usize;

    /// Encode one window.
    ///
    /// `input_ids` and `attention_mask` are `u32` tensors of shape
    /// `[1, seq_len]`. The result has shape `[1, seq_len, hidden_size]`.
    ///
    /// # Errors
    ///
    /// Returns a tensor error from the backend.
    fn forward(&self, input_ids: &Tensor, attention_mask: &Tensor) -> Result<Tensor>;

    /// Persist weights and config under `dir`.
    ///
    /// # Errors
    ///
    /// Returns an I/O or backend error.
    fn save(&self, dir: &Path) -> Result<()>;
}

/// Which encoder output position summarizes a window.
///
/// Every built-in family uses [`FirstToken`](Self::FirstToken): BERT and
/// DistilBERT put `[CLS]` there, XLM-R puts `<s>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum SummaryConvention {
    /// Position 0.
    #[default]
    FirstToken,
}

impl SummaryConvention {
    /// Pull the summary vector out of a `[1, seq_len, hidden]` output.
    ///
    /// # Errors
    ///
    /// Returns a tensor error if `hidden_states` has the wrong rank or is
    /// empty.
    pub fn summarize(&self, hidden_states: &Tensor) -> Result<Vec<f32>> {
        match self {
            Self::FirstToken => Ok(hidden_states.i((0, 0))?.to_vec1::<f32>()?),
        }
    }
}

/// A loaded tokenizer/encoder pair for one family.
pub struct Backbone {
    /// Text to ids.
    pub tokenizer: Box<dyn TextTokenizer>,
    /// Ids to vectors.
    pub encoder: Box<dyn Encoder>,
    /// Where the window summary sits.
    pub summary: SummaryConvention,
}

impl std::fmt::Debug for Backbone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backbone")
            .field("hidden_size", &self.encoder.hidden_size())
            .field("max_length", &self.tokenizer.max_length())
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

/// Where a factory reads weights from.
#[derive(Debug, Clone, Copy)]
pub enum BackboneSource<'a> {
    /// The family's published pretrained weights.
    Pretrained,
    /// A directory written by [`Backbone`] `save` calls.
    Directory {
        /// Encoder weight/config subtree.
        encoder: &'a Path,
        /// Tokenizer subtree.
        tokenizer: &'a Path,
    },
}

/// Builds a [`Backbone`] for one model family.
pub trait BackboneFactory: Send + Sync {
    /// Load the family's tokenizer and encoder onto `device`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArtifact`] when a directory source lacks a
    /// required file, and backend errors otherwise.
    fn load(&self, source: BackboneSource<'_>, device: &Device) -> Result<Backbone>;
}

/// Fail with [`Error::MissingArtifact`] unless `path` exists.
///
/// # Errors
///
/// See above.
pub fn require_artifact(kind: &'static str, path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(Error::MissingArtifact {
            kind,
            path: path.to_path_buf(),
        })
    }
}
