//! Single-document inference.

use serde::Serialize;

use crate::config::ConfigError;
use crate::head::{argmax, Mode};
use crate::labels::LabelSet;
use crate::model::LyricsModel;
use crate::{Error, Result};

/// Predicted mood and the document embedding it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// Name of the winning class.
    pub label: String,
    /// Index of the winning class.
    pub class_index: usize,
    /// Raw classifier scores, one per class.
    pub logits: Vec<f32>,
    /// Pooled document embedding, `hidden_size` wide.
    pub embedding: Vec<f32>,
}

/// Runs text through a [`LyricsModel`] and names the result.
///
/// Holds no state between calls. `predict` is a pure function of the text
/// and the model's weights.
#[derive(Debug)]
pub struct MoodPredictor {
    model: LyricsModel,
    labels: LabelSet,
}

impl MoodPredictor {
    /// Pair a model with the names of its classes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::LabelCountMismatch`] when `labels` does not
    /// have one name per classifier output.
    pub fn new(model: LyricsModel, labels: LabelSet) -> Result<Self> {
        let expected = model.config().num_labels;
        if labels.len() != expected {
            return Err(ConfigError::LabelCountMismatch {
                expected,
                actual: labels.len(),
            }
            .into());
        }
        Ok(Self { model, labels })
    }

    /// The wrapped model.
    #[must_use]
    pub fn model(&self) -> &LyricsModel {
        &self.model
    }

    /// Class names, in index order.
    #[must_use]
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Classify one document.
    ///
    /// Dropout is off. Long texts are split into overlapping windows and
    /// their summaries pooled.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyInput`] for empty or whitespace-only text. The encoder
    ///   is not called.
    /// - [`Error::DegenerateChunking`] when the text tokenizes to nothing.
    /// - [`Error::DegenerateLogits`] when the classifier emits NaN.
    pub fn predict(&self, text: &str) -> Result<Prediction> {
        if text.trim().is_empty() {
            return Err(Error::EmptyInput);
        }
        let ids = self.model.tokenize(text)?;
        let embedding = self.model.embed_ids(&ids)?;
        let logits = self.model.classify(&embedding, Mode::Inference)?;
        let class_index = argmax(&logits)?;
        let label = self.labels.name(class_index)?.to_string();

        Ok(Prediction {
            label,
            class_index,
            logits,
            embedding,
        })
    }
}
