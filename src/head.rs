//! Classification head: dropout, then an affine map to class logits.
//!
//! ```text
//! embedding [hidden]  --dropout(0.3, training only)-->  W·x + b  -->  logits [num_labels]
//! ```
//!
//! The head's weights live in their own [`VarMap`], so they persist as one
//! safetensors file independent of the encoder.

use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::{Dropout, Linear, Module, VarBuilder, VarMap};

use crate::{Error, Result};

/// Dropout probability applied to the embedding in training mode.
pub const DROPOUT_PROB: f32 = 0.3;

const PREFIX: &str = "classifier";

/// Whether regularization is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Dropout on.
    Training,
    /// Dropout is the identity.
    Inference,
}

/// Linear classifier over document embeddings.
pub struct ClassificationHead {
    varmap: VarMap,
    linear: Linear,
    dropout: Dropout,
    hidden_size: usize,
    num_labels: usize,
    device: Device,
}

impl ClassificationHead {
    /// A randomly initialized head.
    ///
    /// # Errors
    ///
    /// Returns a tensor error if the weights cannot be allocated on `device`.
    pub fn new(hidden_size: usize, num_labels: usize, device: &Device) -> Result<Self> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let linear = candle_nn::linear(hidden_size, num_labels, vb.pp(PREFIX))?;
        Ok(Self {
            varmap,
            linear,
            dropout: Dropout::new(DROPOUT_PROB),
            hidden_size,
            num_labels,
            device: device.clone(),
        })
    }

    /// Input width.
    #[must_use]
    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Output width.
    #[must_use]
    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    /// Logits for a batch of embeddings, shape `[batch, hidden]`.
    ///
    /// # Errors
    ///
    /// Returns a tensor error on a shape mismatch.
    pub fn forward(&self, embeddings: &Tensor, mode: Mode) -> Result<Tensor> {
        let xs = self.dropout.forward(embeddings, mode == Mode::Training)?;
        Ok(self.linear.forward(&xs)?)
    }

    /// Logits for one embedding.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SummaryWidth`] when `embedding` is not `hidden_size`
    /// wide.
    pub fn classify(&self, embedding: &[f32], mode: Mode) -> Result<Vec<f32>> {
        if embedding.len() != self.hidden_size {
            return Err(Error::SummaryWidth {
                expected: self.hidden_size,
                actual: embedding.len(),
            });
        }
        let xs = Tensor::from_slice(embedding, (1, self.hidden_size), &self.device)?;
        Ok(self.forward(&xs, mode)?.squeeze(0)?.to_vec1::<f32>()?)
    }

    /// Weight matrix `[num_labels, hidden]` and bias `[num_labels]`.
    ///
    /// # Errors
    ///
    /// Returns a tensor error if the values cannot be copied to the host.
    pub fn weights(&self) -> Result<(Vec<Vec<f32>>, Vec<f32>)> {
        let weight = self.linear.weight().to_vec2::<f32>()?;
        let bias = match self.linear.bias() {
            Some(bias) => bias.to_vec1::<f32>()?,
            None => vec![0.0; self.num_labels],
        };
        Ok((weight, bias))
    }

    /// Write the weights to a safetensors file.
    ///
    /// # Errors
    ///
    /// Returns a tensor error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.varmap.save(path)?;
        Ok(())
    }

    /// Overwrite the weights in place from a safetensors file.
    ///
    /// # Errors
    ///
    /// Returns a tensor error if the file is unreadable or its shapes do not
    /// match this head.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        self.varmap.load(path)?;
        Ok(())
    }
}

impl std::fmt::Debug for ClassificationHead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassificationHead")
            .field("hidden_size", &self.hidden_size)
            .field("num_labels", &self.num_labels)
            .field("dropout", &DROPOUT_PROB)
            .finish_non_exhaustive()
    }
}

/// Index of the largest logit. Ties go to the lowest index.
///
/// # Errors
///
/// Returns [`Error::DegenerateLogits`] if any logit is NaN, and
/// [`Error::LabelOutOfRange`] for an empty slice.
///
/// ```rust
/// use lyricmood::argmax;
///
/// assert_eq!(argmax(&[0.5, 2.0, 2.0, -1.0]).unwrap(), 1);
/// assert!(argmax(&[0.5, f32::NAN]).is_err());
/// ```
pub fn argmax(logits: &[f32]) -> Result<usize> {
    if logits.is_empty() {
        return Err(Error::LabelOutOfRange { index: 0, len: 0 });
    }
    if let Some(index) = logits.iter().position(|v| v.is_nan()) {
        return Err(Error::DegenerateLogits { index });
    }
    let mut best = 0;
    for (i, &value) in logits.iter().enumerate().skip(1) {
        if value > logits[best] {
            best = i;
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_ties_take_lowest() {
        assert_eq!(argmax(&[1.0, 1.0, 1.0]).unwrap(), 0);
        assert_eq!(argmax(&[-3.0, 7.0, 2.0, 7.0]).unwrap(), 1);
        assert_eq!(argmax(&[f32::NEG_INFINITY, f32::NEG_INFINITY]).unwrap(), 0);
    }

    #[test]
    fn test_argmax_rejects_nan_and_empty() {
        assert!(matches!(
            argmax(&[0.0, 1.0, f32::NAN]),
            Err(Error::DegenerateLogits { index: 2 })
        ));
        assert!(argmax(&[]).is_err());
    }

    #[test]
    fn test_shapes() {
        let head = ClassificationHead::new(8, 3, &Device::Cpu).unwrap();
        let logits = head.classify(&[0.5; 8], Mode::Inference).unwrap();
        assert_eq!(logits.len(), 3);

        let (weight, bias) = head.weights().unwrap();
        assert_eq!(weight.len(), 3);
        assert_eq!(weight[0].len(), 8);
        assert_eq!(bias.len(), 3);

        assert!(matches!(
            head.classify(&[0.5; 7], Mode::Inference),
            Err(Error::SummaryWidth {
                expected: 8,
                actual: 7
            })
        ));
    }

    #[test]
    fn test_inference_mode_is_deterministic() {
        let head = ClassificationHead::new(64, 4, &Device::Cpu).unwrap();
        let embedding: Vec<f32> = (0..64).map(|i| i as f32 / 10.0).collect();
        let a = head.classify(&embedding, Mode::Inference).unwrap();
        let b = head.classify(&embedding, Mode::Inference).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_training_mode_drops_features() {
        let head = ClassificationHead::new(4, 2, &Device::Cpu).unwrap();
        let xs = Tensor::ones((1, 2048), DType::F32, &Device::Cpu).unwrap();
        let dropped = head
            .dropout
            .forward(&xs, true)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1::<f32>()
            .unwrap();
        assert!(dropped.iter().any(|&v| v == 0.0));

        let kept = head
            .dropout
            .forward(&xs, false)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1::<f32>()
            .unwrap();
        assert!(kept.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classifier.safetensors");

        let trained = ClassificationHead::new(16, 5, &Device::Cpu).unwrap();
        trained.save(&path).unwrap();

        let mut restored = ClassificationHead::new(16, 5, &Device::Cpu).unwrap();
        assert_ne!(restored.weights().unwrap(), trained.weights().unwrap());
        restored.load(&path).unwrap();
        assert_eq!(restored.weights().unwrap(), trained.weights().unwrap());
    }

    #[test]
    fn test_load_rejects_wrong_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classifier.safetensors");
        ClassificationHead::new(16, 5, &Device::Cpu)
            .unwrap()
            .save(&path)
            .unwrap();

        let mut other = ClassificationHead::new(16, 3, &Device::Cpu).unwrap();
        assert!(other.load(&path).is_err());
    }
}
