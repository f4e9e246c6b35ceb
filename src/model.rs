//! Model lifecycle: construct, save, restore.
//!
//! ## Directory Layout
//!
//! ```text
//! <model_dir>/
//!   encoder/                   encoder-native weights and config    (required)
//!   tokenizer/                 tokenizer-native vocabulary/settings (required)
//!   classifier.safetensors     classification head weights          (optional)
//! ```
//!
//! The three parts persist independently. An encoder-only checkpoint, such
//! as one from a domain-adaptation run that never trained a head, has no
//! classifier file. Restoring it still works; the head stays randomly
//! initialized and a warning is logged.
//!
//! Such checkpoints are usually written flat, with encoder and tokenizer
//! files side by side at the root:
//!
//! ```text
//! <model_dir>/
//!   config.json  model.safetensors  tokenizer.json  ...
//! ```
//!
//! A directory with neither `encoder/` nor `tokenizer/` is read that way.
//!
//! ## Two Phases
//!
//! Restoring is build-then-patch:
//!
//! ```text
//! construct(config, source = model_dir)   shape-correct scaffold, fresh random head
//!        │
//!        ▼
//! restore_classifier(model_dir)           overwrite head if the file exists
//!        │                                else keep random head + warn
//!        ▼
//! LyricsModel
//! ```
//!
//! [`LyricsModel::restore`] runs both. Each phase is public on its own, so
//! the fallback can be exercised without an encoder checkpoint.

use std::path::{Path, PathBuf};

use candle_core::{Device, Tensor};

use crate::backbone::{Backbone, BackboneSource};
use crate::config::LyricsConfig;
use crate::head::{ClassificationHead, Mode};
use crate::registry::EncoderRegistry;
use crate::window::SlidingWindow;
use crate::{Error, Result};

/// Encoder subtree name inside a model directory.
pub const ENCODER_DIR: &str = "encoder";
/// Tokenizer subtree name inside a model directory.
pub const TOKENIZER_DIR: &str = "tokenizer";
/// Classifier weight file name inside a model directory.
pub const CLASSIFIER_FILE: &str = "classifier.safetensors";

/// Where a model's classifier weights came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierState {
    /// Random initialization.
    RandomInit,
    /// Loaded from a classifier artifact.
    Restored,
}

/// Paths of the three artifacts under a model directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelLayout {
    root: PathBuf,
}

impl ModelLayout {
    /// Layout rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The model directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Encoder subtree.
    #[must_use]
    pub fn encoder(&self) -> PathBuf {
        self.root.join(ENCODER_DIR)
    }

    /// Tokenizer subtree.
    #[must_use]
    pub fn tokenizer(&self) -> PathBuf {
        self.root.join(TOKENIZER_DIR)
    }

    /// Classifier weight file.
    #[must_use]
    pub fn classifier(&self) -> PathBuf {
        self.root.join(CLASSIFIER_FILE)
    }

    /// Encoder and tokenizer directories to load from.
    ///
    /// With neither subtree present the root holds both (flat layout).
    #[must_use]
    pub fn backbone_dirs(&self) -> (PathBuf, PathBuf) {
        let (encoder, tokenizer) = (self.encoder(), self.tokenizer());
        if encoder.exists() || tokenizer.exists() {
            (encoder, tokenizer)
        } else {
            (self.root.clone(), self.root.clone())
        }
    }
}

/// Encoder, tokenizer, and classification head for one configuration.
pub struct LyricsModel {
    config: LyricsConfig,
    splitter: SlidingWindow,
    backbone: Backbone,
    head: ClassificationHead,
    classifier_state: ClassifierState,
    device: Device,
}

impl LyricsModel {
    /// Build a model with a freshly initialized classifier.
    ///
    /// Resolves the encoder identifier, loads the family's tokenizer and
    /// encoder from `source`, checks the window fits the tokenizer, and draws
    /// a random head of shape `hidden_size × num_labels`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`](crate::ConfigError) for an invalid or
    /// unsupported configuration, and the factory's error if loading fails.
    pub fn construct(
        config: LyricsConfig,
        registry: &EncoderRegistry,
        source: BackboneSource<'_>,
        device: &Device,
    ) -> Result<Self> {
        config.validate()?;
        let splitter = SlidingWindow::from_config(&config)?;
        let factory = registry.resolve(&config.encoder)?;

        let backbone = factory.load(source, device)?;
        config.check_capacity(backbone.tokenizer.max_length())?;

        let head = ClassificationHead::new(
            backbone.encoder.hidden_size(),
            config.num_labels,
            device,
        )?;

        log::info!(
            "constructed {} (hidden {}, {} labels, window {}/{}, {} pooling)",
            config.encoder,
            backbone.encoder.hidden_size(),
            config.num_labels,
            config.chunk_size,
            config.stride,
            config.pooling()
        );

        Ok(Self {
            config,
            splitter,
            backbone,
            head,
            classifier_state: ClassifierState::RandomInit,
            device: device.clone(),
        })
    }

    /// Build from the family's published pretrained weights.
    ///
    /// # Errors
    ///
    /// See [`construct`](Self::construct).
    pub fn pretrained(
        config: LyricsConfig,
        registry: &EncoderRegistry,
        device: &Device,
    ) -> Result<Self> {
        Self::construct(config, registry, BackboneSource::Pretrained, device)
    }

    /// Load a model saved with [`save`](Self::save).
    ///
    /// The encoder and tokenizer subtrees are required, unless both are
    /// absent and their files sit directly in `dir`. A missing classifier
    /// file leaves the head randomly initialized.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingModelDirectory`] when `dir` does not exist,
    /// [`Error::MissingArtifact`] when a required subtree is absent, and any
    /// [`construct`](Self::construct) error.
    pub fn restore(
        dir: &Path,
        config: LyricsConfig,
        registry: &EncoderRegistry,
        device: &Device,
    ) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::MissingModelDirectory(dir.to_path_buf()));
        }
        let (encoder, tokenizer) = ModelLayout::new(dir).backbone_dirs();
        crate::backbone::require_artifact("encoder", &encoder)?;
        crate::backbone::require_artifact("tokenizer", &tokenizer)?;

        let mut model = Self::construct(
            config,
            registry,
            BackboneSource::Directory {
                encoder: &encoder,
                tokenizer: &tokenizer,
            },
            device,
        )?;
        model.restore_classifier(dir)?;
        log::info!("model restored from {}", dir.display());
        Ok(model)
    }

    /// Overwrite the head from `dir`'s classifier file, if there is one.
    ///
    /// # Errors
    ///
    /// Returns a tensor error if the file exists but does not match this
    /// head's shape. An absent file is not an error.
    pub fn restore_classifier(&mut self, dir: &Path) -> Result<ClassifierState> {
        let path = ModelLayout::new(dir).classifier();
        if path.is_file() {
            self.head.load(&path)?;
            self.classifier_state = ClassifierState::Restored;
            log::info!("classifier loaded from {}", path.display());
        } else {
            log::warn!(
                "{} not found; classifier initialized randomly",
                path.display()
            );
        }
        Ok(self.classifier_state)
    }

    /// Write encoder, tokenizer, and classifier under `dir`, creating it.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if directories cannot be created, or a backend
    /// error from any of the three writers.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let layout = ModelLayout::new(dir);
        for sub in [layout.encoder(), layout.tokenizer()] {
            std::fs::create_dir_all(&sub).map_err(|e| Error::io(&sub, e))?;
        }
        self.backbone.encoder.save(&layout.encoder())?;
        self.backbone.tokenizer.save(&layout.tokenizer())?;
        self.head.save(&layout.classifier())?;
        log::info!("model saved to {}", dir.display());
        Ok(())
    }

    /// The configuration this model was built with.
    #[must_use]
    pub fn config(&self) -> &LyricsConfig {
        &self.config
    }

    /// Width of window summaries and document embeddings.
    #[must_use]
    pub fn hidden_size(&self) -> usize {
        self.backbone.encoder.hidden_size()
    }

    /// Where the classifier weights came from.
    #[must_use]
    pub fn classifier_state(&self) -> ClassifierState {
        self.classifier_state
    }

    /// The classification head.
    #[must_use]
    pub fn head(&self) -> &ClassificationHead {
        &self.head
    }

    /// The device tensors are placed on.
    #[must_use]
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Token ids for `text`, without boundary tokens.
    ///
    /// # Errors
    ///
    /// Returns the tokenizer's error.
    pub fn tokenize(&self, text: &str) -> Result<Vec<u32>> {
        self.backbone.tokenizer.tokenize(text)
    }

    /// Document embedding for a token sequence: split, encode each window,
    /// pool the summaries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DegenerateChunking`] for an empty sequence, before
    /// the encoder is called.
    pub fn embed_ids(&self, ids: &[u32]) -> Result<Vec<f32>> {
        let windows = self.splitter.split(ids);
        if windows.is_empty() {
            return Err(Error::DegenerateChunking);
        }

        let special = self.backbone.tokenizer.special_tokens();
        let summaries = windows
            .iter()
            .map(|window| {
                let wrapped = window.wrap(special);
                let len = wrapped.len();
                let input_ids = Tensor::from_vec(wrapped.input_ids, (1, len), &self.device)?;
                let mask = Tensor::from_vec(wrapped.attention_mask, (1, len), &self.device)?;
                let hidden = self.backbone.encoder.forward(&input_ids, &mask)?;
                self.summarize(&hidden)
            })
            .collect::<Result<Vec<_>>>()?;

        log::debug!("pooled {} windows from {} tokens", summaries.len(), ids.len());
        self.config.pooling().pool(&summaries)
    }

    /// Class logits for a document embedding.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SummaryWidth`] on a width mismatch.
    pub fn classify(&self, embedding: &[f32], mode: Mode) -> Result<Vec<f32>> {
        self.head.classify(embedding, mode)
    }

    fn summarize(&self, hidden: &Tensor) -> Result<Vec<f32>> {
        let summary = self.backbone.summary.summarize(hidden)?;
        if summary.len() != self.hidden_size() {
            return Err(Error::SummaryWidth {
                expected: self.hidden_size(),
                actual: summary.len(),
            });
        }
        Ok(summary)
    }
}

impl std::fmt::Debug for LyricsModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LyricsModel")
            .field("config", &self.config)
            .field("backbone", &self.backbone)
            .field("head", &self.head)
            .field("classifier_state", &self.classifier_state)
            .finish_non_exhaustive()
    }
}
