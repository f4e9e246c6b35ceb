//! # lyricmood
//!
//! Mood classification of song lyrics with a transformer encoder.
//!
//! ## The Problem
//!
//! Transformer encoders accept a fixed number of tokens, typically 512. Song
//! lyrics often run past that. Truncating throws away the second verse and
//! every chorus after it, which is usually where the mood lives.
//!
//! So the document is cut into overlapping windows, each window is encoded on
//! its own, and the per-window summaries are pooled into one fixed-size
//! embedding. A linear head turns that embedding into one score per mood.
//!
//! ## The Pipeline
//!
//! ```text
//! text ──tokenize──▶ ids [t0 … tN-1]
//!                      │
//!                      ▼  SlidingWindow { chunk_size, stride }
//!        [t0 … t509] [t256 … t765] [t512 … t999] …
//!                      │
//!                      ▼  wrap: <s> content </s>, mask all ones
//!                   encoder (once per window)
//!                      │
//!                      ▼  summary = output at position 0
//!              s0      s1      s2   …
//!                      │
//!                      ▼  pool: element-wise max (or mean)
//!                  embedding [hidden_size]
//!                      │
//!                      ▼  dropout (training only) → linear
//!                   logits [num_labels] ──argmax──▶ label
//! ```
//!
//! Every token lands in at least one window. With `stride < chunk_size`
//! neighbouring windows share `chunk_size - stride` tokens, so a phrase cut
//! at one window's edge is whole in the next.
//!
//! ## Max or Mean?
//!
//! | Pooling | Keeps | Good for |
//! |---------|-------|----------|
//! | Max | strongest activation per dimension | a mood carried by one section |
//! | Mean | average over windows | a mood spread evenly |
//!
//! Both are invariant to the order of windows. Max is the default.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lyricmood::{EncoderRegistry, LabelSet, LyricsConfig, LyricsModel, MoodPredictor};
//!
//! let device = candle_core::Device::Cpu;
//! let registry = EncoderRegistry::builtin();
//! let model = LyricsModel::restore(dir, LyricsConfig::default(), &registry, &device)?;
//! let predictor = MoodPredictor::new(model, LabelSet::moods())?;
//!
//! let prediction = predictor.predict(lyrics)?;
//! println!("{} ({} dims)", prediction.label, prediction.embedding.len());
//! ```
//!
//! ## Model Families
//!
//! The encoder is reached only through the [`TextTokenizer`] and [`Encoder`]
//! traits. With the `pretrained` feature the [`EncoderRegistry::builtin`]
//! registry knows four candle-backed families:
//!
//! | Identifier | Boundary tokens | Hidden |
//! |------------|-----------------|--------|
//! | `distilbert-base-multilingual-cased` | `[CLS]` / `[SEP]` | 768 |
//! | `bert-base-multilingual-cased` | `[CLS]` / `[SEP]` | 768 |
//! | `xlm-roberta-base` | `<s>` / `</s>` | 768 |
//! | `xlm-roberta-large` | `<s>` / `</s>` | 1024 |
//!
//! Other backends register their own [`BackboneFactory`].

mod backbone;
mod chunk;
mod config;
mod device;
mod error;
mod head;
mod labels;
mod model;
mod pool;
mod predict;
mod registry;
mod window;

pub mod corpus;

#[cfg(feature = "pretrained")]
pub mod pretrained;

pub use backbone::{
    require_artifact, Backbone, BackboneFactory, BackboneSource, Encoder, SummaryConvention,
    TextTokenizer,
};
pub use chunk::{SpecialTokens, TokenWindow, WrappedWindow};
pub use config::{ConfigError, LyricsConfig, BOUNDARY_TOKENS, DEFAULT_ENCODER};
pub use device::DeviceChoice;
pub use error::{Error, Result};
pub use head::{argmax, ClassificationHead, Mode, DROPOUT_PROB};
pub use labels::{LabelSet, MOODS};
pub use model::{
    ClassifierState, LyricsModel, ModelLayout, CLASSIFIER_FILE, ENCODER_DIR, TOKENIZER_DIR,
};
pub use pool::Pooling;
pub use predict::{MoodPredictor, Prediction};
pub use registry::EncoderRegistry;
pub use window::SlidingWindow;
