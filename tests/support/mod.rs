//! A deterministic in-memory model family for integration tests.
//!
//! The tokenizer splits on whitespace and hashes each word to an id. The
//! encoder derives every output row from the window's ids, so different texts
//! give different embeddings and the same text always gives the same one.
#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use candle_core::{Device, Tensor};
use lyricmood::{
    require_artifact, Backbone, BackboneFactory, BackboneSource, Encoder, EncoderRegistry,
    LyricsConfig, Result, SpecialTokens, SummaryConvention, TextTokenizer,
};

pub const FAMILY: &str = "mock";
pub const HIDDEN: usize = 8;
pub const START: u32 = 0;
pub const END: u32 = 2;
const ENCODER_MARKER: &str = "mock-encoder.json";
const TOKENIZER_MARKER: &str = "mock-tokenizer.json";

/// Factory for the mock family. Clones share the call counter.
#[derive(Clone)]
pub struct MockFamily {
    pub hidden: usize,
    pub max_length: usize,
    /// When set, every encoder position returns this vector.
    pub fixed: Option<Vec<f32>>,
    /// When set, the tokenizer yields no ids for any text.
    pub drops_all_words: bool,
    pub calls: Arc<AtomicUsize>,
}

impl Default for MockFamily {
    fn default() -> Self {
        Self {
            hidden: HIDDEN,
            max_length: 512,
            fixed: None,
            drops_all_words: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl MockFamily {
    pub fn fixed(summary: Vec<f32>) -> Self {
        Self {
            hidden: summary.len(),
            fixed: Some(summary),
            ..Self::default()
        }
    }

    /// A family whose tokenizer knows no words at all.
    pub fn empty_vocabulary() -> Self {
        Self {
            drops_all_words: true,
            ..Self::default()
        }
    }

    pub fn encoder_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn registry(&self) -> EncoderRegistry {
        let mut registry = EncoderRegistry::empty();
        registry.register(FAMILY, self.clone());
        registry
    }
}

impl BackboneFactory for MockFamily {
    fn load(&self, source: BackboneSource<'_>, _device: &Device) -> Result<Backbone> {
        if let BackboneSource::Directory { encoder, tokenizer } = source {
            require_artifact("encoder", &encoder.join(ENCODER_MARKER))?;
            require_artifact("tokenizer", &tokenizer.join(TOKENIZER_MARKER))?;
        }
        Ok(Backbone {
            tokenizer: Box::new(WordTokenizer {
                max_length: self.max_length,
                drops_all_words: self.drops_all_words,
            }),
            encoder: Box::new(MockEncoder {
                hidden: self.hidden,
                fixed: self.fixed.clone(),
                calls: Arc::clone(&self.calls),
            }),
            summary: SummaryConvention::FirstToken,
        })
    }
}

pub fn config(num_labels: usize) -> LyricsConfig {
    LyricsConfig::new(num_labels)
        .with_encoder(FAMILY)
        .with_window(6, 3)
}

/// Id for a word. Never collides with the boundary ids.
pub fn word_id(word: &str) -> u32 {
    let hash = word
        .bytes()
        .fold(2_166_136_261u32, |h, b| (h ^ u32::from(b)).wrapping_mul(16_777_619));
    3 + hash % 30_000
}

struct WordTokenizer {
    max_length: usize,
    drops_all_words: bool,
}

impl TextTokenizer for WordTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<u32>> {
        if self.drops_all_words {
            return Ok(Vec::new());
        }
        Ok(text.split_whitespace().map(word_id).collect())
    }

    fn special_tokens(&self) -> SpecialTokens {
        SpecialTokens {
            start: START,
            end: END,
        }
    }

    fn max_length(&self) -> usize {
        self.max_length
    }

    fn save(&self, dir: &Path) -> Result<()> {
        std::fs::write(dir.join(TOKENIZER_MARKER), "{}").map_err(|source| {
            lyricmood::Error::Io {
                path: dir.to_path_buf(),
                source,
            }
        })
    }
}

struct MockEncoder {
    hidden: usize,
    fixed: Option<Vec<f32>>,
    calls: Arc<AtomicUsize>,
}

impl Encoder for MockEncoder {
    fn hidden_size(&self) -> usize {
        self.hidden
    }

    fn forward(&self, input_ids: &Tensor, _attention_mask: &Tensor) -> Result<Tensor> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let ids = input_ids.squeeze(0)?.to_vec1::<u32>()?;
        let row: Vec<f32> = match &self.fixed {
            Some(v) => v.clone(),
            None => (0..self.hidden)
                .map(|d| {
                    let total: u64 = ids
                        .iter()
                        .map(|&id| u64::from(id) * (d as u64 + 1) % 97)
                        .sum();
                    total as f32 / (97.0 * ids.len() as f32) - 0.5
                })
                .collect(),
        };
        let data: Vec<f32> = std::iter::repeat(row).take(ids.len()).flatten().collect();
        Ok(Tensor::from_vec(
            data,
            (1, ids.len(), self.hidden),
            input_ids.device(),
        )?)
    }

    fn save(&self, dir: &Path) -> Result<()> {
        std::fs::write(dir.join(ENCODER_MARKER), format!("{{\"hidden\":{}}}", self.hidden))
            .map_err(|source| lyricmood::Error::Io {
                path: dir.to_path_buf(),
                source,
            })
    }
}
