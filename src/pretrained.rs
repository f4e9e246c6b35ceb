//! Pretrained transformer families on candle.
//!
//! | Identifier | Hub repo | Boundary tokens | Summary |
//! |------------|----------|-----------------|---------|
//! | `distilbert-base-multilingual-cased` | `distilbert/distilbert-base-multilingual-cased` | `[CLS]` `[SEP]` | position 0 |
//! | `bert-base-multilingual-cased` | `google-bert/bert-base-multilingual-cased` | `[CLS]` `[SEP]` | position 0 |
//! | `xlm-roberta-base` | `FacebookAI/xlm-roberta-base` | `<s>` `</s>` | position 0 |
//! | `xlm-roberta-large` | `FacebookAI/xlm-roberta-large` | `<s>` `</s>` | position 0 |
//!
//! On disk a family is the encoder's `config.json` + `model.safetensors`
//! and the tokenizer's `tokenizer.json` (+ optional `tokenizer_config.json`),
//! either in two subtrees or together in one directory. These are the files
//! the Hub publishes, so a checkpoint written flat by another tool in the
//! same format (for example a domain-adapted encoder) loads the same way.

use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::{bert, distilbert, xlm_roberta};
use serde::Deserialize;
use tokenizers::Tokenizer;

use crate::backbone::{
    require_artifact, Backbone, BackboneFactory, BackboneSource, Encoder, SummaryConvention,
    TextTokenizer,
};
use crate::chunk::SpecialTokens;
use crate::config::ConfigError;
use crate::registry::EncoderRegistry;
use crate::{Error, Result};

/// Encoder config file name.
pub const CONFIG_FILE: &str = "config.json";
/// Encoder weight file name.
pub const WEIGHTS_FILE: &str = "model.safetensors";
/// Tokenizer file name.
pub const TOKENIZER_FILE: &str = "tokenizer.json";
/// Optional tokenizer settings file name.
pub const TOKENIZER_CONFIG_FILE: &str = "tokenizer_config.json";

/// Fallback when `tokenizer_config.json` does not pin a maximum length.
const DEFAULT_MAX_LENGTH: usize = 512;

/// Hugging Face writes a huge sentinel for "no limit".
const UNBOUNDED_MAX_LENGTH: usize = 1_000_000;

/// Transformer architecture behind a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    /// BERT.
    Bert,
    /// DistilBERT.
    DistilBert,
    /// XLM-RoBERTa.
    XlmRoberta,
}

impl Architecture {
    /// Weight-name prefix used by task-specific checkpoints.
    fn checkpoint_prefix(self) -> &'static str {
        match self {
            Self::Bert => "bert",
            Self::DistilBert => "distilbert",
            Self::XlmRoberta => "roberta",
        }
    }

    fn boundary_tokens(self) -> (&'static str, &'static str) {
        match self {
            Self::Bert | Self::DistilBert => ("[CLS]", "[SEP]"),
            Self::XlmRoberta => ("<s>", "</s>"),
        }
    }
}

/// One built-in family.
#[derive(Debug, Clone, Copy)]
pub struct PretrainedFamily {
    /// Hub repository holding the published weights.
    pub repo: &'static str,
    /// Model architecture.
    pub architecture: Architecture,
}

const FAMILIES: [(&str, PretrainedFamily); 4] = [
    (
        "distilbert-base-multilingual-cased",
        PretrainedFamily {
            repo: "distilbert/distilbert-base-multilingual-cased",
            architecture: Architecture::DistilBert,
        },
    ),
    (
        "bert-base-multilingual-cased",
        PretrainedFamily {
            repo: "google-bert/bert-base-multilingual-cased",
            architecture: Architecture::Bert,
        },
    ),
    (
        "xlm-roberta-base",
        PretrainedFamily {
            repo: "FacebookAI/xlm-roberta-base",
            architecture: Architecture::XlmRoberta,
        },
    ),
    (
        "xlm-roberta-large",
        PretrainedFamily {
            repo: "FacebookAI/xlm-roberta-large",
            architecture: Architecture::XlmRoberta,
        },
    ),
];

pub(crate) fn register_builtin(registry: &mut EncoderRegistry) {
    for (identifier, family) in FAMILIES {
        registry.register(identifier, family);
    }
}

impl BackboneFactory for PretrainedFamily {
    fn load(&self, source: BackboneSource<'_>, device: &Device) -> Result<Backbone> {
        let files = match source {
            BackboneSource::Pretrained => ModelFiles::download(self.repo)?,
            BackboneSource::Directory { encoder, tokenizer } => {
                ModelFiles::in_dirs(encoder, tokenizer)?
            }
        };

        let encoder = CandleEncoder::load(&files, self.architecture, device)?;
        let tokenizer = HfTokenizer::load(&files, self.architecture, encoder.capacity)?;
        log::debug!(
            "loaded {} ({:?}, hidden {}, max length {})",
            self.repo,
            self.architecture,
            encoder.hidden_size,
            tokenizer.max_length
        );

        Ok(Backbone {
            tokenizer: Box::new(tokenizer),
            encoder: Box::new(encoder),
            summary: SummaryConvention::FirstToken,
        })
    }
}

/// Resolved paths to one family's files.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    /// Encoder `config.json`.
    pub config: PathBuf,
    /// Encoder `model.safetensors`.
    pub weights: PathBuf,
    /// `tokenizer.json`.
    pub tokenizer: PathBuf,
    /// `tokenizer_config.json`, when present.
    pub tokenizer_config: Option<PathBuf>,
}

impl ModelFiles {
    /// Fetch from the Hugging Face Hub, using the local cache when warm.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Download`] on any Hub failure.
    pub fn download(repo: &str) -> Result<Self> {
        let failed = |e: hf_hub::api::sync::ApiError| Error::Download {
            repo: repo.to_string(),
            message: e.to_string(),
        };
        let api = hf_hub::api::sync::Api::new().map_err(failed)?;
        let hub = api.model(repo.to_string());

        Ok(Self {
            config: hub.get(CONFIG_FILE).map_err(failed)?,
            weights: hub.get(WEIGHTS_FILE).map_err(failed)?,
            tokenizer: hub.get(TOKENIZER_FILE).map_err(failed)?,
            tokenizer_config: hub.get(TOKENIZER_CONFIG_FILE).ok(),
        })
    }

    /// Locate files in saved encoder and tokenizer subtrees.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArtifact`] for an absent required file.
    pub fn in_dirs(encoder: &Path, tokenizer: &Path) -> Result<Self> {
        let config = encoder.join(CONFIG_FILE);
        let weights = encoder.join(WEIGHTS_FILE);
        let tokenizer_file = tokenizer.join(TOKENIZER_FILE);
        require_artifact("encoder config", &config)?;
        require_artifact("encoder weights", &weights)?;
        require_artifact("tokenizer", &tokenizer_file)?;

        let tokenizer_config = tokenizer.join(TOKENIZER_CONFIG_FILE);
        Ok(Self {
            config,
            weights,
            tokenizer: tokenizer_file,
            tokenizer_config: tokenizer_config.exists().then_some(tokenizer_config),
        })
    }
}

/// The handful of config fields every architecture needs.
#[derive(Debug, Deserialize)]
struct EncoderDims {
    #[serde(alias = "dim")]
    hidden_size: usize,
    max_position_embeddings: usize,
    #[serde(default)]
    pad_token_id: Option<usize>,
}

impl EncoderDims {
    /// Longest window the position embeddings can address.
    fn capacity(&self, architecture: Architecture) -> usize {
        match architecture {
            Architecture::Bert | Architecture::DistilBert => self.max_position_embeddings,
            // RoBERTa positions start after the padding index.
            Architecture::XlmRoberta => self
                .max_position_embeddings
                .saturating_sub(self.pad_token_id.unwrap_or(1) + 1),
        }
    }
}

enum Model {
    Bert(bert::BertModel),
    DistilBert(distilbert::DistilBertModel),
    XlmRoberta(xlm_roberta::XLMRobertaModel),
}

/// Candle transformer encoder loaded from safetensors.
pub struct CandleEncoder {
    model: Model,
    hidden_size: usize,
    capacity: usize,
    files: ModelFiles,
}

impl CandleEncoder {
    /// Load weights onto `device`.
    ///
    /// # Errors
    ///
    /// Returns I/O, JSON, or tensor errors.
    pub fn load(files: &ModelFiles, architecture: Architecture, device: &Device) -> Result<Self> {
        let config_text =
            std::fs::read_to_string(&files.config).map_err(|e| Error::io(&files.config, e))?;
        let dims: EncoderDims = serde_json::from_str(&config_text)?;

        let tensors = candle_core::safetensors::load(&files.weights, device)?;
        let vb = VarBuilder::from_tensors(tensors, DType::F32, device);
        let prefix = architecture.checkpoint_prefix();
        let vb = if vb.contains_tensor(&format!("{prefix}.embeddings.word_embeddings.weight")) {
            vb.pp(prefix)
        } else {
            vb
        };

        let model = match architecture {
            Architecture::Bert => {
                let config: bert::Config = serde_json::from_str(&config_text)?;
                Model::Bert(bert::BertModel::load(vb, &config)?)
            }
            Architecture::DistilBert => {
                let config: distilbert::Config = serde_json::from_str(&config_text)?;
                Model::DistilBert(distilbert::DistilBertModel::load(vb, &config)?)
            }
            Architecture::XlmRoberta => {
                let config: xlm_roberta::Config = serde_json::from_str(&config_text)?;
                Model::XlmRoberta(xlm_roberta::XLMRobertaModel::new(&config, vb)?)
            }
        };

        Ok(Self {
            model,
            hidden_size: dims.hidden_size,
            capacity: dims.capacity(architecture),
            files: files.clone(),
        })
    }
}

impl Encoder for CandleEncoder {
    fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    fn forward(&self, input_ids: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let hidden = match &self.model {
            Model::Bert(model) => {
                let token_type_ids = input_ids.zeros_like()?;
                model.forward(input_ids, &token_type_ids, Some(attention_mask))?
            }
            Model::DistilBert(model) => {
                // DistilBERT masks where the mask is 1, the inverse of attention_mask.
                let padding = attention_mask.eq(0u32)?;
                model.forward(input_ids, &padding)?
            }
            Model::XlmRoberta(model) => {
                let token_type_ids = input_ids.zeros_like()?;
                model.forward(input_ids, attention_mask, &token_type_ids, None, None, None)?
            }
        };
        Ok(hidden)
    }

    fn save(&self, dir: &Path) -> Result<()> {
        copy_into(&self.files.config, &dir.join(CONFIG_FILE))?;
        copy_into(&self.files.weights, &dir.join(WEIGHTS_FILE))
    }
}

/// `tokenizers` tokenizer with family boundary tokens.
pub struct HfTokenizer {
    inner: Tokenizer,
    special: SpecialTokens,
    max_length: usize,
    settings: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct TokenizerSettings {
    #[serde(default)]
    model_max_length: Option<f64>,
}

impl HfTokenizer {
    /// Load `tokenizer.json`, capping the maximum length at `capacity`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tokenizer`] if the file does not parse, or
    /// [`ConfigError::MissingSpecialToken`] if the vocabulary lacks the
    /// family's boundary tokens.
    pub fn load(files: &ModelFiles, architecture: Architecture, capacity: usize) -> Result<Self> {
        let mut inner =
            Tokenizer::from_file(&files.tokenizer).map_err(|e| Error::Tokenizer(e.to_string()))?;
        // Windows are cut by the splitter, never by the tokenizer.
        inner
            .with_truncation(None)
            .map_err(|e| Error::Tokenizer(e.to_string()))?;
        inner.with_padding(None);

        let (start, end) = architecture.boundary_tokens();
        let special = SpecialTokens {
            start: inner
                .token_to_id(start)
                .ok_or(ConfigError::MissingSpecialToken(start))?,
            end: inner
                .token_to_id(end)
                .ok_or(ConfigError::MissingSpecialToken(end))?,
        };

        let configured = match &files.tokenizer_config {
            Some(path) => read_max_length(path)?,
            None => None,
        };

        Ok(Self {
            inner,
            special,
            max_length: configured.unwrap_or(DEFAULT_MAX_LENGTH).min(capacity),
            settings: files.tokenizer_config.clone(),
        })
    }
}

fn read_max_length(path: &Path) -> Result<Option<usize>> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let settings: TokenizerSettings = serde_json::from_str(&text)?;
    Ok(settings
        .model_max_length
        .filter(|&n| n >= 1.0 && n < UNBOUNDED_MAX_LENGTH as f64)
        .map(|n| n as usize))
}

impl TextTokenizer for HfTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| Error::Tokenizer(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn special_tokens(&self) -> SpecialTokens {
        self.special
    }

    fn max_length(&self) -> usize {
        self.max_length
    }

    fn save(&self, dir: &Path) -> Result<()> {
        let path = dir.join(TOKENIZER_FILE);
        self.inner
            .save(&path, false)
            .map_err(|e| Error::Tokenizer(format!("{}: {e}", path.display())))?;

        let settings_path = dir.join(TOKENIZER_CONFIG_FILE);
        match &self.settings {
            Some(source) => copy_into(source, &settings_path),
            None => {
                let body = serde_json::json!({ "model_max_length": self.max_length });
                std::fs::write(&settings_path, body.to_string())
                    .map_err(|e| Error::io(&settings_path, e))
            }
        }
    }
}

/// Copy `from` to `to` unless both name the same file.
fn copy_into(from: &Path, to: &Path) -> Result<()> {
    if let (Ok(a), Ok(b)) = (from.canonicalize(), to.canonicalize()) {
        if a == b {
            return Ok(());
        }
    }
    std::fs::copy(from, to).map_err(|e| Error::io(to, e))?;
    Ok(())
}
