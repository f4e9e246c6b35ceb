//! Encoder family registry.
//!
//! Maps an encoder identifier from [`LyricsConfig`](crate::LyricsConfig) to
//! the factory that loads that family. A new family is one more
//! [`register`](EncoderRegistry::register) call.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::backbone::BackboneFactory;
use crate::config::ConfigError;

/// Identifier → factory table.
///
/// ```rust
/// use lyricmood::EncoderRegistry;
///
/// let registry = EncoderRegistry::empty();
/// assert!(registry.resolve("xlm-roberta-base").is_err());
/// ```
#[derive(Clone, Default)]
pub struct EncoderRegistry {
    families: BTreeMap<String, Arc<dyn BackboneFactory>>,
}

impl EncoderRegistry {
    /// A registry with no families.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry holding every family compiled into this build.
    ///
    /// With the `pretrained` feature: `distilbert-base-multilingual-cased`,
    /// `bert-base-multilingual-cased`, `xlm-roberta-base`, `xlm-roberta-large`.
    #[must_use]
    pub fn builtin() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::empty();
        #[cfg(feature = "pretrained")]
        crate::pretrained::register_builtin(&mut registry);
        registry
    }

    /// Add or replace a family.
    pub fn register(
        &mut self,
        identifier: impl Into<String>,
        factory: impl BackboneFactory + 'static,
    ) -> &mut Self {
        self.families.insert(identifier.into(), Arc::new(factory));
        self
    }

    /// Look up a family.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedModelFamily`] for an unknown
    /// identifier.
    pub fn resolve(&self, identifier: &str) -> Result<Arc<dyn BackboneFactory>, ConfigError> {
        self.families
            .get(identifier)
            .cloned()
            .ok_or_else(|| ConfigError::UnsupportedModelFamily(identifier.to_string()))
    }

    /// Registered identifiers, sorted.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.families.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for EncoderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.identifiers()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backbone::{Backbone, BackboneSource};
    use crate::{Error, Result};
    use candle_core::Device;

    struct Unloadable;

    impl BackboneFactory for Unloadable {
        fn load(&self, _source: BackboneSource<'_>, _device: &Device) -> Result<Backbone> {
            Err(Error::Tokenizer("not a real family".into()))
        }
    }

    #[test]
    fn test_unknown_identifier() {
        let registry = EncoderRegistry::empty();
        let err = registry.resolve("gpt-17").err().unwrap();
        assert_eq!(err, ConfigError::UnsupportedModelFamily("gpt-17".into()));
        assert_eq!(err.to_string(), "unsupported model family: gpt-17");
    }

    #[test]
    fn test_register_and_list() {
        let mut registry = EncoderRegistry::empty();
        registry.register("zeta", Unloadable).register("alpha", Unloadable);
        assert!(registry.resolve("zeta").is_ok());
        assert_eq!(registry.identifiers().collect::<Vec<_>>(), vec!["alpha", "zeta"]);
    }

    #[cfg(feature = "pretrained")]
    #[test]
    fn test_builtin_families() {
        let registry = EncoderRegistry::builtin();
        for id in [
            "distilbert-base-multilingual-cased",
            "bert-base-multilingual-cased",
            "xlm-roberta-base",
            "xlm-roberta-large",
        ] {
            assert!(registry.resolve(id).is_ok(), "{id} not registered");
        }
    }
}
