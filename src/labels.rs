//! Class index ↔ mood name mapping.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ConfigError;
use crate::{Error, Result};

/// The seven moods the shipped models are trained on, in class-index order.
pub const MOODS: [&str; 7] = [
    "selfdetermination",
    "heartbroken",
    "aggressive",
    "loneliness",
    "lovemaking",
    "perseverance",
    "party",
];

/// Ordered, duplicate-free set of class names.
///
/// Cheap to clone; clones share storage.
///
/// ```rust
/// use lyricmood::LabelSet;
///
/// let labels = LabelSet::moods();
/// assert_eq!(labels.name(1).unwrap(), "heartbroken");
/// assert_eq!(labels.index("party"), Some(6));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    names: Arc<[String]>,
    by_name: Arc<HashMap<String, usize>>,
}

impl LabelSet {
    /// Build a label set. Position in `names` is the class index.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyLabelSet`] or
    /// [`ConfigError::DuplicateLabel`].
    pub fn new<I, S>(names: I) -> std::result::Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(ConfigError::EmptyLabelSet);
        }
        let mut by_name = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if by_name.insert(name.clone(), i).is_some() {
                return Err(ConfigError::DuplicateLabel(name.clone()));
            }
        }
        Ok(Self {
            names: names.into(),
            by_name: Arc::new(by_name),
        })
    }

    /// The seven source moods.
    #[must_use]
    pub fn moods() -> Self {
        Self {
            names: MOODS.iter().map(|s| (*s).to_string()).collect(),
            by_name: Arc::new(
                MOODS
                    .iter()
                    .enumerate()
                    .map(|(i, s)| ((*s).to_string(), i))
                    .collect(),
            ),
        }
    }

    /// Name of a class index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LabelOutOfRange`] for an unknown index.
    pub fn name(&self, index: usize) -> Result<&str> {
        self.names
            .get(index)
            .map(String::as_str)
            .ok_or(Error::LabelOutOfRange {
                index,
                len: self.names.len(),
            })
    }

    /// Class index of a name.
    #[must_use]
    pub fn index(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Number of classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Never true for a constructed set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in index order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bidirectional() {
        let labels = LabelSet::new(["a", "b", "c"]).unwrap();
        for (i, name) in labels.iter().enumerate() {
            assert_eq!(labels.index(name), Some(i));
            assert_eq!(labels.name(i).unwrap(), name);
        }
        assert!(labels.name(3).is_err());
        assert_eq!(labels.index("d"), None);
    }

    #[test]
    fn test_moods_order() {
        let labels = LabelSet::moods();
        assert_eq!(labels.len(), 7);
        assert_eq!(labels.name(0).unwrap(), "selfdetermination");
        assert_eq!(labels.name(6).unwrap(), "party");
    }

    #[test]
    fn test_rejects_empty_and_duplicates() {
        assert_eq!(
            LabelSet::new(Vec::<String>::new()).unwrap_err(),
            ConfigError::EmptyLabelSet
        );
        assert_eq!(
            LabelSet::new(["x", "y", "x"]).unwrap_err(),
            ConfigError::DuplicateLabel("x".into())
        );
    }
}
