//! Token windows: bounded slices of a token-id sequence.

/// Boundary token ids injected around every window.
///
/// BERT-style vocabularies use `[CLS]`/`[SEP]`, XLM-R uses `<s>`/`</s>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTokens {
    /// Start-of-sequence id, prepended.
    pub start: u32,
    /// End-of-sequence id, appended.
    pub end: u32,
}

/// A window of content token ids with its position in the source sequence.
///
/// `start` and `end` are token offsets into the full sequence (end
/// exclusive). Adjacent windows overlap whenever the stride is smaller than
/// the window size:
///
/// ```text
/// ids:       t0 t1 t2 t3 t4 t5 t6
/// window 0:  t0 t1 t2 t3            [0..4]
/// window 1:        t2 t3 t4 t5      [2..6]  <- overlaps window 0 on [2..4]
/// window 2:              t4 t5 t6   [4..7]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenWindow {
    /// Content ids, without boundary tokens.
    pub content: Vec<u32>,
    /// Offset of the first id in the source sequence.
    pub start: usize,
    /// Offset one past the last id.
    pub end: usize,
    /// Zero-based position of this window in the sequence of windows.
    pub index: usize,
}

impl TokenWindow {
    /// Create a new window.
    #[must_use]
    pub fn new(content: impl Into<Vec<u32>>, start: usize, end: usize, index: usize) -> Self {
        Self {
            content: content.into(),
            start,
            end,
            index,
        }
    }

    /// Number of content ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Whether the window holds no content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// The offset range this window covers.
    #[must_use]
    pub fn span(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }

    /// Surround the content with boundary tokens and build its attention mask.
    ///
    /// ```rust
    /// use lyricmood::{SpecialTokens, TokenWindow};
    ///
    /// let window = TokenWindow::new(vec![7, 8, 9], 0, 3, 0);
    /// let wrapped = window.wrap(SpecialTokens { start: 0, end: 2 });
    /// assert_eq!(wrapped.input_ids, vec![0, 7, 8, 9, 2]);
    /// assert_eq!(wrapped.attention_mask, vec![1; 5]);
    /// ```
    #[must_use]
    pub fn wrap(&self, special: SpecialTokens) -> WrappedWindow {
        let mut input_ids = Vec::with_capacity(self.content.len() + 2);
        input_ids.push(special.start);
        input_ids.extend_from_slice(&self.content);
        input_ids.push(special.end);
        let attention_mask = vec![1; input_ids.len()];
        WrappedWindow {
            input_ids,
            attention_mask,
            index: self.index,
        }
    }
}

impl std::fmt::Display for TokenWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TokenWindow {{ index: {}, span: {}..{}, len: {} }}",
            self.index,
            self.start,
            self.end,
            self.len()
        )
    }
}

/// Encoder-ready window: boundary tokens added, mask of ones alongside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedWindow {
    /// `[start] content.. [end]`.
    pub input_ids: Vec<u32>,
    /// All ones, same length as `input_ids`.
    pub attention_mask: Vec<u32>,
    /// Index of the source window.
    pub index: usize,
}

impl WrappedWindow {
    /// Sequence length fed to the encoder.
    #[must_use]
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    /// Always false for a wrapped window; it holds at least the two boundary ids.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPECIAL: SpecialTokens = SpecialTokens { start: 101, end: 102 };

    #[test]
    fn test_wrap_adds_two_tokens() {
        let window = TokenWindow::new(vec![5; 232], 768, 1000, 3);
        let wrapped = window.wrap(SPECIAL);
        assert_eq!(wrapped.len(), 234);
        assert_eq!(wrapped.input_ids.first(), Some(&101));
        assert_eq!(wrapped.input_ids.last(), Some(&102));
        assert!(wrapped.attention_mask.iter().all(|&m| m == 1));
        assert_eq!(wrapped.index, 3);
    }

    #[test]
    fn test_span_and_display() {
        let window = TokenWindow::new(vec![1, 2], 4, 6, 1);
        assert_eq!(window.span(), 4..6);
        assert_eq!(
            window.to_string(),
            "TokenWindow { index: 1, span: 4..6, len: 2 }"
        );
    }
}
