//! Sliding-window splitting of token sequences.
//!
//! ## How It Works
//!
//! Window `k` starts at `k * stride` and takes up to `chunk_size` ids.
//! Splitting stops once the start offset reaches the end of the sequence, so
//! an empty remainder never becomes a window.
//!
//! ```text
//! N = 1000, chunk_size = 510, stride = 256
//!
//! Window 0: [0..510]
//! Window 1: [256..766]
//! Window 2: [512..1000]   <- shorter than chunk_size
//! Window 3: [768..1000]   <- final window, 232 ids
//! ```
//!
//! Unlike byte chunking, every start offset below `N` yields a window, even
//! when an earlier window already reached the end. That keeps the window
//! count a pure function of `(N, stride)`: `ceil(N / stride)`.
//!
//! ## Why Overlap?
//!
//! A lyric line cut in half by a window edge loses its meaning in both
//! halves. With `stride < chunk_size` every cut point lies well inside some
//! other window:
//!
//! | stride / chunk_size | Encoder calls | Boundary context |
//! |---------------------|---------------|------------------|
//! | 1.0 | N / chunk_size | Lost at every cut |
//! | 0.5 | ~2x | Every cut covered |
//! | > 1.0 | fewer | Gaps, ids skipped |

use crate::chunk::TokenWindow;
use crate::config::{ConfigError, LyricsConfig};

/// Fixed-size sliding window over token ids.
///
/// ## Example
///
/// ```rust
/// use lyricmood::SlidingWindow;
///
/// let splitter = SlidingWindow::new(510, 256).unwrap();
/// let ids: Vec<u32> = (0..1000).collect();
/// let windows = splitter.split(&ids);
///
/// let starts: Vec<usize> = windows.iter().map(|w| w.start).collect();
/// assert_eq!(starts, vec![0, 256, 512, 768]);
/// assert_eq!(windows[3].len(), 232);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlidingWindow {
    chunk_size: usize,
    stride: usize,
}

impl SlidingWindow {
    /// Create a new splitter.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Zero`] if either argument is zero.
    pub fn new(chunk_size: usize, stride: usize) -> Result<Self, ConfigError> {
        if chunk_size == 0 {
            return Err(ConfigError::Zero {
                field: "chunk_size",
            });
        }
        if stride == 0 {
            return Err(ConfigError::Zero { field: "stride" });
        }
        Ok(Self { chunk_size, stride })
    }

    /// Splitter for a configuration's window settings.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn from_config(config: &LyricsConfig) -> Result<Self, ConfigError> {
        Self::new(config.chunk_size, config.stride)
    }

    /// Content ids per window.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Step between window starts.
    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Split a token sequence into ordered windows. Empty input yields none.
    #[must_use]
    pub fn split(&self, ids: &[u32]) -> Vec<TokenWindow> {
        let mut windows = Vec::with_capacity(self.estimate_windows(ids.len()));
        for (index, start) in (0..ids.len()).step_by(self.stride).enumerate() {
            let end = (start + self.chunk_size).min(ids.len());
            windows.push(TokenWindow::new(&ids[start..end], start, end, index));
        }
        windows
    }

    /// Exact number of windows [`split`](Self::split) produces for `n` ids.
    #[must_use]
    pub fn estimate_windows(&self, n: usize) -> usize {
        n.div_ceil(self.stride)
    }
}
