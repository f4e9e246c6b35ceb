//! Cross-window pooling: many summary vectors in, one document embedding out.
//!
//! ## The Problem
//!
//! A long song produces one summary vector per window. The classifier wants
//! exactly one vector per song.
//!
//! ```text
//! window summaries:  s0 = [0.1, 0.9, 0.2]
//!                    s1 = [0.7, 0.3, 0.2]
//!                    s2 = [0.4, 0.1, 0.8]
//!
//! max pooling:       [0.7, 0.9, 0.8]    <- strongest signal per feature
//! mean pooling:      [0.4, 0.433, 0.4]  <- signal spread over the song
//! ```
//!
//! Max pooling suits moods carried by a few salient passages (a chorus, a
//! bridge). Mean pooling suits moods that hold steady across the whole text.
//!
//! ## Order Independence
//!
//! Both strategies ignore window order. Max is exact in any order. A naive
//! floating-point sum is not, so the mean sorts each feature's values before
//! summing them in `f64`. Permuting the windows gives the same bits.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Strategy for reducing window summaries to one embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pooling {
    /// Element-wise maximum.
    Max,
    /// Element-wise arithmetic mean.
    Mean,
}

impl Pooling {
    /// Pool summary vectors of identical width into one vector of that width.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DegenerateChunking`] for an empty slice and
    /// [`Error::SummaryWidth`] when widths differ.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use lyricmood::Pooling;
    ///
    /// let summaries = vec![vec![1.0, -2.0], vec![3.0, -4.0]];
    /// assert_eq!(Pooling::Max.pool(&summaries).unwrap(), vec![3.0, -2.0]);
    /// assert_eq!(Pooling::Mean.pool(&summaries).unwrap(), vec![2.0, -3.0]);
    /// ```
    pub fn pool(&self, summaries: &[Vec<f32>]) -> Result<Vec<f32>> {
        let first = summaries.first().ok_or(Error::DegenerateChunking)?;
        let dim = first.len();
        if let Some(bad) = summaries.iter().find(|s| s.len() != dim) {
            return Err(Error::SummaryWidth {
                expected: dim,
                actual: bad.len(),
            });
        }

        Ok(match self {
            Self::Max => max_pool(summaries, dim),
            Self::Mean => mean_pool(summaries, dim),
        })
    }
}

fn max_pool(summaries: &[Vec<f32>], dim: usize) -> Vec<f32> {
    (0..dim)
        .map(|i| {
            summaries
                .iter()
                .map(|s| s[i])
                .fold(f32::NEG_INFINITY, f32::max)
        })
        .collect()
}

fn mean_pool(summaries: &[Vec<f32>], dim: usize) -> Vec<f32> {
    let count = summaries.len() as f64;
    let mut column = Vec::with_capacity(summaries.len());

    (0..dim)
        .map(|i| {
            column.clear();
            column.extend(summaries.iter().map(|s| f64::from(s[i])));
            column.sort_by(f64::total_cmp);
            (column.iter().sum::<f64>() / count) as f32
        })
        .collect()
}

impl std::fmt::Display for Pooling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Max => write!(f, "max"),
            Self::Mean => write!(f, "mean"),
        }
    }
}
