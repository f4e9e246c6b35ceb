//! Property-based tests for windowing and pooling.
//!
//! These tests verify the invariants the encoder pipeline relies on:
//! - Coverage: windows cover every token when stride <= chunk_size
//! - Count: exactly ceil(N / stride) windows
//! - Wrapping: boundary ids and an all-ones mask around each window
//! - Pooling: independent of window order, and a no-op on one window

use proptest::prelude::*;
use lyricmood::{Pooling, SlidingWindow, SpecialTokens, TokenWindow};

// =============================================================================
// Test Generators
// =============================================================================

/// Token ids plus a window shape with stride <= chunk_size.
fn overlapping_layout() -> impl Strategy<Value = (Vec<u32>, usize, usize)> {
    (
        prop::collection::vec(any::<u32>(), 0..400),
        1usize..64,
    )
        .prop_flat_map(|(ids, chunk_size)| (Just(ids), Just(chunk_size), 1..=chunk_size))
}

/// A non-empty set of equal-width summary vectors.
fn summaries() -> impl Strategy<Value = Vec<Vec<f32>>> {
    (1usize..16).prop_flat_map(|width| {
        prop::collection::vec(
            prop::collection::vec(-1.0e3f32..1.0e3, width..=width),
            1..12,
        )
    })
}

// =============================================================================
// Invariant Helpers
// =============================================================================

/// Every offset in [0, n) lies in some window.
fn windows_cover(windows: &[TokenWindow], n: usize) -> bool {
    let mut covered = vec![false; n];
    for window in windows {
        for flag in &mut covered[window.span()] {
            *flag = true;
        }
    }
    covered.into_iter().all(|c| c)
}

// =============================================================================
// Window Properties
// =============================================================================

proptest! {
    #[test]
    fn prop_windows_cover_input((ids, chunk_size, stride) in overlapping_layout()) {
        let windows = SlidingWindow::new(chunk_size, stride).unwrap().split(&ids);
        prop_assert!(windows_cover(&windows, ids.len()));
    }

    #[test]
    fn prop_window_count_matches_estimate(
        ids in prop::collection::vec(any::<u32>(), 0..400),
        chunk_size in 1usize..64,
        stride in 1usize..96,
    ) {
        let splitter = SlidingWindow::new(chunk_size, stride).unwrap();
        let windows = splitter.split(&ids);
        prop_assert_eq!(windows.len(), ids.len().div_ceil(stride));
        prop_assert_eq!(windows.len(), splitter.estimate_windows(ids.len()));
    }

    #[test]
    fn prop_windows_are_ordered_slices(
        ids in prop::collection::vec(any::<u32>(), 1..400),
        chunk_size in 1usize..64,
        stride in 1usize..96,
    ) {
        let windows = SlidingWindow::new(chunk_size, stride).unwrap().split(&ids);
        for (k, window) in windows.iter().enumerate() {
            prop_assert_eq!(window.index, k);
            prop_assert_eq!(window.start, k * stride);
            prop_assert!(!window.is_empty());
            prop_assert!(window.len() <= chunk_size);
            prop_assert_eq!(&window.content[..], &ids[window.span()]);
        }
    }

    #[test]
    fn prop_wrapping_adds_boundaries(
        ids in prop::collection::vec(3u32..50_000, 1..200),
        chunk_size in 1usize..64,
        start in any::<u32>(),
        end in any::<u32>(),
    ) {
        let special = SpecialTokens { start, end };
        for window in SlidingWindow::new(chunk_size, chunk_size).unwrap().split(&ids) {
            let wrapped = window.wrap(special);
            prop_assert_eq!(wrapped.len(), window.len() + 2);
            prop_assert_eq!(wrapped.input_ids[0], start);
            prop_assert_eq!(*wrapped.input_ids.last().unwrap(), end);
            prop_assert_eq!(&wrapped.input_ids[1..=window.len()], &window.content[..]);
            prop_assert_eq!(wrapped.attention_mask.len(), wrapped.input_ids.len());
            prop_assert!(wrapped.attention_mask.iter().all(|&m| m == 1));
        }
    }
}

// =============================================================================
// Pooling Properties
// =============================================================================

proptest! {
    #[test]
    fn prop_pooling_ignores_order(
        vectors in summaries(),
        rotate in 0usize..12,
    ) {
        let mut shuffled = vectors.clone();
        shuffled.reverse();
        let k = rotate % shuffled.len();
        shuffled.rotate_left(k);

        for pooling in [Pooling::Max, Pooling::Mean] {
            let a = pooling.pool(&vectors).unwrap();
            let b = pooling.pool(&shuffled).unwrap();
            prop_assert_eq!(a, b);
        }
    }

    #[test]
    fn prop_single_window_pools_to_itself(
        v in prop::collection::vec(-1.0e3f32..1.0e3, 1..32),
    ) {
        for pooling in [Pooling::Max, Pooling::Mean] {
            prop_assert_eq!(pooling.pool(std::slice::from_ref(&v)).unwrap(), v.clone());
        }
    }

    #[test]
    fn prop_pooled_values_within_bounds(vectors in summaries()) {
        let max = Pooling::Max.pool(&vectors).unwrap();
        let mean = Pooling::Mean.pool(&vectors).unwrap();
        for d in 0..max.len() {
            let lo = vectors.iter().map(|v| v[d]).fold(f32::INFINITY, f32::min);
            prop_assert!(vectors.iter().any(|v| v[d] == max[d]));
            prop_assert!(mean[d] >= lo && mean[d] <= max[d]);
        }
    }
}
