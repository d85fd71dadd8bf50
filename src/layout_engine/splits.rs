//! Split ratios: the share of a cell's stacking axis each window receives.
//!
//! Every function here is pure and returns ratios that sum to 1.0, except
//! when the input is empty.

use super::NavigationError;

/// Smallest share a window can be shrunk to.
pub const MINIMUM_RATIO: f64 = 0.1;

/// Step used by the resize commands when no amount is given.
pub const DEFAULT_RESIZE_AMOUNT: f64 = 0.1;

/// `n` equal ratios. The rounding remainder lands in the last slot so the
/// sum is exactly 1.0.
pub fn initialize_split_ratios(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    let share = 1.0 / n as f64;
    let mut ratios = vec![share; n];
    let head: f64 = ratios[..n - 1].iter().sum();
    ratios[n - 1] = 1.0 - head;
    ratios
}

/// Scales `weights` to sum to 1.0. Negative or non-finite weights count as
/// zero; all-zero input becomes an equal split.
pub fn normalize_split_ratios(weights: &[f64]) -> Vec<f64> {
    let cleaned: Vec<f64> =
        weights.iter().map(|&w| if w.is_finite() && w > 0.0 { w } else { 0.0 }).collect();
    let sum: f64 = cleaned.iter().sum();
    if sum <= 0.0 {
        return initialize_split_ratios(weights.len());
    }
    let mut ratios: Vec<f64> = cleaned.iter().map(|w| w / sum).collect();
    let n = ratios.len();
    let head: f64 = ratios[..n - 1].iter().sum();
    ratios[n - 1] = (1.0 - head).max(0.0);
    ratios
}

/// Grows `ratios[index]` by `delta` at the expense of `ratios[index + 1]`.
/// Neither side of the boundary drops below `min_ratio`. A negative delta
/// shrinks the window instead.
pub fn adjust_split_ratio(
    ratios: &[f64],
    index: usize,
    delta: f64,
    min_ratio: f64,
) -> Result<Vec<f64>, NavigationError> {
    if ratios.len() < 2 || index >= ratios.len() - 1 {
        return Err(NavigationError::InvalidSplitIndex { index, len: ratios.len() });
    }

    let mut adjusted = ratios.to_vec();
    let pair = adjusted[index] + adjusted[index + 1];
    let floor = min_ratio.min(pair / 2.0);
    let grown = (adjusted[index] + delta).clamp(floor, pair - floor);
    adjusted[index] = grown;
    adjusted[index + 1] = pair - grown;

    Ok(normalize_split_ratios(&adjusted))
}

/// Ratios for the remaining windows once `removed_index` is gone. The
/// remaining windows go back to an equal split.
pub fn recalculate_splits_after_removal(ratios: &[f64], removed_index: usize) -> Vec<f64> {
    if removed_index >= ratios.len() {
        return ratios.to_vec();
    }
    initialize_split_ratios(ratios.len() - 1)
}

/// Ratios once a window is inserted at `insert_index`: an equal split over
/// the grown cell.
pub fn recalculate_splits_after_addition(ratios: &[f64], insert_index: usize) -> Vec<f64> {
    debug_assert!(insert_index <= ratios.len());
    initialize_split_ratios(ratios.len() + 1)
}

/// Moves the ratio at `old_index` to `new_index` along with its window.
pub fn recalculate_splits_after_reorder(
    ratios: &[f64],
    old_index: usize,
    new_index: usize,
) -> Vec<f64> {
    let mut reordered = ratios.to_vec();
    if old_index == new_index || old_index >= ratios.len() || new_index >= ratios.len() {
        return reordered;
    }
    let ratio = reordered.remove(old_index);
    reordered.insert(new_index, ratio);
    reordered
}

/// Offset of the boundary after window `boundary_index`, measured from the
/// start of the cell along the stacking axis.
pub fn split_boundary(cell_size: f64, ratios: &[f64], boundary_index: usize, spacing: f64) -> f64 {
    if boundary_index >= ratios.len() {
        return 0.0;
    }
    let share: f64 = ratios[..=boundary_index].iter().sum();
    let available = cell_size - spacing * (ratios.len() - 1) as f64;
    available * share + spacing * (boundary_index + 1) as f64
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn sum(ratios: &[f64]) -> f64 { ratios.iter().sum() }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{actual:?} vs {expected:?}");
        }
    }

    mod initialization {
        use pretty_assertions::assert_eq;

        use super::*;

        #[test]
        fn equal_ratios_sum_to_exactly_one() {
            for n in 1..=25 {
                let ratios = initialize_split_ratios(n);
                assert_eq!(ratios.len(), n);
                assert_eq!(sum(&ratios), 1.0, "n = {n}");
            }
            assert!(initialize_split_ratios(0).is_empty());
        }

        #[test]
        fn normalize_scales_weights() {
            assert_close(&normalize_split_ratios(&[1.0, 3.0]), &[0.25, 0.75]);
            assert_close(&normalize_split_ratios(&[0.0, 0.0, 0.0]), &[
                1.0 / 3.0,
                1.0 / 3.0,
                1.0 / 3.0,
            ]);
            assert_close(&normalize_split_ratios(&[-1.0, 1.0]), &[0.0, 1.0]);
            assert!(normalize_split_ratios(&[]).is_empty());
        }
    }

    mod adjustment {
        use pretty_assertions::assert_eq;

        use super::*;

        #[test]
        fn grows_one_and_shrinks_next() {
            let adjusted = adjust_split_ratio(&[0.5, 0.5], 0, 0.1, MINIMUM_RATIO).unwrap();
            assert_close(&adjusted, &[0.6, 0.4]);

            let adjusted = adjust_split_ratio(&[0.5, 0.5], 0, -0.2, MINIMUM_RATIO).unwrap();
            assert_close(&adjusted, &[0.3, 0.7]);
        }

        #[test]
        fn leaves_other_windows_alone() {
            let adjusted =
                adjust_split_ratio(&[0.25, 0.25, 0.5], 1, 0.1, MINIMUM_RATIO).unwrap();
            assert_close(&adjusted, &[0.25, 0.35, 0.4]);
        }

        #[test]
        fn clamps_to_minimum() {
            let adjusted = adjust_split_ratio(&[0.5, 0.5], 0, 0.9, MINIMUM_RATIO).unwrap();
            assert_close(&adjusted, &[0.9, 0.1]);

            let adjusted = adjust_split_ratio(&[0.5, 0.5], 0, -0.9, MINIMUM_RATIO).unwrap();
            assert_close(&adjusted, &[0.1, 0.9]);
        }

        #[test]
        fn rejects_invalid_boundaries() {
            assert_eq!(
                adjust_split_ratio(&[1.0], 0, 0.1, MINIMUM_RATIO),
                Err(NavigationError::InvalidSplitIndex { index: 0, len: 1 })
            );
            assert_eq!(
                adjust_split_ratio(&[0.5, 0.5], 1, 0.1, MINIMUM_RATIO),
                Err(NavigationError::InvalidSplitIndex { index: 1, len: 2 })
            );
        }

        #[test]
        fn repeated_adjustments_stay_normalized() {
            let mut ratios = initialize_split_ratios(4);
            for step in 0..40 {
                let delta = if step % 3 == 0 { -0.15 } else { 0.1 };
                ratios = adjust_split_ratio(&ratios, step % 3, delta, MINIMUM_RATIO).unwrap();
                assert!((sum(&ratios) - 1.0).abs() < 1e-9);
                assert!(ratios.iter().all(|&r| r >= MINIMUM_RATIO - 1e-9), "{ratios:?}");
            }
        }
    }

    mod reflow {
        use pretty_assertions::assert_eq;

        use super::*;

        #[test]
        fn removal_returns_to_equal_split() {
            assert_close(&recalculate_splits_after_removal(&[0.6, 0.3, 0.1], 1), &[0.5, 0.5]);
            assert!(recalculate_splits_after_removal(&[1.0], 0).is_empty());
            assert_close(&recalculate_splits_after_removal(&[0.6, 0.4], 5), &[0.6, 0.4]);
        }

        #[test]
        fn addition_returns_to_equal_split() {
            assert_close(&recalculate_splits_after_addition(&[0.7, 0.3], 0), &[
                1.0 / 3.0,
                1.0 / 3.0,
                1.0 / 3.0,
            ]);
            assert_eq!(recalculate_splits_after_addition(&[], 0), vec![1.0]);
        }

        #[test]
        fn reorder_moves_ratio_with_window() {
            assert_eq!(recalculate_splits_after_reorder(&[0.5, 0.3, 0.2], 0, 2), vec![
                0.3, 0.2, 0.5
            ]);
            assert_eq!(recalculate_splits_after_reorder(&[0.5, 0.3, 0.2], 2, 0), vec![
                0.2, 0.5, 0.3
            ]);
            assert_eq!(recalculate_splits_after_reorder(&[0.5, 0.5], 0, 4), vec![0.5, 0.5]);
        }
    }

    #[test]
    fn boundary_positions() {
        assert_eq!(split_boundary(1000.0, &[0.5, 0.5], 0, 0.0), 500.0);
        assert_eq!(split_boundary(1010.0, &[0.25, 0.75], 0, 10.0), 260.0);
        assert_eq!(split_boundary(1000.0, &[0.5, 0.5], 3, 0.0), 0.0);
    }
}
