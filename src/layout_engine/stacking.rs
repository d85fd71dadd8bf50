//! Arranging the windows that share a cell.

use serde::{Deserialize, Serialize};

use super::graph::{Orientation, StackMode};
use super::spacing::Insets;
use super::splits::{initialize_split_ratios, normalize_split_ratios};
use crate::sys::geometry::Rect;
use crate::sys::window_server::WindowId;

/// Target frame for one window.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowPlacement {
    pub window_id: WindowId,
    pub frame: Rect,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StackOptions {
    pub mode: StackMode,
    pub padding: Insets,
    pub window_spacing: f64,
}

/// Frames for `window_count` windows stacked in `cell`.
///
/// `ratios` are normalized before use; a list of the wrong length is
/// replaced by an equal split.
pub fn calculate_window_bounds(
    cell: Rect,
    window_count: usize,
    ratios: &[f64],
    options: &StackOptions,
) -> Vec<Rect> {
    if window_count == 0 {
        return Vec::new();
    }

    let ratios = if ratios.len() == window_count {
        normalize_split_ratios(ratios)
    } else {
        initialize_split_ratios(window_count)
    };
    let inner = options.padding.apply(cell);

    match options.mode.orientation() {
        None => vec![inner; window_count],
        Some(orientation) => stack_along(inner, orientation, &ratios, options.window_spacing),
    }
}

fn stack_along(inner: Rect, orientation: Orientation, ratios: &[f64], spacing: f64) -> Vec<Rect> {
    let length = match orientation {
        Orientation::Vertical => inner.height,
        Orientation::Horizontal => inner.width,
    };
    let spacing = spacing.max(0.0);
    let available = (length - spacing * (ratios.len() - 1) as f64).max(0.0);

    let mut offset = 0.0;
    ratios
        .iter()
        .map(|ratio| {
            let size = available * ratio;
            let frame = match orientation {
                Orientation::Vertical => Rect::new(inner.x, inner.y + offset, inner.width, size),
                Orientation::Horizontal => {
                    Rect::new(inner.x + offset, inner.y, size, inner.height)
                }
            };
            offset += size + spacing;
            frame
        })
        .collect()
}

/// Pairs each window with its frame in `cell`.
pub fn place_windows(
    cell: Rect,
    windows: &[WindowId],
    ratios: &[f64],
    options: &StackOptions,
) -> Vec<WindowPlacement> {
    calculate_window_bounds(cell, windows.len(), ratios, options)
        .into_iter()
        .zip(windows)
        .map(|(frame, &window_id)| WindowPlacement { window_id, frame })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const CELL: Rect = Rect::new(100.0, 50.0, 600.0, 400.0);

    fn opts(mode: StackMode, spacing: f64) -> StackOptions {
        StackOptions { mode, window_spacing: spacing, ..Default::default() }
    }

    #[test]
    fn no_windows() {
        assert!(calculate_window_bounds(CELL, 0, &[], &opts(StackMode::Vertical, 0.0)).is_empty());
    }

    #[test]
    fn vertical_follows_ratios() {
        let frames =
            calculate_window_bounds(CELL, 2, &[0.25, 0.75], &opts(StackMode::Vertical, 0.0));
        assert_eq!(frames, vec![
            Rect::new(100.0, 50.0, 600.0, 100.0),
            Rect::new(100.0, 150.0, 600.0, 300.0),
        ]);
    }

    #[test]
    fn horizontal_with_spacing() {
        let frames =
            calculate_window_bounds(CELL, 2, &[0.0; 0], &opts(StackMode::Horizontal, 30.0));
        assert_eq!(frames, vec![
            Rect::new(100.0, 50.0, 285.0, 400.0),
            Rect::new(415.0, 50.0, 285.0, 400.0),
        ]);
    }

    #[test]
    fn tabs_share_the_padded_cell() {
        let options = StackOptions {
            mode: StackMode::Tabs,
            padding: Insets { top: 10.0, right: 10.0, bottom: 10.0, left: 10.0 },
            window_spacing: 50.0,
        };
        let frames = calculate_window_bounds(CELL, 3, &[], &options);
        assert_eq!(frames, vec![Rect::new(110.0, 60.0, 580.0, 380.0); 3]);
    }

    #[test]
    fn unnormalized_ratios_are_normalized() {
        let frames = calculate_window_bounds(CELL, 2, &[1.0, 3.0], &opts(StackMode::Vertical, 0.0));
        assert_eq!(frames[0].height, 100.0);
        assert_eq!(frames[1].height, 300.0);
    }

    #[test]
    fn spacing_larger_than_cell_collapses_windows() {
        let frames = calculate_window_bounds(CELL, 2, &[], &opts(StackMode::Vertical, 1000.0));
        assert!(frames.iter().all(|f| f.height == 0.0));
    }

    #[test]
    fn placements_pair_ids_in_order() {
        let windows = [WindowId::new(7), WindowId::new(3)];
        let placements = place_windows(CELL, &windows, &[0.5, 0.5], &opts(StackMode::Vertical, 0.0));
        assert_eq!(
            placements.iter().map(|p| p.window_id).collect::<Vec<_>>(),
            windows.to_vec()
        );
        assert_eq!(placements[1].frame.y, 250.0);
    }
}
