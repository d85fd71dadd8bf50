//! Directional search between cells and between displays.
//!
//! Everything here is geometry over already resolved bounds. Ties between
//! equally good candidates go to the smallest cell id, which falls out of
//! iterating the bounds map in key order and only replacing the best
//! candidate on a strict improvement.

use super::graph::{Direction, Orientation};
use crate::common::collections::BTreeMap;
use crate::sys::geometry::{Point, Rect, RectExt};
use crate::sys::window_server::DisplayInfo;

/// Displays whose edges are this close count as touching.
pub const DISPLAY_EDGE_TOLERANCE: f64 = 5.0;

/// Share of the grid's extent, measured from the far edge, that counts as
/// the opposite edge when wrapping.
pub const WRAP_EDGE_FRACTION: f64 = 0.1;

fn is_in_direction(from: Point, to: Point, direction: Direction) -> bool {
    match direction {
        Direction::Left => to.x < from.x,
        Direction::Right => to.x > from.x,
        Direction::Up => to.y < from.y,
        Direction::Down => to.y > from.y,
    }
}

/// Offset along the axis perpendicular to `direction`.
pub fn perpendicular_distance(from: Point, to: Point, direction: Direction) -> f64 {
    match direction.orientation() {
        Orientation::Horizontal => (to.y - from.y).abs(),
        Orientation::Vertical => (to.x - from.x).abs(),
    }
}

/// Travel along `direction` plus twice the perpendicular drift, so a cell
/// straight ahead beats a diagonal one at the same distance.
pub fn directional_distance(from: Point, to: Point, direction: Direction) -> f64 {
    let primary = match direction.orientation() {
        Orientation::Horizontal => (to.x - from.x).abs(),
        Orientation::Vertical => (to.y - from.y).abs(),
    };
    primary + 2.0 * perpendicular_distance(from, to, direction)
}

fn best_by<'a>(
    candidates: impl Iterator<Item = (&'a String, &'a Rect)>,
    mut score: impl FnMut(Point) -> f64,
) -> Option<&'a str> {
    let mut best: Option<(&str, f64)> = None;
    for (id, rect) in candidates {
        let value = score(rect.center());
        if best.is_none_or(|(_, current)| value < current) {
            best = Some((id.as_str(), value));
        }
    }
    best.map(|(id, _)| id)
}

/// The cell to move to from `current` in `direction`, wrapping to the far
/// side of the grid when `wrap_around` is set and nothing lies ahead.
pub fn find_target_cell<'a>(
    current: &str,
    direction: Direction,
    bounds: &'a BTreeMap<String, Rect>,
    wrap_around: bool,
) -> Option<&'a str> {
    let from = bounds.get(current)?.center();
    let ahead = bounds
        .iter()
        .filter(|(id, rect)| id.as_str() != current && is_in_direction(from, rect.center(), direction));
    if let Some(found) = best_by(ahead, |to| directional_distance(from, to, direction)) {
        return Some(found);
    }
    if wrap_around {
        find_wrap_around_cell(current, direction, bounds)
    } else {
        None
    }
}

/// The cell on the opposite edge of the grid that lines up best with
/// `current`.
pub fn find_wrap_around_cell<'a>(
    current: &str,
    direction: Direction,
    bounds: &'a BTreeMap<String, Rect>,
) -> Option<&'a str> {
    let from = bounds.get(current)?.center();

    let centers = bounds.values().map(Rect::center);
    let (mut min_x, mut max_x, mut min_y, mut max_y) =
        (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY);
    for c in centers {
        min_x = min_x.min(c.x);
        max_x = max_x.max(c.x);
        min_y = min_y.min(c.y);
        max_y = max_y.max(c.y);
    }
    let threshold = |range: f64| if range == 0.0 { 1.0 } else { range * WRAP_EDGE_FRACTION };
    let (x_threshold, y_threshold) = (threshold(max_x - min_x), threshold(max_y - min_y));

    let on_opposite_edge = |to: Point| match direction {
        Direction::Left => to.x >= max_x - x_threshold,
        Direction::Right => to.x <= min_x + x_threshold,
        Direction::Up => to.y >= max_y - y_threshold,
        Direction::Down => to.y <= min_y + y_threshold,
    };

    let edge = bounds
        .iter()
        .filter(|(id, rect)| id.as_str() != current && on_opposite_edge(rect.center()));
    best_by(edge, |to| perpendicular_distance(from, to, direction))
}

/// Cell whose center is nearest to `point`.
pub fn find_closest_cell_to_point(point: Point, bounds: &BTreeMap<String, Rect>) -> Option<&str> {
    best_by(bounds.iter(), |c| (c.x - point.x).hypot(c.y - point.y))
}

/// Maps the center of `source_cell` from its place on `source_display` to
/// the same relative place on `target_display`.
pub fn match_visual_position(source_cell: Rect, source_display: Rect, target_display: Rect) -> Point {
    let center = source_cell.center();
    let normalize = |value: f64, origin: f64, length: f64| {
        if length > 0.0 { (value - origin) / length } else { 0.5 }
    };
    let nx = normalize(center.x, source_display.x, source_display.width);
    let ny = normalize(center.y, source_display.y, source_display.height);
    Point::new(
        target_display.x + nx * target_display.width,
        target_display.y + ny * target_display.height,
    )
}

fn display_and_frame<'a>(uuid: &str, displays: &'a [DisplayInfo]) -> Option<(&'a DisplayInfo, Rect)> {
    let display = displays.iter().find(|d| d.uuid == uuid)?;
    Some((display, display.usable_frame()?))
}

/// The display touching `current` on its `direction` side.
pub fn find_adjacent_display<'a>(
    current: &str,
    direction: Direction,
    displays: &'a [DisplayInfo],
) -> Option<&'a DisplayInfo> {
    let (_, from) = display_and_frame(current, displays)?;
    let touches = |a: f64, b: f64| (a - b).abs() <= DISPLAY_EDGE_TOLERANCE;

    displays.iter().filter(|d| d.uuid != current).find(|d| {
        let Some(to) = d.usable_frame() else {
            return false;
        };
        match direction {
            Direction::Left => touches(to.max_x(), from.min_x()) && from.overlaps_vertically(&to),
            Direction::Right => touches(from.max_x(), to.min_x()) && from.overlaps_vertically(&to),
            Direction::Up => touches(to.max_y(), from.min_y()) && from.overlaps_horizontally(&to),
            Direction::Down => {
                touches(from.max_y(), to.min_y()) && from.overlaps_horizontally(&to)
            }
        }
    })
}

/// The display on the far side of the arrangement, for wrapping past the
/// last display in `direction`.
pub fn find_opposite_display<'a>(
    current: &str,
    direction: Direction,
    displays: &'a [DisplayInfo],
) -> Option<&'a DisplayInfo> {
    if displays.len() < 2 {
        return None;
    }
    let (_, from) = display_and_frame(current, displays)?;

    let mut best: Option<(&DisplayInfo, f64)> = None;
    for display in displays.iter().filter(|d| d.uuid != current) {
        let Some(to) = display.usable_frame() else {
            continue;
        };
        // Larger is better for every direction.
        let score = match direction {
            Direction::Left if from.overlaps_vertically(&to) => to.max_x(),
            Direction::Right if from.overlaps_vertically(&to) => -to.min_x(),
            Direction::Up if from.overlaps_horizontally(&to) => to.max_y(),
            Direction::Down if from.overlaps_horizontally(&to) => -to.min_y(),
            _ => continue,
        };
        if best.is_none_or(|(_, current_best)| score > current_best) {
            best = Some((display, score));
        }
    }
    best.map(|(display, _)| display)
}

/// Next or previous index in a cell of `len` windows, wrapping.
pub fn cycle_window_index(current: usize, len: usize, forward: bool) -> usize {
    if len == 0 {
        return 0;
    }
    let current = current.min(len - 1);
    if forward { (current + 1) % len } else { (current + len - 1) % len }
}
