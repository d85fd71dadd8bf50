//! Distributing windows over the cells of a layout.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, trace};

use super::cells::{Layout, sort_cells_by_position};
use super::graph::StackMode;
use super::ConfigurationError;
use crate::common::collections::{BTreeMap, HashMap};
use crate::sys::geometry::{Rect, RectExt};
use crate::sys::window_server::{WindowId, WindowInfo};

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum AssignmentStrategy {
    /// Round robin over the cells in reading order.
    AutoFlow,
    /// App rules first, the rest into empty then least populated cells.
    Pinned,
    /// Keep each window in the cell it had before.
    Preserve,
    /// The cell each window currently overlaps most.
    #[default]
    Position,
}

/// Per application preferences.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppRule {
    /// Application name or bundle id.
    pub app: String,
    #[serde(default)]
    pub preferred_cell: Option<String>,
    /// Layouts the rule applies to. Empty means every layout.
    #[serde(default)]
    pub layouts: Vec<String>,
    #[serde(default)]
    pub float: bool,
    #[serde(default)]
    pub preferred_stack_mode: Option<StackMode>,
}

impl AppRule {
    pub fn matches(&self, window: &WindowInfo) -> bool {
        !self.app.is_empty() && (self.app == window.app_name || self.app == window.bundle_id)
    }

    pub fn applies_to(&self, layout_id: &str) -> bool {
        self.layouts.is_empty() || self.layouts.iter().any(|l| l == layout_id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowCategory {
    /// Minimized, hidden or off the normal layer. Ignored entirely.
    Excluded,
    /// Tracked but never tiled.
    Floating,
    Tileable,
}

const FLOATING_SUBROLES: &[&str] =
    &["AXDialog", "AXFloatingWindow", "AXSystemDialog", "AXSheet", "AXSystemFloatingWindow"];

pub fn classify_window(window: &WindowInfo, rules: &[&AppRule]) -> WindowCategory {
    if !window.is_tileable() {
        return WindowCategory::Excluded;
    }
    if rules.iter().any(|rule| rule.float && rule.matches(window)) {
        return WindowCategory::Floating;
    }
    match window.subrole.as_deref() {
        Some(subrole) if FLOATING_SUBROLES.contains(&subrole) => WindowCategory::Floating,
        _ => WindowCategory::Tileable,
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssignmentResult {
    /// Every cell of the layout, possibly with no windows.
    pub assignments: BTreeMap<String, Vec<WindowId>>,
    pub floating: Vec<WindowId>,
    pub excluded: Vec<WindowId>,
}

impl AssignmentResult {
    fn push(&mut self, cell: &str, window: WindowId) {
        if let Some(windows) = self.assignments.get_mut(cell) {
            windows.push(window);
        }
    }

    /// Cell with the fewest windows, smallest id on ties.
    fn least_populated(&self) -> Option<String> {
        self.assignments
            .iter()
            .min_by(|(a_id, a), (b_id, b)| a.len().cmp(&b.len()).then_with(|| a_id.cmp(b_id)))
            .map(|(id, _)| id.clone())
    }
}

/// Maps `windows` onto the cells of `layout`.
///
/// `bounds` are the resolved cell rectangles, `previous` the cell contents
/// before this assignment (used by [`AssignmentStrategy::Preserve`]).
pub fn assign_windows(
    windows: &[WindowInfo],
    layout: &Layout,
    bounds: &BTreeMap<String, Rect>,
    rules: &[AppRule],
    previous: &BTreeMap<String, Vec<WindowId>>,
    strategy: AssignmentStrategy,
) -> Result<AssignmentResult, ConfigurationError> {
    if layout.cells.is_empty() {
        return Err(ConfigurationError::NoCells(layout.id.clone()));
    }

    let rules: Vec<&AppRule> = rules.iter().filter(|r| r.applies_to(&layout.id)).collect();
    let mut result = AssignmentResult {
        assignments: layout.cells.iter().map(|c| (c.id.clone(), Vec::new())).collect(),
        ..Default::default()
    };

    let mut tileable = Vec::new();
    for window in windows {
        match classify_window(window, &rules) {
            WindowCategory::Excluded => result.excluded.push(window.id),
            WindowCategory::Floating => result.floating.push(window.id),
            WindowCategory::Tileable => tileable.push(window),
        }
    }

    debug!(
        layout = %layout.id,
        %strategy,
        tileable = tileable.len(),
        floating = result.floating.len(),
        excluded = result.excluded.len(),
        "assigning windows"
    );

    let reading_order = reading_order(layout, bounds);
    match strategy {
        AssignmentStrategy::AutoFlow => auto_flow(&tileable, &reading_order, &mut result),
        AssignmentStrategy::Pinned => pinned(&tileable, &rules, &reading_order, &mut result),
        AssignmentStrategy::Preserve => preserve(&tileable, previous, &mut result),
        AssignmentStrategy::Position => by_position(&tileable, bounds, &mut result),
    }
    Ok(result)
}

/// Layout cells sorted top to bottom, then left to right. Cells without
/// bounds keep their declaration order at the end.
fn reading_order(layout: &Layout, bounds: &BTreeMap<String, Rect>) -> Vec<String> {
    let known: BTreeMap<String, Rect> = bounds
        .iter()
        .filter(|(id, _)| layout.has_cell(id))
        .map(|(id, r)| (id.clone(), *r))
        .collect();
    let mut order = sort_cells_by_position(&known);
    order.extend(layout.cell_ids().filter(|id| !known.contains_key(*id)).map(str::to_string));
    order
}

fn auto_flow(windows: &[&WindowInfo], order: &[String], result: &mut AssignmentResult) {
    if order.is_empty() {
        return;
    }
    for (i, window) in windows.iter().enumerate() {
        result.push(&order[i % order.len()], window.id);
    }
}

fn pinned(
    windows: &[&WindowInfo],
    rules: &[&AppRule],
    order: &[String],
    result: &mut AssignmentResult,
) {
    let mut unpinned = Vec::new();
    for window in windows {
        let target = rules.iter().find_map(|rule| {
            let cell = rule.preferred_cell.as_deref()?;
            (rule.matches(window) && result.assignments.contains_key(cell)).then_some(cell)
        });
        match target {
            Some(cell) => {
                trace!(window = %window.id, cell, "pinned by app rule");
                result.push(cell, window.id);
            }
            None => unpinned.push(*window),
        }
    }

    let mut empty = order
        .iter()
        .filter(|id| result.assignments.get(*id).is_some_and(Vec::is_empty))
        .cloned()
        .collect::<Vec<_>>()
        .into_iter();
    for window in unpinned {
        let cell = empty.next().or_else(|| result.least_populated());
        if let Some(cell) = cell {
            result.push(&cell, window.id);
        }
    }
}

fn preserve(
    windows: &[&WindowInfo],
    previous: &BTreeMap<String, Vec<WindowId>>,
    result: &mut AssignmentResult,
) {
    let previous_cell: HashMap<WindowId, &str> = previous
        .iter()
        .flat_map(|(cell, ids)| ids.iter().map(move |id| (*id, cell.as_str())))
        .collect();

    let mut orphans = Vec::new();
    for window in windows {
        match previous_cell.get(&window.id) {
            Some(cell) if result.assignments.contains_key(*cell) => result.push(cell, window.id),
            _ => orphans.push(window.id),
        }
    }
    for id in orphans {
        if let Some(cell) = result.least_populated() {
            result.push(&cell, id);
        }
    }

    // Restore the previous stacking order inside each cell, newcomers last.
    for (cell, before) in previous {
        let Some(current) = result.assignments.get_mut(cell) else {
            continue;
        };
        let mut reordered: Vec<WindowId> =
            before.iter().filter(|id| current.contains(id)).copied().collect();
        reordered.extend(current.iter().filter(|id| !before.contains(id)));
        *current = reordered;
    }
}

fn by_position(
    windows: &[&WindowInfo],
    bounds: &BTreeMap<String, Rect>,
    result: &mut AssignmentResult,
) {
    for window in windows {
        let mut best: Option<(&str, f64)> = None;
        for (cell, rect) in bounds.iter().filter(|(id, _)| result.assignments.contains_key(*id)) {
            let overlap = window.frame.overlap(rect);
            if overlap > best.map_or(0.0, |(_, o)| o) {
                best = Some((cell.as_str(), overlap));
            }
        }
        match best {
            Some((cell, overlap)) => {
                trace!(window = %window.id, cell, overlap, "assigned by overlap");
                result.push(cell, window.id);
            }
            None => {
                if let Some(cell) = result.least_populated() {
                    trace!(window = %window.id, cell = %cell, "no overlap, least populated cell");
                    result.push(&cell, window.id);
                }
            }
        }
    }
}
