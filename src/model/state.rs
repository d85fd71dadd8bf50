//! Persisted runtime state: which windows sit in which cell, their split
//! ratios, stack mode overrides and focus, per space.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::common::collections::{BTreeMap, HashSet};
use crate::layout_engine::StackMode;
use crate::layout_engine::splits::initialize_split_ratios;
use crate::sys::window_server::WindowId;

/// Current on-disk format version.
pub const STATE_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeState {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub spaces: BTreeMap<String, SpaceState>,
    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
}

impl Default for RuntimeState {
    fn default() -> Self {
        RuntimeState {
            version: STATE_VERSION,
            spaces: BTreeMap::new(),
            last_updated: Utc::now(),
        }
    }
}

/// Layout state of one space.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceState {
    pub space_id: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub current_layout_id: Option<String>,
    /// Position of the current layout in the space's cycle.
    #[serde(default)]
    pub layout_index: usize,
    #[serde(default)]
    pub cells: BTreeMap<String, CellState>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub focused_cell: Option<String>,
    /// Index of the focused window inside `focused_cell`.
    #[serde(default)]
    pub focused_window: usize,
}

/// Windows in one cell. `windows` and `split_ratios` always have the same
/// length; index 0 is the front of the stack.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellState {
    pub cell_id: String,
    #[serde(default)]
    pub windows: Vec<WindowId>,
    #[serde(default)]
    pub split_ratios: Vec<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub stack_mode: Option<StackMode>,
    /// Window focused the last time this cell had focus.
    #[serde(default)]
    pub last_focused_idx: usize,
}

/// Older state files wrote unset values as empty strings.
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

impl CellState {
    pub fn new(cell_id: impl Into<String>) -> Self {
        CellState { cell_id: cell_id.into(), ..Default::default() }
    }

    pub fn position(&self, window: WindowId) -> Option<usize> {
        self.windows.iter().position(|&w| w == window)
    }

    fn reset_ratios(&mut self) { self.split_ratios = initialize_split_ratios(self.windows.len()); }

    fn clamp_focus(&mut self) {
        self.last_focused_idx = self.last_focused_idx.min(self.windows.len().saturating_sub(1));
    }

    fn sticky_window(&self) -> Option<WindowId> { self.windows.get(self.last_focused_idx).copied() }

    /// Points the sticky index back at `window` after the list changed, or
    /// clamps it when that window is gone.
    fn follow_sticky(&mut self, window: Option<WindowId>) {
        match window.and_then(|w| self.position(w)) {
            Some(index) => self.last_focused_idx = index,
            None => self.clamp_focus(),
        }
    }

    /// Keeps only the windows `keep` accepts. Returns whether anything was
    /// dropped; ratios go back to an equal split if so.
    pub fn retain_windows(&mut self, mut keep: impl FnMut(WindowId) -> bool) -> bool {
        let before = self.windows.len();
        let sticky = self.sticky_window();
        self.windows.retain(|&w| keep(w));
        if self.windows.len() == before {
            return false;
        }
        self.reset_ratios();
        self.follow_sticky(sticky);
        true
    }

    /// Replaces the window list, resetting ratios to an equal split.
    pub fn set_windows(&mut self, windows: Vec<WindowId>) {
        self.windows = windows;
        self.reset_ratios();
        self.clamp_focus();
    }
}

impl SpaceState {
    pub fn new(space_id: impl Into<String>) -> Self {
        SpaceState { space_id: space_id.into(), ..Default::default() }
    }

    pub fn cell(&self, cell_id: &str) -> Option<&CellState> { self.cells.get(cell_id) }

    pub fn cell_mut(&mut self, cell_id: &str) -> Option<&mut CellState> {
        self.cells.get_mut(cell_id)
    }

    /// The cell's state, created empty on first use.
    pub fn cell_entry(&mut self, cell_id: &str) -> &mut CellState {
        self.cells.entry(cell_id.to_string()).or_insert_with(|| CellState::new(cell_id))
    }

    /// Switches layouts. Cell membership and focus belong to the old layout
    /// and are cleared.
    pub fn set_current_layout(&mut self, layout_id: impl Into<String>, layout_index: usize) {
        self.current_layout_id = Some(layout_id.into());
        self.layout_index = layout_index;
        self.cells.clear();
        self.focused_cell = None;
        self.focused_window = 0;
    }

    /// Advances to the next layout in `layouts`, wrapping. Returns the new
    /// layout id, or `None` when there is nothing to cycle through.
    pub fn cycle_layout(&mut self, layouts: &[String]) -> Option<String> {
        self.step_layout(layouts, true)
    }

    pub fn previous_layout(&mut self, layouts: &[String]) -> Option<String> {
        self.step_layout(layouts, false)
    }

    fn step_layout(&mut self, layouts: &[String], forward: bool) -> Option<String> {
        if layouts.is_empty() {
            return None;
        }
        let len = layouts.len();
        let current = self.layout_index.min(len - 1);
        let index = if forward { (current + 1) % len } else { (current + len - 1) % len };
        let layout = layouts[index].clone();
        self.set_current_layout(layout.clone(), index);
        Some(layout)
    }

    /// Appends `window` to `cell_id`, taking it out of any other cell. The
    /// window becomes the cell's last focused one. A window already in the
    /// cell is left where it is.
    pub fn assign_window(&mut self, window: WindowId, cell_id: &str) {
        if self.cell(cell_id).is_some_and(|c| c.position(window).is_some()) {
            return;
        }
        self.remove_window(window);
        let cell = self.cell_entry(cell_id);
        cell.windows.push(window);
        cell.last_focused_idx = cell.windows.len() - 1;
        cell.reset_ratios();
    }

    /// Puts `window` at the front of `cell_id`, taking it out of wherever it
    /// was before.
    pub fn prepend_window_to_cell(&mut self, window: WindowId, cell_id: &str) {
        if self.cell(cell_id).is_some_and(|c| c.windows.first() == Some(&window)) {
            return;
        }
        self.remove_window(window);
        let cell = self.cell_entry(cell_id);
        cell.windows.insert(0, window);
        cell.last_focused_idx = 0;
        cell.reset_ratios();
    }

    /// Removes `window` from whichever cell holds it. Returns that cell and
    /// the index the window had.
    pub fn remove_window(&mut self, window: WindowId) -> Option<(String, usize)> {
        let focused = self.focused_window();
        let (cell_id, cell) = self.cells.iter_mut().find(|(_, c)| c.position(window).is_some())?;
        let index = cell.position(window)?;
        let sticky = cell.sticky_window();
        cell.windows.remove(index);
        cell.reset_ratios();
        cell.follow_sticky(sticky);
        let cell_id = cell_id.clone();
        self.refocus(focused);
        Some((cell_id, index))
    }

    /// Points the focus index back at `window` once the focused cell's list
    /// changed. Clamps it instead when `window` is no longer in that cell.
    pub fn refocus(&mut self, window: Option<WindowId>) {
        let Some(cell) = self.focused_cell.as_deref().and_then(|id| self.cells.get(id)) else {
            return;
        };
        let index = window
            .and_then(|w| cell.position(w))
            .unwrap_or_else(|| self.focused_window.min(cell.windows.len().saturating_sub(1)));
        self.focused_window = index;
    }

    /// Cell holding `window` and its index there.
    pub fn window_cell(&self, window: WindowId) -> Option<(&str, usize)> {
        self.cells
            .iter()
            .find_map(|(id, cell)| cell.position(window).map(|i| (id.as_str(), i)))
    }

    /// Points focus at `window_index` in `cell_id`, and remembers it as the
    /// cell's last focused window.
    pub fn set_focus(&mut self, cell_id: &str, window_index: usize) {
        self.focused_cell = Some(cell_id.to_string());
        self.focused_window = window_index;
        if let Some(cell) = self.cells.get_mut(cell_id) {
            cell.last_focused_idx = window_index;
        }
    }

    /// The focused window. An out of range index falls back to the front
    /// window of the focused cell.
    pub fn focused_window(&self) -> Option<WindowId> {
        let cell = self.cell(self.focused_cell.as_deref()?)?;
        cell.windows.get(self.focused_window).or(cell.windows.first()).copied()
    }

    /// Non-empty cells and their windows.
    pub fn window_assignments(&self) -> BTreeMap<String, Vec<WindowId>> {
        self.cells
            .iter()
            .filter(|(_, c)| !c.windows.is_empty())
            .map(|(id, c)| (id.clone(), c.windows.clone()))
            .collect()
    }

    /// Replaces every cell's windows. Stack mode overrides survive for cells
    /// that are still assigned; ratios reset to equal splits.
    pub fn set_window_assignments(&mut self, assignments: &BTreeMap<String, Vec<WindowId>>) {
        let mut previous = std::mem::take(&mut self.cells);
        for (cell_id, windows) in assignments {
            let mut cell = previous.remove(cell_id).unwrap_or_else(|| CellState::new(cell_id));
            cell.set_windows(windows.clone());
            self.cells.insert(cell_id.clone(), cell);
        }
    }

    /// Exchanges the windows at `a` and `b` in `cell_id`, ratios included.
    pub fn swap_windows(&mut self, cell_id: &str, a: usize, b: usize) -> bool {
        let Some(cell) = self.cells.get_mut(cell_id) else {
            return false;
        };
        if a >= cell.windows.len() || b >= cell.windows.len() {
            return false;
        }
        cell.windows.swap(a, b);
        if cell.split_ratios.len() == cell.windows.len() {
            cell.split_ratios.swap(a, b);
        }
        true
    }

    pub fn window_count(&self) -> usize { self.cells.values().map(|c| c.windows.len()).sum() }

    pub fn has_state(&self) -> bool { self.current_layout_id.is_some() || !self.cells.is_empty() }
}

/// Overview of one space for `grid state show`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceSummary {
    pub current_layout: Option<String>,
    pub cell_count: usize,
    pub window_count: usize,
    pub focused_cell: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSummary {
    pub version: u32,
    pub last_updated: DateTime<Utc>,
    pub space_count: usize,
    pub spaces: BTreeMap<String, SpaceSummary>,
}

impl RuntimeState {
    pub fn space(&self, space_id: &str) -> Option<&SpaceState> { self.spaces.get(space_id) }

    /// The space's state, created empty on first use.
    pub fn space_mut(&mut self, space_id: &str) -> &mut SpaceState {
        self.spaces
            .entry(space_id.to_string())
            .or_insert_with(|| SpaceState::new(space_id))
    }

    pub fn remove_space(&mut self, space_id: &str) -> Option<SpaceState> {
        self.spaces.remove(space_id)
    }

    pub fn mark_updated(&mut self) { self.last_updated = Utc::now(); }

    /// Brings a state read from an older file up to [`STATE_VERSION`].
    pub fn migrate(&mut self) {
        if self.version < STATE_VERSION {
            self.version = STATE_VERSION;
        }
        for (space_id, space) in &mut self.spaces {
            if space.space_id.is_empty() {
                space.space_id = space_id.clone();
            }
            for (cell_id, cell) in &mut space.cells {
                if cell.cell_id.is_empty() {
                    cell.cell_id = cell_id.clone();
                }
                if cell.split_ratios.len() != cell.windows.len() {
                    cell.reset_ratios();
                }
                cell.clamp_focus();
            }
        }
    }

    /// Every window id known in any space, without duplicates.
    pub fn all_window_ids(&self) -> Vec<WindowId> {
        let mut seen = HashSet::default();
        self.spaces
            .values()
            .flat_map(|s| s.cells.values())
            .flat_map(|c| c.windows.iter().copied())
            .filter(|w| seen.insert(*w))
            .collect()
    }

    pub fn cell_windows(&self, space_id: &str, cell_id: &str) -> Vec<WindowId> {
        self.space(space_id)
            .and_then(|s| s.cell(cell_id))
            .map(|c| c.windows.clone())
            .unwrap_or_default()
    }

    pub fn cell_split_ratios(&self, space_id: &str, cell_id: &str) -> Vec<f64> {
        self.space(space_id)
            .and_then(|s| s.cell(cell_id))
            .map(|c| c.split_ratios.clone())
            .unwrap_or_default()
    }

    pub fn cell_stack_mode(&self, space_id: &str, cell_id: &str) -> Option<StackMode> {
        self.space(space_id)?.cell(cell_id)?.stack_mode
    }

    pub fn set_cell_stack_mode(&mut self, space_id: &str, cell_id: &str, mode: Option<StackMode>) {
        self.space_mut(space_id).cell_entry(cell_id).stack_mode = mode;
    }

    pub fn current_layout_for_space(&self, space_id: &str) -> Option<&str> {
        self.space(space_id)?.current_layout_id.as_deref()
    }

    pub fn window_assignments(&self, space_id: &str) -> BTreeMap<String, Vec<WindowId>> {
        self.space(space_id).map(SpaceState::window_assignments).unwrap_or_default()
    }

    pub fn set_window_assignments(
        &mut self,
        space_id: &str,
        assignments: &BTreeMap<String, Vec<WindowId>>,
    ) {
        self.space_mut(space_id).set_window_assignments(assignments);
    }

    pub fn has_state(&self, space_id: &str) -> bool {
        self.space(space_id).is_some_and(SpaceState::has_state)
    }

    pub fn summary(&self) -> StateSummary {
        StateSummary {
            version: self.version,
            last_updated: self.last_updated,
            space_count: self.spaces.len(),
            spaces: self
                .spaces
                .iter()
                .map(|(id, space)| {
                    (id.clone(), SpaceSummary {
                        current_layout: space.current_layout_id.clone(),
                        cell_count: space.cells.len(),
                        window_count: space.window_count(),
                        focused_cell: space.focused_cell.clone(),
                    })
                })
                .collect(),
        }
    }
}
