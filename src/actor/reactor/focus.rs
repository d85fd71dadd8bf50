use tracing::{debug, info};

use super::{ActiveLayout, Reactor, ReactorError, release_active_windows};
use crate::layout_engine::cells::sort_cells_by_position;
use crate::layout_engine::navigation::{
    cycle_window_index, find_adjacent_display, find_closest_cell_to_point, find_opposite_display,
    find_target_cell, match_visual_position,
};
use crate::layout_engine::{CommandResponse, ConfigurationError, Direction, NavigationError};
use crate::model::SpaceState;
use crate::sys::window_server::{Snapshot, WindowServer};

/// A cell on another display, in the layout of the space shown there.
pub(super) struct DisplayTarget {
    pub(super) active: ActiveLayout,
    pub(super) cell: String,
}

pub(super) enum Destination {
    Cell(String),
    Display(DisplayTarget),
}

/// The focused cell, or else the first cell in reading order that holds
/// windows.
pub(super) fn current_cell(
    space: &SpaceState,
    active: &ActiveLayout,
) -> Result<String, NavigationError> {
    if let Some(cell) = space.focused_cell.as_deref().filter(|c| active.layout.has_cell(c)) {
        return Ok(cell.to_owned());
    }
    sort_cells_by_position(&active.calculated.cell_bounds)
        .into_iter()
        .find(|id| space.cell(id).is_some_and(|c| !c.windows.is_empty()))
        .ok_or(NavigationError::NoFocusedCell)
}

impl<S: WindowServer> Reactor<S> {
    pub(super) async fn move_focus(
        &self,
        snapshot: &Snapshot,
        direction: Direction,
        wrap: bool,
        extend: bool,
    ) -> Result<CommandResponse, ReactorError> {
        let active = self.active_layout(snapshot)?;
        let space = self.space_state(&active.space_id);
        let from = current_cell(&space, &active)?;
        match self.destination(snapshot, &active, &from, direction, wrap, extend)? {
            Destination::Cell(cell) => self.focus_cell_at(&active, space, &cell, None).await,
            Destination::Display(target) => {
                let space = self.target_space_state(snapshot, &target);
                self.focus_cell_at(&target.active, space, &target.cell, None).await
            }
        }
    }

    pub(super) async fn focus_cell(
        &self,
        snapshot: &Snapshot,
        cell_id: &str,
    ) -> Result<CommandResponse, ReactorError> {
        let active = self.active_layout(snapshot)?;
        if !active.layout.has_cell(cell_id) {
            return Err(ConfigurationError::UnknownCell {
                layout: active.layout.id.clone(),
                cell: cell_id.to_string(),
            }
            .into());
        }
        let space = self.space_state(&active.space_id);
        self.focus_cell_at(&active, space, cell_id, Some(0)).await
    }

    pub(super) async fn cycle_focus(
        &self,
        snapshot: &Snapshot,
        forward: bool,
    ) -> Result<CommandResponse, ReactorError> {
        let active = self.active_layout(snapshot)?;
        let space = self.space_state(&active.space_id);
        let cell_id = current_cell(&space, &active)?;
        let Some(cell) = space.cell(&cell_id).filter(|c| !c.windows.is_empty()) else {
            return Err(NavigationError::EmptyCell(cell_id).into());
        };
        let current = if space.focused_cell.as_deref() == Some(cell_id.as_str()) {
            space.focused_window
        } else {
            cell.last_focused_idx
        };
        let index = cycle_window_index(current, cell.windows.len(), forward);
        self.focus_cell_at(&active, space, &cell_id, Some(index)).await
    }

    /// Focuses window `index` of `cell_id`, or the cell's last focused window
    /// when no index is given. An empty cell only moves the focus pointer.
    async fn focus_cell_at(
        &self,
        active: &ActiveLayout,
        mut space: SpaceState,
        cell_id: &str,
        index: Option<usize>,
    ) -> Result<CommandResponse, ReactorError> {
        let (windows, sticky) = space
            .cell(cell_id)
            .map(|c| (c.windows.clone(), c.last_focused_idx))
            .unwrap_or_default();
        let index = index.unwrap_or(sticky).min(windows.len().saturating_sub(1));
        let focus_window = windows.get(index).copied();
        match focus_window {
            Some(window) => {
                self.focus_window(window).await?;
                info!(cell = cell_id, %window, "focused");
            }
            None => debug!(cell = cell_id, "focused empty cell"),
        }
        space.set_focus(cell_id, index);
        self.store_space(space);
        Ok(CommandResponse {
            focus_window,
            affected_cells: vec![cell_id.to_string()],
            layout_id: Some(active.layout.id.clone()),
            ..Default::default()
        })
    }

    /// Where a step in `direction` from `from` lands. A neighbour on this
    /// display comes first; with `extend` the search continues onto the next
    /// display, and `wrap` comes back around the far edge.
    pub(super) fn destination(
        &self,
        snapshot: &Snapshot,
        active: &ActiveLayout,
        from: &str,
        direction: Direction,
        wrap: bool,
        extend: bool,
    ) -> Result<Destination, ReactorError> {
        let bounds = &active.calculated.cell_bounds;
        if let Some(cell) = find_target_cell(from, direction, bounds, false) {
            return Ok(Destination::Cell(cell.to_owned()));
        }
        if extend {
            match self.cross_display_target(snapshot, active, from, direction, wrap) {
                Ok(target) => return Ok(Destination::Display(target)),
                Err(e) if !wrap => return Err(e),
                Err(e) => debug!("wrapping on this display: {e}"),
            }
        }
        if wrap {
            if let Some(cell) = find_target_cell(from, direction, bounds, true) {
                return Ok(Destination::Cell(cell.to_owned()));
            }
        }
        Err(NavigationError::NoCellInDirection(direction).into())
    }

    /// The cell on the neighbouring display that sits where `cell_id` sits
    /// on this one.
    /// Stored state of the space shown on another display, without windows
    /// the snapshot places on the active space.
    pub(super) fn target_space_state(
        &self,
        snapshot: &Snapshot,
        target: &DisplayTarget,
    ) -> SpaceState {
        let mut space = self.space_state(&target.active.space_id);
        release_active_windows(&mut space, snapshot);
        space
    }

    fn cross_display_target(
        &self,
        snapshot: &Snapshot,
        active: &ActiveLayout,
        cell_id: &str,
        direction: Direction,
        wrap: bool,
    ) -> Result<DisplayTarget, ReactorError> {
        let no_display = || NavigationError::NoDisplayInDirection(direction);
        let displays = &snapshot.all_displays;
        let current = snapshot.current_display().ok_or_else(no_display)?;
        let source_frame = current.usable_frame().ok_or_else(no_display)?;
        let target = find_adjacent_display(&current.uuid, direction, displays)
            .or_else(|| {
                if wrap { find_opposite_display(&current.uuid, direction, displays) } else { None }
            })
            .ok_or_else(no_display)?;
        let target_frame = target.usable_frame().ok_or_else(no_display)?;
        let space_id = target.current_space_id.as_ref().ok_or_else(no_display)?.to_string();

        let layout_id = self
            .store
            .read(|s| s.current_layout_for_space(&space_id).map(str::to_owned))
            .ok_or_else(|| NavigationError::NoLayoutApplied(space_id.clone()))?;
        let layout = self.engine.layout(&layout_id)?.clone();
        let calculated = self.engine.calculate(&layout, target_frame)?;

        let source_cell = active
            .calculated
            .bounds(cell_id)
            .ok_or(NavigationError::NoCellInDirection(direction))?;
        let point = match_visual_position(source_cell, source_frame, target_frame);
        let cell = find_closest_cell_to_point(point, &calculated.cell_bounds)
            .ok_or(NavigationError::NoCellInDirection(direction))?
            .to_owned();
        debug!(display = %target.uuid, space = %space_id, %cell, "crossing displays");

        Ok(DisplayTarget {
            active: ActiveLayout { space_id, layout, calculated },
            cell,
        })
    }
}
