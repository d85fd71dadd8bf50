use tracing::{debug, info, warn};

use super::focus::{Destination, DisplayTarget};
use super::{ActiveLayout, Reactor, ReactorError};
use crate::layout_engine::navigation::find_target_cell;
use crate::layout_engine::splits::{MINIMUM_RATIO, adjust_split_ratio, initialize_split_ratios};
use crate::layout_engine::{CommandResponse, Direction, NavigationError};
use crate::model::SpaceState;
use crate::sys::window_server::{SpaceId, Snapshot, WindowId, WindowServer, with_deadline};

/// The window moves act on and the cell holding it. Stored focus comes
/// first, then whatever the server reports as focused.
fn focused_window(
    space: &SpaceState,
    snapshot: &Snapshot,
) -> Result<(WindowId, String), NavigationError> {
    let window = space
        .focused_window()
        .or(snapshot.focused_window_id)
        .ok_or(NavigationError::NoFocusedWindow)?;
    let (cell, _) = space.window_cell(window).ok_or(NavigationError::WindowNotAssigned(window))?;
    Ok((window, cell.to_owned()))
}

impl<S: WindowServer> Reactor<S> {
    pub(super) async fn move_window(
        &self,
        snapshot: &Snapshot,
        direction: Direction,
        wrap: bool,
        extend: bool,
    ) -> Result<CommandResponse, ReactorError> {
        let active = self.active_layout(snapshot)?;
        let space = self.space_state(&active.space_id);
        let (window, source) = focused_window(&space, snapshot)?;
        match self.destination(snapshot, &active, &source, direction, wrap, extend)? {
            Destination::Cell(target) => {
                self.relocate(&active, space, window, &source, &target).await
            }
            Destination::Display(target) => {
                let target_space = self.target_space_state(snapshot, &target);
                self.move_across_displays(&active, space, window, &source, target, target_space)
                    .await
            }
        }
    }

    /// Like a move without wrapping or crossing displays. Having nowhere to
    /// go is not an error.
    pub(super) async fn send_window(
        &self,
        snapshot: &Snapshot,
        direction: Direction,
    ) -> Result<CommandResponse, ReactorError> {
        let active = self.active_layout(snapshot)?;
        let space = self.space_state(&active.space_id);
        let (window, source) = focused_window(&space, snapshot)?;
        let bounds = &active.calculated.cell_bounds;
        let Some(target) = find_target_cell(&source, direction, bounds, false) else {
            debug!(cell = %source, %direction, "nothing to send to");
            return Ok(CommandResponse::noop(format!("no cell {direction}")));
        };
        let target = target.to_owned();
        self.relocate(&active, space, window, &source, &target).await
    }

    /// Moves the focused window one step through its cell's stack.
    pub(super) async fn swap_window(
        &self,
        snapshot: &Snapshot,
        direction: Direction,
    ) -> Result<CommandResponse, ReactorError> {
        let active = self.active_layout(snapshot)?;
        let mut space = self.space_state(&active.space_id);
        let cell_id = space.focused_cell.clone().ok_or(NavigationError::NoFocusedCell)?;
        let len = space.cell(&cell_id).map_or(0, |c| c.windows.len());
        if len < 2 {
            return Err(NavigationError::NotEnoughWindows { cell: cell_id, needed: 2 }.into());
        }
        let index = space.focused_window.min(len - 1);
        let other = direction.step(index, len);
        space.swap_windows(&cell_id, index, other);
        space.set_focus(&cell_id, other);
        let window = space.focused_window();
        debug!(cell = %cell_id, from = index, to = other, "swapped windows");

        let mut response = self.commit_cells(&active, space, &[cell_id]).await?;
        response.focus_window = window;
        Ok(response)
    }

    /// Grows the focused window's share of its cell by `delta`, taking it
    /// from the neighbouring window.
    pub(super) async fn adjust_focused_split(
        &self,
        snapshot: &Snapshot,
        delta: f64,
    ) -> Result<CommandResponse, ReactorError> {
        let active = self.active_layout(snapshot)?;
        let mut space = self.space_state(&active.space_id);
        let cell_id = space.focused_cell.clone().ok_or(NavigationError::NoFocusedCell)?;
        let index = space.focused_window;
        let cell = space.cell_entry(&cell_id);
        let len = cell.windows.len();
        if len < 2 {
            return Err(NavigationError::NotEnoughWindows { cell: cell_id, needed: 2 }.into());
        }
        if cell.split_ratios.len() != len {
            cell.split_ratios = initialize_split_ratios(len);
        }
        // The last window only has a boundary before it.
        let (boundary, delta) = if index >= len - 1 { (len - 2, -delta) } else { (index, delta) };
        cell.split_ratios = adjust_split_ratio(&cell.split_ratios, boundary, delta, MINIMUM_RATIO)?;
        debug!(cell = %cell_id, ratios = ?cell.split_ratios, "adjusted split");
        self.commit_cells(&active, space, &[cell_id]).await
    }

    /// Puts `window` at the front of `target`, re-places both cells and
    /// focuses it.
    async fn relocate(
        &self,
        active: &ActiveLayout,
        mut space: SpaceState,
        window: WindowId,
        source: &str,
        target: &str,
    ) -> Result<CommandResponse, ReactorError> {
        space.prepend_window_to_cell(window, target);
        space.set_focus(target, 0);
        let cells = [source.to_owned(), target.to_owned()];
        let mut response = self.commit_cells(active, space, &cells).await?;
        info!(%window, from = source, to = target, "moved window");

        self.follow_focus(window).await;
        response.focus_window = Some(window);
        Ok(response)
    }

    /// Sends `window` to the space on another display and files it in the
    /// target cell there. Once the server moved it, the state follows even if
    /// placing it fails.
    async fn move_across_displays(
        &self,
        active: &ActiveLayout,
        mut source_space: SpaceState,
        window: WindowId,
        source: &str,
        target: DisplayTarget,
        mut target_space: SpaceState,
    ) -> Result<CommandResponse, ReactorError> {
        let space = SpaceId::new(target.active.space_id.clone());
        with_deadline("move_to_space", self.timeout, self.server.move_to_space(window, &space))
            .await?;

        source_space.remove_window(window);
        target_space.prepend_window_to_cell(window, &target.cell);
        target_space.set_focus(&target.cell, 0);

        let source_cells = [source.to_owned()];
        let target_cells = [target.cell.clone()];
        let mut placements = self.placements_for(active, &source_space, &source_cells);
        placements.extend(self.placements_for(&target.active, &target_space, &target_cells));
        self.store_space(source_space);
        self.store_space(target_space);
        info!(%window, %space, cell = %target.cell, "moved window to another display");

        if let Err(e) = self.apply_placements(&placements).await {
            warn!(%window, "window changed displays but could not be placed: {e}");
        }
        self.follow_focus(window).await;
        Ok(CommandResponse {
            placements,
            focus_window: Some(window),
            affected_cells: vec![source.to_owned(), target.cell],
            layout_id: Some(target.active.layout.id),
            message: None,
        })
    }

    /// Focus after a successful move. Failing here does not undo the move.
    async fn follow_focus(&self, window: WindowId) {
        if let Err(e) = self.focus_window(window).await {
            warn!(%window, "window moved but focus did not follow: {e}");
        }
    }
}
