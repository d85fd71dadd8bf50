use tracing::debug;

use crate::model::{RuntimeState, SpaceState};
use crate::sys::window_server::Snapshot;

/// Brings the snapshot's space back in line with what the server reports.
///
/// Windows that are gone (or no longer tileable) leave their cells, and focus
/// follows the window the server says is focused. Other spaces are not
/// touched since the snapshot says nothing about them. Returns whether
/// anything changed.
pub fn reconcile(state: &mut RuntimeState, snapshot: &Snapshot) -> bool {
    let Some(space) = state.spaces.get_mut(snapshot.space_id.as_str()) else {
        return false;
    };

    let live = snapshot.tileable_ids();
    let focused = space.focused_window();
    let mut changed = false;
    for cell in space.cells.values_mut() {
        if cell.retain_windows(|w| live.contains(&w)) {
            debug!(cell = %cell.cell_id, remaining = cell.windows.len(), "dropped stale windows");
            changed = true;
        }
    }

    // Focus stays on the same window while others before it close.
    let index = space.focused_window;
    space.refocus(focused);
    changed |= space.focused_window != index;

    let external = snapshot
        .focused_window_id
        .and_then(|id| space.window_cell(id))
        .map(|(cell, index)| (cell.to_owned(), index));
    if let Some((cell, index)) = external {
        if space.focused_cell.as_deref() != Some(cell.as_str()) || space.focused_window != index {
            debug!(%cell, index, "focus changed outside of grid");
            space.set_focus(&cell, index);
            changed = true;
        }
    }

    changed
}

/// Drops the snapshot's windows from another space's state.
///
/// The snapshot only lists windows of its own space, so any of them still
/// recorded in `space` is left over from before they moved. Returns whether
/// anything changed.
pub fn release_active_windows(space: &mut SpaceState, snapshot: &Snapshot) -> bool {
    if space.space_id == snapshot.space_id.as_str() {
        return false;
    }
    let focused = space.focused_window();
    let mut changed = false;
    for cell in space.cells.values_mut() {
        if cell.retain_windows(|w| snapshot.window(w).is_none()) {
            debug!(
                space = %space.space_id,
                cell = %cell.cell_id,
                "dropped windows that live on the active space"
            );
            changed = true;
        }
    }
    space.refocus(focused);
    changed
}
