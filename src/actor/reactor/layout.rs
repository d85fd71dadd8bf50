use tracing::{debug, info};

use super::{Reactor, ReactorError};
use crate::layout_engine::splits::initialize_split_ratios;
use crate::layout_engine::{
    AssignmentStrategy, CommandResponse, ConfigurationError, NavigationError, StackMode,
};
use crate::model::SpaceState;
use crate::sys::window_server::{Snapshot, WindowServer};

impl<S: WindowServer> Reactor<S> {
    /// Distributes the snapshot's windows over `layout_id` and places them.
    pub(super) async fn apply_layout(
        &self,
        snapshot: &Snapshot,
        layout_id: &str,
        strategy: Option<AssignmentStrategy>,
    ) -> Result<CommandResponse, ReactorError> {
        let layout = self.engine.layout(layout_id)?;
        let calculated = self.engine.calculate(layout, snapshot.display_bounds)?;
        let space_id = snapshot.space_id.as_str();
        let prior = self.space_state(space_id);
        let strategy = strategy.unwrap_or(self.config.settings.assignment_strategy);

        let result = self.engine.assign(
            layout,
            &calculated,
            &snapshot.windows,
            &prior.window_assignments(),
            strategy,
        )?;

        let index = self
            .config
            .space_layouts(space_id)
            .iter()
            .position(|id| id == layout_id)
            .unwrap_or(0);
        let mut next = SpaceState::new(space_id);
        next.set_current_layout(layout_id, index);
        next.set_window_assignments(&result.assignments);
        if prior.current_layout_id.as_deref() == Some(layout_id) {
            carry_over_cells(&prior, &mut next);
        }
        let focused = snapshot
            .focused_window_id
            .and_then(|id| next.window_cell(id))
            .map(|(cell, i)| (cell.to_owned(), i));
        if let Some((cell, i)) = focused {
            next.set_focus(&cell, i);
        }

        let placements =
            self.engine.window_placements(layout, &calculated, &result.assignments, Some(&next));
        self.apply_placements(&placements).await?;
        info!(
            layout = layout_id,
            space = space_id,
            %strategy,
            placed = placements.len(),
            floating = result.floating.len(),
            "applied layout"
        );

        let affected_cells = result
            .assignments
            .iter()
            .filter(|(_, windows)| !windows.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        self.store_space(next);
        Ok(CommandResponse {
            placements,
            affected_cells,
            layout_id: Some(layout_id.to_string()),
            ..Default::default()
        })
    }

    /// Moves to the next (or previous) layout in the space's cycle list. A
    /// space without a layout starts at its default layout, or else at the
    /// front of the list.
    pub(super) async fn cycle_layout(
        &self,
        snapshot: &Snapshot,
        forward: bool,
    ) -> Result<CommandResponse, ReactorError> {
        let space_id = snapshot.space_id.as_str();
        let layouts = self.config.space_layouts(space_id);
        let mut space = self.space_state(space_id);
        let current = space.current_layout_id.clone();
        let next = match current {
            None => self
                .config
                .space(space_id)
                .and_then(|s| s.default_layout.clone())
                .or_else(|| layouts.first().cloned()),
            Some(_) if forward => space.cycle_layout(&layouts),
            Some(_) => space.previous_layout(&layouts),
        }
        .ok_or(ConfigurationError::NoLayouts)?;
        debug!(space = space_id, from = ?current, to = %next, "cycling layout");
        self.apply_layout(snapshot, &next, None).await
    }

    /// Applies the current layout again, keeping windows in the cells they
    /// already have.
    pub(super) async fn reapply_layout(
        &self,
        snapshot: &Snapshot,
    ) -> Result<CommandResponse, ReactorError> {
        let space_id = snapshot.space_id.as_str();
        let layout_id = self
            .store
            .read(|s| s.current_layout_for_space(space_id).map(str::to_owned))
            .ok_or_else(|| NavigationError::NoLayoutApplied(space_id.to_string()))?;
        self.apply_layout(snapshot, &layout_id, Some(AssignmentStrategy::Preserve)).await
    }

    /// Overrides (or with `None`, clears the override of) a cell's stack mode
    /// and re-places that cell.
    pub(super) async fn set_cell_stack_mode(
        &self,
        snapshot: &Snapshot,
        cell_id: &str,
        mode: Option<StackMode>,
    ) -> Result<CommandResponse, ReactorError> {
        let active = self.active_layout(snapshot)?;
        if !active.layout.has_cell(cell_id) {
            return Err(ConfigurationError::UnknownCell {
                layout: active.layout.id.clone(),
                cell: cell_id.to_string(),
            }
            .into());
        }
        let mut next = self.space_state(&active.space_id);
        next.cell_entry(cell_id).stack_mode = mode;
        let mode = self.engine.effective_stack_mode(&active.layout, cell_id, next.cell(cell_id));
        info!(cell = cell_id, %mode, "stack mode set");
        self.commit_cells(&active, next, &[cell_id.to_string()]).await
    }

    /// Puts the focused cell back to an equal split.
    pub(super) async fn reset_focused_splits(
        &self,
        snapshot: &Snapshot,
    ) -> Result<CommandResponse, ReactorError> {
        let active = self.active_layout(snapshot)?;
        let mut next = self.space_state(&active.space_id);
        let cell_id = next.focused_cell.clone().ok_or(NavigationError::NoFocusedCell)?;
        let cell = next.cell_entry(&cell_id);
        cell.split_ratios = initialize_split_ratios(cell.windows.len());
        self.commit_cells(&active, next, &[cell_id]).await
    }

    pub(super) async fn reset_all_splits(
        &self,
        snapshot: &Snapshot,
    ) -> Result<CommandResponse, ReactorError> {
        let active = self.active_layout(snapshot)?;
        let mut next = self.space_state(&active.space_id);
        for cell in next.cells.values_mut() {
            cell.split_ratios = initialize_split_ratios(cell.windows.len());
        }
        let cells: Vec<String> = next
            .cells
            .iter()
            .filter(|(_, c)| !c.windows.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        self.commit_cells(&active, next, &cells).await
    }
}

/// Keeps tuning from the last application of the same layout. Stack mode
/// overrides always survive; ratios and the sticky index only where the
/// cell still holds the same windows in the same order.
fn carry_over_cells(prior: &SpaceState, next: &mut SpaceState) {
    for (cell_id, cell) in next.cells.iter_mut() {
        let Some(old) = prior.cell(cell_id) else {
            continue;
        };
        cell.stack_mode = old.stack_mode;
        if old.windows == cell.windows && old.split_ratios.len() == cell.windows.len() {
            cell.split_ratios = old.split_ratios.clone();
            cell.last_focused_idx = old.last_focused_idx;
        }
    }
}
