//! Executes [`LayoutCommand`]s against the window server and runtime state.
//!
//! Every command starts from a fresh snapshot and reconciles the stored state
//! with it before deciding anything. Changes are staged on a copy of the
//! space's state and only stored once the window server took the placements.
//! The store lock is never held across a call to the server.

mod error;
mod focus;
mod layout;
mod reconcile;
mod windows;

#[cfg(test)]
mod testing;

use std::time::Duration;

pub use error::ReactorError;
pub use reconcile::{reconcile, release_active_windows};
use tracing::{debug, info, warn};

use crate::common::config::Config;
use crate::layout_engine::{
    CalculatedLayout, CommandResponse, Layout, LayoutCommand, LayoutEngine, NavigationError,
    WindowPlacement,
};
use crate::model::{SpaceState, StateStore};
use crate::sys::window_server::{
    ExternalCallError, Snapshot, WindowId, WindowServer, with_deadline,
};

pub struct Reactor<S> {
    config: Config,
    engine: LayoutEngine,
    store: StateStore,
    server: S,
    timeout: Duration,
}

/// The layout applied to a space, sized for the display showing it.
struct ActiveLayout {
    space_id: String,
    layout: Layout,
    calculated: CalculatedLayout,
}

impl<S: WindowServer> Reactor<S> {
    pub fn new(config: Config, store: StateStore, server: S) -> Result<Self, ReactorError> {
        let engine = config.engine()?;
        let timeout = config.settings.call_timeout();
        Ok(Reactor { config, engine, store, server, timeout })
    }

    pub fn engine(&self) -> &LayoutEngine { &self.engine }

    pub fn store(&self) -> &StateStore { &self.store }

    pub fn server(&self) -> &S { &self.server }

    pub async fn handle_command(
        &self,
        cmd: LayoutCommand,
    ) -> Result<CommandResponse, ReactorError> {
        info!(?cmd);
        let snapshot = self.snapshot().await?;
        let synced = self.sync(&snapshot);

        match cmd {
            LayoutCommand::ApplyLayout { layout, strategy } => {
                self.apply_layout(&snapshot, &layout, strategy).await
            }
            LayoutCommand::CycleLayout => self.cycle_layout(&snapshot, true).await,
            LayoutCommand::PreviousLayout => self.cycle_layout(&snapshot, false).await,
            LayoutCommand::ReapplyLayout => self.reapply_layout(&snapshot).await,
            LayoutCommand::MoveFocus { direction, wrap, extend } => {
                self.move_focus(&snapshot, direction, wrap, extend).await
            }
            LayoutCommand::FocusCell(cell) => self.focus_cell(&snapshot, &cell).await,
            LayoutCommand::NextWindow => self.cycle_focus(&snapshot, true).await,
            LayoutCommand::PrevWindow => self.cycle_focus(&snapshot, false).await,
            LayoutCommand::MoveWindow { direction, wrap, extend } => {
                self.move_window(&snapshot, direction, wrap, extend).await
            }
            LayoutCommand::SendWindow(direction) => self.send_window(&snapshot, direction).await,
            LayoutCommand::SwapWindow(direction) => self.swap_window(&snapshot, direction).await,
            LayoutCommand::ResizeWindowBy { amount } => {
                self.adjust_focused_split(&snapshot, amount).await
            }
            LayoutCommand::ResetSplits => self.reset_focused_splits(&snapshot).await,
            LayoutCommand::ResetAllSplits => self.reset_all_splits(&snapshot).await,
            LayoutCommand::SetCellStackMode { cell, mode } => {
                self.set_cell_stack_mode(&snapshot, &cell, mode).await
            }
            LayoutCommand::Sync => {
                let space_id = snapshot.space_id.as_str();
                let layout_id = self
                    .store
                    .read(|s| s.current_layout_for_space(space_id).map(str::to_owned));
                if layout_id.is_none() {
                    if let Some(default) = self.auto_apply_layout(space_id) {
                        info!(space = space_id, layout = %default, "applying default layout");
                        return self.apply_layout(&snapshot, &default, None).await;
                    }
                }
                let message = if synced { "state synced" } else { "state already in sync" };
                Ok(CommandResponse {
                    layout_id,
                    message: Some(message.to_string()),
                    ..Default::default()
                })
            }
        }
    }

    /// Reconciles the stored state with `snapshot`. Saves and returns true
    /// when anything changed.
    pub fn sync(&self, snapshot: &Snapshot) -> bool {
        let changed = self.store.write(|state| reconcile(state, snapshot));
        if changed {
            debug!(space = %snapshot.space_id, "state reconciled with snapshot");
            self.store.save_or_warn();
        }
        changed
    }

    /// The space's default layout, if the space wants it applied on sync.
    fn auto_apply_layout(&self, space_id: &str) -> Option<String> {
        self.config.space(space_id).filter(|s| s.auto_apply).and_then(|s| s.default_layout.clone())
    }

    async fn snapshot(&self) -> Result<Snapshot, ReactorError> {
        Ok(with_deadline("snapshot", self.timeout, self.server.snapshot()).await?)
    }

    /// Issues every placement. Individual failures are logged; the call only
    /// fails when none of them went through.
    async fn apply_placements(&self, placements: &[WindowPlacement]) -> Result<(), ReactorError> {
        let mut failed = 0;
        for placement in placements {
            let call = self.server.move_resize(placement.window_id, placement.frame);
            if let Err(e) = with_deadline("move_resize", self.timeout, call).await {
                warn!(window = %placement.window_id, "placement failed: {e}");
                failed += 1;
            }
        }
        if failed > 0 && failed == placements.len() {
            return Err(ReactorError::PlacementsFailed(failed));
        }
        Ok(())
    }

    /// Focuses `window`, raising it when the server refuses focus.
    async fn focus_window(&self, window: WindowId) -> Result<(), ExternalCallError> {
        match with_deadline("focus", self.timeout, self.server.focus(window)).await {
            Ok(()) => Ok(()),
            Err(e) => {
                debug!(%window, "focus failed, raising instead: {e}");
                with_deadline("raise", self.timeout, self.server.raise(window)).await
            }
        }
    }

    fn space_state(&self, space_id: &str) -> SpaceState {
        self.store
            .read(|s| s.space(space_id).cloned())
            .unwrap_or_else(|| SpaceState::new(space_id))
    }

    fn active_layout(&self, snapshot: &Snapshot) -> Result<ActiveLayout, ReactorError> {
        let space_id = snapshot.space_id.as_str();
        let layout_id = self
            .store
            .read(|s| s.current_layout_for_space(space_id).map(str::to_owned))
            .ok_or_else(|| NavigationError::NoLayoutApplied(space_id.to_string()))?;
        let layout = self.engine.layout(&layout_id)?.clone();
        let calculated = self.engine.calculate(&layout, snapshot.display_bounds)?;
        Ok(ActiveLayout {
            space_id: space_id.to_string(),
            layout,
            calculated,
        })
    }

    fn store_space(&self, space: SpaceState) {
        self.store.write(|s| {
            s.spaces.insert(space.space_id.clone(), space);
        });
        self.store.save_or_warn();
    }

    /// Placements for `cells` as they are laid out in `space`.
    fn placements_for(
        &self,
        active: &ActiveLayout,
        space: &SpaceState,
        cells: &[String],
    ) -> Vec<WindowPlacement> {
        cells
            .iter()
            .flat_map(|cell_id| {
                let state = space.cell(cell_id);
                let windows = state.map(|c| c.windows.as_slice()).unwrap_or_default();
                self.engine.cell_placements(
                    &active.layout,
                    &active.calculated,
                    cell_id,
                    windows,
                    state,
                )
            })
            .collect()
    }

    /// Places `cells` as they are in `next`, then stores `next` as the space's
    /// state. Nothing is stored when every placement failed.
    async fn commit_cells(
        &self,
        active: &ActiveLayout,
        next: SpaceState,
        cells: &[String],
    ) -> Result<CommandResponse, ReactorError> {
        let placements = self.placements_for(active, &next, cells);
        self.apply_placements(&placements).await?;
        self.store_space(next);
        Ok(CommandResponse {
            placements,
            affected_cells: cells.to_vec(),
            layout_id: Some(active.layout.id.clone()),
            ..Default::default()
        })
    }
}
