use serde::{Deserialize, Serialize};
use tracing::trace;

use super::assignment::{AppRule, AssignmentResult, AssignmentStrategy, assign_windows};
use super::cells::{CalculatedLayout, Layout, calculate_layout};
use super::spacing::{
    PaddingSpec, SpacingLevels, SpacingValue, resolve_padding, resolve_window_spacing,
};
use super::stacking::{StackOptions, WindowPlacement, place_windows};
use super::{ConfigurationError, Direction, StackMode};
use crate::common::collections::BTreeMap;
use crate::model::state::{CellState, SpaceState};
use crate::sys::geometry::{Rect, Round};
use crate::sys::window_server::{WindowId, WindowInfo};

#[non_exhaustive]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LayoutCommand {
    ApplyLayout {
        layout: String,
        #[serde(default)]
        strategy: Option<AssignmentStrategy>,
    },
    CycleLayout,
    PreviousLayout,
    ReapplyLayout,

    MoveFocus {
        direction: Direction,
        #[serde(default)]
        wrap: bool,
        #[serde(default)]
        extend: bool,
    },
    FocusCell(String),
    NextWindow,
    PrevWindow,

    MoveWindow {
        direction: Direction,
        #[serde(default)]
        wrap: bool,
        #[serde(default)]
        extend: bool,
    },
    SendWindow(Direction),
    SwapWindow(Direction),

    ResizeWindowBy {
        amount: f64,
    },
    ResetSplits,
    ResetAllSplits,
    SetCellStackMode {
        cell: String,
        mode: Option<StackMode>,
    },

    Sync,
}

/// What a command did. Placements are in the order they were issued.
#[must_use]
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    pub placements: Vec<WindowPlacement>,
    pub focus_window: Option<WindowId>,
    pub affected_cells: Vec<String>,
    pub layout_id: Option<String>,
    /// Set when the command ran but had nothing to do.
    pub message: Option<String>,
}

impl CommandResponse {
    pub fn noop(message: impl Into<String>) -> Self {
        CommandResponse { message: Some(message.into()), ..Default::default() }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EngineSettings {
    /// Gap between cells.
    pub gap: f64,
    /// Unit for relative (`"2x"`) spacing values.
    pub base_spacing: f64,
    pub default_stack_mode: StackMode,
    pub padding: Option<PaddingSpec>,
    pub window_spacing: Option<SpacingValue>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            gap: 8.0,
            base_spacing: 8.0,
            default_stack_mode: StackMode::Vertical,
            padding: None,
            window_spacing: None,
        }
    }
}

/// Holds the configured layouts and turns them, together with runtime state,
/// into window placements.
#[derive(Clone, Debug, Default)]
pub struct LayoutEngine {
    layouts: Vec<Layout>,
    app_rules: Vec<AppRule>,
    settings: EngineSettings,
}

impl LayoutEngine {
    pub fn new(layouts: Vec<Layout>, app_rules: Vec<AppRule>, settings: EngineSettings) -> Self {
        LayoutEngine { layouts, app_rules, settings }
    }

    pub fn settings(&self) -> &EngineSettings { &self.settings }

    pub fn layouts(&self) -> &[Layout] { &self.layouts }

    pub fn app_rules(&self) -> &[AppRule] { &self.app_rules }

    pub fn layout(&self, id: &str) -> Result<&Layout, ConfigurationError> {
        self.layouts
            .iter()
            .find(|l| l.id == id)
            .ok_or_else(|| ConfigurationError::UnknownLayout(id.to_string()))
    }

    pub fn layout_ids(&self) -> Vec<String> { self.layouts.iter().map(|l| l.id.clone()).collect() }

    pub fn calculate(
        &self,
        layout: &Layout,
        screen: Rect,
    ) -> Result<CalculatedLayout, ConfigurationError> {
        calculate_layout(layout, screen, self.settings.gap)
    }

    pub fn assign(
        &self,
        layout: &Layout,
        calculated: &CalculatedLayout,
        windows: &[WindowInfo],
        previous: &BTreeMap<String, Vec<WindowId>>,
        strategy: AssignmentStrategy,
    ) -> Result<AssignmentResult, ConfigurationError> {
        assign_windows(
            windows,
            layout,
            &calculated.cell_bounds,
            &self.app_rules,
            previous,
            strategy,
        )
    }

    /// Stack mode for `cell_id`, lowest to highest precedence: settings
    /// default, an app rule pinning to the cell, the cell definition, the
    /// layout's `cell_modes`, the runtime override.
    pub fn effective_stack_mode(
        &self,
        layout: &Layout,
        cell_id: &str,
        state: Option<&CellState>,
    ) -> StackMode {
        state
            .and_then(|c| c.stack_mode)
            .or_else(|| layout.cell_modes.get(cell_id).copied())
            .or_else(|| layout.cell(cell_id).and_then(|c| c.stack_mode))
            .or_else(|| self.rule_stack_mode(&layout.id, cell_id))
            .unwrap_or(self.settings.default_stack_mode)
    }

    fn rule_stack_mode(&self, layout_id: &str, cell_id: &str) -> Option<StackMode> {
        self.app_rules
            .iter()
            .filter(|r| r.applies_to(layout_id) && r.preferred_cell.as_deref() == Some(cell_id))
            .find_map(|r| r.preferred_stack_mode)
    }

    /// Padding and window spacing for `cell_id`, cell over layout over
    /// settings.
    pub fn stack_options(&self, layout: &Layout, cell_id: &str, mode: StackMode) -> StackOptions {
        let cell = layout.cell(cell_id);
        let base = self.settings.base_spacing;
        let padding = resolve_padding(
            SpacingLevels {
                cell: cell.and_then(|c| c.padding.as_ref()),
                layout: layout.padding.as_ref(),
                global: self.settings.padding.as_ref(),
            },
            base,
        );
        let window_spacing = resolve_window_spacing(
            SpacingLevels {
                cell: cell.and_then(|c| c.window_spacing.as_ref()),
                layout: layout.window_spacing.as_ref(),
                global: self.settings.window_spacing.as_ref(),
            },
            base,
        );
        StackOptions { mode, padding, window_spacing }
    }

    /// Placements for the windows of one cell. An unknown cell places
    /// nothing.
    pub fn cell_placements(
        &self,
        layout: &Layout,
        calculated: &CalculatedLayout,
        cell_id: &str,
        windows: &[WindowId],
        state: Option<&CellState>,
    ) -> Vec<WindowPlacement> {
        let Some(bounds) = calculated.bounds(cell_id) else {
            return Vec::new();
        };
        let mode = self.effective_stack_mode(layout, cell_id, state);
        let options = self.stack_options(layout, cell_id, mode);
        let ratios = state.map(|c| c.split_ratios.as_slice()).unwrap_or_default();
        trace!(cell = cell_id, %mode, windows = windows.len(), "placing cell");
        let mut placements = place_windows(bounds, windows, ratios, &options);
        for placement in &mut placements {
            placement.frame = placement.frame.round();
        }
        placements
    }

    /// Placements for every cell in `assignments`, in cell id order. Stack
    /// modes and ratios come from `space` where it has them.
    pub fn window_placements(
        &self,
        layout: &Layout,
        calculated: &CalculatedLayout,
        assignments: &BTreeMap<String, Vec<WindowId>>,
        space: Option<&SpaceState>,
    ) -> Vec<WindowPlacement> {
        assignments
            .iter()
            .flat_map(|(cell_id, windows)| {
                let state = space.and_then(|s| s.cell(cell_id));
                self.cell_placements(layout, calculated, cell_id, windows, state)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::layout_engine::cells::Cell;
    use crate::layout_engine::tracks::TrackSize;

    fn split_layout() -> Layout {
        Layout {
            id: "split".into(),
            name: "Split".into(),
            columns: vec![TrackSize::Fr(1.0), TrackSize::Fr(1.0)],
            rows: vec![TrackSize::Fr(1.0)],
            cells: vec![
                Cell::new("left", (1, 2), (1, 2)),
                Cell::new("right", (2, 3), (1, 2)).with_stack_mode(StackMode::Horizontal),
            ],
            ..Default::default()
        }
    }

    fn engine(layout: Layout) -> LayoutEngine {
        LayoutEngine::new(vec![layout], vec![], EngineSettings { gap: 0.0, ..Default::default() })
    }

    mod stack_modes {
        use pretty_assertions::assert_eq;

        use super::*;

        #[test]
        fn precedence() {
            let mut layout = split_layout();
            let mut engine = engine(layout.clone());
            assert_eq!(engine.effective_stack_mode(&layout, "left", None), StackMode::Vertical);
            assert_eq!(engine.effective_stack_mode(&layout, "right", None), StackMode::Horizontal);

            engine.app_rules.push(AppRule {
                app: "Terminal".into(),
                preferred_cell: Some("left".into()),
                preferred_stack_mode: Some(StackMode::Tabs),
                ..Default::default()
            });
            assert_eq!(engine.effective_stack_mode(&layout, "left", None), StackMode::Tabs);

            layout.cell_modes.insert("right".into(), StackMode::Vertical);
            assert_eq!(engine.effective_stack_mode(&layout, "right", None), StackMode::Vertical);

            let state = CellState { stack_mode: Some(StackMode::Tabs), ..CellState::new("right") };
            assert_eq!(engine.effective_stack_mode(&layout, "right", Some(&state)), StackMode::Tabs);
        }

        #[test]
        fn rule_for_other_layout_is_ignored() {
            let layout = split_layout();
            let mut engine = engine(layout.clone());
            engine.app_rules.push(AppRule {
                app: "Terminal".into(),
                preferred_cell: Some("left".into()),
                layouts: vec!["other".into()],
                preferred_stack_mode: Some(StackMode::Tabs),
                ..Default::default()
            });
            assert_eq!(engine.effective_stack_mode(&layout, "left", None), StackMode::Vertical);
        }
    }

    mod placements {
        use pretty_assertions::assert_eq;

        use super::*;

        #[test]
        fn cell_spacing_overrides_layout() {
            let mut layout = split_layout();
            layout.padding = Some(PaddingSpec::uniform(SpacingValue::Pixels(10.0)));
            layout.cells[1].padding = Some(PaddingSpec::uniform(SpacingValue::Relative(0.0)));
            layout.window_spacing = Some(SpacingValue::Relative(1.0));
            let engine = engine(layout.clone());

            let left = engine.stack_options(&layout, "left", StackMode::Vertical);
            assert_eq!(left.padding.top, 10.0);
            assert_eq!(left.window_spacing, 8.0);
            let right = engine.stack_options(&layout, "right", StackMode::Vertical);
            assert_eq!(right.padding.left, 0.0);
        }

        #[test]
        fn places_every_assigned_window() {
            let layout = split_layout();
            let engine = engine(layout.clone());
            let calculated = engine.calculate(&layout, Rect::new(0.0, 0.0, 1000.0, 600.0)).unwrap();
            let assignments = BTreeMap::from([
                ("left".to_string(), vec![WindowId::new(1)]),
                ("right".to_string(), vec![WindowId::new(2), WindowId::new(3)]),
            ]);
            let placements = engine.window_placements(&layout, &calculated, &assignments, None);
            assert_eq!(placements, vec![
                WindowPlacement {
                    window_id: WindowId::new(1),
                    frame: Rect::new(0.0, 0.0, 500.0, 600.0),
                },
                WindowPlacement {
                    window_id: WindowId::new(2),
                    frame: Rect::new(500.0, 0.0, 250.0, 600.0),
                },
                WindowPlacement {
                    window_id: WindowId::new(3),
                    frame: Rect::new(750.0, 0.0, 250.0, 600.0),
                },
            ]);
        }

        #[test]
        fn frames_land_on_whole_pixels() {
            let layout = split_layout();
            let engine = engine(layout.clone());
            let calculated = engine.calculate(&layout, Rect::new(0.0, 0.0, 1000.0, 600.0)).unwrap();
            let assignments = BTreeMap::from([(
                "right".to_string(),
                vec![WindowId::new(1), WindowId::new(2), WindowId::new(3)],
            )]);
            let frames: Vec<Rect> = engine
                .window_placements(&layout, &calculated, &assignments, None)
                .into_iter()
                .map(|p| p.frame)
                .collect();
            assert_eq!(frames, vec![
                Rect::new(500.0, 0.0, 167.0, 600.0),
                Rect::new(667.0, 0.0, 166.0, 600.0),
                Rect::new(833.0, 0.0, 167.0, 600.0),
            ]);
        }

        #[test]
        fn state_ratios_are_used() {
            let layout = split_layout();
            let engine = engine(layout.clone());
            let calculated = engine.calculate(&layout, Rect::new(0.0, 0.0, 1000.0, 600.0)).unwrap();
            let mut space = SpaceState::new("1");
            space.set_window_assignments(&BTreeMap::from([(
                "left".to_string(),
                vec![WindowId::new(1), WindowId::new(2)],
            )]));
            space.cell_mut("left").unwrap().split_ratios = vec![0.25, 0.75];

            let placements = engine.window_placements(
                &layout,
                &calculated,
                &space.window_assignments(),
                Some(&space),
            );
            assert_eq!(placements[0].frame, Rect::new(0.0, 0.0, 500.0, 150.0));
            assert_eq!(placements[1].frame, Rect::new(0.0, 150.0, 500.0, 450.0));
        }

        #[test]
        fn unknown_layout() {
            let engine = engine(split_layout());
            assert_eq!(
                engine.layout("nope").unwrap_err(),
                ConfigurationError::UnknownLayout("nope".into())
            );
            assert_eq!(engine.layout_ids(), vec!["split".to_string()]);
        }
    }
}
