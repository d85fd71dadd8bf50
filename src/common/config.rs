use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

use super::collections::{BTreeMap, HashSet};
use crate::layout_engine::assignment::{AppRule, AssignmentStrategy};
use crate::layout_engine::cells::{Cell, Layout, areas_to_cells};
use crate::layout_engine::spacing::{PaddingSpec, SpacingValue};
use crate::layout_engine::tracks::parse_tracks;
use crate::layout_engine::{ConfigurationError, EngineSettings, LayoutEngine, StackMode};

pub fn config_file() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("grid").join("config.toml"))
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub default_stack_mode: StackMode,
    /// Unit for relative spacing values such as `"2x"`.
    #[serde(default = "default_spacing")]
    pub base_spacing: f64,
    /// Gap between cells.
    #[serde(default = "default_spacing")]
    pub gap: f64,
    #[serde(default)]
    pub padding: Option<PaddingSpec>,
    #[serde(default)]
    pub window_spacing: Option<SpacingValue>,
    #[serde(default)]
    pub assignment_strategy: AssignmentStrategy,
    /// Deadline for every call to the window server.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    #[serde(default)]
    pub state_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            default_stack_mode: StackMode::default(),
            base_spacing: default_spacing(),
            gap: default_spacing(),
            padding: None,
            window_spacing: None,
            assignment_strategy: AssignmentStrategy::default(),
            call_timeout_ms: default_call_timeout_ms(),
            state_file: None,
        }
    }
}

impl Settings {
    pub fn call_timeout(&self) -> Duration { Duration::from_millis(self.call_timeout_ms) }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.base_spacing < 0.0 {
            issues.push(format!("settings.base_spacing must be >= 0 (got {})", self.base_spacing));
        }
        if self.gap < 0.0 {
            issues.push(format!("settings.gap must be >= 0 (got {})", self.gap));
        }
        if self.call_timeout_ms == 0 {
            issues.push("settings.call_timeout_ms must be greater than 0".to_string());
        }
        issues
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct CellConfig {
    pub id: String,
    /// `"start/end"`, 1-indexed, end exclusive.
    pub column: String,
    pub row: String,
    #[serde(default)]
    pub stack_mode: Option<StackMode>,
    #[serde(default)]
    pub padding: Option<PaddingSpec>,
    #[serde(default)]
    pub window_spacing: Option<SpacingValue>,
}

impl CellConfig {
    pub fn to_cell(&self) -> Result<Cell, ConfigurationError> {
        Ok(Cell {
            stack_mode: self.stack_mode,
            padding: self.padding,
            window_spacing: self.window_spacing,
            ..Cell::new(self.id.clone(), parse_span(&self.column)?, parse_span(&self.row)?)
        })
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct LayoutConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub columns: Vec<String>,
    pub rows: Vec<String>,
    #[serde(default)]
    pub cells: Vec<CellConfig>,
    /// One string per row, cell names separated by whitespace.
    #[serde(default)]
    pub areas: Vec<String>,
    #[serde(default)]
    pub cell_modes: BTreeMap<String, StackMode>,
    #[serde(default)]
    pub padding: Option<PaddingSpec>,
    #[serde(default)]
    pub window_spacing: Option<SpacingValue>,
}

impl LayoutConfig {
    pub fn to_layout(&self) -> Result<Layout, ConfigurationError> {
        let columns = parse_tracks(&self.columns)?;
        let rows = parse_tracks(&self.rows)?;

        let cells = if self.areas.is_empty() {
            self.cells.iter().map(CellConfig::to_cell).collect::<Result<Vec<_>, _>>()?
        } else {
            let grid: Vec<Vec<&str>> =
                self.areas.iter().map(|row| row.split_whitespace().collect()).collect();
            if grid.len() != rows.len() {
                return Err(ConfigurationError::MalformedAreas(format!(
                    "{} area rows for {} grid rows",
                    grid.len(),
                    rows.len()
                )));
            }
            if let Some((i, row)) = grid.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
                return Err(ConfigurationError::MalformedAreas(format!(
                    "area row {} has {} names for {} grid columns",
                    i + 1,
                    row.len(),
                    columns.len()
                )));
            }
            areas_to_cells(&grid)?
        };

        let layout = Layout {
            id: self.id.clone(),
            name: if self.name.is_empty() { self.id.clone() } else { self.name.clone() },
            description: self.description.clone(),
            columns,
            rows,
            cells,
            cell_modes: self.cell_modes.clone(),
            padding: self.padding,
            window_spacing: self.window_spacing,
        };
        layout.validate()?;
        Ok(layout)
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct SpaceConfig {
    #[serde(default)]
    pub name: Option<String>,
    /// Cycle order for this space. Empty means every layout.
    #[serde(default)]
    pub layouts: Vec<String>,
    #[serde(default)]
    pub default_layout: Option<String>,
    #[serde(default)]
    pub auto_apply: bool,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub layouts: Vec<LayoutConfig>,
    #[serde(default)]
    pub spaces: BTreeMap<String, SpaceConfig>,
    #[serde(default)]
    pub app_rules: Vec<AppRule>,
}

fn default_spacing() -> f64 { 8.0 }

fn default_call_timeout_ms() -> u64 { 2000 }

/// Parses a `"start/end"` grid span.
pub fn parse_span(s: &str) -> Result<(usize, usize), ConfigurationError> {
    let invalid = || ConfigurationError::InvalidSpan(s.to_string());
    let (start, end) = s.split_once('/').ok_or_else(invalid)?;
    let start = start.trim().parse().map_err(|_| invalid())?;
    let end = end.trim().parse().map_err(|_| invalid())?;
    Ok((start, end))
}

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&buf)
    }

    /// The configuration shipped with the binary.
    pub fn bundled() -> anyhow::Result<Config> { Self::parse(include_str!("../../grid.default.toml")) }

    /// Reads `path`, or the default location, falling back to the bundled
    /// configuration when no file exists there.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Config> {
        match path {
            Some(path) => Self::read(path),
            None => match config_file() {
                Some(path) if path.exists() => Self::read(&path),
                _ => Self::bundled(),
            },
        }
    }

    pub fn parse(buf: &str) -> anyhow::Result<Config> {
        let config: Config = toml::from_str(buf)?;
        let issues = config.validate();
        if !issues.is_empty() {
            bail!("invalid config:\n  {}", issues.join("\n  "));
        }
        Ok(config)
    }

    pub fn layout_config(&self, id: &str) -> Option<&LayoutConfig> {
        self.layouts.iter().find(|l| l.id == id)
    }

    /// Every layout, parsed and validated.
    pub fn layouts(&self) -> Result<Vec<Layout>, ConfigurationError> {
        self.layouts.iter().map(LayoutConfig::to_layout).collect()
    }

    pub fn layout_ids(&self) -> Vec<String> { self.layouts.iter().map(|l| l.id.clone()).collect() }

    pub fn space(&self, space_id: &str) -> Option<&SpaceConfig> { self.spaces.get(space_id) }

    /// Cycle order for `space_id`: its own list if it has one, otherwise
    /// every layout in file order.
    pub fn space_layouts(&self, space_id: &str) -> Vec<String> {
        match self.space(space_id) {
            Some(space) if !space.layouts.is_empty() => space.layouts.clone(),
            _ => self.layout_ids(),
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            gap: self.settings.gap,
            base_spacing: self.settings.base_spacing,
            default_stack_mode: self.settings.default_stack_mode,
            padding: self.settings.padding,
            window_spacing: self.settings.window_spacing,
        }
    }

    pub fn engine(&self) -> Result<LayoutEngine, ConfigurationError> {
        Ok(LayoutEngine::new(self.layouts()?, self.app_rules.clone(), self.engine_settings()))
    }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = self.settings.validate();

        let mut ids = HashSet::default();
        for (i, layout) in self.layouts.iter().enumerate() {
            if layout.id.is_empty() {
                issues.push(format!("layout {}: missing id", i + 1));
                continue;
            }
            if !ids.insert(layout.id.as_str()) {
                issues.push(format!("duplicate layout id {}", layout.id));
            }
            if !layout.cells.is_empty() && !layout.areas.is_empty() {
                issues.push(format!("layout {}: define either cells or areas, not both", layout.id));
            }
            if let Err(e) = layout.to_layout() {
                issues.push(format!("layout {}: {e}", layout.id));
            }
        }

        let mut check_ref = |context: String, id: &str| {
            if ids.contains(id) {
                return;
            }
            match suggest(id, ids.iter().copied()) {
                Some(close) => issues.push(format!(
                    "{context} references unknown layout {id} (did you mean {close}?)"
                )),
                None => issues.push(format!("{context} references unknown layout {id}")),
            }
        };
        for (space_id, space) in &self.spaces {
            for id in &space.layouts {
                check_ref(format!("space {space_id}"), id);
            }
            if let Some(id) = &space.default_layout {
                check_ref(format!("space {space_id} default_layout"), id);
            }
        }
        for (i, rule) in self.app_rules.iter().enumerate() {
            for id in &rule.layouts {
                check_ref(format!("app rule {}", i + 1), id);
            }
        }

        for (i, rule) in self.app_rules.iter().enumerate() {
            if rule.app.trim().is_empty() {
                issues.push(format!("app rule {}: missing app", i + 1));
            }
        }

        issues
    }
}

/// Closest candidate within a small edit distance.
fn suggest<'a>(name: &str, candidates: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    candidates
        .map(|c| (levenshtein(name, c), c))
        .filter(|(d, _)| *d <= 2)
        .min()
        .map(|(_, c)| c)
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    for i in 1..=a.len() {
        let mut row = vec![i; b.len() + 1];
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            row[j] = (prev[j] + 1).min(row[j - 1] + 1).min(prev[j - 1] + cost);
        }
        prev = row;
    }
    prev[b.len()]
}
