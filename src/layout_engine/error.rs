use thiserror::Error;

use super::Direction;
use crate::sys::window_server::WindowId;

/// Problems with a layout definition. Raised before any state is touched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("invalid track size format: {0:?}")]
    MalformedTrack(String),
    #[error("invalid span {0:?}, expected \"start/end\"")]
    InvalidSpan(String),
    #[error(
        "cell {cell} span columns {col_start}/{col_end} rows {row_start}/{row_end} is outside a {columns}x{rows} grid"
    )]
    CellSpanOutOfRange {
        cell: String,
        col_start: usize,
        col_end: usize,
        row_start: usize,
        row_end: usize,
        columns: usize,
        rows: usize,
    },
    #[error("invalid areas: {0}")]
    MalformedAreas(String),
    #[error("invalid spacing value {0:?}")]
    InvalidSpacing(String),
    #[error("unknown layout {0}")]
    UnknownLayout(String),
    #[error("layout {0} has no cells")]
    NoCells(String),
    #[error("unknown cell {cell} in layout {layout}")]
    UnknownCell { layout: String, cell: String },
    #[error("duplicate cell {cell} in layout {layout}")]
    DuplicateCell { layout: String, cell: String },
    #[error("no layouts available")]
    NoLayouts,
}

/// A command could not find what it was asked to act on. Local state is left
/// unchanged when one of these is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NavigationError {
    #[error("no cell {0}")]
    NoCellInDirection(Direction),
    #[error("no display {0}")]
    NoDisplayInDirection(Direction),
    #[error("no layout applied to space {0}")]
    NoLayoutApplied(String),
    #[error("no focused cell")]
    NoFocusedCell,
    #[error("no focused window")]
    NoFocusedWindow,
    #[error("no windows in cell {0}")]
    EmptyCell(String),
    #[error("window {0} is not assigned to any cell")]
    WindowNotAssigned(WindowId),
    #[error("need at least {needed} windows in cell {cell}")]
    NotEnoughWindows { cell: String, needed: usize },
    #[error("invalid split index {index} for {len} ratios")]
    InvalidSplitIndex { index: usize, len: usize },
}
