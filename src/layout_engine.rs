pub mod assignment;
pub mod cells;
pub mod engine;
mod error;
pub(crate) mod graph;
pub mod navigation;
pub mod spacing;
pub mod splits;
pub mod stacking;
pub mod tracks;

pub use assignment::{AppRule, AssignmentResult, AssignmentStrategy};
pub use cells::{CalculatedLayout, Cell, Layout};
pub use engine::{CommandResponse, EngineSettings, LayoutCommand, LayoutEngine};
pub use error::{ConfigurationError, NavigationError};
pub use graph::{Direction, Orientation, StackMode};
pub use spacing::{Insets, PaddingSpec, SpacingValue};
pub use stacking::WindowPlacement;
pub use tracks::TrackSize;
