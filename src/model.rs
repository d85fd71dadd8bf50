pub mod state;
pub mod store;

pub use state::{CellState, RuntimeState, SpaceState};
pub use store::{StateIoError, StateStore};
