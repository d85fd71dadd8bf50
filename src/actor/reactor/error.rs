use thiserror::Error;

use crate::layout_engine::{ConfigurationError, NavigationError};
use crate::model::StateIoError;
use crate::sys::window_server::ExternalCallError;

#[derive(Debug, Error)]
pub enum ReactorError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error(transparent)]
    External(#[from] ExternalCallError),
    #[error(transparent)]
    State(#[from] StateIoError),
    #[error("all {0} window placements failed")]
    PlacementsFailed(usize),
}
