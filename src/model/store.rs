use std::io;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::state::RuntimeState;

#[derive(Debug, Error)]
pub enum StateIoError {
    #[error("failed to read state file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse state file {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("failed to write state file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to encode state: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub fn default_state_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".local").join("state").join("grid").join("state.json"))
}

/// Owns the [`RuntimeState`] for the life of the process.
///
/// Readers share the lock, mutators take it exclusively. Neither kind of
/// guard is handed out, so it cannot be held across an await point.
pub struct StateStore {
    state: RwLock<RuntimeState>,
    path: Option<PathBuf>,
}

impl StateStore {
    /// A store that never touches disk.
    pub fn in_memory(state: RuntimeState) -> Self {
        StateStore { state: RwLock::new(state), path: None }
    }

    /// Loads the state at `path`. Anything short of a readable, current file
    /// yields an empty state.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match read_state(&path) {
            Ok(Some(state)) => state,
            Ok(None) => {
                debug!(path = %path.display(), "no state file, starting empty");
                RuntimeState::default()
            }
            Err(e) => {
                warn!("{e}; starting from empty state");
                RuntimeState::default()
            }
        };
        StateStore { state: RwLock::new(state), path: Some(path) }
    }

    pub fn path(&self) -> Option<&Path> { self.path.as_deref() }

    pub fn read<R>(&self, f: impl FnOnce(&RuntimeState) -> R) -> R { f(&self.state.read()) }

    pub fn write<R>(&self, f: impl FnOnce(&mut RuntimeState) -> R) -> R {
        f(&mut self.state.write())
    }

    pub fn snapshot(&self) -> RuntimeState { self.state.read().clone() }

    /// Writes the current state to the store's path. Whole-file rewrite; a
    /// concurrent writer elsewhere loses.
    pub fn save(&self) -> Result<(), StateIoError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let state = self.write(|state| {
            state.mark_updated();
            state.clone()
        });
        save_to(&state, path)
    }

    /// Like [`save`](Self::save), but a failure only warns. The in-memory
    /// state stays authoritative either way.
    pub fn save_or_warn(&self) {
        if let Err(e) = self.save() {
            warn!("{e}; keeping in-memory state");
        }
    }

    /// Forgets every space and persists the empty state.
    pub fn reset(&self) -> Result<(), StateIoError> {
        self.write(|state| state.spaces.clear());
        info!("state reset");
        self.save()
    }
}

fn read_state(path: &Path) -> Result<Option<RuntimeState>, StateIoError> {
    let buf = match std::fs::read_to_string(path) {
        Ok(buf) => buf,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(StateIoError::Read { path: path.to_owned(), source }),
    };
    let mut state: RuntimeState = serde_json::from_str(&buf)
        .map_err(|source| StateIoError::Parse { path: path.to_owned(), source })?;
    state.migrate();
    Ok(Some(state))
}

/// Writes `state` next to `path` and renames it into place.
pub fn save_to(state: &RuntimeState, path: &Path) -> Result<(), StateIoError> {
    let write_err = |source| StateIoError::Write { path: path.to_owned(), source };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    let buf = serde_json::to_string_pretty(state)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    let result = std::fs::write(&tmp, buf).and_then(|()| std::fs::rename(&tmp, path));
    if let Err(source) = result {
        _ = std::fs::remove_file(&tmp);
        return Err(write_err(source));
    }
    debug!(path = %path.display(), "saved state");
    Ok(())
}

pub fn load_from(path: &Path) -> Result<RuntimeState, StateIoError> {
    Ok(read_state(path)?.unwrap_or_default())
}
