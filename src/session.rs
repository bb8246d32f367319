use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

const QUALIFIER: &str = "org";
const ORGANIZATION: &str = "richcompose";
const APPLICATION: &str = "richcompose";
const STATE_FILE_NAME: &str = "compose_state.toml";

/// Compose state that survives a restart of the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SessionState {
    /// Paste clipboard text literally
    pub raw: bool,
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to write state file: {0}")]
    Io(#[from] io::Error),
    #[error("toml serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

pub fn state_file_path() -> Option<PathBuf> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
        .map(|dirs| dirs.data_local_dir().join(STATE_FILE_NAME))
}

pub fn load_state(path: &Path) -> Option<SessionState> {
    let contents = fs::read_to_string(path).ok()?;
    match toml::from_str::<SessionState>(&contents) {
        Ok(state) => Some(state),
        Err(err) => {
            log::warn!("Failed to parse state file {}: {err}", path.display());
            None
        }
    }
}

pub fn save_state(path: &Path, state: &SessionState) -> Result<(), StateError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, toml::to_string_pretty(state)?)?;
    Ok(())
}
