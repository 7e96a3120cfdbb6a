//! XDG-style filesystem locations for profiles, the ICCID store, and logs.

use std::{
    env,
    io::{Error, ErrorKind},
    path::PathBuf,
};

/// Resolves the directories shilld reads and writes.
///
/// Follows the XDG Base Directory specification: state (profiles, the
/// ICCID store) lives under `$XDG_STATE_HOME` (falling back to
/// `$HOME/.local/state`), logs under the same root's `logs/` subdirectory.
pub struct Paths;

impl Paths {
    /// Root directory for all persisted daemon state.
    ///
    /// # Errors
    /// Returns an error if neither `XDG_STATE_HOME` nor `HOME` is set.
    pub fn state_dir() -> Result<PathBuf, Error> {
        let state_home = env::var("XDG_STATE_HOME")
            .or_else(|_| env::var("HOME").map(|home| format!("{home}/.local/state")))
            .map_err(|_| {
                Error::new(
                    ErrorKind::NotFound,
                    "neither XDG_STATE_HOME nor HOME environment variable found",
                )
            })?;

        Ok(PathBuf::from(state_home).join("shill"))
    }

    /// Directory holding one JSON file per named Profile.
    ///
    /// # Errors
    /// See [`Paths::state_dir`].
    pub fn profiles_dir() -> Result<PathBuf, Error> {
        let dir = Self::state_dir()?.join("profiles");
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Path to the ICCID activation-state store.
    ///
    /// # Errors
    /// See [`Paths::state_dir`].
    pub fn iccid_store_path() -> Result<PathBuf, Error> {
        let dir = Self::state_dir()?;
        std::fs::create_dir_all(&dir)?;
        Ok(dir.join("activating_iccid_store.json"))
    }

    /// Directory for rolling log files when running with `--foreground=false`.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn log_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
        let dir = Self::state_dir()?.join("logs");
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}
