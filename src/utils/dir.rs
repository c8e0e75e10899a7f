use std::{env, io, path::PathBuf};

use anyhow::{Context, Result};

/// Directory the store and the logs live in. `$XDG_STATE_HOME/posturelog` or
/// `$HOME/.local/state/posturelog` on unix, `%APPDATA%\posturelog` on Windows.
pub fn create_application_default_path() -> Result<PathBuf> {
    let mut path = {
        #[cfg(windows)]
        {
            env::var("APPDATA")
                .map(PathBuf::from)
                .context("APPDATA should be present on Windows")?
        }
        #[cfg(not(windows))]
        {
            env::var("XDG_STATE_HOME")
                .map(PathBuf::from)
                .or_else(|_| env::var("HOME").map(|home| PathBuf::from(home).join(".local/state")))
                .context("Couldn't find neither XDG_STATE_HOME nor HOME")?
        }
    };
    path.push("posturelog");

    ensure_dir(path)
}

pub fn ensure_dir(path: PathBuf) -> Result<PathBuf> {
    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}
