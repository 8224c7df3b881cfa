use crate::error::CliError;
use crate::model::{fresh_state, validate_state_shape, ChallengeState};
use chrono::{DateTime, Utc};
use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// The shape version lives in the file name. Bump it when `ChallengeState`
/// changes so old files are abandoned instead of misparsed.
pub const STATE_FILE_NAME: &str = "tracker-v1.json";

pub fn resolve_state_path(cli_state_path: Option<&str>) -> Result<PathBuf, CliError> {
    if let Some(p) = cli_state_path.map(|s| s.trim()).filter(|s| !s.is_empty()) {
        return Ok(PathBuf::from(p));
    }

    if let Ok(p) = std::env::var("HARD75_STATE_PATH") {
        let p = p.trim().to_string();
        if !p.is_empty() {
            return Ok(PathBuf::from(p));
        }
    }

    let base = std::env::var("XDG_DATA_HOME")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let home = std::env::var("HOME")
        .ok()
        .or_else(|| std::env::var("USERPROFILE").ok());

    let base = match (base, home) {
        (Some(b), _) => PathBuf::from(b),
        (None, Some(h)) => Path::new(&h).join(".local").join("share"),
        (None, None) => return Err(CliError::io("State IO error: no data directory")),
    };

    Ok(base.join("hard75").join(STATE_FILE_NAME))
}

enum Loaded {
    Stored(ChallengeState),
    Missing,
    Corrupt(String),
}

fn load(state_path: &Path) -> Result<Loaded, CliError> {
    let txt = match fs::read_to_string(state_path) {
        Ok(txt) => txt,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Loaded::Missing),
        Err(e) => return Err(CliError::io(format!("State IO error: {}", e))),
    };

    let state: ChallengeState = match serde_json::from_str(&txt) {
        Ok(s) => s,
        Err(e) => return Ok(Loaded::Corrupt(e.to_string())),
    };
    match validate_state_shape(&state) {
        Ok(()) => Ok(Loaded::Stored(state)),
        Err(reason) => Ok(Loaded::Corrupt(reason)),
    }
}

/// Read-only load. A corrupt file is reported and replaced by a fresh state in
/// memory; the file itself is left for the next locked write to move aside.
pub fn read_state(state_path: &Path, now: DateTime<Utc>) -> Result<ChallengeState, CliError> {
    match load(state_path)? {
        Loaded::Stored(s) => Ok(s),
        Loaded::Missing => Ok(fresh_state(now)),
        Loaded::Corrupt(reason) => {
            tracing::warn!(path = %state_path.display(), %reason, "stored state is corrupt, starting fresh");
            Ok(fresh_state(now))
        }
    }
}

fn corrupt_path(state_path: &Path) -> PathBuf {
    let mut name = state_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".corrupt");
    state_path.with_file_name(name)
}

fn ensure_parent_dir(state_path: &Path) -> Result<(), CliError> {
    let dir = state_path
        .parent()
        .ok_or_else(|| CliError::io("State IO error: no parent directory"))?;
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|e| CliError::io(format!("State IO error: {}", e)))?;

    #[cfg(unix)]
    {
        let _ = fs::set_permissions(dir, fs::Permissions::from_mode(0o700));
    }

    Ok(())
}

/// Exclusive hold on the state file. Mutation and persistence of the
/// challenge happen while one of these is alive.
pub struct StateLock {
    state_path: PathBuf,
    lock_path: PathBuf,
}

impl Drop for StateLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

impl StateLock {
    pub fn acquire(state_path: &Path) -> Result<Self, CliError> {
        ensure_parent_dir(state_path)?;

        let mut lock_name = state_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        lock_name.push(".lock");
        let lock_path = state_path.with_file_name(lock_name);

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(mut file) => {
                #[cfg(unix)]
                {
                    let _ = file.set_permissions(fs::Permissions::from_mode(0o600));
                }
                let _ = writeln!(file, "{}", std::process::id());
                Ok(Self {
                    state_path: state_path.to_path_buf(),
                    lock_path,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(CliError::io("State is locked"))
            }
            Err(e) => Err(CliError::io(format!("State IO error: {}", e))),
        }
    }

    /// Loads the state for mutation. A corrupt file is moved aside to
    /// `<name>.corrupt` so the next commit does not destroy it.
    pub fn load(&self, now: DateTime<Utc>) -> Result<ChallengeState, CliError> {
        match load(&self.state_path)? {
            Loaded::Stored(s) => Ok(s),
            Loaded::Missing => Ok(fresh_state(now)),
            Loaded::Corrupt(reason) => {
                let aside = corrupt_path(&self.state_path);
                tracing::warn!(
                    path = %self.state_path.display(),
                    moved_to = %aside.display(),
                    %reason,
                    "stored state is corrupt, starting fresh"
                );
                fs::rename(&self.state_path, &aside)
                    .map_err(|e| CliError::io(format!("State IO error: {}", e)))?;
                Ok(fresh_state(now))
            }
        }
    }

    pub fn commit(&self, state: &ChallengeState) -> Result<(), CliError> {
        validate_state_shape(state)
            .map_err(|reason| CliError::io(format!("Refusing to write invalid state: {}", reason)))?;

        let dir = self
            .state_path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let tmp_path = dir.join(format!(".{}.tmp.{}", STATE_FILE_NAME, std::process::id()));
        let data = serde_json::to_string_pretty(state)
            .map_err(|e| CliError::io(format!("State IO error: {}", e)))?
            + "\n";

        {
            let mut f = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp_path)
                .map_err(|e| CliError::io(format!("State IO error: {}", e)))?;

            #[cfg(unix)]
            {
                let _ = f.set_permissions(fs::Permissions::from_mode(0o600));
            }

            f.write_all(data.as_bytes())
                .map_err(|e| CliError::io(format!("State IO error: {}", e)))?;
            let _ = f.sync_all();
        }

        fs::rename(&tmp_path, &self.state_path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            CliError::io(format!("State IO error: {}", e))
        })?;

        tracing::debug!(
            path = %self.state_path.display(),
            day_index = state.current_day_index,
            "state persisted"
        );
        Ok(())
    }
}
