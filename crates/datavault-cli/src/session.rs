//! Locally saved client token.
//!
//! `register` and `login` save the issued token to
//! `~/.data-vault/auth.json`; authenticated commands read it back and
//! `logout` deletes it. On Unix the directory is created `0700` and the
//! file written `0600`.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

const DIR_NAME: &str = ".data-vault";
const FILE_NAME: &str = "auth.json";

/// The saved token and the login it was issued for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSession {
    pub token: String,
    pub login: String,
}

/// Reads and writes the token file.
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    /// The token file under the user's home directory.
    pub fn in_home() -> Result<Self> {
        let home = directories::BaseDirs::new()
            .ok_or_else(|| anyhow!("could not determine the home directory"))?
            .home_dir()
            .to_path_buf();
        Ok(Self::in_dir(&home))
    }

    /// The token file under `base`.
    pub fn in_dir(base: &Path) -> Self {
        Self {
            path: base.join(DIR_NAME).join(FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `session`, replacing any previous one.
    pub fn save(&self, session: &SavedSession) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            create_private_dir(dir)?;
        }

        let json = serde_json::to_vec_pretty(session)?;
        let mut file = open_private_file(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        file.write_all(&json)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }

    /// Read the saved session, if any.
    pub fn load(&self) -> Result<Option<SavedSession>> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", self.path.display()));
            }
        };
        let session = serde_json::from_slice(&data)
            .with_context(|| format!("corrupt token file {}", self.path.display()))?;
        Ok(Some(session))
    }

    /// Read the saved session or explain how to get one.
    pub fn require(&self) -> Result<SavedSession> {
        self.load()?
            .ok_or_else(|| anyhow!("not logged in; run `datavault login <login>` first"))
    }

    /// Delete the saved session. Returns whether one existed.
    pub fn clear(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("failed to remove {}", self.path.display())),
        }
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> Result<()> {
    use std::os::unix::fs::{DirBuilderExt, PermissionsExt};

    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))
        .with_context(|| format!("failed to restrict {}", dir.display()))
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))
}

#[cfg(unix)]
fn open_private_file(path: &Path) -> std::io::Result<std::fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation.
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private_file(path: &Path) -> std::io::Result<std::fs::File> {
    std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SavedSession {
        SavedSession {
            token: "aaa.bbb.ccc".into(),
            login: "alice".into(),
        }
    }

    #[test]
    fn save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let file = SessionFile::in_dir(dir.path());

        assert_eq!(file.load().unwrap(), None);
        assert!(file.require().is_err());

        file.save(&session()).unwrap();
        assert_eq!(file.load().unwrap(), Some(session()));
        assert_eq!(file.path(), dir.path().join(".data-vault").join("auth.json"));

        assert!(file.clear().unwrap());
        assert!(!file.clear().unwrap());
        assert_eq!(file.load().unwrap(), None);
    }

    #[test]
    fn save_overwrites_previous_token() {
        let dir = tempfile::tempdir().unwrap();
        let file = SessionFile::in_dir(dir.path());

        file.save(&SavedSession {
            token: "a-much-longer-old-token-value".into(),
            login: "alice".into(),
        })
        .unwrap();
        file.save(&session()).unwrap();
        assert_eq!(file.require().unwrap(), session());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = SessionFile::in_dir(dir.path());
        std::fs::create_dir_all(file.path().parent().unwrap()).unwrap();
        std::fs::write(file.path(), b"{not json").unwrap();
        assert!(file.load().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn file_and_dir_are_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let file = SessionFile::in_dir(dir.path());
        file.save(&session()).unwrap();

        let file_mode = std::fs::metadata(file.path()).unwrap().permissions().mode();
        let dir_mode = std::fs::metadata(file.path().parent().unwrap())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(file_mode & 0o777, 0o600);
        assert_eq!(dir_mode & 0o777, 0o700);
    }
}
