//! Audio artifact storage on the filesystem.
//!
//! Artifacts are MP3 files named `{role}_{turn_id}.mp3` under a single
//! directory. Writes are write-once per (turn, role) key; reads prefer the
//! response artifact and fall back to the input recording.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use parley_core::error::ParleyError;
use parley_core::types::{ArtifactRole, TurnId};

/// Filesystem store for per-turn audio artifacts.
#[derive(Debug, Clone)]
pub struct AudioStore {
    dir: PathBuf,
}

impl AudioStore {
    /// Create a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ParleyError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The file name an artifact is stored under. This is what turn rows
    /// record in `audio_ref`.
    pub fn file_name(turn_id: TurnId, role: ArtifactRole) -> String {
        format!("{}_{}.mp3", role.file_prefix(), turn_id)
    }

    /// Store an artifact. Write-once: a second write to the same
    /// (turn, role) key is an error and the existing file is untouched.
    ///
    /// Returns the stored file name.
    pub fn put(
        &self,
        turn_id: TurnId,
        role: ArtifactRole,
        bytes: &[u8],
    ) -> Result<String, ParleyError> {
        let name = Self::file_name(turn_id, role);
        let path = self.dir.join(&name);

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    ParleyError::Storage(format!("Artifact already stored: {}", name))
                } else {
                    ParleyError::Io(e)
                }
            })?;
        file.write_all(bytes)?;

        debug!(file = %name, bytes = bytes.len(), "Audio artifact stored");
        Ok(name)
    }

    /// Read the artifact for a turn, preferring the synthesized response
    /// and falling back to the input recording.
    pub fn get(&self, turn_id: TurnId) -> Result<Vec<u8>, ParleyError> {
        for role in [ArtifactRole::Response, ArtifactRole::Input] {
            let path = self.dir.join(Self::file_name(turn_id, role));
            if path.exists() {
                return Ok(std::fs::read(&path)?);
            }
        }
        Err(ParleyError::NotFound(format!(
            "audio artifact for turn {}",
            turn_id
        )))
    }

    /// Directory the artifacts live in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_store() -> (tempfile::TempDir, AudioStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = AudioStore::new(dir.path().join("audio")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_put_and_get() {
        let (_dir, store) = make_store();
        let id = TurnId::new();

        let name = store
            .put(id, ArtifactRole::Response, b"mp3 bytes")
            .unwrap();
        assert_eq!(name, format!("response_{}.mp3", id));

        let bytes = store.get(id).unwrap();
        assert_eq!(bytes, b"mp3 bytes");
    }

    #[test]
    fn test_get_prefers_response_over_input() {
        let (_dir, store) = make_store();
        let id = TurnId::new();

        store.put(id, ArtifactRole::Input, b"input audio").unwrap();
        store
            .put(id, ArtifactRole::Response, b"response audio")
            .unwrap();

        assert_eq!(store.get(id).unwrap(), b"response audio");
    }

    #[test]
    fn test_get_falls_back_to_input() {
        let (_dir, store) = make_store();
        let id = TurnId::new();

        store.put(id, ArtifactRole::Input, b"input audio").unwrap();

        assert_eq!(store.get(id).unwrap(), b"input audio");
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let (_dir, store) = make_store();
        let err = store.get(TurnId::new()).unwrap_err();
        assert!(matches!(err, ParleyError::NotFound(_)));
    }

    #[test]
    fn test_put_is_write_once() {
        let (_dir, store) = make_store();
        let id = TurnId::new();

        store.put(id, ArtifactRole::Response, b"first").unwrap();
        let err = store.put(id, ArtifactRole::Response, b"second").unwrap_err();
        assert!(matches!(err, ParleyError::Storage(_)));

        // The original bytes survive.
        assert_eq!(store.get(id).unwrap(), b"first");
    }

    #[test]
    fn test_roles_are_independent_keys() {
        let (_dir, store) = make_store();
        let id = TurnId::new();

        store.put(id, ArtifactRole::Input, b"in").unwrap();
        // Same turn, different role is a fresh key.
        store.put(id, ArtifactRole::Response, b"out").unwrap();
    }

    #[test]
    fn test_turns_are_independent() {
        let (_dir, store) = make_store();
        let a = TurnId::new();
        let b = TurnId::new();

        store.put(a, ArtifactRole::Response, b"for a").unwrap();

        assert_eq!(store.get(a).unwrap(), b"for a");
        assert!(matches!(store.get(b), Err(ParleyError::NotFound(_))));
    }

    #[test]
    fn test_new_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("audio");
        let store = AudioStore::new(&nested).unwrap();
        assert!(store.dir().exists());
    }
}
