//! Options persisted as JSON files in a data directory.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use ur_core::{GameError, OptionStore};

/// Keeps each key in `<dir>/<key>.json`
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl OptionStore for FileStore {
    fn load(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No saved options");
                None
            }
            Err(e) => {
                warn!(path = %path.display(), "Failed to read options: {}", e);
                None
            }
        }
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), GameError> {
        let path = self.path_for(key);
        fs::create_dir_all(&self.dir)
            .and_then(|_| fs::write(&path, value))
            .map_err(|e| GameError::Storage(format!("{}: {}", path.display(), e)))
    }
}
