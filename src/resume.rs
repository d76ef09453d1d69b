// ABOUTME: Resume store holding a single continuation cursor on disk
// ABOUTME: Unreadable or empty files are treated as "start from the beginning"

use crate::{platform::Cursor, storage::write_atomic, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_CURSOR_FILE: &str = "cursor.lock";

#[derive(Debug, Clone)]
pub struct ResumeStore {
    path: PathBuf,
}

impl ResumeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ResumeStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Option<Cursor> {
        if !self.path.exists() {
            return None;
        }

        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let cursor = Cursor::new(content);
                if cursor.is_start() {
                    None
                } else {
                    debug!(path = %self.path.display(), cursor = %cursor, "loaded resume cursor");
                    Some(cursor)
                }
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable cursor file");
                None
            }
        }
    }

    pub fn save(&self, cursor: &Cursor) -> Result<()> {
        write_atomic(&self.path, cursor.as_str().as_bytes())?;
        debug!(path = %self.path.display(), cursor = %cursor, "saved resume cursor");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_is_absent() {
        let temp = TempDir::new().unwrap();
        let store = ResumeStore::new(temp.path().join("cursor.lock"));
        assert!(store.load().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let store = ResumeStore::new(temp.path().join("cursor.lock"));
        store.save(&Cursor::new("6512a3f0000000001f03b2c1")).unwrap();

        assert_eq!(
            fs::read_to_string(store.path()).unwrap(),
            "6512a3f0000000001f03b2c1"
        );
        assert_eq!(store.load(), Some(Cursor::new("6512a3f0000000001f03b2c1")));
    }

    #[test]
    fn test_save_overwrites_previous_cursor() {
        let temp = TempDir::new().unwrap();
        let store = ResumeStore::new(temp.path().join("cursor.lock"));
        store.save(&Cursor::new("first")).unwrap();
        store.save(&Cursor::new("second")).unwrap();
        assert_eq!(store.load(), Some(Cursor::new("second")));
    }

    #[test]
    fn test_blank_file_is_absent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cursor.lock");
        fs::write(&path, "  \n").unwrap();
        assert!(ResumeStore::new(path).load().is_none());
    }

    #[test]
    fn test_corrupt_file_is_absent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cursor.lock");
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        assert!(ResumeStore::new(path).load().is_none());
    }

    #[test]
    fn test_directory_in_place_of_file_is_absent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cursor.lock");
        fs::create_dir_all(&path).unwrap();
        assert!(ResumeStore::new(path).load().is_none());
    }
}
