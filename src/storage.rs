// ABOUTME: Atomic file writes and JSON document persistence
// ABOUTME: Every output file is staged as a .part file and renamed into place

use crate::Result;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

fn staging_path(path: &Path) -> PathBuf {
    let random: u32 = rand::thread_rng().gen();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{:x}.part", name, random))
}

pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = staging_path(path);
    fs::write(&tmp_path, content)?;

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    Ok(())
}

/// Pretty JSON (two-space indent) with non-ASCII text left unescaped.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut body = serde_json::to_vec_pretty(value)?;
    body.push(b'\n');
    write_atomic(path, &body)
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_creates_file_and_parents() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("nested").join("out.txt");
        write_atomic(&target, b"hello").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "hello");
    }

    #[test]
    fn test_write_atomic_leaves_no_part_files() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("out.txt");
        write_atomic(&target, b"one").unwrap();
        write_atomic(&target, b"two").unwrap();

        let names: Vec<String> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["out.txt".to_string()]);
        assert_eq!(fs::read_to_string(&target).unwrap(), "two");
    }

    #[test]
    fn test_write_json_keeps_non_ascii_and_two_space_indent() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("batch.json");
        write_json(&target, &json!([{"title": "周末去哪儿"}])).unwrap();

        let content = fs::read_to_string(&target).unwrap();
        assert!(content.contains("周末去哪儿"));
        assert!(content.contains("\n  {\n    \"title\""));
    }

    #[test]
    fn test_read_json_roundtrips_written_document() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("batch.json");
        write_json(&target, &json!([1, 2, 3])).unwrap();

        let values: Vec<u32> = read_json(&target).unwrap();
        assert_eq!(values, vec![1, 2, 3]);
    }
}
