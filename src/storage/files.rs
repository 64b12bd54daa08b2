//! Atomic JSON file helpers
//!
//! Every persisted document (run records, step records, cache entries) is
//! written to a sibling temp file and renamed into place, so readers see
//! either the old document or the new one and never a torn write.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::types::Result;

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Serialize `value` as pretty JSON and atomically replace `path`.
pub async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    let content = serde_json::to_string_pretty(value)?;
    let temp = temp_path(path);
    tokio::fs::write(&temp, content.as_bytes()).await?;

    if let Err(e) = tokio::fs::rename(&temp, path).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(e.into());
    }
    Ok(())
}

/// Read a file to string; a missing file is `Ok(None)`.
pub async fn read_if_exists(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_parent_and_leaves_no_temp() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("doc.json");

        write_json_atomic(&path, &json!({"a": 1})).await.unwrap();

        let content = read_if_exists(&path).await.unwrap().unwrap();
        assert!(content.contains("\"a\": 1"));
        assert!(!temp_path(&path).exists());
    }

    #[tokio::test]
    async fn test_write_replaces_existing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doc.json");

        write_json_atomic(&path, &json!({"v": 1})).await.unwrap();
        write_json_atomic(&path, &json!({"v": 2})).await.unwrap();

        let content = read_if_exists(&path).await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["v"], 2);
    }

    #[tokio::test]
    async fn test_read_missing_is_none() {
        let temp_dir = TempDir::new().unwrap();
        assert!(
            read_if_exists(&temp_dir.path().join("absent.json"))
                .await
                .unwrap()
                .is_none()
        );
    }
}
