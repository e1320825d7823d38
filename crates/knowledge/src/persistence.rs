//! On-disk storage for index snapshots and base statistics.
//!
//! Snapshots are written to a temporary sibling and renamed into place, so an
//! interrupted save leaves the previous snapshot intact.

use crate::flat_index::FlatIndex;
use crate::types::BaseStats;
use docqa_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Atomically replace the file at `path` with `bytes`.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = temp_path(path);
    tokio::fs::write(&tmp, bytes).await.map_err(|e| {
        AppError::Knowledge(format!("Failed to write {:?}: {}", tmp, e))
    })?;
    tokio::fs::rename(&tmp, path).await.map_err(|e| {
        AppError::Knowledge(format!("Failed to move snapshot into {:?}: {}", path, e))
    })?;

    Ok(())
}

/// Persist a serialized index snapshot.
pub async fn save_index(path: &Path, snapshot: &[u8]) -> AppResult<()> {
    write_atomic(path, snapshot).await?;
    tracing::debug!("Saved index snapshot ({} bytes) to {:?}", snapshot.len(), path);
    Ok(())
}

/// Load an index snapshot, or `None` if none has been saved yet.
pub async fn load_index(path: &Path) -> AppResult<Option<FlatIndex>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(AppError::Knowledge(format!(
                "Failed to read index at {:?}: {}",
                path, e
            )))
        }
    };

    let index = FlatIndex::deserialize(&bytes)?;
    tracing::debug!("Loaded index from {:?}", path);
    Ok(Some(index))
}

pub async fn save_stats(path: &Path, stats: &BaseStats) -> AppResult<()> {
    let json = serde_json::to_vec_pretty(stats)?;
    write_atomic(path, &json).await
}

pub async fn load_stats(path: &Path) -> AppResult<Option<BaseStats>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Delete a file if present; returns whether anything was removed.
pub async fn remove_if_exists(path: &Path) -> AppResult<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chunk, EmbeddedChunk};
    use crate::vector_index::VectorIndex;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_files_load_as_none() {
        let temp = TempDir::new().unwrap();
        assert!(load_index(&temp.path().join("index.json"))
            .await
            .unwrap()
            .is_none());
        assert!(load_stats(&temp.path().join("stats.json"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_save_replaces_and_leaves_no_temp_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("index.json");

        let mut index = FlatIndex::new();
        index
            .add(EmbeddedChunk {
                chunk: Chunk {
                    document_id: "d".to_string(),
                    sequence: 0,
                    start: 0,
                    end: 5,
                    text: "hello".to_string(),
                },
                source: "d.pdf".to_string(),
                content_hash: "h".to_string(),
                vector: vec![0.5, 0.25],
            })
            .unwrap();

        save_index(&path, &FlatIndex::new().serialize().unwrap())
            .await
            .unwrap();
        save_index(&path, &index.serialize().unwrap()).await.unwrap();

        let loaded = load_index(&path).await.unwrap().unwrap();
        assert_eq!(loaded.entries(), index.entries());
        assert!(!temp_path(&path).exists());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index.json");
        tokio::fs::write(&path, b"not json").await.unwrap();

        assert!(matches!(
            load_index(&path).await,
            Err(AppError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_if_exists() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("stats.json");
        assert!(!remove_if_exists(&path).await.unwrap());

        tokio::fs::write(&path, b"{}").await.unwrap();
        assert!(remove_if_exists(&path).await.unwrap());
        assert!(!path.exists());
    }
}
