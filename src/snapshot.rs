use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::farm::{FarmSnapshot, RawSnapshot};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot json error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads raw snapshot exports, resolving relative paths against `base_dir`.
pub struct SnapshotLoader {
    base_dir: PathBuf,
}

impl SnapshotLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn resolve(&self, file: impl AsRef<Path>) -> PathBuf {
        self.base_dir.join(file)
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<RawSnapshot, SnapshotError> {
        let path = self.resolve(file);
        let data = fs::read_to_string(&path).map_err(|source| SnapshotError::Io {
            path: path.clone(),
            source,
        })?;
        parse(&path, &data)
    }

    /// One-shot read: resolves to a complete snapshot or an error, never a
    /// partial one.
    pub async fn load_async(&self, file: impl AsRef<Path>) -> Result<RawSnapshot, SnapshotError> {
        let path = self.resolve(file);
        let data = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| SnapshotError::Io {
                path: path.clone(),
                source,
            })?;
        parse(&path, &data)
    }
}

fn parse(path: &Path, data: &str) -> Result<RawSnapshot, SnapshotError> {
    serde_json::from_str(data).map_err(|source| SnapshotError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportEnvelope<'a> {
    name: &'a str,
    exported_at: DateTime<Utc>,
    snapshot: &'a FarmSnapshot,
}

/// Writes derived farm state to `<dir>/<name>/day_<NNNNN>.json`.
pub struct SnapshotWriter {
    output_dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn write(&self, name: &str, snapshot: &FarmSnapshot) -> Result<PathBuf, SnapshotError> {
        let dir = self.output_dir.join(name);
        fs::create_dir_all(&dir).map_err(|source| SnapshotError::Io {
            path: dir.clone(),
            source,
        })?;
        let file_path = dir.join(format!("day_{:05}.json", snapshot.game_time.day.max(0)));
        let envelope = ExportEnvelope {
            name,
            exported_at: Utc::now(),
            snapshot,
        };
        let json = serde_json::to_string_pretty(&envelope).map_err(|source| SnapshotError::Json {
            path: file_path.clone(),
            source,
        })?;
        fs::write(&file_path, json).map_err(|source| SnapshotError::Io {
            path: file_path.clone(),
            source,
        })?;
        Ok(file_path)
    }
}
