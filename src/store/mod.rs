// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Twinmapper and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! File loading, mapping export and paged twin sources.
//!
//! Reads and writes go through `tokio::fs`. Mapping exports are written to a temporary sibling
//! file first and renamed over the target, so a crash never leaves a half-written export.

pub mod source;

use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

use crate::mapping::MappingEntry;

pub use source::{Page, PageSource, TwinPager};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("json error at {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("page {page} is out of range ({pages} pages)")]
    PageOutOfRange { page: usize, pages: usize },
}

/// Reads and parses one JSON document.
pub async fn load_json(path: &Path) -> Result<Value, StoreError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| StoreError::Io { path: path.to_path_buf(), source })?;
    let value = serde_json::from_slice(&bytes)
        .map_err(|source| StoreError::Json { path: path.to_path_buf(), source })?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "loaded json");
    Ok(value)
}

/// Writes mapping entries as a pretty-printed JSON array.
pub async fn save_mappings(path: &Path, entries: &[&MappingEntry]) -> Result<(), StoreError> {
    let mut contents = serde_json::to_vec_pretty(entries)
        .map_err(|source| StoreError::Json { path: path.to_path_buf(), source })?;
    contents.push(b'\n');
    write_atomic(path, &contents).await?;
    tracing::info!(path = %path.display(), entries = entries.len(), "saved mappings");
    Ok(())
}

async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let Some(file_name) = path.file_name() else {
        return Err(StoreError::Io {
            path: path.to_path_buf(),
            source: io::Error::other("path has no file name"),
        });
    };
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    tokio::fs::create_dir_all(parent).await.map_err(io_err(parent))?;

    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
    let tmp_path =
        parent.join(format!(".twinmapper.tmp.{}.{nanos}", file_name.to_string_lossy()));
    tokio::fs::write(&tmp_path, contents).await.map_err(io_err(&tmp_path))?;

    if let Err(source) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(StoreError::Io { path: path.to_path_buf(), source });
    }
    Ok(())
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> StoreError {
    let path = path.to_path_buf();
    move |source| StoreError::Io { path, source }
}
