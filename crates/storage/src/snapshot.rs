// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot persistence: zstd-compressed JSON, written atomically.

use crate::error::StoreError;
use crate::tables::Tables;
use std::path::Path;

const ZSTD_LEVEL: i32 = 3;

/// Read a snapshot; `None` when the file does not exist yet.
pub(crate) fn read(path: &Path) -> Result<Option<Tables>, StoreError> {
    let compressed = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let bytes = zstd::decode_all(compressed.as_slice())?;
    Ok(Some(serde_json::from_slice(&bytes)?))
}

/// Write a snapshot via tmp + rename so a crash never leaves a torn file.
pub(crate) fn write(path: &Path, tables: &Tables) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let bytes = serde_json::to_vec(tables)?;
    let compressed = zstd::encode_all(bytes.as_slice(), ZSTD_LEVEL)?;

    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, &compressed)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
