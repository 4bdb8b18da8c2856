//! JSON load/save for parameter structs and reports.

use serde::{de::DeserializeOwned, Serialize};
use std::{fs, path::Path};

#[derive(thiserror::Error, Debug)]
pub enum JsonIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Read and deserialize a JSON document.
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, JsonIoError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Serialize as pretty-printed JSON, creating parent directories as needed.
pub fn write_json<T: Serialize + ?Sized>(
    value: &T,
    path: impl AsRef<Path>,
) -> Result<(), JsonIoError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}
