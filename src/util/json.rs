use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use tokio::fs::{create_dir_all, read_to_string, write};

/// Reads a JSON file from the specified path and deserializes it into the specified type.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> crate::Result<T> {
    let contents = read_to_string(path).await?;
    Ok(serde_json::from_str(&contents)?)
}

/// Serializes the specified data and writes it to a JSON file at the given
/// path, creating parent directories as needed.
pub async fn write_json<T: Serialize>(path: &Path, data: &T) -> crate::Result<()> {
    write_with(path, serde_json::to_string(data)?).await
}

/// Like [`write_json`] but pretty-printed, for files users may inspect by
/// hand (e.g. the cached sync manifest).
pub async fn write_json_pretty<T: Serialize>(path: &Path, data: &T) -> crate::Result<()> {
    write_with(path, serde_json::to_string_pretty(data)?).await
}

async fn write_with(path: &Path, contents: String) -> crate::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.is_dir() {
            create_dir_all(parent).await?;
        }
    }
    write(path, contents).await?;
    Ok(())
}
