use std::path::PathBuf;
use thiserror::Error;

/// Error type used across the whole crate.
///
/// Variants are kept specific enough that callers can pattern-match the
/// cause (no usable Java, unreachable remote, corrupt instance) and give
/// targeted guidance instead of a generic failure message.
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON (de)serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialization failed: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("ZIP archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown version: {0}")]
    UnknownVersion(String),

    #[error("Unknown {loader} loader version: {version}")]
    UnknownLoaderVersion { loader: String, version: String },

    #[error("Download failed for {url}: HTTP {status}")]
    Download { url: String, status: u16 },

    #[error("Hash mismatch for {path}: expected {expected}, got {actual}")]
    HashMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Invalid instance name: {0:?}")]
    InvalidInstanceName(String),

    #[error("Instance already exists: {0}")]
    InstanceExists(String),

    #[error("Instance does not exist: {0}")]
    InstanceNotFound(String),

    #[error("Corrupt configuration for instance {name}: {reason}")]
    ConfigCorrupt { name: String, reason: String },

    #[error("Instance {name} has {found} data directories, expected exactly one")]
    AmbiguousInstanceDir { name: String, found: usize },

    #[error("No usable Java runtime could be resolved")]
    JavaNoVersion,

    #[error("Configured Java path is not an executable: {0}")]
    JavaBadSystem(PathBuf),

    #[error("Synchronization failed: all {failed} file transfers failed")]
    SyncFailed { failed: usize },
}
