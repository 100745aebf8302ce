use std::{
    collections::HashSet,
    path::{Component, Path, PathBuf},
};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    error::Error,
    http::{downloader::download_file, fetch::fetch},
    minecraft::emitter::{Emit, Emitter, Event},
    util::{
        hash::calculate_md5,
        json::{read_json, write_json_pretty},
    },
};

/// Directories whose local-only files are deleted during reconciliation.
/// Everything outside these is user data and is never touched.
const MANAGED_DIRS: &[&str] = &[
    "mods",
    "config",
    "shaderpacks",
    "resourcepacks",
    "schematics",
];

/// The client's own settings file. The server may ship a default, but a
/// local copy always wins.
const OPTIONS_FILE: &str = "options.txt";

/// Name of the cached manifest copy inside the game directory.
const CACHE_FILE: &str = "data.json";

/// The remote server's content manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataManifest {
    pub server_id: String,
    pub server_uuid: String,
    pub files: Vec<FileInfo>,
    pub generated: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: String,
    pub md5: String,
    pub size: i64,
    pub modified: i64,
}

/// Manifests are equal when they come from the same generation of the
/// same server and describe the same file set, regardless of ordering.
impl PartialEq for DataManifest {
    fn eq(&self, other: &Self) -> bool {
        if self.server_id != other.server_id
            || self.server_uuid != other.server_uuid
            || self.generated != other.generated
            || self.files.len() != other.files.len()
        {
            return false;
        }
        let mut mine: Vec<&FileInfo> = self.files.iter().collect();
        let mut theirs: Vec<&FileInfo> = other.files.iter().collect();
        mine.sort_by(|a, b| a.path.cmp(&b.path));
        theirs.sort_by(|a, b| a.path.cmp(&b.path));
        mine == theirs
    }
}

/// Where a linked instance synchronizes from.
#[derive(Debug, Clone)]
pub struct SyncProfile {
    pub base_url: String,
    pub server_id: String,
}

impl SyncProfile {
    pub fn new(host: &str, port: u16, server_id: impl Into<String>) -> Self {
        Self {
            base_url: format!("http://{host}:{port}"),
            server_id: server_id.into(),
        }
    }

    fn manifest_url(&self) -> String {
        format!("{}/api/v1/check/data/{}", self.base_url, self.server_id)
    }

    fn download_url(&self, path: &str) -> String {
        format!(
            "{}/api/v1/download/{}/{}",
            self.base_url, self.server_id, path
        )
    }
}

/// Outcome counts of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub downloaded: usize,
    pub skipped: usize,
    pub removed: usize,
    pub failed: usize,
}

/// Fetches the remote content manifest.
pub async fn fetch_manifest(
    profile: &SyncProfile,
    client: Option<&Client>,
) -> crate::Result<DataManifest> {
    fetch(profile.manifest_url(), client).await
}

/// Reconciles `game_dir` with the remote manifest.
///
/// Files already matching their manifest hash are left alone, stale or
/// missing ones are fetched, and local-only files under the managed
/// directories are deleted. A fresh manifest copy is cached on every
/// pass, whether or not any transfer ran. Individual transfer failures
/// are logged and skipped; the pass as a whole fails only when every
/// attempted transfer failed, which indicates the remote itself is
/// broken rather than a few files being momentarily unavailable.
pub async fn sync(
    game_dir: &Path,
    profile: &SyncProfile,
    client: Option<&Client>,
    emitter: Option<&Emitter>,
) -> crate::Result<SyncReport> {
    let manifest = fetch_manifest(profile, client).await?;
    let cache_path = game_dir.join(CACHE_FILE);

    let cached: Option<DataManifest> = match read_json(&cache_path).await {
        Ok(manifest) => Some(manifest),
        Err(_) => None,
    };
    if cached.as_ref() == Some(&manifest) {
        info!("remote content unchanged, skipping reconciliation");
        write_json_pretty(&cache_path, &manifest).await?;
        return Ok(SyncReport {
            skipped: manifest.files.len(),
            ..Default::default()
        });
    }

    let mut report = SyncReport::default();
    let mut transfer_failures = 0usize;
    let mut pending = Vec::new();

    for file in &manifest.files {
        let Some(dest) = sanitized_dest(game_dir, &file.path) else {
            warn!("ignoring manifest entry escaping the game directory: {}", file.path);
            transfer_failures += 1;
            continue;
        };

        if file.path == OPTIONS_FILE && dest.is_file() {
            report.skipped += 1;
            continue;
        }

        if dest.is_file() {
            match calculate_md5(&dest) {
                Ok(actual) if actual == file.md5 => {
                    report.skipped += 1;
                    continue;
                }
                Ok(_) => {}
                Err(err) => warn!("could not hash {}: {err}", dest.display()),
            }
        }

        pending.push((file, dest));
    }

    let total = pending.len() as u64;
    let mut done = 0u64;
    for (file, dest) in pending {
        match transfer(profile, client, file, &dest).await {
            Ok(()) => {
                report.downloaded += 1;
                done += 1;
                emitter.emit(Event::Downloading, (done, total)).await;
            }
            Err(err) => {
                warn!("failed to sync {}: {err}", file.path);
                transfer_failures += 1;
            }
        }
    }

    let (removed, removal_failures) = remove_orphans(game_dir, &manifest);
    report.removed = removed;
    report.failed = transfer_failures + removal_failures;

    write_json_pretty(&cache_path, &manifest).await?;

    // Only transfer failures can fail the pass as a whole; deletion
    // failures are reported but never escalated.
    if transfer_failures > 0 && report.downloaded == 0 {
        return Err(Error::SyncFailed {
            failed: transfer_failures,
        });
    }

    info!(
        "sync finished: {} downloaded, {} current, {} removed, {} failed",
        report.downloaded, report.skipped, report.removed, report.failed
    );
    Ok(report)
}

async fn transfer(
    profile: &SyncProfile,
    client: Option<&Client>,
    file: &FileInfo,
    dest: &Path,
) -> crate::Result<()> {
    download_file(client, &profile.download_url(&file.path), dest, None).await?;
    let actual = calculate_md5(dest)?;
    if actual != file.md5 {
        return Err(Error::HashMismatch {
            path: dest.to_path_buf(),
            expected: file.md5.clone(),
            actual,
        });
    }
    Ok(())
}

/// Resolves a manifest-relative path below `game_dir`, rejecting
/// absolute paths and parent traversal.
fn sanitized_dest(game_dir: &Path, rel: &str) -> Option<PathBuf> {
    let rel = Path::new(rel);
    if rel
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(game_dir.join(rel))
}

/// Deletes files under the managed directories that the manifest no
/// longer lists. Returns `(removed, failed)`; a file that cannot be
/// deleted is logged and left in place, never escalated.
fn remove_orphans(game_dir: &Path, manifest: &DataManifest) -> (usize, usize) {
    let expected: HashSet<PathBuf> = manifest
        .files
        .iter()
        .filter_map(|f| sanitized_dest(game_dir, &f.path))
        .collect();

    let mut removed = 0;
    let mut failed = 0;
    for dir in MANAGED_DIRS {
        let root = game_dir.join(dir);
        if !root.is_dir() {
            continue;
        }
        for file in walk_files(&root) {
            if !expected.contains(&file) {
                match std::fs::remove_file(&file) {
                    Ok(()) => {
                        info!("removing orphaned file {}", file.display());
                        removed += 1;
                    }
                    Err(err) => {
                        warn!("could not remove orphaned file {}: {err}", file.display());
                        failed += 1;
                    }
                }
            }
        }
    }
    (removed, failed)
}

/// Collects every file under `root`, logging and skipping directories
/// that cannot be read.
fn walk_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("could not scan {}: {err}", dir.display());
                continue;
            }
        };
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(err) => {
                    warn!("could not scan {}: {err}", dir.display());
                    continue;
                }
            };
            if path.is_dir() {
                stack.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files
}
