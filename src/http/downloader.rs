use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use futures::StreamExt;
use reqwest::Client;
use tokio::{fs::create_dir_all, io::AsyncWriteExt};
use tracing::debug;

use crate::{
    error::Error,
    http::client_or_default,
    minecraft::emitter::{Emit, Emitter, Event},
    util::{hash::calculate_sha1, retry::retry_once},
};

/// A single file scheduled for download, with an optional SHA-1 used both
/// to skip files already cached on disk and to verify fresh downloads.
#[derive(Debug, Clone)]
pub struct DownloadEntry {
    pub url: String,
    pub dest: PathBuf,
    pub sha1: Option<String>,
}

impl DownloadEntry {
    pub fn new(url: impl Into<String>, dest: impl Into<PathBuf>, sha1: Option<String>) -> Self {
        Self {
            url: url.into(),
            dest: dest.into(),
            sha1,
        }
    }

    /// Whether the destination already holds the expected content.
    ///
    /// Entries without a declared hash are considered current whenever the
    /// file exists at all.
    pub fn is_current(&self) -> bool {
        if !self.dest.is_file() {
            return false;
        }
        match &self.sha1 {
            Some(expected) => calculate_sha1(&self.dest)
                .map(|actual| &actual == expected)
                .unwrap_or(false),
            None => true,
        }
    }
}

/// Streams `url` into `dest`, creating parent directories and verifying
/// the SHA-1 when one is declared.
pub async fn download_file(
    client: Option<&Client>,
    url: &str,
    dest: &Path,
    sha1: Option<&str>,
) -> crate::Result<()> {
    if let Some(parent) = dest.parent() {
        if !parent.is_dir() {
            create_dir_all(parent).await?;
        }
    }

    let response = client_or_default(client).get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::Download {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let mut file = tokio::fs::File::create(dest).await?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;
    drop(file);

    if let Some(expected) = sha1 {
        let actual = calculate_sha1(dest)?;
        if actual != expected {
            return Err(Error::HashMismatch {
                path: dest.to_path_buf(),
                expected: expected.to_string(),
                actual,
            });
        }
    }

    debug!("downloaded {url} -> {}", dest.display());
    Ok(())
}

/// Downloads every stale entry of `entries`, a few at a time, emitting one
/// `Downloading` event per completed unit.
///
/// Each unit gets one retry; a second failure aborts the whole batch since
/// the launch environment cannot be considered complete with required
/// files missing.
pub async fn download_all(
    client: Option<&Client>,
    entries: Vec<DownloadEntry>,
    emitter: Option<&Emitter>,
) -> crate::Result<()> {
    let pending: Vec<DownloadEntry> = entries.into_iter().filter(|e| !e.is_current()).collect();
    let total = pending.len() as u64;
    if total == 0 {
        return Ok(());
    }

    let done = AtomicU64::new(0);

    let results: Vec<crate::Result<()>> = futures::stream::iter(pending)
        .map(|entry| {
            let done = &done;
            async move {
                retry_once(&entry.url.clone(), || {
                    let entry = entry.clone();
                    async move {
                        download_file(client, &entry.url, &entry.dest, entry.sha1.as_deref()).await
                    }
                })
                .await?;
                let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
                emitter.emit(Event::Downloading, (finished, total)).await;
                Ok(())
            }
        })
        .buffer_unordered(8)
        .collect()
        .await;

    for result in results {
        result?;
    }
    Ok(())
}
