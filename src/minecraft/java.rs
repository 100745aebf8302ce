use std::{
    collections::HashMap,
    env,
    path::{Path, PathBuf},
};

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info};

use crate::{
    error::Error,
    http::{
        downloader::{download_all, DownloadEntry},
        fetch::fetch,
    },
    json::version::meta::vanilla::JavaVersion,
    minecraft::{config::Dirs, emitter::Emitter, TARGET_ARCH},
};

const RUNTIME_INDEX_URL: &str =
    "https://launchermeta.mojang.com/v1/products/java-runtime/2ec0cc96c44e5a76b9c8b7c39df7210883d12871/all.json";

/// `java -version` prints `version "21.0.1"` on modern runtimes and
/// `version "1.8.0_292"` on legacy ones; both map to one major number.
static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"version "(?:1\.)?(\d+)"#).unwrap());

/// Per-platform runtime index: platform key to component name to builds.
type RuntimeIndex = HashMap<String, HashMap<String, Vec<RuntimeBuild>>>;

#[derive(Serialize, Deserialize)]
struct RuntimeBuild {
    manifest: ManifestRef,
}

#[derive(Serialize, Deserialize)]
struct ManifestRef {
    url: String,
}

/// The file listing of one runtime build.
#[derive(Serialize, Deserialize)]
struct RuntimeManifest {
    files: HashMap<String, RuntimeFile>,
}

#[derive(Serialize, Deserialize)]
struct RuntimeFile {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    executable: bool,
    downloads: Option<RuntimeDownloads>,
}

#[derive(Serialize, Deserialize)]
struct RuntimeDownloads {
    raw: RawDownload,
}

#[derive(Serialize, Deserialize)]
struct RawDownload {
    url: String,
    sha1: String,
}

/// Resolves a Java executable able to run the given runtime requirement.
///
/// Resolution order: the explicit `configured` path if set, then any
/// suitable runtime already on the system, then a managed runtime
/// provisioned from the Mojang index. An explicitly configured path that
/// is not executable fails immediately rather than silently falling
/// through, the user asked for that exact binary.
pub async fn resolve_java(
    dirs: &Dirs,
    configured: &str,
    required: Option<&JavaVersion>,
    client: Option<&Client>,
    emitter: Option<&Emitter>,
) -> crate::Result<PathBuf> {
    if !configured.is_empty() {
        let path = PathBuf::from(configured);
        if !is_executable(&path) {
            return Err(Error::JavaBadSystem(path));
        }
        return Ok(path);
    }

    let (component, major) = match required {
        Some(java) => (java.component.as_str(), java.major_version),
        // Pre-1.17 descriptors carry no requirement; legacy JRE covers them.
        None => ("jre-legacy", 8),
    };

    if let Some(found) = find_system_java(major).await {
        info!("using system java at {}", found.display());
        return Ok(found);
    }

    provision_runtime(dirs, component, client, emitter).await?;
    let java = dirs.runtime_java_path(component);
    if !is_executable(&java) {
        return Err(Error::JavaNoVersion);
    }
    Ok(java)
}

/// Searches the usual places for a Java binary of at least `major`.
async fn find_system_java(major: u32) -> Option<PathBuf> {
    for candidate in candidate_binaries() {
        if let Some(found_major) = probe_version(&candidate).await {
            if found_major >= major {
                return Some(candidate);
            }
            debug!(
                "{} is java {found_major}, need {major}",
                candidate.display()
            );
        }
    }
    None
}

fn java_binary_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "java.exe"
    } else {
        "java"
    }
}

fn candidate_binaries() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(home) = env::var("JAVA_HOME") {
        candidates.push(Path::new(&home).join("bin").join(java_binary_name()));
    }

    if let Ok(path) = env::var("PATH") {
        for dir in env::split_paths(&path) {
            candidates.push(dir.join(java_binary_name()));
        }
    }

    let roots: &[&str] = if cfg!(target_os = "windows") {
        &["C:\\Program Files\\Java", "C:\\Program Files (x86)\\Java"]
    } else if cfg!(target_os = "macos") {
        &["/Library/Java/JavaVirtualMachines"]
    } else {
        &["/usr/lib/jvm"]
    };
    for root in roots {
        let Ok(entries) = std::fs::read_dir(root) else {
            continue;
        };
        for entry in entries.flatten() {
            let base = if cfg!(target_os = "macos") {
                entry.path().join("Contents").join("Home")
            } else {
                entry.path()
            };
            candidates.push(base.join("bin").join(java_binary_name()));
        }
    }

    candidates.retain(|c| c.is_file());
    candidates.dedup();
    candidates
}

/// Runs `java -version` and parses the major version from its output.
async fn probe_version(binary: &Path) -> Option<u32> {
    let output = Command::new(binary).arg("-version").output().await.ok()?;
    // The banner goes to stderr, but some wrappers print to stdout.
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stderr),
        String::from_utf8_lossy(&output.stdout)
    );
    parse_major_version(&text)
}

fn parse_major_version(banner: &str) -> Option<u32> {
    VERSION_RE
        .captures(banner)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn platform_key() -> crate::Result<&'static str> {
    let key = match (env::consts::OS, TARGET_ARCH) {
        ("linux", "x86_64") => "linux",
        ("linux", "x86") => "linux-i386",
        ("windows", "x86_64") => "windows-x64",
        ("windows", "x86") => "windows-x86",
        ("windows", "arm64") => "windows-arm64",
        ("macos", "x86_64") => "mac-os",
        ("macos", "arm64") => "mac-os-arm64",
        _ => return Err(Error::JavaNoVersion),
    };
    Ok(key)
}

/// Downloads a managed runtime component into the shared runtimes
/// directory. Already-current files are skipped, so a partially
/// provisioned runtime is completed instead of re-fetched.
async fn provision_runtime(
    dirs: &Dirs,
    component: &str,
    client: Option<&Client>,
    emitter: Option<&Emitter>,
) -> crate::Result<()> {
    let index: RuntimeIndex = fetch(RUNTIME_INDEX_URL, client).await?;
    let build = index
        .get(platform_key()?)
        .and_then(|components| components.get(component))
        .and_then(|builds| builds.first())
        .ok_or(Error::JavaNoVersion)?;

    let manifest: RuntimeManifest = fetch(&build.manifest.url, client).await?;
    let component_dir = dirs.runtimes_dir().join(component);

    let mut entries = Vec::new();
    let mut executables = Vec::new();
    for (rel_path, file) in &manifest.files {
        match file.kind.as_str() {
            "file" => {
                let Some(downloads) = &file.downloads else {
                    continue;
                };
                let dest = component_dir.join(rel_path);
                if file.executable {
                    executables.push(dest.clone());
                }
                entries.push(DownloadEntry::new(
                    downloads.raw.url.clone(),
                    dest,
                    Some(downloads.raw.sha1.clone()),
                ));
            }
            "directory" => {
                tokio::fs::create_dir_all(component_dir.join(rel_path)).await?;
            }
            // Links only appear in mac runtimes; java runs without them.
            _ => {}
        }
    }

    info!("provisioning java runtime {component} ({} files)", entries.len());
    download_all(client, entries, emitter).await?;

    #[cfg(unix)]
    for path in executables {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = tokio::fs::metadata(&path).await?.permissions();
        perms.set_mode(perms.mode() | 0o755);
        tokio::fs::set_permissions(&path, perms).await?;
    }
    #[cfg(not(unix))]
    drop(executables);

    Ok(())
}

fn is_executable(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path)
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        true
    }
}
