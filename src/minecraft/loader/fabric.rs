use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    http::fetch::fetch,
    json::version::meta::{
        custom::{self, CustomMeta},
        vanilla::{self, VersionMeta},
    },
    minecraft::parse::parse_lib_path,
};

use super::{apply_profile, LATEST};

/// One entry of the per-game-version loader listing.
#[derive(Serialize, Deserialize)]
struct LoaderEntry {
    loader: FabricLoader,
}

/// Fabric loader build metadata.
#[derive(Serialize, Deserialize)]
struct FabricLoader {
    version: String,
    stable: bool,
}

/// Resolves a Fabric loader version for `game_version`.
///
/// The listing is newest-first; `latest` picks the newest stable build,
/// falling back to the newest build when no stable one exists yet.
pub async fn resolve_version(
    base: &str,
    client: Option<&Client>,
    game_version: &str,
    requested: &str,
) -> crate::Result<String> {
    let entries: Vec<LoaderEntry> =
        fetch(format!("{base}/versions/loader/{game_version}"), client).await?;
    if entries.is_empty() {
        return Err(Error::UnknownVersion(game_version.to_string()));
    }

    if requested.is_empty() || requested == LATEST {
        let newest = entries
            .iter()
            .find(|e| e.loader.stable)
            .unwrap_or(&entries[0]);
        return Ok(newest.loader.version.clone());
    }

    entries
        .iter()
        .find(|e| e.loader.version == requested)
        .map(|e| e.loader.version.clone())
        .ok_or_else(|| Error::UnknownLoaderVersion {
            loader: "fabric".into(),
            version: requested.to_string(),
        })
}

/// Merges the Fabric launch profile for `version` into `meta`.
pub async fn merge(
    base: &str,
    client: Option<&Client>,
    mut meta: VersionMeta,
    version: &str,
) -> crate::Result<VersionMeta> {
    let profile: CustomMeta = fetch(
        format!("{base}/versions/loader/{}/{version}/profile/json", meta.id),
        client,
    )
    .await?;

    apply_profile(&mut meta, profile, resolve_library);
    Ok(meta)
}

/// Turns a maven-style profile library into a downloadable entry.
pub(super) fn resolve_library(lib: &custom::Library) -> Option<vanilla::Library> {
    let path = parse_lib_path(&lib.name).ok()?;
    let url = lib.url.as_ref()?;
    Some(vanilla::Library {
        name: lib.name.clone(),
        downloads: Some(vanilla::LibraryDownloads {
            artifact: Some(vanilla::File {
                path: Some(path.clone()),
                sha1: lib.sha1.clone().unwrap_or_default(),
                size: lib.size.unwrap_or_default(),
                url: format!("{}/{}", url.trim_end_matches('/'), path),
            }),
            classifiers: None,
        }),
        rules: None,
        natives: None,
        extract: None,
    })
}
