use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    http::fetch::fetch,
    json::version::meta::{custom::CustomMeta, vanilla::VersionMeta},
};

use super::{apply_profile, fabric::resolve_library, LATEST};

/// One entry of the per-game-version loader listing. Quilt's meta service
/// mirrors Fabric's but marks pre-releases in the version string instead
/// of a `stable` flag.
#[derive(Serialize, Deserialize)]
struct LoaderEntry {
    loader: QuiltLoader,
}

#[derive(Serialize, Deserialize)]
struct QuiltLoader {
    version: String,
}

impl QuiltLoader {
    fn is_stable(&self) -> bool {
        !self.version.contains('-')
    }
}

/// Resolves a Quilt loader version for `game_version`.
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
            .find(|e| e.loader.is_stable())
            .unwrap_or(&entries[0]);
        return Ok(newest.loader.version.clone());
    }

    entries
        .iter()
        .find(|e| e.loader.version == requested)
        .map(|e| e.loader.version.clone())
        .ok_or_else(|| Error::UnknownLoaderVersion {
            loader: "quilt".into(),
            version: requested.to_string(),
        })
}

/// Merges the Quilt launch profile for `version` into `meta`.
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
