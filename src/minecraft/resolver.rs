use reqwest::Client;

use crate::{
    error::Error,
    http::fetch::fetch,
    json::version::{manifest::VersionManifest, meta::vanilla::VersionMeta},
};

use super::loader::{Loader, LoaderEndpoints, LATEST};

const MANIFEST_URL: &str = "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";

/// A `(game, loader)` version pair with every sentinel pinned to a
/// concrete value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    pub game_version: String,
    pub loader_version: String,
}

/// Resolves version identifiers against the Mojang manifest and the
/// loader metadata services.
///
/// Holds only endpoint configuration, so one resolver is shared across
/// instance creation and preparation.
#[derive(Debug, Clone, Default)]
pub struct VersionResolver {
    client: Option<Client>,
    manifest_url: Option<String>,
    pub endpoints: LoaderEndpoints,
}

impl VersionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver talking to a non-default manifest endpoint. Tests point
    /// this at a local server.
    pub fn with_manifest_url(url: impl Into<String>) -> Self {
        Self {
            manifest_url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    fn manifest_url(&self) -> &str {
        self.manifest_url.as_deref().unwrap_or(MANIFEST_URL)
    }

    pub async fn manifest(&self) -> crate::Result<VersionManifest> {
        fetch(self.manifest_url(), self.client.as_ref()).await
    }

    /// Pins a `(game, loader)` version pair to concrete values.
    ///
    /// The game version accepts [`LATEST`] for the newest release; the
    /// loader version accepts [`LATEST`] or blank for the newest build
    /// compatible with the resolved game version. An unknown version of
    /// either kind fails here, before any directory is created for it.
    pub async fn resolve(
        &self,
        game_version: &str,
        loader: Loader,
        loader_version: &str,
    ) -> crate::Result<ResolvedVersion> {
        let manifest = self.manifest().await?;

        let game_version = if game_version == LATEST {
            manifest.latest.release.clone()
        } else {
            manifest
                .find(game_version)
                .ok_or_else(|| Error::UnknownVersion(game_version.to_string()))?
                .id
                .clone()
        };

        let loader_version = loader
            .resolve_version(
                &self.endpoints,
                self.client.as_ref(),
                &game_version,
                loader_version,
            )
            .await?;

        Ok(ResolvedVersion {
            game_version,
            loader_version,
        })
    }

    /// Fetches the full version metadata for a concrete version pair,
    /// with the loader profile already merged in.
    pub async fn resolve_meta(
        &self,
        game_version: &str,
        loader: Loader,
        loader_version: &str,
    ) -> crate::Result<VersionMeta> {
        let manifest = self.manifest().await?;
        let entry = manifest
            .find(game_version)
            .ok_or_else(|| Error::UnknownVersion(game_version.to_string()))?;

        let meta: VersionMeta = fetch(&entry.url, self.client.as_ref()).await?;
        loader
            .merge(&self.endpoints, self.client.as_ref(), meta, loader_version)
            .await
    }
}
