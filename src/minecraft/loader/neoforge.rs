use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    http::fetch::{fetch, fetch_bytes},
    json::version::meta::{custom::CustomMeta, vanilla::VersionMeta},
    util::extract::read_entry_from_jar,
};

use super::{apply_profile, forge::resolve_library, LATEST};

/// Response of the maven repository's latest-version API.
#[derive(Serialize, Deserialize)]
struct LatestVersion {
    version: String,
}

/// Maps a game version to the NeoForge release series filter: `1.21.1`
/// releases are versioned `21.1.x`, `1.21` releases `21.0.x`.
fn series_filter(game_version: &str) -> crate::Result<String> {
    let mut parts = game_version.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("1"), Some(major), minor) if !major.is_empty() => {
            Ok(format!("{major}.{}", minor.unwrap_or("0")))
        }
        _ => Err(Error::UnknownVersion(game_version.to_string())),
    }
}

/// Resolves a NeoForge version for `game_version` through the maven
/// latest-version API. Concrete requests must belong to the game
/// version's release series.
pub async fn resolve_version(
    maven_base: &str,
    client: Option<&Client>,
    game_version: &str,
    requested: &str,
) -> crate::Result<String> {
    let filter = series_filter(game_version)?;

    if requested.is_empty() || requested == LATEST {
        let latest: LatestVersion = fetch(
            format!(
                "{maven_base}/api/maven/latest/version/releases/net/neoforged/neoforge?filter={filter}"
            ),
            client,
        )
        .await?;
        return Ok(latest.version);
    }

    if requested.starts_with(&format!("{filter}.")) {
        return Ok(requested.to_string());
    }
    Err(Error::UnknownLoaderVersion {
        loader: "neoforge".into(),
        version: requested.to_string(),
    })
}

/// Merges the NeoForge launch profile for `version` into `meta`.
///
/// Same installer-jar scheme as Forge, different maven coordinates.
pub async fn merge(
    maven_base: &str,
    client: Option<&Client>,
    mut meta: VersionMeta,
    version: &str,
) -> crate::Result<VersionMeta> {
    let installer_url = format!(
        "{maven_base}/releases/net/neoforged/neoforge/{version}/neoforge-{version}-installer.jar"
    );
    let installer = fetch_bytes(&installer_url, client).await?;
    let profile_json = read_entry_from_jar(&installer, "version.json")?;
    let profile: CustomMeta = serde_json::from_str(&profile_json)?;

    apply_profile(&mut meta, profile, resolve_library);
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[test]
    fn series_filter_maps_game_versions() {
        assert_eq!(series_filter("1.21.1").unwrap(), "21.1");
        assert_eq!(series_filter("1.21").unwrap(), "21.0");
        assert!(series_filter("24w14a").is_err());
    }

    #[tokio::test]
    async fn latest_queries_filtered_maven_api() {
        let mut server = Server::new_async().await;
        server
            .mock(
                "GET",
                "/api/maven/latest/version/releases/net/neoforged/neoforge",
            )
            .match_query(mockito::Matcher::UrlEncoded("filter".into(), "21.1".into()))
            .with_body(serde_json::json!({"version": "21.1.77"}).to_string())
            .create_async()
            .await;

        let version = resolve_version(&server.url(), None, "1.21.1", "latest")
            .await
            .unwrap();
        assert_eq!(version, "21.1.77");
    }

    #[tokio::test]
    async fn concrete_version_must_match_series() {
        assert_eq!(
            resolve_version("http://unused.invalid", None, "1.21.1", "21.1.50")
                .await
                .unwrap(),
            "21.1.50"
        );
        assert!(matches!(
            resolve_version("http://unused.invalid", None, "1.21.1", "20.4.100").await,
            Err(Error::UnknownLoaderVersion { .. })
        ));
    }
}
