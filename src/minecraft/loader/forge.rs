use std::collections::HashMap;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    http::fetch::{fetch, fetch_bytes},
    json::version::meta::{
        custom::{self, CustomMeta},
        vanilla::{self, VersionMeta},
    },
    minecraft::parse::parse_lib_path,
    util::extract::read_entry_from_jar,
};

use super::{apply_profile, LATEST};

const PROMOTIONS_PATH: &str = "/net/minecraftforge/forge/promotions_slim.json";

/// The Forge promotions index: a `{game}-latest` / `{game}-recommended`
/// map of build numbers.
#[derive(Serialize, Deserialize)]
struct Promotions {
    promos: HashMap<String, String>,
}

/// Resolves a Forge version for `game_version`.
///
/// `latest` prefers the recommended build and falls back to the latest
/// promotion. Concrete requests are accepted as either a bare build
/// (`51.0.33`) or the full `{game}-{build}` form; the returned version is
/// always the full form used in maven paths.
pub async fn resolve_version(
    files_base: &str,
    client: Option<&Client>,
    game_version: &str,
    requested: &str,
) -> crate::Result<String> {
    if requested.is_empty() || requested == LATEST {
        let promotions: Promotions =
            fetch(format!("{files_base}{PROMOTIONS_PATH}"), client).await?;
        let build = promotions
            .promos
            .get(&format!("{game_version}-recommended"))
            .or_else(|| promotions.promos.get(&format!("{game_version}-latest")))
            .ok_or_else(|| Error::UnknownVersion(game_version.to_string()))?;
        return Ok(format!("{game_version}-{build}"));
    }

    if let Some(build) = requested.strip_prefix(&format!("{game_version}-")) {
        if !build.is_empty() {
            return Ok(requested.to_string());
        }
    }
    if !requested.contains('-') {
        return Ok(format!("{game_version}-{requested}"));
    }

    Err(Error::UnknownLoaderVersion {
        loader: "forge".into(),
        version: requested.to_string(),
    })
}

/// Merges the Forge launch profile for `version` into `meta`.
///
/// The profile is the `version.json` embedded in the installer jar; only
/// the profile itself is consumed here, installer processors are not run.
pub async fn merge(
    maven_base: &str,
    client: Option<&Client>,
    mut meta: VersionMeta,
    version: &str,
) -> crate::Result<VersionMeta> {
    let installer_url = format!(
        "{maven_base}/net/minecraftforge/forge/{version}/forge-{version}-installer.jar"
    );
    let installer = fetch_bytes(&installer_url, client).await?;
    let profile_json = read_entry_from_jar(&installer, "version.json")?;
    let profile: CustomMeta = serde_json::from_str(&profile_json)?;

    apply_profile(&mut meta, profile, resolve_library);
    Ok(meta)
}

/// Turns an installer profile library into a downloadable entry.
///
/// Forge profiles ship fully resolved downloads blocks; entries with a
/// blank URL are produced by the installer's processors and are skipped.
pub(super) fn resolve_library(lib: &custom::Library) -> Option<vanilla::Library> {
    let downloads = lib.downloads.clone()?;
    let artifact = downloads.artifact.as_ref()?;
    if artifact.url.is_empty() {
        return None;
    }
    Some(vanilla::Library {
        name: lib.name.clone(),
        downloads: Some(vanilla::LibraryDownloads {
            artifact: Some(vanilla::File {
                path: artifact
                    .path
                    .clone()
                    .or_else(|| parse_lib_path(&lib.name).ok()),
                sha1: artifact.sha1.clone(),
                size: artifact.size,
                url: artifact.url.clone(),
            }),
            classifiers: None,
        }),
        rules: None,
        natives: None,
        extract: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use std::io::{Cursor, Write};
    use zip::write::{SimpleFileOptions, ZipWriter};

    fn promotions_body() -> String {
        serde_json::json!({
            "promos": {
                "1.21-recommended": "51.0.33",
                "1.21-latest": "51.0.36",
                "1.21.1-latest": "52.0.2"
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn latest_prefers_recommended_build() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", PROMOTIONS_PATH)
            .with_body(promotions_body())
            .create_async()
            .await;

        let version = resolve_version(&server.url(), None, "1.21", "latest")
            .await
            .unwrap();
        assert_eq!(version, "1.21-51.0.33");
    }

    #[tokio::test]
    async fn latest_falls_back_to_latest_promotion() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", PROMOTIONS_PATH)
            .with_body(promotions_body())
            .create_async()
            .await;

        let version = resolve_version(&server.url(), None, "1.21.1", "latest")
            .await
            .unwrap();
        assert_eq!(version, "1.21.1-52.0.2");

        assert!(matches!(
            resolve_version(&server.url(), None, "1.8.9", "latest").await,
            Err(Error::UnknownVersion(_))
        ));
    }

    #[tokio::test]
    async fn concrete_builds_are_normalized_to_full_form() {
        assert_eq!(
            resolve_version("http://unused.invalid", None, "1.21", "51.0.33")
                .await
                .unwrap(),
            "1.21-51.0.33"
        );
        assert_eq!(
            resolve_version("http://unused.invalid", None, "1.21", "1.21-51.0.33")
                .await
                .unwrap(),
            "1.21-51.0.33"
        );
        assert!(matches!(
            resolve_version("http://unused.invalid", None, "1.21", "1.20-46.0.1").await,
            Err(Error::UnknownLoaderVersion { .. })
        ));
    }

    fn installer_jar(profile: &str) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        let mut writer = ZipWriter::new(&mut cursor);
        writer
            .start_file("version.json", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(profile.as_bytes()).unwrap();
        writer.finish().unwrap();
        cursor.into_inner()
    }

    #[tokio::test]
    async fn merge_reads_profile_from_installer_jar() {
        let profile = serde_json::json!({
            "id": "1.21-forge-51.0.33",
            "mainClass": "cpw.mods.bootstraplauncher.BootstrapLauncher",
            "arguments": {"game": ["--launchTarget", "forge_client"]},
            "libraries": [
                {
                    "name": "net.minecraftforge:fmlloader:1.21-51.0.33",
                    "downloads": {"artifact": {
                        "path": "net/minecraftforge/fmlloader/1.21-51.0.33/fmlloader-1.21-51.0.33.jar",
                        "sha1": "da39a3ee5e6b4b0d3255bfef95601890afd80709",
                        "size": 10,
                        "url": "https://maven.minecraftforge.net/net/minecraftforge/fmlloader/1.21-51.0.33/fmlloader-1.21-51.0.33.jar"
                    }}
                },
                {
                    "name": "net.minecraftforge:forge:1.21-51.0.33:client",
                    "downloads": {"artifact": {
                        "path": "net/minecraftforge/forge/1.21-51.0.33/forge-1.21-51.0.33-client.jar",
                        "sha1": "da39a3ee5e6b4b0d3255bfef95601890afd80709",
                        "size": 0,
                        "url": ""
                    }}
                }
            ]
        })
        .to_string();

        let mut server = Server::new_async().await;
        server
            .mock(
                "GET",
                "/net/minecraftforge/forge/1.21-51.0.33/forge-1.21-51.0.33-installer.jar",
            )
            .with_body(installer_jar(&profile))
            .create_async()
            .await;

        let meta: VersionMeta = serde_json::from_value(serde_json::json!({
            "id": "1.21",
            "mainClass": "net.minecraft.client.main.Main",
            "arguments": {"game": [], "jvm": []},
            "libraries": []
        }))
        .unwrap();

        let merged = merge(&server.url(), None, meta, "1.21-51.0.33")
            .await
            .unwrap();
        assert_eq!(
            merged.main_class,
            "cpw.mods.bootstraplauncher.BootstrapLauncher"
        );
        // The processor-generated client artifact has no URL and is skipped.
        assert_eq!(merged.libraries.len(), 1);
        assert_eq!(merged.arguments.unwrap().game.len(), 2);
    }
}
