use std::fmt;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::json::version::meta::{
    custom::{self, CustomMeta},
    vanilla::{self, VersionMeta},
};

pub mod fabric;
pub mod forge;
pub mod neoforge;
pub mod quilt;

/// Sentinel accepted wherever a concrete loader version is expected,
/// resolved to the newest available build at instance creation.
pub const LATEST: &str = "latest";

/// Mod loader of an instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Loader {
    #[default]
    Vanilla,
    Fabric,
    Quilt,
    Forge,
    NeoForge,
}

impl fmt::Display for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Vanilla => "vanilla",
            Self::Fabric => "fabric",
            Self::Quilt => "quilt",
            Self::Forge => "forge",
            Self::NeoForge => "neoforge",
        };
        f.write_str(name)
    }
}

/// Metadata endpoint bases for each loader project.
///
/// Defaults point at the live services; tests swap them for a local
/// server.
#[derive(Debug, Clone)]
pub struct LoaderEndpoints {
    pub fabric_meta: String,
    pub quilt_meta: String,
    pub forge_files: String,
    pub forge_maven: String,
    pub neoforge_maven: String,
}

impl Default for LoaderEndpoints {
    fn default() -> Self {
        Self {
            fabric_meta: "https://meta.fabricmc.net/v2".into(),
            quilt_meta: "https://meta.quiltmc.org/v3".into(),
            forge_files: "https://files.minecraftforge.net".into(),
            forge_maven: "https://maven.minecraftforge.net".into(),
            neoforge_maven: "https://maven.neoforged.net".into(),
        }
    }
}

impl Loader {
    /// Resolves `requested` (a concrete build, [`LATEST`] or blank) to a
    /// concrete loader version compatible with `game_version`.
    ///
    /// Vanilla always resolves to the empty string.
    pub async fn resolve_version(
        &self,
        endpoints: &LoaderEndpoints,
        client: Option<&Client>,
        game_version: &str,
        requested: &str,
    ) -> crate::Result<String> {
        match self {
            Self::Vanilla => Ok(String::new()),
            Self::Fabric => {
                fabric::resolve_version(&endpoints.fabric_meta, client, game_version, requested)
                    .await
            }
            Self::Quilt => {
                quilt::resolve_version(&endpoints.quilt_meta, client, game_version, requested).await
            }
            Self::Forge => {
                forge::resolve_version(&endpoints.forge_files, client, game_version, requested)
                    .await
            }
            Self::NeoForge => {
                neoforge::resolve_version(&endpoints.neoforge_maven, client, game_version, requested)
                    .await
            }
        }
    }

    /// Merges this loader's version profile on top of the vanilla version
    /// metadata. `version` must already be concrete.
    pub async fn merge(
        &self,
        endpoints: &LoaderEndpoints,
        client: Option<&Client>,
        meta: VersionMeta,
        version: &str,
    ) -> crate::Result<VersionMeta> {
        match self {
            Self::Vanilla => Ok(meta),
            Self::Fabric => fabric::merge(&endpoints.fabric_meta, client, meta, version).await,
            Self::Quilt => quilt::merge(&endpoints.quilt_meta, client, meta, version).await,
            Self::Forge => forge::merge(&endpoints.forge_maven, client, meta, version).await,
            Self::NeoForge => {
                neoforge::merge(&endpoints.neoforge_maven, client, meta, version).await
            }
        }
    }
}

/// Folds a loader profile into the vanilla metadata: profile libraries
/// shadow vanilla libraries with the same artifact name, profile argument
/// templates append, the profile's main class wins.
pub(crate) fn apply_profile(
    meta: &mut VersionMeta,
    profile: CustomMeta,
    resolve: impl Fn(&custom::Library) -> Option<vanilla::Library>,
) {
    meta.libraries.retain(|lib| {
        profile
            .libraries
            .iter()
            .all(|p_lib| p_lib.name.split(':').nth(1) != lib.name.split(':').nth(1))
    });

    meta.libraries
        .extend(profile.libraries.iter().filter_map(resolve));

    if let Some(arguments) = meta.arguments.as_mut() {
        if let Some(jvm) = profile.arguments.jvm {
            arguments.jvm.extend(jvm);
        }
        if let Some(game) = profile.arguments.game {
            arguments.game.extend(game);
        }
    }
    if let Some(minecraft_arguments) = profile.minecraft_arguments {
        meta.minecraft_arguments = Some(minecraft_arguments);
    }

    meta.main_class = profile.main_class;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_names_are_lowercase() {
        assert_eq!(
            serde_json::to_string(&Loader::NeoForge).unwrap(),
            "\"neoforge\""
        );
        let loader: Loader = serde_json::from_str("\"fabric\"").unwrap();
        assert_eq!(loader, Loader::Fabric);
    }

    #[test]
    fn display_matches_serde() {
        for loader in [
            Loader::Vanilla,
            Loader::Fabric,
            Loader::Quilt,
            Loader::Forge,
            Loader::NeoForge,
        ] {
            let via_serde = serde_json::to_string(&loader).unwrap();
            assert_eq!(format!("\"{loader}\""), via_serde);
        }
    }

    #[test]
    fn profile_libraries_shadow_vanilla_by_artifact_name() {
        let mut meta: VersionMeta = serde_json::from_value(serde_json::json!({
            "id": "1.21.5",
            "mainClass": "net.minecraft.client.main.Main",
            "libraries": [
                {"name": "org.ow2.asm:asm:9.6"},
                {"name": "com.mojang:blocklist:1.0.10"}
            ]
        }))
        .unwrap();

        let profile: CustomMeta = serde_json::from_value(serde_json::json!({
            "id": "loader-profile",
            "mainClass": "net.fabricmc.loader.impl.launch.knot.KnotClient",
            "libraries": [{"name": "org.ow2.asm:asm:9.7", "url": "https://maven.example/"}]
        }))
        .unwrap();

        apply_profile(&mut meta, profile, |lib| {
            Some(vanilla::Library {
                name: lib.name.clone(),
                downloads: None,
                rules: None,
                natives: None,
                extract: None,
            })
        });

        let names: Vec<&str> = meta.libraries.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["com.mojang:blocklist:1.0.10", "org.ow2.asm:asm:9.7"]);
        assert_eq!(
            meta.main_class,
            "net.fabricmc.loader.impl.launch.knot.KnotClient"
        );
    }
}
