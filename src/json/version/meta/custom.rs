use serde::{Deserialize, Serialize};

use super::vanilla::{Element, LibraryDownloads};

/// A loader-provided version profile (Fabric/Quilt profile JSON, or the
/// `version.json` embedded in Forge/NeoForge installer jars). Merged on
/// top of the vanilla [`super::vanilla::VersionMeta`] it inherits from.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomMeta {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inherits_from: Option<String>,
    pub main_class: String,
    #[serde(default)]
    pub arguments: Arguments,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minecraft_arguments: Option<String>,
    #[serde(default)]
    pub libraries: Vec<Library>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
}

#[derive(Serialize, Deserialize, Default)]
pub struct Arguments {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game: Option<Vec<Element>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jvm: Option<Vec<Element>>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Library {
    pub name: String,
    /// Maven repository base the artifact path is resolved against
    /// (Fabric/Quilt style libraries).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    /// Fully resolved downloads block (Forge/NeoForge style libraries).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloads: Option<LibraryDownloads>,
}
