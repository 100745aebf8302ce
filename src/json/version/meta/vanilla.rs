use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A Mojang version descriptor: the library list, asset index reference,
/// main class and argument templates for one game version. Loader merge
/// rewrites parts of this in place.
#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VersionMeta {
    pub id: String,
    pub main_class: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Arguments>,
    /// Legacy space-separated argument template (pre-1.13 versions).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minecraft_arguments: Option<String>,
    pub libraries: Vec<Library>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_index: Option<AssetIndexRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloads: Option<Downloads>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub java_version: Option<JavaVersion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<Element>,
    #[serde(default)]
    pub jvm: Vec<Element>,
}

/// A single argument template element: either a plain string or a
/// rule-guarded value.
#[derive(Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum Element {
    Simple(String),
    Conditional {
        rules: Vec<Rule>,
        value: ConditionalValue,
    },
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum ConditionalValue {
    Single(String),
    Many(Vec<String>),
}

#[derive(Serialize, Deserialize, Clone)]
pub struct Library {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloads: Option<LibraryDownloads>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<Rule>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub natives: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extract: Option<Extract>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LibraryDownloads {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<File>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifiers: Option<HashMap<String, File>>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct File {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub sha1: String,
    pub size: i64,
    pub url: String,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct Extract {
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Allow,
    Disallow,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Name {
    Linux,
    Windows,
    Osx,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct Os {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<Name>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct Rule {
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<Os>,
    /// Feature-gated rules (demo mode, custom resolution, quick play).
    /// Absent features are treated as disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<HashMap<String, bool>>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct AssetIndexRef {
    pub id: String,
    pub sha1: String,
    pub size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_size: Option<i64>,
    pub url: String,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct Downloads {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<File>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<File>,
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersion {
    pub component: String,
    pub major_version: u32,
}

/// The asset index file proper: a map of virtual names to content hashes.
#[derive(Serialize, Deserialize)]
pub struct AssetIndex {
    pub objects: HashMap<String, AssetObject>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct AssetObject {
    pub hash: String,
    pub size: i64,
}
