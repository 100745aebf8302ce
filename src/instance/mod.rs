use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::Error,
    minecraft::{config::Dirs, loader::Loader, resolver::VersionResolver},
};

pub mod config;

pub use config::{ConfigOverrides, InstanceConfig, Resolution};

const CONFIG_TOML: &str = "instance.toml";
const CONFIG_LEGACY_JSON: &str = "instance.json";

/// A full installation of Minecraft and its information.
///
/// Identity is the `(name, uuid)` pair: the UUID is immutable once
/// created, the name may change through [`InstanceStore::rename`] but
/// must stay unique. The instance exclusively owns the directory tree
/// `instances/<name>/<uuid>/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    /// Derived from the directory name, never serialized.
    #[serde(skip)]
    pub name: String,
    pub uuid: String,
    pub game_version: String,
    pub mod_loader: Loader,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mod_loader_version: String,
    #[serde(default)]
    pub config: InstanceConfig,
    /// Absolute directory of this instance, set when loaded.
    #[serde(skip)]
    pub dir: PathBuf,
}

impl Instance {
    /// Writes the instance configuration to `instance.toml`, overwriting
    /// whatever is there. Idempotent.
    pub async fn write_config(&self) -> crate::Result<()> {
        let data = toml::to_string_pretty(self)?;
        fs::create_dir_all(&self.dir).await?;
        fs::write(self.dir.join(CONFIG_TOML), data).await?;
        Ok(())
    }
}

/// Options used to designate an instance's version and other parameters
/// on creation.
#[derive(Debug, Clone)]
pub struct InstanceOptions {
    pub name: String,
    pub game_version: String,
    pub loader: Loader,
    pub loader_version: String,
    pub config: InstanceConfig,
}

/// Result of loading a persisted config, tagged by the format it was
/// found in. A legacy hit is followed by an explicit upgrade step rather
/// than a write buried inside the read path.
enum ConfigFormat {
    Toml(Instance),
    LegacyJson(Instance),
}

/// Filesystem-backed store of instances, keyed by name.
///
/// The directory tree is the sole source of truth: the instance list is
/// derived by enumeration, no separate index exists.
#[derive(Debug, Clone)]
pub struct InstanceStore {
    dirs: Dirs,
}

impl InstanceStore {
    pub fn new(dirs: Dirs) -> Self {
        Self { dirs }
    }

    fn name_dir(&self, name: &str) -> PathBuf {
        self.dirs.instances_dir().join(name)
    }

    /// Creates a new instance with the specified options.
    ///
    /// Version resolution runs first so an unresolvable version or loader
    /// never leaves a half-created directory behind; a `"latest"` (or
    /// empty) loader version is pinned to the newest available build at
    /// creation time.
    pub async fn create(
        &self,
        options: InstanceOptions,
        resolver: &VersionResolver,
    ) -> crate::Result<Instance> {
        validate_name(&options.name)?;
        if self.exists(&options.name).await {
            return Err(Error::InstanceExists(options.name));
        }

        let resolved = resolver
            .resolve(
                &options.game_version,
                options.loader,
                &options.loader_version,
            )
            .await?;

        let uuid = Uuid::new_v4().to_string();
        let dir = self.name_dir(&options.name).join(&uuid);
        fs::create_dir_all(&dir).await?;

        let instance = Instance {
            name: options.name,
            uuid,
            game_version: resolved.game_version,
            mod_loader: options.loader,
            mod_loader_version: resolved.loader_version,
            config: options.config,
            dir,
        };
        instance.write_config().await?;

        info!("created instance {} ({})", instance.name, instance.uuid);
        Ok(instance)
    }

    /// Retrieves the instance with the specified name.
    ///
    /// A config persisted in the legacy JSON format is upgraded to
    /// canonical TOML before returning, so subsequent reads always
    /// observe the canonical form.
    pub async fn fetch(&self, name: &str) -> crate::Result<Instance> {
        validate_name(name)?;

        let uuid = self.data_dir_of(name).await?;
        let dir = self.name_dir(name).join(&uuid);

        let mut instance = match read_config(name, &dir).await? {
            ConfigFormat::Toml(instance) => instance,
            ConfigFormat::LegacyJson(instance) => {
                // Explicit upgrade step: rewrite in canonical format.
                let mut upgraded = instance;
                upgraded.name = name.to_string();
                upgraded.uuid = uuid.clone();
                upgraded.dir = dir.clone();
                upgraded.write_config().await?;
                info!("upgraded legacy config for instance {name}");
                upgraded
            }
        };

        instance.name = name.to_string();
        instance.uuid = uuid;
        instance.dir = dir;
        Ok(instance)
    }

    /// Retrieves all valid instances within the instances directory.
    ///
    /// Entries that fail to parse are skipped so one corrupt instance
    /// never hides the rest of the listing.
    pub async fn fetch_all(&self) -> crate::Result<Vec<Instance>> {
        let instances_dir = self.dirs.instances_dir();
        if !instances_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut instances = Vec::new();
        let mut entries = fs::read_dir(&instances_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            match self.fetch(&name).await {
                Ok(instance) => instances.push(instance),
                Err(err) => warn!("skipping unreadable instance {name}: {err}"),
            }
        }
        Ok(instances)
    }

    /// Removes the instance with the specified name, deleting its whole
    /// directory subtree.
    pub async fn remove(&self, name: &str) -> crate::Result<()> {
        // Resolves first so a missing instance is reported as such.
        let instance = self.fetch(name).await?;
        fs::remove_dir_all(self.name_dir(&instance.name)).await?;
        info!("removed instance {name}");
        Ok(())
    }

    /// Renames the instance, moving its name directory. The UUID and the
    /// data below it are untouched.
    pub async fn rename(&self, instance: &mut Instance, new_name: &str) -> crate::Result<()> {
        validate_name(new_name)?;
        if self.exists(new_name).await {
            return Err(Error::InstanceExists(new_name.to_string()));
        }

        let old_dir = self.name_dir(&instance.name);
        let new_dir = self.name_dir(new_name);
        if let Some(parent) = new_dir.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::rename(&old_dir, &new_dir).await?;

        instance.name = new_name.to_string();
        instance.dir = new_dir.join(&instance.uuid);
        Ok(())
    }

    /// Reports whether an instance with the specified name exists (i.e.
    /// its name directory holds a data directory with a config file).
    pub async fn exists(&self, name: &str) -> bool {
        self.data_dir_of(name).await.is_ok()
    }

    /// Locates the single UUID data directory under the name directory.
    ///
    /// Zero data directories means the instance is missing even when the
    /// name directory itself exists; more than one is a data-integrity
    /// error, never resolved by picking an arbitrary entry.
    async fn data_dir_of(&self, name: &str) -> crate::Result<String> {
        let name_dir = self.name_dir(name);
        if !name_dir.is_dir() {
            return Err(Error::InstanceNotFound(name.to_string()));
        }

        let mut found = Vec::new();
        let mut entries = fs::read_dir(&name_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_dir()
                && (path.join(CONFIG_TOML).is_file() || path.join(CONFIG_LEGACY_JSON).is_file())
            {
                found.push(entry.file_name().to_string_lossy().to_string());
            }
        }

        match found.len() {
            0 => Err(Error::InstanceNotFound(name.to_string())),
            1 => Ok(found.remove(0)),
            n => Err(Error::AmbiguousInstanceDir {
                name: name.to_string(),
                found: n,
            }),
        }
    }
}

async fn read_config(name: &str, dir: &Path) -> crate::Result<ConfigFormat> {
    let toml_path = dir.join(CONFIG_TOML);
    if toml_path.is_file() {
        let data = fs::read_to_string(&toml_path).await?;
        let instance = toml::from_str(&data).map_err(|err| Error::ConfigCorrupt {
            name: name.to_string(),
            reason: err.to_string(),
        })?;
        return Ok(ConfigFormat::Toml(instance));
    }

    let json_path = dir.join(CONFIG_LEGACY_JSON);
    if json_path.is_file() {
        let data = fs::read_to_string(&json_path).await?;
        let instance = serde_json::from_str(&data).map_err(|err| Error::ConfigCorrupt {
            name: name.to_string(),
            reason: err.to_string(),
        })?;
        return Ok(ConfigFormat::LegacyJson(instance));
    }

    Err(Error::InstanceNotFound(name.to_string()))
}

fn validate_name(name: &str) -> crate::Result<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', ':', '*', '?', '"', '<', '>', '|'])
    {
        return Err(Error::InvalidInstanceName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::minecraft::resolver::VersionResolver;
    use mockito::{Server, ServerGuard};

    fn store(root: &Path) -> InstanceStore {
        InstanceStore::new(Dirs::new(root))
    }

    async fn manifest_server() -> ServerGuard {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/mc/game/version_manifest_v2.json")
            .with_body(
                serde_json::json!({
                    "latest": {"release": "1.21.5", "snapshot": "1.21.5"},
                    "versions": [{
                        "id": "1.21.5",
                        "type": "release",
                        "url": "https://example.invalid/1.21.5.json",
                        "time": "2025-03-25T00:00:00+00:00",
                        "releaseTime": "2025-03-25T00:00:00+00:00",
                        "sha1": "0000000000000000000000000000000000000000"
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;
        server
    }

    fn vanilla_options(name: &str) -> InstanceOptions {
        InstanceOptions {
            name: name.into(),
            game_version: "1.21.5".into(),
            loader: Loader::Vanilla,
            loader_version: String::new(),
            config: InstanceConfig::default(),
        }
    }

    #[tokio::test]
    async fn create_then_fetch_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let server = manifest_server().await;
        let resolver = VersionResolver::with_manifest_url(format!(
            "{}/mc/game/version_manifest_v2.json",
            server.url()
        ));
        let store = store(tmp.path());

        let created = store
            .create(vanilla_options("Survival"), &resolver)
            .await
            .unwrap();
        let fetched = store.fetch("Survival").await.unwrap();

        assert_eq!(fetched.name, created.name);
        assert_eq!(fetched.uuid, created.uuid);
        assert_eq!(fetched.game_version, "1.21.5");
        assert_eq!(fetched.mod_loader, Loader::Vanilla);
        assert_eq!(fetched.config, created.config);
    }

    #[tokio::test]
    async fn create_fabric_instance_pins_latest_loader() {
        let tmp = tempfile::tempdir().unwrap();
        let server = manifest_server().await;
        let mut loader_server = Server::new_async().await;
        loader_server
            .mock("GET", "/versions/loader/1.21.5")
            .with_body(
                serde_json::json!([{"loader": {"version": "0.16.10", "stable": true}}])
                    .to_string(),
            )
            .create_async()
            .await;

        let mut resolver = VersionResolver::with_manifest_url(format!(
            "{}/mc/game/version_manifest_v2.json",
            server.url()
        ));
        resolver.endpoints.fabric_meta = loader_server.url();
        let store = store(tmp.path());

        let mut options = vanilla_options("Modded");
        options.loader = Loader::Fabric;
        options.loader_version = "latest".into();
        let created = store.create(options, &resolver).await.unwrap();

        assert_eq!(created.mod_loader_version, "0.16.10");
        let config = std::fs::read_to_string(
            tmp.path()
                .join("instances")
                .join("Modded")
                .join(&created.uuid)
                .join("instance.toml"),
        )
        .unwrap();
        assert!(config.contains("mod_loader = \"fabric\""));
        assert!(config.contains("mod_loader_version = \"0.16.10\""));
    }

    #[tokio::test]
    async fn create_refuses_duplicate_name() {
        let tmp = tempfile::tempdir().unwrap();
        let server = manifest_server().await;
        let resolver = VersionResolver::with_manifest_url(format!(
            "{}/mc/game/version_manifest_v2.json",
            server.url()
        ));
        let store = store(tmp.path());

        store
            .create(vanilla_options("Dupe"), &resolver)
            .await
            .unwrap();
        let err = store.create(vanilla_options("Dupe"), &resolver).await;
        assert!(matches!(err, Err(Error::InstanceExists(_))));
    }

    #[tokio::test]
    async fn create_rejects_unknown_game_version() {
        let tmp = tempfile::tempdir().unwrap();
        let server = manifest_server().await;
        let resolver = VersionResolver::with_manifest_url(format!(
            "{}/mc/game/version_manifest_v2.json",
            server.url()
        ));
        let store = store(tmp.path());

        let mut options = vanilla_options("Old");
        options.game_version = "1.0.0-does-not-exist".into();
        assert!(matches!(
            store.create(options, &resolver).await,
            Err(Error::UnknownVersion(_))
        ));
        // No half-created directory left behind.
        assert!(!tmp.path().join("instances").join("Old").exists());
    }

    #[tokio::test]
    async fn fetch_reports_missing_instance() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        assert!(matches!(
            store.fetch("Nope").await,
            Err(Error::InstanceNotFound(_))
        ));

        // A bare name directory without a data directory is also missing.
        std::fs::create_dir_all(tmp.path().join("instances").join("Hollow")).unwrap();
        assert!(matches!(
            store.fetch("Hollow").await,
            Err(Error::InstanceNotFound(_))
        ));
    }

    #[tokio::test]
    async fn fetch_upgrades_legacy_json_config() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());

        let dir = tmp
            .path()
            .join("instances")
            .join("Legacy")
            .join("0e0f9f7c-aaaa-bbbb-cccc-000000000001");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("instance.json"),
            serde_json::json!({
                "uuid": "0e0f9f7c-aaaa-bbbb-cccc-000000000001",
                "game_version": "1.20.4",
                "mod_loader": "fabric",
                "mod_loader_version": "0.16.10",
                "config": {"max_memory": 4096}
            })
            .to_string(),
        )
        .unwrap();

        let fetched = store.fetch("Legacy").await.unwrap();
        assert_eq!(fetched.mod_loader, Loader::Fabric);
        assert_eq!(fetched.config.max_memory, 4096);

        // The canonical file now exists and carries the same content.
        let canonical = std::fs::read_to_string(dir.join("instance.toml")).unwrap();
        assert!(canonical.contains("mod_loader = \"fabric\""));

        let again = store.fetch("Legacy").await.unwrap();
        assert_eq!(again.game_version, "1.20.4");
    }

    #[tokio::test]
    async fn multiple_data_dirs_is_an_integrity_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());

        let name_dir = tmp.path().join("instances").join("Twins");
        for uuid in ["aaaa", "bbbb"] {
            let dir = name_dir.join(uuid);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(
                dir.join("instance.toml"),
                "uuid = \"x\"\ngame_version = \"1.21.5\"\nmod_loader = \"vanilla\"\n",
            )
            .unwrap();
        }

        assert!(matches!(
            store.fetch("Twins").await,
            Err(Error::AmbiguousInstanceDir { found: 2, .. })
        ));
    }

    #[tokio::test]
    async fn fetch_all_skips_corrupt_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let server = manifest_server().await;
        let resolver = VersionResolver::with_manifest_url(format!(
            "{}/mc/game/version_manifest_v2.json",
            server.url()
        ));
        let store = store(tmp.path());

        store
            .create(vanilla_options("Good"), &resolver)
            .await
            .unwrap();

        let bad = tmp.path().join("instances").join("Bad").join("uuid-dir");
        std::fs::create_dir_all(&bad).unwrap();
        std::fs::write(bad.join("instance.toml"), "not [valid toml").unwrap();

        let all = store.fetch_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Good");
    }

    #[tokio::test]
    async fn rename_preserves_uuid_and_moves_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let server = manifest_server().await;
        let resolver = VersionResolver::with_manifest_url(format!(
            "{}/mc/game/version_manifest_v2.json",
            server.url()
        ));
        let store = store(tmp.path());

        let mut instance = store
            .create(vanilla_options("Before"), &resolver)
            .await
            .unwrap();
        let uuid = instance.uuid.clone();

        store.rename(&mut instance, "After").await.unwrap();

        assert!(!store.exists("Before").await);
        let fetched = store.fetch("After").await.unwrap();
        assert_eq!(fetched.uuid, uuid);
    }

    #[tokio::test]
    async fn remove_deletes_subtree() {
        let tmp = tempfile::tempdir().unwrap();
        let server = manifest_server().await;
        let resolver = VersionResolver::with_manifest_url(format!(
            "{}/mc/game/version_manifest_v2.json",
            server.url()
        ));
        let store = store(tmp.path());

        store
            .create(vanilla_options("Gone"), &resolver)
            .await
            .unwrap();
        store.remove("Gone").await.unwrap();

        assert!(!tmp.path().join("instances").join("Gone").exists());
        assert!(matches!(
            store.remove("Gone").await,
            Err(Error::InstanceNotFound(_))
        ));
    }

    #[test]
    fn name_validation() {
        assert!(validate_name("My Instance").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("a\\b").is_err());
    }
}
