use std::path::PathBuf;

use reqwest::Client;
use tracing::{info, warn};

use crate::{
    http::downloader::{download_all, DownloadEntry},
    instance::Instance,
    json::version::meta::vanilla::{AssetIndex, VersionMeta},
    minecraft::{
        config::Dirs,
        emitter::{Emit, Emitter, Event},
        java::resolve_java,
        parse::ParseRule,
        resolver::VersionResolver,
        TARGET_ARCH,
    },
    util::{extract::extract_archive, json::{read_json, write_json}},
};

const RESOURCES_URL: &str = "https://resources.download.minecraft.net";

/// Everything launch needs from a completed preparation pass.
pub struct Prepared {
    pub meta: VersionMeta,
    pub version_id: String,
    pub java_bin: PathBuf,
}

/// Identifier under which the merged version metadata is cached. Loader
/// merges change the metadata, so each `(game, loader, build)` triple
/// gets its own entry in the versions directory.
pub fn version_id(instance: &Instance) -> String {
    use crate::minecraft::loader::Loader;
    match instance.mod_loader {
        Loader::Vanilla => instance.game_version.clone(),
        loader => format!(
            "{}-{loader}-{}",
            instance.game_version, instance.mod_loader_version
        ),
    }
}

/// Brings the whole launch environment for `instance` up to date:
/// version metadata, libraries, natives, asset objects, the client jar
/// and a usable Java runtime.
///
/// Every artifact destination is derived from content identity inside
/// the shared caches, so repeated calls only download what is stale and
/// a fully current environment performs no network writes beyond the
/// metadata check.
pub async fn prepare(
    instance: &Instance,
    dirs: &Dirs,
    resolver: &VersionResolver,
    client: Option<&Client>,
    emitter: Option<&Emitter>,
) -> crate::Result<Prepared> {
    let vid = version_id(instance);
    let meta = load_or_resolve_meta(instance, dirs, resolver, &vid).await?;

    let mut entries = Vec::new();

    let (library_entries, native_jars) = collect_library_entries(&meta, dirs)?;
    emitter
        .emit(Event::LibrariesResolved, library_entries.len() as u64)
        .await;
    entries.extend(library_entries);

    let index = load_or_fetch_asset_index(&meta, dirs, client).await?;
    let asset_entries = index
        .as_ref()
        .map(|index| collect_asset_entries(index, dirs))
        .unwrap_or_default();
    emitter
        .emit(Event::AssetsResolved, asset_entries.len() as u64)
        .await;
    entries.extend(asset_entries);

    if let Some(client_jar) = meta.downloads.as_ref().and_then(|d| d.client.as_ref()) {
        entries.push(DownloadEntry::new(
            client_jar.url.clone(),
            dirs.version_jar_path(&instance.game_version),
            Some(client_jar.sha1.clone()),
        ));
    }

    emitter.emit(Event::MetadataResolved, ()).await;

    info!("preparing {vid}: {} artifacts to check", entries.len());
    download_all(client, entries, emitter).await?;

    emitter.emit(Event::PostProcessing, ()).await;

    let natives_dir = dirs.natives_dir(&vid);
    for jar in &native_jars {
        extract_archive(jar, &natives_dir).await?;
    }

    let java_bin = resolve_java(
        dirs,
        &instance.config.java,
        meta.java_version.as_ref(),
        client,
        emitter,
    )
    .await?;

    Ok(Prepared {
        meta,
        version_id: vid,
        java_bin,
    })
}

/// Loads the cached merged metadata, or resolves and persists it.
async fn load_or_resolve_meta(
    instance: &Instance,
    dirs: &Dirs,
    resolver: &VersionResolver,
    vid: &str,
) -> crate::Result<VersionMeta> {
    let path = dirs.version_json_path(vid);
    if path.is_file() {
        return read_json(&path).await;
    }

    let meta = resolver
        .resolve_meta(
            &instance.game_version,
            instance.mod_loader,
            &instance.mod_loader_version,
        )
        .await?;
    write_json(&path, &meta).await?;
    Ok(meta)
}

/// Selects the libraries that apply on this platform and schedules their
/// downloads. Returns the download entries and the local paths of native
/// jars that must be unpacked afterwards.
fn collect_library_entries(
    meta: &VersionMeta,
    dirs: &Dirs,
) -> crate::Result<(Vec<DownloadEntry>, Vec<PathBuf>)> {
    let libraries_dir = dirs.libraries_dir();
    let mut entries = Vec::new();
    let mut native_jars = Vec::new();

    for library in &meta.libraries {
        if !library.rules.parse_rule() {
            continue;
        }
        let Some(downloads) = &library.downloads else {
            continue;
        };

        if let Some(artifact) = &downloads.artifact {
            if let Some(path) = &artifact.path {
                entries.push(DownloadEntry::new(
                    artifact.url.clone(),
                    libraries_dir.join(path),
                    Some(artifact.sha1.clone()),
                ));
            }
        }

        // Pre-1.19 descriptors list natives as classifier artifacts keyed
        // through the `natives` map.
        if let (Some(natives), Some(classifiers)) = (&library.natives, &downloads.classifiers) {
            let os_key = match std::env::consts::OS {
                "macos" => "osx",
                other => other,
            };
            let Some(classifier) = natives.get(os_key) else {
                continue;
            };
            let classifier = classifier.replace(
                "${arch}",
                if TARGET_ARCH == "x86" { "32" } else { "64" },
            );
            if let Some(file) = classifiers.get(&classifier) {
                if let Some(path) = &file.path {
                    let dest = libraries_dir.join(path);
                    native_jars.push(dest.clone());
                    entries.push(DownloadEntry::new(
                        file.url.clone(),
                        dest,
                        Some(file.sha1.clone()),
                    ));
                }
            }
        }
    }

    Ok((entries, native_jars))
}

/// Loads the asset index from the local cache or fetches and persists it.
/// Old pre-index versions have none.
async fn load_or_fetch_asset_index(
    meta: &VersionMeta,
    dirs: &Dirs,
    client: Option<&Client>,
) -> crate::Result<Option<AssetIndex>> {
    let Some(index_ref) = &meta.asset_index else {
        return Ok(None);
    };

    let path = dirs.indexes_dir().join(format!("{}.json", index_ref.id));
    let current = DownloadEntry::new(
        index_ref.url.clone(),
        path.clone(),
        Some(index_ref.sha1.clone()),
    );
    if !current.is_current() {
        crate::http::downloader::download_file(
            client,
            &index_ref.url,
            &path,
            Some(&index_ref.sha1),
        )
        .await?;
    }

    Ok(Some(read_json(&path).await?))
}

/// Schedules every asset object missing from the shared object store.
/// Entries with a hash too short for the fan-out prefix are malformed
/// and skipped with a warning.
fn collect_asset_entries(index: &AssetIndex, dirs: &Dirs) -> Vec<DownloadEntry> {
    let objects_dir = dirs.objects_dir();
    index
        .objects
        .iter()
        .filter_map(|(name, object)| {
            let Some(prefix) = object.hash.get(..2) else {
                warn!("skipping asset {name} with malformed hash {:?}", object.hash);
                return None;
            };
            Some(DownloadEntry::new(
                format!("{RESOURCES_URL}/{prefix}/{}", object.hash),
                objects_dir.join(prefix).join(&object.hash),
                Some(object.hash.clone()),
            ))
        })
        .collect()
}
