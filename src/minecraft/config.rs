use std::path::{Path, PathBuf};

/// Shared on-disk layout rooted at the launcher's data directory.
///
/// Libraries, assets, version descriptors and managed runtimes are shared
/// caches: every entry's destination path is derived from its content
/// identity (maven path, asset hash, version id, runtime component), so
/// prepare calls for different instances reuse the same files and a
/// racing write is redundant rather than conflicting.
#[derive(Debug, Clone)]
pub struct Dirs {
    root: PathBuf,
}

impl Dirs {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Parent directory of all instance trees.
    pub fn instances_dir(&self) -> PathBuf {
        self.root.join("instances")
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.root.join("libraries")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn indexes_dir(&self) -> PathBuf {
        self.assets_dir().join("indexes")
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.assets_dir().join("objects")
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    pub fn version_dir(&self, id: &str) -> PathBuf {
        self.versions_dir().join(id)
    }

    pub fn version_json_path(&self, id: &str) -> PathBuf {
        self.version_dir(id).join(format!("{id}.json"))
    }

    pub fn version_jar_path(&self, id: &str) -> PathBuf {
        self.version_dir(id).join(format!("{id}.jar"))
    }

    pub fn natives_dir(&self, id: &str) -> PathBuf {
        self.root.join("natives").join(id)
    }

    pub fn runtimes_dir(&self) -> PathBuf {
        self.root.join("runtimes")
    }

    /// Path of the `java` binary inside a managed runtime component.
    pub fn runtime_java_path(&self, component: &str) -> PathBuf {
        let component_dir = self.runtimes_dir().join(component);

        #[cfg(target_os = "windows")]
        {
            component_dir.join("bin").join("javaw.exe")
        }
        #[cfg(target_os = "macos")]
        {
            component_dir
                .join("jre.bundle")
                .join("Contents")
                .join("Home")
                .join("bin")
                .join("java")
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            component_dir.join("bin").join("java")
        }
    }
}
