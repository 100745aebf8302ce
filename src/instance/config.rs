use serde::{Deserialize, Serialize};

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero(value: &u16) -> bool {
    *value == 0
}

/// Game window resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

/// The configurable values of an instance, persisted inside
/// `instance.toml`. Every field has a safe default so a hand-edited file
/// may omit any of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceConfig {
    /// Path to a Java executable. If blank, a runtime is located or
    /// provisioned automatically.
    pub java: String,
    /// Extra arguments to pass to the JVM.
    pub java_args: String,
    /// Path to a custom JAR to use instead of the normal client.
    pub custom_jar: String,
    /// Minimum game memory, in MB.
    pub min_memory: u32,
    /// Maximum game memory, in MB.
    pub max_memory: u32,
    /// Last connected server address.
    pub last_server: String,
    /// Last used username.
    pub last_user: String,
    /// Remote sync profile host address.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub remote_host: String,
    /// Remote sync profile port.
    #[serde(skip_serializing_if = "is_zero")]
    pub remote_port: u16,
    /// Whether this instance is linked to a remote sync profile.
    #[serde(skip_serializing_if = "is_false")]
    pub remote_linked: bool,
    /// Whether the linked remote server is premium.
    #[serde(skip_serializing_if = "is_false")]
    pub remote_premium: bool,
    /// Game window resolution. Last so the TOML table serializes after
    /// the scalar fields.
    pub resolution: Resolution,
}

/// Launch-time overrides for a subset of config fields.
///
/// Zero/empty means "not overridden".
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub width: u32,
    pub height: u32,
    pub java: String,
    pub java_args: String,
    pub min_memory: u32,
    pub max_memory: u32,
}

impl InstanceConfig {
    /// Applies launch-time overrides, returning whether any stored value
    /// actually changed. Callers persist the config only on `true`, so an
    /// override equal to the stored value never causes a disk write.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> bool {
        let mut changed = false;

        if overrides.width != 0
            && overrides.height != 0
            && (overrides.width != self.resolution.width
                || overrides.height != self.resolution.height)
        {
            self.resolution.width = overrides.width;
            self.resolution.height = overrides.height;
            changed = true;
        }
        if !overrides.java.is_empty() && overrides.java != self.java {
            self.java = overrides.java.clone();
            changed = true;
        }
        if !overrides.java_args.is_empty() && overrides.java_args != self.java_args {
            self.java_args = overrides.java_args.clone();
            changed = true;
        }
        if overrides.min_memory != 0 && overrides.min_memory != self.min_memory {
            self.min_memory = overrides.min_memory;
            changed = true;
        }
        if overrides.max_memory != 0 && overrides.max_memory != self.max_memory {
            self.max_memory = overrides.max_memory;
            changed = true;
        }

        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_override_does_not_mark_changed() {
        let mut config = InstanceConfig {
            min_memory: 1024,
            max_memory: 4096,
            ..Default::default()
        };
        let overrides = ConfigOverrides {
            min_memory: 1024,
            max_memory: 4096,
            ..Default::default()
        };
        assert!(!config.apply_overrides(&overrides));
    }

    #[test]
    fn differing_override_is_applied_and_marked() {
        let mut config = InstanceConfig::default();
        let overrides = ConfigOverrides {
            max_memory: 8192,
            java: "/usr/bin/java".into(),
            ..Default::default()
        };
        assert!(config.apply_overrides(&overrides));
        assert_eq!(config.max_memory, 8192);
        assert_eq!(config.java, "/usr/bin/java");
    }

    #[test]
    fn resolution_requires_both_dimensions() {
        let mut config = InstanceConfig::default();
        let overrides = ConfigOverrides {
            width: 1920,
            ..Default::default()
        };
        assert!(!config.apply_overrides(&overrides));
        assert_eq!(config.resolution.width, 0);
    }
}
