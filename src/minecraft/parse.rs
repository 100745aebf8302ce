use std::env::consts::OS;

use crate::{
    error::Error,
    json::version::meta::vanilla::{Action, Name, Rule},
};

use super::TARGET_ARCH;

fn current_os() -> Name {
    match OS {
        "linux" => Name::Linux,
        "windows" => Name::Windows,
        "macos" => Name::Osx,
        other => unreachable!("unsupported operating system: {other}"),
    }
}

/// Trait for evaluating platform-applicability rules against the current
/// operating system and architecture.
pub trait ParseRule {
    /// Reports whether the current platform is allowed by the rules.
    fn parse_rule(&self) -> bool;
}

impl ParseRule for [Rule] {
    fn parse_rule(&self) -> bool {
        if self.is_empty() {
            return true;
        }

        let os = current_os();
        let mut allowed = false;

        for rule in self {
            // Feature-gated rules are resolved at argument-substitution
            // time, never during library selection.
            if rule.features.is_some() {
                continue;
            }

            let matches = match &rule.os {
                None => true,
                Some(constraint) => {
                    let name_ok = constraint
                        .name
                        .as_ref()
                        .map(|n| *n == os)
                        .unwrap_or(true);
                    let arch_ok = constraint
                        .arch
                        .as_deref()
                        .map(|a| a == TARGET_ARCH)
                        .unwrap_or(true);
                    name_ok && arch_ok
                }
            };

            if matches {
                allowed = rule.action == Action::Allow;
            }
        }

        allowed
    }
}

impl ParseRule for Option<Vec<Rule>> {
    fn parse_rule(&self) -> bool {
        match self {
            Some(rules) => rules.as_slice().parse_rule(),
            None => true,
        }
    }
}

/// Parses a Maven coordinate (`group:name:version[:classifier][@ext]`)
/// into the repository-relative artifact path.
pub fn parse_lib_path(artifact: &str) -> crate::Result<String> {
    let name_items: Vec<&str> = artifact.split(':').collect();
    if name_items.len() < 3 {
        return Err(Error::Parse(format!(
            "Invalid artifact format: {}",
            artifact
        )));
    }

    let package = name_items[0];
    let name = name_items[1];
    let version_ext: Vec<&str> = name_items[2].split('@').collect();
    let version = version_ext[0];
    let ext = version_ext.get(1).unwrap_or(&"jar");

    if name_items.len() == 3 {
        Ok(format!(
            "{}/{}/{}/{}-{}.{}",
            package.replace('.', "/"),
            name,
            version,
            name,
            version,
            ext
        ))
    } else {
        let data_ext: Vec<&str> = name_items[3].split('@').collect();
        let data = data_ext[0];
        let data_ext = data_ext.get(1).unwrap_or(&"jar");

        Ok(format!(
            "{}/{}/{}/{}-{}-{}.{}",
            package.replace('.', "/"),
            name,
            version,
            name,
            version,
            data,
            data_ext
        ))
    }
}
