pub mod config;
pub mod emitter;
pub mod install;
pub mod java;
pub mod launch;
pub mod loader;
pub mod parse;
pub mod resolver;

/// Architecture name as it appears in Mojang platform rules.
#[cfg(target_arch = "x86")]
pub const TARGET_ARCH: &str = "x86";
#[cfg(target_arch = "x86_64")]
pub const TARGET_ARCH: &str = "x86_64";
#[cfg(target_arch = "aarch64")]
pub const TARGET_ARCH: &str = "arm64";
#[cfg(not(any(
    target_arch = "x86",
    target_arch = "x86_64",
    target_arch = "aarch64"
)))]
pub const TARGET_ARCH: &str = "unknown";

/// Classpath entry separator for the current platform.
#[cfg(target_os = "windows")]
pub const CLASSPATH_SEPARATOR: &str = ";";
#[cfg(not(target_os = "windows"))]
pub const CLASSPATH_SEPARATOR: &str = ":";
