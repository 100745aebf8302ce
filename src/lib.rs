//! Launch-preparation and remote-state reconciliation for Minecraft
//! instances.
//!
//! The crate turns a named, versioned instance into a runnable process:
//! [`instance::InstanceStore`] persists instances on disk,
//! [`minecraft::resolver::VersionResolver`] merges the base game version
//! with an optional mod-loader profile, [`minecraft::install::prepare`]
//! downloads libraries, assets and a Java runtime and assembles a
//! [`minecraft::launch::LaunchEnvironment`], and [`sync`] reconciles an
//! instance's mutable files against a remote data manifest before launch.

pub mod auth;
pub mod error;
pub mod http;
pub mod instance;
pub mod json;
pub mod minecraft;
pub mod sync;
pub mod util;

use crate::error::Error;

pub type Result<T> = std::result::Result<T, Error>;
