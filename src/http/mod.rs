use std::time::Duration;

use once_cell::sync::Lazy;
use reqwest::Client;

pub mod downloader;
pub mod fetch;

const USER_AGENT: &str = concat!("perilune/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout applied to every HTTP call the crate makes, so an
/// unresponsive remote never hangs a launch indefinitely.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared client used when callers don't supply their own.
pub static DEFAULT_CLIENT: Lazy<Client> = Lazy::new(build_client);

pub fn build_client() -> Client {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_default()
}

/// Resolves an optional caller-supplied client to a usable one.
pub fn client_or_default(client: Option<&Client>) -> &Client {
    client.unwrap_or(&DEFAULT_CLIENT)
}
