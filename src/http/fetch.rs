use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::error::Error;
use crate::http::client_or_default;

/// Fetches a JSON document from `url` and deserializes it into `T`.
///
/// Non-success statuses become [`Error::Download`] so callers can
/// distinguish an unreachable endpoint from a malformed payload.
pub async fn fetch<T: DeserializeOwned>(
    url: impl AsRef<str>,
    client: Option<&Client>,
) -> crate::Result<T> {
    let url = url.as_ref();
    let response = client_or_default(client).get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Download {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    Ok(response.json::<T>().await?)
}

/// Fetches raw bytes from `url`.
pub async fn fetch_bytes(url: impl AsRef<str>, client: Option<&Client>) -> crate::Result<Vec<u8>> {
    let url = url.as_ref();
    let response = client_or_default(client).get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Download {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    Ok(response.bytes().await?.to_vec())
}
