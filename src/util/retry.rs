use std::future::Future;

use tracing::warn;

/// Runs `op` and, if it fails, runs it once more before giving up.
///
/// Required files (libraries, assets) tolerate exactly one transient
/// network hiccup; a second failure escalates to the caller.
pub async fn retry_once<T, F, Fut>(what: &str, mut op: F) -> crate::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = crate::Result<T>>,
{
    match op().await {
        Ok(value) => Ok(value),
        Err(first) => {
            warn!("{what} failed ({first}), retrying once");
            op().await
        }
    }
}
