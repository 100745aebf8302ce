use event_emitter_rs::EventEmitter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Progress event surface of the preparation pipeline.
///
/// Callers use these solely for progress reporting, never for control
/// flow. Within one prepare call the milestone events are emitted at most
/// once each, in the order `LibrariesResolved`, `AssetsResolved`,
/// `MetadataResolved`, `PostProcessing`; `Downloading` events interleave
/// freely.
#[derive(Debug)]
pub enum Event {
    /// One per completed download unit, payload `(units_done, units_total)`.
    Downloading,
    /// Library set resolved after platform-rule filtering, payload `total: u64`.
    LibrariesResolved,
    /// Asset index parsed, payload `total: u64`.
    AssetsResolved,
    /// All version metadata persisted, payload `()`.
    MetadataResolved,
    /// Final post-resolution work (natives, runtime) starting, payload `()`.
    PostProcessing,
}

#[derive(Clone, Default)]
pub struct Emitter {
    pub wrap: Arc<Mutex<EventEmitter>>,
}

pub trait Emit {
    #[allow(async_fn_in_trait)]
    async fn emit<T: Serialize>(&self, event: Event, data: T);
}

impl Emit for Option<&Emitter> {
    async fn emit<T: Serialize>(&self, event: Event, data: T) {
        if let Some(emitter) = self {
            emitter
                .wrap
                .lock()
                .await
                .emit(&format!("{:?}", event), data);
        }
    }
}

impl Emitter {
    pub async fn emit<T: Serialize>(&self, event: Event, data: T) {
        self.wrap.lock().await.emit(&format!("{:?}", event), data);
    }

    pub async fn on<F, T>(&self, event: Event, listener: F)
    where
        F: Fn(T) + Send + Sync + 'static,
        T: for<'de> Deserialize<'de> + Serialize,
    {
        self.wrap.lock().await.on(&format!("{:?}", event), listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[tokio::test]
    async fn listener_receives_progress_payload() {
        let emitter = Emitter::default();
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        emitter
            .on(Event::Downloading, move |(done, total): (u64, u64)| {
                sink.lock().unwrap().push((done, total));
            })
            .await;

        emitter.emit(Event::Downloading, (1u64, 3u64)).await;
        emitter.emit(Event::Downloading, (2u64, 3u64)).await;

        // Listeners run on their own threads; wait for both payloads to
        // land before inspecting them, and compare order-insensitively.
        for _ in 0..500 {
            if seen.lock().unwrap().len() == 2 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        let mut payloads = seen.lock().unwrap().clone();
        payloads.sort_unstable();
        assert_eq!(payloads, vec![(1, 3), (2, 3)]);
    }
}
