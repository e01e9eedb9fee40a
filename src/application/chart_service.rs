// Chart service - loads, advances, persists and publishes the darkness chart
use crate::application::snapshot_store::SnapshotStore;
use crate::domain::reading::Reading;
use crate::domain::snapshot::ChartSnapshot;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Clone)]
pub struct ChartService {
    store: Arc<dyn SnapshotStore>,
    key: String,
    state: Arc<watch::Sender<ChartSnapshot>>,
}

impl ChartService {
    /// Seed the chart from the persisted snapshot, or the default one
    pub async fn load(store: Arc<dyn SnapshotStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let snapshot = load_snapshot(store.as_ref(), &key).await;
        tracing::info!(
            "Loaded darkness chart '{}' with {} readings",
            key,
            snapshot.len()
        );

        Self {
            store,
            key,
            state: Arc::new(watch::Sender::new(snapshot)),
        }
    }

    pub fn current(&self) -> ChartSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver that observes every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<ChartSnapshot> {
        self.state.subscribe()
    }

    pub async fn apply(&self, reading: Reading) -> ChartSnapshot {
        let next = self.current().push_reading(reading);

        match next.to_json() {
            Ok(raw) => {
                if let Err(e) = self.store.set(&self.key, &raw).await {
                    tracing::error!("Failed to persist darkness chart '{}': {}", self.key, e);
                }
            }
            Err(e) => tracing::error!("Failed to encode darkness chart '{}': {}", self.key, e),
        }

        self.state.send_replace(next.clone());
        next
    }
}

pub async fn load_snapshot(store: &dyn SnapshotStore, key: &str) -> ChartSnapshot {
    let raw = match store.get(key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return ChartSnapshot::default(),
        Err(e) => {
            tracing::warn!("Could not read persisted chart '{}': {}", key, e);
            return ChartSnapshot::default();
        }
    };

    match ChartSnapshot::from_json(&raw) {
        Ok(snapshot) => snapshot.sanitize(),
        Err(e) => {
            tracing::warn!("Discarding unreadable chart '{}': {}", key, e);
            ChartSnapshot::default()
        }
    }
}
