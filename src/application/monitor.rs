// Darkness monitor lifecycle - mount subscribes, unmount closes (terminal)
use crate::application::chart_service::ChartService;
use crate::application::feed_service::FeedService;
use crate::application::snapshot_store::SnapshotStore;
use crate::infrastructure::feed_client::FeedClient;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

const EVENT_BUFFER: usize = 64;

/// A mounted monitor: subscribed, accepting events, publishing snapshots.
/// `unmount` consumes it, so an unmounted monitor cannot be used again.
pub struct DarknessMonitor {
    chart: ChartService,
    shutdown: watch::Sender<bool>,
    feed_task: JoinHandle<()>,
    consumer_task: JoinHandle<()>,
}

impl DarknessMonitor {
    pub async fn mount(
        store: Arc<dyn SnapshotStore>,
        storage_key: &str,
        client: FeedClient,
        topic: &str,
    ) -> Self {
        let chart = ChartService::load(store, storage_key).await;
        let feed = FeedService::new(chart.clone(), topic);

        let (shutdown, shutdown_rx) = watch::channel(false);
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);

        let consumer_shutdown = shutdown_rx.clone();
        let consumer_task = tokio::spawn(async move { feed.run(events_rx, consumer_shutdown).await });
        let feed_task = client.spawn(events_tx, shutdown_rx);

        Self {
            chart,
            shutdown,
            feed_task,
            consumer_task,
        }
    }

    pub fn chart(&self) -> &ChartService {
        &self.chart
    }

    /// Observes the transition to unmounted
    pub fn stopped(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Stop processing events and close the feed connection
    pub async fn unmount(self) {
        self.shutdown.send_replace(true);

        if let Err(e) = self.consumer_task.await {
            tracing::error!("Feed consumer task failed: {}", e);
        }
        if let Err(e) = self.feed_task.await {
            tracing::error!("Feed connection task failed: {}", e);
        }
        tracing::info!("Darkness monitor unmounted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::snapshot::ChartSnapshot;
    use crate::infrastructure::feed_client::ReconnectPolicy;
    use crate::infrastructure::memory_store::MemoryStore;
    use crate::infrastructure::socket_io::FeedEndpoint;
    use futures::{SinkExt, StreamExt};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;
    use tokio_tungstenite::tungstenite::Message;

    const KEY: &str = "darknessChartData";

    fn event(topic: &str, darkness: &str) -> Message {
        let text = format!(
            r#"42["mqtt_message",{{"topic":"{}","message":"{{\"darkness\":\"{}\"}}"}}]"#,
            topic, darkness
        );
        Message::Text(text.into())
    }

    #[tokio::test]
    async fn test_mount_stream_and_unmount() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let ws = accept_async(stream).await.unwrap();
            let (mut write, mut read) = ws.split();

            write
                .send(Message::Text(
                    r#"0{"sid":"s","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#.into(),
                ))
                .await
                .unwrap();
            let _connect = read.next().await;
            write.send(Message::Text(r#"40{"sid":"n"}"#.into())).await.unwrap();

            write.send(event("sensors/ldr", "0.1")).await.unwrap();
            write.send(event("sensors/temp", "0.3")).await.unwrap();
            write.send(event("sensors/ldr", "oops")).await.unwrap();
            write.send(event("sensors/ldr", "0.5")).await.unwrap();
            write.send(event("sensors/ldr", "0.9")).await.unwrap();
            let _ = done_rx.await;

            let mut received = Vec::new();
            while let Some(Ok(Message::Text(text))) = read.next().await {
                received.push(text.as_str().to_string());
            }
            received
        });

        let store = Arc::new(MemoryStore::default());
        let endpoint = FeedEndpoint::parse(&format!("http://{}", addr)).unwrap();
        let client = FeedClient::new(endpoint, "mqtt_message", ReconnectPolicy::default());
        let monitor = DarknessMonitor::mount(store.clone(), KEY, client, "sensors/ldr").await;

        let mut updates = monitor.chart().subscribe();
        tokio::time::timeout(
            Duration::from_secs(5),
            updates.wait_for(|s| s.values().len() == 3),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(monitor.chart().current().values(), &[0.1, 0.5, 0.9]);
        let persisted = store.get(KEY).await.unwrap().unwrap();
        assert_eq!(
            ChartSnapshot::from_json(&persisted).unwrap().values(),
            &[0.1, 0.5, 0.9]
        );

        done_tx.send(()).unwrap();
        monitor.unmount().await;

        let received = server.await.unwrap();
        assert_eq!(received, vec!["41".to_string()]);
    }

    #[tokio::test]
    async fn test_mount_restores_persisted_series() {
        let store = Arc::new(MemoryStore::default());
        let seeded = ChartSnapshot::default()
            .push_reading(crate::domain::reading::Reading::new("9:00:00 AM", 0.6));
        store.set(KEY, &seeded.to_json().unwrap()).await.unwrap();

        // nothing listens here; the client keeps retrying until unmount
        let endpoint = FeedEndpoint::parse("http://127.0.0.1:9").unwrap();
        let policy = ReconnectPolicy::new(Duration::from_millis(10), Duration::from_millis(20));
        let client = FeedClient::new(endpoint, "mqtt_message", policy);

        let monitor = DarknessMonitor::mount(store, KEY, client, "sensors/ldr").await;
        assert_eq!(monitor.chart().current(), seeded);
        monitor.unmount().await;
    }
}
