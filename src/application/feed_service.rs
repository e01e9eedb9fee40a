// Feed service - filters sensor events and feeds accepted readings into the chart
use crate::application::chart_service::ChartService;
use crate::domain::reading::Reading;
use crate::domain::sensor_message::SensorMessage;
use crate::domain::snapshot::ChartSnapshot;
use chrono::Local;
use serde_json::Value;
use tokio::sync::{mpsc, watch};

#[derive(Clone)]
pub struct FeedService {
    chart: ChartService,
    topic: String,
}

impl FeedService {
    pub fn new(chart: ChartService, topic: impl Into<String>) -> Self {
        Self {
            chart,
            topic: topic.into(),
        }
    }

    /// Handle one event payload. Returns the new snapshot when a reading was accepted.
    pub async fn handle_event(&self, payload: Value) -> Option<ChartSnapshot> {
        let message = match SensorMessage::from_value(payload) {
            Ok(message) => message,
            Err(e) => {
                tracing::error!("Error parsing sensor event: {}", e);
                return None;
            }
        };

        if !message.is_topic(&self.topic) {
            tracing::trace!("Ignoring message on topic {}", message.topic);
            return None;
        }

        match message.darkness() {
            Ok(darkness) => {
                let reading = Reading::at(&Local::now(), darkness);
                tracing::debug!("Darkness {} at {}", reading.darkness, reading.label);
                Some(self.chart.apply(reading).await)
            }
            Err(e) => {
                tracing::error!("Error parsing LDR sensor data: {}", e);
                None
            }
        }
    }

    /// Consume events in delivery order until shutdown or until the feed ends.
    /// Events still queued when shutdown is requested are dropped.
    pub async fn run(&self, mut events: mpsc::Receiver<Value>, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                biased;

                _ = async { let _ = shutdown.wait_for(|stop| *stop).await; } => break,
                event = events.recv() => match event {
                    Some(payload) => {
                        self.handle_event(payload).await;
                    }
                    None => break,
                },
            }
        }
    }
}
