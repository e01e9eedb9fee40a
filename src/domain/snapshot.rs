// Chart snapshot domain model - bounded darkness series plus display style
use super::reading::Reading;
use serde::{Deserialize, Serialize};

/// Number of readings retained on the chart
pub const WINDOW_CAPACITY: usize = 10;

pub const DEFAULT_DATASET_LABEL: &str = "Darkness";
pub const DEFAULT_COLOR: &str = "black";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSnapshot {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default = "default_label")]
    pub label: String,
    #[serde(default)]
    pub data: Vec<f64>,
    #[serde(default)]
    pub fill: bool,
    #[serde(default = "default_color")]
    pub background_color: String,
    #[serde(default = "default_color")]
    pub border_color: String,
}

fn default_label() -> String {
    DEFAULT_DATASET_LABEL.to_string()
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

impl Default for Dataset {
    fn default() -> Self {
        Self {
            label: default_label(),
            data: Vec::new(),
            fill: false,
            background_color: default_color(),
            border_color: default_color(),
        }
    }
}

impl Default for ChartSnapshot {
    fn default() -> Self {
        Self {
            labels: Vec::new(),
            datasets: vec![Dataset::default()],
        }
    }
}

impl ChartSnapshot {
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Darkness values of the series, oldest first
    pub fn values(&self) -> &[f64] {
        self.datasets
            .first()
            .map(|d| d.data.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.labels.len().min(self.values().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn series(&self) -> Vec<Reading> {
        self.labels
            .iter()
            .zip(self.values())
            .map(|(label, value)| Reading::new(label.clone(), *value))
            .collect()
    }

    /// Append a reading and keep only the newest `WINDOW_CAPACITY` points.
    /// Style metadata of the series dataset is carried over unchanged.
    pub fn push_reading(&self, reading: Reading) -> ChartSnapshot {
        let mut next = self.clone();
        if next.datasets.is_empty() {
            next.datasets.push(Dataset::default());
        }

        next.labels.push(reading.label);
        next.datasets[0].data.push(reading.darkness);

        trim_front(&mut next.labels, WINDOW_CAPACITY);
        trim_front(&mut next.datasets[0].data, WINDOW_CAPACITY);

        next
    }

    /// Repair a snapshot restored from storage: restore a missing dataset,
    /// pair labels with values, and keep only the newest window.
    pub fn sanitize(mut self) -> ChartSnapshot {
        if self.datasets.is_empty() {
            self.datasets.push(Dataset::default());
        }

        let paired = self.labels.len().min(self.datasets[0].data.len());
        self.labels.truncate(paired);
        self.datasets[0].data.truncate(paired);

        trim_front(&mut self.labels, WINDOW_CAPACITY);
        trim_front(&mut self.datasets[0].data, WINDOW_CAPACITY);

        self
    }
}

fn trim_front<T>(items: &mut Vec<T>, capacity: usize) {
    if items.len() > capacity {
        let excess = items.len() - capacity;
        items.drain(..excess);
    }
}
