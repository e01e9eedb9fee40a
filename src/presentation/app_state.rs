// Application state for HTTP handlers
use crate::application::chart_service::ChartService;
use tokio::sync::watch;

#[derive(Clone)]
pub struct AppState {
    pub chart: ChartService,
    /// Flips to true once the monitor unmounts; ends live streams
    pub stopped: watch::Receiver<bool>,
}
