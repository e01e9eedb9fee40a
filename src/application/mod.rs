// Application layer - chart state, feed handling and monitor lifecycle
pub mod chart_service;
pub mod feed_service;
pub mod monitor;
pub mod snapshot_store;
