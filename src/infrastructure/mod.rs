// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod feed_client;
pub mod file_store;
pub mod logging;
#[cfg(test)]
pub mod memory_store;
pub mod socket_io;
pub mod svg_chart;
