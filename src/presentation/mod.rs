// Presentation layer - HTTP surface for the chart
pub mod app_state;
pub mod handlers;
