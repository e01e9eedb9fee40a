// Domain layer - readings, chart snapshot and sensor payloads
pub mod reading;
pub mod sensor_message;
pub mod snapshot;
