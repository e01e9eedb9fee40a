// Reading domain model
use chrono::{DateTime, TimeZone};

#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub label: String,
    pub darkness: f64,
}

impl Reading {
    pub fn new(label: impl Into<String>, darkness: f64) -> Self {
        Self {
            label: label.into(),
            darkness,
        }
    }

    /// Reading stamped with the local time of day, e.g. "3:04:05 PM"
    pub fn at<Tz>(time: &DateTime<Tz>, darkness: f64) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        Self::new(time_of_day_label(time), darkness)
    }
}

pub fn time_of_day_label<Tz>(time: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    time.format("%-I:%M:%S %p").to_string()
}
