// Sensor message domain model - payload of a feed event
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("malformed event payload: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("sensor message is not a string: {0}")]
    MessageNotText(Value),
    #[error("sensor message is not valid JSON: {0}")]
    InvalidMessage(#[source] serde_json::Error),
    #[error("sensor message has no darkness field")]
    MissingDarkness,
    #[error("darkness value {0} is not a number")]
    NotANumber(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SensorMessage {
    pub topic: String,
    /// Left undecoded until the topic has been matched
    #[serde(default)]
    pub message: Value,
}

impl SensorMessage {
    pub fn from_value(payload: Value) -> Result<Self, PayloadError> {
        serde_json::from_value(payload).map_err(PayloadError::Malformed)
    }

    pub fn is_topic(&self, topic: &str) -> bool {
        self.topic == topic
    }

    /// Extract the darkness reading from the embedded JSON message.
    /// Accepts a number or a string starting with a decimal ("0.42", " 0.42lux").
    pub fn darkness(&self) -> Result<f64, PayloadError> {
        let text = self
            .message
            .as_str()
            .ok_or_else(|| PayloadError::MessageNotText(self.message.clone()))?;
        let body: Value = serde_json::from_str(text).map_err(PayloadError::InvalidMessage)?;

        let raw = body.get("darkness").ok_or(PayloadError::MissingDarkness)?;
        let parsed = match raw {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => parse_float_prefix(s),
            _ => None,
        };

        parsed
            .filter(|v| v.is_finite())
            .ok_or_else(|| PayloadError::NotANumber(raw.to_string()))
    }
}

/// Parse the longest decimal prefix of `input` after leading whitespace
pub fn parse_float_prefix(input: &str) -> Option<f64> {
    let s = input.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(body: &str) -> SensorMessage {
        SensorMessage {
            topic: "sensors/ldr".to_string(),
            message: Value::String(body.to_string()),
        }
    }

    #[test]
    fn test_parse_float_prefix() {
        assert_eq!(parse_float_prefix("0.42"), Some(0.42));
        assert_eq!(parse_float_prefix("  0.42lux"), Some(0.42));
        assert_eq!(parse_float_prefix(".5"), Some(0.5));
        assert_eq!(parse_float_prefix("1."), Some(1.0));
        assert_eq!(parse_float_prefix("-3e2x"), Some(-300.0));
        assert_eq!(parse_float_prefix("2e"), Some(2.0));
        assert_eq!(parse_float_prefix("abc"), None);
        assert_eq!(parse_float_prefix(""), None);
        assert_eq!(parse_float_prefix("."), None);
        assert_eq!(parse_float_prefix("-"), None);
    }

    #[test]
    fn test_darkness_from_string_and_number() {
        assert_eq!(message(r#"{"darkness":"0.75"}"#).darkness().unwrap(), 0.75);
        assert_eq!(message(r#"{"darkness":0.25}"#).darkness().unwrap(), 0.25);
    }

    #[test]
    fn test_darkness_errors() {
        assert!(matches!(
            message("not json").darkness(),
            Err(PayloadError::InvalidMessage(_))
        ));
        assert!(matches!(
            message(r#"{"light":"0.5"}"#).darkness(),
            Err(PayloadError::MissingDarkness)
        ));
        assert!(matches!(
            message(r#"{"darkness":"dim"}"#).darkness(),
            Err(PayloadError::NotANumber(_))
        ));
        assert!(matches!(
            message(r#"{"darkness":null}"#).darkness(),
            Err(PayloadError::NotANumber(_))
        ));

        let object = SensorMessage {
            topic: "sensors/ldr".to_string(),
            message: json!({ "darkness": "0.5" }),
        };
        assert!(matches!(object.darkness(), Err(PayloadError::MessageNotText(_))));
    }

    #[test]
    fn test_other_topic_with_object_message_decodes() {
        let msg = SensorMessage::from_value(json!({
            "topic": "sensors/temp",
            "message": { "celsius": 21 }
        }))
        .unwrap();
        assert!(!msg.is_topic("sensors/ldr"));

        let bare = SensorMessage::from_value(json!({ "topic": "sensors/temp" })).unwrap();
        assert_eq!(bare.message, Value::Null);
    }

    #[test]
    fn test_from_value() {
        let msg = SensorMessage::from_value(json!({
            "topic": "sensors/ldr",
            "message": "{\"darkness\":\"0.1\"}"
        }))
        .unwrap();
        assert!(msg.is_topic("sensors/ldr"));
        assert!(!msg.is_topic("sensors/temp"));

        assert!(matches!(
            SensorMessage::from_value(json!({ "topic": 1 })),
            Err(PayloadError::Malformed(_))
        ));
    }
}
