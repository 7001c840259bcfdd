//! # Telemetry Record Types
//!
//! The canonical output unit of the line parsers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A normalized measurement value.
///
/// Serialized untagged, so `Int(429)` becomes `429`, `Float(12.5)` becomes
/// `12.5` and `Text("ON")` becomes `"ON"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TelemetryValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for TelemetryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryValue::Int(v) => write!(f, "{}", v),
            TelemetryValue::Float(v) => write!(f, "{}", v),
            TelemetryValue::Text(v) => f.write_str(v),
        }
    }
}

/// Natural key of a record: `(received_time, id, parameter)`.
///
/// Two records with the same key describe the same measurement; the later one
/// replaces the earlier one at the sink.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub received_time: i64,
    pub id: u32,
    pub parameter: String,
}

/// One parsed measurement.
///
/// Field names on the wire match the columns used by the store and the
/// downstream notification consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Frame receive time in epoch seconds
    #[serde(rename = "tm_received_time")]
    pub received_time: i64,

    /// Telemetry message id
    #[serde(rename = "tm_id")]
    pub id: u32,

    /// Canonical snake-case parameter name
    pub parameter: String,

    /// Normalized value, `None` when the raw token cleaned down to nothing
    pub value: Option<TelemetryValue>,

    /// Epoch seconds at parse time
    pub processed_at: i64,

    /// Free-form local timestamp from the frame header, informational only
    pub local_date_time: Option<String>,
}

impl TelemetryRecord {
    /// Returns the natural key of this record.
    ///
    /// # Examples
    ///
    /// ```
    /// use satlog_ingest::telemetry::{TelemetryRecord, TelemetryValue};
    ///
    /// let record = TelemetryRecord {
    ///     received_time: 1_695_700_000,
    ///     id: 210,
    ///     parameter: "btry_temp_1".to_string(),
    ///     value: Some(TelemetryValue::Float(24.5)),
    ///     processed_at: 1_695_700_001,
    ///     local_date_time: None,
    /// };
    /// assert_eq!(record.key().parameter, "btry_temp_1");
    /// ```
    pub fn key(&self) -> RecordKey {
        RecordKey {
            received_time: self.received_time,
            id: self.id,
            parameter: self.parameter.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(value: Option<TelemetryValue>) -> TelemetryRecord {
        TelemetryRecord {
            received_time: 1_695_700_000,
            id: 210,
            parameter: "mppt_conv_0_voltage".to_string(),
            value,
            processed_at: 1_695_700_005,
            local_date_time: Some("2023-09-26 10:00:00".to_string()),
        }
    }

    #[test]
    fn test_record_serializes_with_store_field_names() {
        let json = serde_json::to_value(record(Some(TelemetryValue::Float(10.0)))).unwrap();

        assert_eq!(json["tm_received_time"], 1_695_700_000);
        assert_eq!(json["tm_id"], 210);
        assert_eq!(json["parameter"], "mppt_conv_0_voltage");
        assert_eq!(json["value"], 10.0);
        assert_eq!(json["processed_at"], 1_695_700_005);
        assert_eq!(json["local_date_time"], "2023-09-26 10:00:00");
    }

    #[test]
    fn test_value_serializes_untagged() {
        assert_eq!(serde_json::to_string(&TelemetryValue::Int(429)).unwrap(), "429");
        assert_eq!(serde_json::to_string(&TelemetryValue::Text("ON".into())).unwrap(), "\"ON\"");
    }

    #[test]
    fn test_null_value_serializes_as_null() {
        let json = serde_json::to_value(record(None)).unwrap();
        assert!(json["value"].is_null());
    }

    #[test]
    fn test_key_ignores_value_and_processing_time() {
        let a = record(Some(TelemetryValue::Int(1)));
        let mut b = record(Some(TelemetryValue::Int(2)));
        b.processed_at += 10;

        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_value_display() {
        assert_eq!(TelemetryValue::Int(-3).to_string(), "-3");
        assert_eq!(TelemetryValue::Float(1.53).to_string(), "1.53");
        assert_eq!(TelemetryValue::Text("OFF".into()).to_string(), "OFF");
    }
}
