//! Extracting throughput figures from an iPerf3 run result.
//!
//! A run result is a deeply nested JSON document; the viewer only needs
//! four fields from it. Every field is independently optional - a partial
//! run (crashed client, unidirectional test, missing label) yields a
//! partially filled sample, never an error.

use serde::Serialize;
use serde_json::Value;

/// One benchmark run reduced to the fields the viewer displays.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerfSample {
    /// Run start time, seconds since the epoch.
    pub timestamp: Option<i64>,
    /// Average bits per second sent by the server.
    pub send_bps: Option<f64>,
    /// Average bits per second received by the server.
    pub receive_bps: Option<f64>,
    /// Free-text label supplied to iPerf3 via `--extra-data`.
    pub label: Option<String>,
}

/// Map one run result to a [`PerfSample`].
///
/// Stream indexing follows what iPerf3 actually writes: `end.streams[1]`
/// carries the sender-direction figure and `end.streams[0]` the
/// receiver-direction figure. No direction field exists in the record to
/// validate this against, so the fixed indices are the contract; a
/// unidirectional run reports a single stream and the sender lookup
/// simply comes back absent.
pub fn extract_performance(record: &Value) -> PerfSample {
    PerfSample {
        timestamp: record
            .pointer("/start/timestamp/timesecs")
            .and_then(Value::as_i64),
        send_bps: record
            .pointer("/end/streams/1/sender/bits_per_second")
            .and_then(Value::as_f64),
        receive_bps: record
            .pointer("/end/streams/0/receiver/bits_per_second")
            .and_then(Value::as_f64),
        label: record
            .get("extra_data")
            .and_then(Value::as_str)
            .map(str::to_owned),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_full_record() {
        let record = json!({
            "start": { "timestamp": { "timesecs": 1647312652 } },
            "end": {
                "streams": [
                    { "receiver": { "bits_per_second": 5588500339.16 } },
                    { "sender": { "bits_per_second": 6218445861.06 } }
                ]
            },
            "extra_data": "UE name 2 here"
        });

        let sample = extract_performance(&record);
        assert_eq!(sample.timestamp, Some(1647312652));
        assert_eq!(sample.send_bps, Some(6218445861.06));
        assert_eq!(sample.receive_bps, Some(5588500339.16));
        assert_eq!(sample.label.as_deref(), Some("UE name 2 here"));
    }

    #[test]
    fn test_extract_missing_streams() {
        let record = json!({
            "start": { "timestamp": { "timesecs": 1647312652 } },
            "extra_data": "UE name 2 here"
        });

        let sample = extract_performance(&record);
        assert_eq!(sample.timestamp, Some(1647312652));
        assert_eq!(sample.send_bps, None);
        assert_eq!(sample.receive_bps, None);
        assert_eq!(sample.label.as_deref(), Some("UE name 2 here"));
    }

    #[test]
    fn test_extract_unidirectional_run() {
        // One stream only: receiver figure present, sender lookup out of range
        let record = json!({
            "end": {
                "streams": [
                    { "receiver": { "bits_per_second": 1000.5 } }
                ]
            }
        });

        let sample = extract_performance(&record);
        assert_eq!(sample.send_bps, None);
        assert_eq!(sample.receive_bps, Some(1000.5));
        assert_eq!(sample.timestamp, None);
        assert_eq!(sample.label, None);
    }

    #[test]
    fn test_extract_empty_record() {
        let sample = extract_performance(&json!({}));
        assert_eq!(sample, PerfSample::default());
    }

    #[test]
    fn test_extract_wrong_field_types() {
        let record = json!({
            "start": { "timestamp": { "timesecs": "not a number" } },
            "end": { "streams": "not an array" },
            "extra_data": 42
        });

        let sample = extract_performance(&record);
        assert_eq!(sample, PerfSample::default());
    }
}
