//! Wire framing of emitted buckets.
//!
//! In [`StreamMode::PerRecord`] every payload becomes its own message,
//! verbatim. In [`StreamMode::Batched`] the payloads of one second become a
//! single JSON array; payloads that are valid JSON are embedded as JSON,
//! anything else is embedded as a JSON string.

use serde_json::Value;
use tickreplay_types::StreamMode;

/// Turn the payloads of one bucket into outbound text messages.
///
/// Returns no messages for an empty bucket in either mode.
///
/// # Errors
///
/// Returns [`serde_json::Error`] if the batched array cannot be encoded.
pub fn frame_bucket(mode: StreamMode, payloads: Vec<String>) -> Result<Vec<String>, serde_json::Error> {
    if payloads.is_empty() {
        return Ok(Vec::new());
    }
    match mode {
        StreamMode::PerRecord => Ok(payloads),
        StreamMode::Batched => {
            let items: Vec<Value> = payloads
                .into_iter()
                .map(|payload| serde_json::from_str(&payload).unwrap_or(Value::String(payload)))
                .collect();
            Ok(vec![serde_json::to_string(&items)?])
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn payloads() -> Vec<String> {
        vec![
            r#"{"Symbol":"7974","CurrentPrice":54850}"#.to_owned(),
            "not json".to_owned(),
        ]
    }

    #[test]
    fn per_record_passes_payloads_through() {
        let frames = frame_bucket(StreamMode::PerRecord, payloads()).unwrap();
        assert_eq!(frames, payloads());
    }

    #[test]
    fn batched_wraps_bucket_in_one_array() {
        let frames = frame_bucket(StreamMode::Batched, payloads()).unwrap();
        assert_eq!(frames.len(), 1);
        let parsed: Value = serde_json::from_str(&frames[0]).unwrap();
        assert_eq!(parsed[0]["CurrentPrice"], 54850);
        assert_eq!(parsed[1], "not json");
    }

    #[test]
    fn empty_bucket_produces_no_messages() {
        assert!(frame_bucket(StreamMode::PerRecord, Vec::new()).unwrap().is_empty());
        assert!(frame_bucket(StreamMode::Batched, Vec::new()).unwrap().is_empty());
    }
}
