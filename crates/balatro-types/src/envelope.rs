//! The sequence-numbered wrapper shared by all three message files.
//!
//! ```text
//! { "timestamp": "<RFC 3339>", "sequence_id": 7, "message_type": "state", "data": { ... } }
//! ```
//!
//! Timestamps are written as RFC 3339. On read, an ISO 8601 timestamp
//! without an offset is also accepted and taken as UTC.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::enums::MessageKind;

/// A message as it sits on disk.
///
/// `T` is the kind-specific payload. Readers first decode with
/// `T = serde_json::Value` so the kind and sequence id can be checked before
/// the payload is interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// When the writer produced the message.
    #[serde(deserialize_with = "lenient_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Writer-local, strictly increasing message number.
    pub sequence_id: u64,
    /// Which stream the message belongs to.
    pub message_type: MessageKind,
    /// Kind-specific payload.
    pub data: T,
}

impl<T> Envelope<T> {
    /// Wrap `data` stamped with the current time.
    pub fn new(sequence_id: u64, message_type: MessageKind, data: T) -> Self {
        Self {
            timestamp: Utc::now(),
            sequence_id,
            message_type,
            data,
        }
    }
}

/// RFC 3339, or a naive ISO 8601 date-time read as UTC.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(stamp) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(stamp.with_timezone(&Utc));
    }
    raw.parse::<NaiveDateTime>()
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}
