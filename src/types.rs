/// file: src/types.rs
/// description: wire model for frames pushed by the alarm relay
use crate::error::AlarmFeedError;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;

pub const ALARM_RECORDS_TYPE: &str = "alarm-records";

/// One alarm occurrence. Upstream sends records newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmRecord {
    pub id: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Parses an ISO-8601 timestamp the way a browser `Date` would: offsets are
/// honoured, a date-time without one is local time, a bare date is UTC midnight.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            // A local time inside a DST gap has no mapping; read it as UTC.
            return Some(
                Local
                    .from_local_datetime(&naive)
                    .earliest()
                    .map(|local| local.with_timezone(&Utc))
                    .unwrap_or_else(|| naive.and_utc()),
            );
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| de::Error::custom(format!("invalid ISO-8601 timestamp `{raw}`")))
}

#[derive(Debug, Clone, Deserialize)]
struct AlarmRecordsPayload {
    records: Vec<AlarmRecord>,
}

/// A decoded frame, tagged by its `type` field.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    AlarmRecords(Vec<AlarmRecord>),
    /// Any tag we do not act on. Listeners are free to ignore it.
    Other { kind: String },
}

impl InboundMessage {
    pub fn kind(&self) -> &str {
        match self {
            InboundMessage::AlarmRecords(_) => ALARM_RECORDS_TYPE,
            InboundMessage::Other { kind } => kind,
        }
    }
}

/// Decodes one text frame of shape `{"type": "...", ...}`.
///
/// Only `alarm-records` bodies are validated; other tags decode to
/// [`InboundMessage::Other`] without looking at the rest of the object.
pub fn decode_frame(text: &str) -> Result<InboundMessage, AlarmFeedError> {
    let value: Value = serde_json::from_str(text)?;

    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| AlarmFeedError::InvalidMessage("missing string field `type`".into()))?;

    if kind != ALARM_RECORDS_TYPE {
        return Ok(InboundMessage::Other {
            kind: kind.to_string(),
        });
    }

    let payload: AlarmRecordsPayload = serde_json::from_value(value)?;
    Ok(InboundMessage::AlarmRecords(payload.records))
}
