use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single message from a message log.
///
/// Only `id`, the edit marker and the timestamp are interpreted. The record keeps
/// every field it was read with, in the original order, and serializes back to
/// exactly that object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct MessageRecord {
    id: i64,
    edited: bool,
    timestamp: Option<NaiveDateTime>,
    fields: Map<String, Value>,
}

impl MessageRecord {
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Whether the message carries an edit marker
    pub fn is_edited(&self) -> bool {
        self.edited
    }

    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamp
    }

    /// Look up any field of the original record
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl TryFrom<Map<String, Value>> for MessageRecord {
    type Error = String;

    fn try_from(fields: Map<String, Value>) -> Result<Self, Self::Error> {
        let id = fields
            .get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| "message without an integer \"id\"".to_string())?;

        let edited = fields.get("edited").is_some_and(|v| !v.is_null());

        let timestamp = fields
            .get("date")
            .and_then(Value::as_str)
            .and_then(parse_timestamp);

        Ok(MessageRecord {
            id,
            edited,
            timestamp,
            fields,
        })
    }
}

impl TryFrom<Value> for MessageRecord {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => MessageRecord::try_from(fields),
            other => Err(format!("message is not an object: {other}")),
        }
    }
}

impl From<MessageRecord> for Map<String, Value> {
    fn from(record: MessageRecord) -> Self {
        record.fields
    }
}

/// Parse an export timestamp: local `YYYY-MM-DDTHH:MM:SS`, or RFC 3339
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.naive_utc())
        })
}

/// A parsed message log: the conversation identity plus its messages
#[derive(Debug, Clone)]
pub struct MessageLog {
    pub chat_id: i64,
    pub chat_name: String,
    pub chat_type: String,
    pub messages: Vec<MessageRecord>,
}

impl MessageLog {
    /// Parse a message log from raw bytes.
    ///
    /// A missing or non-array `messages` field yields an empty log. Anything
    /// else that does not fit the expected shape is an error.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, String> {
        let root: Value = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;

        let Value::Object(mut root) = root else {
            return Err("message log is not a JSON object".to_string());
        };

        let chat_id = root
            .get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| "message log has no integer chat \"id\"".to_string())?;

        let chat_name = string_field(&root, "name");
        let chat_type = string_field(&root, "type");

        let messages = match root.remove("messages") {
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(idx, item)| {
                    MessageRecord::try_from(item).map_err(|e| format!("messages[{idx}]: {e}"))
                })
                .collect::<Result<Vec<_>, _>>()?,
            _ => Vec::new(),
        };

        Ok(MessageLog {
            chat_id,
            chat_name,
            chat_type,
            messages,
        })
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Earliest and latest message timestamps, ignoring messages without one
    pub fn date_span(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let mut stamps = self.messages.iter().filter_map(MessageRecord::timestamp);
        let first = stamps.next()?;
        Some(stamps.fold((first, first), |(lo, hi), ts| (lo.min(ts), hi.max(ts))))
    }
}

fn string_field(root: &Map<String, Value>, key: &str) -> String {
    match root.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
