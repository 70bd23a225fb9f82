//! Document model shared by the store backends and the sweep.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::fmt;

/// Field map of a single document.
pub type Fields = serde_json::Map<String, Value>;

/// Reference to a document inside a named collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentRef {
    collection: String,
    id: String,
}

impl DocumentRef {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// 查询结果中的一条文档：引用与字段值。
#[derive(Clone, Debug)]
pub struct DocumentSnapshot {
    pub reference: DocumentRef,
    pub fields: Fields,
}

/// Range filter `field <= bound`, compared chronologically.
///
/// Values that are not timestamps never match, the same way a typed
/// document query skips values of another type.
#[derive(Clone, Debug)]
pub struct Filter {
    field: String,
    at_or_before: DateTime<Utc>,
}

impl Filter {
    pub fn at_or_before(field: impl Into<String>, bound: DateTime<Utc>) -> Self {
        Self {
            field: field.into(),
            at_or_before: bound,
        }
    }

    pub fn matches(&self, fields: &Fields) -> bool {
        fields
            .get(&self.field)
            .and_then(timestamp_value)
            .is_some_and(|value| value <= self.at_or_before)
    }
}

/// 解析时间字段：ISO-8601 字符串或 Unix 毫秒整数。
///
/// Date-times without an offset and plain dates are read as UTC, which keeps
/// the ordering identical to comparing ISO-8601 text against the UTC bound.
pub fn timestamp_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => parse_iso8601(text),
        Value::Number(number) => number.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn parse_iso8601(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = text.parse::<NaiveDateTime>() {
        return Some(naive.and_utc());
    }
    text.parse::<NaiveDate>()
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// ISO-8601 with millisecond precision and a `Z` suffix.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Field updates applied to several documents as one unit.
#[derive(Debug, Default)]
pub struct WriteBatch {
    updates: Vec<(DocumentRef, Fields)>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a merge of `fields` into the referenced document.
    pub fn update(&mut self, reference: DocumentRef, fields: Fields) -> &mut Self {
        self.updates.push((reference, fields));
        self
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn updates(&self) -> impl Iterator<Item = (&DocumentRef, &Fields)> {
        self.updates.iter().map(|(reference, fields)| (reference, fields))
    }
}
