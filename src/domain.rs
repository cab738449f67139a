use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rand::{Rng, distributions::Alphanumeric, thread_rng};
use serde::{Deserialize, Deserializer, Serialize};

const ID_LEN: usize = 8;

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// Terminal color names handed out to chart segments in first-seen order.
pub const SEGMENT_PALETTE: [&str; 12] = [
    "light_blue",
    "light_green",
    "yellow",
    "magenta",
    "cyan",
    "light_red",
    "blue",
    "green",
    "light_magenta",
    "light_yellow",
    "red",
    "gray",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Inflow,
    #[default]
    Outflow,
}

impl Display for EntryKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryKind::Inflow => write!(f, "inflow"),
            EntryKind::Outflow => write!(f, "outflow"),
        }
    }
}

impl FromStr for EntryKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "inflow" | "income" | "in" => Ok(EntryKind::Inflow),
            "outflow" | "expense" | "out" => Ok(EntryKind::Outflow),
            other => Err(format!("unknown entry kind: {other}")),
        }
    }
}

/// A single dated financial record as delivered by the data source.
///
/// `date` is kept raw. Entries whose date is absent or unparsable stay in the
/// array (so original indices remain stable) but never reach a day bucket or
/// a chart slot. Decoding never rejects a record over a field value: an
/// unreadable amount is `None` and an unknown kind is an outflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_date")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_kind")]
    pub kind: EntryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Entry {
    pub fn new(id: impl Into<String>, date: impl Into<String>, amount: f64, kind: EntryKind) -> Self {
        Self {
            id: id.into(),
            date: Some(date.into()),
            amount: Some(amount),
            kind,
            category: None,
            method: None,
            note: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Calendar day of the entry, or `None` when the date is missing or unparsable.
    pub fn day(&self) -> Option<NaiveDate> {
        self.date.as_deref().and_then(parse_entry_day)
    }

    /// Unsigned magnitude used by every summation path; direction comes from `kind`.
    pub fn magnitude(&self) -> Option<f64> {
        self.amount
            .filter(|amount| amount.is_finite())
            .map(f64::abs)
    }
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(raw)) => Some(raw),
        _ => None,
    })
}

fn lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(raw)) => raw,
        Some(serde_json::Value::Number(number)) => number.to_string(),
        _ => String::new(),
    })
}

/// Numbers and numeric strings; anything else is a missing amount.
fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(number)) => number.as_f64(),
        Some(serde_json::Value::String(raw)) => raw.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn lenient_kind<'de, D>(deserializer: D) -> Result<EntryKind, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(raw)) => raw.parse().unwrap_or_default(),
        _ => EntryKind::default(),
    })
}

/// Parses the date forms the data source is known to emit.
///
/// Timestamps with an offset keep the calendar day of their own offset, so
/// `2024-01-05T23:30:00-05:00` and `2024-01-05` collide in the same bucket.
pub fn parse_entry_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.date_naive());
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.date());
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }
}

impl Display for SortOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SortOrder::Ascending => write!(f, "ascending"),
            SortOrder::Descending => write!(f, "descending"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ascending" | "asc" => Ok(SortOrder::Ascending),
            "descending" | "desc" => Ok(SortOrder::Descending),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Prev,
    Next,
}

impl Direction {
    /// Signed step through time. Under `Descending`, "next" walks toward older days.
    pub fn time_delta(self, order: SortOrder) -> isize {
        match (self, order) {
            (Direction::Next, SortOrder::Ascending) | (Direction::Prev, SortOrder::Descending) => 1,
            (Direction::Prev, SortOrder::Ascending) | (Direction::Next, SortOrder::Descending) => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub key: String,
    pub label: String,
    pub color: &'static str,
}

impl Segment {
    pub fn new(key: impl Into<String>, position: usize) -> Self {
        let key = key.into();
        Self {
            label: segment_label(&key),
            color: SEGMENT_PALETTE[position % SEGMENT_PALETTE.len()],
            key,
        }
    }
}

fn segment_label(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>().replace('_', " "),
        None => String::new(),
    }
}

pub fn generate_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

pub fn format_amount(amount: f64) -> String {
    format!("{amount:.2}")
}
