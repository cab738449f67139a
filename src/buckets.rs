use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::calendar::{MONTH_LABELS, WEEKDAY_LABELS, days_in_month, first_day_of_month, shift_month, start_of_week};
use crate::domain::{Entry, EntryKind, Segment};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Week,
    #[default]
    Month,
    Year,
}

impl Display for Granularity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Granularity::Week => write!(f, "week"),
            Granularity::Month => write!(f, "month"),
            Granularity::Year => write!(f, "year"),
        }
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "week" | "w" => Ok(Granularity::Week),
            "month" | "m" => Ok(Granularity::Month),
            "year" | "y" => Ok(Granularity::Year),
            other => Err(format!("unknown granularity: {other}")),
        }
    }
}

/// Which entry attribute splits a chart into series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentAxis {
    #[default]
    Category,
    Method,
}

impl SegmentAxis {
    pub fn key_for(self, entry: &Entry) -> String {
        let (value, fallback) = match self {
            SegmentAxis::Category => (entry.category.as_deref(), "uncategorized"),
            SegmentAxis::Method => (entry.method.as_deref(), "unspecified"),
        };
        value
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(fallback)
            .to_string()
    }

    pub fn toggled(self) -> Self {
        match self {
            SegmentAxis::Category => SegmentAxis::Method,
            SegmentAxis::Method => SegmentAxis::Category,
        }
    }
}

impl Display for SegmentAxis {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SegmentAxis::Category => write!(f, "category"),
            SegmentAxis::Method => write!(f, "method"),
        }
    }
}

impl FromStr for SegmentAxis {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "category" => Ok(SegmentAxis::Category),
            "method" => Ok(SegmentAxis::Method),
            other => Err(format!("unknown segment axis: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketQuery {
    pub granularity: Granularity,
    pub offset: i32,
    pub reference: NaiveDate,
    pub kind: Option<EntryKind>,
    pub axis: SegmentAxis,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartBucketRow {
    #[serde(rename = "slotLabel")]
    pub slot_label: String,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

impl ChartBucketRow {
    pub fn value(&self, segment: &str) -> f64 {
        self.values.get(segment).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.values.values().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub granularity: Granularity,
    pub period_start: NaiveDate,
    pub rows: Vec<ChartBucketRow>,
    pub segments: Vec<Segment>,
}

impl ChartSeries {
    pub fn segment_total(&self, segment: &str) -> f64 {
        self.rows.iter().map(|row| row.value(segment)).sum()
    }

    pub fn period_label(&self) -> String {
        match self.granularity {
            Granularity::Week => format!(
                "{} - {}",
                self.period_start.format("%d %b %Y"),
                self.period_start
                    .checked_add_signed(Duration::days(6))
                    .unwrap_or(self.period_start)
                    .format("%d %b %Y")
            ),
            Granularity::Month => self.period_start.format("%B %Y").to_string(),
            Granularity::Year => self.period_start.year().to_string(),
        }
    }
}

/// Start of the period containing `reference`, shifted by `offset` whole periods.
/// `None` when the shifted period falls outside the representable calendar.
pub fn period_start(granularity: Granularity, reference: NaiveDate, offset: i32) -> Option<NaiveDate> {
    match granularity {
        Granularity::Week => {
            start_of_week(reference).checked_add_signed(Duration::try_weeks(offset.into())?)
        }
        Granularity::Month => shift_month(first_day_of_month(reference), offset),
        Granularity::Year => NaiveDate::from_ymd_opt(reference.year().checked_add(offset)?, 1, 1),
    }
}

pub fn slot_count(granularity: Granularity, start: NaiveDate) -> usize {
    match granularity {
        Granularity::Week => 7,
        Granularity::Month => days_in_month(start.year(), start.month()) as usize,
        Granularity::Year => 12,
    }
}

fn slot_label(granularity: Granularity, slot: usize) -> String {
    match granularity {
        Granularity::Week => WEEKDAY_LABELS[slot].to_string(),
        Granularity::Month => (slot + 1).to_string(),
        Granularity::Year => MONTH_LABELS[slot][..3].to_string(),
    }
}

fn slot_index(granularity: Granularity, start: NaiveDate, day: NaiveDate, slots: usize) -> Option<usize> {
    match granularity {
        Granularity::Week => {
            let offset = (day - start).num_days();
            (0..slots as i64).contains(&offset).then_some(offset as usize)
        }
        Granularity::Month => (day.year() == start.year() && day.month() == start.month())
            .then(|| day.day0() as usize),
        Granularity::Year => (day.year() == start.year()).then(|| day.month0() as usize),
    }
}

/// Segments in first-seen order across every dated entry, independent of period,
/// so series keys and colors stay stable while paging through offsets.
pub fn known_segments(entries: &[Entry], axis: SegmentAxis) -> Vec<Segment> {
    let mut keys: Vec<String> = Vec::new();
    for entry in entries.iter().filter(|entry| entry.day().is_some()) {
        let key = axis.key_for(entry);
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys.into_iter()
        .enumerate()
        .map(|(position, key)| Segment::new(key, position))
        .collect()
}

/// Projects entries onto the fixed slots of the shifted period. Every known
/// segment has an explicit value in every row. `None` when the offset moves the
/// period out of range.
pub fn aggregate(entries: &[Entry], query: &BucketQuery) -> Option<ChartSeries> {
    let Some(start) = period_start(query.granularity, query.reference, query.offset) else {
        warn!(
            granularity = %query.granularity,
            offset = query.offset,
            reference = %query.reference,
            "chart period out of range"
        );
        return None;
    };
    let slots = slot_count(query.granularity, start);
    let segments = known_segments(entries, query.axis);

    let zeroed = segments
        .iter()
        .map(|segment| (segment.key.clone(), 0.0))
        .collect::<BTreeMap<_, _>>();
    let mut rows = (0..slots)
        .map(|slot| ChartBucketRow {
            slot_label: slot_label(query.granularity, slot),
            values: zeroed.clone(),
        })
        .collect::<Vec<_>>();

    let mut dropped = 0usize;
    for entry in entries {
        if query.kind.is_some_and(|kind| kind != entry.kind) {
            continue;
        }
        let (Some(day), Some(amount)) = (entry.day(), entry.magnitude()) else {
            continue;
        };
        let Some(slot) = slot_index(query.granularity, start, day, slots) else {
            dropped += 1;
            continue;
        };
        *rows[slot].values.entry(query.axis.key_for(entry)).or_insert(0.0) += amount;
    }

    debug!(
        granularity = %query.granularity,
        offset = query.offset,
        %start,
        slots,
        dropped,
        "aggregated chart buckets"
    );

    Some(ChartSeries {
        granularity: query.granularity,
        period_start: start,
        rows,
        segments,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::domain::{Entry, EntryKind};

    use super::{BucketQuery, ChartSeries, Granularity, SegmentAxis, aggregate, period_start};

    fn day(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn scenario_entries() -> Vec<Entry> {
        vec![
            Entry::new("a", "2024-01-05", 50.0, EntryKind::Outflow).with_category("A"),
            Entry::new("b", "2024-01-05", 30.0, EntryKind::Outflow).with_category("B"),
            Entry::new("c", "2024-01-20", 10.0, EntryKind::Outflow).with_category("A"),
        ]
    }

    fn chart(entries: &[Entry], query: &BucketQuery) -> ChartSeries {
        aggregate(entries, query).expect("period in range")
    }

    fn query(granularity: Granularity, offset: i32, reference: NaiveDate) -> BucketQuery {
        BucketQuery {
            granularity,
            offset,
            reference,
            kind: None,
            axis: SegmentAxis::Category,
        }
    }

    #[test]
    fn month_buckets_are_zero_filled_per_segment() {
        let series = chart(&scenario_entries(), &query(Granularity::Month, 0, day(2024, 1, 31)));
        assert_eq!(series.rows.len(), 31);
        assert_eq!(series.rows[4].value("A"), 50.0);
        assert_eq!(series.rows[4].value("B"), 30.0);
        assert_eq!(series.rows[19].value("A"), 10.0);
        assert_eq!(series.rows[19].values.get("B"), Some(&0.0));
        for (slot, row) in series.rows.iter().enumerate() {
            assert_eq!(row.values.len(), 2);
            if slot != 4 && slot != 19 {
                assert_eq!(row.total(), 0.0);
            }
        }
        let keys = series.segments.iter().map(|segment| segment.key.as_str()).collect::<Vec<_>>();
        assert_eq!(keys, vec!["A", "B"]);
    }

    #[test]
    fn slot_counts_follow_the_shifted_period() {
        let entries = scenario_entries();
        let february = chart(&entries, &query(Granularity::Month, 1, day(2024, 1, 31)));
        assert_eq!(february.period_start, day(2024, 2, 1));
        assert_eq!(february.rows.len(), 29);
        assert_eq!(february.segment_total("A"), 0.0);

        for offset in [-3, 0, 5] {
            assert_eq!(chart(&entries, &query(Granularity::Week, offset, day(2024, 1, 10))).rows.len(), 7);
            assert_eq!(chart(&entries, &query(Granularity::Year, offset, day(2024, 1, 10))).rows.len(), 12);
        }
    }

    #[test]
    fn offsets_shift_before_indexing() {
        let entries = scenario_entries();
        let week = chart(&entries, &query(Granularity::Week, -2, day(2024, 1, 17)));
        assert_eq!(week.period_start, day(2024, 1, 1));
        assert_eq!(week.rows[4].slot_label, "Fri");
        assert_eq!(week.rows[4].value("A"), 50.0);
        assert_eq!(week.segment_total("A"), 50.0);

        let year = chart(&entries, &query(Granularity::Year, -1, day(2025, 6, 1)));
        assert_eq!(year.rows[0].slot_label, "Jan");
        assert_eq!(year.rows[0].value("A"), 60.0);
        assert_eq!(year.rows[0].value("B"), 30.0);
    }

    #[test]
    fn segment_sums_match_entries_inside_the_period() {
        let mut entries = scenario_entries();
        entries.push(Entry::new("d", "2023-12-31", 99.0, EntryKind::Outflow).with_category("A"));
        entries.push(Entry::new("e", "2024-02-01", 7.0, EntryKind::Outflow).with_category("B"));
        entries.push(Entry::new("f", "2024-01-07", -12.0, EntryKind::Outflow).with_category("B"));

        let series = chart(&entries, &query(Granularity::Month, 0, day(2024, 1, 15)));
        assert_eq!(series.segment_total("A"), 60.0);
        assert_eq!(series.segment_total("B"), 42.0);
    }

    #[test]
    fn flow_filter_and_axis_select_entries() {
        let entries = vec![
            Entry::new("a", "2024-03-02", 20.0, EntryKind::Outflow).with_method("card"),
            Entry::new("b", "2024-03-02", 500.0, EntryKind::Inflow).with_method("transfer"),
            Entry::new("c", "2024-03-09", 5.0, EntryKind::Outflow),
        ];
        let mut spending = query(Granularity::Month, 0, day(2024, 3, 1));
        spending.kind = Some(EntryKind::Outflow);
        spending.axis = SegmentAxis::Method;

        let series = chart(&entries, &spending);
        assert_eq!(series.segment_total("card"), 20.0);
        assert_eq!(series.segment_total("transfer"), 0.0);
        assert_eq!(series.segment_total("unspecified"), 5.0);
        assert_eq!(series.segments.len(), 3);
    }

    #[test]
    fn period_start_handles_year_and_week_edges() {
        assert_eq!(period_start(Granularity::Week, day(2024, 1, 3), -1), Some(day(2023, 12, 25)));
        assert_eq!(period_start(Granularity::Month, day(2024, 3, 31), -1), Some(day(2024, 2, 1)));
        assert_eq!(period_start(Granularity::Year, day(2024, 3, 31), 2), Some(day(2026, 1, 1)));
    }

    #[test]
    fn out_of_range_offsets_yield_no_period() {
        let reference = day(2024, 1, 31);
        for granularity in [Granularity::Week, Granularity::Month, Granularity::Year] {
            assert_eq!(period_start(granularity, reference, i32::MAX), None);
            assert_eq!(period_start(granularity, reference, i32::MIN), None);
            assert!(aggregate(&scenario_entries(), &query(granularity, i32::MAX, reference)).is_none());
        }
        assert_eq!(period_start(Granularity::Year, reference, 300_000), None);
        assert_eq!(period_start(Granularity::Year, reference, 3), Some(day(2027, 1, 1)));
    }

    #[test]
    fn json_output_uses_camel_case_keys() {
        let series = chart(&scenario_entries(), &query(Granularity::Month, 0, day(2024, 1, 31)));
        let value = serde_json::to_value(&series).expect("encode");
        assert_eq!(value["periodStart"], "2024-01-01");
        assert!(value.get("period_start").is_none());
        assert_eq!(value["rows"][4]["slotLabel"], "5");
        assert_eq!(value["rows"][4]["A"], 50.0);
    }
}
