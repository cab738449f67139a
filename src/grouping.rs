use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, IsoWeek, NaiveDate};
use tracing::debug;

use crate::calendar::{DateFormat, day_key};
use crate::domain::{Entry, EntryKind};

/// An entry together with its position in the unsorted source array.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedEntry {
    pub index: usize,
    pub entry: Entry,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayBucket {
    pub day: NaiveDate,
    pub display_date: String,
    pub entries: Vec<IndexedEntry>,
}

impl DayBucket {
    pub fn key(&self) -> String {
        day_key(self.day)
    }

    pub fn flow(&self) -> FlowTotals {
        self.entries
            .iter()
            .fold(FlowTotals::default(), |totals, indexed| totals.with(&indexed.entry))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlowTotals {
    pub inflow: f64,
    pub outflow: f64,
}

impl FlowTotals {
    fn with(mut self, entry: &Entry) -> Self {
        if let Some(amount) = entry.magnitude() {
            match entry.kind {
                EntryKind::Inflow => self.inflow += amount,
                EntryKind::Outflow => self.outflow += amount,
            }
        }
        self
    }

    fn merge(self, other: FlowTotals) -> Self {
        Self {
            inflow: self.inflow + other.inflow,
            outflow: self.outflow + other.outflow,
        }
    }

    pub fn net(&self) -> f64 {
        self.inflow - self.outflow
    }
}

pub type WeekGroup = BTreeMap<NaiveDate, DayBucket>;
pub type MonthGroup = BTreeMap<IsoWeek, WeekGroup>;
pub type YearGroup = BTreeMap<u32, MonthGroup>;

/// Year → month → ISO week → day partition of the entry list.
///
/// Months are keyed by their calendar number so iteration is chronological;
/// labels are derived on the way out.
#[derive(Debug, Clone)]
pub struct GroupIndex {
    years: BTreeMap<i32, YearGroup>,
    days: Vec<NaiveDate>,
    entry_days: HashMap<usize, NaiveDate>,
    skipped: usize,
    format: DateFormat,
}

impl GroupIndex {
    pub fn build(entries: &[Entry], format: &DateFormat) -> Self {
        let mut years: BTreeMap<i32, YearGroup> = BTreeMap::new();
        let mut entry_days = HashMap::new();
        let mut skipped = 0usize;

        for (index, entry) in entries.iter().enumerate() {
            let Some(day) = entry.day() else {
                skipped += 1;
                continue;
            };

            let bucket = years
                .entry(day.year())
                .or_default()
                .entry(day.month())
                .or_default()
                .entry(day.iso_week())
                .or_default()
                .entry(day)
                .or_insert_with(|| DayBucket {
                    day,
                    display_date: format.format(day),
                    entries: Vec::new(),
                });
            bucket.entries.push(IndexedEntry {
                index,
                entry: entry.clone(),
            });
            entry_days.insert(index, day);
        }

        // Nested BTreeMap order is already chronological.
        let days = years
            .values()
            .flat_map(|months| months.values())
            .flat_map(|weeks| weeks.values())
            .flat_map(|week| week.keys().copied())
            .collect::<Vec<_>>();

        debug!(
            entries = entries.len(),
            skipped,
            days = days.len(),
            "rebuilt group index"
        );

        Self {
            years,
            days,
            entry_days,
            skipped,
            format: format.clone(),
        }
    }

    pub fn years(&self) -> &BTreeMap<i32, YearGroup> {
        &self.years
    }

    /// Distinct days in ascending calendar order.
    pub fn days(&self) -> &[NaiveDate] {
        &self.days
    }

    pub fn day_keys(&self) -> Vec<String> {
        self.days.iter().copied().map(day_key).collect()
    }

    pub fn earliest(&self) -> Option<NaiveDate> {
        self.days.first().copied()
    }

    pub fn latest(&self) -> Option<NaiveDate> {
        self.days.last().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn format(&self) -> &DateFormat {
        &self.format
    }

    pub fn contains_day(&self, day: NaiveDate) -> bool {
        self.days.binary_search(&day).is_ok()
    }

    pub fn position_of(&self, day: NaiveDate) -> Option<usize> {
        self.days.binary_search(&day).ok()
    }

    pub fn bucket(&self, day: NaiveDate) -> Option<&DayBucket> {
        self.years
            .get(&day.year())?
            .get(&day.month())?
            .get(&day.iso_week())?
            .get(&day)
    }

    /// Distinct `(year, month)` pairs in calendar order.
    pub fn months(&self) -> Vec<(i32, u32)> {
        self.years
            .iter()
            .flat_map(|(year, months)| months.keys().map(move |month| (*year, *month)))
            .collect()
    }

    pub fn days_in_month(&self, year: i32, month: u32) -> Vec<NaiveDate> {
        self.days
            .iter()
            .copied()
            .filter(|day| day.year() == year && day.month() == month)
            .collect()
    }

    pub fn month_flow(&self, year: i32, month: u32) -> FlowTotals {
        self.years
            .get(&year)
            .and_then(|months| months.get(&month))
            .map(|weeks| {
                weeks
                    .values()
                    .flat_map(|week| week.values())
                    .fold(FlowTotals::default(), |totals, bucket| totals.merge(bucket.flow()))
            })
            .unwrap_or_default()
    }

    /// Day of the entry at `index` in the original, unsorted array.
    pub fn day_of_entry(&self, index: usize) -> Option<NaiveDate> {
        self.entry_days.get(&index).copied()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::NaiveDate;

    use crate::calendar::DateFormat;
    use crate::domain::{Entry, EntryKind};

    use super::GroupIndex;

    fn sample_entries() -> Vec<Entry> {
        let mut undated = Entry::new("nil", "", 4.0, EntryKind::Outflow);
        undated.date = None;
        vec![
            Entry::new("a", "2024-01-05", 50.0, EntryKind::Outflow).with_category("A"),
            Entry::new("b", "2024-01-05T19:45:00", 30.0, EntryKind::Outflow).with_category("B"),
            undated,
            Entry::new("c", "2024-01-20", 10.0, EntryKind::Outflow).with_category("A"),
            Entry::new("d", "garbage", 99.0, EntryKind::Inflow),
            Entry::new("e", "2023-12-31", 200.0, EntryKind::Inflow),
            Entry::new("f", "2024-02-01", 15.0, EntryKind::Outflow),
        ]
    }

    fn day(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn same_calendar_day_shares_one_bucket() {
        let index = GroupIndex::build(&sample_entries(), &DateFormat::default());
        let bucket = index.bucket(day(2024, 1, 5)).expect("bucket");
        let ids = bucket
            .entries
            .iter()
            .map(|indexed| indexed.entry.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(bucket.entries[1].index, 1);
        assert_eq!(bucket.key(), "2024-01-05");
    }

    #[test]
    fn grouping_is_a_partition_of_valid_entries() {
        let entries = sample_entries();
        let index = GroupIndex::build(&entries, &DateFormat::default());

        let mut seen = Vec::new();
        for months in index.years().values() {
            for weeks in months.values() {
                for week in weeks.values() {
                    for bucket in week.values() {
                        seen.extend(bucket.entries.iter().map(|indexed| indexed.index));
                    }
                }
            }
        }

        let unique = seen.iter().copied().collect::<HashSet<_>>();
        assert_eq!(unique.len(), seen.len());
        let valid = entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.day().is_some())
            .map(|(index, _)| index)
            .collect::<HashSet<_>>();
        assert_eq!(unique, valid);
        assert_eq!(index.skipped(), 2);
        assert_eq!(index.day_of_entry(2), None);
        assert_eq!(index.day_of_entry(4), None);
    }

    #[test]
    fn day_list_is_strictly_increasing() {
        let index = GroupIndex::build(&sample_entries(), &DateFormat::default());
        let keys = index.day_keys();
        assert_eq!(
            keys,
            vec!["2023-12-31", "2024-01-05", "2024-01-20", "2024-02-01"]
        );
        assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(index.earliest(), Some(day(2023, 12, 31)));
        assert_eq!(index.latest(), Some(day(2024, 2, 1)));
    }

    #[test]
    fn months_follow_calendar_order_not_names() {
        let entries = vec![
            Entry::new("x", "2024-04-02", 1.0, EntryKind::Outflow),
            Entry::new("y", "2024-08-02", 1.0, EntryKind::Outflow),
            Entry::new("z", "2024-02-02", 1.0, EntryKind::Outflow),
        ];
        let index = GroupIndex::build(&entries, &DateFormat::default());
        assert_eq!(index.months(), vec![(2024, 2), (2024, 4), (2024, 8)]);
    }

    #[test]
    fn month_flow_sums_magnitudes_by_kind() {
        let mut entries = sample_entries();
        entries.push(Entry::new("g", "2024-01-21", -5.0, EntryKind::Inflow));
        let index = GroupIndex::build(&entries, &DateFormat::default());
        let flow = index.month_flow(2024, 1);
        assert_eq!(flow.outflow, 90.0);
        assert_eq!(flow.inflow, 5.0);
        assert_eq!(flow.net(), -85.0);
        assert_eq!(index.month_flow(2022, 1).outflow, 0.0);
    }

    #[test]
    fn display_dates_use_the_configured_format() {
        let index = GroupIndex::build(&sample_entries(), &DateFormat::new("%d %b %Y"));
        let bucket = index.bucket(day(2024, 1, 20)).expect("bucket");
        assert_eq!(bucket.display_date, "20 Jan 2024");
    }
}
