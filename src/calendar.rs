use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::{Datelike, Duration, Months, NaiveDate};
use tracing::warn;

pub const MONTH_LABELS: [&str; 12] = [
	"January",
	"February",
	"March",
	"April",
	"May",
	"June",
	"July",
	"August",
	"September",
	"October",
	"November",
	"December",
];

pub const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

const FALLBACK_DATE_FORMAT: &str = "%Y-%m-%d";

/// Display format for day captions and the header date.
///
/// The header date is reparsed through the same format, so only formats that
/// render a day and read it back unchanged are accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat {
	spec: String,
}

impl DateFormat {
	pub fn new(spec: &str) -> Self {
		if !round_trips(spec) {
			warn!(format = spec, fallback = FALLBACK_DATE_FORMAT, "invalid display date format");
			return Self::default();
		}

		Self { spec: spec.to_string() }
	}

	pub fn spec(&self) -> &str {
		&self.spec
	}

	pub fn format(&self, day: NaiveDate) -> String {
		day.format(&self.spec).to_string()
	}

	pub fn parse(&self, raw: &str) -> Option<NaiveDate> {
		NaiveDate::parse_from_str(raw.trim(), &self.spec).ok()
	}
}

/// Date-only formats that survive format then parse. Time fields fail to render
/// for a bare date and `fmt::Error` is reported rather than panicking.
fn round_trips(spec: &str) -> bool {
	if spec.trim().is_empty() || StrftimeItems::new(spec).any(|item| matches!(item, Item::Error)) {
		return false;
	}
	let Some(sample) = NaiveDate::from_ymd_opt(2024, 11, 27) else {
		return false;
	};

	let mut rendered = String::new();
	if write!(rendered, "{}", sample.format(spec)).is_err() {
		return false;
	}
	NaiveDate::parse_from_str(rendered.trim(), spec).ok() == Some(sample)
}

impl Default for DateFormat {
	fn default() -> Self {
		Self {
			spec: FALLBACK_DATE_FORMAT.to_string(),
		}
	}
}

pub fn month_label(month: u32) -> &'static str {
	MONTH_LABELS
		.get(month.saturating_sub(1) as usize)
		.copied()
		.unwrap_or("Unknown")
}

/// Accepts full names, three-letter abbreviations (any case) or `1..=12`.
pub fn parse_month_label(label: &str) -> Option<u32> {
	let label = label.trim();
	if let Ok(number) = label.parse::<u32>() {
		return (1..=12).contains(&number).then_some(number);
	}

	let lowered = label.to_ascii_lowercase();
	if lowered.len() < 3 {
		return None;
	}
	MONTH_LABELS
		.iter()
		.position(|name| {
			let name = name.to_ascii_lowercase();
			name == lowered || (lowered.len() == 3 && name.starts_with(&lowered))
		})
		.map(|position| position as u32 + 1)
}

pub fn iso_week_label(day: NaiveDate) -> String {
	let week = day.iso_week();
	format!("{}-W{:02}", week.year(), week.week())
}

pub fn day_key(day: NaiveDate) -> String {
	day.format("%Y-%m-%d").to_string()
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
	let first_of_next = if month == 12 {
		NaiveDate::from_ymd_opt(year + 1, 1, 1)
	} else {
		NaiveDate::from_ymd_opt(year, month + 1, 1)
	};
	first_of_next
		.map(|first| (first - Duration::days(1)).day())
		.unwrap_or(31)
}

pub fn first_day_of_month(day: NaiveDate) -> NaiveDate {
	day.with_day(1).unwrap_or(day)
}

pub fn start_of_week(day: NaiveDate) -> NaiveDate {
	let days_from_monday = day.weekday().num_days_from_monday() as i64;
	day - Duration::days(days_from_monday)
}

/// Shifts by whole months, clamping the day to the target month's length.
/// `None` when the result leaves chrono's date range.
pub fn shift_month(day: NaiveDate, delta: i32) -> Option<NaiveDate> {
	let months = Months::new(delta.unsigned_abs());
	if delta >= 0 {
		day.checked_add_months(months)
	} else {
		day.checked_sub_months(months)
	}
}

#[cfg(test)]
mod tests {
	use chrono::NaiveDate;

	use super::{
		DateFormat, days_in_month, iso_week_label, month_label, parse_month_label, shift_month, start_of_week,
	};

	fn day(year: i32, month: u32, day: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(year, month, day).unwrap()
	}

	#[test]
	fn month_labels_parse_in_calendar_order() {
		assert_eq!(parse_month_label("January"), Some(1));
		assert_eq!(parse_month_label("sep"), Some(9));
		assert_eq!(parse_month_label("DECEMBER"), Some(12));
		assert_eq!(parse_month_label("12"), Some(12));
		assert_eq!(parse_month_label("13"), None);
		assert_eq!(parse_month_label("Ju"), None);
		assert_eq!(month_label(4), "April");
	}

	#[test]
	fn iso_weeks_can_belong_to_the_next_year() {
		assert_eq!(iso_week_label(day(2024, 12, 30)), "2025-W01");
		assert_eq!(iso_week_label(day(2024, 1, 5)), "2024-W01");
	}

	#[test]
	fn month_arithmetic_clamps_and_wraps() {
		assert_eq!(days_in_month(2024, 2), 29);
		assert_eq!(days_in_month(2023, 12), 31);
		assert_eq!(shift_month(day(2024, 1, 31), 1), Some(day(2024, 2, 29)));
		assert_eq!(shift_month(day(2024, 1, 15), -1), Some(day(2023, 12, 15)));
		assert_eq!(shift_month(day(2024, 1, 15), -13), Some(day(2022, 12, 15)));
		assert_eq!(shift_month(day(2024, 11, 15), 14), Some(day(2026, 1, 15)));
		assert_eq!(shift_month(day(2024, 1, 1), i32::MAX), None);
		assert_eq!(shift_month(day(2024, 1, 1), i32::MIN), None);
	}

	#[test]
	fn weeks_start_on_monday() {
		assert_eq!(start_of_week(day(2024, 1, 7)), day(2024, 1, 1));
		assert_eq!(start_of_week(day(2024, 1, 1)), day(2024, 1, 1));
	}

	#[test]
	fn display_format_round_trips_and_rejects_garbage() {
		let format = DateFormat::new("%d %b %Y");
		assert_eq!(format.format(day(2024, 1, 5)), "05 Jan 2024");
		assert_eq!(format.parse("05 Jan 2024"), Some(day(2024, 1, 5)));

		let fallback = DateFormat::new("%Q");
		assert_eq!(fallback.spec(), "%Y-%m-%d");
	}

	#[test]
	fn time_fields_fall_back_instead_of_failing_to_render() {
		let format = DateFormat::new("%d %b %Y %H:%M");
		assert_eq!(format.spec(), "%Y-%m-%d");
		assert_eq!(format.format(day(2024, 1, 5)), "2024-01-05");
	}

	#[test]
	fn formats_that_cannot_be_read_back_fall_back() {
		let month_only = DateFormat::new("%B %Y");
		assert_eq!(month_only.spec(), "%Y-%m-%d");
		assert_eq!(month_only.parse(&month_only.format(day(2024, 1, 5))), Some(day(2024, 1, 5)));

		let weekday = DateFormat::new("%a %d %b %Y");
		assert_eq!(weekday.spec(), "%a %d %b %Y");
		assert_eq!(weekday.parse(&weekday.format(day(2024, 1, 5))), Some(day(2024, 1, 5)));
	}
}
