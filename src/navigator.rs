use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::debug;

use crate::calendar::{DateFormat, iso_week_label, month_label, parse_month_label};
use crate::domain::{Direction, SortOrder};
use crate::grouping::GroupIndex;
use crate::viewport::{ScrollBehavior, ScrollRequest, ScrollTarget};

/// Display state of the sticky header. Derived, never authoritative: it can
/// always be rebuilt from the index and a day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeaderState {
    pub year: Option<i32>,
    pub month: Option<String>,
    pub week: Option<String>,
    pub date: Option<String>,
}

impl HeaderState {
    pub fn for_day(day: NaiveDate, format: &DateFormat) -> Self {
        Self {
            year: Some(day.year()),
            month: Some(month_label(day.month()).to_string()),
            week: Some(iso_week_label(day)),
            date: Some(format.format(day)),
        }
    }

    pub fn is_unset(&self) -> bool {
        self.year.is_none() && self.month.is_none() && self.week.is_none() && self.date.is_none()
    }
}

/// Owns the header position and step/jump navigation over a [`GroupIndex`].
///
/// The index is passed into every call rather than held, so a rebuilt index is
/// picked up without re-wiring the navigator.
#[derive(Debug, Clone)]
pub struct SortedNavigator {
    header: HeaderState,
    sort_order: SortOrder,
    pending_scroll: Option<ScrollRequest>,
}

impl SortedNavigator {
    pub fn new(sort_order: SortOrder) -> Self {
        Self {
            header: HeaderState::default(),
            sort_order,
            pending_scroll: None,
        }
    }

    pub fn header(&self) -> &HeaderState {
        &self.header
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    /// Only flips the flag. Resetting the header is the viewport's job.
    pub fn set_sort_order(&mut self, sort_order: SortOrder) {
        self.sort_order = sort_order;
    }

    /// Scroll the last header change asked for, if any. Consumed once.
    pub fn take_scroll_request(&mut self) -> Option<ScrollRequest> {
        self.pending_scroll.take()
    }

    /// Days in the order sections are laid out on screen.
    pub fn visual_days(&self, index: &GroupIndex) -> Vec<NaiveDate> {
        match self.sort_order {
            SortOrder::Ascending => index.days().to_vec(),
            SortOrder::Descending => index.days().iter().rev().copied().collect(),
        }
    }

    /// The day shown first under the current sort order.
    pub fn first_day(&self, index: &GroupIndex) -> Option<NaiveDate> {
        match self.sort_order {
            SortOrder::Ascending => index.earliest(),
            SortOrder::Descending => index.latest(),
        }
    }

    /// Header date reparsed to a calendar day, if it names a day in the index.
    pub fn current_day(&self, index: &GroupIndex) -> Option<NaiveDate> {
        let raw = self.header.date.as_deref()?;
        let day = index.format().parse(raw)?;
        index.contains_day(day).then_some(day)
    }

    fn current_month(&self) -> Option<(i32, u32)> {
        let year = self.header.year?;
        let month = parse_month_label(self.header.month.as_deref()?)?;
        Some((year, month))
    }

    pub fn step_day(&mut self, index: &GroupIndex, direction: Direction) -> bool {
        let days = index.days();
        if days.is_empty() {
            debug!("step_day ignored: no days");
            return false;
        }

        let delta = direction.time_delta(self.sort_order);
        let target = match self.current_day(index).and_then(|day| index.position_of(day)) {
            Some(position) => match offset_position(position, delta, days.len()) {
                Some(target) => target,
                None => {
                    debug!(?direction, "step_day at boundary");
                    return false;
                }
            },
            None if delta > 0 => 0,
            None => days.len() - 1,
        };

        self.show_day(index, days[target], ScrollBehavior::Smooth);
        true
    }

    pub fn step_month(&mut self, index: &GroupIndex, direction: Direction) -> bool {
        let months = index.months();
        if months.is_empty() {
            debug!("step_month ignored: no months");
            return false;
        }

        let delta = direction.time_delta(self.sort_order);
        let current = self
            .current_month()
            .and_then(|current| months.iter().position(|month| *month == current));
        let target = match current {
            Some(position) => match offset_position(position, delta, months.len()) {
                Some(target) => target,
                None => {
                    debug!(?direction, "step_month at boundary");
                    return false;
                }
            },
            None if delta > 0 => 0,
            None => months.len() - 1,
        };

        let (year, month) = months[target];
        match self.first_day_in_month(index, year, month) {
            Some(day) => {
                self.show_day(index, day, ScrollBehavior::Smooth);
                true
            }
            None => false,
        }
    }

    pub fn jump_to_date(&mut self, index: &GroupIndex, day: NaiveDate) -> bool {
        if !index.contains_day(day) {
            debug!(%day, "jump_to_date ignored: no section for day");
            return false;
        }

        self.show_day(index, day, ScrollBehavior::Instant);
        true
    }

    pub fn jump_to_month(&mut self, index: &GroupIndex, year: i32, month_label: &str) -> bool {
        let Some(month) = parse_month_label(month_label) else {
            debug!(month_label, "jump_to_month ignored: unknown month");
            return false;
        };

        match self.first_day_in_month(index, year, month) {
            Some(day) => {
                self.show_day(index, day, ScrollBehavior::Instant);
                true
            }
            None => {
                debug!(year, month, "jump_to_month ignored: empty month");
                false
            }
        }
    }

    /// Fail-closed: an unknown position disables navigation.
    pub fn is_day_disabled(&self, index: &GroupIndex, direction: Direction) -> bool {
        let Some(position) = self.current_day(index).and_then(|day| index.position_of(day)) else {
            return true;
        };
        offset_position(position, direction.time_delta(self.sort_order), index.days().len()).is_none()
    }

    pub fn is_month_disabled(&self, index: &GroupIndex, direction: Direction) -> bool {
        let months = index.months();
        let Some(position) = self
            .current_month()
            .and_then(|current| months.iter().position(|month| *month == current))
        else {
            return true;
        };
        offset_position(position, direction.time_delta(self.sort_order), months.len()).is_none()
    }

    /// Header update driven by what is on screen; never requests a scroll.
    pub fn sync_to_day(&mut self, index: &GroupIndex, day: NaiveDate) -> bool {
        let next = HeaderState::for_day(day, index.format());
        if next == self.header {
            return false;
        }
        self.header = next;
        true
    }

    /// Puts the header on the first day under the current order, or clears it
    /// when the index is empty.
    pub fn reset_to_first(&mut self, index: &GroupIndex) {
        self.pending_scroll = None;
        self.header = match self.first_day(index) {
            Some(day) => HeaderState::for_day(day, index.format()),
            None => HeaderState::default(),
        };
    }

    fn first_day_in_month(&self, index: &GroupIndex, year: i32, month: u32) -> Option<NaiveDate> {
        let days = index.days_in_month(year, month);
        match self.sort_order {
            SortOrder::Ascending => days.first().copied(),
            SortOrder::Descending => days.last().copied(),
        }
    }

    fn show_day(&mut self, index: &GroupIndex, day: NaiveDate, behavior: ScrollBehavior) {
        self.header = HeaderState::for_day(day, index.format());
        self.pending_scroll = Some(ScrollRequest {
            target: ScrollTarget::Section(day),
            behavior,
        });
    }
}

fn offset_position(position: usize, delta: isize, len: usize) -> Option<usize> {
    position
        .checked_add_signed(delta)
        .filter(|target| *target < len)
}
