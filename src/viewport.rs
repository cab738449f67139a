use chrono::NaiveDate;
use tracing::debug;

use crate::domain::SortOrder;
use crate::grouping::GroupIndex;
use crate::navigator::SortedNavigator;

pub const DEFAULT_ACTIVATION_LOOKAHEAD: f64 = 100.0;
pub const DEFAULT_ACTIVATION_TRAILING: f64 = 50.0;
pub const DEFAULT_BOTTOM_FALLBACK_DISTANCE: f64 = 50.0;
pub const DEFAULT_AFFORDANCE_THRESHOLD: f64 = 800.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Smooth,
    Instant,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollTarget {
    Section(NaiveDate),
    Offset(f64),
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollRequest {
    pub target: ScrollTarget,
    pub behavior: ScrollBehavior,
}

/// Vertical extent of a day section in content coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionRect {
    pub top: f64,
    pub bottom: f64,
}

/// Layout surface the sync engine measures and moves.
///
/// Sections that are not mounted yet report `None`.
pub trait ViewportQuery {
    fn scroll_top(&self) -> f64;
    fn viewport_height(&self) -> f64;
    fn content_height(&self) -> f64;
    fn section_rect(&self, day: NaiveDate) -> Option<SectionRect>;
    fn scroll_to(&mut self, offset: f64, behavior: ScrollBehavior);

    fn remaining_below(&self) -> f64 {
        (self.content_height() - self.scroll_top() - self.viewport_height()).max(0.0)
    }

    fn max_scroll_top(&self) -> f64 {
        (self.content_height() - self.viewport_height()).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSettings {
    pub activation_lookahead: f64,
    pub activation_trailing: f64,
    pub bottom_fallback_distance: f64,
    pub affordance_threshold: f64,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            activation_lookahead: DEFAULT_ACTIVATION_LOOKAHEAD,
            activation_trailing: DEFAULT_ACTIVATION_TRAILING,
            bottom_fallback_distance: DEFAULT_BOTTOM_FALLBACK_DISTANCE,
            affordance_threshold: DEFAULT_AFFORDANCE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollAffordances {
    pub to_top: bool,
    pub to_bottom: bool,
}

/// Keeps the navigator header consistent with what is on screen and carries
/// scroll requests across one render tick before measuring geometry.
#[derive(Debug, Clone)]
pub struct ViewportSync {
    settings: ViewportSettings,
    pending: Option<ScrollRequest>,
}

impl ViewportSync {
    pub fn new(settings: ViewportSettings) -> Self {
        Self {
            settings,
            pending: None,
        }
    }

    pub fn settings(&self) -> &ViewportSettings {
        &self.settings
    }

    pub fn pending(&self) -> Option<&ScrollRequest> {
        self.pending.as_ref()
    }

    /// Queues a scroll for the next tick. A newer request supersedes an older one.
    pub fn schedule(&mut self, request: ScrollRequest) {
        if let Some(previous) = self.pending.replace(request) {
            debug!(?previous, "superseded pending scroll");
        }
    }

    /// Moves any scroll the navigator asked for into the deferred queue.
    pub fn collect(&mut self, navigator: &mut SortedNavigator) {
        if let Some(request) = navigator.take_scroll_request() {
            self.schedule(request);
        }
    }

    /// Runs after the list has re-rendered. Returns whether a scroll was issued.
    pub fn on_tick(&mut self, query: &mut dyn ViewportQuery) -> bool {
        let Some(request) = self.pending.take() else {
            return false;
        };

        let offset = match request.target {
            ScrollTarget::Section(day) => match query.section_rect(day) {
                Some(rect) => rect.top,
                None => {
                    debug!(%day, "scroll target not mounted");
                    return false;
                }
            },
            ScrollTarget::Offset(offset) => offset,
            ScrollTarget::Top => 0.0,
            ScrollTarget::Bottom => query.max_scroll_top(),
        };

        let max = query.max_scroll_top();
        query.scroll_to(offset.clamp(0.0, max), request.behavior);
        true
    }

    /// Picks the section that owns the activation band and syncs the header to it.
    pub fn on_scroll(
        &self,
        navigator: &mut SortedNavigator,
        index: &GroupIndex,
        query: &dyn ViewportQuery,
    ) -> bool {
        match self.active_section(navigator, index, query) {
            Some(day) => navigator.sync_to_day(index, day),
            None => false,
        }
    }

    pub fn active_section(
        &self,
        navigator: &SortedNavigator,
        index: &GroupIndex,
        query: &dyn ViewportQuery,
    ) -> Option<NaiveDate> {
        let top = query.scroll_top();
        let band_end = top + self.settings.activation_lookahead;
        let trailing_edge = top + self.settings.activation_trailing;

        let mounted = navigator
            .visual_days(index)
            .into_iter()
            .filter_map(|day| query.section_rect(day).map(|rect| (day, rect)))
            .collect::<Vec<_>>();

        let in_band = mounted
            .iter()
            .find(|(_, rect)| rect.top >= top && rect.top <= band_end && rect.bottom > trailing_edge)
            .map(|(day, _)| *day);
        if in_band.is_some() {
            return in_band;
        }

        // Short trailing sections never reach the band.
        if query.remaining_below() < self.settings.bottom_fallback_distance {
            return mounted.last().map(|(day, _)| *day);
        }

        None
    }

    pub fn affordances(&self, query: &dyn ViewportQuery) -> ScrollAffordances {
        ScrollAffordances {
            to_top: query.scroll_top() > self.settings.affordance_threshold,
            to_bottom: query.remaining_below() > self.settings.affordance_threshold,
        }
    }

    pub fn mount(&mut self, navigator: &mut SortedNavigator, index: &GroupIndex) {
        self.reset(navigator, index);
    }

    pub fn replace_entries(&mut self, navigator: &mut SortedNavigator, index: &GroupIndex) {
        self.reset(navigator, index);
    }

    pub fn change_sort_order(
        &mut self,
        navigator: &mut SortedNavigator,
        index: &GroupIndex,
        sort_order: SortOrder,
    ) {
        navigator.set_sort_order(sort_order);
        self.reset(navigator, index);
    }

    /// The first day under the current order is always laid out at the top.
    fn reset(&mut self, navigator: &mut SortedNavigator, index: &GroupIndex) {
        navigator.reset_to_first(index);
        self.schedule(ScrollRequest {
            target: ScrollTarget::Top,
            behavior: ScrollBehavior::Instant,
        });
    }
}
