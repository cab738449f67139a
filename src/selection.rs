use tracing::debug;

use crate::grouping::GroupIndex;
use crate::viewport::{ScrollBehavior, ScrollRequest, ScrollTarget};

pub const DEFAULT_SUPPRESS_MS: u64 = 250;
const RESTORE_BURST_TICKS: u8 = 3;

/// Drops non-finite, negative and fractional values and de-duplicates while
/// keeping first-seen order. Idempotent.
pub fn normalize_selection(raw: &[f64]) -> Vec<usize> {
    let mut normalized: Vec<usize> = Vec::with_capacity(raw.len());
    for value in raw {
        if !value.is_finite() || *value < 0.0 || value.fract() != 0.0 || *value > usize::MAX as f64 {
            continue;
        }
        let index = *value as usize;
        if !normalized.contains(&index) {
            normalized.push(index);
        }
    }
    normalized
}

/// One-shot record of a manual click, threaded through a single [`SelectionTracker::update`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickIntent {
    pub preserve_scroll: bool,
    pub focus_index: Option<usize>,
    pub scroll_offset: f64,
}

impl ClickIntent {
    /// Intent for toggling `clicked` against the selection as it was before the click.
    /// Deselecting keeps the viewport where it is.
    pub fn toggle(selection_before: &[usize], clicked: usize, scroll_offset: f64) -> Self {
        Self {
            preserve_scroll: selection_before.contains(&clicked),
            focus_index: Some(clicked),
            scroll_offset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionEffect {
    None,
    ScrollTo { entry_index: usize, behavior: ScrollBehavior },
    RestoreScroll { offset: f64 },
}

impl SelectionEffect {
    pub fn scroll_request(&self, index: &GroupIndex) -> Option<ScrollRequest> {
        match *self {
            SelectionEffect::None => None,
            SelectionEffect::ScrollTo { entry_index, behavior } => {
                index.day_of_entry(entry_index).map(|day| ScrollRequest {
                    target: ScrollTarget::Section(day),
                    behavior,
                })
            }
            SelectionEffect::RestoreScroll { offset } => Some(ScrollRequest {
                target: ScrollTarget::Offset(offset),
                behavior: ScrollBehavior::Instant,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ScrollRestore {
    offset: f64,
    ticks_left: u8,
}

/// Pointer and traversal over an externally owned selection set.
///
/// Time is passed in as milliseconds so the suppression window is testable.
#[derive(Debug, Clone)]
pub struct SelectionTracker {
    sequence: Vec<usize>,
    pointer: usize,
    suppress_ms: u64,
    suppressed_until: Option<u64>,
    restore: Option<ScrollRestore>,
}

impl SelectionTracker {
    pub fn new(suppress_ms: u64) -> Self {
        Self {
            sequence: Vec::new(),
            pointer: 0,
            suppress_ms,
            suppressed_until: None,
            restore: None,
        }
    }

    pub fn sequence(&self) -> &[usize] {
        &self.sequence
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn current(&self) -> Option<usize> {
        self.sequence.get(self.pointer).copied()
    }

    /// "X of N", shown only while traversal makes sense.
    pub fn label(&self) -> Option<String> {
        (self.sequence.len() > 1).then(|| format!("{} of {}", self.pointer + 1, self.sequence.len()))
    }

    pub fn has_prev(&self) -> bool {
        self.pointer > 0
    }

    pub fn has_next(&self) -> bool {
        self.pointer + 1 < self.sequence.len()
    }

    pub fn suppress_auto_scroll(&mut self, now_ms: u64) {
        self.suppressed_until = Some(now_ms + self.suppress_ms);
    }

    pub fn is_suppressed(&self, now_ms: u64) -> bool {
        self.suppressed_until.is_some_and(|until| now_ms < until)
    }

    /// Reconciles the pointer with a new selection set.
    pub fn update(&mut self, raw: &[f64], intent: Option<ClickIntent>, now_ms: u64) -> SelectionEffect {
        let previous_len = self.sequence.len();
        let previous_current = self.current();
        self.sequence = normalize_selection(raw);

        if intent.is_some() {
            self.suppress_auto_scroll(now_ms);
            self.restore = None;
        }

        if self.sequence.is_empty() {
            self.pointer = 0;
            return match intent {
                Some(intent) if intent.preserve_scroll => self.begin_restore(intent.scroll_offset),
                _ => SelectionEffect::None,
            };
        }

        if previous_len == 0 {
            self.pointer = 0;
            return self.scroll_to_current(ScrollBehavior::Instant);
        }

        let grew = self.sequence.len() > previous_len;
        match intent {
            Some(intent) if intent.preserve_scroll => {
                self.reposition(previous_current);
                self.begin_restore(intent.scroll_offset)
            }
            Some(intent) if grew => {
                self.pointer = intent
                    .focus_index
                    .and_then(|focus| self.sequence.iter().position(|index| *index == focus))
                    .unwrap_or(self.sequence.len() - 1);
                self.scroll_to_current(ScrollBehavior::Smooth)
            }
            Some(_) => {
                self.reposition(previous_current);
                SelectionEffect::None
            }
            None if grew => {
                self.pointer = self.sequence.len() - 1;
                if self.is_suppressed(now_ms) {
                    debug!(pointer = self.pointer, "auto-scroll suppressed");
                    SelectionEffect::None
                } else {
                    self.scroll_to_current(ScrollBehavior::Smooth)
                }
            }
            None => {
                self.reposition(previous_current);
                SelectionEffect::None
            }
        }
    }

    pub fn prev(&mut self, now_ms: u64) -> SelectionEffect {
        if !self.has_prev() {
            return SelectionEffect::None;
        }
        self.pointer -= 1;
        self.suppress_auto_scroll(now_ms);
        self.scroll_to_current(ScrollBehavior::Smooth)
    }

    pub fn next(&mut self, now_ms: u64) -> SelectionEffect {
        if !self.has_next() {
            return SelectionEffect::None;
        }
        self.pointer += 1;
        self.suppress_auto_scroll(now_ms);
        self.scroll_to_current(ScrollBehavior::Smooth)
    }

    /// Advances timers. Re-asserts a preserved scroll position for a few ticks
    /// because other observers may also try to move it.
    pub fn tick(&mut self, now_ms: u64) -> SelectionEffect {
        if self.suppressed_until.is_some_and(|until| now_ms >= until) {
            self.suppressed_until = None;
        }

        match self.restore.as_mut() {
            Some(restore) if restore.ticks_left > 0 => {
                restore.ticks_left -= 1;
                let offset = restore.offset;
                if restore.ticks_left == 0 {
                    self.restore = None;
                }
                SelectionEffect::RestoreScroll { offset }
            }
            _ => {
                self.restore = None;
                SelectionEffect::None
            }
        }
    }

    pub fn teardown(&mut self) {
        self.suppressed_until = None;
        self.restore = None;
    }

    fn begin_restore(&mut self, offset: f64) -> SelectionEffect {
        self.restore = Some(ScrollRestore {
            offset,
            ticks_left: RESTORE_BURST_TICKS,
        });
        SelectionEffect::RestoreScroll { offset }
    }

    fn reposition(&mut self, previous_current: Option<usize>) {
        let kept = previous_current.and_then(|current| self.sequence.iter().position(|index| *index == current));
        self.pointer = kept.unwrap_or_else(|| self.pointer.min(self.sequence.len().saturating_sub(1)));
    }

    fn scroll_to_current(&self, behavior: ScrollBehavior) -> SelectionEffect {
        match self.current() {
            Some(entry_index) => SelectionEffect::ScrollTo { entry_index, behavior },
            None => SelectionEffect::None,
        }
    }
}
