use std::collections::HashMap;
use std::error::Error;
use std::io;
use std::path::PathBuf;
use std::time::{Duration as StdDuration, Instant};

use chrono::{Datelike, Local, NaiveDate};
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, ExecutableCommand};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction as LayoutDirection, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{BarChart, Block, Borders, List, ListItem, Paragraph};
use ratatui::{Frame, Terminal};
use tracing::{info, warn};

use crate::buckets::{BucketQuery, ChartSeries, Granularity, aggregate, period_start};
use crate::calendar::{DateFormat, month_label, parse_month_label};
use crate::config::Config;
use crate::domain::{Direction, Entry, EntryKind, format_amount};
use crate::grouping::GroupIndex;
use crate::navigator::SortedNavigator;
use crate::selection::{ClickIntent, SelectionEffect, SelectionTracker};
use crate::storage::load_entries;
use crate::view_state::{KeyValueStore, ViewPreferences, ViewTab, save_preferences};
use crate::viewport::{
	ScrollAffordances, ScrollBehavior, ScrollRequest, ScrollTarget, SectionRect, ViewportQuery, ViewportSync,
};

/// Layout units per terminal row, so band offsets read the same as on a pixel canvas.
const LINE_UNITS: f64 = 20.0;
const TICK: StdDuration = StdDuration::from_millis(50);
const HEADER_ROWS: u16 = 4;
const FOOTER_ROWS: u16 = 4;

const FOCUSED_PANEL_BORDER_COLOR: Color = Color::Yellow;
const HIGHLIGHT_BACKGROUND_COLOR: Color = Color::Rgb(42, 45, 52);

pub struct ViewSession {
	pub entries_path: PathBuf,
	pub entries: Vec<Entry>,
	pub config: Config,
	pub store: Box<dyn KeyValueStore>,
	pub view_key: String,
	pub preferences: ViewPreferences,
	pub start_day: Option<NaiveDate>,
}

pub fn run_ledger_view(session: ViewSession) -> Result<(), Box<dyn Error>> {
	enable_raw_mode()?;
	let mut stdout = io::stdout();
	stdout.execute(EnterAlternateScreen)?;
	let backend = CrosstermBackend::new(stdout);
	let mut terminal = Terminal::new(backend)?;

	let mut app = App::new(session);
	let result = run_event_loop(&mut terminal, &mut app);
	app.teardown();

	disable_raw_mode()?;
	execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
	terminal.show_cursor()?;

	result
}

fn run_event_loop(
	terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
	app: &mut App,
) -> Result<(), Box<dyn Error>> {
	loop {
		let size = terminal.size()?;
		app.prepare_frame(size.height.saturating_sub(HEADER_ROWS + FOOTER_ROWS + 2));
		terminal.draw(|frame| draw(frame, app))?;

		if event::poll(TICK)? {
			if let CEvent::Key(key) = event::read()? {
				if key.kind != KeyEventKind::Press {
					continue;
				}

				let should_quit = match app.preferences.tab {
					ViewTab::Ledger => handle_ledger_key(app, key.code),
					ViewTab::Chart => handle_chart_key(app, key.code),
				};
				if should_quit {
					break;
				}
			}
		}
	}

	Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LayoutLine {
	Month { year: i32, month: u32 },
	Day(NaiveDate),
	Entry { index: usize },
	Blank,
}

#[derive(Debug, Clone, Default)]
struct LedgerLayout {
	lines: Vec<LayoutLine>,
	sections: HashMap<NaiveDate, (usize, usize)>,
}

/// Day sections in visual order, each preceded by a month caption when the month changes.
fn build_layout(index: &GroupIndex, navigator: &SortedNavigator) -> LedgerLayout {
	let mut layout = LedgerLayout::default();
	let mut current_month = None;

	for day in navigator.visual_days(index) {
		let Some(bucket) = index.bucket(day) else {
			continue;
		};

		let month = (day.year(), day.month());
		if current_month != Some(month) {
			layout.lines.push(LayoutLine::Month {
				year: month.0,
				month: month.1,
			});
			current_month = Some(month);
		}

		let start = layout.lines.len();
		layout.lines.push(LayoutLine::Day(day));
		for indexed in &bucket.entries {
			layout.lines.push(LayoutLine::Entry { index: indexed.index });
		}
		layout.lines.push(LayoutLine::Blank);
		layout.sections.insert(day, (start, layout.lines.len()));
	}

	layout
}

/// Terminal rows exposed through [`ViewportQuery`]. Smooth scrolls animate
/// over a few ticks; instant scrolls land immediately.
#[derive(Debug, Clone, Default)]
struct TerminalViewport {
	layout: LedgerLayout,
	scroll_units: f64,
	height_rows: u16,
	animation_target: Option<f64>,
}

impl TerminalViewport {
	fn top_row(&self) -> usize {
		(self.scroll_units / LINE_UNITS).round() as usize
	}

	fn set_layout(&mut self, layout: LedgerLayout) {
		self.layout = layout;
		self.clamp();
	}

	fn set_height(&mut self, rows: u16) {
		self.height_rows = rows;
		self.clamp();
	}

	fn scroll_by_rows(&mut self, delta: i64) {
		self.animation_target = None;
		self.scroll_units += delta as f64 * LINE_UNITS;
		self.clamp();
	}

	fn advance_animation(&mut self) -> bool {
		let Some(target) = self.animation_target else {
			return false;
		};

		let remaining = target - self.scroll_units;
		if remaining.abs() <= LINE_UNITS {
			self.scroll_units = target;
			self.animation_target = None;
		} else {
			let step = (remaining / 2.0).abs().max(LINE_UNITS);
			self.scroll_units += step.copysign(remaining);
		}
		self.clamp();
		true
	}

	fn clamp(&mut self) {
		self.scroll_units = self.scroll_units.clamp(0.0, self.max_scroll_top());
	}

	fn visible_lines(&self) -> &[LayoutLine] {
		let start = self.top_row().min(self.layout.lines.len());
		let end = (start + self.height_rows as usize).min(self.layout.lines.len());
		&self.layout.lines[start..end]
	}

	/// First entry row at or below the top of the viewport.
	fn focus_entry(&self) -> Option<usize> {
		self.visible_lines().iter().find_map(|line| match line {
			LayoutLine::Entry { index } => Some(*index),
			_ => None,
		})
	}
}

impl ViewportQuery for TerminalViewport {
	fn scroll_top(&self) -> f64 {
		self.scroll_units
	}

	fn viewport_height(&self) -> f64 {
		self.height_rows as f64 * LINE_UNITS
	}

	fn content_height(&self) -> f64 {
		self.layout.lines.len() as f64 * LINE_UNITS
	}

	fn section_rect(&self, day: NaiveDate) -> Option<SectionRect> {
		self.layout.sections.get(&day).map(|(start, end)| SectionRect {
			top: *start as f64 * LINE_UNITS,
			bottom: *end as f64 * LINE_UNITS,
		})
	}

	fn scroll_to(&mut self, offset: f64, behavior: ScrollBehavior) {
		match behavior {
			ScrollBehavior::Instant => {
				self.animation_target = None;
				self.scroll_units = offset;
				self.clamp();
			}
			ScrollBehavior::Smooth => self.animation_target = Some(offset),
		}
	}
}

struct App {
	entries_path: PathBuf,
	entries: Vec<Entry>,
	format: DateFormat,
	index: GroupIndex,
	navigator: SortedNavigator,
	sync: ViewportSync,
	selection: SelectionTracker,
	selected: Vec<f64>,
	viewport: TerminalViewport,
	preferences: ViewPreferences,
	flow_filter: Option<EntryKind>,
	store: Box<dyn KeyValueStore>,
	view_key: String,
	status: String,
	started: Instant,
}

impl App {
	fn new(session: ViewSession) -> Self {
		let format = session.config.date_format();
		let index = GroupIndex::build(&session.entries, &format);
		let mut navigator = SortedNavigator::new(session.preferences.sort_order);
		let mut sync = ViewportSync::new(session.config.viewport_settings());
		sync.mount(&mut navigator, &index);

		let mut status = if index.skipped() > 0 {
			format!("Ready ({} entries without a usable date hidden)", index.skipped())
		} else {
			"Ready".to_string()
		};
		if let Some(day) = session.start_day {
			if navigator.jump_to_date(&index, day) {
				sync.collect(&mut navigator);
			} else {
				status = format!("No entries on {day}");
			}
		}

		Self {
			entries_path: session.entries_path,
			entries: session.entries,
			format,
			index,
			navigator,
			sync,
			selection: SelectionTracker::new(session.config.selection_suppress_ms),
			selected: Vec::new(),
			viewport: TerminalViewport::default(),
			preferences: session.preferences,
			flow_filter: None,
			store: session.store,
			view_key: session.view_key,
			status,
			started: Instant::now(),
		}
	}

	fn now_ms(&self) -> u64 {
		self.started.elapsed().as_millis() as u64
	}

	/// Lays the list out for this frame, then runs scrolls deferred from the previous one.
	fn prepare_frame(&mut self, body_rows: u16) {
		self.viewport.set_layout(build_layout(&self.index, &self.navigator));
		self.viewport.set_height(body_rows);

		let now = self.now_ms();
		let effect = self.selection.tick(now);
		self.apply_selection_effect(effect);

		let scrolled = self.sync.on_tick(&mut self.viewport);
		let animated = self.viewport.advance_animation();
		if scrolled || animated {
			self.sync.on_scroll(&mut self.navigator, &self.index, &self.viewport);
		}
	}

	fn after_navigation(&mut self, moved: bool, what: &str) {
		if moved {
			self.sync.collect(&mut self.navigator);
		} else {
			self.status = format!("No {what} in that direction");
		}
	}

	fn user_scroll(&mut self, rows: i64) {
		self.viewport.scroll_by_rows(rows);
		self.sync.on_scroll(&mut self.navigator, &self.index, &self.viewport);
	}

	fn jump(&mut self, target: ScrollTarget) {
		self.sync.schedule(ScrollRequest {
			target,
			behavior: ScrollBehavior::Instant,
		});
	}

	fn toggle_sort(&mut self) {
		let next = self.navigator.sort_order().toggled();
		self.sync.change_sort_order(&mut self.navigator, &self.index, next);
		self.preferences.sort_order = next;
		self.status = format!("Sorted {next}");
		self.persist_preferences();
	}

	fn toggle_focus_selection(&mut self) {
		let Some(clicked) = self.viewport.focus_entry() else {
			self.status = "No entry in view".to_string();
			return;
		};

		let intent = ClickIntent::toggle(self.selection.sequence(), clicked, self.viewport.scroll_top());
		let clicked_raw = clicked as f64;
		if intent.preserve_scroll {
			self.selected.retain(|value| *value != clicked_raw);
		} else {
			self.selected.push(clicked_raw);
		}

		let now = self.now_ms();
		let effect = self.selection.update(&self.selected, Some(intent), now);
		self.apply_selection_effect(effect);
	}

	fn clear_selection(&mut self) {
		self.selected.clear();
		let now = self.now_ms();
		let effect = self.selection.update(&self.selected, None, now);
		self.apply_selection_effect(effect);
	}

	fn apply_selection_effect(&mut self, effect: SelectionEffect) {
		if let Some(request) = effect.scroll_request(&self.index) {
			self.sync.schedule(request);
		}
	}

	fn reload_entries(&mut self) {
		match load_entries(&self.entries_path) {
			Ok(entries) => {
				self.entries = entries;
				self.index = GroupIndex::build(&self.entries, &self.format);
				self.sync.replace_entries(&mut self.navigator, &self.index);
				self.clear_selection();
				info!(count = self.entries.len(), "reloaded entries");
				self.status = format!("Reloaded {} entries", self.entries.len());
			}
			Err(err) => {
				warn!(%err, "reload failed");
				self.status = format!("error: {err}");
			}
		}
	}

	fn switch_tab(&mut self) {
		self.preferences.tab = match self.preferences.tab {
			ViewTab::Ledger => ViewTab::Chart,
			ViewTab::Chart => ViewTab::Ledger,
		};
		self.persist_preferences();
	}

	fn set_granularity(&mut self, granularity: Granularity) {
		self.preferences.granularity = granularity;
		self.persist_preferences();
	}

	fn shift_offset(&mut self, delta: i32) {
		let granularity = self.preferences.granularity;
		let current = self.preferences.offsets.get(granularity);
		let today = Local::now().date_naive();
		let next = if delta == 0 { Some(0) } else { current.checked_add(delta) }
			.filter(|next| period_start(granularity, today, *next).is_some());
		let Some(next) = next else {
			self.status = format!("No {granularity} period beyond offset {current}");
			return;
		};
		*self.preferences.offsets.get_mut(granularity) = next;
		self.persist_preferences();
	}

	fn chart(&self) -> Option<ChartSeries> {
		let granularity = self.preferences.granularity;
		aggregate(
			&self.entries,
			&BucketQuery {
				granularity,
				offset: self.preferences.offsets.get(granularity),
				reference: Local::now().date_naive(),
				kind: self.flow_filter,
				axis: self.preferences.axis,
			},
		)
	}

	fn persist_preferences(&mut self) {
		if let Err(err) = save_preferences(self.store.as_mut(), &self.view_key, &self.preferences) {
			warn!(%err, "failed to persist view preferences");
			self.status = format!("warning: view preferences not saved: {err}");
		}
	}

	fn teardown(&mut self) {
		self.selection.teardown();
	}
}

fn handle_ledger_key(app: &mut App, code: KeyCode) -> bool {
	match code {
		KeyCode::Char('q') | KeyCode::Esc => return true,
		KeyCode::Tab => app.switch_tab(),
		KeyCode::Down | KeyCode::Char('j') => app.user_scroll(1),
		KeyCode::Up | KeyCode::Char('k') => app.user_scroll(-1),
		KeyCode::PageDown => {
			let page = app.viewport.height_rows.saturating_sub(1).max(1) as i64;
			app.user_scroll(page);
		}
		KeyCode::PageUp => {
			let page = app.viewport.height_rows.saturating_sub(1).max(1) as i64;
			app.user_scroll(-page);
		}
		KeyCode::Home | KeyCode::Char('g') => app.jump(ScrollTarget::Top),
		KeyCode::End | KeyCode::Char('G') => app.jump(ScrollTarget::Bottom),
		KeyCode::Char('n') => {
			let moved = app.navigator.step_day(&app.index, Direction::Next);
			app.after_navigation(moved, "day");
		}
		KeyCode::Char('p') => {
			let moved = app.navigator.step_day(&app.index, Direction::Prev);
			app.after_navigation(moved, "day");
		}
		KeyCode::Char('N') => {
			let moved = app.navigator.step_month(&app.index, Direction::Next);
			app.after_navigation(moved, "month");
		}
		KeyCode::Char('P') => {
			let moved = app.navigator.step_month(&app.index, Direction::Prev);
			app.after_navigation(moved, "month");
		}
		KeyCode::Char('t') => {
			let today = Local::now().date_naive();
			let moved = app.navigator.jump_to_month(&app.index, today.year(), month_label(today.month()));
			app.after_navigation(moved, "entries this month");
		}
		KeyCode::Char('s') => app.toggle_sort(),
		KeyCode::Char(' ') => app.toggle_focus_selection(),
		KeyCode::Char(']') => {
			let now = app.now_ms();
			let effect = app.selection.next(now);
			app.apply_selection_effect(effect);
		}
		KeyCode::Char('[') => {
			let now = app.now_ms();
			let effect = app.selection.prev(now);
			app.apply_selection_effect(effect);
		}
		KeyCode::Char('x') => app.clear_selection(),
		KeyCode::Char('r') => app.reload_entries(),
		_ => {}
	}

	false
}

fn handle_chart_key(app: &mut App, code: KeyCode) -> bool {
	match code {
		KeyCode::Char('q') | KeyCode::Esc => return true,
		KeyCode::Tab => app.switch_tab(),
		KeyCode::Char('w') => app.set_granularity(Granularity::Week),
		KeyCode::Char('m') => app.set_granularity(Granularity::Month),
		KeyCode::Char('y') => app.set_granularity(Granularity::Year),
		KeyCode::Left | KeyCode::Char('h') => app.shift_offset(-1),
		KeyCode::Right | KeyCode::Char('l') => app.shift_offset(1),
		KeyCode::Char('0') => app.shift_offset(0),
		KeyCode::Char('a') => {
			app.preferences.axis = app.preferences.axis.toggled();
			app.persist_preferences();
		}
		KeyCode::Char('f') => {
			app.flow_filter = match app.flow_filter {
				None => Some(EntryKind::Outflow),
				Some(EntryKind::Outflow) => Some(EntryKind::Inflow),
				Some(EntryKind::Inflow) => None,
			};
		}
		KeyCode::Char('r') => app.reload_entries(),
		_ => {}
	}

	false
}

fn draw(frame: &mut Frame, app: &App) {
	let layout = Layout::default()
		.direction(LayoutDirection::Vertical)
		.constraints([
			Constraint::Length(HEADER_ROWS + 1),
			Constraint::Min(3),
			Constraint::Length(FOOTER_ROWS),
		])
		.split(frame.area());

	match app.preferences.tab {
		ViewTab::Ledger => {
			render_header(frame, layout[0], app);
			render_ledger(frame, layout[1], app);
		}
		ViewTab::Chart => {
			if let Some(series) = app.chart() {
				render_chart_header(frame, layout[0], app, &series);
				render_chart(frame, layout[1], &series);
			} else {
				let block = Block::default().borders(Borders::ALL).title("Chart");
				let message = Paragraph::new("Period out of range, press 0 to return to the current one").block(block);
				frame.render_widget(message, layout[1]);
			}
		}
	}
	render_footer(frame, layout[2], app);
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
	let header = app.navigator.header();
	let position = match (&header.year, &header.month, &header.week, &header.date) {
		_ if header.is_unset() => "(no position)".to_string(),
		(Some(year), Some(month), Some(week), Some(date)) => format!("{month} {year} | {week} | {date}"),
		_ => "(partial position)".to_string(),
	};

	let month_flow = match (header.year, header.month.as_deref().and_then(parse_month_label)) {
		(Some(year), Some(month)) => {
			let flow = app.index.month_flow(year, month);
			format!(
				"month in {} | out {} | net {}",
				format_amount(flow.inflow),
				format_amount(flow.outflow),
				format_amount(flow.net())
			)
		}
		_ => String::new(),
	};

	let hint = |label: &str, disabled: bool| {
		let style = if disabled {
			Style::default().fg(Color::DarkGray)
		} else {
			Style::default().fg(Color::LightYellow)
		};
		Span::styled(format!("{label} "), style)
	};
	let index = &app.index;
	let nav = &app.navigator;
	let hints = Line::from(vec![
		hint("[p] prev day", nav.is_day_disabled(index, Direction::Prev)),
		hint("[n] next day", nav.is_day_disabled(index, Direction::Next)),
		hint("[P] prev month", nav.is_month_disabled(index, Direction::Prev)),
		hint("[N] next month", nav.is_month_disabled(index, Direction::Next)),
		Span::raw(format!("| sort {}", nav.sort_order())),
	]);

	let lines = vec![
		Line::from(Span::styled(position, Style::default().add_modifier(Modifier::BOLD))),
		Line::from(month_flow),
		hints,
	];
	let block = Block::default()
		.borders(Borders::ALL)
		.title("Ledger")
		.border_style(Style::default().fg(FOCUSED_PANEL_BORDER_COLOR));
	frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_ledger(frame: &mut Frame, area: Rect, app: &App) {
	let current_day = app.navigator.current_day(&app.index);
	let pointed = app.selection.current();
	let focus = app.viewport.focus_entry();

	let lines = app
		.viewport
		.visible_lines()
		.iter()
		.map(|line| match line {
			LayoutLine::Month { year, month } => Line::from(Span::styled(
				format!("== {} {} ==", month_label(*month), year),
				Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
			)),
			LayoutLine::Day(day) => render_day_line(app, *day, current_day == Some(*day)),
			LayoutLine::Entry { index } => {
				render_entry_line(app, *index, pointed == Some(*index), focus == Some(*index))
			}
			LayoutLine::Blank => Line::from(""),
		})
		.collect::<Vec<_>>();

	let body = if lines.is_empty() {
		vec![Line::from("(no dated entries)")]
	} else {
		lines
	};
	frame.render_widget(
		Paragraph::new(body).block(Block::default().borders(Borders::LEFT | Borders::RIGHT)),
		area,
	);
}

fn render_day_line(app: &App, day: NaiveDate, is_current: bool) -> Line<'static> {
	let Some(bucket) = app.index.bucket(day) else {
		return Line::from("");
	};
	let flow = bucket.flow();
	let style = if is_current {
		Style::default()
			.fg(Color::Black)
			.bg(Color::Yellow)
			.add_modifier(Modifier::BOLD)
	} else {
		Style::default().add_modifier(Modifier::BOLD)
	};

	Line::from(vec![
		Span::styled(bucket.display_date.clone(), style),
		Span::styled(
			format!("  +{} / -{}", format_amount(flow.inflow), format_amount(flow.outflow)),
			Style::default().fg(Color::DarkGray),
		),
	])
}

fn render_entry_line(app: &App, index: usize, is_pointed: bool, is_focus: bool) -> Line<'static> {
	let Some(entry) = app.entries.get(index) else {
		return Line::from("");
	};

	let selected = app.selection.sequence().contains(&index);
	let marker = match (is_pointed, selected) {
		(true, _) => ">[x]",
		(false, true) => " [x]",
		(false, false) => " [ ]",
	};
	let (sign, amount_style) = match entry.kind {
		EntryKind::Inflow => ("+", Style::default().fg(Color::LightGreen)),
		EntryKind::Outflow => ("-", Style::default().fg(Color::LightRed)),
	};
	let amount = entry
		.magnitude()
		.map(|value| format!("{sign}{}", format_amount(value)))
		.unwrap_or_else(|| "   --".to_string());

	let mut spans = vec![
		Span::raw(format!("{marker} ")),
		Span::styled(format!("{amount:>10}"), amount_style),
		Span::raw(format!(
			"  {} | {}",
			entry.category.as_deref().unwrap_or("uncategorized"),
			entry.method.as_deref().unwrap_or("-")
		)),
	];
	if let Some(note) = &entry.note {
		spans.push(Span::styled(format!(" | {note}"), Style::default().fg(Color::Gray)));
	}

	let line = Line::from(spans);
	if is_focus {
		line.style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR))
	} else {
		line
	}
}

fn render_chart_header(frame: &mut Frame, area: Rect, app: &App, series: &ChartSeries) {
	let filter = match app.flow_filter {
		None => "all flows".to_string(),
		Some(kind) => format!("{kind} only"),
	};
	let lines = vec![
		Line::from(Span::styled(series.period_label(), Style::default().add_modifier(Modifier::BOLD))),
		Line::from(format!(
			"{} view | offset {} | by {} | {}",
			series.granularity,
			app.preferences.offsets.get(series.granularity),
			app.preferences.axis,
			filter
		)),
		Line::from(Span::styled(
			"[w/m/y] granularity  [h/l] period  [0] current  [a] axis  [f] flow filter",
			Style::default().fg(Color::LightYellow),
		)),
	];
	let block = Block::default()
		.borders(Borders::ALL)
		.title("Chart")
		.border_style(Style::default().fg(FOCUSED_PANEL_BORDER_COLOR));
	frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_chart(frame: &mut Frame, area: Rect, series: &ChartSeries) {
	let columns = Layout::default()
		.direction(LayoutDirection::Horizontal)
		.constraints([Constraint::Percentage(72), Constraint::Percentage(28)])
		.split(area);

	let data = series
		.rows
		.iter()
		.map(|row| (row.slot_label.as_str(), row.total().round().max(0.0) as u64))
		.collect::<Vec<_>>();
	let bar_width = ((columns[0].width.saturating_sub(2)) / (data.len().max(1) as u16))
		.saturating_sub(1)
		.clamp(1, 9);
	let chart = BarChart::default()
		.block(Block::default().borders(Borders::ALL).title("Totals per slot"))
		.data(data.as_slice())
		.bar_width(bar_width)
		.bar_gap(1)
		.bar_style(Style::default().fg(Color::Yellow))
		.value_style(Style::default().fg(Color::Black).bg(Color::Yellow));
	frame.render_widget(chart, columns[0]);

	let legend = series
		.segments
		.iter()
		.map(|segment| {
			let style = color_from_name(segment.color)
				.map(|color| Style::default().fg(color))
				.unwrap_or_default();
			ListItem::new(Line::from(vec![
				Span::styled("██ ", style),
				Span::raw(format!("{} {}", segment.label, format_amount(series.segment_total(&segment.key)))),
			]))
		})
		.collect::<Vec<_>>();
	let legend = if legend.is_empty() {
		vec![ListItem::new("(no segments)")]
	} else {
		legend
	};
	frame.render_widget(
		List::new(legend).block(Block::default().borders(Borders::ALL).title("Segments")),
		columns[1],
	);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
	let ScrollAffordances { to_top, to_bottom } = app.sync.affordances(&app.viewport);
	let mut affordances = Vec::new();
	if to_top {
		affordances.push("[g] back to top");
	}
	if to_bottom {
		affordances.push("[G] jump to bottom");
	}

	let selection = app
		.selection
		.label()
		.map(|label| {
			let prev = if app.selection.has_prev() { "[ prev" } else { "" };
			let next = if app.selection.has_next() { "] next" } else { "" };
			format!("selection {label}  {prev} {next}  x clear")
		})
		.unwrap_or_default();

	let lines = match app.preferences.tab {
		ViewTab::Ledger => vec![
			Line::from("Tab chart | j/k scroll | n/p day | N/P month | t this month | s sort | space select | r reload | q quit"),
			Line::from(format!("{} {}", affordances.join("  "), selection)),
			Line::from(app.status.clone()),
		],
		ViewTab::Chart => vec![
			Line::from("Tab ledger | r reload | q quit"),
			Line::from(""),
			Line::from(app.status.clone()),
		],
	};
	let footer = Paragraph::new(lines).block(Block::default().borders(Borders::TOP).title("Shortcuts"));
	frame.render_widget(footer, area);
}

fn color_from_name(color_name: &str) -> Option<Color> {
	match color_name {
		"black" => Some(Color::Black),
		"red" => Some(Color::Red),
		"green" => Some(Color::Green),
		"yellow" => Some(Color::Yellow),
		"blue" => Some(Color::Blue),
		"magenta" => Some(Color::Magenta),
		"cyan" => Some(Color::Cyan),
		"gray" => Some(Color::Gray),
		"dark_gray" => Some(Color::DarkGray),
		"light_red" => Some(Color::LightRed),
		"light_green" => Some(Color::LightGreen),
		"light_yellow" => Some(Color::LightYellow),
		"light_blue" => Some(Color::LightBlue),
		"light_magenta" => Some(Color::LightMagenta),
		"light_cyan" => Some(Color::LightCyan),
		"white" => Some(Color::White),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use chrono::NaiveDate;

	use crate::calendar::DateFormat;
	use crate::domain::{Entry, EntryKind, SortOrder};
	use crate::grouping::GroupIndex;
	use crate::navigator::SortedNavigator;
	use crate::viewport::{ScrollBehavior, ViewportQuery, ViewportSettings, ViewportSync};

	use super::{LINE_UNITS, LayoutLine, TerminalViewport, build_layout};

	fn day(year: i32, month: u32, day: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(year, month, day).unwrap()
	}

	fn index() -> GroupIndex {
		let entries = vec![
			Entry::new("a", "2024-01-30", 5.0, EntryKind::Outflow),
			Entry::new("b", "2024-02-02", 7.0, EntryKind::Outflow),
			Entry::new("c", "2024-01-30", 9.0, EntryKind::Inflow),
		];
		GroupIndex::build(&entries, &DateFormat::default())
	}

	#[test]
	fn layout_follows_visual_order_with_month_captions() {
		let index = index();
		let navigator = SortedNavigator::new(SortOrder::Descending);
		let layout = build_layout(&index, &navigator);
		assert_eq!(
			layout.lines,
			vec![
				LayoutLine::Month { year: 2024, month: 2 },
				LayoutLine::Day(day(2024, 2, 2)),
				LayoutLine::Entry { index: 1 },
				LayoutLine::Blank,
				LayoutLine::Month { year: 2024, month: 1 },
				LayoutLine::Day(day(2024, 1, 30)),
				LayoutLine::Entry { index: 0 },
				LayoutLine::Entry { index: 2 },
				LayoutLine::Blank,
			]
		);
		assert_eq!(layout.sections.get(&day(2024, 1, 30)), Some(&(5, 9)));
	}

	#[test]
	fn smooth_scrolls_animate_and_sync_the_header() {
		let index = index();
		let mut navigator = SortedNavigator::new(SortOrder::Ascending);
		let mut viewport = TerminalViewport::default();
		viewport.set_layout(build_layout(&index, &navigator));
		viewport.set_height(2);

		let sync = ViewportSync::new(ViewportSettings::default());
		let target = viewport.section_rect(day(2024, 2, 2)).expect("mounted").top;
		viewport.scroll_to(target, ScrollBehavior::Smooth);
		assert_eq!(viewport.scroll_top(), 0.0);
		while viewport.advance_animation() {}
		assert_eq!(viewport.scroll_top(), target);
		assert_eq!(viewport.top_row() as f64 * LINE_UNITS, target);

		sync.on_scroll(&mut navigator, &index, &viewport);
		assert_eq!(navigator.current_day(&index), Some(day(2024, 2, 2)));
		assert_eq!(viewport.focus_entry(), Some(1));
	}
}
