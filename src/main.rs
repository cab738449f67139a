mod buckets;
mod calendar;
mod config;
mod domain;
mod grouping;
mod locations;
mod navigator;
mod selection;
mod storage;
mod ui;
mod view_state;
mod viewport;

use std::error::Error;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Duration, Local, NaiveDate};
use clap::{Parser, Subcommand};
use rand::Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::buckets::{BucketQuery, ChartSeries, Granularity, SegmentAxis, aggregate};
use crate::calendar::month_label;
use crate::config::{Config, load_config, save_config};
use crate::domain::{Entry, EntryKind, format_amount, generate_id, parse_entry_day};
use crate::grouping::GroupIndex;
use crate::locations::{log_path, resolve_config_path, resolve_entries_path, view_state_path};
use crate::storage::{load_entries, save_entries};
use crate::ui::{ViewSession, run_ledger_view};
use crate::view_state::{FileStore, KeyValueStore, MemoryStore, load_preferences, view_key};

const LOG_ENV: &str = "LEDGER_LENS_LOG";
const VIEW_CONTEXT: &str = "ledger";
const MAX_CHART_OFFSET: i64 = 100_000;

const SEED_CATEGORIES: [&str; 7] = ["groceries", "rent", "transport", "dining", "utilities", "health", "leisure"];
const SEED_METHODS: [&str; 3] = ["card", "cash", "transfer"];

#[derive(Debug, Parser)]
#[command(name = "ledger-lens", about = "Terminal ledger browser with calendar navigation")]
struct Cli {
	#[arg(long)]
	entries: Option<PathBuf>,
	#[arg(long)]
	config: Option<PathBuf>,
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Interactive ledger view
	View {
		/// Open positioned on this day
		#[arg(long)]
		date: Option<String>,
		/// Keep view preferences in memory only
		#[arg(long)]
		ephemeral: bool,
	},
	/// Print the year / month / week / day hierarchy
	Groups,
	/// Print the chronological day list
	Days,
	/// Print chart buckets for one period
	Chart {
		#[arg(long, default_value_t = Granularity::Month)]
		granularity: Granularity,
		#[arg(
			long,
			default_value_t = 0,
			allow_hyphen_values = true,
			value_parser = clap::value_parser!(i32).range(-MAX_CHART_OFFSET..=MAX_CHART_OFFSET)
		)]
		offset: i32,
		#[arg(long)]
		reference: Option<String>,
		#[arg(long, default_value_t = SegmentAxis::Category)]
		axis: SegmentAxis,
		#[arg(long)]
		kind: Option<EntryKind>,
		#[arg(long)]
		json: bool,
	},
	/// Append random sample entries
	Seed {
		#[arg(long, default_value_t = 60)]
		count: usize,
		#[arg(long, default_value_t = 120)]
		days: i64,
	},
	/// Write the default config file
	InitConfig {
		#[arg(long)]
		force: bool,
	},
}

fn main() {
	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run() -> Result<(), Box<dyn Error>> {
	let cli = Cli::parse();
	let command = cli.command.unwrap_or(Command::View {
		date: None,
		ephemeral: false,
	});
	init_tracing(matches!(command, Command::View { .. }));

	let config_path = resolve_config_path(cli.config);
	let entries_path = resolve_entries_path(cli.entries);

	if let Command::InitConfig { force } = command {
		if config_path.exists() && !force {
			return Err(format!("{} already exists (use --force to overwrite)", config_path.display()).into());
		}
		save_config(&config_path, &Config::default())?;
		println!("wrote default config to {}", config_path.display());
		return Ok(());
	}

	let config = load_config(&config_path)?;
	let entries = load_entries(&entries_path)?;

	match command {
		Command::View { date, ephemeral } => {
			let start_day = date.as_deref().map(|raw| parse_reference(Some(raw))).transpose()?;
			let store: Box<dyn KeyValueStore> = if ephemeral {
				Box::new(MemoryStore::default())
			} else {
				Box::new(FileStore::open(&view_state_path()))
			};
			let key = view_key(&config.owner, VIEW_CONTEXT);
			let mut preferences = load_preferences(store.as_ref(), &key);
			if store.get(&key).is_none() {
				preferences.sort_order = config.sort_order;
			}

			run_ledger_view(ViewSession {
				entries_path,
				entries,
				config,
				store,
				view_key: key,
				preferences,
				start_day,
			})?;
		}
		Command::Groups => {
			let index = GroupIndex::build(&entries, &config.date_format());
			print_groups(&index);
		}
		Command::Days => {
			let index = GroupIndex::build(&entries, &config.date_format());
			print_days(&index);
		}
		Command::Chart {
			granularity,
			offset,
			reference,
			axis,
			kind,
			json,
		} => {
			let reference = parse_reference(reference.as_deref())?;
			let series = aggregate(
				&entries,
				&BucketQuery {
					granularity,
					offset,
					reference,
					kind,
					axis,
				},
			)
			.ok_or_else(|| format!("{granularity} offset {offset} is outside the supported calendar range"))?;
			if json {
				println!("{}", serde_json::to_string_pretty(&series)?);
			} else {
				print_chart(&series);
			}
		}
		Command::Seed { count, days } => {
			seed_entries(&entries_path, entries, count, days)?;
		}
		Command::InitConfig { .. } => {}
	}

	Ok(())
}

/// The interactive view owns the terminal, so its logs go to a file.
fn init_tracing(interactive: bool) {
	let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

	if !interactive {
		tracing_subscriber::fmt()
			.with_env_filter(filter)
			.with_writer(std::io::stderr)
			.init();
		return;
	}

	let path = log_path();
	if let Some(parent) = path.parent() {
		let _ = fs::create_dir_all(parent);
	}
	match OpenOptions::new().create(true).append(true).open(&path) {
		Ok(file) => tracing_subscriber::fmt()
			.with_env_filter(filter)
			.with_ansi(false)
			.with_writer(Mutex::new(file))
			.init(),
		Err(err) => eprintln!("warning: logging disabled, cannot open {}: {err}", path.display()),
	}
}

fn parse_reference(input: Option<&str>) -> Result<NaiveDate, Box<dyn Error>> {
	match input {
		Some(raw) => parse_entry_day(raw).ok_or_else(|| format!("invalid reference date: {raw}").into()),
		None => Ok(Local::now().date_naive()),
	}
}

fn print_groups(index: &GroupIndex) {
	if index.is_empty() {
		println!("no dated entries");
		return;
	}

	for (year, months) in index.years() {
		println!("{year}");
		for (month, weeks) in months {
			let flow = index.month_flow(*year, *month);
			println!(
				"  {} (in {} | out {} | net {})",
				month_label(*month),
				format_amount(flow.inflow),
				format_amount(flow.outflow),
				format_amount(flow.net())
			);
			for (week, days) in weeks {
				println!("    {}-W{:02}", week.year(), week.week());
				for bucket in days.values() {
					println!("      {} ({} entries)", bucket.display_date, bucket.entries.len());
					for indexed in &bucket.entries {
						let entry = &indexed.entry;
						let amount = entry
							.magnitude()
							.map(format_amount)
							.unwrap_or_else(|| "--".to_string());
						println!(
							"        #{} {} {} {}",
							indexed.index,
							entry.kind,
							amount,
							entry.category.as_deref().unwrap_or("uncategorized")
						);
					}
				}
			}
		}
	}

	if index.skipped() > 0 {
		println!("\n{} entries without a usable date", index.skipped());
	}
}

fn print_days(index: &GroupIndex) {
	if index.is_empty() {
		println!("no dated entries");
		return;
	}

	if let (Some(earliest), Some(latest)) = (index.earliest(), index.latest()) {
		println!("{} days from {} to {}", index.days().len(), earliest, latest);
	}
	for (key, day) in index.day_keys().iter().zip(index.days()) {
		if let Some(bucket) = index.bucket(*day) {
			println!("{} | {} | {}", key, bucket.display_date, bucket.entries.len());
		}
	}
}

fn print_chart(series: &ChartSeries) {
	println!("{} ({})", series.period_label(), series.granularity);
	if series.segments.is_empty() {
		println!("no segments");
		return;
	}

	let header = series
		.segments
		.iter()
		.map(|segment| segment.label.clone())
		.collect::<Vec<_>>()
		.join(" | ");
	println!("slot | {header} | total");
	for row in &series.rows {
		let values = series
			.segments
			.iter()
			.map(|segment| format_amount(row.value(&segment.key)))
			.collect::<Vec<_>>()
			.join(" | ");
		println!("{} | {} | {}", row.slot_label, values, format_amount(row.total()));
	}
}

fn seed_entries(path: &Path, mut entries: Vec<Entry>, count: usize, days: i64) -> Result<(), Box<dyn Error>> {
	let mut rng = rand::thread_rng();
	let today = Local::now().date_naive();

	for _ in 0..count {
		let day = today - Duration::days(rng.gen_range(0..days.max(1)));
		let (kind, amount) = if rng.gen_bool(0.15) {
			(EntryKind::Inflow, rng.gen_range(400.0..3000.0))
		} else {
			(EntryKind::Outflow, rng.gen_range(3.0..180.0))
		};
		let amount = (amount * 100.0_f64).round() / 100.0;
		let category = if kind == EntryKind::Inflow {
			"salary"
		} else {
			SEED_CATEGORIES[rng.gen_range(0..SEED_CATEGORIES.len())]
		};

		entries.push(
			Entry::new(generate_id(), day.format("%Y-%m-%d").to_string(), amount, kind)
				.with_category(category)
				.with_method(SEED_METHODS[rng.gen_range(0..SEED_METHODS.len())]),
		);
	}

	save_entries(path, &entries)?;
	info!(path = %path.display(), added = count, "seeded entries");
	println!("wrote {} entries to {}", entries.len(), path.display());
	Ok(())
}
