//! habit CLI - Command-line interface for habit-tally
//!
//! Commands:
//! - rank: Print the leaderboard for a snapshot
//! - report: Print one user's score card
//! - user: Register or update a user in a store file
//! - record: Apply entry records to a store file
//! - validate: Validate entry records
//! - catalog: Print the habit catalog
//! - day: Map a calendar date to a program day

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use habit_tally::catalog::default_catalog;
use habit_tally::schema::{EntryRecord, EntryRecordAdapter, SCHEMA_VERSION};
use habit_tally::types::{RankingRow, Snapshot, User, UserScoreCard};
use habit_tally::{
    ComputeError, HabitStore, HabitTracker, MemoryStore, ProgramCalendar, ScoreEngine,
    PRODUCER_NAME, TALLY_VERSION,
};

/// habit - Scores, weekly rollups and rankings for the 56-day habit program
#[derive(Parser)]
#[command(name = "habit")]
#[command(version = TALLY_VERSION)]
#[command(about = "Score habit entries and rank participants", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the leaderboard for a snapshot
    Rank {
        /// Snapshot file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output format (defaults to table on a terminal, json otherwise)
        #[arg(long)]
        format: Option<OutputFormat>,
    },

    /// Print one user's score card
    Report {
        /// Snapshot file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// User id
        #[arg(short, long)]
        user: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Register or update a user in a store file
    User {
        /// Store file; created with the default catalog when missing
        #[arg(short, long)]
        store: PathBuf,

        /// User id
        #[arg(long)]
        id: String,

        /// Display name
        #[arg(long)]
        name: String,

        /// Avatar reference
        #[arg(long, default_value = "")]
        avatar: String,
    },

    /// Apply entry records to a store file
    Record {
        /// Store file; created with the default catalog when missing
        #[arg(short, long)]
        store: PathBuf,

        /// Entry records file path (use - for stdin)
        #[arg(short, long)]
        entries: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Program start date (YYYY-MM-DD) for records that carry a date
        #[arg(long)]
        start: Option<String>,
    },

    /// Validate entry records
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Program start date (YYYY-MM-DD) for records that carry a date
        #[arg(long)]
        start: Option<String>,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the habit catalog
    Catalog {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Map a calendar date to a program day and week
    Day {
        /// Program start date (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// Date to map (YYYY-MM-DD); defaults to today (UTC)
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Aligned text table
    Table,
    /// Compact JSON array
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("habit_tally=info,habit=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), HabitCliError> {
    match cli.command {
        Commands::Rank { input, format } => cmd_rank(&input, format),
        Commands::Report { input, user, json } => cmd_report(&input, &user, json),
        Commands::User {
            store,
            id,
            name,
            avatar,
        } => cmd_user(&store, User::new(id, name, avatar)),
        Commands::Record {
            store,
            entries,
            input_format,
            start,
        } => cmd_record(&store, &entries, input_format, start.as_deref()),
        Commands::Validate {
            input,
            input_format,
            start,
            json,
        } => cmd_validate(&input, input_format, start.as_deref(), json),
        Commands::Catalog { json } => cmd_catalog(json),
        Commands::Day { start, date } => cmd_day(&start, date.as_deref()),
    }
}

fn cmd_rank(input: &Path, format: Option<OutputFormat>) -> Result<(), HabitCliError> {
    let snapshot = read_snapshot(input)?;
    let rankings = ScoreEngine::new(&snapshot).rankings();

    let format = format.unwrap_or_else(|| {
        if atty::is(atty::Stream::Stdout) {
            OutputFormat::Table
        } else {
            OutputFormat::Json
        }
    });

    print!("{}", format_rankings(&rankings, &format)?);
    Ok(())
}

fn cmd_report(input: &Path, user_id: &str, json: bool) -> Result<(), HabitCliError> {
    let snapshot = read_snapshot(input)?;
    let card = ScoreEngine::new(&snapshot)
        .score_card(user_id)
        .ok_or_else(|| ComputeError::UnknownUser(user_id.to_string()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&card)?);
    } else {
        print!("{}", format_card(&card, &snapshot));
    }

    Ok(())
}

fn cmd_user(store_path: &Path, user: User) -> Result<(), HabitCliError> {
    let mut tracker = open_tracker(store_path, None)?;
    tracker.add_user(user);
    fs::write(store_path, tracker.save()?)?;
    Ok(())
}

fn cmd_record(
    store_path: &Path,
    entries: &Path,
    input_format: InputFormat,
    start: Option<&str>,
) -> Result<(), HabitCliError> {
    let mut tracker = open_tracker(store_path, parse_calendar(start)?)?;

    let records = read_records(entries, &input_format)?;
    if records.is_empty() {
        return Err(HabitCliError::NoRecords);
    }

    let applied = tracker.record_batch(&records)?;
    fs::write(store_path, tracker.save()?)?;

    info!(
        applied,
        entries = tracker.store().entry_count(),
        users = tracker.store().users().len(),
        "store updated"
    );
    Ok(())
}

fn cmd_validate(
    input: &Path,
    input_format: InputFormat,
    start: Option<&str>,
    json: bool,
) -> Result<(), HabitCliError> {
    let calendar = parse_calendar(start)?;
    let records = read_records(input, &input_format)?;
    let failures = EntryRecordAdapter::validate_records(&records, calendar.as_ref());

    let report = ValidationReport {
        schema_version: SCHEMA_VERSION.to_string(),
        total_records: records.len(),
        valid_records: records.len() - failures.len(),
        invalid_records: failures.len(),
        errors: failures
            .iter()
            .map(|f| ValidationErrorDetail {
                index: f.index,
                entry_id: f.entry_id.clone(),
                error: f.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Schema:          {}", report.schema_version);
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Record {} (index {}): {}",
                    err.entry_id.as_deref().unwrap_or("unknown"),
                    err.index,
                    err.error
                );
            }
        }
    }

    if report.invalid_records > 0 {
        Err(HabitCliError::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

fn cmd_catalog(json: bool) -> Result<(), HabitCliError> {
    let catalog = default_catalog();

    if json {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
    } else {
        println!("{} {} habit catalog", PRODUCER_NAME, TALLY_VERSION);
        println!();
        for habit in &catalog {
            println!(
                "  {:>2}  {:<40} {:<10} max {}",
                habit.id,
                habit.label,
                habit.score_type.as_str(),
                habit.score_value
            );
        }
    }

    Ok(())
}

fn cmd_day(start: &str, date: Option<&str>) -> Result<(), HabitCliError> {
    let calendar = ProgramCalendar::parse(start)
        .map_err(|e| HabitCliError::InvalidDate(format!("{start}: {e}")))?;

    let date = match date {
        Some(d) => NaiveDate::parse_from_str(d, "%Y-%m-%d")
            .map_err(|e| HabitCliError::InvalidDate(format!("{d}: {e}")))?,
        None => Utc::now().date_naive(),
    };

    match calendar.day_index(date) {
        Some(day) => println!("{date}: day {day}, week {}", calendar.week_of(day).index()),
        None => println!(
            "{date}: outside the program ({} to {})",
            calendar.start_date,
            calendar.end_date()
        ),
    }

    Ok(())
}

// Helper functions

fn read_input(input: &Path) -> Result<String, HabitCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            warn!("reading from an interactive terminal; end input with Ctrl-D");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn open_tracker(
    store_path: &Path,
    calendar: Option<ProgramCalendar>,
) -> Result<HabitTracker, HabitCliError> {
    let mut tracker: HabitTracker = HabitTracker::default();
    if let Some(calendar) = calendar {
        tracker = tracker.with_calendar(calendar);
    }

    if store_path.exists() {
        tracker.load(&fs::read_to_string(store_path)?)?;
    } else {
        info!(path = %store_path.display(), "store file not found, starting empty");
    }
    Ok(tracker)
}

fn read_snapshot(input: &Path) -> Result<Snapshot, HabitCliError> {
    let snapshot = Snapshot::from_json(&read_input(input)?)?;
    debug!(
        users = snapshot.users.len(),
        entries = snapshot.entries.len(),
        "loaded snapshot"
    );
    Ok(snapshot)
}

fn read_records(input: &Path, format: &InputFormat) -> Result<Vec<EntryRecord>, HabitCliError> {
    let data = read_input(input)?;
    let records = match format {
        InputFormat::Ndjson => EntryRecordAdapter::parse_ndjson(&data)?,
        InputFormat::Json => EntryRecordAdapter::parse_array(&data)?,
    };
    Ok(records)
}

fn parse_calendar(start: Option<&str>) -> Result<Option<ProgramCalendar>, HabitCliError> {
    start
        .map(|s| {
            ProgramCalendar::parse(s).map_err(|e| HabitCliError::InvalidDate(format!("{s}: {e}")))
        })
        .transpose()
}

fn format_rankings(rankings: &[RankingRow], format: &OutputFormat) -> Result<String, HabitCliError> {
    match format {
        OutputFormat::Table => {
            let mut out = format!("{:>4}  {:<24} {:>10} {:>10}\n", "rank", "name", "score", "done %");
            for (idx, row) in rankings.iter().enumerate() {
                out.push_str(&format!(
                    "{:>4}  {:<24} {:>10.1} {:>9.2}%\n",
                    idx + 1,
                    row.name,
                    row.total_score,
                    row.completion_rate
                ));
            }
            Ok(out)
        }
        OutputFormat::Json => Ok(serde_json::to_string(rankings)? + "\n"),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(rankings)? + "\n"),
    }
}

fn format_card(card: &UserScoreCard, snapshot: &Snapshot) -> String {
    let mut out = format!(
        "{} ({})  rank {} of {}\n\n",
        card.user.name,
        card.user.id,
        card.rank,
        snapshot.users.len()
    );

    out.push_str(&format!("{:<40}", "habit"));
    for week in 0..card.weeks.len() {
        out.push_str(&format!(" {:>7}", format!("wk{}", week + 1)));
    }
    out.push_str(&format!(" {:>7}\n", "total"));

    for (idx, habit) in snapshot.habits.iter().enumerate() {
        out.push_str(&format!("{:<40}", habit.label));
        for week in &card.weeks {
            out.push_str(&format!(" {:>7.1}", week.get(idx).copied().unwrap_or(0.0)));
        }
        out.push_str(&format!(
            " {:>7.1}\n",
            card.total_scores.get(idx).copied().unwrap_or(0.0)
        ));
    }

    out.push_str(&format!("{:<40}", "week total"));
    for total in &card.week_totals {
        out.push_str(&format!(" {:>7.1}", total));
    }
    out.push_str(&format!(" {:>7.1}\n\n", card.grand_total));

    out.push_str(&format!(
        "completed entries: {}  completion rate: {:.2}%\n",
        card.completed_count, card.completion_rate
    ));
    out
}

// Error types

#[derive(Debug)]
enum HabitCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    InvalidDate(String),
    NoRecords,
    ValidationFailed(usize),
}

impl From<io::Error> for HabitCliError {
    fn from(e: io::Error) -> Self {
        HabitCliError::Io(e)
    }
}

impl From<ComputeError> for HabitCliError {
    fn from(e: ComputeError) -> Self {
        HabitCliError::Compute(e)
    }
}

impl From<serde_json::Error> for HabitCliError {
    fn from(e: serde_json::Error) -> Self {
        HabitCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<HabitCliError> for CliError {
    fn from(e: HabitCliError) -> Self {
        match e {
            HabitCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            HabitCliError::Compute(ComputeError::InvalidEntry(e)) => CliError {
                code: "INVALID_ENTRY".to_string(),
                message: e.to_string(),
                hint: Some("Run 'habit validate' for details".to_string()),
            },
            HabitCliError::Compute(ComputeError::UnknownUser(id)) => CliError {
                code: "UNKNOWN_USER".to_string(),
                message: format!("Unknown user: {id}"),
                hint: Some("Check the user id against the snapshot's users".to_string()),
            },
            HabitCliError::Compute(e) => CliError {
                code: "COMPUTE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(format!("Ensure records match the {SCHEMA_VERSION} schema")),
            },
            HabitCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            HabitCliError::InvalidDate(msg) => CliError {
                code: "INVALID_DATE".to_string(),
                message: msg,
                hint: Some("Use YYYY-MM-DD".to_string()),
            },
            HabitCliError::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "No entry records found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            HabitCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    schema_version: String,
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    entry_id: Option<String>,
    error: String,
}
