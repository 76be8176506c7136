mod clock;
mod config;
mod db;
mod error;
mod insights;
mod models;
mod reminders;
mod stats;
mod store;
mod telemetry;
mod tracker;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use clock::{Clock, FixedClock, SystemClock};
use config::Config;
use db::Database;
use error::TrackerError;
use insights::{Insight, LIST_INSIGHT_LIMIT};
use models::{Application, ApplicationId, ApplicationStatus, NewApplication, parse_timestamp};
use stats::{Direction, StatsSummary};
use std::path::PathBuf;
use tracing::warn;
use tracker::ApplicationTracker;

#[derive(Parser)]
#[command(name = "applytrack")]
#[command(about = "Job application tracker - statuses, follow-ups, and pipeline metrics")]
struct Cli {
    /// SQLite database file (overrides TRACKER_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// User whose applications to operate on (overrides TRACKER_USER)
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Pin "now" to a timestamp (RFC 3339 or YYYY-MM-DD)
    #[arg(long, global = true)]
    as_of: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Record a new application
    Add {
        /// Company name
        #[arg(short, long)]
        company: String,

        /// Position title
        #[arg(short, long)]
        position: String,

        /// Job location
        #[arg(short, long)]
        location: Option<String>,

        /// Reference to the job posting
        #[arg(long)]
        job: Option<String>,

        /// When the application was sent (defaults to now)
        #[arg(long)]
        applied: Option<String>,

        /// Free-form notes
        #[arg(short, long)]
        notes: Option<String>,

        /// Tags (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// List applications
    List {
        /// Filter by status (applied, screening, interview, offer, rejected, withdrawn)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Show application details and status history
    Show {
        /// Application ID
        id: String,
    },

    /// Move an application to a new status
    Status {
        /// Application ID
        id: String,

        /// New status
        status: String,
    },

    /// Mark an application as followed up
    FollowUp {
        /// Application ID
        id: String,
    },

    /// Schedule an interview
    Interview {
        /// Application ID
        id: String,

        /// Interview time (RFC 3339 or YYYY-MM-DD)
        when: String,
    },

    /// Update notes and tags
    Annotate {
        /// Application ID
        id: String,

        /// Replace notes (empty string clears them)
        #[arg(short, long)]
        notes: Option<String>,

        /// Tags to add (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// Show pipeline statistics
    Stats {
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// Show follow-up and interview reminders
    Reminders {
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// Show advisory insights
    Insights {
        /// Maximum number of insights (defaults to TRACKER_INSIGHT_LIMIT)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// Export applications as JSON
    Export {
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import applications from a JSON export
    Import {
        /// JSON file produced by `export`
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    telemetry::init(&config.log_level)?;

    let db_path = cli.db.clone().unwrap_or_else(|| config.db_path.clone());
    let user = cli.user.clone().unwrap_or_else(|| config.user_id.clone());
    let db = Database::open(&db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

    if let Commands::Init = cli.command {
        db.init()?;
        println!("Database initialized at {}", db.path().display());
        return Ok(());
    }
    db.ensure_initialized()?;

    let clock: Box<dyn Clock> = match &cli.as_of {
        Some(raw) => Box::new(FixedClock::new(parse_timestamp(raw)?)),
        None => Box::new(SystemClock),
    };
    let tracker = ApplicationTracker::new(db, clock);

    run(&tracker, &user, &config, cli.command)
}

fn run<C: Clock>(
    tracker: &ApplicationTracker<Database, C>,
    user: &str,
    config: &Config,
    command: Commands,
) -> Result<()> {
    match command {
        Commands::Init => {}

        Commands::Add {
            company,
            position,
            location,
            job,
            applied,
            notes,
            tags,
        } => {
            let applied_date = applied.as_deref().map(parse_timestamp).transpose()?;
            let app = tracker.create(NewApplication {
                user_id: user.to_string(),
                job_id: job,
                company,
                position,
                location,
                applied_date,
                notes,
                tags,
            })?;
            println!("Added application {} ({} at {})", app.id, app.position, app.company);
        }

        Commands::List { status } => {
            let status = status
                .as_deref()
                .map(str::parse::<ApplicationStatus>)
                .transpose()?;
            let apps: Vec<Application> = tracker
                .applications(user)?
                .into_iter()
                .filter(|app| status.is_none_or(|s| app.status == s))
                .collect();
            if apps.is_empty() {
                println!("No applications found.");
            } else {
                println!(
                    "{:<24} {:<10} {:<26} {:<20} {:>10}",
                    "ID", "STATUS", "POSITION", "COMPANY", "APPLIED"
                );
                println!("{}", "-".repeat(94));
                for app in apps {
                    println!(
                        "{:<24} {:<10} {:<26} {:<20} {:>10}",
                        app.id,
                        app.status,
                        truncate(&app.position, 24),
                        truncate(&app.company, 18),
                        app.applied_date.format("%Y-%m-%d")
                    );
                }
                let insights = tracker.insights(user, LIST_INSIGHT_LIMIT)?;
                if !insights.is_empty() {
                    println!();
                    print_insights(&insights);
                }
            }
        }

        Commands::Show { id } => {
            let id = ApplicationId(id);
            let app = tracker.application(&id)?;
            print_application(&app, tracker.now());
            let history = tracker.history(&id)?;
            if !history.is_empty() {
                println!("\nHistory:");
                for t in history {
                    println!("  {}  {} -> {}", t.at.format("%Y-%m-%d %H:%M"), t.from, t.to);
                }
            }
        }

        Commands::Status { id, status } => {
            let status: ApplicationStatus = status.parse()?;
            let app = tracker.set_status(&ApplicationId(id), status)?;
            println!("Application {} is now {}.", app.id, app.status);
        }

        Commands::FollowUp { id } => {
            let app = tracker.mark_followed_up(&ApplicationId(id))?;
            println!("Marked {} ({}) as followed up.", app.id, app.company);
        }

        Commands::Interview { id, when } => {
            let at = parse_timestamp(&when)?;
            let app = tracker.schedule_interview(&ApplicationId(id), at)?;
            if app.status != ApplicationStatus::Interview {
                warn!(id = %app.id, status = %app.status, "interview scheduled outside interview status");
            }
            println!("Interview with {} scheduled for {}.", app.company, at.format("%Y-%m-%d %H:%M UTC"));
        }

        Commands::Annotate { id, notes, tags } => {
            let app = tracker.annotate(&ApplicationId(id), notes, tags)?;
            println!("Updated {}. Tags: {}", app.id, app.tags.join(", "));
        }

        Commands::Stats { json } => {
            let stats = stats_or_default(tracker.stats(user))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_stats(&stats);
            }
        }

        Commands::Reminders { json } => {
            let reminders = tracker.reminders(user)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&reminders)?);
            } else if reminders.is_empty() {
                println!("No reminders.");
            } else {
                println!("{:<8} {:<24} {}", "PRIORITY", "ID", "REMINDER");
                println!("{}", "-".repeat(80));
                for r in reminders {
                    println!("{:<8} {:<24} {}", r.priority.as_str(), r.application_id, r.message);
                }
            }
        }

        Commands::Insights { limit, json } => {
            let limit = limit.unwrap_or(config.insight_limit);
            let insights = match tracker.insights(user, limit) {
                Err(TrackerError::StoreUnavailable(err)) => {
                    warn!(error = %err, "store unavailable, showing no insights");
                    Vec::new()
                }
                other => other?,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&insights)?);
            } else {
                print_insights(&insights);
            }
        }

        Commands::Export { output } => {
            let apps = tracker.applications(user)?;
            let body = serde_json::to_string_pretty(&apps)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, body)
                        .with_context(|| format!("Failed to write to {}", path.display()))?;
                    println!("Exported {} application(s) to {}", apps.len(), path.display());
                }
                None => println!("{body}"),
            }
        }

        Commands::Import { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read import file: {}", file.display()))?;
            let apps: Vec<Application> = serde_json::from_str(&content)
                .with_context(|| format!("Malformed application records in {}", file.display()))?;
            let count = tracker.import(&apps)?;
            println!("Imported {} application(s).", count);
        }
    }

    Ok(())
}

/// The dashboard never fails on a missing store; it shows zeroes instead.
fn stats_or_default(result: Result<StatsSummary, TrackerError>) -> Result<StatsSummary> {
    match result {
        Ok(stats) => Ok(stats),
        Err(TrackerError::StoreUnavailable(err)) => {
            warn!(error = %err, "store unavailable, showing zeroed statistics");
            Ok(StatsSummary::default())
        }
        Err(err) => Err(err.into()),
    }
}

fn print_application(app: &Application, now: DateTime<Utc>) {
    println!("Application {}", app.id);
    println!("Position: {}", app.position);
    println!("Company: {}", app.company);
    if let Some(location) = &app.location {
        println!("Location: {}", location);
    }
    if let Some(job) = &app.job_id {
        println!("Job: {}", job);
    }
    println!("Status: {}", app.status);
    println!(
        "Applied: {} ({} days ago)",
        app.applied_date.format("%Y-%m-%d %H:%M"),
        app.days_since_applied(now).floor() as i64
    );
    if let Some(responded) = app.response_date {
        println!("Response: {}", responded.format("%Y-%m-%d %H:%M"));
    }
    if let Some(interview) = app.interview_date {
        println!("Interview: {}", interview.format("%Y-%m-%d %H:%M UTC"));
    }
    println!("Followed up: {}", if app.followed_up { "yes" } else { "no" });
    println!("Last updated: {}", app.last_updated.format("%Y-%m-%d %H:%M"));
    if !app.tags.is_empty() {
        println!("Tags: {}", app.tags.join(", "));
    }
    if let Some(notes) = &app.notes {
        println!("\n--- Notes ---\n{}", notes);
    }
}

fn print_stats(stats: &StatsSummary) {
    let arrow = match stats.weekly_change.direction {
        Direction::Increase => "+",
        Direction::Decrease => "-",
    };
    println!("Total applications:  {}", stats.total);
    println!("Active:              {}", stats.active_count);
    println!("Response rate:       {}%", stats.response_rate);
    println!("Interview rate:      {}%", stats.interview_rate);
    println!("Offer rate:          {}%", stats.offer_rate);
    println!("Avg response time:   {} day(s)", stats.avg_response_time);
    println!("This week vs last:   {}{}", arrow, stats.weekly_change.value);
    println!("Follow-ups due:      {}", stats.follow_up_due);
    if !stats.by_status.is_empty() {
        println!("\nBy status:");
        for (status, count) in &stats.by_status {
            println!("  {:<10} {}", status, count);
        }
    }
}

fn print_insights(insights: &[Insight]) {
    if insights.is_empty() {
        println!("No insights right now.");
        return;
    }
    let opts = textwrap::Options::new(76)
        .initial_indent("    ")
        .subsequent_indent("    ");
    for (i, insight) in insights.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("[{}] {}", insight.priority.as_str(), insight.title);
        println!("{}", textwrap::fill(&insight.message, &opts));
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("Acme", 10), "Acme");
        assert_eq!(truncate("Zürich Versicherung", 8), "Züric...");
    }

    #[test]
    fn test_stats_fall_back_when_store_unavailable() {
        let result = Err(TrackerError::StoreUnavailable(StoreError::Unavailable(
            "disk gone".to_string(),
        )));
        assert_eq!(stats_or_default(result).unwrap(), StatsSummary::default());
    }

    #[test]
    fn test_stats_propagate_other_errors() {
        let result = Err(TrackerError::NotFound(ApplicationId::from("app-x")));
        assert!(stats_or_default(result).is_err());
    }
}
