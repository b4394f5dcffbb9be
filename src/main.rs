mod config;
mod debounce;
mod filter;
mod loader;
mod logging;
mod merge;
mod models;
mod paginate;
mod salary;
mod session;
mod sort;
mod store;
mod tui;
mod view_state;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use config::{Config, GlobalOptions};
use loader::DatasetSource;
use models::{ApplicationStatus, FilterCriteria, RecordStore, SortDirection, SortKey, SortState};
use session::{Command, Session};
use std::collections::BTreeMap;
use std::path::PathBuf;
use store::{BatchOutcome, StatusStore};
use view_state::ViewState;

#[derive(Parser)]
#[command(name = "jobboard")]
#[command(about = "Browse, filter and track a large job-postings dataset")]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print one page of filtered, sorted jobs
    List {
        #[command(flatten)]
        filters: FilterArgs,

        /// Sort column (title, company, location, ats, updated)
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending
        #[arg(long)]
        desc: bool,

        /// Page number (out-of-range pages are clamped)
        #[arg(short, long)]
        page: Option<usize>,
    },

    /// Interactive table browser
    Browse {
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Manage application status
    Status {
        #[command(subcommand)]
        command: StatusCommands,
    },

    /// Merge a fresh scrape into an existing dataset, dropping stale postings
    Merge {
        /// Existing dataset (missing file counts as empty)
        #[arg(long, default_value = config::DEFAULT_DATASET)]
        existing: PathBuf,

        /// Freshly scraped dataset
        #[arg(long)]
        fresh: PathBuf,

        /// Output path (defaults to --existing)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Drop existing postings scraped more than this many days ago
        #[arg(long, default_value_t = merge::DEFAULT_MAX_AGE_DAYS)]
        max_age_days: i64,
    },

    /// Show dataset and status summary
    Info,
}

#[derive(Subcommand)]
enum StatusCommands {
    /// Set status (saved, applied, ignored) for a job URL
    Set { id: String, status: String },

    /// Remove the status entry for a job URL
    Clear { id: String },

    /// List all tracked jobs
    List,

    /// Set one status for several job URLs at once
    Batch {
        status: String,
        ids: Vec<String>,
    },
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Restore filters and page from a shared URL or query string
    #[arg(long)]
    view: Option<String>,

    /// Title words (case-insensitive, whole-word)
    #[arg(long)]
    title: Option<String>,

    /// Company words
    #[arg(long)]
    company: Option<String>,

    /// Location words
    #[arg(long)]
    location: Option<String>,

    /// Remote positions only
    #[arg(long)]
    remote: bool,

    /// Hide recruiter postings
    #[arg(long)]
    hide_recruiters: bool,

    /// Hide jobs marked applied or ignored
    #[arg(long)]
    hide_applied: bool,

    /// Only jobs with this status (saved, applied, ignored)
    #[arg(long)]
    status: Option<String>,
}

impl FilterArgs {
    /// Shared view first, then explicit flags on top.
    fn to_view_state(&self) -> ViewState {
        let mut view = self
            .view
            .as_deref()
            .map(ViewState::from_query)
            .unwrap_or_default();
        let criteria: &mut FilterCriteria = &mut view.criteria;
        if let Some(title) = &self.title {
            criteria.title = title.clone();
        }
        if let Some(company) = &self.company {
            criteria.company = company.clone();
        }
        if let Some(location) = &self.location {
            criteria.location = location.clone();
        }
        criteria.remote_only |= self.remote;
        criteria.hide_recruiters = self.hide_recruiters;
        criteria.hide_applied = self.hide_applied;
        if let Some(status) = &self.status {
            criteria.status = ApplicationStatus::parse(status);
            if criteria.status.is_none() {
                tracing::warn!(%status, "unknown status filter ignored");
            }
        }
        view
    }
}

fn parse_status(raw: &str) -> Result<ApplicationStatus> {
    ApplicationStatus::parse(raw)
        .ok_or_else(|| anyhow!("Unknown status '{}'. Use saved, applied or ignored.", raw))
}

fn load_records(config: &Config) -> Result<RecordStore> {
    eprintln!("Loading jobs from {}...", config.dataset);
    loader::load(&config.dataset).with_context(|| format!("Could not load {}", config.dataset))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_options(&cli.global);

    let log_file = matches!(cli.command, Commands::Browse { .. }).then(|| config.browse_log_path());
    logging::init_logging(config.verbose, log_file.as_deref())?;

    match cli.command {
        Commands::List {
            filters,
            sort,
            desc,
            page,
        } => {
            let records = load_records(&config)?;
            let statuses = StatusStore::new(config.open_storage()?);
            let mut session = Session::new(&records, statuses, config.per_page);

            let mut view = filters.to_view_state();
            if let Some(page) = page {
                view.page = page.max(1);
            }
            let sort_key = sort.as_deref().and_then(SortKey::parse);
            if let (Some(raw), None) = (&sort, sort_key) {
                tracing::warn!(sort = %raw, "unknown sort column ignored");
            }
            if let Some(key) = sort_key {
                let direction = if desc {
                    SortDirection::Desc
                } else {
                    SortDirection::Asc
                };
                session.dispatch(Command::SetSort(SortState::by(key, direction)))?;
            }
            session.restore(&view);

            print_page(&session);
        }

        Commands::Browse { filters } => {
            let records = load_records(&config)?;
            let statuses = StatusStore::new(config.open_storage()?);
            let mut session = Session::new(&records, statuses, config.per_page);
            session.restore(&filters.to_view_state());
            tui::run_browse(session)?;
        }

        Commands::Status { command } => {
            let statuses = StatusStore::new(config.open_storage()?);
            match command {
                StatusCommands::Set { id, status } => {
                    let status = parse_status(&status)?;
                    statuses.set_status(&id, status)?;
                    println!("Marked {} as {}.", id, status);
                }

                StatusCommands::Clear { id } => {
                    statuses.clear_status(&id)?;
                    println!("Cleared status for {}.", id);
                }

                StatusCommands::List => {
                    let mut entries: Vec<_> = statuses.get_all().into_iter().collect();
                    if entries.is_empty() {
                        println!("No tracked jobs.");
                    } else {
                        entries.sort_by(|a, b| b.1.date.cmp(&a.1.date));
                        println!("{:<10} {:<20} {}", "STATUS", "UPDATED", "JOB");
                        println!("{}", "-".repeat(80));
                        for (id, entry) in entries {
                            println!(
                                "{:<10} {:<20} {}",
                                entry.status,
                                entry.date.format("%Y-%m-%d %H:%M"),
                                id
                            );
                        }
                    }
                }

                StatusCommands::Batch { status, ids } => {
                    let status = parse_status(&status)?;
                    let pending: BTreeMap<String, ApplicationStatus> =
                        ids.into_iter().map(|id| (id, status)).collect();
                    match statuses.apply_batch(&pending)? {
                        BatchOutcome::NothingSelected => println!("Nothing selected."),
                        BatchOutcome::Applied { attempted, applied } => {
                            println!("Marked {} of {} job(s) as {}.", applied, attempted, status);
                        }
                    }
                }
            }
        }

        Commands::Merge {
            existing,
            fresh,
            output,
            max_age_days,
        } => {
            let fresh_records = loader::load(&DatasetSource::Path(fresh.clone()))
                .with_context(|| format!("Could not load {}", fresh.display()))?
                .into_records();
            println!("New scrape: {} jobs", fresh_records.len());

            let existing_records = if existing.exists() {
                let records = loader::load(&DatasetSource::Path(existing.clone()))
                    .with_context(|| format!("Could not load {}", existing.display()))?
                    .into_records();
                println!("Existing data: {} jobs", records.len());
                records
            } else {
                Vec::new()
            };

            let report = merge::merge(
                existing_records,
                fresh_records,
                chrono::Utc::now(),
                max_age_days,
            );
            if report.stale_dropped > 0 {
                println!(
                    "Dropped {} stale jobs (>{} days old)",
                    report.stale_dropped, max_age_days
                );
            }
            if report.missing_id > 0 {
                println!("Skipped {} jobs without a URL", report.missing_id);
            }

            let output = output.unwrap_or(existing);
            loader::write_dataset(&output, &report.records)?;
            println!(
                "Merged result: {} jobs written to {}",
                report.records.len(),
                output.display()
            );
            match loader::carry_metadata(&fresh, &output, report.records.len())? {
                Some(_) => println!("Metadata updated"),
                None => tracing::warn!(
                    fresh = %fresh.display(),
                    "no metadata next to the fresh scrape, leaving metadata untouched"
                ),
            }
        }

        Commands::Info => {
            let records = load_records(&config)?;
            let statuses = StatusStore::new(config.open_storage()?).get_all();

            println!("Dataset: {}", config.dataset);
            println!("Jobs:    {}", records.len());
            if let Some(meta) = records.metadata() {
                if let Some(updated) = &meta.last_updated {
                    println!("Updated: {}", updated);
                }
                if let (Some(active), Some(total)) = (meta.active_companies, meta.total_companies) {
                    println!("Companies: {} active of {}", active, total);
                }
                if let Some(source) = &meta.source {
                    println!("Source:  {}", source);
                }
            }
            if !config.ephemeral {
                println!("Status DB: {}", config.db_path.display());
            }
            for status in ApplicationStatus::ALL {
                let count = statuses.values().filter(|e| e.status == status).count();
                println!("  {:<8} {}", status, count);
            }
        }
    }

    Ok(())
}

fn print_page<S: store::Storage>(session: &Session<'_, S>) {
    let view = session.view();
    if view.rows.is_empty() {
        println!("No jobs found.");
    } else {
        println!(
            "{:<8} {:<36} {:<20} {:<22} {:<10} {:>11}",
            "STATUS", "TITLE", "COMPANY", "LOCATION", "ATS", "SALARY"
        );
        println!("{}", "-".repeat(112));
        for row in &view.rows {
            let job = row.record;
            let salary = row.salary.map(|s| s.display()).unwrap_or_else(|| "-".to_string());
            println!(
                "{:<8} {:<36} {:<20} {:<22} {:<10} {:>11}",
                row.status.map(|s| s.as_str()).unwrap_or(""),
                truncate(or_dash(job.title_text()), 34),
                truncate(or_dash(job.company_name()), 18),
                truncate(or_dash(job.location_text()), 20),
                truncate(or_dash(job.ats.as_deref().unwrap_or("")), 10),
                salary
            );
        }
    }

    println!(
        "\nPage {} of {} ({} of {} jobs)",
        view.current_page,
        view.total_pages,
        view.total,
        session.total_records()
    );
    let share = session.view_state().to_url("/");
    if share != "/" {
        println!("Share: {}", share);
    }
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() { "-" } else { s }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
