use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use dialoguer::Confirm;
use log::{info, LevelFilter};
use std::path::{Path, PathBuf};

use photo_organizer_core::config::LogLevel;
use photo_organizer_core::logging::init_logger;
use photo_organizer_core::{
    parse_date_input, parse_event, search_by_period, BatchReport, Config, EventMap, MoveOutcome,
    OrganizationService, PendingBatch, PeriodConfiguration,
};

const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Parser)]
#[command(name = "photo-organizer")]
#[command(about = "Rename, deduplicate and file photos into folders")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Write a rotating log file into this directory instead of stderr
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// List which images already follow the naming scheme
    Analyze {
        directory: PathBuf,

        #[command(flatten)]
        period: PeriodArgs,
    },

    /// Print statistics about the images in a directory
    Report {
        directory: PathBuf,

        /// List images taken on or after this day (DD/MM/YYYY)
        #[arg(long, requires = "to")]
        from: Option<String>,

        /// List images taken on or before this day (DD/MM/YYYY)
        #[arg(long, requires = "from")]
        to: Option<String>,
    },

    /// Move exact duplicates into the duplicates folder
    Dedupe {
        directory: PathBuf,

        /// Commit without asking for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Rename images into the period naming scheme
    Rename {
        directory: PathBuf,

        #[command(flatten)]
        period: PeriodArgs,

        /// Event for a day, as DD/MM/YYYY=Description (repeatable)
        #[arg(long = "event")]
        events: Vec<String>,

        /// Commit without asking for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Move images into folders
    Organize {
        #[command(subcommand)]
        strategy: Strategy,
    },

    /// Write a backup manifest of a directory
    Backup { directory: PathBuf },

    /// Generate default configuration file
    GenerateConfig {
        /// Path to save configuration file
        #[arg(default_value = "photo-organizer.json")]
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum Strategy {
    /// One folder per calendar year
    Years {
        directory: PathBuf,

        /// Commit without asking for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// One folder per event found in organized file names
    Events {
        directory: PathBuf,

        #[command(flatten)]
        period: PeriodArgs,

        /// Commit without asking for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// One folder for the period and one for the period after it
    Periods {
        directory: PathBuf,

        #[command(flatten)]
        period: PeriodArgs,

        /// Commit without asking for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Args)]
struct PeriodArgs {
    /// First day of the period (DD/MM/YYYY)
    #[arg(long)]
    start: Option<String>,

    /// Last day of the period (DD/MM/YYYY); defaults to one year after the start
    #[arg(long, requires = "start")]
    end: Option<String>,

    /// Prefix placed after the period number
    #[arg(long)]
    prefix: Option<String>,

    /// Leave the period number out of file names
    #[arg(long)]
    no_period: bool,

    /// Leave the same-day sequence number out of file names
    #[arg(long)]
    no_sequence: bool,
}

impl PeriodArgs {
    /// `None` when no start date was given
    fn configuration(&self, config: &Config) -> anyhow::Result<Option<PeriodConfiguration>> {
        let Some(start) = &self.start else {
            return Ok(None);
        };
        let start = parse_date_input(start)?;
        let end = self.end.as_deref().map(parse_date_input).transpose()?;

        let mut config = config.clone();
        if let Some(prefix) = &self.prefix {
            config.naming.prefix = prefix.clone();
        }
        config.naming.include_period &= !self.no_period;
        config.naming.include_sequential &= !self.no_sequence;

        Ok(Some(config.period_configuration(start, end)?))
    }
}

fn main() -> Result<(), anyhow::Error> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Set up configuration
    let mut config = load_config(cli.config.as_deref())?;

    // Set log level based on verbosity
    config.log_level = match cli.verbose {
        0 => config.log_level,
        1 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };

    // Initialize logger
    match &cli.log_dir {
        Some(log_dir) => init_logger(log_dir, config.log_level.to_level_filter())
            .map_err(|e| anyhow!("Failed to initialize logging: {e}"))?,
        None => init_stderr_logger(config.log_level.to_level_filter()),
    }

    if let Commands::GenerateConfig { path } = &cli.command {
        Config::default().save_to_file(path)?;
        println!("Configuration file generated at: {}", path.display());
        return Ok(());
    }

    let service = OrganizationService::new(config)?;

    match cli.command {
        Commands::Analyze { directory, period } => {
            let period = period.configuration(service.config())?;
            let analysis = service.analyze(&directory, period.as_ref())?;

            println!("Images found: {}", analysis.total());
            println!("Already organized: {}", analysis.organized.len());
            println!("Need organizing: {}", analysis.unorganized.len());
            for record in &analysis.unorganized {
                println!(
                    "  {} ({}, {}x{}, {})",
                    record.file.display(),
                    record.format,
                    record.dimensions.0,
                    record.dimensions.1,
                    record.preferred_timestamp().format("%d/%m/%Y %H:%M")
                );
            }
            Ok(())
        }

        Commands::Report {
            directory,
            from,
            to,
        } => {
            let records = service.scan(&directory)?;
            print!("{}", service.report(&records));

            if let (Some(from), Some(to)) = (from, to) {
                let found = search_by_period(&records, parse_date_input(&from)?, parse_date_input(&to)?);
                println!("Images from {from} to {to}: {}", found.len());
                for record in found {
                    println!("  {}", record.file.display());
                }
            }
            Ok(())
        }

        Commands::Dedupe { directory, yes } => {
            let records = service.scan(&directory)?;
            run_batch(&service, service.plan_duplicates(&records, &directory), yes)
        }

        Commands::Rename {
            directory,
            period,
            events,
            yes,
        } => {
            let period = period.configuration(service.config())?;
            let events = parse_events(&events)?;
            let analysis = service.analyze(&directory, period.as_ref())?;
            let batch = service.plan_rename(
                period.as_ref(),
                &analysis.unorganized,
                &analysis.organized,
                (!events.is_empty()).then_some(&events),
                &directory,
            )?;
            run_batch(&service, batch, yes)
        }

        Commands::Organize { strategy } => match strategy {
            Strategy::Years { directory, yes } => {
                let records = service.scan(&directory)?;
                run_batch(&service, service.plan_by_year(&records, &directory), yes)
            }
            Strategy::Events {
                directory,
                period,
                yes,
            } => {
                let period = period.configuration(service.config())?;
                let analysis = service.analyze(&directory, period.as_ref())?;
                let batch = service.plan_by_event(period.as_ref(), &analysis.organized, &directory)?;
                run_batch(&service, batch, yes)
            }
            Strategy::Periods {
                directory,
                period,
                yes,
            } => {
                let period = period.configuration(service.config())?;
                let records = service.scan(&directory)?;
                let batch = service.plan_by_period(period.as_ref(), &records, &directory)?;
                run_batch(&service, batch, yes)
            }
        },

        Commands::Backup { directory } => {
            let path = service.create_manual_backup(&directory)?;
            println!("Backup manifest written to: {}", path.display());
            Ok(())
        }

        Commands::GenerateConfig { .. } => Ok(()),
    }
}

/// Explicit path, else the per-user config file when present, else defaults
fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    if let Some(path) = path {
        return Config::from_file(path)
            .with_context(|| format!("Loading {}", path.display()));
    }

    let default_path = dirs::config_dir().map(|dir| dir.join("photo-organizer").join(CONFIG_FILE_NAME));
    match default_path {
        Some(path) if path.is_file() => Ok(Config::from_file(&path)?),
        _ => Ok(Config::default()),
    }
}

fn init_stderr_logger(level: LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_env(photo_organizer_core::logging::LOG_LEVEL_ENV)
        .init();
}

fn parse_events(inputs: &[String]) -> anyhow::Result<EventMap> {
    let mut events = EventMap::new();
    for input in inputs {
        let (date, description) = parse_event(input)?;
        events.insert_date(date, description)?;
    }
    Ok(events)
}

/// Preview the batch, ask for confirmation, then commit
fn run_batch(service: &OrganizationService, batch: PendingBatch, yes: bool) -> anyhow::Result<()> {
    let plan = batch.plan();
    if !plan.unassigned.is_empty() {
        println!("{} images stay where they are", plan.unassigned.len());
    }
    if plan.is_empty() {
        println!("Nothing to do.");
        return Ok(());
    }

    let preview = batch.preview();
    println!("Preview of {}:", preview.plan().operation);
    print_report(preview.report());

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt("Apply these changes?")
            .default(false)
            .interact()?;
        if !confirmed {
            println!("No changes made.");
            return Ok(());
        }
    }

    let result = service.commit(preview)?;
    if let Some(manifest) = &result.manifest {
        println!("Backup manifest written to: {}", manifest.display());
    }
    print_report(&result.report);
    info!("{} finished", result.report.operation);
    Ok(())
}

fn print_report(report: &BatchReport) {
    let verb = if report.is_simulation() { "would create" } else { "created" };
    for folder in &report.folders_created {
        println!("  {verb} folder {}", folder.display());
    }
    for record in &report.moves {
        let status = match &record.outcome {
            MoveOutcome::Moved => "->".to_string(),
            MoveOutcome::SkippedExisting => "skipped, target exists:".to_string(),
            MoveOutcome::Failed(reason) => format!("failed ({reason}):"),
        };
        println!("  {} {status} {}", record.source.display(), record.target.display());
    }
    println!(
        "{} moved, {} skipped, {} failed",
        report.moved(),
        report.skipped(),
        report.failed()
    );
}
