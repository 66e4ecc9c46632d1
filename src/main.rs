use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tkbcal::Calendar;
use tkbcal::config::Config;
use tkbcal::period::PeriodTable;
use tkbcal::request::{CalendarRequest, ErrorBody, handle_calendar, handle_lessons};
use tkbcal::storage::LocalStorage;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tkbcal")]
#[command(about = "Compile a registration export and a timetable into an iCalendar feed")]
#[command(version)]
struct Cli {
    /// Config file (defaults to TKBCAL_CONFIG or the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile the calendar described by a JSON request
    Calendar {
        request: PathBuf,
        /// Write the .ics here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the aggregated classes and lessons as JSON
    Lessons { request: PathBuf },
    /// Print the active period table
    Periods,
    /// Expand the occurrences of every event in an .ics file
    Preview {
        file: PathBuf,
        #[arg(short = 'n', long, default_value = "20")]
        limit: u16,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("{}", ErrorBody::new(format!("{:#}", e)).to_json());
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::load().context("loading config")?,
    };
    let periods = config.period_table().context("loading period table")?;

    match cli.command {
        Commands::Calendar { request, output } => {
            let request = read_request(&request)?;
            let calendar = handle_calendar(&request, &config, &periods)?;
            let ics = calendar.to_ics();
            match output {
                Some(path) => {
                    LocalStorage::atomic_write(&path, ics)
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!(path = %path.display(), events = calendar.len(), "calendar written");
                }
                None => print!("{}", ics),
            }
        }
        Commands::Lessons { request } => {
            let request = read_request(&request)?;
            let lessons = handle_lessons(&request, &config, &periods)?;
            println!("{}", serde_json::to_string_pretty(&lessons)?);
        }
        Commands::Periods => print_periods(&periods),
        Commands::Preview { file, limit } => preview(&file, limit)?,
    }
    Ok(())
}

fn read_request(path: &Path) -> Result<CalendarRequest> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading request {}", path.display()))?;
    let mut request = CalendarRequest::from_json(&raw)
        .with_context(|| format!("parsing request {}", path.display()))?;
    if let Some(base) = path.parent() {
        request.resolve_paths(base);
    }
    Ok(request)
}

fn print_periods(periods: &PeriodTable) {
    if let Some(source) = periods.source() {
        info!(source = %source.display(), "period table");
    }
    for (number, period) in periods.iter() {
        println!("{:>2}  {}", number, period);
    }
}

fn preview(path: &Path, limit: u16) -> Result<()> {
    let bytes = LocalStorage::read(path)?;
    let raw = String::from_utf8(bytes).context("calendar is not utf-8")?;
    let calendar = Calendar::from_ics(&raw)?;
    println!("{} ({} events)", calendar.name(), calendar.len());
    for event in calendar.events() {
        println!("\n{} @ {}", event.summary, event.location);
        for occurrence in event.occurrences(limit)? {
            println!("  {}", occurrence.format("%a %Y-%m-%d %H:%M"));
        }
    }
    Ok(())
}
