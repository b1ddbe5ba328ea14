use std::fs::{self, File};
use std::io::Read;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn, LevelFilter};
use simple_logger::SimpleLogger;
use time::macros::format_description;

use wiki_fast_dump_stats::{collect, MAX_THREADS, MIN_THREADS};

#[derive(Parser)]
#[command(name = "Wiki Dump Fast Stats")]
#[command(about = "Collect word, article-size and publication-year statistics from compressed MediaWiki XML dump archives")]
#[command(version = "0.1.0")]
struct Cli {
    #[arg(
        short,
        long,
        required = true,
        num_args = 1..,
        value_delimiter = ',',
        help = "Path(s) to bzip2 archived XML dump file(s), comma separated"
    )]
    inputs: Vec<PathBuf>,

    #[arg(short, long, default_value = "statistics.txt", help = "Report output file")]
    output: PathBuf,

    #[arg(
        short,
        long,
        default_value = "4",
        help = "Number of worker threads, 1-32 (0 for auto)"
    )]
    threads: usize,

    #[arg(short, long, default_value = "INFO", help = "Logging level (DEBUG, INFO, WARN, ERROR)")]
    log_level: String,
}

fn setup_logging(log_level_str: &str) -> Result<()> {
    let log_level = match log_level_str.to_uppercase().as_str() {
        "DEBUG" => LevelFilter::Debug,
        "INFO" => LevelFilter::Info,
        "WARN" | "WARNING" => LevelFilter::Warn,
        "ERROR" => LevelFilter::Error,
        other => {
            eprintln!("Invalid log level '{}', defaulting to INFO.", other);
            LevelFilter::Info
        }
    };

    SimpleLogger::new()
        .with_level(log_level)
        .with_timestamp_format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        .init()?;

    Ok(())
}

fn resolve_threads(requested: usize) -> usize {
    if requested == 0 {
        let threads = num_cpus::get().clamp(MIN_THREADS, MAX_THREADS);
        info!("Auto-detected {} CPU cores. Using {} threads.", num_cpus::get(), threads);
        threads
    } else {
        info!("Using specified {} threads.", requested);
        requested
    }
}

fn validate_inputs(inputs: &[PathBuf]) -> Result<()> {
    for path in inputs {
        let metadata = fs::metadata(path)
            .with_context(|| format!("Input file does not exist or cannot be read: {}", path.display()))?;
        if !metadata.is_file() {
            anyhow::bail!("Input path is not a file: {}", path.display());
        }
    }
    Ok(())
}

/// Opens every archive behind an auto-detected decompressor (bzip2 for wiki
/// dumps, gzip and plain streams also accepted). The core engine only ever
/// sees decompressed bytes.
fn open_archives(inputs: &[PathBuf]) -> Result<Vec<Box<dyn Read + Send>>> {
    let mut archives = Vec::with_capacity(inputs.len());
    for path in inputs {
        let file = File::open(path)
            .with_context(|| format!("Failed to open input file: {}", path.display()))?;
        let (reader, format) = niffler::send::get_reader(Box::new(file))
            .with_context(|| format!("Failed to open decompressor for: {}", path.display()))?;
        info!("Opened {} ({:?} compression)", path.display(), format);
        archives.push(reader);
    }
    Ok(archives)
}

fn format_elapsed(elapsed: Duration) -> String {
    let total_secs = elapsed.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let millis = elapsed.subsec_millis();

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}.{:03}s", seconds, millis)
    }
}

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();

    setup_logging(&cli.log_level)?;
    info!("Starting Wiki Dump Fast Stats");

    let threads = resolve_threads(cli.threads);
    if !(MIN_THREADS..=MAX_THREADS).contains(&threads) {
        anyhow::bail!("Number of threads must be in {}..={}", MIN_THREADS, MAX_THREADS);
    }

    validate_inputs(&cli.inputs)?;
    let archives = open_archives(&cli.inputs)?;
    info!("Processing {} archive(s)", archives.len());

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} [{elapsed_precise}] {msg}")
            .expect("Failed to create progress bar template"),
    );
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message(format!("Collecting statistics from {} archive(s)...", cli.inputs.len()));

    let outcome = collect(archives, threads);
    spinner.finish_and_clear();

    let report = match outcome {
        Ok(report) => report,
        Err(err) => {
            warn!("Statistics collection failed after {}", format_elapsed(start_time.elapsed()));
            return Err(err).context("Statistics collection failed");
        }
    };

    fs::write(&cli.output, &report)
        .with_context(|| format!("Failed to write report to: {}", cli.output.display()))?;
    info!("Report written to {}", cli.output.display());
    info!("Total execution time: {}", format_elapsed(start_time.elapsed()));

    Ok(())
}
