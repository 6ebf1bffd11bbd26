//! CLI entry point for `mboxdb`.

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use mboxdb::config::{self, Config};
use mboxdb::ingest::{self, IngestOptions, IngestProgress};
use mboxdb::store::EmailStore;

#[derive(Parser)]
#[command(name = "mboxdb", version, about = "Ingest an MBOX archive into a SQLite database")]
struct Cli {
    /// MBOX file to ingest
    #[arg(value_name = "FILE")]
    mbox: PathBuf,

    /// Path of the SQLite database to create or append to
    #[arg(short, long, default_value = "mail.sqlite")]
    db: PathBuf,

    /// Skip body preview extraction (headers only, faster)
    #[arg(long)]
    no_preview: bool,

    /// Records per transactional flush
    #[arg(long, value_name = "N")]
    batch_size: Option<usize>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.clone(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    setup_logging(&log_level, &config);

    let mut options = IngestOptions::from(&config.ingest);
    options.keep_preview = !cli.no_preview;
    if let Some(n) = cli.batch_size {
        options.batch_size = n.max(1);
    }

    let mut store = EmailStore::open(&cli.db)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    let observer = |p: &IngestProgress| {
        pb.set_message(format!(
            "Processed {} messages | inserted {} | skipped {}",
            p.processed, p.inserted, p.skipped
        ));
        pb.tick();
    };

    let start = Instant::now();
    let summary = ingest::run(&cli.mbox, &mut store, &options, Some(&observer))?;
    pb.finish_and_clear();

    println!(
        "Done in {:.1?}. Processed {}, inserted {}, skipped {}. DB: {}",
        start.elapsed(),
        summary.processed,
        summary.inserted,
        summary.skipped,
        store.path().display()
    );

    Ok(())
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mboxdb.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}
