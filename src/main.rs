use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use serde::Serialize;

use feature_generator_rs::{
    FeatureGenerator, FeatureGeneratorConfig, FeatureGeneratorError, FileShardWriter,
    GeneratorStats, OutputEncoding, RecordReader,
};

#[derive(Parser, Debug)]
#[command(about = "Turn recorded driving sessions into learning data shards")]
struct Args {
    /// Record file to process (repeatable, processed in the given order)
    #[arg(long)]
    record: Vec<PathBuf>,

    /// Directory of record files (processes *.record and *.record.gz, sorted by name)
    #[arg(long)]
    record_dir: Option<PathBuf>,

    /// JSON config file; command line options override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory for learning_data.<index>.* shards
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Localization messages per label window
    #[arg(long)]
    label_sample_interval: Option<usize>,

    /// Frames written per shard
    #[arg(long)]
    frames_per_shard: Option<usize>,

    /// Stride between window samples kept as label points
    #[arg(long)]
    trajectory_point_sample_interval: Option<usize>,

    /// Window entries dropped after each label
    #[arg(long)]
    window_step: Option<usize>,

    /// Write pretty JSON shards (.txt) instead of gzip (.bin)
    #[arg(long, default_value_t = false)]
    text: bool,

    /// Also write the run summary to this file
    #[arg(long)]
    summary: Option<PathBuf>,
}

#[derive(Serialize)]
struct RecordReport {
    path: PathBuf,
    messages: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct RunSummary {
    generated_at: String,
    elapsed_secs: f64,
    data_dir: PathBuf,
    output_encoding: OutputEncoding,
    cancelled: bool,
    records: Vec<RecordReport>,
    stats: GeneratorStats,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = build_config(&args)?;
    let records = collect_records(&args)?;
    if records.is_empty() {
        anyhow::bail!("Provide --record or --record-dir with at least one record file");
    }

    let running = setup_ctrl_c_handler().context("Failed to install Ctrl-C handler")?;
    let sink = FileShardWriter::new(&config.data_dir, config.output_encoding)
        .with_context(|| format!("Failed to create data dir {}", config.data_dir.display()))?;
    let mut generator = FeatureGenerator::new(&config, sink)?;

    log::info!(
        "[{}] Processing {} record file(s) into {}",
        ts_now(),
        records.len(),
        config.data_dir.display()
    );
    let start = Utc::now();

    let mut reports = Vec::with_capacity(records.len());
    let mut failure = None;
    for path in &records {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        let (messages, outcome) = process_record(&mut generator, path, &running);
        log::info!("{}: {} messages", path.display(), messages);
        let error = outcome.as_ref().err().map(|e| e.to_string());
        reports.push(RecordReport {
            path: path.clone(),
            messages,
            error,
        });

        match outcome {
            Ok(()) => {}
            // Unreadable or corrupt record files are skipped, the rest still count
            Err(e @ FeatureGeneratorError::Record(_)) => log::error!("{}", e),
            Err(e) => {
                log::error!("Stopping at {}: {}", path.display(), e);
                failure = Some(e);
                break;
            }
        }
    }

    let cancelled = !running.load(Ordering::SeqCst);
    if cancelled {
        log::warn!("Interrupted, flushing what was collected so far");
    }

    let stats = generator.finish().context("Terminal flush failed")?;

    let summary = RunSummary {
        generated_at: start.to_rfc3339(),
        elapsed_secs: Utc::now().signed_duration_since(start).num_milliseconds() as f64 / 1000.0,
        data_dir: config.data_dir.clone(),
        output_encoding: config.output_encoding,
        cancelled,
        records: reports,
        stats,
    };
    let rendered = serde_json::to_string_pretty(&summary)?;
    println!("{}", rendered);
    if let Some(path) = args.summary.as_ref() {
        fs::write(path, &rendered)
            .with_context(|| format!("Failed to write summary {}", path.display()))?;
    }

    match failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

fn build_config(args: &Args) -> Result<FeatureGeneratorConfig> {
    let mut config = match args.config.as_ref() {
        Some(path) => FeatureGeneratorConfig::load(path)?,
        None => FeatureGeneratorConfig::default(),
    };

    if let Some(dir) = args.data_dir.as_ref() {
        config.data_dir = dir.clone();
    }
    if let Some(v) = args.label_sample_interval {
        config.label_sample_interval = v;
    }
    if let Some(v) = args.frames_per_shard {
        config.frames_per_shard = v;
    }
    if let Some(v) = args.trajectory_point_sample_interval {
        config.trajectory_point_sample_interval = v;
    }
    if let Some(v) = args.window_step {
        config.window_step = v;
    }
    if args.text {
        config.output_encoding = OutputEncoding::Text;
    }

    config.validate()?;
    Ok(config)
}

fn collect_records(args: &Args) -> Result<Vec<PathBuf>> {
    let mut records = args.record.clone();

    if let Some(dir) = args.record_dir.as_ref() {
        let mut found = Vec::new();
        for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
            let path = entry?.path();
            if path.is_file() && is_record_file(&path) {
                found.push(path);
            }
        }
        found.sort();
        records.extend(found);
    }

    Ok(records)
}

fn is_record_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    name.ends_with(".record") || name.ends_with(".record.gz")
}

/// Run one record file through the generator. Returns the messages read
/// from it along with how the file ended.
fn process_record(
    generator: &mut FeatureGenerator<FileShardWriter>,
    path: &Path,
    running: &AtomicBool,
) -> (u64, feature_generator_rs::Result<()>) {
    let mut reader = match RecordReader::open(path) {
        Ok(reader) => reader,
        Err(e) => return (0, Err(e)),
    };
    let outcome = generator.process_until(&mut reader, running).map(|_| ());
    (reader.messages_read(), outcome)
}

/// Ctrl-C clears the returned flag
fn setup_ctrl_c_handler() -> std::result::Result<Arc<AtomicBool>, ctrlc::Error> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;
    Ok(running)
}

fn ts_now() -> String {
    Utc::now().format("%H:%M:%S").to_string()
}
