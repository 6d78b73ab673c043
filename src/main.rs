use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use time::{UtcOffset, format_description::well_known::Rfc3339};

use seatrash::config::{
    DEFAULT_DATABASE_PATH, DEFAULT_HISTORY_LIMIT, DEFAULT_MODEL_PATH, DEFAULT_RECENT_LIMIT,
};
use seatrash::detection::mapping::CategoryMapper;
use seatrash::detection::LabelRule;
use seatrash::pipeline::category_table;
use seatrash::{DetectionRecord, DetectorConfig, TrashDetector};

#[derive(Parser)]
#[command(name = "seatrash")]
#[command(about = "Detect marine trash in images and keep a record of detections")]
struct Cli {
    /// Path to the SQLite database
    #[arg(long, value_name = "FILE", env = "SEATRASH_DB", default_value = DEFAULT_DATABASE_PATH, global = true)]
    db: PathBuf,

    /// Path to the trained model; simulated detections are used when missing
    #[arg(long, value_name = "FILE", env = "SEATRASH_MODEL", default_value = DEFAULT_MODEL_PATH, global = true)]
    model: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect trash in one or more images and store the detections
    Detect {
        #[arg(value_name = "IMAGE", required = true)]
        images: Vec<PathBuf>,

        /// Filename to record instead of the image's own name
        #[arg(long)]
        name: Option<String>,
    },
    /// List stored detections, newest first
    History {
        #[arg(long, default_value_t = 0)]
        skip: u32,
        #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: u32,
        /// Only show this label (stored name or category key)
        #[arg(long)]
        label: Option<String>,
    },
    /// Show the most recent detections
    Recent {
        #[arg(long, default_value_t = DEFAULT_RECENT_LIMIT)]
        limit: u32,
    },
    /// Show aggregate statistics
    Stats,
    /// Delete a stored detection
    Delete { id: i64 },
    /// List trash categories and the detector label table
    Categories,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_records(records: &[DetectionRecord]) -> anyhow::Result<()> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    if records.is_empty() {
        println!("No detections recorded.");
    }
    for record in records {
        println!(
            "  #{:<5} {}  {:<8} {:.3}  {}",
            record.id,
            record.timestamp.to_offset(offset).format(&Rfc3339)?,
            record.label,
            record.confidence,
            record.filename
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Command::Categories = args.command {
        if args.json {
            print_json(&category_table())?;
        } else {
            println!("=== Trash categories ===");
            for (key, name) in category_table() {
                println!("  {:<15} {}", key, name);
            }
            println!("\n=== Detector labels ===");
            for (label, rule) in CategoryMapper.rules() {
                match rule {
                    LabelRule::Mapped(category) => println!("  {:<15} -> {}", label, category),
                    LabelRule::Excluded => println!("  {:<15} -> (ignored)", label),
                }
            }
            println!("  {:<15} -> other_trash", "(anything else)");
        }
        return Ok(());
    }

    let config = DetectorConfig {
        model_path: args.model,
        database_path: args.db,
        ..Default::default()
    };
    let detector = TrashDetector::from_config(&config).await?;

    let outcome = run(&detector, args.command, args.json).await;
    detector.store().close().await?;
    outcome
}

async fn run(detector: &TrashDetector, command: Command, json: bool) -> anyhow::Result<()> {
    match command {
        Command::Detect { images, name } => {
            let mut reports = Vec::new();
            let mut failures = 0usize;
            for image in &images {
                match detector.detect_file(image, name.as_deref()).await {
                    Ok(report) => {
                        if !json {
                            println!("\n=== {} ({} mode) ===", report.filename, report.mode);
                            if report.detections.is_empty() {
                                println!("No trash detected.");
                            }
                            for record in &report.records {
                                println!("  {} - confidence: {:.3}", record.label, record.confidence);
                            }
                            println!(
                                "Stored {} detections in {:.3}s",
                                report.records.len(),
                                report.processing_time.as_secs_f64()
                            );
                        }
                        reports.push(report);
                    }
                    Err(e) => {
                        failures += 1;
                        log::error!("{}: {}", image.display(), e);
                    }
                }
            }
            if json {
                print_json(&reports)?;
            }
            if failures > 0 {
                anyhow::bail!("{} of {} images failed", failures, images.len());
            }
        }
        Command::History { skip, limit, label } => {
            let records = detector.history(skip, limit, label.as_deref()).await?;
            if json {
                print_json(&records)?;
            } else {
                let total = detector.count(label.as_deref()).await?;
                println!("=== Detection history ({} total) ===", total);
                print_records(&records)?;
            }
        }
        Command::Recent { limit } => {
            let records = detector.recent(limit).await?;
            if json {
                print_json(&records)?;
            } else {
                println!("=== Recent detections ===");
                print_records(&records)?;
            }
        }
        Command::Stats => {
            let stats = detector.stats().await?;
            if json {
                print_json(&stats)?;
            } else {
                println!("=== Detection statistics ===");
                println!("Total detections:   {}", stats.total_count);
                println!("Average confidence: {:.3}", stats.avg_confidence);
                println!("Last 24 hours:      {}", stats.recent_count);
                for (label, count) in &stats.category_counts {
                    println!("  {:<8} {}", label, count);
                }
            }
        }
        Command::Delete { id } => {
            if detector.delete(id).await? {
                println!("Deleted detection #{}", id);
            } else {
                anyhow::bail!("No detection with id {}", id);
            }
        }
        Command::Categories => {}
    }
    Ok(())
}
