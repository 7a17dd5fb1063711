//! Imgsink CLI: store a local image through a variant profile.
//!
//! Configuration comes from the environment (IMGSINK_ROOT_DIR,
//! IMGSINK_TASKS, ...) unless overridden by flags.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;

use imgsink_cli::init_tracing;
use imgsink_core::{content_type_for_extension, parse_task_list, SinkConfig};
use imgsink_engine::{UploadContext, UploadSource, VariantStore};

#[derive(Parser)]
#[command(name = "imgsink", about = "Multi-variant image storage sink CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a local image through a variant profile
    Store {
        /// Path to the image file to store
        file: PathBuf,
        /// Variant specs, e.g. 800x600:jpeg or 150x150:jpeg:icon
        /// (falls back to IMGSINK_TASKS)
        #[arg(long = "task")]
        tasks: Vec<String>,
        /// Root directory override (falls back to IMGSINK_ROOT_DIR)
        #[arg(long)]
        root: Option<PathBuf>,
        /// Declared content type (default: inferred from the file extension)
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Remove a previously stored artifact (no-op if absent)
    Cleanup {
        /// Path recorded in a variant result
        path: PathBuf,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize result")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Store {
            file,
            tasks,
            root,
            content_type,
        } => {
            let mut config = match root {
                Some(root) => SinkConfig::new(root),
                None => SinkConfig::from_env()
                    .context("Failed to load configuration. Set IMGSINK_ROOT_DIR or pass --root")?,
            };
            if !tasks.is_empty() {
                let parsed = parse_task_list(&tasks.join(","))?;
                config = config.with_tasks(parsed);
            }

            let filename = file
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Source file has no usable name")?
                .to_string();
            let content_type = match content_type {
                Some(ct) => ct,
                None => content_type_for_extension(&file.to_string_lossy())
                    .context("Cannot infer content type from extension; pass --content-type")?
                    .to_string(),
            };

            let store = VariantStore::new(config);
            let ctx = UploadContext::new(UploadSource::from_file(&file), content_type, filename);
            let descriptor = store.transcode(ctx).await?;
            print_json(&descriptor)?;
        }
        Commands::Cleanup { path } => {
            let store = VariantStore::new(SinkConfig::new("."));
            store.cleanup(&path).await?;
            print_json(&json!({ "removed": path }))?;
        }
    }

    Ok(())
}
