use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use dugg::services::convert;
use dugg::services::image_processor::RasterProcessor;
use dugg::{
    ConversionSpec, DownloadOptions, Downloader, FileDescriptor, Pipeline, TransferConfig,
    UploadLog, UploadOptions,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON config file; environment variables are used when absent
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload files to the bucket, converting images first if configured
    Upload {
        files: Vec<PathBuf>,

        /// Destination bucket (overrides the configured one)
        #[arg(short, long)]
        bucket: Option<String>,

        /// Prefix object keys with a millisecond timestamp
        #[arg(short, long)]
        timestamp: bool,

        /// Conversion spec as JSON, e.g. '{"resize": [120, "auto"]}'
        #[arg(long, value_parser = parse_spec)]
        convert: Option<ConversionSpec>,

        /// Do not print uploaded URLs
        #[arg(short, long)]
        quiet: bool,
    },

    /// Convert image files in place
    Convert {
        files: Vec<PathBuf>,

        /// Conversion spec as JSON
        #[arg(short, long, value_parser = parse_spec)]
        spec: ConversionSpec,
    },

    /// Download a URL to a local file
    Download {
        uri: String,

        /// Destination path (default: last segment of the URI)
        dest: Option<PathBuf>,

        /// Suppress progress output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show file metadata (requires exiftool)
    Info { file: PathBuf },
}

fn parse_spec(raw: &str) -> Result<ConversionSpec, String> {
    serde_json::from_str(raw).map_err(|e| e.to_string())
}

async fn descriptors(paths: &[PathBuf]) -> anyhow::Result<Vec<FileDescriptor>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(FileDescriptor::from_path(path).await?);
    }
    Ok(files)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dugg=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &args.config {
        Some(path) => TransferConfig::from_file(path)?,
        None => TransferConfig::from_env()?,
    };

    match args.command {
        Command::Upload {
            files,
            bucket,
            timestamp,
            convert,
            quiet,
        } => {
            let pipeline = Pipeline::connect(config).await;
            let mut files = descriptors(&files).await?;
            let options = UploadOptions {
                bucket,
                timestamp,
                convert,
                log: if quiet { UploadLog::Silent } else { UploadLog::Print },
            };
            let urls = pipeline.upload(&mut files, &options).await?;
            info!("✅ {} file(s) uploaded", urls.len());
        }
        Command::Convert { files, spec } => {
            let mut files = descriptors(&files).await?;
            let converted = convert::convert(&RasterProcessor, &mut files, &spec).await?;
            for file in converted {
                println!("{} ({} bytes)", file.path.display(), file.size);
            }
        }
        Command::Download { uri, dest, quiet } => {
            let downloader = Downloader::new(config.download_timeout);
            let options = DownloadOptions {
                quiet,
                observer: None,
            };
            let outcome = downloader.download(&uri, dest.as_deref(), options).await?;
            if quiet {
                println!("{}", outcome.path.display());
            }
        }
        Command::Info { file } => {
            let tags = dugg::services::metadata::info(&file).await?;
            for (name, value) in tags {
                println!("{}: {}", name, value);
            }
        }
    }

    Ok(())
}
