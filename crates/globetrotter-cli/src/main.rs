//! GlobeTrotter CLI: run the image pipeline on local files.
//!
//! Settings come from the environment (and `.env`), or from the file given
//! with `--config`.

use anyhow::Context;
use bytes::Bytes;
use clap::{Parser, Subcommand};
use globetrotter_cli::{
    derived_path, init_tracing, into_app_error, parse_dimensions, parse_watermark_size,
};
use globetrotter_core::{ConfigStore, EnvFileStore, ErrorMetadata, LogLevel, ProcessingConfig};
use globetrotter_processing::{
    upload_image, EncodeOptions, EncodedImage, FitMode, Gravity, ImageProcessor,
    ImageTransformer, ImageValidator, OutputFormat, UploadOptions, ValidationPolicy,
    VariantGenerator, WatermarkConfig, WebOptimizeOptions,
};
use globetrotter_storage::{LocalStorage, Storage};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "globetrotter", about = "GlobeTrotter image pipeline")]
struct Cli {
    /// Read settings from this `.env`-style file instead of the environment
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check an image against the upload policy
    Validate {
        file: PathBuf,
    },
    /// Print width, height, format, size and EXIF (camera, date, GPS)
    Metadata {
        file: PathBuf,
    },
    /// Render every configured size preset
    Variants {
        file: PathBuf,
        /// Directory for the rendered files (defaults to the input's directory)
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Override the configured variant format
        #[arg(long)]
        format: Option<String>,
        /// Override the configured fit: cover, contain, fill, inside
        #[arg(long)]
        fit: Option<String>,
    },
    /// Re-encode an image in another format
    Convert {
        file: PathBuf,
        /// jpeg, png, webp, avif or tiff
        #[arg(long)]
        format: String,
        #[arg(long, default_value = "80")]
        quality: u8,
        /// Lossless encoding where the format supports it
        #[arg(long)]
        lossless: bool,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Fit an image into a bounding box and re-encode it for the web
    Optimize {
        file: PathBuf,
        /// Bounding box, e.g. 1920x1080
        #[arg(long)]
        max: Option<String>,
        #[arg(long)]
        format: Option<String>,
        #[arg(long)]
        quality: Option<u8>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Overlay a watermark image
    Watermark {
        file: PathBuf,
        /// Watermark image
        #[arg(long)]
        mark: PathBuf,
        /// Gravity, e.g. southeast, top-left, center
        #[arg(long)]
        position: Option<String>,
        #[arg(long)]
        opacity: Option<f32>,
        /// original, a percentage of the image width (25%) or WIDTHxHEIGHT
        #[arg(long)]
        size: Option<String>,
        #[arg(long)]
        margin: Option<u32>,
        #[arg(long, default_value = "jpeg")]
        format: String,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Remove EXIF metadata without re-encoding
    StripExif {
        file: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run the full upload pipeline into local storage
    Process {
        file: PathBuf,
    },
    /// Read or edit the configuration file
    Config {
        /// Configuration file to edit
        #[arg(long, default_value = ".env")]
        file: PathBuf,
        #[command(subcommand)]
        sub: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print one value
    Get { key: String },
    /// Set a value and save the file
    Set { key: String, value: String },
    /// Remove a value and save the file
    Unset { key: String },
    /// Print every entry
    List,
}

#[derive(Serialize)]
struct WrittenFile {
    path: PathBuf,
    width: u32,
    height: u32,
    content_type: &'static str,
    size_bytes: usize,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

fn read_input(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn write_output(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    std::fs::write(path, data).with_context(|| format!("Failed to write {}", path.display()))
}

fn write_encoded(path: PathBuf, encoded: &EncodedImage) -> anyhow::Result<WrittenFile> {
    write_output(&path, &encoded.data)?;
    Ok(WrittenFile {
        path,
        width: encoded.width,
        height: encoded.height,
        content_type: encoded.content_type(),
        size_bytes: encoded.data.len(),
    })
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ProcessingConfig> {
    let config = match path {
        Some(path) => {
            let store = EnvFileStore::open(path)?;
            ProcessingConfig::from_store(&store)
        }
        None => ProcessingConfig::from_env(),
    };
    config.context("Failed to load configuration")
}

fn run_config_command(file: &Path, sub: ConfigCommands) -> anyhow::Result<()> {
    let mut store = EnvFileStore::open(file)?;

    match sub {
        ConfigCommands::Get { key } => {
            let value = store
                .get(&key)
                .with_context(|| format!("{} is not set in {}", key, file.display()))?;
            println!("{}", value);
        }
        ConfigCommands::Set { key, value } => {
            store.set(&key, &value);
            // Refuse to save a file the pipeline could not start with
            ProcessingConfig::from_store(&store)
                .with_context(|| format!("Rejected {}={}", key, value))?;
            store.persist()?;
            tracing::info!(key = %key, file = %file.display(), "Configuration updated");
        }
        ConfigCommands::Unset { key } => {
            if store.remove(&key).is_some() {
                store.persist()?;
                tracing::info!(key = %key, file = %file.display(), "Configuration value removed");
            }
        }
        ConfigCommands::List => {
            for (key, value) in store.entries() {
                println!("{}={}", key, value);
            }
        }
    }

    Ok(())
}

/// Log a failed command at its error's level and print `error[CODE]: message`.
fn report_failure(err: anyhow::Error) {
    let message = format!("{:#}", err);
    let app = into_app_error(err);
    let code = app.error_code();
    let recoverable = app.is_recoverable();

    match app.log_level() {
        LogLevel::Debug => {
            tracing::debug!(code, recoverable, details = %app.detailed_message(), "Command failed")
        }
        LogLevel::Warn => {
            tracing::warn!(code, recoverable, details = %app.detailed_message(), "Command failed")
        }
        LogLevel::Error => {
            tracing::error!(code, recoverable, details = %app.detailed_message(), "Command failed")
        }
    }

    eprintln!("error[{}]: {}", code, message);
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_failure(err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let command = match cli.command {
        Commands::Config { file, sub } => return run_config_command(&file, sub),
        command => command,
    };

    let config = load_config(cli.config.as_deref())?;

    match command {
        Commands::Validate { file } => {
            let data = read_input(&file)?;
            let validator = ImageValidator::new(ValidationPolicy::from_config(&config));
            print_json(&validator.validate(&data))?;
        }
        Commands::Metadata { file } => {
            let data = read_input(&file)?;
            let metadata = ImageProcessor::read_metadata(&data)
                .with_context(|| format!("Failed to read {} as an image", file.display()))?;
            print_json(&metadata)?;
        }
        Commands::Variants {
            file,
            out_dir,
            format,
            fit,
        } => {
            let data = Bytes::from(read_input(&file)?);
            let mut generator = VariantGenerator::from_config(&config)?;
            if let Some(format) = format {
                generator = generator.with_format(OutputFormat::parse(&format)?);
            }
            if let Some(fit) = fit {
                generator = generator.with_fit(FitMode::parse(&fit)?);
            }

            let variants = generator.generate(data).await?;

            let mut written = Vec::new();
            for (name, variant) in &variants {
                let path = derived_path(&file, name, variant.format.extension());
                let path = match &out_dir {
                    Some(dir) => dir.join(path.file_name().unwrap_or_default()),
                    None => path,
                };
                write_output(&path, &variant.data)?;
                written.push(WrittenFile {
                    path,
                    width: variant.width,
                    height: variant.height,
                    content_type: variant.content_type(),
                    size_bytes: variant.data.len(),
                });
            }
            print_json(&written)?;
        }
        Commands::Convert {
            file,
            format,
            quality,
            lossless,
            output,
        } => {
            let data = read_input(&file)?;
            let encode = EncodeOptions {
                lossless,
                ..EncodeOptions::with_quality(quality)
            };
            let encoded = ImageTransformer::convert(&data, &format, &encode)?;
            let output =
                output.unwrap_or_else(|| derived_path(&file, "converted", encoded.format.extension()));
            print_json(&write_encoded(output, &encoded)?)?;
        }
        Commands::Optimize {
            file,
            max,
            format,
            quality,
            output,
        } => {
            let data = read_input(&file)?;
            let mut options = WebOptimizeOptions::from_config(&config)?;
            if let Some(max) = max {
                (options.max_width, options.max_height) = parse_dimensions(&max)?;
            }
            if let Some(format) = format {
                options.format = OutputFormat::parse(&format)?;
            }
            if let Some(quality) = quality {
                options.quality = quality;
            }

            let encoded = ImageTransformer::optimize_for_web(&data, &options)?;
            let output =
                output.unwrap_or_else(|| derived_path(&file, "web", encoded.format.extension()));
            print_json(&write_encoded(output, &encoded)?)?;
        }
        Commands::Watermark {
            file,
            mark,
            position,
            opacity,
            size,
            margin,
            format,
            output,
        } => {
            let data = read_input(&file)?;
            let mark_data = read_input(&mark)?;

            let mut watermark = WatermarkConfig::from_config(&config)?;
            if let Some(position) = position {
                watermark.position = Gravity::parse(&position)?;
            }
            if let Some(opacity) = opacity {
                watermark.opacity = opacity;
            }
            if let Some(size) = size {
                watermark.size = parse_watermark_size(&size)?;
            }
            if let Some(margin) = margin {
                watermark.margin = margin;
            }

            let format = OutputFormat::parse(&format)?;
            let encoded = ImageTransformer::watermark(
                &data,
                &mark_data,
                &watermark,
                format,
                &EncodeOptions::default(),
            )?;
            let output =
                output.unwrap_or_else(|| derived_path(&file, "watermarked", format.extension()));
            print_json(&write_encoded(output, &encoded)?)?;
        }
        Commands::StripExif { file, output } => {
            let data = Bytes::from(read_input(&file)?);
            let original_bytes = data.len();
            let stripped = ImageProcessor::remove_exif(data);

            let extension = file
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("jpg")
                .to_lowercase();
            let output = output.unwrap_or_else(|| derived_path(&file, "clean", &extension));
            write_output(&output, &stripped)?;
            print_json(&serde_json::json!({
                "path": output,
                "original_bytes": original_bytes,
                "size_bytes": stripped.len(),
            }))?;
        }
        Commands::Process { file } => {
            let data = Bytes::from(read_input(&file)?);
            let filename = file
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("upload");

            let storage: Arc<dyn Storage> = Arc::new(
                LocalStorage::new(
                    config.local_storage_path.clone(),
                    config.local_storage_base_url.clone(),
                )
                .await
                .context("Failed to initialize local storage")?,
            );
            let validator = ImageValidator::new(ValidationPolicy::from_config(&config));
            let generator = VariantGenerator::from_config(&config)?;
            let options = UploadOptions::from_config(&config);

            let asset =
                upload_image(data, filename, &options, &validator, &generator, storage).await?;
            print_json(&asset)?;
        }
        // Handled before the pipeline settings are loaded
        Commands::Config { .. } => {}
    }

    Ok(())
}
