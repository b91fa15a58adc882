use anyhow::Context;
use clap::{Parser, Subcommand};
use imghost_core::{CoreConfig, ImageCatalog};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Bytes read from the head of a file to detect its media type
const SNIFF_LEN: u64 = 8192;

#[derive(Parser)]
#[command(name = "imghost")]
#[command(about = "Image host catalog CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Store an image file in the catalog
    Store {
        /// Image file to upload
        file: PathBuf,
        /// Name to store the image under (defaults to the filename stem)
        #[arg(long)]
        name: Option<String>,
        /// Media type of the file (detected from its content when omitted)
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Print the stored path of an image
    Get {
        /// Image id, or name with `--by name`
        key: String,
        /// Lookup selector: id or name
        #[arg(long, default_value = "id")]
        by: String,
    },
    /// Delete an image and its file
    Delete {
        /// Image id
        id: String,
    },
    /// List every stored image
    List,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("imghost_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Use --help to see available commands");
        return Ok(());
    };

    let cfg = CoreConfig::from_env_values(
        std::env::var("IMGHOST_STORAGE_DIR").ok(),
        std::env::var("IMGHOST_DATABASE_PATH").ok(),
        std::env::var("IMGHOST_BUSY_TIMEOUT_MS").ok(),
        std::env::var("IMGHOST_MAX_UPLOAD_BYTES").ok(),
    )?;
    let catalog = ImageCatalog::open(&cfg)?;

    match command {
        Commands::Store {
            file,
            name,
            content_type,
        } => {
            let content_type = match content_type {
                Some(t) => t,
                None => detect_content_type(&file)?,
            };
            let original_filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let content =
                File::open(&file).with_context(|| format!("opening {}", file.display()))?;

            let id = catalog.store(content, &content_type, &original_filename, name.as_deref())?;
            println!("Stored {} with id: {}", file.display(), id);
        }
        Commands::Get { key, by } => {
            let path = catalog.resolve_by(&key, &by)?;
            println!("{}", path.display());
        }
        Commands::Delete { id } => {
            catalog.delete(&id)?;
            println!("Deleted image: {}", id);
        }
        Commands::List => {
            let records = catalog.list_all()?;
            if records.is_empty() {
                println!("No images found.");
            } else {
                for record in records {
                    println!(
                        "ID: {}, Name: {}, Path: {}, Original: {}",
                        record.id,
                        record.name,
                        record.path.display(),
                        record.original_name
                    );
                }
            }
        }
    }

    Ok(())
}

/// Detects the media type of `path` from its leading bytes.
///
/// Unrecognised content is reported as `application/octet-stream`, which the catalog rejects.
fn detect_content_type(path: &Path) -> anyhow::Result<String> {
    let mut head = Vec::new();
    File::open(path)
        .with_context(|| format!("opening {}", path.display()))?
        .take(SNIFF_LEN)
        .read_to_end(&mut head)
        .with_context(|| format!("reading {}", path.display()))?;

    Ok(infer::get(&head)
        .map(|kind| kind.mime_type())
        .unwrap_or("application/octet-stream")
        .to_string())
}
