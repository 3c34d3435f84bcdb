//! docpreview command-line interface.
//!
//! ```bash
//! docpreview serve -H 0.0.0.0 -p 8000
//! docpreview convert report.docx -o /tmp/report.pdf
//! docpreview formats --format json
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use docpreview::{FormatRegistry, PreviewConfig, Previewer, SupportedFormat};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "docpreview")]
#[command(version, about = "Render office documents to PDF previews", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP preview server
    Serve {
        /// Address to bind to
        #[arg(short = 'H', long, env = "DOCPREVIEW_HOST", default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(short, long, env = "DOCPREVIEW_PORT", default_value_t = 8000)]
        port: u16,

        /// Config file (TOML, YAML or JSON); discovered from the working directory when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Convert a single file to PDF
    Convert {
        /// Document to convert
        input: PathBuf,

        /// Output path (default: <input stem>.pdf next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Config file (TOML, YAML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List supported extensions per family
    Formats {
        /// Config file (TOML, YAML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

fn load_config(path: Option<&Path>) -> Result<PreviewConfig> {
    match path {
        Some(path) => PreviewConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(PreviewConfig::discover()
            .context("Failed to discover config file")?
            .unwrap_or_default()),
    }
}

fn default_output_path(input: &Path, display_name: &str) -> PathBuf {
    input
        .parent()
        .map(|dir| dir.join(display_name))
        .unwrap_or_else(|| PathBuf::from(display_name))
}

async fn convert(input: PathBuf, output: Option<PathBuf>, config: PreviewConfig) -> Result<()> {
    let previewer = Previewer::with_libreoffice(config).context("Invalid configuration")?;

    let result = previewer
        .convert_file(&input)
        .await
        .with_context(|| format!("Failed to convert {}", input.display()))?;

    let dest = output.unwrap_or_else(|| default_output_path(&input, &result.display_name));
    let written = result
        .persist_to(&dest)
        .await
        .with_context(|| format!("Failed to write {}", dest.display()))?;

    println!("{} ({} bytes)", dest.display(), written);
    Ok(())
}

fn print_formats(config: PreviewConfig, format: OutputFormat) -> Result<()> {
    config.validate().context("Invalid configuration")?;
    let registry = FormatRegistry::from_config(&config.formats);

    match format {
        OutputFormat::Json => {
            let map: serde_json::Map<String, serde_json::Value> = SupportedFormat::ALL
                .iter()
                .map(|family| (family.as_str().to_string(), serde_json::json!(registry.extensions(*family))))
                .collect();
            println!("{}", serde_json::to_string_pretty(&map)?);
        }
        OutputFormat::Text => {
            for family in SupportedFormat::ALL {
                println!("{:<13} {}", family.as_str(), registry.extensions(family).join(", "));
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { host, port, config } => {
            let config = load_config(config.as_deref())?;
            tracing::debug!("Serving with config: {:?}", config);
            let limits = docpreview::api::parse_size_limits_from_env();
            docpreview::api::serve_with_config_and_limits(host, port, config, limits)
                .await
                .context("Server failed")?;
        }
        Commands::Convert { input, output, config } => {
            let config = load_config(config.as_deref())?;
            convert(input, output, config).await?;
        }
        Commands::Formats { config, format } => {
            let config = load_config(config.as_deref())?;
            print_formats(config, format)?;
        }
    }

    Ok(())
}
