mod progress;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use corpus_common::{PipelineConfig, StageReport};
use corpus_harvest::StageRunner;
use corpus_synth::{generate_batch, list_source_images, FontCaptioner, SynthSettings, Synthesizer};
use site_client::SiteClient;

use crate::progress::BarProgress;

const DEFAULT_CONFIG: &str = "./config/corpus.toml";

#[derive(Parser)]
#[command(name = "corpus", about = "Seasonal image corpus harvester and composite synthesizer")]
struct Cli {
    /// Path to config TOML file (defaults to ./config/corpus.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Harvest the season index from the archive page
    Index,
    /// Crawl season pages for new item links
    Links,
    /// Scrape every item's picture gallery
    Galleries,
    /// Download gallery images into the image store
    Download,
    /// Generate labeled composites from the image store
    Generate {
        /// Number of samples (overrides synth.sample_count)
        #[arg(long)]
        count: Option<usize>,
    },
    /// Run index, links, galleries and download in order
    All,
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("corpus=info,site_client=info"))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
    Ok(())
}

fn load_config(explicit: Option<&Path>) -> Result<PipelineConfig> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => {
            let fallback = PathBuf::from(DEFAULT_CONFIG);
            fallback.is_file().then_some(fallback)
        }
    };
    PipelineConfig::load(path.as_deref()).with_context(|| match &path {
        Some(p) => format!("Failed to load config {}", p.display()),
        None => "Invalid default configuration".to_string(),
    })
}

fn harvest_runner(config: &PipelineConfig) -> Result<StageRunner> {
    let client = SiteClient::new(&config.client_config()).context("Failed to build HTTP client")?;
    Ok(StageRunner::new(config.clone(), Arc::new(client)))
}

async fn generate(config: &PipelineConfig, count: Option<usize>) -> Result<StageReport> {
    let synth = &config.synth;
    let captioner = FontCaptioner::load(&synth.font_path, synth.primary_font_px, synth.secondary_font_px)
        .context("Caption font is required for synthesis")?;

    let sources = list_source_images(&config.paths.image_store).with_context(|| {
        format!("Failed to list image store {}", config.paths.image_store.display())
    })?;

    let synthesizer = Synthesizer::new(
        sources,
        Arc::new(captioner),
        SynthSettings::from(synth),
        &config.paths.generated_images,
        &config.paths.generated_labels,
    )?;

    let count = count.unwrap_or(synth.sample_count);
    let report = generate_batch(
        Arc::new(synthesizer),
        count,
        config.workers.synth,
        &BarProgress::new("generate"),
    )
    .await?;
    Ok(report)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json)?;

    let config = load_config(cli.config.as_deref())?;
    info!(command = ?cli.command, "corpus starting");

    let reports = match cli.command {
        Command::Index => vec![harvest_runner(&config)?.index(&BarProgress::new("index")).await?],
        Command::Links => vec![harvest_runner(&config)?.links(&BarProgress::new("links")).await?],
        Command::Galleries => {
            vec![harvest_runner(&config)?.galleries(&BarProgress::new("galleries")).await?]
        }
        Command::Download => {
            vec![harvest_runner(&config)?.download(&BarProgress::new("download")).await?]
        }
        Command::Generate { count } => {
            if count == Some(0) {
                bail!("--count must be at least 1");
            }
            vec![generate(&config, count).await?]
        }
        Command::All => harvest_runner(&config)?.run_all(BarProgress::boxed).await?,
    };

    for report in &reports {
        println!("{report}");
    }
    Ok(())
}
