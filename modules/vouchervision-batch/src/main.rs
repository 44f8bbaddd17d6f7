use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vouchervision_batch::config::parse_concurrency;
use vouchervision_batch::{
    export, run_batch, source, Config, Progress, ProgressSink, RequestOptions, ResultRecord,
    Schedule, WorkItem,
};
use vouchervision_client::VoucherVisionClient;

#[derive(Parser)]
#[command(name = "vv-batch")]
#[command(about = "Batch-submit specimen images to the VoucherVision API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process image URLs listed in a .csv or .txt file
    Urls {
        /// CSV with a header row, or a text file with one URL per line
        file: PathBuf,

        /// CSV column holding the URLs (auto-detected when absent)
        #[arg(long, default_value = "url")]
        column: String,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Upload every image file under a directory
    Images {
        dir: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Check that the service is reachable
    Ping,
}

#[derive(Args)]
struct RunArgs {
    /// Engine to run; repeat for several
    #[arg(long = "engine", short = 'e', default_values = ["gemini-1.5-pro", "gemini-2.0-flash"])]
    engines: Vec<String>,

    /// Prompt template name
    #[arg(long)]
    prompt: Option<String>,

    /// Run OCR only, skip LLM parsing
    #[arg(long)]
    ocr_only: bool,

    /// Notebook mode (no collage; enables the Markdown export)
    #[arg(long)]
    notebook_mode: bool,

    /// Validate taxonomy against World Flora Online
    #[arg(long)]
    include_wfo: bool,

    /// LLM model used to parse the OCR text
    #[arg(long)]
    llm_model: Option<String>,

    /// Max requests in flight [env: VV_CONCURRENCY]
    #[arg(long, short, value_parser = parse_concurrency)]
    concurrency: Option<usize>,

    /// windowed or pool [env: VV_SCHEDULE]
    #[arg(long)]
    schedule: Option<Schedule>,

    /// Per-request timeout in seconds [env: VV_REQUEST_TIMEOUT_SECS]
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Directory for export files [env: VV_OUTPUT_DIR]
    #[arg(long, short)]
    output_dir: Option<PathBuf>,

    /// Skip writing export files
    #[arg(long)]
    no_export: bool,
}

impl RunArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(schedule) = self.schedule {
            config.schedule = schedule;
        }
        if let Some(secs) = self.timeout_secs.filter(|s| *s > 0) {
            config.request_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
    }

    fn request_options(&self) -> RequestOptions {
        RequestOptions {
            engines: self.engines.clone(),
            prompt: self.prompt.clone(),
            ocr_only: self.ocr_only,
            notebook_mode: self.notebook_mode,
            include_wfo: self.include_wfo,
            llm_model: self.llm_model.clone(),
            ..Default::default()
        }
    }
}

/// Drives an indicatif bar from driver progress.
struct BarProgress {
    bar: ProgressBar,
}

impl ProgressSink for BarProgress {
    fn on_progress(&self, progress: Progress, record: &ResultRecord) {
        self.bar.set_position(progress.completed as u64);
        if let Some(error) = record.error_message() {
            self.bar
                .println(format!("failed: {} ({error})", record.source_key()));
        }
        self.bar.set_message(record.source_key().to_string());
    }
}

/// Library crates log under `vouchervision_*`; this binary logs under
/// `vv_batch`.
fn log_filter(base: EnvFilter) -> Result<EnvFilter> {
    Ok(base
        .add_directive("vouchervision=info".parse()?)
        .add_directive("vv_batch=info".parse()?))
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(EnvFilter::from_default_env())?)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Command::Ping => ping(&config).await,
        Command::Urls { file, column, run } => {
            let items = source::load_url_list(&file, &column)?;
            if items.is_empty() {
                bail!("No URLs found in {}", file.display());
            }
            process(items, &run, config).await
        }
        Command::Images { dir, run } => {
            let files = source::scan_image_dir(&dir)?;
            let scanned = files.len();
            let items = source::select_image_files(files);
            if items.is_empty() {
                bail!("No image files found in {}", dir.display());
            }
            if items.len() < scanned {
                warn!(skipped = scanned - items.len(), "Skipping non-image files");
            }
            process(items, &run, config).await
        }
    }
}

async fn ping(config: &Config) -> Result<()> {
    let client = VoucherVisionClient::new(&config.base_url)?;
    let resp = client.cors_test().await?;
    info!(base_url = client.base_url(), response = %resp, "Service reachable");
    Ok(())
}

async fn process(items: Vec<WorkItem>, run: &RunArgs, mut config: Config) -> Result<()> {
    run.apply(&mut config);
    config.log_redacted();

    let options = config.authorize(run.request_options())?;
    options.validate()?;

    let client = VoucherVisionClient::new(&config.base_url)?;

    let bar = ProgressBar::new(items.len() as u64);
    bar.set_style(ProgressStyle::with_template(
        "{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} {wide_msg}",
    )?);
    let sink = BarProgress { bar: bar.clone() };

    let outcome = run_batch(items, &config.driver_config(), &client, &options, &sink).await;
    bar.finish_with_message("Processing complete");

    info!(
        processed = outcome.total_processed,
        succeeded = outcome.results.len(),
        failed = outcome.errors.len(),
        "Batch finished"
    );

    if run.no_export {
        return Ok(());
    }

    let written = export::write_exports(
        &outcome,
        &config.output_dir,
        &export::run_stamp(),
        options.notebook_mode,
    )?;
    for path in written {
        println!("{}", path.display());
    }

    Ok(())
}
