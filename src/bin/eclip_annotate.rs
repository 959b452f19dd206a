use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use eclip_annotator::app::{
    AnnotateOptions, App, FetchOptions, ProgressEvent, ProgressSink,
};
use eclip_annotator::config::ConfigLoader;
use eclip_annotator::encode::EncodeHttpClient;
use eclip_annotator::error::AnnotateError;
use eclip_annotator::output::JsonOutput;
use eclip_annotator::store::Store;

#[derive(Parser)]
#[command(name = "eclip-annotate")]
#[command(about = "Join ENCODE eCLIP peaks into the GENCODE transcripts that contain them")]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Download the selected eCLIP files and the GENCODE annotation")]
    Fetch(FetchArgs),
    #[command(about = "Run the full pipeline: fetch, load, join, write csv.gz")]
    Annotate(AnnotateArgs),
}

#[derive(Args)]
struct FetchArgs {
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    force: bool,

    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct AnnotateArgs {
    #[arg(long)]
    config: Option<String>,

    /// Annotate whatever the store already holds, without downloading.
    #[arg(long)]
    offline: bool,

    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<AnnotateError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &AnnotateError) -> u8 {
    match error {
        AnnotateError::MetadataNotFound(_)
        | AnnotateError::ConfigRead(_)
        | AnnotateError::ConfigParse(_)
        | AnnotateError::MissingColumn { .. } => 2,
        AnnotateError::EncodeHttp(_)
        | AnnotateError::EncodeStatus { .. }
        | AnnotateError::AnnotationNotFound(_) => 3,
        _ => 1,
    }
}

/// Progress events rendered as log lines on stderr.
struct StderrSink;

impl ProgressSink for StderrSink {
    fn event(&self, event: ProgressEvent) {
        tracing::info!("{}", event.message);
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Fetch(args) => {
            let config = ConfigLoader::resolve(args.config.as_deref())?;
            let app = build_app(&config)?;
            let result = app.fetch(
                &config,
                FetchOptions { force: args.force },
                &StderrSink,
            )?;
            if args.json {
                JsonOutput::print_fetch(&result).into_diagnostic()?;
            } else {
                println!(
                    "fetched {} file(s), {} already cached, {} failed, annotation: {}",
                    result.downloaded,
                    result.cached,
                    result.failed.len(),
                    result.annotation
                );
            }
            Ok(())
        }
        Commands::Annotate(args) => {
            let config = ConfigLoader::resolve(args.config.as_deref())?;
            let app = build_app(&config)?;
            let result = app.annotate(
                &config,
                AnnotateOptions {
                    offline: args.offline,
                },
                &StderrSink,
            )?;
            if args.json {
                JsonOutput::print_annotate(&result).into_diagnostic()?;
            } else {
                println!(
                    "annotated {} of {} experiment record(s) across {} transcript(s) -> {}",
                    result.annotated_records,
                    result.experiment_records,
                    result.features,
                    result.output_path
                );
            }
            Ok(())
        }
    }
}

fn build_app(
    config: &eclip_annotator::config::ResolvedConfig,
) -> miette::Result<App<EncodeHttpClient>> {
    let store = Store::new_with_root(config.data_dir.clone());
    let client = EncodeHttpClient::new()?;
    Ok(App::new(store, client))
}
