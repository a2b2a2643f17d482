use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use annotator_common::{Config, PipelineInput};
use annotator_pipeline::{deps_from_config, AnnotateError, AnnotationPipeline, AnnotationService};

#[derive(Parser)]
#[command(name = "annotator", about = "Suggest a summary and tags for a bookmarked URL")]
struct Cli {
    /// Absolute http(s) URL to annotate
    url: String,

    /// Existing tag to prefer (repeatable). Not combinable with --fetch-tags
    #[arg(long = "tag", conflicts_with = "fetch_tags")]
    tags: Vec<String>,

    /// Free-text note attached to the bookmark
    #[arg(long)]
    context: Option<String>,

    /// Load existing tags from the bookmarking service
    #[arg(long)]
    fetch_tags: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = format!("{e:#}"), "annotation failed");
            eprintln!("error: {e:#}");
            match e.downcast_ref::<AnnotateError>() {
                Some(AnnotateError::Moderation { .. }) => ExitCode::from(3),
                Some(AnnotateError::InvalidInput(_)) => ExitCode::from(64),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("annotator=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env()?;
    info!(url = cli.url.as_str(), fetch_tags = cli.fetch_tags, "annotator starting");

    let suggestion = if cli.fetch_tags {
        if config.bookmark_api_base.is_none() || config.bookmark_token.is_none() {
            bail!("--fetch-tags needs BOOKMARK_API_BASE and BOOKMARK_TOKEN");
        }
        let service = AnnotationService::from_config(&config);
        service.annotate(&cli.url, cli.context).await?
    } else {
        let pipeline = AnnotationPipeline::new(deps_from_config(&config));
        let mut input = PipelineInput::new(cli.url).with_existing_tags(cli.tags);
        input.user_context = cli.context;
        pipeline.run(input).await?
    };

    println!("{}", serde_json::to_string_pretty(&suggestion)?);
    Ok(())
}
