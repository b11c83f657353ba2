use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use labsight_knowledge::LabConfig;
use labsight_reasoning::{Model2Pipeline, PipelineTelemetry};
use labsight_runner::{record_failure, Model2Runner};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "model2", version, about = "Deterministic lab report reasoning (Model-2)")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyzes one CSV/JSON record and writes the Model-2 outputs.
    Run(RunArgs),
    /// Prints the knowledge graph edge table.
    ExplainGraph {
        /// Only show edges leaving this observation, e.g. `MCV_LOW`.
        #[arg(long)]
        observation: Option<String>,
        /// TOML overlay applied to the built-in catalogue.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Input record (.csv or .json).
    #[arg(long, short)]
    input: PathBuf,
    /// Directory receiving `model2_outputs/` and `error_log.txt`.
    #[arg(long, short)]
    output_dir: PathBuf,
    /// TOML overlay applied to the built-in catalogue.
    #[arg(long)]
    config: Option<PathBuf>,
    /// JSON-lines file for pipeline telemetry.
    #[arg(long)]
    log_path: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => handle_run(&args),
        Commands::ExplainGraph {
            observation,
            config,
        } => explain_graph(observation.as_deref(), config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<LabConfig> {
    match path {
        Some(path) => LabConfig::from_toml_path(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(LabConfig::builtin()),
    }
}

fn build_runner(args: &RunArgs) -> Result<Model2Runner> {
    let config = load_config(args.config.as_deref())?;
    let mut pipeline = Model2Pipeline::new(Arc::new(config))?;
    if let Some(log_path) = &args.log_path {
        let telemetry = PipelineTelemetry::builder("model2.pipeline")
            .log_path(log_path)
            .build()?;
        pipeline = pipeline.with_telemetry(telemetry);
    }
    Ok(Model2Runner::new(pipeline))
}

fn handle_run(args: &RunArgs) -> Result<()> {
    let runner = match build_runner(args) {
        Ok(runner) => runner,
        Err(err) => {
            if let Err(log_err) = record_failure(&args.input, &args.output_dir, &err) {
                tracing::error!(error = %log_err, "could not append to error log");
            }
            return Err(err);
        }
    };
    let artifacts = runner.run(&args.input, &args.output_dir)?;
    println!("{}", artifacts.json_path.display());
    println!("{}", artifacts.text_path.display());
    Ok(())
}

fn explain_graph(observation: Option<&str>, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let graph = config.knowledge_graph()?;
    let edges: Vec<_> = match observation {
        Some(token) => graph.query(token).collect(),
        None => graph.edges().iter().collect(),
    };
    if edges.is_empty() {
        println!("no edges for {}", observation.unwrap_or("<graph>"));
        return Ok(());
    }
    for edge in edges {
        println!(
            "{} --{} ({:.2})--> {}",
            edge.source, edge.relation, edge.weight, edge.target
        );
    }
    Ok(())
}
