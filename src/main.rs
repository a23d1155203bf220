//! piperun CLI - submit pipelines to Grid Engine

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use piperun::{
    ArrayRun, DryRunSubmitter, FixSuggestion, PartitionIndex, PipeConfig, PipeError, Pipeline,
    QsubSubmitter, Submit, SweepMode,
};

#[derive(Parser)]
#[command(name = "piperun")]
#[command(about = "piperun - compose Grid Engine jobs into dependency pipelines")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/piperun/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a pipeline file
    Submit {
        /// Path to the pipeline YAML
        file: PathBuf,

        /// Print the command lines instead of calling qsub
        #[arg(long)]
        dry_run: bool,
    },

    /// Check a pipeline file without submitting anything
    Validate {
        /// Path to the pipeline YAML
        file: PathBuf,

        /// Print the job plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run this array task's share of a sweep (started by the scheduler)
    #[command(name = "array-run")]
    ArrayRun {
        /// Cross the slots instead of zipping them
        #[arg(long)]
        product: bool,

        /// `-1 v… [-2 v…] -- command {1} {2}`
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        args: Vec<String>,
    },
}

fn main() {
    // stdout carries status lines; logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Submit { file, dry_run } => load_config(cli.config.as_deref())
            .and_then(|config| submit_pipeline(&file, &config, dry_run))
            .map(|_| 0),
        Commands::Validate { file, json } => load_config(cli.config.as_deref())
            .and_then(|config| validate_pipeline(&file, &config, json))
            .map(|_| 0),
        Commands::ArrayRun { product, args } => array_run(&args, product),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            if let Some(suggestion) = e.downcast_ref::<PipeError>().and_then(|p| p.fix_suggestion())
            {
                eprintln!("  {} {}", "Fix:".yellow(), suggestion);
            }
            std::process::exit(1);
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PipeConfig> {
    let config = match path {
        Some(p) => PipeConfig::load_from(p)?,
        None => PipeConfig::load()?,
    };
    Ok(config.with_env())
}

fn submit_pipeline(file: &Path, config: &PipeConfig, dry_run: bool) -> anyhow::Result<()> {
    let pipeline = Pipeline::load(file)?;
    let mut root = pipeline.build(config)?;

    if dry_run {
        let mut submitter = DryRunSubmitter::default();
        root.submit(&mut submitter)?;
        println!("{}", "Dry run, nothing was submitted:".cyan().bold());
        for argv in submitter.calls() {
            println!("  {}", argv.join(" ").dimmed());
        }
    } else {
        let mut submitter = QsubSubmitter::new(config.qsub_program());
        root.submit(&mut submitter)?;
    }
    Ok(())
}

fn validate_pipeline(file: &Path, config: &PipeConfig, as_json: bool) -> anyhow::Result<()> {
    let pipeline = Pipeline::load(file)?;
    let root = pipeline.build(config)?;
    let jobs = root.jobs();

    if as_json {
        let plan: Vec<_> = jobs
            .iter()
            .map(|job| {
                json!({
                    "name": job.name(),
                    "command": job.command(),
                    "args": job.args(),
                    "array": job.options().array,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!("{} Pipeline '{}' is valid", "✓".green(), file.display());
    println!("  Jobs: {}", jobs.len());
    for job in jobs {
        let kind = match &job.options().array {
            Some(range) => format!("array {}", range),
            None => "single".to_string(),
        };
        println!("  - {} ({})", job.name(), kind);
    }
    Ok(())
}

fn array_run(args: &[String], product: bool) -> anyhow::Result<i32> {
    let mode = if product {
        SweepMode::Product
    } else {
        SweepMode::Zip
    };
    let run = ArrayRun::parse(args, mode)?;
    Ok(run.run(PartitionIndex::from_env())?)
}
