//! Article swarm CLI.
//!
//! Turns a topic (or prepared notes) into a Dev.to article by running the
//! writer, illustrator and publisher workers under a handoff coordinator.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use swarm::coordinator::RunEvent;
use swarm::core::status::RunResult;
use swarm::core::transcript::latest_publication;
use swarm::exit_codes;
use swarm::io::config::{Credentials, SwarmConfig, load_config, write_config};
use swarm::io::input::resolve_request;
use swarm::io::run_log::{new_run_id, write_run_log};
use swarm::logging;
use swarm::pipeline::{build_coordinator, http_adapters};

#[derive(Parser, Debug)]
#[command(
    name = "article-swarm",
    version,
    about = "Write, illustrate and publish a Dev.to article with a worker swarm"
)]
struct Cli {
    /// Topic to write about.
    topic: Option<String>,
    /// Read article material from a file instead of a topic.
    #[arg(long, value_name = "PATH", conflicts_with_all = ["topic", "content"])]
    file: Option<PathBuf>,
    /// Article material passed inline.
    #[arg(long, conflicts_with = "topic")]
    content: Option<String>,
    /// Config file (defaults apply when missing).
    #[arg(long, default_value = ".swarm/config.toml")]
    config: PathBuf,
    /// Dotenv file read for keys not set in the environment.
    #[arg(long, value_name = "PATH", default_value = ".env")]
    env_file: PathBuf,
    /// Write the effective config (with any limit flags applied) and exit.
    #[arg(long)]
    init_config: bool,
    #[arg(long)]
    max_handoffs: Option<u32>,
    #[arg(long)]
    max_iterations: Option<u32>,
    /// Run-wide budget in seconds.
    #[arg(long, value_name = "SECS")]
    execution_timeout: Option<u64>,
    /// Per-invocation budget in seconds.
    #[arg(long, value_name = "SECS")]
    node_timeout: Option<u64>,
    /// Publish publicly instead of saving a draft.
    #[arg(long)]
    publish: bool,
    /// Skip writing the run log.
    #[arg(long)]
    no_run_log: bool,
    /// Log progress at info level (overridden by `RUST_LOG`).
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let code = match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32> {
    let mut config = load_config(&cli.config)
        .with_context(|| format!("load config {}", cli.config.display()))?;
    apply_overrides(&mut config, &cli);
    config
        .validate()
        .context("invalid configuration after command-line overrides")?;
    if cli.init_config {
        write_config(&cli.config, &config)
            .with_context(|| format!("write config {}", cli.config.display()))?;
        println!("Wrote {}", cli.config.display());
        return Ok(exit_codes::OK);
    }

    let request = resolve_request(
        cli.topic.as_deref(),
        cli.file.as_deref(),
        cli.content.as_deref(),
    )?;
    let credentials = Credentials::load(&cli.env_file)?;
    let adapters = http_adapters(&config, &credentials)?;
    let coordinator = build_coordinator(&config, adapters)?;

    let run_id = new_run_id();
    info!(run_id = %run_id, credentials = ?credentials, "starting run");
    println!("Run {run_id}: {}", coordinator.worker_names().join(" -> "));

    let result = coordinator.run_with(request, print_event).await;
    print_result(&result);

    if config.run_log.enabled {
        match write_run_log(&config.run_log.dir, &run_id, &result, coordinator.limits()) {
            Ok(paths) => println!("Run log: {}", paths.dir.display()),
            Err(err) => warn!(err = %format!("{err:#}"), "could not write run log"),
        }
    }
    Ok(exit_codes::for_status(result.status))
}

fn apply_overrides(config: &mut SwarmConfig, cli: &Cli) {
    if let Some(value) = cli.max_handoffs {
        config.limits.max_handoffs = value;
    }
    if let Some(value) = cli.max_iterations {
        config.limits.max_iterations = value;
    }
    if let Some(value) = cli.execution_timeout {
        config.limits.execution_timeout_secs = value;
    }
    if let Some(value) = cli.node_timeout {
        config.limits.node_timeout_secs = value;
    }
    if cli.publish {
        config.publish.draft = false;
    }
    if cli.no_run_log {
        config.run_log.enabled = false;
    }
}

fn print_event(event: &RunEvent) {
    match event {
        RunEvent::WorkerStarted {
            worker,
            iteration,
            budget,
        } => println!("[{iteration}] {worker} (budget {}s)", budget.as_secs()),
        RunEvent::WorkerFinished { worker, emitted } => {
            println!("    {worker} added {}", emitted.join(", "));
        }
        RunEvent::HandedOff {
            from,
            to,
            rationale,
        } => println!("    {from} -> {to}: {rationale}"),
        RunEvent::Finished { .. } => {}
    }
}

fn print_result(result: &RunResult) {
    println!();
    println!("Status: {}", result.status);
    println!("Workers: {}", result.node_history.join(" -> "));
    println!(
        "Iterations: {} (handoffs: {})",
        result.iterations, result.handoffs
    );
    println!("Elapsed: {} ms", result.elapsed_ms());
    if let Some(published) = latest_publication(result.transcript.view()) {
        if let Some(url) = &published.url {
            println!("Article: {url}");
        }
        if let Some(edit_url) = &published.edit_url {
            println!("Edit: {edit_url}");
        }
    }
    if let Some(failure) = &result.failure {
        println!("Error: {failure}");
    }
}
