// ABOUTME: Command-line report generator built on the ensemble engine.
// ABOUTME: Runs one workflow through the quota-aware dispatcher and prints JSON.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ensemble::prelude::*;

#[derive(Debug, Parser)]
#[command(name = "report-cli", about = "Generate a multi-agent analysis report")]
struct Args {
    /// Investment strategy to analyze.
    #[arg(long)]
    strategy: String,

    /// Workflow to run: multi-factor or screening.
    #[arg(long, default_value = "multi-factor")]
    workflow: WorkflowKind,

    /// User the request is charged to.
    #[arg(long, default_value = "local")]
    user: String,

    /// Quota units available to the user.
    #[arg(long, default_value_t = 10)]
    quota: u64,

    /// TOML configuration file.
    #[arg(long, env = "ENSEMBLE_CONFIG")]
    config: Option<PathBuf>,

    /// Run as a background task and poll until it finishes.
    #[arg(long)]
    background: bool,

    /// Poll interval for background runs, in milliseconds.
    #[arg(long, default_value_t = 500)]
    poll_ms: u64,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, default_value = "warn")]
    log_filter: String,
}

fn init_tracing(log_filter: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {e}"))
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    config.apply_env()?;
    config.validate()?;
    Ok(config)
}

async fn build_dispatcher(config: &EngineConfig, quota: Arc<InMemoryQuota>) -> Result<Dispatcher> {
    let generator = config.generator()?;

    let registry = AgentRegistry::new();
    register_builtin(&registry).await?;

    let dependencies = Dependencies::new().with_text_generator(Arc::new(generator));
    let executor = Executor::new(registry, dependencies).with_config(config.executor_config());
    let coordinator = Coordinator::new(executor, config.coordinator_config());
    Ok(Dispatcher::new(coordinator, quota).with_config(config.dispatcher_config()))
}

async fn run_foreground(dispatcher: &Dispatcher, request: DispatchRequest) -> DispatchOutcome {
    let progress = progress_fn(|percent, message: &str| {
        eprintln!("[{:>3}%] {}", percent, message);
    });
    dispatcher.dispatch(request, &progress).await
}

async fn run_background(
    dispatcher: Dispatcher,
    request: DispatchRequest,
    poll: Duration,
) -> Result<TaskRecord> {
    let runner = TaskRunner::new(dispatcher, MemoryTaskStore::shared());
    let task_id = runner.submit(request).await?;
    eprintln!("Submitted task {}", task_id);

    let mut printed = 0;
    loop {
        let record = runner
            .status(&task_id)
            .await?
            .with_context(|| format!("task {} disappeared", task_id))?;
        for event in record.events.iter().skip(printed) {
            eprintln!("[{:>3}%] {} ({})", event.percent, event.message, event.at.to_rfc3339());
        }
        printed = record.events.len();

        if record.status.is_terminal() {
            return Ok(record);
        }
        tokio::time::sleep(poll).await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    init_tracing(&args.log_filter)?;

    let config = load_config(args.config.as_ref())?;
    let quota = Arc::new(InMemoryQuota::new().with_default_balance(args.quota));
    let dispatcher = build_dispatcher(&config, quota).await?;

    let mut input = Data::new();
    input.insert("strategy".to_string(), serde_json::json!(args.strategy));
    let request = DispatchRequest::new(args.user, args.workflow, input);

    if args.background {
        let record =
            run_background(dispatcher, request, Duration::from_millis(args.poll_ms)).await?;
        println!("{}", serde_json::to_string_pretty(&record)?);
        if record.status == TaskStatus::Failed {
            std::process::exit(1);
        }
    } else {
        let outcome = run_foreground(&dispatcher, request).await;
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        if !outcome.is_success() {
            std::process::exit(1);
        }
    }
    Ok(())
}
