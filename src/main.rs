//! CoverCheck - publish per-target test coverage as a GitHub check run
//!
//! A CLI tool meant to run as a CI step: it merges the coverage reports
//! produced for each build target and attaches the result to the
//! triggering commit as a check run.
//!
//! Exit codes:
//!   0 - Check run completed (also when coverage reports could not be read)
//!   1 - Fatal error (bad arguments, no commit to attach to, GitHub API failure)

mod analysis;
mod checks;
mod cli;
mod config;
mod models;
mod orchestrator;
mod repo;
mod report;
mod scanner;

use anyhow::{Context, Result};
use checks::{ClientConfig, GitHubChecksClient};
use cli::Args;
use config::{Config, DEFAULT_CONFIG_FILE};
use orchestrator::RunSettings;
use repo::Invocation;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("CoverCheck v{}", env!("CARGO_PKG_VERSION"));
    debug!("Dry run: {}, path: {:?}", args.dry_run, args.path);

    match run_check(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Coverage check failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .covercheck.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", DEFAULT_CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the coverage check. Returns the process exit code.
async fn run_check(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate().context("Invalid configuration")?;

    let settings = RunSettings {
        name: args.check_name().to_string(),
        coverage_path: args.coverage_path(),
        loader: scanner::LoaderConfig::from(&config.reports),
        title: config.check.title.clone(),
        annotation_path: config.check.annotation_path.clone(),
    };

    if args.dry_run {
        return handle_dry_run(&settings);
    }

    // Read the trigger once; everything below receives it explicitly
    let invocation = Invocation::from_env().context("Failed to read the trigger context")?;

    let client = GitHubChecksClient::new(ClientConfig {
        api_url: config.github.api_url.clone(),
        token: args.effective_token().unwrap_or_default(),
        timeout_seconds: config.github.timeout_seconds,
    })?;

    let outcome = orchestrator::run(&settings, &invocation, &client).await;
    let code = orchestrator::exit_code(&outcome);
    let outcome = outcome?;

    if outcome.result.failed {
        warn!(
            "Check run {} completed as {}: coverage reports could not be processed",
            outcome.check_run_id, outcome.conclusion
        );
    } else {
        info!(
            "Check run {} completed as {} ({} target(s))",
            outcome.check_run_id,
            outcome.conclusion,
            outcome.result.per_target.len()
        );
    }

    Ok(code)
}

/// Handle --dry-run: load and aggregate, print the result, exit.
fn handle_dry_run(settings: &RunSettings) -> Result<i32> {
    println!(
        "🔍 Dry run: reading coverage from {} (no GitHub calls)...\n",
        settings.coverage_path.display()
    );

    let result = orchestrator::collect_result(settings);
    let output = report::render_output(&result, &settings.title);

    println!("{}\n", output.title);
    println!("{}", output.summary);
    if let Some(ref text) = output.text {
        println!("\n{}", text);
    }
    debug!("Result: {}", report::render_json(&result)?);

    println!("\n✅ Dry run complete. Conclusion would be: {}", result.conclusion());
    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
