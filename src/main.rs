//! Pages uploader CLI entrypoint.
//!
//! This is the main entrypoint for the pages-uploader command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use pages_uploader::cli::{Cli, Commands, OutputFormat, OutputFormatter};
use pages_uploader::config::{ConfigParser, ConfigValidator, UploaderConfig, find_config_file};
use pages_uploader::deploy::{Deployer, DeploymentPruner, collect_artifacts};
use pages_uploader::error::{ConfigError, DeployError, Result};
use pages_uploader::pages::{PagesApi, PagesClient};

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let formatter = OutputFormatter::new(cli.output);
    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", formatter.error(&e.to_string()));
            if e.is_transient() {
                eprintln!("This failure may be temporary; re-running the command is safe.");
            }
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);
    let config = cli.config.as_ref();

    match cli.command {
        Commands::Init { path, force } => cmd_init(&path, force, &formatter),
        Commands::Validate { warnings } => cmd_validate(config, warnings, &formatter),
        Commands::Plan { dir } => cmd_plan(config, dir, &formatter).await,
        Commands::Deploy { dir, concurrency } => {
            cmd_deploy(config, dir, concurrency, &formatter).await
        }
        Commands::Deployments => cmd_deployments(config, &formatter).await,
        Commands::Prune { yes } => cmd_prune(config, yes, cli.output, &formatter).await,
    }
}

/// Initialize a new uploader configuration.
fn cmd_init(path: &Path, force: bool, formatter: &OutputFormatter) -> Result<()> {
    info!("Initializing pages-uploader in: {}", path.display());

    let config_path = path.join("pages.deploy.yaml");
    let env_path = path.join(".env.example");
    let gitignore_path = path.join(".gitignore");

    // Check if files exist
    if !force && config_path.exists() {
        eprintln!(
            "{}",
            formatter.warning(&format!("Configuration file already exists: {}", config_path.display()))
        );
        eprintln!("Use --force to overwrite.");
        return Ok(());
    }

    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }

    std::fs::write(&config_path, include_str!("../templates/pages.deploy.yaml"))?;
    eprintln!("Created: {}", config_path.display());

    std::fs::write(&env_path, include_str!("../templates/.env.example"))?;
    eprintln!("Created: {}", env_path.display());

    // Write/update .gitignore
    if gitignore_path.exists() {
        let existing = std::fs::read_to_string(&gitignore_path)?;
        if !existing.lines().any(|line| line.trim() == ".env") {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&gitignore_path)?;
            writeln!(file, "\n# pages-uploader")?;
            writeln!(file, ".env")?;
            eprintln!("Updated: {}", gitignore_path.display());
        }
    } else {
        std::fs::write(&gitignore_path, ".env\n")?;
        eprintln!("Created: {}", gitignore_path.display());
    }

    eprintln!("\n{}", formatter.success("Project initialized"));
    eprintln!("Next steps:");
    eprintln!("  1. Copy .env.example to .env and set CLOUDFLARE_API_TOKEN");
    eprintln!("  2. Edit pages.deploy.yaml with your account ID and project name");
    eprintln!("  3. Run 'pages-uploader validate' to check your configuration");
    eprintln!("  4. Run 'pages-uploader plan' to see what will be uploaded");
    eprintln!("  5. Run 'pages-uploader deploy' to publish the site");

    Ok(())
}

/// Validate configuration.
fn cmd_validate(
    config_path: Option<&PathBuf>,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config_file = resolve_config_path(config_path)?;
    info!("Validating configuration: {}", config_file.display());

    let parser = ConfigParser::new().with_base_path(config_dir(&config_file));
    parser.load_dotenv()?;
    let config = parser.load_with_env(&config_file)?;

    let result = ConfigValidator::new().check(&config);
    println!("{}", formatter.format_validation(&result, show_warnings));

    if let Some(first) = result.errors.first() {
        return Err(ConfigError::validation(first.message.clone(), first.field.clone()).into());
    }

    if ConfigParser::get_api_key().is_err() {
        eprintln!(
            "{}",
            formatter.warning("CLOUDFLARE_API_TOKEN is not set; plan, deploy and prune will fail")
        );
    }

    Ok(())
}

/// Show which files would be uploaded.
async fn cmd_plan(
    config_path: Option<&PathBuf>,
    dir: Option<PathBuf>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, base_dir) = load_config(config_path)?;
    let site_dir = dir.unwrap_or_else(|| config.site_dir(&base_dir));
    let artifacts = collect_artifacts(&site_dir)?;

    let deployer = Deployer::new(create_api(&config)?);
    let plan = deployer.plan(&artifacts).await?;

    println!("{}", formatter.format_plan(&plan));
    Ok(())
}

/// Upload the site and create a deployment.
async fn cmd_deploy(
    config_path: Option<&PathBuf>,
    dir: Option<PathBuf>,
    concurrency: Option<usize>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, base_dir) = load_config(config_path)?;
    let site_dir = dir.unwrap_or_else(|| config.site_dir(&base_dir));
    info!("Deploying {} to project {}", site_dir.display(), config.project.name);

    let artifacts = collect_artifacts(&site_dir)?;
    let deployer = Deployer::new(create_api(&config)?)
        .with_concurrency(concurrency.unwrap_or(config.upload.concurrency));
    let report = deployer.deploy(&artifacts).await?;

    println!("{}", formatter.format_deploy_report(&report));
    Ok(())
}

/// List deployments.
async fn cmd_deployments(config_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<()> {
    let (config, _) = load_config(config_path)?;
    let deployments = DeploymentPruner::new(create_api(&config)?).list().await?;

    println!("{}", formatter.format_deployments(&deployments));
    Ok(())
}

/// Delete every deployment except the latest.
async fn cmd_prune(
    config_path: Option<&PathBuf>,
    auto_approve: bool,
    output: OutputFormat,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, _) = load_config(config_path)?;
    let pruner = DeploymentPruner::new(create_api(&config)?);

    let Some(plan) = pruner.plan().await? else {
        eprintln!("No deployments found for project {}.", config.project.name);
        return Ok(());
    };

    if plan.delete.is_empty() {
        eprintln!("Only the latest deployment ({}) exists. Nothing to prune.", plan.keep.id);
        return Ok(());
    }

    if output == OutputFormat::Text || !auto_approve {
        eprintln!("{}", formatter.format_prune_plan(&plan));
    }

    // Confirm
    if !auto_approve {
        eprint!("Delete {} deployment(s)? [y/N]: ", plan.delete.len());
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            eprintln!("Prune cancelled.");
            return Ok(());
        }
    }

    let report = pruner.execute(plan).await;
    println!("{}", formatter.format_prune_report(&report));

    if report.is_complete() {
        Ok(())
    } else {
        Err(DeployError::PruneIncomplete {
            failed: report.failed.into_iter().map(|f| f.id).collect(),
        }
        .into())
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Resolves the configuration file path.
fn resolve_config_path(config_path: Option<&PathBuf>) -> Result<PathBuf> {
    config_path.map_or_else(|| find_config_file("."), |path| Ok(path.clone()))
}

/// Directory holding the configuration file.
fn config_dir(config_file: &Path) -> PathBuf {
    config_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Loads and validates the configuration, returning it with its directory.
fn load_config(config_path: Option<&PathBuf>) -> Result<(UploaderConfig, PathBuf)> {
    let config_file = resolve_config_path(config_path)?;
    debug!("Loading configuration from: {}", config_file.display());

    let base_dir = config_dir(&config_file);
    let parser = ConfigParser::new().with_base_path(&base_dir);
    parser.load_dotenv()?;

    let config = parser.load_with_env(&config_file)?;
    let result = ConfigValidator::new().validate(&config)?;
    for warning in &result.warnings {
        warn!("{warning}");
    }

    Ok((config, base_dir))
}

/// Creates the Pages API client.
fn create_api(config: &UploaderConfig) -> Result<Arc<dyn PagesApi>> {
    let api_key = ConfigParser::get_api_key()?;
    Ok(Arc::new(PagesClient::from_config(config, &api_key)?))
}
