use anyhow::Result;
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use runtime::{AppConfig, AppConfigProvider, CliArgs};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use ui_modkit::{ConfigProvider, ModuleCtxBuilder, ModuleRegistry};

mod modules;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// UI Shell - composes the application out of discovered UI modules
#[derive(Parser)]
#[command(name = "ui-shell")]
#[command(about = "UI Shell - composes the application out of discovered UI modules")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List modules in display order (no root is constructed)
    List,
    /// Register all modules, then build the root view-models of the given modules
    Activate {
        /// Module ids
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Check configuration and module set
    Check,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.clone().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.shell.home_dir));
    tracing::info!(title = %config.shell.title, "UI Shell starting");

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let provider: Arc<dyn ConfigProvider> = Arc::new(AppConfigProvider::new(config.clone()));
    let registry = ModuleRegistry::discover_and_build(Some(provider.clone()))?;

    match cli.command.unwrap_or(Commands::List) {
        Commands::List => list_modules(&registry),
        Commands::Activate { ids } => activate_modules(&registry, provider, &ids),
        Commands::Check => check_config(&config, &registry),
    }
}

fn list_modules(registry: &ModuleRegistry) -> Result<()> {
    for m in registry.modules() {
        println!(
            "{:>5}  {:<12} {:<16} {}",
            m.order(),
            m.id(),
            m.name(),
            m.root_model_type().short_name()
        );
    }
    Ok(())
}

fn activate_modules(
    registry: &ModuleRegistry,
    provider: Arc<dyn ConfigProvider>,
    ids: &[String],
) -> Result<()> {
    let ctx = ModuleCtxBuilder::new()
        .with_config_provider(provider)
        .build();
    registry.run_register_phase(&ctx)?;

    for id in ids {
        registry.activate(id)?;
        match modules::describe_root(registry, id) {
            Some(summary) => println!("activated {id}: {summary}"),
            None => println!("activated {id}"),
        }
    }

    // Session end: release every cached root.
    registry.clear_all();
    tracing::info!("all roots cleared");
    Ok(())
}

fn check_config(config: &AppConfig, registry: &ModuleRegistry) -> Result<()> {
    tracing::info!("Checking configuration...");

    for id in config.modules.keys() {
        if registry.get(id).is_none() {
            tracing::warn!(module = %id, "configuration section for unknown module");
            println!("warning: no module '{id}' for configuration section");
        }
    }
    println!("Configuration check passed ({} modules)", registry.len());
    println!("{}", config.to_yaml()?);
    Ok(())
}
