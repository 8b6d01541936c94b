//! vkcaps - generate Vulkan capability tables and traversal code
//!
//! Reads the Vulkan registry once and writes the Rust registry module, the
//! native traversal header, and optionally a JSON dump of the model.

mod config;
mod run;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "vkcaps")]
#[command(about = "Vulkan registry capability table and traversal header generator")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "vkcaps.toml")]
    config: PathBuf,

    /// Registry document, overrides the configuration
    #[arg(short, long)]
    registry: Option<PathBuf>,

    /// Output path of the generated Rust module
    #[arg(long)]
    module: Option<PathBuf>,

    /// Output path of the generated traversal header
    #[arg(long)]
    header: Option<PathBuf>,

    /// Also write the derived model as JSON
    #[arg(long)]
    model_json: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Run every stage and print a summary without writing outputs
    #[arg(long)]
    check: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("vkcaps v{}", env!("CARGO_PKG_VERSION"));

    let mut config = config::load_config(&args.config)?;

    if let Some(registry) = args.registry {
        config.input.registry = registry;
    }
    if let Some(module) = args.module {
        config.output.module = module;
    }
    if let Some(header) = args.header {
        config.output.header = header;
    }
    if args.model_json.is_some() {
        config.output.model_json = args.model_json;
    }

    info!(
        registry = %config.input.registry.display(),
        platform = %config.rules.supported_platform,
        "Configuration loaded"
    );

    let summary = run::run(&config, !args.check)?;

    if args.check {
        println!("Registry {} is consistent:", config.input.registry.display());
        println!("  structs emitted:      {}", summary.structs);
        println!("  disabled names:       {}", summary.disabled);
        println!("  reportable structs:   {}", summary.reportable);
        println!("  core groups:          {}", summary.core_groups);
        println!("  feature versions:     {}", summary.features);
        println!("  extensions:           {}", summary.extensions);
        println!("  version independent:  {}", summary.independent);
        println!("  module size:          {} bytes", summary.module_bytes);
        println!("  header size:          {} bytes", summary.header_bytes);
    } else {
        info!(
            module = %config.output.module.display(),
            header = %config.output.header.display(),
            "Generation complete"
        );
    }

    Ok(())
}
