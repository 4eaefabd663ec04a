mod services;

use anyhow::Result;
use clap::Parser;
use service_locator::{InMemoryHosts, RegistryConfig, ServiceRegistry, TracingObserver};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::services::{Console, Greeter};

/// Wires a plain and a host-bound service through the registry and prints with them.
#[derive(Parser)]
#[command(name = "service-locator-demo")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a YAML file with a `service_registry` section
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Message to print through the console service
    #[arg(short, long, default_value = "Hello from the registry!")]
    message: String,

    /// Print effective registry configuration (JSON) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = RegistryConfig::load(cli.config.as_deref())?;
    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }
    tracing::info!(?config, "registry configuration loaded");

    let hosts = Arc::new(InMemoryHosts::new());
    let registry = ServiceRegistry::builder()
        .config(config)
        .host_objects(hosts.clone())
        .observer(Arc::new(TracingObserver))
        .build();

    // Eager registration: the greeter is configured here, not default-built.
    registry.register(Arc::new(Greeter::signed("composition root")))?;

    // Lazy, host-bound: the first lookup creates the host object and attaches the console.
    let console = registry.get::<Console>()?;
    tracing::info!(host = console.host().name(), "console resolved");
    let greeter = registry.get::<Greeter>()?;
    console.print(&greeter.greet(&cli.message));

    for host in hosts.host_objects() {
        let behaviors: Vec<String> = hosts
            .behaviors_of(host.id())
            .iter()
            .map(ToString::to_string)
            .collect();
        println!("host {} `{}`: {}", host.id(), host.name(), behaviors.join(", "));
    }

    registry.unregister::<Console>()?;
    tracing::info!(remaining = registry.len(), "console unregistered");
    Ok(())
}
