//! eureka-exporter - Prometheus exporter for Eureka registry clusters
//!
//! This binary serves a Prometheus-compatible metrics endpoint that
//! scrapes the local registry and its cluster members on every pull.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use eureka_exporter::cli::{Cli, OutputFormat};
use eureka_exporter::collector::EurekaCollector;
use eureka_exporter::config::Config;
use eureka_exporter::server;
use eureka_exporter::transformer::PrometheusFormatter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    eureka_exporter::init_logging(&cli.log_level.to_string(), cli.log_format)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting eureka-exporter"
    );

    let mut config = Config::load_or_default(&cli.config)?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    if cli.validate {
        return print_config(&config, cli.output_format);
    }

    if cli.dry_run {
        return dry_run(config).await;
    }

    server::run(config).await
}

fn print_config(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("Configuration is valid");
            println!("  enabled: {}", config.eureka.enabled);
            println!("  cluster name: {}", config.eureka.cluster_name);
            println!("  members: {}", config.eureka.cluster.len());
            println!(
                "  listen: {}:{}{}",
                config.server.bind_address, config.server.port, config.server.path
            );
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(config)?),
    }
    Ok(())
}

async fn dry_run(config: Config) -> Result<()> {
    let collector = EurekaCollector::new(config.eureka);
    let snapshot = collector.collect().await;

    print!("{}", PrometheusFormatter::new().format(snapshot.families()));
    println!("Dry run completed: {} samples", snapshot.sample_count());
    Ok(())
}
