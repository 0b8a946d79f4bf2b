//! CLI argument parsing for eureka-exporter
//!
//! This module provides the command-line interface using clap derive macros.
//!
//! # Options
//!
//! - `--config` / `-c`: Registry YAML file path (default: application.yml, env: EUREKA_EXPORTER_CONFIG)
//! - `--port` / `-p`: Exporter listen port (overrides config file, env: EUREKA_EXPORTER_PORT)
//! - `--bind-address`: Exporter bind address (env: EUREKA_EXPORTER_BIND_ADDRESS)
//! - `--metrics-path`: Metrics endpoint path (env: EUREKA_EXPORTER_METRICS_PATH)
//! - `--validate`: Validate configuration without starting server
//! - `--dry-run`: Run one scrape cycle and print the result
//! - `--log-level` / `-l`: Log level (trace/debug/info/warn/error, env: EUREKA_EXPORTER_LOG_LEVEL)
//! - `--log-format`: Log output format (text/json, env: EUREKA_EXPORTER_LOG_FORMAT)
//! - `--output-format`: Output format for validate (text/json/yaml)
//!
//! # Precedence
//!
//! Configuration values are resolved in the following order (highest to lowest priority):
//! 1. CLI arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::Config;

/// eureka-exporter - Prometheus exporter for Eureka registry clusters
///
/// Reads the registry's own application.yml, scrapes the local node
/// listing and every configured cluster member, and exports the result
/// in Prometheus format.
#[derive(Parser, Debug)]
#[command(name = "eureka-exporter")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the registry configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "application.yml",
        env = "EUREKA_EXPORTER_CONFIG"
    )]
    pub config: PathBuf,

    /// Exporter listen port (overrides config file)
    #[arg(short, long, value_name = "PORT", env = "EUREKA_EXPORTER_PORT")]
    pub port: Option<u16>,

    /// Exporter bind address (overrides config file)
    /// Supported values: IP addresses (0.0.0.0, 127.0.0.1, ::1) or "localhost"
    #[arg(long, value_name = "ADDRESS", env = "EUREKA_EXPORTER_BIND_ADDRESS")]
    pub bind_address: Option<String>,

    /// Metrics endpoint path (overrides config file)
    /// Must start with '/' and not conflict with '/' or '/health'
    #[arg(long, value_name = "PATH", env = "EUREKA_EXPORTER_METRICS_PATH")]
    pub metrics_path: Option<String>,

    /// Validate configuration without starting server
    #[arg(long)]
    pub validate: bool,

    /// Run a single scrape cycle and print the exposition text
    #[arg(long)]
    pub dry_run: bool,

    /// Log level
    #[arg(
        short,
        long,
        value_enum,
        default_value = "info",
        env = "EUREKA_EXPORTER_LOG_LEVEL"
    )]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "text",
        env = "EUREKA_EXPORTER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// Output format for --validate
    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,
}

impl Cli {
    /// Apply command-line overrides on top of a loaded configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(ref bind_address) = self.bind_address {
            config.server.bind_address = bind_address.clone();
        }
        if let Some(ref path) = self.metrics_path {
            config.server.path = path.clone();
        }
    }
}

/// Log level options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Trace level - most verbose
    Trace,
    /// Debug level
    Debug,
    /// Info level - default
    Info,
    /// Warn level
    Warn,
    /// Error level - least verbose
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Log output format
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Output format options for validate mode
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Yaml => write!(f, "yaml"),
        }
    }
}
