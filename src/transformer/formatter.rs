//! Prometheus Exposition Format output
//!
//! This module handles formatting of metric families into the text
//! exposition format (version 0.0.4).
//!
//! # Format Specification
//!
//! ```text
//! # HELP <metric_name> <help_text>
//! # TYPE <metric_name> <type>
//! <metric_name>{<label1>="<value1>",<label2>="<value2>"} <value>
//! ```

use std::fmt::Write;

use super::metric::{MetricFamily, MetricSample};

/// Content type served for the text exposition format
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Prometheus exposition format formatter
///
/// # Example
///
/// ```ignore
/// use eureka_exporter::transformer::{MetricFamily, MetricSample, MetricType, PrometheusFormatter};
///
/// let family = MetricFamily::new("eureka_nodes_info", MetricType::Gauge, "Registered nodes")
///     .with_sample(MetricSample::new("eureka_nodes_info", ["status"], ["UP"], 1.0)?);
///
/// let output = PrometheusFormatter::new().format(&[family]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PrometheusFormatter;

impl PrometheusFormatter {
    /// Create a new formatter
    pub fn new() -> Self {
        Self
    }

    /// Format metric families into Prometheus exposition format
    ///
    /// # Notes
    ///
    /// - HELP and TYPE lines are emitted once per family, families with no
    ///   samples are skipped
    /// - Labels keep the order they were declared in
    pub fn format(&self, families: &[MetricFamily]) -> String {
        let mut output = String::with_capacity(families.len() * 256);

        for family in families.iter().filter(|f| !f.samples.is_empty()) {
            if !family.help.is_empty() {
                let _ = writeln!(
                    output,
                    "# HELP {} {}",
                    family.name,
                    Self::escape_help(&family.help)
                );
            }
            let _ = writeln!(output, "# TYPE {} {}", family.name, family.metric_type.as_str());

            for sample in &family.samples {
                output.push_str(&Self::format_sample_line(sample));
                output.push('\n');
            }
        }

        output
    }

    /// Format a single sample line
    fn format_sample_line(sample: &MetricSample) -> String {
        let mut line = sample.name().to_string();

        if !sample.label_names().is_empty() {
            let label_pairs: Vec<String> = sample
                .labels()
                .map(|(k, v)| format!("{}=\"{}\"", k, Self::escape_label_value(v)))
                .collect();

            line.push('{');
            line.push_str(&label_pairs.join(","));
            line.push('}');
        }

        line.push(' ');
        line.push_str(&Self::format_value(sample.value()));
        line
    }

    /// Format a numeric value for Prometheus
    ///
    /// - NaN → "NaN"
    /// - +Inf → "+Inf"
    /// - -Inf → "-Inf"
    /// - Integers are formatted without decimal point
    fn format_value(value: f64) -> String {
        if value.is_nan() {
            "NaN".to_string()
        } else if value.is_infinite() {
            if value.is_sign_positive() {
                "+Inf".to_string()
            } else {
                "-Inf".to_string()
            }
        } else if value.fract() == 0.0 && value.abs() < 1e15 {
            format!("{}", value as i64)
        } else {
            format!("{}", value)
        }
    }

    /// Escape help text
    ///
    /// Escapes backslash and newline characters.
    fn escape_help(help: &str) -> String {
        help.replace('\\', "\\\\").replace('\n', "\\n")
    }

    /// Escape label value
    ///
    /// Escapes backslash, double-quote, and newline characters.
    fn escape_label_value(value: &str) -> String {
        let mut escaped = String::with_capacity(value.len());
        for c in value.chars() {
            match c {
                '\\' => escaped.push_str("\\\\"),
                '"' => escaped.push_str("\\\""),
                '\n' => escaped.push_str("\\n"),
                _ => escaped.push(c),
            }
        }
        escaped
    }
}
