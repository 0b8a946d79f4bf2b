//! Metric model shared by projection, self-metrics and the formatter

use crate::error::TransformError;

/// Prometheus metric type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetricType {
    /// Gauge metric - a value that can go up and down
    #[default]
    Gauge,
    /// Counter metric - a monotonically increasing value
    Counter,
    /// Histogram metric - observations counted in buckets
    Histogram,
}

impl MetricType {
    /// Returns the Prometheus type string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Gauge => "gauge",
            MetricType::Counter => "counter",
            MetricType::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sample: name, positionally paired label names/values, value
///
/// Label names and values always have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    name: String,
    label_names: Vec<String>,
    label_values: Vec<String>,
    value: f64,
}

impl MetricSample {
    /// Create a sample, rejecting mismatched label sequences
    pub fn new<N, V>(
        name: impl Into<String>,
        label_names: N,
        label_values: V,
        value: f64,
    ) -> Result<Self, TransformError>
    where
        N: IntoIterator,
        N::Item: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        let name = name.into();
        let label_names: Vec<String> = label_names.into_iter().map(Into::into).collect();
        let label_values: Vec<String> = label_values.into_iter().map(Into::into).collect();

        if label_names.len() != label_values.len() {
            return Err(TransformError::LabelArity {
                name,
                names: label_names.len(),
                values: label_values.len(),
            });
        }

        Ok(Self {
            name,
            label_names,
            label_values,
            value,
        })
    }

    /// Create a sample without labels
    pub fn unlabeled(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            label_names: Vec::new(),
            label_values: Vec::new(),
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    pub fn label_values(&self) -> &[String] {
        &self.label_values
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Iterate `(name, value)` label pairs in order
    pub fn labels(&self) -> impl Iterator<Item = (&str, &str)> {
        self.label_names
            .iter()
            .map(String::as_str)
            .zip(self.label_values.iter().map(String::as_str))
    }

    /// Value of a single label, if present
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels().find(|(k, _)| *k == name).map(|(_, v)| v)
    }
}

/// A named group of samples sharing type and help text
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    pub name: String,
    pub metric_type: MetricType,
    pub help: String,
    pub samples: Vec<MetricSample>,
}

impl MetricFamily {
    pub fn new(name: impl Into<String>, metric_type: MetricType, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metric_type,
            help: help.into(),
            samples: Vec::new(),
        }
    }

    /// Add a sample (builder style)
    pub fn with_sample(mut self, sample: MetricSample) -> Self {
        self.samples.push(sample);
        self
    }
}

/// Metric families produced by one scrape cycle
///
/// Samples are grouped by family in first-seen order; within a family they
/// keep insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    families: Vec<MetricFamily>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample to the family `name`, creating the family on first use
    pub fn push(&mut self, name: &str, metric_type: MetricType, help: &str, sample: MetricSample) {
        match self.families.iter_mut().find(|f| f.name == name) {
            Some(family) => family.samples.push(sample),
            None => self
                .families
                .push(MetricFamily::new(name, metric_type, help).with_sample(sample)),
        }
    }

    /// Merge whole families, keeping grouping by name
    pub fn extend(&mut self, families: impl IntoIterator<Item = MetricFamily>) {
        for family in families {
            match self.families.iter_mut().find(|f| f.name == family.name) {
                Some(existing) => existing.samples.extend(family.samples),
                None => self.families.push(family),
            }
        }
    }

    pub fn families(&self) -> &[MetricFamily] {
        &self.families
    }

    pub fn into_families(self) -> Vec<MetricFamily> {
        self.families
    }

    /// Samples of the family `name`, empty if absent
    pub fn samples(&self, name: &str) -> &[MetricSample] {
        self.families
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.samples.as_slice())
            .unwrap_or(&[])
    }

    /// Total number of samples across families
    pub fn sample_count(&self) -> usize {
        self.families.iter().map(|f| f.samples.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sample_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_label_arity() {
        let err = MetricSample::new("m", ["a", "b"], ["1"], 1.0).unwrap_err();
        assert!(matches!(err, TransformError::LabelArity { names: 2, values: 1, .. }));
    }

    #[test]
    fn test_sample_labels_in_order() {
        let sample = MetricSample::new("m", ["z", "a"], ["1", "2"], 1.0).unwrap();
        let labels: Vec<(&str, &str)> = sample.labels().collect();
        assert_eq!(labels, vec![("z", "1"), ("a", "2")]);
        assert_eq!(sample.label("a"), Some("2"));
        assert_eq!(sample.label("missing"), None);
    }

    #[test]
    fn test_snapshot_groups_by_family() {
        let mut snapshot = Snapshot::new();
        snapshot.push("b", MetricType::Gauge, "B", MetricSample::unlabeled("b", 1.0));
        snapshot.push("a", MetricType::Gauge, "A", MetricSample::unlabeled("a", 1.0));
        snapshot.push("b", MetricType::Gauge, "B", MetricSample::unlabeled("b", 2.0));

        let names: Vec<&str> = snapshot.families().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(snapshot.samples("b").len(), 2);
        assert_eq!(snapshot.samples("b")[1].value(), 2.0);
        assert_eq!(snapshot.sample_count(), 3);
        assert!(snapshot.samples("c").is_empty());
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = Snapshot::new();
        assert!(snapshot.is_empty());
        assert!(snapshot.families().is_empty());
    }

    #[test]
    fn test_metric_type_display() {
        assert_eq!(MetricType::Gauge.to_string(), "gauge");
        assert_eq!(MetricType::Counter.as_str(), "counter");
        assert_eq!(MetricType::Histogram.as_str(), "histogram");
    }
}
