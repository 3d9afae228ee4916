//! Observation model and Prometheus text exposition rendering.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

/// Prometheus metric type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Monotonically increasing value.
    Counter,
    /// Value that can go up or down.
    Gauge,
}

impl MetricKind {
    /// The type name used in `# TYPE` comments.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
        }
    }
}

/// A single metric sample produced by a scraper or by the exporter itself.
#[derive(Debug, Clone)]
pub struct Observation {
    /// Full Prometheus metric name.
    pub name: String,
    /// One-line help text for the `# HELP` comment.
    pub help: String,
    /// Label key-value pairs. Keys are unique within one observation.
    pub labels: Vec<(String, String)>,
    /// The sampled value.
    pub value: f64,
    /// Metric type.
    pub kind: MetricKind,
}

impl Observation {
    /// Create a gauge observation.
    pub fn gauge(name: impl Into<String>, help: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            labels: Vec::new(),
            value,
            kind: MetricKind::Gauge,
        }
    }

    /// Create a counter observation.
    pub fn counter(name: impl Into<String>, help: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            labels: Vec::new(),
            value,
            kind: MetricKind::Counter,
        }
    }

    /// Add a label to this observation.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push((key.into(), value.into()));
        self
    }
}

/// Serialized accumulation point for one scraper invocation.
///
/// Each scraper gets a fresh sink per request. `emit` pushes immediately so
/// scrapers stream large result sets row by row; the mutex serializes
/// concurrent writers and emission order is preserved per sink.
#[derive(Clone, Default)]
pub struct ObservationSink {
    buf: Arc<Mutex<Vec<Observation>>>,
}

impl ObservationSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push one observation into the sink.
    pub fn emit(&self, obs: Observation) {
        self.buf.lock().push(obs);
    }

    /// Number of observations emitted so far.
    pub fn len(&self) -> usize {
        self.buf.lock().len()
    }

    /// Whether nothing has been emitted yet.
    pub fn is_empty(&self) -> bool {
        self.buf.lock().is_empty()
    }

    /// Drain the accumulated observations.
    pub fn take(&self) -> Vec<Observation> {
        std::mem::take(&mut *self.buf.lock())
    }
}

/// Sanitize a metric name component to be Prometheus-compatible.
///
/// Metric names must match `[a-zA-Z_:][a-zA-Z0-9_:]*`. Invalid characters
/// are replaced with underscores, runs of underscores are collapsed, and a
/// leading digit is prefixed with an underscore.
pub fn sanitize_metric_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 1);
    let mut last_was_underscore = false;

    if name.starts_with(|c: char| c.is_ascii_digit()) {
        result.push('_');
        last_was_underscore = true;
    }

    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == ':' {
            result.push(c);
            last_was_underscore = false;
        } else if !last_was_underscore {
            result.push('_');
            last_was_underscore = true;
        }
    }

    while result.ends_with('_') {
        result.pop();
    }

    if result.is_empty() {
        result.push_str("unnamed");
    }

    result
}

/// Escape special characters in label values.
fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape special characters in help text.
fn escape_help(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Format a floating point value for Prometheus.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

/// Format sorted labels for the exposition format.
fn format_labels(labels: &[(String, String)]) -> String {
    if labels.is_empty() {
        return String::new();
    }

    let mut sorted: Vec<&(String, String)> = labels.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let parts: Vec<String> = sorted
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
        .collect();

    format!("{{{}}}", parts.join(","))
}

/// Render observations in Prometheus text exposition format 0.0.4.
///
/// Samples are grouped by metric name with one `# HELP` / `# TYPE` pair per
/// name, names sorted for deterministic output. Within one name, samples
/// keep the order in which they were observed.
pub fn render(observations: &[Observation]) -> String {
    let mut by_name: HashMap<&str, Vec<&Observation>> = HashMap::new();
    for obs in observations {
        by_name.entry(&obs.name).or_default().push(obs);
    }

    let mut names: Vec<&&str> = by_name.keys().collect();
    names.sort();

    let mut output = Vec::with_capacity(observations.len() * 80);
    for name in names {
        let series = &by_name[*name];

        // HELP and TYPE come from the first sample of the group.
        let first = series[0];
        if !first.help.is_empty() {
            writeln!(output, "# HELP {} {}", name, escape_help(&first.help)).ok();
        }
        writeln!(output, "# TYPE {} {}", name, first.kind.as_str()).ok();

        for obs in series {
            writeln!(
                output,
                "{}{} {}",
                obs.name,
                format_labels(&obs.labels),
                format_value(obs.value)
            )
            .ok();
        }
    }

    String::from_utf8(output).unwrap_or_default()
}
