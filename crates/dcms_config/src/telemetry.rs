//! OpenTelemetry export configuration.
//!
//! Span emission is wired through `tracing-opentelemetry` at the server
//! crate regardless of whether an exporter is configured — this struct only
//! governs whether spans actually leave the process. Metrics export is not
//! implemented; only traces.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub traces: TracesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracesConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub exporter: ExporterConfig,
}

impl Default for TracesConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            exporter: ExporterConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExporterConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default)]
    pub headers: std::collections::BTreeMap<String, String>,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            protocol: Protocol::default(),
            headers: std::collections::BTreeMap::new(),
        }
    }
}

fn default_endpoint() -> String {
    "http://localhost:4317".to_string()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum Protocol {
    #[serde(rename = "grpc")]
    #[default]
    Grpc,
    #[serde(rename = "http/protobuf")]
    HttpProtobuf,
}
