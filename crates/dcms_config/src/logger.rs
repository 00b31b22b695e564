use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    #[serde(default = "crate::defaults::default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default)]
    pub format: LoggerFormat,
    #[serde(default = "crate::defaults::default_true")]
    pub colors: bool,
    /// Optional file path for log output. When the server runs over stdio
    /// transport and no file is set, logging is disabled entirely so stray
    /// writes never corrupt the JSON-RPC framing on stdout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<Utf8PathBuf>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: LogLevel::Info,
            format: LoggerFormat::Compact,
            colors: true,
            file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub enum LoggerFormat {
    #[serde(rename = "compact")]
    #[default]
    Compact,
    #[serde(rename = "pretty")]
    Pretty,
    #[serde(rename = "json")]
    Json,
}

/// Ordered from lowest to highest severity: Trace < Debug < Info < Warn < Error.
#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    #[serde(rename = "trace", alias = "TRACE")]
    Trace,
    #[serde(rename = "debug", alias = "DEBUG")]
    Debug,
    #[serde(rename = "info", alias = "INFO")]
    #[default]
    Info,
    #[serde(rename = "warn", alias = "WARN")]
    Warn,
    #[serde(rename = "error", alias = "ERROR")]
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Transport context that decides whether stdout logging is safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stdio,
    Http,
}

const WHITELISTED_CRATES: &[&str] = &[
    "dcms_mcp",
    "dcms_config",
    "dcms_workspace",
    "dcms_introspector",
    "dcms_script_store",
    "dcms_hyperschema",
    "dcms_cma_client",
    "tower_http",
    "axum",
];

/// Initializes the global `tracing` subscriber.
///
/// Over stdio transport with no `file` configured, logging is skipped
/// entirely — any attempt to write to stdout would corrupt the MCP
/// JSON-RPC stream. Callers that want logs in that mode must set
/// `LoggerConfig::file`.
pub fn init_logger(cfg: &LoggerConfig, transport: Transport) {
    use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

    if !cfg.enabled {
        return;
    }
    if transport == Transport::Stdio && cfg.file.is_none() {
        return;
    }

    let level_str = cfg.level.as_str();
    let default_filter = WHITELISTED_CRATES
        .iter()
        .map(|krate| format!("{krate}={level_str}"))
        .collect::<Vec<_>>()
        .join(",");
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let layer: Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync> = match &cfg.file {
        Some(path) => {
            let Ok(file) = std::fs::OpenOptions::new().create(true).append(true).open(path) else {
                eprintln!("dcms-mcp: failed to open log file {path}, logging disabled");
                return;
            };
            build_layer(move || file.try_clone().expect("log file handle"), &cfg.format, false)
        }
        None => build_layer(std::io::stdout, &cfg.format, cfg.colors),
    };

    if let Err(e) = tracing_subscriber::registry().with(layer).with(env_filter).try_init() {
        eprintln!("dcms-mcp: failed initializing tracing_subscriber: {e:?}");
    }
}

fn build_layer<W>(
    make_writer: W,
    format: &LoggerFormat,
    colors: bool,
) -> Box<dyn tracing_subscriber::Layer<tracing_subscriber::Registry> + Send + Sync>
where
    W: for<'writer> tracing_subscriber::fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
    use tracing_subscriber::{Layer, fmt};

    match format {
        LoggerFormat::Compact => fmt::Layer::default()
            .with_writer(make_writer)
            .with_ansi(colors)
            .compact()
            .boxed(),
        LoggerFormat::Pretty => fmt::Layer::default()
            .with_writer(make_writer)
            .with_ansi(colors)
            .pretty()
            .boxed(),
        LoggerFormat::Json => fmt::Layer::default()
            .with_writer(make_writer)
            .with_ansi(colors)
            .json()
            .boxed(),
    }
}
