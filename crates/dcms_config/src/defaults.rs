//! Serde default-value helpers shared across config structs.

pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn default_base_url() -> url::Url {
    url::Url::parse("https://site-api.datocms.com").expect("static URL is valid")
}

pub(crate) fn default_execution_timeout_seconds() -> u64 {
    60
}

pub(crate) fn default_max_output_bytes() -> usize {
    2048
}

pub(crate) fn default_server_name() -> String {
    "dcms-mcp".to_string()
}

pub(crate) fn default_server_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub(crate) fn default_server_description() -> String {
    "Code-mode MCP server for the DatoCMS Content Management API".to_string()
}
