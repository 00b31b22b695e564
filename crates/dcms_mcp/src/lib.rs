//! The tool registry for the DatoCMS code-mode MCP server: eleven `rmcp`
//! tools composing `dcms_hyperschema`, `dcms_resource_schema`,
//! `dcms_introspector`, `dcms_script_store`, `dcms_workspace`,
//! `dcms_cma_client` and `dcms_schema_gen` into the discover/plan/execute
//! workflow, plus the stdio/HTTP server wiring to run it.

mod codegen_snippet;
mod extractors;
mod jsonpath;
mod markdown;
mod models;
pub mod server;
mod service;
mod tools;
mod utils;

pub use server::DcmsMcpServer;
pub use service::DcmsMcpService;
