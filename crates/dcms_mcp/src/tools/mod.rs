//! One submodule per tool family, each a thin function composing the
//! lower-level `dcms_*` crates; `service.rs` wires these onto `#[tool]`
//! methods and turns their `Result` into a `CallToolResult`.

pub mod discovery;
pub mod execute;
pub mod schema_info;
pub mod scripts;

use rmcp::ErrorData;

/// Converts any tool-internal error into the `ErrorData` the `rmcp`
/// transport expects, folding everything into an internal-error code since
/// none of these failures originate from malformed tool-call arguments
/// (`schemars`/`serde` already reject those before a handler ever runs).
pub fn internal_error(message: impl std::fmt::Display) -> ErrorData {
    ErrorData::internal_error(message.to_string(), None)
}
