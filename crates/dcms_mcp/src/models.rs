//! MCP tool input/output types.
//!
//! One `#[derive(JsonSchema)]` struct per tool input/output, doc comments
//! on fields becoming the parameter descriptions an LLM client sees,
//! `#[serde(default)]` so every optional field may be omitted entirely.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ResourceInput {
    /// Resource namespace (e.g. `items`) or JSON:API type (e.g. `item`).
    pub resource: String,
    /// Summary/title text of `<details>` blocks or examples to expand fully
    /// in the rendered description. Omit for the collapsed overview.
    pub expand_details: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ResourceActionInput {
    /// Resource namespace or JSON:API type.
    pub resource: String,
    /// Action name (hyperschema link `rel`), e.g. `instances`, `create`.
    pub action: String,
    /// Summary/title text to expand fully; omit for the collapsed overview.
    pub expand_details: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ResourceActionMethodInput {
    /// Resource namespace or JSON:API type.
    pub resource: String,
    /// Exact method name on the client (e.g. `list`, `rawList`).
    pub method: String,
    /// How deep to expand referenced types. Defaults to 2.
    pub max_depth: Option<u32>,
    /// Type names to force-expand regardless of `max_depth`. Pass `["*"]`
    /// for "expand every referenced type with no depth limit".
    pub expand_types: Option<Vec<String>>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ExecuteMethodInput {
    /// Resource namespace or JSON:API type.
    pub resource: String,
    /// Exact method name on the client (e.g. `list`, `create`, `destroy`).
    pub method: String,
    /// Positional arguments passed to `client[resource][method](...args)`.
    pub args: Vec<Value>,
    /// A JSONPath-like selector (`$.data[0].attributes.title`) applied to
    /// the method's return value before it is rendered. Omit to return the
    /// full value.
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FieldsDetails {
    /// `api_key`, `field_type`, `localized` only.
    Basic,
    /// Every attribute DatoCMS returns for the field, including validators.
    Complete,
}

impl Default for FieldsDetails {
    fn default() -> Self {
        FieldsDetails::Basic
    }
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SchemaInfoInput {
    /// Free-text query matched fuzzily against model `api_key`, `name`, and
    /// `id`.
    pub query: String,
    /// Include each matched model's fieldsets. Not modeled by this server
    /// (DatoCMS fieldsets are a presentational grouping the CMA client
    /// does not expose via `item-types`/`fields`); accepted for
    /// forward-compatibility but currently always ignored.
    pub include_fieldsets: bool,
    /// Recursively include full definitions of block models referenced by
    /// matched models' rich/structured text and single-block fields.
    pub include_blocks: bool,
    /// Include other models whose link/links fields reference a matched
    /// model.
    pub include_reverse_references: bool,
    /// Include non-block models that embed a matched block model.
    pub include_block_embedders: bool,
    /// Controls how much per-field detail is rendered.
    pub fields_details: FieldsDetails,
    /// When `fields_details` is ignored in favor of an explicit allowlist,
    /// only fields whose `api_key` appears here are rendered.
    pub field_allowlist: Option<Vec<String>>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CreateScriptInput {
    /// Script URI, `script://<basename>.ts`. Globally unique.
    pub name: String,
    /// TypeScript source. Must have exactly one default export, an async
    /// function (or one returning `Promise<...>`) taking a single
    /// `Client`/`ReturnType<typeof buildClient>` parameter, importing only
    /// from `@datocms/*`, `datocms-*`, or `./schema`.
    pub content: String,
    /// Also run `tsc --noEmit` against the script once saved. Requires
    /// `DATOCMS_API_TOKEN` (schema.ts generation needs a live client).
    pub validate: bool,
    /// Also execute the script immediately after saving. Requires
    /// `DATOCMS_API_TOKEN`.
    pub execute: bool,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct ReplacementInput {
    pub old_str: String,
    pub new_str: String,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct UpdateScriptInput {
    /// Name of an existing script.
    pub name: String,
    /// Ordered replacements, applied sequentially. Each `old_str` must
    /// match exactly once in the content at the time it is processed.
    pub replacements: Vec<ReplacementInput>,
    /// Also run `tsc --noEmit` against the updated script.
    pub validate: bool,
    /// Also execute the updated script immediately after saving.
    pub execute: bool,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ViewScriptInput {
    /// Name of an existing script.
    pub name: String,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ExecuteScriptInput {
    /// Name of an existing script.
    pub name: String,
    /// Overrides the configured execution timeout for this call only.
    pub timeout_seconds: Option<u64>,
    /// Overrides the configured per-stream output byte cap for this call
    /// only.
    pub max_output_bytes: Option<usize>,
}
