//! Shared logic behind the two execute-method tools (destructive methods
//! are exposed as a separate tool from read-only ones purely so an MCP
//! client can apply different confirmation policy per tool name — nothing
//! in the request/response shape differs) and the create/update/view/execute
//! script family's execution step.

use dcms_cma_client::{CmaClient, CmaError};
use dcms_config::ExecutionConfig;
use dcms_workspace::{ExecuteOptions, ExecuteResult, Workspace, WorkspaceError};
use serde_json::Value;

use crate::codegen_snippet::method_execute_script;
use crate::jsonpath::{self, PathError};

#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("failed to fetch live schema for schema.ts: {0}")]
    Schema(#[from] CmaError),
    #[error("DATOCMS_API_TOKEN is not configured")]
    NoToken,
}

pub struct ExecutionContext<'a> {
    pub workspace: &'a Workspace,
    pub config: &'a ExecutionConfig,
    pub api_token: Option<&'a str>,
    pub environment: Option<&'a str>,
    pub base_url: &'a str,
    /// Present only when `DATOCMS_API_TOKEN` is configured; used to
    /// regenerate `schema.ts` from the live project before every
    /// `tsc --noEmit` or script run, since the client import it backs can
    /// only be resolved once a real model/field list exists on disk.
    pub cma_client: Option<&'a CmaClient>,
}

/// Regenerates `scripts/schema.ts` from the live project's models and
/// locales. A no-op when no CMA client is configured, leaving whatever
/// `schema.ts` (if any) a prior call with a token already wrote in place.
///
/// # Errors
///
/// Returns an error if the CMA fetch fails or the file cannot be written.
pub(crate) async fn regenerate_schema(ctx: &ExecutionContext<'_>) -> Result<(), ExecuteError> {
    let Some(client) = ctx.cma_client else {
        return Ok(());
    };
    let item_types = client.get_item_types_with_fields().await?;
    let site = client.get_site().await?;
    let schema_ts = dcms_schema_gen::generate(&item_types, &site.locales);
    ctx.workspace.write_schema(&schema_ts).await?;
    Ok(())
}

pub struct MethodExecution {
    pub outcome: ExecuteResult,
    pub filtered: Option<Value>,
}

/// Runs `client[namespace][method](...args)`, then applies `filter` (if
/// any) to the parsed JSON on stdout's single line.
pub async fn execute_method(
    ctx: &ExecutionContext<'_>,
    namespace: &str,
    method: &str,
    args: &[Value],
    filter: Option<&str>,
) -> Result<MethodExecution, ExecuteError> {
    let api_token = ctx.api_token.ok_or(ExecuteError::NoToken)?;
    regenerate_schema(ctx).await?;
    let script = method_execute_script(namespace, method, args);

    let outcome = ctx
        .workspace
        .execute_script(
            &script,
            ExecuteOptions {
                api_token: Some(api_token.to_string()),
                environment: ctx.environment.map(str::to_string),
                base_url: Some(ctx.base_url.to_string()),
                timeout: Some(std::time::Duration::from_secs(ctx.config.timeout_seconds)),
                max_output_bytes: Some(ctx.config.max_output_bytes),
            },
        )
        .await?;

    let filtered = match &outcome {
        ExecuteResult::Success { stdout, .. } => {
            let parsed: Value = serde_json::from_str(stdout.trim()).unwrap_or(Value::Null);
            match filter {
                Some(path) => Some(jsonpath::select(&parsed, path)?),
                None => Some(parsed),
            }
        }
        _ => None,
    };

    Ok(MethodExecution { outcome, filtered })
}

/// Runs a stored script by name (`execute_script` tool), with per-call
/// timeout/byte-cap overrides.
pub async fn execute_stored_script(
    ctx: &ExecutionContext<'_>,
    content: &str,
    timeout_seconds: Option<u64>,
    max_output_bytes: Option<usize>,
) -> Result<ExecuteResult, ExecuteError> {
    let api_token = ctx.api_token.ok_or(ExecuteError::NoToken)?;
    regenerate_schema(ctx).await?;
    ctx.workspace
        .execute_script(
            content,
            ExecuteOptions {
                api_token: Some(api_token.to_string()),
                environment: ctx.environment.map(str::to_string),
                base_url: Some(ctx.base_url.to_string()),
                timeout: Some(std::time::Duration::from_secs(
                    timeout_seconds.unwrap_or(ctx.config.timeout_seconds),
                )),
                max_output_bytes: Some(max_output_bytes.unwrap_or(ctx.config.max_output_bytes)),
            },
        )
        .await
        .map_err(ExecuteError::from)
}
