//! `script_create`, `script_update`, `script_view`, and `execute_script`:
//! the saved-script workflow layered on top of [`dcms_script_store`] and
//! [`dcms_workspace`].

use dcms_script_store::{CreateResult, Replacement, ScriptStore, StoreError, UpdateResult, ValidationResult};
use dcms_workspace::{ValidateOutcome, Workspace, WorkspaceError};

use crate::tools::execute::{ExecuteError, ExecutionContext, execute_stored_script, regenerate_schema};

#[derive(Debug, thiserror::Error)]
pub enum ScriptToolError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error(transparent)]
    Execute(#[from] ExecuteError),
}

pub struct SaveOutcome {
    pub validation: ValidationResult,
    pub tsc_outcome: Option<ValidateOutcome>,
    pub execution: Option<dcms_workspace::ExecuteResult>,
}

async fn maybe_validate_and_execute(
    workspace: &Workspace,
    ctx: Option<&ExecutionContext<'_>>,
    content: &str,
    validate: bool,
    execute: bool,
) -> Result<(Option<ValidateOutcome>, Option<dcms_workspace::ExecuteResult>), ScriptToolError> {
    // schema.ts backs the `./schema` import every saved script type-checks
    // against, so a stale one would make `tsc` pass or fail on the wrong
    // project shape.
    if (validate || execute) && let Some(ctx) = ctx {
        regenerate_schema(ctx).await?;
    }

    let tsc_outcome = if validate { Some(workspace.validate_script(content).await?) } else { None };

    let execution = if execute {
        let ctx = ctx.expect("execute requested without an execution context");
        Some(execute_stored_script(ctx, content, None, None).await?)
    } else {
        None
    };

    Ok((tsc_outcome, execution))
}

/// Creates a script, saving it regardless of validation outcome, then
/// optionally `tsc`-checks and/or executes it.
///
/// # Errors
///
/// Returns an error if the name is malformed/taken, or a requested
/// validate/execute step fails.
pub async fn create(
    store: &mut ScriptStore,
    workspace: &Workspace,
    ctx: Option<&ExecutionContext<'_>>,
    name: &str,
    content: &str,
    validate: bool,
    execute: bool,
) -> Result<(CreateResult, SaveOutcome), ScriptToolError> {
    let result = store.create(name, content)?;
    let validation = result.validation.clone();
    let (tsc_outcome, execution) =
        maybe_validate_and_execute(workspace, ctx, &result.script.content, validate, execute).await?;
    Ok((result, SaveOutcome { validation, tsc_outcome, execution }))
}

/// Applies `replacements` to an existing script, then optionally
/// `tsc`-checks and/or executes the updated content.
///
/// # Errors
///
/// Returns an error if the script doesn't exist, a replacement doesn't
/// apply cleanly, or a requested validate/execute step fails.
pub async fn update(
    store: &mut ScriptStore,
    workspace: &Workspace,
    ctx: Option<&ExecutionContext<'_>>,
    name: &str,
    replacements: &[Replacement],
    validate: bool,
    execute: bool,
) -> Result<(UpdateResult, SaveOutcome), ScriptToolError> {
    let result = store.update(name, replacements)?;
    let validation = result.validation.clone();
    let (tsc_outcome, execution) =
        maybe_validate_and_execute(workspace, ctx, &result.script.content, validate, execute).await?;
    Ok((result, SaveOutcome { validation, tsc_outcome, execution }))
}

/// Returns the current content of a saved script.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] if `name` doesn't exist.
pub fn view<'a>(store: &'a ScriptStore, name: &str) -> Result<&'a dcms_script_store::Script, ScriptToolError> {
    Ok(store.view(name)?)
}

/// Executes a saved script by name.
///
/// # Errors
///
/// Returns an error if `name` doesn't exist or execution fails.
pub async fn execute(
    store: &ScriptStore,
    ctx: &ExecutionContext<'_>,
    name: &str,
    timeout_seconds: Option<u64>,
    max_output_bytes: Option<usize>,
) -> Result<dcms_workspace::ExecuteResult, ScriptToolError> {
    let script = store.view(name)?;
    Ok(execute_stored_script(ctx, &script.content, timeout_seconds, max_output_bytes).await?)
}
