use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use dcms_workspace::Workspace;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::script::introspect_ts;
use crate::types::{ExpandOptions, ExpandedTypes, IntrospectRequest, IntrospectResponse, MethodSignature, TypeReference};

const SCRIPT_TIMEOUT: Duration = Duration::from_secs(30);
const SCRIPT_FILE_NAME: &str = "introspect.ts";

#[derive(Debug, thiserror::Error)]
pub enum IntrospectorError {
    #[error(transparent)]
    Workspace(#[from] dcms_workspace::WorkspaceError),
    #[error("failed to write introspection script: {0}")]
    Write(#[source] std::io::Error),
    #[error("failed to spawn introspection process: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("introspection process timed out")]
    Timeout,
    #[error("introspection process exited with status {code:?}: {stderr}")]
    ProcessFailed { code: Option<i32>, stderr: String },
    #[error("malformed introspection response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
    #[error("introspection script reported an error: {0}")]
    ScriptError(String),
}

/// Drives `introspect.ts` inside the workspace to extract method signatures
/// and expand type dependencies from the installed client's declaration
/// file, using the real TypeScript compiler rather than a reimplementation.
pub struct Introspector {
    workspace: Arc<Workspace>,
}

impl Introspector {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }

    async fn ensure_script(&self) -> Result<Utf8PathBuf, IntrospectorError> {
        self.workspace.ensure().await?;
        let path = self.workspace.scripts_dir().join(SCRIPT_FILE_NAME);
        tokio::fs::write(&path, introspect_ts()).await.map_err(IntrospectorError::Write)?;
        Ok(path)
    }

    async fn run(&self, request: &IntrospectRequest) -> Result<IntrospectResponse, IntrospectorError> {
        let script_path = self.ensure_script().await?;
        let payload = serde_json::to_vec(request)?;

        let mut child = Command::new(self.workspace.tsx_path())
            .arg(script_path.as_os_str())
            .current_dir(self.workspace.root())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(IntrospectorError::Spawn)?;

        let mut stdin = child.stdin.take().expect("stdin was piped");
        stdin.write_all(&payload).await.map_err(IntrospectorError::Write)?;
        drop(stdin);

        let output = tokio::time::timeout(SCRIPT_TIMEOUT, child.wait_with_output())
            .await
            .map_err(|_| IntrospectorError::Timeout)?
            .map_err(IntrospectorError::Spawn)?;

        if !output.status.success() {
            return Err(IntrospectorError::ProcessFailed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }

    /// Returns `None` if the resource or method does not exist on the
    /// installed client, matching `4.5`'s "if missing, return nothing".
    ///
    /// # Errors
    ///
    /// Returns an error if the workspace cannot be ensured, the
    /// introspection process cannot be spawned or times out, or its
    /// response cannot be parsed.
    pub async fn signature(&self, resource: &str, method: &str) -> Result<Option<MethodSignature>, IntrospectorError> {
        let request = IntrospectRequest::Signature { resource: resource.to_string(), method: method.to_string() };
        match self.run(&request).await? {
            IntrospectResponse::Signature { signature } => Ok(signature),
            IntrospectResponse::Error { message } => Err(IntrospectorError::ScriptError(message)),
            IntrospectResponse::Expand { .. } => {
                Err(IntrospectorError::ScriptError("introspection script returned an expand response to a signature request".to_string()))
            }
        }
    }

    /// Expands a seed list of referenced types into their declaration
    /// source, bounded by `options.max_depth` unless `expand_types` names
    /// specific types (or the `"*"` sentinel) to expand without limit.
    ///
    /// # Errors
    ///
    /// Returns an error if the workspace cannot be ensured, the
    /// introspection process cannot be spawned or times out, or its
    /// response cannot be parsed.
    pub async fn expand_types(&self, seeds: &[TypeReference], options: ExpandOptions) -> Result<ExpandedTypes, IntrospectorError> {
        let request = IntrospectRequest::Expand { seeds: seeds.to_vec(), options };
        match self.run(&request).await? {
            IntrospectResponse::Expand { result } => Ok(result),
            IntrospectResponse::Error { message } => Err(IntrospectorError::ScriptError(message)),
            IntrospectResponse::Signature { .. } => {
                Err(IntrospectorError::ScriptError("introspection script returned a signature response to an expand request".to_string()))
            }
        }
    }
}
