//! The workspace itself: init, per-call script files, `tsc` validation, and
//! sandboxed `tsx` execution.

use std::process::Stdio;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::{WorkspaceError, lock, templates};

const LOCK_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const DEFAULT_TIMEOUT_SECONDS: u64 = 60;
const DEFAULT_MAX_OUTPUT_BYTES: usize = 2048;
const TRUNCATION_SENTINEL: &str = "\n...[truncated]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackageManager {
    #[default]
    Npm,
    Pnpm,
}

impl PackageManager {
    fn install_command(self) -> (&'static str, &'static [&'static str]) {
        match self {
            PackageManager::Npm => ("npm", &["install", "--no-audit", "--no-fund"]),
            PackageManager::Pnpm => ("pnpm", &["install"]),
        }
    }
}

/// A durable, initialized-once working directory holding the real
/// `@datocms/cma-client-node` package, a `tsconfig.json`, `runner.ts`, and
/// a `scripts/` directory for per-call script and schema files.
pub struct Workspace {
    root: Utf8PathBuf,
    package_manager: PackageManager,
}

impl Workspace {
    pub fn new(root: Utf8PathBuf, package_manager: PackageManager) -> Self {
        Self { root, package_manager }
    }

    /// The default workspace root under the OS user-data directory, e.g.
    /// `~/.local/share/dcms-mcp/workspace` on Linux.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::NoDataDir`] if the platform has no
    /// resolvable user data directory.
    pub fn default_root() -> Result<Utf8PathBuf, WorkspaceError> {
        let dirs = ProjectDirs::from("com", "datocms", "dcms-mcp").ok_or(WorkspaceError::NoDataDir)?;
        Utf8PathBuf::from_path_buf(dirs.data_dir().join("workspace")).map_err(|_| WorkspaceError::NoDataDir)
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn scripts_dir(&self) -> Utf8PathBuf {
        self.root.join("scripts")
    }

    fn bin_path(&self, name: &str) -> Utf8PathBuf {
        self.root.join("node_modules").join(".bin").join(name)
    }

    /// Path to the installed `tsx` binary, for callers that need to spawn
    /// their own bundled scripts against this workspace's `node_modules`
    /// (e.g. the introspector's `introspect.ts`).
    pub fn tsx_path(&self) -> Utf8PathBuf {
        self.bin_path("tsx")
    }

    fn is_initialized(&self) -> bool {
        self.root.join("node_modules").is_dir() && self.root.join("package.json").is_file()
    }

    /// Idempotently materializes `package.json`, `tsconfig.json`,
    /// `runner.ts`, and `node_modules` under the workspace root. Safe to
    /// call concurrently, including from other processes: only the caller
    /// that wins the directory-creation lock performs the install, and
    /// every caller re-checks [`Self::is_initialized`] once it holds (or
    /// gives up waiting for) the lock.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired, a file write
    /// fails, or the package manager install exits non-zero.
    pub async fn ensure(&self) -> Result<(), WorkspaceError> {
        if self.is_initialized() {
            return Ok(());
        }

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| WorkspaceError::Write { path: self.root.clone(), source })?;

        let lock_path = self.root.join(".init.lock");
        let _guard = lock::acquire(&lock_path, LOCK_TIMEOUT).await?;

        if self.is_initialized() {
            return Ok(());
        }

        tokio::fs::create_dir_all(self.scripts_dir())
            .await
            .map_err(|source| WorkspaceError::Write { path: self.scripts_dir(), source })?;

        self.write_file("package.json", &templates::package_json()).await?;
        self.write_file("tsconfig.json", templates::tsconfig_json()).await?;
        self.write_file("runner.ts", templates::runner_ts()).await?;

        let (program, args) = self.package_manager.install_command();
        let output = Command::new(program)
            .args(args)
            .current_dir(&self.root)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| WorkspaceError::Spawn { command: program.to_string(), source })?;

        if !output.status.success() {
            return Err(WorkspaceError::CommandFailed {
                command: program.to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(())
    }

    async fn write_file(&self, name: &str, content: &str) -> Result<(), WorkspaceError> {
        let path = self.root.join(name);
        tokio::fs::write(&path, content).await.map_err(|source| WorkspaceError::Write { path, source })
    }

    /// Regenerates `scripts/schema.ts` with the live per-project typed
    /// definitions. Called before every `validateScript`/`executeScript`;
    /// unlike the per-call script file, this is never deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn write_schema(&self, schema_ts: &str) -> Result<(), WorkspaceError> {
        let path = self.scripts_dir().join("schema.ts");
        tokio::fs::write(&path, schema_ts).await.map_err(|source| WorkspaceError::Write { path, source })
    }

    /// Writes `content` to a uniquely named file under `scripts/`.
    /// `tempfile` creates the file mode 0600 on Unix by default, matching
    /// the per-operation temp file requirement. The returned guard deletes
    /// the file when dropped.
    async fn write_script_file(&self, content: &str) -> Result<tempfile::TempPath, WorkspaceError> {
        let dir = self.scripts_dir();
        let content = content.to_string();
        tokio::task::spawn_blocking(move || -> Result<tempfile::TempPath, WorkspaceError> {
            use std::io::Write;
            let mut file = tempfile::Builder::new()
                .prefix("script-")
                .suffix(".ts")
                .tempfile_in(&dir)
                .map_err(|source| WorkspaceError::Write { path: dir.clone(), source })?;
            file.write_all(content.as_bytes())
                .map_err(|source| WorkspaceError::Write { path: dir.clone(), source })?;
            Ok(file.into_temp_path())
        })
        .await
        .expect("write_script_file blocking task panicked")
    }

    /// Spawns `tsc --noEmit <script> --pretty false`. Pass/fail is exit
    /// code 0; both streams are returned combined for display.
    ///
    /// # Errors
    ///
    /// Returns an error if the workspace cannot be ensured, the script
    /// file cannot be written, or `tsc` cannot be spawned.
    pub async fn validate_script(&self, content: &str) -> Result<ValidateOutcome, WorkspaceError> {
        self.ensure().await?;
        let script_path = self.write_script_file(content).await?;

        let output = Command::new(self.bin_path("tsc"))
            .arg("--noEmit")
            .arg(script_path.as_os_str())
            .arg("--pretty")
            .arg("false")
            .current_dir(&self.root)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| WorkspaceError::Spawn { command: "tsc".to_string(), source })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(ValidateOutcome { passed: output.status.success(), output: combined })
    }

    /// Spawns `tsx runner.ts <script>` under the configured timeout and
    /// per-stream byte cap.
    ///
    /// # Errors
    ///
    /// Returns an error if the workspace cannot be ensured or the script
    /// file cannot be written. Process-level failures (non-zero exit,
    /// timeout, spawn failure) are reported as an [`ExecuteResult`]
    /// variant, not an `Err`.
    pub async fn execute_script(
        &self,
        content: &str,
        options: ExecuteOptions,
    ) -> Result<ExecuteResult, WorkspaceError> {
        self.ensure().await?;
        let script_path = self.write_script_file(content).await?;

        let timeout = options.timeout.unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS));
        let cap = options.max_output_bytes.unwrap_or(DEFAULT_MAX_OUTPUT_BYTES);

        let mut command = Command::new(self.bin_path("tsx"));
        command
            .arg(self.root.join("runner.ts").as_os_str())
            .arg(script_path.as_os_str())
            .current_dir(&self.root)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(token) = &options.api_token {
            command.env("DATOCMS_API_TOKEN", token);
        }
        if let Some(environment) = &options.environment {
            command.env("DATOCMS_ENVIRONMENT", environment);
        }
        if let Some(base_url) = &options.base_url {
            command.env("DATOCMS_BASE_URL", base_url);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(source) => {
                return Ok(ExecuteResult::Error { message: source.to_string() });
            }
        };

        let stdout = child.stdout.take().expect("stdout was piped");
        let stderr = child.stderr.take().expect("stderr was piped");
        let stdout_task = tokio::spawn(read_capped(stdout, cap));
        let stderr_task = tokio::spawn(read_capped(stderr, cap));

        match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => {
                let stdout = stdout_task.await.unwrap_or_default();
                let stderr = stderr_task.await.unwrap_or_default();
                Ok(match status.code() {
                    Some(0) => ExecuteResult::Success { stdout, stderr },
                    Some(code) => ExecuteResult::ExitCode { code, stdout, stderr },
                    None => ExecuteResult::Error { message: "process terminated by signal".to_string() },
                })
            }
            Ok(Err(source)) => Ok(ExecuteResult::Error { message: source.to_string() }),
            Err(_elapsed) => {
                let _ = child.kill().await;
                let stdout = stdout_task.await.unwrap_or_default();
                let stderr = stderr_task.await.unwrap_or_default();
                Ok(ExecuteResult::Timeout { stdout, stderr })
            }
        }
    }
}

/// Reads `reader` to EOF, keeping at most `cap` bytes; bytes beyond the
/// cap are drained (so a child that fills the pipe buffer never
/// deadlocks waiting on a reader that stopped storing) and the kept
/// prefix gains a truncation sentinel.
async fn read_capped<R: tokio::io::AsyncRead + Unpin>(mut reader: R, cap: usize) -> String {
    let mut buf = Vec::with_capacity(cap.min(8192));
    let mut chunk = [0u8; 4096];
    let mut truncated = false;

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                if buf.len() < cap {
                    let take = (cap - buf.len()).min(n);
                    buf.extend_from_slice(&chunk[..take]);
                    if take < n {
                        truncated = true;
                    }
                } else {
                    truncated = true;
                }
            }
            Err(_) => break,
        }
    }

    let mut text = String::from_utf8_lossy(&buf).into_owned();
    if truncated {
        text.push_str(TRUNCATION_SENTINEL);
    }
    text
}

#[derive(Debug, Clone)]
pub struct ValidateOutcome {
    pub passed: bool,
    pub output: String,
}

#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    pub api_token: Option<String>,
    pub environment: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub max_output_bytes: Option<usize>,
}

/// Four-way tagged execution result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cause", rename_all = "camelCase")]
pub enum ExecuteResult {
    Success { stdout: String, stderr: String },
    Timeout { stdout: String, stderr: String },
    ExitCode { code: i32, stdout: String, stderr: String },
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ensure_is_a_no_op_when_already_initialized() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        std::fs::create_dir_all(root.join("node_modules")).unwrap();
        std::fs::write(root.join("package.json"), "{}").unwrap();

        let workspace = Workspace::new(root, PackageManager::Npm);
        workspace.ensure().await.unwrap();
    }

    #[tokio::test]
    async fn write_schema_writes_under_scripts_dir() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        std::fs::create_dir_all(root.join("scripts")).unwrap();

        let workspace = Workspace::new(root.clone(), PackageManager::Npm);
        workspace.write_schema("export type Foo = {};").await.unwrap();

        let content = std::fs::read_to_string(root.join("scripts/schema.ts")).unwrap();
        assert_eq!(content, "export type Foo = {};");
    }

    #[tokio::test]
    async fn read_capped_truncates_beyond_the_byte_cap() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let handle = tokio::spawn(read_capped(reader, 4));
        tokio::io::AsyncWriteExt::write_all(&mut writer, b"abcdefgh").await.unwrap();
        drop(writer);
        let result = handle.await.unwrap();
        assert!(result.starts_with("abcd"));
        assert!(result.contains("[truncated]"));
    }

    #[tokio::test]
    async fn read_capped_returns_full_content_under_the_cap() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let handle = tokio::spawn(read_capped(reader, 100));
        tokio::io::AsyncWriteExt::write_all(&mut writer, b"hi").await.unwrap();
        drop(writer);
        let result = handle.await.unwrap();
        assert_eq!(result, "hi");
    }

    #[test]
    fn install_command_differs_by_package_manager() {
        let (npm, _) = PackageManager::Npm.install_command();
        let (pnpm, _) = PackageManager::Pnpm.install_command();
        assert_eq!(npm, "npm");
        assert_eq!(pnpm, "pnpm");
    }
}
