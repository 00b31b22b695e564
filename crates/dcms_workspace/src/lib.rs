//! Durable on-disk TypeScript workspace backing `validateScript` and
//! `executeScript`: a lazily-initialized `npm`/`pnpm` project with the real
//! `@datocms/cma-client-node` installed, guarded by a cross-process lock so
//! concurrent server instances never race on `npm install`.

mod lock;
mod templates;
mod workspace;

pub use workspace::{ExecuteOptions, ExecuteResult, PackageManager, ValidateOutcome, Workspace};

use camino::Utf8PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("failed to acquire lock at {path}: {source}")]
    Lock {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("timed out waiting for workspace init lock at {path}")]
    LockTimeout { path: Utf8PathBuf },
    #[error("failed to write workspace file {path}: {source}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{command} exited with status {code}: {stderr}")]
    CommandFailed { command: String, code: i32, stderr: String },
    #[error("could not determine a user data directory for the workspace")]
    NoDataDir,
}
