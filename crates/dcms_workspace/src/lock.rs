//! Cross-process exclusive lock using directory creation as the lock
//! primitive: `mkdir` is atomic on every platform this server targets, so
//! "I created the directory" is a correct mutual-exclusion signal without
//! a platform-specific file-locking crate.

use std::time::{Duration, SystemTime};

use camino::Utf8Path;

use crate::WorkspaceError;

const STALE_AFTER: Duration = Duration::from_secs(5 * 60);
const RETRY_INTERVAL: Duration = Duration::from_millis(200);

/// Holds the lock directory until dropped; removes it on drop.
pub struct LockGuard {
    path: camino::Utf8PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir(&self.path);
    }
}

/// Acquires the lock at `path`, retrying every 200ms until `timeout`
/// elapses. A lock directory older than five minutes is treated as
/// abandoned by a crashed process and removed before retrying.
///
/// # Errors
///
/// Returns [`WorkspaceError::LockTimeout`] if the lock cannot be acquired
/// within `timeout`.
pub async fn acquire(path: &Utf8Path, timeout: Duration) -> Result<LockGuard, WorkspaceError> {
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        match tokio::fs::create_dir(path).await {
            Ok(()) => return Ok(LockGuard { path: path.to_owned() }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                if is_stale(path, STALE_AFTER).await {
                    tracing::warn!(%path, "removing stale workspace init lock");
                    let _ = tokio::fs::remove_dir(path).await;
                    continue;
                }
            }
            Err(e) => {
                return Err(WorkspaceError::Lock { path: path.to_owned(), source: e });
            }
        }

        if tokio::time::Instant::now() >= deadline {
            return Err(WorkspaceError::LockTimeout { path: path.to_owned() });
        }
        tokio::time::sleep(RETRY_INTERVAL).await;
    }
}

async fn is_stale(path: &Utf8Path, stale_after: Duration) -> bool {
    let Ok(metadata) = tokio::fs::metadata(path).await else {
        return false;
    };
    let Ok(modified) = metadata.modified() else {
        return false;
    };
    SystemTime::now().duration_since(modified).map(|age| age > stale_after).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquires_and_releases_lock() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = camino::Utf8PathBuf::from_path_buf(dir.path().join("lock")).unwrap();

        let guard = acquire(&lock_path, Duration::from_secs(1)).await.unwrap();
        assert!(lock_path.exists());
        drop(guard);
        assert!(!lock_path.exists());
    }

    #[tokio::test]
    async fn second_acquire_times_out_while_held() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = camino::Utf8PathBuf::from_path_buf(dir.path().join("lock")).unwrap();

        let _guard = acquire(&lock_path, Duration::from_secs(1)).await.unwrap();
        let result = acquire(&lock_path, Duration::from_millis(300)).await;
        assert!(matches!(result, Err(WorkspaceError::LockTimeout { .. })));
    }

    #[tokio::test]
    async fn lock_directory_older_than_threshold_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = camino::Utf8PathBuf::from_path_buf(dir.path().join("lock")).unwrap();
        std::fs::create_dir(&lock_path).unwrap();

        assert!(!is_stale(&lock_path, Duration::from_secs(300)).await);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(is_stale(&lock_path, Duration::from_millis(10)).await);
    }
}
