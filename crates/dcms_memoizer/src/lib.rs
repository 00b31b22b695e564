//! Run-forever single-flight cache for pure async initializers.
//!
//! A [`Memoizer`] wraps a source function and guarantees it runs to completion
//! at most once: concurrent callers that arrive while the first call is still
//! in flight await that same call instead of starting their own. A failed
//! call is **not** cached — the next caller retries from scratch. See
//! `DESIGN.md` for how this underlies the hyperschema and resource-manifest
//! loaders.

use std::future::{Future, Ready, ready};
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::OnceCell;

type BoxFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send>>;
type SourceFn<T, E> = Arc<dyn Fn() -> BoxFuture<T, E> + Send + Sync>;

/// Single-flight, retry-on-failure memoization of an async (or sync) thunk.
///
/// `tokio::sync::OnceCell::get_or_try_init` already has exactly the semantics
/// this type needs (concurrent callers share the in-flight future; an `Err`
/// leaves the cell empty for the next caller) so `Memoizer` is a thin,
/// named wrapper around it rather than a hand-rolled lock.
pub struct Memoizer<T, E> {
    cell: OnceCell<T>,
    source: SourceFn<T, E>,
}

impl<T, E> Memoizer<T, E>
where
    T: Send + Sync + 'static,
    E: Send + 'static,
{
    /// Wrap an async source function.
    pub fn new<F, Fut>(source: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self {
            cell: OnceCell::new(),
            source: Arc::new(move || Box::pin(source())),
        }
    }

    /// Wrap a synchronous source function that cannot suspend.
    pub fn new_sync<F>(source: F) -> Self
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        Self::new(move || -> Ready<Result<T, E>> { ready(source()) })
    }

    /// Returns the memoized value, running the source function on first call
    /// (or retrying it if every prior call errored).
    pub async fn get(&self) -> Result<&T, E> {
        self.cell.get_or_try_init(|| (self.source)()).await
    }

    /// True once a value has been successfully produced.
    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::Memoizer;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn runs_source_exactly_once_on_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let memo: Memoizer<u32, String> = Memoizer::new(move || {
            let calls = calls2.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(42)
            }
        });

        let (a, b, c) = tokio::join!(memo.get(), memo.get(), memo.get());
        assert_eq!(*a.unwrap(), 42);
        assert_eq!(*b.unwrap(), 42);
        assert_eq!(*c.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn does_not_cache_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let memo: Memoizer<u32, String> = Memoizer::new(move || {
            let calls = calls2.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Err("first call fails".to_string())
                } else {
                    Ok(7)
                }
            }
        });

        assert!(memo.get().await.is_err());
        assert!(!memo.is_initialized());
        assert_eq!(*memo.get().await.unwrap(), 7);
        assert!(memo.is_initialized());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn new_sync_wraps_a_plain_function() {
        let memo: Memoizer<i32, std::convert::Infallible> = Memoizer::new_sync(|| Ok(9));
        assert_eq!(*memo.get().await.unwrap(), 9);
    }
}
