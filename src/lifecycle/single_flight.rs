//! Single-flight memoization of an async computation.
//!
//! The first caller runs the computation; callers arriving while it is in
//! flight wait for the same outcome; later callers get the stored outcome.
//! Failures are stored too and replayed rather than retried.

use std::future::Future;

use tokio::sync::OnceCell;

#[derive(Debug)]
pub struct SingleFlight<T, E> {
    cell: OnceCell<Result<T, E>>,
}

impl<T, E> Default for SingleFlight<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> SingleFlight<T, E> {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }
}

impl<T: Clone, E: Clone> SingleFlight<T, E> {
    /// Run `f` at most once per instance and share its outcome.
    ///
    /// If the running caller is cancelled before finishing, the next caller
    /// starts the computation again.
    pub async fn run<F, Fut>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.cell.get_or_init(f).await.clone()
    }
}
