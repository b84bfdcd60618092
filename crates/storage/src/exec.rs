//! Plumbing for the generated ops interfaces: a shared dispatch path that
//! runs blocking store calls on the thread pool, and the macro that stamps
//! out `_blocking`/`_chan`/`_async` method triples for a database trait.

pub use velum_db::{errors::DbError, DbResult};

/// Handle for receiving a result from a database operation running on
/// another thread.
pub type DbRecv<T> = tokio::sync::oneshot::Receiver<DbResult<T>>;

/// Runs a blocking store closure on the pool, handing back the receiver
/// the result will arrive on.
pub(crate) fn dispatch<T, F>(pool: &threadpool::ThreadPool, op: F) -> DbRecv<T>
where
    T: Send + 'static,
    F: FnOnce() -> DbResult<T> + Send + 'static,
{
    let (resp_tx, resp_rx) = tokio::sync::oneshot::channel();
    pool.execute(move || {
        if resp_tx.send(op()).is_err() {
            tracing::warn!("db response receiver dropped");
        }
    });
    resp_rx
}

/// Awaits a dispatched operation, mapping a vanished worker thread to an
/// error instead of a panic.
pub(crate) async fn recv<T>(resp_rx: DbRecv<T>) -> DbResult<T> {
    match resp_rx.await {
        Ok(res) => res,
        Err(_) => Err(DbError::WorkerFailedStrangely),
    }
}

/// Generates an ops interface over one of the (object-safe) database
/// traits.  The store generic is erased behind `dyn Trait` at
/// construction, so the interface type stays plain; every listed method
/// comes out in three forms:
///
/// - `<name>_blocking(..)` runs the call on the current thread,
/// - `<name>_chan(..)` schedules it on the pool and returns the receiver,
/// - `<name>_async(..)` schedules and awaits it.
///
/// ```ignore
/// inst_db_ops! {
///     SnapshotDataOps(velum_db::traits::SnapshotDatabase) {
///         put_snapshot(id: BatchId, snapshot: StateSnapshot) -> ();
///         get_snapshot(id: BatchId) -> Option<StateSnapshot>;
///     }
/// }
/// ```
macro_rules! inst_db_ops {
    {
        $base:ident ( $dbtrait:path ) {
            $($iname:ident($($aname:ident: $aty:ty),*) -> $ret:ty;)*
        }
    } => {
        pub struct $base {
            pool: threadpool::ThreadPool,
            store: std::sync::Arc<dyn $dbtrait + Send + Sync>,
        }

        impl $base {
            pub fn new<D>(pool: threadpool::ThreadPool, db: std::sync::Arc<D>) -> Self
            where
                D: $dbtrait + Send + Sync + 'static,
            {
                Self { pool, store: db }
            }

            paste::paste! {
                $(
                    pub fn [<$iname _blocking>](&self, $($aname: $aty),*) -> DbResult<$ret> {
                        self.store.$iname($($aname),*)
                    }

                    pub fn [<$iname _chan>](&self, $($aname: $aty),*) -> DbRecv<$ret> {
                        let store = self.store.clone();
                        $crate::exec::dispatch(&self.pool, move || store.$iname($($aname),*))
                    }

                    pub async fn [<$iname _async>](&self, $($aname: $aty),*) -> DbResult<$ret> {
                        $crate::exec::recv(self.[<$iname _chan>]($($aname),*)).await
                    }
                )*
            }
        }
    }
}

pub(crate) use inst_db_ops;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use velum_db::{errors::DbError, DbResult};

    use super::{dispatch, recv};

    #[tokio::test(flavor = "current_thread")]
    async fn test_dispatch_roundtrip() {
        let pool = threadpool::ThreadPool::new(1);
        let value = Arc::new(41u32);
        let v = value.clone();
        let rx = dispatch(&pool, move || Ok(*v + 1));
        assert_eq!(recv(rx).await.unwrap(), 42);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_dropped_worker_surfaces_as_error() {
        // a receiver whose sender is gone without ever sending
        let (tx, rx) = tokio::sync::oneshot::channel::<DbResult<u32>>();
        drop(tx);
        assert!(matches!(recv(rx).await, Err(DbError::WorkerFailedStrangely)));
    }
}
