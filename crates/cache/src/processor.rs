//! Asynchronous interface from orchestration tasks to the cache.
//!
//! Every operation is enqueued onto a bounded FIFO queue drained by a
//! fixed pool of workers. Reads resolve with the result; mutations
//! resolve at the *progress* point (the write is durable enough to
//! answer the upstream client) and hand back a [`Completion`] that
//! settles when the background index work finishes. A failed mutation
//! never reaches the progress point.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot, Mutex};
use uuid::Uuid;

use cx_domain::trace::TraceEvent;
use cx_subscription::{ImplicitRegistrationSet, ImsSubscription};

use crate::backend::{CacheError, HssCacheBackend};

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Handle for the background phase of a mutation. The underlying work
/// runs to completion whether or not the handle is consumed.
pub struct Completion {
    rx: oneshot::Receiver<Result<(), CacheError>>,
}

impl Completion {
    /// Wait for the background index work to finish.
    pub async fn settled(self) -> Result<(), CacheError> {
        self.rx
            .await
            .unwrap_or_else(|_| Err(CacheError::Unavailable("cache worker exited".into())))
    }

    /// Let the background work finish unobserved.
    pub fn detach(self) {}
}

/// Serialises cache operations onto the worker pool.
pub struct CacheProcessor {
    backend: Arc<dyn HssCacheBackend>,
    queue: mpsc::Sender<Job>,
}

impl CacheProcessor {
    /// Start `workers` pool tasks behind a queue of `queue_depth`
    /// entries. Work items are dispatched in FIFO order; a full queue
    /// back-pressures the caller at its suspension point.
    pub fn new(backend: Arc<dyn HssCacheBackend>, workers: usize, queue_depth: usize) -> Self {
        let (tx, rx) = mpsc::channel::<Job>(queue_depth.max(1));
        let rx = Arc::new(Mutex::new(rx));
        for _ in 0..workers.max(1) {
            let rx = Arc::clone(&rx);
            tokio::spawn(async move {
                loop {
                    let job = { rx.lock().await.recv().await };
                    match job {
                        Some(job) => job.await,
                        None => break,
                    }
                }
            });
        }
        Self { backend, queue: tx }
    }

    /// Factory for empty registration sets. Synchronous, unlike the
    /// rest of the interface.
    pub fn create_irs(&self) -> ImplicitRegistrationSet {
        ImplicitRegistrationSet::new()
    }

    async fn enqueue(&self, job: Job) -> Result<(), CacheError> {
        self.queue
            .send(job)
            .await
            .map_err(|_| CacheError::Unavailable("cache worker pool stopped".into()))
    }

    /// Run a read on the pool and wait for its result.
    async fn run_read<T, F, Fut>(
        &self,
        op: &'static str,
        key: String,
        trail: Uuid,
        f: F,
    ) -> Result<T, CacheError>
    where
        T: Send + 'static,
        F: FnOnce(Arc<dyn HssCacheBackend>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, CacheError>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let backend = Arc::clone(&self.backend);
        self.enqueue(Box::pin(async move {
            let started = Instant::now();
            let result = f(backend).await;
            TraceEvent::CacheOp {
                op: op.into(),
                key,
                outcome: outcome_of(&result),
                duration_ms: started.elapsed().as_millis() as u64,
            }
            .emit();
            let _ = tx.send(result);
        }))
        .await?;
        tracing::trace!(%trail, op, "cache read enqueued");
        rx.await
            .unwrap_or_else(|_| Err(CacheError::Unavailable("cache worker exited".into())))
    }

    /// Run a mutation on the pool: resolve at progress, return the
    /// success handle.
    async fn run_mutation<F, Fut, G, Gut>(
        &self,
        op: &'static str,
        key: String,
        trail: Uuid,
        primary: F,
        index: G,
    ) -> Result<Completion, CacheError>
    where
        F: FnOnce(Arc<dyn HssCacheBackend>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), CacheError>> + Send + 'static,
        G: FnOnce(Arc<dyn HssCacheBackend>) -> Gut + Send + 'static,
        Gut: Future<Output = Result<(), CacheError>> + Send + 'static,
    {
        let (progress_tx, progress_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();
        let backend = Arc::clone(&self.backend);
        self.enqueue(Box::pin(async move {
            let started = Instant::now();
            match primary(Arc::clone(&backend)).await {
                Err(e) => {
                    TraceEvent::CacheOp {
                        op: op.into(),
                        key,
                        outcome: outcome_of::<()>(&Err(e.clone())),
                        duration_ms: started.elapsed().as_millis() as u64,
                    }
                    .emit();
                    let _ = progress_tx.send(Err(e));
                }
                Ok(()) => {
                    let _ = progress_tx.send(Ok(()));
                    let result = index(backend).await;
                    if let Err(e) = &result {
                        tracing::warn!(op, error = %e, "cache index phase failed");
                    }
                    TraceEvent::CacheOp {
                        op: op.into(),
                        key,
                        outcome: outcome_of(&result),
                        duration_ms: started.elapsed().as_millis() as u64,
                    }
                    .emit();
                    let _ = done_tx.send(result);
                }
            }
        }))
        .await?;
        tracing::trace!(%trail, op, "cache mutation enqueued");
        progress_rx
            .await
            .unwrap_or_else(|_| Err(CacheError::Unavailable("cache worker exited".into())))?;
        Ok(Completion { rx: done_rx })
    }

    // ── reads ────────────────────────────────────────────────────────

    pub async fn get_irs_for_impu(
        &self,
        impu: &str,
        trail: Uuid,
    ) -> Result<ImplicitRegistrationSet, CacheError> {
        let impu = impu.to_owned();
        let key = impu.clone();
        self.run_read("get_irs_for_impu", key, trail, move |backend| async move {
            backend.read_irs(&impu).await
        })
        .await
    }

    pub async fn get_irs_for_impus(
        &self,
        impus: Vec<String>,
        trail: Uuid,
    ) -> Result<Vec<ImplicitRegistrationSet>, CacheError> {
        let key = impus.join(", ");
        self.run_read("get_irs_for_impus", key, trail, move |backend| async move {
            backend.read_irs_for_impus(&impus).await
        })
        .await
    }

    pub async fn get_irs_for_impis(
        &self,
        impis: Vec<String>,
        trail: Uuid,
    ) -> Result<Vec<ImplicitRegistrationSet>, CacheError> {
        let key = impis.join(", ");
        self.run_read("get_irs_for_impis", key, trail, move |backend| async move {
            backend.read_irs_for_impis(&impis).await
        })
        .await
    }

    pub async fn get_ims_subscription(
        &self,
        impi: &str,
        trail: Uuid,
    ) -> Result<ImsSubscription, CacheError> {
        let impi = impi.to_owned();
        let key = impi.clone();
        self.run_read("get_ims_subscription", key, trail, move |backend| async move {
            backend.read_subscription(&impi).await
        })
        .await
    }

    // ── mutations ────────────────────────────────────────────────────

    /// Write the set and, in the background, any new private-identity
    /// mappings.
    pub async fn put_irs(
        &self,
        irs: ImplicitRegistrationSet,
        trail: Uuid,
    ) -> Result<Completion, CacheError> {
        let key = irs.default_impu().to_owned();
        let index_irs = irs.clone();
        self.run_mutation(
            "put_irs",
            key,
            trail,
            move |backend| async move { backend.write_irs(&irs).await },
            move |backend| async move { backend.write_impi_index(&index_irs).await },
        )
        .await
    }

    pub async fn delete_irs(
        &self,
        irs: ImplicitRegistrationSet,
        trail: Uuid,
    ) -> Result<Completion, CacheError> {
        let key = irs.default_impu().to_owned();
        let index_irs = irs.clone();
        self.run_mutation(
            "delete_irs",
            key,
            trail,
            move |backend| async move { backend.remove_irs(&irs).await },
            move |backend| async move { backend.remove_impi_index(&index_irs).await },
        )
        .await
    }

    /// Delete several sets in one work item (registration termination).
    pub async fn delete_irs_many(
        &self,
        irss: Vec<ImplicitRegistrationSet>,
        trail: Uuid,
    ) -> Result<Completion, CacheError> {
        let key = irss
            .iter()
            .map(|irs| irs.default_impu().to_owned())
            .collect::<Vec<_>>()
            .join(", ");
        let index_irss = irss.clone();
        self.run_mutation(
            "delete_irs_many",
            key,
            trail,
            move |backend| async move {
                for irs in &irss {
                    match backend.remove_irs(irs).await {
                        Ok(()) | Err(CacheError::NotFound) => {}
                        Err(e) => return Err(e),
                    }
                }
                Ok(())
            },
            move |backend| async move {
                for irs in &index_irss {
                    backend.remove_impi_index(irs).await?;
                }
                Ok(())
            },
        )
        .await
    }

    /// Write back a subscription; only members touched since retrieval
    /// are written.
    pub async fn put_ims_subscription(
        &self,
        sub: ImsSubscription,
        trail: Uuid,
    ) -> Result<Completion, CacheError> {
        let key = sub
            .iter()
            .map(|irs| irs.default_impu().to_owned())
            .collect::<Vec<_>>()
            .join(", ");
        let index_sub = sub.clone();
        self.run_mutation(
            "put_ims_subscription",
            key,
            trail,
            move |backend| async move { backend.write_subscription(&sub).await },
            move |backend| async move { backend.write_subscription_index(&index_sub).await },
        )
        .await
    }
}

fn outcome_of<T>(result: &Result<T, CacheError>) -> String {
    match result {
        Ok(_) => "ok".into(),
        Err(CacheError::NotFound) => "not_found".into(),
        Err(CacheError::Unavailable(_)) => "unavailable".into(),
    }
}
