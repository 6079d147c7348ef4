//! Background source reprocessing.
//!
//! A [`ReprocessorQueue`] re-delivers historical sources to processors,
//! the pipeline used to rebuild snapshots and projections. `enqueue` is
//! non-blocking; a single consumer task works through requests one at a
//! time, so ordering is preserved within one queue. Each request names the
//! sources to replay (via the query abstraction), the processor to run them
//! through, an inter-item delay to bound backend load, and whether a
//! per-source failure aborts the rest of the request.

use std::{fmt, future::Future, pin::Pin, sync::Arc, time::Duration};

use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_stream::StreamExt as _;

use crate::{
    pointer::Id,
    processor::{ProcessorError, SourceProcessor},
    query::SourceQuery,
    store::SourceRepository,
};

/// The queue's consumer task is gone; no further requests are accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("reprocessor queue is no longer accepting requests")]
pub struct QueueClosed;

/// One reprocessing request.
pub struct ReprocessRequest<Q, P> {
    /// Which historical sources to replay.
    pub query: Q,
    /// The processor each fetched source is run through.
    pub processor: Arc<P>,
    /// Pause between sources, to bound backend load.
    pub delay: Duration,
    /// Abort the remainder of this request on the first per-source failure
    /// instead of logging and continuing.
    pub break_on_throw: bool,
}

impl<Q, P> ReprocessRequest<Q, P> {
    #[must_use]
    pub fn new(query: Q, processor: Arc<P>) -> Self {
        Self {
            query,
            processor,
            delay: Duration::ZERO,
            break_on_throw: false,
        }
    }

    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub const fn fail_fast(mut self) -> Self {
        self.break_on_throw = true;
        self
    }
}

impl<Q, P> fmt::Debug for ReprocessRequest<Q, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReprocessRequest")
            .field("delay", &self.delay)
            .field("break_on_throw", &self.break_on_throw)
            .finish_non_exhaustive()
    }
}

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Single-consumer background reprocessing queue.
///
/// Dropping the handle closes the channel; the consumer drains whatever was
/// already posted and exits. Call [`stop`](ReprocessorQueue::stop) to wait
/// for that drain explicitly. Cancellation propagates by closing the
/// channel, never by interrupting a request mid-source.
pub struct ReprocessorQueue<S> {
    store: S,
    jobs: Option<mpsc::UnboundedSender<Job>>,
    task: JoinHandle<()>,
}

impl<S: fmt::Debug> fmt::Debug for ReprocessorQueue<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReprocessorQueue")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl<S> ReprocessorQueue<S> {
    /// Spawn the consumer task over the given store.
    #[must_use]
    pub fn new(store: S) -> Self {
        let (jobs, mut requests) = mpsc::unbounded_channel::<Job>();

        let task = tokio::spawn(async move {
            while let Some(job) = requests.recv().await {
                job.await;
            }
            tracing::debug!("reprocessor queue drained and stopped");
        });

        Self {
            store,
            jobs: Some(jobs),
            task,
        }
    }

    /// Post a request; never blocks.
    ///
    /// The enumeration and replay run on the consumer task, one request at a
    /// time, in posting order.
    ///
    /// # Errors
    ///
    /// Returns [`QueueClosed`] if the queue was stopped.
    pub fn enqueue<D, Q, P>(&self, request: ReprocessRequest<Q, P>) -> Result<(), QueueClosed>
    where
        S: SourceRepository<D> + Clone + Send + Sync + 'static,
        D: Send + Sync + 'static,
        Q: SourceQuery + Send + Sync + 'static,
        P: SourceProcessor<D> + 'static,
    {
        let jobs = self.jobs.as_ref().ok_or(QueueClosed)?;
        let store = self.store.clone();
        let job: Job = Box::pin(run_request(store, request));
        jobs.send(job).map_err(|_| QueueClosed)
    }

    /// Close the queue, drain already-posted requests, and wait for the
    /// consumer to finish.
    ///
    /// Idempotent; later [`enqueue`](ReprocessorQueue::enqueue) calls report
    /// [`QueueClosed`].
    pub async fn stop(&mut self) {
        let Some(jobs) = self.jobs.take() else {
            return;
        };
        drop(jobs);
        let _ = (&mut self.task).await;
    }

    /// Whether the consumer task is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

async fn run_request<D, S, Q, P>(store: S, request: ReprocessRequest<Q, P>)
where
    S: SourceRepository<D>,
    Q: SourceQuery + Sync,
    P: SourceProcessor<D>,
{
    let ids: Vec<Id> = {
        let mut stream = store.enumerate_source_ids(&request.query);
        let mut ids = Vec::new();
        loop {
            match stream.next().await {
                None => break,
                Some(Ok(id)) => ids.push(id),
                Some(Err(error)) => {
                    tracing::error!(%error, "failed to enumerate sources for reprocessing");
                    return;
                }
            }
        }
        ids
    };
    tracing::debug!(source_count = ids.len(), "reprocessing request started");

    for id in ids {
        if let Err(error) = replay_one(&store, &request, id).await {
            if request.break_on_throw {
                tracing::error!(%error, source_id = %id, "reprocessing failed; aborting request");
                return;
            }
            tracing::error!(%error, source_id = %id, "reprocessing failed; continuing");
        }
        if !request.delay.is_zero() {
            tokio::time::sleep(request.delay).await;
        }
    }
    tracing::debug!("reprocessing request complete");
}

async fn replay_one<D, S, Q, P>(
    store: &S,
    request: &ReprocessRequest<Q, P>,
    id: Id,
) -> Result<(), ProcessorError>
where
    S: SourceRepository<D>,
    P: SourceProcessor<D>,
{
    let source = store.fetch_source(id).await.map_err(ProcessorError::from)?;
    let Some(source) = source else {
        tracing::warn!(source_id = %id, "source disappeared during reprocessing");
        return Ok(());
    };
    request.processor.process(&source).await
}
