//! Debounced, sequenced search.
//!
//! Each submission takes a ticket from a monotonically increasing sequence.
//! A submission waits for the quiet period, and a newer submission cancels
//! any older one that is still waiting or in flight. Results are published
//! only when their ticket is still the latest, so a slow response for a
//! superseded filter can never overwrite a newer one.

use super::service::QueryOutcome;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

type FetchFuture<T> = Pin<Box<dyn Future<Output = QueryOutcome<T>> + Send>>;
type Fetcher<F, T> = Arc<dyn Fn(F) -> FetchFuture<T> + Send + Sync>;

#[derive(Debug, Default)]
pub struct SearchSequencer {
    latest: AtomicU64,
}

impl SearchSequencer {
    pub fn next(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.latest() == ticket
    }
}

#[derive(Debug)]
pub struct SearchResult<T> {
    pub ticket: u64,
    pub outcome: QueryOutcome<T>,
}

pub struct DebouncedSearch<F, T> {
    quiet_period: Duration,
    sequencer: Arc<SearchSequencer>,
    fetch: Fetcher<F, T>,
    pending: Mutex<CancellationToken>,
    results: watch::Sender<Option<Arc<SearchResult<T>>>>,
}

impl<F, T> DebouncedSearch<F, T>
where
    F: Send + 'static,
    T: Send + Sync + 'static,
{
    pub fn new<G>(quiet_period: Duration, fetch: G) -> Self
    where
        G: Fn(F) -> FetchFuture<T> + Send + Sync + 'static,
    {
        let (results, _) = watch::channel(None);
        Self {
            quiet_period,
            sequencer: Arc::new(SearchSequencer::default()),
            fetch: Arc::new(fetch),
            pending: Mutex::new(CancellationToken::new()),
            results,
        }
    }

    /// Queue a search and return its ticket. Must be called inside a Tokio runtime.
    pub fn submit(&self, filter: F) -> u64 {
        let ticket = self.sequencer.next();
        let token = CancellationToken::new();

        {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            let superseded = std::mem::replace(&mut *pending, token.clone());
            superseded.cancel();
        }

        let quiet_period = self.quiet_period;
        let sequencer = Arc::clone(&self.sequencer);
        let fetch = Arc::clone(&self.fetch);
        let results = self.results.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(quiet_period) => {}
            }

            let outcome = tokio::select! {
                _ = token.cancelled() => return,
                outcome = fetch(filter) => outcome,
            };

            let published = results.send_if_modified(|current| {
                if !sequencer.is_current(ticket) {
                    return false;
                }
                if current.as_ref().is_some_and(|c| c.ticket >= ticket) {
                    return false;
                }
                *current = Some(Arc::new(SearchResult { ticket, outcome }));
                true
            });

            if !published {
                tracing::debug!(ticket, "Discarded stale search result");
            }
        });

        ticket
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<SearchResult<T>>>> {
        self.results.subscribe()
    }

    pub fn latest(&self) -> Option<Arc<SearchResult<T>>> {
        self.results.borrow().clone()
    }
}
