//! Resource synchronization loop
//!
//! Polls the merged build intent view on a fixed interval and publishes each
//! result as a `Snapshot`. Polls never overlap: the next one is scheduled only
//! after the previous fetch settles. A forced refresh runs out of band and
//! leaves the poll schedule alone.
//!
//! Every fetch takes a ticket before it starts. A result is applied only if
//! its ticket is newer than the last applied one and the watch is still open,
//! so late answers from slow requests or from a torn-down watch are dropped.

use anyhow::Result;
use async_trait::async_trait;
use notebook_images_common::CreDetails;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Source of the merged view
#[async_trait]
pub trait Fetch: Send + Sync + 'static {
    async fn fetch(&self) -> Result<Vec<CreDetails>>;
}

#[async_trait]
impl<T: Fetch> Fetch for Arc<T> {
    async fn fetch(&self) -> Result<Vec<CreDetails>> {
        self.as_ref().fetch().await
    }
}

/// What consumers see
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub resources: Vec<CreDetails>,
    /// False until the first fetch settles, and again while a refresh runs
    pub loaded: bool,
    /// Message of the latest failed fetch. Resources keep their last good value.
    pub load_error: Option<String>,
}

struct Shared<F> {
    fetcher: F,
    snapshot: watch::Sender<Snapshot>,
    /// Ticket of the last result written into the snapshot
    applied: Mutex<u64>,
    tickets: AtomicU64,
    /// Set on teardown, never cleared
    closed: AtomicBool,
}

impl<F: Fetch> Shared<F> {
    fn new(fetcher: F) -> Self {
        let (snapshot, _) = watch::channel(Snapshot::default());
        Self {
            fetcher,
            snapshot,
            applied: Mutex::new(0),
            tickets: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn fetch_and_publish(&self) {
        let ticket = self.ticket();
        let result = self.fetcher.fetch().await;
        self.publish(ticket, result).await;
    }

    /// Applies a fetch result unless it is stale. Returns whether it was applied.
    async fn publish(&self, ticket: u64, result: Result<Vec<CreDetails>>) -> bool {
        let mut applied = self.applied.lock().await;

        if self.is_closed() {
            debug!("Watch closed, dropping result of fetch {}", ticket);
            return false;
        }
        if ticket <= *applied {
            debug!(
                "Dropping stale result of fetch {} (applied {})",
                ticket, *applied
            );
            return false;
        }
        *applied = ticket;

        match result {
            Ok(resources) => {
                debug!("Fetch {} returned {} resources", ticket, resources.len());
                self.snapshot.send_modify(|s| {
                    s.resources = resources;
                    s.loaded = true;
                    s.load_error = None;
                });
            }
            Err(e) => {
                warn!("Failed to fetch resources: {:#}", e);
                self.snapshot.send_modify(|s| {
                    s.loaded = true;
                    s.load_error = Some(e.to_string());
                });
            }
        }
        true
    }

    async fn poll(self: Arc<Self>, interval: Duration) {
        loop {
            if self.is_closed() {
                break;
            }
            self.fetch_and_publish().await;
            sleep(interval).await;
        }
    }
}

/// Handle to a running synchronization loop. Dropping it tears the loop down
/// like `shutdown` does.
pub struct ResourceWatch<F: Fetch> {
    shared: Arc<Shared<F>>,
    poller: JoinHandle<()>,
}

impl<F: Fetch> ResourceWatch<F> {
    /// Starts polling right away, then every `interval`.
    pub fn spawn(fetcher: F, interval: Duration) -> Self {
        let shared = Arc::new(Shared::new(fetcher));

        info!("Starting resource watch (polling every {:?})", interval);
        let poller = tokio::spawn(Arc::clone(&shared).poll(interval));

        Self { shared, poller }
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.shared.snapshot.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.shared.snapshot.borrow().clone()
    }

    /// One-shot fetch outside the poll schedule. The returned handle finishes
    /// once its result has been applied or dropped.
    pub async fn refresh(&self) -> JoinHandle<()> {
        if !self.shared.is_closed() {
            self.shared.snapshot.send_if_modified(|s| {
                let changed = s.loaded;
                s.loaded = false;
                changed
            });
        }

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move { shared.fetch_and_publish().await })
    }

    /// Stops polling. Fetches still in flight finish but are not applied.
    pub async fn shutdown(&self) {
        self.close();
        // wait out a publish that saw the watch still open
        drop(self.shared.applied.lock().await);
        info!("Resource watch stopped");
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.poller.abort();
    }
}

impl<F: Fetch> Drop for ResourceWatch<F> {
    fn drop(&mut self) {
        self.close();
    }
}
