use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::RemoteError;
use crate::model::certificate::{Certificate, normalize_all};
use crate::remote::ProvisioningClient;

pub type CertificateList = Arc<[Certificate]>;

type FetchResult = Result<CertificateList, RemoteError>;
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

struct CacheEntry {
    certificates: CertificateList,
    fetched_at: Instant,
    generation: u64,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration, generation: u64) -> bool {
        self.generation == generation && self.fetched_at.elapsed() < ttl
    }
}

struct InFlight {
    id: u64,
    fetch: SharedFetch,
}

#[derive(Default)]
struct CacheState {
    entry: Option<CacheEntry>,
    in_flight: Option<InFlight>,
    next_fetch_id: u64,
    /// Bumped by every invalidation. Entries recorded under an older
    /// generation are never served.
    generation: u64,
}

impl CacheState {
    fn release(&mut self, fetch_id: u64) {
        if self.in_flight.as_ref().is_some_and(|f| f.id == fetch_id) {
            self.in_flight = None;
        }
    }
}

/// Owned by the fetch task. Frees the in-flight slot however the task ends,
/// including a panic in the client or the runtime dropping the task.
struct FetchSlot {
    state: Arc<Mutex<CacheState>>,
    fetch_id: u64,
}

impl Drop for FetchSlot {
    fn drop(&mut self) {
        self.state.lock().release(self.fetch_id);
    }
}

/// Time-bounded cache of the certificate listing with at most one fetch in flight.
///
/// Callers that arrive while a fetch is running attach to it and receive the
/// same outcome. The fetch runs on its own task, so a caller giving up does not
/// cancel it and its result still lands in the cache.
#[derive(Clone)]
pub struct CertificateCache {
    client: Arc<dyn ProvisioningClient>,
    ttl: Duration,
    state: Arc<Mutex<CacheState>>,
}

impl CertificateCache {
    pub fn new(client: Arc<dyn ProvisioningClient>, ttl: Duration) -> Self {
        Self {
            client,
            ttl,
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    /// Return the certificate list, fetching it when there is no fresh entry
    /// or when `force_refresh` is set.
    pub async fn get(&self, force_refresh: bool) -> FetchResult {
        let fetch = {
            let mut state = self.state.lock();
            let generation = state.generation;

            if !force_refresh {
                if let Some(entry) = state
                    .entry
                    .as_ref()
                    .filter(|e| e.is_fresh(self.ttl, generation))
                {
                    debug!(
                        age_secs = entry.fetched_at.elapsed().as_secs(),
                        count = entry.certificates.len(),
                        "serving cached certificates"
                    );
                    return Ok(Arc::clone(&entry.certificates));
                }
            }

            match state.in_flight.as_ref().map(|f| f.fetch.clone()) {
                Some(fetch) => {
                    debug!("joining in-flight certificate fetch");
                    fetch
                }
                None => self.start_fetch(&mut state),
            }
        };

        fetch.await
    }

    /// Mark the current entry stale. The next [`get`](Self::get) fetches again.
    pub fn invalidate(&self) {
        let mut state = self.state.lock();
        state.generation = state.generation.wrapping_add(1);
        debug!(generation = state.generation, "certificate cache invalidated");
    }

    /// The last successfully fetched list, fresh or not.
    pub fn snapshot(&self) -> Option<CertificateList> {
        let state = self.state.lock();
        state.entry.as_ref().map(|e| Arc::clone(&e.certificates))
    }

    pub fn is_fresh(&self) -> bool {
        let state = self.state.lock();
        state
            .entry
            .as_ref()
            .is_some_and(|e| e.is_fresh(self.ttl, state.generation))
    }

    pub fn is_fetching(&self) -> bool {
        self.state.lock().in_flight.is_some()
    }

    fn start_fetch(&self, state: &mut CacheState) -> SharedFetch {
        let client = Arc::clone(&self.client);
        let generation = state.generation;
        let fetch_id = state.next_fetch_id;
        state.next_fetch_id = state.next_fetch_id.wrapping_add(1);
        let slot = FetchSlot {
            state: Arc::clone(&self.state),
            fetch_id,
        };

        // The state lock is held by the caller, so the task cannot record its
        // result before `in_flight` is set below.
        let task = tokio::spawn(async move {
            debug!(fetch_id, "fetching certificates from signing authority");
            let result = client
                .list_certificates()
                .await
                .map(|raw| CertificateList::from(normalize_all(raw)));

            let mut state = slot.state.lock();
            state.release(slot.fetch_id);
            match &result {
                Ok(certificates) => {
                    info!(count = certificates.len(), "certificate cache updated");
                    state.entry = Some(CacheEntry {
                        certificates: Arc::clone(certificates),
                        fetched_at: Instant::now(),
                        generation,
                    });
                }
                Err(e) => warn!(error = %e, "certificate fetch failed, keeping previous entry"),
            }
            drop(state);
            result
        });

        let fetch = async move {
            task.await.unwrap_or_else(|e| {
                warn!(fetch_id, error = %e, "certificate fetch task did not complete");
                Err(RemoteError::transport(format!(
                    "certificate fetch task failed: {e}"
                )))
            })
        }
        .boxed()
        .shared();

        state.in_flight = Some(InFlight {
            id: fetch_id,
            fetch: fetch.clone(),
        });
        fetch
    }
}
