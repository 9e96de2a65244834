use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use autoscale_cuckoo_filter::CuckooFilter;
use moka::future::Cache;
use tracing::info;

use crate::error::LeaveResult;
use crate::store::RecordStore;

/// Expected capacity and false-positive rate.
/// Tune these based on real user counts.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;
const CACHE_CAPACITY: u64 = 500_000;
const CACHE_TTL: Duration = Duration::from_secs(86_400);

#[inline]
fn normalize(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Fast username availability check in front of the identity store.
///
/// The cuckoo filter answers "definitely free" without touching storage; the cache
/// answers "definitely taken" for names seen recently. Anything else falls through
/// to the store, which stays authoritative.
pub struct UsernameIndex {
    filter: RwLock<CuckooFilter<String>>,
    taken: Cache<String, ()>,
}

impl Default for UsernameIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl UsernameIndex {
    pub fn new() -> Self {
        Self {
            filter: RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)),
            taken: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(CACHE_TTL)
                .build(),
        }
    }

    /// false positives possible, false negatives not
    pub fn might_exist(&self, username: &str) -> bool {
        self.filter
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&normalize(username))
    }

    pub async fn mark_taken(&self, username: &str) {
        let username = normalize(username);
        self.filter
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .add(&username);
        self.taken.insert(username, ()).await;
    }

    pub async fn is_available(&self, username: &str, store: &dyn RecordStore) -> LeaveResult<bool> {
        if !self.might_exist(username) {
            return Ok(true);
        }
        if self.taken.get(&normalize(username)).await.is_some() {
            return Ok(false);
        }
        Ok(store.find_user_by_username(username.trim()).await?.is_none())
    }

    /// Loads every existing username into the filter.
    pub async fn warmup(&self, store: &dyn RecordStore) -> LeaveResult<usize> {
        let usernames = store.usernames().await?;
        {
            let mut filter = self.filter.write().unwrap_or_else(PoisonError::into_inner);
            for username in &usernames {
                filter.add(&normalize(username));
            }
        }
        info!(total = usernames.len(), "Username filter warmup complete");
        Ok(usernames.len())
    }
}
