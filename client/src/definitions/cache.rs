use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use futures::{
    future::{BoxFuture, Shared},
    FutureExt,
};
use log::{debug, warn};

use mirror_shared::{Definition, DefinitionTracker, ResourceId};

use crate::{CacheStats, DefinitionError, DefinitionSource};

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<Definition>, DefinitionError>>>;

struct CacheEntry {
    definition: Arc<Definition>,
    last_used: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<ResourceId, CacheEntry>,
    // pin counts from live objects; may name ids that are not resident yet
    pins: HashMap<ResourceId, usize>,
    in_flight: HashMap<ResourceId, SharedFetch>,
    clock: u64,
    stats: CacheStats,
}

impl CacheState {
    fn touch(&mut self, resource_id: &str) -> Option<Arc<Definition>> {
        self.clock += 1;
        let clock = self.clock;
        let entry = self.entries.get_mut(resource_id)?;
        entry.last_used = clock;
        Some(entry.definition.clone())
    }

    fn insert(&mut self, definition: Arc<Definition>, capacity: usize) {
        self.clock += 1;
        self.entries.insert(
            definition.id.clone(),
            CacheEntry {
                definition,
                last_used: self.clock,
            },
        );
        self.evict(capacity);
    }

    // Only unpinned entries are evicted; the cache may stay above capacity
    // when everything resident is pinned.
    fn evict(&mut self, capacity: usize) {
        while self.entries.len() > capacity {
            let victim = self
                .entries
                .iter()
                .filter(|(id, _)| !self.pins.contains_key(id.as_str()))
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(id, _)| id.clone());
            let Some(victim) = victim else {
                debug!(
                    "definition cache holds {} pinned entries over capacity {}",
                    self.entries.len(),
                    capacity
                );
                return;
            };
            self.entries.remove(&victim);
            self.stats.evictions += 1;
            debug!("evicted definition '{}'", victim);
        }
    }
}

/// Least-recently-used cache of immutable definitions.
///
/// A miss asks each source in turn. Concurrent misses on the same id share
/// one fetch, and the fetch finishes (and fills the cache) even if every
/// caller stops waiting. Entries referenced by live objects are pinned and
/// never evicted.
pub struct DefinitionCache {
    capacity: usize,
    sources: Arc<Vec<Arc<dyn DefinitionSource>>>,
    state: Arc<Mutex<CacheState>>,
}

impl DefinitionCache {
    pub fn new(capacity: usize, sources: Vec<Arc<dyn DefinitionSource>>) -> Self {
        Self {
            capacity,
            sources: Arc::new(sources),
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the definition for `resource_id`, fetching it on a miss
    pub async fn resolve(
        &self,
        resource_id: &str,
    ) -> Result<Arc<Definition>, DefinitionError> {
        let fetch = {
            let mut state = lock_state(&self.state);
            state.stats.lookups += 1;
            if let Some(definition) = state.touch(resource_id) {
                state.stats.hits += 1;
                return Ok(definition);
            }
            state.stats.misses += 1;
            self.fetch_locked(&mut state, resource_id)
        };
        fetch.await
    }

    /// Starts fetching `resource_id` in the background unless it is resident
    /// or already on its way
    pub fn prefetch(&self, resource_id: &str) {
        let mut state = lock_state(&self.state);
        if state.entries.contains_key(resource_id) {
            return;
        }
        drop(self.fetch_locked(&mut state, resource_id));
    }

    /// Resident definition, without fetching or touching recency
    pub fn peek(&self, resource_id: &str) -> Option<Arc<Definition>> {
        lock_state(&self.state)
            .entries
            .get(resource_id)
            .map(|entry| entry.definition.clone())
    }

    pub fn contains(&self, resource_id: &str) -> bool {
        lock_state(&self.state).entries.contains_key(resource_id)
    }

    pub fn len(&self) -> usize {
        lock_state(&self.state).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pin_count(&self, resource_id: &str) -> usize {
        lock_state(&self.state)
            .pins
            .get(resource_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn stats(&self) -> CacheStats {
        lock_state(&self.state).stats
    }

    fn fetch_locked(&self, state: &mut CacheState, resource_id: &str) -> SharedFetch {
        if let Some(fetch) = state.in_flight.get(resource_id) {
            return fetch.clone();
        }
        state.stats.fetches += 1;

        let resource_id = resource_id.to_string();
        let task = tokio::spawn(fetch_from_sources(
            resource_id.clone(),
            self.sources.clone(),
            self.state.clone(),
            self.capacity,
        ));
        let task_id = resource_id.clone();
        let fetch = async move {
            match task.await {
                Ok(result) => result,
                Err(error) => Err(DefinitionError::Fetch {
                    resource_id: task_id,
                    source_name: "cache".to_string(),
                    reason: error.to_string(),
                }),
            }
        }
        .boxed()
        .shared();

        state.in_flight.insert(resource_id, fetch.clone());
        fetch
    }
}

impl DefinitionTracker for DefinitionCache {
    fn retain(&self, resource_id: &ResourceId) {
        *lock_state(&self.state)
            .pins
            .entry(resource_id.clone())
            .or_default() += 1;
    }

    fn release(&self, resource_id: &ResourceId) {
        let mut state = lock_state(&self.state);
        let remaining = match state.pins.get_mut(resource_id) {
            Some(count) => {
                *count -= 1;
                *count
            }
            None => {
                warn!("released definition '{}' that was not pinned", resource_id);
                return;
            }
        };
        if remaining == 0 {
            state.pins.remove(resource_id);
            state.evict(self.capacity);
        }
    }
}

async fn fetch_from_sources(
    resource_id: ResourceId,
    sources: Arc<Vec<Arc<dyn DefinitionSource>>>,
    state: Arc<Mutex<CacheState>>,
    capacity: usize,
) -> Result<Arc<Definition>, DefinitionError> {
    let result = first_match(&resource_id, &sources).await;

    let mut state = lock_state(&state);
    state.in_flight.remove(&resource_id);
    match result {
        Ok(definition) => {
            let definition = Arc::new(definition);
            state.insert(definition.clone(), capacity);
            Ok(definition)
        }
        Err(error) => {
            warn!("could not resolve definition '{}': {}", resource_id, error);
            Err(error)
        }
    }
}

async fn first_match(
    resource_id: &ResourceId,
    sources: &[Arc<dyn DefinitionSource>],
) -> Result<Definition, DefinitionError> {
    for source in sources {
        if let Some(definition) = source.fetch(resource_id.clone()).await? {
            if definition.id != *resource_id {
                return Err(DefinitionError::InvalidDefinition {
                    resource_id: resource_id.clone(),
                    reason: format!(
                        "{} answered with definition '{}'",
                        source.name(),
                        definition.id
                    ),
                });
            }
            debug!("definition '{}' found in {}", resource_id, source.name());
            return Ok(definition);
        }
    }
    Err(DefinitionError::NotFound {
        resource_id: resource_id.clone(),
    })
}

fn lock_state(state: &Mutex<CacheState>) -> MutexGuard<'_, CacheState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
