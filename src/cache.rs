//! Memoization of parsed datasets by identity.
//!
//! A hit skips file parsing only; filtering and aggregation always re-run on
//! the cached records. A different key is always a miss.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::Result;
use crate::loader::{DatasetId, ScanDataset};

pub struct DatasetCache {
    capacity: usize,
    entries: HashMap<DatasetId, Arc<ScanDataset>>,
    /// Insertion order, oldest first.
    order: VecDeque<DatasetId>,
}

impl DatasetCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn get(&self, id: &DatasetId) -> Option<Arc<ScanDataset>> {
        self.entries.get(id).cloned()
    }

    pub fn contains(&self, id: &DatasetId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the cached dataset for `id`, running `load` only on a miss.
    /// A failed load leaves the cache untouched.
    pub fn get_or_load<F>(&mut self, id: &DatasetId, load: F) -> Result<Arc<ScanDataset>>
    where
        F: FnOnce() -> Result<ScanDataset>,
    {
        if let Some(dataset) = self.get(id) {
            debug!("Dataset cache hit: {}", id);
            return Ok(dataset);
        }

        debug!("Dataset cache miss: {}", id);
        let dataset = Arc::new(load()?);
        self.insert(id.clone(), dataset.clone());
        Ok(dataset)
    }

    pub fn insert(&mut self, id: DatasetId, dataset: Arc<ScanDataset>) {
        if self.entries.insert(id.clone(), dataset).is_some() {
            return;
        }
        self.order.push_back(id);

        while self.entries.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                info!("Evicting dataset {} from cache", oldest);
                self.entries.remove(&oldest);
            }
        }
    }
}
