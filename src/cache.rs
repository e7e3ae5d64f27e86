use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::serializable_traits::Data;
use crate::split::Split;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};

/// Memory store for the partitions of cached RDDs, keyed by
/// `(rdd_id, partition)`. Partitions are kept bincode encoded until the
/// context goes away.
#[derive(Default)]
pub(crate) struct CacheTracker {
    partitions: DashMap<(usize, usize), Arc<Vec<u8>>>,
    loading: Mutex<HashSet<(usize, usize)>>,
    loaded: Condvar,
}

// Releases a loading slot even when the computing task panics.
struct LoadingGuard<'a> {
    tracker: &'a CacheTracker,
    key: (usize, usize),
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.tracker.loading.lock().remove(&self.key);
        self.tracker.loaded.notify_all();
    }
}

impl CacheTracker {
    pub fn new() -> Self {
        CacheTracker::default()
    }

    fn get<T: Data>(&self, key: (usize, usize)) -> Result<Option<Vec<T>>> {
        match self.partitions.get(&key) {
            Some(bytes) => Ok(Some(
                bincode::deserialize(bytes.value()).map_err(Error::CacheEncoding)?,
            )),
            None => Ok(None),
        }
    }

    /// Returns the cached partition, or computes it with `compute` and stores
    /// it. Concurrent callers for the same partition wait for the first one
    /// instead of computing it again.
    pub fn get_or_compute<T: Data, F>(
        &self,
        rdd_id: usize,
        split: Box<dyn Split>,
        compute: F,
    ) -> Result<Box<dyn Iterator<Item = T>>>
    where
        F: FnOnce(Box<dyn Split>) -> Result<Box<dyn Iterator<Item = T>>>,
    {
        let key = (rdd_id, split.get_index());
        {
            let mut loading = self.loading.lock();
            loop {
                if let Some(values) = self.get::<T>(key)? {
                    log::trace!("cache hit for rdd #{} partition #{}", key.0, key.1);
                    return Ok(Box::new(values.into_iter()));
                }
                if !loading.contains(&key) {
                    break;
                }
                self.loaded.wait(&mut loading);
            }
            loading.insert(key);
        }
        let _guard = LoadingGuard { tracker: self, key };

        let values: Vec<T> = compute(split)?.collect();
        let bytes = bincode::serialize(&values).map_err(Error::CacheEncoding)?;
        log::debug!(
            "caching {} bytes for rdd #{} partition #{}",
            bytes.len(),
            key.0,
            key.1
        );
        self.partitions.insert(key, Arc::new(bytes));
        Ok(Box::new(values.into_iter()))
    }

    pub fn clear(&self) {
        self.partitions.clear();
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::IndexSplit;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn split(index: usize) -> Box<dyn Split> {
        Box::new(IndexSplit::new(index))
    }

    #[test]
    fn computes_each_partition_once() -> Result<()> {
        let tracker = CacheTracker::new();
        let calls = AtomicUsize::new(0);
        let compute = |_split: Box<dyn Split>| -> Result<Box<dyn Iterator<Item = u32>>> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(vec![1, 2, 3].into_iter()))
        };
        for _ in 0..3 {
            let values: Vec<u32> = tracker.get_or_compute(7, split(0), compute)?.collect();
            assert_eq!(values, vec![1, 2, 3]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        tracker.get_or_compute(7, split(1), compute)?.for_each(drop);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.num_partitions(), 2);
        tracker.clear();
        assert_eq!(tracker.num_partitions(), 0);
        Ok(())
    }

    #[test]
    fn failed_computation_is_not_cached() {
        let tracker = CacheTracker::new();
        let failing = |_split: Box<dyn Split>| -> Result<Box<dyn Iterator<Item = u32>>> {
            Err(Error::PartitionNotFound(0))
        };
        assert!(tracker.get_or_compute(3, split(0), failing).is_err());
        assert_eq!(tracker.num_partitions(), 0);
        let values: Vec<u32> = tracker
            .get_or_compute(3, split(0), |_| {
                Ok(Box::new(std::iter::once(9u32)) as Box<dyn Iterator<Item = u32>>)
            })
            .unwrap()
            .collect();
        assert_eq!(values, vec![9]);
    }
}
