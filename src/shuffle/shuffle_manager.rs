use std::sync::Arc;

use crate::shuffle::*;
use dashmap::DashMap;

/// In-process store for encoded shuffle blocks, keyed by
/// `(shuffle_id, map_id, reduce_id)`.
#[derive(Clone, Debug, Default)]
pub(crate) struct ShuffleManager {
    blocks: Arc<DashMap<(usize, usize, usize), Arc<Vec<u8>>>>,
}

impl ShuffleManager {
    pub fn new() -> Self {
        ShuffleManager::default()
    }

    pub fn put(&self, shuffle_id: usize, map_id: usize, reduce_id: usize, block: Vec<u8>) {
        log::trace!(
            "storing {} bytes for shuffle #{} map #{} reduce #{}",
            block.len(),
            shuffle_id,
            map_id,
            reduce_id
        );
        self.blocks
            .insert((shuffle_id, map_id, reduce_id), Arc::new(block));
    }

    pub fn get(&self, shuffle_id: usize, map_id: usize, reduce_id: usize) -> Result<Arc<Vec<u8>>> {
        self.blocks
            .get(&(shuffle_id, map_id, reduce_id))
            .map(|block| block.value().clone())
            .ok_or(ShuffleError::RequestedCacheNotFound {
                shuffle_id,
                map_id,
                reduce_id,
            })
    }

    /// Drops every block written for `shuffle_id`.
    pub fn remove_shuffle(&self, shuffle_id: usize) {
        let before = self.blocks.len();
        self.blocks.retain(|&(id, _, _), _| id != shuffle_id);
        log::debug!(
            "removed {} blocks of shuffle #{}",
            before.saturating_sub(self.blocks.len()),
            shuffle_id
        );
    }

    pub fn clean_up_shuffle_data(&self) {
        self.blocks.clear();
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }
}
