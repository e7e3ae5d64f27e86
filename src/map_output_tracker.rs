use std::sync::Arc;

use crate::shuffle::{Result, ShuffleError};
use dashmap::DashMap;

/// Records which map tasks of every shuffle have written their output.
///
/// The key is the shuffle_id, the value holds one flag per map partition.
#[derive(Clone, Debug, Default)]
pub(crate) struct MapOutputTracker {
    outputs: Arc<DashMap<usize, Vec<bool>>>,
}

impl MapOutputTracker {
    pub fn new() -> Self {
        MapOutputTracker::default()
    }

    pub fn register_shuffle(&self, shuffle_id: usize, num_maps: usize) {
        if self.outputs.contains_key(&shuffle_id) {
            log::debug!("shuffle #{} already registered", shuffle_id);
            return;
        }
        log::debug!(
            "registering shuffle #{} with {} map partitions",
            shuffle_id,
            num_maps
        );
        self.outputs.insert(shuffle_id, vec![false; num_maps]);
    }

    pub fn register_map_output(&self, shuffle_id: usize, map_id: usize) -> Result<()> {
        log::debug!(
            "registering map output from shuffle task #{} with map id #{}",
            shuffle_id,
            map_id
        );
        let mut maps = self
            .outputs
            .get_mut(&shuffle_id)
            .ok_or(ShuffleError::UnknownShuffle(shuffle_id))?;
        let slot = maps.get_mut(map_id).ok_or(ShuffleError::MissingMapOutput {
            shuffle_id,
            map_id,
        })?;
        *slot = true;
        Ok(())
    }

    /// Whether every map partition of the shuffle has written its output.
    pub fn is_available(&self, shuffle_id: usize) -> bool {
        self.outputs
            .get(&shuffle_id)
            .map(|maps| maps.iter().all(|&done| done))
            .unwrap_or(false)
    }

    /// Forgets every map output of the shuffle. A later job that needs it
    /// registers the shuffle again and reruns its map stage.
    pub fn unregister_shuffle(&self, shuffle_id: usize) {
        if self.outputs.remove(&shuffle_id).is_some() {
            log::debug!("unregistered shuffle #{}", shuffle_id);
        }
    }

    /// Number of map outputs a reducer must read; fails if any is still missing.
    pub fn get_map_outputs(&self, shuffle_id: usize) -> Result<usize> {
        let maps = self
            .outputs
            .get(&shuffle_id)
            .ok_or(ShuffleError::UnknownShuffle(shuffle_id))?;
        match maps.iter().position(|&done| !done) {
            Some(map_id) => Err(ShuffleError::MissingMapOutput { shuffle_id, map_id }),
            None => Ok(maps.len()),
        }
    }

    /// Map partitions of the shuffle whose output has not been written yet.
    pub fn missing_map_outputs(&self, shuffle_id: usize) -> Vec<usize> {
        match self.outputs.get(&shuffle_id) {
            Some(maps) => maps
                .iter()
                .enumerate()
                .filter(|(_, &done)| !done)
                .map(|(map_id, _)| map_id)
                .collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outputs_become_available_once_all_maps_register() {
        let tracker = MapOutputTracker::new();
        tracker.register_shuffle(3, 2);
        assert!(!tracker.is_available(3));
        assert!(tracker.get_map_outputs(3).is_err());
        tracker.register_map_output(3, 1).unwrap();
        assert!(!tracker.is_available(3));
        assert_eq!(tracker.missing_map_outputs(3), vec![0]);
        tracker.register_map_output(3, 0).unwrap();
        assert!(tracker.is_available(3));
        assert_eq!(tracker.get_map_outputs(3).unwrap(), 2);
    }

    #[test]
    fn unknown_shuffle() {
        let tracker = MapOutputTracker::new();
        assert!(!tracker.is_available(0));
        assert!(tracker.register_map_output(0, 0).is_err());
        assert!(tracker.get_map_outputs(0).is_err());
    }

    #[test]
    fn unregistered_shuffle_starts_over() {
        let tracker = MapOutputTracker::new();
        tracker.register_shuffle(5, 1);
        tracker.register_map_output(5, 0).unwrap();
        assert!(tracker.is_available(5));
        tracker.unregister_shuffle(5);
        assert!(!tracker.is_available(5));
        assert!(tracker.get_map_outputs(5).is_err());
        tracker.register_shuffle(5, 1);
        assert_eq!(tracker.missing_map_outputs(5), vec![0]);
    }
}
