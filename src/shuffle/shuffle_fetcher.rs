use crate::env::Env;
use crate::serializable_traits::Data;
use crate::shuffle::*;

/// Reads the reduce side of a shuffle from the local block store.
pub(crate) struct ShuffleFetcher;

impl ShuffleFetcher {
    pub fn fetch<K: Data, V: Data>(
        env: &Env,
        shuffle_id: usize,
        reduce_id: usize,
        mut func: impl FnMut((K, V)),
    ) -> Result<()> {
        log::debug!(
            "fetching shuffle #{} for reduce partition #{}",
            shuffle_id,
            reduce_id
        );
        let num_maps = env.map_output_tracker.get_map_outputs(shuffle_id)?;
        let mut total_records = 0;
        for map_id in 0..num_maps {
            let block = env.shuffle_manager.get(shuffle_id, map_id, reduce_id)?;
            let set = bincode::deserialize::<Vec<(K, V)>>(&block)
                .map_err(ShuffleError::DeserializationError)?;
            total_records += set.len();
            set.into_iter().for_each(&mut func);
        }
        log::debug!(
            "fetched {} combined records from {} map outputs of shuffle #{}",
            total_records,
            num_maps,
            shuffle_id
        );
        Ok(())
    }
}
