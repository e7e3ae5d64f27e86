use std::result::Result as StdResult;

use thiserror::Error;

mod shuffle_fetcher;
mod shuffle_manager;
mod shuffle_map_task;
// re-exports:
pub(crate) use shuffle_fetcher::ShuffleFetcher;
pub(crate) use shuffle_manager::ShuffleManager;
pub(crate) use shuffle_map_task::ShuffleMapTask;

pub(crate) type Result<T> = StdResult<T, ShuffleError>;

#[derive(Debug, Error)]
pub enum ShuffleError {
    #[error("failed to encode shuffle block")]
    SerializationError(#[source] bincode::Error),

    #[error("failed to decode shuffle block")]
    DeserializationError(#[source] bincode::Error),

    #[error("shuffle #{0} was never registered with the map output tracker")]
    UnknownShuffle(usize),

    #[error("map output #{map_id} of shuffle #{shuffle_id} is missing")]
    MissingMapOutput { shuffle_id: usize, map_id: usize },

    #[error("cached data not found for shuffle #{shuffle_id}, map #{map_id}, reduce #{reduce_id}")]
    RequestedCacheNotFound {
        shuffle_id: usize,
        map_id: usize,
        reduce_id: usize,
    },
}
