use std::cmp::Ordering;
use std::fmt::Display;
use std::sync::Arc;

use crate::dependency::ShuffleDependencyTrait;
use crate::map_output_tracker::MapOutputTracker;
use crate::rdd::RddBase;

/// A pipeline of narrow transformations ending either at a shuffle
/// boundary (shuffle map stage) or at the job's final RDD.
#[derive(Clone)]
pub(crate) struct Stage {
    pub id: usize,
    pub num_partitions: usize,
    pub shuffle_dependency: Option<Arc<dyn ShuffleDependencyTrait>>,
    pub rdd: Arc<dyn RddBase>,
    pub parents: Vec<Stage>,
}

impl PartialOrd for Stage {
    fn partial_cmp(&self, other: &Stage) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Stage {
    fn eq(&self, other: &Stage) -> bool {
        self.id == other.id
    }
}

impl Eq for Stage {}

impl Ord for Stage {
    fn cmp(&self, other: &Stage) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Stage {}", self.id)
    }
}

impl Stage {
    pub fn new(
        id: usize,
        rdd: Arc<dyn RddBase>,
        shuffle_dependency: Option<Arc<dyn ShuffleDependencyTrait>>,
        parents: Vec<Stage>,
    ) -> Self {
        Stage {
            id,
            num_partitions: rdd.number_of_splits(),
            shuffle_dependency,
            parents,
            rdd,
        }
    }

    /// A shuffle map stage is available once every map output is registered.
    pub fn is_available(&self, tracker: &MapOutputTracker) -> bool {
        match &self.shuffle_dependency {
            Some(dep) => tracker.is_available(dep.get_shuffle_id()),
            None => self.parents.is_empty(),
        }
    }
}
