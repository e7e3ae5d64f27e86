use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use crate::aggregator::Aggregator;
use crate::error::{Error, Result};
use crate::partitioner::Partitioner;
use crate::rdd::{Rdd, RddBase};
use crate::serializable_traits::Data;
use crate::shuffle::ShuffleError;

// Revise if enum is good choice. Considering enum since down casting one trait object to another trait object is difficult.
#[derive(Clone)]
pub enum Dependency {
    NarrowDependency(Arc<dyn NarrowDependencyTrait>),
    ShuffleDependency(Arc<dyn ShuffleDependencyTrait>),
}

pub trait NarrowDependencyTrait: Send + Sync {
    fn get_parents(&self, partition_id: usize) -> Vec<usize>;
    fn get_rdd_base(&self) -> Arc<dyn RddBase>;
}

#[derive(Clone)]
pub(crate) struct OneToOneDependency {
    rdd_base: Arc<dyn RddBase>,
}

impl OneToOneDependency {
    pub fn new(rdd_base: Arc<dyn RddBase>) -> Self {
        OneToOneDependency { rdd_base }
    }
}

impl NarrowDependencyTrait for OneToOneDependency {
    fn get_parents(&self, partition_id: usize) -> Vec<usize> {
        vec![partition_id]
    }

    fn get_rdd_base(&self) -> Arc<dyn RddBase> {
        self.rdd_base.clone()
    }
}

pub trait ShuffleDependencyTrait: Send + Sync {
    fn get_shuffle_id(&self) -> usize;
    fn get_rdd_base(&self) -> Arc<dyn RddBase>;
    /// Computes one map partition of the parent, buckets it by the shuffle
    /// partitioner and stores the combined buckets for the reducers.
    fn do_shuffle_task(&self, partition: usize) -> Result<()>;
}

impl PartialOrd for dyn ShuffleDependencyTrait {
    fn partial_cmp(&self, other: &dyn ShuffleDependencyTrait) -> Option<Ordering> {
        Some(self.get_shuffle_id().cmp(&other.get_shuffle_id()))
    }
}

impl PartialEq for dyn ShuffleDependencyTrait {
    fn eq(&self, other: &dyn ShuffleDependencyTrait) -> bool {
        self.get_shuffle_id() == other.get_shuffle_id()
    }
}

impl Eq for dyn ShuffleDependencyTrait {}

impl Ord for dyn ShuffleDependencyTrait {
    fn cmp(&self, other: &dyn ShuffleDependencyTrait) -> Ordering {
        self.get_shuffle_id().cmp(&other.get_shuffle_id())
    }
}

pub(crate) struct ShuffleDependency<K: Data, V: Data, C: Data> {
    pub shuffle_id: usize,
    pub parent: Arc<dyn Rdd<Item = (K, V)>>,
    pub aggregator: Arc<Aggregator<K, V, C>>,
    pub partitioner: Box<dyn Partitioner>,
}

impl<K: Data, V: Data, C: Data> ShuffleDependency<K, V, C> {
    pub fn new(
        shuffle_id: usize,
        parent: Arc<dyn Rdd<Item = (K, V)>>,
        aggregator: Arc<Aggregator<K, V, C>>,
        partitioner: Box<dyn Partitioner>,
    ) -> Self {
        ShuffleDependency {
            shuffle_id,
            parent,
            aggregator,
            partitioner,
        }
    }
}

impl<K: Data + Eq + Hash, V: Data, C: Data> ShuffleDependencyTrait for ShuffleDependency<K, V, C> {
    fn get_shuffle_id(&self) -> usize {
        self.shuffle_id
    }

    fn get_rdd_base(&self) -> Arc<dyn RddBase> {
        self.parent.get_rdd_base()
    }

    fn do_shuffle_task(&self, partition: usize) -> Result<()> {
        log::debug!(
            "executing shuffle task #{} for partition #{}",
            self.shuffle_id,
            partition
        );
        let split = self
            .parent
            .splits()
            .into_iter()
            .nth(partition)
            .ok_or(Error::PartitionNotFound(partition))?;
        let aggregator = self.aggregator.clone();
        let num_output_splits = self.partitioner.get_num_of_partitions();
        let mut buckets: Vec<HashMap<K, C>> = (0..num_output_splits)
            .map(|_| HashMap::new())
            .collect::<Vec<_>>();

        for (k, v) in self.parent.iterator(split)? {
            let bucket_id = self.partitioner.get_partition(&k)?;
            let bucket = &mut buckets[bucket_id];
            if let Some(old_c) = bucket.remove(&k) {
                let output = (aggregator.merge_value)((old_c, v));
                bucket.insert(k, output);
            } else {
                let output = (aggregator.create_combiner)(v);
                bucket.insert(k, output);
            }
        }

        let context = self.parent.get_context();
        let env = context.env();
        for (i, bucket) in buckets.into_iter().enumerate() {
            let set: Vec<(K, C)> = bucket.into_iter().collect();
            let ser_bytes =
                bincode::serialize(&set).map_err(ShuffleError::SerializationError)?;
            log::trace!(
                "shuffle #{} partition #{} wrote {} records to bucket #{}",
                self.shuffle_id,
                partition,
                set.len(),
                i
            );
            env.shuffle_manager
                .put(self.shuffle_id, partition, i, ser_bytes);
        }
        env.map_output_tracker
            .register_map_output(self.shuffle_id, partition)?;
        Ok(())
    }
}
