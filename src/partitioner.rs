use std::any::Any;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::error::{Error, Result};
use crate::serializable_traits::Data;
use downcast_rs::{impl_downcast, Downcast};
use fnv::FnvHasher;

/// Partitioner trait for creating Rdd partitions
pub trait Partitioner: Downcast + Send + Sync + dyn_clone::DynClone {
    fn equals(&self, other: &dyn Any) -> bool;
    fn get_num_of_partitions(&self) -> usize;
    fn get_partition(&self, key: &dyn Any) -> Result<usize>;
}
impl_downcast!(Partitioner);
dyn_clone::clone_trait_object!(Partitioner);

fn hash<T: Hash>(t: &T) -> u64 {
    let mut s = FnvHasher::default();
    t.hash(&mut s);
    s.finish()
}

#[derive(Debug, Clone)]
pub struct HashPartitioner<K: Data + Hash + Eq> {
    partitions: usize,
    _marker: PhantomData<K>,
}

// Hash partitioner placing a key by its hash modulo the number of partitions.
impl<K: Data + Hash + Eq> HashPartitioner<K> {
    pub fn new(partitions: usize) -> Self {
        HashPartitioner {
            partitions: partitions.max(1),
            _marker: PhantomData,
        }
    }
}

impl<K: Data + Hash + Eq> Partitioner for HashPartitioner<K> {
    fn equals(&self, other: &dyn Any) -> bool {
        if let Some(hp) = other.downcast_ref::<HashPartitioner<K>>() {
            self.partitions == hp.partitions
        } else {
            false
        }
    }

    fn get_num_of_partitions(&self) -> usize {
        self.partitions
    }

    fn get_partition(&self, key: &dyn Any) -> Result<usize> {
        let key = key
            .downcast_ref::<K>()
            .ok_or(Error::DowncastFailure("key type in hash partitioner"))?;
        Ok((hash(key) % self.partitions as u64) as usize)
    }
}
