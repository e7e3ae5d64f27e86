use std::sync::Arc;

use crate::context::Context;
use crate::dependency::{Dependency, OneToOneDependency};
use crate::error::Result;
use crate::partitioner::Partitioner;
use crate::rdd::{Rdd, RddBase, RddVals};
use crate::serializable_traits::Data;
use crate::split::Split;

/// Keeps every computed partition of the parent in the context's cache, so
/// the parent's lineage runs at most once per partition.
pub struct CachedRdd<T: Data> {
    prev: Arc<dyn Rdd<Item = T>>,
    vals: Arc<RddVals>,
}

impl<T: Data> Clone for CachedRdd<T> {
    fn clone(&self) -> Self {
        CachedRdd {
            prev: self.prev.clone(),
            vals: self.vals.clone(),
        }
    }
}

impl<T: Data> CachedRdd<T> {
    pub(crate) fn new(prev: Arc<dyn Rdd<Item = T>>) -> Self {
        let mut vals = RddVals::new(prev.get_context());
        vals.dependencies
            .push(Dependency::NarrowDependency(Arc::new(
                OneToOneDependency::new(prev.get_rdd_base()),
            )));
        CachedRdd {
            prev,
            vals: Arc::new(vals),
        }
    }
}

impl<T: Data> RddBase for CachedRdd<T> {
    fn get_rdd_id(&self) -> usize {
        self.vals.id
    }

    fn get_context(&self) -> Arc<Context> {
        self.vals.context.clone()
    }

    fn get_op_name(&self) -> String {
        "cache".to_owned()
    }

    fn get_dependencies(&self) -> Vec<Dependency> {
        self.vals.dependencies.clone()
    }

    fn partitioner(&self) -> Option<Box<dyn Partitioner>> {
        self.prev.partitioner()
    }

    fn splits(&self) -> Vec<Box<dyn Split>> {
        self.prev.splits()
    }

    fn number_of_splits(&self) -> usize {
        self.prev.number_of_splits()
    }
}

impl<T: Data> Rdd for CachedRdd<T> {
    type Item = T;

    fn get_rdd_base(&self) -> Arc<dyn RddBase> {
        Arc::new(self.clone()) as Arc<dyn RddBase>
    }

    fn get_rdd(&self) -> Arc<dyn Rdd<Item = Self::Item>> {
        Arc::new(self.clone())
    }

    fn compute(&self, split: Box<dyn Split>) -> Result<Box<dyn Iterator<Item = Self::Item>>> {
        let prev = &self.prev;
        self.vals
            .context
            .env()
            .cache_tracker
            .get_or_compute(self.vals.id, split, |split| prev.iterator(split))
    }
}
