use downcast_rs::{impl_downcast, DowncastSync};
use dyn_clone::DynClone;

/// A handle to one partition of an RDD.
pub trait Split: DowncastSync + DynClone {
    fn get_index(&self) -> usize;
}

impl_downcast!(sync Split);
dyn_clone::clone_trait_object!(Split);

#[derive(Clone, Debug)]
pub(crate) struct IndexSplit {
    index: usize,
}

impl IndexSplit {
    pub fn new(index: usize) -> Self {
        IndexSplit { index }
    }
}

impl Split for IndexSplit {
    fn get_index(&self) -> usize {
        self.index
    }
}
