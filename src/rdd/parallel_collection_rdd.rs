//! This module implements parallel collection RDD for dividing the input collection for parallel processing.
use std::sync::Arc;

use crate::context::Context;
use crate::dependency::Dependency;
use crate::error::{Error, Result};
use crate::rdd::{Rdd, RddBase, RddVals};
use crate::serializable_traits::Data;
use crate::split::Split;

#[derive(Clone)]
pub struct ParallelCollectionSplit<T> {
    index: usize,
    values: Arc<Vec<T>>,
}

impl<T: Data> Split for ParallelCollectionSplit<T> {
    fn get_index(&self) -> usize {
        self.index
    }
}

impl<T: Data> ParallelCollectionSplit<T> {
    fn new(index: usize, values: Arc<Vec<T>>) -> Self {
        ParallelCollectionSplit {
            index,
            values,
        }
    }

    fn iterator(&self) -> Box<dyn Iterator<Item = T>> {
        let data = self.values.clone();
        let len = data.len();
        Box::new((0..len).map(move |i| data[i].clone()))
    }
}

struct ParallelCollectionVals<T> {
    vals: Arc<RddVals>,
    splits_: Vec<Arc<Vec<T>>>,
}

/// An in-memory collection cut into contiguous slices, one per partition.
pub struct ParallelCollection<T> {
    rdd_vals: Arc<ParallelCollectionVals<T>>,
}

impl<T: Data> Clone for ParallelCollection<T> {
    fn clone(&self) -> Self {
        ParallelCollection {
            rdd_vals: self.rdd_vals.clone(),
        }
    }
}

impl<T: Data> ParallelCollection<T> {
    pub fn new<I>(context: Arc<Context>, data: I, num_slices: usize) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
    {
        Ok(ParallelCollection {
            rdd_vals: Arc::new(ParallelCollectionVals {
                vals: Arc::new(RddVals::new(context)),
                splits_: ParallelCollection::slice(data, num_slices)?,
            }),
        })
    }

    /// Slice `i` holds the elements `[len * i / n, len * (i + 1) / n)`.
    fn slice<I>(data: I, num_slices: usize) -> Result<Vec<Arc<Vec<T>>>>
    where
        I: IntoIterator<Item = T>,
    {
        if num_slices < 1 {
            return Err(Error::InvalidPartitionCount);
        }
        let mut data = data.into_iter().collect::<Vec<_>>();
        let data_len = data.len();
        let mut output = Vec::with_capacity(num_slices);
        // Cut from the back so every slice is a cheap split_off.
        for i in (0..num_slices).rev() {
            let start = (i * data_len) / num_slices;
            output.push(Arc::new(data.split_off(start)));
        }
        output.reverse();
        Ok(output)
    }
}

impl<T: Data> RddBase for ParallelCollection<T> {
    fn get_rdd_id(&self) -> usize {
        self.rdd_vals.vals.id
    }

    fn get_context(&self) -> Arc<Context> {
        self.rdd_vals.vals.context.clone()
    }

    fn get_op_name(&self) -> String {
        "parallel_collection".to_owned()
    }

    fn get_dependencies(&self) -> Vec<Dependency> {
        self.rdd_vals.vals.dependencies.clone()
    }

    fn splits(&self) -> Vec<Box<dyn Split>> {
        (0..self.rdd_vals.splits_.len())
            .map(|i| {
                Box::new(ParallelCollectionSplit::new(
                    i,
                    self.rdd_vals.splits_[i].clone(),
                )) as Box<dyn Split>
            })
            .collect::<Vec<Box<dyn Split>>>()
    }

    fn number_of_splits(&self) -> usize {
        self.rdd_vals.splits_.len()
    }
}

impl<T: Data> Rdd for ParallelCollection<T> {
    type Item = T;
    fn get_rdd(&self) -> Arc<dyn Rdd<Item = Self::Item>> {
        Arc::new(self.clone())
    }

    fn get_rdd_base(&self) -> Arc<dyn RddBase> {
        Arc::new(self.clone()) as Arc<dyn RddBase>
    }

    fn compute(&self, split: Box<dyn Split>) -> Result<Box<dyn Iterator<Item = Self::Item>>> {
        if let Some(s) = split.downcast_ref::<ParallelCollectionSplit<T>>() {
            Ok(s.iterator())
        } else {
            Err(Error::DowncastFailure("ParallelCollectionSplit"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_are_contiguous_and_balanced() {
        let slices = ParallelCollection::slice(0..10, 3).unwrap();
        let slices = slices.iter().map(|s| s.as_ref().clone()).collect::<Vec<_>>();
        assert_eq!(slices, vec![vec![0, 1, 2], vec![3, 4, 5], vec![6, 7, 8, 9]]);
    }

    #[test]
    fn more_slices_than_elements() {
        let slices = ParallelCollection::slice(vec!["a".to_string()], 3).unwrap();
        assert_eq!(slices.len(), 3);
        assert_eq!(slices.iter().map(|s| s.len()).sum::<usize>(), 1);
    }

    #[test]
    fn zero_slices_is_rejected() {
        assert!(ParallelCollection::<u8>::slice(vec![1u8], 0).is_err());
    }
}
