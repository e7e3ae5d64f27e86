use std::cmp::Ordering;
use std::hash::Hash;
use std::sync::Arc;

use crate::context::Context;
use crate::dependency::Dependency;
use crate::error::{Error, Result};
use crate::partitioner::Partitioner;
use crate::rdd::{CachedRdd, FlatMapperRdd, MapPartitionsRdd, MapperRdd, PairRdd, TryMapperRdd};
use crate::scheduler::TaskContext;
use crate::serializable_traits::{Data, Func};
use crate::split::Split;

// Values which are needed for all RDDs
pub(crate) struct RddVals {
    pub id: usize,
    pub dependencies: Vec<Dependency>,
    pub context: Arc<Context>,
}

impl RddVals {
    pub fn new(sc: Arc<Context>) -> Self {
        RddVals {
            id: sc.new_rdd_id(),
            dependencies: Vec::new(),
            context: sc,
        }
    }
}

// The untyped half of an RDD. Dependencies and stages mix RDDs of different
// item types, so they hold `Arc<dyn RddBase>`; the typed operators live on `Rdd`.
pub trait RddBase: Send + Sync {
    fn get_rdd_id(&self) -> usize;
    fn get_context(&self) -> Arc<Context>;
    fn get_dependencies(&self) -> Vec<Dependency>;
    fn get_op_name(&self) -> String {
        "unknown".to_owned()
    }
    fn partitioner(&self) -> Option<Box<dyn Partitioner>> {
        None
    }
    fn splits(&self) -> Vec<Box<dyn Split>>;
    fn number_of_splits(&self) -> usize {
        self.splits().len()
    }
}

impl PartialOrd for dyn RddBase {
    fn partial_cmp(&self, other: &dyn RddBase) -> Option<Ordering> {
        Some(self.get_rdd_id().cmp(&other.get_rdd_id()))
    }
}

impl PartialEq for dyn RddBase {
    fn eq(&self, other: &dyn RddBase) -> bool {
        self.get_rdd_id() == other.get_rdd_id()
    }
}

impl Eq for dyn RddBase {}

impl Ord for dyn RddBase {
    fn cmp(&self, other: &dyn RddBase) -> Ordering {
        self.get_rdd_id().cmp(&other.get_rdd_id())
    }
}

impl<I: Rdd + ?Sized> RddBase for Arc<I> {
    fn get_rdd_id(&self) -> usize {
        (**self).get_rdd_base().get_rdd_id()
    }
    fn get_context(&self) -> Arc<Context> {
        (**self).get_rdd_base().get_context()
    }
    fn get_dependencies(&self) -> Vec<Dependency> {
        (**self).get_rdd_base().get_dependencies()
    }
    fn get_op_name(&self) -> String {
        (**self).get_rdd_base().get_op_name()
    }
    fn partitioner(&self) -> Option<Box<dyn Partitioner>> {
        (**self).get_rdd_base().partitioner()
    }
    fn splits(&self) -> Vec<Box<dyn Split>> {
        (**self).get_rdd_base().splits()
    }
    fn number_of_splits(&self) -> usize {
        (**self).get_rdd_base().number_of_splits()
    }
}

impl<I: Rdd + ?Sized> Rdd for Arc<I> {
    type Item = I::Item;
    fn get_rdd(&self) -> Arc<dyn Rdd<Item = Self::Item>> {
        (**self).get_rdd()
    }
    fn get_rdd_base(&self) -> Arc<dyn RddBase> {
        (**self).get_rdd_base()
    }
    fn compute(&self, split: Box<dyn Split>) -> Result<Box<dyn Iterator<Item = Self::Item>>> {
        (**self).compute(split)
    }
}

// Rdd containing methods associated with processing
pub trait Rdd: RddBase + 'static {
    type Item: Data;
    fn get_rdd(&self) -> Arc<dyn Rdd<Item = Self::Item>>;

    fn get_rdd_base(&self) -> Arc<dyn RddBase>;

    fn compute(&self, split: Box<dyn Split>) -> Result<Box<dyn Iterator<Item = Self::Item>>>;

    fn iterator(&self, split: Box<dyn Split>) -> Result<Box<dyn Iterator<Item = Self::Item>>> {
        self.compute(split)
    }

    fn map<U: Data, F>(&self, f: F) -> Arc<dyn Rdd<Item = U>>
    where
        F: Func<Self::Item, U>,
        Self: Sized,
    {
        Arc::new(MapperRdd::new(self.get_rdd(), f))
    }

    /// Like [`Rdd::map`], but the function may reject a record. The first
    /// rejected record fails the task and with it the whole job.
    fn try_map<U: Data, F>(&self, f: F) -> Arc<dyn Rdd<Item = U>>
    where
        F: Func<Self::Item, Result<U>>,
        Self: Sized,
    {
        Arc::new(TryMapperRdd::new(self.get_rdd(), f))
    }

    fn flat_map<U: Data, F>(&self, f: F) -> Arc<dyn Rdd<Item = U>>
    where
        F: Func<Self::Item, Box<dyn Iterator<Item = U>>>,
        Self: Sized,
    {
        Arc::new(FlatMapperRdd::new(self.get_rdd(), f))
    }

    /// Return a new RDD by applying a function to each partition of this RDD.
    fn map_partitions<U: Data, F>(&self, func: F) -> Arc<dyn Rdd<Item = U>>
    where
        F: Func<Box<dyn Iterator<Item = Self::Item>>, Box<dyn Iterator<Item = U>>>,
        Self: Sized,
    {
        let ignore_idx = move |(_index, items): (usize, Box<dyn Iterator<Item = Self::Item>>)| {
            (func)(items)
        };
        Arc::new(MapPartitionsRdd::new(self.get_rdd(), ignore_idx))
    }

    /// Return a new RDD by applying a function to each partition of this RDD,
    /// while tracking the index of the original partition.
    fn map_partitions_with_index<U: Data, F>(&self, f: F) -> Arc<dyn Rdd<Item = U>>
    where
        F: Func<(usize, Box<dyn Iterator<Item = Self::Item>>), Box<dyn Iterator<Item = U>>>,
        Self: Sized,
    {
        Arc::new(MapPartitionsRdd::new(self.get_rdd(), f))
    }

    /// Keeps the partitions of this RDD in memory once they are computed.
    /// Every later read, from the same job or a later one, uses the stored
    /// partition instead of running the lineage again.
    fn cache(&self) -> Arc<dyn Rdd<Item = Self::Item>>
    where
        Self: Sized,
    {
        Arc::new(CachedRdd::new(self.get_rdd()))
    }

    fn reduce<F>(&self, f: F) -> Result<Option<Self::Item>>
    where
        Self: Sized,
        F: Func<(Self::Item, Self::Item), Self::Item>,
    {
        // cloned cause we will use `f` later.
        let cf = f.clone();
        let reduce_partition = move |iter: Box<dyn Iterator<Item = Self::Item>>| {
            let acc = iter.reduce(|a, e| (cf)((a, e)));
            match acc {
                None => vec![],
                Some(e) => vec![e],
            }
        };
        let results = self.get_context().run_job(self.get_rdd(), reduce_partition)?;
        Ok(results.into_iter().flatten().reduce(|a, e| f((a, e))))
    }

    /// Aggregate the elements of each partition, and then the results for all the partitions,
    /// using a given associative function and a neutral "initial value".
    fn fold<F>(&self, init: Self::Item, f: F) -> Result<Self::Item>
    where
        Self: Sized,
        F: Func<(Self::Item, Self::Item), Self::Item>,
    {
        let cf = f.clone();
        let zero = init.clone();
        let reduce_partition = move |iter: Box<dyn Iterator<Item = Self::Item>>| {
            iter.fold(zero.clone(), |acc, e| (cf)((acc, e)))
        };
        let results = self.get_context().run_job(self.get_rdd(), reduce_partition)?;
        Ok(results.into_iter().fold(init, |acc, e| f((acc, e))))
    }

    fn collect(&self) -> Result<Vec<Self::Item>>
    where
        Self: Sized,
    {
        let cl = |iter: Box<dyn Iterator<Item = Self::Item>>| iter.collect::<Vec<Self::Item>>();
        let results = self.get_context().run_job(self.get_rdd(), cl)?;
        let size = results.iter().fold(0, |a, b: &Vec<Self::Item>| a + b.len());
        Ok(results
            .into_iter()
            .fold(Vec::with_capacity(size), |mut acc, v| {
                acc.extend(v);
                acc
            }))
    }

    fn count(&self) -> Result<u64>
    where
        Self: Sized,
    {
        let context = self.get_context();
        let counting_func = |iter: Box<dyn Iterator<Item = Self::Item>>| iter.count() as u64;
        Ok(context
            .run_job(self.get_rdd(), counting_func)?
            .into_iter()
            .sum())
    }

    /// Applies `func` to every element on the workers, for its side effects.
    fn for_each<F>(&self, func: F) -> Result<Vec<()>>
    where
        F: Func<Self::Item, ()>,
        Self: Sized,
    {
        let func = move |iter: Box<dyn Iterator<Item = Self::Item>>| iter.for_each(&func);
        self.get_context().run_job(self.get_rdd(), func)
    }

    /// Runs `func` once per partition with the task's context.
    fn for_each_partition_with_context<F>(&self, func: F) -> Result<Vec<()>>
    where
        F: Func<(TaskContext, Box<dyn Iterator<Item = Self::Item>>), ()>,
        Self: Sized,
    {
        self.get_context()
            .run_job_with_context(self.get_rdd(), move |ctx, iter| func((ctx, iter)))
    }

    /// Return a new RDD containing the distinct elements in this RDD.
    fn distinct_with_num_partitions(&self, num_partitions: usize) -> Arc<dyn Rdd<Item = Self::Item>>
    where
        Self: Sized,
        Self::Item: Data + Eq + Hash,
    {
        self.map(|x: Self::Item| (x, ()))
            .reduce_by_key(|(x, _y): ((), ())| x, num_partitions)
            .map(|(x, _): (Self::Item, ())| x)
    }

    /// Return a new RDD containing the distinct elements in this RDD.
    fn distinct(&self) -> Arc<dyn Rdd<Item = Self::Item>>
    where
        Self: Sized,
        Self::Item: Data + Eq + Hash,
    {
        self.distinct_with_num_partitions(self.number_of_splits())
    }

    /// Return the first element in this RDD.
    fn first(&self) -> Result<Self::Item>
    where
        Self: Sized,
    {
        if let Some(result) = self.take(1)?.into_iter().next() {
            Ok(result)
        } else {
            Err(Error::UnsupportedOperation("empty collection"))
        }
    }

    /// Take the first num elements of the RDD, scanning partitions in order
    /// and stopping as soon as enough elements were found.
    fn take(&self, num: usize) -> Result<Vec<Self::Item>>
    where
        Self: Sized,
    {
        if num == 0 {
            return Ok(vec![]);
        }
        let mut buf = Vec::with_capacity(num);
        let total_parts = self.number_of_splits();
        let mut parts_scanned = 0;
        while buf.len() < num && parts_scanned < total_parts {
            let left = num - buf.len();
            let take_from_partition =
                move |iter: Box<dyn Iterator<Item = Self::Item>>| iter.take(left).collect::<Vec<_>>();
            let res = self.get_context().run_job_with_partitions(
                self.get_rdd(),
                take_from_partition,
                parts_scanned..parts_scanned + 1,
            )?;
            res.into_iter().for_each(|r| buf.extend(r.into_iter().take(left)));
            parts_scanned += 1;
        }
        Ok(buf)
    }
}
