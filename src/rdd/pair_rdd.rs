use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::aggregator::Aggregator;
use crate::context::Context;
use crate::dependency::{Dependency, OneToOneDependency};
use crate::error::Result;
use crate::partitioner::{HashPartitioner, Partitioner};
use crate::rdd::{co_grouped_rdd::CoGroupedRdd, shuffled_rdd::ShuffledRdd, Rdd, RddBase, RddVals};
use crate::serializable_traits::{Data, Func};
use crate::split::Split;
use itertools::Itertools;

// Key-value operations, available on every RDD of pairs through the blanket impl below.
pub trait PairRdd<K: Data + Eq + Hash, V: Data>: Rdd<Item = (K, V)> + Send + Sync {
    fn combine_by_key<C: Data>(
        &self,
        aggregator: Aggregator<K, V, C>,
        partitioner: Box<dyn Partitioner>,
    ) -> Arc<dyn Rdd<Item = (K, C)>>
    where
        Self: Sized + 'static,
    {
        Arc::new(ShuffledRdd::new(
            self.get_rdd(),
            Arc::new(aggregator),
            partitioner,
        ))
    }

    fn group_by_key(&self, num_splits: usize) -> Arc<dyn Rdd<Item = (K, Vec<V>)>>
    where
        Self: Sized + 'static,
    {
        self.group_by_key_using_partitioner(
            Box::new(HashPartitioner::<K>::new(num_splits)) as Box<dyn Partitioner>
        )
    }

    fn group_by_key_using_partitioner(
        &self,
        partitioner: Box<dyn Partitioner>,
    ) -> Arc<dyn Rdd<Item = (K, Vec<V>)>>
    where
        Self: Sized + 'static,
    {
        self.combine_by_key(Aggregator::<K, V, _>::default(), partitioner)
    }

    fn reduce_by_key<F>(&self, func: F, num_splits: usize) -> Arc<dyn Rdd<Item = (K, V)>>
    where
        F: Func<(V, V), V>,
        Self: Sized + 'static,
    {
        self.reduce_by_key_using_partitioner(
            func,
            Box::new(HashPartitioner::<K>::new(num_splits)) as Box<dyn Partitioner>,
        )
    }

    fn reduce_by_key_using_partitioner<F>(
        &self,
        func: F,
        partitioner: Box<dyn Partitioner>,
    ) -> Arc<dyn Rdd<Item = (K, V)>>
    where
        F: Func<(V, V), V>,
        Self: Sized + 'static,
    {
        let create_combiner = Arc::new(|v: V| v);
        let f_clone = func.clone();
        let merge_value = Arc::new(move |(buf, v): (V, V)| (f_clone)((buf, v)));
        let merge_combiners = Arc::new(move |(b1, b2): (V, V)| (func)((b1, b2)));
        let aggregator = Aggregator::new(create_combiner, merge_value, merge_combiners);
        self.combine_by_key(aggregator, partitioner)
    }

    fn map_values<U: Data, F>(&self, f: F) -> Arc<dyn Rdd<Item = (K, U)>>
    where
        F: Func<V, U>,
        Self: Sized,
    {
        Arc::new(MappedValuesRdd::new(self.get_rdd(), f))
    }

    fn flat_map_values<U: Data, F>(&self, f: F) -> Arc<dyn Rdd<Item = (K, U)>>
    where
        F: Func<V, Box<dyn Iterator<Item = U>>>,
        Self: Sized,
    {
        Arc::new(FlatMappedValuesRdd::new(self.get_rdd(), f))
    }

    fn keys(&self) -> Arc<dyn Rdd<Item = K>>
    where
        Self: Sized,
    {
        self.map(|(k, _v): (K, V)| k)
    }

    fn values(&self) -> Arc<dyn Rdd<Item = V>>
    where
        Self: Sized,
    {
        self.map(|(_k, v): (K, V)| v)
    }

    /// Inner join. Keys present on only one side produce no output.
    fn join<W: Data>(
        &self,
        other: Arc<dyn Rdd<Item = (K, W)>>,
        num_splits: usize,
    ) -> Arc<dyn Rdd<Item = (K, (V, W))>>
    where
        Self: Sized,
    {
        self.join_using_partitioner(
            other,
            Box::new(HashPartitioner::<K>::new(num_splits)) as Box<dyn Partitioner>,
        )
    }

    fn join_using_partitioner<W: Data>(
        &self,
        other: Arc<dyn Rdd<Item = (K, W)>>,
        partitioner: Box<dyn Partitioner>,
    ) -> Arc<dyn Rdd<Item = (K, (V, W))>>
    where
        Self: Sized,
    {
        let f = |v: (Vec<V>, Vec<W>)| {
            let (vs, ws) = v;
            let combine = vs.into_iter().cartesian_product(ws);
            Box::new(combine) as Box<dyn Iterator<Item = (V, W)>>
        };
        self.cogroup(other, partitioner).flat_map_values(f)
    }

    fn cogroup<W: Data>(
        &self,
        other: Arc<dyn Rdd<Item = (K, W)>>,
        partitioner: Box<dyn Partitioner>,
    ) -> Arc<dyn Rdd<Item = (K, (Vec<V>, Vec<W>))>>
    where
        Self: Sized,
    {
        Arc::new(CoGroupedRdd::new(self.get_rdd(), other, partitioner))
    }
}

// Implementing the PairRdd trait for all types which implements Rdd
impl<K: Data + Eq + Hash, V: Data, T> PairRdd<K, V> for T where T: Rdd<Item = (K, V)> {}

pub struct MappedValuesRdd<K: Data, V: Data, U: Data, F>
where
    F: Func<V, U>,
{
    prev: Arc<dyn Rdd<Item = (K, V)>>,
    vals: Arc<RddVals>,
    f: F,
    _marker_u: PhantomData<U>,
}

impl<K: Data, V: Data, U: Data, F> Clone for MappedValuesRdd<K, V, U, F>
where
    F: Func<V, U>,
{
    fn clone(&self) -> Self {
        MappedValuesRdd {
            prev: self.prev.clone(),
            vals: self.vals.clone(),
            f: self.f.clone(),
            _marker_u: PhantomData,
        }
    }
}

impl<K: Data, V: Data, U: Data, F> MappedValuesRdd<K, V, U, F>
where
    F: Func<V, U>,
{
    fn new(prev: Arc<dyn Rdd<Item = (K, V)>>, f: F) -> Self {
        let mut vals = RddVals::new(prev.get_context());
        vals.dependencies
            .push(Dependency::NarrowDependency(Arc::new(
                OneToOneDependency::new(prev.get_rdd_base()),
            )));
        let vals = Arc::new(vals);
        MappedValuesRdd {
            prev,
            vals,
            f,
            _marker_u: PhantomData,
        }
    }
}

impl<K: Data, V: Data, U: Data, F> RddBase for MappedValuesRdd<K, V, U, F>
where
    F: Func<V, U>,
{
    fn get_rdd_id(&self) -> usize {
        self.vals.id
    }

    fn get_context(&self) -> Arc<Context> {
        self.vals.context.clone()
    }

    fn get_op_name(&self) -> String {
        "map_values".to_owned()
    }

    fn get_dependencies(&self) -> Vec<Dependency> {
        self.vals.dependencies.clone()
    }

    // Keys are untouched, so the parent's placement still holds.
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

impl<K: Data, V: Data, U: Data, F> Rdd for MappedValuesRdd<K, V, U, F>
where
    F: Func<V, U>,
{
    type Item = (K, U);

    fn get_rdd_base(&self) -> Arc<dyn RddBase> {
        Arc::new(self.clone()) as Arc<dyn RddBase>
    }

    fn get_rdd(&self) -> Arc<dyn Rdd<Item = Self::Item>> {
        Arc::new(self.clone())
    }

    fn compute(&self, split: Box<dyn Split>) -> Result<Box<dyn Iterator<Item = Self::Item>>> {
        let f = self.f.clone();
        Ok(Box::new(
            self.prev.iterator(split)?.map(move |(k, v)| (k, f(v))),
        ))
    }
}

pub struct FlatMappedValuesRdd<K: Data, V: Data, U: Data, F>
where
    F: Func<V, Box<dyn Iterator<Item = U>>>,
{
    prev: Arc<dyn Rdd<Item = (K, V)>>,
    vals: Arc<RddVals>,
    f: F,
    _marker_u: PhantomData<U>,
}

impl<K: Data, V: Data, U: Data, F> Clone for FlatMappedValuesRdd<K, V, U, F>
where
    F: Func<V, Box<dyn Iterator<Item = U>>>,
{
    fn clone(&self) -> Self {
        FlatMappedValuesRdd {
            prev: self.prev.clone(),
            vals: self.vals.clone(),
            f: self.f.clone(),
            _marker_u: PhantomData,
        }
    }
}

impl<K: Data, V: Data, U: Data, F> FlatMappedValuesRdd<K, V, U, F>
where
    F: Func<V, Box<dyn Iterator<Item = U>>>,
{
    fn new(prev: Arc<dyn Rdd<Item = (K, V)>>, f: F) -> Self {
        let mut vals = RddVals::new(prev.get_context());
        vals.dependencies
            .push(Dependency::NarrowDependency(Arc::new(
                OneToOneDependency::new(prev.get_rdd_base()),
            )));
        let vals = Arc::new(vals);
        FlatMappedValuesRdd {
            prev,
            vals,
            f,
            _marker_u: PhantomData,
        }
    }
}

impl<K: Data, V: Data, U: Data, F> RddBase for FlatMappedValuesRdd<K, V, U, F>
where
    F: Func<V, Box<dyn Iterator<Item = U>>>,
{
    fn get_rdd_id(&self) -> usize {
        self.vals.id
    }

    fn get_context(&self) -> Arc<Context> {
        self.vals.context.clone()
    }

    fn get_op_name(&self) -> String {
        "flat_map_values".to_owned()
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

impl<K: Data, V: Data, U: Data, F> Rdd for FlatMappedValuesRdd<K, V, U, F>
where
    F: Func<V, Box<dyn Iterator<Item = U>>>,
{
    type Item = (K, U);

    fn get_rdd_base(&self) -> Arc<dyn RddBase> {
        Arc::new(self.clone()) as Arc<dyn RddBase>
    }

    fn get_rdd(&self) -> Arc<dyn Rdd<Item = Self::Item>> {
        Arc::new(self.clone())
    }

    fn compute(&self, split: Box<dyn Split>) -> Result<Box<dyn Iterator<Item = Self::Item>>> {
        let func = self.f.clone();
        Ok(Box::new(self.prev.iterator(split)?.flat_map(move |(k, v)| {
            func(v).map(move |x| (k.clone(), x))
        })))
    }
}
