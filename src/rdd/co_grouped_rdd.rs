use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use crate::aggregator::Aggregator;
use crate::context::Context;
use crate::dependency::{
    Dependency, NarrowDependencyTrait, OneToOneDependency, ShuffleDependency,
    ShuffleDependencyTrait,
};
use crate::error::{Error, Result};
use crate::partitioner::Partitioner;
use crate::rdd::{Rdd, RddBase, RddVals};
use crate::serializable_traits::Data;
use crate::shuffle::ShuffleFetcher;
use crate::split::Split;
use CoGroupSplitDep::{NarrowCoGroupSplitDep, ShuffleCoGroupSplitDep};

#[derive(Clone)]
enum CoGroupSplitDep {
    NarrowCoGroupSplitDep { split: Box<dyn Split> },
    ShuffleCoGroupSplitDep { shuffle_id: usize },
}

#[derive(Clone)]
struct CoGroupSplit {
    index: usize,
    left: CoGroupSplitDep,
    right: CoGroupSplitDep,
}

impl Split for CoGroupSplit {
    fn get_index(&self) -> usize {
        self.index
    }
}

/// Groups the values of two keyed parents by key. A parent that is already
/// partitioned like the output is read in place; any other parent is shuffled.
pub struct CoGroupedRdd<K: Data, V: Data, W: Data> {
    vals: Arc<RddVals>,
    left: Arc<dyn Rdd<Item = (K, V)>>,
    right: Arc<dyn Rdd<Item = (K, W)>>,
    part: Box<dyn Partitioner>,
}

impl<K: Data, V: Data, W: Data> Clone for CoGroupedRdd<K, V, W> {
    fn clone(&self) -> Self {
        CoGroupedRdd {
            vals: self.vals.clone(),
            left: self.left.clone(),
            right: self.right.clone(),
            part: self.part.clone(),
        }
    }
}

fn co_grouped_dependency<K, T>(
    context: &Context,
    rdd: &Arc<dyn Rdd<Item = (K, T)>>,
    part: &dyn Partitioner,
) -> Dependency
where
    K: Data + Eq + Hash,
    T: Data,
{
    let co_located = rdd
        .partitioner()
        .map_or(false, |p| p.equals(part.as_any()));
    if co_located {
        log::debug!("rdd #{} is co-located with its cogroup", rdd.get_rdd_id());
        Dependency::NarrowDependency(
            Arc::new(OneToOneDependency::new(rdd.get_rdd_base())) as Arc<dyn NarrowDependencyTrait>,
        )
    } else {
        Dependency::ShuffleDependency(Arc::new(ShuffleDependency::new(
            context.new_shuffle_id(),
            rdd.clone(),
            Arc::new(Aggregator::<K, T, Vec<T>>::default()),
            dyn_clone::clone_box(part),
        )) as Arc<dyn ShuffleDependencyTrait>)
    }
}

impl<K: Data + Eq + Hash, V: Data, W: Data> CoGroupedRdd<K, V, W> {
    pub fn new(
        left: Arc<dyn Rdd<Item = (K, V)>>,
        right: Arc<dyn Rdd<Item = (K, W)>>,
        part: Box<dyn Partitioner>,
    ) -> Self {
        let context = left.get_context();
        let mut vals = RddVals::new(context.clone());
        vals.dependencies = vec![
            co_grouped_dependency(&context, &left, part.as_ref()),
            co_grouped_dependency(&context, &right, part.as_ref()),
        ];
        CoGroupedRdd {
            vals: Arc::new(vals),
            left,
            right,
            part,
        }
    }

    fn split_dep(&self, dep_num: usize, rdd: &dyn RddBase, index: usize) -> CoGroupSplitDep {
        match &self.vals.dependencies[dep_num] {
            Dependency::ShuffleDependency(s) => ShuffleCoGroupSplitDep {
                shuffle_id: s.get_shuffle_id(),
            },
            Dependency::NarrowDependency(_) => NarrowCoGroupSplitDep {
                split: rdd.splits().swap_remove(index),
            },
        }
    }
}

impl<K: Data + Eq + Hash, V: Data, W: Data> RddBase for CoGroupedRdd<K, V, W> {
    fn get_rdd_id(&self) -> usize {
        self.vals.id
    }

    fn get_context(&self) -> Arc<Context> {
        self.vals.context.clone()
    }

    fn get_op_name(&self) -> String {
        "cogroup".to_owned()
    }

    fn get_dependencies(&self) -> Vec<Dependency> {
        self.vals.dependencies.clone()
    }

    fn splits(&self) -> Vec<Box<dyn Split>> {
        (0..self.part.get_num_of_partitions())
            .map(|i| {
                Box::new(CoGroupSplit {
                    index: i,
                    left: self.split_dep(0, &self.left, i),
                    right: self.split_dep(1, &self.right, i),
                }) as Box<dyn Split>
            })
            .collect()
    }

    fn number_of_splits(&self) -> usize {
        self.part.get_num_of_partitions()
    }

    fn partitioner(&self) -> Option<Box<dyn Partitioner>> {
        Some(self.part.clone())
    }
}

impl<K: Data + Eq + Hash, V: Data, W: Data> Rdd for CoGroupedRdd<K, V, W> {
    type Item = (K, (Vec<V>, Vec<W>));
    fn get_rdd(&self) -> Arc<dyn Rdd<Item = Self::Item>> {
        Arc::new(self.clone())
    }

    fn get_rdd_base(&self) -> Arc<dyn RddBase> {
        Arc::new(self.clone()) as Arc<dyn RddBase>
    }

    fn compute(&self, split: Box<dyn Split>) -> Result<Box<dyn Iterator<Item = Self::Item>>> {
        let CoGroupSplit { index, left, right } = *split
            .downcast::<CoGroupSplit>()
            .map_err(|_| Error::DowncastFailure("CoGroupSplit"))?;
        let context = self.get_context();
        let env = context.env();
        let mut agg: HashMap<K, (Vec<V>, Vec<W>)> = HashMap::new();

        match left {
            NarrowCoGroupSplitDep { split } => {
                for (k, v) in self.left.iterator(split)? {
                    agg.entry(k).or_default().0.push(v);
                }
            }
            ShuffleCoGroupSplitDep { shuffle_id } => {
                ShuffleFetcher::fetch(env, shuffle_id, index, |(k, vs): (K, Vec<V>)| {
                    agg.entry(k).or_default().0.extend(vs);
                })?;
            }
        }
        match right {
            NarrowCoGroupSplitDep { split } => {
                for (k, w) in self.right.iterator(split)? {
                    agg.entry(k).or_default().1.push(w);
                }
            }
            ShuffleCoGroupSplitDep { shuffle_id } => {
                ShuffleFetcher::fetch(env, shuffle_id, index, |(k, ws): (K, Vec<W>)| {
                    agg.entry(k).or_default().1.extend(ws);
                })?;
            }
        }
        Ok(Box::new(agg.into_iter()))
    }
}
