use std::marker::PhantomData;
use std::sync::Arc;

use crate::serializable_traits::Data;

// Aggregator for shuffle tasks.
pub struct Aggregator<K: Data, V: Data, C: Data> {
    pub create_combiner: Arc<dyn Fn(V) -> C + Send + Sync>,
    pub merge_value: Arc<dyn Fn((C, V)) -> C + Send + Sync>,
    pub merge_combiners: Arc<dyn Fn((C, C)) -> C + Send + Sync>,
    _marker: PhantomData<K>,
}

impl<K: Data, V: Data, C: Data> Clone for Aggregator<K, V, C> {
    fn clone(&self) -> Self {
        Aggregator {
            create_combiner: self.create_combiner.clone(),
            merge_value: self.merge_value.clone(),
            merge_combiners: self.merge_combiners.clone(),
            _marker: PhantomData,
        }
    }
}

impl<K: Data, V: Data, C: Data> Aggregator<K, V, C> {
    pub fn new(
        create_combiner: Arc<dyn Fn(V) -> C + Send + Sync>,
        merge_value: Arc<dyn Fn((C, V)) -> C + Send + Sync>,
        merge_combiners: Arc<dyn Fn((C, C)) -> C + Send + Sync>,
    ) -> Self {
        Aggregator {
            create_combiner,
            merge_value,
            merge_combiners,
            _marker: PhantomData,
        }
    }
}

impl<K: Data, V: Data> Default for Aggregator<K, V, Vec<V>> {
    fn default() -> Self {
        let merge_value = Arc::new(|mv: (Vec<V>, V)| {
            let (mut buf, v) = mv;
            buf.push(v);
            buf
        });
        let create_combiner = Arc::new(|v: V| vec![v]);
        let merge_combiners = Arc::new(|mc: (Vec<V>, Vec<V>)| {
            let (mut b1, mut b2) = mc;
            b1.append(&mut b2);
            b1
        });
        Aggregator {
            create_combiner,
            merge_value,
            merge_combiners,
            _marker: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_aggregator_groups_values() {
        let agg = Aggregator::<String, f64, Vec<f64>>::default();
        let c = (agg.create_combiner)(1.0);
        let c = (agg.merge_value)((c, 2.0));
        let c = (agg.merge_combiners)((c, vec![3.0, 4.0]));
        assert_eq!(c, vec![1.0, 2.0, 3.0, 4.0]);
    }
}
