#![allow(clippy::module_inception)]

pub mod cached_rdd;
pub use cached_rdd::CachedRdd;
pub mod co_grouped_rdd;
pub use co_grouped_rdd::CoGroupedRdd;
pub mod flatmap_rdd;
pub use flatmap_rdd::FlatMapperRdd;
pub mod map_partitions_rdd;
pub use map_partitions_rdd::MapPartitionsRdd;
pub mod mapper_rdd;
pub use mapper_rdd::{MapperRdd, TryMapperRdd};
pub mod pair_rdd;
pub use pair_rdd::{FlatMappedValuesRdd, MappedValuesRdd, PairRdd};
pub mod parallel_collection_rdd;
pub use parallel_collection_rdd::ParallelCollection;
pub mod shuffled_rdd;
pub use shuffled_rdd::ShuffledRdd;
pub mod rdd;
pub use rdd::*;
