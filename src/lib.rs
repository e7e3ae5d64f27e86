//! A small, lazily evaluated dataflow engine.
//!
//! Datasets are partitioned, immutable RDDs. Transformations only extend the
//! lineage graph; actions such as [`Rdd::collect`] hand the graph to a local
//! DAG scheduler, which cuts it into stages at every shuffle and runs the
//! tasks of each stage on a pool of worker threads.
//!
//! [`pagerank`] holds the iterative PageRank job built on top of it.

mod aggregator;
pub use aggregator::Aggregator;

mod cache;

pub mod context;
pub use context::Context;

mod dependency;
pub use dependency::Dependency;

mod env;
pub use env::{Configuration, LogLevel, Master};

pub mod error;
pub use error::{Error, Result};

pub mod io;

mod map_output_tracker;

pub mod pagerank;

mod partitioner;
pub use partitioner::{HashPartitioner, Partitioner};

pub mod rdd;
pub use rdd::{PairRdd, Rdd, RddBase};

mod scheduler;
pub use scheduler::TaskContext;

mod serializable_traits;
pub use serializable_traits::{Data, Func};

mod shuffle;
pub use shuffle::ShuffleError;

mod split;
pub use split::Split;
