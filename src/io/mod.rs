use std::sync::Arc;

use crate::context::Context;
use crate::error::Result;
use crate::rdd::Rdd;
use crate::serializable_traits::{Data, Func};

mod local_file_reader;
pub use local_file_reader::{LocalFsReader, LocalFsReaderConfig};

/// Describes a data source that can be turned into an RDD of decoded records.
pub trait ReaderConfiguration<I: Data> {
    fn make_reader<F, O>(self, context: Arc<Context>, decoder: F) -> Result<Arc<dyn Rdd<Item = O>>>
    where
        O: Data,
        F: Func<I, O>;
}
