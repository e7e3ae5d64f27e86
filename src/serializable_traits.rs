use std::{any, fmt};

// Data passing through RDDs needs to satisfy the following traits.
// Serialization is required because shuffle outputs are stored as encoded blocks.
pub trait Data:
    Clone
    + any::Any
    + Send
    + Sync
    + fmt::Debug
    + serde::ser::Serialize
    + serde::de::DeserializeOwned
    + 'static
{
}

impl<
        T: Clone
            + any::Any
            + Send
            + Sync
            + fmt::Debug
            + serde::ser::Serialize
            + serde::de::DeserializeOwned
            + 'static,
    > Data for T
{
}

/// Function values handed to operators. They are shared between the tasks of
/// a stage, so they have to be cheap to clone and safe to call from any worker.
pub trait Func<Args, Output>: Fn(Args) -> Output + Clone + Send + Sync + 'static {}

impl<Args, Output, F> Func<Args, Output> for F where
    F: Fn(Args) -> Output + Clone + Send + Sync + 'static
{
}
