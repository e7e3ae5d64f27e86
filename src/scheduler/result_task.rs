use std::fmt::Display;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::rdd::Rdd;
use crate::scheduler::{Task, TaskBase, TaskContext};
use crate::serializable_traits::Data;

/// Applies the job's function to one partition of the final RDD.
pub(crate) struct ResultTask<T: Data, U, F>
where
    F: Fn(TaskContext, Box<dyn Iterator<Item = T>>) -> U + Send + Sync + 'static,
{
    pub task_id: usize,
    pub run_id: usize,
    pub stage_id: usize,
    pub rdd: Arc<dyn Rdd<Item = T>>,
    pub func: Arc<F>,
    pub partition: usize,
    _marker: PhantomData<fn() -> U>,
}

impl<T: Data, U, F> Display for ResultTask<T, U, F>
where
    F: Fn(TaskContext, Box<dyn Iterator<Item = T>>) -> U + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ResultTask({}, {})", self.stage_id, self.partition)
    }
}

impl<T: Data, U, F> ResultTask<T, U, F>
where
    F: Fn(TaskContext, Box<dyn Iterator<Item = T>>) -> U + Send + Sync + 'static,
{
    pub fn new(
        task_id: usize,
        run_id: usize,
        stage_id: usize,
        rdd: Arc<dyn Rdd<Item = T>>,
        func: Arc<F>,
        partition: usize,
    ) -> Self {
        ResultTask {
            task_id,
            run_id,
            stage_id,
            rdd,
            func,
            partition,
            _marker: PhantomData,
        }
    }
}

impl<T: Data, U, F> TaskBase for ResultTask<T, U, F>
where
    F: Fn(TaskContext, Box<dyn Iterator<Item = T>>) -> U + Send + Sync + 'static,
{
    fn get_run_id(&self) -> usize {
        self.run_id
    }

    fn get_stage_id(&self) -> usize {
        self.stage_id
    }

    fn get_task_id(&self) -> usize {
        self.task_id
    }

    fn get_partition(&self) -> usize {
        self.partition
    }
}

impl<T: Data, U: Send + 'static, F> Task for ResultTask<T, U, F>
where
    F: Fn(TaskContext, Box<dyn Iterator<Item = T>>) -> U + Send + Sync + 'static,
{
    type Output = U;

    fn run(&self, context: TaskContext) -> Result<U> {
        let split = self
            .rdd
            .splits()
            .into_iter()
            .nth(self.partition)
            .ok_or(Error::PartitionNotFound(self.partition))?;
        let iter = self.rdd.iterator(split)?;
        Ok((self.func)(context, iter))
    }
}
