use std::fmt::Display;
use std::sync::Arc;

use crate::dependency::ShuffleDependencyTrait;
use crate::error::Result;
use crate::scheduler::{Task, TaskBase, TaskContext};

#[derive(Clone)]
pub(crate) struct ShuffleMapTask {
    pub task_id: usize,
    pub run_id: usize,
    pub stage_id: usize,
    pub dep: Arc<dyn ShuffleDependencyTrait>,
    pub partition: usize,
}

impl ShuffleMapTask {
    pub fn new(
        task_id: usize,
        run_id: usize,
        stage_id: usize,
        dep: Arc<dyn ShuffleDependencyTrait>,
        partition: usize,
    ) -> Self {
        ShuffleMapTask {
            task_id,
            run_id,
            stage_id,
            dep,
            partition,
        }
    }
}

impl Display for ShuffleMapTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ShuffleMapTask({:?}, {:?})",
            self.stage_id, self.partition
        )
    }
}

impl TaskBase for ShuffleMapTask {
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

impl Task for ShuffleMapTask {
    type Output = usize;

    /// Writes the map output and returns the partition it belongs to.
    fn run(&self, _context: TaskContext) -> Result<usize> {
        self.dep.do_shuffle_task(self.partition)?;
        Ok(self.partition)
    }
}
