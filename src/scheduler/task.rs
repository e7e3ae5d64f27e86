use std::fmt;

use crate::error::Result;

/// Identifies the task a partition is being computed by.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskContext {
    pub stage_id: usize,
    pub split_id: usize,
    pub attempt_id: usize,
}

impl TaskContext {
    pub fn new(stage_id: usize, split_id: usize, attempt_id: usize) -> Self {
        TaskContext {
            stage_id,
            split_id,
            attempt_id,
        }
    }
}

pub(crate) trait TaskBase: Send + Sync {
    fn get_run_id(&self) -> usize;
    fn get_stage_id(&self) -> usize;
    fn get_task_id(&self) -> usize;
    fn get_partition(&self) -> usize;
}

pub(crate) trait Task: TaskBase + fmt::Display + 'static {
    type Output: Send + 'static;

    fn run(&self, context: TaskContext) -> Result<Self::Output>;
}
