mod local_scheduler;
mod result_task;
mod stage;
mod task;

pub(self) use self::stage::Stage;

pub(crate) use self::local_scheduler::LocalScheduler;
pub(crate) use self::result_task::ResultTask;
pub use self::task::TaskContext;
pub(crate) use self::task::{Task, TaskBase};
