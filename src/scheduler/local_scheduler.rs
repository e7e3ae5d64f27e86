use std::any::Any;
use std::collections::{BTreeSet, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Instant;

use crate::dependency::{Dependency, ShuffleDependencyTrait};
use crate::error::{Error, Result};
use crate::map_output_tracker::MapOutputTracker;
use crate::rdd::{Rdd, RddBase};
use crate::scheduler::{ResultTask, Stage, Task, TaskBase, TaskContext};
use crate::serializable_traits::Data;
use crate::shuffle::{ShuffleManager, ShuffleMapTask};
use crossbeam::channel;
use parking_lot::Mutex;
use threadpool::ThreadPool;

/// Shuffle map stages known to the job being planned, keyed by shuffle id.
type ShuffleStages = HashMap<usize, Stage>;

/// Stages of the running job that still have to read a shuffle, keyed by
/// shuffle id.
type PendingReaders = HashMap<usize, usize>;

struct CompletionEvent<O> {
    output_id: usize,
    partition: usize,
    result: Result<O>,
}

/// Runs jobs on a pool of worker threads inside the driver process.
///
/// A job is cut into stages at every shuffle dependency. Missing parent
/// stages are executed to completion before their children, so the shuffle
/// boundary is a barrier. A shuffle's blocks are dropped as soon as every
/// stage of the job reading it has finished. Only the shuffles feeding the
/// final stage survive the job, which lets a later job over the same RDD skip
/// its parent stages.
#[derive(Clone)]
pub(crate) struct LocalScheduler {
    num_threads: usize,
    attempt_id: Arc<AtomicUsize>,
    next_job_id: Arc<AtomicUsize>,
    next_task_id: Arc<AtomicUsize>,
    next_stage_id: Arc<AtomicUsize>,
    pool: Arc<Mutex<ThreadPool>>,
    map_output_tracker: MapOutputTracker,
    shuffle_manager: ShuffleManager,
    // Only one job is planned and run at a time.
    scheduler_lock: Arc<Mutex<()>>,
}

impl LocalScheduler {
    pub fn new(
        num_threads: usize,
        map_output_tracker: MapOutputTracker,
        shuffle_manager: ShuffleManager,
    ) -> Self {
        let num_threads = num_threads.max(1);
        log::debug!("starting local scheduler with {} worker threads", num_threads);
        LocalScheduler {
            num_threads,
            attempt_id: Arc::new(AtomicUsize::new(0)),
            next_job_id: Arc::new(AtomicUsize::new(0)),
            next_task_id: Arc::new(AtomicUsize::new(0)),
            next_stage_id: Arc::new(AtomicUsize::new(0)),
            pool: Arc::new(Mutex::new(ThreadPool::with_name(
                "rankflow-worker".to_owned(),
                num_threads,
            ))),
            map_output_tracker,
            shuffle_manager,
            scheduler_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    pub fn run_job<T: Data, U: Send + 'static, F>(
        &self,
        func: Arc<F>,
        final_rdd: Arc<dyn Rdd<Item = T>>,
        partitions: Vec<usize>,
        allow_local: bool,
    ) -> Result<Vec<U>>
    where
        F: Fn(TaskContext, Box<dyn Iterator<Item = T>>) -> U + Send + Sync + 'static,
    {
        let _lock = self.scheduler_lock.lock();
        let run_id = self.next_job_id.fetch_add(1, Ordering::SeqCst);
        let start = Instant::now();
        let mut shuffle_stages = ShuffleStages::new();
        let final_stage = self.new_stage(&mut shuffle_stages, final_rdd.get_rdd_base(), None)?;
        log::info!(
            "starting job #{} ({}) with {} output partitions in final stage #{}",
            run_id,
            final_rdd.get_op_name(),
            partitions.len(),
            final_stage.id
        );

        if allow_local && final_stage.parents.is_empty() && partitions.len() == 1 {
            log::debug!("running job #{} on the driver thread", run_id);
            let task = ResultTask::new(
                self.get_next_task_id(),
                run_id,
                final_stage.id,
                final_rdd,
                func,
                partitions[0],
            );
            let attempt_id = self.attempt_id.fetch_add(1, Ordering::SeqCst);
            let result = run_task(&task, attempt_id);
            return result.map(|r| vec![r]);
        }

        let mut pending = pending_readers(&final_stage);
        for parent in self.get_missing_parent_stages(&final_stage) {
            self.submit_stage(&parent, run_id, &mut pending)?;
        }

        let tasks = partitions
            .iter()
            .map(|&partition| {
                ResultTask::new(
                    self.get_next_task_id(),
                    run_id,
                    final_stage.id,
                    final_rdd.clone(),
                    func.clone(),
                    partition,
                )
            })
            .collect::<Vec<_>>();
        let mut results: Vec<Option<U>> = (0..tasks.len()).map(|_| None).collect();
        for (output_id, result) in self.submit_tasks(tasks)? {
            results[output_id] = Some(result);
        }
        self.drop_unused_shuffles(&final_stage, pending);
        log::info!(
            "job #{} finished in {} ms",
            run_id,
            start.elapsed().as_millis()
        );
        results
            .into_iter()
            .enumerate()
            .map(|(output_id, r)| r.ok_or(Error::PartitionNotFound(partitions[output_id])))
            .collect()
    }

    /// Runs the missing parents of a shuffle map stage, then the map tasks
    /// whose outputs are not registered yet.
    fn submit_stage(
        &self,
        stage: &Stage,
        run_id: usize,
        pending: &mut PendingReaders,
    ) -> Result<()> {
        for parent in self.get_missing_parent_stages(stage) {
            self.submit_stage(&parent, run_id, pending)?;
        }
        let dep = match &stage.shuffle_dependency {
            Some(dep) => dep.clone(),
            None => return Ok(()),
        };
        let missing = self
            .map_output_tracker
            .missing_map_outputs(dep.get_shuffle_id());
        if missing.is_empty() {
            self.release_parents(stage, pending);
            return Ok(());
        }
        log::debug!(
            "submitting {} of {} shuffle map tasks of {} ({}) for shuffle #{}",
            missing.len(),
            stage.num_partitions,
            stage,
            stage.rdd.get_op_name(),
            dep.get_shuffle_id()
        );
        let tasks = missing
            .into_iter()
            .map(|partition| {
                ShuffleMapTask::new(
                    self.get_next_task_id(),
                    run_id,
                    stage.id,
                    dep.clone(),
                    partition,
                )
            })
            .collect::<Vec<_>>();
        self.submit_tasks(tasks)?;
        log::debug!(
            "{} finished, shuffle #{} is available: {}",
            stage,
            dep.get_shuffle_id(),
            stage.is_available(&self.map_output_tracker)
        );
        self.release_parents(stage, pending);
        Ok(())
    }

    /// Called once `stage` has finished: parent shuffles it was the last
    /// reader of are dropped.
    fn release_parents(&self, stage: &Stage, pending: &mut PendingReaders) {
        for shuffle_id in parent_shuffle_ids(stage) {
            let readers = match pending.get_mut(&shuffle_id) {
                Some(readers) => readers,
                None => continue,
            };
            *readers = readers.saturating_sub(1);
            if *readers == 0 {
                pending.remove(&shuffle_id);
                self.drop_shuffle(shuffle_id);
            }
        }
    }

    /// Drops the shuffles of the finished job that the final stage does not
    /// read directly. They were only kept because some reader stage was
    /// skipped.
    fn drop_unused_shuffles(&self, final_stage: &Stage, pending: PendingReaders) {
        let kept = parent_shuffle_ids(final_stage).collect::<BTreeSet<_>>();
        for shuffle_id in pending.into_keys().filter(|id| !kept.contains(id)) {
            self.drop_shuffle(shuffle_id);
        }
    }

    fn drop_shuffle(&self, shuffle_id: usize) {
        self.map_output_tracker.unregister_shuffle(shuffle_id);
        self.shuffle_manager.remove_shuffle(shuffle_id);
    }

    /// Every task of a stage is run in the local thread pool. Returns the
    /// results indexed by position in `tasks`, or the first failure.
    fn submit_tasks<R: Task>(&self, tasks: Vec<R>) -> Result<Vec<(usize, R::Output)>> {
        let num_tasks = tasks.len();
        let (sender, receiver) = channel::unbounded::<CompletionEvent<R::Output>>();
        let pool = self.pool.lock().clone();
        for (output_id, task) in tasks.into_iter().enumerate() {
            let attempt_id = self.attempt_id.fetch_add(1, Ordering::SeqCst);
            let sender = sender.clone();
            pool.execute(move || {
                let partition = task.get_partition();
                let result = run_task(&task, attempt_id);
                if sender
                    .send(CompletionEvent {
                        output_id,
                        partition,
                        result,
                    })
                    .is_err()
                {
                    log::debug!("ignoring completion event of an aborted job");
                }
            });
        }
        drop(sender);

        let mut results = Vec::with_capacity(num_tasks);
        for _ in 0..num_tasks {
            let event = receiver.recv().map_err(|_| Error::WorkerPoolDisconnected)?;
            match event.result {
                Ok(r) => results.push((event.output_id, r)),
                Err(e) => {
                    log::error!("task for partition #{} failed: {}", event.partition, e);
                    return Err(e);
                }
            }
        }
        Ok(results)
    }

    fn new_stage(
        &self,
        shuffle_stages: &mut ShuffleStages,
        rdd_base: Arc<dyn RddBase>,
        shuffle_dependency: Option<Arc<dyn ShuffleDependencyTrait>>,
    ) -> Result<Stage> {
        if let Some(dep) = &shuffle_dependency {
            log::debug!("shuffle dependency exists, registering to map output tracker");
            self.map_output_tracker
                .register_shuffle(dep.get_shuffle_id(), rdd_base.number_of_splits());
        }
        let id = self.get_next_stage_id();
        log::debug!("new stage #{} for rdd #{}", id, rdd_base.get_rdd_id());
        let parents = self.get_parent_stages(shuffle_stages, rdd_base.clone())?;
        Ok(Stage::new(id, rdd_base, shuffle_dependency, parents))
    }

    fn get_shuffle_map_stage(
        &self,
        shuffle_stages: &mut ShuffleStages,
        shuf: Arc<dyn ShuffleDependencyTrait>,
    ) -> Result<Stage> {
        if let Some(stage) = shuffle_stages.get(&shuf.get_shuffle_id()) {
            return Ok(stage.clone());
        }
        let stage = self.new_stage(shuffle_stages, shuf.get_rdd_base(), Some(shuf.clone()))?;
        shuffle_stages.insert(shuf.get_shuffle_id(), stage.clone());
        Ok(stage)
    }

    fn visit_for_parent_stages(
        &self,
        shuffle_stages: &mut ShuffleStages,
        parents: &mut BTreeSet<Stage>,
        visited: &mut BTreeSet<Arc<dyn RddBase>>,
        rdd: Arc<dyn RddBase>,
    ) -> Result<()> {
        if !visited.contains(&rdd) {
            visited.insert(rdd.clone());
            for dep in rdd.get_dependencies() {
                match dep {
                    Dependency::ShuffleDependency(shuf_dep) => {
                        parents.insert(self.get_shuffle_map_stage(shuffle_stages, shuf_dep)?);
                    }
                    Dependency::NarrowDependency(nar_dep) => {
                        self.visit_for_parent_stages(
                            shuffle_stages,
                            parents,
                            visited,
                            nar_dep.get_rdd_base(),
                        )?;
                    }
                }
            }
        }
        Ok(())
    }

    fn get_parent_stages(
        &self,
        shuffle_stages: &mut ShuffleStages,
        rdd: Arc<dyn RddBase>,
    ) -> Result<Vec<Stage>> {
        let mut parents: BTreeSet<Stage> = BTreeSet::new();
        let mut visited: BTreeSet<Arc<dyn RddBase>> = BTreeSet::new();
        self.visit_for_parent_stages(shuffle_stages, &mut parents, &mut visited, rdd)?;
        log::debug!(
            "parent stages: {:?}",
            parents.iter().map(|x| x.id).collect::<Vec<_>>()
        );
        Ok(parents.into_iter().collect())
    }

    fn get_missing_parent_stages(&self, stage: &Stage) -> Vec<Stage> {
        stage
            .parents
            .iter()
            .filter(|parent| !parent.is_available(&self.map_output_tracker))
            .cloned()
            .collect()
    }

    fn get_next_stage_id(&self) -> usize {
        self.next_stage_id.fetch_add(1, Ordering::SeqCst)
    }

    fn get_next_task_id(&self) -> usize {
        self.next_task_id.fetch_add(1, Ordering::SeqCst)
    }
}

fn parent_shuffle_ids(stage: &Stage) -> impl Iterator<Item = usize> + '_ {
    stage
        .parents
        .iter()
        .filter_map(|parent| parent.shuffle_dependency.as_ref())
        .map(|dep| dep.get_shuffle_id())
}

/// Counts, for every shuffle of the job, the stages that read it.
fn pending_readers(final_stage: &Stage) -> PendingReaders {
    let mut pending = PendingReaders::new();
    let mut seen = BTreeSet::new();
    let mut stack = vec![final_stage];
    while let Some(stage) = stack.pop() {
        if !seen.insert(stage.id) {
            continue;
        }
        for shuffle_id in parent_shuffle_ids(stage) {
            *pending.entry(shuffle_id).or_default() += 1;
        }
        stack.extend(stage.parents.iter());
    }
    pending
}

/// Runs one task, turning a panic inside user code into a task failure.
fn run_task<R: Task>(task: &R, attempt_id: usize) -> Result<R::Output> {
    let context = TaskContext::new(task.get_stage_id(), task.get_partition(), attempt_id);
    log::trace!(
        "running {} as task #{} of job #{}",
        task,
        task.get_task_id(),
        task.get_run_id()
    );
    match panic::catch_unwind(AssertUnwindSafe(|| task.run(context))) {
        Ok(result) => result,
        Err(payload) => Err(Error::TaskFailed {
            stage_id: task.get_stage_id(),
            partition: task.get_partition(),
            reason: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_owned()
    }
}
