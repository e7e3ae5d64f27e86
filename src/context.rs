use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use crate::env::{Configuration, Env, Master};
use crate::error::{Error, Result};
use crate::io::{LocalFsReader, LocalFsReaderConfig, ReaderConfiguration};
use crate::rdd::{ParallelCollection, Rdd};
use crate::scheduler::{LocalScheduler, TaskContext};
use crate::serializable_traits::{Data, Func};
use log::LevelFilter;
use once_cell::sync::OnceCell;
use simplelog::*;
use uuid::Uuid;

/// Entry point of the engine. Owns the scheduler, the shuffle services and
/// the work dir of one application.
pub struct Context {
    next_rdd_id: Arc<AtomicUsize>,
    next_shuffle_id: Arc<AtomicUsize>,
    scheduler: LocalScheduler,
    env: Env,
    config: Configuration,
    /// the executing job tmp work_dir
    work_dir: PathBuf,
}

impl Drop for Context {
    fn drop(&mut self) {
        log::debug!(
            "dropping context, cleaning up {} shuffle blocks, {} cached partitions and {}",
            self.env.shuffle_manager.num_blocks(),
            self.env.cache_tracker.num_partitions(),
            self.work_dir.display()
        );
        self.env.shuffle_manager.clean_up_shuffle_data();
        self.env.cache_tracker.clear();
        Context::clean_up_work_dir(&self.work_dir, self.config.log_cleanup);
    }
}

impl Context {
    pub fn new(config: Configuration) -> Result<Arc<Self>> {
        let job_id = Uuid::new_v4().to_string();
        let job_work_dir = config.local_dir.join(format!("rankflow-job-{}", job_id));
        fs::create_dir_all(&job_work_dir)
            .map_err(|source| Error::WorkDir(job_work_dir.clone(), source))?;

        initialize_loggers(job_work_dir.join("driver.log"), config.log_level.into());
        if let Ok(effective) = config.to_toml() {
            log::debug!("effective configuration:\n{}", effective);
        }
        let env = Env::new();
        let scheduler = LocalScheduler::new(
            config.master.num_threads(),
            env.map_output_tracker.clone(),
            env.shuffle_manager.clone(),
        );
        log::info!(
            "started context for master {} with {} worker threads, work dir {}",
            config.master,
            scheduler.num_threads(),
            job_work_dir.display()
        );

        Ok(Arc::new(Context {
            next_rdd_id: Arc::new(AtomicUsize::new(0)),
            next_shuffle_id: Arc::new(AtomicUsize::new(0)),
            scheduler,
            env,
            config,
            work_dir: job_work_dir,
        }))
    }

    /// Context running on every available core with the default configuration.
    pub fn local() -> Result<Arc<Self>> {
        Context::new(Configuration::default())
    }

    /// Context for a master descriptor such as `local[4]`.
    pub fn with_master(master: &str) -> Result<Arc<Self>> {
        let master: Master = master.parse()?;
        Context::new(Configuration::with_master(master))
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    pub fn default_parallelism(&self) -> usize {
        self.config.default_parallelism()
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub(crate) fn env(&self) -> &Env {
        &self.env
    }

    fn clean_up_work_dir(work_dir: &Path, log_cleanup: bool) {
        if log_cleanup {
            // Remove created files.
            if fs::remove_dir_all(work_dir).is_err() {
                log::error!("failed removing tmp work dir: {}", work_dir.display());
            }
        } else if let Ok(dir) = fs::read_dir(work_dir) {
            for entry in dir.flatten() {
                let path = entry.path();
                let removed = if path.is_dir() {
                    fs::remove_dir_all(&path)
                } else if path.extension().map_or(false, |ext| ext == "log") {
                    continue;
                } else {
                    fs::remove_file(&path)
                };
                if removed.is_err() {
                    log::warn!("failed removing {}", path.display());
                }
            }
        }
    }

    pub fn new_rdd_id(&self) -> usize {
        self.next_rdd_id.fetch_add(1, Ordering::SeqCst)
    }

    pub fn new_shuffle_id(&self) -> usize {
        self.next_shuffle_id.fetch_add(1, Ordering::SeqCst)
    }

    pub fn make_rdd<T: Data, I>(
        self: &Arc<Self>,
        seq: I,
        num_slices: usize,
    ) -> Result<Arc<dyn Rdd<Item = T>>>
    where
        I: IntoIterator<Item = T>,
    {
        self.parallelize(seq, num_slices)
    }

    /// Distributes a local collection over `num_slices` partitions.
    pub fn parallelize<T: Data, I>(
        self: &Arc<Self>,
        seq: I,
        num_slices: usize,
    ) -> Result<Arc<dyn Rdd<Item = T>>>
    where
        I: IntoIterator<Item = T>,
    {
        Ok(Arc::new(ParallelCollection::new(
            self.clone(),
            seq,
            num_slices,
        )?))
    }

    /// Lines of a text file (or of every file in a directory), split into at
    /// least `min_partitions` byte ranges. Line terminators are stripped.
    pub fn text_file<P: Into<PathBuf>>(
        self: &Arc<Self>,
        path: P,
        min_partitions: usize,
    ) -> Result<Arc<dyn Rdd<Item = String>>> {
        let config = LocalFsReaderConfig::new(path).num_partitions(min_partitions);
        Ok(Arc::new(LocalFsReader::new(config, self.clone())?))
    }

    /// Load from a source and decode every record with `func`.
    pub fn read_source<F, C, I: Data, O: Data>(
        self: &Arc<Self>,
        config: C,
        func: F,
    ) -> Result<Arc<dyn Rdd<Item = O>>>
    where
        F: Func<I, O>,
        C: ReaderConfiguration<I>,
    {
        config.make_reader(self.clone(), func)
    }

    pub fn run_job<T: Data, U: Send + 'static, F>(
        self: &Arc<Self>,
        rdd: Arc<dyn Rdd<Item = T>>,
        func: F,
    ) -> Result<Vec<U>>
    where
        F: Fn(Box<dyn Iterator<Item = T>>) -> U + Send + Sync + 'static,
    {
        let cl = move |_task_context: TaskContext, iter: Box<dyn Iterator<Item = T>>| (func)(iter);
        let func = Arc::new(cl);
        self.scheduler.run_job(
            func,
            rdd.clone(),
            (0..rdd.number_of_splits()).collect(),
            false,
        )
    }

    pub fn run_job_with_partitions<T: Data, U: Send + 'static, F, P>(
        self: &Arc<Self>,
        rdd: Arc<dyn Rdd<Item = T>>,
        func: F,
        partitions: P,
    ) -> Result<Vec<U>>
    where
        F: Fn(Box<dyn Iterator<Item = T>>) -> U + Send + Sync + 'static,
        P: IntoIterator<Item = usize>,
    {
        let cl = move |_task_context: TaskContext, iter: Box<dyn Iterator<Item = T>>| (func)(iter);
        self.scheduler
            .run_job(Arc::new(cl), rdd, partitions.into_iter().collect(), true)
    }

    pub fn run_job_with_context<T: Data, U: Send + 'static, F>(
        self: &Arc<Self>,
        rdd: Arc<dyn Rdd<Item = T>>,
        func: F,
    ) -> Result<Vec<U>>
    where
        F: Fn(TaskContext, Box<dyn Iterator<Item = T>>) -> U + Send + Sync + 'static,
    {
        log::debug!("inside run job in context");
        let func = Arc::new(func);
        self.scheduler.run_job(
            func,
            rdd.clone(),
            (0..rdd.number_of_splits()).collect(),
            false,
        )
    }
}

static LOGGER: OnceCell<()> = OnceCell::new();

fn initialize_loggers<P: Into<PathBuf>>(file_path: P, log_level: LevelFilter) {
    fn _initializer(file_path: PathBuf, log_level: LevelFilter) {
        let mut combined: Vec<Box<dyn SharedLogger>> = Vec::new();
        match fs::File::create(&file_path) {
            Ok(file) => combined.push(WriteLogger::new(log_level, Config::default(), file)),
            Err(err) => eprintln!(
                "not able to create log file {}: {}",
                file_path.display(),
                err
            ),
        }
        // stdout is reserved for job output
        combined.push(TermLogger::new(
            log_level,
            Config::default(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ));
        // Another logger may already be installed by the embedding application.
        if CombinedLogger::init(combined).is_ok() {
            log::info!("path for file logger: {}", file_path.display());
        }
    }

    LOGGER.get_or_init(move || _initializer(file_path.into(), log_level));
}
