use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::cache::CacheTracker;
use crate::error::{Error, Result};
use crate::map_output_tracker::MapOutputTracker;
use crate::shuffle::ShuffleManager;
use log::LevelFilter;
use serde::{Deserialize, Serialize};

/// Services shared by every task of a context.
pub(crate) struct Env {
    pub cache_tracker: CacheTracker,
    pub map_output_tracker: MapOutputTracker,
    pub shuffle_manager: ShuffleManager,
}

impl Env {
    pub fn new() -> Self {
        Env {
            cache_tracker: CacheTracker::new(),
            map_output_tracker: MapOutputTracker::new(),
            shuffle_manager: ShuffleManager::new(),
        }
    }
}

/// Execution target descriptor.
///
/// Only in-process targets are supported: `local` runs a single worker,
/// `local[N]` runs `N` workers and `local[*]` one worker per logical CPU.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Master {
    Local { threads: usize },
    LocalAllCores,
}

impl Master {
    pub fn num_threads(&self) -> usize {
        match *self {
            Master::Local { threads } => threads,
            Master::LocalAllCores => num_cpus::get().max(1),
        }
    }
}

impl Default for Master {
    fn default() -> Self {
        Master::LocalAllCores
    }
}

impl FromStr for Master {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s == "local" {
            return Ok(Master::Local { threads: 1 });
        }
        let threads = s
            .strip_prefix("local[")
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(|| Error::UnsupportedMaster(s.to_string()))?;
        if threads == "*" {
            return Ok(Master::LocalAllCores);
        }
        match threads.parse::<usize>() {
            Ok(n) if n > 0 => Ok(Master::Local { threads: n }),
            _ => Err(Error::UnsupportedMaster(s.to_string())),
        }
    }
}

impl fmt::Display for Master {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Master::Local { threads: 1 } => write!(f, "local"),
            Master::Local { threads } => write!(f, "local[{}]", threads),
            Master::LocalAllCores => write!(f, "local[*]"),
        }
    }
}

impl TryFrom<String> for Master {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Master> for String {
    fn from(m: Master) -> String {
        m.to_string()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level `{}`", other)),
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(l: LogLevel) -> LevelFilter {
        match l {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Settings for one run. Passed explicitly to [`crate::Context::new`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub master: Master,
    /// Directory under which the per-job work dir is created.
    pub local_dir: PathBuf,
    pub log_level: LogLevel,
    /// Remove the whole work dir, log files included, when the context is dropped.
    pub log_cleanup: bool,
    /// Partition count for shuffles when the caller does not choose one.
    pub default_partitions: Option<usize>,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            master: Master::default(),
            local_dir: std::env::temp_dir(),
            log_level: LogLevel::Info,
            log_cleanup: true,
            default_partitions: None,
        }
    }
}

impl Configuration {
    pub fn with_master(master: Master) -> Self {
        Configuration {
            master,
            ..Configuration::default()
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| Error::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Number of partitions a shuffle gets when none is requested explicitly.
    pub fn default_parallelism(&self) -> usize {
        self.default_partitions
            .filter(|&n| n > 0)
            .unwrap_or_else(|| self.master.num_threads())
    }
}
