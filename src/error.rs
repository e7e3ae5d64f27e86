use std::path::PathBuf;

use crate::shuffle::ShuffleError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported master descriptor `{0}`; expected local, local[N] or local[*]")]
    UnsupportedMaster(String),

    #[error("number of iterations must be a positive integer, got `{0}`")]
    InvalidIterationCount(String),

    #[error("number of partitions should be greater than or equal to 1")]
    InvalidPartitionCount,

    #[error("failed to read configuration file {path:?}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to read input")]
    InputRead(#[source] std::io::Error),

    #[error("failed to write output")]
    OutputWrite(#[source] std::io::Error),

    #[error("failed to create work dir {0:?}")]
    WorkDir(PathBuf, #[source] std::io::Error),

    #[error("malformed input line `{line}`: expected two whitespace separated tokens")]
    MalformedLine { line: String },

    #[error("partition #{0} does not exist")]
    PartitionNotFound(usize),

    #[error("failed to downcast {0}")]
    DowncastFailure(&'static str),

    #[error("failed to encode or decode a cached partition")]
    CacheEncoding(#[source] bincode::Error),

    #[error(transparent)]
    Shuffle(#[from] ShuffleError),

    #[error("task for partition #{partition} of stage #{stage_id} failed: {reason}")]
    TaskFailed {
        stage_id: usize,
        partition: usize,
        reason: String,
    },

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    #[error("scheduler lost contact with the worker pool")]
    WorkerPoolDisconnected,
}
