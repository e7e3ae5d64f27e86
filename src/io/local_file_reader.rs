use std::fs;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::context::Context;
use crate::dependency::Dependency;
use crate::error::{Error, Result};
use crate::io::ReaderConfiguration;
use crate::rdd::{MapperRdd, Rdd, RddBase, RddVals};
use crate::serializable_traits::{Data, Func};
use crate::split::Split;

pub struct LocalFsReaderConfig {
    filter_ext: Option<std::ffi::OsString>,
    path: PathBuf,
    num_partitions: usize,
}

impl LocalFsReaderConfig {
    /// Read a single file or all the files of a directory.
    pub fn new<T: Into<PathBuf>>(path: T) -> LocalFsReaderConfig {
        LocalFsReaderConfig {
            filter_ext: None,
            path: path.into(),
            num_partitions: 1,
        }
    }

    /// Only will read files with a given extension.
    pub fn filter_extension<T: Into<String>>(mut self, extension: T) -> Self {
        self.filter_ext = Some(extension.into().into());
        self
    }

    /// Minimum number of partitions the input is split into.
    pub fn num_partitions(mut self, num: usize) -> Self {
        self.num_partitions = num.max(1);
        self
    }
}

impl ReaderConfiguration<String> for LocalFsReaderConfig {
    fn make_reader<F, O>(self, context: Arc<Context>, decoder: F) -> Result<Arc<dyn Rdd<Item = O>>>
    where
        O: Data,
        F: Func<String, O>,
    {
        let reader = LocalFsReader::new(self, context)?;
        Ok(Arc::new(MapperRdd::new(
            Arc::new(reader) as Arc<dyn Rdd<Item = String>>,
            decoder,
        )))
    }
}

/// A byte range of one file. The split owns every line that starts inside
/// `[start, end)`.
#[derive(Clone, Debug)]
struct LineSplit {
    index: usize,
    path: PathBuf,
    start: u64,
    end: u64,
}

impl Split for LineSplit {
    fn get_index(&self) -> usize {
        self.index
    }
}

impl LineSplit {
    fn read_lines(&self) -> std::io::Result<Vec<String>> {
        let mut reader = BufReader::new(fs::File::open(&self.path)?);
        let mut offset = self.start;
        let mut line = String::new();
        if self.start > 0 {
            // The line crossing `start` belongs to the previous split.
            reader.seek(SeekFrom::Start(self.start - 1))?;
            offset = self.start - 1 + reader.read_line(&mut line)? as u64;
        }
        let mut lines = Vec::new();
        while offset < self.end {
            line.clear();
            let read = reader.read_line(&mut line)?;
            if read == 0 {
                break;
            }
            offset += read as u64;
            let trimmed = line
                .strip_suffix('\n')
                .map(|l| l.strip_suffix('\r').unwrap_or(l))
                .unwrap_or(&line);
            lines.push(trimmed.to_owned());
        }
        Ok(lines)
    }
}

/// Reads text files from the local file system, one record per line.
#[derive(Clone)]
pub struct LocalFsReader {
    vals: Arc<RddVals>,
    splits: Arc<Vec<LineSplit>>,
}

impl LocalFsReader {
    pub(crate) fn new(config: LocalFsReaderConfig, context: Arc<Context>) -> Result<Self> {
        let LocalFsReaderConfig {
            filter_ext,
            path,
            num_partitions,
        } = config;
        let files = LocalFsReader::list_files(&path, filter_ext.as_deref())?;
        let per_file = (num_partitions + files.len().max(1) - 1) / files.len().max(1);

        let mut splits = Vec::new();
        for (file, len) in files {
            let parts = per_file.max(1) as u64;
            for i in 0..parts {
                splits.push(LineSplit {
                    index: splits.len(),
                    path: file.clone(),
                    start: len * i / parts,
                    end: len * (i + 1) / parts,
                });
            }
        }
        log::debug!(
            "reading {} with {} splits",
            path.display(),
            splits.len()
        );
        Ok(LocalFsReader {
            vals: Arc::new(RddVals::new(context)),
            splits: Arc::new(splits),
        })
    }

    fn list_files(
        path: &Path,
        filter_ext: Option<&std::ffi::OsStr>,
    ) -> Result<Vec<(PathBuf, u64)>> {
        let metadata = fs::metadata(path).map_err(Error::InputRead)?;
        if metadata.is_file() {
            return Ok(vec![(path.to_path_buf(), metadata.len())]);
        }
        let mut files = Vec::new();
        for entry in fs::read_dir(path).map_err(Error::InputRead)? {
            let file = entry.map_err(Error::InputRead)?.path();
            if !file.is_file() {
                continue;
            }
            if let Some(ext_filter) = filter_ext {
                if file.extension() != Some(ext_filter) {
                    continue;
                }
            }
            let len = fs::metadata(&file).map_err(Error::InputRead)?.len();
            files.push((file, len));
        }
        files.sort();
        Ok(files)
    }
}

impl RddBase for LocalFsReader {
    fn get_rdd_id(&self) -> usize {
        self.vals.id
    }

    fn get_context(&self) -> Arc<Context> {
        self.vals.context.clone()
    }

    fn get_op_name(&self) -> String {
        "text_file".to_owned()
    }

    fn get_dependencies(&self) -> Vec<Dependency> {
        self.vals.dependencies.clone()
    }

    fn splits(&self) -> Vec<Box<dyn Split>> {
        self.splits
            .iter()
            .map(|s| Box::new(s.clone()) as Box<dyn Split>)
            .collect()
    }

    fn number_of_splits(&self) -> usize {
        self.splits.len()
    }
}

impl Rdd for LocalFsReader {
    type Item = String;

    fn get_rdd(&self) -> Arc<dyn Rdd<Item = Self::Item>> {
        Arc::new(self.clone())
    }

    fn get_rdd_base(&self) -> Arc<dyn RddBase> {
        Arc::new(self.clone()) as Arc<dyn RddBase>
    }

    fn compute(&self, split: Box<dyn Split>) -> Result<Box<dyn Iterator<Item = Self::Item>>> {
        let split = split
            .downcast_ref::<LineSplit>()
            .ok_or(Error::DowncastFailure("LineSplit"))?;
        let lines = split.read_lines().map_err(Error::InputRead)?;
        log::debug!(
            "read {} lines from {} [{}, {})",
            lines.len(),
            split.path.display(),
            split.start,
            split.end
        );
        Ok(Box::new(lines.into_iter()))
    }
}
