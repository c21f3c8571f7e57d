//! Shard persistence for batches of learning data frames.
//!
//! # File Format
//! Shards are named `learning_data.{index}.{ext}` inside the data directory:
//! - `bin`: gzip-compressed compact JSON
//! - `txt`: pretty-printed JSON
//!
//! Both hold one serialized [`LearningData`].

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::config::OutputEncoding;
use crate::error::{FeatureGeneratorError, Result};
use crate::types::LearningData;

/// Destination for completed batches
pub trait ShardSink {
    /// Persist `batch` as shard `shard_index`. The batch is only borrowed so the
    /// caller can keep it for a retry when this fails.
    fn persist(&mut self, batch: &LearningData, shard_index: u64) -> Result<()>;
}

impl<S: ShardSink + ?Sized> ShardSink for &mut S {
    fn persist(&mut self, batch: &LearningData, shard_index: u64) -> Result<()> {
        (**self).persist(batch, shard_index)
    }
}

pub fn shard_file_name(shard_index: u64, encoding: OutputEncoding) -> String {
    format!("learning_data.{}.{}", shard_index, encoding.extension())
}

/// Writes shards as files in a data directory
pub struct FileShardWriter {
    data_dir: PathBuf,
    encoding: OutputEncoding,
}

impl FileShardWriter {
    /// Create the writer, creating `data_dir` if it does not exist yet
    pub fn new(data_dir: impl Into<PathBuf>, encoding: OutputEncoding) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir, encoding })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn shard_path(&self, shard_index: u64) -> PathBuf {
        self.data_dir.join(shard_file_name(shard_index, self.encoding))
    }

    fn write_encoded(&self, path: &Path, batch: &LearningData) -> Result<()> {
        let file = BufWriter::new(File::create(path)?);
        match self.encoding {
            OutputEncoding::Binary => {
                let mut encoder = GzEncoder::new(file, Compression::default());
                serde_json::to_writer(&mut encoder, batch)?;
                encoder.finish()?.flush()?;
            }
            OutputEncoding::Text => {
                let mut file = file;
                serde_json::to_writer_pretty(&mut file, batch)?;
                file.write_all(b"\n")?;
                file.flush()?;
            }
        }
        Ok(())
    }
}

impl ShardSink for FileShardWriter {
    fn persist(&mut self, batch: &LearningData, shard_index: u64) -> Result<()> {
        let final_path = self.shard_path(shard_index);
        let tmp_path = self.data_dir.join(format!(
            ".{}.tmp",
            shard_file_name(shard_index, self.encoding)
        ));

        let written = self
            .write_encoded(&tmp_path, batch)
            .and_then(|_| fs::rename(&tmp_path, &final_path).map_err(Into::into));

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(FeatureGeneratorError::Persist {
                shard_index,
                reason: format!("{}: {}", final_path.display(), e),
            });
        }

        log::debug!("Wrote {} frames to {}", batch.len(), final_path.display());
        Ok(())
    }
}

/// Read a shard back, picking the decoder from the file extension
pub fn load_shard(path: &Path) -> Result<LearningData> {
    let file = BufReader::new(File::open(path)?);
    let batch = if path.extension().map(|e| e == "bin").unwrap_or(false) {
        serde_json::from_reader(GzDecoder::new(file))?
    } else {
        serde_json::from_reader(file)?
    };
    Ok(batch)
}

/// Keeps persisted batches in memory
#[derive(Default)]
pub struct MemorySink {
    pub shards: Vec<(u64, LearningData)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_count(&self) -> usize {
        self.shards.iter().map(|(_, batch)| batch.len()).sum()
    }
}

impl ShardSink for MemorySink {
    fn persist(&mut self, batch: &LearningData, shard_index: u64) -> Result<()> {
        self.shards.push((shard_index, batch.clone()));
        Ok(())
    }
}
