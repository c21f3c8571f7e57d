use crate::error::Result;
use crate::storage::ShardSink;
use crate::types::{LearningData, LearningDataFrame};

/// Groups sealed frames into batches and hands each full batch to the sink.
///
/// Shard indices start at 0 and advance once per successful write. A failed
/// write keeps the batch intact; [`ShardRotator::flush_pending`] retries it.
pub struct ShardRotator<S: ShardSink> {
    sink: S,
    batch: LearningData,
    frames_per_shard: usize,
    next_shard_index: u64,
    frames_persisted: u64,
}

impl<S: ShardSink> ShardRotator<S> {
    pub fn new(sink: S, frames_per_shard: usize) -> Self {
        ShardRotator {
            sink,
            batch: LearningData::default(),
            frames_per_shard,
            next_shard_index: 0,
            frames_persisted: 0,
        }
    }

    /// Add a sealed frame and flush if the batch just reached `frames_per_shard`.
    ///
    /// Callers must clear a pending full batch with [`ShardRotator::flush_pending`]
    /// first; the batch never holds more than `frames_per_shard` frames.
    pub fn commit(&mut self, frame: LearningDataFrame) -> Result<()> {
        debug_assert!(
            !self.is_full(),
            "pending batch must be flushed before committing"
        );
        self.batch.push(frame);
        self.flush_pending()
    }

    /// Retry a batch left full by an earlier failed write. No-op otherwise.
    pub fn flush_pending(&mut self) -> Result<()> {
        if self.is_full() {
            self.flush()?;
        }
        Ok(())
    }

    /// Write the current batch, whatever its size. Empty batches are skipped.
    pub fn flush(&mut self) -> Result<()> {
        if self.batch.is_empty() {
            return Ok(());
        }

        let shard_index = self.next_shard_index;
        self.sink.persist(&self.batch, shard_index)?;

        let frames = self.batch.len();
        self.frames_persisted += frames as u64;
        self.next_shard_index += 1;
        self.batch.clear();
        log::info!("Persisted shard {} with {} frames", shard_index, frames);
        Ok(())
    }

    pub fn is_full(&self) -> bool {
        self.batch.len() >= self.frames_per_shard
    }

    pub fn batch(&self) -> &LearningData {
        &self.batch
    }

    /// Number of shards written so far, which is also the next shard index
    pub fn shards_written(&self) -> u64 {
        self.next_shard_index
    }

    pub fn frames_persisted(&self) -> u64 {
        self.frames_persisted
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
