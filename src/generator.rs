//! Feature generation driver: record messages in, persisted shards out.
//!
//! Data flows one way through three stages:
//!   1. [`Demultiplexer`] decodes each message and picks a handler,
//!   2. [`FrameAccumulator`] writes features into the current frame and seals
//!      it when the pose window fills,
//!   3. [`ShardRotator`] batches sealed frames and writes full batches.
//!
//! All state lives in one [`FeatureGenerator`]; [`FeatureGenerator::finish`]
//! writes whatever is left once the input ends or is cancelled.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::accumulator::FrameAccumulator;
use crate::config::FeatureGeneratorConfig;
use crate::demux::{Demultiplexer, Dispatch, MessageHandler};
use crate::error::Result;
use crate::record::{MessageSource, RecordMessage};
use crate::rotation::ShardRotator;
use crate::storage::ShardSink;
use crate::types::{ChassisSample, LearningData, LearningDataFrame, PoseSample};

/// Counters for one generation run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorStats {
    /// Poses written into a frame. A pose rejected while a failed shard
    /// write is pending is not counted and has to be sent again.
    pub localization_messages: u64,
    pub chassis_messages: u64,
    pub ignored_messages: u64,
    pub dropped_messages: u64,
    pub frames_sealed: u64,
    pub shards_written: u64,
    pub frames_persisted: u64,
}

/// Accumulator and rotator behind the message handler interface
struct FramePipeline<S: ShardSink> {
    accumulator: FrameAccumulator,
    rotator: ShardRotator<S>,
}

impl<S: ShardSink> MessageHandler for FramePipeline<S> {
    /// Rejects the pose untouched while an earlier failed write is still
    /// pending; the caller has to send it again after the error.
    fn on_localization(&mut self, pose: &PoseSample) -> Result<()> {
        // A batch left full by a failed write must go out before new frames can be sealed
        self.rotator.flush_pending()?;

        if let Some(sealed) = self.accumulator.on_localization(pose) {
            self.rotator.commit(sealed)?;
        }
        Ok(())
    }

    fn on_chassis(&mut self, chassis: &ChassisSample) -> Result<()> {
        self.accumulator.on_chassis(chassis);
        Ok(())
    }
}

pub struct FeatureGenerator<S: ShardSink> {
    demux: Demultiplexer,
    pipeline: FramePipeline<S>,
}

impl<S: ShardSink> FeatureGenerator<S> {
    pub fn new(config: &FeatureGeneratorConfig, sink: S) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            demux: Demultiplexer::from_config(config),
            pipeline: FramePipeline {
                accumulator: FrameAccumulator::new(
                    config.label_sample_interval,
                    config.window_step,
                    config.trajectory_point_sample_interval,
                ),
                rotator: ShardRotator::new(sink, config.frames_per_shard),
            },
        })
    }

    /// Route one message through the pipeline
    pub fn handle_message(&mut self, message: &RecordMessage) -> Result<Dispatch> {
        self.demux.dispatch(message, &mut self.pipeline)
    }

    /// Consume `source` to the end. Returns the number of messages read.
    pub fn process<M: MessageSource + ?Sized>(&mut self, source: &mut M) -> Result<u64> {
        let running = AtomicBool::new(true);
        self.process_until(source, &running)
    }

    /// Consume `source` until it ends or `running` is cleared.
    ///
    /// Returns the number of messages read. Nothing is flushed here; call
    /// [`FeatureGenerator::finish`] once all sources are done.
    pub fn process_until<M: MessageSource + ?Sized>(
        &mut self,
        source: &mut M,
        running: &AtomicBool,
    ) -> Result<u64> {
        let mut messages = 0u64;
        while running.load(Ordering::SeqCst) {
            let Some(message) = source.next_message()? else {
                break;
            };
            messages += 1;
            self.handle_message(&message)?;
        }
        Ok(messages)
    }

    /// Terminal flush: write the remaining batch plus the frame under
    /// construction if anything was written into it.
    ///
    /// Safe to call again after a failure; frames already handed to the
    /// batch are retried, and a successful finish leaves nothing to write.
    pub fn finish(&mut self) -> Result<GeneratorStats> {
        let rotator = &mut self.pipeline.rotator;
        rotator.flush_pending()?;

        let current = self.pipeline.accumulator.take_current();
        if !current.is_empty() {
            rotator.commit(current)?;
        }
        rotator.flush()?;

        let stats = self.stats();
        log::info!(
            "Total learning_data_frame number: {} in {} shard(s)",
            stats.frames_persisted,
            stats.shards_written
        );
        Ok(stats)
    }

    pub fn stats(&self) -> GeneratorStats {
        let counts = self.demux.counts();
        GeneratorStats {
            localization_messages: self.pipeline.accumulator.poses_accepted(),
            chassis_messages: self.pipeline.accumulator.chassis_accepted(),
            ignored_messages: counts.ignored,
            dropped_messages: counts.dropped,
            frames_sealed: self.pipeline.accumulator.frames_sealed(),
            shards_written: self.pipeline.rotator.shards_written(),
            frames_persisted: self.pipeline.rotator.frames_persisted(),
        }
    }

    pub fn current_frame(&self) -> &LearningDataFrame {
        self.pipeline.accumulator.current()
    }

    /// Sealed frames waiting for the next shard
    pub fn batch(&self) -> &LearningData {
        self.pipeline.rotator.batch()
    }

    pub fn window_len(&self) -> usize {
        self.pipeline.accumulator.window().len()
    }

    pub fn sink(&self) -> &S {
        self.pipeline.rotator.sink()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode_chassis, encode_localization};
    use crate::config::{DEFAULT_CHASSIS_CHANNEL, DEFAULT_LOCALIZATION_CHANNEL};
    use crate::error::FeatureGeneratorError;
    use crate::record::VecSource;
    use crate::storage::MemorySink;
    use crate::types::Point3D;

    fn config(interval: usize, per_shard: usize, stride: usize, step: usize) -> FeatureGeneratorConfig {
        FeatureGeneratorConfig {
            label_sample_interval: interval,
            frames_per_shard: per_shard,
            trajectory_point_sample_interval: stride,
            window_step: step,
            ..Default::default()
        }
    }

    fn pose_msg(x: f64) -> RecordMessage {
        let pose = PoseSample {
            position: Point3D::new(x, 0.0, 0.0),
            ..Default::default()
        };
        RecordMessage::new(DEFAULT_LOCALIZATION_CHANNEL, encode_localization(&pose).unwrap())
    }

    fn chassis_msg(speed: f64) -> RecordMessage {
        let chassis = ChassisSample {
            speed_mps: speed,
            ..Default::default()
        };
        RecordMessage::new(DEFAULT_CHASSIS_CHANNEL, encode_chassis(&chassis).unwrap())
    }

    #[test]
    fn test_rejects_invalid_config() {
        let result = FeatureGenerator::new(&config(4, 2, 1, 5), MemorySink::new());
        assert!(matches!(result, Err(FeatureGeneratorError::InvalidConfig(_))));
    }

    #[test]
    fn test_two_labels_make_one_shard() {
        // interval=4, step=4: each label needs 4 fresh poses
        let mut generator = FeatureGenerator::new(&config(4, 2, 2, 4), MemorySink::new()).unwrap();
        let mut source = VecSource::new((0..8).map(|i| pose_msg(i as f64)).collect());

        assert_eq!(generator.process(&mut source).unwrap(), 8);

        let shards = &generator.sink().shards;
        assert_eq!(shards.len(), 1);
        assert_eq!(shards[0].1.len(), 2);
        assert!(generator.batch().is_empty());
        assert!(generator.current_frame().is_empty());
    }

    #[test]
    fn test_batch_never_exceeds_threshold() {
        let mut generator = FeatureGenerator::new(&config(3, 4, 1, 1), MemorySink::new()).unwrap();
        for i in 0..500 {
            generator.handle_message(&pose_msg(i as f64)).unwrap();
            assert!(generator.batch().len() < 4);
            assert!(generator.window_len() <= 3);
        }
        for (_, shard) in &generator.sink().shards {
            assert_eq!(shard.len(), 4);
        }
    }

    #[test]
    fn test_finish_flushes_partial_frame_once() {
        let mut generator = FeatureGenerator::new(&config(4, 10, 1, 1), MemorySink::new()).unwrap();
        let mut source = VecSource::new(vec![
            pose_msg(0.0),
            pose_msg(1.0),
            pose_msg(2.0),
            pose_msg(3.0),
            chassis_msg(5.0),
        ]);
        generator.process(&mut source).unwrap();
        assert!(generator.sink().shards.is_empty());

        let stats = generator.finish().unwrap();
        assert_eq!(stats.shards_written, 1);
        assert_eq!(stats.frames_persisted, 2);

        let shard = &generator.sink().shards[0].1;
        assert_eq!(shard.frames()[0].label_trajectory_points.len(), 4);
        let partial = &shard.frames()[1];
        assert!(partial.label_trajectory_points.is_empty());
        assert_eq!(partial.chassis_feature.as_ref().unwrap().speed_mps, 5.0);

        // A second finish has nothing left to write
        generator.finish().unwrap();
        assert_eq!(generator.sink().shards.len(), 1);
    }

    #[test]
    fn test_finish_on_empty_run_writes_nothing() {
        let mut generator = FeatureGenerator::new(&config(4, 2, 1, 1), MemorySink::new()).unwrap();
        let stats = generator.finish().unwrap();
        assert_eq!(stats, GeneratorStats::default());
        assert!(generator.sink().shards.is_empty());
    }

    #[test]
    fn test_cancel_stops_reading_but_finish_still_flushes() {
        let mut generator = FeatureGenerator::new(&config(2, 10, 1, 1), MemorySink::new()).unwrap();
        let mut source = VecSource::new((0..6).map(|i| pose_msg(i as f64)).collect());
        let running = AtomicBool::new(false);

        assert_eq!(generator.process_until(&mut source, &running).unwrap(), 0);
        assert_eq!(source.remaining(), 6);

        running.store(true, Ordering::SeqCst);
        generator.handle_message(&pose_msg(0.0)).unwrap();
        generator.handle_message(&pose_msg(1.0)).unwrap();
        running.store(false, Ordering::SeqCst);
        generator.process_until(&mut source, &running).unwrap();

        let stats = generator.finish().unwrap();
        assert_eq!(stats.shards_written, 1);
        assert_eq!(stats.frames_persisted, 1);
    }

    #[test]
    fn test_huge_label_interval_is_accepted_without_allocating() {
        let config = FeatureGeneratorConfig {
            label_sample_interval: usize::MAX,
            window_step: 1,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let mut generator = FeatureGenerator::new(&config, MemorySink::new()).unwrap();
        generator.handle_message(&pose_msg(0.0)).unwrap();
        assert_eq!(generator.window_len(), 1);
    }

    #[test]
    fn test_rejected_pose_is_not_counted() {
        struct DownSink;
        impl ShardSink for DownSink {
            fn persist(&mut self, _batch: &LearningData, shard_index: u64) -> Result<()> {
                Err(FeatureGeneratorError::Persist {
                    shard_index,
                    reason: "read-only".to_string(),
                })
            }
        }

        let mut generator = FeatureGenerator::new(&config(1, 1, 1, 1), DownSink).unwrap();

        // Sealed into the retained batch before the write failed: counted
        assert!(generator.handle_message(&pose_msg(0.0)).is_err());
        // Turned away by the pending batch: not counted
        assert!(generator.handle_message(&pose_msg(1.0)).is_err());
        assert!(generator.handle_message(&chassis_msg(1.0)).is_ok());

        let stats = generator.stats();
        assert_eq!(stats.localization_messages, 1);
        assert_eq!(stats.chassis_messages, 1);
        assert_eq!(stats.frames_sealed, 1);
        assert_eq!(generator.batch().len(), 1);
    }

    #[test]
    fn test_stats_count_every_outcome() {
        let mut generator = FeatureGenerator::new(&config(2, 10, 1, 1), MemorySink::new()).unwrap();
        let mut source = VecSource::new(vec![
            pose_msg(0.0),
            RecordMessage::new(DEFAULT_LOCALIZATION_CHANNEL, "not json"),
            chassis_msg(1.0),
            RecordMessage::new("/apollo/planning", "{}"),
            pose_msg(1.0),
        ]);
        generator.process(&mut source).unwrap();

        let stats = generator.stats();
        assert_eq!(stats.localization_messages, 2);
        assert_eq!(stats.dropped_messages, 1);
        assert_eq!(stats.chassis_messages, 1);
        assert_eq!(stats.ignored_messages, 1);
        assert_eq!(stats.frames_sealed, 1);
    }
}
