pub mod accumulator;
pub mod codec;
pub mod config;
pub mod demux;
pub mod error;
pub mod generator;
pub mod label;
pub mod record;
pub mod rotation;
pub mod storage;
pub mod types;
pub mod window;

pub use config::{FeatureGeneratorConfig, OutputEncoding};
pub use error::{FeatureGeneratorError, Result};
pub use generator::{FeatureGenerator, GeneratorStats};
pub use record::{MessageSource, RecordMessage, RecordReader, RecordWriter};
pub use storage::{load_shard, FileShardWriter, ShardSink};
