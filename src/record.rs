//! Record files: an ordered stream of (channel, payload) messages.
//!
//! # File Format
//! One JSON object per line:
//!
//! ```text
//! {"channel_name":"/apollo/localization/pose","content":"{\"pose\":{...}}"}
//! {"channel_name":"/apollo/canbus/chassis","content":"{\"speed_mps\":4.2}"}
//! ```
//!
//! Files ending in `.gz` are gzip-compressed and decoded transparently.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::error::{FeatureGeneratorError, Result};

/// One raw message from a recorded session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordMessage {
    pub channel_name: String,
    pub content: Vec<u8>,
}

impl RecordMessage {
    pub fn new(channel_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            channel_name: channel_name.into(),
            content: content.into(),
        }
    }
}

/// Ordered producer of record messages. `Ok(None)` marks the end of the stream.
pub trait MessageSource {
    fn next_message(&mut self) -> Result<Option<RecordMessage>>;
}

#[derive(Serialize, Deserialize)]
struct RecordLine {
    channel_name: String,
    content: String,
}

fn is_gzip(path: &Path) -> bool {
    path.extension().map(|e| e == "gz").unwrap_or(false)
}

/// Reads a record file line by line
pub struct RecordReader {
    path: PathBuf,
    reader: Box<dyn BufRead>,
    line: String,
    line_number: u64,
    messages_read: u64,
}

impl RecordReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| {
            FeatureGeneratorError::Record(format!("Fail to open {}: {}", path.display(), e))
        })?;

        let reader: Box<dyn BufRead> = if is_gzip(&path) {
            Box::new(BufReader::new(GzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        Ok(Self {
            path,
            reader,
            line: String::new(),
            line_number: 0,
            messages_read: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn messages_read(&self) -> u64 {
        self.messages_read
    }
}

impl MessageSource for RecordReader {
    fn next_message(&mut self) -> Result<Option<RecordMessage>> {
        loop {
            self.line.clear();
            // Undecodable bytes or a broken gzip stream make the file unusable,
            // same as a line that is not a record
            let read = self.reader.read_line(&mut self.line).map_err(|e| {
                FeatureGeneratorError::Record(format!(
                    "{}:{}: {}",
                    self.path.display(),
                    self.line_number + 1,
                    e
                ))
            })?;
            if read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let record: RecordLine = serde_json::from_str(trimmed).map_err(|e| {
                FeatureGeneratorError::Record(format!(
                    "{}:{}: {}",
                    self.path.display(),
                    self.line_number,
                    e
                ))
            })?;

            self.messages_read += 1;
            return Ok(Some(RecordMessage {
                channel_name: record.channel_name,
                content: record.content.into_bytes(),
            }));
        }
    }
}

enum RecordOutput {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl RecordOutput {
    fn writer(&mut self) -> &mut dyn Write {
        match self {
            RecordOutput::Plain(w) => w,
            RecordOutput::Gzip(w) => w,
        }
    }
}

/// Writes messages in the record file format
pub struct RecordWriter {
    output: RecordOutput,
    messages_written: u64,
}

impl RecordWriter {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = BufWriter::new(File::create(path)?);
        let output = if is_gzip(path) {
            RecordOutput::Gzip(GzEncoder::new(file, Compression::default()))
        } else {
            RecordOutput::Plain(file)
        };
        Ok(Self {
            output,
            messages_written: 0,
        })
    }

    pub fn write_message(&mut self, message: &RecordMessage) -> Result<()> {
        let content = std::str::from_utf8(&message.content).map_err(|e| {
            FeatureGeneratorError::Record(format!(
                "payload on {} is not UTF-8: {}",
                message.channel_name, e
            ))
        })?;
        let line = RecordLine {
            channel_name: message.channel_name.clone(),
            content: content.to_string(),
        };
        let writer = self.output.writer();
        serde_json::to_writer(&mut *writer, &line)?;
        writer.write_all(b"\n")?;
        self.messages_written += 1;
        Ok(())
    }

    pub fn messages_written(&self) -> u64 {
        self.messages_written
    }

    /// Finish the gzip stream (if any) and flush to disk.
    pub fn finish(self) -> Result<u64> {
        let mut file = match self.output {
            RecordOutput::Plain(w) => w,
            RecordOutput::Gzip(w) => w.finish()?,
        };
        file.flush()?;
        Ok(self.messages_written)
    }
}

/// In-memory message source
#[derive(Default)]
pub struct VecSource {
    messages: VecDeque<RecordMessage>,
}

impl VecSource {
    pub fn new(messages: Vec<RecordMessage>) -> Self {
        Self {
            messages: messages.into(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.messages.len()
    }
}

impl MessageSource for VecSource {
    fn next_message(&mut self) -> Result<Option<RecordMessage>> {
        Ok(self.messages.pop_front())
    }
}
