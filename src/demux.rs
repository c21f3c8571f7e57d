//! Routes raw record messages to the frame handlers by channel.

use serde::{Deserialize, Serialize};

use crate::codec::{decode_chassis, decode_localization};
use crate::config::FeatureGeneratorConfig;
use crate::error::{FeatureGeneratorError, Result};
use crate::record::RecordMessage;
use crate::types::{ChassisSample, PoseSample};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelKind {
    Localization,
    Chassis,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DecodedMessage {
    Localization(PoseSample),
    Chassis(ChassisSample),
}

/// What happened to one message
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    Localization,
    Chassis,
    /// Channel not consumed by the generator
    Ignored,
    /// Payload failed to decode
    Dropped,
}

/// Receiver of decoded messages
pub trait MessageHandler {
    fn on_localization(&mut self, pose: &PoseSample) -> Result<()>;
    fn on_chassis(&mut self, chassis: &ChassisSample) -> Result<()>;
}

/// Messages routed per outcome
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchCounts {
    pub localization: u64,
    pub chassis: u64,
    pub ignored: u64,
    pub dropped: u64,
}

pub struct Demultiplexer {
    localization_channel: String,
    chassis_channel: String,
    counts: DispatchCounts,
}

impl Demultiplexer {
    pub fn new(localization_channel: impl Into<String>, chassis_channel: impl Into<String>) -> Self {
        Self {
            localization_channel: localization_channel.into(),
            chassis_channel: chassis_channel.into(),
            counts: DispatchCounts::default(),
        }
    }

    pub fn from_config(config: &FeatureGeneratorConfig) -> Self {
        Self::new(
            config.localization_channel.clone(),
            config.chassis_channel.clone(),
        )
    }

    pub fn classify(&self, channel_name: &str) -> Option<ChannelKind> {
        if channel_name == self.localization_channel {
            Some(ChannelKind::Localization)
        } else if channel_name == self.chassis_channel {
            Some(ChannelKind::Chassis)
        } else {
            None
        }
    }

    /// Decode a message on a known channel. `Ok(None)` for unknown channels.
    pub fn decode(&self, message: &RecordMessage) -> Result<Option<DecodedMessage>> {
        let decoded = match self.classify(&message.channel_name) {
            Some(ChannelKind::Localization) => {
                decode_localization(&message.content).map(DecodedMessage::Localization)
            }
            Some(ChannelKind::Chassis) => {
                decode_chassis(&message.content).map(DecodedMessage::Chassis)
            }
            None => return Ok(None),
        };

        decoded
            .map(Some)
            .map_err(|e| FeatureGeneratorError::Decode {
                channel: message.channel_name.clone(),
                reason: e.to_string(),
            })
    }

    /// Decode `message` and invoke exactly one handler for it.
    ///
    /// Malformed payloads are logged and dropped; only handler errors propagate.
    /// Counts are taken when a message is routed, so a message the handler
    /// rejects is still counted here.
    pub fn dispatch<H: MessageHandler + ?Sized>(
        &mut self,
        message: &RecordMessage,
        handler: &mut H,
    ) -> Result<Dispatch> {
        match self.decode(message) {
            Ok(Some(DecodedMessage::Localization(pose))) => {
                self.counts.localization += 1;
                handler.on_localization(&pose)?;
                Ok(Dispatch::Localization)
            }
            Ok(Some(DecodedMessage::Chassis(chassis))) => {
                self.counts.chassis += 1;
                handler.on_chassis(&chassis)?;
                Ok(Dispatch::Chassis)
            }
            Ok(None) => {
                self.counts.ignored += 1;
                Ok(Dispatch::Ignored)
            }
            Err(e) if e.is_recoverable() => {
                self.counts.dropped += 1;
                log::warn!("Dropping message: {}", e);
                Ok(Dispatch::Dropped)
            }
            Err(e) => Err(e),
        }
    }

    pub fn counts(&self) -> &DispatchCounts {
        &self.counts
    }
}
