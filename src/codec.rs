//! JSON payload encoding of the recorded sensor messages.

use serde::{Deserialize, Serialize};

use crate::types::{ChassisSample, PoseSample};

/// Localization message as recorded: the pose is nested under `pose`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LocalizationEstimate {
    pub pose: PoseSample,
}

pub fn decode_localization(payload: &[u8]) -> serde_json::Result<PoseSample> {
    let estimate: LocalizationEstimate = serde_json::from_slice(payload)?;
    Ok(estimate.pose)
}

pub fn decode_chassis(payload: &[u8]) -> serde_json::Result<ChassisSample> {
    serde_json::from_slice(payload)
}

pub fn encode_localization(pose: &PoseSample) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(&LocalizationEstimate { pose: pose.clone() })
}

pub fn encode_chassis(chassis: &ChassisSample) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(chassis)
}
