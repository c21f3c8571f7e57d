//! Training frame types written to the output dataset.

use serde::{Deserialize, Serialize};

use super::{ChassisSample, GearPosition, Point3D, PoseSample};

/// Snapshot of the most recent localization pose
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalizationFeature {
    pub position: Point3D,
    pub heading: f64,
    pub linear_velocity: Point3D,
    pub linear_acceleration: Point3D,
    pub angular_velocity: Point3D,
}

impl From<&PoseSample> for LocalizationFeature {
    fn from(pose: &PoseSample) -> Self {
        LocalizationFeature {
            position: pose.position,
            heading: pose.heading,
            linear_velocity: pose.linear_velocity,
            linear_acceleration: pose.linear_acceleration,
            angular_velocity: pose.angular_velocity,
        }
    }
}

/// Snapshot of the most recent chassis message
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChassisFeature {
    pub speed_mps: f64,
    pub throttle_percentage: f64,
    pub brake_percentage: f64,
    pub steering_percentage: f64,
    pub gear_location: GearPosition,
}

impl From<&ChassisSample> for ChassisFeature {
    fn from(chassis: &ChassisSample) -> Self {
        ChassisFeature {
            speed_mps: chassis.speed_mps,
            throttle_percentage: chassis.throttle_percentage,
            brake_percentage: chassis.brake_percentage,
            steering_percentage: chassis.steering_percentage,
            gear_location: chassis.gear_location,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub theta: f64,
}

/// One point of a trajectory label
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub path_point: PathPoint,
    /// Planar speed magnitude (m/s)
    pub v: f64,
    /// Planar acceleration magnitude (m/s^2)
    pub a: f64,
}

impl From<&PoseSample> for TrajectoryPoint {
    fn from(pose: &PoseSample) -> Self {
        TrajectoryPoint {
            path_point: PathPoint {
                x: pose.position.x,
                y: pose.position.y,
                z: pose.position.z,
                theta: pose.heading,
            },
            v: pose.speed(),
            a: pose.acceleration(),
        }
    }
}

/// One training example
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningDataFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localization_feature: Option<LocalizationFeature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chassis_feature: Option<ChassisFeature>,
    #[serde(default)]
    pub label_trajectory_points: Vec<TrajectoryPoint>,
}

impl LearningDataFrame {
    /// True when nothing has been written into the frame yet
    pub fn is_empty(&self) -> bool {
        self.localization_feature.is_none()
            && self.chassis_feature.is_none()
            && self.label_trajectory_points.is_empty()
    }
}

/// Ordered batch of sealed frames, the unit written to one shard
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningData {
    pub learning_data: Vec<LearningDataFrame>,
}

impl LearningData {
    pub fn len(&self) -> usize {
        self.learning_data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.learning_data.is_empty()
    }

    pub fn push(&mut self, frame: LearningDataFrame) {
        self.learning_data.push(frame);
    }

    pub fn clear(&mut self) {
        self.learning_data.clear();
    }

    pub fn frames(&self) -> &[LearningDataFrame] {
        &self.learning_data
    }
}
