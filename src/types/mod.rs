pub mod frame;

pub use frame::*;

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3D {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Point3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Magnitude of the (x, y) component, z is ignored
    pub fn planar_norm(&self) -> f64 {
        Vector2::new(self.x, self.y).norm()
    }
}

/// One decoded localization pose
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseSample {
    #[serde(default)]
    pub position: Point3D,
    #[serde(default)]
    pub heading: f64,
    #[serde(default)]
    pub linear_velocity: Point3D,
    #[serde(default)]
    pub linear_acceleration: Point3D,
    #[serde(default)]
    pub angular_velocity: Point3D,
}

impl PoseSample {
    pub fn speed(&self) -> f64 {
        self.linear_velocity.planar_norm()
    }

    pub fn acceleration(&self) -> f64 {
        self.linear_acceleration.planar_norm()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GearPosition {
    #[default]
    GearNeutral,
    GearDrive,
    GearReverse,
    GearParking,
    GearLow,
    GearInvalid,
    GearNone,
}

/// One decoded chassis telemetry message
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChassisSample {
    #[serde(default)]
    pub speed_mps: f64,
    #[serde(default)]
    pub throttle_percentage: f64,
    #[serde(default)]
    pub brake_percentage: f64,
    #[serde(default)]
    pub steering_percentage: f64,
    #[serde(default)]
    pub gear_location: GearPosition,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pose_magnitudes_ignore_z() {
        let pose = PoseSample {
            linear_velocity: Point3D::new(3.0, 4.0, 100.0),
            linear_acceleration: Point3D::new(0.6, 0.8, -9.8),
            ..Default::default()
        };
        assert_eq!(pose.speed(), 5.0);
        assert!((pose.acceleration() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_gear_wire_names() {
        let json = serde_json::to_string(&GearPosition::GearDrive).unwrap();
        assert_eq!(json, "\"GEAR_DRIVE\"");
        let gear: GearPosition = serde_json::from_str("\"GEAR_PARKING\"").unwrap();
        assert_eq!(gear, GearPosition::GearParking);
    }
}
