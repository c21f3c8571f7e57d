//! Trajectory label derivation.

use crate::types::{PoseSample, TrajectoryPoint};

/// Turn every `stride`-th pose (indices 0, stride, 2*stride, ...) into a label point.
///
/// Pure and order preserving: the same window always yields the same label,
/// with `ceil(len / stride)` points.
pub fn generate_trajectory_label<'a, I>(window: I, stride: usize) -> Vec<TrajectoryPoint>
where
    I: IntoIterator<Item = &'a PoseSample>,
{
    window
        .into_iter()
        .step_by(stride.max(1))
        .map(TrajectoryPoint::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point3D;
    use approx::assert_relative_eq;

    fn window(len: usize) -> Vec<PoseSample> {
        (0..len)
            .map(|i| PoseSample {
                position: Point3D::new(i as f64, 2.0 * i as f64, 0.0),
                heading: 0.1 * i as f64,
                linear_velocity: Point3D::new(1.0, 1.0, 0.0),
                linear_acceleration: Point3D::new(0.0, 0.5, 0.0),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_selects_every_nth_from_zero() {
        let samples = window(4);
        let label = generate_trajectory_label(&samples, 2);

        assert_eq!(label.len(), 2);
        assert_eq!(label[0].path_point.x, 0.0);
        assert_eq!(label[1].path_point.x, 2.0);
        assert_relative_eq!(label[1].path_point.theta, 0.2);
    }

    #[test]
    fn test_point_count_is_ceil() {
        for (len, stride) in [(100, 10), (101, 10), (7, 3), (1, 5), (5, 1)] {
            let label = generate_trajectory_label(&window(len), stride);
            assert_eq!(label.len(), (len + stride - 1) / stride, "len={len} stride={stride}");
        }
    }

    #[test]
    fn test_magnitudes() {
        let label = generate_trajectory_label(&window(1), 1);
        assert_relative_eq!(label[0].v, std::f64::consts::SQRT_2);
        assert_relative_eq!(label[0].a, 0.5);
    }

    #[test]
    fn test_deterministic() {
        let samples = window(37);
        assert_eq!(
            generate_trajectory_label(&samples, 4),
            generate_trajectory_label(&samples, 4)
        );
    }

    #[test]
    fn test_empty_window() {
        let samples: Vec<PoseSample> = Vec::new();
        assert!(generate_trajectory_label(&samples, 3).is_empty());
    }
}
