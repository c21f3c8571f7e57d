use std::collections::VecDeque;

use crate::types::PoseSample;

/// Oldest-first buffer of poses not yet consumed into a label.
///
/// The window fills up to `capacity` samples, at which point the caller
/// derives a label from it and slides it forward with [`SlidingWindow::evict`].
/// Consecutive labels therefore overlap by `capacity - step` samples.
pub struct SlidingWindow {
    samples: VecDeque<PoseSample>,
    capacity: usize,
}

impl SlidingWindow {
    pub fn new(capacity: usize) -> Self {
        // Grows on demand; `capacity` comes from user config and may be huge
        SlidingWindow {
            samples: VecDeque::new(),
            capacity,
        }
    }

    /// Append a sample. Returns true once the window has reached capacity.
    pub fn push(&mut self, sample: PoseSample) -> bool {
        debug_assert!(
            self.samples.len() < self.capacity,
            "window must be slid before accepting more samples"
        );
        self.samples.push_back(sample);
        self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    /// Drop the `step` oldest samples, or everything if fewer remain.
    pub fn evict(&mut self, step: usize) {
        let count = step.min(self.samples.len());
        self.samples.drain(..count);
    }

    pub fn iter(&self) -> impl Iterator<Item = &PoseSample> + '_ {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point3D;

    fn pose(x: f64) -> PoseSample {
        PoseSample {
            position: Point3D::new(x, 0.0, 0.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_fills_to_capacity() {
        let mut window = SlidingWindow::new(3);
        assert!(!window.push(pose(0.0)));
        assert!(!window.push(pose(1.0)));
        assert!(window.push(pose(2.0)));
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn test_evict_keeps_tail() {
        let mut window = SlidingWindow::new(4);
        for i in 0..4 {
            window.push(pose(i as f64));
        }
        window.evict(1);

        let remaining: Vec<f64> = window.iter().map(|p| p.position.x).collect();
        assert_eq!(remaining, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_evict_more_than_len_clears() {
        let mut window = SlidingWindow::new(4);
        window.push(pose(0.0));
        window.push(pose(1.0));
        window.evict(10);
        assert!(window.is_empty());
    }

    #[test]
    fn test_huge_capacity_does_not_allocate_up_front() {
        let mut window = SlidingWindow::new(usize::MAX);
        assert!(!window.push(pose(0.0)));
        assert_eq!(window.capacity(), usize::MAX);
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_full_step_gives_disjoint_windows() {
        let mut window = SlidingWindow::new(2);
        window.push(pose(0.0));
        window.push(pose(1.0));
        window.evict(2);
        assert!(window.is_empty());
        assert!(!window.push(pose(2.0)));
    }
}
