use std::mem;

use crate::label::generate_trajectory_label;
use crate::types::{
    ChassisFeature, ChassisSample, LearningDataFrame, LocalizationFeature, PoseSample,
};
use crate::window::SlidingWindow;

/// Builds the current frame from incoming samples and seals it once the pose
/// window is full.
///
/// There is always exactly one frame under construction. Sealing swaps it out
/// for a fresh frame in a single step, so handlers never see a missing frame.
pub struct FrameAccumulator {
    current: LearningDataFrame,
    window: SlidingWindow,
    window_step: usize,
    trajectory_stride: usize,
    frames_sealed: u64,
    poses_accepted: u64,
    chassis_accepted: u64,
}

impl FrameAccumulator {
    pub fn new(label_sample_interval: usize, window_step: usize, trajectory_stride: usize) -> Self {
        FrameAccumulator {
            current: LearningDataFrame::default(),
            window: SlidingWindow::new(label_sample_interval),
            window_step,
            trajectory_stride,
            frames_sealed: 0,
            poses_accepted: 0,
            chassis_accepted: 0,
        }
    }

    /// Write the pose into the current frame and the label window.
    ///
    /// Returns the sealed frame when the window fills up; the window is slid
    /// forward by `window_step` and a new empty frame becomes current.
    pub fn on_localization(&mut self, pose: &PoseSample) -> Option<LearningDataFrame> {
        self.current.localization_feature = Some(LocalizationFeature::from(pose));
        self.poses_accepted += 1;

        if !self.window.push(pose.clone()) {
            return None;
        }

        let label = generate_trajectory_label(self.window.iter(), self.trajectory_stride);
        self.current.label_trajectory_points.extend(label);
        let sealed = mem::take(&mut self.current);

        self.window.evict(self.window_step);
        self.frames_sealed += 1;
        log::debug!(
            "Sealed frame {} with {} label points, {} poses kept in window",
            self.frames_sealed,
            sealed.label_trajectory_points.len(),
            self.window.len()
        );

        Some(sealed)
    }

    pub fn on_chassis(&mut self, chassis: &ChassisSample) {
        self.current.chassis_feature = Some(ChassisFeature::from(chassis));
        self.chassis_accepted += 1;
    }

    pub fn current(&self) -> &LearningDataFrame {
        &self.current
    }

    /// Hand out the frame under construction (terminal flush), leaving a fresh one
    pub fn take_current(&mut self) -> LearningDataFrame {
        mem::take(&mut self.current)
    }

    pub fn window(&self) -> &SlidingWindow {
        &self.window
    }

    pub fn frames_sealed(&self) -> u64 {
        self.frames_sealed
    }

    pub fn poses_accepted(&self) -> u64 {
        self.poses_accepted
    }

    pub fn chassis_accepted(&self) -> u64 {
        self.chassis_accepted
    }
}
