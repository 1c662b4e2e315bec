//! Wheel geometry and spin timing.
//!
//! Layout convention shared with every renderer: with zero rotation, segment 0
//! starts at `-π/2` (the top of the wheel) and segments proceed clockwise, each
//! spanning `2π / S`. Rotating the wheel by `θ` adds `θ` to every segment angle;
//! the pointer never moves.

use std::f64::consts::{FRAC_PI_2, TAU};

use crate::error::{WheelError, WheelResult};
use crate::types::{FrameStep, SpinPlan, SpinTiming};

pub fn angle_per_segment(segments: usize) -> f64 {
    TAU / segments as f64
}

/// Start angle of `slot` before any rotation is applied.
pub fn segment_start_angle(segments: usize, slot: usize) -> f64 {
    slot as f64 * angle_per_segment(segments) - FRAC_PI_2
}

/// Midpoint angle of `slot` before any rotation is applied.
pub fn segment_mid_angle(segments: usize, slot: usize) -> f64 {
    (slot as f64 + 0.5) * angle_per_segment(segments) - FRAC_PI_2
}

/// Maps any angle into `[0, 2π)`.
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Which segment sits under the pointer once the wheel is turned by `rotation`.
pub fn segment_under_pointer(segments: usize, rotation: f64, pointer_angle: f64) -> WheelResult<usize> {
    if segments == 0 {
        return Err(WheelError::invalid("wheel needs at least one segment"));
    }
    let offset = normalize_angle(pointer_angle - rotation + FRAC_PI_2);
    let slot = (offset / angle_per_segment(segments)).floor() as usize;
    Ok(slot.min(segments - 1))
}

/// Final rotation that leaves the midpoint of `slot` under the pointer after
/// `whole_rotations` full turns.
pub fn solve_spin(
    segments: usize,
    slot: usize,
    pointer_angle: f64,
    whole_rotations: u32,
) -> WheelResult<SpinPlan> {
    if segments == 0 {
        return Err(WheelError::invalid("wheel needs at least one segment"));
    }
    if slot >= segments {
        return Err(WheelError::invalid(format!(
            "slot {slot} out of range for {segments} segments"
        )));
    }
    if !pointer_angle.is_finite() {
        return Err(WheelError::invalid("pointer angle must be finite"));
    }
    let winner_slot_angle = segment_mid_angle(segments, slot);
    let final_rotation_radians = whole_rotations as f64 * TAU + (pointer_angle - winner_slot_angle);
    Ok(SpinPlan {
        total_whole_rotations: whole_rotations,
        pointer_angle,
        winner_slot_angle,
        final_rotation_radians,
    })
}

/// Cubic ease-out: quick start, slow landing.
pub fn ease_out_cubic(progress: f64) -> f64 {
    let p = progress.clamp(0.0, 1.0);
    1.0 - (1.0 - p).powi(3)
}

/// Per-frame rotation and delay for one spin. Each call to [`frame_schedule`]
/// yields a fresh iterator; once drained it stays empty.
#[derive(Debug, Clone)]
pub struct FrameSchedule {
    final_rotation: f64,
    timing: SpinTiming,
    next: usize,
}

pub fn frame_schedule(final_rotation: f64, timing: SpinTiming) -> WheelResult<FrameSchedule> {
    if timing.frame_count < 2 {
        return Err(WheelError::invalid(format!(
            "spin needs at least 2 frames, got {}",
            timing.frame_count
        )));
    }
    if !final_rotation.is_finite() {
        return Err(WheelError::invalid("final rotation must be finite"));
    }
    Ok(FrameSchedule {
        final_rotation,
        timing,
        next: 0,
    })
}

impl FrameSchedule {
    pub fn frame_count(&self) -> usize {
        self.timing.frame_count
    }

    fn tail_len(&self) -> usize {
        self.timing.tail_frames.min(self.timing.frame_count)
    }

    pub fn rotation_at(&self, frame: usize) -> f64 {
        let last = self.timing.frame_count - 1;
        if frame >= last {
            return self.final_rotation;
        }
        let progress = frame as f64 / last as f64;
        ease_out_cubic(progress) * self.final_rotation
    }

    pub fn delay_at(&self, frame: usize) -> u32 {
        let base = self.timing.base_delay_ms;
        let tail_len = self.tail_len();
        let tail_start = self.timing.frame_count - tail_len;
        if tail_len == 0 || frame < tail_start {
            return base;
        }
        let peak = self.timing.tail_max_delay_ms.max(base);
        let step = (frame - tail_start + 1) as u64;
        let extra = (peak - base) as u64 * step / tail_len as u64;
        base + extra as u32
    }

    pub fn highlighted_at(&self, frame: usize) -> bool {
        let highlight = self.timing.highlight_frames.min(self.timing.frame_count);
        frame >= self.timing.frame_count - highlight
    }

    pub fn step_at(&self, frame: usize) -> FrameStep {
        FrameStep {
            rotation_angle: self.rotation_at(frame),
            delay_ms: self.delay_at(frame),
            highlighted: self.highlighted_at(frame),
        }
    }
}

impl Iterator for FrameSchedule {
    type Item = FrameStep;

    fn next(&mut self) -> Option<FrameStep> {
        if self.next >= self.timing.frame_count {
            return None;
        }
        let step = self.step_at(self.next);
        self.next += 1;
        Some(step)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.timing.frame_count.saturating_sub(self.next);
        (left, Some(left))
    }
}

impl ExactSizeIterator for FrameSchedule {}
