use tracing::debug;

use crate::error::{WheelError, WheelResult};
use crate::spin::{angle_per_segment, segment_start_angle, FrameSchedule};
use crate::types::{AnimationFrame, SpinAnimation, WheelFrame, WheelSegment};

/// Draws one wheel state. Implementations must follow the layout convention
/// in [`crate::spin`] and keep the pointer fixed regardless of `rotation`.
pub trait FrameRenderer {
    type Frame;

    fn render_frame(
        &mut self,
        labels: &[String],
        highlight_slot: Option<usize>,
        rotation: f64,
    ) -> WheelResult<Self::Frame>;
}

/// Turns ordered `(frame, delay_ms)` pairs into one playable artifact.
pub trait AnimationAssembler<F> {
    type Output;

    fn assemble(&mut self, frames: Vec<(F, u32)>) -> WheelResult<Self::Output>;
}

/// Renderer that emits a serializable description of the wheel, which the
/// browser overlay draws.
#[derive(Debug, Clone, Copy)]
pub struct WheelSnapshotRenderer {
    pointer_angle: f64,
}

impl WheelSnapshotRenderer {
    pub fn new(pointer_angle: f64) -> Self {
        WheelSnapshotRenderer { pointer_angle }
    }
}

impl FrameRenderer for WheelSnapshotRenderer {
    type Frame = WheelFrame;

    fn render_frame(
        &mut self,
        labels: &[String],
        highlight_slot: Option<usize>,
        rotation: f64,
    ) -> WheelResult<WheelFrame> {
        if labels.is_empty() {
            return Err(WheelError::Render("no labels to draw".to_string()));
        }
        if let Some(slot) = highlight_slot {
            if slot >= labels.len() {
                return Err(WheelError::invalid(format!(
                    "highlight slot {slot} out of range for {} segments",
                    labels.len()
                )));
            }
        }
        let sweep = angle_per_segment(labels.len());
        let segments = labels
            .iter()
            .enumerate()
            .map(|(slot, label)| WheelSegment {
                label: label.clone(),
                start_angle: segment_start_angle(labels.len(), slot) + rotation,
                sweep,
            })
            .collect();
        Ok(WheelFrame {
            segments,
            rotation,
            pointer_angle: self.pointer_angle,
            highlight_slot,
        })
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SpinAnimationAssembler;

impl AnimationAssembler<WheelFrame> for SpinAnimationAssembler {
    type Output = SpinAnimation;

    fn assemble(&mut self, frames: Vec<(WheelFrame, u32)>) -> WheelResult<SpinAnimation> {
        let total_duration_ms = frames.iter().map(|(_, delay)| *delay as u64).sum();
        let frames = frames
            .into_iter()
            .map(|(frame, delay_ms)| AnimationFrame { frame, delay_ms })
            .collect();
        Ok(SpinAnimation {
            frames,
            total_duration_ms,
        })
    }
}

/// Render every step of `schedule` and hand the frames to `assembler`.
/// Highlighted steps mark `highlight_slot`; the others draw no highlight.
pub fn animate_spin<R, A>(
    renderer: &mut R,
    assembler: &mut A,
    labels: &[String],
    highlight_slot: usize,
    schedule: FrameSchedule,
) -> WheelResult<A::Output>
where
    R: FrameRenderer,
    A: AnimationAssembler<R::Frame>,
{
    let mut frames = Vec::with_capacity(schedule.len());
    for step in schedule {
        let highlight = step.highlighted.then_some(highlight_slot);
        let frame = renderer.render_frame(labels, highlight, step.rotation_angle)?;
        frames.push((frame, step.delay_ms));
    }
    debug!(frames = frames.len(), segments = labels.len(), "spin frames rendered");
    assembler.assemble(frames)
}
