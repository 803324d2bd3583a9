// One frame as data. `Renderer::render_frame` walks `FRAME_PLAN` step by step.

use crate::binding::{BindStep, Target};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStep {
    /// Back buffer plus whatever `per_frame_clears` names.
    Clear,
    Bind(BindStep),
    DrawMask,
    /// Acquire, crop and copy into `desktop`.
    CaptureDesktop,
    /// Parameter write, then `BLUR_PLAN`. Nothing is bound when the write fails.
    Blur,
    /// Samples the displayed target across the back buffer.
    DrawQuad,
    Present,
}

pub const FRAME_PLAN: [FrameStep; 9] = [
    FrameStep::Clear,
    FrameStep::Bind(BindStep::RenderTarget(Target::Mask)),
    FrameStep::DrawMask,
    FrameStep::Bind(BindStep::RenderTarget(Target::BackBuffer)),
    FrameStep::CaptureDesktop,
    FrameStep::Blur,
    FrameStep::Bind(BindStep::RenderTarget(Target::BackBuffer)),
    FrameStep::DrawQuad,
    FrameStep::Present,
];

/// Offscreen targets cleared at the top of every frame. Desktop and blur
/// output otherwise keep the last good frame.
pub fn per_frame_clears(clear_all: bool) -> &'static [Target] {
    if clear_all {
        &[Target::Desktop, Target::Mask, Target::BlurOutput]
    } else {
        &[Target::Mask]
    }
}

pub fn displayed_target(show_captured_desktop: bool) -> Target {
    if show_captured_desktop {
        Target::Desktop
    } else {
        Target::BlurOutput
    }
}

/// Binding transitions issued while walking `plan`. `blur` is `None` when the
/// parameter write failed and the blur was skipped.
pub fn binding_steps(plan: &[FrameStep], blur: Option<&[BindStep]>, displayed: Target) -> Vec<BindStep> {
    let mut steps = Vec::new();
    for step in plan {
        match *step {
            FrameStep::Bind(bind) => steps.push(bind),
            FrameStep::Blur => steps.extend_from_slice(blur.unwrap_or_default()),
            FrameStep::DrawQuad => steps.push(BindStep::PixelResource(displayed)),
            FrameStep::Clear | FrameStep::DrawMask | FrameStep::CaptureDesktop | FrameStep::Present => {}
        }
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{BindingLedger, BLUR_PLAN};

    fn position(step: FrameStep) -> usize {
        FRAME_PLAN.iter().position(|s| *s == step).unwrap()
    }

    #[test]
    fn frame_runs_mask_capture_blur_present_in_order() {
        let order = [
            FrameStep::Clear,
            FrameStep::DrawMask,
            FrameStep::CaptureDesktop,
            FrameStep::Blur,
            FrameStep::DrawQuad,
            FrameStep::Present,
        ]
        .map(position);
        assert!(order.windows(2).all(|w| w[0] < w[1]), "{:?}", order);
        assert_eq!(FRAME_PLAN.last(), Some(&FrameStep::Present));
    }

    #[test]
    fn mask_is_the_render_target_only_while_it_is_drawn() {
        let mask = position(FrameStep::DrawMask);
        assert_eq!(FRAME_PLAN[mask - 1], FrameStep::Bind(BindStep::RenderTarget(Target::Mask)));
        assert_eq!(FRAME_PLAN[mask + 1], FrameStep::Bind(BindStep::RenderTarget(Target::BackBuffer)));

        let quad = position(FrameStep::DrawQuad);
        assert_eq!(FRAME_PLAN[quad - 1], FrameStep::Bind(BindStep::RenderTarget(Target::BackBuffer)));
    }

    #[test]
    fn failed_parameter_write_skips_dispatch_but_still_presents() {
        let mut ledger = BindingLedger::default();
        for step in binding_steps(&FRAME_PLAN, Some(&BLUR_PLAN), Target::BlurOutput) {
            ledger.apply(step).unwrap();
        }

        let skipped = binding_steps(&FRAME_PLAN, None, Target::BlurOutput);
        assert!(!skipped.contains(&BindStep::Dispatch));
        assert!(!skipped.contains(&BindStep::ComputeOutput));
        assert_eq!(skipped.last(), Some(&BindStep::PixelResource(Target::BlurOutput)));
        for step in skipped {
            ledger.apply(step).unwrap();
        }
        assert_eq!(ledger.dispatches(), 1);
        assert_eq!(ledger.render_target(), Some(Target::BackBuffer));

        // Next successful frame recovers without a hazard.
        for step in binding_steps(&FRAME_PLAN, Some(&BLUR_PLAN), Target::BlurOutput) {
            ledger.apply(step).unwrap();
        }
        assert_eq!(ledger.dispatches(), 2);
    }

    #[test]
    fn desktop_and_blur_output_survive_frames_by_default() {
        assert_eq!(per_frame_clears(false), &[Target::Mask]);
        let all = per_frame_clears(true);
        for target in [Target::Desktop, Target::Mask, Target::BlurOutput] {
            assert!(all.contains(&target));
        }
        assert!(!all.contains(&Target::BackBuffer));
    }

    #[test]
    fn debug_view_presents_captured_desktop_without_hazards() {
        assert_eq!(displayed_target(false), Target::BlurOutput);
        let displayed = displayed_target(true);
        assert_eq!(displayed, Target::Desktop);

        let mut ledger = BindingLedger::default();
        for _ in 0..2 {
            for step in binding_steps(&FRAME_PLAN, Some(&BLUR_PLAN), displayed) {
                ledger.apply(step).unwrap();
            }
        }
        assert_eq!(ledger.dispatches(), 2);
    }
}
