// Binding discipline between the graphics and compute stages.
//
// A texture may be bound as a render target / UAV or as a shader resource,
// never both at once. When that rule is broken the runtime silently unbinds
// one side, so every transition is spelled out as a `BindStep` and checked
// against a `BindingLedger` before it reaches the immediate context.

use thiserror::Error;

pub const PIXEL_SRV_SLOTS: usize = 3;
pub const COMPUTE_SRV_SLOTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    BackBuffer,
    Desktop,
    Mask,
    BlurOutput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    RenderTarget,
    PixelResource,
    ComputeResource,
    ComputeOutput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindStep {
    /// Sole render target at slot 0.
    RenderTarget(Target),
    UnbindRenderTargets,
    /// Pixel shader t0.
    PixelResource(Target),
    ClearPixelResources,
    /// Compute program and its parameter buffer at b0.
    ComputeProgram,
    /// t0 = desktop, t1 = mask.
    ComputeResources,
    /// u0 = blur output.
    ComputeOutput,
    Dispatch,
    ClearComputeOutputs,
    ClearComputeResources,
    UnbindComputeProgram,
}

/// Transitions around one masked blur dispatch, in submission order.
pub const BLUR_PLAN: [BindStep; 9] = [
    BindStep::ClearPixelResources,
    BindStep::UnbindRenderTargets,
    BindStep::ComputeProgram,
    BindStep::ComputeResources,
    BindStep::ComputeOutput,
    BindStep::Dispatch,
    BindStep::ClearComputeOutputs,
    BindStep::ClearComputeResources,
    BindStep::UnbindComputeProgram,
];

pub const COMPUTE_INPUTS: [Target; 2] = [Target::Desktop, Target::Mask];
pub const COMPUTE_OUTPUT: Target = Target::BlurOutput;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingHazard {
    #[error("{target:?} requested as {requested:?} while bound as {bound:?}")]
    Conflict {
        target: Target,
        bound: Role,
        requested: Role,
    },

    #[error("{0:?} has no shader-resource view")]
    NoShaderView(Target),

    #[error("dispatch issued while {0:?} is still bound as a render target")]
    RenderTargetBound(Target),

    #[error("dispatch issued without a compute program")]
    MissingProgram,
}

/// Mirror of what the immediate context currently has bound.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingLedger {
    render_target: Option<Target>,
    pixel_resources: [Option<Target>; PIXEL_SRV_SLOTS],
    compute_resources: [Option<Target>; COMPUTE_SRV_SLOTS],
    compute_output: Option<Target>,
    compute_program: bool,
    dispatches: u64,
}

impl BindingLedger {
    pub fn render_target(&self) -> Option<Target> {
        self.render_target
    }

    pub fn dispatches(&self) -> u64 {
        self.dispatches
    }

    /// True when no compute SRV, UAV or program is bound.
    pub fn compute_stage_clear(&self) -> bool {
        self.compute_resources.iter().all(Option::is_none)
            && self.compute_output.is_none()
            && !self.compute_program
    }

    /// Every role `target` currently holds, in a fixed order.
    fn roles_of(&self, target: Target) -> impl Iterator<Item = Role> + '_ {
        let rtv = (self.render_target == Some(target)).then_some(Role::RenderTarget);
        let pixel = self.pixel_resources.contains(&Some(target)).then_some(Role::PixelResource);
        let compute = self.compute_resources.contains(&Some(target)).then_some(Role::ComputeResource);
        let uav = (self.compute_output == Some(target)).then_some(Role::ComputeOutput);
        [rtv, pixel, compute, uav].into_iter().flatten()
    }

    fn check(&self, target: Target, requested: Role) -> Result<(), BindingHazard> {
        // Two read bindings of the same texture are legal.
        let read = |role: Role| matches!(role, Role::PixelResource | Role::ComputeResource);
        for bound in self.roles_of(target) {
            if bound == requested || (read(bound) && read(requested)) {
                continue;
            }
            return Err(BindingHazard::Conflict { target, bound, requested });
        }
        Ok(())
    }

    /// Applies `step` to the model. On a hazard the model is left unchanged.
    pub fn apply(&mut self, step: BindStep) -> Result<(), BindingHazard> {
        match step {
            BindStep::RenderTarget(target) => {
                self.check(target, Role::RenderTarget)?;
                self.render_target = Some(target);
            }
            BindStep::UnbindRenderTargets => self.render_target = None,
            BindStep::PixelResource(target) => {
                if target == Target::BackBuffer {
                    return Err(BindingHazard::NoShaderView(target));
                }
                self.check(target, Role::PixelResource)?;
                self.pixel_resources[0] = Some(target);
            }
            BindStep::ClearPixelResources => self.pixel_resources = [None; PIXEL_SRV_SLOTS],
            BindStep::ComputeProgram => self.compute_program = true,
            BindStep::ComputeResources => {
                for target in COMPUTE_INPUTS {
                    self.check(target, Role::ComputeResource)?;
                }
                self.compute_resources[0] = Some(COMPUTE_INPUTS[0]);
                self.compute_resources[1] = Some(COMPUTE_INPUTS[1]);
            }
            BindStep::ComputeOutput => {
                self.check(COMPUTE_OUTPUT, Role::ComputeOutput)?;
                self.compute_output = Some(COMPUTE_OUTPUT);
            }
            BindStep::Dispatch => {
                if let Some(target) = self.render_target {
                    return Err(BindingHazard::RenderTargetBound(target));
                }
                if !self.compute_program {
                    return Err(BindingHazard::MissingProgram);
                }
                self.dispatches += 1;
            }
            BindStep::ClearComputeOutputs => self.compute_output = None,
            BindStep::ClearComputeResources => self.compute_resources = [None; COMPUTE_SRV_SLOTS],
            BindStep::UnbindComputeProgram => self.compute_program = false,
        }
        Ok(())
    }

    /// Applies `step`, logging any hazard instead of returning it.
    pub fn record(&mut self, step: BindStep) {
        if let Err(hazard) = self.apply(step) {
            crate::log_warn!("Binding hazard at {:?}: {}", step, hazard);
        }
    }

    /// The context was reset (ClearState); nothing is bound any more.
    pub fn reset(&mut self) {
        let dispatches = self.dispatches;
        *self = Self { dispatches, ..Self::default() };
    }
}

#[cfg(windows)]
pub use gpu::Binder;

#[cfg(windows)]
mod gpu {
    use super::*;
    use crate::targets::OffscreenTargets;
    use windows::Win32::Graphics::Direct3D11::*;

    /// Executes binding steps on the immediate context, keeping the ledger in step.
    pub struct Binder<'a> {
        context: &'a ID3D11DeviceContext,
        targets: &'a OffscreenTargets,
        back_buffer: &'a ID3D11RenderTargetView,
        ledger: &'a mut BindingLedger,
    }

    impl<'a> Binder<'a> {
        pub fn new(
            context: &'a ID3D11DeviceContext,
            targets: &'a OffscreenTargets,
            back_buffer: &'a ID3D11RenderTargetView,
            ledger: &'a mut BindingLedger,
        ) -> Self {
            Self { context, targets, back_buffer, ledger }
        }

        pub fn context(&self) -> &ID3D11DeviceContext {
            self.context
        }

        pub fn targets(&self) -> &OffscreenTargets {
            self.targets
        }

        pub fn record(&mut self, step: BindStep) {
            self.ledger.record(step);
        }

        pub unsafe fn apply(&mut self, step: BindStep) {
            self.record(step);
            self.issue(step);
        }

        unsafe fn issue(&self, step: BindStep) {
            let context = self.context;
            match step {
                BindStep::RenderTarget(target) => {
                    let rtv = match self.targets.get(target) {
                        Some(texture) => texture.rtv().clone(),
                        None => self.back_buffer.clone(),
                    };
                    context.OMSetRenderTargets(Some(&[Some(rtv)]), None);
                }
                BindStep::UnbindRenderTargets => context.OMSetRenderTargets(None, None),
                BindStep::PixelResource(target) => {
                    let srv = self.targets.get(target).map(|t| t.srv().clone());
                    context.PSSetShaderResources(0, Some(&[srv]));
                }
                BindStep::ClearPixelResources => {
                    let null_srvs: [Option<ID3D11ShaderResourceView>; PIXEL_SRV_SLOTS] = Default::default();
                    context.PSSetShaderResources(0, Some(&null_srvs));
                }
                BindStep::ComputeResources => {
                    let srvs = [
                        Some(self.targets.desktop().srv().clone()),
                        Some(self.targets.mask().srv().clone()),
                    ];
                    context.CSSetShaderResources(0, Some(&srvs));
                }
                BindStep::ComputeOutput => {
                    let uav = self.targets.blur_output().uav().cloned();
                    context.CSSetUnorderedAccessViews(0, 1, Some(&uav as *const _), None);
                }
                BindStep::ClearComputeOutputs => {
                    let null_uavs: [Option<ID3D11UnorderedAccessView>; 3] = Default::default();
                    context.CSSetUnorderedAccessViews(0, null_uavs.len() as u32, Some(null_uavs.as_ptr()), None);
                }
                BindStep::ClearComputeResources => {
                    let null_srvs: [Option<ID3D11ShaderResourceView>; COMPUTE_SRV_SLOTS] = Default::default();
                    context.CSSetShaderResources(0, Some(&null_srvs));
                }
                BindStep::UnbindComputeProgram => context.CSSetShader(None, None),
                // Issued by the blur engine, which owns the program and the grid.
                BindStep::ComputeProgram | BindStep::Dispatch => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{binding_steps, FRAME_PLAN};

    fn frame(blur: &[BindStep]) -> Vec<BindStep> {
        binding_steps(&FRAME_PLAN, Some(blur), Target::BlurOutput)
    }

    #[test]
    fn blur_plan_keeps_dispatch_free_of_hazards() {
        let mut ledger = BindingLedger::default();
        for _ in 0..3 {
            for step in frame(&BLUR_PLAN) {
                if step == BindStep::Dispatch {
                    assert_eq!(ledger.render_target(), None);
                    for target in COMPUTE_INPUTS {
                        assert!(ledger.roles_of(target).all(|r| matches!(r, Role::ComputeResource)));
                    }
                }
                ledger.apply(step).unwrap();
                if step == BindStep::ClearComputeResources {
                    assert!(ledger.compute_resources.iter().all(Option::is_none));
                    assert!(ledger.compute_output.is_none());
                }
            }
            assert!(ledger.compute_stage_clear());
        }
        assert_eq!(ledger.dispatches(), 3);
    }

    #[test]
    fn skipping_pixel_clear_conflicts_with_previous_present() {
        let plan: Vec<BindStep> = BLUR_PLAN
            .iter()
            .copied()
            .filter(|s| *s != BindStep::ClearPixelResources)
            .collect();
        let mut ledger = BindingLedger::default();
        for step in frame(&plan) {
            ledger.apply(step).unwrap();
        }

        let second = frame(&plan);
        let err = second
            .into_iter()
            .map(|step| ledger.apply(step))
            .find_map(Result::err)
            .unwrap();
        assert_eq!(
            err,
            BindingHazard::Conflict {
                target: Target::BlurOutput,
                bound: Role::PixelResource,
                requested: Role::ComputeOutput,
            }
        );
    }

    #[test]
    fn dispatch_with_render_target_bound_is_rejected() {
        let mut ledger = BindingLedger::default();
        ledger.apply(BindStep::RenderTarget(Target::BackBuffer)).unwrap();
        ledger.apply(BindStep::ComputeProgram).unwrap();
        assert_eq!(
            ledger.apply(BindStep::Dispatch),
            Err(BindingHazard::RenderTargetBound(Target::BackBuffer))
        );
    }

    #[test]
    fn mask_cannot_be_read_while_it_is_the_render_target() {
        let mut ledger = BindingLedger::default();
        ledger.apply(BindStep::RenderTarget(Target::Mask)).unwrap();
        assert_eq!(
            ledger.apply(BindStep::ComputeResources),
            Err(BindingHazard::Conflict {
                target: Target::Mask,
                bound: Role::RenderTarget,
                requested: Role::ComputeResource,
            })
        );
        assert!(ledger.compute_stage_clear());
    }

    #[test]
    fn back_buffer_is_never_a_shader_resource() {
        let mut ledger = BindingLedger::default();
        assert_eq!(
            ledger.apply(BindStep::PixelResource(Target::BackBuffer)),
            Err(BindingHazard::NoShaderView(Target::BackBuffer))
        );
    }

    #[test]
    fn reset_forgets_bindings_but_keeps_dispatch_count() {
        let mut ledger = BindingLedger::default();
        for step in BLUR_PLAN {
            ledger.apply(step).unwrap();
        }
        ledger.apply(BindStep::PixelResource(Target::BlurOutput)).unwrap();
        ledger.reset();
        assert_eq!(ledger.dispatches(), 1);
        assert!(ledger.apply(BindStep::ComputeOutput).is_ok());
    }
}
