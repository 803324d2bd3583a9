// Owns every GPU object and walks `FRAME_PLAN` once per frame.

use crate::binding::{Binder, BindingLedger};
use crate::blur::BlurEngine;
use crate::capture::{CaptureOutcome, DesktopCapture, DesktopTarget, DxgiSourceFactory, ScreenRect, SkipReason};
use crate::config::OverlayConfig;
use crate::device::{GpuDevice, SwapChain};
use crate::error::{FrameError, InitError};
use crate::frame::{displayed_target, per_frame_clears, FrameStep, FRAME_PLAN};
use crate::mask::{MaskPass, TrianglePass};
use crate::presenter::QuadPresenter;
use crate::targets::{OffscreenTargets, TargetSize};
use crate::log_info;
use windows::Win32::Foundation::HWND;

const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 0.0];
const PRIME_PRESENTS: usize = 3;

#[derive(Debug, Clone, Copy)]
struct RenderSettings {
    sync_interval: u32,
    clear_targets_each_frame: bool,
    show_captured_desktop: bool,
}

impl From<&OverlayConfig> for RenderSettings {
    fn from(config: &OverlayConfig) -> Self {
        Self {
            sync_interval: config.sync_interval(),
            clear_targets_each_frame: config.clear_targets_each_frame,
            show_captured_desktop: config.show_captured_desktop,
        }
    }
}

/// Fields are declared in release order: everything that depends on the
/// device goes before it.
pub struct Renderer {
    capture: DesktopCapture<DxgiSourceFactory>,
    blur: BlurEngine,
    presenter: QuadPresenter,
    mask: Box<dyn MaskPass>,
    targets: OffscreenTargets,
    swap_chain: SwapChain,
    gpu: GpuDevice,
    ledger: BindingLedger,
    settings: RenderSettings,
    pending_resize: Option<TargetSize>,
}

impl Renderer {
    pub unsafe fn new(hwnd: HWND, size: TargetSize, config: &OverlayConfig) -> Result<Self, InitError> {
        let gpu = GpuDevice::new()?;
        let swap_chain = SwapChain::new(&gpu, hwnd, size)?;
        log_info!("Swap chain created ({}x{})", size.width, size.height);

        let targets = OffscreenTargets::new(gpu.device(), size).map_err(InitError::Targets)?;
        targets.clear_all(gpu.context());

        let mask: Box<dyn MaskPass> = Box::new(TrianglePass::new(gpu.device())?);
        let presenter = QuadPresenter::new(gpu.device())?;
        let blur = BlurEngine::new(gpu.device(), config.blur_radius)?;
        log_info!("Shaders compiled (blur radius {})", blur.radius());

        let capture = DesktopCapture::new(
            DxgiSourceFactory::new(gpu.device().clone()),
            config.skip_pointer_only_updates,
        );

        Ok(Self {
            capture,
            blur,
            presenter,
            mask,
            targets,
            swap_chain,
            gpu,
            ledger: BindingLedger::default(),
            settings: RenderSettings::from(config),
            pending_resize: None,
        })
    }

    pub fn size(&self) -> TargetSize {
        self.targets.size()
    }

    /// Presents a cleared back buffer a few times so the first visible frame is defined.
    pub unsafe fn prime(&self) -> Result<(), FrameError> {
        let back_buffer = self.swap_chain.back_buffer_rtv()?;
        for _ in 0..PRIME_PRESENTS {
            self.gpu.context().ClearRenderTargetView(back_buffer, &CLEAR_COLOR);
            self.swap_chain.present(self.settings.sync_interval)?;
        }
        Ok(())
    }

    /// Resizes the swap chain and all offscreen targets together. A failed
    /// resize is retried at the start of the next frame.
    pub unsafe fn resize(&mut self, size: TargetSize) -> Result<(), FrameError> {
        if self.pending_resize.is_none()
            && size == self.swap_chain.size()
            && size == self.targets.size()
            && self.swap_chain.back_buffer_rtv().is_ok()
        {
            return Ok(());
        }
        self.pending_resize = Some(size);

        // SwapChain::resize resets the context state.
        self.ledger.reset();
        self.swap_chain.resize(&self.gpu, size)?;
        self.targets
            .resize(self.gpu.device(), size)
            .map_err(|source| FrameError::Resize {
                width: size.width,
                height: size.height,
                source,
            })?;
        self.targets.clear_all(self.gpu.context());

        self.pending_resize = None;
        log_info!("Resized to {}x{}", size.width, size.height);
        Ok(())
    }

    pub unsafe fn render_frame(&mut self, window: ScreenRect) -> Result<CaptureOutcome, FrameError> {
        if let Some(size) = self.pending_resize {
            self.resize(size)?;
        }

        let context = self.gpu.context();
        let back_buffer = self.swap_chain.back_buffer_rtv()?;
        let settings = self.settings;
        let size = self.targets.size();
        context.RSSetViewports(Some(&[self.swap_chain.viewport()]));

        let mut binder = Binder::new(context, &self.targets, back_buffer, &mut self.ledger);
        let mut outcome = CaptureOutcome::NoNewFrame(SkipReason::SourceUnavailable);
        let mut blurred = Ok(());

        for step in FRAME_PLAN {
            match step {
                FrameStep::Clear => {
                    context.ClearRenderTargetView(back_buffer, &CLEAR_COLOR);
                    self.targets.clear(context, per_frame_clears(settings.clear_targets_each_frame));
                }
                FrameStep::Bind(bind) => binder.apply(bind),
                FrameStep::DrawMask => self.mask.render(context),
                FrameStep::CaptureDesktop => {
                    let mut sink = DesktopTarget::new(context, self.targets.desktop());
                    outcome = self.capture.refresh(window, size, &mut sink);
                }
                // On a map failure the previous blur output is presented again.
                FrameStep::Blur => blurred = self.blur.dispatch(&mut binder),
                FrameStep::DrawQuad => {
                    self.presenter.draw(&mut binder, displayed_target(settings.show_captured_desktop));
                }
                FrameStep::Present => self.swap_chain.present(settings.sync_interval)?,
            }
        }

        blurred.map(|_| outcome)
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        unsafe {
            self.gpu.context().ClearState();
            self.gpu.context().Flush();
        }
        log_info!("Renderer released");
    }
}
