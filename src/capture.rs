// Desktop duplication and cropping of the region behind the window.

use crate::error::{AcquireError, CaptureError};
use crate::targets::TargetSize;
use crate::{log_error, log_info, log_warn};

/// Rectangle in virtual-desktop coordinates, right/bottom exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ScreenRect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn intersect(&self, other: &ScreenRect) -> Option<ScreenRect> {
        let clipped = ScreenRect {
            left: self.left.max(other.left),
            top: self.top.max(other.top),
            right: self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
        };
        (clipped.width() > 0 && clipped.height() > 0).then_some(clipped)
    }
}

/// Source box inside the duplicated output plus where it lands in the desktop target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub dest_x: u32,
    pub dest_y: u32,
}

impl CropRegion {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    /// True when the copy writes every texel of a target of `target` size.
    pub fn covers(&self, target: TargetSize) -> bool {
        self.dest_x == 0 && self.dest_y == 0 && self.width() == target.width && self.height() == target.height
    }

    /// Source box lies inside `source` and the destination box inside `destination`.
    pub fn fits(&self, source: TargetSize, destination: TargetSize) -> bool {
        self.right <= source.width
            && self.bottom <= source.height
            && self.dest_x as u64 + self.width() as u64 <= destination.width as u64
            && self.dest_y as u64 + self.height() as u64 <= destination.height as u64
    }
}

/// Clips the window against the output and the target. `None` when nothing of
/// the window is visible on the output.
pub fn crop_region(window: ScreenRect, output: ScreenRect, target: TargetSize) -> Option<CropRegion> {
    let limit = ScreenRect {
        left: window.left,
        top: window.top,
        right: window.left.saturating_add(target.width.min(i32::MAX as u32) as i32),
        bottom: window.top.saturating_add(target.height.min(i32::MAX as u32) as i32),
    };
    let visible = window.intersect(&output)?.intersect(&limit)?;

    Some(CropRegion {
        left: (visible.left - output.left) as u32,
        top: (visible.top - output.top) as u32,
        right: (visible.right - output.left) as u32,
        bottom: (visible.bottom - output.top) as u32,
        dest_x: (visible.left - window.left) as u32,
        dest_y: (visible.top - window.top) as u32,
    })
}

pub struct AcquiredFrame<F> {
    pub frame: F,
    /// Zero when only the pointer moved since the previous frame.
    pub last_present_time: i64,
}

pub trait DuplicationSource {
    type Frame;

    fn acquire_next_frame(&mut self, timeout_ms: u32) -> Result<AcquiredFrame<Self::Frame>, AcquireError>;
    fn release_frame(&mut self) -> Result<(), AcquireError>;
    /// Desktop coordinates covered by the duplicated output.
    fn output_bounds(&self) -> ScreenRect;
}

/// Where captured pixels land, normally the `desktop` target.
pub trait DesktopSink<T> {
    /// Blanks the whole target to transparent black.
    fn clear(&mut self);
    fn copy(&mut self, frame: &T, region: &CropRegion) -> anyhow::Result<()>;
}

pub trait SourceFactory {
    type Source: DuplicationSource;

    fn open(&mut self) -> Result<Self::Source, CaptureError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Timeout,
    AccessLost,
    SourceUnavailable,
    PointerOnly,
    OffOutput,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    Captured,
    NoNewFrame(SkipReason),
}

impl CaptureOutcome {
    pub fn is_captured(&self) -> bool {
        matches!(self, CaptureOutcome::Captured)
    }
}

pub struct DesktopCapture<F: SourceFactory> {
    factory: F,
    source: Option<F::Source>,
    skip_pointer_only: bool,
    failed_opens: u32,
    failed_copies: u32,
}

impl<F: SourceFactory> DesktopCapture<F> {
    /// Opens the source right away; a failure is logged and retried per frame.
    pub fn new(factory: F, skip_pointer_only: bool) -> Self {
        let mut capture = Self {
            factory,
            source: None,
            skip_pointer_only,
            failed_opens: 0,
            failed_copies: 0,
        };
        capture.reopen();
        capture
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    fn reopen(&mut self) {
        match self.factory.open() {
            Ok(source) => {
                if self.failed_opens > 0 {
                    log_info!("Desktop duplication recreated after {} failed attempts", self.failed_opens);
                } else {
                    log_info!("Desktop duplication initialized");
                }
                self.failed_opens = 0;
                self.source = Some(source);
            }
            Err(e) => {
                // Only the first failure of a streak is logged.
                if self.failed_opens == 0 {
                    log_warn!("Desktop duplication unavailable: {}", e);
                }
                self.failed_opens += 1;
                self.source = None;
            }
        }
    }

    /// Pulls the newest desktop frame and writes the visible crop into `sink`.
    /// Without a new frame the sink is left untouched. Texels the crop does not
    /// reach are cleared so no earlier window position shows through.
    pub fn refresh<S>(&mut self, window: ScreenRect, target: TargetSize, sink: &mut S) -> CaptureOutcome
    where
        S: DesktopSink<<F::Source as DuplicationSource>::Frame>,
    {
        if self.source.is_none() {
            self.reopen();
        }
        let Some(source) = self.source.as_mut() else {
            return CaptureOutcome::NoNewFrame(SkipReason::SourceUnavailable);
        };

        let acquired = match source.acquire_next_frame(0) {
            Err(AcquireError::Timeout) => source.acquire_next_frame(1),
            other => other,
        };

        let acquired = match acquired {
            Ok(acquired) => acquired,
            Err(AcquireError::Timeout) => return CaptureOutcome::NoNewFrame(SkipReason::Timeout),
            Err(AcquireError::AccessLost) => {
                log_warn!("Desktop duplication access lost, recreating");
                self.source = None;
                self.reopen();
                return CaptureOutcome::NoNewFrame(SkipReason::AccessLost);
            }
            Err(AcquireError::Other(msg)) => {
                log_error!("Failed to acquire desktop frame: {}", msg);
                return CaptureOutcome::NoNewFrame(SkipReason::Failed);
            }
        };

        let outcome = if self.skip_pointer_only && acquired.last_present_time == 0 {
            CaptureOutcome::NoNewFrame(SkipReason::PointerOnly)
        } else {
            match crop_region(window, source.output_bounds(), target) {
                None => {
                    sink.clear();
                    CaptureOutcome::NoNewFrame(SkipReason::OffOutput)
                }
                Some(region) => {
                    if !region.covers(target) {
                        sink.clear();
                    }
                    match sink.copy(&acquired.frame, &region) {
                        Ok(()) => {
                            self.failed_copies = 0;
                            CaptureOutcome::Captured
                        }
                        Err(e) => {
                            if self.failed_copies == 0 {
                                log_error!("Failed to copy desktop region: {:#}", e);
                            }
                            self.failed_copies += 1;
                            CaptureOutcome::NoNewFrame(SkipReason::Failed)
                        }
                    }
                }
            }
        };

        drop(acquired);
        if let Err(e) = source.release_frame() {
            log_warn!("Failed to release desktop frame: {}", e);
            if e.invalidates_source() {
                self.source = None;
            }
        }

        outcome
    }
}

#[cfg(windows)]
pub use gpu::{DesktopTarget, DxgiDuplication, DxgiSourceFactory};

#[cfg(windows)]
mod gpu {
    use super::*;
    use crate::targets::RenderTexture;
    use anyhow::anyhow;
    use windows::core::Interface;
    use windows::Win32::Graphics::Direct3D11::*;
    use windows::Win32::Graphics::Dxgi::*;

    pub struct DxgiSourceFactory {
        device: ID3D11Device,
    }

    impl DxgiSourceFactory {
        pub fn new(device: ID3D11Device) -> Self {
            Self { device }
        }
    }

    impl SourceFactory for DxgiSourceFactory {
        type Source = DxgiDuplication;

        fn open(&mut self) -> Result<DxgiDuplication, CaptureError> {
            let duplicate = |e: windows::core::Error| CaptureError::Duplicate(format!("{:?}", e));
            unsafe {
                let dxgi_device: IDXGIDevice = self.device.cast().map_err(duplicate)?;
                let adapter = dxgi_device.GetAdapter().map_err(duplicate)?;
                let output: IDXGIOutput = adapter.EnumOutputs(0).map_err(|_| CaptureError::NoOutput)?;
                let desc = output.GetDesc().map_err(duplicate)?;
                let output1: IDXGIOutput1 = output.cast().map_err(duplicate)?;
                let duplication = output1.DuplicateOutput(&self.device).map_err(duplicate)?;

                let rect = desc.DesktopCoordinates;
                Ok(DxgiDuplication {
                    duplication,
                    bounds: ScreenRect::new(rect.left, rect.top, rect.right, rect.bottom),
                })
            }
        }
    }

    pub struct DxgiDuplication {
        duplication: IDXGIOutputDuplication,
        bounds: ScreenRect,
    }

    fn acquire_error(e: windows::core::Error) -> AcquireError {
        if e.code() == DXGI_ERROR_WAIT_TIMEOUT {
            AcquireError::Timeout
        } else if e.code() == DXGI_ERROR_ACCESS_LOST {
            AcquireError::AccessLost
        } else {
            AcquireError::Other(format!("{:?}", e))
        }
    }

    impl DuplicationSource for DxgiDuplication {
        type Frame = ID3D11Texture2D;

        fn acquire_next_frame(&mut self, timeout_ms: u32) -> Result<AcquiredFrame<ID3D11Texture2D>, AcquireError> {
            unsafe {
                let mut frame_info = DXGI_OUTDUPL_FRAME_INFO::default();
                let mut desktop_resource: Option<IDXGIResource> = None;
                self.duplication
                    .AcquireNextFrame(timeout_ms, &mut frame_info, &mut desktop_resource)
                    .map_err(acquire_error)?;

                let texture = desktop_resource
                    .ok_or_else(|| AcquireError::Other("frame has no desktop resource".into()))
                    .and_then(|resource| resource.cast::<ID3D11Texture2D>().map_err(acquire_error));

                match texture {
                    Ok(frame) => Ok(AcquiredFrame {
                        frame,
                        last_present_time: frame_info.LastPresentTime,
                    }),
                    Err(e) => {
                        let _ = self.duplication.ReleaseFrame();
                        Err(e)
                    }
                }
            }
        }

        fn release_frame(&mut self) -> Result<(), AcquireError> {
            unsafe { self.duplication.ReleaseFrame().map_err(acquire_error) }
        }

        fn output_bounds(&self) -> ScreenRect {
            self.bounds
        }
    }

    /// Copies the cropped region of `frame` into `destination` and flushes.
    unsafe fn copy_region(
        context: &ID3D11DeviceContext,
        destination: &ID3D11Texture2D,
        frame: &ID3D11Texture2D,
        region: &CropRegion,
    ) {
        let source_box = D3D11_BOX {
            left: region.left,
            top: region.top,
            front: 0,
            right: region.right,
            bottom: region.bottom,
            back: 1,
        };
        context.CopySubresourceRegion(destination, 0, region.dest_x, region.dest_y, 0, frame, 0, Some(&source_box));
        context.Flush();
    }

    unsafe fn texture_desc(texture: &ID3D11Texture2D) -> D3D11_TEXTURE2D_DESC {
        let mut desc = D3D11_TEXTURE2D_DESC::default();
        texture.GetDesc(&mut desc);
        desc
    }

    /// The `desktop` render texture as a capture sink.
    pub struct DesktopTarget<'a> {
        context: &'a ID3D11DeviceContext,
        desktop: &'a RenderTexture,
    }

    impl<'a> DesktopTarget<'a> {
        pub fn new(context: &'a ID3D11DeviceContext, desktop: &'a RenderTexture) -> Self {
            Self { context, desktop }
        }
    }

    impl DesktopSink<ID3D11Texture2D> for DesktopTarget<'_> {
        fn clear(&mut self) {
            unsafe {
                self.context.ClearRenderTargetView(self.desktop.rtv(), &[0.0, 0.0, 0.0, 0.0]);
            }
        }

        /// Rejects frames whose format or extent cannot be copied as-is, e.g. an
        /// HDR output or a mode change that has not reached the duplication yet.
        fn copy(&mut self, frame: &ID3D11Texture2D, region: &CropRegion) -> anyhow::Result<()> {
            unsafe {
                let source = texture_desc(frame);
                let destination = texture_desc(self.desktop.texture());
                if source.Format != destination.Format {
                    return Err(anyhow!(
                        "desktop frame format {:?} does not match target format {:?}",
                        source.Format,
                        destination.Format
                    ));
                }

                let source_size = TargetSize::new(source.Width, source.Height)
                    .ok_or_else(|| anyhow!("desktop frame is empty"))?;
                let destination_size = TargetSize::new(destination.Width, destination.Height)
                    .ok_or_else(|| anyhow!("desktop target is empty"))?;
                if !region.fits(source_size, destination_size) {
                    return Err(anyhow!(
                        "crop {:?} exceeds frame {}x{} or target {}x{}",
                        region,
                        source.Width,
                        source.Height,
                        destination.Width,
                        destination.Height
                    ));
                }

                copy_region(self.context, self.desktop.texture(), frame, region);
            }
            Ok(())
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    const OUTPUT: ScreenRect = ScreenRect { left: 0, top: 0, right: 1920, bottom: 1080 };

    fn size(w: u32, h: u32) -> TargetSize {
        TargetSize::new(w, h).unwrap()
    }

    #[derive(Default)]
    struct Script {
        acquires: VecDeque<Result<i64, AcquireError>>,
        opens: VecDeque<bool>,
        timeouts_seen: Vec<u32>,
        released: u32,
        open_count: u32,
    }

    struct FakeSource {
        script: Rc<RefCell<Script>>,
    }

    impl DuplicationSource for FakeSource {
        type Frame = u32;

        fn acquire_next_frame(&mut self, timeout_ms: u32) -> Result<AcquiredFrame<u32>, AcquireError> {
            let mut script = self.script.borrow_mut();
            script.timeouts_seen.push(timeout_ms);
            let next = script.acquires.pop_front().unwrap_or(Err(AcquireError::Timeout));
            next.map(|last_present_time| AcquiredFrame { frame: 7, last_present_time })
        }

        fn release_frame(&mut self) -> Result<(), AcquireError> {
            self.script.borrow_mut().released += 1;
            Ok(())
        }

        fn output_bounds(&self) -> ScreenRect {
            OUTPUT
        }
    }

    struct FakeFactory {
        script: Rc<RefCell<Script>>,
    }

    impl SourceFactory for FakeFactory {
        type Source = FakeSource;

        fn open(&mut self) -> Result<FakeSource, CaptureError> {
            let mut script = self.script.borrow_mut();
            script.open_count += 1;
            if script.opens.pop_front().unwrap_or(true) {
                Ok(FakeSource { script: Rc::clone(&self.script) })
            } else {
                Err(CaptureError::Duplicate("DXGI_ERROR_UNAVAILABLE".into()))
            }
        }
    }

    fn capture_with(script: Script, skip_pointer_only: bool) -> (DesktopCapture<FakeFactory>, Rc<RefCell<Script>>) {
        let script = Rc::new(RefCell::new(script));
        let capture = DesktopCapture::new(FakeFactory { script: Rc::clone(&script) }, skip_pointer_only);
        (capture, script)
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Write {
        Clear,
        Copy(CropRegion),
    }

    #[derive(Default)]
    struct RecordingSink {
        writes: Vec<Write>,
        fail_copies: bool,
    }

    impl DesktopSink<u32> for RecordingSink {
        fn clear(&mut self) {
            self.writes.push(Write::Clear);
        }

        fn copy(&mut self, frame: &u32, region: &CropRegion) -> anyhow::Result<()> {
            assert_eq!(*frame, 7);
            if self.fail_copies {
                return Err(anyhow::anyhow!("E_INVALIDARG"));
            }
            self.writes.push(Write::Copy(*region));
            Ok(())
        }
    }

    fn refresh(capture: &mut DesktopCapture<FakeFactory>) -> CaptureOutcome {
        let window = ScreenRect::new(100, 100, 116, 116);
        capture.refresh(window, size(16, 16), &mut RecordingSink::default())
    }

    fn single_frame() -> (DesktopCapture<FakeFactory>, Rc<RefCell<Script>>) {
        let script = Script {
            acquires: VecDeque::from([Ok(4)]),
            ..Default::default()
        };
        capture_with(script, false)
    }

    #[test]
    fn window_inside_output_copies_whole_client_area() {
        let region = crop_region(ScreenRect::new(100, 50, 900, 650), OUTPUT, size(800, 600)).unwrap();
        assert_eq!(
            region,
            CropRegion { left: 100, top: 50, right: 900, bottom: 650, dest_x: 0, dest_y: 0 }
        );
    }

    #[test]
    fn partially_off_screen_window_is_clipped_with_offset() {
        let region = crop_region(ScreenRect::new(-30, 1000, 70, 1100), OUTPUT, size(100, 100)).unwrap();
        assert_eq!((region.left, region.top, region.right, region.bottom), (0, 1000, 70, 1080));
        assert_eq!((region.dest_x, region.dest_y), (30, 0));
        assert_eq!((region.width(), region.height()), (70, 80));
    }

    #[test]
    fn output_origin_is_subtracted() {
        let output = ScreenRect::new(1920, 0, 3840, 1080);
        let region = crop_region(ScreenRect::new(2000, 10, 2010, 20), output, size(10, 10)).unwrap();
        assert_eq!((region.left, region.right), (80, 90));
    }

    #[test]
    fn crop_never_exceeds_target() {
        let region = crop_region(ScreenRect::new(0, 0, 200, 200), OUTPUT, size(50, 40)).unwrap();
        assert_eq!((region.width(), region.height()), (50, 40));
    }

    #[test]
    fn window_off_output_has_no_crop() {
        assert!(crop_region(ScreenRect::new(-500, 0, -100, 300), OUTPUT, size(400, 300)).is_none());
    }

    #[test]
    fn timeout_is_retried_once_with_one_millisecond() {
        let script = Script {
            acquires: VecDeque::from([Err(AcquireError::Timeout), Ok(5)]),
            ..Default::default()
        };
        let (mut capture, script) = capture_with(script, false);
        assert_eq!(refresh(&mut capture), CaptureOutcome::Captured);
        assert_eq!(script.borrow().timeouts_seen, vec![0, 1]);
        assert_eq!(script.borrow().released, 1);

        assert_eq!(refresh(&mut capture), CaptureOutcome::NoNewFrame(SkipReason::Timeout));
        assert_eq!(script.borrow().timeouts_seen, vec![0, 1, 0, 1]);
        assert_eq!(script.borrow().released, 1);
    }

    #[test]
    fn access_lost_drops_source_and_recovers() {
        let script = Script {
            acquires: VecDeque::from([
                Ok(1),
                Err(AcquireError::AccessLost),
                Err(AcquireError::Timeout),
                Err(AcquireError::Timeout),
                Ok(3),
            ]),
            opens: VecDeque::from([true, false, true]),
            ..Default::default()
        };
        let (mut capture, script) = capture_with(script, false);

        assert!(refresh(&mut capture).is_captured());
        assert_eq!(refresh(&mut capture), CaptureOutcome::NoNewFrame(SkipReason::AccessLost));
        assert!(!capture.has_source());

        assert_eq!(refresh(&mut capture), CaptureOutcome::NoNewFrame(SkipReason::Timeout));
        assert!(capture.has_source());
        assert!(refresh(&mut capture).is_captured());
        assert_eq!(script.borrow().open_count, 3);
    }

    #[test]
    fn unavailable_source_skips_until_open_succeeds() {
        let script = Script {
            acquires: VecDeque::from([Ok(9)]),
            opens: VecDeque::from([false, false, true]),
            ..Default::default()
        };
        let (mut capture, _script) = capture_with(script, false);
        assert_eq!(refresh(&mut capture), CaptureOutcome::NoNewFrame(SkipReason::SourceUnavailable));
        assert!(refresh(&mut capture).is_captured());
    }

    #[test]
    fn pointer_only_updates_are_optionally_skipped() {
        let script = Script {
            acquires: VecDeque::from([Ok(0), Ok(0)]),
            ..Default::default()
        };
        let (mut capture, script) = capture_with(script, true);
        assert_eq!(refresh(&mut capture), CaptureOutcome::NoNewFrame(SkipReason::PointerOnly));
        assert_eq!(script.borrow().released, 1);

        capture.skip_pointer_only = false;
        assert!(refresh(&mut capture).is_captured());
    }

    #[test]
    fn failed_copy_still_releases_the_frame() {
        let (mut capture, script) = single_frame();
        let mut sink = RecordingSink { fail_copies: true, ..Default::default() };
        let outcome = capture.refresh(ScreenRect::new(0, 0, 16, 16), size(16, 16), &mut sink);
        assert_eq!(outcome, CaptureOutcome::NoNewFrame(SkipReason::Failed));
        assert_eq!(script.borrow().released, 1);
        assert!(capture.has_source());
    }

    #[test]
    fn full_coverage_copies_without_clearing() {
        let (mut capture, _script) = single_frame();
        let mut sink = RecordingSink::default();
        let outcome = capture.refresh(ScreenRect::new(10, 10, 26, 26), size(16, 16), &mut sink);
        assert!(outcome.is_captured());
        assert_eq!(
            sink.writes,
            vec![Write::Copy(CropRegion { left: 10, top: 10, right: 26, bottom: 26, dest_x: 0, dest_y: 0 })]
        );
    }

    #[test]
    fn partial_crop_clears_target_before_copy() {
        let (mut capture, _script) = single_frame();
        let mut sink = RecordingSink::default();
        let outcome = capture.refresh(ScreenRect::new(-30, 0, 70, 100), size(100, 100), &mut sink);
        assert!(outcome.is_captured());
        assert_eq!(
            sink.writes,
            vec![
                Write::Clear,
                Write::Copy(CropRegion { left: 0, top: 0, right: 70, bottom: 100, dest_x: 30, dest_y: 0 }),
            ]
        );
    }

    #[test]
    fn window_off_output_clears_target() {
        let (mut capture, script) = single_frame();
        let mut sink = RecordingSink::default();
        let outcome = capture.refresh(ScreenRect::new(-500, 0, -100, 300), size(400, 300), &mut sink);
        assert_eq!(outcome, CaptureOutcome::NoNewFrame(SkipReason::OffOutput));
        assert_eq!(sink.writes, vec![Write::Clear]);
        assert_eq!(script.borrow().released, 1);
    }

    #[test]
    fn no_new_frame_leaves_target_untouched() {
        let script = Script {
            acquires: VecDeque::from([Err(AcquireError::Timeout), Err(AcquireError::Timeout), Ok(0)]),
            ..Default::default()
        };
        let (mut capture, _script) = capture_with(script, true);
        let window = ScreenRect::new(-30, 0, 70, 100);
        let mut sink = RecordingSink::default();

        assert_eq!(
            capture.refresh(window, size(100, 100), &mut sink),
            CaptureOutcome::NoNewFrame(SkipReason::Timeout)
        );
        assert_eq!(
            capture.refresh(window, size(100, 100), &mut sink),
            CaptureOutcome::NoNewFrame(SkipReason::PointerOnly)
        );
        assert!(sink.writes.is_empty());
    }

    #[test]
    fn crop_must_fit_frame_and_target() {
        let region = crop_region(ScreenRect::new(-30, 1000, 70, 1100), OUTPUT, size(100, 100)).unwrap();
        assert!(region.fits(size(1920, 1080), size(100, 100)));
        assert!(!region.covers(size(100, 100)));
        // Output shrank (mode change) before the duplication was recreated.
        assert!(!region.fits(size(1280, 720), size(100, 100)));
        assert!(!region.fits(size(1920, 1080), size(90, 100)));
    }

    #[test]
    fn other_acquire_errors_keep_the_source() {
        let script = Script {
            acquires: VecDeque::from([Err(AcquireError::Other("E_FAIL".into()))]),
            ..Default::default()
        };
        let (mut capture, _script) = capture_with(script, false);
        assert_eq!(refresh(&mut capture), CaptureOutcome::NoNewFrame(SkipReason::Failed));
        assert!(capture.has_source());
    }
}
