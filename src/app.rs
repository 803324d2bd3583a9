use crate::capture::{CaptureOutcome, ScreenRect};
use crate::config::OverlayConfig;
use crate::error::{FrameError, InitError};
use crate::renderer::Renderer;
use crate::stats::FrameStats;
use crate::targets::TargetSize;
use crate::window;
use crate::{log_error, log_info, log_warn};
use anyhow::anyhow;
use std::cell::{Cell, RefCell};
use std::time::{Duration, Instant};
use windows::core::{w, HSTRING};
use windows::Win32::Foundation::HWND;
use windows::Win32::UI::WindowsAndMessaging::*;

const STATS_INTERVAL: Duration = Duration::from_secs(5);

pub const EXIT_OK: i32 = 0;
pub const EXIT_INIT_FAILED: i32 = -1;

/// Window plus renderer, shared with the window procedure through GWLP_USERDATA.
pub struct App {
    hwnd: HWND,
    renderer: RefCell<Renderer>,
    running: Cell<bool>,
    destroyed: Cell<bool>,
    deferred_resize: Cell<Option<TargetSize>>,
    frame_cap: Option<Duration>,
}

impl App {
    unsafe fn new(config: &OverlayConfig) -> Result<Box<Self>, InitError> {
        let size = TargetSize::new(config.width, config.height).ok_or_else(|| {
            InitError::Window(anyhow!("Invalid window size {}x{}", config.width, config.height))
        })?;

        let hwnd = window::create_overlay_window(size)?;
        let client = window::client_size(hwnd).unwrap_or(size);
        log_info!("Overlay window created ({}x{})", client.width, client.height);

        let renderer = match Renderer::new(hwnd, client, config) {
            Ok(renderer) => renderer,
            Err(e) => {
                let _ = DestroyWindow(hwnd);
                return Err(e);
            }
        };

        if let Err(e) = renderer.prime() {
            log_warn!("Failed to prime swap chain: {}", e);
        }

        let app = Box::new(Self {
            hwnd,
            renderer: RefCell::new(renderer),
            running: Cell::new(true),
            destroyed: Cell::new(false),
            deferred_resize: Cell::new(None),
            frame_cap: config.frame_cap(),
        });

        window::attach(hwnd, &app);
        window::show(hwnd);
        Ok(app)
    }

    pub fn on_resize(&self, size: Option<TargetSize>) {
        let Some(size) = size else {
            return;
        };
        match self.renderer.try_borrow_mut() {
            Ok(mut renderer) => {
                if let Err(e) = unsafe { renderer.resize(size) } {
                    log_warn!("{}", e);
                }
            }
            Err(_) => self.deferred_resize.set(Some(size)),
        }
    }

    /// Renders an extra frame so the captured region follows a drag.
    pub fn on_move(&self) {
        if let Err(e) = self.render_frame() {
            log_warn!("Render during move failed: {}", e);
        }
    }

    pub fn on_destroy(&self) {
        self.running.set(false);
        self.destroyed.set(true);
    }

    /// `None` when called from inside a frame that is already in progress.
    fn render_frame(&self) -> Result<Option<CaptureOutcome>, FrameError> {
        // Messages dispatched from inside a frame must not start another one.
        let Ok(mut renderer) = self.renderer.try_borrow_mut() else {
            return Ok(None);
        };

        unsafe {
            if let Some(size) = self.deferred_resize.take() {
                renderer.resize(size)?;
            }
            let window = window::screen_rect(self.hwnd).unwrap_or_else(|| {
                let size = renderer.size();
                ScreenRect::new(0, 0, size.width as i32, size.height as i32)
            });
            renderer.render_frame(window).map(Some)
        }
    }

    fn run_message_loop(&self) -> i32 {
        let mut msg = MSG::default();
        let mut stats = FrameStats::new(STATS_INTERVAL);

        while self.running.get() {
            unsafe {
                while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
                    if msg.message == WM_QUIT {
                        self.running.set(false);
                        break;
                    }
                    let _ = TranslateMessage(&msg);
                    DispatchMessageW(&msg);
                }
            }
            if !self.running.get() {
                break;
            }

            let frame_start = Instant::now();
            match self.render_frame() {
                Ok(Some(outcome)) => stats.record_capture(outcome.is_captured()),
                Ok(None) => {}
                Err(e) => {
                    if stats.note_error(Instant::now()) {
                        if e.retry_on_next_frame() {
                            log_warn!("Frame skipped (count: {}): {}", stats.error_count(), e);
                        } else {
                            log_error!("Render error (count: {}): {}", stats.error_count(), e);
                        }
                    }
                }
            }
            let render_time_ms = frame_start.elapsed().as_secs_f32() * 1000.0;

            if let Some(target_frame_duration) = self.frame_cap {
                let elapsed_since_last = stats.last_frame().elapsed();
                if elapsed_since_last < target_frame_duration {
                    spin_sleep::sleep(target_frame_duration - elapsed_since_last);
                }
            }

            let now = Instant::now();
            stats.record(render_time_ms, now);
            if let Some(report) = stats.due_report(now) {
                log_info!(
                    "{:.1} fps, {:.2} ms render, {}/{} frames with new desktop content",
                    report.fps,
                    report.avg_render_ms,
                    report.captured,
                    report.frames
                );
            }
        }

        if stats.error_count() > 0 {
            log_warn!("Exiting with {} render errors encountered", stats.error_count());
        }
        EXIT_OK
    }
}

impl Drop for App {
    fn drop(&mut self) {
        unsafe {
            window::detach(self.hwnd);
            if !self.destroyed.get() {
                let _ = DestroyWindow(self.hwnd);
            }
        }
    }
}

fn show_fatal_error(error: &InitError) {
    let text = HSTRING::from(error.to_string());
    unsafe {
        let _ = MessageBoxW(None, &text, w!("Frostpane"), MB_OK | MB_ICONERROR);
    }
}

/// Runs the overlay until its window closes. Returns the process exit code.
pub fn run(config: &OverlayConfig) -> i32 {
    let app = match unsafe { App::new(config) } {
        Ok(app) => app,
        Err(e) => {
            log_error!("Initialization failed: {}", e);
            show_fatal_error(&e);
            return EXIT_INIT_FAILED;
        }
    };

    log_info!("Overlay running");
    let code = app.run_message_loop();
    drop(app);
    log_info!("Overlay closed");
    code
}
