use crate::app::App;
use crate::capture::ScreenRect;
use crate::error::InitError;
use crate::log_warn;
use crate::targets::TargetSize;
use anyhow::{anyhow, Result};
use windows::core::*;
use windows::Win32::Foundation::*;
use windows::Win32::UI::WindowsAndMessaging::*;

const CLASS_NAME: PCWSTR = w!("FrostpaneOverlay");

/// Borderless, layered, top-most popup that is hidden from screen capture.
/// Black is the color key, so cleared pixels show the desktop through.
pub unsafe fn create_overlay_window(size: TargetSize) -> Result<HWND, InitError> {
    create(size).map_err(InitError::Window)
}

unsafe fn create(size: TargetSize) -> Result<HWND> {
    let hinstance = windows::Win32::System::LibraryLoader::GetModuleHandleW(None)?;

    let wc = WNDCLASSW {
        lpfnWndProc: Some(window_proc),
        hInstance: hinstance.into(),
        lpszClassName: CLASS_NAME,
        style: CS_HREDRAW | CS_VREDRAW,
        ..Default::default()
    };

    if RegisterClassW(&wc) == 0 {
        return Err(anyhow!("RegisterClassW failed"));
    }

    let hwnd = CreateWindowExW(
        WS_EX_LAYERED | WS_EX_TOPMOST,
        CLASS_NAME,
        w!("Frostpane"),
        WS_POPUP,
        CW_USEDEFAULT,
        CW_USEDEFAULT,
        size.width as i32,
        size.height as i32,
        None,
        None,
        Some(HINSTANCE(hinstance.0)),
        None,
    )?;

    if let Err(e) = SetLayeredWindowAttributes(hwnd, COLORREF(0), 255, LWA_ALPHA | LWA_COLORKEY) {
        let _ = DestroyWindow(hwnd);
        return Err(e.into());
    }

    if let Err(e) = SetWindowDisplayAffinity(hwnd, WDA_EXCLUDEFROMCAPTURE) {
        log_warn!("Failed to exclude window from capture: {:?}", e);
    }

    Ok(hwnd)
}

pub unsafe fn show(hwnd: HWND) {
    let _ = ShowWindow(hwnd, SW_SHOW);
}

/// Routes this window's messages to `app` until `detach` is called.
pub unsafe fn attach(hwnd: HWND, app: &App) {
    SetWindowLongPtrW(hwnd, GWLP_USERDATA, app as *const App as isize);
}

pub unsafe fn detach(hwnd: HWND) {
    SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0);
}

pub unsafe fn screen_rect(hwnd: HWND) -> Option<ScreenRect> {
    let mut rect = RECT::default();
    GetWindowRect(hwnd, &mut rect).ok()?;
    Some(ScreenRect::new(rect.left, rect.top, rect.right, rect.bottom))
}

pub unsafe fn client_size(hwnd: HWND) -> Option<TargetSize> {
    let mut rect = RECT::default();
    GetClientRect(hwnd, &mut rect).ok()?;
    TargetSize::from_signed(rect.right - rect.left, rect.bottom - rect.top)
}

unsafe extern "system" fn window_proc(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    let app = GetWindowLongPtrW(hwnd, GWLP_USERDATA) as *const App;

    match msg {
        // The whole surface acts as a caption so it can be dragged.
        WM_NCHITTEST => {
            let hit = DefWindowProcW(hwnd, msg, wparam, lparam);
            if hit.0 == HTCLIENT as isize {
                LRESULT(HTCAPTION as isize)
            } else {
                hit
            }
        }
        WM_SIZE => {
            if let Some(app) = app.as_ref() {
                let width = (lparam.0 & 0xFFFF) as u32;
                let height = ((lparam.0 >> 16) & 0xFFFF) as u32;
                app.on_resize(TargetSize::new(width, height));
            }
            LRESULT(0)
        }
        WM_MOVE => {
            if let Some(app) = app.as_ref() {
                app.on_move();
            }
            DefWindowProcW(hwnd, msg, wparam, lparam)
        }
        WM_DESTROY => {
            if let Some(app) = app.as_ref() {
                app.on_destroy();
            }
            PostQuitMessage(0);
            LRESULT(0)
        }
        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}
