use crate::error::{FrameError, InitError};
use crate::targets::TargetSize;
use crate::{log_info, log_warn};
use anyhow::{anyhow, Result};
use windows::core::Interface;
use windows::Win32::Foundation::*;
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D11::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::Win32::Graphics::Dxgi::*;

const FEATURE_LEVELS: [D3D_FEATURE_LEVEL; 4] = [
    D3D_FEATURE_LEVEL_11_1,
    D3D_FEATURE_LEVEL_11_0,
    D3D_FEATURE_LEVEL_10_1,
    D3D_FEATURE_LEVEL_10_0,
];

pub struct GpuDevice {
    device: ID3D11Device,
    context: ID3D11DeviceContext,
    feature_level: D3D_FEATURE_LEVEL,
}

impl GpuDevice {
    pub unsafe fn new() -> Result<Self, InitError> {
        let flags = D3D11_CREATE_DEVICE_BGRA_SUPPORT;

        #[cfg(debug_assertions)]
        {
            match Self::create(flags | D3D11_CREATE_DEVICE_DEBUG) {
                Ok(gpu) => {
                    log_info!("Direct3D device created with debug layer");
                    return Ok(gpu);
                }
                Err(e) => log_warn!("Debug layer unavailable ({}), creating device without it", e),
            }
        }

        let gpu = Self::create(flags).map_err(InitError::Device)?;
        log_info!("Direct3D device created (feature level {:#x})", gpu.feature_level.0);
        Ok(gpu)
    }

    unsafe fn create(flags: D3D11_CREATE_DEVICE_FLAG) -> Result<Self> {
        let mut device: Option<ID3D11Device> = None;
        let mut context: Option<ID3D11DeviceContext> = None;
        let mut feature_level = D3D_FEATURE_LEVEL::default();

        D3D11CreateDevice(
            None,
            D3D_DRIVER_TYPE_HARDWARE,
            HMODULE::default(),
            flags,
            Some(&FEATURE_LEVELS),
            D3D11_SDK_VERSION,
            Some(&mut device),
            Some(&mut feature_level),
            Some(&mut context),
        )?;

        Ok(Self {
            device: device.ok_or_else(|| anyhow!("D3D11CreateDevice returned no device"))?,
            context: context.ok_or_else(|| anyhow!("D3D11CreateDevice returned no context"))?,
            feature_level,
        })
    }

    pub fn device(&self) -> &ID3D11Device {
        &self.device
    }

    pub fn context(&self) -> &ID3D11DeviceContext {
        &self.context
    }
}

pub struct SwapChain {
    swap_chain: IDXGISwapChain,
    back_buffer_rtv: Option<ID3D11RenderTargetView>,
    size: TargetSize,
}

impl SwapChain {
    /// Single-buffered, discard-mode BGRA8 swap chain on `hwnd`.
    pub unsafe fn new(gpu: &GpuDevice, hwnd: HWND, size: TargetSize) -> Result<Self, InitError> {
        let swap_chain = Self::create(gpu.device(), hwnd, size).map_err(InitError::SwapChain)?;
        let mut chain = Self {
            swap_chain,
            back_buffer_rtv: None,
            size,
        };
        chain.create_back_buffer_view(gpu.device()).map_err(InitError::SwapChain)?;
        Ok(chain)
    }

    unsafe fn create(device: &ID3D11Device, hwnd: HWND, size: TargetSize) -> Result<IDXGISwapChain> {
        let dxgi_device = device.cast::<IDXGIDevice>()?;
        let dxgi_adapter = dxgi_device.GetAdapter()?;
        let dxgi_factory: IDXGIFactory = dxgi_adapter.GetParent()?;

        let swap_chain_desc = DXGI_SWAP_CHAIN_DESC {
            BufferDesc: DXGI_MODE_DESC {
                Width: size.width,
                Height: size.height,
                RefreshRate: DXGI_RATIONAL { Numerator: 60, Denominator: 1 },
                Format: DXGI_FORMAT_B8G8R8A8_UNORM,
                ..Default::default()
            },
            SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
            BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
            BufferCount: 1,
            OutputWindow: hwnd,
            Windowed: true.into(),
            SwapEffect: DXGI_SWAP_EFFECT_DISCARD,
            Flags: 0,
        };

        let mut swap_chain: Option<IDXGISwapChain> = None;
        dxgi_factory.CreateSwapChain(device, &swap_chain_desc, &mut swap_chain).ok()?;
        swap_chain.ok_or_else(|| anyhow!("CreateSwapChain returned None"))
    }

    unsafe fn create_back_buffer_view(&mut self, device: &ID3D11Device) -> Result<()> {
        let back_buffer: ID3D11Texture2D = self.swap_chain.GetBuffer(0)?;
        let mut rtv: Option<ID3D11RenderTargetView> = None;
        device.CreateRenderTargetView(&back_buffer, None, Some(&mut rtv))?;
        self.back_buffer_rtv = Some(rtv.ok_or_else(|| anyhow!("CreateRenderTargetView returned None"))?);
        Ok(())
    }

    pub fn size(&self) -> TargetSize {
        self.size
    }

    pub fn back_buffer_rtv(&self) -> Result<&ID3D11RenderTargetView, FrameError> {
        self.back_buffer_rtv.as_ref().ok_or(FrameError::BackBufferUnavailable)
    }

    pub fn viewport(&self) -> D3D11_VIEWPORT {
        D3D11_VIEWPORT {
            TopLeftX: 0.0,
            TopLeftY: 0.0,
            Width: self.size.width as f32,
            Height: self.size.height as f32,
            MinDepth: 0.0,
            MaxDepth: 1.0,
        }
    }

    pub unsafe fn present(&self, sync_interval: u32) -> Result<(), FrameError> {
        self.swap_chain
            .Present(sync_interval, DXGI_PRESENT(0))
            .ok()
            .map_err(|e| FrameError::Present(e.into()))
    }

    /// Drops the back-buffer view, resizes the buffers keeping their format and
    /// recreates the view. On failure the view stays empty until a later resize
    /// succeeds.
    pub unsafe fn resize(&mut self, gpu: &GpuDevice, size: TargetSize) -> Result<(), FrameError> {
        let resize_err = |source: anyhow::Error| FrameError::Resize {
            width: size.width,
            height: size.height,
            source,
        };

        // Outstanding references to the buffers make ResizeBuffers fail.
        gpu.context().OMSetRenderTargets(None, None);
        gpu.context().ClearState();
        self.back_buffer_rtv = None;

        self.swap_chain
            .ResizeBuffers(0, size.width, size.height, DXGI_FORMAT_UNKNOWN, DXGI_SWAP_CHAIN_FLAG(0))
            .map_err(|e| resize_err(e.into()))?;
        self.size = size;
        self.create_back_buffer_view(gpu.device()).map_err(resize_err)?;
        Ok(())
    }
}
