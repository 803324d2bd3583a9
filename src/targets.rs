/// Client-area size shared by the swap chain and every offscreen target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    /// `None` for a degenerate (minimized) client area.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            None
        } else {
            Some(Self { width, height })
        }
    }

    pub fn from_signed(width: i32, height: i32) -> Option<Self> {
        Self::new(u32::try_from(width).ok()?, u32::try_from(height).ok()?)
    }
}

#[cfg(windows)]
pub use gpu::*;

#[cfg(windows)]
mod gpu {
    use super::TargetSize;
    use crate::binding::Target;
    use anyhow::{anyhow, Context, Result};
    use windows::Win32::Graphics::Direct3D11::*;
    use windows::Win32::Graphics::Dxgi::Common::*;

    const TRANSPARENT: [f32; 4] = [0.0, 0.0, 0.0, 0.0];

    pub struct RenderTexture {
        texture: ID3D11Texture2D,
        rtv: ID3D11RenderTargetView,
        srv: ID3D11ShaderResourceView,
        uav: Option<ID3D11UnorderedAccessView>,
    }

    impl RenderTexture {
        unsafe fn new(device: &ID3D11Device, size: TargetSize, unordered_access: bool) -> Result<Self> {
            let mut bind_flags = D3D11_BIND_SHADER_RESOURCE.0 as u32 | D3D11_BIND_RENDER_TARGET.0 as u32;
            if unordered_access {
                bind_flags |= D3D11_BIND_UNORDERED_ACCESS.0 as u32;
            }

            let texture_desc = D3D11_TEXTURE2D_DESC {
                Width: size.width,
                Height: size.height,
                MipLevels: 1,
                ArraySize: 1,
                Format: DXGI_FORMAT_B8G8R8A8_UNORM,
                SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
                Usage: D3D11_USAGE_DEFAULT,
                BindFlags: bind_flags,
                CPUAccessFlags: 0,
                MiscFlags: 0,
            };

            let mut texture: Option<ID3D11Texture2D> = None;
            device
                .CreateTexture2D(&texture_desc, None, Some(&mut texture))
                .context("CreateTexture2D failed")?;
            let texture = texture.ok_or_else(|| anyhow!("CreateTexture2D returned None"))?;

            let mut rtv: Option<ID3D11RenderTargetView> = None;
            device
                .CreateRenderTargetView(&texture, None, Some(&mut rtv))
                .context("CreateRenderTargetView failed")?;
            let rtv = rtv.ok_or_else(|| anyhow!("CreateRenderTargetView returned None"))?;

            let mut srv: Option<ID3D11ShaderResourceView> = None;
            device
                .CreateShaderResourceView(&texture, None, Some(&mut srv))
                .context("CreateShaderResourceView failed")?;
            let srv = srv.ok_or_else(|| anyhow!("CreateShaderResourceView returned None"))?;

            let uav = if unordered_access {
                let mut uav: Option<ID3D11UnorderedAccessView> = None;
                device
                    .CreateUnorderedAccessView(&texture, None, Some(&mut uav))
                    .context("CreateUnorderedAccessView failed")?;
                Some(uav.ok_or_else(|| anyhow!("CreateUnorderedAccessView returned None"))?)
            } else {
                None
            };

            Ok(Self { texture, rtv, srv, uav })
        }

        pub fn texture(&self) -> &ID3D11Texture2D {
            &self.texture
        }

        pub fn rtv(&self) -> &ID3D11RenderTargetView {
            &self.rtv
        }

        pub fn srv(&self) -> &ID3D11ShaderResourceView {
            &self.srv
        }

        pub fn uav(&self) -> Option<&ID3D11UnorderedAccessView> {
            self.uav.as_ref()
        }

        unsafe fn clear(&self, context: &ID3D11DeviceContext) {
            context.ClearRenderTargetView(&self.rtv, &TRANSPARENT);
        }
    }

    /// The captured desktop, the mask and the blur output, all at client size.
    pub struct OffscreenTargets {
        desktop: RenderTexture,
        mask: RenderTexture,
        blur_output: RenderTexture,
        size: TargetSize,
    }

    impl OffscreenTargets {
        pub unsafe fn new(device: &ID3D11Device, size: TargetSize) -> Result<Self> {
            Ok(Self {
                desktop: RenderTexture::new(device, size, false).context("desktop target")?,
                mask: RenderTexture::new(device, size, false).context("mask target")?,
                blur_output: RenderTexture::new(device, size, true).context("blur output target")?,
                size,
            })
        }

        /// Re-allocates all three targets. On failure the previous set is kept.
        pub unsafe fn resize(&mut self, device: &ID3D11Device, size: TargetSize) -> Result<()> {
            if size == self.size {
                return Ok(());
            }
            *self = Self::new(device, size)?;
            Ok(())
        }

        pub fn size(&self) -> TargetSize {
            self.size
        }

        pub fn desktop(&self) -> &RenderTexture {
            &self.desktop
        }

        pub fn mask(&self) -> &RenderTexture {
            &self.mask
        }

        pub fn blur_output(&self) -> &RenderTexture {
            &self.blur_output
        }

        pub fn get(&self, target: Target) -> Option<&RenderTexture> {
            match target {
                Target::BackBuffer => None,
                Target::Desktop => Some(&self.desktop),
                Target::Mask => Some(&self.mask),
                Target::BlurOutput => Some(&self.blur_output),
            }
        }

        pub unsafe fn clear(&self, context: &ID3D11DeviceContext, targets: &[Target]) {
            for target in targets {
                if let Some(texture) = self.get(*target) {
                    texture.clear(context);
                }
            }
        }

        pub unsafe fn clear_all(&self, context: &ID3D11DeviceContext) {
            self.clear(context, &[Target::Desktop, Target::Mask, Target::BlurOutput]);
        }
    }
}
