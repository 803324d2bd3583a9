use crate::targets::TargetSize;

pub const THREAD_GROUP_SIZE: u32 = 8;
pub const DEFAULT_RADIUS: f32 = 13.0;

/// Constant buffer b0 of the blur program.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurParameters {
    pub width: u32,
    pub height: u32,
    pub radius: f32,
    _pad: f32,
}

const _: () = assert!(std::mem::size_of::<BlurParameters>() == 16);

impl BlurParameters {
    pub fn new(size: TargetSize, radius: f32) -> Self {
        Self {
            width: size.width,
            height: size.height,
            radius: sanitize_radius(radius),
            _pad: 0.0,
        }
    }

    /// Half-width of the box, `(int)radius` in the shader.
    pub fn kernel_extent(&self) -> u32 {
        self.radius as u32
    }
}

pub fn sanitize_radius(radius: f32) -> f32 {
    if radius.is_finite() && radius > 0.0 {
        radius
    } else {
        0.0
    }
}

pub fn dispatch_groups(size: TargetSize) -> (u32, u32, u32) {
    (
        size.width.div_ceil(THREAD_GROUP_SIZE),
        size.height.div_ceil(THREAD_GROUP_SIZE),
        1,
    )
}

/// Host twin of `shaders/blur.hlsl`, operating on BGRA8 images.
pub mod reference {
    use super::BlurParameters;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Bgra8Image {
        pub width: u32,
        pub height: u32,
        pub pixels: Vec<[u8; 4]>,
    }

    impl Bgra8Image {
        pub fn filled(width: u32, height: u32, bgra: [u8; 4]) -> Self {
            Self {
                width,
                height,
                pixels: vec![bgra; width as usize * height as usize],
            }
        }

        pub fn get(&self, x: u32, y: u32) -> [u8; 4] {
            self.pixels[(y * self.width + x) as usize]
        }

        pub fn set(&mut self, x: u32, y: u32, bgra: [u8; 4]) {
            let idx = (y * self.width + x) as usize;
            self.pixels[idx] = bgra;
        }
    }

    fn unorm_to_float(v: u8) -> f32 {
        v as f32 / 255.0
    }

    fn float_to_unorm(v: f32) -> u8 {
        (v.clamp(0.0, 1.0) * 255.0).round() as u8
    }

    /// Output has the parameter dimensions. Inputs must be at least that large.
    pub fn masked_box_blur(desktop: &Bgra8Image, mask: &Bgra8Image, params: &BlurParameters) -> Bgra8Image {
        let (width, height) = (params.width, params.height);
        let mut output = Bgra8Image::filled(width, height, [0, 0, 0, 0]);
        if width == 0 || height == 0 {
            return output;
        }

        let radius = params.kernel_extent() as i64;
        let max_x = width as i64 - 1;
        let max_y = height as i64 - 1;

        for y in 0..height {
            for x in 0..width {
                let mask_alpha = unorm_to_float(mask.get(x, y)[3]);
                if mask_alpha <= 0.0 {
                    continue;
                }

                let mut sum = [0.0f32; 4];
                let mut count = 0.0f32;
                for dy in -radius..=radius {
                    for dx in -radius..=radius {
                        let sx = (x as i64 + dx).clamp(0, max_x) as u32;
                        let sy = (y as i64 + dy).clamp(0, max_y) as u32;
                        let texel = desktop.get(sx, sy);
                        for (acc, channel) in sum.iter_mut().zip(texel) {
                            *acc += unorm_to_float(channel);
                        }
                        count += 1.0;
                    }
                }

                let mut color = sum.map(|c| c / count);
                color[3] *= mask_alpha;
                output.set(x, y, color.map(float_to_unorm));
            }
        }

        output
    }
}

#[cfg(windows)]
pub use gpu::BlurEngine;

#[cfg(windows)]
mod gpu {
    use super::*;
    use crate::binding::{BindStep, Binder, BLUR_PLAN};
    use crate::error::{FrameError, InitError};
    use crate::shader::{create_compute_shader, BLUR_HLSL};
    use anyhow::anyhow;
    use windows::Win32::Graphics::Direct3D11::*;

    pub struct BlurEngine {
        shader: ID3D11ComputeShader,
        params: ID3D11Buffer,
        radius: f32,
    }

    impl BlurEngine {
        pub unsafe fn new(device: &ID3D11Device, radius: f32) -> Result<Self, InitError> {
            let shader = create_compute_shader(device, BLUR_HLSL)
                .map_err(|source| InitError::Shader { name: "blur", source })?;

            let cb_desc = D3D11_BUFFER_DESC {
                ByteWidth: std::mem::size_of::<BlurParameters>() as u32,
                Usage: D3D11_USAGE_DYNAMIC,
                BindFlags: D3D11_BIND_CONSTANT_BUFFER.0 as u32,
                CPUAccessFlags: D3D11_CPU_ACCESS_WRITE.0 as u32,
                MiscFlags: 0,
                StructureByteStride: 0,
            };

            let mut params: Option<ID3D11Buffer> = None;
            device
                .CreateBuffer(&cb_desc, None, Some(&mut params))
                .map_err(|e| InitError::Pipeline(e.into()))?;
            let params = params.ok_or_else(|| InitError::Pipeline(anyhow!("CreateBuffer returned None")))?;

            Ok(Self {
                shader,
                params,
                radius: sanitize_radius(radius),
            })
        }

        pub fn radius(&self) -> f32 {
            self.radius
        }

        unsafe fn write_parameters(&self, context: &ID3D11DeviceContext, params: &BlurParameters) -> Result<(), FrameError> {
            let mut mapped = D3D11_MAPPED_SUBRESOURCE::default();
            context
                .Map(&self.params, 0, D3D11_MAP_WRITE_DISCARD, 0, Some(&mut mapped))
                .map_err(|e| FrameError::Map(e.into()))?;
            std::ptr::copy_nonoverlapping(
                params as *const BlurParameters as *const u8,
                mapped.pData as *mut u8,
                std::mem::size_of::<BlurParameters>(),
            );
            context.Unmap(&self.params, 0);
            Ok(())
        }

        /// Runs the masked blur over the binder's targets. A map failure skips the
        /// dispatch and leaves the previous blur output in place.
        pub unsafe fn dispatch(&self, binder: &mut Binder) -> Result<(), FrameError> {
            let size = binder.targets().size();
            let params = BlurParameters::new(size, self.radius);
            self.write_parameters(binder.context(), &params)?;

            let (groups_x, groups_y, groups_z) = dispatch_groups(size);
            for step in BLUR_PLAN {
                match step {
                    BindStep::ComputeProgram => {
                        binder.record(step);
                        let context = binder.context();
                        context.CSSetShader(&self.shader, None);
                        context.CSSetConstantBuffers(0, Some(&[Some(self.params.clone())]));
                    }
                    BindStep::Dispatch => {
                        binder.record(step);
                        binder.context().Dispatch(groups_x, groups_y, groups_z);
                    }
                    _ => binder.apply(step),
                }
            }
            Ok(())
        }
    }
}
