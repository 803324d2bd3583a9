#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColoredVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

/// Reference mask: an opaque triangle, one primary color per corner.
pub const TRIANGLE_VERTICES: [ColoredVertex; 3] = [
    ColoredVertex { position: [0.0, 0.5, 0.0], color: [1.0, 0.0, 0.0, 1.0] },
    ColoredVertex { position: [0.5, -0.5, 0.0], color: [0.0, 1.0, 0.0, 1.0] },
    ColoredVertex { position: [-0.5, -0.5, 0.0], color: [0.0, 0.0, 1.0, 1.0] },
];

#[cfg(windows)]
pub use gpu::*;

#[cfg(windows)]
mod gpu {
    use super::*;
    use crate::error::InitError;
    use crate::shader::{create_input_layout, create_pixel_shader, create_vertex_buffer, create_vertex_shader, COLORED_HLSL};
    use windows::core::s;
    use windows::Win32::Graphics::Direct3D::D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST;
    use windows::Win32::Graphics::Direct3D11::*;
    use windows::Win32::Graphics::Dxgi::Common::*;

    /// Draws into whatever render target is bound at slot 0 (the mask).
    /// Only the alpha channel of the output is consumed downstream.
    pub trait MaskPass {
        unsafe fn render(&self, context: &ID3D11DeviceContext);
    }

    pub struct TrianglePass {
        vertex_buffer: ID3D11Buffer,
        input_layout: ID3D11InputLayout,
        vertex_shader: ID3D11VertexShader,
        pixel_shader: ID3D11PixelShader,
    }

    impl TrianglePass {
        pub unsafe fn new(device: &ID3D11Device) -> Result<Self, InitError> {
            let shader_err = |source| InitError::Shader { name: "colored", source };
            let (vertex_shader, vs_blob) = create_vertex_shader(device, COLORED_HLSL).map_err(shader_err)?;
            let pixel_shader = create_pixel_shader(device, COLORED_HLSL).map_err(shader_err)?;

            let input_elements = [
                D3D11_INPUT_ELEMENT_DESC {
                    SemanticName: s!("POSITION"),
                    SemanticIndex: 0,
                    Format: DXGI_FORMAT_R32G32B32_FLOAT,
                    InputSlot: 0,
                    AlignedByteOffset: 0,
                    InputSlotClass: D3D11_INPUT_PER_VERTEX_DATA,
                    InstanceDataStepRate: 0,
                },
                D3D11_INPUT_ELEMENT_DESC {
                    SemanticName: s!("COLOR"),
                    SemanticIndex: 0,
                    Format: DXGI_FORMAT_R32G32B32A32_FLOAT,
                    InputSlot: 0,
                    AlignedByteOffset: 12,
                    InputSlotClass: D3D11_INPUT_PER_VERTEX_DATA,
                    InstanceDataStepRate: 0,
                },
            ];

            let input_layout = create_input_layout(device, &input_elements, &vs_blob).map_err(InitError::Pipeline)?;
            let vertex_buffer = create_vertex_buffer(device, &TRIANGLE_VERTICES).map_err(InitError::Pipeline)?;

            Ok(Self {
                vertex_buffer,
                input_layout,
                vertex_shader,
                pixel_shader,
            })
        }
    }

    impl MaskPass for TrianglePass {
        unsafe fn render(&self, context: &ID3D11DeviceContext) {
            let stride = std::mem::size_of::<ColoredVertex>() as u32;
            let offset = 0u32;
            context.IASetVertexBuffers(0, 1, Some(&Some(self.vertex_buffer.clone())), Some(&stride), Some(&offset));
            context.IASetInputLayout(&self.input_layout);
            context.IASetPrimitiveTopology(D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST);
            context.VSSetShader(&self.vertex_shader, None);
            context.PSSetShader(&self.pixel_shader, None);
            context.Draw(TRIANGLE_VERTICES.len() as u32, 0);
        }
    }
}
