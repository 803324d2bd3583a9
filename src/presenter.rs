#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TexturedVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

/// Triangle strip covering clip space; v grows downwards.
pub const QUAD_VERTICES: [TexturedVertex; 4] = [
    TexturedVertex { position: [-1.0, -1.0, 0.0], uv: [0.0, 1.0] },
    TexturedVertex { position: [-1.0, 1.0, 0.0], uv: [0.0, 0.0] },
    TexturedVertex { position: [1.0, -1.0, 0.0], uv: [1.0, 1.0] },
    TexturedVertex { position: [1.0, 1.0, 0.0], uv: [1.0, 0.0] },
];

#[cfg(windows)]
pub use gpu::QuadPresenter;

#[cfg(windows)]
mod gpu {
    use super::*;
    use crate::binding::{BindStep, Binder, Target};
    use crate::error::InitError;
    use crate::shader::{create_input_layout, create_pixel_shader, create_vertex_buffer, create_vertex_shader, QUAD_HLSL};
    use anyhow::anyhow;
    use windows::core::s;
    use windows::Win32::Graphics::Direct3D::D3D_PRIMITIVE_TOPOLOGY_TRIANGLESTRIP;
    use windows::Win32::Graphics::Direct3D11::*;
    use windows::Win32::Graphics::Dxgi::Common::*;

    pub struct QuadPresenter {
        vertex_buffer: ID3D11Buffer,
        input_layout: ID3D11InputLayout,
        vertex_shader: ID3D11VertexShader,
        pixel_shader: ID3D11PixelShader,
        sampler_state: ID3D11SamplerState,
    }

    impl QuadPresenter {
        pub unsafe fn new(device: &ID3D11Device) -> Result<Self, InitError> {
            let shader_err = |source| InitError::Shader { name: "quad", source };
            let (vertex_shader, vs_blob) = create_vertex_shader(device, QUAD_HLSL).map_err(shader_err)?;
            let pixel_shader = create_pixel_shader(device, QUAD_HLSL).map_err(shader_err)?;

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
                    SemanticName: s!("TEXCOORD"),
                    SemanticIndex: 0,
                    Format: DXGI_FORMAT_R32G32_FLOAT,
                    InputSlot: 0,
                    AlignedByteOffset: 12,
                    InputSlotClass: D3D11_INPUT_PER_VERTEX_DATA,
                    InstanceDataStepRate: 0,
                },
            ];

            let input_layout = create_input_layout(device, &input_elements, &vs_blob).map_err(InitError::Pipeline)?;
            let vertex_buffer = create_vertex_buffer(device, &QUAD_VERTICES).map_err(InitError::Pipeline)?;

            let sampler_desc = D3D11_SAMPLER_DESC {
                Filter: D3D11_FILTER_MIN_MAG_MIP_LINEAR,
                AddressU: D3D11_TEXTURE_ADDRESS_CLAMP,
                AddressV: D3D11_TEXTURE_ADDRESS_CLAMP,
                AddressW: D3D11_TEXTURE_ADDRESS_CLAMP,
                MipLODBias: 0.0,
                MaxAnisotropy: 1,
                ComparisonFunc: D3D11_COMPARISON_NEVER,
                BorderColor: [0.0, 0.0, 0.0, 0.0],
                MinLOD: 0.0,
                MaxLOD: f32::MAX,
            };

            let mut sampler_state: Option<ID3D11SamplerState> = None;
            device
                .CreateSamplerState(&sampler_desc, Some(&mut sampler_state))
                .map_err(|e| InitError::Pipeline(e.into()))?;
            let sampler_state =
                sampler_state.ok_or_else(|| InitError::Pipeline(anyhow!("CreateSamplerState returned None")))?;

            Ok(Self {
                vertex_buffer,
                input_layout,
                vertex_shader,
                pixel_shader,
                sampler_state,
            })
        }

        /// Samples `source` across the bound render target, which must be the back buffer.
        pub unsafe fn draw(&self, binder: &mut Binder, source: Target) {
            binder.apply(BindStep::PixelResource(source));

            let context = binder.context();
            let stride = std::mem::size_of::<TexturedVertex>() as u32;
            let offset = 0u32;
            context.IASetVertexBuffers(0, 1, Some(&Some(self.vertex_buffer.clone())), Some(&stride), Some(&offset));
            context.IASetInputLayout(&self.input_layout);
            context.IASetPrimitiveTopology(D3D_PRIMITIVE_TOPOLOGY_TRIANGLESTRIP);
            context.VSSetShader(&self.vertex_shader, None);
            context.PSSetShader(&self.pixel_shader, None);
            context.PSSetSamplers(0, Some(&[Some(self.sampler_state.clone())]));
            context.Draw(QUAD_VERTICES.len() as u32, 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_matches_input_elements() {
        assert_eq!(std::mem::size_of::<TexturedVertex>(), 20);
        assert_eq!(std::mem::offset_of!(TexturedVertex, uv), 12);
    }

    #[test]
    fn uv_maps_texture_top_left_to_screen_top_left() {
        for vertex in QUAD_VERTICES {
            let [x, y, _] = vertex.position;
            assert_eq!(vertex.uv[0], (x + 1.0) / 2.0);
            assert_eq!(vertex.uv[1], (1.0 - y) / 2.0);
        }
    }

    #[test]
    fn strip_order_covers_each_corner_once() {
        let mut corners: Vec<(i32, i32)> = QUAD_VERTICES
            .iter()
            .map(|v| (v.position[0] as i32, v.position[1] as i32))
            .collect();
        corners.sort();
        corners.dedup();
        assert_eq!(corners, vec![(-1, -1), (-1, 1), (1, -1), (1, 1)]);
    }
}
