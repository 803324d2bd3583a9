// HLSL programs embedded at build time, compiled with D3DCompile at start-up.

pub const COLORED_HLSL: &str = include_str!("shaders/colored.hlsl");
pub const QUAD_HLSL: &str = include_str!("shaders/quad.hlsl");
pub const BLUR_HLSL: &str = include_str!("shaders/blur.hlsl");

pub const VS_ENTRY: &str = "VS_Main";
pub const PS_ENTRY: &str = "PS_Main";
pub const CS_ENTRY: &str = "CS_Main";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Pixel,
    Compute,
}

impl ShaderStage {
    pub fn profile(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vs_5_0",
            ShaderStage::Pixel => "ps_5_0",
            ShaderStage::Compute => "cs_5_0",
        }
    }

    pub fn entry_point(self) -> &'static str {
        match self {
            ShaderStage::Vertex => VS_ENTRY,
            ShaderStage::Pixel => PS_ENTRY,
            ShaderStage::Compute => CS_ENTRY,
        }
    }
}

#[cfg(windows)]
pub use gpu::*;

#[cfg(windows)]
mod gpu {
    use super::ShaderStage;
    use anyhow::{anyhow, Result};
    use windows::core::PCSTR;
    use windows::Win32::Graphics::Direct3D::Fxc::*;
    use windows::Win32::Graphics::Direct3D::ID3DBlob;
    use windows::Win32::Graphics::Direct3D11::*;

    pub unsafe fn compile_shader(source: &str, stage: ShaderStage) -> Result<ID3DBlob> {
        let mut blob: Option<ID3DBlob> = None;
        let mut error_blob: Option<ID3DBlob> = None;

        let entry_cstr = std::ffi::CString::new(stage.entry_point())?;
        let target_cstr = std::ffi::CString::new(stage.profile())?;

        let result = D3DCompile(
            source.as_ptr() as *const _,
            source.len(),
            None,
            None,
            None,
            PCSTR(entry_cstr.as_ptr() as *const u8),
            PCSTR(target_cstr.as_ptr() as *const u8),
            D3DCOMPILE_ENABLE_STRICTNESS,
            0,
            &mut blob,
            Some(&mut error_blob),
        );

        if result.is_err() {
            if let Some(error_blob) = error_blob {
                let error_str = String::from_utf8_lossy(blob_bytes(&error_blob));
                return Err(anyhow!("Shader compilation failed: {}", error_str));
            }
            return Err(anyhow!("Shader compilation failed"));
        }

        blob.ok_or_else(|| anyhow!("D3DCompile returned no bytecode"))
    }

    pub unsafe fn blob_bytes(blob: &ID3DBlob) -> &[u8] {
        std::slice::from_raw_parts(blob.GetBufferPointer() as *const u8, blob.GetBufferSize())
    }

    /// Returns the shader together with its bytecode, which the input layout needs.
    pub unsafe fn create_vertex_shader(device: &ID3D11Device, source: &str) -> Result<(ID3D11VertexShader, ID3DBlob)> {
        let blob = compile_shader(source, ShaderStage::Vertex)?;
        let mut shader: Option<ID3D11VertexShader> = None;
        device.CreateVertexShader(blob_bytes(&blob), None, Some(&mut shader))?;
        let shader = shader.ok_or_else(|| anyhow!("CreateVertexShader returned None"))?;
        Ok((shader, blob))
    }

    pub unsafe fn create_pixel_shader(device: &ID3D11Device, source: &str) -> Result<ID3D11PixelShader> {
        let blob = compile_shader(source, ShaderStage::Pixel)?;
        let mut shader: Option<ID3D11PixelShader> = None;
        device.CreatePixelShader(blob_bytes(&blob), None, Some(&mut shader))?;
        shader.ok_or_else(|| anyhow!("CreatePixelShader returned None"))
    }

    pub unsafe fn create_compute_shader(device: &ID3D11Device, source: &str) -> Result<ID3D11ComputeShader> {
        let blob = compile_shader(source, ShaderStage::Compute)?;
        let mut shader: Option<ID3D11ComputeShader> = None;
        device.CreateComputeShader(blob_bytes(&blob), None, Some(&mut shader))?;
        shader.ok_or_else(|| anyhow!("CreateComputeShader returned None"))
    }

    pub unsafe fn create_input_layout(
        device: &ID3D11Device,
        elements: &[D3D11_INPUT_ELEMENT_DESC],
        vs_blob: &ID3DBlob,
    ) -> Result<ID3D11InputLayout> {
        let mut layout: Option<ID3D11InputLayout> = None;
        device.CreateInputLayout(elements, blob_bytes(vs_blob), Some(&mut layout))?;
        layout.ok_or_else(|| anyhow!("CreateInputLayout returned None"))
    }

    pub unsafe fn create_vertex_buffer<T>(device: &ID3D11Device, vertices: &[T]) -> Result<ID3D11Buffer> {
        let vertex_data = D3D11_SUBRESOURCE_DATA {
            pSysMem: vertices.as_ptr() as *const _,
            SysMemPitch: 0,
            SysMemSlicePitch: 0,
        };

        let buffer_desc = D3D11_BUFFER_DESC {
            ByteWidth: std::mem::size_of_val(vertices) as u32,
            Usage: D3D11_USAGE_IMMUTABLE,
            BindFlags: D3D11_BIND_VERTEX_BUFFER.0 as u32,
            CPUAccessFlags: 0,
            MiscFlags: 0,
            StructureByteStride: 0,
        };

        let mut buffer: Option<ID3D11Buffer> = None;
        device.CreateBuffer(&buffer_desc, Some(&vertex_data), Some(&mut buffer))?;
        buffer.ok_or_else(|| anyhow!("CreateBuffer returned None"))
    }
}
