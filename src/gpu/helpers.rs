// SPDX-License-Identifier: GPL-3.0-only
//
// Bind group layout helpers shared by every kernel
//
// Kernels declare their bindings as an ordered list of binding kinds. The
// position in the list is the WGSL @binding slot in group 0.

/// Resource kind expected at one binding slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// Uniform buffer (parameter block or inline scalar)
    Uniform,
    /// `texture_2d<f32>` read through `textureLoad` (float32 formats are not filterable)
    Texture,
    /// `texture_storage_2d<format, write>`
    StorageTexture(wgpu::TextureFormat),
}

impl BindingKind {
    /// True for the kinds bound from a buffer handle
    pub fn is_buffer(&self) -> bool {
        matches!(self, BindingKind::Uniform)
    }
}

/// Create a bind group layout entry with common defaults
pub fn layout_entry(binding: u32, kind: BindingKind) -> wgpu::BindGroupLayoutEntry {
    let ty = match kind {
        BindingKind::Uniform => wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        BindingKind::Texture => wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        BindingKind::StorageTexture(format) => wgpu::BindingType::StorageTexture {
            access: wgpu::StorageTextureAccess::WriteOnly,
            format,
            view_dimension: wgpu::TextureViewDimension::D2,
        },
    };
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty,
        count: None,
    }
}

/// Create a bind group layout from an ordered list of binding kinds
pub fn create_layout(
    device: &wgpu::Device,
    label: &str,
    bindings: &[BindingKind],
) -> wgpu::BindGroupLayout {
    let entries: Vec<_> = bindings
        .iter()
        .enumerate()
        .map(|(i, kind)| layout_entry(i as u32, *kind))
        .collect();
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &entries,
    })
}
