// SPDX-License-Identifier: GPL-3.0-only

//! Compiled kernels and typed argument binding
//!
//! A [`Kernel`] is one library function resolved to a pipeline, plus the fixed
//! grid it is dispatched over. Arguments are passed per dispatch as an ordered
//! slice of [`KernelArgument`]s; argument `i` binds to `@binding(i)` of group 0.

use super::context::{DeviceContext, PipelineState};
use super::helpers::BindingKind;
use super::image::GpuImage;
use crate::constants::PREFERRED_WORKGROUP_EDGE;
use crate::errors::ContextError;
use std::marker::PhantomData;
use tracing::trace;
use wgpu::util::DeviceExt;

/// Dispatch grid in threads (not workgroups)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSize {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl GridSize {
    /// Grid covering one 2D image
    pub fn new_2d(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depth: 1,
        }
    }
}

/// Threads per workgroup, baked into each kernel source at library load
///
/// ```wgsl
/// @compute @workgroup_size({{WORKGROUP_X}}, {{WORKGROUP_Y}}, 1)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkgroupSize {
    pub x: u32,
    pub y: u32,
}

impl WorkgroupSize {
    /// Total invocations per workgroup (x * y)
    pub fn total(&self) -> u32 {
        self.x * self.y
    }

    /// Largest 2D shape up to 16×16 that fits the device's invocation budget
    pub fn for_limits(limits: &wgpu::Limits) -> Self {
        let x = PREFERRED_WORKGROUP_EDGE
            .min(limits.max_compute_workgroup_size_x)
            .max(1);
        let y = (limits.max_compute_invocations_per_workgroup / x)
            .min(PREFERRED_WORKGROUP_EDGE)
            .min(limits.max_compute_workgroup_size_y)
            .max(1);
        Self { x, y }
    }

    /// Workgroups needed to cover `grid`; partial groups are bounds-checked in WGSL
    pub fn workgroups_for(&self, grid: GridSize) -> (u32, u32, u32) {
        (
            grid.width.div_ceil(self.x),
            grid.height.div_ceil(self.y),
            grid.depth.max(1),
        )
    }
}

impl std::fmt::Display for WorkgroupSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} ({} invocations)", self.x, self.y, self.total())
    }
}

/// One argument of a kernel dispatch
#[derive(Debug, Clone, Copy)]
pub enum KernelArgument<'a> {
    /// POD bytes copied by value into an inline uniform for this dispatch
    Scalar(&'a [u8]),
    /// Buffer handle (uniform parameter block)
    Buffer(&'a wgpu::Buffer),
    /// Texture handle, read or written depending on the slot's binding kind
    Texture(&'a wgpu::TextureView),
}

impl<'a> KernelArgument<'a> {
    /// Pass a `#[repr(C)]` value inline
    pub fn scalar<T: bytemuck::Pod>(value: &'a T) -> Self {
        KernelArgument::Scalar(bytemuck::bytes_of(value))
    }

    fn matches(&self, kind: BindingKind) -> bool {
        match self {
            KernelArgument::Scalar(_) | KernelArgument::Buffer(_) => kind.is_buffer(),
            KernelArgument::Texture(_) => !kind.is_buffer(),
        }
    }
}

impl<'a> From<&'a GpuImage> for KernelArgument<'a> {
    fn from(image: &'a GpuImage) -> Self {
        KernelArgument::Texture(image.view())
    }
}

impl<'a, T: bytemuck::Pod> From<&'a ParameterBlock<T>> for KernelArgument<'a> {
    fn from(block: &'a ParameterBlock<T>) -> Self {
        KernelArgument::Buffer(block.buffer())
    }
}

/// Uniform buffer holding one parameter struct
///
/// Written through a mapped-at-creation range, so no copy pass is needed before
/// the GPU reads it. wgpu retains the allocation until every dispatch that
/// references it has completed, even if this handle is dropped first.
pub struct ParameterBlock<T: bytemuck::Pod> {
    buffer: wgpu::Buffer,
    _marker: PhantomData<T>,
}

impl<T: bytemuck::Pod> ParameterBlock<T> {
    pub fn new(device: &wgpu::Device, label: &str, value: &T) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: &uniform_bytes(bytemuck::bytes_of(value)),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        Self {
            buffer,
            _marker: PhantomData,
        }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

/// Pad to a 16-byte multiple, the uniform struct size granularity
fn uniform_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut padded = bytes.to_vec();
    padded.resize(bytes.len().next_multiple_of(16).max(16), 0);
    padded
}

/// A resolved argument, owning the inline uniform when one was needed
enum BoundResource<'a> {
    Inline(wgpu::Buffer),
    Buffer(&'a wgpu::Buffer),
    Texture(&'a wgpu::TextureView),
}

impl BoundResource<'_> {
    fn as_binding(&self) -> wgpu::BindingResource<'_> {
        match self {
            BoundResource::Inline(buffer) => buffer.as_entire_binding(),
            BoundResource::Buffer(buffer) => buffer.as_entire_binding(),
            BoundResource::Texture(view) => wgpu::BindingResource::TextureView(view),
        }
    }
}

/// One compiled kernel function with fixed dispatch geometry
pub struct Kernel {
    state: PipelineState,
    grid: GridSize,
}

impl Kernel {
    /// Resolve `name` through the context's library once
    pub fn new(
        context: &mut DeviceContext,
        name: &str,
        grid: GridSize,
    ) -> Result<Self, ContextError> {
        let state = context.build_kernel_pipeline_state(name)?;
        Ok(Self { state, grid })
    }

    pub fn name(&self) -> &'static str {
        self.state.function.name
    }

    pub fn grid(&self) -> GridSize {
        self.grid
    }

    pub fn workgroup_size(&self) -> WorkgroupSize {
        self.state.workgroup
    }

    /// Bind one argument at slot `index`
    ///
    /// Scalars are copied into a fresh uniform; buffers and textures bind their
    /// handle. A kind that disagrees with the kernel's contract is a programming
    /// error and panics.
    fn set_parameter<'a>(
        &self,
        device: &wgpu::Device,
        argument: &KernelArgument<'a>,
        index: usize,
    ) -> BoundResource<'a> {
        let kind = self.state.function.bindings[index];
        assert!(
            argument.matches(kind),
            "kernel '{}' slot {} expects {:?}, got {:?}",
            self.name(),
            index,
            kind,
            argument
        );
        match *argument {
            KernelArgument::Scalar(bytes) => {
                BoundResource::Inline(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(self.name()),
                    contents: &uniform_bytes(bytes),
                    usage: wgpu::BufferUsages::UNIFORM,
                }))
            }
            KernelArgument::Buffer(buffer) => BoundResource::Buffer(buffer),
            KernelArgument::Texture(view) => BoundResource::Texture(view),
        }
    }

    /// Build the bind group for one dispatch from the ordered argument list
    pub fn bind_arguments(
        &self,
        device: &wgpu::Device,
        arguments: &[KernelArgument<'_>],
    ) -> wgpu::BindGroup {
        assert_eq!(
            arguments.len(),
            self.state.function.bindings.len(),
            "kernel '{}' takes {} arguments",
            self.name(),
            self.state.function.bindings.len()
        );

        let bound: Vec<_> = arguments
            .iter()
            .enumerate()
            .map(|(index, argument)| self.set_parameter(device, argument, index))
            .collect();
        let entries: Vec<_> = bound
            .iter()
            .enumerate()
            .map(|(index, resource)| wgpu::BindGroupEntry {
                binding: index as u32,
                resource: resource.as_binding(),
            })
            .collect();

        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(self.name()),
            layout: &self.state.bind_group_layout,
            entries: &entries,
        })
    }

    /// Bind the pipeline and arguments, then dispatch the full grid
    pub fn encode(&self, pass: &mut wgpu::ComputePass<'_>, bind_group: &wgpu::BindGroup) {
        pass.set_pipeline(&self.state.pipeline);
        pass.set_bind_group(0, Some(bind_group), &[]);
        self.dispatch_threads(pass);
    }

    /// Dispatch enough workgroups to cover exactly this kernel's grid
    pub fn dispatch_threads(&self, pass: &mut wgpu::ComputePass<'_>) {
        let (x, y, z) = self.state.workgroup.workgroups_for(self.grid);
        trace!(kernel = self.name(), x, y, z, "Dispatching workgroups");
        pass.dispatch_workgroups(x, y, z);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workgroup_size_default_limits() {
        let ws = WorkgroupSize::for_limits(&wgpu::Limits::default());
        // Default budget is 256 invocations, exactly 16×16
        assert_eq!(ws, WorkgroupSize { x: 16, y: 16 });
        assert_eq!(ws.total(), 256);
    }

    #[test]
    fn test_workgroup_size_respects_small_budget() {
        let limits = wgpu::Limits {
            max_compute_invocations_per_workgroup: 64,
            ..wgpu::Limits::default()
        };
        let ws = WorkgroupSize::for_limits(&limits);
        assert_eq!(ws.x, 16);
        assert_eq!(ws.y, 4);
        assert!(ws.total() <= 64);
    }

    #[test]
    fn test_workgroup_size_respects_axis_limit() {
        let limits = wgpu::Limits {
            max_compute_workgroup_size_x: 8,
            ..wgpu::Limits::default()
        };
        let ws = WorkgroupSize::for_limits(&limits);
        assert_eq!(ws.x, 8);
        assert_eq!(ws.y, 16);
    }

    #[test]
    fn test_workgroups_cover_partial_groups() {
        let ws = WorkgroupSize { x: 16, y: 16 };
        assert_eq!(ws.workgroups_for(GridSize::new_2d(64, 64)), (4, 4, 1));
        // 100 / 16 = 6.25, the last group is partially out of bounds
        assert_eq!(ws.workgroups_for(GridSize::new_2d(100, 33)), (7, 3, 1));
        assert_eq!(ws.workgroups_for(GridSize::new_2d(1, 1)), (1, 1, 1));
    }

    #[test]
    fn test_workgroup_display() {
        let ws = WorkgroupSize { x: 16, y: 8 };
        assert_eq!(ws.to_string(), "16x8 (128 invocations)");
    }

    #[test]
    fn test_uniform_bytes_padding() {
        assert_eq!(uniform_bytes(&[1, 2, 3, 4]).len(), 16);
        assert_eq!(uniform_bytes(&[0; 16]).len(), 16);
        assert_eq!(uniform_bytes(&[0; 40]).len(), 48);
        let padded = uniform_bytes(&[7; 4]);
        assert_eq!(&padded[..4], &[7; 4]);
        assert!(padded[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_scalar_argument_carries_value_bytes() {
        let value = [1.0f32, 2.0];
        match KernelArgument::scalar(&value) {
            KernelArgument::Scalar(bytes) => {
                assert_eq!(bytes.len(), 8);
                assert_eq!(bytemuck::cast_slice::<u8, f32>(bytes), &[1.0, 2.0]);
            }
            other => panic!("unexpected argument {:?}", other),
        }
    }

    #[test]
    fn test_argument_kind_matching() {
        let value = 0u32;
        let scalar = KernelArgument::scalar(&value);
        assert!(scalar.matches(BindingKind::Uniform));
        assert!(!scalar.matches(BindingKind::Texture));
        assert!(!scalar.matches(BindingKind::StorageTexture(
            wgpu::TextureFormat::Rgba32Float
        )));
    }
}
