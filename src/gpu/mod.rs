// SPDX-License-Identifier: GPL-3.0-only

//! GPU execution layer
//!
//! - [`context`]: device context, command buffer lifecycle and kernel scheduling
//! - [`event`]: signal counter ordering dispatches on one context
//! - [`kernel`]: compiled kernels, typed arguments and parameter blocks
//! - [`image`]: image and gradient textures with host upload/readback
//! - [`helpers`]: bind group layout construction from binding kinds

pub mod context;
pub mod event;
pub mod helpers;
pub mod image;
pub mod kernel;

pub use context::{CommandBuffer, DeviceContext};
pub use event::Event;
pub use image::{GpuImage, PixelFormat};
pub use kernel::{GridSize, Kernel, KernelArgument, ParameterBlock, WorkgroupSize};

use crate::errors::ContextError;
use std::sync::Arc;
use tracing::{debug, info};

/// Information about the created GPU device
#[derive(Debug, Clone)]
pub struct GpuDeviceInfo {
    /// Name of the GPU adapter
    pub adapter_name: String,
    /// Backend being used (Vulkan, Metal, DX12, etc.)
    pub backend: wgpu::Backend,
    /// Adapter class (discrete, integrated, software)
    pub device_type: wgpu::DeviceType,
}

/// Create a wgpu device and queue for compute work.
///
/// Requests the adapter's own limits so the workgroup shape can use the full
/// invocation budget the hardware reports.
pub async fn create_compute_device(
    label: &str,
) -> Result<(Arc<wgpu::Device>, Arc<wgpu::Queue>, GpuDeviceInfo), ContextError> {
    info!(label = label, "Creating GPU device for compute");

    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::VULKAN,
        ..Default::default()
    });

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .map_err(|_| ContextError::NoAdapter)?;

    let adapter_info = adapter.get_info();
    let adapter_limits = adapter.limits();

    info!(
        adapter = %adapter_info.name,
        backend = ?adapter_info.backend,
        device_type = ?adapter_info.device_type,
        "GPU adapter selected for compute"
    );

    debug!(
        max_invocations = adapter_limits.max_compute_invocations_per_workgroup,
        max_texture_2d = adapter_limits.max_texture_dimension_2d,
        "Adapter compute limits"
    );

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some(label),
            required_features: wgpu::Features::empty(),
            required_limits: adapter_limits,
            memory_hints: wgpu::MemoryHints::Performance,
            ..Default::default()
        })
        .await
        .map_err(|e| ContextError::DeviceRequest(e.to_string()))?;

    let info = GpuDeviceInfo {
        adapter_name: adapter_info.name.clone(),
        backend: adapter_info.backend,
        device_type: adapter_info.device_type,
    };

    Ok((Arc::new(device), Arc::new(queue), info))
}
