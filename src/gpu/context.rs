// SPDX-License-Identifier: GPL-3.0-only

//! Device context: kernel library, pipeline cache and command buffer lifecycle
//!
//! A context owns exactly one open [`CommandBuffer`] at a time. Kernels are
//! scheduled into it in call order; [`DeviceContext::commit`] submits it and
//! opens a fresh one. Nothing is submitted implicitly.

use super::event::Event;
use super::helpers::create_layout;
use super::kernel::{Kernel, KernelArgument, WorkgroupSize};
use super::{GpuDeviceInfo, create_compute_device};
use crate::errors::ContextError;
use crate::shaders::{KernelFunction, KernelLibrary};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

/// Pipeline and layout for one library function, shared by every kernel using it
#[derive(Clone)]
pub struct PipelineState {
    pub pipeline: wgpu::ComputePipeline,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub function: &'static KernelFunction,
    pub workgroup: WorkgroupSize,
}

/// An open command encoder plus the event values recorded into it
pub struct CommandBuffer {
    encoder: wgpu::CommandEncoder,
    index: u64,
    dispatches: usize,
    first_wait: Option<u64>,
    last_signal: Option<u64>,
}

impl CommandBuffer {
    fn new(device: &wgpu::Device, index: u64) -> Self {
        let encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("pyramid_denoise_commands"),
        });
        Self {
            encoder,
            index,
            dispatches: 0,
            first_wait: None,
            last_signal: None,
        }
    }

    /// Raw encoder, for copies recorded alongside the dispatches
    pub fn encoder(&mut self) -> &mut wgpu::CommandEncoder {
        &mut self.encoder
    }

    /// Sequence number of this buffer within its context
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn dispatch_count(&self) -> usize {
        self.dispatches
    }

    pub fn is_empty(&self) -> bool {
        self.dispatches == 0
    }

    pub(crate) fn record_wait(&mut self, value: u64) {
        self.first_wait.get_or_insert(value);
        self.encoder.insert_debug_marker(&format!("wait {value}"));
    }

    pub(crate) fn record_signal(&mut self, value: u64) {
        self.last_signal = Some(value);
        self.encoder.insert_debug_marker(&format!("signal {value}"));
    }
}

/// Owns the device, queue, kernel library and the open command buffer
pub struct DeviceContext {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    info: Option<GpuDeviceInfo>,
    library: KernelLibrary,
    pipelines: HashMap<&'static str, PipelineState>,
    workgroup: WorkgroupSize,
    command_buffer: CommandBuffer,
    event: Event,
}

impl DeviceContext {
    /// Acquire the default compute device and load the kernel library
    pub async fn new(label: &str) -> Result<Self, ContextError> {
        let (device, queue, info) = create_compute_device(label).await?;
        let mut context = Self::from_device(device, queue)?;
        context.info = Some(info);
        Ok(context)
    }

    /// Wrap an existing device; compiles every library function up front
    pub fn from_device(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
    ) -> Result<Self, ContextError> {
        let start = Instant::now();
        let workgroup = WorkgroupSize::for_limits(&device.limits());
        let library = KernelLibrary::compile(&device, workgroup)?;
        let command_buffer = CommandBuffer::new(&device, 0);

        info!(
            workgroup = %workgroup,
            functions = library.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Device context ready"
        );

        Ok(Self {
            device,
            queue,
            info: None,
            library,
            pipelines: HashMap::new(),
            workgroup,
            command_buffer,
            event: Event::new(),
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Adapter details, when the context created its own device
    pub fn info(&self) -> Option<&GpuDeviceInfo> {
        self.info.as_ref()
    }

    pub fn workgroup_size(&self) -> WorkgroupSize {
        self.workgroup
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn library(&self) -> &KernelLibrary {
        &self.library
    }

    /// The currently open command buffer
    pub fn command_buffer(&mut self) -> &mut CommandBuffer {
        &mut self.command_buffer
    }

    /// Resolve a library function to a compute pipeline
    ///
    /// Pipelines are cached by name, so building the same kernel for every
    /// pyramid level compiles it once.
    pub fn build_kernel_pipeline_state(
        &mut self,
        name: &str,
    ) -> Result<PipelineState, ContextError> {
        if let Some(state) = self.pipelines.get(name) {
            return Ok(state.clone());
        }

        let Some((function, module)) = self.library.get(name) else {
            error!(kernel = name, "Kernel function not found in library");
            return Err(ContextError::UnknownFunction(name.to_string()));
        };

        let bind_group_layout =
            create_layout(&self.device, &format!("{}_layout", name), function.bindings);
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(name),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = self
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(name),
                layout: Some(&pipeline_layout),
                module,
                entry_point: Some(function.name),
                compilation_options: Default::default(),
                cache: None,
            });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            error!(kernel = name, error = %err, "Pipeline creation failed");
            return Err(ContextError::PipelineCreation {
                function: name.to_string(),
                message: err.to_string(),
            });
        }

        debug!(kernel = name, workgroup = %self.workgroup, "Pipeline created");

        let state = PipelineState {
            pipeline,
            bind_group_layout,
            function,
            workgroup: self.workgroup,
        };
        self.pipelines.insert(function.name, state.clone());
        Ok(state)
    }

    /// Append one dispatch of `kernel` to the open command buffer
    ///
    /// The dispatch waits on the event's current value and signals the next,
    /// so it sees every write scheduled before it on this context.
    pub fn schedule_kernel(&mut self, kernel: &Kernel, arguments: &[KernelArgument<'_>]) {
        self.event.wait(&mut self.command_buffer);
        {
            let mut pass =
                self.command_buffer
                    .encoder
                    .begin_compute_pass(&wgpu::ComputePassDescriptor {
                        label: Some(kernel.name()),
                        timestamp_writes: None,
                    });
            let bind_group = kernel.bind_arguments(&self.device, arguments);
            kernel.encode(&mut pass, &bind_group);
        }
        self.command_buffer.dispatches += 1;
        let value = self.event.signal(&mut self.command_buffer);

        trace!(
            kernel = kernel.name(),
            signal = value,
            buffer = self.command_buffer.index,
            "Kernel scheduled"
        );
    }

    /// Submit the open command buffer and start a new one
    ///
    /// Returns the event value that marks the end of the submitted work.
    pub fn commit(&mut self) -> u64 {
        let next = CommandBuffer::new(&self.device, self.command_buffer.index + 1);
        let committed = std::mem::replace(&mut self.command_buffer, next);
        let value = self.event.signaled_value();

        debug!(
            buffer = committed.index,
            dispatches = committed.dispatches,
            first_wait = ?committed.first_wait,
            signal = ?committed.last_signal,
            "Committing command buffer"
        );

        self.queue.submit(std::iter::once(committed.encoder.finish()));
        self.event.complete_on_submission(&self.queue, value);
        value
    }

    /// Block until every committed command buffer has finished executing
    pub fn wait_until_completed(&self) {
        if let Err(e) = self.device.poll(wgpu::PollType::wait_indefinitely()) {
            warn!(error = ?e, "Device poll failed while waiting for completion");
        }
    }

    /// Commit, then block until the GPU is idle
    pub fn commit_and_wait(&mut self) -> u64 {
        let value = self.commit();
        self.wait_until_completed();
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::kernels;
    use crate::gpu::{GpuImage, GridSize, PixelFormat};

    async fn test_context() -> Option<DeviceContext> {
        match DeviceContext::new("context_test").await {
            Ok(context) => Some(context),
            Err(e) => {
                println!("Skipping test (no GPU): {}", e);
                None
            }
        }
    }

    #[tokio::test]
    async fn test_unknown_kernel_is_rejected() {
        let Some(mut context) = test_context().await else {
            return;
        };
        let result = context.build_kernel_pipeline_state("sharpen_image");
        assert!(matches!(result, Err(ContextError::UnknownFunction(ref n)) if n == "sharpen_image"));
    }

    #[tokio::test]
    async fn test_pipeline_state_is_cached() {
        let Some(mut context) = test_context().await else {
            return;
        };
        context
            .build_kernel_pipeline_state(kernels::DENOISE_IMAGE)
            .unwrap();
        context
            .build_kernel_pipeline_state(kernels::DENOISE_IMAGE)
            .unwrap();
        assert_eq!(context.pipelines.len(), 1);
    }

    #[tokio::test]
    async fn test_wait_with_nothing_committed_returns() {
        let Some(mut context) = test_context().await else {
            return;
        };
        context.wait_until_completed();
        assert_eq!(context.commit_and_wait(), 0);
        assert!(context.event().is_complete(0));
    }

    #[tokio::test]
    async fn test_commit_rotates_command_buffer() {
        let Some(mut context) = test_context().await else {
            return;
        };
        let source = GpuImage::new(context.device(), "source", 8, 8, PixelFormat::Rgba32Float);
        let target = GpuImage::new(context.device(), "target", 4, 4, PixelFormat::Rgba32Float);
        let kernel = Kernel::new(
            &mut context,
            kernels::DOWNSAMPLE_IMAGE,
            GridSize::new_2d(4, 4),
        )
        .unwrap();

        assert!(context.command_buffer().is_empty());
        context.schedule_kernel(&kernel, &[(&source).into(), (&target).into()]);
        context.schedule_kernel(&kernel, &[(&source).into(), (&target).into()]);
        assert_eq!(context.command_buffer().dispatch_count(), 2);
        assert_eq!(context.event().signaled_value(), 2);
        assert_eq!(context.event().waited_value(), 1);

        let value = context.commit_and_wait();
        assert_eq!(value, 2);
        assert_eq!(context.command_buffer().index(), 1);
        assert!(context.command_buffer().is_empty());
    }
}
