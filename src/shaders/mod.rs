// SPDX-License-Identifier: GPL-3.0-only
//! Kernel library
//!
//! Every kernel lives in its own WGSL file with the shared prelude prepended,
//! so each entry point gets a module whose bindings are exactly its own. The
//! binding list of each [`KernelFunction`] is the contract the Rust side binds
//! against: argument `i` goes to `@binding(i)`.

use crate::constants::kernels;
use crate::errors::ContextError;
use crate::gpu::WorkgroupSize;
use crate::gpu::helpers::BindingKind;
use std::collections::HashMap;
use tracing::{debug, error};

const COMMON_SHADER: &str = include_str!("common.wgsl");

const RGBA_OUT: BindingKind = BindingKind::StorageTexture(wgpu::TextureFormat::Rgba32Float);
const RG_OUT: BindingKind = BindingKind::StorageTexture(wgpu::TextureFormat::Rg32Float);

/// One named kernel and its argument contract
#[derive(Debug)]
pub struct KernelFunction {
    pub name: &'static str,
    source: &'static str,
    pub bindings: &'static [BindingKind],
}

/// Every function the library provides
pub static KERNEL_FUNCTIONS: [KernelFunction; 4] = [
    KernelFunction {
        name: kernels::DOWNSAMPLE_IMAGE,
        source: include_str!("downsample_image.wgsl"),
        bindings: &[BindingKind::Texture, RGBA_OUT],
    },
    KernelFunction {
        name: kernels::DOWNSAMPLE_GRADIENT,
        source: include_str!("downsample_gradient.wgsl"),
        bindings: &[BindingKind::Texture, RG_OUT],
    },
    KernelFunction {
        name: kernels::DENOISE_IMAGE,
        source: include_str!("denoise_image.wgsl"),
        bindings: &[
            BindingKind::Texture,
            BindingKind::Texture,
            RGBA_OUT,
            BindingKind::Uniform,
        ],
    },
    KernelFunction {
        name: kernels::SUBTRACT_NOISE_IMAGE,
        source: include_str!("subtract_noise_image.wgsl"),
        bindings: &[
            BindingKind::Texture,
            BindingKind::Texture,
            BindingKind::Texture,
            BindingKind::Texture,
            RGBA_OUT,
            BindingKind::Uniform,
        ],
    },
];

impl KernelFunction {
    /// Complete WGSL for this function with the workgroup shape baked in
    ///
    /// naga does not accept `override` expressions in `@workgroup_size`, so
    /// the shape is substituted into `{{WORKGROUP_X}}` / `{{WORKGROUP_Y}}`.
    pub fn source(&self, workgroup: WorkgroupSize) -> String {
        format!("{}\n{}", COMMON_SHADER, self.source)
            .replace("{{WORKGROUP_X}}", &workgroup.x.to_string())
            .replace("{{WORKGROUP_Y}}", &workgroup.y.to_string())
    }
}

/// Look up a function by name
pub fn find_function(name: &str) -> Option<&'static KernelFunction> {
    KERNEL_FUNCTIONS.iter().find(|f| f.name == name)
}

/// Compiled shader modules for every library function
pub struct KernelLibrary {
    modules: HashMap<&'static str, wgpu::ShaderModule>,
}

impl KernelLibrary {
    /// Compile every function; the first compile error aborts the load
    pub fn compile(
        device: &wgpu::Device,
        workgroup: WorkgroupSize,
    ) -> Result<Self, ContextError> {
        let mut modules = HashMap::with_capacity(KERNEL_FUNCTIONS.len());

        for function in &KERNEL_FUNCTIONS {
            device.push_error_scope(wgpu::ErrorFilter::Validation);
            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(function.name),
                source: wgpu::ShaderSource::Wgsl(function.source(workgroup).into()),
            });
            if let Some(err) = pollster::block_on(device.pop_error_scope()) {
                error!(kernel = function.name, error = %err, "Kernel failed to compile");
                return Err(ContextError::ShaderCompilation {
                    function: function.name.to_string(),
                    message: err.to_string(),
                });
            }
            debug!(kernel = function.name, "Kernel compiled");
            modules.insert(function.name, module);
        }

        Ok(Self { modules })
    }

    /// Function contract and compiled module for `name`
    pub fn get(&self, name: &str) -> Option<(&'static KernelFunction, &wgpu::ShaderModule)> {
        let function = find_function(name)?;
        let module = self.modules.get(function.name)?;
        Some((function, module))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn function_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        KERNEL_FUNCTIONS
            .iter()
            .map(|f| f.name)
            .filter(|name| self.modules.contains_key(name))
    }
}
