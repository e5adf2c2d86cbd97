// SPDX-License-Identifier: GPL-3.0-only

//! Engine-wide constants

/// Kernel entry point names
///
/// These strings are the binding contract between the Rust side and the WGSL
/// library. Renaming one side without the other fails pipeline construction.
pub mod kernels {
    /// Half-resolution resample of a 4-channel image
    pub const DOWNSAMPLE_IMAGE: &str = "downsample_image";
    /// Half-resolution resample of a 2-channel gradient
    pub const DOWNSAMPLE_GRADIENT: &str = "downsample_gradient";
    /// Edge-aware per-level denoise
    pub const DENOISE_IMAGE: &str = "denoise_image";
    /// Coarse-level noise removal from the next finer level
    pub const SUBTRACT_NOISE_IMAGE: &str = "subtract_noise_image";
}

/// Default pyramid depth used by the CLI and the default config
pub const DEFAULT_PYRAMID_LEVELS: usize = 5;

/// Preferred workgroup edge; clamped to device limits at context creation
pub const PREFERRED_WORKGROUP_EDGE: u32 = 16;

/// Row pitch alignment for texture to buffer copies
pub const COPY_ROW_ALIGNMENT: u32 = 256;

/// Per-axis white-noise variance gain of the separable [1, 3, 3, 1] / 8 resampler
///
/// (1 + 9 + 9 + 1) / 64. The 2D gain is the square of this value.
pub const DOWNSAMPLE_VARIANCE_GAIN_1D: f32 = 20.0 / 64.0;

/// Label used for the compute device
pub const DEVICE_LABEL: &str = "pyramid_denoise_gpu";
