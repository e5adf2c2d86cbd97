// SPDX-License-Identifier: MPL-2.0

//! Integration tests for constants module

use pyramid_denoise::constants::{self, kernels};
use pyramid_denoise::shaders::{KERNEL_FUNCTIONS, find_function};

#[test]
fn test_every_kernel_name_is_in_library() {
    for name in [
        kernels::DOWNSAMPLE_IMAGE,
        kernels::DOWNSAMPLE_GRADIENT,
        kernels::DENOISE_IMAGE,
        kernels::SUBTRACT_NOISE_IMAGE,
    ] {
        assert!(find_function(name).is_some(), "{} missing from library", name);
    }
    assert_eq!(KERNEL_FUNCTIONS.len(), 4);
}

#[test]
fn test_kernel_argument_counts() {
    // Contract: downsample (in, out), denoise (in, gradient, out, params),
    // subtract (level, coarse, coarse denoised, gradient, out, params)
    let count = |name| find_function(name).map(|f| f.bindings.len());
    assert_eq!(count(kernels::DOWNSAMPLE_IMAGE), Some(2));
    assert_eq!(count(kernels::DOWNSAMPLE_GRADIENT), Some(2));
    assert_eq!(count(kernels::DENOISE_IMAGE), Some(4));
    assert_eq!(count(kernels::SUBTRACT_NOISE_IMAGE), Some(6));
}

#[test]
fn test_downsample_variance_gain() {
    // Sum of squared [1, 3, 3, 1] / 8 taps
    let taps = [1.0f32, 3.0, 3.0, 1.0].map(|t| t / 8.0);
    let gain: f32 = taps.iter().map(|t| t * t).sum();
    assert!((gain - constants::DOWNSAMPLE_VARIANCE_GAIN_1D).abs() < 1e-7);
}

#[test]
fn test_copy_alignment_matches_wgpu() {
    assert_eq!(constants::COPY_ROW_ALIGNMENT, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
}
