// SPDX-License-Identifier: GPL-3.0-only

//! Caller-facing denoise parameters and the GPU parameter structs they feed
//!
//! The `#[repr(C)]` structs must match the WGSL layouts in
//! `denoise_image.wgsl` and `subtract_noise_image.wgsl` byte for byte.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Signal-dependent noise variance per channel: `first[c] + second[c] * signal`
///
/// Channels are luma, Cb and Cr. The signal is always the luma value.
///
/// Calibrated fits may carry a negative intercept. Scaling such a function
/// lowers that coefficient, so threshold monotonicity holds for the clamped
/// [`variance`](Self::variance) rather than for the raw coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NoiseLevelFunction {
    pub first: [f32; 3],
    pub second: [f32; 3],
}

impl NoiseLevelFunction {
    pub const fn new(first: [f32; 3], second: [f32; 3]) -> Self {
        Self { first, second }
    }

    /// No noise on any channel
    pub const ZERO: Self = Self::new([0.0; 3], [0.0; 3]);
}

/// Per-level tuning supplied with every denoise call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DenoiseParameters {
    /// Luma threshold multiplier
    pub luma: f32,
    /// Chroma threshold multiplier
    pub chroma: f32,
    /// Extra chroma smoothing
    pub chroma_boost: f32,
    /// How strongly edges reduce luma smoothing
    pub gradient_boost: f32,
    /// Edge detection threshold, in units of the luma noise sigma
    pub gradient_threshold: f32,
    /// Detail gain applied when rebuilding a level from the coarser one
    pub sharpening: f32,
}

impl Default for DenoiseParameters {
    fn default() -> Self {
        Self {
            luma: 1.0,
            chroma: 1.0,
            chroma_boost: 1.0,
            gradient_boost: 0.0,
            gradient_threshold: 1.0,
            sharpening: 1.0,
        }
    }
}

/// Uniform for `denoise_image`
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct DenoiseImageParams {
    pub nlf_first: [f32; 4],
    pub nlf_second: [f32; 4],
    pub chroma_boost: f32,
    pub gradient_boost: f32,
    pub gradient_threshold: f32,
    pub _padding: f32,
}

const _: () = assert!(std::mem::size_of::<DenoiseImageParams>() == 48);

impl DenoiseImageParams {
    pub fn new(nlf: &NoiseLevelFunction, parameters: &DenoiseParameters) -> Self {
        let [a0, a1, a2] = nlf.first;
        let [b0, b1, b2] = nlf.second;
        Self {
            nlf_first: [a0, a1, a2, 0.0],
            nlf_second: [b0, b1, b2, 0.0],
            chroma_boost: parameters.chroma_boost,
            gradient_boost: parameters.gradient_boost,
            gradient_threshold: parameters.gradient_threshold,
            _padding: 0.0,
        }
    }
}

/// Uniform for `subtract_noise_image`, passed inline
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SubtractNoiseParams {
    /// Luma (a, b) of the scaled noise level function
    pub nlf: [f32; 2],
    pub sharpening: f32,
    pub _padding: f32,
}

const _: () = assert!(std::mem::size_of::<SubtractNoiseParams>() == 16);

impl SubtractNoiseParams {
    pub fn new(nlf: [f32; 2], sharpening: f32) -> Self {
        Self {
            nlf,
            sharpening,
            _padding: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parameters() {
        let p = DenoiseParameters::default();
        assert_eq!(
            [p.luma, p.chroma, p.chroma_boost, p.gradient_boost, p.gradient_threshold, p.sharpening],
            [1.0, 1.0, 1.0, 0.0, 1.0, 1.0]
        );
    }

    #[test]
    fn test_denoise_params_layout() {
        let nlf = NoiseLevelFunction::new([1.0, 2.0, 3.0], [4.0, 5.0, 6.0]);
        let params = DenoiseParameters {
            chroma_boost: 2.0,
            gradient_boost: 0.5,
            gradient_threshold: 3.0,
            ..Default::default()
        };
        let gpu = DenoiseImageParams::new(&nlf, &params);
        let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&gpu));
        assert_eq!(
            floats,
            &[1.0, 2.0, 3.0, 0.0, 4.0, 5.0, 6.0, 0.0, 2.0, 0.5, 3.0, 0.0]
        );
    }

    #[test]
    fn test_partial_parameters_deserialize_with_defaults() {
        let p: DenoiseParameters = serde_json::from_str(r#"{"luma": 2.5}"#).unwrap();
        assert_eq!(p.luma, 2.5);
        assert_eq!(p.chroma, 1.0);
        assert_eq!(p.gradient_boost, 0.0);
    }
}
