// SPDX-License-Identifier: GPL-3.0-only

//! Per-level noise thresholds derived from the noise level function

use super::params::{DenoiseParameters, NoiseLevelFunction};
use crate::constants::DOWNSAMPLE_VARIANCE_GAIN_1D;

impl NoiseLevelFunction {
    /// Noise variance per channel at `signal`, never negative
    pub fn variance(&self, signal: f32) -> [f32; 3] {
        std::array::from_fn(|c| (self.first[c] + self.second[c] * signal).max(0.0))
    }

    /// Noise standard deviation per channel at `signal`
    pub fn sigma(&self, signal: f32) -> [f32; 3] {
        self.variance(signal).map(f32::sqrt)
    }

    /// Component-wise product of both coefficient vectors with `multipliers`
    pub fn scaled(&self, multipliers: [f32; 3]) -> Self {
        Self {
            first: std::array::from_fn(|c| self.first[c] * multipliers[c]),
            second: std::array::from_fn(|c| self.second[c] * multipliers[c]),
        }
    }
}

/// `[luma, chroma, chroma]`
pub fn threshold_multipliers(parameters: &DenoiseParameters) -> [f32; 3] {
    [parameters.luma, parameters.chroma, parameters.chroma]
}

/// Thresholds consumed by the two per-level kernels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelThresholds {
    /// Scaled NLF for `denoise_image`
    pub denoise: NoiseLevelFunction,
    /// Luma (a, b) for `subtract_noise_image`
    pub subtract: [f32; 2],
}

pub fn level_thresholds(nlf: &NoiseLevelFunction, multipliers: [f32; 3]) -> LevelThresholds {
    let denoise = nlf.scaled(multipliers);
    LevelThresholds {
        denoise,
        subtract: [denoise.first[0], denoise.second[0]],
    }
}

/// Per-level NLFs for a pyramid built from a full-resolution NLF
///
/// White noise passed through the [1, 3, 3, 1] / 8 resampler keeps
/// (20/64)^2 of its variance per level.
pub fn pyramid_nlf(base: &NoiseLevelFunction, levels: usize) -> Vec<NoiseLevelFunction> {
    let gain = DOWNSAMPLE_VARIANCE_GAIN_1D * DOWNSAMPLE_VARIANCE_GAIN_1D;
    std::iter::successors(Some(*base), |nlf| Some(nlf.scaled([gain; 3])))
        .take(levels)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variance_clamps_negative() {
        let nlf = NoiseLevelFunction::new([-0.5, 0.1, 0.0], [0.1, 0.0, 0.2]);
        let v = nlf.variance(1.0);
        assert_eq!(v[0], 0.0);
        assert!((v[1] - 0.1).abs() < 1e-7);
        assert!((v[2] - 0.2).abs() < 1e-7);
    }

    #[test]
    fn test_sigma_is_root_of_variance() {
        let nlf = NoiseLevelFunction::new([0.04, 0.0, 0.0], [0.0; 3]);
        assert!((nlf.sigma(0.7)[0] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_level_thresholds_use_luma_for_subtract() {
        let nlf = NoiseLevelFunction::new([1.0, 2.0, 3.0], [4.0, 5.0, 6.0]);
        let t = level_thresholds(&nlf, [2.0, 0.5, 0.5]);
        assert_eq!(t.denoise.first, [2.0, 1.0, 1.5]);
        assert_eq!(t.denoise.second, [8.0, 2.5, 3.0]);
        assert_eq!(t.subtract, [2.0, 8.0]);
    }

    #[test]
    fn test_pyramid_nlf_decays_per_level() {
        let base = NoiseLevelFunction::new([1.0; 3], [1.0; 3]);
        let levels = pyramid_nlf(&base, 3);
        assert_eq!(levels.len(), 3);
        assert_eq!(levels[0], base);
        let gain = (20.0f32 / 64.0).powi(2);
        assert!((levels[1].first[0] - gain).abs() < 1e-7);
        assert!((levels[2].second[2] - gain * gain).abs() < 1e-7);
    }

    #[test]
    fn test_pyramid_nlf_zero_levels() {
        assert!(pyramid_nlf(&NoiseLevelFunction::ZERO, 0).is_empty());
    }
}
