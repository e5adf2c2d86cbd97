// SPDX-License-Identifier: GPL-3.0-only
//! Multiscale pyramid denoiser
//!
//! The input is repeatedly halved, the coarsest level is denoised, and every
//! finer level is rebuilt from the denoised level below it before being
//! denoised itself. Every step is a GPU kernel scheduled on one
//! [`DeviceContext`]; a whole call is recorded without blocking the CPU.
//!
//! # Pipeline Overview
//!
//! ```text
//! level 0 ──downsample──▶ level 1 ──downsample──▶ … ──▶ level N-1
//!                                                          │
//!                                                       denoise
//!                                                          │
//! level N-2 ──subtract_noise(level N-2, denoised N-1)──▶ subtracted N-2
//!                                                          │
//!                                                       denoise
//!                                                          ⋮
//! level 0 ──subtract_noise(level 0, denoised 1)────────▶ subtracted 0
//!                                                          │
//!                                                       denoise ──▶ output
//! ```

pub mod noise_model;
pub mod observer;
pub mod params;

pub use noise_model::{LevelThresholds, level_thresholds, pyramid_nlf, threshold_multipliers};
pub use observer::{ImageDumpObserver, PyramidObserver, PyramidStage};
pub use params::{DenoiseImageParams, DenoiseParameters, NoiseLevelFunction, SubtractNoiseParams};

use crate::constants::kernels;
use crate::errors::ContextError;
use crate::gpu::{
    DeviceContext, GpuImage, GridSize, Kernel, KernelArgument, ParameterBlock, PixelFormat,
};
use std::time::Instant;
use tracing::{debug, info};

/// Dimensions of every pyramid level, finest first
pub fn level_dimensions(width: u32, height: u32, levels: usize) -> Vec<(u32, u32)> {
    (0..levels).map(|i| (width >> i, height >> i)).collect()
}

/// Deepest pyramid for which every level is at least 1×1
pub fn max_levels(width: u32, height: u32) -> usize {
    let smallest = width.min(height);
    if smallest == 0 {
        0
    } else {
        smallest.ilog2() as usize + 1
    }
}

/// Input for level `level`: the caller's image at 0, otherwise a pyramid entry
fn level_input<'a>(pyramid: &'a [GpuImage], input: &'a GpuImage, level: usize) -> &'a GpuImage {
    if level == 0 {
        input
    } else {
        &pyramid[level - 1]
    }
}

/// Commit, wait and hand `image` to the observer, if one is installed
fn notify(
    observer: &mut Option<Box<dyn PyramidObserver>>,
    context: &mut DeviceContext,
    stage: PyramidStage,
    level: usize,
    image: &GpuImage,
) {
    if let Some(observer) = observer {
        context.commit_and_wait();
        observer.stage_completed(context, stage, level, image);
    }
}

/// Allocates every level once and reuses it across calls
pub struct PyramidProcessor {
    width: u32,
    height: u32,
    levels: usize,
    /// Entry k holds level k + 1
    image_pyramid: Vec<GpuImage>,
    gradient_pyramid: Vec<GpuImage>,
    denoised_pyramid: Vec<GpuImage>,
    /// The coarsest entry is never written
    subtracted_pyramid: Vec<GpuImage>,
    /// Entry k writes level k + 1
    downsample_image: Vec<Kernel>,
    downsample_gradient: Vec<Kernel>,
    denoise_image: Vec<Kernel>,
    subtract_noise: Vec<Kernel>,
    observer: Option<Box<dyn PyramidObserver>>,
}

impl PyramidProcessor {
    /// Build a processor for `width`×`height` inputs with `levels` levels
    ///
    /// Panics if `levels` is zero or the coarsest level would be empty; use
    /// [`max_levels`] to check user input first.
    pub fn new(
        context: &mut DeviceContext,
        width: u32,
        height: u32,
        levels: usize,
    ) -> Result<Self, ContextError> {
        assert!(levels >= 1, "a pyramid needs at least one level");
        assert!(
            levels <= max_levels(width, height),
            "{}x{} cannot be split into {} levels",
            width,
            height,
            levels
        );

        let start = Instant::now();
        let dims = level_dimensions(width, height, levels);
        let device = context.device();

        let mut image_pyramid = Vec::with_capacity(levels - 1);
        let mut gradient_pyramid = Vec::with_capacity(levels - 1);
        for (i, &(w, h)) in dims.iter().enumerate().skip(1) {
            image_pyramid.push(GpuImage::new(
                device,
                &format!("image_level_{}", i),
                w,
                h,
                PixelFormat::Rgba32Float,
            ));
            gradient_pyramid.push(GpuImage::new(
                device,
                &format!("gradient_level_{}", i),
                w,
                h,
                PixelFormat::Rg32Float,
            ));
        }

        let mut denoised_pyramid = Vec::with_capacity(levels);
        let mut subtracted_pyramid = Vec::with_capacity(levels);
        for (i, &(w, h)) in dims.iter().enumerate() {
            denoised_pyramid.push(GpuImage::new(
                device,
                &format!("denoised_level_{}", i),
                w,
                h,
                PixelFormat::Rgba32Float,
            ));
            subtracted_pyramid.push(GpuImage::new(
                device,
                &format!("subtracted_level_{}", i),
                w,
                h,
                PixelFormat::Rgba32Float,
            ));
        }

        let mut downsample_image = Vec::with_capacity(levels - 1);
        let mut downsample_gradient = Vec::with_capacity(levels - 1);
        for &(w, h) in &dims[1..] {
            let grid = GridSize::new_2d(w, h);
            downsample_image.push(Kernel::new(context, kernels::DOWNSAMPLE_IMAGE, grid)?);
            downsample_gradient.push(Kernel::new(context, kernels::DOWNSAMPLE_GRADIENT, grid)?);
        }

        let mut denoise_image = Vec::with_capacity(levels);
        let mut subtract_noise = Vec::with_capacity(levels - 1);
        for (i, &(w, h)) in dims.iter().enumerate() {
            let grid = GridSize::new_2d(w, h);
            denoise_image.push(Kernel::new(context, kernels::DENOISE_IMAGE, grid)?);
            if i < levels - 1 {
                subtract_noise.push(Kernel::new(context, kernels::SUBTRACT_NOISE_IMAGE, grid)?);
            }
        }

        info!(
            width,
            height,
            levels,
            elapsed_ms = start.elapsed().as_millis(),
            "Pyramid processor allocated"
        );

        Ok(Self {
            width,
            height,
            levels,
            image_pyramid,
            gradient_pyramid,
            denoised_pyramid,
            subtracted_pyramid,
            downsample_image,
            downsample_gradient,
            denoise_image,
            subtract_noise,
            observer: None,
        })
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Downsampled image at `level` (1..levels)
    pub fn image_level(&self, level: usize) -> &GpuImage {
        &self.image_pyramid[level - 1]
    }

    /// Downsampled gradient at `level` (1..levels)
    pub fn gradient_level(&self, level: usize) -> &GpuImage {
        &self.gradient_pyramid[level - 1]
    }

    /// Receive every intermediate image of subsequent calls
    ///
    /// With an observer installed, each stage is committed and waited on.
    pub fn set_observer(&mut self, observer: Box<dyn PyramidObserver>) {
        self.observer = Some(observer);
    }

    /// Stop observing; later calls record without committing
    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    /// Schedule a full denoise of `image`
    ///
    /// `nlf` and `parameters` hold one entry per level. Without an observer
    /// nothing is committed: the returned image is valid once the caller
    /// commits and the work completes. With an observer, every stage
    /// including the last is committed and waited on before the observer sees
    /// it. The returned image is overwritten by the next call.
    pub fn denoise(
        &mut self,
        context: &mut DeviceContext,
        image: &GpuImage,
        gradient: &GpuImage,
        nlf: &[NoiseLevelFunction],
        parameters: &[DenoiseParameters],
    ) -> &GpuImage {
        let levels = self.levels;
        assert_eq!(nlf.len(), levels, "one noise level function per level");
        assert_eq!(parameters.len(), levels, "one parameter set per level");
        assert_eq!(
            (image.dimensions(), image.format()),
            ((self.width, self.height), PixelFormat::Rgba32Float),
            "input image does not match level 0"
        );
        assert_eq!(
            (gradient.dimensions(), gradient.format()),
            ((self.width, self.height), PixelFormat::Rg32Float),
            "input gradient does not match level 0"
        );

        let start = Instant::now();
        let first_signal = context.event().signaled_value();

        let mut multipliers = Vec::with_capacity(levels);
        for i in 0..levels {
            if i < levels - 1 {
                let input = level_input(&self.image_pyramid, image, i);
                let input_gradient = level_input(&self.gradient_pyramid, gradient, i);
                context.schedule_kernel(
                    &self.downsample_image[i],
                    &[input.into(), (&self.image_pyramid[i]).into()],
                );
                context.schedule_kernel(
                    &self.downsample_gradient[i],
                    &[input_gradient.into(), (&self.gradient_pyramid[i]).into()],
                );
                notify(
                    &mut self.observer,
                    context,
                    PyramidStage::Downsampled,
                    i + 1,
                    &self.image_pyramid[i],
                );
            }
            multipliers.push(threshold_multipliers(&parameters[i]));
        }

        for i in (0..levels).rev() {
            let input = level_input(&self.image_pyramid, image, i);
            let input_gradient = level_input(&self.gradient_pyramid, gradient, i);
            let thresholds = level_thresholds(&nlf[i], multipliers[i]);
            let denoise_params = ParameterBlock::new(
                context.device(),
                "denoise_params",
                &DenoiseImageParams::new(&thresholds.denoise, &parameters[i]),
            );

            let denoise_input = if i < levels - 1 {
                let subtract_params =
                    SubtractNoiseParams::new(thresholds.subtract, parameters[i].sharpening);
                context.schedule_kernel(
                    &self.subtract_noise[i],
                    &[
                        input.into(),
                        (&self.image_pyramid[i]).into(),
                        (&self.denoised_pyramid[i + 1]).into(),
                        input_gradient.into(),
                        (&self.subtracted_pyramid[i]).into(),
                        KernelArgument::scalar(&subtract_params),
                    ],
                );
                notify(
                    &mut self.observer,
                    context,
                    PyramidStage::NoiseSubtracted,
                    i,
                    &self.subtracted_pyramid[i],
                );
                &self.subtracted_pyramid[i]
            } else {
                input
            };

            context.schedule_kernel(
                &self.denoise_image[i],
                &[
                    denoise_input.into(),
                    input_gradient.into(),
                    (&self.denoised_pyramid[i]).into(),
                    (&denoise_params).into(),
                ],
            );
            notify(
                &mut self.observer,
                context,
                PyramidStage::Denoised,
                i,
                &self.denoised_pyramid[i],
            );

            debug!(
                level = i,
                luma_a = thresholds.denoise.first[0],
                luma_b = thresholds.denoise.second[0],
                "Level scheduled"
            );
        }

        info!(
            levels,
            dispatches = context.event().signaled_value() - first_signal,
            elapsed_ms = start.elapsed().as_millis(),
            "Pyramid denoise scheduled"
        );

        &self.denoised_pyramid[0]
    }
}
