// SPDX-License-Identifier: GPL-3.0-only

//! GPU multiscale pyramid denoising
//!
//! A [`DeviceContext`] owns the device, the kernel library and the open
//! command buffer. A [`PyramidProcessor`] schedules a whole denoise pass on it:
//!
//! ```no_run
//! use pyramid_denoise::{DenoiseConfig, DeviceContext, GpuImage, ImageData, PyramidProcessor};
//!
//! # async fn run(input: ImageData) -> Result<ImageData, Box<dyn std::error::Error>> {
//! let config = DenoiseConfig::default();
//! let mut context = DeviceContext::new("denoise").await?;
//! let image = GpuImage::from_data(&context, "input", &input);
//! let gradient = GpuImage::from_data(&context, "gradient", &input.gradient());
//!
//! let mut processor =
//!     PyramidProcessor::new(&mut context, input.width, input.height, config.levels)?;
//! let output = processor.denoise(
//!     &mut context,
//!     &image,
//!     &gradient,
//!     &config.level_nlf(),
//!     &config.parameters,
//! );
//! Ok(output.read_back(&mut context).await?)
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod denoise;
pub mod errors;
pub mod gpu;
pub mod image_data;
pub mod shaders;

pub use config::DenoiseConfig;
pub use denoise::{
    DenoiseParameters, ImageDumpObserver, NoiseLevelFunction, PyramidObserver, PyramidProcessor,
    PyramidStage,
};
pub use errors::{ContextError, DenoiseError, DenoiseResult};
pub use gpu::{DeviceContext, GpuImage, PixelFormat};
pub use image_data::ImageData;
