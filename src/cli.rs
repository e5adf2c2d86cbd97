// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! - Denoising an image file
//! - Reporting the GPU adapter and kernel setup

use pyramid_denoise::constants::DEVICE_LABEL;
use pyramid_denoise::denoise::max_levels;
use pyramid_denoise::{
    DenoiseConfig, DenoiseError, DeviceContext, GpuImage, ImageData, ImageDumpObserver,
    PyramidProcessor,
};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

pub struct DenoiseArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub config: Option<PathBuf>,
    pub levels: Option<usize>,
    pub dump_stages: Option<PathBuf>,
}

/// Denoise one image file and write the result
pub fn denoise_file(args: DenoiseArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => DenoiseConfig::load(path)?,
        None => DenoiseConfig::default(),
    };
    if let Some(levels) = args.levels {
        config.set_levels(levels);
    }
    if let Some(dir) = args.dump_stages {
        config.debug_dump_dir = Some(dir);
    }
    config.validate()?;

    let rgb = image::open(&args.input)
        .map_err(DenoiseError::from)?
        .to_rgb8();
    let (width, height) = rgb.dimensions();
    let supported = max_levels(width, height);
    if config.levels > supported {
        return Err(DenoiseError::Config(format!(
            "{}x{} supports at most {} levels, {} requested",
            width, height, supported, config.levels
        ))
        .into());
    }

    println!(
        "Input: {} ({}x{}, {} levels)",
        args.input.display(),
        width,
        height,
        config.levels
    );

    let host = ImageData::from_rgb8(&rgb);
    let gradient = host.gradient();

    let rt = tokio::runtime::Runtime::new()?;
    let denoised = rt.block_on(async {
        let mut context = DeviceContext::new(DEVICE_LABEL).await?;
        if let Some(info) = context.info() {
            println!("GPU: {} ({:?})", info.adapter_name, info.backend);
        }

        let image = GpuImage::from_data(&context, "input_image", &host);
        let gradient = GpuImage::from_data(&context, "input_gradient", &gradient);
        let mut processor = PyramidProcessor::new(&mut context, width, height, config.levels)?;

        if let Some(dir) = &config.debug_dump_dir {
            std::fs::create_dir_all(dir)?;
            processor.set_observer(Box::new(ImageDumpObserver::new(dir)));
            println!("Dumping stages to {}", dir.display());
        }

        let start = Instant::now();
        let output = processor.denoise(
            &mut context,
            &image,
            &gradient,
            &config.level_nlf(),
            &config.parameters,
        );
        let result = output.read_back(&mut context).await?;
        info!(
            width,
            height,
            levels = config.levels,
            elapsed_ms = start.elapsed().as_millis(),
            "Denoise complete"
        );
        Ok::<_, DenoiseError>(result)
    })?;

    denoised
        .to_rgb8()
        .save(&args.output)
        .map_err(DenoiseError::from)?;
    println!("Saved: {}", args.output.display());

    Ok(())
}

/// Print the adapter, workgroup shape and kernel library
pub fn show_info() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    let context = rt.block_on(DeviceContext::new(DEVICE_LABEL))?;

    println!("Version: {}", env!("GIT_VERSION"));
    if let Some(info) = context.info() {
        println!("Adapter: {}", info.adapter_name);
        println!("Backend: {:?}", info.backend);
        println!("Device type: {:?}", info.device_type);
    }
    println!("Workgroup: {}", context.workgroup_size());
    println!("Kernels:");
    for name in context.library().function_names() {
        println!("  {}", name);
    }

    Ok(())
}
