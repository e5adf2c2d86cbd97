// SPDX-License-Identifier: GPL-3.0-only

//! Hooks for inspecting intermediate pyramid images

use crate::gpu::{DeviceContext, GpuImage};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Pyramid stage that just produced an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PyramidStage {
    /// Downsampled input at this level
    Downsampled,
    /// Level rebuilt from the coarser denoised level
    NoiseSubtracted,
    /// Output of the per-level denoise
    Denoised,
}

impl fmt::Display for PyramidStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PyramidStage::Downsampled => "downsampled",
            PyramidStage::NoiseSubtracted => "subtracted",
            PyramidStage::Denoised => "denoised",
        };
        f.write_str(name)
    }
}

/// Receives every intermediate image of a denoise call
///
/// The processor commits and waits before each callback, so `image` already
/// holds its final contents and can be read back through `context`.
pub trait PyramidObserver: Send {
    fn stage_completed(
        &mut self,
        context: &mut DeviceContext,
        stage: PyramidStage,
        level: usize,
        image: &GpuImage,
    );
}

/// Writes each stage to `<dir>/<seq>_<stage>_level<level>.png`
pub struct ImageDumpObserver {
    dir: PathBuf,
    sequence: usize,
}

impl ImageDumpObserver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            sequence: 0,
        }
    }

    fn file_name(&self, stage: PyramidStage, level: usize) -> PathBuf {
        self.dir
            .join(format!("{:03}_{}_level{}.png", self.sequence, stage, level))
    }
}

impl PyramidObserver for ImageDumpObserver {
    fn stage_completed(
        &mut self,
        context: &mut DeviceContext,
        stage: PyramidStage,
        level: usize,
        image: &GpuImage,
    ) {
        let path = self.file_name(stage, level);
        self.sequence += 1;

        // Dumping is best effort; a failed write must not abort the denoise
        let result = image
            .read_back_blocking(context)
            .and_then(|data| Ok(data.to_rgb8().save(&path)?));
        match result {
            Ok(()) => debug!(path = %path.display(), "Stage image written"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to dump stage image"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_file_names_are_sequenced() {
        let mut observer = ImageDumpObserver::new("/tmp/stages");
        assert_eq!(
            observer.file_name(PyramidStage::Downsampled, 1),
            PathBuf::from("/tmp/stages/000_downsampled_level1.png")
        );
        observer.sequence = 12;
        assert_eq!(
            observer.file_name(PyramidStage::NoiseSubtracted, 0),
            PathBuf::from("/tmp/stages/012_subtracted_level0.png")
        );
    }
}
