// SPDX-License-Identifier: GPL-3.0-only

use crate::constants::DEFAULT_PYRAMID_LEVELS;
use crate::denoise::{DenoiseParameters, NoiseLevelFunction, pyramid_nlf};
use crate::errors::{DenoiseError, DenoiseResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Denoise settings loaded from a JSON file
///
/// Every field is optional in the file; missing ones take their defaults.
///
/// ```json
/// {
///   "levels": 4,
///   "base_nlf": { "first": [0.0001, 0.00005, 0.00005], "second": [0.0005, 0.0001, 0.0001] },
///   "parameters": [{ "luma": 1.5 }, {}, {}, {}]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DenoiseConfig {
    /// Pyramid depth
    pub levels: usize,
    /// Full-resolution noise model, used when `nlf` is empty
    pub base_nlf: NoiseLevelFunction,
    /// Explicit per-level noise model, finest first
    pub nlf: Vec<NoiseLevelFunction>,
    /// Per-level tuning, finest first
    pub parameters: Vec<DenoiseParameters>,
    /// Write every intermediate stage here as PNG
    pub debug_dump_dir: Option<PathBuf>,
}

impl Default for DenoiseConfig {
    fn default() -> Self {
        Self {
            levels: DEFAULT_PYRAMID_LEVELS,
            // Generic starting point for 8-bit sources, not a sensor calibration
            base_nlf: NoiseLevelFunction::new([1.0e-4, 5.0e-5, 5.0e-5], [5.0e-4, 1.0e-4, 1.0e-4]),
            nlf: Vec::new(),
            parameters: vec![DenoiseParameters::default(); DEFAULT_PYRAMID_LEVELS],
            debug_dump_dir: None,
        }
    }
}

impl DenoiseConfig {
    /// Read and validate a JSON config file
    pub fn load(path: &Path) -> DenoiseResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        info!(path = %path.display(), levels = config.levels, "Loaded denoise config");
        Ok(config)
    }

    /// Check per-level lists against `levels`
    pub fn validate(&self) -> DenoiseResult<()> {
        if self.levels == 0 {
            return Err(DenoiseError::Config("levels must be at least 1".to_string()));
        }
        if self.parameters.len() != self.levels {
            return Err(DenoiseError::Config(format!(
                "{} parameter sets for {} levels",
                self.parameters.len(),
                self.levels
            )));
        }
        if !self.nlf.is_empty() && self.nlf.len() != self.levels {
            return Err(DenoiseError::Config(format!(
                "{} noise level functions for {} levels",
                self.nlf.len(),
                self.levels
            )));
        }
        Ok(())
    }

    /// Change the pyramid depth, resizing the per-level lists to match
    ///
    /// New levels get default parameters. Explicit NLFs of the wrong length
    /// are dropped in favour of ones derived from `base_nlf`.
    pub fn set_levels(&mut self, levels: usize) {
        self.levels = levels;
        self.parameters.resize(levels, DenoiseParameters::default());
        if !self.nlf.is_empty() && self.nlf.len() != levels {
            warn!(
                configured = self.nlf.len(),
                levels, "Discarding per-level NLFs; deriving from base_nlf"
            );
            self.nlf.clear();
        }
    }

    /// One noise level function per level
    pub fn level_nlf(&self) -> Vec<NoiseLevelFunction> {
        if self.nlf.is_empty() {
            pyramid_nlf(&self.base_nlf, self.levels)
        } else {
            self.nlf.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DenoiseConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.level_nlf().len(), config.levels);
    }

    #[test]
    fn test_set_levels_resizes() {
        let mut config = DenoiseConfig {
            nlf: vec![NoiseLevelFunction::ZERO; DEFAULT_PYRAMID_LEVELS],
            ..Default::default()
        };
        config.set_levels(2);
        assert_eq!(config.parameters.len(), 2);
        assert!(config.nlf.is_empty());
        assert!(config.validate().is_ok());
    }
}
