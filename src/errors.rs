// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the denoising engine

use std::fmt;

/// Result type alias using DenoiseError
pub type DenoiseResult<T> = Result<T, DenoiseError>;

/// Device and kernel-library errors
///
/// All of these surface while a [`DeviceContext`](crate::gpu::DeviceContext) or a
/// [`PyramidProcessor`](crate::denoise::PyramidProcessor) is being built. They mean the
/// deployment does not match the kernel contract, so callers should not retry.
#[derive(Debug, Clone)]
pub enum ContextError {
    /// No compute-capable adapter was found
    NoAdapter,
    /// The adapter refused the device request
    DeviceRequest(String),
    /// A kernel source failed to compile
    ShaderCompilation { function: String, message: String },
    /// A kernel name is not part of the library
    UnknownFunction(String),
    /// Pipeline creation failed for a known kernel
    PipelineCreation { function: String, message: String },
}

/// Main error type for everything past construction
#[derive(Debug, Clone)]
pub enum DenoiseError {
    /// Device or kernel library failure
    Context(ContextError),
    /// GPU to CPU readback failed
    Readback(String),
    /// Invalid or unreadable configuration
    Config(String),
    /// Image decode/encode failure
    Image(String),
    /// Filesystem errors
    Io(String),
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextError::NoAdapter => write!(f, "No suitable GPU adapter found"),
            ContextError::DeviceRequest(msg) => write!(f, "Failed to create GPU device: {}", msg),
            ContextError::ShaderCompilation { function, message } => {
                write!(f, "Kernel '{}' failed to compile: {}", function, message)
            }
            ContextError::UnknownFunction(name) => {
                write!(f, "Kernel '{}' is not in the kernel library", name)
            }
            ContextError::PipelineCreation { function, message } => {
                write!(f, "Pipeline for kernel '{}' failed: {}", function, message)
            }
        }
    }
}

impl fmt::Display for DenoiseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenoiseError::Context(e) => write!(f, "GPU context error: {}", e),
            DenoiseError::Readback(msg) => write!(f, "Readback failed: {}", msg),
            DenoiseError::Config(msg) => write!(f, "Configuration error: {}", msg),
            DenoiseError::Image(msg) => write!(f, "Image error: {}", msg),
            DenoiseError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for ContextError {}

impl std::error::Error for DenoiseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DenoiseError::Context(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ContextError> for DenoiseError {
    fn from(err: ContextError) -> Self {
        DenoiseError::Context(err)
    }
}

impl From<std::io::Error> for DenoiseError {
    fn from(err: std::io::Error) -> Self {
        DenoiseError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for DenoiseError {
    fn from(err: serde_json::Error) -> Self {
        DenoiseError::Config(err.to_string())
    }
}

impl From<image::ImageError> for DenoiseError {
    fn from(err: image::ImageError) -> Self {
        DenoiseError::Image(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_error_display_names_function() {
        let err = ContextError::ShaderCompilation {
            function: "denoise_image".to_string(),
            message: "unexpected token".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("denoise_image"));
        assert!(text.contains("unexpected token"));
    }

    #[test]
    fn test_context_error_converts_and_keeps_source() {
        let err: DenoiseError = ContextError::UnknownFunction("blur".to_string()).into();
        assert!(matches!(err, DenoiseError::Context(ContextError::UnknownFunction(_))));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.json");
        let err = DenoiseError::from(io);
        assert!(matches!(err, DenoiseError::Io(ref msg) if msg.contains("missing.json")));
    }
}
