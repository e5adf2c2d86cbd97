// SPDX-License-Identifier: GPL-3.0-only

//! Float textures used for pyramid levels, with host upload and readback

use super::context::DeviceContext;
use crate::constants::COPY_ROW_ALIGNMENT;
use crate::errors::{DenoiseError, DenoiseResult};
use crate::image_data::ImageData;
use tracing::debug;

/// Texel layouts the kernels work with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Luma, two chroma channels and alpha
    Rgba32Float,
    /// Horizontal and vertical gradient
    Rg32Float,
}

impl PixelFormat {
    pub fn channels(&self) -> usize {
        match self {
            PixelFormat::Rgba32Float => 4,
            PixelFormat::Rg32Float => 2,
        }
    }

    pub fn bytes_per_pixel(&self) -> u32 {
        self.channels() as u32 * 4
    }

    pub fn texture_format(&self) -> wgpu::TextureFormat {
        match self {
            PixelFormat::Rgba32Float => wgpu::TextureFormat::Rgba32Float,
            PixelFormat::Rg32Float => wgpu::TextureFormat::Rg32Float,
        }
    }

    /// Format holding `channels` interleaved floats
    pub fn for_channels(channels: usize) -> Option<Self> {
        match channels {
            4 => Some(PixelFormat::Rgba32Float),
            2 => Some(PixelFormat::Rg32Float),
            _ => None,
        }
    }
}

/// Row pitch of a texture-to-buffer copy
fn padded_bytes_per_row(width: u32, format: PixelFormat) -> u32 {
    (width * format.bytes_per_pixel()).next_multiple_of(COPY_ROW_ALIGNMENT)
}

/// A 2D float texture readable and writable by every kernel
pub struct GpuImage {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl GpuImage {
    /// Allocate an uninitialised image
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: format.texture_format(),
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            width,
            height,
            format,
        }
    }

    /// Allocate an image sized for `data` and upload it
    ///
    /// Panics if `data` has a channel count no kernel accepts.
    pub fn from_data(context: &DeviceContext, label: &str, data: &ImageData) -> Self {
        let format = PixelFormat::for_channels(data.channels).unwrap_or_else(|| {
            panic!("{} channels cannot be uploaded as a kernel image", data.channels)
        });
        let image = Self::new(context.device(), label, data.width, data.height, format);
        image.upload(context.queue(), data);
        image
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Replace the contents from host memory
    ///
    /// The write lands before the next committed command buffer executes.
    pub fn upload(&self, queue: &wgpu::Queue, data: &ImageData) {
        assert_eq!(
            (data.width, data.height, data.channels),
            (self.width, self.height, self.format.channels()),
            "host image does not match texture shape"
        );
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&data.data),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.width * self.format.bytes_per_pixel()),
                rows_per_image: Some(self.height),
            },
            self.extent(),
        );
    }

    fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }

    /// Copy the image back to host memory
    ///
    /// The copy is appended to the context's open command buffer, which is then
    /// committed, so the result reflects every kernel scheduled before the call.
    pub async fn read_back(&self, context: &mut DeviceContext) -> DenoiseResult<ImageData> {
        let bytes_per_row = padded_bytes_per_row(self.width, self.format);
        let staging = context.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("image_readback"),
            size: bytes_per_row as u64 * self.height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        context.command_buffer().encoder().copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            self.extent(),
        );
        context.commit();

        let slice = staging.slice(..);
        let (sender, receiver) = futures::channel::oneshot::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        context.wait_until_completed();

        receiver
            .await
            .map_err(|_| DenoiseError::Readback("mapping callback dropped".to_string()))?
            .map_err(|e| DenoiseError::Readback(format!("failed to map buffer: {:?}", e)))?;

        let row_bytes = (self.width * self.format.bytes_per_pixel()) as usize;
        let mut data = Vec::with_capacity(self.width as usize * self.height as usize * self.format.channels());
        {
            let mapped = slice.get_mapped_range();
            for row in mapped.chunks_exact(bytes_per_row as usize) {
                data.extend_from_slice(bytemuck::cast_slice::<u8, f32>(&row[..row_bytes]));
            }
        }
        staging.unmap();

        debug!(
            width = self.width,
            height = self.height,
            channels = self.format.channels(),
            "Image read back"
        );

        Ok(ImageData::new(
            self.width,
            self.height,
            self.format.channels(),
            data,
        ))
    }

    /// Blocking variant of [`read_back`](Self::read_back)
    pub fn read_back_blocking(&self, context: &mut DeviceContext) -> DenoiseResult<ImageData> {
        pollster::block_on(self.read_back(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_format_channels() {
        assert_eq!(PixelFormat::Rgba32Float.channels(), 4);
        assert_eq!(PixelFormat::Rg32Float.channels(), 2);
        assert_eq!(PixelFormat::Rgba32Float.bytes_per_pixel(), 16);
        assert_eq!(PixelFormat::for_channels(2), Some(PixelFormat::Rg32Float));
        assert_eq!(PixelFormat::for_channels(3), None);
    }

    #[test]
    fn test_padded_row_alignment() {
        // 64 * 16 = 1024, already aligned
        assert_eq!(padded_bytes_per_row(64, PixelFormat::Rgba32Float), 1024);
        // 5 * 8 = 40 -> 256
        assert_eq!(padded_bytes_per_row(5, PixelFormat::Rg32Float), 256);
        // 17 * 16 = 272 -> 512
        assert_eq!(padded_bytes_per_row(17, PixelFormat::Rgba32Float), 512);
    }

    #[tokio::test]
    async fn test_upload_read_back_odd_width() {
        let mut context = match DeviceContext::new("image_test").await {
            Ok(context) => context,
            Err(e) => {
                println!("Skipping test (no GPU): {}", e);
                return;
            }
        };
        let (width, height) = (13, 7);
        let values: Vec<f32> = (0..width * height * 2).map(|v| v as f32 * 0.25).collect();
        let host = ImageData::new(width, height, 2, values.clone());

        let image = GpuImage::from_data(&context, "odd", &host);
        let back = image.read_back(&mut context).await.unwrap();
        assert_eq!(back.data, values);
    }
}
