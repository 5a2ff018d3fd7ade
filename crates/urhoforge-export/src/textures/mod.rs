//! Texture output: DDS cubemap images and scheduled texture files
//!
//! Writes cubemap faces into a single DDS container (uncompressed RGBA8 or
//! BC3 via texpresso) and materializes the textures the material encoders
//! scheduled, including baked ambient-occlusion variants.

mod dds;
mod exporter;

pub use dds::{DdsCubemapEncoder, DdsHeader, DdsPixelFormat, DX10Header, PixelFormat, write_cubemap_dds};
pub use exporter::{TextureExporter, bake_occlusion};

use thiserror::Error;

/// Texture output errors
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

pub type TextureResult<T> = Result<T, TextureError>;

impl From<TextureError> for urhoforge_core::Error {
    fn from(err: TextureError) -> Self {
        match err {
            TextureError::Io(e) => urhoforge_core::Error::Io(e),
            other => urhoforge_core::Error::ImageEncode {
                message: other.to_string(),
            },
        }
    }
}
