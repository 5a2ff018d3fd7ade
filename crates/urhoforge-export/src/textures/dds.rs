//! DDS cubemap writer
//!
//! Layout: magic, 124-byte header, optional 20-byte DX10 header, then the six
//! faces (+X, -X, +Y, -Y, +Z, -Z), one mip level each. sRGB output always
//! uses the DX10 header since the legacy pixel format cannot express it.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{TextureError, TextureResult};
use crate::cubemap::CubemapImageEncoder;
use crate::source::Cubemap;

/// DDS file magic number "DDS "
pub const DDS_MAGIC: u32 = 0x20534444;

const HEADER_SIZE: u32 = 124;
const PIXEL_FORMAT_SIZE: u32 = 32;

/// DDS header flags
pub mod flags {
    pub const CAPS: u32 = 0x1;
    pub const HEIGHT: u32 = 0x2;
    pub const WIDTH: u32 = 0x4;
    pub const PITCH: u32 = 0x8;
    pub const PIXEL_FORMAT: u32 = 0x1000;
    pub const MIPMAP_COUNT: u32 = 0x20000;
    pub const LINEAR_SIZE: u32 = 0x80000;
}

/// Caps flags
pub mod caps {
    pub const COMPLEX: u32 = 0x8;
    pub const TEXTURE: u32 = 0x1000;
}

/// Caps2 flags
pub mod caps2 {
    pub const CUBEMAP: u32 = 0x200;
    pub const CUBEMAP_POSITIVEX: u32 = 0x400;
    pub const CUBEMAP_NEGATIVEX: u32 = 0x800;
    pub const CUBEMAP_POSITIVEY: u32 = 0x1000;
    pub const CUBEMAP_NEGATIVEY: u32 = 0x2000;
    pub const CUBEMAP_POSITIVEZ: u32 = 0x4000;
    pub const CUBEMAP_NEGATIVEZ: u32 = 0x8000;

    pub const CUBEMAP_ALL_FACES: u32 = CUBEMAP
        | CUBEMAP_POSITIVEX
        | CUBEMAP_NEGATIVEX
        | CUBEMAP_POSITIVEY
        | CUBEMAP_NEGATIVEY
        | CUBEMAP_POSITIVEZ
        | CUBEMAP_NEGATIVEZ;
}

/// DDS pixel format flags
pub mod pf_flags {
    pub const ALPHAPIXELS: u32 = 0x1;
    pub const FOURCC: u32 = 0x4;
    pub const RGB: u32 = 0x40;
}

/// DXGI formats written in the DX10 header
pub mod dxgi {
    pub const R8G8B8A8_UNORM: u32 = 28;
    pub const R8G8B8A8_UNORM_SRGB: u32 = 29;
    pub const BC3_UNORM: u32 = 77;
    pub const BC3_UNORM_SRGB: u32 = 78;

    pub const RESOURCE_DIMENSION_TEXTURE2D: u32 = 3;
    pub const RESOURCE_MISC_TEXTURECUBE: u32 = 0x4;
}

/// Pixel encoding of exported cubemap faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DdsPixelFormat {
    /// Uncompressed 32-bit RGBA
    #[default]
    Rgba8,
    /// Block Compressed 3 (DXT5), interpolated alpha
    Bc3,
}

impl DdsPixelFormat {
    /// Byte size of one face of edge length `size`
    pub fn face_data_size(self, size: u32) -> usize {
        match self {
            DdsPixelFormat::Rgba8 => size as usize * size as usize * 4,
            DdsPixelFormat::Bc3 => texpresso::Format::Bc3.compressed_size(size as usize, size as usize),
        }
    }

    fn dxgi_format(self, srgb: bool) -> u32 {
        match (self, srgb) {
            (DdsPixelFormat::Rgba8, false) => dxgi::R8G8B8A8_UNORM,
            (DdsPixelFormat::Rgba8, true) => dxgi::R8G8B8A8_UNORM_SRGB,
            (DdsPixelFormat::Bc3, false) => dxgi::BC3_UNORM,
            (DdsPixelFormat::Bc3, true) => dxgi::BC3_UNORM_SRGB,
        }
    }

    fn encode_face(self, face: &RgbaImage) -> Vec<u8> {
        match self {
            DdsPixelFormat::Rgba8 => face.as_raw().clone(),
            DdsPixelFormat::Bc3 => {
                let (width, height) = (face.width() as usize, face.height() as usize);
                let format = texpresso::Format::Bc3;
                let mut output = vec![0u8; format.compressed_size(width, height)];
                format.compress(face.as_raw(), width, height, texpresso::Params::default(), &mut output);
                output
            }
        }
    }
}

impl FromStr for DdsPixelFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rgba8" | "rgba" => Ok(DdsPixelFormat::Rgba8),
            "bc3" | "dxt5" => Ok(DdsPixelFormat::Bc3),
            _ => Err(format!("Unknown cubemap format: {}", s)),
        }
    }
}

/// DDS pixel format (32 bytes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelFormat {
    pub size: u32,
    pub flags: u32,
    pub fourcc: [u8; 4],
    pub rgb_bit_count: u32,
    pub r_bit_mask: u32,
    pub g_bit_mask: u32,
    pub b_bit_mask: u32,
    pub a_bit_mask: u32,
}

impl PixelFormat {
    /// Uncompressed RGBA, red in the lowest byte
    pub fn rgba8() -> Self {
        Self {
            size: PIXEL_FORMAT_SIZE,
            flags: pf_flags::RGB | pf_flags::ALPHAPIXELS,
            fourcc: [0; 4],
            rgb_bit_count: 32,
            r_bit_mask: 0x0000_00FF,
            g_bit_mask: 0x0000_FF00,
            b_bit_mask: 0x00FF_0000,
            a_bit_mask: 0xFF00_0000,
        }
    }

    /// Compressed or extended format identified by a FourCC
    pub fn fourcc(code: &[u8; 4]) -> Self {
        Self {
            size: PIXEL_FORMAT_SIZE,
            flags: pf_flags::FOURCC,
            fourcc: *code,
            rgb_bit_count: 0,
            r_bit_mask: 0,
            g_bit_mask: 0,
            b_bit_mask: 0,
            a_bit_mask: 0,
        }
    }

    pub fn write<W: Write>(&self, out: &mut W) -> TextureResult<()> {
        out.write_all(&self.size.to_le_bytes())?;
        out.write_all(&self.flags.to_le_bytes())?;
        out.write_all(&self.fourcc)?;
        for value in [self.rgb_bit_count, self.r_bit_mask, self.g_bit_mask, self.b_bit_mask, self.a_bit_mask] {
            out.write_all(&value.to_le_bytes())?;
        }
        Ok(())
    }
}

/// DDS header (124 bytes, magic not included)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdsHeader {
    pub flags: u32,
    pub height: u32,
    pub width: u32,
    pub pitch_or_linear_size: u32,
    pub depth: u32,
    pub mipmap_count: u32,
    pub pixel_format: PixelFormat,
    pub caps: u32,
    pub caps2: u32,
}

impl DdsHeader {
    /// Header of a single-mip cubemap with faces of edge length `size`
    pub fn cubemap(size: u32, format: DdsPixelFormat, srgb: bool) -> Self {
        let pixel_format = match (format, srgb) {
            (_, true) => PixelFormat::fourcc(b"DX10"),
            (DdsPixelFormat::Rgba8, false) => PixelFormat::rgba8(),
            (DdsPixelFormat::Bc3, false) => PixelFormat::fourcc(b"DXT5"),
        };
        let (pitch_flag, pitch) = match format {
            DdsPixelFormat::Rgba8 => (flags::PITCH, size * 4),
            DdsPixelFormat::Bc3 => (flags::LINEAR_SIZE, format.face_data_size(size) as u32),
        };

        Self {
            flags: flags::CAPS | flags::HEIGHT | flags::WIDTH | flags::PIXEL_FORMAT | flags::MIPMAP_COUNT | pitch_flag,
            height: size,
            width: size,
            pitch_or_linear_size: pitch,
            depth: 0,
            mipmap_count: 1,
            pixel_format,
            caps: caps::COMPLEX | caps::TEXTURE,
            caps2: caps2::CUBEMAP_ALL_FACES,
        }
    }

    pub fn write<W: Write>(&self, out: &mut W) -> TextureResult<()> {
        for value in [
            HEADER_SIZE,
            self.flags,
            self.height,
            self.width,
            self.pitch_or_linear_size,
            self.depth,
            self.mipmap_count,
        ] {
            out.write_all(&value.to_le_bytes())?;
        }
        out.write_all(&[0u8; 11 * 4])?; // reserved1
        self.pixel_format.write(out)?;
        for value in [self.caps, self.caps2, 0, 0, 0] {
            out.write_all(&value.to_le_bytes())?;
        }
        Ok(())
    }

    /// Check if this DDS has a DX10 extended header
    pub fn has_dx10_header(&self) -> bool {
        self.pixel_format.flags & pf_flags::FOURCC != 0 && self.pixel_format.fourcc == *b"DX10"
    }
}

/// DX10 extended header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DX10Header {
    pub dxgi_format: u32,
    pub resource_dimension: u32,
    pub misc_flag: u32,
    pub array_size: u32,
    pub misc_flags2: u32,
}

impl DX10Header {
    pub fn cubemap(format: DdsPixelFormat, srgb: bool) -> Self {
        Self {
            dxgi_format: format.dxgi_format(srgb),
            resource_dimension: dxgi::RESOURCE_DIMENSION_TEXTURE2D,
            misc_flag: dxgi::RESOURCE_MISC_TEXTURECUBE,
            array_size: 1,
            misc_flags2: 0,
        }
    }

    pub fn write<W: Write>(&self, out: &mut W) -> TextureResult<()> {
        for value in [
            self.dxgi_format,
            self.resource_dimension,
            self.misc_flag,
            self.array_size,
            self.misc_flags2,
        ] {
            out.write_all(&value.to_le_bytes())?;
        }
        Ok(())
    }
}

/// Write six square faces as a DDS cubemap
pub fn write_cubemap_dds<W: Write>(
    out: &mut W,
    faces: &[RgbaImage],
    format: DdsPixelFormat,
    srgb: bool,
) -> TextureResult<()> {
    let size = faces.first().map(|f| f.width()).unwrap_or(0);
    if faces.len() != 6 || size == 0 {
        return Err(TextureError::InvalidDimensions { width: size, height: faces.len() as u32 });
    }
    if let Some(bad) = faces.iter().find(|f| f.width() != size || f.height() != size) {
        return Err(TextureError::InvalidDimensions {
            width: bad.width(),
            height: bad.height(),
        });
    }

    let header = DdsHeader::cubemap(size, format, srgb);
    out.write_all(&DDS_MAGIC.to_le_bytes())?;
    header.write(out)?;
    if header.has_dx10_header() {
        DX10Header::cubemap(format, srgb).write(out)?;
    }

    for face in faces {
        out.write_all(&format.encode_face(face))?;
    }
    Ok(())
}

/// Cubemap image encoder producing DDS files
#[derive(Debug, Clone, Copy, Default)]
pub struct DdsCubemapEncoder {
    pub format: DdsPixelFormat,
}

impl DdsCubemapEncoder {
    pub fn new(format: DdsPixelFormat) -> Self {
        Self { format }
    }
}

impl CubemapImageEncoder for DdsCubemapEncoder {
    fn encode(&self, cubemap: &Cubemap, destination: &Path, srgb: bool) -> urhoforge_core::Result<()> {
        cubemap.face_size()?;

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(File::create(destination)?);
        write_cubemap_dds(&mut out, &cubemap.faces, self.format, srgb)?;
        out.flush()?;

        debug!(path = %destination.display(), format = ?self.format, srgb, "Cubemap image written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    fn le_u32(data: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
    }

    fn parse_pixel_format(data: &[u8]) -> PixelFormat {
        PixelFormat {
            size: le_u32(data, 0),
            flags: le_u32(data, 4),
            fourcc: [data[8], data[9], data[10], data[11]],
            rgb_bit_count: le_u32(data, 12),
            r_bit_mask: le_u32(data, 16),
            g_bit_mask: le_u32(data, 20),
            b_bit_mask: le_u32(data, 24),
            a_bit_mask: le_u32(data, 28),
        }
    }

    /// Header after the magic
    fn parse_header<R: Read>(reader: &mut R) -> DdsHeader {
        let mut data = [0u8; HEADER_SIZE as usize];
        reader.read_exact(&mut data).unwrap();
        assert_eq!(le_u32(&data, 0), HEADER_SIZE);

        DdsHeader {
            flags: le_u32(&data, 4),
            height: le_u32(&data, 8),
            width: le_u32(&data, 12),
            pitch_or_linear_size: le_u32(&data, 16),
            depth: le_u32(&data, 20),
            mipmap_count: le_u32(&data, 24),
            pixel_format: parse_pixel_format(&data[72..104]),
            caps: le_u32(&data, 104),
            caps2: le_u32(&data, 108),
        }
    }

    fn parse_dx10<R: Read>(reader: &mut R) -> DX10Header {
        let mut data = [0u8; 20];
        reader.read_exact(&mut data).unwrap();

        DX10Header {
            dxgi_format: le_u32(&data, 0),
            resource_dimension: le_u32(&data, 4),
            misc_flag: le_u32(&data, 8),
            array_size: le_u32(&data, 12),
            misc_flags2: le_u32(&data, 16),
        }
    }

    fn faces(size: u32) -> Vec<RgbaImage> {
        (0..6u8)
            .map(|i| RgbaImage::from_pixel(size, size, image::Rgba([i * 40, 0, 0, 255])))
            .collect()
    }

    #[test]
    fn test_rgba8_srgb_cubemap_layout() {
        let mut out = Vec::new();
        write_cubemap_dds(&mut out, &faces(4), DdsPixelFormat::Rgba8, true).unwrap();

        // magic + header + dx10 + 6 faces of 4x4 RGBA
        assert_eq!(out.len(), 4 + 124 + 20 + 6 * 4 * 4 * 4);
        assert_eq!(le_u32(&out, 0), DDS_MAGIC);

        let mut reader = Cursor::new(&out[4..]);
        let header = parse_header(&mut reader);
        assert_eq!((header.width, header.height), (4, 4));
        assert_eq!(header.caps2 & caps2::CUBEMAP_ALL_FACES, caps2::CUBEMAP_ALL_FACES);
        assert!(header.has_dx10_header());
        assert_eq!(header.pitch_or_linear_size, 16);

        let dx10 = parse_dx10(&mut reader);
        assert_eq!(dx10.dxgi_format, dxgi::R8G8B8A8_UNORM_SRGB);
        assert_eq!(dx10.misc_flag, dxgi::RESOURCE_MISC_TEXTURECUBE);

        // Third face starts right after the first two
        let face_start = 4 + 124 + 20 + 2 * 64;
        assert_eq!(out[face_start], 80);
    }

    #[test]
    fn test_linear_formats_use_legacy_header() {
        let mut out = Vec::new();
        write_cubemap_dds(&mut out, &faces(4), DdsPixelFormat::Rgba8, false).unwrap();
        let header = parse_header(&mut Cursor::new(&out[4..]));
        assert_eq!(header.pixel_format, PixelFormat::rgba8());
        assert_eq!(out.len(), 4 + 124 + 6 * 64);

        let mut out = Vec::new();
        write_cubemap_dds(&mut out, &faces(8), DdsPixelFormat::Bc3, false).unwrap();
        let header = parse_header(&mut Cursor::new(&out[4..]));
        assert_eq!(&header.pixel_format.fourcc, b"DXT5");
        // BC3: 16 bytes per 4x4 block
        assert_eq!(header.pitch_or_linear_size, 64);
        assert_eq!(out.len(), 4 + 124 + 6 * 64);
    }

    #[test]
    fn test_rejects_bad_faces() {
        let mut out = Vec::new();
        let mut bad = faces(4);
        bad.pop();
        assert!(write_cubemap_dds(&mut out, &bad, DdsPixelFormat::Rgba8, true).is_err());

        let mut bad = faces(4);
        bad[2] = RgbaImage::new(4, 8);
        assert!(write_cubemap_dds(&mut out, &bad, DdsPixelFormat::Rgba8, true).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn test_pixel_format_from_str() {
        assert_eq!("BC3".parse::<DdsPixelFormat>().unwrap(), DdsPixelFormat::Bc3);
        assert_eq!("rgba8".parse::<DdsPixelFormat>().unwrap(), DdsPixelFormat::Rgba8);
        assert!("bc7".parse::<DdsPixelFormat>().is_err());
    }
}
