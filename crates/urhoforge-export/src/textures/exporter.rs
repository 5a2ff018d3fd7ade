//! Scheduled texture exporter
//!
//! Materializes the textures queued on the engine: native formats are copied,
//! anything else is re-encoded to PNG, and occlusion variants are baked.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use image::{ImageFormat, RgbImage, RgbaImage};
use tracing::{debug, info, warn};
use urhoforge_core::{Error, Result, ResultExt};

use super::{TextureError, TextureResult};
use crate::engine::{ExportEngine, ScheduledTexture, is_up_to_date};
use crate::naming;
use crate::source::SourceTexture;

/// Bake an ambient-occlusion map from the green channel of `source`.
///
/// Each texel becomes `1 + strength * (g - 1)`, so strength 0 yields white
/// and strength 1 yields the map itself.
pub fn bake_occlusion(source: &RgbaImage, strength: f32) -> RgbImage {
    let strength = strength.clamp(0.0, 1.0);
    RgbImage::from_fn(source.width(), source.height(), |x, y| {
        let g = source.get_pixel(x, y)[1] as f32 / 255.0;
        let ao = (1.0 + strength * (g - 1.0)).clamp(0.0, 1.0);
        let value = (ao * 255.0).round() as u8;
        image::Rgb([value, value, value])
    })
}

/// Texture exporter reading sources below a project root
#[derive(Debug, Clone)]
pub struct TextureExporter {
    project_root: PathBuf,
}

impl TextureExporter {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    /// Absolute path of a source asset
    pub fn source_path(&self, texture: &SourceTexture) -> PathBuf {
        self.project_root.join(naming::normalize_separators(&texture.asset_path))
    }

    /// Export one scheduled texture.
    ///
    /// Returns `false` when the target is already up to date.
    pub fn export(&self, engine: &dyn ExportEngine, item: &ScheduledTexture) -> Result<bool> {
        let (texture, name) = match item {
            ScheduledTexture::Copy { texture, name } | ScheduledTexture::Occlusion { texture, name, .. } => {
                (texture, name.as_str())
            }
        };

        let source = self.source_path(texture);
        if !source.exists() {
            return Err(Error::FileNotFound(source));
        }
        let target = engine.target_file_path(name);

        let source_time = fs::metadata(&source)
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::now());
        if engine.options().export_updated_only && is_up_to_date(&target, source_time) {
            debug!(texture = %name, "Texture is up to date");
            return Ok(false);
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        match item {
            ScheduledTexture::Copy { .. } => self.copy_or_convert(&source, &target),
            ScheduledTexture::Occlusion { strength, .. } => write_occlusion(&source, &target, *strength),
        }
        .map_err(Error::from)
        .with_context(|| format!("Failed to export texture {}", name))?;

        info!(texture = %name, "Texture exported");
        Ok(true)
    }

    /// Export a batch, continuing past failures.
    ///
    /// Returns (written_count, failed_count)
    pub fn export_batch(&self, engine: &dyn ExportEngine, items: &[ScheduledTexture]) -> (usize, usize) {
        let mut written = 0;
        let mut failed = 0;

        for item in items {
            match self.export(engine, item) {
                Ok(true) => written += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(texture = %item.name(), error = %e, "Texture export failed");
                    failed += 1;
                }
            }
        }

        (written, failed)
    }

    fn copy_or_convert(&self, source: &Path, target: &Path) -> TextureResult<()> {
        let source_ext = source.extension().and_then(|e| e.to_str()).unwrap_or("");
        let target_ext = target.extension().and_then(|e| e.to_str()).unwrap_or("");

        if source_ext.eq_ignore_ascii_case(target_ext) {
            fs::copy(source, target)?;
            return Ok(());
        }

        if !target_ext.eq_ignore_ascii_case("png") {
            return Err(TextureError::UnsupportedFormat(target_ext.to_string()));
        }
        image::open(source)?.save_with_format(target, ImageFormat::Png)?;
        Ok(())
    }
}

fn write_occlusion(source: &Path, target: &Path, strength: f32) -> TextureResult<()> {
    let occlusion = image::open(source)?.to_rgba8();
    bake_occlusion(&occlusion, strength).save_with_format(target, ImageFormat::Png)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineOptions, FileSystemEngine};

    fn setup() -> (tempfile::TempDir, TextureExporter, FileSystemEngine) {
        let dir = tempfile::tempdir().unwrap();
        let exporter = TextureExporter::new(dir.path().join("project"));
        let engine = FileSystemEngine::new(EngineOptions {
            output_root: dir.path().join("out"),
            ..EngineOptions::default()
        });
        (dir, exporter, engine)
    }

    #[test]
    fn test_bake_occlusion() {
        let source = RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 0, 255]));
        assert_eq!(bake_occlusion(&source, 1.0).get_pixel(0, 0)[0], 0);
        assert_eq!(bake_occlusion(&source, 0.0).get_pixel(1, 1)[0], 255);
        assert_eq!(bake_occlusion(&source, 0.5).get_pixel(0, 1)[0], 128);
    }

    #[test]
    fn test_copy_convert_and_bake() {
        let (dir, exporter, engine) = setup();
        let textures = dir.path().join("project/Assets/Textures");
        fs::create_dir_all(&textures).unwrap();
        let pixel = RgbaImage::from_pixel(4, 4, image::Rgba([10, 200, 30, 255]));
        pixel.save(textures.join("rock.png")).unwrap();
        pixel.save(textures.join("rock.tiff")).unwrap();

        let png = SourceTexture::new("Assets/Textures/rock.png");
        let tiff = SourceTexture::new("Assets/Textures/rock.tiff");
        engine.schedule_asset_export(&png);
        engine.schedule_asset_export(&tiff);
        engine.schedule_ao_export(&png, 1.0, "Textures/rock.AO.png");

        let scheduled = engine.take_scheduled();
        assert_eq!(exporter.export_batch(&engine, &scheduled), (2, 0));

        let out = dir.path().join("out/Textures");
        assert!(out.join("rock.png").exists());
        let baked = image::open(out.join("rock.AO.png")).unwrap().to_rgb8();
        assert_eq!(baked.get_pixel(0, 0)[0], 200);

        // Both sources map onto rock.png; the second write is skipped as up to date
        assert!(!exporter.export(&engine, &scheduled[0]).unwrap());
    }

    #[test]
    fn test_missing_source() {
        let (_dir, exporter, engine) = setup();
        let item = ScheduledTexture::Copy {
            texture: SourceTexture::new("Assets/missing.png"),
            name: "missing.png".to_string(),
        };
        assert!(matches!(exporter.export(&engine, &item), Err(Error::FileNotFound(_))));
    }
}
