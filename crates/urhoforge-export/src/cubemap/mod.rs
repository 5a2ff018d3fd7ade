//! Cubemap export
//!
//! A cubemap becomes two resources: a DDS image holding the six faces and a
//! small XML document pointing at it. Both are skipped when the document is
//! newer than the source.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};
use urhoforge_core::{Result, ResultExt};

use crate::engine::ExportEngine;
use crate::naming;
use crate::source::{AssetDatabase, Cubemap, TextureImporterSettings};
use crate::textures::DdsCubemapEncoder;

/// Cubemaps are always written sRGB-tagged
const CUBEMAP_SRGB: bool = true;

/// Packs the faces of a cubemap into an image file
pub trait CubemapImageEncoder: Send + Sync {
    fn encode(&self, cubemap: &Cubemap, destination: &Path, srgb: bool) -> Result<()>;
}

/// Cubemap document and image exporter
pub struct CubemapExporter {
    engine: Arc<dyn ExportEngine>,
    assets: Arc<dyn AssetDatabase>,
    encoder: Box<dyn CubemapImageEncoder>,
}

impl CubemapExporter {
    /// Exporter writing DDS images in the engine's configured pixel format
    pub fn new(engine: Arc<dyn ExportEngine>, assets: Arc<dyn AssetDatabase>) -> Self {
        let encoder = DdsCubemapEncoder::new(engine.options().cubemap_format);
        Self::with_encoder(engine, assets, Box::new(encoder))
    }

    pub fn with_encoder(
        engine: Arc<dyn ExportEngine>,
        assets: Arc<dyn AssetDatabase>,
        encoder: Box<dyn CubemapImageEncoder>,
    ) -> Self {
        Self { engine, assets, encoder }
    }

    /// Make the cubemap's pixel data readable, reimporting if needed.
    ///
    /// Returns `false` when the asset has no texture import settings.
    pub fn ensure_readable_texture(&self, cubemap: &Cubemap) -> Result<bool> {
        let Some(settings) = self.assets.texture_importer(&cubemap.asset_path) else {
            return Ok(false);
        };

        if !settings.is_readable {
            debug!(asset = %cubemap.asset_path, "Marking cubemap readable");
            let settings = TextureImporterSettings { is_readable: true };
            self.assets
                .reimport(&cubemap.asset_path, &settings)
                .with_context(|| format!("Failed to reimport {}", cubemap.asset_path))?;
        }
        Ok(true)
    }

    /// Resource name of the cubemap document
    pub fn evaluate_cubemap_name(&self, cubemap: &Cubemap) -> String {
        let relative = naming::rel_path_from_asset_path(&self.engine.options().subfolder, &cubemap.asset_path);
        naming::replace_extension(&relative, ".xml")
    }

    /// Export the cubemap image and document.
    ///
    /// Returns `false` when the asset is not readable or the output is up to
    /// date; in both cases nothing is written.
    pub fn export(&self, cubemap: &Cubemap) -> Result<bool> {
        if !self.ensure_readable_texture(cubemap)? {
            debug!(asset = %cubemap.asset_path, "Cubemap has no import settings, skipped");
            return Ok(false);
        }

        let resource_name = self.evaluate_cubemap_name(cubemap);
        let Some(mut document) = self
            .engine
            .try_create_xml(&cubemap.key, &resource_name, cubemap.last_write_time)?
        else {
            return Ok(false);
        };

        cubemap.face_size()?;

        let image_name = naming::replace_extension(&resource_name, ".dds");
        self.encoder
            .encode(cubemap, &self.engine.target_file_path(&image_name), CUBEMAP_SRGB)
            .with_context(|| format!("Failed to encode cubemap image {}", image_name))?;

        let writer = document.writer();
        writer.start_element("cubemap")?;
        writer.element("srgb", &[("enable", if CUBEMAP_SRGB { "true" } else { "false" })])?;
        writer.element("image", &[("name", naming::file_name(&image_name))])?;
        writer.end_element()?;
        let written = document.finish()?;

        info!(cubemap = %resource_name, "Cubemap exported");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineOptions, FileSystemEngine};
    use crate::source::InMemoryAssetDatabase;
    use image::RgbaImage;

    fn cubemap() -> Cubemap {
        Cubemap::new("Assets/Sky/sky.cubemap", vec![RgbaImage::new(4, 4); 6])
    }

    #[test]
    fn test_cubemap_names() {
        let engine = Arc::new(FileSystemEngine::new(EngineOptions {
            subfolder: "Game".to_string(),
            ..EngineOptions::default()
        }));
        let exporter = CubemapExporter::new(engine, Arc::new(InMemoryAssetDatabase::new()));
        assert_eq!(exporter.evaluate_cubemap_name(&cubemap()), "Game/Sky/sky.xml");
    }

    #[test]
    fn test_missing_importer_is_soft_skip() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(FileSystemEngine::new(EngineOptions {
            output_root: dir.path().to_path_buf(),
            ..EngineOptions::default()
        }));
        let exporter = CubemapExporter::new(engine, Arc::new(InMemoryAssetDatabase::new()));

        assert!(!exporter.export(&cubemap()).unwrap());
        assert!(!dir.path().join("Sky").exists());
    }

    #[test]
    fn test_export_writes_image_and_document() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(FileSystemEngine::new(EngineOptions {
            output_root: dir.path().to_path_buf(),
            ..EngineOptions::default()
        }));
        let assets = Arc::new(InMemoryAssetDatabase::new());
        assets.insert_texture("Assets/Sky/sky.cubemap", TextureImporterSettings { is_readable: false });
        let exporter = CubemapExporter::new(engine, assets.clone());

        assert!(exporter.export(&cubemap()).unwrap());
        assert_eq!(assets.reimport_count(), 1);
        assert!(assets.texture_importer("Assets/Sky/sky.cubemap").unwrap().is_readable);

        let image = std::fs::read(dir.path().join("Sky/sky.dds")).unwrap();
        assert_eq!(&image[..4], b"DDS ");
        let text = std::fs::read_to_string(dir.path().join("Sky/sky.xml")).unwrap();
        assert!(text.contains(r#"<srgb enable="true" />"#) || text.contains(r#"<srgb enable="true"/>"#));
        assert!(text.contains(r#"name="sky.dds""#));
    }

    #[test]
    fn test_bad_faces_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(FileSystemEngine::new(EngineOptions {
            output_root: dir.path().to_path_buf(),
            ..EngineOptions::default()
        }));
        let assets = Arc::new(InMemoryAssetDatabase::new());
        assets.insert_texture("Assets/Sky/sky.cubemap", TextureImporterSettings { is_readable: true });
        let exporter = CubemapExporter::new(engine, assets);

        let broken = Cubemap::new("Assets/Sky/sky.cubemap", vec![RgbaImage::new(4, 4); 5]);
        assert!(exporter.export(&broken).unwrap_err().is_precondition());
        assert!(!dir.path().join("Sky/sky.xml").exists());
        assert!(!dir.path().join("Sky/sky.dds").exists());
    }
}
