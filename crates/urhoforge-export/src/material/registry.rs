//! Exporter registry
//!
//! Keeps exporters sorted by priority (descending) and hands each material
//! to the first exporter that accepts it.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;
use urhoforge_core::{Error, Result};

use super::{DefaultMaterialExporter, MaterialExporter, StandardMaterialExporter};
use crate::engine::ExportEngine;
use crate::source::SourceMaterial;

/// Priority-ordered set of material exporters
#[derive(Default)]
pub struct MaterialExporterRegistry {
    exporters: RwLock<Vec<Arc<dyn MaterialExporter>>>,
}

impl MaterialExporterRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in exporters
    pub fn with_defaults(engine: Arc<dyn ExportEngine>) -> Self {
        let registry = Self::new();
        registry.register(Arc::new(StandardMaterialExporter::new(engine.clone())));
        registry.register(Arc::new(DefaultMaterialExporter::new(engine)));
        registry
    }

    /// Add an exporter. Exporters of equal priority keep registration order.
    pub fn register(&self, exporter: Arc<dyn MaterialExporter>) {
        let mut exporters = self.exporters.write();
        exporters.push(exporter);
        exporters.sort_by_key(|e| std::cmp::Reverse(e.priority()));
    }

    pub fn len(&self) -> usize {
        self.exporters.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.exporters.read().is_empty()
    }

    /// Highest-priority exporter accepting the material
    pub fn exporter_for(&self, material: &SourceMaterial) -> Option<Arc<dyn MaterialExporter>> {
        self.exporters
            .read()
            .iter()
            .find(|e| e.can_export_material(material))
            .cloned()
    }

    /// Export a material with the matching exporter
    pub fn export_material(&self, material: &SourceMaterial) -> Result<bool> {
        let exporter = self.exporter_for(material).ok_or_else(|| {
            Error::invalid_argument("material", format!("no exporter accepts shader `{}`", material.shader))
        })?;
        debug!(material = %material.name, exporter = exporter.name(), "Exporting material");
        exporter.export_material(material)
    }

    /// Resource name the matching exporter would write the material to
    pub fn evaluate_material_name(&self, material: &SourceMaterial) -> Option<String> {
        self.exporter_for(material)?.evaluate_material_name(material)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineOptions, FileSystemEngine};

    #[test]
    fn test_priority_order() {
        let engine: Arc<dyn ExportEngine> = Arc::new(FileSystemEngine::new(EngineOptions::default()));
        let registry = MaterialExporterRegistry::new();
        registry.register(Arc::new(DefaultMaterialExporter::new(engine.clone())));
        registry.register(Arc::new(StandardMaterialExporter::new(engine)));
        assert_eq!(registry.len(), 2);

        let standard = SourceMaterial::new("Rock", "Assets/Rock.mat", "Standard");
        let unlit = SourceMaterial::new("Glow", "Assets/Glow.mat", "Unlit/Color");
        assert_eq!(registry.exporter_for(&standard).unwrap().name(), "standard");
        assert_eq!(registry.exporter_for(&unlit).unwrap().name(), "default");
        assert_eq!(registry.evaluate_material_name(&unlit).unwrap(), "Glow.xml");
    }

    #[test]
    fn test_empty_registry_rejects_material() {
        let registry = MaterialExporterRegistry::new();
        assert!(registry.is_empty());
        let err = registry
            .export_material(&SourceMaterial::new("Rock", "Assets/Rock.mat", "Standard"))
            .unwrap_err();
        assert!(err.is_precondition());
    }

    #[test]
    fn test_material_without_source_time_is_reexported() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("Materials/Rock.xml");
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(&target, "<material/>").unwrap();

        let engine: Arc<dyn ExportEngine> = Arc::new(FileSystemEngine::new(EngineOptions {
            output_root: dir.path().to_path_buf(),
            ..EngineOptions::default()
        }));
        let registry = MaterialExporterRegistry::with_defaults(engine);

        let material = SourceMaterial::new("Rock", "Assets/Materials/Rock.mat", "Standard");
        assert!(material.last_write_time.is_none());
        assert!(registry.export_material(&material).unwrap());

        let text = std::fs::read_to_string(&target).unwrap();
        assert!(text.contains("technique"));
    }
}
