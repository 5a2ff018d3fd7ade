//! Export manifests
//!
//! A manifest lists the materials and cubemaps of a project in YAML or JSON.
//! Paths inside it are relative to the project root.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;
use urhoforge_export::source::TextureImporterSettings;
use urhoforge_export::{Cubemap, InMemoryAssetDatabase, SourceMaterial};

/// Cubemap entry: the asset plus its six face images
#[derive(Debug, Clone, Deserialize)]
pub struct CubemapSource {
    pub asset_path: String,
    #[serde(default)]
    pub key: Option<String>,
    /// Import setting of the asset; unreadable cubemaps get reimported
    #[serde(default)]
    pub readable: bool,
    /// Face images in +X, -X, +Y, -Y, +Z, -Z order
    pub faces: [String; 6],
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub materials: Vec<SourceMaterial>,
    #[serde(default)]
    pub cubemaps: Vec<CubemapSource>,
    /// Modification time of the manifest file itself
    #[serde(skip)]
    pub modified: Option<SystemTime>,
}

impl Manifest {
    /// Load a manifest, JSON when the extension says so, YAML otherwise
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("Failed to read manifest {}", path.display()))?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let mut manifest: Manifest = if is_json {
            serde_json::from_str(&text).with_context(|| format!("Invalid manifest {}", path.display()))?
        } else {
            serde_yaml::from_str(&text).with_context(|| format!("Invalid manifest {}", path.display()))?
        };
        manifest.modified = fs::metadata(path).and_then(|m| m.modified()).ok();

        debug!(
            materials = manifest.materials.len(),
            cubemaps = manifest.cubemaps.len(),
            "Manifest loaded"
        );
        Ok(manifest)
    }

    /// Materials with their source timestamps filled in from the project.
    /// A material is as new as its asset or the manifest, whichever changed
    /// last.
    pub fn materials_in(&self, project: &Project) -> Vec<SourceMaterial> {
        self.materials
            .iter()
            .cloned()
            .map(|mut material| {
                material.last_write_time = project.modified(&material.asset_path).max(self.modified);
                material
            })
            .collect()
    }

    /// Asset database holding the import settings of every cubemap
    pub fn asset_database(&self) -> InMemoryAssetDatabase {
        let assets = InMemoryAssetDatabase::new();
        for cubemap in &self.cubemaps {
            assets.insert_texture(
                cubemap.asset_path.clone(),
                TextureImporterSettings {
                    is_readable: cubemap.readable,
                },
            );
        }
        assets
    }
}

/// Authoring project on disk
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
}

impl Project {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self, asset_path: &str) -> PathBuf {
        self.root.join(asset_path.replace('\\', "/"))
    }

    /// Modification time of an asset, `None` when it does not exist
    pub fn modified(&self, asset_path: &str) -> Option<SystemTime> {
        fs::metadata(self.path(asset_path)).and_then(|m| m.modified()).ok()
    }

    /// Decode the faces of a cubemap. The source time is the newest of the
    /// asset, its faces and the manifest.
    pub fn load_cubemap(&self, source: &CubemapSource, manifest_time: Option<SystemTime>) -> Result<Cubemap> {
        let mut faces = Vec::with_capacity(source.faces.len());
        let mut newest = self.modified(&source.asset_path).max(manifest_time);

        for face in &source.faces {
            let image = image::open(self.path(face))
                .with_context(|| format!("Failed to load cubemap face {}", face))?
                .to_rgba8();
            faces.push(image);
            newest = newest.max(self.modified(face));
        }

        let cubemap = Cubemap::new(source.asset_path.clone(), faces)
            .with_key(source.key.clone().unwrap_or_else(|| source.asset_path.clone()))
            .with_last_write_time(newest.unwrap_or_else(SystemTime::now));
        Ok(cubemap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_from_yaml() {
        let yaml = r#"
materials:
  - name: Rock
    asset_path: Assets/Materials/Rock.mat
    shader: Standard
cubemaps:
  - asset_path: Assets/Sky/sky.cubemap
    faces: [px.png, nx.png, py.png, ny.png, pz.png, nz.png]
"#;
        let manifest: Manifest = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(manifest.materials[0].name, "Rock");
        assert_eq!(manifest.cubemaps[0].faces[5], "nz.png");
        assert!(!manifest.cubemaps[0].readable);

        let assets = manifest.asset_database();
        use urhoforge_export::AssetDatabase;
        assert!(!assets.texture_importer("Assets/Sky/sky.cubemap").unwrap().is_readable);
    }

    #[test]
    fn test_manifest_edit_marks_materials_changed() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::new(dir.path());
        let manifest_path = dir.path().join("manifest.yaml");
        fs::write(
            &manifest_path,
            "materials:\n  - name: Rock\n    asset_path: Assets/Materials/Rock.mat\n    shader: Standard\n",
        )
        .unwrap();

        let manifest = Manifest::load(&manifest_path).unwrap();
        assert!(manifest.modified.is_some());

        // The asset file does not exist, so the manifest decides
        let materials = manifest.materials_in(&project);
        assert_eq!(materials[0].last_write_time, manifest.modified);

        let detached = Manifest {
            modified: None,
            ..manifest
        };
        let materials = detached.materials_in(&project);
        assert_eq!(materials[0].last_write_time, None);
        assert!(materials[0].source_time() > SystemTime::UNIX_EPOCH);
    }
}
