//! Authoring-side object model
//!
//! Materials, textures and cubemaps as the authoring tool describes them,
//! plus the asset database that owns texture import settings. Everything
//! here is input to the encoders; nothing is mutated during encoding except
//! through [`AssetDatabase::reimport`].

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;

use image::RgbaImage;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use urhoforge_core::{Color, Error, ParameterValue, Result, Vector2, Vector4};

/// Render queue of opaque geometry
pub const RENDER_QUEUE_GEOMETRY: i32 = 2000;
/// Render queue of alpha-tested (cutout) geometry
pub const RENDER_QUEUE_ALPHA_TEST: i32 = 2450;
/// Render queue of alpha-blended geometry
pub const RENDER_QUEUE_TRANSPARENT: i32 = 3000;

/// Property holding the main (albedo) texture and its UV transform
pub const MAIN_TEXTURE_PROPERTY: &str = "_MainTex";
/// Keyword enabling emission on a material
pub const EMISSION_KEYWORD: &str = "_EMISSION";

/// Number of faces in a cubemap (+X, -X, +Y, -Y, +Z, -Z)
pub const CUBEMAP_FACES: usize = 6;

/// Reference to a texture asset
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceTexture {
    /// Project-relative asset path (`Assets/Textures/rock.png`)
    pub asset_path: String,
    /// Stable identity; defaults to the asset path
    #[serde(default)]
    pub key: Option<String>,
}

impl SourceTexture {
    pub fn new(asset_path: impl Into<String>) -> Self {
        Self {
            asset_path: asset_path.into(),
            key: None,
        }
    }

    /// Identity used to deduplicate export work
    pub fn key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.asset_path)
    }
}

/// Texture property with its UV transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureProperty {
    #[serde(default)]
    pub texture: Option<SourceTexture>,
    #[serde(default)]
    pub offset: Vector2,
    #[serde(default = "unit_scale")]
    pub scale: Vector2,
}

fn unit_scale() -> Vector2 {
    Vector2::ONE
}

impl TextureProperty {
    pub fn new(texture: SourceTexture) -> Self {
        Self {
            texture: Some(texture),
            offset: Vector2::ZERO,
            scale: Vector2::ONE,
        }
    }
}

/// A single shader property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialProperty {
    Float(f32),
    Color(Color),
    Vector(Vector4),
    Texture(TextureProperty),
}

fn default_render_queue() -> i32 {
    RENDER_QUEUE_GEOMETRY
}

/// Material as authored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMaterial {
    /// Display name
    pub name: String,
    /// Asset the material lives in (a `.mat` file or a model it is embedded in)
    #[serde(default)]
    pub asset_path: String,
    /// Stable identity; defaults to `asset_path#name`
    #[serde(default)]
    pub key: Option<String>,
    /// Shader name (`Standard`, `Unlit/Texture`, ...)
    pub shader: String,
    #[serde(default = "default_render_queue")]
    pub render_queue: i32,
    #[serde(default)]
    pub keywords: BTreeSet<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, MaterialProperty>,
    /// Parameters passed through to the output document as-is
    #[serde(default)]
    pub extra_parameters: Vec<(String, ParameterValue)>,
    /// Last modification time of the source asset
    #[serde(skip)]
    pub last_write_time: Option<SystemTime>,
}

impl SourceMaterial {
    pub fn new(name: impl Into<String>, asset_path: impl Into<String>, shader: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            asset_path: asset_path.into(),
            key: None,
            shader: shader.into(),
            render_queue: RENDER_QUEUE_GEOMETRY,
            keywords: BTreeSet::new(),
            properties: BTreeMap::new(),
            extra_parameters: Vec::new(),
            last_write_time: None,
        }
    }

    /// Builder-style property setter
    pub fn with_property(mut self, name: impl Into<String>, value: MaterialProperty) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    /// Builder-style keyword setter
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keywords.insert(keyword.into());
        self
    }

    /// Identity of the material
    pub fn key(&self) -> String {
        match &self.key {
            Some(key) => key.clone(),
            None => format!("{}#{}", self.asset_path, self.name),
        }
    }

    /// Source timestamp; an unknown time counts as changed now
    pub fn source_time(&self) -> SystemTime {
        self.last_write_time.unwrap_or_else(SystemTime::now)
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn is_keyword_enabled(&self, keyword: &str) -> bool {
        self.keywords.contains(keyword)
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        match self.properties.get(name)? {
            MaterialProperty::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn color(&self, name: &str) -> Option<Color> {
        match self.properties.get(name)? {
            MaterialProperty::Color(c) => Some(*c),
            MaterialProperty::Vector(v) => Some(Color::new(v.x, v.y, v.z, v.w)),
            _ => None,
        }
    }

    pub fn texture_property(&self, name: &str) -> Option<&TextureProperty> {
        match self.properties.get(name)? {
            MaterialProperty::Texture(t) => Some(t),
            _ => None,
        }
    }

    /// Texture bound to a property, if any
    pub fn texture(&self, name: &str) -> Option<&SourceTexture> {
        self.texture_property(name)?.texture.as_ref()
    }

    pub fn main_texture_offset(&self) -> Vector2 {
        self.texture_property(MAIN_TEXTURE_PROPERTY)
            .map(|t| t.offset)
            .unwrap_or(Vector2::ZERO)
    }

    pub fn main_texture_scale(&self) -> Vector2 {
        self.texture_property(MAIN_TEXTURE_PROPERTY)
            .map(|t| t.scale)
            .unwrap_or(Vector2::ONE)
    }
}

/// Cubemap texture with its six faces decoded
#[derive(Debug, Clone)]
pub struct Cubemap {
    pub asset_path: String,
    pub key: String,
    pub last_write_time: SystemTime,
    /// Faces in +X, -X, +Y, -Y, +Z, -Z order
    pub faces: Vec<RgbaImage>,
}

impl Cubemap {
    pub fn new(asset_path: impl Into<String>, faces: Vec<RgbaImage>) -> Self {
        let asset_path = asset_path.into();
        Self {
            key: asset_path.clone(),
            asset_path,
            last_write_time: SystemTime::UNIX_EPOCH,
            faces,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_last_write_time(mut self, time: SystemTime) -> Self {
        self.last_write_time = time;
        self
    }

    /// Check the face layout and return the edge length of a face
    pub fn face_size(&self) -> Result<u32> {
        if self.faces.len() != CUBEMAP_FACES {
            return Err(Error::invalid_argument(
                "faces",
                format!("expected {} cubemap faces, got {}", CUBEMAP_FACES, self.faces.len()),
            ));
        }

        let size = self.faces[0].width();
        let consistent = self
            .faces
            .iter()
            .all(|face| face.width() == size && face.height() == size);
        if size == 0 || !consistent {
            return Err(Error::invalid_argument(
                "faces",
                "cubemap faces must be square, non-empty and of equal size",
            ));
        }
        Ok(size)
    }
}

/// Import settings of a texture asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextureImporterSettings {
    /// Whether pixel data can be read back after import
    pub is_readable: bool,
}

/// Access to asset import settings
pub trait AssetDatabase: Send + Sync {
    /// Import settings of the texture at `asset_path`; `None` when the asset
    /// was not imported as a texture.
    fn texture_importer(&self, asset_path: &str) -> Option<TextureImporterSettings>;

    /// Store `settings` for the asset and import it again
    fn reimport(&self, asset_path: &str, settings: &TextureImporterSettings) -> Result<()>;
}

/// Asset database kept in memory
#[derive(Debug, Default)]
pub struct InMemoryAssetDatabase {
    importers: RwLock<HashMap<String, TextureImporterSettings>>,
    reimports: AtomicUsize,
}

impl InMemoryAssetDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a texture asset with its import settings
    pub fn insert_texture(&self, asset_path: impl Into<String>, settings: TextureImporterSettings) {
        self.importers.write().insert(asset_path.into(), settings);
    }

    /// Number of reimports performed so far
    pub fn reimport_count(&self) -> usize {
        self.reimports.load(Ordering::Relaxed)
    }
}

impl AssetDatabase for InMemoryAssetDatabase {
    fn texture_importer(&self, asset_path: &str) -> Option<TextureImporterSettings> {
        self.importers.read().get(asset_path).copied()
    }

    fn reimport(&self, asset_path: &str, settings: &TextureImporterSettings) -> Result<()> {
        let mut importers = self.importers.write();
        let entry = importers.get_mut(asset_path).ok_or_else(|| {
            Error::invalid_argument("asset_path", format!("no importer for {}", asset_path))
        })?;
        *entry = *settings;
        self.reimports.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_accessors() {
        let material = SourceMaterial::new("Rock", "Assets/Materials/Rock.mat", "Standard")
            .with_property("_Glossiness", MaterialProperty::Float(0.6))
            .with_property("_Color", MaterialProperty::Color(Color::rgb(1.0, 0.0, 0.0)))
            .with_property(
                MAIN_TEXTURE_PROPERTY,
                MaterialProperty::Texture(TextureProperty {
                    texture: Some(SourceTexture::new("Assets/Textures/rock.png")),
                    offset: Vector2::new(0.0, 0.5),
                    scale: Vector2::new(2.0, 1.0),
                }),
            )
            .with_keyword(EMISSION_KEYWORD);

        assert_eq!(material.float("_Glossiness"), Some(0.6));
        assert_eq!(material.float("_Color"), None);
        assert_eq!(material.color("_Color"), Some(Color::rgb(1.0, 0.0, 0.0)));
        assert_eq!(material.texture(MAIN_TEXTURE_PROPERTY).unwrap().key(), "Assets/Textures/rock.png");
        assert_eq!(material.main_texture_scale(), Vector2::new(2.0, 1.0));
        assert!(material.is_keyword_enabled(EMISSION_KEYWORD));
        assert_eq!(material.key(), "Assets/Materials/Rock.mat#Rock");
    }

    #[test]
    fn test_material_from_yaml() {
        let yaml = r#"
name: Glass
asset_path: Assets/Materials/Glass.mat
shader: Standard
render_queue: 3000
properties:
  _MainTex:
    texture:
      texture:
        asset_path: Assets/Textures/glass.png
  _Metallic:
    float: 0.25
extra_parameters:
  - [MatSpecPower, {float: 2}]
"#;
        let material: SourceMaterial = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(material.render_queue, RENDER_QUEUE_TRANSPARENT);
        assert_eq!(material.float("_Metallic"), Some(0.25));
        assert_eq!(material.main_texture_scale(), Vector2::ONE);
        assert_eq!(material.extra_parameters[0].0, "MatSpecPower");
    }

    #[test]
    fn test_cubemap_face_validation() {
        let face = RgbaImage::new(4, 4);
        let cubemap = Cubemap::new("Assets/Sky/sky.cubemap", vec![face.clone(); 6]);
        assert_eq!(cubemap.face_size().unwrap(), 4);

        let short = Cubemap::new("Assets/Sky/sky.cubemap", vec![face.clone(); 5]);
        assert!(short.face_size().unwrap_err().is_precondition());

        let mut uneven = vec![face; 6];
        uneven[3] = RgbaImage::new(4, 2);
        assert!(Cubemap::new("Assets/Sky/sky.cubemap", uneven).face_size().is_err());
    }

    #[test]
    fn test_in_memory_reimport() {
        let db = InMemoryAssetDatabase::new();
        db.insert_texture("Assets/Sky/sky.cubemap", TextureImporterSettings { is_readable: false });

        db.reimport("Assets/Sky/sky.cubemap", &TextureImporterSettings { is_readable: true })
            .unwrap();
        assert!(db.texture_importer("Assets/Sky/sky.cubemap").unwrap().is_readable);
        assert_eq!(db.reimport_count(), 1);
        assert!(db.reimport("Assets/missing.png", &TextureImporterSettings::default()).is_err());
    }
}
