//! Export engine: the collaborators the encoders talk to
//!
//! The encoders never touch the filesystem directly. They ask an
//! [`ExportEngine`] to schedule dependent textures, to resolve texture names
//! and to open change-tracked output documents.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use urhoforge_core::{Error, Result};

use crate::naming;
use crate::source::SourceTexture;
use crate::textures::DdsPixelFormat;
use crate::xml::XmlDocument;

/// Texture formats Urho3D loads directly; anything else is converted to PNG
const NATIVE_TEXTURE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tga", "bmp", "dds", "ktx", "pvr", "hdr"];

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Directory all resources are written under
    pub output_root: PathBuf,
    /// Resource subfolder prepended to every derived name
    pub subfolder: String,
    /// Skip outputs that are newer than their source
    pub export_updated_only: bool,
    /// Pixel format of exported cubemap images
    pub cubemap_format: DdsPixelFormat,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("output"),
            subfolder: String::new(),
            export_updated_only: true,
            cubemap_format: DdsPixelFormat::Rgba8,
        }
    }
}

impl EngineOptions {
    /// Load options from a YAML or JSON file (chosen by extension)
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
            _ => Error::Io(e),
        })?;

        let parsed: std::result::Result<Self, String> = if naming::has_extension(&path.to_string_lossy(), "json") {
            serde_json::from_str(&text).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&text).map_err(|e| e.to_string())
        };
        parsed.map_err(|message| Error::InvalidConfig {
            message: format!("{}: {}", path.display(), message),
        })
    }
}

/// Texture export work queued by the encoders
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduledTexture {
    /// Copy (or convert) the texture to `name`
    Copy { texture: SourceTexture, name: String },
    /// Bake an ambient-occlusion variant of the texture to `name`
    Occlusion {
        texture: SourceTexture,
        strength: f32,
        name: String,
    },
}

impl ScheduledTexture {
    /// Output resource name
    pub fn name(&self) -> &str {
        match self {
            ScheduledTexture::Copy { name, .. } | ScheduledTexture::Occlusion { name, .. } => name,
        }
    }
}

/// Services the encoders depend on
pub trait ExportEngine: Send + Sync {
    /// Engine configuration
    fn options(&self) -> &EngineOptions;

    /// Queue a texture for export. Scheduling the same texture twice queues
    /// it once; a name already claimed by another texture is skipped.
    fn schedule_asset_export(&self, texture: &SourceTexture);

    /// Queue an ambient-occlusion bake of `texture` to the resource `name`
    fn schedule_ao_export(&self, texture: &SourceTexture, strength: f32, name: &str);

    /// Resource name of a texture; empty when the texture is unavailable
    fn evaluate_texture_name(&self, texture: &SourceTexture) -> String;

    /// Open an output document for `resource_name`.
    ///
    /// Returns `None` when the output is already up to date (or was already
    /// produced during this run); the caller then skips the export.
    fn try_create_xml(&self, key: &str, resource_name: &str, source_time: SystemTime) -> Result<Option<XmlDocument>>;

    /// Absolute path of a resource
    fn target_file_path(&self, resource_name: &str) -> PathBuf;
}

/// True if `path` exists and was modified no earlier than `source_time`
pub fn is_up_to_date(path: &Path, source_time: SystemTime) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map(|modified| modified >= source_time)
        .unwrap_or(false)
}

#[derive(Debug, Default)]
struct Schedule {
    /// Texture name -> key of the texture that claimed it
    claimed: HashMap<String, String>,
    pending: Vec<ScheduledTexture>,
}

/// Export engine writing resources below a directory
#[derive(Debug)]
pub struct FileSystemEngine {
    options: EngineOptions,
    schedule: Mutex<Schedule>,
    /// Resource name -> identity key of the asset that claimed it
    created: Mutex<HashMap<String, String>>,
}

impl FileSystemEngine {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            options,
            schedule: Mutex::new(Schedule::default()),
            created: Mutex::new(HashMap::new()),
        }
    }

    /// Drain the textures scheduled so far. Textures already drained are not
    /// queued again.
    pub fn take_scheduled(&self) -> Vec<ScheduledTexture> {
        std::mem::take(&mut self.schedule.lock().pending)
    }

    fn enqueue(&self, owner: &str, item: ScheduledTexture) {
        let mut schedule = self.schedule.lock();
        match schedule.claimed.get(item.name()).cloned() {
            Some(claimed_by) if claimed_by == owner => {}
            Some(claimed_by) => {
                warn!(
                    name = %item.name(),
                    owner = %claimed_by,
                    key = %owner,
                    "Texture name already claimed by another asset, skipping"
                );
            }
            None => {
                debug!(name = %item.name(), "Texture scheduled");
                schedule.claimed.insert(item.name().to_string(), owner.to_string());
                schedule.pending.push(item);
            }
        }
    }
}

impl ExportEngine for FileSystemEngine {
    fn options(&self) -> &EngineOptions {
        &self.options
    }

    fn schedule_asset_export(&self, texture: &SourceTexture) {
        let name = self.evaluate_texture_name(texture);
        if name.is_empty() {
            return;
        }
        self.enqueue(
            texture.key(),
            ScheduledTexture::Copy {
                texture: texture.clone(),
                name,
            },
        );
    }

    fn schedule_ao_export(&self, texture: &SourceTexture, strength: f32, name: &str) {
        self.enqueue(
            texture.key(),
            ScheduledTexture::Occlusion {
                texture: texture.clone(),
                strength,
                name: name.to_string(),
            },
        );
    }

    fn evaluate_texture_name(&self, texture: &SourceTexture) -> String {
        if texture.asset_path.trim().is_empty() {
            return String::new();
        }

        let name = naming::rel_path_from_asset_path(&self.options.subfolder, &texture.asset_path);
        let native = naming::extension(&name)
            .map(|ext| NATIVE_TEXTURE_EXTENSIONS.iter().any(|n| n.eq_ignore_ascii_case(ext)))
            .unwrap_or(false);

        if native {
            name
        } else {
            naming::replace_extension(&name, ".png")
        }
    }

    fn try_create_xml(&self, key: &str, resource_name: &str, source_time: SystemTime) -> Result<Option<XmlDocument>> {
        let resource_name = resource_name.trim();
        if resource_name.is_empty() {
            return Err(Error::invalid_argument("resource_name", "resource name is blank"));
        }

        {
            let mut created = self.created.lock();
            match created.get(resource_name) {
                Some(owner) if owner == key => {
                    debug!(resource = %resource_name, "Already exported in this run");
                    return Ok(None);
                }
                Some(owner) => {
                    warn!(
                        resource = %resource_name,
                        owner = %owner,
                        key = %key,
                        "Resource name already claimed by another asset, skipping"
                    );
                    return Ok(None);
                }
                None => {
                    created.insert(resource_name.to_string(), key.to_string());
                }
            }
        }

        let path = self.target_file_path(resource_name);
        if self.options.export_updated_only && is_up_to_date(&path, source_time) {
            debug!(resource = %resource_name, "Output is up to date");
            return Ok(None);
        }

        Ok(Some(XmlDocument::create(path)))
    }

    fn target_file_path(&self, resource_name: &str) -> PathBuf {
        self.options.output_root.join(resource_name)
    }
}
