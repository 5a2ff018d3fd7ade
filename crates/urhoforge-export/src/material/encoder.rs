//! Shared material encoding
//!
//! [`MaterialEncoder`] holds the writing rules every exporter variant shares:
//! texture slots, the PBR material document, the simple-shader UV parameters
//! and the derived names of materials and baked occlusion maps.

use std::sync::Arc;

use tracing::{debug, info};
use urhoforge_core::{ParameterValue, Result, ResultExt, Vector4};

use super::model::{ShaderArguments, UrhoPbrMaterial};
use super::parameters::write_parameter;
use crate::engine::ExportEngine;
use crate::naming;
use crate::source::{
    EMISSION_KEYWORD, MAIN_TEXTURE_PROPERTY, RENDER_QUEUE_ALPHA_TEST, RENDER_QUEUE_TRANSPARENT, SourceMaterial,
    SourceTexture,
};
use crate::xml::XmlWriter;

/// Texture units of the material document
pub mod units {
    pub const DIFFUSE: &str = "diffuse";
    pub const NORMAL: &str = "normal";
    pub const SPECULAR: &str = "specular";
    pub const EMISSIVE: &str = "emissive";
}

/// Pixel shader define enabling alpha-tested rendering
pub const ALPHA_MASK_DEFINE: &str = "ALPHAMASK";

/// Strength at or above which an occlusion map is used as-is
const FULL_AO_STRENGTH: f32 = 0.999;

/// Material writing rules shared by all exporters
#[derive(Clone)]
pub struct MaterialEncoder {
    engine: Arc<dyn ExportEngine>,
}

impl std::fmt::Debug for MaterialEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterialEncoder").finish_non_exhaustive()
    }
}

impl MaterialEncoder {
    pub fn new(engine: Arc<dyn ExportEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &dyn ExportEngine {
        self.engine.as_ref()
    }

    pub fn write_technique(&self, writer: &mut XmlWriter, name: &str) -> Result<()> {
        writer.element("technique", &[("name", name)])
    }

    /// Schedule `texture` for export and bind its resource name to `unit`
    pub fn write_texture(&self, texture: &SourceTexture, writer: &mut XmlWriter, unit: &str) -> Result<bool> {
        self.engine.schedule_asset_export(texture);
        let name = self.engine.evaluate_texture_name(texture);
        self.write_texture_name(Some(name.as_str()), writer, unit)
    }

    /// Bind an already resolved resource name to `unit`.
    ///
    /// Blank names write nothing and return `false`.
    pub fn write_texture_name(&self, name: Option<&str>, writer: &mut XmlWriter, unit: &str) -> Result<bool> {
        let Some(name) = name.filter(|n| !n.trim().is_empty()) else {
            return Ok(false);
        };
        writer.element("texture", &[("unit", unit), ("name", name)])?;
        Ok(true)
    }

    /// Schedule a texture and return its resource name, `None` when unavailable
    pub fn resolve_texture(&self, texture: Option<&SourceTexture>) -> Option<String> {
        let texture = texture?;
        self.engine.schedule_asset_export(texture);
        let name = self.engine.evaluate_texture_name(texture);
        (!name.trim().is_empty()).then_some(name)
    }

    /// Write a complete PBR material document
    pub fn write_material(&self, writer: &mut XmlWriter, technique_name: &str, material: &UrhoPbrMaterial) -> Result<()> {
        writer.start_element("material")?;
        self.write_technique(writer, technique_name)?;

        self.write_texture_name(material.base_color_texture.as_deref(), writer, units::DIFFUSE)?;
        self.write_texture_name(material.normal_texture.as_deref(), writer, units::NORMAL)?;
        self.write_texture_name(material.metallic_roughness_texture.as_deref(), writer, units::SPECULAR)?;
        if !self.write_texture_name(material.emissive_texture.as_deref(), writer, units::EMISSIVE)? {
            self.write_texture_name(material.ao_texture.as_deref(), writer, units::EMISSIVE)?;
        }

        let fixed = [
            ("MatEmissiveColor", ParameterValue::Color(material.emissive_color)),
            ("MatDiffColor", ParameterValue::Color(material.base_color)),
            ("MatEnvMapColor", ParameterValue::Color(material.mat_env_map_color)),
            ("MatSpecColor", ParameterValue::Color(material.mat_spec_color)),
            ("Roughness", ParameterValue::Float(material.roughness)),
            ("Metallic", ParameterValue::Float(material.metallic)),
            ("UOffset", ParameterValue::Vector4(material.u_offset)),
            ("VOffset", ParameterValue::Vector4(material.v_offset)),
        ];
        for (name, value) in &fixed {
            write_parameter(writer, name, value)?;
        }

        for (name, value) in &material.extra_parameters {
            write_parameter(writer, name, value)?;
        }

        if !material.pixel_shader_defines.is_empty() || !material.vertex_shader_defines.is_empty() {
            let ps = join_defines(&material.pixel_shader_defines);
            let vs = join_defines(&material.vertex_shader_defines);
            writer.element("shader", &[("psdefines", ps.as_str()), ("vsdefines", vs.as_str())])?;
        }

        writer.end_element()
    }

    /// Write the UV transform of a simple-shader material, plus the alpha
    /// mask define for cutout materials
    pub fn write_common_parameters(&self, writer: &mut XmlWriter, arguments: &ShaderArguments) -> Result<()> {
        let scale = arguments.main_texture_scale;
        let offset = arguments.main_texture_offset;
        write_parameter(writer, "UOffset", &Vector4::new(scale.x, 0.0, 0.0, offset.x).into())?;
        write_parameter(writer, "VOffset", &Vector4::new(0.0, scale.y, 0.0, offset.y).into())?;

        if arguments.alpha_test {
            writer.element("shader", &[("psdefines", ALPHA_MASK_DEFINE)])?;
        }
        Ok(())
    }

    /// Resource name of the baked occlusion map for `occlusion` at `strength`.
    ///
    /// Full strength maps to `<base>.AO.png`; partial strengths carry the
    /// strength with three decimals (`<base>.AO.0.500.png`).
    pub fn build_ao_texture_name(&self, occlusion: Option<&SourceTexture>, strength: f32) -> Option<String> {
        let occlusion = occlusion?;
        if strength <= 0.0 || strength.is_nan() {
            return None;
        }

        let base_name = self.engine.evaluate_texture_name(occlusion);
        if base_name.trim().is_empty() {
            return None;
        }
        Some(ao_texture_name(&base_name, strength))
    }

    /// Resource name of a material document, `None` when the material is not
    /// backed by an asset
    pub fn evaluate_material_name(&self, material: &SourceMaterial) -> Option<String> {
        if material.asset_path.trim().is_empty() {
            return None;
        }

        let relative = naming::rel_path_from_asset_path(&self.engine.options().subfolder, &material.asset_path);
        if naming::has_extension(&material.asset_path, "mat") {
            Some(naming::replace_extension(&relative, ".xml"))
        } else {
            let suffix = format!("/{}.xml", naming::safe_file_name(&material.name));
            Some(naming::replace_extension(&relative, &suffix))
        }
    }

    /// Derive the simple-shader flags of a material
    pub fn setup_flags(material: &SourceMaterial) -> ShaderArguments {
        let mut arguments = ShaderArguments {
            shader: material.shader.clone(),
            transparent: material.render_queue == RENDER_QUEUE_TRANSPARENT,
            alpha_test: material.render_queue == RENDER_QUEUE_ALPHA_TEST,
            has_emission: material.is_keyword_enabled(EMISSION_KEYWORD),
            ..ShaderArguments::default()
        };
        if material.has_property(MAIN_TEXTURE_PROPERTY) {
            arguments.main_texture_offset = material.main_texture_offset();
            arguments.main_texture_scale = material.main_texture_scale();
        }
        arguments
    }

    /// Open the material's output document and fill it with `write`.
    ///
    /// Returns `false` without calling `write` when the document is up to
    /// date or the material has no resource name.
    pub fn write_document<F>(&self, material: &SourceMaterial, write: F) -> Result<bool>
    where
        F: FnOnce(&mut XmlWriter) -> Result<()>,
    {
        let Some(name) = self.evaluate_material_name(material) else {
            debug!(material = %material.name, "Material has no asset path, skipped");
            return Ok(false);
        };

        let Some(mut document) = self.engine.try_create_xml(&material.key(), &name, material.source_time())? else {
            return Ok(false);
        };

        write(document.writer()).with_context(|| format!("Failed to encode material {}", name))?;
        let written = document.finish().with_context(|| format!("Failed to write material {}", name))?;
        if written {
            info!(material = %name, "Material exported");
        }
        Ok(written)
    }
}

fn join_defines(defines: &std::collections::BTreeSet<String>) -> String {
    defines.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
}

/// Occlusion map name for a resolved base name and a positive strength
pub fn ao_texture_name(base_name: &str, strength: f32) -> String {
    if strength >= FULL_AO_STRENGTH {
        naming::replace_extension(base_name, ".AO.png")
    } else {
        naming::replace_extension(base_name, &format!(".AO.{}.png", three_decimals(strength)))
    }
}

/// `0.000` formatting with midpoints rounded away from zero.
/// An `f32` times 1000 is exact in `f64`, so ties are detected exactly.
fn three_decimals(value: f32) -> String {
    let millis = (f64::from(value.abs()) * 1000.0).round() as u64;
    let sign = if value < 0.0 && millis > 0 { "-" } else { "" };
    format!("{}{}.{:03}", sign, millis / 1000, millis % 1000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineOptions, FileSystemEngine};
    use crate::source::{MaterialProperty, TextureProperty};
    use urhoforge_core::Vector2;

    fn encoder(subfolder: &str) -> MaterialEncoder {
        MaterialEncoder::new(Arc::new(FileSystemEngine::new(EngineOptions {
            subfolder: subfolder.to_string(),
            ..EngineOptions::default()
        })))
    }

    #[test]
    fn test_ao_texture_names() {
        let encoder = encoder("");
        let rock = SourceTexture::new("Assets/Textures/rock.png");

        assert_eq!(encoder.build_ao_texture_name(None, 1.0), None);
        assert_eq!(encoder.build_ao_texture_name(Some(&rock), 0.0), None);
        assert_eq!(encoder.build_ao_texture_name(Some(&rock), -2.0), None);
        assert_eq!(encoder.build_ao_texture_name(Some(&rock), 0.9995).unwrap(), "Textures/rock.AO.png");
        assert_eq!(encoder.build_ao_texture_name(Some(&rock), 0.5).unwrap(), "Textures/rock.AO.0.500.png");
        assert_eq!(encoder.build_ao_texture_name(Some(&rock), 0.25).unwrap(), "Textures/rock.AO.0.250.png");
    }

    #[test]
    fn test_ao_texture_names_round_midpoints_up() {
        assert_eq!(ao_texture_name("Textures/rock.png", 0.5625), "Textures/rock.AO.0.563.png");
        assert_eq!(ao_texture_name("Textures/rock.png", 0.0625), "Textures/rock.AO.0.063.png");
        assert_eq!(ao_texture_name("Textures/rock.png", 0.3125), "Textures/rock.AO.0.313.png");
        assert_eq!(ao_texture_name("Textures/rock.png", 0.0005), "Textures/rock.AO.0.001.png");
        assert_eq!(ao_texture_name("Textures/rock.png", 0.1234), "Textures/rock.AO.0.123.png");
    }

    #[test]
    fn test_material_names() {
        let encoder = encoder("Game");

        let standalone = SourceMaterial::new("Rock", "Assets/Materials/Rock.MAT", "Standard");
        assert_eq!(encoder.evaluate_material_name(&standalone).unwrap(), "Game/Materials/Rock.xml");

        let embedded = SourceMaterial::new("Body: Paint", "Assets/Models/car.fbx", "Standard");
        assert_eq!(encoder.evaluate_material_name(&embedded).unwrap(), "Game/Models/car/Body_ Paint.xml");

        let unsaved = SourceMaterial::new("Temp", "  ", "Standard");
        assert_eq!(encoder.evaluate_material_name(&unsaved), None);
    }

    #[test]
    fn test_setup_flags() {
        let mut material = SourceMaterial::new("Leaves", "Assets/Leaves.mat", "Legacy Shaders/Diffuse")
            .with_keyword(EMISSION_KEYWORD);
        material.render_queue = RENDER_QUEUE_ALPHA_TEST;

        let arguments = MaterialEncoder::setup_flags(&material);
        assert!(arguments.alpha_test);
        assert!(!arguments.transparent);
        assert!(arguments.has_emission);
        assert_eq!(arguments.main_texture_scale, Vector2::ONE);

        let material = material.with_property(
            MAIN_TEXTURE_PROPERTY,
            MaterialProperty::Texture(TextureProperty {
                texture: None,
                offset: Vector2::new(0.0, 0.5),
                scale: Vector2::new(2.0, 1.0),
            }),
        );
        let arguments = MaterialEncoder::setup_flags(&material);
        assert_eq!(arguments.main_texture_offset, Vector2::new(0.0, 0.5));
        assert_eq!(arguments.main_texture_scale, Vector2::new(2.0, 1.0));
    }

    #[test]
    fn test_shader_defines_keep_both_attributes() {
        let encoder = encoder("");
        let mut material = UrhoPbrMaterial::default();
        material.pixel_shader_defines.insert(ALPHA_MASK_DEFINE.to_string());
        material.pixel_shader_defines.insert("PBR".to_string());

        let mut writer = XmlWriter::new();
        encoder.write_material(&mut writer, &material.technique, &material).unwrap();
        let root = writer.into_root().unwrap().unwrap();

        let shader = root.get_child("shader").unwrap();
        assert_eq!(shader.attributes["psdefines"], "ALPHAMASK PBR");
        assert_eq!(shader.attributes["vsdefines"], "");
    }
}
