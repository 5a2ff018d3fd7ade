//! Standard (metallic) shader to Urho3D PBR

use std::sync::Arc;

use urhoforge_core::{Color, Result};

use super::encoder::{ALPHA_MASK_DEFINE, MaterialEncoder};
use super::model::{ShaderArguments, UrhoPbrMaterial};
use super::MaterialExporter;
use crate::engine::ExportEngine;
use crate::source::{MAIN_TEXTURE_PROPERTY, SourceMaterial};

/// Shaders handled by this exporter
const STANDARD_SHADERS: &[&str] = &["Standard"];

/// Pixel shader define reading ambient occlusion from the emissive unit
const AO_DEFINE: &str = "AO";

/// Default glossiness of a Standard material
const DEFAULT_GLOSSINESS: f32 = 0.5;

pub struct StandardMaterialExporter {
    encoder: MaterialEncoder,
}

impl StandardMaterialExporter {
    pub fn new(engine: Arc<dyn ExportEngine>) -> Self {
        Self {
            encoder: MaterialEncoder::new(engine),
        }
    }

    /// Map the Standard shader properties onto the PBR model, scheduling
    /// every referenced texture
    pub fn build_material(&self, material: &SourceMaterial, arguments: &ShaderArguments) -> UrhoPbrMaterial {
        let encoder = &self.encoder;
        let mut pbr = UrhoPbrMaterial::default();

        pbr.base_color_texture = encoder.resolve_texture(material.texture(MAIN_TEXTURE_PROPERTY));
        pbr.normal_texture = encoder.resolve_texture(material.texture("_BumpMap"));
        pbr.metallic_roughness_texture = encoder.resolve_texture(material.texture("_MetallicGlossMap"));

        if arguments.has_emission {
            pbr.emissive_texture = encoder.resolve_texture(material.texture("_EmissionMap"));
            pbr.emissive_color = material.color("_EmissionColor").unwrap_or(Color::BLACK);
        }

        // The emissive unit carries occlusion only when it is free
        if pbr.emissive_texture.is_none() {
            let occlusion = material.texture("_OcclusionMap");
            let strength = material.float("_OcclusionStrength").unwrap_or(1.0);
            if let Some(name) = encoder.build_ao_texture_name(occlusion, strength) {
                if let Some(texture) = occlusion {
                    encoder.engine().schedule_ao_export(texture, strength, &name);
                }
                pbr.ao_texture = Some(name);
                pbr.pixel_shader_defines.insert(AO_DEFINE.to_string());
            }
        }

        pbr.base_color = material.color("_Color").unwrap_or(Color::WHITE);
        pbr.metallic = material.float("_Metallic").unwrap_or(0.0);
        let glossiness = if pbr.metallic_roughness_texture.is_some() {
            material.float("_GlossMapScale").unwrap_or(1.0)
        } else {
            material.float("_Glossiness").unwrap_or(DEFAULT_GLOSSINESS)
        };
        pbr.roughness = (1.0 - glossiness).clamp(0.0, 1.0);
        pbr.set_uv_transform(arguments.main_texture_scale, arguments.main_texture_offset);

        if arguments.alpha_test {
            pbr.pixel_shader_defines.insert(ALPHA_MASK_DEFINE.to_string());
        }
        pbr.extra_parameters.extend(material.extra_parameters.iter().cloned());
        pbr.technique = select_technique(&pbr, arguments.transparent);
        pbr
    }
}

/// Pick the PBR technique matching the bound textures
fn select_technique(pbr: &UrhoPbrMaterial, transparent: bool) -> String {
    let mut technique = String::from("Techniques/PBR/PBR");
    if pbr.base_color_texture.is_none() {
        technique.push_str("NoTexture");
    } else {
        technique.push_str("Diff");
        let normal = pbr.normal_texture.is_some();
        let specular = pbr.metallic_roughness_texture.is_some();
        if normal {
            technique.push_str("Normal");
        }
        if specular {
            technique.push_str("Spec");
        }
        if normal && specular && pbr.emissive_texture.is_some() {
            technique.push_str("Emissive");
        }
    }
    if transparent {
        technique.push_str("Alpha");
    }
    technique.push_str(".xml");
    technique
}

impl MaterialExporter for StandardMaterialExporter {
    fn name(&self) -> &str {
        "standard"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn can_export_material(&self, material: &SourceMaterial) -> bool {
        STANDARD_SHADERS.contains(&material.shader.as_str())
    }

    fn export_material(&self, material: &SourceMaterial) -> Result<bool> {
        let arguments = MaterialEncoder::setup_flags(material);
        let pbr = self.build_material(material, &arguments);
        self.encoder
            .write_document(material, |writer| self.encoder.write_material(writer, &pbr.technique, &pbr))
    }

    fn evaluate_material_name(&self, material: &SourceMaterial) -> Option<String> {
        self.encoder.evaluate_material_name(material)
    }
}
