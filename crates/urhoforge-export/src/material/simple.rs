//! Fallback exporter for shaders with no PBR mapping

use std::sync::Arc;

use urhoforge_core::{Color, ParameterValue, Result};

use super::encoder::{MaterialEncoder, units};
use super::parameters::write_parameter;
use super::MaterialExporter;
use crate::engine::ExportEngine;
use crate::source::{MAIN_TEXTURE_PROPERTY, SourceMaterial};

/// Exports any material as a diffuse-only Urho3D material
pub struct DefaultMaterialExporter {
    encoder: MaterialEncoder,
}

impl DefaultMaterialExporter {
    pub fn new(engine: Arc<dyn ExportEngine>) -> Self {
        Self {
            encoder: MaterialEncoder::new(engine),
        }
    }
}

impl MaterialExporter for DefaultMaterialExporter {
    fn name(&self) -> &str {
        "default"
    }

    fn priority(&self) -> i32 {
        0
    }

    fn can_export_material(&self, _material: &SourceMaterial) -> bool {
        true
    }

    fn export_material(&self, material: &SourceMaterial) -> Result<bool> {
        let arguments = MaterialEncoder::setup_flags(material);
        let diffuse = material
            .texture(MAIN_TEXTURE_PROPERTY)
            .filter(|t| !self.encoder.engine().evaluate_texture_name(t).trim().is_empty());

        let technique = match (diffuse.is_some(), arguments.transparent) {
            (true, false) => "Techniques/Diff.xml",
            (true, true) => "Techniques/DiffAlpha.xml",
            (false, false) => "Techniques/NoTexture.xml",
            (false, true) => "Techniques/NoTextureAlpha.xml",
        };

        self.encoder.write_document(material, |writer| {
            writer.start_element("material")?;
            self.encoder.write_technique(writer, technique)?;
            if let Some(texture) = diffuse {
                self.encoder.write_texture(texture, writer, units::DIFFUSE)?;
            }

            let color = material.color("_Color").unwrap_or(Color::WHITE);
            write_parameter(writer, "MatDiffColor", &ParameterValue::Color(color))?;
            if arguments.has_emission {
                if let Some(emission) = material.color("_EmissionColor") {
                    write_parameter(writer, "MatEmissiveColor", &ParameterValue::Color(emission))?;
                }
            }
            for (name, value) in &material.extra_parameters {
                write_parameter(writer, name, value)?;
            }

            self.encoder.write_common_parameters(writer, &arguments)?;
            writer.end_element()
        })
    }

    fn evaluate_material_name(&self, material: &SourceMaterial) -> Option<String> {
        self.encoder.evaluate_material_name(material)
    }
}
