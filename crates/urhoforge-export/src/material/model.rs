//! Intermediate material descriptions
//!
//! Exporters populate one of these and hand it to the encoder; nothing in the
//! encoder looks at the source material directly.

use std::collections::BTreeSet;

use urhoforge_core::{Color, ParameterValue, Vector2, Vector4};

/// Technique used when a PBR material has no textures
pub const DEFAULT_PBR_TECHNIQUE: &str = "Techniques/PBR/PBRNoTexture.xml";

/// Flags of a material on the simple (non-PBR) shader path
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderArguments {
    pub shader: String,
    pub transparent: bool,
    pub alpha_test: bool,
    pub has_emission: bool,
    pub main_texture_offset: Vector2,
    pub main_texture_scale: Vector2,
}

impl Default for ShaderArguments {
    fn default() -> Self {
        Self {
            shader: String::new(),
            transparent: false,
            alpha_test: false,
            has_emission: false,
            main_texture_offset: Vector2::ZERO,
            main_texture_scale: Vector2::ONE,
        }
    }
}

/// Normalized PBR material.
///
/// Texture fields hold resolved resource names. `emissive_texture` takes the
/// emissive slot when set; `ao_texture` is used there only otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct UrhoPbrMaterial {
    pub technique: String,
    pub base_color_texture: Option<String>,
    pub normal_texture: Option<String>,
    pub metallic_roughness_texture: Option<String>,
    pub emissive_texture: Option<String>,
    pub ao_texture: Option<String>,
    pub emissive_color: Color,
    pub base_color: Color,
    pub mat_env_map_color: Color,
    pub mat_spec_color: Color,
    pub roughness: f32,
    pub metallic: f32,
    pub u_offset: Vector4,
    pub v_offset: Vector4,
    /// Written after the fixed parameters, in insertion order
    pub extra_parameters: Vec<(String, ParameterValue)>,
    pub pixel_shader_defines: BTreeSet<String>,
    pub vertex_shader_defines: BTreeSet<String>,
}

impl Default for UrhoPbrMaterial {
    fn default() -> Self {
        Self {
            technique: DEFAULT_PBR_TECHNIQUE.to_string(),
            base_color_texture: None,
            normal_texture: None,
            metallic_roughness_texture: None,
            emissive_texture: None,
            ao_texture: None,
            emissive_color: Color::BLACK,
            base_color: Color::WHITE,
            mat_env_map_color: Color::WHITE,
            mat_spec_color: Color::BLACK,
            roughness: 0.5,
            metallic: 0.0,
            u_offset: Vector4::new(1.0, 0.0, 0.0, 0.0),
            v_offset: Vector4::new(0.0, 1.0, 0.0, 0.0),
            extra_parameters: Vec::new(),
            pixel_shader_defines: BTreeSet::new(),
            vertex_shader_defines: BTreeSet::new(),
        }
    }
}

impl UrhoPbrMaterial {
    /// Append an extra parameter
    pub fn push_parameter(&mut self, name: impl Into<String>, value: impl Into<ParameterValue>) {
        self.extra_parameters.push((name.into(), value.into()));
    }

    /// Set the UV transform from a texture scale and offset
    pub fn set_uv_transform(&mut self, scale: Vector2, offset: Vector2) {
        self.u_offset = Vector4::new(scale.x, 0.0, 0.0, offset.x);
        self.v_offset = Vector4::new(0.0, scale.y, 0.0, offset.y);
    }
}
