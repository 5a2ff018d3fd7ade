//! Material export
//!
//! Each [`MaterialExporter`] handles one family of shaders. Exporters share
//! the writing rules in [`MaterialEncoder`] and are picked by priority from a
//! [`MaterialExporterRegistry`].

mod encoder;
mod model;
pub mod parameters;
mod registry;
mod simple;
mod standard;

pub use encoder::{ALPHA_MASK_DEFINE, MaterialEncoder, ao_texture_name, units};
pub use model::{DEFAULT_PBR_TECHNIQUE, ShaderArguments, UrhoPbrMaterial};
pub use parameters::write_parameter;
pub use registry::MaterialExporterRegistry;
pub use simple::DefaultMaterialExporter;
pub use standard::StandardMaterialExporter;

use urhoforge_core::Result;

use crate::source::SourceMaterial;

/// Exporter for one family of shaders
pub trait MaterialExporter: Send + Sync {
    /// Exporter name, for log output
    fn name(&self) -> &str;

    /// Higher priorities are asked first
    fn priority(&self) -> i32;

    /// Check if this exporter understands the material's shader
    fn can_export_material(&self, material: &SourceMaterial) -> bool;

    /// Write the material document.
    ///
    /// Returns `false` when nothing was written (up to date, or not backed by
    /// an asset).
    fn export_material(&self, material: &SourceMaterial) -> Result<bool>;

    /// Resource name of the material document
    fn evaluate_material_name(&self, material: &SourceMaterial) -> Option<String>;
}
