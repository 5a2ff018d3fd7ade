//! urhoforge Export Pipeline
//!
//! Encodes authoring-side materials and cubemaps as Urho3D resources:
//! - material XML documents (Standard PBR and a diffuse fallback)
//! - cubemap XML documents with a DDS image of the six faces
//! - the textures those documents reference, including baked occlusion maps

pub mod cubemap;
pub mod engine;
pub mod logging;
pub mod material;
pub mod naming;
pub mod source;
pub mod textures;
pub mod xml;

pub use cubemap::{CubemapExporter, CubemapImageEncoder};
pub use engine::{EngineOptions, ExportEngine, FileSystemEngine, ScheduledTexture};
pub use material::{
    DefaultMaterialExporter, MaterialEncoder, MaterialExporter, MaterialExporterRegistry, ShaderArguments,
    StandardMaterialExporter, UrhoPbrMaterial,
};
pub use source::{AssetDatabase, Cubemap, InMemoryAssetDatabase, SourceMaterial, SourceTexture};
pub use textures::{DdsCubemapEncoder, DdsPixelFormat, TextureExporter};
pub use xml::{XmlDocument, XmlWriter};
