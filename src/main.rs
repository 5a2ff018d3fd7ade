//! urhoforge CLI
//!
//! Command-line interface for exporting materials and cubemaps listed in a
//! manifest as Urho3D resources.

mod manifest;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use tracing::{info, warn};

use urhoforge_export::logging::{TracingConfig, init_with_config, instrument_export};
use urhoforge_export::{
    CubemapExporter, DdsPixelFormat, EngineOptions, ExportEngine, FileSystemEngine, MaterialExporterRegistry,
    TextureExporter,
};

use manifest::{Manifest, Project};

/// urhoforge - Urho3D material and cubemap exporter
#[derive(Parser)]
#[command(name = "urhoforge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export every material, cubemap and referenced texture of a manifest
    Export(ExportArgs),

    /// Export a single material and print its document
    Material(MaterialArgs),
}

#[derive(Args)]
struct ExportArgs {
    /// Manifest listing materials and cubemaps (YAML or JSON)
    #[arg(short, long)]
    manifest: PathBuf,

    /// Project root the asset paths are relative to
    #[arg(short, long, default_value = ".")]
    project: PathBuf,

    /// Output directory
    #[arg(short, long)]
    output: PathBuf,

    /// Engine options file (YAML or JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Resource subfolder prepended to every output name
    #[arg(long)]
    subfolder: Option<String>,

    /// Re-export outputs that are already up to date
    #[arg(long)]
    force: bool,

    /// Cubemap pixel format: rgba8, bc3
    #[arg(long)]
    format: Option<DdsPixelFormat>,

    /// Number of parallel export threads (0 = one per core)
    #[arg(long, default_value = "0")]
    threads: usize,
}

#[derive(Args)]
struct MaterialArgs {
    /// Manifest listing materials (YAML or JSON)
    #[arg(short, long)]
    manifest: PathBuf,

    /// Material name
    #[arg(short, long)]
    name: String,

    /// Output directory
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Resource subfolder prepended to every output name
    #[arg(long)]
    subfolder: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_with_config(TracingConfig::for_verbosity(cli.verbose));

    match cli.command {
        Commands::Export(args) => cmd_export(args),
        Commands::Material(args) => cmd_material(args),
    }
}

fn cmd_export(args: ExportArgs) -> Result<()> {
    let start = Instant::now();

    let mut options = match &args.config {
        Some(path) => EngineOptions::load(path).context("Failed to load engine options")?,
        None => EngineOptions::default(),
    };
    options.output_root = args.output.clone();
    if let Some(subfolder) = args.subfolder {
        options.subfolder = subfolder;
    }
    if args.force {
        options.export_updated_only = false;
    }
    if let Some(format) = args.format {
        options.cubemap_format = format;
    }

    let manifest = Manifest::load(&args.manifest)?;
    let project = Project::new(&args.project);
    let engine = Arc::new(FileSystemEngine::new(options));
    let registry = MaterialExporterRegistry::with_defaults(engine.clone());
    let cubemaps = CubemapExporter::new(engine.clone(), Arc::new(manifest.asset_database()));

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build()
        .context("Failed to create thread pool")?;

    let materials = manifest.materials_in(&project);
    let (material_results, cubemap_results): (Vec<_>, Vec<_>) = pool.install(|| {
        let material_results: Vec<(String, Result<bool>)> = materials
            .par_iter()
            .map(|material| {
                let result = instrument_export(&material.name, || registry.export_material(material));
                (material.name.clone(), result.map_err(anyhow::Error::from))
            })
            .collect();

        let cubemap_results: Vec<(String, Result<bool>)> = manifest
            .cubemaps
            .par_iter()
            .map(|source| {
                let result = project
                    .load_cubemap(source, manifest.modified)
                    .and_then(|cubemap| {
                        instrument_export(&source.asset_path, || cubemaps.export(&cubemap)).map_err(anyhow::Error::from)
                    });
                (source.asset_path.clone(), result)
            })
            .collect();

        (material_results, cubemap_results)
    });

    let mut written = 0;
    let mut failed = 0;
    for (name, result) in material_results.into_iter().chain(cubemap_results) {
        match result {
            Ok(true) => written += 1,
            Ok(false) => {}
            Err(e) => {
                warn!(asset = %name, error = %format!("{:#}", e), "Export failed");
                failed += 1;
            }
        }
    }

    let scheduled = engine.take_scheduled();
    let textures = TextureExporter::new(&args.project);
    let (textures_written, textures_failed) = textures.export_batch(&*engine, &scheduled);

    info!(
        documents = written,
        textures = textures_written,
        duration_ms = start.elapsed().as_millis() as u64,
        "Export complete"
    );
    println!(
        "Exported {} documents and {} textures to {}",
        written,
        textures_written,
        engine.options().output_root.display()
    );

    let failed = failed + textures_failed;
    if failed > 0 {
        bail!("{} export(s) failed", failed);
    }
    Ok(())
}

fn cmd_material(args: MaterialArgs) -> Result<()> {
    let manifest = Manifest::load(&args.manifest)?;
    let Some(material) = manifest.materials.iter().find(|m| m.name == args.name) else {
        bail!("Material not found in manifest: {}", args.name);
    };

    let options = EngineOptions {
        output_root: args.output.clone(),
        subfolder: args.subfolder.unwrap_or_default(),
        export_updated_only: false,
        ..EngineOptions::default()
    };
    let engine = Arc::new(FileSystemEngine::new(options));
    let registry = MaterialExporterRegistry::with_defaults(engine.clone());

    let name = registry
        .evaluate_material_name(material)
        .with_context(|| format!("Material {} is not backed by an asset", material.name))?;
    registry
        .export_material(material)
        .with_context(|| format!("Failed to export material {}", material.name))?;

    let path = engine.target_file_path(&name);
    let text = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    println!("{}", text);
    Ok(())
}
