//! mmdkit CLI
//!
//! Command-line interface for exporting scene documents to MMD files.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};

use mmdkit_core::logging::{self, TracingConfig};
use mmdkit_core::{Axis, AxisConversion};
use mmdkit_export::{ExportOptions, ExportReport, MmdExporter, PathMode, FILE_EXTENSION};
use mmdkit_scene::{ObjectData, Scene, SceneHost};

/// mmdkit - export scenes as MMD (OBJ with bones) files
#[derive(Parser)]
#[command(name = "mmdkit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format for reports
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Export a scene document to an MMD file
    Export(ExportArgs),

    /// Show the objects of a scene document
    Info(InfoArgs),
}

#[derive(Args)]
struct ExportArgs {
    /// Scene document (JSON)
    #[arg(short, long)]
    scene: PathBuf,

    /// Output file (defaults to the scene path with a .mmd extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Options preset (JSON) applied before the flags below
    #[arg(long)]
    preset: Option<PathBuf>,

    /// Export selected objects only
    #[arg(long)]
    selection_only: bool,

    /// Keep polygons as they are instead of triangulating
    #[arg(long)]
    no_triangulate: bool,

    /// Skip normals
    #[arg(long)]
    no_normals: bool,

    /// Skip UV coordinates
    #[arg(long)]
    no_uvs: bool,

    /// Write the armature's joints before each object
    #[arg(long)]
    bones: bool,

    /// Write `vb` vertex records
    #[arg(long)]
    tag_vertices: bool,

    /// Keep polygon order instead of grouping by shading
    #[arg(long)]
    keep_vertex_order: bool,

    /// Forward axis (X, Y, Z, -X, -Y, -Z)
    #[arg(long, allow_hyphen_values = true)]
    forward: Option<Axis>,

    /// Up axis (X, Y, Z, -X, -Y, -Z)
    #[arg(long, allow_hyphen_values = true)]
    up: Option<Axis>,

    /// Uniform scale (0.01 - 1000)
    #[arg(long)]
    scale: Option<f32>,

    /// Referenced file handling: auto, absolute, relative, match, strip, copy
    #[arg(long)]
    path_mode: Option<String>,
}

#[derive(Args)]
struct InfoArgs {
    /// Scene document (JSON)
    #[arg(short, long)]
    scene: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_with_config(TracingConfig::from_verbosity(cli.verbose));

    match cli.command {
        Commands::Export(args) => cmd_export(args, cli.format),
        Commands::Info(args) => cmd_info(args, cli.format),
    }
}

fn load_scene(path: &Path) -> Result<Scene> {
    if !path.exists() {
        bail!("File not found: {:?}", path);
    }
    info!("Loading scene: {:?}", path);
    Scene::load(path).with_context(|| format!("Failed to load scene {:?}", path))
}

fn build_options(args: &ExportArgs) -> Result<ExportOptions> {
    let mut options = match &args.preset {
        Some(preset) => {
            let json = fs::read_to_string(preset)
                .with_context(|| format!("Failed to read preset {:?}", preset))?;
            serde_json::from_str(&json).context("Invalid options preset")?
        }
        None => ExportOptions::default(),
    };

    options.selection_only |= args.selection_only;
    options.triangulate &= !args.no_triangulate;
    options.include_normals &= !args.no_normals;
    options.include_uvs &= !args.no_uvs;
    options.include_bones |= args.bones;
    options.tag_vertices |= args.tag_vertices;
    options.keep_vertex_order |= args.keep_vertex_order;

    if let Some(mode) = &args.path_mode {
        options.path_mode = serde_json::from_value(serde_json::Value::String(mode.to_uppercase()))
            .map_err(|_| anyhow::anyhow!("Unknown path mode: {}", mode))?;
    }

    let axes_given = args.forward.is_some() || args.up.is_some() || args.scale.is_some();
    if args.preset.is_none() || axes_given {
        let defaults = AxisConversion::default();
        let conversion = AxisConversion {
            forward: args.forward.unwrap_or(defaults.forward),
            up: args.up.unwrap_or(defaults.up),
        };
        options = options.with_axes(conversion, args.scale.unwrap_or(1.0))?;
    }

    Ok(options)
}

fn output_path(args: &ExportArgs) -> PathBuf {
    let mut output = args
        .output
        .clone()
        .unwrap_or_else(|| args.scene.with_extension(FILE_EXTENSION));
    if output.extension().is_none() {
        output.set_extension(FILE_EXTENSION);
    }
    output
}

fn cmd_export(args: ExportArgs, format: OutputFormat) -> Result<()> {
    let scene = load_scene(&args.scene)?;
    let options = build_options(&args)?;
    let output = output_path(&args);

    let exporter = MmdExporter::new(options).with_progress(|progress| {
        debug!(
            phase = ?progress.phase,
            object = progress.current_object.as_deref().unwrap_or(""),
            "{:.0}%",
            progress.percentage() * 100.0
        );
    });

    let report = exporter
        .export_to_path(&scene, &output)
        .with_context(|| format!("Failed to export {:?}", output))?;

    print_report(&report, format)
}

fn print_report(report: &ExportReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Text => {
            let output = report
                .output
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            println!("Exported scene '{}' to {}", report.scene, output);
            println!("  Objects exported:   {}", report.objects_exported);
            println!("  Objects skipped:    {}", report.objects_skipped);
            println!("  Vertices:           {}", report.totals.vertices);
            println!("  UVs:                {}", report.totals.uvs);
            println!("  Normals:            {}", report.totals.normals);
            println!("  Faces:              {}", report.totals.faces);
            println!("  Joints:             {}", report.joints);
            println!("  Time:               {:.2}s", report.elapsed_secs);
        }
    }
    Ok(())
}

fn cmd_info(args: InfoArgs, format: OutputFormat) -> Result<()> {
    let scene = load_scene(&args.scene)?;

    match format {
        OutputFormat::Json => {
            let objects: Vec<_> = scene
                .objects
                .iter()
                .enumerate()
                .map(|(i, object)| {
                    let (vertices, polygons, bones) = object_counts(&object.data);
                    serde_json::json!({
                        "id": i,
                        "name": object.name,
                        "kind": object.data.kind(),
                        "parent": object.parent,
                        "instancing": object.instancing,
                        "vertices": vertices,
                        "polygons": polygons,
                        "bones": bones,
                    })
                })
                .collect();
            let json = serde_json::json!({
                "scene": scene.scene_name(),
                "object_count": scene.objects.len(),
                "selection": scene.selection,
                "objects": objects,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("Scene: '{}'", scene.scene_name());
            println!("  Objects:   {}", scene.objects.len());
            println!("  Selected:  {}", scene.selection.len());
            println!();
            println!("{:<4} {:<24} {:<10} {:>10} {:>10} {:>6}", "ID", "NAME", "KIND", "VERTS", "POLYS", "BONES");
            println!("{}", "-".repeat(70));
            for (i, object) in scene.objects.iter().enumerate() {
                let (vertices, polygons, bones) = object_counts(&object.data);
                println!(
                    "{:<4} {:<24} {:<10} {:>10} {:>10} {:>6}",
                    i,
                    object.name,
                    object.data.kind(),
                    vertices,
                    polygons,
                    bones
                );
            }
        }
    }

    Ok(())
}

fn object_counts(data: &ObjectData) -> (usize, usize, usize) {
    match data {
        ObjectData::Mesh(mesh) => (mesh.vertex_count(), mesh.polygon_count(), 0),
        ObjectData::Armature(armature) => (0, 0, armature.bone_count()),
        ObjectData::Empty => (0, 0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_export(args: &[&str]) -> ExportArgs {
        let mut argv = vec!["mmdkit", "export"];
        argv.extend_from_slice(args);
        match Cli::parse_from(argv).command {
            Commands::Export(args) => args,
            Commands::Info(_) => panic!("expected export"),
        }
    }

    #[test]
    fn test_output_defaults_to_mmd() {
        let args = parse_export(&["--scene", "scenes/hero.json"]);
        assert_eq!(output_path(&args), PathBuf::from("scenes/hero.mmd"));

        let args = parse_export(&["--scene", "a.json", "--output", "out/model"]);
        assert_eq!(output_path(&args), PathBuf::from("out/model.mmd"));
    }

    #[test]
    fn test_flags_map_to_options() {
        let args = parse_export(&[
            "--scene",
            "a.json",
            "--no-uvs",
            "--bones",
            "--forward",
            "-Z",
            "--up",
            "Y",
            "--scale",
            "2",
            "--path-mode",
            "strip",
        ]);
        let options = build_options(&args).unwrap();
        assert!(!options.include_uvs);
        assert!(options.include_bones);
        assert!(options.triangulate);
        assert_eq!(options.path_mode, PathMode::Strip);
        assert_eq!(options.global_matrix.transform_point3(mmdkit_core::glam::Vec3::Z).y, 2.0);
    }

    #[test]
    fn test_bad_scale_rejected() {
        let args = parse_export(&["--scene", "a.json", "--scale", "5000"]);
        assert!(build_options(&args).is_err());
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("csv".parse::<OutputFormat>().is_err());
    }
}
