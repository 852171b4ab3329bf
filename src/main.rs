//! sith-tools: inspect, convert and validate Sith engine assets.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use sith_tools_lib::flags::FlagsExt;
use sith_tools_lib::key::{load_key, save_key};
use sith_tools_lib::material::{default_cmp_path, ColorMap, Mat, MatType, DEFAULT_MAX_CELS};
use sith_tools_lib::model::{load_3do, save_3do, Model3doFileVersion};
use sith_tools_lib::validation::{autofix, validate_key, validate_model, ValidationReport};

#[derive(Parser)]
#[command(name = "sith-tools")]
#[command(about = "Inspect, convert and validate Sith engine 3DO, KEY, MAT and CMP files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a summary of an asset, picked by file extension
    Info { file: PathBuf },

    /// Re-serialize a 3DO model, optionally in another format version
    #[command(name = "convert-3do")]
    Convert3do {
        input: PathBuf,
        output: PathBuf,
        /// 2.1, 2.2 or 2.3
        #[arg(long, default_value = "2.1")]
        version: Model3doFileVersion,
    },

    /// Re-serialize a KEY animation
    ReformatKey { input: PathBuf, output: PathBuf },

    /// Decode MAT cels to PNG images
    MatToPng {
        mat: PathBuf,
        out_dir: PathBuf,
        /// Palette for 8-bit textures. Defaults to dflt.cmp near the MAT file.
        #[arg(long)]
        cmp: Option<PathBuf>,
        #[arg(long, default_value_t = DEFAULT_MAX_CELS)]
        max_cels: usize,
    },

    /// Check a 3DO or KEY file for structural problems
    Validate {
        file: PathBuf,
        /// Model the key animates, to check node references
        #[arg(long)]
        model: Option<PathBuf>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        /// Write an auto-fixed copy of a 3DO model here
        #[arg(long)]
        fix: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Info { file } => info(&file),
        Commands::Convert3do { input, output, version } => convert_3do(&input, &output, version),
        Commands::ReformatKey { input, output } => reformat_key(&input, &output),
        Commands::MatToPng { mat, out_dir, cmp, max_cels } => mat_to_png(&mat, &out_dir, cmp, max_cels),
        Commands::Validate { file, model, json, fix } => validate(&file, model.as_deref(), json, fix.as_deref()),
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn file_header(kind: &str, path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{} '{}' created with sith-tools v{}", kind, name, env!("CARGO_PKG_VERSION"))
}

fn info(file: &Path) -> Result<()> {
    match extension(file).as_str() {
        "3do" => {
            let (model, version) =
                load_3do(file).with_context(|| format!("loading {}", file.display()))?;
            println!("3DO {} '{}'", version.as_str(), model.name);
            println!("  radius:     {:.6}", model.radius);
            println!("  materials:  {}", model.materials.len());
            for (i, geoset) in model.geosets.iter().enumerate() {
                println!("  geoset {}:   {} meshes", i, geoset.meshes.len());
                for mesh in &geoset.meshes {
                    println!(
                        "    [{}] {} ({} vertices, {} faces)",
                        mesh.idx,
                        mesh.name,
                        mesh.vertices.len(),
                        mesh.faces.len()
                    );
                }
            }
            println!("  nodes:      {}", model.hierarchy.len());
            let tree = model.hierarchy_tree()?;
            ptree::print_tree(&tree)?;
        }
        "key" => {
            let key = load_key(file).with_context(|| format!("loading {}", file.display()))?;
            println!("KEY '{}'", key.name);
            println!("  flags:   {} {:?}", key.flags.to_hex(), key.flags.to_name_set());
            println!("  types:   {} {:?}", key.node_types.to_hex(), key.node_types.to_name_set());
            println!("  frames:  {} at {:.3} fps ({:.2}s)", key.num_frames, key.fps, key.duration());
            println!("  joints:  {}", key.num_joints);
            for m in &key.markers {
                println!("  marker:  {:>8.2} {}", m.frame, m.marker_type.name());
            }
            for node in &key.nodes {
                println!("  node {:>3}: {} ({} keyframes)", node.idx, node.mesh_name, node.keyframes.len());
            }
        }
        "mat" => {
            let mat = Mat::load(file).with_context(|| format!("loading {}", file.display()))?;
            let cf = &mat.header.color_format;
            println!("MAT '{}' {:?}", mat.name, mat.header.mat_type);
            println!("  records:   {}", mat.records.len());
            println!("  bpp:       {} (mode {}, alpha bits {})", cf.bpp, cf.color_mode, cf.alpha_bpp);
            for (i, texture) in mat.textures.iter().enumerate() {
                println!(
                    "  cel {:>2}:    {}x{} with {} mipmap levels",
                    i, texture.header.width, texture.header.height, texture.header.levels
                );
            }
        }
        "cmp" => {
            let cmp = ColorMap::load(file).with_context(|| format!("loading {}", file.display()))?;
            println!("CMP version 0x{:02x}", cmp.version);
            println!("  alpha table: {}", cmp.has_alpha_table);
            println!("  palette:     {} colors", cmp.palette.len());
        }
        other => bail!("don't know how to inspect a '.{}' file", other),
    }
    Ok(())
}

fn convert_3do(input: &Path, output: &Path, version: Model3doFileVersion) -> Result<()> {
    let (model, from) = load_3do(input).with_context(|| format!("loading {}", input.display()))?;
    save_3do(&model, output, version, &file_header("3DO model", output))
        .with_context(|| format!("writing {}", output.display()))?;
    tracing::info!("converted '{}' from 3DO {} to {}", model.name, from.as_str(), version.as_str());
    Ok(())
}

fn reformat_key(input: &Path, output: &Path) -> Result<()> {
    let key = load_key(input).with_context(|| format!("loading {}", input.display()))?;
    save_key(&key, output, &file_header("Keyframe", output))
        .with_context(|| format!("writing {}", output.display()))?;
    tracing::info!("wrote '{}' with {} nodes", output.display(), key.nodes.len());
    Ok(())
}

fn mat_to_png(mat_path: &Path, out_dir: &Path, cmp: Option<PathBuf>, max_cels: usize) -> Result<()> {
    let mat = Mat::load(mat_path).with_context(|| format!("loading {}", mat_path.display()))?;

    let needs_palette = mat.header.mat_type == MatType::Color || mat.header.color_format.is_indexed();
    let cmp_path = cmp.or_else(|| needs_palette.then(|| default_cmp_path(mat_path)).flatten());
    let cmp = match cmp_path {
        Some(path) => {
            Some(ColorMap::load(&path).with_context(|| format!("loading {}", path.display()))?)
        }
        None => None,
    };

    fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;
    let mut written = 0;
    for cel in mat.decode(cmp.as_ref(), max_cels)? {
        let Some(image) = cel.levels.first().and_then(|level| level.to_rgba_image()) else {
            tracing::warn!("cel {} of '{}' has no pixel data, skipping it", cel.cel_idx, mat.name);
            continue;
        };
        let path = out_dir.join(format!("{}.png", cel.image_name(&mat.name)));
        image
            .save(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        written += 1;
    }
    tracing::info!("exported {} of {} cels from '{}'", written, mat.cel_count(), mat.name);
    Ok(())
}

fn print_report(report: &ValidationReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    for item in &report.items {
        println!("{}", item);
    }
    println!("{} errors, {} warnings", report.error_count, report.warning_count);
    Ok(())
}

fn validate(file: &Path, model_path: Option<&Path>, json: bool, fix: Option<&Path>) -> Result<()> {
    let report = match extension(file).as_str() {
        "3do" => {
            let (mut model, version) =
                load_3do(file).with_context(|| format!("loading {}", file.display()))?;
            let report = validate_model(&model);
            if let Some(out) = fix {
                autofix::apply_fixes(&mut model, &report);
                save_3do(&model, out, version, &file_header("3DO model", out))
                    .with_context(|| format!("writing {}", out.display()))?;
            }
            report
        }
        "key" => {
            let key = load_key(file).with_context(|| format!("loading {}", file.display()))?;
            let model = match model_path {
                Some(path) => Some(load_3do(path).with_context(|| format!("loading {}", path.display()))?.0),
                None => None,
            };
            validate_key(&key, model.as_ref())
        }
        other => bail!("don't know how to validate a '.{}' file", other),
    };

    print_report(&report, json)?;
    if !report.is_valid() {
        bail!("{} failed validation", file.display());
    }
    Ok(())
}
