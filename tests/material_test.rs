// Material tests: a game-like directory tree with a model, its MAT files and
// the default palette, resolved and decoded the way an importer does it.

use std::fs;
use std::path::Path;

use sith_tools_lib::material::cmp::{CmpPaletteRgb, CMP_VERSION_JK};
use sith_tools_lib::material::mat::{MatColorRecord, MatTextureRecord, MAT_VERSION};
use sith_tools_lib::material::{
    default_cmp_path, default_mat_dirs, load_model_materials, ColorFormat, ColorMap, Mat,
    MatHeader, MatRecord, MatTexture, MatType, MipmapHeader, DEFAULT_MAX_CELS,
};

#[path = "common/mod.rs"]
mod common;

fn palette() -> ColorMap {
    let mut cmp = ColorMap::new(CMP_VERSION_JK);
    cmp.palette[1] = CmpPaletteRgb { r: 255, g: 0, b: 0 };
    cmp.palette[2] = CmpPaletteRgb { r: 0, g: 255, b: 0 };
    cmp.palette[7] = CmpPaletteRgb { r: 40, g: 50, b: 60 };
    cmp
}

/// 2x2 indexed texture: top row red, bottom row green
fn body_mat() -> Mat {
    Mat {
        name: "body.mat".into(),
        header: MatHeader {
            version: MAT_VERSION,
            mat_type: MatType::Texture,
            record_count: 1,
            texture_count: 1,
            color_format: ColorFormat::indexed(),
        },
        records: vec![MatRecord::Texture(MatTextureRecord::default())],
        textures: vec![MatTexture {
            header: MipmapHeader {
                width: 2,
                height: 2,
                levels: 1,
                ..MipmapHeader::default()
            },
            levels: vec![vec![1, 1, 2, 2]],
        }],
    }
}

fn head_mat() -> Mat {
    Mat {
        name: "head.mat".into(),
        header: MatHeader {
            version: MAT_VERSION,
            mat_type: MatType::Color,
            record_count: 1,
            texture_count: 0,
            color_format: ColorFormat::indexed(),
        },
        records: vec![MatRecord::Color(MatColorRecord {
            color_index: 7,
            ..MatColorRecord::default()
        })],
        textures: vec![],
    }
}

/// Lays out `<root>/3do/robot.3do`, `<root>/3do/mat/HEAD.MAT`,
/// `<root>/mat/body.mat` and `<root>/misc/cmp/dflt.cmp`.
fn game_tree(root: &Path) -> std::path::PathBuf {
    let model_dir = root.join("3do");
    let cmp_dir = root.join("misc").join("cmp");
    for dir in [model_dir.join("mat"), root.join("mat"), cmp_dir.clone()] {
        fs::create_dir_all(dir).expect("mkdir");
    }

    let model_path = model_dir.join("robot.3do");
    fs::copy(common::fixture_path("robot.3do"), &model_path).expect("copy model");
    body_mat().save(root.join("mat").join("body.mat")).expect("save body.mat");
    head_mat().save(model_dir.join("mat").join("HEAD.MAT")).expect("save HEAD.MAT");
    palette().save(cmp_dir.join("dflt.cmp")).expect("save dflt.cmp");
    model_path
}

#[test]
fn model_materials_resolve_from_game_tree() {
    let root = tempfile::tempdir().expect("tempdir");
    let model_path = game_tree(root.path());
    let (model, _) = sith_tools_lib::model::load_3do(&model_path).expect("load model");

    let cmp_path = default_cmp_path(&model_path).expect("dflt.cmp not found");
    let cmp = ColorMap::load(&cmp_path).expect("load cmp");
    let dirs = default_mat_dirs(&model_path);
    let loaded = load_model_materials(&model, &dirs, Some(&cmp), DEFAULT_MAX_CELS);

    assert_eq!(loaded.len(), 2);
    assert!(loaded.iter().all(|m| !m.is_placeholder()));

    let body = &loaded[0];
    assert_eq!(body.name, "body.mat");
    assert_eq!(body.cels.len(), 1);
    let image = body.cels[0].levels[0].to_rgba_image().expect("body image");
    assert_eq!(image.dimensions(), (2, 2));
    assert_eq!(image.get_pixel(0, 0).0, [255, 0, 0, 255]);
    assert_eq!(image.get_pixel(1, 1).0, [0, 255, 0, 255]);
    // Decoded rows run from the last stored row
    assert_eq!(body.cels[0].levels[0].pixel(0, 0), Some([0.0, 1.0, 0.0, 1.0]));

    // Lookup is case-insensitive
    let head = &loaded[1];
    assert!(head
        .path
        .as_ref()
        .is_some_and(|p| p.ends_with(Path::new("mat").join("HEAD.MAT"))));
    let swatch = head.cels[0].levels[0].to_rgba_image().expect("head swatch");
    assert_eq!(swatch.dimensions(), (64, 64));
    assert_eq!(swatch.get_pixel(63, 63).0, [40, 50, 60, 255]);
}

#[test]
fn indexed_textures_without_palette_keep_their_size() {
    let mat = body_mat();
    let cels = mat.decode(None, DEFAULT_MAX_CELS).expect("decode");
    assert_eq!(cels[0].levels[0].width, 2);
    assert!(cels[0].levels[0].pixels.is_none());
    assert!(cels[0].levels[0].to_rgba_image().is_none());
}

#[test]
fn decoded_cel_exports_as_png() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mat = body_mat();
    let cels = mat.decode(Some(&palette()), DEFAULT_MAX_CELS).expect("decode");

    let path = dir.path().join(format!("{}.png", cels[0].image_name(&mat.name)));
    cels[0].levels[0]
        .to_rgba_image()
        .expect("image")
        .save(&path)
        .expect("save png");
    assert!(path.ends_with("body.png"));

    let reloaded = image::open(&path).expect("open png").to_rgba8();
    assert_eq!(reloaded.get_pixel(1, 0).0, [255, 0, 0, 255]);
    assert_eq!(reloaded.get_pixel(0, 1).0, [0, 255, 0, 255]);
}

#[test]
fn saved_mat_reloads_identically() {
    let dir = tempfile::tempdir().expect("tempdir");
    for mat in [body_mat(), head_mat()] {
        let path = dir.path().join(&mat.name);
        mat.save(&path).expect("save");
        let back = Mat::load(&path).expect("load");
        assert_eq!(back, mat);
    }
}
