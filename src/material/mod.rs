//! Binary MAT textures and CMP palettes.

pub mod cmp;
pub mod mat;
pub mod search;

pub use cmp::{CmpPaletteRgb, ColorMap};
pub use mat::{
    ColorFormat, ColorMode, DecodedCel, DecodedLevel, Mat, MatHeader, MatRecord, MatTexture,
    MatType, MipmapHeader, DEFAULT_MAX_CELS,
};
pub use search::{default_cmp_path, default_mat_dirs, find_file_in_dir, load_model_materials, LoadedMaterial};
