//! Readers and writers for Sith engine assets: 3DO models, KEY animations,
//! MAT textures and CMP palettes.

pub mod error;
pub mod flags;
pub mod key;
pub mod material;
pub mod math;
pub mod model;
pub mod text;
pub mod validation;

pub use error::{ParseError, Result, SithError};
