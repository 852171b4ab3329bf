//! Engine limits for Sith assets.

/// Maximum length of any asset or node name.
pub const MAX_NAME_LEN: usize = 64;

/// Faces are polygons, never fewer than three corners.
pub const MIN_FACE_VERTICES: usize = 3;

/// Maximum number of texture cels the engine loads per MAT file.
pub const MAX_TEXTURE_SLOTS: usize = 18;
