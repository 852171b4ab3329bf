//! Locating the palette and material files that belong to a model, using
//! the game's directory layout relative to the `.3do` file.

use std::path::{Path, PathBuf};

use crate::model::Model3do;

use super::cmp::ColorMap;
use super::mat::{DecodedCel, Mat};

pub const DEFAULT_CMP_FILE: &str = "dflt.cmp";

/// Looks for `dflt.cmp` next to the model, in `misc/cmp`, and one or two
/// directories up.
pub fn default_cmp_path(model_path: impl AsRef<Path>) -> Option<PathBuf> {
    let model_dir = model_path.as_ref().parent().unwrap_or(Path::new(""));
    let parent = model_dir.parent();
    let grandparent = parent.and_then(Path::parent);

    let mut candidates = vec![
        model_dir.join(DEFAULT_CMP_FILE),
        model_dir.join("misc").join("cmp").join(DEFAULT_CMP_FILE),
    ];
    if let Some(parent) = parent {
        candidates.push(parent.join(DEFAULT_CMP_FILE));
        candidates.push(parent.join("misc").join("cmp").join(DEFAULT_CMP_FILE));
    }
    if let Some(grandparent) = grandparent {
        candidates.push(grandparent.join("misc").join("cmp").join(DEFAULT_CMP_FILE));
    }

    candidates.into_iter().find(|p| p.is_file())
}

/// `<model dir>/mat` and `<model dir>/../mat`.
pub fn default_mat_dirs(model_path: impl AsRef<Path>) -> Vec<PathBuf> {
    let model_dir = model_path.as_ref().parent().unwrap_or(Path::new(""));
    vec![model_dir.join("mat"), model_dir.join("..").join("mat")]
}

/// Finds `name` in `dir` by exact name, then lower-cased, then by comparing
/// every entry case-insensitively.
pub fn find_file_in_dir(name: &str, dir: impl AsRef<Path>) -> Option<PathBuf> {
    let dir = dir.as_ref();
    if name.is_empty() || !dir.is_dir() {
        return None;
    }

    let exact = dir.join(name);
    if exact.is_file() {
        return Some(exact);
    }

    let lower = name.to_lowercase();
    let lowered = dir.join(&lower);
    if lowered.is_file() {
        return Some(lowered);
    }

    std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .find(|path| {
            path.is_file()
                && path
                    .file_name()
                    .is_some_and(|f| f.to_string_lossy().to_lowercase() == lower)
        })
}

/// A model material with its decoded cels. `mat` is `None` when the file was
/// not found or could not be read.
#[derive(Debug, Clone)]
pub struct LoadedMaterial {
    pub name: String,
    pub path: Option<PathBuf>,
    pub mat: Option<Mat>,
    pub cels: Vec<DecodedCel>,
}

impl LoadedMaterial {
    fn placeholder(name: &str, path: Option<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            path,
            mat: None,
            cels: Vec::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.mat.is_none()
    }
}

/// Loads every material of `model` from the first of `dirs` that has it.
///
/// The result has one entry per model material, in material index order.
pub fn load_model_materials(
    model: &Model3do,
    dirs: &[PathBuf],
    cmp: Option<&ColorMap>,
    max_cels: usize,
) -> Vec<LoadedMaterial> {
    model
        .materials
        .iter()
        .map(|name| {
            let Some(path) = dirs.iter().find_map(|dir| find_file_in_dir(name, dir)) else {
                tracing::warn!("couldn't find material file '{}'", name);
                return LoadedMaterial::placeholder(name, None);
            };

            let decoded = Mat::load(&path).and_then(|mat| {
                let cels = mat.decode(cmp, max_cels)?;
                Ok((mat, cels))
            });
            match decoded {
                Ok((mat, cels)) => LoadedMaterial {
                    name: name.clone(),
                    path: Some(path),
                    mat: Some(mat),
                    cels,
                },
                Err(e) => {
                    tracing::warn!("couldn't load material '{}': {}", path.display(), e);
                    LoadedMaterial::placeholder(name, Some(path))
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::cmp::CMP_VERSION_JK;
    use crate::material::mat::DEFAULT_MAX_CELS;

    #[test]
    fn cmp_is_found_in_misc_dir_of_parent() {
        let root = tempfile::tempdir().expect("tempdir");
        let model_dir = root.path().join("3do");
        let cmp_dir = root.path().join("misc").join("cmp");
        std::fs::create_dir_all(&model_dir).expect("mkdir");
        std::fs::create_dir_all(&cmp_dir).expect("mkdir");
        ColorMap::new(CMP_VERSION_JK).save(cmp_dir.join("dflt.cmp")).expect("save");

        let found = default_cmp_path(model_dir.join("kyle.3do")).expect("cmp");
        assert_eq!(found, cmp_dir.join("dflt.cmp"));

        ColorMap::new(CMP_VERSION_JK).save(model_dir.join("dflt.cmp")).expect("save");
        let found = default_cmp_path(model_dir.join("kyle.3do")).expect("cmp");
        assert_eq!(found, model_dir.join("dflt.cmp"));
    }

    #[test]
    fn mat_dirs_are_model_and_parent() {
        let dirs = default_mat_dirs(Path::new("/game/3do/kyle.3do"));
        assert_eq!(dirs, vec![PathBuf::from("/game/3do/mat"), PathBuf::from("/game/3do/../mat")]);
    }

    #[test]
    fn file_lookup_ignores_case() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("Wall.MAT"), b"x").expect("write");

        let found = find_file_in_dir("WALL.mat", dir.path()).expect("found");
        assert_eq!(found.file_name().and_then(|f| f.to_str()), Some("Wall.MAT"));
        assert!(find_file_in_dir("floor.mat", dir.path()).is_none());
        assert!(find_file_in_dir("", dir.path()).is_none());
    }

    #[test]
    fn missing_and_broken_materials_become_placeholders() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("broken.mat"), b"MAT junk").expect("write");

        let mut model = Model3do::new("m.3do");
        model.materials = vec!["missing.mat".into(), "broken.mat".into()];
        let loaded = load_model_materials(&model, &[dir.path().to_path_buf()], None, DEFAULT_MAX_CELS);

        assert_eq!(loaded.len(), 2);
        assert!(loaded.iter().all(|m| m.is_placeholder()));
        assert_eq!(loaded[0].path, None);
        assert_eq!(loaded[1].path, Some(dir.path().join("broken.mat")));
    }
}
