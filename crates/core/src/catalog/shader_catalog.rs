use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::shared::constants::{SHADER_CONFIG_FILENAME, SHADER_EXTENSION};
use crate::shared::error::MergeError;

/// Declared controls of one shader: uniform name to descriptor object
/// (type, range, default). Display metadata only; binding never consults it.
pub type UniformControls = BTreeMap<String, Value>;

/// Directory of transition fragment shaders plus the optional
/// `shader_config.json` descriptor.
///
/// Loaded once at startup and shared read-only across jobs.
#[derive(Debug, Clone)]
pub struct ShaderCatalog {
    dir: PathBuf,
    shaders: Vec<String>,
    controls: BTreeMap<String, UniformControls>,
}

impl ShaderCatalog {
    pub fn load(dir: &Path) -> Result<Self, MergeError> {
        let entries = fs::read_dir(dir).map_err(|e| {
            MergeError::InvalidRequest(format!(
                "cannot read shader directory {}: {e}",
                dir.display()
            ))
        })?;

        let mut shaders: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| e.eq_ignore_ascii_case(SHADER_EXTENSION))
            })
            .filter_map(|path| path.file_name()?.to_str().map(str::to_string))
            .collect();
        shaders.sort();

        let controls = load_controls(&dir.join(SHADER_CONFIG_FILENAME));
        log::info!(
            "Loaded {} shaders from {} ({} with declared controls)",
            shaders.len(),
            dir.display(),
            controls.len()
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            shaders,
            controls,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Shader file names, sorted.
    pub fn shader_names(&self) -> &[String] {
        &self.shaders
    }

    /// Declared controls for `identifier` (`fade` or `fade.glsl`), if the
    /// descriptor mentions it.
    pub fn controls(&self, identifier: &str) -> Option<&UniformControls> {
        let file_name = file_name_for(identifier);
        let stem = file_name
            .strip_suffix(&format!(".{SHADER_EXTENSION}"))
            .unwrap_or(&file_name);
        self.controls
            .get(identifier)
            .or_else(|| self.controls.get(&file_name))
            .or_else(|| self.controls.get(stem))
    }

    pub fn all_controls(&self) -> &BTreeMap<String, UniformControls> {
        &self.controls
    }

    /// Path of the shader named `identifier`, confined to the catalog
    /// directory.
    pub fn resolve(&self, identifier: &str) -> Result<PathBuf, MergeError> {
        let trimmed = identifier.trim();
        if trimmed.is_empty()
            || trimmed.contains(['/', '\\'])
            || trimmed.contains("..")
            || Path::new(trimmed).is_absolute()
        {
            return Err(MergeError::InvalidRequest(format!(
                "invalid shader identifier '{identifier}'"
            )));
        }

        let path = self.dir.join(file_name_for(trimmed));
        if !path.is_file() {
            return Err(MergeError::InvalidRequest(format!(
                "unknown shader '{identifier}' in {}",
                self.dir.display()
            )));
        }
        Ok(path)
    }

    pub fn fragment_source(&self, identifier: &str) -> Result<String, MergeError> {
        let path = self.resolve(identifier)?;
        fs::read_to_string(&path).map_err(|e| {
            MergeError::InvalidRequest(format!("cannot read shader {}: {e}", path.display()))
        })
    }
}

fn file_name_for(identifier: &str) -> String {
    let has_extension = Path::new(identifier)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(SHADER_EXTENSION));
    if has_extension {
        identifier.to_string()
    } else {
        format!("{identifier}.{SHADER_EXTENSION}")
    }
}

/// A missing or malformed descriptor is not fatal: binding only depends on
/// what the compiled program declares.
fn load_controls(path: &Path) -> BTreeMap<String, UniformControls> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            log::warn!("Cannot read {}: {e}; ignoring shader descriptor", path.display());
            return BTreeMap::new();
        }
    };
    match serde_json::from_str(&text) {
        Ok(controls) => controls,
        Err(e) => {
            log::warn!("Malformed {}: {e}; ignoring shader descriptor", path.display());
            BTreeMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::error::ErrorKind;
    use rstest::rstest;

    fn catalog_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("fade.glsl"), "void main() {}").unwrap();
        fs::write(dir.path().join("wipe.glsl"), "void main() {}").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        dir
    }

    #[test]
    fn test_lists_glsl_files_sorted() {
        let dir = catalog_dir();
        let catalog = ShaderCatalog::load(dir.path()).unwrap();
        assert_eq!(catalog.shader_names(), ["fade.glsl", "wipe.glsl"]);
        assert!(catalog.all_controls().is_empty());
    }

    #[rstest]
    #[case("fade")]
    #[case("fade.glsl")]
    fn test_resolve_with_or_without_extension(#[case] identifier: &str) {
        let dir = catalog_dir();
        let catalog = ShaderCatalog::load(dir.path()).unwrap();
        assert_eq!(
            catalog.resolve(identifier).unwrap(),
            dir.path().join("fade.glsl")
        );
        assert_eq!(catalog.fragment_source(identifier).unwrap(), "void main() {}");
    }

    #[rstest]
    #[case("../fade")]
    #[case("sub/fade")]
    #[case("sub\\fade")]
    #[case("")]
    #[case("missing")]
    fn test_resolve_rejects(#[case] identifier: &str) {
        let dir = catalog_dir();
        let catalog = ShaderCatalog::load(dir.path()).unwrap();
        assert_eq!(
            catalog.resolve(identifier).unwrap_err().kind(),
            ErrorKind::InvalidRequest
        );
    }

    #[test]
    fn test_reads_descriptor() {
        let dir = catalog_dir();
        fs::write(
            dir.path().join(SHADER_CONFIG_FILENAME),
            r#"{"fade.glsl": {"strength": {"type": "float", "min": 0, "max": 1}}}"#,
        )
        .unwrap();
        let catalog = ShaderCatalog::load(dir.path()).unwrap();
        let controls = catalog.controls("fade").unwrap();
        assert_eq!(controls["strength"]["type"], "float");
        assert!(catalog.controls("wipe").is_none());
    }

    #[test]
    fn test_malformed_descriptor_is_ignored() {
        let dir = catalog_dir();
        fs::write(dir.path().join(SHADER_CONFIG_FILENAME), "{not json").unwrap();
        let catalog = ShaderCatalog::load(dir.path()).unwrap();
        assert!(catalog.all_controls().is_empty());
        assert!(catalog.resolve("fade").is_ok());
    }

    #[test]
    fn test_missing_directory_is_invalid_request() {
        let err = ShaderCatalog::load(Path::new("/nonexistent/shaders")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }
}
