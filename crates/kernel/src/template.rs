//! Object templates: the physical description an object is instantiated from.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::backend::AcquireError;

/// File suffix of template descriptions inside a template directory.
pub const TEMPLATE_SUFFIX: &str = ".phys_properties.json";

/// Physical properties of an object template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectTemplate {
    #[serde(default = "default_mass")]
    pub mass: f32,
    /// Extents of the object's bounding box, in metres.
    #[serde(default = "default_scale")]
    pub scale: [f32; 3],
    #[serde(rename = "restitution coefficient", alias = "restitution", default)]
    pub restitution: f32,
}

fn default_mass() -> f32 {
    1.0
}

fn default_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

impl ObjectTemplate {
    pub fn new(mass: f32, scale: [f32; 3], restitution: f32) -> Self {
        Self {
            mass,
            scale,
            restitution,
        }
    }

    /// Distance from the object's origin to the bottom of its bounding box.
    pub fn half_height(&self) -> f32 {
        self.scale[1] * 0.5
    }
}

/// Registry of templates keyed by handle.
#[derive(Debug, Clone, Default)]
pub struct ObjectTemplateLibrary {
    templates: BTreeMap<String, ObjectTemplate>,
}

impl ObjectTemplateLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Library preloaded with the primitive test objects.
    pub fn with_builtins() -> Self {
        let mut lib = Self::new();
        lib.register("sphere", ObjectTemplate::new(1.0, [0.2, 0.2, 0.2], 0.5));
        lib.register(
            "mini_soccer_ball",
            ObjectTemplate::new(0.4, [0.1, 0.1, 0.1], 0.7),
        );
        lib.register("chair", ObjectTemplate::new(5.0, [0.5, 0.9, 0.5], 0.1));
        lib.register("cube", ObjectTemplate::new(1.0, [1.0, 1.0, 1.0], 0.2));
        lib
    }

    /// Register or replace a template.
    pub fn register(&mut self, handle: impl Into<String>, template: ObjectTemplate) {
        self.templates.insert(handle.into(), template);
    }

    pub fn get(&self, handle: &str) -> Option<&ObjectTemplate> {
        self.templates.get(handle)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Sorted handles containing `search`. An empty search matches all.
    pub fn template_handles(&self, search: &str) -> Vec<&str> {
        self.templates
            .keys()
            .filter(|h| h.contains(search))
            .map(String::as_str)
            .collect()
    }

    /// Load every `*.phys_properties.json` file in `dir`.
    ///
    /// The handle is the file name without the suffix. Returns the number of
    /// templates loaded.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize, AcquireError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(AcquireError::MissingAsset(dir.to_path_buf()));
        }
        let io_err = |path: &Path, e: std::io::Error| AcquireError::InvalidAsset {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| io_err(dir, e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| handle_for(p).is_some())
            .collect();
        paths.sort();

        for path in &paths {
            let text = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
            let template: ObjectTemplate =
                serde_json::from_str(&text).map_err(|e| AcquireError::InvalidAsset {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            if let Some(handle) = handle_for(path) {
                tracing::debug!(handle, path = %path.display(), "loaded object template");
                self.register(handle, template);
            }
        }
        Ok(paths.len())
    }
}

fn handle_for(path: &Path) -> Option<&str> {
    path.file_name()?.to_str()?.strip_suffix(TEMPLATE_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_include_reference_objects() {
        let lib = ObjectTemplateLibrary::with_builtins();
        for handle in ["sphere", "mini_soccer_ball", "chair"] {
            assert!(lib.get(handle).is_some(), "missing {handle}");
        }
        assert_eq!(lib.get("chair").unwrap().half_height(), 0.45);
    }

    #[test]
    fn template_handles_filters_by_substring() {
        let lib = ObjectTemplateLibrary::with_builtins();
        assert_eq!(lib.template_handles("ball"), vec!["mini_soccer_ball"]);
        assert_eq!(lib.template_handles("").len(), lib.len());
        assert!(lib.template_handles("table").is_empty());
    }

    #[test]
    fn load_dir_reads_phys_properties_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("crate.phys_properties.json"),
            r#"{ "mass": 3.0, "scale": [0.6, 0.4, 0.6], "restitution coefficient": 0.25 }"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut lib = ObjectTemplateLibrary::new();
        assert_eq!(lib.load_dir(dir.path()).unwrap(), 1);
        let t = lib.get("crate").unwrap();
        assert_eq!(t.mass, 3.0);
        assert_eq!(t.restitution, 0.25);
        assert_eq!(t.half_height(), 0.2);
    }

    #[test]
    fn load_dir_defaults_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pebble.phys_properties.json"), "{}").unwrap();
        let mut lib = ObjectTemplateLibrary::new();
        lib.load_dir(dir.path()).unwrap();
        assert_eq!(lib.get("pebble").unwrap(), &ObjectTemplate::new(1.0, [1.0; 3], 0.0));
    }

    #[test]
    fn load_dir_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.phys_properties.json"), "{ nope").unwrap();
        let mut lib = ObjectTemplateLibrary::new();
        assert!(matches!(
            lib.load_dir(dir.path()),
            Err(AcquireError::InvalidAsset { .. })
        ));
    }

    #[test]
    fn load_dir_missing_directory() {
        let mut lib = ObjectTemplateLibrary::new();
        assert!(matches!(
            lib.load_dir("/definitely/not/here"),
            Err(AcquireError::MissingAsset(_))
        ));
    }
}
