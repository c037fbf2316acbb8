//! Saver configuration.
//!
//! A [`SaverConfig`] is resolved once by the caller (typically from a YAML file next
//! to the preprocessing job) and then turned into a [`Saver`]. The library never
//! reads environment variables; callers that want overrides apply them before
//! building.
//!
//! ```yaml
//! root_dir: /data/processed/lidc
//! paths:
//!   image: images/{}.nii.gz
//! ```
//!
//! `paths` may be omitted, in which case [`default_path_dict`] is used.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::{default_path_dict, NiftiWriter, Saver, SaverError, SaverResult};

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SaverConfig {
    root_dir: PathBuf,
    #[serde(default = "default_path_dict")]
    paths: BTreeMap<String, String>,
}

impl SaverConfig {
    /// Config rooted at `root_dir` with the default templates.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            paths: default_path_dict(),
        }
    }

    /// Replaces the template map.
    pub fn with_paths(mut self, paths: BTreeMap<String, String>) -> Self {
        self.paths = paths;
        self
    }

    pub fn from_yaml_str(yaml: &str) -> SaverResult<Self> {
        serde_yaml::from_str(yaml).map_err(SaverError::ConfigParse)
    }

    pub fn from_yaml_file(path: &Path) -> SaverResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SaverError::ConfigRead(std::io::Error::new(
                e.kind(),
                format!("Failed to read config {}: {}", path.display(), e),
            ))
        })?;
        Self::from_yaml_str(&contents)
    }

    pub fn to_yaml_string(&self) -> SaverResult<String> {
        serde_yaml::to_string(self).map_err(SaverError::ConfigSerialize)
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn paths(&self) -> &BTreeMap<String, String> {
        &self.paths
    }

    /// Builds a NIfTI saver, creating the template directories.
    pub fn build(&self) -> SaverResult<Saver<NiftiWriter>> {
        Saver::new(&self.root_dir, &self.paths)
    }
}
