use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use directories_next::ProjectDirs;

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "pointfade";
const APPLICATION: &str = "pointfade";
const SCENE_FILE: &str = "scene.toml";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
            .ok_or_else(|| anyhow!("failed to determine user directories"))?;
        Ok(Self {
            config_dir: project_dirs.config_dir().to_path_buf(),
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn default_scene_file(&self) -> PathBuf {
        self.config_dir.join(SCENE_FILE)
    }

    /// The scene file to load: an explicit path always wins, otherwise the
    /// default location when it exists.
    pub fn scene_file(&self, explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        let default = self.default_scene_file();
        default.is_file().then_some(default)
    }
}

#[cfg(test)]
impl AppPaths {
    pub fn from_raw(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }
}
