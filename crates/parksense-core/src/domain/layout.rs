//! File layout of a ParkSense installation.
//!
//! ```text
//! <base>/
//!   config/settings.json          detector settings
//!   data/parking_spaces.json      marked parking spaces
//!   models/yolov8n.pt             detection model weights
//! ```
//!
//! The detector resolves the same paths relative to its own install
//! directory, so the tools and the detector agree as long as they share a
//! base directory.

use std::path::{Path, PathBuf};

pub const CONFIG_DIR_NAME: &str = "config";
pub const DATA_DIR_NAME: &str = "data";
pub const MODELS_DIR_NAME: &str = "models";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const PARKING_SPACES_FILE_NAME: &str = "parking_spaces.json";
pub const MODEL_FILE_NAME: &str = "yolov8n.pt";

/// Paths of one installation, derived from its base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    base: PathBuf,
}

impl ProjectLayout {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    pub fn config_dir(&self) -> PathBuf {
        self.base.join(CONFIG_DIR_NAME)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.base.join(DATA_DIR_NAME)
    }

    pub fn models_dir(&self) -> PathBuf {
        self.base.join(MODELS_DIR_NAME)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn parking_spaces_path(&self) -> PathBuf {
        self.data_dir().join(PARKING_SPACES_FILE_NAME)
    }

    pub fn model_path(&self) -> PathBuf {
        self.models_dir().join(MODEL_FILE_NAME)
    }

    /// Directories the bootstrap creates, in creation order.
    pub fn directories(&self) -> [PathBuf; 3] {
        [self.config_dir(), self.data_dir(), self.models_dir()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_path_is_under_config_dir() {
        let layout = ProjectLayout::new("/opt/parksense");
        assert_eq!(
            layout.settings_path(),
            PathBuf::from("/opt/parksense/config/settings.json")
        );
    }

    #[test]
    fn test_parking_spaces_path_is_under_data_dir() {
        let layout = ProjectLayout::new("/opt/parksense");
        assert_eq!(
            layout.parking_spaces_path(),
            PathBuf::from("/opt/parksense/data/parking_spaces.json")
        );
    }

    #[test]
    fn test_model_path_is_under_models_dir() {
        let layout = ProjectLayout::new("base");
        assert!(layout.model_path().ends_with("models/yolov8n.pt"));
    }

    #[test]
    fn test_directories_lists_config_data_models() {
        let layout = ProjectLayout::new("base");
        let dirs = layout.directories();
        assert!(dirs[0].ends_with("config"));
        assert!(dirs[1].ends_with("data"));
        assert!(dirs[2].ends_with("models"));
    }
}
