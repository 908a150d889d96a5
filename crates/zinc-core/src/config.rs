//! Scene and loader configuration
//!
//! Defaults that used to live in a shared module (material colour, opacity,
//! point size, scene duration) are carried explicitly by these structures and
//! handed to [`crate::Scene::new`] and [`crate::MetadataLoader::new`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_COLOUR, DEFAULT_LINE_WIDTH, DEFAULT_OPACITY, DEFAULT_PLAY_RATE, DEFAULT_POINT_SIZE,
    LOD_CLOSE_FACTOR, LOD_MEDIUM_FACTOR, SCENE_DEFAULT_DURATION,
};

/// Scene-wide defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SceneConfig {
    /// Duration restored by `Scene::reset_duration`
    pub default_duration: f32,
    /// Scene-wide marker display flag (combined with each object's marker mode)
    pub display_markers: bool,
    /// Time units advanced per second of wall time during playback
    pub play_rate: f32,
    /// LOD "close" threshold as a multiple of an object's bounding radius
    pub lod_close_factor: f32,
    /// LOD "medium" threshold as a multiple of an object's bounding radius
    pub lod_medium_factor: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            default_duration: SCENE_DEFAULT_DURATION,
            display_markers: false,
            play_rate: DEFAULT_PLAY_RATE,
            lod_close_factor: LOD_CLOSE_FACTOR,
            lod_medium_factor: LOD_MEDIUM_FACTOR,
        }
    }
}

/// Defaults applied by the metadata loader to loaded primitives
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoaderConfig {
    /// Surface colour used when the payload carries no material (RGB)
    pub default_colour: [f32; 3],
    /// Surface opacity used when the payload carries no material
    pub default_opacity: f32,
    /// Point size for point sets
    pub point_size: f32,
    /// Line width for line sets
    pub line_width: f32,
    /// Count failed items toward completion in schema v1 documents.
    ///
    /// Off by default: a failed v1 item leaves the completion counter short
    /// and the "all complete" callback does not fire.
    pub count_failed_items: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            default_colour: DEFAULT_COLOUR,
            default_opacity: DEFAULT_OPACITY,
            point_size: DEFAULT_POINT_SIZE,
            line_width: DEFAULT_LINE_WIDTH,
            count_failed_items: false,
        }
    }
}

/// Combined configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ZincConfig {
    pub scene: SceneConfig,
    pub loader: LoaderConfig,
}

impl ZincConfig {
    /// Load a configuration from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_ron(&content)
    }

    /// Parse a configuration from RON text
    pub fn from_ron(content: &str) -> Result<Self, ConfigError> {
        ron::from_str(content).map_err(|e| ConfigError::Deserialize(e.to_string()))
    }

    /// Serialize to pretty RON text
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config = ZincConfig::from_ron("(loader: (count_failed_items: true))").unwrap();
        assert!(config.loader.count_failed_items);
        assert_eq!(config.loader.default_opacity, DEFAULT_OPACITY);
        assert_eq!(config.scene, SceneConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        use tempfile::tempdir;

        let temp = tempdir().unwrap();
        let path = temp.path().join("zinc.ron");
        let mut config = ZincConfig::default();
        config.scene.display_markers = true;
        config.loader.point_size = 2.0;
        std::fs::write(&path, config.to_ron().unwrap()).unwrap();

        let loaded = ZincConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_ron() {
        let result = ZincConfig::from_ron("(scene: 12)");
        assert!(matches!(result, Err(ConfigError::Deserialize(_))));
    }
}
