//! Runtime configuration for the lesson runner.
//!
//! Everything has a default, so the runner works without a config file. A
//! TOML file can override any subset of fields:
//!
//! ```toml
//! lesson = "texture-array"
//! present_mode = "fifo"
//!
//! [window]
//! width = 1280
//! height = 720
//!
//! [textures]
//! layers = ["assets/a.png", "assets/b.png"]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vulkano::swapchain::PresentMode;

use crate::lesson::LessonKind;

/// Errors produced while loading or validating a [`LessonsConfig`].
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
  #[error("failed to read config {path}: {source}")]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config: {0}")]
  Parse(#[from] toml::de::Error),

  #[error("invalid config: {0}")]
  Invalid(String),
}

/// Preferred swapchain present mode.
///
/// The preference is honored only if the surface supports it; `Fifo` is the
/// fallback because every Vulkan implementation must provide it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresentModePreference {
  #[default]
  Mailbox,
  Fifo,
  Immediate,
}

impl PresentModePreference {
  pub fn choose(self, supported: &[PresentMode]) -> PresentMode {
    let wanted = match self {
      Self::Mailbox => PresentMode::Mailbox,
      Self::Fifo => PresentMode::Fifo,
      Self::Immediate => PresentMode::Immediate,
    };

    if supported.contains(&wanted) {
      wanted
    } else {
      PresentMode::Fifo
    }
  }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
  pub width:  u32,
  pub height: u32,
}

impl Default for WindowConfig {
  fn default() -> Self {
    Self {
      width:  800,
      height: 600,
    }
  }
}

/// Texture files used by the lessons. Any texture left unset is replaced by a
/// generated checkerboard.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureConfig {
  pub quad:   Option<PathBuf>,
  pub layers: Vec<PathBuf>,
  pub depth:  Option<PathBuf>,
  pub model:  Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LessonsConfig {
  /// Lesson shown at startup
  pub lesson:           LessonKind,
  pub window:           WindowConfig,
  pub present_mode:     PresentModePreference,
  /// Desired swapchain image count, clamped to what the surface allows
  pub swapchain_images: u32,
  /// Enable `VK_LAYER_KHRONOS_validation` when it is installed
  pub debug_layers:     bool,
  pub textures:         TextureConfig,
  /// OBJ file for the model lesson, the bundled cube when unset
  pub model_path:       Option<PathBuf>,
  /// Axis the animated lessons rotate around
  pub spin_axis:        [f32; 3],
}

impl Default for LessonsConfig {
  fn default() -> Self {
    Self {
      lesson:           LessonKind::TexturedQuad,
      window:           WindowConfig::default(),
      present_mode:     PresentModePreference::default(),
      swapchain_images: 2,
      debug_layers:     cfg!(debug_assertions),
      textures:         TextureConfig::default(),
      model_path:       None,
      spin_axis:        [1.0, 0.0, 0.0],
    }
  }
}

impl LessonsConfig {
  pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
    let config: Self = toml::from_str(contents)?;
    config.validate()?;
    Ok(config)
  }

  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.to_path_buf(),
      source,
    })?;

    log::debug!("Loaded config from {}", path.display());
    Self::from_toml_str(&contents)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.window.width == 0 || self.window.height == 0 {
      return Err(ConfigError::Invalid(format!(
        "window size must be non-zero, got {}x{}",
        self.window.width, self.window.height
      )));
    }

    if self.swapchain_images == 0 {
      return Err(ConfigError::Invalid(
        "swapchain_images must be at least 1".to_string(),
      ));
    }

    if self.spin_axis.iter().all(|c| *c == 0.0) || self.spin_axis.iter().any(|c| !c.is_finite()) {
      return Err(ConfigError::Invalid(format!(
        "spin_axis must be a finite non-zero vector, got {:?}",
        self.spin_axis
      )));
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::*;

  #[test]
  fn empty_file_gives_defaults() {
    let config = LessonsConfig::from_toml_str("").unwrap();
    assert_eq!(config, LessonsConfig::default());
    assert_eq!(config.window.width, 800);
    assert_eq!(config.window.height, 600);
    assert_eq!(config.swapchain_images, 2);
  }

  #[test]
  fn partial_override() {
    let config = LessonsConfig::from_toml_str(
      r#"
        lesson = "obj-model"
        present_mode = "fifo"

        [window]
        width = 1280

        [textures]
        layers = ["a.png", "b.png"]
      "#,
    )
    .unwrap();

    assert_eq!(config.lesson, LessonKind::ObjModel);
    assert_eq!(config.present_mode, PresentModePreference::Fifo);
    assert_eq!(config.window.width, 1280);
    assert_eq!(config.window.height, 600);
    assert_eq!(config.textures.layers, vec![PathBuf::from("a.png"), PathBuf::from("b.png")]);
    assert!(config.textures.quad.is_none());
    assert!(config.model_path.is_none());
  }

  #[test]
  fn model_path_override() {
    let config = LessonsConfig::from_toml_str(r#"model_path = "meshes/teapot.obj""#).unwrap();
    assert_eq!(config.model_path, Some(PathBuf::from("meshes/teapot.obj")));
  }

  #[test]
  fn unknown_lesson_is_a_parse_error() {
    let err = LessonsConfig::from_toml_str(r#"lesson = "teapot""#).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
  }

  #[test]
  fn rejects_zero_window() {
    let err = LessonsConfig::from_toml_str("[window]\nheight = 0").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
  }

  #[test]
  fn rejects_zero_images_and_axis() {
    assert!(LessonsConfig::from_toml_str("swapchain_images = 0").is_err());
    assert!(LessonsConfig::from_toml_str("spin_axis = [0.0, 0.0, 0.0]").is_err());
  }

  #[test]
  fn load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "lesson = \"depth-stencil\"\nswapchain_images = 3").unwrap();

    let config = LessonsConfig::load(file.path()).unwrap();
    assert_eq!(config.lesson, LessonKind::DepthStencil);
    assert_eq!(config.swapchain_images, 3);
  }

  #[test]
  fn missing_file_reports_path() {
    let err = LessonsConfig::load("/definitely/not/here.toml").unwrap_err();
    match err {
      ConfigError::Io { path, .. } => assert_eq!(path, PathBuf::from("/definitely/not/here.toml")),
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn present_mode_falls_back_to_fifo() {
    let supported = [PresentMode::Fifo, PresentMode::Immediate];
    assert_eq!(PresentModePreference::Mailbox.choose(&supported), PresentMode::Fifo);
    assert_eq!(PresentModePreference::Immediate.choose(&supported), PresentMode::Immediate);
    assert_eq!(PresentModePreference::Fifo.choose(&supported), PresentMode::Fifo);
  }
}
