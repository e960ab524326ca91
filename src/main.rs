use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use vulkano_lessons::{App, LessonKind, LessonsConfig};
use winit::event_loop::EventLoop;

/// Vulkan tutorial lessons built on vulkano.
///
/// Keys: Esc quits, N / P switch lessons, Space pauses the animation.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
  /// TOML config file
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Lesson to start with, overrides the config file
  #[arg(short, long)]
  lesson: Option<LessonKind>,

  /// Print the available lessons and exit
  #[arg(long)]
  list: bool,

  /// Enable the Vulkan validation layer
  #[arg(long)]
  debug: bool,
}

impl Cli {
  /// Applies the command line overrides on top of `config`.
  fn apply(&self, mut config: LessonsConfig) -> LessonsConfig {
    if let Some(lesson) = self.lesson {
      config.lesson = lesson;
    }
    config.debug_layers |= self.debug;
    config
  }
}

fn main() -> anyhow::Result<()> {
  use env_logger::{Builder, Env};

  Builder::from_env(Env::default().default_filter_or("info")).init();

  let cli = Cli::parse();

  if cli.list {
    for kind in LessonKind::ALL {
      println!("{:<14} {}", kind.name(), kind.title());
    }
    return Ok(());
  }

  let config = match &cli.config {
    Some(path) => LessonsConfig::load(path)?,
    None => LessonsConfig::default(),
  };
  let config = cli.apply(config);

  let event_loop = EventLoop::new().context("failed to create event loop")?;
  let mut app = App::new(&event_loop, config)?;
  event_loop.run_app(&mut app)?;

  match app.take_error() {
    Some(e) => Err(e),
    None => Ok(()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn obj_model_config() -> LessonsConfig {
    LessonsConfig {
      lesson: LessonKind::ObjModel,
      debug_layers: false,
      ..Default::default()
    }
  }

  #[test]
  fn lesson_flag_overrides_config() {
    let cli = Cli::try_parse_from(["lessons", "--lesson", "depth-stencil"]).unwrap();
    let config = cli.apply(obj_model_config());
    assert_eq!(config.lesson, LessonKind::DepthStencil);
    assert!(!config.debug_layers);
  }

  #[test]
  fn no_flags_keep_config() {
    let cli = Cli::try_parse_from(["lessons"]).unwrap();
    assert_eq!(cli.apply(obj_model_config()), obj_model_config());
  }

  #[test]
  fn debug_flag_enables_layers() {
    let cli = Cli::try_parse_from(["lessons", "--debug"]).unwrap();
    assert!(cli.apply(obj_model_config()).debug_layers);
  }

  #[test]
  fn unknown_lesson_is_rejected() {
    assert!(Cli::try_parse_from(["lessons", "--lesson", "teapot"]).is_err());
  }

  #[test]
  fn list_and_config_flags() {
    let cli = Cli::try_parse_from(["lessons", "--list", "-c", "lessons.toml"]).unwrap();
    assert!(cli.list);
    assert_eq!(cli.config, Some(PathBuf::from("lessons.toml")));
  }

  #[test]
  fn cli_definition_is_valid() {
    use clap::CommandFactory;
    Cli::command().debug_assert();
  }
}
