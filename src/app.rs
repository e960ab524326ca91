//! Window, event handling and the frame loop.
//!
//! [`App`] owns the [`VulkanBase`] for the lifetime of the program and
//! creates the window, swapchain and current lesson once the event loop
//! resumes. Each frame follows this sequence:
//! 1. Recreate the swapchain and rebuild the lesson if the window changed
//! 2. Acquire the next swapchain image
//! 3. Let the lesson update its uniforms and record its draw
//! 4. Submit the command buffer and present
//!
//! Errors raised inside the event callbacks cannot be returned through
//! winit, so they are logged, stored, and end the event loop. `main` picks
//! them up with [`App::take_error`]. The one exception is switching lessons
//! with N/P: a lesson that fails to build is logged and the current one stays.

use std::{sync::Arc, time::Instant};

use anyhow::Context;
use vulkano::command_buffer::{AutoCommandBufferBuilder, CommandBufferUsage};
use winit::{
  application::ApplicationHandler,
  dpi::LogicalSize,
  event::{ElementState, KeyEvent, WindowEvent},
  event_loop::{ActiveEventLoop, EventLoop},
  keyboard::{KeyCode, PhysicalKey},
  window::{Window, WindowId},
};

use crate::{
  base::{SurfaceTarget, VulkanBase},
  config::LessonsConfig,
  lesson::{FrameState, Lesson, LessonKind, build_lesson},
  mvp::AnimationClock,
};

/// What a key press asks the app to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
  Quit,
  NextLesson,
  PreviousLesson,
  TogglePause,
}

impl KeyAction {
  pub fn from_key(code: KeyCode) -> Option<Self> {
    match code {
      KeyCode::Escape => Some(Self::Quit),
      KeyCode::KeyN => Some(Self::NextLesson),
      KeyCode::KeyP => Some(Self::PreviousLesson),
      KeyCode::Space => Some(Self::TogglePause),
      _ => None,
    }
  }
}

/// Stores the lesson produced by `build` in `slot`, leaving `slot` untouched
/// when `build` fails.
fn replace_lesson<L>(slot: &mut Option<L>, build: impl FnOnce() -> anyhow::Result<L>) -> anyhow::Result<()> {
  let lesson = build()?;
  *slot = Some(lesson);
  Ok(())
}

pub struct App {
  config: LessonsConfig,
  base:   VulkanBase,
  kind:   LessonKind,
  clock:  AnimationClock,
  target: Option<SurfaceTarget>,
  lesson: Option<Box<dyn Lesson>>,
  error:  Option<anyhow::Error>,
}

impl App {
  pub fn new(event_loop: &EventLoop<()>, config: LessonsConfig) -> anyhow::Result<Self> {
    let base = VulkanBase::new(event_loop, config.debug_layers)?;

    Ok(Self {
      kind: config.lesson,
      config,
      base,
      clock: AnimationClock::new(Instant::now()),
      target: None,
      lesson: None,
      error: None,
    })
  }

  /// The error that stopped the event loop, if any.
  pub fn take_error(&mut self) -> Option<anyhow::Error> {
    self.error.take()
  }

  fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
    log::error!("{error:#}");
    self.error = Some(error);
    event_loop.exit();
  }

  fn create_target(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
    let attributes = Window::default_attributes()
      .with_title(self.kind.title())
      .with_inner_size(LogicalSize::new(self.config.window.width, self.config.window.height));
    let window = Arc::new(event_loop.create_window(attributes).context("failed to create window")?);

    self.target = Some(SurfaceTarget::new(&self.base, window, &self.config)?);
    self.load_lesson(self.kind)
  }

  /// Replaces the current lesson with `kind`, built against the existing
  /// swapchain. The current lesson is kept if building fails.
  fn load_lesson(&mut self, kind: LessonKind) -> anyhow::Result<()> {
    let target = self.target.as_ref().context("no window to draw the lesson in")?;

    replace_lesson(&mut self.lesson, || {
      build_lesson(
        kind,
        &self.base.lesson_context(),
        &self.config,
        target.image_format(),
        &target.images,
        target.extent(),
      )
    })?;

    target.window.set_title(kind.title());
    self.kind = kind;
    Ok(())
  }

  /// Runtime lesson switch. A lesson that fails to build is logged and
  /// skipped instead of ending the app.
  fn switch_lesson(&mut self, kind: LessonKind) {
    if let Err(e) = self.load_lesson(kind) {
      log::error!("Cannot switch to {kind}, staying on {}: {e:#}", self.kind);
    }
  }

  fn handle_key(&mut self, event_loop: &ActiveEventLoop, action: KeyAction) {
    match action {
      KeyAction::Quit => event_loop.exit(),
      KeyAction::NextLesson => self.switch_lesson(self.kind.next()),
      KeyAction::PreviousLesson => self.switch_lesson(self.kind.previous()),
      KeyAction::TogglePause => {
        self.clock.toggle_pause(Instant::now());
        log::info!(
          "Animation {}",
          if self.clock.is_paused() { "paused" } else { "resumed" }
        );
      }
    }
  }

  fn redraw(&mut self) -> anyhow::Result<()> {
    let (Some(target), Some(lesson)) = (self.target.as_mut(), self.lesson.as_mut()) else {
      return Ok(());
    };

    // Minimized windows have no drawable area
    let window_size = target.window.inner_size();
    if window_size.width == 0 || window_size.height == 0 {
      return Ok(());
    }

    target.cleanup_finished();

    if target.recreate_swapchain {
      target.recreate(window_size.into())?;
      lesson.rebuild(&target.images, target.extent())?;
    }

    let Some((image_index, acquire_future)) = target.acquire()? else {
      return Ok(());
    };

    lesson.update(&FrameState {
      elapsed: self.clock.tick(Instant::now()),
      extent:  target.extent(),
    })?;

    let mut builder = AutoCommandBufferBuilder::primary(
      self.base.command_buffer_allocator.clone(),
      self.base.queue.queue_family_index(),
      CommandBufferUsage::OneTimeSubmit,
    )?;
    lesson.record(&mut builder, image_index)?;
    let command_buffer = builder.build()?;

    target.submit_and_present(&self.base, command_buffer, acquire_future, image_index)
  }
}

impl ApplicationHandler for App {
  fn resumed(&mut self, event_loop: &ActiveEventLoop) {
    if self.target.is_some() {
      return;
    }

    if let Err(e) = self.create_target(event_loop) {
      self.fail(event_loop, e.context("failed to start lesson"));
    }
  }

  fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
    let result = match event {
      WindowEvent::CloseRequested => {
        event_loop.exit();
        Ok(())
      }
      WindowEvent::Resized(_) => {
        if let Some(target) = self.target.as_mut() {
          target.recreate_swapchain = true;
        }
        Ok(())
      }
      WindowEvent::KeyboardInput {
        event:
          KeyEvent {
            physical_key: PhysicalKey::Code(code),
            state: ElementState::Pressed,
            repeat: false,
            ..
          },
        ..
      } => {
        if let Some(action) = KeyAction::from_key(code) {
          self.handle_key(event_loop, action);
        }
        Ok(())
      }
      WindowEvent::RedrawRequested => self.redraw(),
      _ => Ok(()),
    };

    if let Err(e) = result {
      self.fail(event_loop, e);
    }
  }

  fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
    if let Some(target) = self.target.as_ref() {
      target.window.request_redraw();
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn key_bindings() {
    assert_eq!(KeyAction::from_key(KeyCode::Escape), Some(KeyAction::Quit));
    assert_eq!(KeyAction::from_key(KeyCode::KeyN), Some(KeyAction::NextLesson));
    assert_eq!(KeyAction::from_key(KeyCode::KeyP), Some(KeyAction::PreviousLesson));
    assert_eq!(KeyAction::from_key(KeyCode::Space), Some(KeyAction::TogglePause));
    assert_eq!(KeyAction::from_key(KeyCode::KeyW), None);
  }

  #[test]
  fn failed_build_keeps_current_lesson() {
    let mut slot = Some(LessonKind::TexturedQuad);

    let result = replace_lesson(&mut slot, || Err(anyhow::anyhow!("failed to load model")));
    assert!(result.is_err());
    assert_eq!(slot, Some(LessonKind::TexturedQuad));

    replace_lesson(&mut slot, || Ok(LessonKind::ObjModel)).unwrap();
    assert_eq!(slot, Some(LessonKind::ObjModel));
  }
}
