//! The lesson trait and the registry of available lessons.
//!
//! Every lesson owns its render pass, framebuffers, pipeline and GPU
//! resources. The [`App`](crate::App) drives a lesson through three calls:
//! * [`Lesson::rebuild`] after creation and whenever the swapchain changes
//! * [`Lesson::update`] once per frame, before recording
//! * [`Lesson::record`] to record the frame's draw into a command buffer

use std::{fmt, str::FromStr, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use vulkano::{
  buffer::{
    BufferContents,
    BufferUsage,
    Subbuffer,
    allocator::{SubbufferAllocator, SubbufferAllocatorCreateInfo},
  },
  command_buffer::{
    AutoCommandBufferBuilder,
    PrimaryAutoCommandBuffer,
    allocator::StandardCommandBufferAllocator,
  },
  descriptor_set::allocator::StandardDescriptorSetAllocator,
  device::{Device, Queue},
  format::{Format, FormatFeatures},
  image::Image,
  memory::allocator::{MemoryTypeFilter, StandardMemoryAllocator},
};

use crate::{
  config::LessonsConfig,
  mvp::{MvpUniform, aspect_ratio},
  render::depth::{DEPTH_FORMAT_CANDIDATES, choose_depth_format},
};

pub mod depth_stencil;
pub mod mvp_uniform;
pub mod obj_model;
pub mod texture_array;
pub mod textured_quad;

/// Color every lesson clears the swapchain image to.
pub const CLEAR_COLOR: [f32; 4] = [0.2, 0.3, 0.3, 1.0];

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("unknown lesson `{0}`, expected one of: textured-quad, texture-array, mvp-uniform, depth-stencil, obj-model")]
pub struct UnknownLesson(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LessonKind {
  TexturedQuad,
  TextureArray,
  MvpUniform,
  DepthStencil,
  ObjModel,
}

impl LessonKind {
  pub const ALL: [LessonKind; 5] = [
    LessonKind::TexturedQuad,
    LessonKind::TextureArray,
    LessonKind::MvpUniform,
    LessonKind::DepthStencil,
    LessonKind::ObjModel,
  ];

  pub fn name(self) -> &'static str {
    match self {
      Self::TexturedQuad => "textured-quad",
      Self::TextureArray => "texture-array",
      Self::MvpUniform => "mvp-uniform",
      Self::DepthStencil => "depth-stencil",
      Self::ObjModel => "obj-model",
    }
  }

  pub fn title(self) -> &'static str {
    match self {
      Self::TexturedQuad => "Vulkano Lessons - Textured Quad",
      Self::TextureArray => "Vulkano Lessons - Texture Array",
      Self::MvpUniform => "Vulkano Lessons - MVP Uniform Buffer",
      Self::DepthStencil => "Vulkano Lessons - Depth Stencil",
      Self::ObjModel => "Vulkano Lessons - OBJ Model",
    }
  }

  fn index(self) -> usize {
    Self::ALL.iter().position(|k| *k == self).unwrap_or(0)
  }

  /// The following lesson, wrapping around after the last one.
  pub fn next(self) -> Self {
    Self::ALL[(self.index() + 1) % Self::ALL.len()]
  }

  /// The preceding lesson, wrapping around before the first one.
  pub fn previous(self) -> Self {
    Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
  }
}

impl fmt::Display for LessonKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for LessonKind {
  type Err = UnknownLesson;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
      .ok_or_else(|| UnknownLesson(s.to_string()))
  }
}

/// Per-frame input handed to [`Lesson::update`].
#[derive(Clone, Copy, Debug)]
pub struct FrameState {
  /// Animation time, stops advancing while paused
  pub elapsed: Duration,
  /// Current swapchain extent in pixels
  pub extent:  [u32; 2],
}

/// Device-level handles shared by every lesson.
#[derive(Clone)]
pub struct LessonContext {
  pub device:                   Arc<Device>,
  /// Graphics queue, also used for staging uploads
  pub queue:                    Arc<Queue>,
  /// Backs vertex, index, staging and image memory
  pub memory_allocator:         Arc<StandardMemoryAllocator>,
  /// Source of each frame's set 0
  pub descriptor_set_allocator: Arc<StandardDescriptorSetAllocator>,
  /// Used for upload command buffers at lesson creation
  pub command_buffer_allocator: Arc<StandardCommandBufferAllocator>,
}

impl LessonContext {
  /// Allocator for the per-frame uniform buffers, host-writable and
  /// preferably device-local.
  pub fn uniform_allocator(&self) -> SubbufferAllocator {
    SubbufferAllocator::new(
      self.memory_allocator.clone(),
      SubbufferAllocatorCreateInfo {
        buffer_usage: BufferUsage::UNIFORM_BUFFER,
        memory_type_filter: MemoryTypeFilter::PREFER_DEVICE | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
        ..Default::default()
      },
    )
  }

  /// Picks the first depth format the device can use as an optimal-tiling
  /// depth/stencil attachment.
  pub fn depth_format(&self) -> anyhow::Result<Format> {
    let physical_device = self.device.physical_device();
    let format = choose_depth_format(&DEPTH_FORMAT_CANDIDATES, |format| {
      physical_device
        .format_properties(format)
        .map(|properties| {
          properties
            .optimal_tiling_features
            .intersects(FormatFeatures::DEPTH_STENCIL_ATTACHMENT)
        })
        .unwrap_or(false)
    })
    .ok_or_else(|| anyhow::anyhow!("no supported depth/stencil attachment format"))?;

    log::info!("Using depth format {format:?}");
    Ok(format)
  }
}

/// Writes `value` into a fresh subbuffer from `allocator`.
pub fn write_uniform<T: BufferContents>(
  allocator: &SubbufferAllocator,
  value: T,
) -> anyhow::Result<Subbuffer<T>> {
  let buffer = allocator.allocate_sized::<T>()?;
  *buffer.write()? = value;
  Ok(buffer)
}

/// The spinning MVP transform for `frame`, using the frame's aspect ratio.
pub fn frame_mvp(frame: &FrameState, spin_axis: [f32; 3]) -> MvpUniform {
  MvpUniform::spinning(frame.elapsed, aspect_ratio(frame.extent), spin_axis)
}

pub trait Lesson {
  fn kind(&self) -> LessonKind;

  /// Recreates the window-size dependent state (framebuffers and pipeline)
  /// for a new set of swapchain images.
  fn rebuild(&mut self, images: &[Arc<Image>], extent: [u32; 2]) -> anyhow::Result<()>;

  /// Writes this frame's uniform data.
  fn update(&mut self, frame: &FrameState) -> anyhow::Result<()>;

  /// Records the frame into `builder` targeting swapchain image `image_index`.
  fn record(
    &mut self,
    builder: &mut AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>,
    image_index: u32,
  ) -> anyhow::Result<()>;
}

/// Creates the lesson `kind` for a swapchain of `swapchain_format` and builds
/// its window-size dependent state against `images`.
pub fn build_lesson(
  kind: LessonKind,
  ctx: &LessonContext,
  config: &LessonsConfig,
  swapchain_format: Format,
  images: &[Arc<Image>],
  extent: [u32; 2],
) -> anyhow::Result<Box<dyn Lesson>> {
  log::info!("Building lesson {kind}");

  let mut lesson: Box<dyn Lesson> = match kind {
    LessonKind::TexturedQuad => Box::new(textured_quad::TexturedQuad::new(ctx, config, swapchain_format)?),
    LessonKind::TextureArray => Box::new(texture_array::TextureArray::new(ctx, config, swapchain_format)?),
    LessonKind::MvpUniform => Box::new(mvp_uniform::MvpUniformLesson::new(ctx, config, swapchain_format)?),
    LessonKind::DepthStencil => Box::new(depth_stencil::DepthStencil::new(ctx, config, swapchain_format)?),
    LessonKind::ObjModel => Box::new(obj_model::ObjModel::new(ctx, config, swapchain_format)?),
  };

  lesson.rebuild(images, extent)?;
  Ok(lesson)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn names_round_trip() {
    for kind in LessonKind::ALL {
      assert_eq!(kind.name().parse::<LessonKind>(), Ok(kind));
      assert_eq!(kind.to_string(), kind.name());
    }
  }

  #[test]
  fn parse_is_case_insensitive() {
    assert_eq!(" Texture-Array ".parse::<LessonKind>(), Ok(LessonKind::TextureArray));
  }

  #[test]
  fn parse_unknown() {
    assert_eq!("teapot".parse::<LessonKind>(), Err(UnknownLesson("teapot".to_string())));
  }

  #[test]
  fn cycling_wraps() {
    assert_eq!(LessonKind::TexturedQuad.previous(), LessonKind::ObjModel);
    assert_eq!(LessonKind::ObjModel.next(), LessonKind::TexturedQuad);
    assert_eq!(LessonKind::TextureArray.next(), LessonKind::MvpUniform);

    let mut kind = LessonKind::DepthStencil;
    for _ in 0..LessonKind::ALL.len() {
      kind = kind.next();
    }
    assert_eq!(kind, LessonKind::DepthStencil);
  }

  #[test]
  fn serde_uses_kebab_case() {
    #[derive(Deserialize)]
    struct Wrapper {
      lesson: LessonKind,
    }
    let wrapper: Wrapper = toml::from_str(r#"lesson = "mvp-uniform""#).unwrap();
    assert_eq!(wrapper.lesson, LessonKind::MvpUniform);
  }

  #[test]
  fn frame_mvp_follows_extent() {
    let frame = FrameState {
      elapsed: Duration::from_millis(900),
      extent:  [1280, 720],
    };
    assert_eq!(
      frame_mvp(&frame, [0.0, 1.0, 0.0]),
      MvpUniform::spinning(Duration::from_millis(900), 1280.0 / 720.0, [0.0, 1.0, 0.0])
    );

    // A minimized window falls back to a square aspect
    let minimized = FrameState {
      extent: [0, 0],
      ..frame
    };
    assert_eq!(
      frame_mvp(&minimized, [0.0, 1.0, 0.0]),
      MvpUniform::spinning(Duration::from_millis(900), 1.0, [0.0, 1.0, 0.0])
    );
  }

  #[test]
  fn titles_are_distinct() {
    let titles: std::collections::HashSet<_> = LessonKind::ALL.iter().map(|k| k.title()).collect();
    assert_eq!(titles.len(), LessonKind::ALL.len());

    let names: std::collections::HashSet<_> = LessonKind::ALL.iter().map(|k| k.name()).collect();
    assert_eq!(names.len(), LessonKind::ALL.len());
  }
}
