//! A vertex-colored quad whose only input besides geometry is the MVP
//! uniform buffer.

use std::sync::Arc;

use vulkano::{
  buffer::{BufferUsage, Subbuffer},
  command_buffer::{AutoCommandBufferBuilder, PrimaryAutoCommandBuffer},
  format::Format,
  image::Image,
  pipeline::graphics::vertex_input::Vertex,
};

use crate::{
  base::upload::device_local_buffer,
  config::LessonsConfig,
  lesson::{FrameState, Lesson, LessonContext, LessonKind},
  render::{LessonPipeline, PassLayout, entry_point},
  shaders::color,
  vertex::{QUAD_INDICES, QUAD_VERTICES, QuadVertex},
};

pub struct MvpUniformLesson {
  pipeline:      LessonPipeline,
  vertex_buffer: Subbuffer<[QuadVertex]>,
  index_buffer:  Subbuffer<[u16]>,
}

impl MvpUniformLesson {
  pub fn new(ctx: &LessonContext, config: &LessonsConfig, swapchain_format: Format) -> anyhow::Result<Self> {
    let pipeline = LessonPipeline::new(
      ctx,
      PassLayout::color_only(ctx.device.clone(), swapchain_format)?,
      entry_point(color::vs::load(ctx.device.clone())?)?,
      entry_point(color::fs::load(ctx.device.clone())?)?,
      vec![QuadVertex::per_vertex()],
      config.spin_axis,
    );

    let vertex_buffer = device_local_buffer(ctx, BufferUsage::VERTEX_BUFFER, QUAD_VERTICES.to_vec())?;
    let index_buffer = device_local_buffer(ctx, BufferUsage::INDEX_BUFFER, QUAD_INDICES.to_vec())?;

    Ok(Self {
      pipeline,
      vertex_buffer,
      index_buffer,
    })
  }
}

impl Lesson for MvpUniformLesson {
  fn kind(&self) -> LessonKind {
    LessonKind::MvpUniform
  }

  fn rebuild(&mut self, images: &[Arc<Image>], extent: [u32; 2]) -> anyhow::Result<()> {
    self.pipeline.rebuild(images, extent)
  }

  fn update(&mut self, frame: &FrameState) -> anyhow::Result<()> {
    self.pipeline.update(frame, [])
  }

  fn record(
    &mut self,
    builder: &mut AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>,
    image_index: u32,
  ) -> anyhow::Result<()> {
    self.pipeline.record(builder, image_index, |builder, _| {
      builder
        .bind_vertex_buffers(0, self.vertex_buffer.clone())?
        .bind_index_buffer(self.index_buffer.clone())?;
      unsafe { builder.draw_indexed(self.index_buffer.len() as u32, 1, 0, 0, 0) }?;
      Ok(())
    })
  }
}
