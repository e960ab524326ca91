//! One texture mapped onto a spinning quad.
//!
//! The quad is four vertices and six `u16` indices. The fragment shader reads
//! the texture through a combined image sampler at binding 1, next to the MVP
//! uniform at binding 0.

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
  shaders::textured,
  texture::{CHECKER_PALETTE, GpuTexture, TextureSource, load_rgba, upload_texture_2d},
  vertex::{QUAD_INDICES, QuadVertex, quad},
};

pub struct TexturedQuad {
  pipeline:      LessonPipeline,
  vertex_buffer: Subbuffer<[QuadVertex]>,
  index_buffer:  Subbuffer<[u16]>,
  texture:       GpuTexture,
}

impl TexturedQuad {
  pub fn new(ctx: &LessonContext, config: &LessonsConfig, swapchain_format: Format) -> anyhow::Result<Self> {
    let pipeline = LessonPipeline::new(
      ctx,
      PassLayout::color_only(ctx.device.clone(), swapchain_format)?,
      entry_point(textured::vs::load(ctx.device.clone())?)?,
      entry_point(textured::fs::load(ctx.device.clone())?)?,
      vec![QuadVertex::per_vertex()],
      config.spin_axis,
    );

    let vertex_buffer = device_local_buffer(
      ctx,
      BufferUsage::VERTEX_BUFFER,
      quad([0.0, 0.0, 0.0], 1.0, [1.0, 1.0, 1.0]).to_vec(),
    )?;
    let index_buffer = device_local_buffer(ctx, BufferUsage::INDEX_BUFFER, QUAD_INDICES.to_vec())?;

    let source = TextureSource::file_or_checkerboard(config.textures.quad.as_deref(), CHECKER_PALETTE[0]);
    let texture = upload_texture_2d(ctx, &load_rgba(&source)?)?;

    Ok(Self {
      pipeline,
      vertex_buffer,
      index_buffer,
      texture,
    })
  }
}

impl Lesson for TexturedQuad {
  fn kind(&self) -> LessonKind {
    LessonKind::TexturedQuad
  }

  fn rebuild(&mut self, images: &[Arc<Image>], extent: [u32; 2]) -> anyhow::Result<()> {
    self.pipeline.rebuild(images, extent)
  }

  fn update(&mut self, frame: &FrameState) -> anyhow::Result<()> {
    self.pipeline.update(frame, [self.texture.descriptor_write(1)])
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
