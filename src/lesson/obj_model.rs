//! A textured, lit OBJ mesh rendered with depth testing.
//!
//! Positions, normals and texture coordinates live in separate vertex
//! buffers, bound together at bindings 0 to 2. Without a configured
//! `model_path` the lesson draws the cube bundled into the binary.

use std::sync::Arc;

use anyhow::Context;
use vulkano::{
  command_buffer::{AutoCommandBufferBuilder, PrimaryAutoCommandBuffer},
  format::Format,
  image::Image,
  pipeline::graphics::vertex_input::Vertex,
};

use crate::{
  config::LessonsConfig,
  lesson::{FrameState, Lesson, LessonContext, LessonKind},
  model::{MeshData, ModelBuffers},
  render::{LessonPipeline, PassLayout, entry_point},
  shaders::model,
  texture::{CHECKER_PALETTE, GpuTexture, TextureSource, load_rgba, upload_texture_2d},
  vertex::{Normal, Position, TexCoord},
};

pub struct ObjModel {
  pipeline: LessonPipeline,
  buffers:  ModelBuffers,
  texture:  GpuTexture,
}

impl ObjModel {
  pub fn new(ctx: &LessonContext, config: &LessonsConfig, swapchain_format: Format) -> anyhow::Result<Self> {
    let model_path = config.model_path.as_deref();
    let mesh = MeshData::load_or_bundled(model_path).with_context(|| match model_path {
      Some(path) => format!("failed to load model {}", path.display()),
      None => "failed to parse the bundled cube".to_string(),
    })?;
    let buffers = ModelBuffers::upload(ctx, mesh)?;

    let pipeline = LessonPipeline::new(
      ctx,
      PassLayout::with_depth(ctx.device.clone(), swapchain_format, ctx.depth_format()?)?,
      entry_point(model::vs::load(ctx.device.clone())?)?,
      entry_point(model::fs::load(ctx.device.clone())?)?,
      vec![Position::per_vertex(), Normal::per_vertex(), TexCoord::per_vertex()],
      config.spin_axis,
    );

    let source = TextureSource::file_or_checkerboard(config.textures.model.as_deref(), CHECKER_PALETTE[1]);
    let texture = upload_texture_2d(ctx, &load_rgba(&source)?)?;

    Ok(Self {
      pipeline,
      buffers,
      texture,
    })
  }
}

impl Lesson for ObjModel {
  fn kind(&self) -> LessonKind {
    LessonKind::ObjModel
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
    let buffers = &self.buffers;

    self.pipeline.record(builder, image_index, |builder, _| {
      builder
        .bind_vertex_buffers(
          0,
          (
            buffers.positions.clone(),
            buffers.normals.clone(),
            buffers.tex_coords.clone(),
          ),
        )?
        .bind_index_buffer(buffers.indices.clone())?;
      unsafe { builder.draw_indexed(buffers.indices.len() as u32, 1, 0, 0, 0) }?;
      Ok(())
    })
  }
}
