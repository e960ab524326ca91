//! Two overlapping textured quads that only look right with depth testing.
//!
//! The quad nearer the camera is drawn first. Without a depth buffer the far
//! quad would then be painted over it.

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
  render::{LessonPipeline, PassLayout, depth::has_stencil, entry_point},
  shaders::textured,
  texture::{CHECKER_PALETTE, GpuTexture, TextureSource, load_rgba, upload_texture_2d},
  vertex::{QuadVertex, quad, quad_indices},
};

const NEAR_TINT: [f32; 3] = [1.0, 0.6, 0.6];
const FAR_TINT: [f32; 3] = [0.6, 0.6, 1.0];

/// Vertices of both quads, nearest first.
pub fn overlapping_quads() -> Vec<QuadVertex> {
  let near = quad([0.25, 0.25, 0.5], 0.75, NEAR_TINT);
  let far = quad([-0.25, -0.25, -0.5], 0.75, FAR_TINT);
  near.into_iter().chain(far).collect()
}

pub struct DepthStencil {
  pipeline:      LessonPipeline,
  vertex_buffer: Subbuffer<[QuadVertex]>,
  index_buffer:  Subbuffer<[u16]>,
  texture:       GpuTexture,
}

impl DepthStencil {
  pub fn new(ctx: &LessonContext, config: &LessonsConfig, swapchain_format: Format) -> anyhow::Result<Self> {
    let depth_format = ctx.depth_format()?;
    if !has_stencil(depth_format) {
      log::warn!("{depth_format:?} has no stencil aspect, only depth will be used");
    }

    let pipeline = LessonPipeline::new(
      ctx,
      PassLayout::with_depth(ctx.device.clone(), swapchain_format, depth_format)?,
      entry_point(textured::vs::load(ctx.device.clone())?)?,
      entry_point(textured::fs::load(ctx.device.clone())?)?,
      vec![QuadVertex::per_vertex()],
      config.spin_axis,
    );

    let vertex_buffer = device_local_buffer(ctx, BufferUsage::VERTEX_BUFFER, overlapping_quads())?;
    let index_buffer = device_local_buffer(ctx, BufferUsage::INDEX_BUFFER, quad_indices(2))?;

    let source = TextureSource::file_or_checkerboard(config.textures.depth.as_deref(), CHECKER_PALETTE[0]);
    let texture = upload_texture_2d(ctx, &load_rgba(&source)?)?;

    Ok(Self {
      pipeline,
      vertex_buffer,
      index_buffer,
      texture,
    })
  }
}

impl Lesson for DepthStencil {
  fn kind(&self) -> LessonKind {
    LessonKind::DepthStencil
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

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn near_quad_comes_first() {
    let vertices = overlapping_quads();
    assert_eq!(vertices.len(), 8);

    // Camera looks down -Z from +Z, so larger z is nearer
    let near_z = vertices[0].position[2];
    let far_z = vertices[4].position[2];
    assert!(near_z > far_z);
    assert!(vertices[..4].iter().all(|v| v.position[2] == near_z));
  }

  #[test]
  fn quads_overlap_in_xy() {
    let vertices = overlapping_quads();
    let (near, far) = vertices.split_at(4);
    let min = |q: &[QuadVertex], axis: usize| q.iter().map(|v| v.position[axis]).fold(f32::MAX, f32::min);
    let max = |q: &[QuadVertex], axis: usize| q.iter().map(|v| v.position[axis]).fold(f32::MIN, f32::max);

    for axis in 0..2 {
      assert!(min(near, axis) < max(far, axis));
      assert!(min(far, axis) < max(near, axis));
    }
  }

  #[test]
  fn indices_cover_both_quads() {
    let indices = quad_indices(2);
    assert_eq!(indices.iter().max(), Some(&7));
  }
}
