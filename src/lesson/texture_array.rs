//! Several images stored as the layers of one 2D array texture.
//!
//! The quad is drawn once per layer with instancing. The vertex shader places
//! each instance in its own slot of a horizontal row and forwards the instance
//! index to the fragment shader, which uses it as the array layer to sample.

use std::sync::Arc;

use vulkano::{
  buffer::{BufferUsage, Subbuffer},
  command_buffer::{AutoCommandBufferBuilder, PrimaryAutoCommandBuffer},
  format::Format,
  image::Image,
  pipeline::{Pipeline, graphics::vertex_input::Vertex},
};

use crate::{
  base::upload::device_local_buffer,
  config::LessonsConfig,
  lesson::{FrameState, Lesson, LessonContext, LessonKind},
  render::{LessonPipeline, PassLayout, entry_point},
  shaders::array,
  texture::{CHECKER_PALETTE, GpuTexture, TextureSource, load_layers, upload_texture_array},
  vertex::{QUAD_INDICES, QuadVertex, quad},
};

/// Layers generated when no layer files are configured.
pub const GENERATED_LAYERS: usize = 4;

/// Texture sources for the array, one per layer.
pub fn layer_sources(config: &LessonsConfig) -> Vec<TextureSource> {
  if config.textures.layers.is_empty() {
    (0..GENERATED_LAYERS)
      .map(|i| TextureSource::Checkerboard {
        size:   256,
        // Vary the cell count too so layers differ even in grayscale
        cells:  4 * (i as u32 + 1),
        colors: CHECKER_PALETTE[i % CHECKER_PALETTE.len()],
      })
      .collect()
  } else {
    config.textures.layers.iter().cloned().map(TextureSource::File).collect()
  }
}

pub struct TextureArray {
  pipeline:      LessonPipeline,
  vertex_buffer: Subbuffer<[QuadVertex]>,
  index_buffer:  Subbuffer<[u16]>,
  texture:       GpuTexture,
}

impl TextureArray {
  pub fn new(ctx: &LessonContext, config: &LessonsConfig, swapchain_format: Format) -> anyhow::Result<Self> {
    let pipeline = LessonPipeline::new(
      ctx,
      PassLayout::color_only(ctx.device.clone(), swapchain_format)?,
      entry_point(array::vs::load(ctx.device.clone())?)?,
      entry_point(array::fs::load(ctx.device.clone())?)?,
      vec![QuadVertex::per_vertex()],
      config.spin_axis,
    );

    let vertex_buffer = device_local_buffer(
      ctx,
      BufferUsage::VERTEX_BUFFER,
      quad([0.0, 0.0, 0.0], 1.0, [1.0, 1.0, 1.0]).to_vec(),
    )?;
    let index_buffer = device_local_buffer(ctx, BufferUsage::INDEX_BUFFER, QUAD_INDICES.to_vec())?;

    let layers = load_layers(&layer_sources(config))?;
    let texture = upload_texture_array(ctx, &layers)?;
    log::info!("Texture array has {} layers", texture.layers);

    Ok(Self {
      pipeline,
      vertex_buffer,
      index_buffer,
      texture,
    })
  }
}

impl Lesson for TextureArray {
  fn kind(&self) -> LessonKind {
    LessonKind::TextureArray
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
    let layer_count = self.texture.layers;

    self.pipeline.record(builder, image_index, |builder, pipeline| {
      builder
        .push_constants(pipeline.layout().clone(), 0, array::vs::LayerParams { layer_count })?
        .bind_vertex_buffers(0, self.vertex_buffer.clone())?
        .bind_index_buffer(self.index_buffer.clone())?;
      unsafe { builder.draw_indexed(self.index_buffer.len() as u32, layer_count, 0, 0, 0) }?;
      Ok(())
    })
  }
}

#[cfg(test)]
mod tests {
  use std::path::PathBuf;

  use super::*;

  #[test]
  fn generated_layers_without_files() {
    let sources = layer_sources(&LessonsConfig::default());
    assert_eq!(sources.len(), GENERATED_LAYERS);
    assert!(sources.iter().all(|s| matches!(s, TextureSource::Checkerboard { size: 256, .. })));
    assert_ne!(sources[0], sources[1]);
  }

  #[test]
  fn configured_files_become_layers() {
    let mut config = LessonsConfig::default();
    config.textures.layers = vec![PathBuf::from("a.png"), PathBuf::from("b.png")];

    assert_eq!(
      layer_sources(&config),
      vec![
        TextureSource::File(PathBuf::from("a.png")),
        TextureSource::File(PathBuf::from("b.png")),
      ]
    );
  }

  #[test]
  fn generated_layers_share_a_size() {
    let layers = load_layers(&layer_sources(&LessonsConfig::default())).unwrap();
    assert_eq!(layers.len(), GENERATED_LAYERS);
    assert!(layers.iter().all(|l| l.dimensions() == (256, 256)));
  }
}
