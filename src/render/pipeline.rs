//! Graphics pipeline construction.
//!
//! All lessons share the same fixed-function setup:
//! * Triangle-list input assembly
//! * No culling, counter-clockwise front faces
//! * Blending disabled
//! * Depth testing only when the render pass has a depth attachment
//!
//! The viewport is baked into the pipeline, so the pipeline is rebuilt
//! together with the framebuffers whenever the swapchain is recreated.

use std::sync::Arc;

use anyhow::Context;
use vulkano::{
  buffer::allocator::SubbufferAllocator,
  command_buffer::{AutoCommandBufferBuilder, PrimaryAutoCommandBuffer},
  descriptor_set::{
    DescriptorSet,
    WriteDescriptorSet,
    allocator::StandardDescriptorSetAllocator,
    layout::DescriptorSetLayout,
  },
  device::DeviceOwned,
  image::Image,
  memory::allocator::StandardMemoryAllocator,
  pipeline::{
    GraphicsPipeline,
    Pipeline,
    PipelineLayout,
    PipelineShaderStageCreateInfo,
    graphics::{
      GraphicsPipelineCreateInfo,
      color_blend::{ColorBlendAttachmentState, ColorBlendState},
      depth_stencil::{DepthState, DepthStencilState},
      input_assembly::InputAssemblyState,
      multisample::MultisampleState,
      rasterization::{CullMode, FrontFace, RasterizationState},
      vertex_input::{VertexBufferDescription, VertexDefinition},
      viewport::{Viewport, ViewportState},
    },
    layout::PipelineDescriptorSetLayoutCreateInfo,
  },
  render_pass::{Framebuffer, Subpass},
  shader::{EntryPoint, ShaderModule},
};

use crate::{
  command_buffer_builder_ext::AutoCommandBufferBuilderExt,
  lesson::{FrameState, LessonContext, frame_mvp, write_uniform},
  render::PassLayout,
};

/// Everything needed to (re)create the window-size dependent state of a
/// lesson.
#[derive(Clone)]
pub struct WindowSizeSetupConfig<'a> {
  /// Current swapchain extent
  pub extent:           [u32; 2],
  /// Swapchain images
  pub images:           &'a [Arc<Image>],
  pub pass:             &'a PassLayout,
  pub memory_allocator: &'a Arc<StandardMemoryAllocator>,
  pub vertex_shader:    &'a EntryPoint,
  pub fragment_shader:  &'a EntryPoint,
  /// Vertex buffer layouts, one per bound vertex buffer
  pub vertex_buffers:   &'a [VertexBufferDescription],
}

/// Creates the framebuffers and graphics pipeline for the current swapchain.
///
/// Called once when a lesson is built, then again whenever the window is
/// resized or the swapchain becomes out of date.
pub fn window_size_dependent_setup(
  config: WindowSizeSetupConfig,
) -> anyhow::Result<(Vec<Arc<Framebuffer>>, Arc<GraphicsPipeline>)> {
  let device = config.memory_allocator.device();

  let framebuffers = config.pass.framebuffers(config.memory_allocator, config.images)?;

  let pipeline = {
    // Attribute names must match the vertex shader inputs
    let vertex_input_state = config
      .vertex_buffers
      .definition(config.vertex_shader)
      .context("vertex layout does not match the vertex shader")?;

    let stages = [
      PipelineShaderStageCreateInfo::new(config.vertex_shader.clone()),
      PipelineShaderStageCreateInfo::new(config.fragment_shader.clone()),
    ];

    let layout = PipelineLayout::new(
      device.clone(),
      PipelineDescriptorSetLayoutCreateInfo::from_stages(&stages)
        .into_pipeline_layout_create_info(device.clone())
        .map_err(|e| anyhow::anyhow!("invalid pipeline layout: {e:?}"))?,
    )
    .context("failed to create pipeline layout")?;

    let subpass = Subpass::from(config.pass.render_pass.clone(), 0).context("render pass has no subpass 0")?;

    GraphicsPipeline::new(
      device.clone(),
      None,
      GraphicsPipelineCreateInfo {
        stages: stages.into_iter().collect(),
        vertex_input_state: Some(vertex_input_state),
        input_assembly_state: Some(InputAssemblyState::default()),
        viewport_state: Some(ViewportState {
          viewports: [Viewport {
            offset:      [0.0, 0.0],
            extent:      [config.extent[0] as f32, config.extent[1] as f32],
            depth_range: 0.0..=1.0,
          }]
          .into_iter()
          .collect(),
          ..Default::default()
        }),
        rasterization_state: Some(RasterizationState {
          cull_mode: CullMode::None,
          front_face: FrontFace::CounterClockwise,
          ..Default::default()
        }),
        depth_stencil_state: config.pass.has_depth().then(|| DepthStencilState {
          depth: Some(DepthState::simple()),
          ..Default::default()
        }),
        multisample_state: Some(MultisampleState::default()),
        color_blend_state: Some(ColorBlendState::with_attachment_states(
          subpass.num_color_attachments(),
          ColorBlendAttachmentState::default(),
        )),
        subpass: Some(subpass.into()),
        ..GraphicsPipelineCreateInfo::layout(layout)
      },
    )
    .context("failed to create graphics pipeline")?
  };

  Ok((framebuffers, pipeline))
}

/// Loads the `main` entry point of a compiled shader module.
pub fn entry_point(module: Arc<ShaderModule>) -> anyhow::Result<EntryPoint> {
  module.entry_point("main").context("shader has no `main` entry point")
}

/// Everything a lesson needs to draw besides its own geometry and textures:
/// the render pass, the swapchain-dependent framebuffers and pipeline, and
/// the per-frame descriptor set 0 holding the MVP uniform.
pub struct LessonPipeline {
  pub pass:                 PassLayout,
  vertex_shader:            EntryPoint,
  fragment_shader:          EntryPoint,
  vertex_buffers:           Vec<VertexBufferDescription>,
  memory_allocator:         Arc<StandardMemoryAllocator>,
  descriptor_set_allocator: Arc<StandardDescriptorSetAllocator>,
  uniform_allocator:        SubbufferAllocator,
  /// Axis the MVP model matrix spins around
  spin_axis:                [f32; 3],
  framebuffers:             Vec<Arc<Framebuffer>>,
  pipeline:                 Option<Arc<GraphicsPipeline>>,
  /// Set 0 for the current frame, written by [`LessonPipeline::update`]
  descriptor_set:           Option<Arc<DescriptorSet>>,
}

impl LessonPipeline {
  pub fn new(
    ctx: &LessonContext,
    pass: PassLayout,
    vertex_shader: EntryPoint,
    fragment_shader: EntryPoint,
    vertex_buffers: Vec<VertexBufferDescription>,
    spin_axis: [f32; 3],
  ) -> Self {
    Self {
      pass,
      vertex_shader,
      fragment_shader,
      vertex_buffers,
      memory_allocator: ctx.memory_allocator.clone(),
      descriptor_set_allocator: ctx.descriptor_set_allocator.clone(),
      uniform_allocator: ctx.uniform_allocator(),
      spin_axis,
      framebuffers: Vec::new(),
      pipeline: None,
      descriptor_set: None,
    }
  }

  pub fn rebuild(&mut self, images: &[Arc<Image>], extent: [u32; 2]) -> anyhow::Result<()> {
    let (framebuffers, pipeline) = window_size_dependent_setup(WindowSizeSetupConfig {
      extent,
      images,
      pass: &self.pass,
      memory_allocator: &self.memory_allocator,
      vertex_shader: &self.vertex_shader,
      fragment_shader: &self.fragment_shader,
      vertex_buffers: &self.vertex_buffers,
    })?;

    self.framebuffers = framebuffers;
    self.pipeline = Some(pipeline);
    Ok(())
  }

  pub fn pipeline(&self) -> anyhow::Result<&Arc<GraphicsPipeline>> {
    self.pipeline.as_ref().context("pipeline used before rebuild")
  }

  /// Layout of descriptor set 0, where every lesson keeps its uniforms.
  pub fn set_layout(&self) -> anyhow::Result<Arc<DescriptorSetLayout>> {
    self
      .pipeline()?
      .layout()
      .set_layouts()
      .first()
      .cloned()
      .context("pipeline has no descriptor set 0")
  }

  pub fn framebuffer(&self, image_index: u32) -> anyhow::Result<Arc<Framebuffer>> {
    self
      .framebuffers
      .get(image_index as usize)
      .cloned()
      .with_context(|| format!("no framebuffer for swapchain image {image_index}"))
  }

  /// Writes this frame's MVP uniform to binding 0 and builds descriptor set 0
  /// from it plus `extra_writes`.
  pub fn update(
    &mut self,
    frame: &FrameState,
    extra_writes: impl IntoIterator<Item = WriteDescriptorSet>,
  ) -> anyhow::Result<()> {
    let uniform_buffer = write_uniform(&self.uniform_allocator, frame_mvp(frame, self.spin_axis))?;
    let writes = std::iter::once(WriteDescriptorSet::buffer(0, uniform_buffer)).chain(extra_writes);

    self.descriptor_set = Some(DescriptorSet::new(
      self.descriptor_set_allocator.clone(),
      self.set_layout()?,
      writes,
      [],
    )?);
    Ok(())
  }

  /// Records the render pass for `image_index` with the pipeline and set 0
  /// bound. `draw` binds the lesson's buffers and issues its draws.
  pub fn record(
    &self,
    builder: &mut AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>,
    image_index: u32,
    draw: impl FnOnce(&mut AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>, &Arc<GraphicsPipeline>) -> anyhow::Result<()>,
  ) -> anyhow::Result<()> {
    let descriptor_set = self.descriptor_set.as_ref().context("record called before update")?;
    let pipeline = self.pipeline()?;

    builder.build_lesson_render_pass(
      self.framebuffer(image_index)?,
      self.pass.clear_values(),
      pipeline,
      descriptor_set,
      |builder| draw(builder, pipeline),
    )
  }
}
