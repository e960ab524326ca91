use std::sync::Arc;

use vulkano::{
  command_buffer::{AutoCommandBufferBuilder, RenderPassBeginInfo, SubpassBeginInfo, SubpassContents, SubpassEndInfo},
  descriptor_set::DescriptorSet,
  format::ClearValue,
  pipeline::{GraphicsPipeline, Pipeline, PipelineBindPoint},
  render_pass::Framebuffer,
};

pub(crate) trait AutoCommandBufferBuilderExt {
  /// Begins a render pass on `framebuffer`, binds `pipeline` with
  /// `descriptor_set` at set 0, runs `draw`, and ends the pass.
  fn build_lesson_render_pass(
    &mut self,
    framebuffer: Arc<Framebuffer>,
    clear_values: Vec<Option<ClearValue>>,
    pipeline: &Arc<GraphicsPipeline>,
    descriptor_set: &Arc<DescriptorSet>,
    draw: impl FnOnce(&mut Self) -> anyhow::Result<()>,
  ) -> anyhow::Result<()>;
}

impl<L> AutoCommandBufferBuilderExt for AutoCommandBufferBuilder<L> {
  fn build_lesson_render_pass(
    &mut self,
    framebuffer: Arc<Framebuffer>,
    clear_values: Vec<Option<ClearValue>>,
    pipeline: &Arc<GraphicsPipeline>,
    descriptor_set: &Arc<DescriptorSet>,
    draw: impl FnOnce(&mut Self) -> anyhow::Result<()>,
  ) -> anyhow::Result<()> {
    self.begin_render_pass(
      RenderPassBeginInfo {
        clear_values,
        ..RenderPassBeginInfo::framebuffer(framebuffer)
      },
      SubpassBeginInfo {
        contents: SubpassContents::Inline,
        ..Default::default()
      },
    )?;

    self
      .bind_pipeline_graphics(pipeline.clone())?
      .bind_descriptor_sets(
        PipelineBindPoint::Graphics,
        pipeline.layout().clone(),
        0,
        descriptor_set.clone(),
      )?;

    draw(self)?;

    self.end_render_pass(SubpassEndInfo::default())?;
    Ok(())
  }
}
