//! Render passes, framebuffers and pipelines shared by the lessons.
//!
//! Lessons come in two flavours:
//! * color-only: a single swapchain color attachment
//! * color + depth: the swapchain color attachment plus one depth/stencil
//!   image shared by every framebuffer
//!
//! [`PassLayout`] captures which flavour a lesson uses and knows how to build
//! matching framebuffers and clear values. The graphics pipeline itself is
//! built by [`pipeline::window_size_dependent_setup`].

use std::sync::Arc;

use anyhow::Context;
use vulkano::{
  device::Device,
  format::{ClearValue, Format},
  image::{
    Image,
    ImageCreateInfo,
    ImageSubresourceRange,
    ImageType,
    ImageUsage,
    view::{ImageView, ImageViewCreateInfo},
  },
  memory::allocator::{AllocationCreateInfo, StandardMemoryAllocator},
  render_pass::{Framebuffer, FramebufferCreateInfo, RenderPass},
};

use crate::lesson::CLEAR_COLOR;

pub mod depth;
pub mod pipeline;

pub use pipeline::{LessonPipeline, WindowSizeSetupConfig, entry_point, window_size_dependent_setup};

/// A lesson's render pass together with its optional depth format.
pub struct PassLayout {
  /// Single-subpass pass clearing and storing the swapchain color attachment
  pub render_pass:  Arc<RenderPass>,
  /// Format of the transient depth attachment, `None` for color-only passes
  pub depth_format: Option<Format>,
}

impl PassLayout {
  pub fn color_only(device: Arc<Device>, color_format: Format) -> anyhow::Result<Self> {
    let render_pass = vulkano::single_pass_renderpass!(
      device,
      attachments: {
        color: {
          format: color_format,
          samples: 1,
          load_op: Clear,
          store_op: Store,
        },
      },
      pass: {
        color: [color],
        depth_stencil: {},
      },
    )
    .context("failed to create color render pass")?;

    Ok(Self {
      render_pass,
      depth_format: None,
    })
  }

  pub fn with_depth(
    device: Arc<Device>,
    color_format: Format,
    depth_format: Format,
  ) -> anyhow::Result<Self> {
    let render_pass = vulkano::single_pass_renderpass!(
      device,
      attachments: {
        color: {
          format: color_format,
          samples: 1,
          load_op: Clear,
          store_op: Store,
        },
        depth_stencil: {
          format: depth_format,
          samples: 1,
          load_op: Clear,
          store_op: DontCare,
        },
      },
      pass: {
        color: [color],
        depth_stencil: {depth_stencil},
      },
    )
    .context("failed to create depth render pass")?;

    Ok(Self {
      render_pass,
      depth_format: Some(depth_format),
    })
  }

  pub fn has_depth(&self) -> bool {
    self.depth_format.is_some()
  }

  /// Clear values in attachment order.
  pub fn clear_values(&self) -> Vec<Option<ClearValue>> {
    let mut values = vec![Some(CLEAR_COLOR.into())];
    if let Some(format) = self.depth_format {
      values.push(Some(depth::depth_clear_value(format)));
    }
    values
  }

  /// One framebuffer per swapchain image.
  pub fn framebuffers(
    &self,
    memory_allocator: &Arc<StandardMemoryAllocator>,
    images: &[Arc<Image>],
  ) -> anyhow::Result<Vec<Arc<Framebuffer>>> {
    let first = images.first().context("swapchain has no images")?;

    let depth_view = match self.depth_format {
      Some(format) => {
        let image = Image::new(
          memory_allocator.clone(),
          ImageCreateInfo {
            image_type: ImageType::Dim2d,
            format,
            extent: first.extent(),
            usage: ImageUsage::DEPTH_STENCIL_ATTACHMENT | ImageUsage::TRANSIENT_ATTACHMENT,
            ..Default::default()
          },
          AllocationCreateInfo::default(),
        )
        .context("failed to allocate depth image")?;

        let view = ImageView::new(
          image.clone(),
          ImageViewCreateInfo {
            subresource_range: ImageSubresourceRange {
              aspects:      depth::depth_aspects(format),
              mip_levels:   0..1,
              array_layers: 0..1,
            },
            ..ImageViewCreateInfo::from_image(&image)
          },
        )
        .context("failed to create depth image view")?;

        Some(view)
      }
      None => None,
    };

    images
      .iter()
      .map(|image| {
        let view = ImageView::new_default(image.clone())?;
        let mut attachments = vec![view];
        attachments.extend(depth_view.clone());

        let framebuffer = Framebuffer::new(
          self.render_pass.clone(),
          FramebufferCreateInfo {
            attachments,
            ..Default::default()
          },
        )?;
        Ok(framebuffer)
      })
      .collect::<anyhow::Result<Vec<_>>>()
      .context("failed to create framebuffers")
  }
}
