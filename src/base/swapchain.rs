//! Window surface, swapchain and frame presentation.

use std::sync::Arc;

use anyhow::Context;
use vulkano::{
  Validated,
  VulkanError,
  command_buffer::PrimaryAutoCommandBuffer,
  format::Format,
  image::{Image, ImageUsage},
  swapchain::{
    ColorSpace,
    Surface,
    Swapchain,
    SwapchainAcquireFuture,
    SwapchainCreateInfo,
    SwapchainPresentInfo,
    acquire_next_image,
  },
  sync::{self, GpuFuture},
};
use winit::window::Window;

use crate::{base::VulkanBase, config::LessonsConfig};

/// Formats the lessons are written for, in no particular order. Anything
/// else is only used when the surface offers none of these.
const PREFERRED_FORMATS: [Format; 3] = [
  Format::B8G8R8A8_UNORM,
  Format::R8G8B8A8_UNORM,
  Format::A8B8G8R8_UNORM_PACK32,
];

pub fn choose_surface_format(formats: &[(Format, ColorSpace)]) -> Option<(Format, ColorSpace)> {
  formats
    .iter()
    .copied()
    .find(|(format, _)| PREFERRED_FORMATS.contains(format))
    .or_else(|| formats.first().copied())
}

/// Clamps the desired swapchain image count to `[min + 1, max]`. A `max` of
/// `None` means the surface sets no upper limit.
pub fn clamp_image_count(desired: u32, min: u32, max: Option<u32>) -> u32 {
  let count = desired.max(min + 1);
  match max {
    Some(max) if max > 0 => count.min(max),
    _ => count,
  }
}

pub struct SurfaceTarget {
  pub window:             Arc<Window>,
  pub swapchain:          Arc<Swapchain>,
  pub images:             Vec<Arc<Image>>,
  /// Set when the window is resized or presentation reports the swapchain as
  /// out of date
  pub recreate_swapchain: bool,
  pub previous_frame_end: Option<Box<dyn GpuFuture>>,
}

impl SurfaceTarget {
  pub fn new(base: &VulkanBase, window: Arc<Window>, config: &LessonsConfig) -> anyhow::Result<Self> {
    let surface =
      Surface::from_window(base.instance.clone(), window.clone()).context("failed to create surface")?;
    let physical_device = base.device.physical_device();

    let surface_capabilities = physical_device
      .surface_capabilities(&surface, Default::default())
      .context("failed to query surface capabilities")?;

    let present_modes: Vec<_> = physical_device
      .surface_present_modes(&surface, Default::default())
      .context("failed to query present modes")?
      .into_iter()
      .collect();
    let present_mode = config.present_mode.choose(&present_modes);
    log::info!("Using {present_mode:?} present mode");

    let formats = physical_device
      .surface_formats(&surface, Default::default())
      .context("failed to query surface formats")?;
    let (image_format, image_color_space) =
      choose_surface_format(&formats).context("surface reports no formats")?;
    log::info!("Selected format: {image_format:?} ({image_color_space:?})");

    let min_image_count = clamp_image_count(
      config.swapchain_images,
      surface_capabilities.min_image_count,
      surface_capabilities.max_image_count,
    );

    let composite_alpha = surface_capabilities
      .supported_composite_alpha
      .into_iter()
      .next()
      .context("surface supports no composite alpha mode")?;

    let (swapchain, images) = Swapchain::new(
      base.device.clone(),
      surface,
      SwapchainCreateInfo {
        min_image_count,
        image_format,
        image_color_space,
        image_extent: window.inner_size().into(),
        image_usage: ImageUsage::COLOR_ATTACHMENT,
        composite_alpha,
        pre_transform: surface_capabilities.current_transform,
        clipped: true,
        present_mode,
        ..Default::default()
      },
    )
    .context("failed to create swapchain")?;

    log::debug!("Swapchain created with {} images", images.len());

    Ok(Self {
      window,
      swapchain,
      images,
      recreate_swapchain: false,
      previous_frame_end: Some(sync::now(base.device.clone()).boxed()),
    })
  }

  pub fn image_format(&self) -> Format {
    self.swapchain.image_format()
  }

  pub fn extent(&self) -> [u32; 2] {
    self.swapchain.image_extent()
  }

  /// Recreates the swapchain at `extent`, returning the new images.
  pub fn recreate(&mut self, extent: [u32; 2]) -> anyhow::Result<&[Arc<Image>]> {
    let (swapchain, images) = self
      .swapchain
      .recreate(SwapchainCreateInfo {
        image_extent: extent,
        ..self.swapchain.create_info()
      })
      .context("failed to recreate swapchain")?;

    log::debug!("Swapchain recreated at {}x{}", extent[0], extent[1]);

    self.swapchain = swapchain;
    self.images = images;
    self.recreate_swapchain = false;
    Ok(&self.images)
  }

  pub fn cleanup_finished(&mut self) {
    if let Some(previous_frame_end) = self.previous_frame_end.as_mut() {
      previous_frame_end.cleanup_finished();
    }
  }

  /// Acquires the next swapchain image. Returns `None` when the swapchain is
  /// out of date and the frame should be skipped.
  pub fn acquire(&mut self) -> anyhow::Result<Option<(u32, SwapchainAcquireFuture)>> {
    match acquire_next_image(self.swapchain.clone(), None).map_err(Validated::unwrap) {
      Ok((image_index, suboptimal, future)) => {
        if suboptimal {
          self.recreate_swapchain = true;
        }
        Ok(Some((image_index, future)))
      }
      Err(VulkanError::OutOfDate) => {
        self.recreate_swapchain = true;
        Ok(None)
      }
      Err(e) => Err(anyhow::Error::new(e).context("failed to acquire next image")),
    }
  }

  /// Executes `command_buffer` after the image is acquired, then presents it.
  pub fn submit_and_present(
    &mut self,
    base: &VulkanBase,
    command_buffer: Arc<PrimaryAutoCommandBuffer>,
    acquire_future: SwapchainAcquireFuture,
    image_index: u32,
  ) -> anyhow::Result<()> {
    let previous = self
      .previous_frame_end
      .take()
      .unwrap_or_else(|| sync::now(base.device.clone()).boxed());

    let future = previous
      .join(acquire_future)
      .then_execute(base.queue.clone(), command_buffer)
      .context("failed to execute frame")?
      .then_swapchain_present(
        base.queue.clone(),
        SwapchainPresentInfo::swapchain_image_index(self.swapchain.clone(), image_index),
      )
      .then_signal_fence_and_flush();

    match future.map_err(Validated::unwrap) {
      Ok(future) => {
        self.previous_frame_end = Some(future.boxed());
      }
      Err(VulkanError::OutOfDate) => {
        self.recreate_swapchain = true;
        self.previous_frame_end = Some(sync::now(base.device.clone()).boxed());
      }
      Err(e) => {
        log::error!("Failed to flush future: {e}");
        self.previous_frame_end = Some(sync::now(base.device.clone()).boxed());
      }
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn image_count_respects_minimum() {
    assert_eq!(clamp_image_count(2, 2, Some(8)), 3);
    assert_eq!(clamp_image_count(1, 1, None), 2);
  }

  #[test]
  fn image_count_respects_maximum() {
    assert_eq!(clamp_image_count(6, 2, Some(4)), 4);
  }

  #[test]
  fn unbounded_maximum() {
    assert_eq!(clamp_image_count(16, 2, None), 16);
    assert_eq!(clamp_image_count(16, 2, Some(0)), 16);
  }

  #[test]
  fn locked_image_count() {
    assert_eq!(clamp_image_count(2, 3, Some(3)), 3);
  }

  #[test]
  fn prefers_unorm_formats() {
    let formats = [
      (Format::R16G16B16A16_SFLOAT, ColorSpace::ExtendedSrgbLinear),
      (Format::B8G8R8A8_SRGB, ColorSpace::SrgbNonLinear),
      (Format::B8G8R8A8_UNORM, ColorSpace::SrgbNonLinear),
    ];
    assert_eq!(
      choose_surface_format(&formats),
      Some((Format::B8G8R8A8_UNORM, ColorSpace::SrgbNonLinear))
    );
  }

  #[test]
  fn falls_back_to_first_format() {
    let formats = [
      (Format::B8G8R8A8_SRGB, ColorSpace::SrgbNonLinear),
      (Format::R16G16B16A16_SFLOAT, ColorSpace::ExtendedSrgbLinear),
    ];
    assert_eq!(
      choose_surface_format(&formats),
      Some((Format::B8G8R8A8_SRGB, ColorSpace::SrgbNonLinear))
    );
    assert_eq!(choose_surface_format(&[]), None);
  }
}
