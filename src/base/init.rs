use std::sync::Arc;

use anyhow::Context;
use vulkano::{
  VulkanLibrary,
  command_buffer::allocator::StandardCommandBufferAllocator,
  descriptor_set::allocator::StandardDescriptorSetAllocator,
  device::{
    Device,
    DeviceCreateInfo,
    DeviceExtensions,
    Queue,
    QueueCreateInfo,
    QueueFlags,
    physical::PhysicalDeviceType,
  },
  instance::{Instance, InstanceCreateFlags, InstanceCreateInfo},
  memory::allocator::StandardMemoryAllocator,
  swapchain::Surface,
};
use winit::event_loop::EventLoop;

use crate::lesson::LessonContext;

pub const VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";

/// Instance, device and allocators shared by every lesson and window.
///
/// Graphics and presentation share one [`Queue`]. Only queue families that
/// support both are considered, so a device whose graphics families cannot
/// present to the window is skipped. Separate present queue families are not
/// supported.
pub struct VulkanBase {
  pub instance:                 Arc<Instance>,
  pub device:                   Arc<Device>,
  pub queue:                    Arc<Queue>,
  pub memory_allocator:         Arc<StandardMemoryAllocator>,
  pub descriptor_set_allocator: Arc<StandardDescriptorSetAllocator>,
  pub command_buffer_allocator: Arc<StandardCommandBufferAllocator>,
}

/// Whether a queue family can serve as the single graphics and present queue.
pub fn serves_graphics_and_present(flags: QueueFlags, presents: bool) -> bool {
  flags.intersects(QueueFlags::GRAPHICS) && presents
}

/// Lower is better. Discrete GPUs first, CPU implementations last.
pub fn device_type_rank(device_type: PhysicalDeviceType) -> u32 {
  match device_type {
    PhysicalDeviceType::DiscreteGpu => 0,
    PhysicalDeviceType::IntegratedGpu => 1,
    PhysicalDeviceType::VirtualGpu => 2,
    PhysicalDeviceType::Cpu => 3,
    PhysicalDeviceType::Other => 4,
    _ => 5,
  }
}

impl VulkanBase {
  pub fn new(event_loop: &EventLoop<()>, debug_layers: bool) -> anyhow::Result<Self> {
    let library = VulkanLibrary::new().context("failed to load the Vulkan library")?;
    let required_extensions =
      Surface::required_extensions(event_loop).context("failed to query surface extensions")?;

    let enabled_layers = if debug_layers {
      let available = library
        .layer_properties()
        .context("failed to enumerate instance layers")?
        .any(|layer| layer.name() == VALIDATION_LAYER);

      if available {
        log::info!("Enabling {VALIDATION_LAYER}");
        vec![VALIDATION_LAYER.to_string()]
      } else {
        log::warn!("{VALIDATION_LAYER} requested but not installed");
        Vec::new()
      }
    } else {
      Vec::new()
    };

    let instance = Instance::new(
      library,
      InstanceCreateInfo {
        flags: InstanceCreateFlags::ENUMERATE_PORTABILITY,
        enabled_extensions: required_extensions,
        enabled_layers,
        ..Default::default()
      },
    )
    .context("failed to create Vulkan instance")?;

    let device_extensions = DeviceExtensions {
      khr_swapchain: true,
      ..DeviceExtensions::empty()
    };

    let (physical_device, queue_family_index) = instance
      .enumerate_physical_devices()
      .context("failed to enumerate physical devices")?
      .filter(|p| p.supported_extensions().contains(&device_extensions))
      .filter_map(|p| {
        p.queue_family_properties()
          .iter()
          .enumerate()
          .position(|(i, q)| {
            serves_graphics_and_present(q.queue_flags, p.presentation_support(i as u32, event_loop).unwrap_or(false))
          })
          .map(|i| (p, i as u32))
      })
      .min_by_key(|(p, _)| device_type_rank(p.properties().device_type))
      .context("no Vulkan device with graphics and presentation support")?;

    log::info!(
      "Using device: {} (type: {:?})",
      physical_device.properties().device_name,
      physical_device.properties().device_type,
    );

    let (device, mut queues) = Device::new(
      physical_device,
      DeviceCreateInfo {
        enabled_extensions: device_extensions,
        queue_create_infos: vec![QueueCreateInfo {
          queue_family_index,
          ..Default::default()
        }],
        ..Default::default()
      },
    )
    .context("failed to create logical device")?;

    let queue = queues.next().context("device returned no queues")?;

    let memory_allocator = Arc::new(StandardMemoryAllocator::new_default(device.clone()));
    let descriptor_set_allocator = Arc::new(StandardDescriptorSetAllocator::new(
      device.clone(),
      Default::default(),
    ));
    let command_buffer_allocator = Arc::new(StandardCommandBufferAllocator::new(
      device.clone(),
      Default::default(),
    ));

    Ok(Self {
      instance,
      device,
      queue,
      memory_allocator,
      descriptor_set_allocator,
      command_buffer_allocator,
    })
  }

  pub fn lesson_context(&self) -> LessonContext {
    LessonContext {
      device:                   self.device.clone(),
      queue:                    self.queue.clone(),
      memory_allocator:         self.memory_allocator.clone(),
      descriptor_set_allocator: self.descriptor_set_allocator.clone(),
      command_buffer_allocator: self.command_buffer_allocator.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn discrete_beats_integrated_beats_cpu() {
    let mut types = [
      PhysicalDeviceType::Cpu,
      PhysicalDeviceType::IntegratedGpu,
      PhysicalDeviceType::Other,
      PhysicalDeviceType::DiscreteGpu,
      PhysicalDeviceType::VirtualGpu,
    ];
    types.sort_by_key(|t| device_type_rank(*t));

    assert_eq!(
      types,
      [
        PhysicalDeviceType::DiscreteGpu,
        PhysicalDeviceType::IntegratedGpu,
        PhysicalDeviceType::VirtualGpu,
        PhysicalDeviceType::Cpu,
        PhysicalDeviceType::Other,
      ]
    );
  }

  #[test]
  fn queue_family_needs_graphics_and_present() {
    assert!(serves_graphics_and_present(QueueFlags::GRAPHICS | QueueFlags::TRANSFER, true));
    // Graphics-only families are rejected rather than paired with a present family
    assert!(!serves_graphics_and_present(QueueFlags::GRAPHICS, false));
    assert!(!serves_graphics_and_present(QueueFlags::COMPUTE | QueueFlags::TRANSFER, true));
  }
}
