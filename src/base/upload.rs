//! One-shot transfers from host memory to device-local resources.

use anyhow::Context;
use vulkano::{
  buffer::{Buffer, BufferContents, BufferCreateInfo, BufferUsage, Subbuffer},
  command_buffer::{
    AutoCommandBufferBuilder,
    CommandBufferUsage,
    CopyBufferInfo,
    PrimaryAutoCommandBuffer,
    PrimaryCommandBufferAbstract,
  },
  memory::allocator::{AllocationCreateInfo, MemoryTypeFilter},
  sync::GpuFuture,
};

use crate::lesson::LessonContext;

/// Records commands with `record`, submits them on the lesson queue and
/// blocks until the GPU has finished executing them.
pub fn submit_once(
  ctx: &LessonContext,
  record: impl FnOnce(&mut AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>) -> anyhow::Result<()>,
) -> anyhow::Result<()> {
  let mut builder = AutoCommandBufferBuilder::primary(
    ctx.command_buffer_allocator.clone(),
    ctx.queue.queue_family_index(),
    CommandBufferUsage::OneTimeSubmit,
  )?;

  record(&mut builder)?;

  builder
    .build()?
    .execute(ctx.queue.clone())?
    .then_signal_fence_and_flush()?
    .wait(None)?;

  Ok(())
}

/// Copies `data` into a new device-local buffer through a host-visible
/// staging buffer.
pub fn device_local_buffer<T: BufferContents>(
  ctx: &LessonContext,
  usage: BufferUsage,
  data: Vec<T>,
) -> anyhow::Result<Subbuffer<[T]>> {
  anyhow::ensure!(!data.is_empty(), "cannot upload an empty buffer");
  let len = data.len() as u64;

  let staging = Buffer::from_iter(
    ctx.memory_allocator.clone(),
    BufferCreateInfo {
      usage: BufferUsage::TRANSFER_SRC,
      ..Default::default()
    },
    AllocationCreateInfo {
      memory_type_filter: MemoryTypeFilter::PREFER_HOST | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
      ..Default::default()
    },
    data,
  )
  .context("failed to create staging buffer")?;

  let buffer = Buffer::new_slice::<T>(
    ctx.memory_allocator.clone(),
    BufferCreateInfo {
      usage: usage | BufferUsage::TRANSFER_DST,
      ..Default::default()
    },
    AllocationCreateInfo {
      memory_type_filter: MemoryTypeFilter::PREFER_DEVICE,
      ..Default::default()
    },
    len,
  )
  .context("failed to create device-local buffer")?;

  submit_once(ctx, |builder| {
    builder.copy_buffer(CopyBufferInfo::buffers(staging, buffer.clone()))?;
    Ok(())
  })?;

  Ok(buffer)
}
