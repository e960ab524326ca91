//! Texture decoding and upload.
//!
//! Textures are decoded to RGBA8 on the CPU, then copied through a staging
//! buffer into a device-local `R8G8B8A8_SRGB` image. Array textures are a
//! single image with one array layer per source, so every layer is resized to
//! the size of the first one before upload.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context;
use image::{ImageBuffer, Rgba, RgbaImage, imageops::FilterType};
use vulkano::{
  buffer::{Buffer, BufferCreateInfo, BufferUsage},
  command_buffer::CopyBufferToImageInfo,
  descriptor_set::WriteDescriptorSet,
  format::Format,
  image::{
    Image,
    ImageCreateInfo,
    ImageType,
    ImageUsage,
    sampler::{Filter, Sampler, SamplerAddressMode, SamplerCreateInfo},
    view::{ImageView, ImageViewCreateInfo, ImageViewType},
  },
  memory::allocator::{AllocationCreateInfo, MemoryTypeFilter},
};

use crate::{base::upload::submit_once, lesson::LessonContext};

#[derive(thiserror::Error, Debug)]
pub enum TextureError {
  #[error("failed to decode texture {path}: {source}")]
  Decode {
    path:   PathBuf,
    #[source]
    source: image::ImageError,
  },

  #[error("texture array needs at least one layer")]
  NoLayers,

  #[error("texture size must be non-zero")]
  EmptyImage,
}

/// Where a texture's pixels come from.
#[derive(Clone, Debug, PartialEq)]
pub enum TextureSource {
  File(PathBuf),
  Checkerboard {
    size:   u32,
    cells:  u32,
    colors: [[u8; 4]; 2],
  },
}

impl TextureSource {
  /// The configured file, or a checkerboard in `colors` when none is set.
  pub fn file_or_checkerboard(path: Option<&Path>, colors: [[u8; 4]; 2]) -> Self {
    match path {
      Some(path) => Self::File(path.to_path_buf()),
      None => Self::Checkerboard {
        size: 256,
        cells: 8,
        colors,
      },
    }
  }
}

/// Color pairs for generated layers, cycled when more are needed.
pub const CHECKER_PALETTE: [[[u8; 4]; 2]; 4] = [
  [[235, 235, 235, 255], [40, 40, 40, 255]],
  [[230, 120, 40, 255], [60, 30, 10, 255]],
  [[70, 160, 230, 255], [10, 30, 70, 255]],
  [[120, 200, 90, 255], [20, 60, 20, 255]],
];

pub fn checkerboard(size: u32, cells: u32, colors: [[u8; 4]; 2]) -> Result<RgbaImage, TextureError> {
  if size == 0 {
    return Err(TextureError::EmptyImage);
  }
  let cell = (size / cells.max(1)).max(1);

  Ok(ImageBuffer::from_fn(size, size, |x, y| {
    let parity = ((x / cell) + (y / cell)) % 2;
    Rgba(colors[parity as usize])
  }))
}

pub fn load_rgba(source: &TextureSource) -> Result<RgbaImage, TextureError> {
  match source {
    TextureSource::File(path) => {
      let image = image::open(path).map_err(|source| TextureError::Decode {
        path: path.clone(),
        source,
      })?;
      log::debug!("Decoded {} ({}x{})", path.display(), image.width(), image.height());
      Ok(image.to_rgba8())
    }
    TextureSource::Checkerboard { size, cells, colors } => checkerboard(*size, *cells, *colors),
  }
}

/// Decodes every layer and resizes them all to the first layer's size.
pub fn load_layers(sources: &[TextureSource]) -> Result<Vec<RgbaImage>, TextureError> {
  let mut layers = sources.iter().map(load_rgba);
  let first = layers.next().ok_or(TextureError::NoLayers)??;
  let (width, height) = first.dimensions();

  let mut out = vec![first];
  for (index, layer) in layers.enumerate() {
    let layer = layer?;
    if layer.dimensions() == (width, height) {
      out.push(layer);
    } else {
      log::warn!(
        "Texture layer {} is {:?}, resizing to {}x{}",
        index + 1,
        layer.dimensions(),
        width,
        height
      );
      out.push(image::imageops::resize(&layer, width, height, FilterType::Triangle));
    }
  }
  Ok(out)
}

/// A sampled texture ready to be bound at a combined image sampler binding.
pub struct GpuTexture {
  /// `Dim2d` or `Dim2dArray` view over every layer
  pub view:    Arc<ImageView>,
  /// Linear filtering, repeat addressing
  pub sampler: Arc<Sampler>,
  /// Number of array layers, 1 for plain 2D textures
  pub layers:  u32,
}

impl GpuTexture {
  /// Combined image sampler write for `binding`.
  pub fn descriptor_write(&self, binding: u32) -> WriteDescriptorSet {
    WriteDescriptorSet::image_view_sampler(binding, self.view.clone(), self.sampler.clone())
  }
}

pub fn upload_texture_2d(ctx: &LessonContext, image: &RgbaImage) -> anyhow::Result<GpuTexture> {
  upload(ctx, std::slice::from_ref(image), ImageViewType::Dim2d)
}

pub fn upload_texture_array(ctx: &LessonContext, layers: &[RgbaImage]) -> anyhow::Result<GpuTexture> {
  upload(ctx, layers, ImageViewType::Dim2dArray)
}

fn upload(ctx: &LessonContext, layers: &[RgbaImage], view_type: ImageViewType) -> anyhow::Result<GpuTexture> {
  let first = layers.first().ok_or(TextureError::NoLayers)?;
  let (width, height) = first.dimensions();
  let layer_count = layers.len() as u32;

  let image = Image::new(
    ctx.memory_allocator.clone(),
    ImageCreateInfo {
      image_type: ImageType::Dim2d,
      format: Format::R8G8B8A8_SRGB,
      extent: [width, height, 1],
      array_layers: layer_count,
      usage: ImageUsage::TRANSFER_DST | ImageUsage::SAMPLED,
      ..Default::default()
    },
    AllocationCreateInfo {
      memory_type_filter: MemoryTypeFilter::PREFER_DEVICE,
      ..Default::default()
    },
  )
  .context("failed to allocate texture image")?;

  // Layers are tightly packed one after another
  let pixels: Vec<u8> = layers.iter().flat_map(|layer| layer.as_raw().iter().copied()).collect();

  let staging_buffer = Buffer::from_iter(
    ctx.memory_allocator.clone(),
    BufferCreateInfo {
      usage: BufferUsage::TRANSFER_SRC,
      ..Default::default()
    },
    AllocationCreateInfo {
      memory_type_filter: MemoryTypeFilter::PREFER_HOST | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
      ..Default::default()
    },
    pixels,
  )
  .context("failed to create texture staging buffer")?;

  submit_once(ctx, |builder| {
    builder.copy_buffer_to_image(CopyBufferToImageInfo::buffer_image(staging_buffer, image.clone()))?;
    Ok(())
  })
  .context("failed to upload texture")?;

  let view = ImageView::new(
    image.clone(),
    ImageViewCreateInfo {
      view_type,
      ..ImageViewCreateInfo::from_image(&image)
    },
  )
  .context("failed to create texture view")?;

  let sampler = Sampler::new(
    ctx.device.clone(),
    SamplerCreateInfo {
      mag_filter: Filter::Linear,
      min_filter: Filter::Linear,
      address_mode: [SamplerAddressMode::Repeat; 3],
      ..Default::default()
    },
  )
  .context("failed to create sampler")?;

  log::debug!("Uploaded {width}x{height} texture with {layer_count} layer(s)");

  Ok(GpuTexture {
    view,
    sampler,
    layers: layer_count,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  const WHITE: [u8; 4] = [255, 255, 255, 255];
  const BLACK: [u8; 4] = [0, 0, 0, 255];

  #[test]
  fn checkerboard_alternates_cells() {
    let image = checkerboard(8, 4, [WHITE, BLACK]).unwrap();
    assert_eq!(image.dimensions(), (8, 8));
    assert_eq!(image.get_pixel(0, 0).0, WHITE);
    assert_eq!(image.get_pixel(1, 1).0, WHITE);
    assert_eq!(image.get_pixel(2, 0).0, BLACK);
    assert_eq!(image.get_pixel(2, 2).0, WHITE);
    assert_eq!(image.get_pixel(7, 0).0, BLACK);
  }

  #[test]
  fn checkerboard_with_more_cells_than_pixels() {
    let image = checkerboard(2, 16, [WHITE, BLACK]).unwrap();
    assert_eq!(image.get_pixel(0, 0).0, WHITE);
    assert_eq!(image.get_pixel(1, 0).0, BLACK);
  }

  #[test]
  fn checkerboard_rejects_zero_size() {
    assert!(matches!(checkerboard(0, 4, [WHITE, BLACK]), Err(TextureError::EmptyImage)));
  }

  #[test]
  fn layers_are_resized_to_first() {
    let sources = [
      TextureSource::Checkerboard {
        size:   16,
        cells:  2,
        colors: CHECKER_PALETTE[0],
      },
      TextureSource::Checkerboard {
        size:   64,
        cells:  2,
        colors: CHECKER_PALETTE[1],
      },
    ];

    let layers = load_layers(&sources).unwrap();
    assert_eq!(layers.len(), 2);
    assert!(layers.iter().all(|l| l.dimensions() == (16, 16)));
  }

  #[test]
  fn no_layers_is_an_error() {
    assert!(matches!(load_layers(&[]), Err(TextureError::NoLayers)));
  }

  #[test]
  fn loads_png_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("layer.png");
    checkerboard(4, 2, [WHITE, BLACK]).unwrap().save(&path).unwrap();

    let image = load_rgba(&TextureSource::File(path)).unwrap();
    assert_eq!(image.dimensions(), (4, 4));
    assert_eq!(image.get_pixel(3, 0).0, BLACK);
  }

  #[test]
  fn missing_file_reports_path() {
    let err = load_rgba(&TextureSource::File(PathBuf::from("nope/missing.png"))).unwrap_err();
    assert!(err.to_string().contains("nope/missing.png"));
  }

  #[test]
  fn fallback_source() {
    let source = TextureSource::file_or_checkerboard(None, CHECKER_PALETTE[2]);
    assert!(matches!(source, TextureSource::Checkerboard { colors, .. } if colors == CHECKER_PALETTE[2]));

    let source = TextureSource::file_or_checkerboard(Some(Path::new("a.png")), CHECKER_PALETTE[2]);
    assert_eq!(source, TextureSource::File(PathBuf::from("a.png")));
  }
}
