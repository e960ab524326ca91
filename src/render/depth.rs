//! Depth/stencil format selection.

use vulkano::{
  format::{ClearValue, Format},
  image::ImageAspects,
};

/// Depth formats in order of preference. Combined depth/stencil formats come
/// first so the stencil aspect is available when the device supports it.
pub const DEPTH_FORMAT_CANDIDATES: [Format; 5] = [
  Format::D32_SFLOAT_S8_UINT,
  Format::D24_UNORM_S8_UINT,
  Format::D16_UNORM_S8_UINT,
  Format::D32_SFLOAT,
  Format::D16_UNORM,
];

/// Returns the first candidate for which `supported` holds.
pub fn choose_depth_format(
  candidates: &[Format],
  mut supported: impl FnMut(Format) -> bool,
) -> Option<Format> {
  candidates.iter().copied().find(|format| supported(*format))
}

pub fn has_stencil(format: Format) -> bool {
  matches!(
    format,
    Format::D32_SFLOAT_S8_UINT | Format::D24_UNORM_S8_UINT | Format::D16_UNORM_S8_UINT | Format::S8_UINT
  )
}

/// Aspects a depth attachment view must cover for `format`.
pub fn depth_aspects(format: Format) -> ImageAspects {
  if has_stencil(format) {
    ImageAspects::DEPTH | ImageAspects::STENCIL
  } else {
    ImageAspects::DEPTH
  }
}

/// Clears depth to the far plane, and stencil to zero when present.
pub fn depth_clear_value(format: Format) -> ClearValue {
  if has_stencil(format) {
    ClearValue::DepthStencil((1.0, 0))
  } else {
    ClearValue::Depth(1.0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn picks_first_supported() {
    let chosen = choose_depth_format(&DEPTH_FORMAT_CANDIDATES, |f| {
      matches!(f, Format::D24_UNORM_S8_UINT | Format::D16_UNORM)
    });
    assert_eq!(chosen, Some(Format::D24_UNORM_S8_UINT));
  }

  #[test]
  fn falls_through_to_depth_only() {
    let chosen = choose_depth_format(&DEPTH_FORMAT_CANDIDATES, |f| f == Format::D32_SFLOAT);
    assert_eq!(chosen, Some(Format::D32_SFLOAT));
  }

  #[test]
  fn nothing_supported() {
    assert_eq!(choose_depth_format(&DEPTH_FORMAT_CANDIDATES, |_| false), None);
  }

  #[test]
  fn stencil_detection() {
    assert!(has_stencil(Format::D32_SFLOAT_S8_UINT));
    assert!(has_stencil(Format::D24_UNORM_S8_UINT));
    assert!(has_stencil(Format::S8_UINT));
    assert!(!has_stencil(Format::D32_SFLOAT));
    assert!(!has_stencil(Format::D16_UNORM));
  }

  #[test]
  fn aspects_follow_stencil() {
    assert_eq!(depth_aspects(Format::D16_UNORM), ImageAspects::DEPTH);
    assert_eq!(
      depth_aspects(Format::D24_UNORM_S8_UINT),
      ImageAspects::DEPTH | ImageAspects::STENCIL
    );
  }

  #[test]
  fn clear_values() {
    assert!(matches!(depth_clear_value(Format::D32_SFLOAT), ClearValue::Depth(d) if d == 1.0));
    assert!(matches!(
      depth_clear_value(Format::D32_SFLOAT_S8_UINT),
      ClearValue::DepthStencil((d, 0)) if d == 1.0
    ));
  }
}
