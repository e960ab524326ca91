//! Model-view-projection uniform data.
//!
//! The animated lessons share one transform: the model spins around a
//! configurable axis at 15 degrees per 300 ms step, seen from `(0, 0, 3)`
//! through a 45 degree perspective camera.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use vulkano_lessons::mvp::MvpUniform;
//!
//! let mvp = MvpUniform::spinning(Duration::from_millis(600), 4.0 / 3.0, [1.0, 0.0, 0.0]);
//! assert!(mvp.projection[1][1] < 0.0);
//! ```

use std::time::{Duration, Instant};

use glam::{Mat4, Vec3};
use vulkano::buffer::BufferContents;

pub const EYE: Vec3 = Vec3::new(0.0, 0.0, 3.0);
pub const FOV_DEGREES: f32 = 45.0;
pub const Z_NEAR: f32 = 0.1;
pub const Z_FAR: f32 = 100.0;

/// Column-major matrices laid out like the shaders' `Mvp` uniform block.
#[derive(BufferContents, Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct MvpUniform {
  pub model:      [[f32; 4]; 4],
  pub view:       [[f32; 4]; 4],
  pub projection: [[f32; 4]; 4],
}

impl MvpUniform {
  pub fn new(model: Mat4, view: Mat4, projection: Mat4) -> Self {
    Self {
      model:      model.to_cols_array_2d(),
      view:       view.to_cols_array_2d(),
      projection: projection.to_cols_array_2d(),
    }
  }

  /// Transform for a model spinning around `axis` after `elapsed` time.
  pub fn spinning(elapsed: Duration, aspect: f32, axis: [f32; 3]) -> Self {
    let steps = elapsed.as_millis() as f32 / 300.0;
    let axis = Vec3::from_array(axis).try_normalize().unwrap_or(Vec3::X);

    let model = Mat4::from_axis_angle(axis, -steps * 15.0f32.to_radians());
    let view = Mat4::look_at_rh(EYE, Vec3::ZERO, Vec3::Y);
    let mut projection = Mat4::perspective_rh(FOV_DEGREES.to_radians(), aspect, Z_NEAR, Z_FAR);
    // Vulkan clip space has +Y pointing down
    projection.y_axis.y *= -1.0;

    Self::new(model, view, projection)
  }
}

/// Width over height of `extent`, 1.0 for a degenerate extent.
pub fn aspect_ratio(extent: [u32; 2]) -> f32 {
  if extent[0] == 0 || extent[1] == 0 {
    1.0
  } else {
    extent[0] as f32 / extent[1] as f32
  }
}

/// Animation time that can be paused.
#[derive(Debug)]
pub struct AnimationClock {
  elapsed: Duration,
  last:    Instant,
  paused:  bool,
}

impl AnimationClock {
  pub fn new(now: Instant) -> Self {
    Self {
      elapsed: Duration::ZERO,
      last:    now,
      paused:  false,
    }
  }

  /// Advances to `now` and returns the accumulated animation time.
  pub fn tick(&mut self, now: Instant) -> Duration {
    if !self.paused {
      self.elapsed += now.saturating_duration_since(self.last);
    }
    self.last = now;
    self.elapsed
  }

  pub fn toggle_pause(&mut self, now: Instant) {
    self.tick(now);
    self.paused = !self.paused;
  }

  pub fn is_paused(&self) -> bool {
    self.paused
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;
  use glam::Vec4;

  use super::*;

  #[test]
  fn model_starts_at_identity() {
    let mvp = MvpUniform::spinning(Duration::ZERO, 1.0, [1.0, 0.0, 0.0]);
    assert!(Mat4::from_cols_array_2d(&mvp.model).abs_diff_eq(Mat4::IDENTITY, 1e-6));
  }

  #[test]
  fn rotates_fifteen_degrees_per_step() {
    let mvp = MvpUniform::spinning(Duration::from_millis(1800), 1.0, [0.0, 0.0, 1.0]);
    // 6 steps of -15 degrees around Z
    let rotated = Mat4::from_cols_array_2d(&mvp.model) * Vec4::new(1.0, 0.0, 0.0, 1.0);
    assert_relative_eq!(rotated.x, 0.0, epsilon = 1e-5);
    assert_relative_eq!(rotated.y, -1.0, epsilon = 1e-5);
  }

  #[test]
  fn axis_is_normalized() {
    let a = MvpUniform::spinning(Duration::from_millis(900), 1.0, [0.0, 5.0, 0.0]);
    let b = MvpUniform::spinning(Duration::from_millis(900), 1.0, [0.0, 1.0, 0.0]);
    assert!(Mat4::from_cols_array_2d(&a.model).abs_diff_eq(Mat4::from_cols_array_2d(&b.model), 1e-6));
  }

  #[test]
  fn view_moves_eye_to_origin() {
    let mvp = MvpUniform::spinning(Duration::ZERO, 1.0, [1.0, 0.0, 0.0]);
    let eye = Mat4::from_cols_array_2d(&mvp.view) * EYE.extend(1.0);
    assert!(eye.abs_diff_eq(Vec4::new(0.0, 0.0, 0.0, 1.0), 1e-6));
  }

  #[test]
  fn projection_flips_y_and_uses_aspect() {
    let mvp = MvpUniform::spinning(Duration::ZERO, 2.0, [1.0, 0.0, 0.0]);
    let f = 1.0 / (FOV_DEGREES.to_radians() / 2.0).tan();
    assert_relative_eq!(mvp.projection[1][1], -f, epsilon = 1e-5);
    assert_relative_eq!(mvp.projection[0][0], f / 2.0, epsilon = 1e-5);
  }

  #[test]
  fn near_plane_maps_to_zero_depth() {
    let mvp = MvpUniform::spinning(Duration::ZERO, 1.0, [1.0, 0.0, 0.0]);
    let clip = Mat4::from_cols_array_2d(&mvp.projection) * Vec4::new(0.0, 0.0, -Z_NEAR, 1.0);
    assert_relative_eq!(clip.z / clip.w, 0.0, epsilon = 1e-5);
  }

  #[test]
  fn aspect_handles_zero_height() {
    assert_relative_eq!(aspect_ratio([800, 600]), 800.0 / 600.0);
    assert_relative_eq!(aspect_ratio([800, 0]), 1.0);
  }

  #[test]
  fn clock_stops_while_paused() {
    let start = Instant::now();
    let mut clock = AnimationClock::new(start);

    assert_eq!(clock.tick(start + Duration::from_millis(100)), Duration::from_millis(100));

    clock.toggle_pause(start + Duration::from_millis(150));
    assert!(clock.is_paused());
    assert_eq!(clock.tick(start + Duration::from_millis(400)), Duration::from_millis(150));

    clock.toggle_pause(start + Duration::from_millis(500));
    assert_eq!(clock.tick(start + Duration::from_millis(600)), Duration::from_millis(250));
  }
}
