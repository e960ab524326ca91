use vulkano::buffer::BufferContents;
use vulkano::pipeline::graphics::vertex_input::Vertex;

// Field names double as shader input names.

#[derive(BufferContents, Vertex, Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct Position {
  #[format(R32G32B32_SFLOAT)]
  pub position: [f32; 3],
}

#[derive(BufferContents, Vertex, Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct Normal {
  #[format(R32G32B32_SFLOAT)]
  pub normal: [f32; 3],
}

#[derive(BufferContents, Vertex, Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct TexCoord {
  #[format(R32G32_SFLOAT)]
  pub tex_coord: [f32; 2],
}

/// Interleaved vertex used by the quad lessons.
#[derive(BufferContents, Vertex, Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct QuadVertex {
  #[format(R32G32B32_SFLOAT)]
  pub position:  [f32; 3],
  #[format(R32G32B32_SFLOAT)]
  pub color:     [f32; 3],
  #[format(R32G32_SFLOAT)]
  pub tex_coord: [f32; 2],
}

/// Unit quad spanning [-1, 1] in x and y, with a distinct color per corner.
pub const QUAD_VERTICES: [QuadVertex; 4] = [
  QuadVertex {
    position:  [-1.0, -1.0, 0.0],
    color:     [1.0, 0.0, 0.0],
    tex_coord: [0.0, 0.0],
  },
  QuadVertex {
    position:  [1.0, -1.0, 0.0],
    color:     [0.0, 0.0, 1.0],
    tex_coord: [1.0, 0.0],
  },
  QuadVertex {
    position:  [-1.0, 1.0, 0.0],
    color:     [1.0, 1.0, 1.0],
    tex_coord: [0.0, 1.0],
  },
  QuadVertex {
    position:  [1.0, 1.0, 0.0],
    color:     [0.0, 1.0, 0.0],
    tex_coord: [1.0, 1.0],
  },
];

/// Two counter-clockwise triangles over [`QUAD_VERTICES`].
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 1, 3];

/// The unit quad scaled by `half_extent`, moved to `center` and given a single
/// `color`.
pub fn quad(center: [f32; 3], half_extent: f32, color: [f32; 3]) -> [QuadVertex; 4] {
  QUAD_VERTICES.map(|v| QuadVertex {
    position: [
      center[0] + v.position[0] * half_extent,
      center[1] + v.position[1] * half_extent,
      center[2],
    ],
    color,
    tex_coord: v.tex_coord,
  })
}

/// Index list for `count` consecutive quads built with [`quad`].
pub fn quad_indices(count: u16) -> Vec<u16> {
  (0..count)
    .flat_map(|q| QUAD_INDICES.map(|i| i + q * 4))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn indices_stay_in_range() {
    assert!(QUAD_INDICES.iter().all(|i| (*i as usize) < QUAD_VERTICES.len()));
  }

  #[test]
  fn triangles_share_the_diagonal() {
    let first = &QUAD_INDICES[..3];
    let second = &QUAD_INDICES[3..];
    let shared = first.iter().filter(|i| second.contains(i)).count();
    assert_eq!(shared, 2);
  }

  #[test]
  fn quad_is_scaled_and_moved() {
    let vertices = quad([0.5, 0.0, -0.25], 0.5, [1.0, 0.5, 0.0]);
    assert_eq!(vertices[0].position, [0.0, -0.5, -0.25]);
    assert_eq!(vertices[3].position, [1.0, 0.5, -0.25]);
    assert!(vertices.iter().all(|v| v.color == [1.0, 0.5, 0.0]));
    assert_eq!(vertices[3].tex_coord, [1.0, 1.0]);
  }

  #[test]
  fn indices_for_several_quads() {
    let indices = quad_indices(2);
    assert_eq!(indices.len(), 12);
    assert_eq!(&indices[..6], &QUAD_INDICES);
    assert_eq!(&indices[6..], &[4, 5, 6, 6, 5, 7]);
  }
}
