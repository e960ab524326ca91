//! OBJ mesh loading.
//!
//! Meshes are loaded with `tobj`, triangulated and converted to a single
//! index buffer. All objects in the file are merged into one mesh. Texture
//! coordinates are flipped vertically because OBJ puts `v = 0` at the bottom
//! of the image while Vulkan samples from the top.

use std::{io::BufRead, path::Path};

use vulkano::buffer::{BufferUsage, Subbuffer};

use crate::{
  base::upload::device_local_buffer,
  lesson::LessonContext,
  vertex::{Normal, Position, TexCoord},
};

/// Unit cube used when no model file is configured.
pub const BUNDLED_CUBE_OBJ: &str = include_str!("../assets/models/cube.obj");

#[derive(thiserror::Error, Debug)]
pub enum MeshError {
  #[error("failed to load OBJ: {0}")]
  Obj(#[from] tobj::LoadError),

  #[error("OBJ contains no triangles")]
  Empty,
}

/// CPU-side mesh with one entry per unique vertex in each attribute array.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
  pub positions:  Vec<Position>,
  pub normals:    Vec<Normal>,
  pub tex_coords: Vec<TexCoord>,
  pub indices:    Vec<u32>,
}

fn load_options() -> tobj::LoadOptions {
  tobj::LoadOptions {
    triangulate: true,
    single_index: true,
    ..Default::default()
  }
}

impl MeshData {
  pub fn load(path: impl AsRef<Path>) -> Result<Self, MeshError> {
    let path = path.as_ref();
    let (models, _materials) = tobj::load_obj(path, &load_options())?;
    let mesh = Self::from_models(&models)?;

    log::info!(
      "Loaded {} ({} vertices, {} triangles)",
      path.display(),
      mesh.positions.len(),
      mesh.indices.len() / 3
    );
    Ok(mesh)
  }

  /// Loads `path`, or the bundled cube when no path is given.
  pub fn load_or_bundled(path: Option<&Path>) -> Result<Self, MeshError> {
    match path {
      Some(path) => Self::load(path),
      None => {
        log::debug!("Using the bundled cube mesh");
        Self::from_obj_reader(&mut BUNDLED_CUBE_OBJ.as_bytes())
      }
    }
  }

  /// Parses OBJ text from `reader`. Material libraries are ignored.
  pub fn from_obj_reader(reader: &mut impl BufRead) -> Result<Self, MeshError> {
    let (models, _materials) = tobj::load_obj_buf(reader, &load_options(), |_| Ok(Default::default()))?;
    Self::from_models(&models)
  }

  fn from_models(models: &[tobj::Model]) -> Result<Self, MeshError> {
    let mut data = Self::default();

    for model in models {
      let mesh = &model.mesh;
      let base = data.positions.len() as u32;
      let vertex_count = mesh.positions.len() / 3;

      data.positions.extend(mesh.positions.chunks_exact(3).map(|xyz| Position {
        position: [xyz[0], xyz[1], xyz[2]],
      }));

      if mesh.normals.len() == mesh.positions.len() {
        data.normals.extend(mesh.normals.chunks_exact(3).map(|xyz| Normal {
          normal: [xyz[0], xyz[1], xyz[2]],
        }));
      } else {
        data.normals.extend(std::iter::repeat_n(Normal { normal: [0.0, 0.0, 1.0] }, vertex_count));
      }

      if mesh.texcoords.len() / 2 == vertex_count {
        data.tex_coords.extend(mesh.texcoords.chunks_exact(2).map(|uv| TexCoord {
          tex_coord: [uv[0], 1.0 - uv[1]],
        }));
      } else {
        data.tex_coords.extend(std::iter::repeat_n(TexCoord { tex_coord: [0.0, 0.0] }, vertex_count));
      }

      data.indices.extend(mesh.indices.iter().map(|i| i + base));
    }

    if data.indices.is_empty() {
      return Err(MeshError::Empty);
    }
    Ok(data)
  }

  pub fn triangle_count(&self) -> usize {
    self.indices.len() / 3
  }
}

/// GPU buffers holding a [`MeshData`], one vertex buffer per attribute.
pub struct ModelBuffers {
  pub positions:  Subbuffer<[Position]>,
  pub normals:    Subbuffer<[Normal]>,
  pub tex_coords: Subbuffer<[TexCoord]>,
  pub indices:    Subbuffer<[u32]>,
}

impl ModelBuffers {
  pub fn upload(ctx: &LessonContext, mesh: MeshData) -> anyhow::Result<Self> {
    Ok(Self {
      positions:  device_local_buffer(ctx, BufferUsage::VERTEX_BUFFER, mesh.positions)?,
      normals:    device_local_buffer(ctx, BufferUsage::VERTEX_BUFFER, mesh.normals)?,
      tex_coords: device_local_buffer(ctx, BufferUsage::VERTEX_BUFFER, mesh.tex_coords)?,
      indices:    device_local_buffer(ctx, BufferUsage::INDEX_BUFFER, mesh.indices)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use std::io::Cursor;

  use super::*;

  const TRIANGLE_AND_QUAD: &str = "
o triangle
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 0.0 1.0
vn 0.0 0.0 1.0
f 1/1/1 2/2/1 3/3/1
o quad
v 0.0 0.0 1.0
v 1.0 0.0 1.0
v 1.0 1.0 1.0
v 0.0 1.0 1.0
f 4 5 6 7
";

  #[test]
  fn merges_objects_and_triangulates() {
    let mesh = MeshData::from_obj_reader(&mut Cursor::new(TRIANGLE_AND_QUAD)).unwrap();

    assert_eq!(mesh.positions.len(), 7);
    assert_eq!(mesh.normals.len(), 7);
    assert_eq!(mesh.tex_coords.len(), 7);
    // One triangle plus a quad split into two
    assert_eq!(mesh.triangle_count(), 3);
    assert!(mesh.indices[3..].iter().all(|i| *i >= 3 && *i < 7));
  }

  #[test]
  fn flips_v_coordinate() {
    let mesh = MeshData::from_obj_reader(&mut Cursor::new(TRIANGLE_AND_QUAD)).unwrap();
    let flipped: Vec<_> = mesh.tex_coords[..3].iter().map(|t| t.tex_coord).collect();
    assert!(flipped.contains(&[0.0, 1.0]));
    assert!(flipped.contains(&[1.0, 1.0]));
    assert!(flipped.contains(&[0.0, 0.0]));
  }

  #[test]
  fn fills_missing_attributes() {
    let mesh = MeshData::from_obj_reader(&mut Cursor::new(TRIANGLE_AND_QUAD)).unwrap();
    assert!(mesh.normals[3..].iter().all(|n| n.normal == [0.0, 0.0, 1.0]));
    assert!(mesh.tex_coords[3..].iter().all(|t| t.tex_coord == [0.0, 0.0]));
  }

  #[test]
  fn empty_obj_is_rejected() {
    let err = MeshData::from_obj_reader(&mut Cursor::new("# nothing here\n")).unwrap_err();
    assert!(matches!(err, MeshError::Empty));
  }

  #[test]
  fn bundled_cube_needs_no_file() {
    let mesh = MeshData::load_or_bundled(None).unwrap();
    assert_eq!(mesh.triangle_count(), 12);
    assert_eq!(mesh.positions.len(), 24);
  }

  #[test]
  fn configured_path_is_used() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("triangle.obj");
    std::fs::write(&path, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();

    let mesh = MeshData::load_or_bundled(Some(&path)).unwrap();
    assert_eq!(mesh.triangle_count(), 1);

    let missing = dir.path().join("missing.obj");
    assert!(matches!(MeshData::load_or_bundled(Some(&missing)), Err(MeshError::Obj(_))));
  }
}
