//! GLSL shaders, compiled to SPIR-V at build time by `vulkano_shaders`.
//!
//! Every vertex shader reads the same `Mvp` uniform block at set 0, binding 0.
//! Samplers, where present, sit at binding 1.

/// Textured geometry tinted by the vertex color.
pub mod textured {
  pub mod vs {
    vulkano_shaders::shader! {
      ty: "vertex",
      path: "src/shaders/textured.vert",
    }
  }

  pub mod fs {
    vulkano_shaders::shader! {
      ty: "fragment",
      path: "src/shaders/textured.frag",
    }
  }
}

/// Vertex colors only, no texture.
pub mod color {
  pub mod vs {
    vulkano_shaders::shader! {
      ty: "vertex",
      path: "src/shaders/color.vert",
    }
  }

  pub mod fs {
    vulkano_shaders::shader! {
      ty: "fragment",
      path: "src/shaders/color.frag",
    }
  }
}

/// Instanced quads, one per layer of a 2D array texture.
///
/// The layer count is passed as a push constant so the vertex shader can lay
/// the instances out in a row.
pub mod array {
  pub mod vs {
    vulkano_shaders::shader! {
      ty: "vertex",
      path: "src/shaders/array.vert",
    }
  }

  pub mod fs {
    vulkano_shaders::shader! {
      ty: "fragment",
      path: "src/shaders/array.frag",
    }
  }
}

/// Lit, textured mesh with separate position/normal/texcoord buffers.
pub mod model {
  pub mod vs {
    vulkano_shaders::shader! {
      ty: "vertex",
      path: "src/shaders/model.vert",
    }
  }

  pub mod fs {
    vulkano_shaders::shader! {
      ty: "fragment",
      path: "src/shaders/model.frag",
    }
  }
}
