pub mod app;
pub mod base;
mod command_buffer_builder_ext;
pub mod config;
pub mod lesson;
pub mod model;
pub mod mvp;
pub mod render;
pub mod shaders;
pub mod texture;
pub mod vertex;

// Re-export commonly used items
pub use app::App;
pub use base::{SurfaceTarget, VulkanBase};
pub use config::{ConfigError, LessonsConfig};
pub use lesson::{Lesson, LessonKind, build_lesson};
pub use model::{MeshData, MeshError, ModelBuffers};
pub use mvp::MvpUniform;
pub use render::{PassLayout, WindowSizeSetupConfig, window_size_dependent_setup};
pub use vertex::{Normal, Position, QuadVertex, TexCoord};
