//! Setup shared by every lesson: instance and device creation, the window
//! surface and swapchain, and one-shot upload helpers.

pub mod init;
pub mod swapchain;
pub mod upload;

pub use init::VulkanBase;
pub use swapchain::SurfaceTarget;
