pub mod config;
pub mod dummy;
pub mod error;
pub mod geometry;
pub mod geometry_buffer;
pub mod gpu;
pub mod layout;
pub mod tangents;
mod utils;
pub mod vulkan_abstraction;

pub use config::Config;
pub use error::{ErrorSource, SrError, SrResult};
pub use geometry::Geometry;
pub use geometry_buffer::{BottomLevelContainer, GeometryBuffer};
pub use gpu::GpuDevice;
pub use layout::{GeometrySlot, PackedLayout};
pub use tangents::{TangentFrames, calculate_tangents_and_bitangents};
