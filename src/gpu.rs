//! The device capabilities a [`crate::GeometryBuffer`] needs.
//!
//! Any backend that can create buffers, upload to them, create bottom-level acceleration
//! structures over triangle geometry and submit recorded builds can implement [`GpuDevice`].

use bitflags::bitflags;

use crate::error::SrResult;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// target of host uploads
        const COPY_DST = 1 << 0;
        /// readable from shaders as a storage buffer
        const STORAGE = 1 << 1;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccelerationContainerFlags: u32 {
        /// prioritize trace performance over build time
        const PREFER_FAST_TRACE = 1 << 0;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GeometryFlags: u32 {
        /// no any-hit invocation, no alpha testing
        const OPAQUE = 1 << 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccelerationContainerLevel {
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    Triangles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    Uint32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexFormat {
    /// three f32, the first 12 bytes of each vertex
    Float3,
}

#[derive(Debug, Clone, Copy)]
pub struct IndexSubRange<'a, B> {
    pub buffer: &'a B,
    pub format: IndexFormat,
    pub byte_offset: u64,
    /// number of indices
    pub count: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct VertexSubRange<'a, B> {
    pub buffer: &'a B,
    pub format: VertexFormat,
    pub stride_bytes: u64,
    pub byte_offset: u64,
    pub count: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct GeometryDescriptor<'a, B> {
    pub flags: GeometryFlags,
    pub primitive_type: PrimitiveType,
    pub index: IndexSubRange<'a, B>,
    pub vertex: VertexSubRange<'a, B>,
}

#[derive(Debug, Clone)]
pub struct AccelerationContainerDescriptor<'a, B> {
    pub level: AccelerationContainerLevel,
    pub flags: AccelerationContainerFlags,
    pub geometries: Vec<GeometryDescriptor<'a, B>>,
}

pub trait CommandEncoder {
    type AccelerationContainer;
    type CommandBuffer;

    /// records a full build (never an update) of `container`
    fn build_acceleration_container(&mut self, container: &Self::AccelerationContainer) -> SrResult<()>;
    fn finish(self) -> SrResult<Self::CommandBuffer>;
}

pub trait GpuDevice {
    type Buffer;
    type AccelerationContainer;
    type CommandBuffer;
    type CommandEncoder: CommandEncoder<
            AccelerationContainer = Self::AccelerationContainer,
            CommandBuffer = Self::CommandBuffer,
        >;

    fn create_buffer(&self, usage: BufferUsage, size_bytes: u64) -> SrResult<Self::Buffer>;

    fn upload_to_buffer(&self, buffer: &Self::Buffer, byte_offset: u64, data: &[u8]) -> SrResult<()>;

    /// creates (but does not build) an acceleration structure; the buffers named by the
    /// descriptor must stay alive until the structure has been built
    fn create_acceleration_container(
        &self,
        descriptor: &AccelerationContainerDescriptor<'_, Self::Buffer>,
    ) -> SrResult<Self::AccelerationContainer>;

    fn create_command_encoder(&self) -> SrResult<Self::CommandEncoder>;

    /// hands the command buffers to the device queue without waiting for them to execute
    fn submit(&self, command_buffers: Vec<Self::CommandBuffer>) -> SrResult<()>;
}
