//! Host-memory backend.
//!
//! Nothing is executed: buffers are plain byte vectors and every call made through
//! [`GpuDevice`] is appended to a log that can be inspected afterwards. Useful for tests and
//! for checking a packing without GPU hardware.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ash::vk;

use crate::error::{SrError, SrResult};
use crate::gpu::{
    AccelerationContainerDescriptor, AccelerationContainerFlags, AccelerationContainerLevel, BufferUsage,
    CommandEncoder, GeometryFlags, GpuDevice, IndexFormat, PrimitiveType, VertexFormat,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    CreateBuffer { buffer: usize, usage: BufferUsage, size_bytes: u64 },
    UploadToBuffer { buffer: usize, byte_offset: u64, len: usize },
    CreateAccelerationContainer { container: usize },
    CreateCommandEncoder,
    /// the container ids built by each submitted command buffer
    Submit { command_buffers: Vec<Vec<usize>> },
}

#[derive(Debug, Clone)]
pub struct DummyBuffer {
    id: usize,
    usage: BufferUsage,
    data: Rc<RefCell<Vec<u8>>>,
}

impl DummyBuffer {
    pub fn id(&self) -> usize {
        self.id
    }
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }
    pub fn byte_size(&self) -> u64 {
        self.data.borrow().len() as u64
    }
    pub fn contents(&self) -> Vec<u8> {
        self.data.borrow().clone()
    }
    pub fn read_u32s(&self) -> Vec<u32> {
        bytemuck::pod_collect_to_vec(&self.data.borrow()[..])
    }
    pub fn read_f32s(&self) -> Vec<f32> {
        bytemuck::pod_collect_to_vec(&self.data.borrow()[..])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DummyGeometry {
    pub flags: GeometryFlags,
    pub primitive_type: PrimitiveType,
    pub index_buffer: usize,
    pub index_format: IndexFormat,
    pub index_byte_offset: u64,
    pub index_count: u32,
    pub vertex_buffer: usize,
    pub vertex_format: VertexFormat,
    pub vertex_stride_bytes: u64,
    pub vertex_byte_offset: u64,
    pub vertex_count: u32,
}

#[derive(Debug, Clone)]
pub struct DummyAccelerationContainer {
    pub id: usize,
    pub level: AccelerationContainerLevel,
    pub flags: AccelerationContainerFlags,
    pub geometries: Vec<DummyGeometry>,
}

#[derive(Debug, Default)]
pub struct DummyCommandEncoder {
    builds: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DummyCommandBuffer {
    pub builds: Vec<usize>,
}

impl CommandEncoder for DummyCommandEncoder {
    type AccelerationContainer = DummyAccelerationContainer;
    type CommandBuffer = DummyCommandBuffer;

    fn build_acceleration_container(&mut self, container: &DummyAccelerationContainer) -> SrResult<()> {
        log::trace!("DummyDevice: recording build of acceleration container {}", container.id);
        self.builds.push(container.id);
        Ok(())
    }

    fn finish(self) -> SrResult<DummyCommandBuffer> {
        Ok(DummyCommandBuffer { builds: self.builds })
    }
}

#[derive(Debug, Default)]
pub struct DummyDevice {
    calls: RefCell<Vec<DeviceCall>>,
    next_id: Cell<usize>,
    allocated_bytes: Cell<u64>,
    memory_limit: Option<u64>,
}

impl DummyDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// buffer creation fails with `ERROR_OUT_OF_DEVICE_MEMORY` once more than `bytes` would be allocated
    pub fn with_memory_limit(bytes: u64) -> Self {
        Self { memory_limit: Some(bytes), ..Self::default() }
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.borrow().clone()
    }

    /// one entry per [`GpuDevice::submit`], holding the containers built by each command buffer
    pub fn submitted_command_buffers(&self) -> Vec<Vec<Vec<usize>>> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                DeviceCall::Submit { command_buffers } => Some(command_buffers.clone()),
                _ => None,
            })
            .collect()
    }

    fn next_id(&self) -> usize {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn record(&self, call: DeviceCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl GpuDevice for DummyDevice {
    type Buffer = DummyBuffer;
    type AccelerationContainer = DummyAccelerationContainer;
    type CommandBuffer = DummyCommandBuffer;
    type CommandEncoder = DummyCommandEncoder;

    fn create_buffer(&self, usage: BufferUsage, size_bytes: u64) -> SrResult<DummyBuffer> {
        let allocated_bytes = self.allocated_bytes.get() + size_bytes;
        if self.memory_limit.is_some_and(|limit| allocated_bytes > limit) {
            return Err(SrError::from(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY));
        }
        self.allocated_bytes.set(allocated_bytes);

        let id = self.next_id();
        log::trace!("DummyDevice: creating buffer {id} ({size_bytes} bytes, {usage:?})");
        self.record(DeviceCall::CreateBuffer { buffer: id, usage, size_bytes });

        Ok(DummyBuffer {
            id,
            usage,
            data: Rc::new(RefCell::new(vec![0; size_bytes as usize])),
        })
    }

    fn upload_to_buffer(&self, buffer: &DummyBuffer, byte_offset: u64, data: &[u8]) -> SrResult<()> {
        let start = byte_offset as usize;
        let end = start + data.len();
        if end > buffer.data.borrow().len() {
            return Err(SrError::new_custom(format!(
                "upload of {} bytes at offset {byte_offset} overflows buffer {} ({} bytes)",
                data.len(),
                buffer.id,
                buffer.byte_size()
            )));
        }

        buffer.data.borrow_mut()[start..end].copy_from_slice(data);
        self.record(DeviceCall::UploadToBuffer { buffer: buffer.id, byte_offset, len: data.len() });
        Ok(())
    }

    fn create_acceleration_container(
        &self,
        descriptor: &AccelerationContainerDescriptor<'_, DummyBuffer>,
    ) -> SrResult<DummyAccelerationContainer> {
        let id = self.next_id();
        self.record(DeviceCall::CreateAccelerationContainer { container: id });

        let geometries = descriptor
            .geometries
            .iter()
            .map(|g| DummyGeometry {
                flags: g.flags,
                primitive_type: g.primitive_type,
                index_buffer: g.index.buffer.id,
                index_format: g.index.format,
                index_byte_offset: g.index.byte_offset,
                index_count: g.index.count,
                vertex_buffer: g.vertex.buffer.id,
                vertex_format: g.vertex.format,
                vertex_stride_bytes: g.vertex.stride_bytes,
                vertex_byte_offset: g.vertex.byte_offset,
                vertex_count: g.vertex.count,
            })
            .collect();

        Ok(DummyAccelerationContainer {
            id,
            level: descriptor.level,
            flags: descriptor.flags,
            geometries,
        })
    }

    fn create_command_encoder(&self) -> SrResult<DummyCommandEncoder> {
        self.record(DeviceCall::CreateCommandEncoder);
        Ok(DummyCommandEncoder::default())
    }

    fn submit(&self, command_buffers: Vec<DummyCommandBuffer>) -> SrResult<()> {
        self.record(DeviceCall::Submit {
            command_buffers: command_buffers.into_iter().map(|cb| cb.builds).collect(),
        });
        Ok(())
    }
}
