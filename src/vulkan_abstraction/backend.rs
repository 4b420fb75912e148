use std::cell::RefCell;
use std::rc::Rc;

use ash::vk;

use crate::error::*;
use crate::gpu::{AccelerationContainerDescriptor, AccelerationContainerLevel, BufferUsage, CommandEncoder, GpuDevice};
use crate::vulkan_abstraction;

fn buffer_usage_flags(usage: BufferUsage) -> vk::BufferUsageFlags {
    // every buffer may be an acceleration structure build input, which is read through its device address
    let mut flags = vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS
        | vk::BufferUsageFlags::ACCELERATION_STRUCTURE_BUILD_INPUT_READ_ONLY_KHR;
    if usage.contains(BufferUsage::COPY_DST) {
        flags |= vk::BufferUsageFlags::TRANSFER_DST;
    }
    if usage.contains(BufferUsage::STORAGE) {
        flags |= vk::BufferUsageFlags::STORAGE_BUFFER;
    }
    flags
}

fn align_up(value: u64, alignment: u64) -> u64 {
    if alignment <= 1 { value } else { value.div_ceil(alignment) * alignment }
}

/// Records acceleration structure builds into a single command buffer.
pub struct VulkanCommandEncoder {
    core: Rc<vulkan_abstraction::Core>,
    cmd_buf: vulkan_abstraction::CmdBuffer,
    scratch_buffers: Vec<vulkan_abstraction::Buffer>,
    built: Vec<Rc<vulkan_abstraction::BLAS>>,
}

/// A finished command buffer, together with everything its execution reads or writes.
pub struct VulkanCommandBuffer {
    cmd_buf: vulkan_abstraction::CmdBuffer,
    _scratch_buffers: Vec<vulkan_abstraction::Buffer>,
    _built: Vec<Rc<vulkan_abstraction::BLAS>>,
}

impl CommandEncoder for VulkanCommandEncoder {
    type AccelerationContainer = Rc<vulkan_abstraction::BLAS>;
    type CommandBuffer = VulkanCommandBuffer;

    fn build_acceleration_container(&mut self, container: &Rc<vulkan_abstraction::BLAS>) -> SrResult<()> {
        let acceleration_structure = container.acceleration_structure();
        let alignment = self.core.device().min_scratch_offset_alignment();

        // gpu_allocator does not know about the scratch alignment requirement: over-allocate and align the address
        let scratch_buffer = vulkan_abstraction::Buffer::new(
            Rc::clone(&self.core),
            (acceleration_structure.build_scratch_size() + alignment).max(1),
            gpu_allocator::MemoryLocation::GpuOnly,
            vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS | vk::BufferUsageFlags::STORAGE_BUFFER,
            "acceleration structure scratch buffer",
        )?;
        let scratch_address = align_up(scratch_buffer.get_device_address(), alignment);

        acceleration_structure.record_build(self.cmd_buf.inner(), scratch_address);

        self.scratch_buffers.push(scratch_buffer);
        self.built.push(Rc::clone(container));
        Ok(())
    }

    fn finish(self) -> SrResult<VulkanCommandBuffer> {
        self.cmd_buf.end()?;

        Ok(VulkanCommandBuffer {
            cmd_buf: self.cmd_buf,
            _scratch_buffers: self.scratch_buffers,
            _built: self.built,
        })
    }
}

struct InFlightSubmission {
    // Note: the fence is declared (and therefore dropped, which waits on it) before the command buffers
    fence: vulkan_abstraction::Fence,
    _command_buffers: Vec<VulkanCommandBuffer>,
}

/// [`GpuDevice`] implementation on top of a [`vulkan_abstraction::Core`].
///
/// Submissions are not waited on; their command buffers and scratch memory are kept until their
/// fence is found signaled by a later [`GpuDevice::submit`], or until [`VulkanDevice::wait_idle`].
pub struct VulkanDevice {
    in_flight: RefCell<Vec<InFlightSubmission>>,
    core: Rc<vulkan_abstraction::Core>,
}

impl VulkanDevice {
    pub fn new(core: Rc<vulkan_abstraction::Core>) -> Self {
        Self { in_flight: RefCell::new(Vec::new()), core }
    }

    pub fn core(&self) -> &Rc<vulkan_abstraction::Core> {
        &self.core
    }

    /// blocks until every submission made through this device has completed
    pub fn wait_idle(&self) -> SrResult<()> {
        for mut submission in self.in_flight.borrow_mut().drain(..) {
            submission.fence.wait()?;
        }
        Ok(())
    }

    pub fn in_flight_submissions(&self) -> usize {
        self.in_flight.borrow().len()
    }

    fn retire_completed(&self) -> SrResult<()> {
        let mut in_flight = self.in_flight.borrow_mut();
        let mut still_running = Vec::with_capacity(in_flight.len());
        for submission in in_flight.drain(..) {
            if !submission.fence.is_signaled()? {
                still_running.push(submission);
            }
        }
        *in_flight = still_running;
        Ok(())
    }
}

impl GpuDevice for VulkanDevice {
    type Buffer = Rc<vulkan_abstraction::Buffer>;
    type AccelerationContainer = Rc<vulkan_abstraction::BLAS>;
    type CommandBuffer = VulkanCommandBuffer;
    type CommandEncoder = VulkanCommandEncoder;

    fn create_buffer(&self, usage: BufferUsage, size_bytes: u64) -> SrResult<Self::Buffer> {
        let buffer = vulkan_abstraction::Buffer::new(
            Rc::clone(&self.core),
            // zero sized buffers are not allowed
            size_bytes.max(1),
            gpu_allocator::MemoryLocation::GpuOnly,
            buffer_usage_flags(usage),
            "geometry buffer",
        )?;
        Ok(Rc::new(buffer))
    }

    fn upload_to_buffer(&self, buffer: &Self::Buffer, byte_offset: u64, data: &[u8]) -> SrResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        let staging_buffer = vulkan_abstraction::Buffer::new_staging_from_data(Rc::clone(&self.core), data)?;
        vulkan_abstraction::Buffer::copy_buffer(&self.core, &staging_buffer, buffer, byte_offset)?;

        log::trace!("uploaded {} bytes at offset {byte_offset}", data.len());
        Ok(())
    }

    fn create_acceleration_container(
        &self,
        descriptor: &AccelerationContainerDescriptor<'_, Self::Buffer>,
    ) -> SrResult<Self::AccelerationContainer> {
        match descriptor.level {
            AccelerationContainerLevel::Bottom => {
                Ok(Rc::new(vulkan_abstraction::BLAS::new(Rc::clone(&self.core), descriptor)?))
            }
        }
    }

    fn create_command_encoder(&self) -> SrResult<Self::CommandEncoder> {
        let cmd_buf = vulkan_abstraction::CmdBuffer::begin_one_time(Rc::clone(&self.core))?;

        // make earlier uploads visible to the builds recorded in this command buffer
        let upload_barrier = vk::MemoryBarrier::default()
            .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
            .dst_access_mask(vk::AccessFlags::ACCELERATION_STRUCTURE_READ_KHR | vk::AccessFlags::SHADER_READ);
        unsafe {
            self.core.device().inner().cmd_pipeline_barrier(
                cmd_buf.inner(),
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::ACCELERATION_STRUCTURE_BUILD_KHR,
                vk::DependencyFlags::empty(),
                &[upload_barrier],
                &[],
                &[],
            );
        }

        Ok(VulkanCommandEncoder {
            cmd_buf,
            core: Rc::clone(&self.core),
            scratch_buffers: Vec::new(),
            built: Vec::new(),
        })
    }

    fn submit(&self, command_buffers: Vec<Self::CommandBuffer>) -> SrResult<()> {
        self.retire_completed()?;

        let handles = command_buffers.iter().map(|cb| cb.cmd_buf.inner()).collect::<Vec<_>>();

        let mut fence = vulkan_abstraction::Fence::new_unsignaled(Rc::clone(self.core.device()))?;
        self.core.queue().submit_async(&handles, &mut fence)?;

        self.in_flight.borrow_mut().push(InFlightSubmission { fence, _command_buffers: command_buffers });
        log::debug!("submitted {} command buffers", handles.len());
        Ok(())
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        if let Err(e) = self.wait_idle() {
            log::warn!("VulkanDevice::wait_idle returned '{e}' inside VulkanDevice::drop");
        }
    }
}
