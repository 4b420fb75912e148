use std::rc::Rc;

use ash::vk;
use gpu_allocator::MemoryLocation;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};

use crate::{error::*, vulkan_abstraction};

pub struct Buffer {
    byte_size: vk::DeviceSize,
    core: Rc<vulkan_abstraction::Core>,

    buffer: vk::Buffer,
    allocation: Allocation,
}
impl Buffer {
    pub fn new_staging_from_data(core: Rc<vulkan_abstraction::Core>, data: &[u8]) -> SrResult<Self> {
        let mut staging_buffer = Self::new(
            core,
            data.len() as vk::DeviceSize,
            MemoryLocation::CpuToGpu,
            vk::BufferUsageFlags::TRANSFER_SRC,
            "staging buffer",
        )?;

        let mapped_memory = staging_buffer
            .allocation
            .mapped_slice_mut()
            .ok_or_else(|| SrError::new_custom(String::from("staging buffer memory is not host visible")))?;
        mapped_memory[..data.len()].copy_from_slice(data);

        Ok(staging_buffer)
    }

    /// # Create a new Buffer
    ///
    /// ## Arguments:
    /// - `byte_size`: must not be 0
    /// - `name`: shows up in allocator debug output
    pub fn new(
        core: Rc<vulkan_abstraction::Core>,
        byte_size: vk::DeviceSize,
        location: MemoryLocation,
        buffer_usage_flags: vk::BufferUsageFlags,
        name: &str,
    ) -> SrResult<Self> {
        let device = core.device().inner();
        let buffer = {
            let buf_info = vk::BufferCreateInfo::default()
                .size(byte_size)
                .usage(buffer_usage_flags)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            unsafe { device.create_buffer(&buf_info, None) }?
        };

        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };

        let allocation = core.allocator_mut().allocate(&AllocationCreateDesc {
            name,
            requirements,
            location,
            linear: true,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        });
        let allocation = match allocation {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(e.into());
            }
        };

        if let Err(e) = unsafe { device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) } {
            unsafe { device.destroy_buffer(buffer, None) };
            if let Err(free_err) = core.allocator_mut().free(allocation) {
                log::warn!("failed to free allocation of unbound buffer '{name}': {free_err}");
            }
            return Err(e.into());
        }

        log::trace!("allocated buffer '{name}' ({byte_size} bytes, {location:?})");

        Ok(Self {
            byte_size,
            core,
            buffer,
            allocation,
        })
    }

    pub fn byte_size(&self) -> vk::DeviceSize {
        self.byte_size
    }

    /// copies `src` (all of it) into `dst` at `dst_offset` and waits for the copy to complete.
    /// mainly useful to copy from a staging buffer to a device buffer
    pub fn copy_buffer(
        core: &Rc<vulkan_abstraction::Core>,
        src: &Buffer,
        dst: &Buffer,
        dst_offset: vk::DeviceSize,
    ) -> SrResult<()> {
        debug_assert!(dst_offset + src.byte_size() <= dst.byte_size());

        let cmd_buf = vulkan_abstraction::CmdBuffer::begin_one_time(Rc::clone(core))?;

        let regions = [vk::BufferCopy::default()
            .size(src.byte_size())
            .src_offset(0)
            .dst_offset(dst_offset)];

        unsafe { core.device().inner().cmd_copy_buffer(cmd_buf.inner(), src.inner(), dst.inner(), &regions) };

        cmd_buf.end()?;

        // cmd_buf must not be pending when it is freed at the end of this scope
        core.queue().submit_sync(cmd_buf.inner())?;

        Ok(())
    }

    pub fn get_device_address(&self) -> vk::DeviceAddress {
        let buffer_device_address_info = vk::BufferDeviceAddressInfo::default().buffer(self.buffer);
        unsafe { self.core.device().inner().get_buffer_device_address(&buffer_device_address_info) }
    }

    pub fn inner(&self) -> vk::Buffer {
        self.buffer
    }
}
impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            self.core.device().inner().destroy_buffer(self.buffer, None);
        }
        let allocation = std::mem::take(&mut self.allocation);
        if let Err(e) = self.core.allocator_mut().free(allocation) {
            log::warn!("gpu_allocator::Allocator::free returned '{e}' inside Buffer::drop");
        }
    }
}
