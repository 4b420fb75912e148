use std::rc::Rc;

use ash::vk;

use crate::{error::*, vulkan_abstraction};

// Device::free_command_buffers must be called on vk::CommandBuffer before it is dropped
pub fn new_command_buffer(cmd_pool: &vulkan_abstraction::CmdPool, device: &ash::Device) -> SrResult<vk::CommandBuffer> {
    let info = vk::CommandBufferAllocateInfo::default()
        .command_pool(cmd_pool.inner())
        .level(vk::CommandBufferLevel::PRIMARY)
        .command_buffer_count(1);

    let v = unsafe { device.allocate_command_buffers(&info) }?;
    v.into_iter().next().ok_or_else(|| SrError::new_custom(String::from("Error in new_command_buffer")))
}

/// A primary ONE_TIME_SUBMIT command buffer, freed when dropped.
/// Whoever submits it must make sure it is no longer pending by then.
pub struct CmdBuffer {
    handle: vk::CommandBuffer,
    core: Rc<vulkan_abstraction::Core>,
}

impl CmdBuffer {
    /// allocates a command buffer and begins recording
    pub fn begin_one_time(core: Rc<vulkan_abstraction::Core>) -> SrResult<Self> {
        let handle = new_command_buffer(core.cmd_pool(), core.device().inner())?;
        let cmd_buf = Self { handle, core };

        let begin_info = vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { cmd_buf.core.device().inner().begin_command_buffer(handle, &begin_info) }?;

        Ok(cmd_buf)
    }

    pub fn end(&self) -> SrResult<()> {
        unsafe { self.core.device().inner().end_command_buffer(self.handle) }?;
        Ok(())
    }

    pub fn inner(&self) -> vk::CommandBuffer {
        self.handle
    }
}

impl Drop for CmdBuffer {
    fn drop(&mut self) {
        unsafe {
            self.core.device().inner().free_command_buffers(self.core.cmd_pool().inner(), &[self.handle]);
        }
    }
}
