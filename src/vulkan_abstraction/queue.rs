use std::rc::Rc;

use crate::{error::*, vulkan_abstraction};
use ash::vk;

pub struct Queue {
    queue: vk::Queue,

    device: Rc<vulkan_abstraction::Device>,
}
impl Queue {
    pub fn new(device: Rc<vulkan_abstraction::Device>, q_index: u32) -> SrResult<Self> {
        let queue = unsafe { device.inner().get_device_queue(device.queue_family_index(), q_index) };

        Ok(Self { queue, device })
    }

    /// submits all `command_buffers` in one batch; `signal_fence` is signaled once all of them completed
    pub fn submit_async(
        &self,
        command_buffers: &[vk::CommandBuffer],
        signal_fence: &mut vulkan_abstraction::Fence,
    ) -> SrResult<()> {
        let submit_info = vk::SubmitInfo::default().command_buffers(command_buffers);

        signal_fence.submit_with(|fence| {
            unsafe { self.device.inner().queue_submit(self.queue, &[submit_info], fence) }?;
            Ok(())
        })
    }

    pub fn submit_sync(&self, command_buffer: vk::CommandBuffer) -> SrResult<()> {
        let mut fence = vulkan_abstraction::Fence::new_unsignaled(Rc::clone(&self.device))?;

        self.submit_async(&[command_buffer], &mut fence)?;
        fence.wait()?;

        Ok(())
    }
}
