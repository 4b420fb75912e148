pub mod cmd_buffer;

pub use cmd_buffer::*;

use std::rc::Rc;

use crate::{error::*, vulkan_abstraction};
use ash::vk;

pub struct CmdPool {
    cmd_pool: vk::CommandPool,
    device: Rc<vulkan_abstraction::Device>,
}
impl CmdPool {
    pub fn new(device: Rc<vulkan_abstraction::Device>, flags: vk::CommandPoolCreateFlags) -> SrResult<Self> {
        let info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(device.queue_family_index())
            .flags(flags);

        let cmd_pool = unsafe { device.inner().create_command_pool(&info, None) }?;

        Ok(Self { cmd_pool, device })
    }

    pub fn inner(&self) -> vk::CommandPool {
        self.cmd_pool
    }
}
impl Drop for CmdPool {
    fn drop(&mut self) {
        match unsafe { self.device.inner().device_wait_idle() } {
            // do not panic: drop is invoked for all objects after a panic; if the logical device is lost
            // every CmdPool would panic again while unwinding and make the backtrace unreadable
            Err(e) => {
                log::warn!("Device::device_wait_idle (inside CmdPool::drop) returned '{e}'");
                //if device was lost do not attempt to free/destroy objects
                if e == vk::Result::ERROR_DEVICE_LOST {
                    return;
                }
            }
            Ok(()) => {}
        }

        unsafe { self.device.inner().destroy_command_pool(self.cmd_pool, None) };
    }
}
