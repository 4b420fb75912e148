use crate::{
    error::{ErrorSource, SrResult},
    vulkan_abstraction,
};
use ash::vk;
use std::rc::Rc;

/// A fence can only be waited on once a submission that signals it has been accepted by the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FenceState {
    Idle,
    Pending,
}

impl FenceState {
    fn after_submit<T>(self, submit_result: &SrResult<T>) -> Self {
        if submit_result.is_ok() { FenceState::Pending } else { self }
    }
}

pub struct Fence {
    device: Rc<vulkan_abstraction::Device>,
    handle: vk::Fence,
    state: FenceState,
}

impl Fence {
    pub fn new_unsignaled(device: Rc<vulkan_abstraction::Device>) -> SrResult<Self> {
        Self::new(device, vk::FenceCreateFlags::empty())
    }
    pub fn new(device: Rc<vulkan_abstraction::Device>, flags: vk::FenceCreateFlags) -> SrResult<Self> {
        let fence_info = vk::FenceCreateInfo::default().flags(flags);

        let handle = unsafe { device.inner().create_fence(&fence_info, None) }?;

        Ok(Self {
            device,
            handle,
            state: FenceState::Idle,
        })
    }
    /// runs `submit` with the fence handle; only a successful submission makes the fence pending,
    /// so a failed one is never waited on
    pub fn submit_with<F>(&mut self, submit: F) -> SrResult<()>
    where
        F: FnOnce(vk::Fence) -> SrResult<()>,
    {
        let result = submit(self.handle);
        self.state = self.state.after_submit(&result);
        result
    }
    /// non-blocking check of a submitted fence
    pub fn is_signaled(&self) -> SrResult<bool> {
        if self.state == FenceState::Idle {
            return Ok(true);
        }
        Ok(unsafe { self.device.inner().get_fence_status(self.handle) }?)
    }
    pub fn wait(&mut self) -> SrResult<()> {
        if self.state == FenceState::Pending {
            unsafe {
                self.device.inner().wait_for_fences(&[self.handle], true, u64::MAX)?;
            }
            self.state = FenceState::Idle;
        }

        Ok(())
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        // don't panic in drop, if possible
        match self.wait() {
            Ok(()) => {}
            Err(e) => match e.get_source() {
                Some(ErrorSource::VULKAN(e)) => {
                    log::warn!("VkWaitForFences returned {e:?} in Fence::drop")
                }
                _ => log::error!("VkWaitForFences returned {e} in Fence::drop"),
            },
        }
        unsafe { self.device.inner().destroy_fence(self.handle, None) };
    }
}
