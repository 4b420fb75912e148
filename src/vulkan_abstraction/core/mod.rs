pub mod device;
pub mod instance;

pub use device::*;
pub use instance::*;

use std::cell::{RefCell, RefMut};
use std::ffi::CStr;
use std::rc::Rc;

use ash::{khr, vk};
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};

use crate::config::Config;
use crate::error::*;
use crate::vulkan_abstraction;

/// Everything needed to allocate buffers and build acceleration structures on one GPU queue.
/// No surface or swapchain is created.
#[rustfmt::skip]
pub struct Core {
    // Note: do not reorder the fields in this struct: they will be dropped in the same order they are declared
    acceleration_structure_device: khr::acceleration_structure::Device,
    queue: vulkan_abstraction::Queue,
    cmd_pool: vulkan_abstraction::CmdPool,

    allocator: RefCell<Allocator>,

    device: Rc<vulkan_abstraction::Device>,
    // only kept alive for the objects created from them
    _instance: vulkan_abstraction::Instance,
    _entry: ash::Entry,
}

impl Core {
    pub fn new(config: Config) -> SrResult<Self> {
        let entry = unsafe { ash::Entry::load() }
            .map_err(|e| SrError::new_custom(format!("could not load the Vulkan library: {e}")))?;

        let instance = vulkan_abstraction::Instance::new(&entry, config.with_validation_layer, config.with_gpuav)?;

        let device_extensions = [
            khr::acceleration_structure::NAME,
            khr::deferred_host_operations::NAME,
        ]
        .map(CStr::as_ptr);

        let device = Rc::new(Device::new(&instance, &device_extensions)?);

        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.inner().clone(),
            device: device.inner().clone(),
            physical_device: device.physical_device(),
            debug_settings: Default::default(),
            // buffer_device_address is enabled unconditionally in Device::new
            buffer_device_address: true,
            allocation_sizes: Default::default(),
        })?;

        let acceleration_structure_device = khr::acceleration_structure::Device::new(instance.inner(), device.inner());

        let queue = vulkan_abstraction::Queue::new(Rc::clone(&device), 0)?;

        let cmd_pool = vulkan_abstraction::CmdPool::new(Rc::clone(&device), vk::CommandPoolCreateFlags::TRANSIENT)?;

        Ok(Self {
            _entry: entry,
            _instance: instance,
            device,
            allocator: RefCell::new(allocator),
            acceleration_structure_device,
            queue,
            cmd_pool,
        })
    }

    pub fn device(&self) -> &Rc<vulkan_abstraction::Device> {
        &self.device
    }
    pub fn acceleration_structure_device(&self) -> &khr::acceleration_structure::Device {
        &self.acceleration_structure_device
    }
    pub fn queue(&self) -> &vulkan_abstraction::Queue {
        &self.queue
    }
    pub fn allocator_mut(&self) -> RefMut<'_, Allocator> {
        self.allocator.borrow_mut()
    }
    pub fn cmd_pool(&self) -> &vulkan_abstraction::CmdPool {
        &self.cmd_pool
    }
}
