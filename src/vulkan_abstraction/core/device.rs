use std::{
    collections::HashSet,
    ffi::{CStr, c_char},
};

use ash::vk;

use crate::{error::*, vulkan_abstraction};

pub struct Device {
    device: ash::Device,
    physical_device: vk::PhysicalDevice,
    min_scratch_offset_alignment: u64,
    queue_family_index: u32,
}

impl Device {
    pub fn new(instance: &vulkan_abstraction::Instance, device_extensions: &[*const c_char]) -> SrResult<Self> {
        let instance = instance.inner();
        let physical_devices = unsafe { instance.enumerate_physical_devices() }?;

        let (physical_device, queue_family_index) = physical_devices
            .into_iter()
            //only allow devices which support all required extensions
            .filter(|physical_device| {
                Self::check_device_extension_support(instance, *physical_device, device_extensions).unwrap_or(false)
            })
            //choose a suitable queue family, and filter out devices without one
            .filter_map(|physical_device| {
                Some((physical_device, Self::select_queue_family(instance, physical_device)?))
            })
            // try to get a discrete or at least integrated gpu
            .max_by_key(|(physical_device, _)| {
                let device_type = unsafe { instance.get_physical_device_properties(*physical_device) }.device_type;

                match device_type {
                    vk::PhysicalDeviceType::DISCRETE_GPU => 2,
                    vk::PhysicalDeviceType::INTEGRATED_GPU => 1,
                    _ => 0,
                }
            })
            .ok_or_else(|| SrError::new_custom(String::from("No GPU with acceleration structure support found!")))?;

        let device = {
            let queue_priorities = [1.0];
            let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
                .queue_family_index(queue_family_index)
                .queue_priorities(&queue_priorities)];

            // enable the device features necessary for building acceleration structures
            let mut vk12_features = vk::PhysicalDeviceVulkan12Features::default().buffer_device_address(true);
            let mut physical_device_acceleration_structure_features =
                vk::PhysicalDeviceAccelerationStructureFeaturesKHR::default().acceleration_structure(true);

            let device_create_info = vk::DeviceCreateInfo::default()
                .enabled_extension_names(device_extensions)
                .push_next(&mut vk12_features)
                .push_next(&mut physical_device_acceleration_structure_features)
                .queue_create_infos(&queue_create_infos);

            unsafe { instance.create_device(physical_device, &device_create_info, None) }?
        };

        let min_scratch_offset_alignment = {
            let mut acceleration_structure_properties = vk::PhysicalDeviceAccelerationStructurePropertiesKHR::default();

            let mut physical_device_properties =
                vk::PhysicalDeviceProperties2::default().push_next(&mut acceleration_structure_properties);

            unsafe { instance.get_physical_device_properties2(physical_device, &mut physical_device_properties) };

            acceleration_structure_properties.min_acceleration_structure_scratch_offset_alignment as u64
        };

        let device_name = unsafe { instance.get_physical_device_properties(physical_device) }
            .device_name_as_c_str()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        log::info!("using physical device '{device_name}' (queue family {queue_family_index})");

        Ok(Self {
            device,
            physical_device,
            min_scratch_offset_alignment,
            queue_family_index,
        })
    }

    // acceleration structure builds are compute work, no presentation is needed
    fn select_queue_family(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> Option<u32> {
        unsafe { instance.get_physical_device_queue_family_properties(physical_device) }
            .into_iter()
            .position(|queue_family_props| queue_family_props.queue_flags.contains(vk::QueueFlags::COMPUTE))
            .map(|queue_family_index| queue_family_index as u32)
    }

    fn check_device_extension_support(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        required_device_extensions: &[*const c_char],
    ) -> SrResult<bool> {
        let required_exts_set: HashSet<&CStr> =
            required_device_extensions.iter().map(|p| unsafe { CStr::from_ptr(*p) }).collect();

        let available_exts = unsafe { instance.enumerate_device_extension_properties(physical_device) }?;

        let available_exts_set: HashSet<&CStr> = available_exts
            .iter()
            .map(|props| props.extension_name_as_c_str())
            .collect::<Result<_, _>>()
            .map_err(|e| {
                SrError::new_custom(format!(
                    "Error while checking device extension support. \
                     Could not convert extension name to CStr with message: {e}"
                ))
            })?;

        Ok(required_exts_set.is_subset(&available_exts_set))
    }

    pub fn inner(&self) -> &ash::Device {
        &self.device
    }
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }
    pub fn min_scratch_offset_alignment(&self) -> u64 {
        self.min_scratch_offset_alignment
    }
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_device(None);
        }
    }
}
