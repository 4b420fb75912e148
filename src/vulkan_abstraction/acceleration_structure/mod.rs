pub mod blas;

use std::rc::Rc;

pub use blas::*;

use crate::{error::*, vulkan_abstraction};
use ash::vk;

/// An acceleration structure whose storage has been allocated but whose build is recorded
/// separately, so that many builds can go into one command buffer.
pub struct AccelerationStructure {
    core: Rc<vulkan_abstraction::Core>,
    handle: vk::AccelerationStructureKHR,
    // storage of the acceleration structure
    _buffer: vulkan_abstraction::Buffer,
    level: vk::AccelerationStructureTypeKHR,
    flags: vk::BuildAccelerationStructureFlagsKHR,
    geometries: Vec<vk::AccelerationStructureGeometryKHR<'static>>,
    build_range_infos: Vec<vk::AccelerationStructureBuildRangeInfoKHR>,
    build_scratch_size: vk::DeviceSize,
}
impl AccelerationStructure {
    pub fn new(
        core: Rc<vulkan_abstraction::Core>,
        level: vk::AccelerationStructureTypeKHR,
        flags: vk::BuildAccelerationStructureFlagsKHR,
        geometries: Vec<vk::AccelerationStructureGeometryKHR<'static>>,
        build_range_infos: Vec<vk::AccelerationStructureBuildRangeInfoKHR>,
    ) -> SrResult<Self> {
        assert_eq!(geometries.len(), build_range_infos.len());

        // parameters on how to build the acceleration structure.
        // this temporary version is used to calculate how much memory to allocate for it,
        // the one which is used to really build it is made in record_build
        let incomplete_build_geometry_info = vk::AccelerationStructureBuildGeometryInfoKHR::default()
            .geometries(&geometries)
            .flags(flags)
            // BUILD as opposed to UPDATE
            .mode(vk::BuildAccelerationStructureModeKHR::BUILD)
            .ty(level);

        // based on incomplete_build_info get the sizes of the acceleration structure buffer to allocate and
        // of the scratch buffer that will be used for building the acceleration structure (and can then be discarded)
        let acceleration_structure_size_info = unsafe {
            let mut size_info = vk::AccelerationStructureBuildSizesInfoKHR::default();
            let primitive_counts = build_range_infos.iter().map(|i| i.primitive_count).collect::<Vec<_>>();

            core.acceleration_structure_device().get_acceleration_structure_build_sizes(
                vk::AccelerationStructureBuildTypeKHR::DEVICE,
                &incomplete_build_geometry_info,
                &primitive_counts,
                &mut size_info,
            );

            size_info
        };

        // the vulkan buffer on which the acceleration structure will live
        let buffer = vulkan_abstraction::Buffer::new(
            Rc::clone(&core),
            acceleration_structure_size_info.acceleration_structure_size,
            gpu_allocator::MemoryLocation::GpuOnly,
            vk::BufferUsageFlags::ACCELERATION_STRUCTURE_STORAGE_KHR | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS,
            "acceleration structure buffer",
        )?;

        // information as to how to instantiate (but not "build") the acceleration structure in buffer.
        let acceleration_structure_create_info = vk::AccelerationStructureCreateInfoKHR::default()
            .ty(level)
            .size(acceleration_structure_size_info.acceleration_structure_size)
            .buffer(buffer.inner())
            .offset(0);

        // the actual acceleration structure object which lives on buffer, but has not been "built" yet
        let handle = unsafe {
            core.acceleration_structure_device()
                .create_acceleration_structure(&acceleration_structure_create_info, None)
        }?;

        Ok(Self {
            core,
            handle,
            _buffer: buffer,
            level,
            flags,
            geometries,
            build_range_infos,
            build_scratch_size: acceleration_structure_size_info.build_scratch_size,
        })
    }

    /// records a full build into `cmd_buf`.
    /// `scratch_address` must point to at least `build_scratch_size()` bytes, suitably aligned,
    /// which stay untouched until the command buffer has completed
    pub fn record_build(&self, cmd_buf: vk::CommandBuffer, scratch_address: vk::DeviceAddress) {
        let build_geometry_info = vk::AccelerationStructureBuildGeometryInfoKHR::default()
            .geometries(&self.geometries)
            .flags(self.flags)
            .mode(vk::BuildAccelerationStructureModeKHR::BUILD)
            .ty(self.level)
            .dst_acceleration_structure(self.handle)
            .scratch_data(vk::DeviceOrHostAddressKHR { device_address: scratch_address });

        unsafe {
            self.core.acceleration_structure_device().cmd_build_acceleration_structures(
                cmd_buf,
                &[build_geometry_info],
                &[&self.build_range_infos],
            );
        }

        log::trace!("{:?} acceleration structure build recorded", self.level);
    }

    pub fn build_scratch_size(&self) -> vk::DeviceSize {
        self.build_scratch_size
    }
    pub fn device_address(&self) -> vk::DeviceAddress {
        unsafe {
            self.core.acceleration_structure_device().get_acceleration_structure_device_address(
                &vk::AccelerationStructureDeviceAddressInfoKHR::default().acceleration_structure(self.handle),
            )
        }
    }
    pub fn inner(&self) -> vk::AccelerationStructureKHR {
        self.handle
    }
}
impl Drop for AccelerationStructure {
    fn drop(&mut self) {
        unsafe {
            self.core.acceleration_structure_device().destroy_acceleration_structure(self.handle, None);
        }
    }
}
