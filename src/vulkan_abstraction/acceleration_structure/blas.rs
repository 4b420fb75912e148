use std::rc::Rc;

use crate::error::*;
use crate::gpu::{
    AccelerationContainerDescriptor, AccelerationContainerFlags, GeometryDescriptor, GeometryFlags, IndexFormat,
    PrimitiveType, VertexFormat,
};
use crate::vulkan_abstraction;
use ash::vk;

// Bottom-Level Acceleration Structure
pub struct BLAS {
    blas: vulkan_abstraction::AccelerationStructure,
    // the build reads from these, keep them alive as long as the BLAS
    _inputs: Vec<Rc<vulkan_abstraction::Buffer>>,
}

impl BLAS {
    pub fn new(
        core: Rc<vulkan_abstraction::Core>,
        descriptor: &AccelerationContainerDescriptor<'_, Rc<vulkan_abstraction::Buffer>>,
    ) -> SrResult<Self> {
        let (geometries, build_range_infos): (Vec<_>, Vec<_>) =
            descriptor.geometries.iter().map(|g| (Self::make_geometry(g), Self::make_build_range_info(g))).unzip();

        let inputs = descriptor
            .geometries
            .iter()
            .flat_map(|g| [Rc::clone(g.index.buffer), Rc::clone(g.vertex.buffer)])
            .collect();

        let blas = vulkan_abstraction::AccelerationStructure::new(
            core,
            vk::AccelerationStructureTypeKHR::BOTTOM_LEVEL,
            build_flags(descriptor.flags),
            geometries,
            build_range_infos,
        )?;

        Ok(Self { blas, _inputs: inputs })
    }

    // specify what the BLAS's geometry (vbo, ibo) is
    fn make_geometry(
        g: &GeometryDescriptor<'_, Rc<vulkan_abstraction::Buffer>>,
    ) -> vk::AccelerationStructureGeometryKHR<'static> {
        let geometry_type = match g.primitive_type {
            PrimitiveType::Triangles => vk::GeometryTypeKHR::TRIANGLES,
        };
        let vertex_format = match g.vertex.format {
            VertexFormat::Float3 => vk::Format::R32G32B32_SFLOAT,
        };
        let index_type = match g.index.format {
            IndexFormat::Uint32 => vk::IndexType::UINT32,
        };

        let ranges = TriangleRanges::of(g);

        let geometry_data = vk::AccelerationStructureGeometryDataKHR {
            triangles: vk::AccelerationStructureGeometryTrianglesDataKHR::default()
                .vertex_data(vk::DeviceOrHostAddressConstKHR {
                    device_address: g.vertex.buffer.get_device_address() + ranges.vertex_address_offset,
                })
                .max_vertex(ranges.max_vertex)
                .vertex_stride(g.vertex.stride_bytes)
                .vertex_format(vertex_format)
                .index_data(vk::DeviceOrHostAddressConstKHR {
                    device_address: g.index.buffer.get_device_address(),
                })
                .index_type(index_type),
        };

        let mut flags = vk::GeometryFlagsKHR::empty();
        if g.flags.contains(GeometryFlags::OPAQUE) {
            flags |= vk::GeometryFlagsKHR::OPAQUE;
        }

        vk::AccelerationStructureGeometryKHR::default()
            .geometry_type(geometry_type)
            .geometry(geometry_data)
            .flags(flags)
    }

    // specify the range of values to read from the ibo, vbo and transform data of a geometry.
    // there must be one build_range_info for each geometry
    fn make_build_range_info(
        g: &GeometryDescriptor<'_, Rc<vulkan_abstraction::Buffer>>,
    ) -> vk::AccelerationStructureBuildRangeInfoKHR {
        let ranges = TriangleRanges::of(g);

        vk::AccelerationStructureBuildRangeInfoKHR::default()
            // the value of first_vertex is added to index values before fetching verts
            .first_vertex(0)
            // the number of triangles to read
            .primitive_count(ranges.primitive_count)
            // an offset (in bytes) into geometry.geometry_data.index_data from which to start reading
            .primitive_offset(ranges.primitive_offset)
            // transform_offset is an offset (in bytes) into geometry.geometry_data.transform_data
            .transform_offset(0)
    }

    pub fn acceleration_structure(&self) -> &vulkan_abstraction::AccelerationStructure {
        &self.blas
    }

    pub fn inner(&self) -> vk::AccelerationStructureKHR {
        self.blas.inner()
    }
}

/// What a triangle geometry reads from its index and vertex buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TriangleRanges {
    /// highest vertex record an index may reference
    max_vertex: u32,
    primitive_count: u32,
    /// byte offset of the first index inside the index buffer
    primitive_offset: u32,
    /// byte offset of the first vertex record inside the vertex buffer
    vertex_address_offset: u64,
}

impl TriangleRanges {
    // packed faces are re-based per corner: a geometry with n indices reads records 0..n,
    // whatever vertex.count says about the mesh it came from
    fn of<B>(g: &GeometryDescriptor<'_, B>) -> Self {
        Self {
            max_vertex: g.index.count.saturating_sub(1),
            primitive_count: g.index.count / 3,
            primitive_offset: g.index.byte_offset as u32,
            vertex_address_offset: g.vertex.byte_offset,
        }
    }
}

fn build_flags(flags: AccelerationContainerFlags) -> vk::BuildAccelerationStructureFlagsKHR {
    let mut vk_flags = vk::BuildAccelerationStructureFlagsKHR::empty();
    if flags.contains(AccelerationContainerFlags::PREFER_FAST_TRACE) {
        vk_flags |= vk::BuildAccelerationStructureFlagsKHR::PREFER_FAST_TRACE;
    }
    vk_flags
}
