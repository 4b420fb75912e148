use std::rc::Rc;

use crate::error::SrResult;
use crate::geometry::Geometry;
use crate::gpu::{
    AccelerationContainerDescriptor, AccelerationContainerFlags, AccelerationContainerLevel, BufferUsage,
    CommandEncoder, GeometryDescriptor, GeometryFlags, GpuDevice, IndexFormat, IndexSubRange, PrimitiveType,
    VertexFormat, VertexSubRange,
};
use crate::layout::{self, ATTRIBUTE_RECORD_BYTE_STRIDE, GeometrySlot, PackedLayout};
use crate::tangents::{self, TangentFrames};
use crate::utils::as_bytes;

/// A bottom-level acceleration structure over one geometry of a [`GeometryBuffer`], with the
/// position of that geometry inside the shared buffers.
pub struct BottomLevelContainer<C> {
    instance: C,
    face_offset: usize,
    face_count: usize,
    attribute_offset: usize,
}

impl<C> BottomLevelContainer<C> {
    pub fn instance(&self) -> &C {
        &self.instance
    }
    /// first element of this geometry in the face buffer
    pub fn face_offset(&self) -> usize {
        self.face_offset
    }
    /// number of indices (3 per triangle)
    pub fn face_count(&self) -> usize {
        self.face_count
    }
    /// first vertex record of this geometry in the attribute buffer
    pub fn attribute_offset(&self) -> usize {
        self.attribute_offset
    }
}

/// Packs a list of triangle meshes into one face buffer and one interleaved attribute buffer and
/// owns one bottom-level acceleration structure per mesh, pointing into those buffers.
///
/// Everything is allocated, filled and uploaded once by [`GeometryBuffer::new`]; the structures
/// are built on the device by [`GeometryBuffer::build`].
pub struct GeometryBuffer<D: GpuDevice> {
    // Note: containers are declared before the buffers they reference so they are dropped first
    containers: Vec<BottomLevelContainer<D::AccelerationContainer>>,
    face_buffer: Option<D::Buffer>,
    attribute_buffer: Option<D::Buffer>,
    layout: PackedLayout,
    device: Rc<D>,
}

impl<D: GpuDevice> GeometryBuffer<D> {
    pub fn new(device: Rc<D>, geometries: &[Geometry<'_>]) -> SrResult<Self> {
        Self::with_tangent_generator(device, geometries, tangents::calculate_tangents_and_bitangents)
    }

    pub fn with_tangent_generator<F>(device: Rc<D>, geometries: &[Geometry<'_>], tangent_generator: F) -> SrResult<Self>
    where
        F: FnMut(&Geometry<'_>) -> TangentFrames,
    {
        let layout = PackedLayout::compute(geometries);

        if layout.is_empty() {
            log::debug!("no geometries to pack, skipping buffer allocation");
            return Ok(Self {
                containers: Vec::new(),
                face_buffer: None,
                attribute_buffer: None,
                layout,
                device,
            });
        }

        let usage = BufferUsage::COPY_DST | BufferUsage::STORAGE;
        let face_buffer = device.create_buffer(usage, layout.face_buffer_byte_size())?;
        let attribute_buffer = device.create_buffer(usage, layout.attribute_buffer_byte_size())?;

        let data = layout::pack(&layout, geometries, tangent_generator);

        // the containers can already reference the buffers even though nothing has been uploaded yet
        let containers = geometries
            .iter()
            .zip(layout.slots())
            .map(|(geometry, slot)| -> SrResult<_> {
                let descriptor = Self::container_descriptor(geometry, slot, &face_buffer, &attribute_buffer);
                let instance = device.create_acceleration_container(&descriptor)?;

                Ok(BottomLevelContainer {
                    instance,
                    face_offset: slot.face_offset,
                    face_count: slot.face_count,
                    attribute_offset: slot.attribute_record_offset(),
                })
            })
            .collect::<SrResult<Vec<_>>>()?;

        device.upload_to_buffer(&face_buffer, 0, as_bytes(&data.faces))?;
        device.upload_to_buffer(&attribute_buffer, 0, as_bytes(&data.attributes))?;

        log::debug!(
            "packed {} geometries: {} face elements, {} attribute elements",
            containers.len(),
            layout.face_buffer_len(),
            layout.attribute_buffer_len()
        );

        Ok(Self {
            containers,
            face_buffer: Some(face_buffer),
            attribute_buffer: Some(attribute_buffer),
            layout,
            device,
        })
    }

    fn container_descriptor<'b>(
        geometry: &Geometry<'_>,
        slot: &GeometrySlot,
        face_buffer: &'b D::Buffer,
        attribute_buffer: &'b D::Buffer,
    ) -> AccelerationContainerDescriptor<'b, D::Buffer> {
        AccelerationContainerDescriptor {
            level: AccelerationContainerLevel::Bottom,
            flags: AccelerationContainerFlags::PREFER_FAST_TRACE,
            geometries: vec![GeometryDescriptor {
                flags: GeometryFlags::OPAQUE,
                primitive_type: PrimitiveType::Triangles,
                index: IndexSubRange {
                    buffer: face_buffer,
                    format: IndexFormat::Uint32,
                    byte_offset: slot.face_byte_offset(),
                    count: slot.face_count as u32,
                },
                vertex: VertexSubRange {
                    buffer: attribute_buffer,
                    format: VertexFormat::Float3,
                    stride_bytes: ATTRIBUTE_RECORD_BYTE_STRIDE,
                    byte_offset: slot.attribute_byte_offset(),
                    count: geometry.vertices.len() as u32,
                },
            }],
        }
    }

    /// Records a build of every bottom-level container into one command buffer and submits it.
    /// Completion is left to the device queue.
    pub fn build(&self) -> SrResult<()> {
        let mut encoder = self.device.create_command_encoder()?;
        for container in &self.containers {
            encoder.build_acceleration_container(&container.instance)?;
        }
        self.device.submit(vec![encoder.finish()?])?;

        log::debug!("submitted build of {} bottom-level acceleration structures", self.containers.len());
        Ok(())
    }

    pub fn face_buffer(&self) -> Option<&D::Buffer> {
        self.face_buffer.as_ref()
    }

    pub fn attribute_buffer(&self) -> Option<&D::Buffer> {
        self.attribute_buffer.as_ref()
    }

    pub fn bottom_level_containers(&self) -> &[BottomLevelContainer<D::AccelerationContainer>] {
        &self.containers
    }

    pub fn layout(&self) -> &PackedLayout {
        &self.layout
    }

    pub fn device(&self) -> &Rc<D> {
        &self.device
    }
}
