mod common;

use std::rc::Rc;

use rstest::{fixture, rstest};

use rtgeom::dummy::{DeviceCall, DummyDevice};
use rtgeom::gpu::{
    AccelerationContainerFlags, AccelerationContainerLevel, BufferUsage, GeometryFlags, IndexFormat, PrimitiveType,
    VertexFormat,
};
use rtgeom::layout::ATTRIBUTE_BUFFER_STRIDE;
use rtgeom::{ErrorSource, GeometryBuffer, TangentFrames};

use common::{Mesh, assert_close};

#[fixture]
fn device() -> Rc<DummyDevice> {
    common::init_logging();
    Rc::new(DummyDevice::new())
}

fn geometries(meshes: &[Mesh]) -> Vec<rtgeom::Geometry<'_>> {
    meshes.iter().map(Mesh::geometry).collect()
}

#[rstest]
fn single_triangle_fills_one_face_and_three_records(device: Rc<DummyDevice>) {
    let meshes = [common::triangle()];
    let buffer = GeometryBuffer::new(Rc::clone(&device), &geometries(&meshes)).unwrap();

    assert_eq!(buffer.face_buffer().unwrap().read_u32s(), vec![0, 1, 2]);
    assert_eq!(buffer.attribute_buffer().unwrap().read_f32s().len(), 3 * ATTRIBUTE_BUFFER_STRIDE);

    let containers = buffer.bottom_level_containers();
    assert_eq!(containers.len(), 1);
    assert_eq!(containers[0].face_offset(), 0);
    assert_eq!(containers[0].face_count(), 3);
    assert_eq!(containers[0].attribute_offset(), 0);
}

#[rstest]
fn attribute_records_are_interleaved_and_padded(device: Rc<DummyDevice>) {
    let meshes = [common::quad()];
    let buffer = GeometryBuffer::new(device, &geometries(&meshes)).unwrap();

    let attributes = buffer.attribute_buffer().unwrap().read_f32s();
    let records = attributes.chunks_exact(ATTRIBUTE_BUFFER_STRIDE).collect::<Vec<_>>();
    assert_eq!(records.len(), 6);

    // corner 0 of triangle 0 is vertex 0
    assert_eq!(&records[0][0..4], &[-1.0, -1.0, 0.0, 0.0]);
    assert_eq!(&records[0][4..8], &[0.0, 0.0, 1.0, 0.0]);
    assert_close(&records[0][8..12], &[1.0, 0.0, 0.0, 0.0]);
    assert_eq!(&records[0][12..16], &[0.0, 1.0, 0.0, 0.0]);

    // corner 0 of triangle 1 is vertex 2, v is flipped
    assert_eq!(&records[3][0..4], &[1.0, 1.0, 0.0, 0.0]);
    assert_eq!(&records[3][12..16], &[1.0, 0.0, 0.0, 0.0]);

    for record in &records {
        assert_eq!([record[3], record[7], record[11], record[14], record[15]], [0.0; 5]);
    }
}

#[rstest]
fn shared_vertices_are_duplicated_per_corner(device: Rc<DummyDevice>) {
    let meshes = [common::quad()];
    let buffer = GeometryBuffer::new(device, &geometries(&meshes)).unwrap();

    assert_eq!(buffer.face_buffer().unwrap().read_u32s(), vec![0, 1, 2, 3, 4, 5]);

    let attributes = buffer.attribute_buffer().unwrap().read_f32s();
    let records = attributes.chunks_exact(ATTRIBUTE_BUFFER_STRIDE).collect::<Vec<_>>();
    // indices [0, 1, 2, 2, 3, 0]
    assert_eq!(records[2], records[3]);
    assert_eq!(records[0], records[5]);
}

#[rstest]
fn second_geometry_starts_after_the_first(device: Rc<DummyDevice>) {
    let meshes = [common::quad(), common::triangle()];
    let buffer = GeometryBuffer::new(device, &geometries(&meshes)).unwrap();

    assert_eq!(buffer.face_buffer().unwrap().read_u32s(), vec![0, 1, 2, 3, 4, 5, 0, 1, 2]);
    assert_eq!(buffer.attribute_buffer().unwrap().read_f32s().len(), 9 * ATTRIBUTE_BUFFER_STRIDE);

    let containers = buffer.bottom_level_containers();
    assert_eq!(containers[1].face_offset(), 6);
    assert_eq!(containers[1].face_count(), 3);
    assert_eq!(containers[1].attribute_offset(), 6);

    let slot = buffer.layout().slots()[1];
    assert_eq!(slot.face_byte_offset(), 24);
    assert_eq!(slot.attribute_offset, 6 * ATTRIBUTE_BUFFER_STRIDE);
    assert_eq!(slot.attribute_byte_offset(), 384);
}

#[rstest]
#[case::one(&[1])]
#[case::several(&[2, 1, 4])]
#[case::with_an_empty_geometry(&[3, 0, 2])]
fn offsets_are_running_sums(device: Rc<DummyDevice>, #[case] triangle_counts: &[u32]) {
    let meshes = triangle_counts
        .iter()
        .map(|&n| if n == 0 { common::empty() } else { common::strip(n) })
        .collect::<Vec<_>>();
    let buffer = GeometryBuffer::new(device, &geometries(&meshes)).unwrap();

    let total_faces = triangle_counts.iter().sum::<u32>() as usize * 3;
    assert_eq!(buffer.layout().face_buffer_len(), total_faces);
    assert_eq!(buffer.layout().attribute_buffer_len(), total_faces * ATTRIBUTE_BUFFER_STRIDE);
    assert_eq!(buffer.face_buffer().unwrap().read_u32s().len(), total_faces);

    let mut face_offset = 0;
    for (container, &n) in buffer.bottom_level_containers().iter().zip(triangle_counts) {
        assert_eq!(container.face_offset(), face_offset);
        assert_eq!(container.attribute_offset(), face_offset);
        assert_eq!(container.face_count(), n as usize * 3);
        face_offset += n as usize * 3;
    }

    // every geometry's faces are re-based to its own records
    let faces = buffer.face_buffer().unwrap().read_u32s();
    for container in buffer.bottom_level_containers() {
        let local = &faces[container.face_offset()..][..container.face_count()];
        assert!(local.iter().enumerate().all(|(i, &f)| f == i as u32));
    }
}

#[rstest]
fn containers_describe_their_slice_of_the_buffers(device: Rc<DummyDevice>) {
    let meshes = [common::quad(), common::triangle()];
    let buffer = GeometryBuffer::new(device, &geometries(&meshes)).unwrap();

    let face_buffer_id = buffer.face_buffer().unwrap().id();
    let attribute_buffer_id = buffer.attribute_buffer().unwrap().id();

    let expected = [(0, 0, 6, 4), (24, 384, 3, 3)];
    for (container, (index_byte_offset, vertex_byte_offset, index_count, vertex_count)) in
        buffer.bottom_level_containers().iter().zip(expected)
    {
        let instance = container.instance();
        assert_eq!(instance.level, AccelerationContainerLevel::Bottom);
        assert_eq!(instance.flags, AccelerationContainerFlags::PREFER_FAST_TRACE);
        assert_eq!(instance.geometries.len(), 1);

        let geometry = &instance.geometries[0];
        assert_eq!(geometry.flags, GeometryFlags::OPAQUE);
        assert_eq!(geometry.primitive_type, PrimitiveType::Triangles);
        assert_eq!(geometry.index_buffer, face_buffer_id);
        assert_eq!(geometry.index_format, IndexFormat::Uint32);
        assert_eq!(geometry.index_byte_offset, index_byte_offset);
        assert_eq!(geometry.index_count, index_count);
        assert_eq!(geometry.vertex_buffer, attribute_buffer_id);
        assert_eq!(geometry.vertex_format, VertexFormat::Float3);
        assert_eq!(geometry.vertex_stride_bytes, 64);
        assert_eq!(geometry.vertex_byte_offset, vertex_byte_offset);
        // vertex count is in floats of the source mesh
        assert_eq!(geometry.vertex_count, vertex_count * 3);
    }
}

#[rstest]
fn buffers_are_created_before_containers_and_filled_after(device: Rc<DummyDevice>) {
    let meshes = [common::quad(), common::triangle()];
    let buffer = GeometryBuffer::new(Rc::clone(&device), &geometries(&meshes)).unwrap();

    let usage = BufferUsage::COPY_DST | BufferUsage::STORAGE;
    assert_eq!(
        device.calls(),
        vec![
            DeviceCall::CreateBuffer { buffer: 0, usage, size_bytes: 36 },
            DeviceCall::CreateBuffer { buffer: 1, usage, size_bytes: 576 },
            DeviceCall::CreateAccelerationContainer { container: 2 },
            DeviceCall::CreateAccelerationContainer { container: 3 },
            DeviceCall::UploadToBuffer { buffer: 0, byte_offset: 0, len: 36 },
            DeviceCall::UploadToBuffer { buffer: 1, byte_offset: 0, len: 576 },
        ]
    );
    assert_eq!(buffer.face_buffer().unwrap().usage(), usage);
    assert_eq!(buffer.attribute_buffer().unwrap().byte_size(), 576);
}

#[rstest]
fn build_submits_every_container_in_one_command_buffer(device: Rc<DummyDevice>) {
    let meshes = [common::quad(), common::triangle(), common::strip(3)];
    let buffer = GeometryBuffer::new(Rc::clone(&device), &geometries(&meshes)).unwrap();

    buffer.build().unwrap();

    let ids = buffer.bottom_level_containers().iter().map(|c| c.instance().id).collect::<Vec<_>>();
    assert_eq!(device.submitted_command_buffers(), vec![vec![ids]]);
    assert_eq!(device.calls().last(), Some(&DeviceCall::Submit { command_buffers: vec![vec![2, 3, 4]] }));
}

#[rstest]
fn building_twice_submits_twice(device: Rc<DummyDevice>) {
    let meshes = [common::triangle()];
    let buffer = GeometryBuffer::new(Rc::clone(&device), &geometries(&meshes)).unwrap();

    buffer.build().unwrap();
    buffer.build().unwrap();

    assert_eq!(device.submitted_command_buffers(), vec![vec![vec![2]], vec![vec![2]]]);
}

#[rstest]
fn no_geometries_allocates_nothing(device: Rc<DummyDevice>) {
    let buffer = GeometryBuffer::new(Rc::clone(&device), &[]).unwrap();

    assert!(buffer.face_buffer().is_none());
    assert!(buffer.attribute_buffer().is_none());
    assert!(buffer.bottom_level_containers().is_empty());
    assert!(device.calls().is_empty());

    buffer.build().unwrap();

    assert_eq!(
        device.calls(),
        vec![DeviceCall::CreateCommandEncoder, DeviceCall::Submit { command_buffers: vec![vec![]] }]
    );
}

#[rstest]
fn allocation_failures_are_returned() {
    // enough for the face buffer of a quad, not for its attributes
    let device = Rc::new(DummyDevice::with_memory_limit(64));
    let meshes = [common::quad()];

    let err = match GeometryBuffer::new(Rc::clone(&device), &geometries(&meshes)) {
        Ok(_) => panic!("packing should not fit in 64 bytes"),
        Err(err) => err,
    };

    assert!(matches!(
        err.get_source(),
        Some(ErrorSource::VULKAN(ash::vk::Result::ERROR_OUT_OF_DEVICE_MEMORY))
    ));
    assert!(!device.calls().iter().any(|call| matches!(call, DeviceCall::CreateAccelerationContainer { .. })));
}

#[rstest]
fn tangents_come_from_the_given_generator(device: Rc<DummyDevice>) {
    let meshes = [common::triangle(), common::quad()];
    let mut seen_vertex_counts = Vec::new();

    let buffer = GeometryBuffer::with_tangent_generator(device, &geometries(&meshes), |geometry| {
        seen_vertex_counts.push(geometry.vertex_count());
        TangentFrames {
            tangents: [0.0, 1.0, 0.0].repeat(geometry.vertex_count()),
            bitangents: [-1.0, 0.0, 0.0].repeat(geometry.vertex_count()),
        }
    })
    .unwrap();

    assert_eq!(seen_vertex_counts, vec![3, 4]);

    let attributes = buffer.attribute_buffer().unwrap().read_f32s();
    for record in attributes.chunks_exact(ATTRIBUTE_BUFFER_STRIDE) {
        assert_eq!(&record[8..12], &[0.0, 1.0, 0.0, 0.0]);
    }
}

#[rstest]
fn faces_of_closed_meshes_index_past_the_source_vertex_count(device: Rc<DummyDevice>) {
    let meshes = [common::octahedron()];
    let buffer = GeometryBuffer::new(device, &geometries(&meshes)).unwrap();

    let geometry = &buffer.bottom_level_containers()[0].instance().geometries[0];
    assert_eq!(geometry.index_count, 24);
    assert_eq!(geometry.vertex_count, 18);

    // every face index addresses one of the index_count records written for this geometry
    let faces = buffer.face_buffer().unwrap().read_u32s();
    assert_eq!(faces.iter().max(), Some(&23));
    let records = buffer.attribute_buffer().unwrap().read_f32s().len() / ATTRIBUTE_BUFFER_STRIDE;
    assert_eq!(records, geometry.index_count as usize);
}
