use std::error::Error;
use std::rc::Rc;

use rtgeom::vulkan_abstraction::{Core, VulkanDevice};
use rtgeom::{Config, Geometry, GeometryBuffer};

struct Mesh {
    indices: Vec<u32>,
    vertices: Vec<f32>,
    normals: Vec<f32>,
    uvs: Vec<f32>,
}

impl Mesh {
    fn as_geometry(&self) -> Geometry<'_> {
        Geometry::new(&self.indices, &self.vertices, &self.normals, &self.uvs)
    }
}

fn quad() -> Mesh {
    Mesh {
        indices: vec![0, 1, 2, 2, 3, 0],
        vertices: vec![-1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 1.0, 1.0, 0.0, -1.0, 1.0, 0.0],
        normals: [0.0, 0.0, 1.0].repeat(4),
        uvs: vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0],
    }
}

// unit cube with 4 vertices per face so that every face gets its own normal
fn cube() -> Mesh {
    let face_normals: [[f32; 3]; 6] = [
        [1.0, 0.0, 0.0],
        [-1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, -1.0, 0.0],
        [0.0, 0.0, 1.0],
        [0.0, 0.0, -1.0],
    ];

    let mut mesh = Mesh { indices: Vec::new(), vertices: Vec::new(), normals: Vec::new(), uvs: Vec::new() };

    for normal in face_normals {
        let n = glam::Vec3::from(normal);
        let u = n.any_orthonormal_vector();
        let v = n.cross(u);

        let first = (mesh.vertices.len() / 3) as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let position = n + u * su + v * sv;
            mesh.vertices.extend_from_slice(&position.to_array());
            mesh.normals.extend_from_slice(&normal);
            mesh.uvs.extend_from_slice(&[(su + 1.0) * 0.5, (sv + 1.0) * 0.5]);
        }
        mesh.indices.extend_from_slice(&[first, first + 1, first + 2, first + 2, first + 3, first]);
    }

    mesh
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let config = Config::from_env();
    let core = Rc::new(Core::new(config)?);
    let device = Rc::new(VulkanDevice::new(core));

    let meshes = [quad(), cube()];
    let geometries = meshes.iter().map(Mesh::as_geometry).collect::<Vec<_>>();

    let geometry_buffer = GeometryBuffer::new(Rc::clone(&device), &geometries)?;
    geometry_buffer.build()?;
    device.wait_idle()?;

    for (i, container) in geometry_buffer.bottom_level_containers().iter().enumerate() {
        log::info!(
            "geometry {i}: {} triangles, faces at {}, vertex records at {}, BLAS address {:#x}",
            container.face_count() / 3,
            container.face_offset(),
            container.attribute_offset(),
            container.instance().acceleration_structure().device_address(),
        );
    }
    log::info!(
        "face buffer: {} bytes, attribute buffer: {} bytes",
        geometry_buffer.layout().face_buffer_byte_size(),
        geometry_buffer.layout().attribute_buffer_byte_size(),
    );

    Ok(())
}
