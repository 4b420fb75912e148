#![allow(dead_code)]

use rtgeom::Geometry;

/// Owned mesh data that tests can borrow as a [`Geometry`].
pub struct Mesh {
    pub indices: Vec<u32>,
    pub vertices: Vec<f32>,
    pub normals: Vec<f32>,
    pub uvs: Vec<f32>,
}

impl Mesh {
    pub fn geometry(&self) -> Geometry<'_> {
        Geometry::new(&self.indices, &self.vertices, &self.normals, &self.uvs)
    }
}

/// Two triangles in the z = 0 plane sharing vertices 0 and 2, uvs aligned with x and y.
pub fn quad() -> Mesh {
    Mesh {
        indices: vec![0, 1, 2, 2, 3, 0],
        vertices: vec![-1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 1.0, 1.0, 0.0, -1.0, 1.0, 0.0],
        normals: [0.0, 0.0, 1.0].repeat(4),
        uvs: vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0],
    }
}

pub fn triangle() -> Mesh {
    Mesh {
        indices: vec![0, 1, 2],
        vertices: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        normals: [0.0, 0.0, 1.0].repeat(3),
        uvs: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
    }
}

/// `n` triangles side by side, each with its own three vertices.
pub fn strip(n: u32) -> Mesh {
    let mut mesh = Mesh { indices: Vec::new(), vertices: Vec::new(), normals: Vec::new(), uvs: Vec::new() };
    for i in 0..n {
        let x = i as f32;
        mesh.indices.extend_from_slice(&[3 * i, 3 * i + 1, 3 * i + 2]);
        mesh.vertices.extend_from_slice(&[x, 0.0, 0.0, x + 1.0, 0.0, 0.0, x, 1.0, 0.0]);
        mesh.normals.extend_from_slice(&[0.0, 0.0, 1.0].repeat(3));
        mesh.uvs.extend_from_slice(&[0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
    }
    mesh
}

pub fn empty() -> Mesh {
    Mesh { indices: Vec::new(), vertices: Vec::new(), normals: Vec::new(), uvs: Vec::new() }
}

pub fn assert_close(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-5, "{actual:?} != {expected:?}");
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 6 vertices, 8 triangles: more triangles than vertices, like most closed meshes.
pub fn octahedron() -> Mesh {
    let vertices = vec![1.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, -1.0];
    Mesh {
        indices: vec![0, 2, 4, 2, 1, 4, 1, 3, 4, 3, 0, 4, 2, 0, 5, 1, 2, 5, 3, 1, 5, 0, 3, 5],
        normals: vertices.clone(),
        uvs: vec![1.0, 0.5, 0.0, 0.5, 0.5, 1.0, 0.5, 0.0, 0.5, 0.5, 0.5, 0.5],
        vertices,
    }
}
