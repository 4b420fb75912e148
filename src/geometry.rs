/// A triangle list, borrowed from its owner.
///
/// `vertices` and `normals` hold 3 floats per vertex, `uvs` 2 floats per vertex and `indices`
/// one entry per triangle corner. Nothing is validated: every index must be smaller than
/// `vertices.len() / 3` and `indices.len()` must be a multiple of 3.
#[derive(Debug, Clone, Copy)]
pub struct Geometry<'a> {
    pub indices: &'a [u32],
    pub vertices: &'a [f32],
    pub normals: &'a [f32],
    pub uvs: &'a [f32],
}

impl<'a> Geometry<'a> {
    pub fn new(indices: &'a [u32], vertices: &'a [f32], normals: &'a [f32], uvs: &'a [f32]) -> Self {
        Self { indices, vertices, normals, uvs }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn position(&self, index: u32) -> [f32; 3] {
        vec3_at(self.vertices, index)
    }

    pub fn normal(&self, index: u32) -> [f32; 3] {
        vec3_at(self.normals, index)
    }

    pub fn uv(&self, index: u32) -> [f32; 2] {
        let i = index as usize * 2;
        [self.uvs[i], self.uvs[i + 1]]
    }
}

pub(crate) fn vec3_at(data: &[f32], index: u32) -> [f32; 3] {
    let i = index as usize * 3;
    [data[i], data[i + 1], data[i + 2]]
}
