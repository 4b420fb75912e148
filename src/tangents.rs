use glam::{Vec2, Vec3};

use crate::geometry::{Geometry, vec3_at};

/// Per-vertex tangent space of a [`Geometry`], 3 floats per vertex in both arrays,
/// indexed like `Geometry::vertices`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TangentFrames {
    pub tangents: Vec<f32>,
    // not part of the attribute records, kept for callers that shade with an explicit TBN
    pub bitangents: Vec<f32>,
}

impl TangentFrames {
    pub fn tangent(&self, index: u32) -> [f32; 3] {
        vec3_at(&self.tangents, index)
    }

    pub fn bitangent(&self, index: u32) -> [f32; 3] {
        vec3_at(&self.bitangents, index)
    }
}

/// Accumulates the uv-derived tangent and bitangent of every triangle on its three corners,
/// then orthonormalizes the tangent against the vertex normal (Gram-Schmidt) and rebuilds the
/// bitangent as `cross(n, t)`, flipped to agree with the accumulated one.
///
/// Triangles with degenerate uv mappings contribute nothing; vertices left without a tangent
/// get an arbitrary unit vector orthogonal to their normal.
pub fn calculate_tangents_and_bitangents(geometry: &Geometry<'_>) -> TangentFrames {
    let vertex_count = geometry.vertex_count();
    let mut tangents = vec![Vec3::ZERO; vertex_count];
    let mut bitangents = vec![Vec3::ZERO; vertex_count];

    for tri in geometry.indices.chunks_exact(3) {
        let [i0, i1, i2] = [tri[0], tri[1], tri[2]];

        let p0 = Vec3::from(geometry.position(i0));
        let e1 = Vec3::from(geometry.position(i1)) - p0;
        let e2 = Vec3::from(geometry.position(i2)) - p0;

        let uv0 = Vec2::from(geometry.uv(i0));
        let duv1 = Vec2::from(geometry.uv(i1)) - uv0;
        let duv2 = Vec2::from(geometry.uv(i2)) - uv0;

        let det = duv1.perp_dot(duv2);
        if det.abs() <= f32::EPSILON {
            continue;
        }
        let r = 1.0 / det;

        let tangent = (e1 * duv2.y - e2 * duv1.y) * r;
        let bitangent = (e2 * duv1.x - e1 * duv2.x) * r;

        for i in [i0, i1, i2] {
            tangents[i as usize] += tangent;
            bitangents[i as usize] += bitangent;
        }
    }

    let mut frames = TangentFrames {
        tangents: Vec::with_capacity(vertex_count * 3),
        bitangents: Vec::with_capacity(vertex_count * 3),
    };

    for (i, (t, b)) in tangents.into_iter().zip(bitangents).enumerate() {
        let n = Vec3::from(geometry.normal(i as u32)).normalize_or_zero();

        let t = (t - n * n.dot(t)).normalize_or_zero();
        let t = if t != Vec3::ZERO {
            t
        } else if n != Vec3::ZERO {
            n.any_orthonormal_vector()
        } else {
            Vec3::X
        };

        let handedness = if n.cross(t).dot(b) < 0.0 { -1.0 } else { 1.0 };
        let b = n.cross(t) * handedness;

        frames.tangents.extend_from_slice(&t.to_array());
        frames.bitangents.extend_from_slice(&b.to_array());
    }

    frames
}
