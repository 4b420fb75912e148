use crate::geometry::Geometry;
use crate::tangents::TangentFrames;

/// u32 elements per triangle in the face buffer
pub const FACE_BUFFER_STRIDE: usize = 3;
/// f32 elements per vertex record in the attribute buffer: position, normal, tangent, uv,
/// each padded to 4 floats
pub const ATTRIBUTE_BUFFER_STRIDE: usize = 16;
/// byte stride of a vertex record, as seen by the acceleration structure
pub const ATTRIBUTE_RECORD_BYTE_STRIDE: u64 = (ATTRIBUTE_BUFFER_STRIDE * size_of::<f32>()) as u64;

pub const POSITION_OFFSET: usize = 0;
pub const NORMAL_OFFSET: usize = 4;
pub const TANGENT_OFFSET: usize = 8;
pub const UV_OFFSET: usize = 12;

/// Where one geometry lives inside the shared face and attribute buffers. All values are in
/// elements (u32 for faces, f32 for attributes), not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeometrySlot {
    pub face_offset: usize,
    /// number of indices, i.e. 3 * triangles
    pub face_count: usize,
    pub attribute_offset: usize,
    pub attribute_count: usize,
}

impl GeometrySlot {
    pub fn face_byte_offset(&self) -> u64 {
        (self.face_offset * size_of::<u32>()) as u64
    }

    pub fn attribute_byte_offset(&self) -> u64 {
        (self.attribute_offset * size_of::<f32>()) as u64
    }

    /// index of the first vertex record of this geometry
    pub fn attribute_record_offset(&self) -> usize {
        self.attribute_offset / ATTRIBUTE_BUFFER_STRIDE
    }
}

/// Sizes and per-geometry offsets of the two packed buffers, computed from index counts alone.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PackedLayout {
    slots: Vec<GeometrySlot>,
    face_buffer_len: usize,
    attribute_buffer_len: usize,
}

impl PackedLayout {
    pub fn compute(geometries: &[Geometry<'_>]) -> Self {
        geometries.iter().fold(Self::default(), |mut layout, geometry| {
            debug_assert_eq!(geometry.indices.len() % 3, 0, "geometry is not a triangle list");

            let slot = GeometrySlot {
                face_offset: layout.face_buffer_len,
                face_count: geometry.indices.len(),
                attribute_offset: layout.attribute_buffer_len,
                attribute_count: geometry.indices.len() * ATTRIBUTE_BUFFER_STRIDE,
            };

            layout.face_buffer_len += geometry.triangle_count() * FACE_BUFFER_STRIDE;
            layout.attribute_buffer_len += slot.attribute_count;
            layout.slots.push(slot);
            layout
        })
    }

    pub fn slots(&self) -> &[GeometrySlot] {
        &self.slots
    }
    pub fn face_buffer_len(&self) -> usize {
        self.face_buffer_len
    }
    pub fn attribute_buffer_len(&self) -> usize {
        self.attribute_buffer_len
    }
    pub fn face_buffer_byte_size(&self) -> u64 {
        (self.face_buffer_len * size_of::<u32>()) as u64
    }
    pub fn attribute_buffer_byte_size(&self) -> u64 {
        (self.attribute_buffer_len * size_of::<f32>()) as u64
    }
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Host-side contents of the two buffers, ready for upload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PackedData {
    pub faces: Vec<u32>,
    pub attributes: Vec<f32>,
}

/// Fills the face and attribute arrays for every geometry at the offsets given by `layout`,
/// which must have been computed from the same `geometries`.
///
/// Faces are re-based per triangle (`3k, 3k+1, 3k+2`) since every triangle corner owns its
/// own vertex record.
pub fn pack<F>(layout: &PackedLayout, geometries: &[Geometry<'_>], mut tangent_generator: F) -> PackedData
where
    F: FnMut(&Geometry<'_>) -> TangentFrames,
{
    debug_assert_eq!(layout.slots().len(), geometries.len());

    let mut data = PackedData {
        faces: vec![0; layout.face_buffer_len()],
        attributes: vec![0.0; layout.attribute_buffer_len()],
    };

    for (geometry, slot) in geometries.iter().zip(layout.slots()) {
        let frames = tangent_generator(geometry);

        let faces = &mut data.faces[slot.face_offset..][..geometry.triangle_count() * FACE_BUFFER_STRIDE];
        for (k, face) in faces.chunks_exact_mut(FACE_BUFFER_STRIDE).enumerate() {
            let first = (k * 3) as u32;
            face.copy_from_slice(&[first, first + 1, first + 2]);
        }

        let records = &mut data.attributes[slot.attribute_offset..][..slot.attribute_count];
        for (record, &index) in records.chunks_exact_mut(ATTRIBUTE_BUFFER_STRIDE).zip(geometry.indices) {
            write_attribute_record(record, geometry, &frames, index);
        }
    }

    data
}

// padding slots are left untouched: the record arrives zeroed
fn write_attribute_record(record: &mut [f32], geometry: &Geometry<'_>, frames: &TangentFrames, index: u32) {
    let [u, v] = geometry.uv(index);

    record[POSITION_OFFSET..][..3].copy_from_slice(&geometry.position(index));
    record[NORMAL_OFFSET..][..3].copy_from_slice(&geometry.normal(index));
    record[TANGENT_OFFSET..][..3].copy_from_slice(&frames.tangent(index));
    // flip vertical
    record[UV_OFFSET..][..2].copy_from_slice(&[u, 1.0 - v]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_tangents(geometry: &Geometry<'_>) -> TangentFrames {
        TangentFrames {
            tangents: vec![0.0; geometry.vertices.len()],
            bitangents: vec![0.0; geometry.vertices.len()],
        }
    }

    #[test]
    fn empty_geometry_list_has_empty_layout() {
        let layout = PackedLayout::compute(&[]);

        assert!(layout.is_empty());
        assert_eq!(layout.face_buffer_byte_size(), 0);
        assert_eq!(layout.attribute_buffer_byte_size(), 0);
        assert_eq!(pack(&layout, &[], no_tangents), PackedData::default());
    }

    #[test]
    fn slot_byte_offsets() {
        let slot = GeometrySlot { face_offset: 6, face_count: 3, attribute_offset: 96, attribute_count: 48 };

        assert_eq!(slot.face_byte_offset(), 24);
        assert_eq!(slot.attribute_byte_offset(), 384);
        assert_eq!(slot.attribute_record_offset(), 6);
        assert_eq!(ATTRIBUTE_RECORD_BYTE_STRIDE, 64);
    }

    #[test]
    fn repeated_index_gets_one_record_per_occurrence() {
        let indices = [0, 1, 0, 1, 0, 0];
        let vertices = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let normals = [0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        let uvs = [0.25, 0.75, 1.0, 0.0];
        let geometries = [Geometry::new(&indices, &vertices, &normals, &uvs)];

        let layout = PackedLayout::compute(&geometries);
        let data = pack(&layout, &geometries, no_tangents);

        assert_eq!(data.attributes.len(), 6 * ATTRIBUTE_BUFFER_STRIDE);
        let records: Vec<&[f32]> = data.attributes.chunks_exact(ATTRIBUTE_BUFFER_STRIDE).collect();
        assert_eq!(&records[2][0..3], &[1.0, 2.0, 3.0]);
        assert_eq!(&records[3][0..3], &[4.0, 5.0, 6.0]);
        assert_eq!(&records[3][4..7], &[0.0, 0.0, 1.0]);
        assert_eq!(&records[1][12..14], &[1.0, 1.0]);
        assert_eq!(&records[5][12..14], &[0.25, 0.25]);
    }

    #[test]
    fn tangents_come_from_the_generator() {
        let indices = [0, 1, 2];
        let vertices = [0.0; 9];
        let normals = [0.0; 9];
        let uvs = [0.0; 6];
        let geometries = [Geometry::new(&indices, &vertices, &normals, &uvs)];

        let layout = PackedLayout::compute(&geometries);
        let mut calls = 0;
        let data = pack(&layout, &geometries, |_| {
            calls += 1;
            TangentFrames {
                tangents: vec![0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0],
                bitangents: vec![0.0; 9],
            }
        });

        assert_eq!(calls, 1);
        assert_eq!(&data.attributes[8..11], &[0.0, 0.0, 1.0]);
        assert_eq!(&data.attributes[16 + 8..16 + 11], &[0.0, 1.0, 0.0]);
        assert_eq!(&data.attributes[32 + 8..32 + 11], &[1.0, 0.0, 0.0]);
    }
}
