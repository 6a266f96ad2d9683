use crate::entity::EntityCore;
use crate::extra::Extra;
use crate::object::ObjectFlags;
use crate::parameter::{Child, ChildList, Parameterized, Spawn};
use glam::Vec3;

#[derive(Debug, Parameterized)]
pub struct Geometry {
    #[parameter(base)]
    core: EntityCore,
    #[parameter(child)]
    mesh: Child<Mesh>,
}

entity_payload!(Geometry, Geometry, |document| { mesh: Child::empty() });

impl Geometry {
    pub fn is_mesh(&self) -> bool {
        self.mesh.is_some()
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        self.mesh.get()
    }

    pub fn mesh_mut(&mut self) -> Option<&mut Mesh> {
        self.mesh.get_mut()
    }

    /// Replaces any previous mesh with an empty one.
    pub fn create_mesh(&mut self) -> &mut Mesh {
        self.mesh.set(Mesh::default());
        self.core.flags().set_new_child();
        self.mesh.get_or_insert_with(Mesh::default)
    }
}

#[derive(Debug, Default, Parameterized)]
pub struct Mesh {
    flags: ObjectFlags,
    #[parameter]
    positions: Vec<Vec3>,
    #[parameter(list)]
    polygons: ChildList<Polygons>,
}

impl Mesh {
    pub fn flags(&self) -> &ObjectFlags {
        &self.flags
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn set_positions(&mut self, positions: Vec<Vec3>) {
        self.positions = positions;
        self.flags.set_dirty();
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn polygons(&self) -> &[Polygons] {
        &self.polygons
    }

    pub fn polygons_mut(&mut self, index: usize) -> Option<&mut Polygons> {
        self.polygons.get_mut(index)
    }

    pub fn add_polygons(&mut self) -> &mut Polygons {
        self.flags.set_new_child();
        self.polygons.push(Polygons::default())
    }

    pub fn face_count(&self) -> usize {
        self.polygons.iter().map(Polygons::face_count).sum()
    }

    pub fn face_vertex_count(&self) -> usize {
        self.polygons.iter().map(Polygons::total_face_vertex_count).sum()
    }
}

impl Spawn for Mesh {
    fn spawn(&self) -> Self {
        Mesh::default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PrimitiveType {
    Lines,
    LineStrips,
    #[default]
    Polygons,
    TriangleFans,
    TriangleStrips,
    Points,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Semantic {
    #[default]
    Position,
    Vertex,
    Normal,
    Geotangent,
    Geobinormal,
    TexCoord,
    TexTangent,
    TexBinormal,
    Uv,
    Color,
    Extra,
}

/// One input of a polygon set: which source feeds it, at what offset of the interleaved index
/// stream. Only inputs with their own indices store them.
#[derive(Debug, Default, Parameterized)]
pub struct PolygonsInput {
    #[parameter]
    pub semantic: Semantic,
    /// Id of the geometry source.
    #[parameter]
    pub source: String,
    #[parameter]
    pub offset: u32,
    #[parameter]
    pub set: i32,
    #[parameter]
    indices: Vec<u32>,
}

impl PolygonsInput {
    pub fn owns_indices(&self) -> bool {
        !self.indices.is_empty()
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn set_indices(&mut self, indices: Vec<u32>) {
        self.indices = indices;
    }

    fn set_index_count(&mut self, count: usize) {
        self.indices.resize(count, 0);
    }
}

impl Spawn for PolygonsInput {
    fn spawn(&self) -> Self {
        PolygonsInput::default()
    }
}

/// A polygon set. Face-vertex counts list every polygon followed by its holes; `hole_faces` holds
/// the sorted indices of the entries that are holes.
#[derive(Debug, Default, Parameterized)]
pub struct Polygons {
    flags: ObjectFlags,
    #[parameter(list)]
    inputs: ChildList<PolygonsInput>,
    #[parameter]
    face_vertex_counts: Vec<u32>,
    #[parameter]
    hole_faces: Vec<u32>,
    #[parameter]
    pub primitive_type: PrimitiveType,
    #[parameter]
    pub material_semantic: String,
    #[parameter(child)]
    extra: Extra,
}

impl Polygons {
    pub fn flags(&self) -> &ObjectFlags {
        &self.flags
    }

    pub fn inputs(&self) -> &[PolygonsInput] {
        &self.inputs
    }

    pub fn add_input(&mut self, source: &str, offset: u32) -> &mut PolygonsInput {
        self.flags.set_new_child();
        self.inputs.push(PolygonsInput {
            source: source.trim_start_matches('#').to_string(),
            offset,
            ..PolygonsInput::default()
        })
    }

    pub fn find_input(&self, semantic: Semantic) -> Option<&PolygonsInput> {
        self.inputs.iter().find(|input| input.semantic == semantic)
    }

    pub fn find_input_by_source(&self, source: &str) -> Option<&PolygonsInput> {
        let source = source.trim_start_matches('#');
        self.inputs.iter().find(|input| input.source == source)
    }

    pub fn face_vertex_counts(&self) -> &[u32] {
        &self.face_vertex_counts
    }

    pub fn set_face_vertex_counts(&mut self, counts: Vec<u32>) {
        self.face_vertex_counts = counts;
        self.flags.set_dirty();
    }

    pub fn hole_faces(&self) -> &[u32] {
        &self.hole_faces
    }

    /// Polygons, not counting holes.
    pub fn face_count(&self) -> usize {
        self.face_vertex_counts.len().saturating_sub(self.hole_faces.len())
    }

    pub fn total_face_vertex_count(&self) -> usize {
        self.face_vertex_counts.iter().map(|count| *count as usize).sum()
    }

    /// Appends a face of `degree` vertices. On an empty set every input without indices takes
    /// ownership of the new ones; afterwards only owning inputs grow.
    pub fn add_face(&mut self, degree: u32) {
        let new_set = self.face_vertex_counts.is_empty();
        self.face_vertex_counts.push(degree);

        for input in self.inputs.iter_mut() {
            let count = input.indices.len();
            if !new_set && input.owns_indices() {
                input.set_index_count(count + degree as usize);
            } else if new_set && count == 0 {
                input.set_index_count(degree as usize);
            }
        }

        self.flags.set_dirty();
    }

    /// Removes face `index`, its holes and the indices they used.
    pub fn remove_face(&mut self, index: usize) {
        debug_assert!(index < self.face_count(), "face {} out of range", index);
        if index >= self.face_count() {
            return;
        }

        let offset = self.face_vertex_offset(index);
        let index_count = self.face_vertex_count(index);
        for input in self.inputs.iter_mut().filter(|input| input.owns_indices()) {
            let len = input.indices.len();
            if offset < len {
                input.indices.drain(offset..(offset + index_count).min(len));
            }
        }

        let first = index + self.hole_count_before(index);
        let hole_count = self.hole_count(index);
        let removed = hole_count + 1;
        self.face_vertex_counts.drain(first..first + removed);
        // hole entries past the removed range move down with the counts
        self.hole_faces.retain(|hole| (*hole as usize) < first || (*hole as usize) >= first + removed);
        for hole in self.hole_faces.iter_mut().filter(|hole| (**hole as usize) > first) {
            *hole -= removed as u32;
        }
        self.flags.set_dirty();
    }

    /// Number of face-vertex pairs used by the faces (and their holes) before face `index`.
    pub fn face_vertex_offset(&self, index: usize) -> usize {
        let end = index + self.hole_count_before(index);
        if end >= self.face_vertex_counts.len() {
            return 0;
        }
        self.face_vertex_counts[..end].iter().map(|count| *count as usize).sum()
    }

    /// Holes that appear before face `index`.
    pub fn hole_count_before(&self, index: usize) -> usize {
        let mut index = index;
        let mut count = 0;
        for hole in &self.hole_faces {
            if (*hole as usize) <= index {
                count += 1;
                index += 1;
            }
        }
        count
    }

    /// Holes of face `index`.
    pub fn hole_count(&self, index: usize) -> usize {
        let first = index + self.hole_count_before(index) + 1;
        (first..self.face_vertex_counts.len())
            .take_while(|i| self.is_hole_face(*i))
            .count()
    }

    /// Face-vertex pairs of face `index`, its holes included.
    pub fn face_vertex_count(&self, index: usize) -> usize {
        if index >= self.face_count() {
            return 0;
        }

        let first = index + self.hole_count_before(index);
        let last = first + self.hole_count(index) + 1;
        self.face_vertex_counts[first..last].iter().map(|count| *count as usize).sum()
    }

    pub fn is_hole_face(&self, index: usize) -> bool {
        self.hole_faces.binary_search(&(index as u32)).is_ok()
    }

    /// Marks entry `index` of the face-vertex counts as a hole of the polygon before it.
    pub fn add_hole(&mut self, index: u32) {
        match self.hole_faces.binary_search(&index) {
            Ok(_) => debug_assert!(false, "entry {} is already a hole", index),
            Err(position) => {
                self.hole_faces.insert(position, index);
                self.flags.set_dirty();
            }
        }
    }

    /// The shared degree of every face, `None` when they differ or there are none.
    pub fn test_poly_type(&self) -> Option<u32> {
        let first = *self.face_vertex_counts.first()?;
        self.face_vertex_counts
            .iter()
            .all(|count| *count == first)
            .then_some(first)
    }

    pub fn extra(&self) -> &Extra {
        &self.extra
    }

    pub fn extra_mut(&mut self) -> &mut Extra {
        &mut self.extra
    }
}

impl Spawn for Polygons {
    fn spawn(&self) -> Self {
        Polygons::default()
    }
}
