use glam::DVec3;
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

use crate::{
    attributes::{AttrValue, AttrView, AttributeSchema, Attributes},
    element::{CH, Handle, KeyAllocator, VH},
    error::Error,
    mesh::split_coordinates,
};

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct CellVertexRecord {
    pub(crate) point: DVec3,
    pub(crate) attrs: Attributes,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct CellRecord {
    pub(crate) faces: Vec<Vec<VH>>,
    pub(crate) attrs: Attributes,
}

/// A halfface polyhedral mesh.
///
/// The halfedge scheme taken one dimension up: a cell is an ordered
/// collection of face cycles that close into an oriented shell, and every
/// cyclic vertex triplet of every face binds the owning cell. The triplet
/// with the opposite orientation belongs to the neighboring cell across that
/// face, or to no cell when the face lies on the boundary of the volume.
///
/// Iteration over vertices and cells is in ascending key order, which
/// coincides with insertion order for auto-allocated keys.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VolMesh {
    pub(crate) vertices: BTreeMap<VH, CellVertexRecord>,
    pub(crate) cells: BTreeMap<CH, CellRecord>,
    pub(crate) halffaces: BTreeMap<[VH; 3], CH>,
    pub(crate) vertex_alloc: KeyAllocator,
    pub(crate) cell_alloc: KeyAllocator,
    pub(crate) default_vertex_attrs: AttributeSchema,
    pub(crate) default_cell_attrs: AttributeSchema,
}

/// Cyclic consecutive vertex triplets of a face cycle.
pub(crate) fn face_triplets(cycle: &[VH]) -> impl Iterator<Item = [VH; 3]> + '_ {
    let n = cycle.len();
    (0..n).map(move |i| [cycle[i], cycle[(i + 1) % n], cycle[(i + 2) % n]])
}

impl VolMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn number_of_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn number_of_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn vertices(&self) -> impl Iterator<Item = VH> + '_ {
        self.vertices.keys().copied()
    }

    pub fn cells(&self) -> impl Iterator<Item = CH> + '_ {
        self.cells.keys().copied()
    }

    pub fn has_vertex(&self, v: VH) -> bool {
        self.vertices.contains_key(&v)
    }

    pub fn is_cell(&self, c: CH) -> bool {
        self.cells.contains_key(&c)
    }

    /// The cell bound to an oriented vertex triplet, if any.
    pub fn halfface_cell(&self, triplet: [VH; 3]) -> Option<CH> {
        self.halffaces.get(&triplet).copied()
    }

    // Vertices.

    /// Add a vertex, allocating a key unless one is supplied. The reserved
    /// attribute names `x`, `y`, `z` seed the position.
    pub fn add_vertex(&mut self, key: Option<VH>, attrs: Attributes) -> Result<VH, Error> {
        let vertices = &self.vertices;
        let v = self
            .vertex_alloc
            .allocate(key, |k| vertices.contains_key(&k))?;
        let (point, attrs) = split_coordinates(attrs);
        self.vertices.insert(v, CellVertexRecord { point, attrs });
        Ok(v)
    }

    pub fn add_vertex_at(&mut self, point: DVec3) -> Result<VH, Error> {
        let v = self.add_vertex(None, Attributes::new())?;
        self.vertices
            .get_mut(&v)
            .ok_or(Error::VertexNotFound(v))?
            .point = point;
        Ok(v)
    }

    pub fn vertex_point(&self, v: VH) -> Result<DVec3, Error> {
        self.vertices
            .get(&v)
            .map(|rec| rec.point)
            .ok_or(Error::VertexNotFound(v))
    }

    pub fn set_vertex_point(&mut self, v: VH, point: DVec3) -> Result<(), Error> {
        self.vertices
            .get_mut(&v)
            .ok_or(Error::VertexNotFound(v))?
            .point = point;
        Ok(())
    }

    /// Delete a vertex and every cell incident to it.
    pub fn delete_vertex(&mut self, v: VH) -> Result<(), Error> {
        if !self.has_vertex(v) {
            return Err(Error::VertexNotFound(v));
        }
        let incident: Vec<CH> = self.vertex_cells(v)?;
        debug!("deleting vertex {v} cascades to {} cells", incident.len());
        for c in incident {
            self.delete_cell(c)?;
        }
        self.vertices.remove(&v);
        Ok(())
    }

    // Cells.

    /// Add a cell as a collection of face cycles closing into an oriented
    /// shell.
    ///
    /// Validation happens before any adjacency is touched: every face must
    /// be a simple cycle of length >= 3 over live vertices, every directed
    /// edge of every face must be used exactly once by the cell and its
    /// reverse by another face of the same cell, and no vertex triplet may
    /// already be bound by a live cell.
    pub fn add_cell(
        &mut self,
        faces: Vec<Vec<VH>>,
        key: Option<CH>,
        attrs: Attributes,
    ) -> Result<CH, Error> {
        let mut edges: BTreeSet<(VH, VH)> = BTreeSet::new();
        for cycle in &faces {
            if cycle.len() < 3 {
                return Err(Error::DegenerateFace(cycle.len()));
            }
            let mut seen = BTreeSet::new();
            for v in cycle {
                if !self.has_vertex(*v) {
                    return Err(Error::VertexNotFound(*v));
                }
                if !seen.insert(*v) {
                    return Err(Error::RepeatedVertex(*v));
                }
            }
            for (a, b) in cycle_edges(cycle) {
                if !edges.insert((a, b)) {
                    return Err(Error::OpenCellShell(a, b));
                }
            }
            for triplet in face_triplets(cycle) {
                if self.halffaces.contains_key(&triplet) {
                    return Err(Error::NonManifoldHalfface(triplet));
                }
            }
        }
        // A closed oriented shell uses each directed edge once, with its
        // reverse used by another face of the same cell.
        for (a, b) in &edges {
            if !edges.contains(&(*b, *a)) {
                return Err(Error::OpenCellShell(*a, *b));
            }
        }
        let cells = &self.cells;
        let c = self.cell_alloc.allocate(key, |k| cells.contains_key(&k))?;
        for cycle in &faces {
            for triplet in face_triplets(cycle) {
                self.halffaces.insert(triplet, c);
            }
        }
        self.cells.insert(c, CellRecord { faces, attrs });
        Ok(c)
    }

    /// Delete a cell, unbinding its halffaces; vertices are left intact.
    pub fn delete_cell(&mut self, c: CH) -> Result<(), Error> {
        let rec = self.cells.remove(&c).ok_or(Error::CellNotFound(c))?;
        for cycle in &rec.faces {
            for triplet in face_triplets(cycle) {
                if self.halffaces.get(&triplet) == Some(&c) {
                    self.halffaces.remove(&triplet);
                }
            }
        }
        Ok(())
    }

    pub fn cell_faces(&self, c: CH) -> Result<&[Vec<VH>], Error> {
        self.cells
            .get(&c)
            .map(|rec| rec.faces.as_slice())
            .ok_or(Error::CellNotFound(c))
    }

    /// Distinct vertices of a cell, in ascending key order.
    pub fn cell_vertices(&self, c: CH) -> Result<Vec<VH>, Error> {
        let rec = self.cells.get(&c).ok_or(Error::CellNotFound(c))?;
        let keys: BTreeSet<VH> = rec.faces.iter().flatten().copied().collect();
        Ok(keys.into_iter().collect())
    }

    pub fn cell_degree(&self, c: CH) -> Result<usize, Error> {
        Ok(self.cell_faces(c)?.len())
    }

    /// Cells incident to a vertex, in ascending key order.
    pub fn vertex_cells(&self, v: VH) -> Result<Vec<CH>, Error> {
        if !self.has_vertex(v) {
            return Err(Error::VertexNotFound(v));
        }
        Ok(self
            .cells
            .iter()
            .filter_map(|(c, rec)| {
                rec.faces
                    .iter()
                    .any(|cycle| cycle.contains(&v))
                    .then_some(*c)
            })
            .collect())
    }

    /// Cells sharing a face with `c`, found through the reverse-oriented
    /// triplet bindings.
    pub fn cell_neighbors(&self, c: CH) -> Result<Vec<CH>, Error> {
        let rec = self.cells.get(&c).ok_or(Error::CellNotFound(c))?;
        let mut nbrs = BTreeSet::new();
        for cycle in &rec.faces {
            for [u, v, w] in face_triplets(cycle) {
                if let Some(other) = self.halffaces.get(&[w, v, u]) {
                    if *other != c {
                        nbrs.insert(*other);
                    }
                }
            }
        }
        Ok(nbrs.into_iter().collect())
    }

    /// A halfface lies on the boundary of the volume when no cell binds its
    /// opposite orientation.
    pub fn is_halfface_on_boundary(&self, cycle: &[VH]) -> bool {
        let reversed: Vec<VH> = cycle.iter().rev().copied().collect();
        face_triplets(&reversed).all(|triplet| !self.halffaces.contains_key(&triplet))
    }

    /// Cells with at least one boundary halfface, in ascending key order.
    pub fn cells_on_boundary(&self) -> Vec<CH> {
        self.cells
            .iter()
            .filter_map(|(c, rec)| {
                rec.faces
                    .iter()
                    .any(|cycle| self.is_halfface_on_boundary(cycle))
                    .then_some(*c)
            })
            .collect()
    }

    // Construction and export.

    /// Build a volmesh from positional vertex/cell lists; indices in `cells`
    /// are 0-based into `vertices` and become the keys `0..n`.
    pub fn from_vertices_and_cells(
        vertices: &[[f64; 3]],
        cells: &[Vec<Vec<usize>>],
    ) -> Result<Self, Error> {
        let mut volmesh = VolMesh::new();
        for point in vertices {
            volmesh.add_vertex_at(DVec3::from_array(*point))?;
        }
        for faces in cells {
            let faces: Vec<Vec<VH>> = faces
                .iter()
                .map(|cycle| {
                    cycle
                        .iter()
                        .map(|i| {
                            if *i < vertices.len() {
                                Ok(VH::from(*i as u64))
                            } else {
                                Err(Error::IndexOutOfRange(*i))
                            }
                        })
                        .collect()
                })
                .collect::<Result<_, _>>()?;
            volmesh.add_cell(faces, None, Attributes::new())?;
        }
        Ok(volmesh)
    }

    /// Export positional vertex/cell lists; cell entries index into the
    /// vertex list.
    pub fn to_vertices_and_cells(&self) -> (Vec<[f64; 3]>, Vec<Vec<Vec<usize>>>) {
        let index: BTreeMap<VH, usize> = self
            .vertices
            .keys()
            .enumerate()
            .map(|(i, v)| (*v, i))
            .collect();
        let vertices = self
            .vertices
            .values()
            .map(|rec| rec.point.to_array())
            .collect();
        let cells = self
            .cells
            .values()
            .map(|rec| {
                rec.faces
                    .iter()
                    .map(|cycle| cycle.iter().map(|v| index[v]).collect())
                    .collect()
            })
            .collect();
        (vertices, cells)
    }

    // Attributes.

    pub fn update_default_vertex_attributes(&mut self, defaults: Attributes) {
        self.default_vertex_attrs.update(defaults);
    }

    pub fn update_default_cell_attributes(&mut self, defaults: Attributes) {
        self.default_cell_attrs.update(defaults);
    }

    /// Read a vertex attribute; `x`, `y`, `z` read the position.
    pub fn vertex_attr(&self, v: VH, name: &str) -> Result<AttrValue, Error> {
        let rec = self.vertices.get(&v).ok_or(Error::VertexNotFound(v))?;
        match name {
            "x" => Ok(rec.point.x.into()),
            "y" => Ok(rec.point.y.into()),
            "z" => Ok(rec.point.z.into()),
            _ => self.default_vertex_attrs.resolve(&rec.attrs, name).cloned(),
        }
    }

    pub fn vertex_attrs_many(&self, v: VH, names: &[&str]) -> Result<Vec<AttrValue>, Error> {
        names.iter().map(|name| self.vertex_attr(v, name)).collect()
    }

    /// Write a vertex attribute; numeric writes to `x`, `y`, `z` move the
    /// vertex, non-numeric ones are ignored.
    pub fn set_vertex_attr(
        &mut self,
        v: VH,
        name: impl Into<String>,
        value: impl Into<AttrValue>,
    ) -> Result<(), Error> {
        let name = name.into();
        let value = value.into();
        let rec = self.vertices.get_mut(&v).ok_or(Error::VertexNotFound(v))?;
        match name.as_str() {
            "x" | "y" | "z" => {
                if let Some(x) = value.as_float() {
                    match name.as_str() {
                        "x" => rec.point.x = x,
                        "y" => rec.point.y = x,
                        _ => rec.point.z = x,
                    }
                } else {
                    debug!("ignoring non-numeric write to coordinate '{name}'");
                }
            }
            _ => rec.attrs.set(name, value),
        }
        Ok(())
    }

    pub fn set_vertex_attrs_many(&mut self, v: VH, attrs: Attributes) -> Result<(), Error> {
        for (name, value) in attrs.iter() {
            self.set_vertex_attr(v, name, value.clone())?;
        }
        Ok(())
    }

    pub fn cell_attr(&self, c: CH, name: &str) -> Result<AttrValue, Error> {
        let rec = self.cells.get(&c).ok_or(Error::CellNotFound(c))?;
        self.default_cell_attrs.resolve(&rec.attrs, name).cloned()
    }

    pub fn set_cell_attr(
        &mut self,
        c: CH,
        name: impl Into<String>,
        value: impl Into<AttrValue>,
    ) -> Result<(), Error> {
        self.cells
            .get_mut(&c)
            .ok_or(Error::CellNotFound(c))?
            .attrs
            .set(name, value);
        Ok(())
    }

    pub fn cell_attrs_many(&self, c: CH, names: &[&str]) -> Result<Vec<AttrValue>, Error> {
        names.iter().map(|name| self.cell_attr(c, name)).collect()
    }

    pub fn set_cell_attrs_many(&mut self, c: CH, attrs: Attributes) -> Result<(), Error> {
        self.cells
            .get_mut(&c)
            .ok_or(Error::CellNotFound(c))?
            .attrs
            .extend(attrs);
        Ok(())
    }

    pub fn vertices_where<'a, F>(&'a self, predicate: F) -> impl Iterator<Item = VH> + 'a
    where
        F: Fn(VH, AttrView<'a>) -> bool + 'a,
    {
        self.vertices.iter().filter_map(move |(v, rec)| {
            predicate(*v, AttrView::new(&rec.attrs, &self.default_vertex_attrs)).then_some(*v)
        })
    }

    pub fn cells_where<'a, F>(&'a self, predicate: F) -> impl Iterator<Item = CH> + 'a
    where
        F: Fn(CH, AttrView<'a>) -> bool + 'a,
    {
        self.cells.iter().filter_map(move |(c, rec)| {
            predicate(*c, AttrView::new(&rec.attrs, &self.default_cell_attrs)).then_some(*c)
        })
    }

    // Validation.

    /// Check every structural invariant: live vertex references, triplet
    /// bindings consistent with the cell records in both directions, closed
    /// shells, and allocator counters past every live key.
    pub fn is_valid(&self) -> bool {
        for rec in self.cells.values() {
            let mut edges: BTreeSet<(VH, VH)> = BTreeSet::new();
            for cycle in &rec.faces {
                if cycle.len() < 3 {
                    return false;
                }
                for v in cycle {
                    if !self.has_vertex(*v) {
                        return false;
                    }
                }
                for pair in cycle_edges(cycle) {
                    if !edges.insert(pair) {
                        return false;
                    }
                }
            }
            if edges.iter().any(|(a, b)| !edges.contains(&(*b, *a))) {
                return false;
            }
        }
        for (c, rec) in &self.cells {
            for cycle in &rec.faces {
                for triplet in face_triplets(cycle) {
                    if self.halffaces.get(&triplet) != Some(c) {
                        return false;
                    }
                }
            }
        }
        for c in self.halffaces.values() {
            if !self.cells.contains_key(c) {
                return false;
            }
        }
        let next = self.vertex_alloc.next_key();
        if self.vertices.keys().any(|v| v.index() >= next) {
            return false;
        }
        let next = self.cell_alloc.next_key();
        if self.cells.keys().any(|c| c.index() >= next) {
            return false;
        }
        true
    }
}

fn cycle_edges(cycle: &[VH]) -> impl Iterator<Item = (VH, VH)> + '_ {
    (0..cycle.len()).map(|i| (cycle[i], cycle[(i + 1) % cycle.len()]))
}

#[cfg(test)]
pub(crate) mod test {
    use super::VolMesh;
    use crate::{
        attributes::Attributes,
        element::{CH, VH},
        error::Error,
    };

    fn cube_faces(v: [u64; 8]) -> Vec<Vec<VH>> {
        let f = |ids: [u64; 4]| ids.iter().map(|i| VH::from(v[*i as usize])).collect();
        vec![
            f([0, 3, 2, 1]), // bottom
            f([4, 5, 6, 7]), // top
            f([0, 1, 5, 4]),
            f([1, 2, 6, 5]),
            f([2, 3, 7, 6]),
            f([3, 0, 4, 7]),
        ]
    }

    /// A single unit hexahedron.
    pub(crate) fn hexahedron() -> VolMesh {
        let vertices = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
            [0.0, 1.0, 1.0],
        ];
        let mut volmesh = VolMesh::new();
        for point in vertices {
            volmesh
                .add_vertex_at(point.into())
                .expect("Cannot add vertex");
        }
        volmesh
            .add_cell(cube_faces([0, 1, 2, 3, 4, 5, 6, 7]), None, Attributes::new())
            .expect("Cannot add cell");
        volmesh
    }

    /// Two hexahedra stacked in z, sharing the face `4,5,6,7`.
    pub(crate) fn two_hexahedra() -> VolMesh {
        let mut volmesh = hexahedron();
        for point in [
            [0.0, 0.0, 2.0],
            [1.0, 0.0, 2.0],
            [1.0, 1.0, 2.0],
            [0.0, 1.0, 2.0],
        ] {
            volmesh
                .add_vertex_at(point.into())
                .expect("Cannot add vertex");
        }
        volmesh
            .add_cell(cube_faces([4, 5, 6, 7, 8, 9, 10, 11]), None, Attributes::new())
            .expect("Cannot add cell");
        volmesh
    }

    #[test]
    fn t_hexahedron_counts_and_boundary() {
        let volmesh = hexahedron();
        assert_eq!(volmesh.number_of_vertices(), 8);
        assert_eq!(volmesh.number_of_cells(), 1);
        assert!(volmesh.is_valid());
        assert_eq!(volmesh.cells_on_boundary(), [CH::from(0)]);
        for cycle in volmesh.cell_faces(0.into()).expect("Missing cell") {
            assert!(volmesh.is_halfface_on_boundary(cycle));
        }
        assert_eq!(
            volmesh.cell_vertices(0.into()).expect("Missing cell"),
            (0..8u64).map(VH::from).collect::<Vec<_>>()
        );
        assert_eq!(volmesh.cell_degree(0.into()).expect("Missing cell"), 6);
        assert!(
            volmesh
                .cell_neighbors(0.into())
                .expect("Missing cell")
                .is_empty()
        );
    }

    #[test]
    fn t_two_cells_share_a_face() {
        let volmesh = two_hexahedra();
        assert!(volmesh.is_valid());
        assert_eq!(
            volmesh.cell_neighbors(0.into()).expect("Missing cell"),
            [CH::from(1)]
        );
        assert_eq!(
            volmesh.cell_neighbors(1.into()).expect("Missing cell"),
            [CH::from(0)]
        );
        // The shared face is interior seen from either side.
        let top: Vec<VH> = [4u64, 5, 6, 7].map(VH::from).to_vec();
        let bottom: Vec<VH> = [4u64, 7, 6, 5].map(VH::from).to_vec();
        assert!(!volmesh.is_halfface_on_boundary(&top));
        assert!(!volmesh.is_halfface_on_boundary(&bottom));
        assert_eq!(volmesh.cells_on_boundary(), [CH::from(0), CH::from(1)]);
        assert_eq!(
            volmesh.vertex_cells(5.into()).expect("Missing vertex"),
            [CH::from(0), CH::from(1)]
        );
    }

    #[test]
    fn t_open_shell_is_rejected() {
        let mut volmesh = hexahedron();
        // Five faces of a cube over fresh vertices leave the shell open.
        for point in [
            [2.0, 0.0, 0.0],
            [3.0, 0.0, 0.0],
            [3.0, 1.0, 0.0],
            [2.0, 1.0, 0.0],
            [2.0, 0.0, 1.0],
            [3.0, 0.0, 1.0],
            [3.0, 1.0, 1.0],
            [2.0, 1.0, 1.0],
        ] {
            volmesh
                .add_vertex_at(point.into())
                .expect("Cannot add vertex");
        }
        let mut faces = cube_faces([8, 9, 10, 11, 12, 13, 14, 15]);
        faces.pop();
        let result = volmesh.add_cell(faces, None, Attributes::new());
        assert!(matches!(result, Err(Error::OpenCellShell(..))));
        assert_eq!(volmesh.number_of_cells(), 1);
        assert!(volmesh.is_valid());
    }

    #[test]
    fn t_conflicting_halfface_is_rejected() {
        let mut volmesh = hexahedron();
        let faces = cube_faces([0, 1, 2, 3, 4, 5, 6, 7]);
        let result = volmesh.add_cell(faces, None, Attributes::new());
        assert!(matches!(result, Err(Error::NonManifoldHalfface(_))));
    }

    #[test]
    fn t_delete_cell_frees_its_halffaces() {
        let mut volmesh = two_hexahedra();
        volmesh.delete_cell(1.into()).expect("Cannot delete cell");
        assert_eq!(volmesh.number_of_cells(), 1);
        assert_eq!(volmesh.number_of_vertices(), 12);
        let top: Vec<VH> = [4u64, 5, 6, 7].map(VH::from).to_vec();
        assert!(volmesh.is_halfface_on_boundary(&top));
        assert!(volmesh.is_valid());
        // Deletion is terminal.
        assert_eq!(
            volmesh.delete_cell(1.into()),
            Err(Error::CellNotFound(1.into()))
        );
        // The shell can be rebuilt; auto keys never reuse the retired one.
        let c = volmesh
            .add_cell(
                cube_faces([4, 5, 6, 7, 8, 9, 10, 11]),
                None,
                Attributes::new(),
            )
            .expect("Cannot add cell");
        assert_eq!(c, CH::from(2));
    }

    #[test]
    fn t_delete_vertex_cascades_to_cells() {
        let mut volmesh = two_hexahedra();
        volmesh
            .delete_vertex(5.into())
            .expect("Cannot delete vertex");
        // Vertex 5 belongs to both cells.
        assert_eq!(volmesh.number_of_cells(), 0);
        assert_eq!(volmesh.number_of_vertices(), 11);
        assert!(volmesh.halfface_cell([4.into(), 5.into(), 6.into()]).is_none());
        assert!(volmesh.is_valid());
    }

    #[test]
    fn t_explicit_cell_key_and_collision() {
        let mut volmesh = hexahedron();
        volmesh.delete_cell(0.into()).expect("Cannot delete cell");
        let c = volmesh
            .add_cell(
                cube_faces([0, 1, 2, 3, 4, 5, 6, 7]),
                Some(40.into()),
                Attributes::new(),
            )
            .expect("Cannot add cell");
        assert_eq!(c, CH::from(40));
        assert_eq!(
            volmesh.add_cell(
                cube_faces([0, 1, 2, 3, 4, 5, 6, 7]),
                Some(40.into()),
                Attributes::new()
            ),
            Err(Error::KeyCollision(40))
        );
    }

    #[test]
    fn t_volmesh_round_trips_through_lists() {
        let volmesh = two_hexahedra();
        let (vertices, cells) = volmesh.to_vertices_and_cells();
        assert_eq!(vertices.len(), 12);
        assert_eq!(cells.len(), 2);
        let rebuilt =
            VolMesh::from_vertices_and_cells(&vertices, &cells).expect("Cannot rebuild");
        assert_eq!(rebuilt, volmesh);
    }

    #[test]
    fn t_cell_attributes_resolve_defaults() {
        let mut volmesh = hexahedron();
        volmesh.update_default_cell_attributes(Attributes::from_iter([("material", "concrete")]));
        assert_eq!(
            volmesh.cell_attr(0.into(), "material").expect("Missing attribute"),
            "concrete".into()
        );
        volmesh
            .set_cell_attr(0.into(), "material", "steel")
            .expect("Cannot set attribute");
        assert_eq!(
            volmesh.cell_attr(0.into(), "material").expect("Missing attribute"),
            "steel".into()
        );
        assert_eq!(
            volmesh.cells_where(|_, a| a.get("material") == Some(&"steel".into())).count(),
            1
        );
        assert_eq!(
            volmesh.vertex_attr(6.into(), "z").expect("Missing attribute"),
            1.0.into()
        );
    }

    #[test]
    fn t_batch_cell_attributes() {
        let mut volmesh = hexahedron();
        volmesh.update_default_cell_attributes(Attributes::from_iter([("material", "concrete")]));
        volmesh
            .set_cell_attrs_many(0.into(), Attributes::from_iter([("volume", 1.0)]))
            .expect("Cannot set attributes");
        assert_eq!(
            volmesh
                .cell_attrs_many(0.into(), &["material", "volume"])
                .expect("Missing attrs"),
            vec!["concrete".into(), 1.0.into()]
        );
        assert_eq!(
            volmesh.set_cell_attrs_many(9.into(), Attributes::new()),
            Err(Error::CellNotFound(9.into()))
        );
    }
}
