use glam::DVec3;
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::{
    attributes::{AttrValue, AttrView, AttributeSchema, Attributes},
    element::{FH, KeyAllocator, VH},
    error::Error,
    iterator,
};

/// How the mesh treats a halfedge that a new face wants to bind while it is
/// already bound elsewhere.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeshMode {
    /// Reject the face with [`Error::NonManifoldHalfedge`].
    #[default]
    Strict,
    /// Record the face but keep the first owner of the halfedge; the
    /// condition is flagged through `is_manifold() == false`.
    Permissive,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct VertexRecord {
    pub(crate) point: DVec3,
    pub(crate) attrs: Attributes,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct FaceRecord {
    pub(crate) cycle: Vec<VH>,
    pub(crate) attrs: Attributes,
}

/// A halfedge polygon mesh.
///
/// Vertices, faces and their attribute records are addressed by stable keys;
/// an undirected edge is identified by its vertex pair, and each of its two
/// halfedges `(u, v)` and `(v, u)` is bound to at most one face. A face is an
/// ordered vertex cycle (length >= 3); the cycle direction fixes the normal
/// convention, and for each consecutive pair `(u, v)` the halfedge `(u, v)`
/// is bound to that face.
///
/// Iteration over vertices, edges and faces is in ascending key order, which
/// coincides with insertion order for auto-allocated keys.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    pub(crate) vertices: BTreeMap<VH, VertexRecord>,
    pub(crate) halfedge: BTreeMap<VH, BTreeMap<VH, Option<FH>>>,
    pub(crate) faces: BTreeMap<FH, FaceRecord>,
    pub(crate) edge_attrs: BTreeMap<(VH, VH), Attributes>,
    pub(crate) vertex_alloc: KeyAllocator,
    pub(crate) face_alloc: KeyAllocator,
    pub(crate) default_vertex_attrs: AttributeSchema,
    pub(crate) default_edge_attrs: AttributeSchema,
    pub(crate) default_face_attrs: AttributeSchema,
    pub(crate) mode: MeshMode,
    pub(crate) nonmanifold: bool,
}

/// Canonical identity of an undirected edge.
pub(crate) fn edge_key(u: VH, v: VH) -> (VH, VH) {
    if u <= v { (u, v) } else { (v, u) }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

impl Mesh {
    pub fn new() -> Self {
        Self::with_mode(MeshMode::Strict)
    }

    pub fn with_mode(mode: MeshMode) -> Self {
        Mesh {
            vertices: BTreeMap::new(),
            halfedge: BTreeMap::new(),
            faces: BTreeMap::new(),
            edge_attrs: BTreeMap::new(),
            vertex_alloc: KeyAllocator::new(),
            face_alloc: KeyAllocator::new(),
            default_vertex_attrs: AttributeSchema::new(),
            default_edge_attrs: AttributeSchema::new(),
            default_face_attrs: AttributeSchema::new(),
            mode,
            nonmanifold: false,
        }
    }

    pub fn mode(&self) -> MeshMode {
        self.mode
    }

    pub fn number_of_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of undirected edges.
    pub fn number_of_edges(&self) -> usize {
        // Both directed entries of an edge are always present together.
        self.halfedge.values().map(|row| row.len()).sum::<usize>() / 2
    }

    pub fn number_of_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// `V - E + F`.
    pub fn euler(&self) -> i64 {
        self.number_of_vertices() as i64 - self.number_of_edges() as i64
            + self.number_of_faces() as i64
    }

    pub fn vertices(&self) -> impl Iterator<Item = VH> + '_ {
        self.vertices.keys().copied()
    }

    pub fn faces(&self) -> impl Iterator<Item = FH> + '_ {
        self.faces.keys().copied()
    }

    /// Undirected edges as canonical `(min, max)` pairs.
    pub fn edges(&self) -> impl Iterator<Item = (VH, VH)> + '_ {
        self.halfedge.iter().flat_map(|(u, row)| {
            row.keys().filter_map(move |v| (*u < *v).then_some((*u, *v)))
        })
    }

    /// All directed halfedges with their face bindings.
    pub fn halfedges(&self) -> impl Iterator<Item = (VH, VH, Option<FH>)> + '_ {
        self.halfedge
            .iter()
            .flat_map(|(u, row)| row.iter().map(move |(v, f)| (*u, *v, *f)))
    }

    pub fn has_vertex(&self, v: VH) -> bool {
        self.vertices.contains_key(&v)
    }

    pub fn is_face(&self, f: FH) -> bool {
        self.faces.contains_key(&f)
    }

    pub fn has_edge(&self, u: VH, v: VH) -> bool {
        self.halfedge.get(&u).is_some_and(|row| row.contains_key(&v))
    }

    /// The face bound to the directed halfedge `(u, v)`, or `None` when the
    /// halfedge is free (on the boundary).
    pub fn halfedge_face(&self, u: VH, v: VH) -> Result<Option<FH>, Error> {
        self.halfedge
            .get(&u)
            .and_then(|row| row.get(&v))
            .copied()
            .ok_or(Error::EdgeNotFound(u, v))
    }

    // Vertices.

    /// Add a vertex, allocating a key unless one is supplied.
    ///
    /// The reserved attribute names `x`, `y`, `z` in `attrs` seed the vertex
    /// position; everything else lands in the override record.
    pub fn add_vertex(&mut self, key: Option<VH>, attrs: Attributes) -> Result<VH, Error> {
        let vertices = &self.vertices;
        let v = self
            .vertex_alloc
            .allocate(key, |k| vertices.contains_key(&k))?;
        let (point, attrs) = split_coordinates(attrs);
        self.vertices.insert(v, VertexRecord { point, attrs });
        self.halfedge.insert(v, BTreeMap::new());
        Ok(v)
    }

    /// Add a vertex at a position.
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

    /// Delete a vertex, every face incident to it, and every incident edge.
    ///
    /// The resulting hole is left open. Deleting a retired key fails with
    /// [`Error::VertexNotFound`]; deletion is terminal.
    pub fn delete_vertex(&mut self, v: VH) -> Result<(), Error> {
        if !self.has_vertex(v) {
            return Err(Error::VertexNotFound(v));
        }
        // Scan face cycles rather than halfedge bindings: in permissive
        // mode a face can reference `v` without owning any halfedge at it.
        let incident: Vec<FH> = self
            .faces
            .iter()
            .filter(|(_, rec)| rec.cycle.contains(&v))
            .map(|(f, _)| *f)
            .collect();
        debug!("deleting vertex {v} cascades to {} faces", incident.len());
        for f in incident {
            self.delete_face(f)?;
        }
        let nbrs: Vec<VH> = self
            .halfedge
            .remove(&v)
            .unwrap_or_default()
            .into_keys()
            .collect();
        for w in nbrs {
            if let Some(row) = self.halfedge.get_mut(&w) {
                row.remove(&v);
            }
            self.edge_attrs.remove(&edge_key(v, w));
        }
        self.vertices.remove(&v);
        Ok(())
    }

    // Faces.

    /// Add a face as an ordered vertex cycle of length >= 3.
    ///
    /// Validation happens before any adjacency is touched: every vertex must
    /// be live, no vertex may repeat in the cycle, and in [`MeshMode::Strict`]
    /// every consecutive halfedge must be free. In [`MeshMode::Permissive`] a
    /// bound halfedge keeps its first owner and the mesh is flagged
    /// non-manifold.
    pub fn add_face(
        &mut self,
        vertices: &[VH],
        key: Option<FH>,
        attrs: Attributes,
    ) -> Result<FH, Error> {
        if vertices.len() < 3 {
            return Err(Error::DegenerateFace(vertices.len()));
        }
        let mut seen = BTreeSet::new();
        for v in vertices {
            if !self.has_vertex(*v) {
                return Err(Error::VertexNotFound(*v));
            }
            if !seen.insert(*v) {
                return Err(Error::RepeatedVertex(*v));
            }
        }
        let mut skip = Vec::new();
        for (u, v) in cycle_pairs(vertices) {
            if let Some(Some(_)) = self.halfedge.get(&u).and_then(|row| row.get(&v)) {
                match self.mode {
                    MeshMode::Strict => return Err(Error::NonManifoldHalfedge(u, v)),
                    MeshMode::Permissive => {
                        debug!("halfedge ({u}, {v}) already bound, keeping first owner");
                        skip.push((u, v));
                    }
                }
            }
        }
        let faces = &self.faces;
        let f = self.face_alloc.allocate(key, |k| faces.contains_key(&k))?;
        // Commit.
        if !skip.is_empty() {
            self.nonmanifold = true;
        }
        self.faces.insert(
            f,
            FaceRecord {
                cycle: vertices.to_vec(),
                attrs,
            },
        );
        for (u, v) in cycle_pairs(vertices) {
            if !skip.contains(&(u, v)) {
                self.bind_halfedge(u, v, Some(f));
            }
        }
        Ok(f)
    }

    /// Bind the directed halfedge `(u, v)` and make sure the reverse entry
    /// exists, free if it was absent.
    pub(crate) fn bind_halfedge(&mut self, u: VH, v: VH, f: Option<FH>) {
        self.halfedge.entry(u).or_default().insert(v, f);
        self.halfedge.entry(v).or_default().entry(u).or_insert(None);
    }

    /// Remove both directed entries of the edge `(u, v)`, with its record.
    pub(crate) fn remove_edge_entries(&mut self, u: VH, v: VH) {
        if let Some(row) = self.halfedge.get_mut(&u) {
            row.remove(&v);
        }
        if let Some(row) = self.halfedge.get_mut(&v) {
            row.remove(&u);
        }
        self.edge_attrs.remove(&edge_key(u, v));
    }

    /// Delete a face, freeing its halfedges. Vertices and edges survive and
    /// may now lie on the boundary.
    pub fn delete_face(&mut self, f: FH) -> Result<(), Error> {
        let cycle = self
            .faces
            .get(&f)
            .map(|rec| rec.cycle.clone())
            .ok_or(Error::FaceNotFound(f))?;
        for (u, v) in cycle_pairs(&cycle) {
            if let Some(slot) = self.halfedge.get_mut(&u).and_then(|row| row.get_mut(&v)) {
                if *slot == Some(f) {
                    *slot = None;
                }
            }
        }
        self.faces.remove(&f);
        Ok(())
    }

    /// The stored vertex cycle of a face.
    pub fn face_vertices(&self, f: FH) -> Result<&[VH], Error> {
        self.faces
            .get(&f)
            .map(|rec| rec.cycle.as_slice())
            .ok_or(Error::FaceNotFound(f))
    }

    /// The consecutive halfedges of a face cycle.
    pub fn face_halfedges(&self, f: FH) -> Result<Vec<(VH, VH)>, Error> {
        Ok(cycle_pairs(self.face_vertices(f)?).collect())
    }

    /// The vertex after `v` in the face cycle.
    pub fn face_vertex_successor(&self, f: FH, v: VH) -> Result<VH, Error> {
        let cycle = self.face_vertices(f)?;
        let i = cycle
            .iter()
            .position(|w| *w == v)
            .ok_or(Error::VertexNotFound(v))?;
        Ok(cycle[(i + 1) % cycle.len()])
    }

    /// The vertex before `v` in the face cycle.
    pub fn face_vertex_ancestor(&self, f: FH, v: VH) -> Result<VH, Error> {
        let cycle = self.face_vertices(f)?;
        let i = cycle
            .iter()
            .position(|w| *w == v)
            .ok_or(Error::VertexNotFound(v))?;
        Ok(cycle[(i + cycle.len() - 1) % cycle.len()])
    }

    pub fn face_degree(&self, f: FH) -> Result<usize, Error> {
        Ok(self.face_vertices(f)?.len())
    }

    pub fn vertex_degree(&self, v: VH) -> Result<usize, Error> {
        self.halfedge
            .get(&v)
            .map(|row| row.len())
            .ok_or(Error::VertexNotFound(v))
    }

    /// Neighbors of a vertex.
    ///
    /// Unordered, the halfedge-map row in ascending key order. With
    /// `ordered`, a single rotational walk around the vertex starting from
    /// the smallest-key boundary neighbor when one exists; the result is
    /// partial when the rotation cannot close around a non-manifold fan.
    pub fn vertex_neighbors(&self, v: VH, ordered: bool) -> Result<Vec<VH>, Error> {
        if ordered {
            iterator::vertex_neighbors_ordered(self, v)
        } else {
            self.halfedge
                .get(&v)
                .map(|row| row.keys().copied().collect())
                .ok_or(Error::VertexNotFound(v))
        }
    }

    /// Distinct faces incident to a vertex, in ascending key order.
    pub fn vertex_faces(&self, v: VH) -> Result<Vec<FH>, Error> {
        let row = self.halfedge.get(&v).ok_or(Error::VertexNotFound(v))?;
        let faces: BTreeSet<FH> = row.values().flatten().copied().collect();
        Ok(faces.into_iter().collect())
    }

    /// Faces sharing an edge with `f`, in ascending key order.
    pub fn face_neighbors(&self, f: FH) -> Result<Vec<FH>, Error> {
        let mut nbrs = BTreeSet::new();
        for (u, v) in self.face_halfedges(f)? {
            if let Some(g) = self.halfedge_face(v, u)? {
                if g != f {
                    nbrs.insert(g);
                }
            }
        }
        Ok(nbrs.into_iter().collect())
    }

    /// The faces on either side of an edge.
    pub fn edge_faces(&self, u: VH, v: VH) -> Result<(Option<FH>, Option<FH>), Error> {
        Ok((self.halfedge_face(u, v)?, self.halfedge_face(v, u)?))
    }

    /// The average of the face's vertex positions.
    pub fn face_centroid(&self, f: FH) -> Result<DVec3, Error> {
        let cycle = self.face_vertices(f)?;
        let mut sum = DVec3::ZERO;
        for v in cycle {
            sum += self.vertex_point(*v)?;
        }
        Ok(sum / cycle.len() as f64)
    }

    /// The midpoint of an edge.
    pub fn edge_midpoint(&self, u: VH, v: VH) -> Result<DVec3, Error> {
        if !self.has_edge(u, v) {
            return Err(Error::EdgeNotFound(u, v));
        }
        Ok((self.vertex_point(u)? + self.vertex_point(v)?) * 0.5)
    }

    // Construction and export.

    /// Build a mesh from positional data; vertex `i` gets key `i`.
    pub fn from_vertices_and_faces(
        vertices: &[[f64; 3]],
        faces: &[Vec<usize>],
    ) -> Result<Self, Error> {
        let mut mesh = Mesh::new();
        for xyz in vertices {
            mesh.add_vertex_at(DVec3::from_array(*xyz))?;
        }
        for cycle in faces {
            let cycle: Vec<VH> = cycle
                .iter()
                .map(|i| {
                    if *i < vertices.len() {
                        Ok(VH::from(*i as u64))
                    } else {
                        Err(Error::IndexOutOfRange(*i))
                    }
                })
                .collect::<Result<_, _>>()?;
            mesh.add_face(&cycle, None, Attributes::new())?;
        }
        Ok(mesh)
    }

    /// Flat positional lists for renderers and exporters.
    ///
    /// With `triangulate`, n-gons are fan-triangulated from their first
    /// cycle vertex; otherwise they are preserved.
    pub fn to_vertices_and_faces(&self, triangulate: bool) -> (Vec<[f64; 3]>, Vec<Vec<usize>>) {
        let index: BTreeMap<VH, usize> = self
            .vertices
            .keys()
            .enumerate()
            .map(|(i, v)| (*v, i))
            .collect();
        let points = self
            .vertices
            .values()
            .map(|rec| rec.point.to_array())
            .collect();
        let mut faces = Vec::with_capacity(self.faces.len());
        for rec in self.faces.values() {
            let cycle: Vec<usize> = rec.cycle.iter().map(|v| index[v]).collect();
            if triangulate && cycle.len() > 3 {
                for (a, b) in cycle[1..].iter().copied().tuple_windows() {
                    faces.push(vec![cycle[0], a, b]);
                }
            } else {
                faces.push(cycle);
            }
        }
        (points, faces)
    }

    // Attribute access.

    pub fn update_default_vertex_attributes(&mut self, defaults: Attributes) {
        self.default_vertex_attrs.update(defaults);
    }

    pub fn update_default_edge_attributes(&mut self, defaults: Attributes) {
        self.default_edge_attrs.update(defaults);
    }

    pub fn update_default_face_attributes(&mut self, defaults: Attributes) {
        self.default_face_attrs.update(defaults);
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

    pub fn face_attr(&self, f: FH, name: &str) -> Result<AttrValue, Error> {
        let rec = self.faces.get(&f).ok_or(Error::FaceNotFound(f))?;
        self.default_face_attrs.resolve(&rec.attrs, name).cloned()
    }

    pub fn set_face_attr(
        &mut self,
        f: FH,
        name: impl Into<String>,
        value: impl Into<AttrValue>,
    ) -> Result<(), Error> {
        self.faces
            .get_mut(&f)
            .ok_or(Error::FaceNotFound(f))?
            .attrs
            .set(name, value);
        Ok(())
    }

    pub fn face_attrs_many(&self, f: FH, names: &[&str]) -> Result<Vec<AttrValue>, Error> {
        names.iter().map(|name| self.face_attr(f, name)).collect()
    }

    pub fn set_face_attrs_many(&mut self, f: FH, attrs: Attributes) -> Result<(), Error> {
        for (name, value) in attrs.iter() {
            self.set_face_attr(f, name, value.clone())?;
        }
        Ok(())
    }

    /// Read an edge attribute; the edge is identified by its unordered pair.
    pub fn edge_attr(&self, u: VH, v: VH, name: &str) -> Result<AttrValue, Error> {
        if !self.has_edge(u, v) {
            return Err(Error::EdgeNotFound(u, v));
        }
        self.edge_attrs
            .get(&edge_key(u, v))
            .and_then(|record| record.get(name))
            .or_else(|| self.default_edge_attrs.default_value(name))
            .cloned()
            .ok_or_else(|| Error::AttributeNotFound(name.to_string()))
    }

    pub fn set_edge_attr(
        &mut self,
        u: VH,
        v: VH,
        name: impl Into<String>,
        value: impl Into<AttrValue>,
    ) -> Result<(), Error> {
        if !self.has_edge(u, v) {
            return Err(Error::EdgeNotFound(u, v));
        }
        self.edge_attrs
            .entry(edge_key(u, v))
            .or_default()
            .set(name, value);
        Ok(())
    }

    pub fn edge_attrs_many(&self, u: VH, v: VH, names: &[&str]) -> Result<Vec<AttrValue>, Error> {
        names.iter().map(|name| self.edge_attr(u, v, name)).collect()
    }

    pub fn set_edge_attrs_many(&mut self, u: VH, v: VH, attrs: Attributes) -> Result<(), Error> {
        for (name, value) in attrs.iter() {
            self.set_edge_attr(u, v, name, value.clone())?;
        }
        Ok(())
    }

    /// Vertices whose resolved attributes satisfy the predicate, lazily, in
    /// ascending key order. Coordinates are not visible to the view; test
    /// them through [`Mesh::vertex_point`].
    pub fn vertices_where<'a, F>(&'a self, predicate: F) -> impl Iterator<Item = VH> + 'a
    where
        F: Fn(VH, AttrView<'a>) -> bool + 'a,
    {
        self.vertices.iter().filter_map(move |(v, rec)| {
            predicate(*v, AttrView::new(&rec.attrs, &self.default_vertex_attrs)).then_some(*v)
        })
    }

    pub fn faces_where<'a, F>(&'a self, predicate: F) -> impl Iterator<Item = FH> + 'a
    where
        F: Fn(FH, AttrView<'a>) -> bool + 'a,
    {
        self.faces.iter().filter_map(move |(f, rec)| {
            predicate(*f, AttrView::new(&rec.attrs, &self.default_face_attrs)).then_some(*f)
        })
    }
}

/// Consecutive cyclic pairs of a cycle.
pub(crate) fn cycle_pairs(cycle: &[VH]) -> impl Iterator<Item = (VH, VH)> + '_ {
    (0..cycle.len()).map(|i| (cycle[i], cycle[(i + 1) % cycle.len()]))
}

pub(crate) fn split_coordinates(mut attrs: Attributes) -> (DVec3, Attributes) {
    let mut point = DVec3::ZERO;
    for (name, coord) in [("x", 0), ("y", 1), ("z", 2)] {
        if let Some(value) = attrs.unset(name) {
            if let Some(x) = value.as_float() {
                point[coord] = x;
            }
        }
    }
    (point, attrs)
}
