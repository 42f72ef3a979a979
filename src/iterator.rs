use std::collections::{BTreeMap, BTreeSet};

use crate::{
    element::{FH, VH},
    error::Error,
    mesh::Mesh,
};

/// Neighbors of `v` collected in a single rotational pass.
///
/// The walk starts from the smallest-key neighbor whose incoming halfedge
/// `(w, v)` is free when the vertex is on the boundary, else from the
/// smallest-key neighbor, and steps from neighbor to neighbor through the
/// face bound to `(v, w)`. On a non-manifold fan the rotation cannot close
/// and the result is the partial fan reachable from the start.
pub(crate) fn vertex_neighbors_ordered(mesh: &Mesh, v: VH) -> Result<Vec<VH>, Error> {
    let row = mesh.halfedge.get(&v).ok_or(Error::VertexNotFound(v))?;
    if row.is_empty() {
        return Ok(Vec::new());
    }
    let start = row
        .keys()
        .find(|w| mesh.halfedge[w].get(&v) == Some(&None))
        .or_else(|| row.keys().next())
        .copied()
        .ok_or(Error::VertexNotFound(v))?;
    let mut nbrs = vec![start];
    let mut w = start;
    for _ in 0..row.len() {
        let f = match row.get(&w) {
            Some(Some(f)) => *f,
            _ => break,
        };
        w = mesh.face_vertex_ancestor(f, v)?;
        if w == start {
            break;
        }
        nbrs.push(w);
    }
    Ok(nbrs)
}

impl Mesh {
    /// True when the vertex has a free incident halfedge, or no incident
    /// halfedge at all.
    pub fn is_vertex_on_boundary(&self, v: VH) -> Result<bool, Error> {
        let row = self.halfedge.get(&v).ok_or(Error::VertexNotFound(v))?;
        Ok(row.is_empty() || row.values().any(|f| f.is_none()))
    }

    /// True when either halfedge of the edge is free.
    pub fn is_edge_on_boundary(&self, u: VH, v: VH) -> Result<bool, Error> {
        Ok(self.halfedge_face(u, v)?.is_none() || self.halfedge_face(v, u)?.is_none())
    }

    pub fn vertices_on_boundary(&self) -> Vec<VH> {
        self.vertices()
            .filter(|v| self.is_vertex_on_boundary(*v).unwrap_or(false))
            .collect()
    }

    pub fn faces_on_boundary(&self) -> Vec<FH> {
        self.faces
            .iter()
            .filter_map(|(f, rec)| {
                crate::mesh::cycle_pairs(&rec.cycle)
                    .any(|(u, v)| self.is_edge_on_boundary(u, v).unwrap_or(false))
                    .then_some(*f)
            })
            .collect()
    }

    /// The boundary of the mesh as ordered vertex cycles.
    ///
    /// Each loop follows the free halfedges, so it winds opposite to the
    /// faces it borders. Loops are reported starting from their smallest
    /// vertex, smallest start first.
    pub fn boundary_loops(&self) -> Vec<Vec<VH>> {
        let mut free: BTreeMap<VH, BTreeSet<VH>> = BTreeMap::new();
        for (u, v, f) in self.halfedges() {
            if f.is_none() {
                free.entry(u).or_default().insert(v);
            }
        }
        let mut loops = Vec::new();
        while let Some((&start, _)) = free.iter().find(|(_, targets)| !targets.is_empty()) {
            let mut cycle = vec![start];
            let mut current = start;
            loop {
                let next = match free.get_mut(&current).and_then(|targets| targets.pop_first()) {
                    Some(next) => next,
                    None => break,
                };
                if next == start {
                    break;
                }
                cycle.push(next);
                current = next;
            }
            loops.push(cycle);
        }
        loops
    }

    /// The edge loop through `(u, v)`.
    ///
    /// The loop continues straight through interior vertices of degree four
    /// and stops at any other vertex or at the boundary. Edges are reported
    /// in walking order from one end; a closed loop starts at `(u, v)`.
    pub fn edge_loop(&self, u: VH, v: VH) -> Result<Vec<(VH, VH)>, Error> {
        if !self.has_edge(u, v) {
            return Err(Error::EdgeNotFound(u, v));
        }
        let (forward, closed) = self.walk_loop(u, v)?;
        if closed {
            return Ok(forward);
        }
        let (backward, _) = self.walk_loop(v, u)?;
        let mut edges: Vec<(VH, VH)> = backward
            .into_iter()
            .skip(1)
            .map(|(a, b)| (b, a))
            .rev()
            .collect();
        edges.extend(forward);
        Ok(edges)
    }

    fn walk_loop(&self, u: VH, v: VH) -> Result<(Vec<(VH, VH)>, bool), Error> {
        let mut edges = vec![(u, v)];
        let (mut a, mut b) = (u, v);
        loop {
            let next = if self.is_vertex_on_boundary(b)? {
                // A boundary loop continues through regular (valence 3)
                // boundary vertices along the next boundary edge; an
                // interior loop ends at the boundary.
                if !self.is_edge_on_boundary(a, b)? || self.vertex_degree(b)? != 3 {
                    return Ok((edges, false));
                }
                let mut targets = self
                    .vertex_neighbors(b, false)?
                    .into_iter()
                    .filter(|w| *w != a);
                match targets.find(|w| self.is_edge_on_boundary(b, *w).unwrap_or(false)) {
                    Some(w) => w,
                    None => return Ok((edges, false)),
                }
            } else {
                if self.vertex_degree(b)? != 4 {
                    return Ok((edges, false));
                }
                let ordered = vertex_neighbors_ordered(self, b)?;
                let i = ordered
                    .iter()
                    .position(|w| *w == a)
                    .ok_or(Error::EdgeNotFound(a, b))?;
                ordered[(i + 2) % 4]
            };
            (a, b) = (b, next);
            if (a, b) == (u, v) {
                return Ok((edges, true));
            }
            edges.push((a, b));
        }
    }

    /// The edge strip through `(u, v)`: parallel edges reached by crossing
    /// quads through their opposite edge, extended in both directions until
    /// a boundary or a non-quad face.
    pub fn edge_strip(&self, u: VH, v: VH) -> Result<Vec<(VH, VH)>, Error> {
        if !self.has_edge(u, v) {
            return Err(Error::EdgeNotFound(u, v));
        }
        let (forward, closed) = self.walk_strip(u, v)?;
        if closed {
            return Ok(forward);
        }
        let (backward, _) = self.walk_strip(v, u)?;
        let mut edges: Vec<(VH, VH)> = backward
            .into_iter()
            .skip(1)
            .map(|(a, b)| (b, a))
            .rev()
            .collect();
        edges.extend(forward);
        Ok(edges)
    }

    fn walk_strip(&self, u: VH, v: VH) -> Result<(Vec<(VH, VH)>, bool), Error> {
        let mut edges = vec![(u, v)];
        let (mut a, mut b) = (u, v);
        loop {
            let f = match self.halfedge_face(a, b)? {
                Some(f) if self.face_degree(f)? == 4 => f,
                _ => return Ok((edges, false)),
            };
            let w = self.face_vertex_successor(f, b)?;
            let x = self.face_vertex_successor(f, w)?;
            (a, b) = (x, w);
            if (a, b) == (u, v) {
                return Ok((edges, true));
            }
            edges.push((a, b));
        }
    }
}
