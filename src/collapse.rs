use log::debug;
use std::collections::{BTreeMap, BTreeSet};

use crate::{
    attributes::Attributes,
    element::{FH, VH},
    error::Error,
    mesh::{FaceRecord, Mesh, cycle_pairs, edge_key},
};

impl Mesh {
    /// Check if it is safe to collapse the edge `(u, v)`.
    ///
    /// Two conditions must hold. The link condition: every vertex adjacent
    /// to both `u` and `v` must be the apex of a triangle incident to the
    /// edge, otherwise the collapse would fold distinct faces onto each
    /// other. The boundary condition: when both endpoints lie on the
    /// boundary, the edge itself must be a boundary edge, otherwise the
    /// collapse would merge two boundary components.
    pub fn check_edge_collapse(&self, u: VH, v: VH) -> Result<bool, Error> {
        let fu = self.halfedge_face(u, v)?;
        let fv = self.halfedge_face(v, u)?;
        if fu.is_some()
            && fv.is_some()
            && self.is_vertex_on_boundary(u)?
            && self.is_vertex_on_boundary(v)?
        {
            return Ok(false);
        }
        let mut allowed = BTreeSet::new();
        for f in [fu, fv].into_iter().flatten() {
            let cycle = self.face_vertices(f)?;
            if cycle.len() == 3 {
                for x in cycle {
                    if *x != u && *x != v {
                        allowed.insert(*x);
                    }
                }
            }
        }
        let nbrs_u: BTreeSet<VH> = self.vertex_neighbors(u, false)?.into_iter().collect();
        for w in self.vertex_neighbors(v, false)? {
            if w != u && nbrs_u.contains(&w) && !allowed.contains(&w) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Collapse the edge `(u, v)`, merging `v` into `u`.
    ///
    /// Faces reduced below three distinct vertices are deleted; the others
    /// are rewired in place, keeping their keys and attributes. `u` keeps
    /// its attribute record and position; attribute records of edges
    /// incident to `v` are dropped. Without `force` the collapse must pass
    /// [`Mesh::check_edge_collapse`], and even a forced collapse fails with
    /// [`Error::IllegalCollapse`] when the rewired faces cannot be bound
    /// consistently.
    pub fn collapse_edge(&mut self, u: VH, v: VH, force: bool) -> Result<(), Error> {
        if !self.has_edge(u, v) {
            return Err(Error::EdgeNotFound(u, v));
        }
        if !force && !self.check_edge_collapse(u, v)? {
            return Err(Error::IllegalCollapse(u, v));
        }
        let faces_v: BTreeSet<FH> = self.vertex_faces(v)?.into_iter().collect();
        let mut kept: BTreeMap<FH, Vec<VH>> = BTreeMap::new();
        let mut dropped = Vec::new();
        for f in &faces_v {
            let cycle = collapse_cycle(self.face_vertices(*f)?, v, u);
            if cycle.len() < 3 || !all_distinct(&cycle) {
                dropped.push(*f);
            } else {
                kept.insert(*f, cycle);
            }
        }
        // The rewired cycles must not claim a halfedge twice, nor one bound
        // to a face that is not being rewired.
        let mut claimed = BTreeSet::new();
        for cycle in kept.values() {
            for (a, b) in cycle_pairs(cycle) {
                if !claimed.insert((a, b)) {
                    return Err(Error::IllegalCollapse(u, v));
                }
                if let Some(Some(g)) = self.halfedge.get(&a).and_then(|row| row.get(&b)) {
                    if !faces_v.contains(g) {
                        return Err(Error::IllegalCollapse(u, v));
                    }
                }
            }
        }
        // Commit. Unbind every face around v, retire v and its edges, then
        // rebind the surviving faces under their original keys.
        let mut records: BTreeMap<FH, Attributes> = BTreeMap::new();
        for f in &faces_v {
            let rec = self.faces.remove(f).ok_or(Error::FaceNotFound(*f))?;
            for (a, b) in cycle_pairs(&rec.cycle) {
                if let Some(slot) = self.halfedge.get_mut(&a).and_then(|row| row.get_mut(&b)) {
                    if *slot == Some(*f) {
                        *slot = None;
                    }
                }
            }
            records.insert(*f, rec.attrs);
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
        for (f, cycle) in kept {
            for (a, b) in cycle_pairs(&cycle) {
                self.bind_halfedge(a, b, Some(f));
            }
            let attrs = records.remove(&f).unwrap_or_default();
            self.faces.insert(f, FaceRecord { cycle, attrs });
        }
        debug!(
            "collapsed edge ({u}, {v}); dropped {} degenerate faces",
            dropped.len()
        );
        Ok(())
    }
}

/// Replace `from` with `to` in a cycle and drop the duplicates this creates
/// at the seam.
fn collapse_cycle(cycle: &[VH], from: VH, to: VH) -> Vec<VH> {
    let mut out: Vec<VH> = Vec::with_capacity(cycle.len());
    for x in cycle {
        let x = if *x == from { to } else { *x };
        if out.last() != Some(&x) {
            out.push(x);
        }
    }
    while out.len() > 1 && out.first() == out.last() {
        out.pop();
    }
    out
}

fn all_distinct(cycle: &[VH]) -> bool {
    let mut seen = BTreeSet::new();
    cycle.iter().all(|x| seen.insert(*x))
}

#[cfg(test)]
mod test {
    use crate::{
        element::VH,
        error::Error,
        mesh::test::quad_grid,
    };

    #[test]
    fn t_collapse_interior_edge_of_grid() {
        let mut mesh = quad_grid(2);
        mesh.collapse_edge(4.into(), 1.into(), false)
            .expect("Cannot collapse edge");
        assert_eq!(mesh.number_of_vertices(), 8);
        assert_eq!(mesh.number_of_faces(), 4);
        assert_eq!(
            mesh.face_vertices(0.into()).expect("Missing face"),
            [VH::from(0), 4.into(), 3.into()]
        );
        assert_eq!(
            mesh.face_vertices(1.into()).expect("Missing face"),
            [VH::from(4), 2.into(), 5.into()]
        );
        assert_eq!(mesh.number_of_edges(), 11);
        assert!(mesh.is_valid());
        assert!(mesh.is_manifold());
    }

    #[test]
    fn t_collapse_keeps_target_attributes() {
        let mut mesh = quad_grid(2);
        mesh.set_vertex_attr(4.into(), "tag", 1.0)
            .expect("Cannot set attribute");
        mesh.set_vertex_attr(1.into(), "tag", 2.0)
            .expect("Cannot set attribute");
        let p4 = mesh.vertex_point(4.into()).expect("Missing vertex");
        mesh.collapse_edge(4.into(), 1.into(), false)
            .expect("Cannot collapse edge");
        assert_eq!(
            mesh.vertex_attr(4.into(), "tag").expect("Missing attribute"),
            1.0.into()
        );
        assert_eq!(mesh.vertex_point(4.into()).expect("Missing vertex"), p4);
        assert_eq!(
            mesh.vertex_attr(1.into(), "tag"),
            Err(Error::VertexNotFound(1.into()))
        );
    }

    #[test]
    fn t_collapse_across_two_boundaries_is_illegal() {
        let mut mesh = quad_grid(3);
        // Punch a hole in the middle; vertices 5 and 1 then lie on the two
        // distinct boundary loops while the edge between them is interior.
        let hole = mesh
            .halfedge_face(5.into(), 6.into())
            .expect("Missing halfedge")
            .expect("Expected an interior face");
        mesh.delete_face(hole).expect("Cannot delete face");
        assert_eq!(
            mesh.collapse_edge(1.into(), 5.into(), false),
            Err(Error::IllegalCollapse(1.into(), 5.into()))
        );
        // Nothing was mutated.
        assert_eq!(mesh.number_of_vertices(), 16);
        assert!(mesh.is_valid());
    }

    #[test]
    fn t_forced_collapse_pinches_the_mesh() {
        let mut mesh = quad_grid(3);
        let hole = mesh
            .halfedge_face(5.into(), 6.into())
            .expect("Missing halfedge")
            .expect("Expected an interior face");
        mesh.delete_face(hole).expect("Cannot delete face");
        mesh.collapse_edge(1.into(), 5.into(), true)
            .expect("Forced collapse must go through");
        assert_eq!(mesh.number_of_vertices(), 15);
        assert_eq!(mesh.number_of_faces(), 8);
        assert!(mesh.is_valid());
        assert!(!mesh.is_manifold());
    }

    #[test]
    fn t_collapse_missing_edge_fails() {
        let mut mesh = quad_grid(2);
        assert_eq!(
            mesh.collapse_edge(0.into(), 8.into(), false),
            Err(Error::EdgeNotFound(0.into(), 8.into()))
        );
    }
}
