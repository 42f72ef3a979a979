use log::debug;
use std::collections::BTreeSet;

use crate::{
    element::{FH, VH},
    error::Error,
    mesh::{Mesh, cycle_pairs},
};

impl Mesh {
    /// Split the edge `(u, v)` with a new vertex at parameter `t` from `u`.
    ///
    /// Both adjacent face cycles (either side may be boundary) are rewired
    /// to include the new vertex, preserving orientation. The caller can
    /// override the interpolated position and attributes afterwards. The old
    /// edge attribute record is dropped with the edge.
    pub fn split_edge(&mut self, u: VH, v: VH, t: f64) -> Result<VH, Error> {
        let fu = self.halfedge_face(u, v)?;
        let fv = self.halfedge_face(v, u)?;
        let pu = self.vertex_point(u)?;
        let pv = self.vertex_point(v)?;
        let w = self.add_vertex_at(pu.lerp(pv, t))?;
        self.remove_edge_entries(u, v);
        self.bind_halfedge(u, w, fu);
        self.bind_halfedge(w, v, fu);
        self.bind_halfedge(v, w, fv);
        self.bind_halfedge(w, u, fv);
        if let Some(f) = fu {
            self.insert_in_cycle(f, u, w)?;
        }
        if let Some(f) = fv {
            self.insert_in_cycle(f, v, w)?;
        }
        debug!("split edge ({u}, {v}) at t={t} with vertex {w}");
        Ok(w)
    }

    /// Split the edge at its midpoint.
    pub fn insert_vertex_on_edge(&mut self, u: VH, v: VH) -> Result<VH, Error> {
        self.split_edge(u, v, 0.5)
    }

    fn insert_in_cycle(&mut self, f: FH, after: VH, w: VH) -> Result<(), Error> {
        let rec = self.faces.get_mut(&f).ok_or(Error::FaceNotFound(f))?;
        let i = rec
            .cycle
            .iter()
            .position(|x| *x == after)
            .ok_or(Error::VertexNotFound(after))?;
        rec.cycle.insert(i + 1, w);
        Ok(())
    }

    /// Split a face along the chord from `u` to `v`.
    ///
    /// Both vertices must lie on the face cycle and must not be consecutive.
    /// The face is replaced by two faces sharing the new chord edge, each
    /// carrying a copy of the original attributes. Returns the two new face
    /// keys, the one containing the cycle from `u` to `v` first.
    pub fn split_face(&mut self, f: FH, u: VH, v: VH) -> Result<(FH, FH), Error> {
        let cycle = self.face_vertices(f)?.to_vec();
        let n = cycle.len();
        let i = cycle
            .iter()
            .position(|x| *x == u)
            .ok_or(Error::InvalidChord(f, u, v))?;
        let j = cycle
            .iter()
            .position(|x| *x == v)
            .ok_or(Error::InvalidChord(f, u, v))?;
        if i == j || (i + 1) % n == j || (j + 1) % n == i {
            return Err(Error::InvalidChord(f, u, v));
        }
        // The chord must not conflict with an existing bound halfedge.
        if self.has_edge(u, v)
            && (self.halfedge_face(u, v)?.is_some() || self.halfedge_face(v, u)?.is_some())
        {
            return Err(Error::NonManifoldHalfedge(u, v));
        }
        let mut first = Vec::with_capacity(n);
        let mut k = i;
        loop {
            first.push(cycle[k]);
            if k == j {
                break;
            }
            k = (k + 1) % n;
        }
        let mut second = Vec::with_capacity(n);
        let mut k = j;
        loop {
            second.push(cycle[k]);
            if k == i {
                break;
            }
            k = (k + 1) % n;
        }
        let attrs = self
            .faces
            .get(&f)
            .ok_or(Error::FaceNotFound(f))?
            .attrs
            .clone();
        self.delete_face(f)?;
        let f1 = self.add_face(&first, None, attrs.clone())?;
        let f2 = self.add_face(&second, None, attrs)?;
        debug!("split face {f} into {f1} and {f2} along ({u}, {v})");
        Ok((f1, f2))
    }

    /// Join two faces sharing exactly one edge into one face.
    ///
    /// The shared edge disappears entirely; the merged face keeps the
    /// attributes of `f` under a fresh key.
    pub fn join_faces(&mut self, f: FH, g: FH) -> Result<FH, Error> {
        if !self.is_face(g) {
            return Err(Error::FaceNotFound(g));
        }
        let f_cycle = self.face_vertices(f)?.to_vec();
        let shared: Vec<(VH, VH)> = cycle_pairs(&f_cycle)
            .filter(|(u, v)| {
                self.halfedge_face(*v, *u).ok().flatten() == Some(g)
            })
            .collect();
        let (u, v) = match shared.as_slice() {
            [pair] => *pair,
            _ => return Err(Error::FacesNotAdjacent(f, g)),
        };
        let g_cycle = self.face_vertices(g)?.to_vec();
        // f's cycle from v around to u, then g's interior from u to v.
        let mut merged = rotate_to(&f_cycle, v).ok_or(Error::FacesNotAdjacent(f, g))?;
        let g_rot = rotate_to(&g_cycle, u).ok_or(Error::FacesNotAdjacent(f, g))?;
        merged.extend_from_slice(&g_rot[1..g_rot.len() - 1]);
        let mut seen = BTreeSet::new();
        for x in &merged {
            if !seen.insert(*x) {
                return Err(Error::RepeatedVertex(*x));
            }
        }
        let attrs = self
            .faces
            .get(&f)
            .ok_or(Error::FaceNotFound(f))?
            .attrs
            .clone();
        self.delete_face(f)?;
        self.delete_face(g)?;
        self.remove_edge_entries(u, v);
        let joined = self.add_face(&merged, None, attrs)?;
        debug!("joined faces {f} and {g} across ({u}, {v}) into {joined}");
        Ok(joined)
    }
}

fn rotate_to(cycle: &[VH], start: VH) -> Option<Vec<VH>> {
    let i = cycle.iter().position(|x| *x == start)?;
    let mut out = Vec::with_capacity(cycle.len());
    out.extend_from_slice(&cycle[i..]);
    out.extend_from_slice(&cycle[..i]);
    Some(out)
}

#[cfg(test)]
mod test {
    use crate::{
        element::VH,
        error::Error,
        mesh::test::{quad, quad_grid},
    };
    use glam::DVec3;

    #[test]
    fn t_split_boundary_edge_of_quad() {
        // Scenario B.
        let mut mesh = quad();
        let w = mesh
            .split_edge(0.into(), 1.into(), 0.5)
            .expect("Cannot split edge");
        assert_eq!(w, 4.into());
        assert_eq!(
            mesh.face_vertices(0.into()).expect("Missing face"),
            [VH::from(0), 4.into(), 1.into(), 2.into(), 3.into()]
        );
        assert_eq!(mesh.number_of_vertices(), 5);
        assert_eq!(mesh.number_of_edges(), 5);
        assert_eq!(
            mesh.vertex_point(w).expect("Missing vertex"),
            DVec3::new(0.5, 0.0, 0.0)
        );
        assert!(mesh.is_valid());
        assert!(!mesh.has_edge(0.into(), 1.into()));
    }

    #[test]
    fn t_split_interior_edge_updates_both_faces() {
        let mut mesh = quad_grid(2);
        let w = mesh
            .split_edge(4.into(), 1.into(), 0.25)
            .expect("Cannot split edge");
        assert_eq!(
            mesh.face_vertices(0.into()).expect("Missing face"),
            // f0 was [0, 1, 4, 3]; w lands between 1 and 4.
            [VH::from(0), 1.into(), w, 4.into(), 3.into()]
        );
        assert_eq!(
            mesh.face_vertices(1.into()).expect("Missing face"),
            // f1 was [1, 2, 5, 4]; w lands between 4 and 1.
            [VH::from(1), 2.into(), 5.into(), 4.into(), w]
        );
        assert_eq!(
            mesh.vertex_point(w).expect("Missing vertex"),
            DVec3::new(1.0, 0.75, 0.0)
        );
        assert!(mesh.is_valid());
        assert!(mesh.is_manifold());
    }

    #[test]
    fn t_split_missing_edge_fails() {
        let mut mesh = quad();
        assert_eq!(
            mesh.split_edge(0.into(), 2.into(), 0.5),
            Err(Error::EdgeNotFound(0.into(), 2.into()))
        );
    }

    #[test]
    fn t_split_face_along_chord() {
        let mut mesh = quad();
        let (f1, f2) = mesh
            .split_face(0.into(), 0.into(), 2.into())
            .expect("Cannot split face");
        assert_eq!(
            mesh.face_vertices(f1).expect("Missing face"),
            [VH::from(0), 1.into(), 2.into()]
        );
        assert_eq!(
            mesh.face_vertices(f2).expect("Missing face"),
            [VH::from(2), 3.into(), 0.into()]
        );
        assert_eq!(mesh.number_of_faces(), 2);
        assert_eq!(mesh.number_of_edges(), 5);
        assert!(mesh.is_valid());
        assert!(mesh.is_manifold());
    }

    #[test]
    fn t_split_face_rejects_adjacent_chord() {
        let mut mesh = quad();
        assert_eq!(
            mesh.split_face(0.into(), 0.into(), 1.into()),
            Err(Error::InvalidChord(0.into(), 0.into(), 1.into()))
        );
        assert_eq!(mesh.number_of_faces(), 1);
    }

    #[test]
    fn t_join_faces_restores_the_quad() {
        let mut mesh = quad();
        let (f1, f2) = mesh
            .split_face(0.into(), 0.into(), 2.into())
            .expect("Cannot split face");
        let joined = mesh.join_faces(f1, f2).expect("Cannot join faces");
        assert_eq!(mesh.number_of_faces(), 1);
        assert_eq!(mesh.number_of_edges(), 4);
        // The cycle is the quad again, up to rotation.
        let cycle = mesh.face_vertices(joined).expect("Missing face");
        assert_eq!(cycle.len(), 4);
        assert!(mesh.is_valid());
        assert!(!mesh.has_edge(0.into(), 2.into()));
    }

    #[test]
    fn t_join_faces_requires_a_shared_edge() {
        let mut mesh = quad_grid(2);
        assert_eq!(
            mesh.join_faces(0.into(), 3.into()),
            Err(Error::FacesNotAdjacent(0.into(), 3.into()))
        );
    }
}
