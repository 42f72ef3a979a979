use std::collections::{BTreeSet, VecDeque};

use crate::{
    element::Handle,
    iterator,
    mesh::{Mesh, MeshMode, cycle_pairs, edge_key},
};

impl Mesh {
    /// Structural consistency of the whole mesh.
    ///
    /// Checks that every face cycle has length three or more over live
    /// vertices, that its halfedges are bound back to it, that every directed
    /// entry has its reverse, that bindings point at live faces listing the
    /// pair consecutively, and that the allocators are ahead of every live
    /// key. Linear in the entity counts, and stable between mutations.
    pub fn is_valid(&self) -> bool {
        for (f, rec) in &self.faces {
            if rec.cycle.len() < 3 {
                return false;
            }
            for (u, v) in cycle_pairs(&rec.cycle) {
                if !self.has_vertex(u) {
                    return false;
                }
                match self.halfedge.get(&u).and_then(|row| row.get(&v)) {
                    None => return false,
                    Some(Some(g)) if g == f => {}
                    // Permissive meshes may record a face whose halfedge is
                    // owned elsewhere.
                    Some(_) if self.mode == MeshMode::Permissive => {}
                    Some(_) => return false,
                }
            }
        }
        for (u, v, f) in self.halfedges() {
            if !self.has_vertex(u) || !self.has_vertex(v) || u == v {
                return false;
            }
            if !self.has_edge(v, u) {
                return false;
            }
            if let Some(g) = f {
                let bound = self
                    .faces
                    .get(&g)
                    .is_some_and(|rec| cycle_pairs(&rec.cycle).any(|pair| pair == (u, v)));
                if !bound {
                    return false;
                }
            }
        }
        for (u, v) in self.edge_attrs.keys() {
            if !self.has_edge(*u, *v) || edge_key(*u, *v) != (*u, *v) {
                return false;
            }
        }
        let next_v = self.vertex_alloc.next_key();
        let next_f = self.face_alloc.next_key();
        self.vertices.keys().all(|v| v.index() < next_v)
            && self.faces.keys().all(|f| f.index() < next_f)
    }

    /// True when every edge is used by at most two faces and every vertex
    /// carries a single closed or single open fan of faces.
    pub fn is_manifold(&self) -> bool {
        if self.nonmanifold {
            return false;
        }
        for (v, row) in &self.halfedge {
            let free = row.values().filter(|f| f.is_none()).count();
            if free > 1 {
                return false;
            }
            match iterator::vertex_neighbors_ordered(self, *v) {
                Ok(nbrs) if nbrs.len() == row.len() => {}
                _ => return false,
            }
        }
        true
    }

    /// True when no halfedge is free.
    pub fn is_closed(&self) -> bool {
        self.halfedges().all(|(_, _, f)| f.is_some())
    }

    /// True iff an undirected breadth-first traversal from any vertex
    /// reaches all vertices. The empty mesh is not connected.
    pub fn is_connected(&self) -> bool {
        let start = match self.vertices.keys().next() {
            Some(v) => *v,
            None => return false,
        };
        let mut seen = BTreeSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(v) = queue.pop_front() {
            if let Some(row) = self.halfedge.get(&v) {
                for w in row.keys() {
                    if seen.insert(*w) {
                        queue.push_back(*w);
                    }
                }
            }
        }
        seen.len() == self.vertices.len()
    }

    /// True when every face is a triangle (vacuously true when empty).
    pub fn is_trimesh(&self) -> bool {
        self.faces.values().all(|rec| rec.cycle.len() == 3)
    }

    /// True when every face is a quad (vacuously true when empty).
    pub fn is_quadmesh(&self) -> bool {
        self.faces.values().all(|rec| rec.cycle.len() == 4)
    }
}

#[cfg(test)]
mod test {
    use crate::{
        attributes::Attributes,
        mesh::{
            Mesh,
            test::{quad, quad_box, quad_grid},
        },
    };

    #[test]
    fn t_box_predicates() {
        let mesh = quad_box();
        assert!(mesh.is_valid());
        assert!(mesh.is_manifold());
        assert!(mesh.is_closed());
        assert!(mesh.is_connected());
        assert!(mesh.is_quadmesh());
        assert!(!mesh.is_trimesh());
    }

    #[test]
    fn t_grid_is_open_but_manifold() {
        let mesh = quad_grid(2);
        assert!(mesh.is_valid());
        assert!(mesh.is_manifold());
        assert!(!mesh.is_closed());
        assert!(mesh.is_connected());
    }

    #[test]
    fn t_empty_mesh() {
        let mesh = Mesh::new();
        assert!(mesh.is_valid());
        assert!(!mesh.is_connected());
        assert!(mesh.is_closed());
    }

    #[test]
    fn t_two_components_are_disconnected() {
        let mut mesh = quad();
        for xyz in [[5.0, 0.0, 0.0], [6.0, 0.0, 0.0], [6.0, 1.0, 0.0]] {
            mesh.add_vertex_at(glam::DVec3::from_array(xyz))
                .expect("Cannot add vertex");
        }
        mesh.add_face(&[4.into(), 5.into(), 6.into()], None, Attributes::new())
            .expect("Cannot add face");
        assert!(mesh.is_valid());
        assert!(!mesh.is_connected());
    }

    #[test]
    fn t_bowtie_vertex_is_not_manifold() {
        // Two triangles sharing only vertex 2.
        let mesh = Mesh::from_vertices_and_faces(
            &[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.5, 1.0, 0.0],
                [0.0, 2.0, 0.0],
                [1.0, 2.0, 0.0],
            ],
            &[vec![0, 1, 2], vec![2, 3, 4]],
        )
        .expect("Cannot build bowtie");
        assert!(mesh.is_valid());
        assert!(!mesh.is_manifold());
    }

    #[test]
    fn t_predicates_are_stable_between_mutations() {
        let mut mesh = quad_grid(2);
        mesh.delete_face(0.into()).expect("Cannot delete face");
        let first = (mesh.is_valid(), mesh.is_manifold(), mesh.is_closed());
        let second = (mesh.is_valid(), mesh.is_manifold(), mesh.is_closed());
        assert_eq!(first, second);
        assert!(first.0);
    }
}
