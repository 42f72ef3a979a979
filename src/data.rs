use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    attributes::{AttributeSchema, Attributes},
    element::{CH, FH, Handle, KeyAllocator, VH},
    error::Error,
    graph::Graph,
    mesh::{FaceRecord, Mesh, MeshMode, VertexRecord, cycle_pairs, edge_key},
    volmesh::{CellRecord, CellVertexRecord, VolMesh},
};

/// Serializable form of a [`Graph`].
///
/// Everything needed to reconstruct an equal graph is carried explicitly,
/// including the allocator counter, so keys retired before serialization
/// stay retired after a round trip.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: BTreeMap<VH, Attributes>,
    /// Directed edges in ascending `(u, v)` order.
    pub edges: Vec<(VH, VH, Attributes)>,
    pub default_node_attrs: AttributeSchema,
    pub default_edge_attrs: AttributeSchema,
    pub next_node_key: u64,
    pub auto_create_nodes: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VertexData {
    pub point: [f64; 3],
    #[serde(default)]
    pub attrs: Attributes,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceData {
    pub cycle: Vec<VH>,
    #[serde(default)]
    pub attrs: Attributes,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeAttrData {
    pub u: VH,
    pub v: VH,
    pub attrs: Attributes,
}

/// Serializable form of a [`Mesh`].
///
/// The halfedge table is carried verbatim rather than derived from the face
/// cycles: edges may outlive their faces, and in permissive mode a binding
/// records the *first* owner of a halfedge, which face order alone cannot
/// reproduce.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    pub vertices: BTreeMap<VH, VertexData>,
    pub halfedge: BTreeMap<VH, BTreeMap<VH, Option<FH>>>,
    pub faces: BTreeMap<FH, FaceData>,
    /// Attribute records of undirected edges, canonical `(min, max)` pairs.
    #[serde(default)]
    pub edge_attrs: Vec<EdgeAttrData>,
    pub default_vertex_attrs: AttributeSchema,
    pub default_edge_attrs: AttributeSchema,
    pub default_face_attrs: AttributeSchema,
    pub next_vertex_key: u64,
    pub next_face_key: u64,
    pub mode: MeshMode,
    #[serde(default)]
    pub nonmanifold: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellData {
    pub faces: Vec<Vec<VH>>,
    #[serde(default)]
    pub attrs: Attributes,
}

/// Serializable form of a [`VolMesh`]. The halfface table is derived from
/// the cell records on reconstruction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VolMeshData {
    pub vertices: BTreeMap<VH, VertexData>,
    pub cells: BTreeMap<CH, CellData>,
    pub default_vertex_attrs: AttributeSchema,
    pub default_cell_attrs: AttributeSchema,
    pub next_vertex_key: u64,
    pub next_cell_key: u64,
}

impl Graph {
    pub fn to_data(&self) -> GraphData {
        GraphData {
            nodes: self.nodes.clone(),
            edges: self
                .succ
                .iter()
                .flat_map(|(u, row)| row.iter().map(|(v, attrs)| (*u, *v, attrs.clone())))
                .collect(),
            default_node_attrs: self.default_node_attrs.clone(),
            default_edge_attrs: self.default_edge_attrs.clone(),
            next_node_key: self.node_alloc.next_key(),
            auto_create_nodes: self.auto_create_nodes,
        }
    }

    /// Reconstruct a graph equal to the one that produced `data`.
    pub fn from_data(data: GraphData) -> Result<Self, Error> {
        let mut graph = Graph::with_auto_create_nodes(false);
        for (node, attrs) in data.nodes {
            graph.add_node(Some(node), attrs)?;
        }
        for (u, v, attrs) in data.edges {
            graph.add_edge(u, v, attrs)?;
        }
        graph.default_node_attrs = data.default_node_attrs;
        graph.default_edge_attrs = data.default_edge_attrs;
        graph.auto_create_nodes = data.auto_create_nodes;
        let floor = graph.node_alloc.next_key();
        graph.node_alloc = KeyAllocator::from_next(data.next_node_key.max(floor));
        Ok(graph)
    }
}

impl Mesh {
    pub fn to_data(&self) -> MeshData {
        MeshData {
            vertices: self
                .vertices
                .iter()
                .map(|(v, rec)| {
                    (
                        *v,
                        VertexData {
                            point: rec.point.to_array(),
                            attrs: rec.attrs.clone(),
                        },
                    )
                })
                .collect(),
            halfedge: self.halfedge.clone(),
            faces: self
                .faces
                .iter()
                .map(|(f, rec)| {
                    (
                        *f,
                        FaceData {
                            cycle: rec.cycle.clone(),
                            attrs: rec.attrs.clone(),
                        },
                    )
                })
                .collect(),
            edge_attrs: self
                .edge_attrs
                .iter()
                .map(|((u, v), attrs)| EdgeAttrData {
                    u: *u,
                    v: *v,
                    attrs: attrs.clone(),
                })
                .collect(),
            default_vertex_attrs: self.default_vertex_attrs.clone(),
            default_edge_attrs: self.default_edge_attrs.clone(),
            default_face_attrs: self.default_face_attrs.clone(),
            next_vertex_key: self.vertex_alloc.next_key(),
            next_face_key: self.face_alloc.next_key(),
            mode: self.mode,
            nonmanifold: self.nonmanifold,
        }
    }

    /// Reconstruct a mesh equal to the one that produced `data`.
    ///
    /// The adjacency is validated before anything is committed: every
    /// halfedge must reference live vertices and have its reverse entry,
    /// every face binding must reference a face record, every cycle must
    /// have at least three live vertices with each consecutive pair
    /// recorded in the table, and every edge attribute record must sit on
    /// an existing edge.
    pub fn from_data(data: MeshData) -> Result<Self, Error> {
        for (u, row) in &data.halfedge {
            if !data.vertices.contains_key(u) {
                return Err(Error::VertexNotFound(*u));
            }
            for (v, f) in row {
                if !data.vertices.contains_key(v) {
                    return Err(Error::VertexNotFound(*v));
                }
                let reverse = data.halfedge.get(v).is_some_and(|row| row.contains_key(u));
                if !reverse {
                    return Err(Error::EdgeNotFound(*v, *u));
                }
                if let Some(f) = f {
                    if !data.faces.contains_key(f) {
                        return Err(Error::FaceNotFound(*f));
                    }
                }
            }
        }
        for rec in data.faces.values() {
            if rec.cycle.len() < 3 {
                return Err(Error::DegenerateFace(rec.cycle.len()));
            }
            for v in &rec.cycle {
                if !data.vertices.contains_key(v) {
                    return Err(Error::VertexNotFound(*v));
                }
            }
            // Every consecutive pair of the cycle must be recorded in the
            // halfedge table, or the mesh would arrive invalid.
            for (u, v) in cycle_pairs(&rec.cycle) {
                let present = data.halfedge.get(&u).is_some_and(|row| row.contains_key(&v));
                if !present {
                    return Err(Error::EdgeNotFound(u, v));
                }
            }
        }
        let mut mesh = Mesh::with_mode(data.mode);
        mesh.halfedge = data.halfedge;
        for (v, rec) in data.vertices {
            mesh.halfedge.entry(v).or_default();
            mesh.vertices.insert(
                v,
                VertexRecord {
                    point: rec.point.into(),
                    attrs: rec.attrs,
                },
            );
        }
        for (f, rec) in data.faces {
            mesh.faces.insert(
                f,
                FaceRecord {
                    cycle: rec.cycle,
                    attrs: rec.attrs,
                },
            );
        }
        for rec in data.edge_attrs {
            if !mesh.has_edge(rec.u, rec.v) {
                return Err(Error::EdgeNotFound(rec.u, rec.v));
            }
            mesh.edge_attrs.insert(edge_key(rec.u, rec.v), rec.attrs);
        }
        mesh.default_vertex_attrs = data.default_vertex_attrs;
        mesh.default_edge_attrs = data.default_edge_attrs;
        mesh.default_face_attrs = data.default_face_attrs;
        mesh.nonmanifold = data.nonmanifold;
        let floor = key_floor(mesh.vertices.keys());
        mesh.vertex_alloc = KeyAllocator::from_next(data.next_vertex_key.max(floor));
        let floor = key_floor(mesh.faces.keys());
        mesh.face_alloc = KeyAllocator::from_next(data.next_face_key.max(floor));
        Ok(mesh)
    }
}

impl VolMesh {
    pub fn to_data(&self) -> VolMeshData {
        VolMeshData {
            vertices: self
                .vertices
                .iter()
                .map(|(v, rec)| {
                    (
                        *v,
                        VertexData {
                            point: rec.point.to_array(),
                            attrs: rec.attrs.clone(),
                        },
                    )
                })
                .collect(),
            cells: self
                .cells
                .iter()
                .map(|(c, rec)| {
                    (
                        *c,
                        CellData {
                            faces: rec.faces.clone(),
                            attrs: rec.attrs.clone(),
                        },
                    )
                })
                .collect(),
            default_vertex_attrs: self.default_vertex_attrs.clone(),
            default_cell_attrs: self.default_cell_attrs.clone(),
            next_vertex_key: self.vertex_alloc.next_key(),
            next_cell_key: self.cell_alloc.next_key(),
        }
    }

    /// Reconstruct a volmesh equal to the one that produced `data`; the
    /// halfface bindings are rebuilt from the cell records through the same
    /// validation as [`VolMesh::add_cell`].
    pub fn from_data(data: VolMeshData) -> Result<Self, Error> {
        let mut volmesh = VolMesh::new();
        for (v, rec) in data.vertices {
            volmesh.vertex_alloc.claim(v);
            volmesh.vertices.insert(
                v,
                CellVertexRecord {
                    point: rec.point.into(),
                    attrs: rec.attrs,
                },
            );
        }
        for (c, rec) in data.cells {
            volmesh.add_cell(rec.faces, Some(c), rec.attrs)?;
        }
        volmesh.default_vertex_attrs = data.default_vertex_attrs;
        volmesh.default_cell_attrs = data.default_cell_attrs;
        let floor = volmesh.vertex_alloc.next_key();
        volmesh.vertex_alloc = KeyAllocator::from_next(data.next_vertex_key.max(floor));
        let floor = volmesh.cell_alloc.next_key();
        volmesh.cell_alloc = KeyAllocator::from_next(data.next_cell_key.max(floor));
        Ok(volmesh)
    }
}

fn key_floor<'a, H: Handle + 'a>(keys: impl Iterator<Item = &'a H>) -> u64 {
    keys.map(|k| k.index() + 1).max().unwrap_or_default()
}
