/*!
This is a key-addressed topology kernel for graphs, halfedge polygon meshes
and halfface polyhedral meshes, inspired by the datastructures of
[COMPAS](https://compas.dev/). Entities are identified by stable keys rather
than positional indices, so meshes can be mutated incrementally without
invalidating references held elsewhere.

# Overview

+ [`Graph`] is a directed edge-graph: nodes and at most one directed edge per
  ordered node pair, each carrying an attribute record.

+ [`Mesh`] is a halfedge polygon mesh built on the same keying scheme. Faces
  are ordered vertex cycles; every consecutive pair of cycle vertices binds a
  directed halfedge to the face, and the opposite halfedge belongs to the
  neighboring face or to the boundary. On top of the adjacency it provides
  Euler operators ([`Mesh::split_edge`], [`Mesh::collapse_edge`],
  [`Mesh::split_face`], [`Mesh::join_faces`]) and traversal queries (ordered
  vertex neighborhoods, boundary loops, edge loops and strips).

+ [`VolMesh`] takes the halfedge scheme one dimension up: cells are closed
  shells of face cycles, and every oriented vertex triplet of every face
  binds the owning cell.

+ All three structures carry per-entity attribute records resolved against
  instance-owned default templates, and convert to and from plain
  serializable forms ([`GraphData`], [`MeshData`], [`VolMeshData`]) with
  exact round-trip semantics, keys and allocator state included.

Vertex positions are first class: they live as [`glam::DVec3`] on the
structures and are exposed through the attribute API under the reserved
names `"x"`, `"y"` and `"z"`.
*/

mod attributes;
mod check;
mod collapse;
mod data;
mod edit;
mod element;
mod error;
mod graph;
mod iterator;
mod mesh;
mod volmesh;

pub use attributes::{AttrValue, AttrView, AttributeSchema, Attributes};
pub use data::{CellData, EdgeAttrData, FaceData, GraphData, MeshData, VertexData, VolMeshData};
pub use element::{CH, FH, Handle, VH};
pub use error::Error;
pub use graph::Graph;
pub use mesh::{Mesh, MeshMode};
pub use volmesh::VolMesh;
