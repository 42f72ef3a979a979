use log::debug;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::{
    attributes::{AttrValue, AttrView, AttributeSchema, Attributes},
    element::{Handle, KeyAllocator, VH},
    error::Error,
};

/// A directed edge-graph: nodes and directed edges between node pairs.
///
/// This is the foundation structure with no face concept. At most one edge
/// may exist per ordered node pair; `(u, v)` and `(v, u)` are two distinct
/// edges and may coexist. Nodes and edges carry attribute records resolved
/// against instance-owned default templates.
///
/// Iteration over nodes and edges is in ascending key order. Auto-allocated
/// keys are monotonic, so this coincides with insertion order unless the
/// caller supplies out-of-order explicit keys.
#[derive(Clone, Debug, PartialEq)]
pub struct Graph {
    pub(crate) nodes: BTreeMap<VH, Attributes>,
    pub(crate) succ: BTreeMap<VH, BTreeMap<VH, Attributes>>,
    pub(crate) pred: BTreeMap<VH, BTreeSet<VH>>,
    pub(crate) node_alloc: KeyAllocator,
    pub(crate) default_node_attrs: AttributeSchema,
    pub(crate) default_edge_attrs: AttributeSchema,
    pub(crate) auto_create_nodes: bool,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// A new graph with the reference behavior: adding an edge whose
    /// endpoints are missing creates them with default attributes.
    pub fn new() -> Self {
        Self::with_auto_create_nodes(true)
    }

    /// Choose whether `add_edge` creates missing endpoints or fails with
    /// [`Error::NodeNotFound`].
    pub fn with_auto_create_nodes(auto_create_nodes: bool) -> Self {
        Graph {
            nodes: BTreeMap::new(),
            succ: BTreeMap::new(),
            pred: BTreeMap::new(),
            node_alloc: KeyAllocator::new(),
            default_node_attrs: AttributeSchema::new(),
            default_edge_attrs: AttributeSchema::new(),
            auto_create_nodes,
        }
    }

    pub fn number_of_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn number_of_edges(&self) -> usize {
        self.succ.values().map(|row| row.len()).sum()
    }

    pub fn has_node(&self, node: VH) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn has_edge(&self, u: VH, v: VH) -> bool {
        self.succ.get(&u).is_some_and(|row| row.contains_key(&v))
    }

    pub fn nodes(&self) -> impl Iterator<Item = VH> + '_ {
        self.nodes.keys().copied()
    }

    pub fn edges(&self) -> impl Iterator<Item = (VH, VH)> + '_ {
        self.succ
            .iter()
            .flat_map(|(u, row)| row.keys().map(move |v| (*u, *v)))
    }

    /// Add a node, allocating a key unless one is supplied.
    pub fn add_node(&mut self, key: Option<VH>, attrs: Attributes) -> Result<VH, Error> {
        let nodes = &self.nodes;
        let node = self
            .node_alloc
            .allocate(key, |k| nodes.contains_key(&k))?;
        self.nodes.insert(node, attrs);
        self.succ.insert(node, BTreeMap::new());
        self.pred.insert(node, BTreeSet::new());
        Ok(node)
    }

    /// Add the directed edge `(u, v)`.
    ///
    /// Re-adding an existing edge overwrites its attributes; `(v, u)` is
    /// never implicitly created. Missing endpoints are created with default
    /// attributes when the graph was built with `auto_create_nodes`,
    /// otherwise the call fails with [`Error::NodeNotFound`].
    pub fn add_edge(&mut self, u: VH, v: VH, attrs: Attributes) -> Result<(VH, VH), Error> {
        for node in [u, v] {
            if !self.has_node(node) {
                if self.auto_create_nodes {
                    debug!("auto-creating node {node} for edge ({u}, {v})");
                    self.node_alloc.claim(node);
                    self.nodes.insert(node, Attributes::new());
                    self.succ.insert(node, BTreeMap::new());
                    self.pred.insert(node, BTreeSet::new());
                } else {
                    return Err(Error::NodeNotFound(node));
                }
            }
        }
        self.succ
            .get_mut(&u)
            .ok_or(Error::NodeNotFound(u))?
            .insert(v, attrs);
        self.pred
            .get_mut(&v)
            .ok_or(Error::NodeNotFound(v))?
            .insert(u);
        Ok((u, v))
    }

    /// Delete a node and every incident directed edge, in either direction.
    ///
    /// Deleting an absent or retired key fails with [`Error::NodeNotFound`];
    /// deletion is terminal for the key.
    pub fn delete_node(&mut self, node: VH) -> Result<(), Error> {
        if !self.has_node(node) {
            return Err(Error::NodeNotFound(node));
        }
        let out: Vec<VH> = self.succ.remove(&node).unwrap_or_default().into_keys().collect();
        for v in out {
            if let Some(preds) = self.pred.get_mut(&v) {
                preds.remove(&node);
            }
        }
        let inc: Vec<VH> = self.pred.remove(&node).unwrap_or_default().into_iter().collect();
        for u in &inc {
            if let Some(row) = self.succ.get_mut(u) {
                row.remove(&node);
            }
        }
        debug!("deleted node {node} and {} incoming edges", inc.len());
        self.nodes.remove(&node);
        Ok(())
    }

    /// Delete the directed edge `(u, v)`, leaving `(v, u)` untouched.
    ///
    /// Deleting an absent edge is a no-op.
    pub fn delete_edge(&mut self, u: VH, v: VH) {
        let removed = self
            .succ
            .get_mut(&u)
            .is_some_and(|row| row.remove(&v).is_some());
        if removed {
            if let Some(preds) = self.pred.get_mut(&v) {
                preds.remove(&u);
            }
        }
    }

    /// All nodes reachable from `node` over one incident edge, in either
    /// direction, in ascending key order.
    pub fn neighbors(&self, node: VH) -> Result<Vec<VH>, Error> {
        if !self.has_node(node) {
            return Err(Error::NodeNotFound(node));
        }
        let mut nbrs: BTreeSet<VH> = self
            .succ
            .get(&node)
            .map(|row| row.keys().copied().collect())
            .unwrap_or_default();
        if let Some(preds) = self.pred.get(&node) {
            nbrs.extend(preds.iter().copied());
        }
        Ok(nbrs.into_iter().collect())
    }

    pub fn degree(&self, node: VH) -> Result<usize, Error> {
        Ok(self.neighbors(node)?.len())
    }

    pub fn out_degree(&self, node: VH) -> Result<usize, Error> {
        self.succ
            .get(&node)
            .map(|row| row.len())
            .ok_or(Error::NodeNotFound(node))
    }

    pub fn in_degree(&self, node: VH) -> Result<usize, Error> {
        self.pred
            .get(&node)
            .map(|preds| preds.len())
            .ok_or(Error::NodeNotFound(node))
    }

    /// True iff an undirected breadth-first traversal from any node reaches
    /// all nodes. The empty graph is not connected.
    pub fn is_connected(&self) -> bool {
        let start = match self.nodes.keys().next() {
            Some(n) => *n,
            None => return false,
        };
        let mut seen = BTreeSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(n) = queue.pop_front() {
            for nbr in self.neighbors(n).unwrap_or_default() {
                if seen.insert(nbr) {
                    queue.push_back(nbr);
                }
            }
        }
        seen.len() == self.nodes.len()
    }

    // Attribute access.

    pub fn update_default_node_attributes(&mut self, defaults: Attributes) {
        self.default_node_attrs.update(defaults);
    }

    pub fn update_default_edge_attributes(&mut self, defaults: Attributes) {
        self.default_edge_attrs.update(defaults);
    }

    pub fn node_attr(&self, node: VH, name: &str) -> Result<AttrValue, Error> {
        let record = self.nodes.get(&node).ok_or(Error::NodeNotFound(node))?;
        self.default_node_attrs.resolve(record, name).cloned()
    }

    pub fn node_attrs_many(&self, node: VH, names: &[&str]) -> Result<Vec<AttrValue>, Error> {
        names.iter().map(|name| self.node_attr(node, name)).collect()
    }

    pub fn set_node_attr(
        &mut self,
        node: VH,
        name: impl Into<String>,
        value: impl Into<AttrValue>,
    ) -> Result<(), Error> {
        self.nodes
            .get_mut(&node)
            .ok_or(Error::NodeNotFound(node))?
            .set(name, value);
        Ok(())
    }

    pub fn set_node_attrs_many(&mut self, node: VH, attrs: Attributes) -> Result<(), Error> {
        self.nodes
            .get_mut(&node)
            .ok_or(Error::NodeNotFound(node))?
            .extend(attrs);
        Ok(())
    }

    pub fn edge_attr(&self, u: VH, v: VH, name: &str) -> Result<AttrValue, Error> {
        let record = self
            .succ
            .get(&u)
            .and_then(|row| row.get(&v))
            .ok_or(Error::EdgeNotFound(u, v))?;
        self.default_edge_attrs.resolve(record, name).cloned()
    }

    pub fn set_edge_attr(
        &mut self,
        u: VH,
        v: VH,
        name: impl Into<String>,
        value: impl Into<AttrValue>,
    ) -> Result<(), Error> {
        self.succ
            .get_mut(&u)
            .and_then(|row| row.get_mut(&v))
            .ok_or(Error::EdgeNotFound(u, v))?
            .set(name, value);
        Ok(())
    }

    pub fn edge_attrs_many(&self, u: VH, v: VH, names: &[&str]) -> Result<Vec<AttrValue>, Error> {
        names.iter().map(|name| self.edge_attr(u, v, name)).collect()
    }

    pub fn set_edge_attrs_many(&mut self, u: VH, v: VH, attrs: Attributes) -> Result<(), Error> {
        self.succ
            .get_mut(&u)
            .and_then(|row| row.get_mut(&v))
            .ok_or(Error::EdgeNotFound(u, v))?
            .extend(attrs);
        Ok(())
    }

    /// Nodes whose resolved attributes satisfy the predicate, lazily, in
    /// ascending key order.
    pub fn nodes_where<'a, F>(&'a self, predicate: F) -> impl Iterator<Item = VH> + 'a
    where
        F: Fn(VH, AttrView<'a>) -> bool + 'a,
    {
        self.nodes.iter().filter_map(move |(node, record)| {
            predicate(*node, AttrView::new(record, &self.default_node_attrs)).then_some(*node)
        })
    }

    /// Directed edges whose resolved attributes satisfy the predicate.
    pub fn edges_where<'a, F>(&'a self, predicate: F) -> impl Iterator<Item = (VH, VH)> + 'a
    where
        F: Fn((VH, VH), AttrView<'a>) -> bool + 'a,
    {
        self.succ
            .iter()
            .flat_map(|(u, row)| row.iter().map(move |(v, record)| (*u, *v, record)))
            .filter(move |(u, v, record)| {
                predicate((*u, *v), AttrView::new(record, &self.default_edge_attrs))
            })
            .map(|(u, v, _)| (u, v))
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::Graph;
    use crate::{attributes::Attributes, element::VH, error::Error};

    pub(crate) fn path_graph(n: u64) -> Graph {
        let mut graph = Graph::new();
        for _ in 0..n {
            graph
                .add_node(None, Attributes::new())
                .expect("Cannot add node");
        }
        for i in 0..n.saturating_sub(1) {
            graph
                .add_edge(i.into(), (i + 1).into(), Attributes::new())
                .expect("Cannot add edge");
        }
        graph
    }

    #[test]
    fn t_add_nodes_and_edges() {
        let graph = path_graph(4);
        assert_eq!(graph.number_of_nodes(), 4);
        assert_eq!(graph.number_of_edges(), 3);
        assert!(graph.has_edge(0.into(), 1.into()));
        assert!(!graph.has_edge(1.into(), 0.into()));
    }

    #[test]
    fn t_directed_pairs_are_distinct() {
        let mut graph = path_graph(2);
        graph
            .add_edge(1.into(), 0.into(), Attributes::new())
            .expect("Cannot add reverse edge");
        assert_eq!(graph.number_of_edges(), 2);
        graph.delete_edge(0.into(), 1.into());
        assert!(!graph.has_edge(0.into(), 1.into()));
        assert!(graph.has_edge(1.into(), 0.into()));
    }

    #[test]
    fn t_auto_create_nodes() {
        let mut graph = Graph::new();
        graph
            .add_edge(3.into(), 7.into(), Attributes::new())
            .expect("Cannot add edge with missing endpoints");
        assert_eq!(graph.number_of_nodes(), 2);
        // Auto keys stay clear of the claimed explicit keys.
        let next = graph
            .add_node(None, Attributes::new())
            .expect("Cannot add node");
        assert_eq!(next, 8.into());
    }

    #[test]
    fn t_strict_mode_rejects_missing_endpoints() {
        let mut graph = Graph::with_auto_create_nodes(false);
        let err = graph
            .add_edge(0.into(), 1.into(), Attributes::new())
            .expect_err("Expected missing node error");
        assert_eq!(err, Error::NodeNotFound(0.into()));
    }

    #[test]
    fn t_delete_node_cascades_both_directions() {
        let mut graph = path_graph(3);
        graph
            .add_edge(2.into(), 1.into(), Attributes::new())
            .expect("Cannot add edge");
        graph.delete_node(1.into()).expect("Cannot delete node");
        assert_eq!(graph.number_of_nodes(), 2);
        assert_eq!(graph.number_of_edges(), 0);
        // Deletion is terminal.
        assert_eq!(
            graph.delete_node(1.into()),
            Err(Error::NodeNotFound(1.into()))
        );
    }

    #[test]
    fn t_delete_edge_is_a_noop_when_absent() {
        let mut graph = path_graph(2);
        graph.delete_edge(1.into(), 0.into());
        assert_eq!(graph.number_of_edges(), 1);
    }

    #[test]
    fn t_readding_edge_overwrites_attributes() {
        let mut graph = path_graph(2);
        graph
            .add_edge(
                0.into(),
                1.into(),
                Attributes::from_iter([("weight", 2.0)]),
            )
            .expect("Cannot re-add edge");
        assert_eq!(graph.number_of_edges(), 1);
        assert_eq!(
            graph
                .edge_attr(0.into(), 1.into(), "weight")
                .expect("Missing edge attribute"),
            2.0.into()
        );
    }

    #[test]
    fn t_neighbors_union_of_directions() {
        let mut graph = path_graph(3);
        graph
            .add_edge(2.into(), 0.into(), Attributes::new())
            .expect("Cannot add edge");
        assert_eq!(
            graph.neighbors(0.into()).expect("Missing node"),
            vec![VH::from(1), VH::from(2)]
        );
        assert_eq!(graph.in_degree(0.into()).expect("Missing node"), 1);
        assert_eq!(graph.out_degree(0.into()).expect("Missing node"), 1);
    }

    #[test]
    fn t_connectivity() {
        let mut graph = path_graph(4);
        assert!(graph.is_connected());
        graph
            .add_node(None, Attributes::new())
            .expect("Cannot add node");
        assert!(!graph.is_connected());
        assert!(!Graph::new().is_connected());
    }

    #[test]
    fn t_node_attribute_defaults() {
        let mut graph = path_graph(2);
        graph.update_default_node_attributes(Attributes::from_iter([("load", 0.0)]));
        assert_eq!(
            graph
                .node_attr(0.into(), "load")
                .expect("Missing default"),
            0.0.into()
        );
        graph
            .set_node_attr(0.into(), "load", 5.0)
            .expect("Cannot set attribute");
        assert_eq!(
            graph.node_attr(0.into(), "load").expect("Missing override"),
            5.0.into()
        );
        assert_eq!(
            graph.node_attr(1.into(), "load").expect("Missing default"),
            0.0.into()
        );
        assert_eq!(
            graph.node_attr(0.into(), "nope"),
            Err(Error::AttributeNotFound("nope".to_string()))
        );
    }

    #[test]
    fn t_batch_edge_attributes() {
        let mut graph = path_graph(3);
        graph.update_default_edge_attributes(Attributes::from_iter([("weight", 1.0)]));
        graph
            .set_edge_attrs_many(0.into(), 1.into(), Attributes::from_iter([("label", "a")]))
            .expect("Cannot set attributes");
        assert_eq!(
            graph
                .edge_attrs_many(0.into(), 1.into(), &["weight", "label"])
                .expect("Missing attrs"),
            vec![1.0.into(), "a".into()]
        );
        // Edges are directed; the reverse pair has no record.
        assert_eq!(
            graph.edge_attrs_many(1.into(), 0.into(), &["weight"]),
            Err(Error::EdgeNotFound(1.into(), 0.into()))
        );
    }

    #[test]
    fn t_filter_nodes_by_attribute() {
        let mut graph = path_graph(3);
        graph.update_default_node_attributes(Attributes::from_iter([("fixed", false)]));
        graph
            .set_node_attr(1.into(), "fixed", true)
            .expect("Cannot set attribute");
        let fixed: Vec<_> = graph
            .nodes_where(|_, attrs| attrs.get("fixed").and_then(|v| v.as_bool()) == Some(true))
            .collect();
        assert_eq!(fixed, vec![VH::from(1)]);
    }
}
