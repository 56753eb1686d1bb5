use std::collections::{HashMap, HashSet};

use bevy::prelude::*;

use crate::assignment::{AssignmentMatrix, IncidenceMatrix};
use crate::error::{EntityRef, NetworkError};

use super::tags::merge_tags;
use super::types::*;

/// What a relation member points at once resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberTarget<'a> {
    Node(&'a Node),
    /// Every edge cut from the referenced way, in edge order.
    Way(Vec<&'a Edge>),
    Relation(&'a Relation),
}

/// The road network: sole owner of nodes, edges and relations.
///
/// Entities live in insertion-ordered arenas with id → index maps. Nodes refer
/// to edges (and edges to nodes) by id only, so removing an entity never
/// leaves a dangling borrow; the cleanup passes rewrite adjacency lists and
/// rebuild the indices.
///
/// The graph also caches the artifacts derived from it (shortest paths,
/// incidence and assignment matrices). Any structural change drops them.
#[derive(Resource, Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    relations: Vec<Relation>,
    node_index: HashMap<NodeId, usize>,
    edge_index: HashMap<EdgeId, usize>,
    relation_index: HashMap<RelationId, usize>,
    pub(super) od_pairs: Vec<OdPair>,
    pub(super) shortest_paths: Option<Vec<Vec<Path>>>,
    pub(super) incidence_matrix: Option<IncidenceMatrix>,
    pub(super) assignment_matrix: Option<AssignmentMatrix>,
    frozen: bool,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty() && self.relations.is_empty()
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.node_index.contains_key(&id)
    }

    pub fn contains_edge(&self, id: EdgeId) -> bool {
        self.edge_index.contains_key(&id)
    }

    pub fn get_node(&self, id: NodeId) -> Result<&Node, NetworkError> {
        self.node_index
            .get(&id)
            .map(|&i| &self.nodes[i])
            .ok_or(NetworkError::NotFound(EntityRef::Node(id)))
    }

    pub fn get_edge(&self, id: EdgeId) -> Result<&Edge, NetworkError> {
        self.edge_index
            .get(&id)
            .map(|&i| &self.edges[i])
            .ok_or(NetworkError::NotFound(EntityRef::Edge(id)))
    }

    pub fn get_relation(&self, id: RelationId) -> Result<&Relation, NetworkError> {
        self.relation_index
            .get(&id)
            .map(|&i| &self.relations[i])
            .ok_or(NetworkError::NotFound(EntityRef::Relation(id)))
    }

    /// Arena position of an edge. Stable until the next structural change.
    pub fn edge_position(&self, id: EdgeId) -> Result<usize, NetworkError> {
        self.edge_index
            .get(&id)
            .copied()
            .ok_or(NetworkError::NotFound(EntityRef::Edge(id)))
    }

    /// Mutable access to an edge's numeric traffic fields by arena position.
    ///
    /// Topology fields must not be changed through this handle.
    pub(crate) fn edge_at_mut(&mut self, position: usize) -> Option<&mut Edge> {
        self.edges.get_mut(position)
    }

    pub fn is_oneway(&self, id: EdgeId) -> Result<bool, NetworkError> {
        Ok(self.get_edge(id)?.is_oneway())
    }

    pub fn is_roundabout(&self, id: EdgeId) -> Result<bool, NetworkError> {
        Ok(self.get_edge(id)?.is_roundabout())
    }

    // -------------------------------------------------------------------------
    // O/D nodes
    // -------------------------------------------------------------------------

    /// The node offered as origin/destination under `label`, if any.
    pub fn od_node(&self, label: u32) -> Option<&Node> {
        self.nodes.iter().find(|node| node.label == Some(label))
    }

    /// Every node carrying an O/D label, in insertion order.
    pub fn od_nodes(&self) -> Vec<&Node> {
        self.nodes.iter().filter(|node| node.label.is_some()).collect()
    }

    /// Label an existing node as an O/D node. Labels are metadata, so this is
    /// allowed on a frozen graph.
    pub fn set_od_label(&mut self, id: NodeId, label: Option<u32>) -> Result<(), NetworkError> {
        let index = *self
            .node_index
            .get(&id)
            .ok_or(NetworkError::NotFound(EntityRef::Node(id)))?;
        self.nodes[index].label = label;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Insert `node`, or merge it into the node with the same id.
    ///
    /// Tags and adjacency lists are merged by set union. Coordinates and the
    /// label are only overwritten by values that are present.
    pub fn add_or_update_node(&mut self, node: Node) -> Result<(), NetworkError> {
        self.ensure_mutable("add or update a node")?;
        match self.node_index.get(&node.id) {
            Some(&index) => {
                let existing = &mut self.nodes[index];
                if node.lat.is_some() && node.lat != existing.lat {
                    existing.lat = node.lat;
                }
                if node.lon.is_some() && node.lon != existing.lon {
                    existing.lon = node.lon;
                }
                if node.label.is_some() {
                    existing.label = node.label;
                }
                merge_tags(&mut existing.tags, &node.tags);
                merge_ids(&mut existing.incoming_edges, &node.incoming_edges);
                merge_ids(&mut existing.outgoing_edges, &node.outgoing_edges);
            }
            None => {
                let mut node = node;
                dedup_ids(&mut node.incoming_edges);
                dedup_ids(&mut node.outgoing_edges);
                self.node_index.insert(node.id, self.nodes.len());
                self.nodes.push(node);
            }
        }
        self.clear_derived();
        Ok(())
    }

    /// Append an edge and register it in its endpoints' adjacency lists.
    ///
    /// Both endpoints must already exist. Edge ids must be unique; a repeated
    /// id is rejected as an invalid reference to the existing edge.
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), NetworkError> {
        self.ensure_mutable("add an edge")?;
        if self.edge_index.contains_key(&edge.id) {
            warn!("Edge {} already exists; ignoring duplicate", edge.id);
            return Err(NetworkError::InvalidReference {
                context: "duplicate edge id".into(),
                target: EntityRef::Edge(edge.id),
            });
        }
        let origin = self.endpoint_index(&edge, edge.origin)?;
        let destination = self.endpoint_index(&edge, edge.destination)?;

        let id = edge.id;
        push_unique(&mut self.nodes[origin].outgoing_edges, id);
        push_unique(&mut self.nodes[destination].incoming_edges, id);
        self.edge_index.insert(id, self.edges.len());
        self.edges.push(edge);
        self.clear_derived();
        Ok(())
    }

    pub fn add_relation(&mut self, relation: Relation) -> Result<(), NetworkError> {
        self.ensure_mutable("add a relation")?;
        match self.relation_index.get(&relation.id) {
            Some(&index) => {
                let existing = &mut self.relations[index];
                for member in relation.members {
                    if !existing.members.contains(&member) {
                        existing.members.push(member);
                    }
                }
                merge_tags(&mut existing.tags, &relation.tags);
            }
            None => {
                self.relation_index.insert(relation.id, self.relations.len());
                self.relations.push(relation);
            }
        }
        Ok(())
    }

    /// Look up what a relation member refers to.
    pub fn resolve_member(&self, member: &Member) -> Result<MemberTarget<'_>, NetworkError> {
        let missing = |target| NetworkError::InvalidReference {
            context: format!("relation member with role '{}'", member.role),
            target,
        };
        match member.kind.as_str() {
            "node" => {
                let id = NodeId(member.reference);
                self.get_node(id)
                    .map(MemberTarget::Node)
                    .map_err(|_| missing(EntityRef::Node(id)))
            }
            "way" => {
                let edges: Vec<&Edge> = self
                    .edges
                    .iter()
                    .filter(|edge| edge.way == Some(member.reference))
                    .collect();
                if edges.is_empty() {
                    Err(missing(EntityRef::Way(member.reference)))
                } else {
                    Ok(MemberTarget::Way(edges))
                }
            }
            "relation" => {
                let id = RelationId(member.reference);
                self.get_relation(id)
                    .map(MemberTarget::Relation)
                    .map_err(|_| missing(EntityRef::Relation(id)))
            }
            other => Err(NetworkError::InvalidReference {
                context: format!("relation member of unknown type '{other}'"),
                target: EntityRef::Relation(RelationId(member.reference)),
            }),
        }
    }

    // -------------------------------------------------------------------------
    // Cleanup
    // -------------------------------------------------------------------------

    /// Remove every edge without a usable distance, together with the
    /// references to it in node adjacency lists. Returns how many were removed.
    pub fn remove_invalidated_edges(&mut self) -> Result<usize, NetworkError> {
        self.ensure_mutable("remove invalidated edges")?;
        self.check_invariants()?;

        let removed: HashSet<EdgeId> = self
            .edges
            .iter()
            .filter(|edge| !edge.is_valid())
            .map(|edge| edge.id)
            .collect();
        if removed.is_empty() {
            return Ok(0);
        }

        self.edges.retain(|edge| !removed.contains(&edge.id));
        for node in &mut self.nodes {
            node.incoming_edges.retain(|id| !removed.contains(id));
            node.outgoing_edges.retain(|id| !removed.contains(id));
        }
        self.rebuild_edge_index();
        self.clear_derived();
        debug!("Removed {} invalidated edges", removed.len());
        Ok(removed.len())
    }

    /// Remove every node that no edge touches. Run after
    /// [`Graph::remove_invalidated_edges`]. Returns how many were removed.
    pub fn remove_dead_nodes(&mut self) -> Result<usize, NetworkError> {
        self.ensure_mutable("remove dead nodes")?;
        self.check_invariants()?;

        let before = self.nodes.len();
        self.nodes.retain(|node| !node.is_dead());
        let removed = before - self.nodes.len();
        if removed > 0 {
            self.rebuild_node_index();
            self.clear_derived();
            debug!("Removed {removed} dead nodes");
        }
        Ok(removed)
    }

    /// Verify that every edge endpoint and adjacency entry resolves.
    pub fn check_invariants(&self) -> Result<(), NetworkError> {
        for edge in &self.edges {
            for endpoint in [edge.origin, edge.destination] {
                if !self.node_index.contains_key(&endpoint) {
                    return Err(NetworkError::Corrupted(format!(
                        "edge {} references missing node {endpoint}",
                        edge.id
                    )));
                }
            }
        }
        for node in &self.nodes {
            for id in node.incoming_edges.iter().chain(&node.outgoing_edges) {
                if !self.edge_index.contains_key(id) {
                    return Err(NetworkError::Corrupted(format!(
                        "node {} lists missing edge {id}",
                        node.id
                    )));
                }
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Simulation lifecycle
    // -------------------------------------------------------------------------

    /// Lock the topology. Numeric edge fields stay writable.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn thaw(&mut self) {
        self.frozen = false;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Reset every edge's traffic fields to free flow.
    pub fn clear_traffic(&mut self) {
        for edge in &mut self.edges {
            edge.clear_traffic();
        }
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn ensure_mutable(&self, operation: &'static str) -> Result<(), NetworkError> {
        if self.frozen {
            Err(NetworkError::InvalidTopology { operation })
        } else {
            Ok(())
        }
    }

    fn endpoint_index(&self, edge: &Edge, node: NodeId) -> Result<usize, NetworkError> {
        self.node_index
            .get(&node)
            .copied()
            .ok_or_else(|| NetworkError::InvalidReference {
                context: format!("edge {}", edge.id),
                target: EntityRef::Node(node),
            })
    }

    fn rebuild_node_index(&mut self) {
        self.node_index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id, i))
            .collect();
    }

    fn rebuild_edge_index(&mut self) {
        self.edge_index = self
            .edges
            .iter()
            .enumerate()
            .map(|(i, edge)| (edge.id, i))
            .collect();
    }

    fn clear_derived(&mut self) {
        self.od_pairs.clear();
        self.shortest_paths = None;
        self.incidence_matrix = None;
        self.assignment_matrix = None;
    }
}

fn push_unique(ids: &mut Vec<EdgeId>, id: EdgeId) {
    if !ids.contains(&id) {
        ids.push(id);
    }
}

fn merge_ids(existing: &mut Vec<EdgeId>, incoming: &[EdgeId]) {
    for &id in incoming {
        push_unique(existing, id);
    }
}

fn dedup_ids(ids: &mut Vec<EdgeId>) {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.retain(|id| seen.insert(*id));
}
