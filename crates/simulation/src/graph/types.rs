use std::fmt;

use serde::{Deserialize, Serialize};

use super::tags;

// =============================================================================
// Identifiers
// =============================================================================

/// Node identifier, taken verbatim from the source map data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub i64);

/// Edge identifier. Ingestion numbers edges sequentially per way segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationId(pub i64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Tags, members, demand keys
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Which edge attribute path search minimises.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathType {
    #[default]
    Distance,
    Duration,
}

/// One origin/destination pair of the demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OdPair {
    pub origin: NodeId,
    pub destination: NodeId,
    #[serde(default)]
    pub path_type: PathType,
}

impl OdPair {
    pub fn new(origin: NodeId, destination: NodeId, path_type: PathType) -> Self {
        Self {
            origin,
            destination,
            path_type,
        }
    }
}

/// Relation member as it appears in the source data: `kind` is `node`,
/// `way` or `relation`, and `reference` is the id in that namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "ref")]
    pub reference: i64,
    #[serde(default)]
    pub role: String,
}

// =============================================================================
// Node / Edge / Relation
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub tags: Vec<Tag>,
    pub incoming_edges: Vec<EdgeId>,
    pub outgoing_edges: Vec<EdgeId>,
    /// Name under which this node is offered as an origin or destination.
    pub label: Option<u32>,
}

impl Node {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            lat: None,
            lon: None,
            tags: Vec::new(),
            incoming_edges: Vec::new(),
            outgoing_edges: Vec::new(),
            label: None,
        }
    }

    pub fn with_coords(mut self, lat: f64, lon: f64) -> Self {
        self.lat = Some(lat);
        self.lon = Some(lon);
        self
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.push(Tag::new(key, value));
        self
    }

    pub fn with_label(mut self, label: u32) -> Self {
        self.label = Some(label);
        self
    }

    pub fn coords(&self) -> Option<(f64, f64)> {
        Some((self.lat?, self.lon?))
    }

    pub fn degree(&self) -> usize {
        self.incoming_edges.len() + self.outgoing_edges.len()
    }

    /// A node is dead when no edge touches it.
    pub fn is_dead(&self) -> bool {
        self.degree() == 0
    }
}

/// A directed road segment between two nodes.
///
/// `origin`/`destination` give the digitised direction; whether traffic may
/// also travel the other way is decided by the tags (see [`Edge::is_oneway`]).
/// The traffic fields are rewritten by the flow engine on every tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub origin: NodeId,
    pub destination: NodeId,
    /// Metres. `None` marks an invalidated edge awaiting cleanup.
    pub distance: Option<f64>,
    /// Free-flow travel time in seconds.
    pub duration: f64,
    pub tags: Vec<Tag>,
    /// Source way this segment was cut from, if any.
    pub way: Option<i64>,
    pub flow: f64,
    pub link_flow: f64,
    pub density: f64,
    pub velocity: f64,
    pub duration_in_traffic: f64,
}

impl Edge {
    pub fn new(id: EdgeId, origin: NodeId, destination: NodeId) -> Self {
        Self {
            id,
            origin,
            destination,
            distance: None,
            duration: 0.0,
            tags: Vec::new(),
            way: None,
            flow: 0.0,
            link_flow: 0.0,
            density: 0.0,
            velocity: 0.0,
            duration_in_traffic: 0.0,
        }
    }

    /// Set length and free-flow time together; traffic time starts at free flow.
    pub fn with_length(mut self, distance: f64, duration: f64) -> Self {
        self.distance = Some(distance);
        self.duration = duration;
        self.duration_in_traffic = duration;
        self
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.push(Tag::new(key, value));
        self
    }

    pub fn with_way(mut self, way: i64) -> Self {
        self.way = Some(way);
        self
    }

    pub fn is_valid(&self) -> bool {
        self.distance.is_some_and(f64::is_finite)
    }

    pub fn is_oneway(&self) -> bool {
        tags::is_oneway(&self.tags)
    }

    pub fn is_roundabout(&self) -> bool {
        tags::is_roundabout(&self.tags)
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        tags::tag_value(&self.tags, key)
    }

    /// Display label: the road name when tagged, otherwise the endpoints.
    pub fn label(&self) -> String {
        match self.tag("name").or_else(|| self.tag("ref")) {
            Some(name) => name.to_string(),
            None => format!("{} - {}", self.origin, self.destination),
        }
    }

    /// Put the traffic fields back to their free-flow values.
    pub fn clear_traffic(&mut self) {
        self.flow = 0.0;
        self.link_flow = 0.0;
        self.density = 0.0;
        self.velocity = 0.0;
        self.duration_in_traffic = self.duration;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub id: RelationId,
    pub members: Vec<Member>,
    pub tags: Vec<Tag>,
}

impl Relation {
    pub fn new(id: RelationId) -> Self {
        Self {
            id,
            members: Vec::new(),
            tags: Vec::new(),
        }
    }
}

/// One loopless route through the graph. `nodes` has one more entry than
/// `edges`; `cost` is in metres or seconds depending on the path type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Path {
    pub nodes: Vec<NodeId>,
    pub edges: Vec<EdgeId>,
    pub cost: f64,
}

impl Path {
    pub fn hops(&self) -> usize {
        self.edges.len()
    }

    pub fn origin(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    pub fn destination(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }
}
