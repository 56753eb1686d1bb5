use std::fmt;

use thiserror::Error;

use crate::graph::{EdgeId, NodeId, RelationId};

/// A reference to something stored in (or expected in) the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Node(NodeId),
    Edge(EdgeId),
    Relation(RelationId),
    /// Source way id, resolved through [`crate::graph::Edge::way`].
    Way(i64),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Node(id) => write!(f, "node {id}"),
            EntityRef::Edge(id) => write!(f, "edge {id}"),
            EntityRef::Relation(id) => write!(f, "relation {id}"),
            EntityRef::Way(id) => write!(f, "way {id}"),
        }
    }
}

/// Errors from building or querying the road graph and its derived artifacts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NetworkError {
    #[error("{0} not found")]
    NotFound(EntityRef),

    #[error("{context} references missing {target}")]
    InvalidReference {
        context: String,
        target: EntityRef,
    },

    #[error("cannot {operation}: the topology is frozen while a simulation is loaded")]
    InvalidTopology { operation: &'static str },

    #[error("invalid demand: {0}")]
    InvalidDemand(String),

    #[error("graph invariant violated: {0}")]
    Corrupted(String),

    #[error("{0} has not been computed")]
    MissingArtifact(&'static str),
}

/// Errors raised while loading or advancing the flow model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("the flow engine has no network loaded")]
    NotLoaded,

    #[error("invalid flow parameters: {0}")]
    InvalidParams(String),

    #[error("edge {edge} holds {vehicles:.6} vehicles at tick {tick}")]
    NegativeOccupancy {
        edge: EdgeId,
        tick: usize,
        vehicles: f64,
    },

    #[error("non-finite {quantity} on edge {edge} at tick {tick}")]
    NonFinite {
        edge: EdgeId,
        tick: usize,
        quantity: &'static str,
    },
}

/// Errors from reading a parameter document.
#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("malformed parameters: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid parameter {name}: {reason}")]
    Invalid { name: String, reason: String },
}
