//! Road network graph: nodes, directed edges, relations, and the artifacts
//! derived from them.

mod derived;
mod store;
pub mod tags;
mod types;


pub use derived::AssignmentOutcome;
pub use store::{Graph, MemberTarget};
pub use types::*;
