//! Path-to-edge incidence and the demand assignment built on top of it.

mod matrix;
mod split;


pub use matrix::{AssignmentMatrix, IncidenceMatrix, PathRef};
pub use split::{LogitSplit, SplitPolicy, UniformSplit};

use crate::error::NetworkError;
use crate::graph::{Graph, Path};

pub fn build_incidence_matrix(
    graph: &Graph,
    paths: &[Vec<Path>],
) -> Result<IncidenceMatrix, NetworkError> {
    IncidenceMatrix::build(graph, paths)
}

pub fn build_assignment_matrix(
    graph: &Graph,
    paths: &[Vec<Path>],
    incidence: &IncidenceMatrix,
    volumes: &[f64],
    policy: &dyn SplitPolicy,
) -> Result<AssignmentMatrix, NetworkError> {
    AssignmentMatrix::build(graph, paths, incidence, volumes, policy)
}
