//! Shortest paths and assignment matrices cached on the graph.

use crate::assignment::{AssignmentMatrix, IncidenceMatrix, SplitPolicy};
use crate::error::NetworkError;
use crate::paths;

use super::{Graph, OdPair, Path};

/// Everything computed for one demand set, ready to be installed on a graph.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentOutcome {
    pub od_pairs: Vec<OdPair>,
    pub shortest_paths: Vec<Vec<Path>>,
    pub incidence: IncidenceMatrix,
    pub assignment: AssignmentMatrix,
}

impl Graph {
    /// Compute and store up to `k` paths for every pair, in pair order.
    pub fn calc_shortest_paths(
        &mut self,
        od_pairs: &[OdPair],
        k: usize,
        max_expansions: usize,
    ) -> Result<&[Vec<Path>], NetworkError> {
        let computed = paths::compute_shortest_paths_with_limit(self, od_pairs, k, max_expansions)?;
        self.od_pairs = od_pairs.to_vec();
        self.incidence_matrix = None;
        self.assignment_matrix = None;
        let stored = self.shortest_paths.insert(computed);
        Ok(stored.as_slice())
    }

    /// Stored path lists, one per O/D pair. Empty until computed.
    pub fn shortest_paths(&self) -> &[Vec<Path>] {
        self.shortest_paths.as_deref().unwrap_or(&[])
    }

    pub fn od_pairs(&self) -> &[OdPair] {
        &self.od_pairs
    }

    pub fn calc_incidence_matrix(&mut self) -> Result<&IncidenceMatrix, NetworkError> {
        let paths = self
            .shortest_paths
            .as_deref()
            .ok_or(NetworkError::MissingArtifact("shortest paths"))?;
        let incidence = IncidenceMatrix::build(self, paths)?;
        self.assignment_matrix = None;
        Ok(&*self.incidence_matrix.insert(incidence))
    }

    pub fn incidence_matrix(&self) -> Option<&IncidenceMatrix> {
        self.incidence_matrix.as_ref()
    }

    /// Split each pair's `volumes` entry over its paths and edges.
    /// Builds the incidence matrix first if it is missing.
    pub fn calc_assignment_matrix(
        &mut self,
        volumes: &[f64],
        policy: &dyn SplitPolicy,
    ) -> Result<&AssignmentMatrix, NetworkError> {
        if self.incidence_matrix.is_none() {
            self.calc_incidence_matrix()?;
        }
        let paths = self.shortest_paths();
        let incidence = self
            .incidence_matrix
            .as_ref()
            .ok_or(NetworkError::MissingArtifact("incidence matrix"))?;
        let assignment = AssignmentMatrix::build(self, paths, incidence, volumes, policy)?;
        Ok(&*self.assignment_matrix.insert(assignment))
    }

    pub fn assignment_matrix(&self) -> Option<&AssignmentMatrix> {
        self.assignment_matrix.as_ref()
    }

    /// Install artifacts computed elsewhere (usually on a snapshot of this
    /// graph in a background task). The incidence columns must still match
    /// this graph's edges.
    pub fn install_assignment(&mut self, outcome: AssignmentOutcome) -> Result<(), NetworkError> {
        let columns_match = outcome.incidence.column_count() == self.edge_count()
            && outcome
                .incidence
                .columns()
                .iter()
                .zip(self.edges())
                .all(|(column, edge)| *column == edge.id);
        if !columns_match {
            return Err(NetworkError::Corrupted(
                "assignment was computed for a different edge set".into(),
            ));
        }
        self.od_pairs = outcome.od_pairs;
        self.shortest_paths = Some(outcome.shortest_paths);
        self.incidence_matrix = Some(outcome.incidence);
        self.assignment_matrix = Some(outcome.assignment);
        Ok(())
    }
}
