use std::collections::HashMap;

use bevy::prelude::*;
use serde::Serialize;

use crate::error::NetworkError;
use crate::graph::{EdgeId, Graph, Path};

use super::split::SplitPolicy;

/// Which enumerated path a matrix row stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PathRef {
    /// Index of the O/D pair.
    pub od: usize,
    /// Rank of the path within its pair, best first.
    pub rank: usize,
}

/// Row layout shared by both matrices: one row per enumerated path
/// (pair order, then rank order), one column per graph edge (graph order).
#[derive(Debug, Clone, Default, PartialEq)]
struct Layout {
    columns: Vec<EdgeId>,
    rows: Vec<PathRef>,
    column_index: HashMap<EdgeId, usize>,
    row_index: HashMap<PathRef, usize>,
}

impl Layout {
    fn new(graph: &Graph, paths: &[Vec<Path>]) -> Self {
        let columns: Vec<EdgeId> = graph.edges().iter().map(|e| e.id).collect();
        let rows: Vec<PathRef> = paths
            .iter()
            .enumerate()
            .flat_map(|(od, list)| (0..list.len()).map(move |rank| PathRef { od, rank }))
            .collect();
        let column_index = columns.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let row_index = rows.iter().enumerate().map(|(i, r)| (*r, i)).collect();
        Self {
            columns,
            rows,
            column_index,
            row_index,
        }
    }

    fn column(&self, edge: EdgeId) -> Result<usize, NetworkError> {
        self.column_index
            .get(&edge)
            .copied()
            .ok_or_else(|| NetworkError::Corrupted(format!("path uses edge {edge} outside the graph")))
    }
}

// =============================================================================
// Incidence
// =============================================================================

/// Boolean paths × edges matrix: `true` where the edge lies on the path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncidenceMatrix {
    layout: Layout,
    cells: Vec<bool>,
}

impl IncidenceMatrix {
    pub fn build(graph: &Graph, paths: &[Vec<Path>]) -> Result<Self, NetworkError> {
        let layout = Layout::new(graph, paths);
        let width = layout.columns.len();
        let mut cells = vec![false; layout.rows.len() * width];
        for (row, path) in paths.iter().flatten().enumerate() {
            for &edge in &path.edges {
                cells[row * width + layout.column(edge)?] = true;
            }
        }
        Ok(Self { layout, cells })
    }

    pub fn row_count(&self) -> usize {
        self.layout.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.layout.columns.len()
    }

    /// Edge ids, one per column.
    pub fn columns(&self) -> &[EdgeId] {
        &self.layout.columns
    }

    pub fn rows(&self) -> &[PathRef] {
        &self.layout.rows
    }

    pub fn row_of(&self, od: usize, rank: usize) -> Option<usize> {
        self.layout.row_index.get(&PathRef { od, rank }).copied()
    }

    pub fn column_of(&self, edge: EdgeId) -> Option<usize> {
        self.layout.column_index.get(&edge).copied()
    }

    pub fn get(&self, row: usize, column: usize) -> bool {
        self.row(row).get(column).copied().unwrap_or(false)
    }

    pub fn row(&self, row: usize) -> &[bool] {
        let width = self.column_count();
        self.cells.get(row * width..(row + 1) * width).unwrap_or(&[])
    }

    pub fn contains(&self, row: usize, edge: EdgeId) -> bool {
        self.column_of(edge).is_some_and(|column| self.get(row, column))
    }

    pub fn to_nested(&self) -> Vec<Vec<bool>> {
        (0..self.row_count()).map(|r| self.row(r).to_vec()).collect()
    }
}

// =============================================================================
// Assignment
// =============================================================================

/// Volume each path carries over each edge, same shape as the incidence
/// matrix. A row sums to its path's volume, and the rows of one pair sum to
/// the pair's demand. Pairs that never use an edge (no path, or origin equal
/// to destination) carry nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentMatrix {
    layout: Layout,
    cells: Vec<f64>,
    on_path: Vec<bool>,
    path_volumes: Vec<f64>,
}

impl AssignmentMatrix {
    /// Split `volumes[od]` over the pair's paths with `policy`, then over each
    /// path's edges in proportion to edge distance. Pairs without paths carry
    /// nothing.
    pub fn build(
        graph: &Graph,
        paths: &[Vec<Path>],
        incidence: &IncidenceMatrix,
        volumes: &[f64],
        policy: &dyn SplitPolicy,
    ) -> Result<Self, NetworkError> {
        if volumes.len() != paths.len() {
            return Err(NetworkError::InvalidDemand(format!(
                "expected {} volumes, one per O/D pair, got {}",
                paths.len(),
                volumes.len()
            )));
        }
        if let Some((i, v)) = volumes
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(NetworkError::InvalidDemand(format!(
                "volume {v} for O/D pair {i} must be finite and non-negative"
            )));
        }

        let layout = incidence.layout.clone();
        let width = layout.columns.len();
        let mut cells = vec![0.0; layout.rows.len() * width];
        let mut path_volumes = vec![0.0; layout.rows.len()];

        for (od, (list, &volume)) in paths.iter().zip(volumes).enumerate() {
            if list.is_empty() {
                if volume > 0.0 {
                    warn!("O/D pair {od} has no path; its {volume} vehicles are not assigned");
                }
                continue;
            }
            if list.iter().all(|path| path.edges.is_empty()) {
                if volume > 0.0 {
                    debug!("O/D pair {od} starts at its destination; its {volume} vehicles never travel");
                }
                continue;
            }
            let shares = policy.split(list);
            if shares.len() != list.len() || shares.iter().any(|s| !s.is_finite() || *s < 0.0) {
                return Err(NetworkError::InvalidDemand(format!(
                    "split policy returned invalid shares for O/D pair {od}"
                )));
            }

            let mut assigned = 0.0;
            for (rank, path) in list.iter().enumerate() {
                let row = incidence.row_of(od, rank).ok_or_else(|| {
                    NetworkError::Corrupted(format!("no incidence row for pair {od} rank {rank}"))
                })?;
                // The last path takes the remainder so the pair sums exactly.
                let path_volume = if rank + 1 == list.len() {
                    volume - assigned
                } else {
                    volume * shares[rank]
                };
                assigned += path_volume;
                path_volumes[row] = path_volume;
                distribute(graph, &layout, path, path_volume, &mut cells[row * width..(row + 1) * width])?;
            }
        }

        Ok(Self {
            layout,
            cells,
            on_path: incidence.cells.clone(),
            path_volumes,
        })
    }

    pub fn row_count(&self) -> usize {
        self.layout.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.layout.columns.len()
    }

    pub fn columns(&self) -> &[EdgeId] {
        &self.layout.columns
    }

    pub fn rows(&self) -> &[PathRef] {
        &self.layout.rows
    }

    pub fn row_of(&self, od: usize, rank: usize) -> Option<usize> {
        self.layout.row_index.get(&PathRef { od, rank }).copied()
    }

    pub fn get(&self, row: usize, column: usize) -> f64 {
        self.row(row).get(column).copied().unwrap_or(0.0)
    }

    pub fn row(&self, row: usize) -> &[f64] {
        let width = self.column_count();
        self.cells.get(row * width..(row + 1) * width).unwrap_or(&[])
    }

    /// Volume assigned to the path in `row`.
    pub fn path_volume(&self, row: usize) -> f64 {
        self.path_volumes.get(row).copied().unwrap_or(0.0)
    }

    pub fn path_volumes(&self) -> &[f64] {
        &self.path_volumes
    }

    /// Total volume of the pair `od` over all its paths.
    pub fn pair_volume(&self, od: usize) -> f64 {
        self.layout
            .rows
            .iter()
            .zip(&self.path_volumes)
            .filter(|(r, _)| r.od == od)
            .map(|(_, v)| v)
            .sum()
    }

    /// Volume of all paths that cross each edge, one entry per column.
    ///
    /// A path counts in full on every edge it crosses, so the entries add up
    /// to each path volume times its hop count, not to the demand. The
    /// distance-weighted cells are [`AssignmentMatrix::column_totals`].
    pub fn edge_volumes(&self) -> Vec<f64> {
        let width = self.column_count();
        let mut totals = vec![0.0; width];
        for (row, volume) in self.path_volumes.iter().enumerate() {
            for (column, total) in totals.iter_mut().enumerate() {
                if self.on_path[row * width + column] {
                    *total += volume;
                }
            }
        }
        totals
    }

    /// Column sums of the cells: the demand share spread onto each edge.
    /// Adds up to the assigned demand.
    pub fn column_totals(&self) -> Vec<f64> {
        let width = self.column_count();
        let mut totals = vec![0.0; width];
        for row in 0..self.row_count() {
            for (total, cell) in totals.iter_mut().zip(self.row(row)) {
                *total += cell;
            }
        }
        totals
    }

    pub fn to_nested(&self) -> Vec<Vec<f64>> {
        (0..self.row_count()).map(|r| self.row(r).to_vec()).collect()
    }
}

/// Spread `volume` over the path's edges by distance share; the last edge
/// takes the rounding remainder.
fn distribute(
    graph: &Graph,
    layout: &Layout,
    path: &Path,
    volume: f64,
    row: &mut [f64],
) -> Result<(), NetworkError> {
    if path.edges.is_empty() {
        return Ok(());
    }
    let lengths = path
        .edges
        .iter()
        .map(|&id| Ok(graph.get_edge(id)?.distance.unwrap_or(0.0).max(0.0)))
        .collect::<Result<Vec<f64>, NetworkError>>()?;
    let total: f64 = lengths.iter().sum();

    let mut assigned = 0.0;
    let last = path.edges.len() - 1;
    for (i, (&edge, length)) in path.edges.iter().zip(lengths).enumerate() {
        let share = if i == last {
            volume - assigned
        } else if total > 0.0 {
            volume * length / total
        } else {
            volume / path.edges.len() as f64
        };
        assigned += share;
        row[layout.column(edge)?] += share;
    }
    Ok(())
}
