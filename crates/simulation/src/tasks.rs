//! Background computation of shortest paths and the assignment matrices.
//!
//! Path enumeration is the slow part of preparing a run, so it happens on
//! Bevy's `AsyncComputeTaskPool` against a snapshot of the graph. Callers can
//! `block_on` the returned task, or send a [`RequestAssignment`] event and let
//! the plugin poll it and install the result once it is ready.

use std::sync::Arc;

use bevy::prelude::*;
use bevy::tasks::{block_on, AsyncComputeTaskPool, Task, TaskPool};

use crate::assignment::{AssignmentMatrix, IncidenceMatrix, SplitPolicy, UniformSplit};
use crate::error::NetworkError;
use crate::graph::{AssignmentOutcome, Graph, OdPair};
use crate::params::PathParams;
use crate::paths;
use crate::simulation_sets::SimulationUpdateSet;

/// Demand to route: one volume per O/D pair.
#[derive(Clone)]
pub struct AssignmentRequest {
    pub od_pairs: Vec<OdPair>,
    pub volumes: Vec<f64>,
    pub k: usize,
    pub max_expansions: usize,
    pub policy: Arc<dyn SplitPolicy>,
}

impl AssignmentRequest {
    /// Uniform split with the path limits from `params`.
    pub fn new(od_pairs: Vec<OdPair>, volumes: Vec<f64>, params: &PathParams) -> Self {
        Self {
            od_pairs,
            volumes,
            k: params.k,
            max_expansions: params.max_expansions,
            policy: Arc::new(UniformSplit),
        }
    }

    pub fn with_policy(mut self, policy: impl SplitPolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }
}

/// Paths, incidence and assignment for `request`, computed synchronously.
pub fn compute_assignment(
    graph: &Graph,
    request: &AssignmentRequest,
) -> Result<AssignmentOutcome, NetworkError> {
    let shortest_paths = paths::compute_shortest_paths_with_limit(
        graph,
        &request.od_pairs,
        request.k,
        request.max_expansions,
    )?;
    let incidence = IncidenceMatrix::build(graph, &shortest_paths)?;
    let assignment = AssignmentMatrix::build(
        graph,
        &shortest_paths,
        &incidence,
        &request.volumes,
        request.policy.as_ref(),
    )?;
    Ok(AssignmentOutcome {
        od_pairs: request.od_pairs.clone(),
        shortest_paths,
        incidence,
        assignment,
    })
}

/// Run [`compute_assignment`] on the async compute pool.
pub fn spawn_assignment_task(
    graph: Arc<Graph>,
    request: AssignmentRequest,
) -> Task<Result<AssignmentOutcome, NetworkError>> {
    let pool = AsyncComputeTaskPool::get_or_init(TaskPool::new);
    pool.spawn(async move { compute_assignment(&graph, &request) })
}

// =============================================================================
// ECS wiring
// =============================================================================

#[derive(Event, Clone)]
pub struct RequestAssignment(pub AssignmentRequest);

#[derive(Event, Debug, Clone, PartialEq)]
pub struct AssignmentReady {
    pub od_pairs: usize,
    pub paths: usize,
}

#[derive(Event, Debug, Clone, PartialEq)]
pub struct AssignmentFailed(pub NetworkError);

/// The in-flight assignment task, if any. A newer request replaces it.
#[derive(Resource, Default)]
pub struct PendingAssignment {
    task: Option<Task<Result<AssignmentOutcome, NetworkError>>>,
}

impl PendingAssignment {
    pub fn is_pending(&self) -> bool {
        self.task.is_some()
    }
}

pub fn dispatch_assignment_requests(
    mut requests: EventReader<RequestAssignment>,
    graph: Res<Graph>,
    mut pending: ResMut<PendingAssignment>,
) {
    let Some(RequestAssignment(request)) = requests.read().last() else {
        return;
    };
    debug!(
        "Computing assignment for {} O/D pairs (k = {})",
        request.od_pairs.len(),
        request.k
    );
    let snapshot = Arc::new(graph.clone());
    pending.task = Some(spawn_assignment_task(snapshot, request.clone()));
}

pub fn collect_assignment_results(
    mut pending: ResMut<PendingAssignment>,
    mut graph: ResMut<Graph>,
    mut ready: EventWriter<AssignmentReady>,
    mut failed: EventWriter<AssignmentFailed>,
) {
    let Some(task) = pending.task.as_mut() else {
        return;
    };
    let Some(result) = block_on(futures_lite::future::poll_once(task)) else {
        return;
    };
    pending.task = None;

    let installed = result.and_then(|outcome| {
        let summary = AssignmentReady {
            od_pairs: outcome.od_pairs.len(),
            paths: outcome.incidence.row_count(),
        };
        graph.install_assignment(outcome)?;
        Ok(summary)
    });
    match installed {
        Ok(summary) => {
            info!(
                "Assignment ready: {} paths for {} O/D pairs",
                summary.paths, summary.od_pairs
            );
            ready.send(summary);
        }
        Err(err) => {
            error!("Assignment failed: {err}");
            failed.send(AssignmentFailed(err));
        }
    }
}

pub struct AssignmentTasksPlugin;

impl Plugin for AssignmentTasksPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PendingAssignment>()
            .add_event::<RequestAssignment>()
            .add_event::<AssignmentReady>()
            .add_event::<AssignmentFailed>()
            .add_systems(
                Update,
                (dispatch_assignment_requests, collect_assignment_results)
                    .chain()
                    .in_set(SimulationUpdateSet::Input),
            );
    }
}
