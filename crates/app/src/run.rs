//! Headless run: a blocking loop over a `MinimalPlugins` app.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bevy::log::LogPlugin;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use simulation::clock::{ClockControlEvent, Control, SimulationClock, SimulationFailed};
use simulation::flow::{FlowEngine, SimulationCounts};
use simulation::graph::{Graph, OdPair};
use simulation::ingest::{build_graph_with_report, parse_overpass, IngestReport};
use simulation::params::TrafficParams;
use simulation::statistics::CongestionReport;
use simulation::tasks::{AssignmentFailed, AssignmentReady, AssignmentRequest, RequestAssignment};
use simulation::{NetworkError, ParamsError, SimulationError};

use crate::Args;

/// Frames to wait for the background assignment before giving up.
const ASSIGNMENT_FRAMES: u32 = 60_000;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}: {source}", path.display())]
    Params {
        path: PathBuf,
        #[source]
        source: ParamsError,
    },

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error("cannot encode the report: {0}")]
    Report(#[from] serde_json::Error),

    #[error("timed out waiting for the assignment")]
    AssignmentTimeout,
}

/// One line of the demand file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Demand {
    #[serde(flatten)]
    pair: OdPair,
    volume: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunReport {
    ticks: usize,
    simulated_seconds: f64,
    finished: bool,
    counts: SimulationCounts,
    average_speed: f64,
    congestion: CongestionReport,
}

/// Everything read from disk before the app starts.
struct Inputs {
    params: TrafficParams,
    graph: Graph,
    ingest: IngestReport,
    od_pairs: Vec<OdPair>,
    volumes: Vec<f64>,
}

fn load_inputs(args: &Args) -> Result<Inputs, RunError> {
    let mut params = match &args.params {
        Some(path) => TrafficParams::from_json(&read(path)?).map_err(|source| RunError::Params {
            path: path.clone(),
            source,
        })?,
        None => TrafficParams::default(),
    };
    if let Some(k) = args.k {
        params.paths.k = k;
    }

    let response = parse_overpass(&read(&args.network)?).map_err(|source| RunError::Parse {
        path: args.network.clone(),
        source,
    })?;
    let (graph, ingest) = build_graph_with_report(&response.elements, &params.network)?;

    let demand: Vec<Demand> =
        serde_json::from_str(&read(&args.demand)?).map_err(|source| RunError::Parse {
            path: args.demand.clone(),
            source,
        })?;
    let (od_pairs, volumes) = demand.into_iter().map(|d| (d.pair, d.volume)).unzip();

    Ok(Inputs {
        params,
        graph,
        ingest,
        od_pairs,
        volumes,
    })
}

pub fn run(args: &Args) -> Result<String, RunError> {
    let Inputs {
        params,
        graph,
        ingest,
        od_pairs,
        volumes,
    } = load_inputs(args)?;

    let mut app = App::new();
    app.add_plugins((MinimalPlugins, LogPlugin::default()))
        .insert_resource(params.clone())
        .add_plugins(simulation::SimulationPlugin);
    app.insert_resource(graph);
    app.update();
    info!(
        "Network: {} nodes, {} edges, {} relations ({} invalid edges, {} dead nodes removed)",
        ingest.nodes,
        ingest.edges,
        ingest.relations,
        ingest.invalid_edges_removed,
        ingest.dead_nodes_removed
    );

    // -- Assignment ------------------------------------------------------------
    app.world_mut().send_event(RequestAssignment(AssignmentRequest::new(
        od_pairs,
        volumes,
        &params.paths,
    )));
    wait_for_assignment(&mut app)?;

    // -- Propagation -----------------------------------------------------------
    app.world_mut().send_event(ClockControlEvent(Control::Start));
    app.world_mut().run_schedule(Update);
    if let Some(SimulationFailed(err)) = drain::<SimulationFailed>(&mut app).pop() {
        return Err(err.into());
    }

    for _ in 0..args.max_ticks {
        if !app.world().resource::<SimulationClock>().is_running() {
            break;
        }
        app.world_mut().run_schedule(FixedUpdate);
    }
    if let Some(SimulationFailed(err)) = drain::<SimulationFailed>(&mut app).pop() {
        return Err(err.into());
    }

    let clock = app.world().resource::<SimulationClock>();
    let engine = app.world().resource::<FlowEngine>();
    let graph = app.world().resource::<Graph>();
    if !clock.has_ended() {
        warn!("Stopped after {} ticks with vehicles still en route", clock.ticks());
    }

    let report = RunReport {
        ticks: engine.tick_count(),
        simulated_seconds: engine.time_periods().last().copied().unwrap_or_default(),
        finished: clock.has_ended(),
        counts: engine.counts(),
        average_speed: engine.average_speed(),
        congestion: CongestionReport::from_snapshot(
            &engine.snapshot(graph),
            engine.time_periods(),
            params.flow.time_step_secs,
        ),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

fn read(path: &Path) -> Result<String, RunError> {
    fs::read_to_string(path).map_err(|source| RunError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn wait_for_assignment(app: &mut App) -> Result<(), RunError> {
    for _ in 0..ASSIGNMENT_FRAMES {
        app.update();
        if let Some(AssignmentFailed(err)) = drain::<AssignmentFailed>(app).pop() {
            return Err(err.into());
        }
        if let Some(ready) = drain::<AssignmentReady>(app).pop() {
            info!("Assigned {} O/D pairs over {} paths", ready.od_pairs, ready.paths);
            return Ok(());
        }
        std::thread::sleep(std::time::Duration::from_millis(1));
    }
    Err(RunError::AssignmentTimeout)
}

fn drain<E: Event>(app: &mut App) -> Vec<E> {
    app.world_mut().resource_mut::<Events<E>>().drain().collect()
}
