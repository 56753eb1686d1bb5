//! Builder methods for network and demand setup in integration tests.

use crate::assignment::UniformSplit;
use crate::graph::{Graph, OdPair};
use crate::ingest;
use crate::params::TrafficParams;
use crate::tasks::{AssignmentRequest, PendingAssignment, RequestAssignment};

use super::TestNetwork;

impl TestNetwork {
    // -----------------------------------------------------------------------
    // Network and demand
    // -----------------------------------------------------------------------

    /// Build the graph from an Overpass JSON response.
    pub fn with_elements(mut self, json: &str) -> Self {
        let response = ingest::parse_overpass(json).unwrap();
        let params = self.resource::<TrafficParams>().network.clone();
        let graph = ingest::build_graph(&response.elements, &params).unwrap();
        self.app.insert_resource(graph);
        self
    }

    pub fn with_graph(mut self, graph: Graph) -> Self {
        self.app.insert_resource(graph);
        self
    }

    /// Compute paths and a uniform assignment synchronously.
    pub fn with_assignment(mut self, od_pairs: &[OdPair], volumes: &[f64]) -> Self {
        let paths = self.resource::<TrafficParams>().paths.clone();
        {
            let mut graph = self.app.world_mut().resource_mut::<Graph>();
            graph
                .calc_shortest_paths(od_pairs, paths.k, paths.max_expansions)
                .unwrap();
            graph.calc_assignment_matrix(volumes, &UniformSplit).unwrap();
        }
        self
    }

    /// Send a background assignment request and run one `Update` to
    /// dispatch it.
    pub fn request_assignment(&mut self, od_pairs: Vec<OdPair>, volumes: Vec<f64>) {
        let paths = self.resource::<TrafficParams>().paths.clone();
        self.app
            .world_mut()
            .send_event(RequestAssignment(AssignmentRequest::new(
                od_pairs, volumes, &paths,
            )));
        self.update();
    }

    /// Run `Update` until the pending assignment task has been collected.
    /// Returns false if it is still running after `max_frames`.
    pub fn wait_for_assignment(&mut self, max_frames: usize) -> bool {
        for _ in 0..max_frames {
            if !self.resource::<PendingAssignment>().is_pending() {
                return true;
            }
            std::thread::sleep(std::time::Duration::from_millis(1));
            self.update();
        }
        !self.resource::<PendingAssignment>().is_pending()
    }
}
