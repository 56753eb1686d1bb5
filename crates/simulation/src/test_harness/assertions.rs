//! Assertion helpers for `TestNetwork` integration tests.

use crate::clock::ClockState;

use super::TestNetwork;

impl TestNetwork {
    // -----------------------------------------------------------------------
    // Assertions
    // -----------------------------------------------------------------------

    pub fn assert_network_size(&self, nodes: usize, edges: usize) {
        let graph = self.graph();
        assert_eq!(
            (graph.node_count(), graph.edge_count()),
            (nodes, edges),
            "Expected {nodes} nodes and {edges} edges"
        );
    }

    pub fn assert_clock_state(&self, expected: ClockState) {
        let state = self.clock().state();
        assert_eq!(state, expected, "Expected clock {expected:?}, found {state:?}");
    }

    /// Every departed vehicle has either arrived or is still on a link.
    pub fn assert_vehicles_conserved(&self) {
        let counts = self.counts();
        let balance = counts.departed - counts.arrived - counts.en_route;
        assert!(
            balance.abs() < 1e-6,
            "Vehicle balance off by {balance}: {counts:?}"
        );
    }

    /// No link holds more vehicles than its jam storage.
    pub fn assert_within_storage(&self) {
        for link in self.engine().links() {
            let vehicles = link.vehicles();
            let storage = link.geometry.storage();
            assert!(
                vehicles <= storage + 1e-6,
                "Edge {} {:?} holds {vehicles} vehicles over a storage of {storage}",
                link.edge,
                link.direction
            );
        }
    }

    pub fn assert_frozen(&self, frozen: bool) {
        assert_eq!(
            self.graph().is_frozen(),
            frozen,
            "Expected graph frozen = {frozen}"
        );
    }
}
