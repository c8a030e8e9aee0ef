//! Pre-defined simulation scenarios
//!
//! The three structural walkthroughs (tree, ring, N-connected) plus a
//! seeded churn run for any shape.

use mirrorsim_core::{NodeId, StructureType};
use tracing::info;

use crate::error::{SimResult, SimulationError};
use crate::simulation::{SimConfig, Simulation};
use crate::topology::{Topology, TopologyBuilder, TopologySpec};

/// Names accepted by [`run_named`]
pub const SCENARIOS: [&str; 4] = ["tree", "ring", "n-connected", "churn"];

/// Scenario: a five-mirror tree
///
/// ```text
///       1
///      / \
///     2   3
///     |   |
///     4   5
/// ```
///
/// Valid, four edges, mirror 5 two hops below the head. Once every
/// planned link is open nothing is pending.
pub fn run_tree_scenario() -> SimResult<Topology> {
    info!("=== Running Tree Scenario ===");
    let mut topology =
        Topology::from_edges(TopologySpec::Tree, 1, &[(1, 2), (1, 3), (2, 4), (3, 5)])?;
    println!("{}", topology.visualize());

    let scope = topology.graph().scope(StructureType::Tree, NodeId(1));
    println!("  Edges: {}", scope.edge_count());
    println!(
        "  Depth of n5: {:?}",
        topology.graph().depth_in_tree(NodeId(5), StructureType::Tree)
    );

    let opened = topology.open_all_planned(0)?;
    println!("\n--- Opened {opened} links ---");
    println!("  Pending links: {}", topology.pending_links());
    println!("  Valid: {}", topology.is_valid());
    Ok(topology)
}

/// Scenario: a three-mirror ring
///
/// No member may leave a three-ring; after one more mirror joins, any
/// member but the head may.
pub fn run_ring_scenario() -> SimResult<Topology> {
    info!("=== Running Ring Scenario ===");
    let mut topology = Topology::from_edges(TopologySpec::Ring, 1, &[(1, 2), (2, 3), (3, 1)])?;
    println!("{}", topology.visualize());

    let ring = StructureType::Ring;
    let members = topology.members();
    let closed = topology.graph().scope(ring, NodeId(1)).forms_closed_cycle(&members);
    println!("  Closed cycle over {members:?}: {closed}");

    println!("\n--- Removal checks at three mirrors ---");
    print_removal_checks(&topology);

    println!("\n--- One mirror joins ---");
    topology.grow()?;
    println!("{}", topology.visualize());
    print_removal_checks(&topology);
    Ok(topology)
}

fn print_removal_checks(topology: &Topology) {
    let head = topology.head();
    let ty = topology.structure_type();
    // Probe on a copy so the scenario's topology stays untouched
    let mut graph = topology.graph().clone();
    for id in topology.members() {
        let removable = graph.can_be_removed_from_structure(id, ty, head);
        println!("  {id} removable: {removable}");
    }
}

/// Scenario: five mirrors, degree two
///
/// The circulant over five positions is a plain cycle: five planned links,
/// and losing any one non-head mirror leaves the rest connected.
pub fn run_n_connected_scenario() -> SimResult<Topology> {
    info!("=== Running N-Connected Scenario ===");
    let topology = TopologyBuilder::new(5).build(TopologySpec::NConnected { degree: 2 })?;
    println!("{}", topology.visualize());
    for id in topology.members() {
        println!(
            "  {id} degree: {:?}",
            topology
                .graph()
                .connectivity_degree(id, StructureType::NConnected)
        );
    }
    println!("  Expected links: {}", topology.expected_links());
    Ok(topology)
}

/// Scenario: seeded churn over `spec` for `ticks` ticks
pub fn run_churn_scenario(spec: TopologySpec, ticks: u64, seed: u64) -> SimResult<Simulation> {
    info!(shape = %spec.structure_type(), ticks, seed, "=== Running Churn Scenario ===");
    let config = SimConfig {
        seed,
        ticks,
        initial_mirrors: spec.min_mirrors().max(6),
        topology: spec,
        ..Default::default()
    };
    let mut sim = Simulation::new(config)?;
    println!("{}", sim.topology.visualize());

    let stats = sim.run()?.clone();
    println!("{}", sim.topology.visualize());
    print_stats(&sim);
    if stats.validation_failures > 0 {
        println!("  WARNING: {} validation failures", stats.validation_failures);
    }
    Ok(sim)
}

/// Print final statistics of a finished run
pub fn print_stats(sim: &Simulation) {
    println!("\n=== Final Statistics ===");
    println!("  {}", sim.state_summary());
    println!("  Mirrors added: {}", sim.stats.mirrors_added);
    println!("  Mirrors removed: {}", sim.stats.mirrors_removed);
    println!("  Changes rejected: {}", sim.stats.changes_rejected);
    println!("  Links opened: {}", sim.stats.links_opened);
    println!("  Links closed: {}", sim.stats.links_closed);
    println!("  Links retired: {}", sim.stats.links_retired);
    println!("  Pending links: {}", sim.stats.pending_links);
    println!(
        "  Validations: {} ({} failed)",
        sim.stats.validations, sim.stats.validation_failures
    );
}

/// Run a scenario by name; `churn` runs a ring
pub fn run_named(name: &str) -> SimResult<()> {
    match name {
        "tree" => run_tree_scenario().map(drop),
        "ring" => run_ring_scenario().map(drop),
        "n-connected" => run_n_connected_scenario().map(drop),
        "churn" => run_churn_scenario(TopologySpec::Ring, 100, 42).map(drop),
        other => Err(SimulationError::UnknownScenario(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_scenario() {
        let topology = run_tree_scenario().unwrap();
        assert!(topology.is_valid());
        let scope = topology.graph().scope(StructureType::Tree, NodeId(1));
        assert_eq!(scope.edge_count(), 4);
        assert_eq!(
            topology.graph().depth_in_tree(NodeId(5), StructureType::Tree),
            Some(2)
        );
        assert_eq!(topology.implemented_links(), 4);
        assert_eq!(topology.pending_links(), 0);
    }

    #[test]
    fn test_ring_scenario() {
        let topology = run_ring_scenario().unwrap();
        assert_eq!(topology.mirror_count(), 4);
        assert!(topology.is_valid());
        let mut graph = topology.graph().clone();
        assert!(graph.can_be_removed_from_structure(NodeId(2), StructureType::Ring, NodeId(1)));
    }

    #[test]
    fn test_three_ring_refuses_every_removal() {
        let topology = Topology::from_edges(TopologySpec::Ring, 1, &[(1, 2), (2, 3), (3, 1)]).unwrap();
        let mut graph = topology.graph().clone();
        for id in 1..=3 {
            assert!(!graph.can_be_removed_from_structure(NodeId(id), StructureType::Ring, NodeId(1)));
        }
    }

    #[test]
    fn test_n_connected_scenario() {
        let topology = run_n_connected_scenario().unwrap();
        assert!(topology.is_valid());
        assert_eq!(topology.expected_links(), 5);
        assert!(topology
            .graph()
            .is_fault_tolerant(StructureType::NConnected, NodeId(1)));
    }

    #[test]
    fn test_unknown_scenario() {
        let err = run_named("mesh").unwrap_err();
        assert!(matches!(err, SimulationError::UnknownScenario(name) if name == "mesh"));
    }
}
