//! Simulation engine for mirror churn
//!
//! Implements discrete-time simulation with:
//! - Link handshakes finishing one tick after they start
//! - Random mirror arrivals and departures, each checked against the shape
//! - Random link requests for planned pairs and random link tear-downs
//! - Periodic validation of the structure instance
//!
//! All randomness comes from one seeded generator, so a configuration
//! replays identically.

use std::path::Path;

use mirrorsim_core::{LinkId, MirrorId, NodeId};
use mirrorsim_logging::StructureContextGuard;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::error::{SimResult, SimulationError};
use crate::topology::{Change, Topology, TopologyBuilder, TopologySpec};
use crate::types::{RejectReason, SimEvent};

/// Configuration for the simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for every random decision
    pub seed: u64,
    /// Ticks `run` advances
    pub ticks: u64,
    /// Mirrors in the initial topology
    pub initial_mirrors: usize,
    pub topology: TopologySpec,
    /// Preferred children per member for Tree and Depth-limited trees
    pub fanout: usize,
    /// Probability a mirror tries to join each tick
    pub add_mirror_probability: f64,
    /// Probability a random mirror tries to leave each tick
    pub remove_mirror_probability: f64,
    /// Probability each pending planned link is requested per tick
    pub link_open_probability: f64,
    /// Probability each open link is torn down per tick
    pub link_close_probability: f64,
    /// Validate the instance every this many ticks (0 = never)
    pub validate_every: u64,
    /// Ceiling on mirrors (None = no limit)
    pub max_mirrors: Option<usize>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            ticks: 100,
            initial_mirrors: 8,
            topology: TopologySpec::default(),
            fanout: 2,
            add_mirror_probability: 0.3,
            remove_mirror_probability: 0.2,
            link_open_probability: 0.5,
            link_close_probability: 0.05,
            validate_every: 1,
            max_mirrors: Some(64),
        }
    }
}

impl SimConfig {
    pub fn from_json_str(json: &str) -> SimResult<Self> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn from_path(path: impl AsRef<Path>) -> SimResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Every churn probability lies within `[0, 1]`
    pub fn validate_probabilities(&self) -> SimResult<()> {
        let probabilities = [
            ("add_mirror_probability", self.add_mirror_probability),
            ("remove_mirror_probability", self.remove_mirror_probability),
            ("link_open_probability", self.link_open_probability),
            ("link_close_probability", self.link_close_probability),
        ];
        for (name, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(SimulationError::Config(format!(
                    "{name} must be within [0, 1], got {p}"
                )));
            }
        }
        Ok(())
    }

    /// Check probabilities and sizes
    pub fn validate(&self) -> SimResult<()> {
        self.validate_probabilities()?;
        if self.initial_mirrors < self.topology.min_mirrors() {
            return Err(SimulationError::Config(format!(
                "{} needs at least {} initial mirrors",
                self.topology.structure_type(),
                self.topology.min_mirrors()
            )));
        }
        if let Some(max) = self.max_mirrors {
            if max < self.initial_mirrors {
                return Err(SimulationError::Config(format!(
                    "max_mirrors {max} is below initial_mirrors {}",
                    self.initial_mirrors
                )));
            }
        }
        self.topology.shape()?;
        Ok(())
    }
}

/// Simulation statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimStats {
    pub mirrors_added: u64,
    pub mirrors_removed: u64,
    pub changes_rejected: u64,
    pub links_requested: u64,
    pub links_opened: u64,
    pub links_closed: u64,
    /// Links dropped because the plan moved away from them
    pub links_retired: u64,
    pub validations: u64,
    pub validation_failures: u64,
    /// Planned links not implemented at the end of the last tick
    pub pending_links: usize,
    /// Open links at the end of the last tick
    pub implemented_links: usize,
}

/// The simulation state
#[derive(Debug)]
pub struct Simulation {
    pub topology: Topology,
    /// Current simulation tick
    pub tick: u64,
    pub config: SimConfig,
    /// Global event log (all events)
    pub event_log: Vec<SimEvent>,
    pub stats: SimStats,
    run_id: Uuid,
    rng: StdRng,
}

impl Simulation {
    /// Build the initial topology from `config`
    pub fn new(config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        let topology = TopologyBuilder::new(config.initial_mirrors)
            .with_fanout(config.fanout)
            .build(config.topology)?;
        Self::with_topology(topology, config)
    }

    /// Drive an already built topology; the config's sizes and shape are
    /// ignored
    pub fn with_topology(topology: Topology, config: SimConfig) -> SimResult<Self> {
        config.validate_probabilities()?;
        let rng = StdRng::seed_from_u64(config.seed);
        let mut sim = Self {
            topology,
            tick: 0,
            config,
            event_log: Vec::new(),
            stats: SimStats::default(),
            run_id: Uuid::new_v4(),
            rng,
        };
        sim.refresh_link_counts();
        Ok(sim)
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Run a single simulation tick
    pub fn step(&mut self) -> SimResult<()> {
        let _ctx = StructureContextGuard::with_run_id(
            self.topology.structure_type(),
            self.topology.head(),
            self.run_id,
        );
        self.tick += 1;
        trace!("=== Tick {} ===", self.tick);

        // 1. Finish handshakes started last tick
        self.process_link_progress()?;

        // 2. Mirror arrivals and departures
        self.process_arrival()?;
        self.process_departure()?;

        // 3. Link requests and tear-downs
        self.process_link_requests()?;
        self.process_link_churn()?;

        // 4. Validation
        if self.config.validate_every > 0 && self.tick % self.config.validate_every == 0 {
            self.validate();
        }

        self.refresh_link_counts();
        Ok(())
    }

    /// Run until `config.ticks`
    pub fn run(&mut self) -> SimResult<&SimStats> {
        while self.tick < self.config.ticks {
            self.step()?;
        }
        info!(
            run_id = %self.run_id,
            tick = self.tick,
            mirrors = self.topology.mirror_count(),
            "simulation complete"
        );
        info!("Stats: {:?}", self.stats);
        Ok(&self.stats)
    }

    /// Run for a specific number of ticks
    pub fn run_ticks(&mut self, ticks: u64) -> SimResult<()> {
        for _ in 0..ticks {
            self.step()?;
        }
        Ok(())
    }

    fn emit_event(&mut self, event: SimEvent) {
        self.event_log.push(event);
    }

    fn process_link_progress(&mut self) -> SimResult<()> {
        let progress = self.topology.advance_links()?;
        for link in progress.opened {
            self.stats.links_opened += 1;
            self.emit_event(SimEvent::LinkOpened {
                tick: self.tick,
                link,
            });
        }
        for link in progress.closed {
            self.stats.links_closed += 1;
            self.emit_event(SimEvent::LinkClosed {
                tick: self.tick,
                link,
            });
        }
        Ok(())
    }

    fn process_arrival(&mut self) -> SimResult<()> {
        if !self.rng.random_bool(self.config.add_mirror_probability) {
            return Ok(());
        }
        if self
            .config
            .max_mirrors
            .is_some_and(|max| self.topology.mirror_count() >= max)
        {
            self.reject(None, RejectReason::MirrorLimit);
            return Ok(());
        }
        match self.topology.grow()? {
            Change::Applied { node, retired } => {
                self.stats.mirrors_added += 1;
                debug!(%node, tick = self.tick, "mirror joined");
                self.emit_event(SimEvent::MirrorAdded {
                    tick: self.tick,
                    mirror: mirror_of(node),
                    node,
                });
                self.record_retired(retired);
            }
            Change::Rejected(reason) => self.reject(None, reason),
        }
        Ok(())
    }

    fn process_departure(&mut self) -> SimResult<()> {
        if !self.rng.random_bool(self.config.remove_mirror_probability) {
            return Ok(());
        }
        let head = self.topology.head();
        let candidates: Vec<NodeId> = self
            .topology
            .members()
            .into_iter()
            .filter(|id| *id != head)
            .collect();
        if candidates.is_empty() {
            return Ok(());
        }
        let node = candidates[self.rng.random_range(0..candidates.len())];
        match self.topology.shrink(node)? {
            Change::Applied { node, retired } => {
                self.stats.mirrors_removed += 1;
                debug!(%node, tick = self.tick, "mirror left");
                self.emit_event(SimEvent::MirrorRemoved {
                    tick: self.tick,
                    mirror: mirror_of(node),
                    node,
                });
                self.record_retired(retired);
            }
            Change::Rejected(reason) => self.reject(Some(node), reason),
        }
        Ok(())
    }

    fn process_link_requests(&mut self) -> SimResult<()> {
        for (owner, child) in self.topology.pending_pairs() {
            if !self.rng.random_bool(self.config.link_open_probability) {
                continue;
            }
            let link = self.topology.request_link(owner, child, self.tick)?;
            self.stats.links_requested += 1;
            if let Some(requested) = self.topology.link(link) {
                self.emit_event(SimEvent::LinkRequested {
                    tick: self.tick,
                    link,
                    source: requested.source,
                    target: requested.target,
                });
            }
        }
        Ok(())
    }

    fn process_link_churn(&mut self) -> SimResult<()> {
        let open: Vec<_> = self
            .topology
            .links()
            .into_values()
            .filter(|link| link.state.is_implemented())
            .map(|link| link.id)
            .collect();
        for link in open {
            if self.rng.random_bool(self.config.link_close_probability) {
                self.topology.close_link(link)?;
                self.emit_event(SimEvent::LinkClosing {
                    tick: self.tick,
                    link,
                });
            }
        }
        Ok(())
    }

    /// Validate the instance, recording a failure
    pub fn validate(&mut self) -> bool {
        self.stats.validations += 1;
        let valid = self.topology.is_valid();
        if !valid {
            self.stats.validation_failures += 1;
            let structure_type = self.topology.structure_type();
            let head = self.topology.head();
            warn!(%structure_type, %head, tick = self.tick, "structure failed validation");
            self.emit_event(SimEvent::ValidationFailed {
                tick: self.tick,
                structure_type,
                head,
            });
        }
        valid
    }

    fn reject(&mut self, node: Option<NodeId>, reason: RejectReason) {
        self.stats.changes_rejected += 1;
        debug!(?node, ?reason, tick = self.tick, "change rejected");
        self.emit_event(SimEvent::ChangeRejected {
            tick: self.tick,
            node,
            reason,
        });
    }

    fn record_retired(&mut self, retired: Vec<LinkId>) {
        for link in retired {
            self.stats.links_retired += 1;
            self.emit_event(SimEvent::LinkClosed {
                tick: self.tick,
                link,
            });
        }
    }

    fn refresh_link_counts(&mut self) {
        self.stats.pending_links = self.topology.pending_links();
        self.stats.implemented_links = self.topology.implemented_links();
    }

    /// Get a summary of the current simulation state
    pub fn state_summary(&self) -> String {
        format!(
            "Tick {}: {} mirrors, {}/{} links open, {} rejected changes",
            self.tick,
            self.topology.mirror_count(),
            self.stats.implemented_links,
            self.topology.expected_links(),
            self.stats.changes_rejected
        )
    }
}

/// Mirror id bound to a topology node
fn mirror_of(node: NodeId) -> MirrorId {
    MirrorId(node.get())
}
