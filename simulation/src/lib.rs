//! # Mirrorsim
//!
//! A churn simulation of replicated mirrors arranged in typed structures.
//!
//! ## Overview
//!
//! Mirrors join and leave over discrete ticks while the structure they
//! form must keep its shape. Key features:
//!
//! - **Eight shapes**: tree, line, balanced tree, depth-limited tree, ring,
//!   star, fully connected and N-connected
//! - **Shape-preserving churn**: every arrival or departure is checked
//!   against the shape's growth and shrink policy, applied, validated and
//!   undone if the result is invalid
//! - **Link lifecycle**: planned links are requested, open after a
//!   handshake, and are torn down when churned or when the plan moves away
//!   from them
//! - **Reproducible runs**: one seeded generator drives every decision
//!
//! ## Architecture
//!
//! - **Types** (`types.rs`): `Mirror`, `Link` and its lifecycle, `SimEvent`
//! - **Topology** (`topology.rs`): shape builders and grow/shrink over the
//!   structure graph
//! - **Simulation** (`simulation.rs`): discrete-time churn engine
//! - **Scenarios** (`scenarios.rs`): pre-built walkthroughs
//!
//! ## Example
//!
//! ```rust
//! use mirrorsim_simulation::{Change, TopologyBuilder, TopologySpec};
//!
//! let mut ring = TopologyBuilder::new(3).build(TopologySpec::Ring).unwrap();
//! assert!(ring.is_valid());
//!
//! // A fourth mirror is spliced in before the head
//! assert!(matches!(ring.grow().unwrap(), Change::Applied { .. }));
//! assert_eq!(ring.mirror_count(), 4);
//! assert!(ring.is_valid());
//! ```

pub mod error;
pub mod scenarios;
pub mod simulation;
pub mod topology;
pub mod types;

// Re-export main types
pub use error::{SimResult, SimulationError};
pub use simulation::{SimConfig, SimStats, Simulation};
pub use topology::{Change, LinkProgress, Topology, TopologyBuilder, TopologySpec};
pub use types::{Link, LinkState, Mirror, RejectReason, SimEvent};
