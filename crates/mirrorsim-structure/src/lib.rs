//! # Mirrorsim Structure
//!
//! Typed multi-structure graph model for replication topologies.
//!
//! One set of nodes can belong to several structure instances at once,
//! possibly of the same shape. Every edge records which instances it
//! belongs to: per structure type, the id of the head that scopes the
//! instance. Traversal, validation, growth and shrink decisions all stay
//! inside a single `(type, head)` instance.
//!
//! ## Core Components
//!
//! - [`StructureGraph`]: Arena of nodes indexed by id, with child mutation,
//!   head discovery and lifecycle helpers
//! - [`TypedEdge`]: Per-edge membership record
//! - [`Shape`]: Closed set of shape kinds with their parameters
//! - [`Scope`]: Borrowed view of one structure instance: members, degrees,
//!   cycle checks, paths and analytics
//! - [`LinkClassification`]: Implemented links split into internal and
//!   boundary-crossing links
//!
//! ## Shapes
//!
//! Tree, Line, Balanced tree, Depth-limited tree, Ring, Star, Fully
//! connected and N-connected. The policies for each live in [`variants`].
//!
//! ## Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use mirrorsim_core::{NodeId, StructureType};
//! use mirrorsim_structure::{Shape, StructureGraph};
//!
//! let mut graph: StructureGraph = StructureGraph::new();
//! for id in 1..=3 {
//!     graph.insert_node(NodeId(id), Shape::Ring).unwrap();
//! }
//! graph.set_head(NodeId(1), StructureType::Ring, true).unwrap();
//! let heads = BTreeMap::from([(StructureType::Ring, NodeId(1))]);
//! for (a, b) in [(1, 2), (2, 3), (3, 1)] {
//!     graph.add_child(NodeId(a), NodeId(b), &[], &heads).unwrap();
//! }
//! assert!(graph.is_valid_structure(NodeId(2), StructureType::Ring));
//! ```

pub mod binding;
pub mod edge;
pub mod graph;
pub mod node;
pub mod paths;
pub mod probe;
pub mod scope;
pub mod shape;
pub mod variants;

// Re-export main types
pub use binding::LinkClassification;
pub use edge::TypedEdge;
pub use graph::{EdgeChange, StructureGraph};
pub use node::StructureNode;
pub use scope::Scope;
pub use shape::{MIN_CONNECTIVITY_DEGREE, Shape};
pub use variants::tree::BalanceInfo;

// Re-export core vocabulary for convenience
pub use mirrorsim_core::{
    LinkEnds, LinkId, MirrorId, MirrorPayload, NodeId, StructureError, StructureResult,
    StructureType, Unbound,
};
