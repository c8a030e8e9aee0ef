//! # Mirrorsim Core
//!
//! Shared vocabulary for the mirrorsim workspace.
//!
//! This crate provides the identifiers and enumerations that both the
//! structural layer and the simulation driver speak, so neither has to
//! depend on the other's internals.
//!
//! ## Key Types
//!
//! - [`NodeId`]: Identity of a node in a structure graph
//! - [`MirrorId`] / [`LinkId`]: Identity of the simulated endpoints and links
//! - [`StructureType`]: The shape kinds a node or edge can belong to
//! - [`StructureError`]: Failures of structural mutation and probing
//!
//! ## Key Traits
//!
//! - [`MirrorPayload`]: The seam through which a structure node sees the
//!   links its bound mirror has actually implemented

pub mod error;
pub mod traits;
pub mod types;

// Re-export main types
pub use error::*;
pub use traits::*;
pub use types::*;
