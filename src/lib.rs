#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # policy-splitter
//!
//! Offline driver for the split-and-aggregate reconciler: fixture loading,
//! convergence simulation and the CLI surface.

pub mod cli;
pub mod fixture;
pub mod simulate;

pub use fixture::{Fixture, StatusReport};
pub use simulate::{PassSummary, Phase, SimulationReport, Simulator};
