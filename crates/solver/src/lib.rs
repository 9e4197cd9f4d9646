//! # contract-fv-solver
//!
//! CHC solver drivers for the contract checker.
//!
//! The encoder talks to a solver exclusively through the [`ChcInterface`]
//! trait: relations are registered with typed signatures, rules are
//! asserted as implications, and reachability queries return a
//! [`CheckResult`] plus a counterexample DAG.
//!
//! Two drivers are provided:
//!
//! - [`ChcSmtLib2Interface`] renders each query as a full `HORN` script,
//!   answers from a read-only cache keyed by the SHA-256 of the script
//!   (or an external callback), and records queries nobody could answer.
//! - [`HornCliSolver`] spawns an SMT-LIB2 compatible Horn solver
//!   (Z3/Spacer or Eldarica) as a subprocess with OS-level timeout
//!   enforcement.

pub mod config;
pub mod error;
pub mod interface;
pub mod process;
pub mod result;
pub mod smtlib2;

pub use config::{HornSolverConfig, HornSolverKind};
pub use error::SolverError;
pub use interface::ChcInterface;
pub use process::HornCliSolver;
pub use result::{CexGraph, CexNode, CheckResult};
pub use smtlib2::ChcSmtLib2Interface;
