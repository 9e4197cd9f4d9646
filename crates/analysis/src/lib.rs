//! # contract-fv-analysis
//!
//! CHC encoding of annotated contract programs.
//!
//! The analysis walks a typed AST of contracts, functions and statements
//! and emits, per control-flow block, uninterpreted predicate symbols
//! together with implication rules that soundly over-approximate the
//! program's transition relation. Safety properties — assertion
//! violations, arithmetic under/overflow, division by zero, popping
//! empty arrays — become reachability queries against a Horn solver.
//!
//! ## Usage
//!
//! ```
//! use std::collections::BTreeMap;
//! use contract_fv_analysis::builder::AstBuilder;
//! use contract_fv_analysis::chc::ChcAnalyzer;
//! use contract_fv_analysis::reporter::SharedReporter;
//! use contract_fv_solver::ChcSmtLib2Interface;
//!
//! let mut builder = AstBuilder::new();
//! let contract = builder.contract("C", vec![], vec![]);
//! let unit = builder.source_unit(vec![contract]);
//!
//! let solver = ChcSmtLib2Interface::new(BTreeMap::new(), None);
//! let reporter = SharedReporter::new();
//! let mut analyzer = ChcAnalyzer::new(Box::new(solver), Box::new(reporter.clone()));
//! analyzer.analyze(&unit);
//! ```

pub mod ast;
pub mod builder;
pub mod call_graph;
pub mod cex;
pub mod chc;
pub mod context;
pub mod exprs;
pub mod predicates;
pub mod reporter;
pub mod targets;

pub use chc::ChcAnalyzer;
pub use reporter::{ErrorReporter, SharedReporter, Warning};
pub use targets::TargetKind;
