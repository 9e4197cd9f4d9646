//! # contract-fv-smtlib
//!
//! SMT-LIB representation for the CHC contract checker.
//!
//! This crate provides the symbolic-expression layer consumed by the
//! encoder: sorts and terms over the background theory of unbounded
//! integers, booleans and arrays, plus commands and scripts for
//! rendering whole Horn-clause systems as SMT-LIB2 text.
//!
//! ## Usage
//!
//! ```
//! use contract_fv_smtlib::sort::Sort;
//! use contract_fv_smtlib::term::Term;
//!
//! let x = Term::Const("x".to_string());
//! let gt = Term::IntGt(Box::new(x), Box::new(Term::IntLit(0)));
//! assert_eq!(gt.to_string(), "(> x 0)");
//! let _ = Sort::Array(Box::new(Sort::Int), Box::new(Sort::Int));
//! ```

pub mod command;
pub mod formatter;
pub mod script;
pub mod sort;
pub mod term;

pub use command::Command;
pub use script::Script;
pub use sort::Sort;
pub use term::Term;
