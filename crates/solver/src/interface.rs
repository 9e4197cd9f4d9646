//! Abstraction over CHC solver backends.
//!
//! The encoder registers relations, asserts implication rules, and asks
//! reachability queries. Implementations range from the SMT-LIB2 text
//! driver (with response cache) to subprocess Horn solvers.

use contract_fv_smtlib::sort::Sort;
use contract_fv_smtlib::term::Term;

use crate::result::{CexGraph, CheckResult};

/// Trait abstracting over CHC solver backends.
pub trait ChcInterface {
    /// Introduce an uninterpreted relation symbol with the given
    /// argument sorts. The relation's result sort is always `Bool`.
    fn register_relation(&mut self, name: &str, arg_sorts: &[Sort]);

    /// Declare a free variable that may occur in subsequent rules.
    /// Rule variables are universally quantified per rule at render time.
    fn declare_variable(&mut self, name: &str, sort: Sort);

    /// Assert `body => head` as a Horn rule. `name` is used for solver
    /// diagnostics only.
    fn add_rule(&mut self, rule: &Term, name: &str);

    /// Ask whether the given predicate application is reachable.
    fn query(&mut self, query: &Term) -> (CheckResult, CexGraph);

    /// Clear all registered relations, variables and rules.
    fn reset(&mut self);

    /// Toggle solver preprocessing.
    ///
    /// Used to retry satisfiable queries with optimizations disabled so
    /// that counterexamples come back complete. Default: no-op.
    fn set_preprocessing(&mut self, _enabled: bool) {}

    /// Queries this driver could not answer locally. Non-empty only for
    /// drivers that depend on cached responses or external dispatch.
    fn unhandled_queries(&self) -> Vec<String> {
        Vec::new()
    }
}
