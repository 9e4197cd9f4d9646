//! Shared test harness: a scriptable in-memory CHC solver.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use contract_fv_smtlib::sort::Sort;
use contract_fv_smtlib::term::Term;
use contract_fv_solver::{CexGraph, CheckResult, ChcInterface};

#[derive(Debug, Default)]
pub struct MockState {
    pub relations: Vec<(String, Vec<Sort>)>,
    pub variables: Vec<(String, Sort)>,
    pub rules: Vec<(Term, String)>,
    pub queries: Vec<Term>,
    pub scripted: VecDeque<CheckResult>,
    pub resets: usize,
}

/// Records everything the encoder sends and answers queries from a
/// script (default: unsatisfiable, i.e. "safe").
#[derive(Debug, Clone, Default)]
pub struct MockSolver {
    pub state: Rc<RefCell<MockState>>,
}

impl MockSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue up answers for the next queries, in order.
    pub fn script(&self, results: impl IntoIterator<Item = CheckResult>) {
        self.state.borrow_mut().scripted.extend(results);
    }

    pub fn relation_names(&self) -> Vec<String> {
        self.state
            .borrow()
            .relations
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn rule_names(&self) -> Vec<String> {
        self.state
            .borrow()
            .rules
            .iter()
            .map(|(_, name)| name.clone())
            .collect()
    }

    pub fn rules(&self) -> Vec<Term> {
        self.state
            .borrow()
            .rules
            .iter()
            .map(|(rule, _)| rule.clone())
            .collect()
    }

    pub fn query_count(&self) -> usize {
        self.state.borrow().queries.len()
    }
}

impl ChcInterface for MockSolver {
    fn register_relation(&mut self, name: &str, arg_sorts: &[Sort]) {
        self.state
            .borrow_mut()
            .relations
            .push((name.to_string(), arg_sorts.to_vec()));
    }

    fn declare_variable(&mut self, name: &str, sort: Sort) {
        self.state
            .borrow_mut()
            .variables
            .push((name.to_string(), sort));
    }

    fn add_rule(&mut self, rule: &Term, name: &str) {
        self.state
            .borrow_mut()
            .rules
            .push((rule.clone(), name.to_string()));
    }

    fn query(&mut self, query: &Term) -> (CheckResult, CexGraph) {
        let mut state = self.state.borrow_mut();
        state.queries.push(query.clone());
        let result = state
            .scripted
            .pop_front()
            .unwrap_or(CheckResult::Unsatisfiable);
        (result, CexGraph::default())
    }

    fn reset(&mut self) {
        let mut state = self.state.borrow_mut();
        state.resets += 1;
        state.relations.clear();
        state.variables.clear();
        state.rules.clear();
    }
}
