//! SMT-LIB2 text driver for CHC queries.
//!
//! Renders the accumulated Horn-clause system as a `(set-logic HORN)`
//! script once per query and tries to answer it from a read-only map of
//! cached responses keyed by the SHA-256 of the script, then from an
//! optional external callback. Queries nobody could answer are recorded
//! and exposed through [`ChcSmtLib2Interface::unhandled_queries`].

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use contract_fv_smtlib::command::Command;
use contract_fv_smtlib::script::Script;
use contract_fv_smtlib::sort::Sort;
use contract_fv_smtlib::term::Term;

use crate::interface::ChcInterface;
use crate::result::{CexGraph, CheckResult};

/// External dispatch for rendered queries: given the script text,
/// optionally produce the solver's response.
pub type QueryCallback = Box<dyn Fn(&str) -> Option<String>>;

/// Accumulated Horn-clause system plus the response sources.
pub struct ChcSmtLib2Interface {
    relations: BTreeMap<String, Vec<Sort>>,
    variables: BTreeMap<String, Sort>,
    rules: Vec<(Term, String)>,
    cached_responses: BTreeMap<[u8; 32], String>,
    callback: Option<QueryCallback>,
    unhandled: Vec<String>,
}

impl ChcSmtLib2Interface {
    pub fn new(
        cached_responses: BTreeMap<[u8; 32], String>,
        callback: Option<QueryCallback>,
    ) -> Self {
        Self {
            relations: BTreeMap::new(),
            variables: BTreeMap::new(),
            rules: Vec::new(),
            cached_responses,
            callback,
            unhandled: Vec::new(),
        }
    }

    /// SHA-256 of a rendered query script, the cache key.
    pub fn query_hash(script_text: &str) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(script_text.as_bytes());
        hasher.finalize().into()
    }

    fn dispatch(&mut self, text: &str) -> Option<String> {
        let hash = Self::query_hash(text);
        if let Some(response) = self.cached_responses.get(&hash) {
            tracing::debug!("CHC query answered from response cache");
            return Some(response.clone());
        }
        if let Some(callback) = &self.callback {
            if let Some(response) = callback(text) {
                return Some(response);
            }
        }
        self.unhandled.push(text.to_string());
        None
    }
}

impl ChcInterface for ChcSmtLib2Interface {
    fn register_relation(&mut self, name: &str, arg_sorts: &[Sort]) {
        self.relations
            .insert(name.to_string(), arg_sorts.to_vec());
    }

    fn declare_variable(&mut self, name: &str, sort: Sort) {
        self.variables.insert(name.to_string(), sort);
    }

    fn add_rule(&mut self, rule: &Term, name: &str) {
        self.rules.push((rule.clone(), name.to_string()));
    }

    fn query(&mut self, query: &Term) -> (CheckResult, CexGraph) {
        let script = build_horn_script(&self.relations, &self.variables, &self.rules, query);
        let text = script.to_string();
        let result = match self.dispatch(&text) {
            Some(response) => parse_response(&response),
            None => CheckResult::Unknown,
        };
        // The text driver cannot reconstruct derivations.
        (result, CexGraph::default())
    }

    fn reset(&mut self) {
        self.relations.clear();
        self.variables.clear();
        self.rules.clear();
    }

    fn unhandled_queries(&self) -> Vec<String> {
        self.unhandled.clone()
    }
}

/// Map a solver response to a query verdict.
///
/// The rendered script asserts the goal clause `query => false`, so the
/// solver reporting `sat` (the clause system is consistent) means the
/// query is unreachable, and `unsat` means a derivation of the query
/// exists.
pub fn parse_response(response: &str) -> CheckResult {
    let trimmed = response.trim_start();
    if trimmed.starts_with("unsat") {
        CheckResult::Satisfiable
    } else if trimmed.starts_with("sat") {
        CheckResult::Unsatisfiable
    } else if trimmed.starts_with("unknown") || trimmed.starts_with("timeout") {
        CheckResult::Unknown
    } else {
        CheckResult::Error
    }
}

/// Render the full Horn system plus one goal clause as an SMT-LIB2 script.
pub fn build_horn_script(
    relations: &BTreeMap<String, Vec<Sort>>,
    variables: &BTreeMap<String, Sort>,
    rules: &[(Term, String)],
    query: &Term,
) -> Script {
    let mut script = Script::new();
    script.push(Command::SetLogic("HORN".to_string()));
    for (name, sorts) in relations {
        script.push(Command::DeclareFun(name.clone(), sorts.clone(), Sort::Bool));
    }
    for (rule, name) in rules {
        if !name.is_empty() {
            script.push(Command::Comment(name.clone()));
        }
        script.push(Command::Assert(quantify(rule, variables)));
    }
    let goal = Term::implies(query.clone(), Term::BoolLit(false));
    script.push(Command::Assert(quantify(&goal, variables)));
    script.push(Command::CheckSat);
    script
}

/// Universally quantify the declared free variables of a rule.
fn quantify(rule: &Term, variables: &BTreeMap<String, Sort>) -> Term {
    let mut consts = std::collections::BTreeSet::new();
    rule.collect_consts(&mut consts);
    let bound: Vec<(String, Sort)> = consts
        .into_iter()
        .filter_map(|name| variables.get(&name).map(|sort| (name, sort.clone())))
        .collect();
    if bound.is_empty() {
        rule.clone()
    } else {
        Term::Forall(bound, Box::new(rule.clone()))
    }
}
