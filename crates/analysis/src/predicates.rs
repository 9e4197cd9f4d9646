//! Uninterpreted predicate symbols and their signatures.
//!
//! Each predicate is created exactly once per (kind, node), carries a
//! stable name derived from AST identity plus a monotonic counter, and —
//! for summaries — remembers how its argument list decomposes into state
//! variables, inputs, outputs and pre/post blockchain state so that
//! counterexamples can be reconstructed later.

use contract_fv_smtlib::sort::Sort;
use contract_fv_smtlib::term::Term;

use crate::ast::{NodeId, VariableDeclaration};
use crate::context::slot_sorts;

/// Classification of predicates in the encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredicateKind {
    /// Reachable contract states between transactions.
    Interface,
    /// Transition relation over transaction boundaries.
    NondetInterface,
    /// The state right after deployment, before any constructor runs.
    ImplicitConstructor,
    /// Input/output relation of the whole construction phase.
    ConstructorSummary,
    /// Function pre-state.
    FunctionEntry,
    /// Input/output relation of one function.
    FunctionSummary,
    /// One control-flow point inside a function body.
    FunctionBlock,
    /// Nullary reachability target.
    Error,
    /// Escape hatch for auxiliary relations.
    Custom,
}

/// How a summary's argument vector decomposes, for counterexample
/// reconstruction. Slot widths account for the hidden length slot of
/// dynamic arrays.
#[derive(Debug, Clone)]
pub struct SummarySignature {
    pub contract_name: String,
    /// `None` for constructor summaries.
    pub function_name: Option<String>,
    pub state_var_slots: Vec<(String, usize)>,
    pub param_slots: Vec<(String, usize)>,
    pub return_slots: Vec<(String, usize)>,
}

fn width(slots: &[(String, usize)]) -> usize {
    slots.iter().map(|(_, w)| w).sum()
}

/// Pair up variable names with their model values from an argument slice.
/// Array variables render as their length, which is the readable part.
fn zip_values(slots: &[(String, usize)], args: &[String]) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut offset = 0;
    for (name, w) in slots {
        assert!(offset + w <= args.len(), "model arity mismatch");
        if *w == 2 {
            out.push((format!("{name}.length"), args[offset + 1].clone()));
        } else {
            out.push((name.clone(), args[offset].clone()));
        }
        offset += w;
    }
    out
}

impl SummarySignature {
    fn is_constructor(&self) -> bool {
        self.function_name.is_none()
    }

    /// Total argument count of the predicate this signature describes.
    pub fn arity(&self) -> usize {
        if self.is_constructor() {
            // err, this, state, state variables
            3 + width(&self.state_var_slots)
        } else {
            // err, this, pre state, pre state vars, pre params,
            // post state, post state vars, post params, returns
            4 + 2 * width(&self.state_var_slots)
                + 2 * width(&self.param_slots)
                + width(&self.return_slots)
        }
    }

    /// Post-transaction state variable values.
    pub fn state_values(&self, args: &[String]) -> Vec<(String, String)> {
        let offset = if self.is_constructor() {
            3
        } else {
            4 + width(&self.state_var_slots) + width(&self.param_slots)
        };
        zip_values(&self.state_var_slots, &args[offset..])
    }

    /// Input parameter values at the time of the call.
    pub fn pre_input_values(&self, args: &[String]) -> Vec<(String, String)> {
        assert!(!self.is_constructor());
        let offset = 3 + width(&self.state_var_slots);
        zip_values(&self.param_slots, &args[offset..])
    }

    /// Input parameter values when the function returned.
    pub fn post_input_values(&self, args: &[String]) -> Vec<(String, String)> {
        assert!(!self.is_constructor());
        let offset = 4 + 2 * width(&self.state_var_slots) + width(&self.param_slots);
        zip_values(&self.param_slots, &args[offset..])
    }

    /// Return parameter values when the function returned.
    pub fn post_output_values(&self, args: &[String]) -> Vec<(String, String)> {
        assert!(!self.is_constructor());
        let offset = 4 + 2 * width(&self.state_var_slots) + 2 * width(&self.param_slots);
        zip_values(&self.return_slots, &args[offset..])
    }

    /// Render the transaction this summary stands for, e.g. `C.f(2, 7)`.
    pub fn format_summary_call(&self, args: &[String]) -> String {
        match &self.function_name {
            None => format!("{}.constructor()", self.contract_name),
            Some(function) => {
                let inputs = self.pre_input_values(args);
                let rendered: Vec<&str> =
                    inputs.iter().map(|(_, value)| value.as_str()).collect();
                format!("{}.{}({})", self.contract_name, function, rendered.join(", "))
            }
        }
    }
}

/// An uninterpreted relation symbol.
#[derive(Debug, Clone)]
pub struct Predicate {
    pub name: String,
    pub kind: PredicateKind,
    pub arg_sorts: Vec<Sort>,
    /// AST node this predicate was created for.
    pub node: Option<NodeId>,
    /// Argument layout metadata, present on summaries.
    pub signature: Option<SummarySignature>,
}

impl Predicate {
    pub fn is_summary(&self) -> bool {
        matches!(
            self.kind,
            PredicateKind::FunctionSummary | PredicateKind::ConstructorSummary
        )
    }

    pub fn is_interface(&self) -> bool {
        self.kind == PredicateKind::Interface
    }

    /// Apply the predicate to an argument vector.
    pub fn app(&self, args: Vec<Term>) -> Term {
        assert_eq!(
            args.len(),
            self.arg_sorts.len(),
            "arity mismatch applying {}",
            self.name
        );
        Term::App(self.name.clone(), args)
    }
}

pub type PredId = usize;

/// All predicates of one analysis, looked up by id or name.
#[derive(Debug, Default)]
pub struct PredicateRegistry {
    predicates: Vec<Predicate>,
    by_name: std::collections::BTreeMap<String, PredId>,
}

impl PredicateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.predicates.clear();
        self.by_name.clear();
    }

    pub fn create(&mut self, predicate: Predicate) -> PredId {
        assert!(
            !self.by_name.contains_key(&predicate.name),
            "duplicate predicate name {}",
            predicate.name
        );
        let id = self.predicates.len();
        self.by_name.insert(predicate.name.clone(), id);
        self.predicates.push(predicate);
        id
    }

    pub fn get(&self, id: PredId) -> &Predicate {
        &self.predicates[id]
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Predicate> {
        self.by_name.get(name).map(|id| &self.predicates[*id])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Predicate> {
        self.predicates.iter()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Sort builders
// ---------------------------------------------------------------------------

fn slot_sorts_of(vars: &[&VariableDeclaration]) -> Vec<Sort> {
    vars.iter().flat_map(|var| slot_sorts(&var.ty)).collect()
}

/// `interface(C)`: (this, state, state variables).
pub fn interface_sorts(state_vars: &[&VariableDeclaration]) -> Vec<Sort> {
    let mut sorts = vec![Sort::Int, Sort::state()];
    sorts.extend(slot_sorts_of(state_vars));
    sorts
}

/// `nondet_interface(C)`: (err, this, pre state, pre vars, post state, post vars).
pub fn nondet_interface_sorts(state_vars: &[&VariableDeclaration]) -> Vec<Sort> {
    let vars = slot_sorts_of(state_vars);
    let mut sorts = vec![Sort::Int, Sort::Int, Sort::state()];
    sorts.extend(vars.clone());
    sorts.push(Sort::state());
    sorts.extend(vars);
    sorts
}

/// `implicit_constructor(C)`: (err, this, state).
pub fn implicit_constructor_sorts() -> Vec<Sort> {
    vec![Sort::Int, Sort::Int, Sort::state()]
}

/// `constructor_summary(C)`: (err, this, state, state variables).
pub fn constructor_sorts(state_vars: &[&VariableDeclaration]) -> Vec<Sort> {
    let mut sorts = vec![Sort::Int, Sort::Int, Sort::state()];
    sorts.extend(slot_sorts_of(state_vars));
    sorts
}

/// `function_summary(f, C)` and `function_entry(f)`:
/// (err, this, pre state, pre vars, pre params, post state, post vars,
/// post params, returns).
pub fn function_sorts(
    state_vars: &[&VariableDeclaration],
    params: &[&VariableDeclaration],
    returns: &[&VariableDeclaration],
) -> Vec<Sort> {
    let vars = slot_sorts_of(state_vars);
    let param_sorts = slot_sorts_of(params);
    let mut sorts = vec![Sort::Int, Sort::Int, Sort::state()];
    sorts.extend(vars.clone());
    sorts.extend(param_sorts.clone());
    sorts.push(Sort::state());
    sorts.extend(vars);
    sorts.extend(param_sorts);
    sorts.extend(slot_sorts_of(returns));
    sorts
}

/// `function_block(n)`: the function sort extended with the locals.
pub fn function_body_sorts(
    state_vars: &[&VariableDeclaration],
    params: &[&VariableDeclaration],
    returns: &[&VariableDeclaration],
    locals: &[&VariableDeclaration],
) -> Vec<Sort> {
    let mut sorts = function_sorts(state_vars, params, returns);
    sorts.extend(slot_sorts_of(locals));
    sorts
}

/// Slot layout of a variable list, for summary signatures.
pub fn slot_layout(vars: &[&VariableDeclaration]) -> Vec<(String, usize)> {
    vars.iter()
        .map(|var| (var.name.clone(), slot_sorts(&var.ty).len()))
        .collect()
}
