//! Encoding context: SSA-indexed symbolic variables, the blockchain
//! state symbol, the error flag, and the incremental assertion stack.
//!
//! Every program variable is represented by a family of SMT constants
//! `name_declid_k`, one per SSA version `k`. Dynamic arrays additionally
//! track a hidden length constant `name_declid_length_k` that follows the
//! array through every predicate signature. The blockchain state symbol
//! `state_k` is the balances array; advancing it models any observable
//! state change. The error flag `error_k` is an SSA integer where zero
//! means "no error so far".

use std::collections::{BTreeMap, BTreeSet};

use contract_fv_smtlib::sort::Sort;
use contract_fv_smtlib::term::Term;

use crate::ast::{NodeId, Type, VariableDeclaration};

/// SMT sort of a program type.
pub fn smt_sort(ty: &Type) -> Sort {
    match ty {
        Type::Bool => Sort::Bool,
        Type::Address | Type::Int { .. } => Sort::Int,
        Type::Array(_) | Type::Mapping(_, _) => {
            Sort::Array(Box::new(Sort::Int), Box::new(Sort::Int))
        }
    }
}

/// The sorts a variable contributes to a predicate signature:
/// its value sort, plus a length slot for dynamic arrays.
pub fn slot_sorts(ty: &Type) -> Vec<Sort> {
    match ty {
        Type::Array(_) => vec![smt_sort(ty), Sort::Int],
        _ => vec![smt_sort(ty)],
    }
}

#[derive(Debug)]
struct SsaVariable {
    name: String,
    ty: Type,
    index: usize,
    /// Present for dynamic arrays only.
    length_index: Option<usize>,
}

/// Mutable encoding state owned by one analysis.
#[derive(Debug, Default)]
pub struct EncodingContext {
    variables: BTreeMap<NodeId, SsaVariable>,
    state_index: usize,
    error_index: usize,
    assertion_frames: Vec<Vec<Term>>,
    pending_declarations: Vec<(String, Sort)>,
    declared: BTreeSet<String>,
    next_unique_id: u32,
}

impl EncodingContext {
    pub fn new() -> Self {
        let mut ctx = Self::default();
        ctx.assertion_frames.push(Vec::new());
        ctx
    }

    /// Drop all knowledge; used when a fresh analysis starts.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    // --- Variables ---

    pub fn create_variable(&mut self, decl: &VariableDeclaration) {
        if self.variables.contains_key(&decl.id) {
            return;
        }
        let length_index = matches!(decl.ty, Type::Array(_)).then_some(0);
        self.variables.insert(
            decl.id,
            SsaVariable {
                name: decl.name.clone(),
                ty: decl.ty.clone(),
                index: 0,
                length_index,
            },
        );
    }

    pub fn known_variable(&self, id: NodeId) -> bool {
        self.variables.contains_key(&id)
    }

    pub fn variable_type(&self, id: NodeId) -> &Type {
        &self.var(id).ty
    }

    fn var(&self, id: NodeId) -> &SsaVariable {
        self.variables
            .get(&id)
            .unwrap_or_else(|| panic!("unknown variable {id}"))
    }

    pub fn value_at_index(&mut self, id: NodeId, index: usize) -> Term {
        let var = self.var(id);
        let name = format!("{}_{}_{}", var.name, id, index);
        let sort = smt_sort(&var.ty);
        self.mint(name, sort)
    }

    pub fn current_value(&mut self, id: NodeId) -> Term {
        let index = self.var(id).index;
        self.value_at_index(id, index)
    }

    pub fn length_at_index(&mut self, id: NodeId, index: usize) -> Term {
        let var = self.var(id);
        assert!(var.length_index.is_some(), "variable {id} has no length");
        let name = format!("{}_{}_length_{}", var.name, id, index);
        self.mint(name, Sort::Int)
    }

    pub fn current_length(&mut self, id: NodeId) -> Term {
        let index = self.var(id).length_index.expect("variable has no length");
        self.length_at_index(id, index)
    }

    /// Allocate the next SSA version and return its constant.
    pub fn increase_index(&mut self, id: NodeId) -> Term {
        let var = self.variables.get_mut(&id).expect("unknown variable");
        var.index += 1;
        self.current_value(id)
    }

    pub fn increase_length_index(&mut self, id: NodeId) -> Term {
        let var = self.variables.get_mut(&id).expect("unknown variable");
        let index = var.length_index.as_mut().expect("variable has no length");
        *index += 1;
        self.current_length(id)
    }

    /// Reset the variable to SSA version zero (block transitions).
    pub fn reset_variable(&mut self, id: NodeId) {
        let var = self.variables.get_mut(&id).expect("unknown variable");
        var.index = 0;
        if let Some(length) = var.length_index.as_mut() {
            *length = 0;
        }
    }

    /// Move the variable to a fresh unconstrained version (knowledge erasure).
    pub fn havoc_variable(&mut self, id: NodeId) {
        self.increase_index(id);
        if self.var(id).length_index.is_some() {
            self.increase_length_index(id);
        }
    }

    /// The terms a variable contributes to a predicate application at a
    /// given SSA index: value plus length for arrays.
    pub fn slot_terms_at(&mut self, id: NodeId, index: usize) -> Vec<Term> {
        let has_length = self.var(id).length_index.is_some();
        let mut terms = vec![self.value_at_index(id, index)];
        if has_length {
            terms.push(self.length_at_index(id, index));
        }
        terms
    }

    pub fn slot_terms_current(&mut self, id: NodeId) -> Vec<Term> {
        let var = self.var(id);
        let index = var.index;
        let length_index = var.length_index;
        let mut terms = vec![self.value_at_index(id, index)];
        if let Some(length_index) = length_index {
            terms.push(self.length_at_index(id, length_index));
        }
        terms
    }

    // --- Blockchain state ---

    pub fn this_address(&mut self) -> Term {
        self.mint("this_address".to_string(), Sort::Int)
    }

    pub fn state(&mut self) -> Term {
        self.state_at(self.state_index)
    }

    pub fn state_at(&mut self, index: usize) -> Term {
        self.mint(format!("state_{index}"), Sort::state())
    }

    pub fn new_state(&mut self) -> Term {
        self.state_index += 1;
        self.state()
    }

    /// `addr.balance` at the current state.
    pub fn balance(&mut self, address: Term) -> Term {
        Term::Select(Box::new(self.state()), Box::new(address))
    }

    // --- Error flag ---

    pub fn error_flag(&mut self) -> Term {
        self.error_at(self.error_index)
    }

    pub fn error_at(&mut self, index: usize) -> Term {
        self.mint(format!("error_{index}"), Sort::Int)
    }

    pub fn increase_error_index(&mut self) -> Term {
        self.error_index += 1;
        self.error_flag()
    }

    pub fn reset_error_index(&mut self) {
        self.error_index = 0;
    }

    // --- Assertion stack ---

    pub fn push_frame(&mut self) {
        self.assertion_frames.push(Vec::new());
    }

    pub fn pop_frame(&mut self) {
        assert!(
            self.assertion_frames.len() > 1,
            "cannot pop the base assertion frame"
        );
        self.assertion_frames.pop();
    }

    pub fn frame_depth(&self) -> usize {
        self.assertion_frames.len() - 1
    }

    pub fn add_assertion(&mut self, term: Term) {
        self.assertion_frames
            .last_mut()
            .expect("assertion stack is never empty")
            .push(term);
    }

    /// Conjunction of all assertions on the stack.
    pub fn assertions(&self) -> Term {
        Term::and(
            self.assertion_frames
                .iter()
                .flat_map(|frame| frame.iter().cloned())
                .collect(),
        )
    }

    // --- Declarations and the uniquifier ---

    fn mint(&mut self, name: String, sort: Sort) -> Term {
        if self.declared.insert(name.clone()) {
            self.pending_declarations.push((name.clone(), sort));
        }
        Term::Const(name)
    }

    /// Declarations minted since the last drain, to forward to the solver.
    pub fn drain_declarations(&mut self) -> Vec<(String, Sort)> {
        std::mem::take(&mut self.pending_declarations)
    }

    /// Monotonic per-analysis counter for predicate names and error ids.
    pub fn new_unique_id(&mut self) -> u32 {
        let id = self.next_unique_id;
        self.next_unique_id += 1;
        id
    }
}
