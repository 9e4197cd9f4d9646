//! CHC encoder: translates contract programs into Constrained Horn
//! Clauses and discharges safety queries against a Horn solver.
//!
//! The encoding walks the AST depth-first. Per contract it creates the
//! interface, nondeterministic-interface and constructor-summary
//! relations; per function an entry relation, a summary relation and one
//! block relation per control-flow point, connected by implication rules
//! that over-approximate the transition relation. Reaching a dedicated
//! error predicate is exactly the refutation witness for one
//! verification target.
//!
//! ## Encoding shape
//!
//! - Program variables and the blockchain state are in SSA form; moving
//!   to a new block pops the assertion frame and resets the indices.
//! - Each function is summarized as a relation over pre/post state;
//!   internal calls apply the callee summary, external calls havoc state
//!   through the nondet interface, unknown calls erase all knowledge.
//! - The error flag is an SSA integer: zero means no error so far, and a
//!   summary propagates a nonzero error id out to its caller.

use std::collections::{BTreeMap, BTreeSet};

use contract_fv_smtlib::term::Term;
use contract_fv_solver::{CheckResult, ChcInterface};

use crate::ast::{
    AstRegistry, Block, ContractDefinition, FunctionDefinition, NodeId, SourceUnit, Statement,
    Type,
};
use crate::call_graph::CallGraph;
use crate::cex::generate_counterexample;
use crate::context::EncodingContext;
use crate::predicates::{
    constructor_sorts, function_body_sorts, function_sorts, implicit_constructor_sorts,
    interface_sorts, nondet_interface_sorts, slot_layout, PredId, Predicate, PredicateKind,
    PredicateRegistry, SummarySignature,
};
use crate::reporter::ErrorReporter;
use crate::targets::{report_ids, sat_message, unknown_message, TargetKind, VerificationTarget};

/// One CHC analysis over a source unit and its imports.
///
/// All encoder state is owned here and reset by [`ChcAnalyzer::analyze`],
/// so one instance can be reused across runs.
pub struct ChcAnalyzer {
    pub(crate) ctx: EncodingContext,
    pub(crate) registry: PredicateRegistry,
    solver: Box<dyn ChcInterface>,
    reporter: Box<dyn ErrorReporter>,

    interfaces: BTreeMap<NodeId, PredId>,
    nondet_interfaces: BTreeMap<NodeId, PredId>,
    /// (contract, function) to summary predicate.
    summaries: BTreeMap<NodeId, BTreeMap<NodeId, PredId>>,
    constructor_summary: Option<PredId>,

    verification_targets: Vec<VerificationTarget>,
    /// Verdicts per scope node after `analyze`.
    pub safe_targets: BTreeMap<NodeId, BTreeSet<TargetKind>>,
    pub unsafe_targets: BTreeMap<NodeId, BTreeSet<TargetKind>>,
    pub(crate) function_assertions: BTreeMap<NodeId, BTreeSet<NodeId>>,
    pub(crate) error_ids: BTreeMap<NodeId, Vec<u32>>,
    pub(crate) call_graph: CallGraph,

    pub(crate) current_contract: Option<NodeId>,
    pub(crate) current_function: Option<NodeId>,
    /// State variable declarations of the current contract, inherited
    /// ones included, in storage order.
    pub(crate) state_variables: Vec<NodeId>,
    current_params: Vec<NodeId>,
    current_returns: Vec<NodeId>,
    current_locals: Vec<NodeId>,
    current_function_body: Option<NodeId>,

    current_block: Option<Term>,
    block_counter: u32,
    break_dest: Option<PredId>,
    continue_dest: Option<PredId>,
    pub(crate) unknown_function_call_seen: bool,
    pub(crate) path_conditions: Vec<Term>,
}

impl ChcAnalyzer {
    pub fn new(solver: Box<dyn ChcInterface>, reporter: Box<dyn ErrorReporter>) -> Self {
        Self {
            ctx: EncodingContext::new(),
            registry: PredicateRegistry::new(),
            solver,
            reporter,
            interfaces: BTreeMap::new(),
            nondet_interfaces: BTreeMap::new(),
            summaries: BTreeMap::new(),
            constructor_summary: None,
            verification_targets: Vec::new(),
            safe_targets: BTreeMap::new(),
            unsafe_targets: BTreeMap::new(),
            function_assertions: BTreeMap::new(),
            error_ids: BTreeMap::new(),
            call_graph: CallGraph::new(),
            current_contract: None,
            current_function: None,
            state_variables: Vec::new(),
            current_params: Vec::new(),
            current_returns: Vec::new(),
            current_locals: Vec::new(),
            current_function_body: None,
            current_block: None,
            block_counter: 0,
            break_dest: None,
            continue_dest: None,
            unknown_function_call_seen: false,
            path_conditions: Vec::new(),
        }
    }

    /// Run the full analysis: reset, pre-declare interfaces and
    /// summaries, emit rules for every contract, then discharge all
    /// verification targets.
    pub fn analyze(&mut self, source: &SourceUnit) {
        self.reset_source_analysis();
        let reg = AstRegistry::build(source);
        for unit in reg.sources.clone() {
            self.define_interfaces_and_summaries(unit, &reg);
        }
        for unit in reg.sources.clone() {
            for contract in &unit.contracts {
                self.visit_contract(contract, &reg);
            }
        }
        self.check_verification_targets();
    }

    /// Queries the solver driver could not answer locally.
    pub fn unhandled_queries(&self) -> Vec<String> {
        self.solver.unhandled_queries()
    }

    /// All error ids allocated during the last analysis.
    pub fn registered_error_ids(&self) -> Vec<u32> {
        self.error_ids.values().flatten().copied().collect()
    }

    // -----------------------------------------------------------------
    // Reset
    // -----------------------------------------------------------------

    fn reset_source_analysis(&mut self) {
        self.verification_targets.clear();
        self.safe_targets.clear();
        self.unsafe_targets.clear();
        self.function_assertions.clear();
        self.error_ids.clear();
        self.call_graph.clear();
        self.summaries.clear();
        self.interfaces.clear();
        self.nondet_interfaces.clear();
        self.constructor_summary = None;
        self.registry.clear();
        self.block_counter = 0;
        self.current_block = None;
        self.ctx.clear();
        self.solver.reset();
    }

    fn reset_contract_analysis(&mut self) {
        self.state_variables.clear();
        self.unknown_function_call_seen = false;
        self.break_dest = None;
        self.continue_dest = None;
        self.ctx.reset_error_index();
    }

    // -----------------------------------------------------------------
    // Predicate creation
    // -----------------------------------------------------------------

    fn unique_prefix(&mut self) -> String {
        let counter = self.block_counter;
        self.block_counter += 1;
        counter.to_string()
    }

    fn contract_suffix(contract: &ContractDefinition) -> String {
        format!("{}_{}", contract.name, contract.id)
    }

    fn create_symbolic_block(&mut self, predicate: Predicate) -> PredId {
        self.solver
            .register_relation(&predicate.name, &predicate.arg_sorts);
        self.registry.create(predicate)
    }

    /// Name for a block predicate created for `node`.
    fn predicate_name(&self, node: NodeId, reg: &AstRegistry<'_>) -> String {
        let contract = self.current_contract.expect("no contract in scope");
        let prefix = match self.current_function {
            Some(function_id) => {
                let (function, _) = reg.function(function_id);
                function.name.clone()
            }
            None => String::new(),
        };
        format!("{prefix}_{node}_{contract}")
    }

    fn create_block(
        &mut self,
        node: NodeId,
        prefix: &str,
        reg: &AstRegistry<'_>,
    ) -> PredId {
        let sorts = self.function_body_sorts_for_current(reg);
        let name = format!(
            "block_{}_{}{}",
            self.unique_prefix(),
            prefix,
            self.predicate_name(node, reg)
        );
        self.create_symbolic_block(Predicate {
            name,
            kind: PredicateKind::FunctionBlock,
            arg_sorts: sorts,
            node: Some(node),
            signature: None,
        })
    }

    fn function_sorts_for(
        &self,
        function: &FunctionDefinition,
        reg: &AstRegistry<'_>,
    ) -> Vec<contract_fv_smtlib::sort::Sort> {
        let state_vars: Vec<_> = self
            .state_variables
            .iter()
            .map(|id| reg.variable(*id))
            .collect();
        let params: Vec<_> = function.parameters.iter().map(|p| reg.variable(p.id)).collect();
        let returns: Vec<_> = function
            .return_parameters
            .iter()
            .map(|r| reg.variable(r.id))
            .collect();
        function_sorts(&state_vars, &params, &returns)
    }

    fn function_body_sorts_for_current(
        &self,
        reg: &AstRegistry<'_>,
    ) -> Vec<contract_fv_smtlib::sort::Sort> {
        let function_id = self.current_function.expect("no function in scope");
        let (function, _) = reg.function(function_id);
        let state_vars: Vec<_> = self
            .state_variables
            .iter()
            .map(|id| reg.variable(*id))
            .collect();
        let params: Vec<_> = function.parameters.iter().map(|p| reg.variable(p.id)).collect();
        let returns: Vec<_> = function
            .return_parameters
            .iter()
            .map(|r| reg.variable(r.id))
            .collect();
        let locals = function.local_variables();
        function_body_sorts(&state_vars, &params, &returns, &locals)
    }

    fn create_error_block(&mut self) -> PredId {
        let name = format!("error_target_{}", self.ctx.new_unique_id());
        self.create_symbolic_block(Predicate {
            name,
            kind: PredicateKind::Error,
            arg_sorts: vec![],
            node: None,
            signature: None,
        })
    }

    // -----------------------------------------------------------------
    // Predicate applications
    // -----------------------------------------------------------------

    fn state_var_slots_at(&mut self, index: usize) -> Vec<Term> {
        let vars = self.state_variables.clone();
        vars.iter()
            .flat_map(|id| self.ctx.slot_terms_at(*id, index))
            .collect()
    }

    fn state_var_slots_current(&mut self) -> Vec<Term> {
        let vars = self.state_variables.clone();
        vars.iter()
            .flat_map(|id| self.ctx.slot_terms_current(*id))
            .collect()
    }

    fn var_list_slots_at(&mut self, vars: &[NodeId], index: usize) -> Vec<Term> {
        vars.iter()
            .flat_map(|id| self.ctx.slot_terms_at(*id, index))
            .collect::<Vec<_>>()
    }

    fn var_list_slots_current(&mut self, vars: &[NodeId]) -> Vec<Term> {
        vars.iter()
            .flat_map(|id| self.ctx.slot_terms_current(*id))
            .collect::<Vec<_>>()
    }

    /// `interface(C)` over the current state variable values.
    pub(crate) fn interface_app(&mut self) -> Term {
        let contract = self.current_contract.expect("no contract in scope");
        let pred = self.interfaces[&contract];
        let mut args = vec![self.ctx.this_address(), self.ctx.state()];
        args.extend(self.state_var_slots_current());
        self.registry.get(pred).app(args)
    }

    /// `interface(C)` over the transaction-begin (index 0) values.
    fn interface_pre_app(&mut self) -> Term {
        let contract = self.current_contract.expect("no contract in scope");
        let pred = self.interfaces[&contract];
        let mut args = vec![self.ctx.this_address(), self.ctx.state_at(0)];
        args.extend(self.state_var_slots_at(0));
        self.registry.get(pred).app(args)
    }

    /// `interface(L)` of another (library) contract, current values.
    pub(crate) fn interface_app_of(&mut self, contract: NodeId, reg: &AstRegistry<'_>) -> Term {
        let pred = self.interfaces[&contract];
        let vars: Vec<NodeId> = reg
            .state_variables_including_inherited(reg.contract(contract))
            .iter()
            .map(|v| v.id)
            .collect();
        let mut args = vec![self.ctx.this_address(), self.ctx.state()];
        args.extend(self.var_list_slots_current(&vars));
        self.registry.get(pred).app(args)
    }

    /// `nondet_interface(C)` between two fixed state-variable indices.
    fn nondet_interface_app_at(
        &mut self,
        contract: NodeId,
        err: Term,
        pre: usize,
        post: usize,
    ) -> Term {
        let pred = self.nondet_interfaces[&contract];
        let mut args = vec![err, self.ctx.this_address(), self.ctx.state_at(pre)];
        args.extend(self.state_var_slots_at(pre));
        args.push(self.ctx.state_at(post));
        args.extend(self.state_var_slots_at(post));
        self.registry.get(pred).app(args)
    }

    /// `nondet_interface(C)` over explicit pre/post term vectors, used
    /// by the external-call encoding.
    pub(crate) fn nondet_interface_app_terms(
        &mut self,
        err: Term,
        pre: Vec<Term>,
        post: Vec<Term>,
    ) -> Term {
        let contract = self.current_contract.expect("no contract in scope");
        let pred = self.nondet_interfaces[&contract];
        let mut args = vec![err, self.ctx.this_address()];
        args.extend(pre);
        args.extend(post);
        self.registry.get(pred).app(args)
    }

    /// `constructor_summary(C)` over the current values.
    pub(crate) fn constructor_summary_app(&mut self) -> Term {
        let pred = self.constructor_summary.expect("constructor summary not created");
        let mut args = vec![
            self.ctx.error_flag(),
            self.ctx.this_address(),
            self.ctx.state(),
        ];
        args.extend(self.state_var_slots_current());
        self.registry.get(pred).app(args)
    }

    /// `function_summary(f, C)` in the standard layout: error flag, this,
    /// pre state (index 0), pre params (index 0), current post state.
    pub(crate) fn summary_app(&mut self, function: &FunctionDefinition) -> Term {
        let contract = self.current_contract.expect("no contract in scope");
        let pred = self.summaries[&contract][&function.id];
        let params: Vec<NodeId> = function.parameters.iter().map(|p| p.id).collect();
        let returns: Vec<NodeId> = function.return_parameters.iter().map(|r| r.id).collect();
        let mut args = vec![
            self.ctx.error_flag(),
            self.ctx.this_address(),
            self.ctx.state_at(0),
        ];
        args.extend(self.state_var_slots_at(0));
        args.extend(self.var_list_slots_at(&params, 0));
        args.push(self.ctx.state());
        args.extend(self.state_var_slots_current());
        args.extend(self.var_list_slots_current(&params));
        args.extend(self.var_list_slots_current(&returns));
        self.registry.get(pred).app(args)
    }

    /// The summary that errors in the current scope propagate to:
    /// the enclosing function's, or the constructor summary during
    /// construction code.
    pub(crate) fn enclosing_summary_app(&mut self, reg: &AstRegistry<'_>) -> Term {
        match self.current_function {
            Some(function_id) => {
                let (function, _) = reg.function(function_id);
                if function.is_constructor {
                    self.constructor_summary_app()
                } else {
                    self.summary_app(function)
                }
            }
            None => self.constructor_summary_app(),
        }
    }

    /// Application of a block-like predicate, shaped by its kind.
    fn predicate_app(&mut self, pred_id: PredId, reg: &AstRegistry<'_>) -> Term {
        let kind = self.registry.get(pred_id).kind;
        match kind {
            PredicateKind::Interface => self.interface_app(),
            PredicateKind::ImplicitConstructor => {
                let args = vec![
                    self.ctx.error_flag(),
                    self.ctx.this_address(),
                    self.ctx.state(),
                ];
                self.registry.get(pred_id).app(args)
            }
            PredicateKind::ConstructorSummary => {
                let mut args = vec![
                    self.ctx.error_flag(),
                    self.ctx.this_address(),
                    self.ctx.state(),
                ];
                args.extend(self.state_var_slots_current());
                self.registry.get(pred_id).app(args)
            }
            PredicateKind::FunctionEntry | PredicateKind::FunctionSummary => {
                let function_id = self.current_function.expect("no function in scope");
                let (function, _) = reg.function(function_id);
                self.summary_shaped_app(pred_id, function)
            }
            PredicateKind::FunctionBlock => {
                let function_id = self.current_function.expect("no function in scope");
                let (function, _) = reg.function(function_id);
                let mut args = self.summary_shaped_args(function);
                let locals = self.current_locals.clone();
                args.extend(self.var_list_slots_current(&locals));
                self.registry.get(pred_id).app(args)
            }
            PredicateKind::Error => self.registry.get(pred_id).app(vec![]),
            PredicateKind::NondetInterface | PredicateKind::Custom => {
                unreachable!("nondet interface and custom predicates are applied explicitly")
            }
        }
    }

    fn summary_shaped_args(&mut self, function: &FunctionDefinition) -> Vec<Term> {
        let params: Vec<NodeId> = function.parameters.iter().map(|p| p.id).collect();
        let returns: Vec<NodeId> = function.return_parameters.iter().map(|r| r.id).collect();
        let mut args = vec![
            self.ctx.error_flag(),
            self.ctx.this_address(),
            self.ctx.state_at(0),
        ];
        args.extend(self.state_var_slots_at(0));
        args.extend(self.var_list_slots_at(&params, 0));
        args.push(self.ctx.state());
        args.extend(self.state_var_slots_current());
        args.extend(self.var_list_slots_current(&params));
        args.extend(self.var_list_slots_current(&returns));
        args
    }

    fn summary_shaped_app(&mut self, pred_id: PredId, function: &FunctionDefinition) -> Term {
        let args = self.summary_shaped_args(function);
        self.registry.get(pred_id).app(args)
    }

    // -----------------------------------------------------------------
    // Rules
    // -----------------------------------------------------------------

    pub(crate) fn add_rule(&mut self, rule: &Term, name: &str) {
        for (var, sort) in self.ctx.drain_declarations() {
            self.solver.declare_variable(&var, sort);
        }
        self.solver.add_rule(rule, name);
    }

    pub(crate) fn connect_blocks(&mut self, from: Term, to: Term, constraints: Term) {
        let name = format!(
            "{}_to_{}",
            from.app_name().unwrap_or("rule"),
            to.app_name().unwrap_or("rule")
        );
        let body = Term::and(vec![from, self.ctx.assertions(), constraints]);
        let rule = Term::implies(body, to);
        self.add_rule(&rule, &name);
    }

    fn current_block(&self) -> Term {
        self.current_block.clone().expect("no current block")
    }

    /// Make `block` the current encoding block: pop the assertion frame,
    /// reset SSA indices, and open a fresh frame.
    fn set_current_block(&mut self, block: PredId, reg: &AstRegistry<'_>) {
        if self.ctx.frame_depth() > 0 {
            self.ctx.pop_frame();
        }
        self.clear_indices();
        self.ctx.push_frame();
        self.current_block = Some(self.predicate_app(block, reg));
    }

    /// Reset SSA indices: version 0 is reserved for the values at the
    /// beginning of the current transaction, the current version starts
    /// at 1. The blockchain state symbol only ever advances.
    fn clear_indices(&mut self) {
        let state_vars = self.state_variables.clone();
        for var in state_vars {
            self.ctx.reset_variable(var);
            self.ctx.havoc_variable(var);
        }
        if self.current_function.is_some() {
            let tracked: Vec<NodeId> = self
                .current_params
                .iter()
                .chain(&self.current_returns)
                .chain(&self.current_locals)
                .copied()
                .collect();
            for var in tracked {
                self.ctx.reset_variable(var);
                self.ctx.havoc_variable(var);
            }
        }
        self.ctx.new_state();
    }

    // -----------------------------------------------------------------
    // Interfaces and summaries (pre-declaration pass)
    // -----------------------------------------------------------------

    fn define_interfaces_and_summaries(&mut self, source: &SourceUnit, reg: &AstRegistry<'_>) {
        for contract in &source.contracts {
            let suffix = Self::contract_suffix(contract);
            self.current_contract = Some(contract.id);
            let state_vars = reg.state_variables_including_inherited(contract);
            self.state_variables = state_vars.iter().map(|v| v.id).collect();
            for var in &state_vars {
                if !self.ctx.known_variable(var.id) {
                    self.ctx.create_variable(var);
                }
            }

            let interface = self.create_symbolic_block(Predicate {
                name: format!("interface_{suffix}"),
                kind: PredicateKind::Interface,
                arg_sorts: interface_sorts(&state_vars),
                node: Some(contract.id),
                signature: None,
            });
            self.interfaces.insert(contract.id, interface);

            let nondet = self.create_symbolic_block(Predicate {
                name: format!("nondet_interface_{suffix}"),
                kind: PredicateKind::NondetInterface,
                arg_sorts: nondet_interface_sorts(&state_vars),
                node: Some(contract.id),
                signature: None,
            });
            self.nondet_interfaces.insert(contract.id, nondet);

            // Base case: zero transactions taken.
            let base = self.nondet_interface_app_at(contract.id, Term::IntLit(0), 0, 0);
            self.add_rule(&base, "base_nondet");

            for base_id in contract.linearized_base_contracts.clone() {
                let base_contract = reg.contract(base_id);
                for function in &base_contract.functions {
                    for var in function
                        .parameters
                        .iter()
                        .chain(&function.return_parameters)
                    {
                        self.ctx.create_variable(var);
                    }
                    for var in function.local_variables() {
                        self.ctx.create_variable(var);
                    }

                    let summary = self.create_summary_block(function, contract, reg);
                    self.summaries
                        .entry(contract.id)
                        .or_default()
                        .insert(function.id, summary);

                    if !function.is_constructor
                        && function.is_public()
                        && !base_contract.is_library
                        && !base_contract.is_interface
                    {
                        self.add_nondet_transaction_rule(contract, function, summary);
                    }
                }
            }
        }
        self.current_contract = None;
        self.state_variables.clear();
    }

    /// The inductive transaction rule:
    /// `nondet(err=0, pre) /\ summary(f)(stitched args) => nondet(err', post)`.
    fn add_nondet_transaction_rule(
        &mut self,
        contract: &ContractDefinition,
        function: &FunctionDefinition,
        summary: PredId,
    ) {
        let params: Vec<NodeId> = function.parameters.iter().map(|p| p.id).collect();
        let returns: Vec<NodeId> = function.return_parameters.iter().map(|r| r.id).collect();

        let err = self.ctx.error_flag();
        let mut args = vec![err.clone(), self.ctx.this_address(), self.ctx.state_at(1)];
        args.extend(self.state_var_slots_at(1));
        args.extend(self.var_list_slots_at(&params, 0));
        args.push(self.ctx.state_at(2));
        args.extend(self.state_var_slots_at(2));
        args.extend(self.var_list_slots_at(&params, 1));
        args.extend(self.var_list_slots_at(&returns, 1));
        let summary_app = self.registry.get(summary).app(args);

        let nondet_pre =
            self.nondet_interface_app_at(contract.id, Term::IntLit(0), 0, 1);
        let nondet_post = self.nondet_interface_app_at(contract.id, err, 0, 2);

        let rule = Term::implies(Term::and(vec![nondet_pre, summary_app]), nondet_post);
        self.add_rule(&rule, &format!("nondet_transaction_{}_{}", function.name, function.id));
    }

    fn create_summary_block(
        &mut self,
        function: &FunctionDefinition,
        contract: &ContractDefinition,
        reg: &AstRegistry<'_>,
    ) -> PredId {
        let state_vars = reg.state_variables_including_inherited(contract);
        let params: Vec<_> = function.parameters.iter().collect();
        let returns: Vec<_> = function.return_parameters.iter().collect();
        let kind_str = if function.is_constructor {
            "constructor"
        } else {
            "function"
        };
        let name = format!(
            "summary_{}_{}_{}_{}_{}",
            self.unique_prefix(),
            kind_str,
            function.name,
            function.id,
            contract.id
        );
        let signature = SummarySignature {
            contract_name: contract.name.clone(),
            function_name: Some(function.name.clone()),
            state_var_slots: slot_layout(&state_vars),
            param_slots: slot_layout(&params),
            return_slots: slot_layout(&returns),
        };
        self.create_symbolic_block(Predicate {
            name,
            kind: PredicateKind::FunctionSummary,
            arg_sorts: function_sorts(&state_vars, &params, &returns),
            node: Some(function.id),
            signature: Some(signature),
        })
    }

    // -----------------------------------------------------------------
    // Contract traversal
    // -----------------------------------------------------------------

    fn visit_contract(&mut self, contract: &ContractDefinition, reg: &AstRegistry<'_>) {
        self.reset_contract_analysis();
        self.current_contract = Some(contract.id);
        self.state_variables = reg
            .state_variables_including_inherited(contract)
            .iter()
            .map(|v| v.id)
            .collect();
        self.clear_indices();

        let state_vars = reg.state_variables_including_inherited(contract);
        let signature = SummarySignature {
            contract_name: contract.name.clone(),
            function_name: None,
            state_var_slots: slot_layout(&state_vars),
            param_slots: vec![],
            return_slots: vec![],
        };
        let summary_pred = self.create_symbolic_block(Predicate {
            name: format!("summary_constructor_{}", Self::contract_suffix(contract)),
            kind: PredicateKind::ConstructorSummary,
            arg_sorts: constructor_sorts(&state_vars),
            node: Some(contract.id),
            signature: Some(signature),
        });
        self.constructor_summary = Some(summary_pred);

        for function in reg.resolved_functions(contract) {
            self.visit_function(function, reg);
        }

        self.end_visit_contract(contract, reg);
        self.current_contract = None;
    }

    fn end_visit_contract(&mut self, contract: &ContractDefinition, reg: &AstRegistry<'_>) {
        let implicit = self.create_symbolic_block(Predicate {
            name: format!("implicit_constructor_{}", Self::contract_suffix(contract)),
            kind: PredicateKind::ImplicitConstructor,
            arg_sorts: implicit_constructor_sorts(),
            node: Some(contract.id),
            signature: None,
        });
        let fact = self.registry.get(implicit).app(vec![
            Term::IntLit(0),
            self.ctx.this_address(),
            self.ctx.state(),
        ]);
        let fact_name = self.registry.get(implicit).name.clone();
        self.add_rule(&fact, &fact_name);
        self.set_current_block(implicit, reg);

        // The first constructor in most-derived order is the entry point
        // of construction; every other constructor in the hierarchy is
        // inlined while encoding it.
        let entry_constructor = contract
            .linearized_base_contracts
            .iter()
            .find_map(|id| reg.contract(*id).constructor().filter(|c| c.is_implemented()));

        match entry_constructor {
            Some(constructor) => self.visit_function(constructor, reg),
            None => {
                // Implicit construction only: run the state variable
                // initializers of the whole hierarchy, base-most first.
                for base_id in contract.linearized_base_contracts.iter().rev().copied() {
                    self.initialize_state_variables(reg.contract(base_id), reg);
                }
            }
        }

        let summary = self.constructor_summary_app();
        let from = self.current_block();
        self.connect_blocks(from, summary, Term::BoolLit(true));

        let summary_pred = self.constructor_summary.expect("constructor summary not created");
        self.set_current_block(summary_pred, reg);

        let from = self.current_block();
        let error = self.ctx.error_flag();
        self.add_assert_verification_target(
            contract.id,
            from.clone(),
            Term::BoolLit(true),
            error.clone(),
        );
        let interface = self.interface_app();
        self.connect_blocks(from, interface, Term::eq(error, Term::IntLit(0)));
    }

    // -----------------------------------------------------------------
    // Function traversal
    // -----------------------------------------------------------------

    fn visit_function(&mut self, function: &FunctionDefinition, reg: &AstRegistry<'_>) {
        if !function.is_implemented() {
            // Unimplemented functions are fully nondeterministic: their
            // summary holds for any argument tuple.
            let app = self.summary_app(function);
            self.add_rule(&app, &format!("summary_function_{}", function.id));
            return;
        }

        // Base constructor inlining: the body is encoded into the
        // current blocks of the enclosing constructor.
        if let Some(current_id) = self.current_function {
            let (current, _) = reg.function(current_id);
            assert!(
                current.is_constructor && function.is_constructor,
                "function inlining outside constructor hierarchies"
            );
            assert_ne!(current_id, function.id);
            if let Some(body) = &function.body {
                self.visit_block_statements(body, reg);
            }
            return;
        }

        self.current_function = Some(function.id);
        self.init_function(function, reg);

        let entry = self.create_symbolic_block(Predicate {
            name: format!(
                "{}_{}_{}_{}",
                if function.is_constructor {
                    "constructor"
                } else {
                    "function"
                },
                function.name,
                function.id,
                self.current_contract.expect("no contract in scope")
            ),
            kind: PredicateKind::FunctionEntry,
            arg_sorts: self.function_sorts_for(function, reg),
            node: Some(function.id),
            signature: None,
        });
        let body_node = function.body.as_ref().expect("implemented function").id;
        let body_block = self.create_block(body_node, "", reg);

        let entry_app = self.predicate_app(entry, reg);
        if function.is_constructor {
            let from = self.current_block();
            self.connect_blocks(from, entry_app.clone(), Term::BoolLit(true));
        } else {
            let name = entry_app.app_name().unwrap_or("entry").to_string();
            self.add_rule(&entry_app, &name);
        }

        // Bind SSA version 0 to the entry values.
        if self.ctx.frame_depth() == 0 {
            self.ctx.push_frame();
        }
        let error = self.ctx.error_flag();
        self.ctx.add_assertion(Term::eq(error, Term::IntLit(0)));
        let bound_vars: Vec<NodeId> = self
            .state_variables
            .iter()
            .chain(&self.current_params)
            .copied()
            .collect();
        for var in bound_vars {
            let at_zero = self.ctx.slot_terms_at(var, 0);
            let current = self.ctx.slot_terms_current(var);
            for (zero, cur) in at_zero.into_iter().zip(current) {
                self.ctx.add_assertion(Term::eq(zero, cur));
            }
        }
        let state_zero = self.ctx.state_at(0);
        let state_now = self.ctx.state();
        self.ctx.add_assertion(Term::eq(state_zero, state_now));

        // Entry values are known only up to their type's range.
        let ranged: Vec<NodeId> = self
            .state_variables
            .iter()
            .chain(&self.current_params)
            .copied()
            .collect();
        for var in ranged {
            self.assert_type_range(var);
        }

        let body_app = self.predicate_app(body_block, reg);
        self.connect_blocks(entry_app, body_app, Term::BoolLit(true));

        self.set_current_block(body_block, reg);

        if function.is_constructor {
            self.encode_constructor_prelude(function, reg);
        }
        if let Some(body) = &function.body {
            self.visit_block_statements(body, reg);
        }

        self.end_visit_function(function, reg);
    }

    fn init_function(&mut self, function: &FunctionDefinition, reg: &AstRegistry<'_>) {
        self.path_conditions.clear();
        self.current_params = function.parameters.iter().map(|p| p.id).collect();
        self.current_returns = function.return_parameters.iter().map(|r| r.id).collect();
        self.current_locals = function.local_variables().iter().map(|l| l.id).collect();
        self.current_function_body = function.body.as_ref().map(|b| b.id);
        for var in function
            .parameters
            .iter()
            .chain(&function.return_parameters)
        {
            self.ctx.create_variable(var);
        }
        for var in function.local_variables() {
            self.ctx.create_variable(var);
        }
        self.clear_indices();
    }

    /// State variable initializers and inherited constructor bodies,
    /// base-most first, encoded into the entry constructor's blocks.
    fn encode_constructor_prelude(
        &mut self,
        entry_constructor: &FunctionDefinition,
        reg: &AstRegistry<'_>,
    ) {
        let contract = self.current_contract.expect("no contract in scope");
        let hierarchy = reg.contract(contract).linearized_base_contracts.clone();
        for base_id in hierarchy.iter().rev().copied() {
            let base = reg.contract(base_id);
            self.initialize_state_variables(base, reg);
            if let Some(constructor) = base.constructor() {
                if constructor.id != entry_constructor.id && constructor.is_implemented() {
                    self.visit_function(constructor, reg);
                }
            }
        }
    }

    fn initialize_state_variables(
        &mut self,
        contract: &ContractDefinition,
        reg: &AstRegistry<'_>,
    ) {
        for var in &contract.state_variables {
            match &var.initial_value {
                Some(expr) => {
                    let value = self.encode_expression(&expr.clone(), reg);
                    self.assign_to_variable(var.id, value);
                }
                None => self.assign_default(var.id),
            }
        }
    }

    pub(crate) fn assign_to_variable(&mut self, decl: NodeId, value: Term) {
        let new = self.ctx.increase_index(decl);
        self.ctx.add_assertion(Term::eq(new, value));
    }

    fn assign_default(&mut self, decl: NodeId) {
        let ty = self.ctx.variable_type(decl).clone();
        match ty {
            Type::Bool => self.assign_to_variable(decl, Term::BoolLit(false)),
            Type::Address | Type::Int { .. } => {
                self.assign_to_variable(decl, Term::IntLit(0))
            }
            Type::Array(_) => {
                self.ctx.increase_index(decl);
                let new_length = self.ctx.increase_length_index(decl);
                self.ctx
                    .add_assertion(Term::eq(new_length, Term::IntLit(0)));
            }
            // Mapping contents start unconstrained; every key that is
            // never written stays nondeterministic.
            Type::Mapping(_, _) => {
                self.ctx.increase_index(decl);
            }
        }
    }

    fn end_visit_function(&mut self, function: &FunctionDefinition, reg: &AstRegistry<'_>) {
        if function.is_constructor {
            let contract = self.current_contract.expect("no contract in scope");
            let contract_def = reg.contract(contract);
            let state_vars = reg.state_variables_including_inherited(contract_def);
            let unique_prefix = self.unique_prefix();
            let exit = self.create_symbolic_block(Predicate {
                name: format!(
                    "constructor_exit_{}_{}",
                    Self::contract_suffix(contract_def),
                    unique_prefix
                ),
                kind: PredicateKind::ConstructorSummary,
                arg_sorts: constructor_sorts(&state_vars),
                node: Some(contract),
                signature: None,
            });
            let exit_app = self.constructor_shaped_app(exit);
            let from = self.current_block();
            self.connect_blocks(from, exit_app, Term::BoolLit(true));
            self.set_current_block(exit, reg);
        } else {
            let assertion_error = self.ctx.error_flag();
            let summary = self.summary_app(function);
            let from = self.current_block();
            self.connect_blocks(from, summary.clone(), Term::BoolLit(true));

            // Post-transaction interface state, with the indices as the
            // function body left them; they match the summary's post slots.
            let interface_post = self.interface_app();

            let contract = self.current_contract.expect("no contract in scope");
            let interface_pred = self.interfaces[&contract];
            self.set_current_block(interface_pred, reg);

            let interface_pre = self.interface_pre_app();
            if function.is_public() {
                self.add_assert_verification_target(
                    function.id,
                    interface_pre.clone(),
                    summary.clone(),
                    assertion_error.clone(),
                );
                self.connect_blocks(
                    interface_pre,
                    interface_post,
                    Term::and(vec![
                        summary,
                        Term::eq(assertion_error, Term::IntLit(0)),
                    ]),
                );
            }
        }
        self.current_function = None;
        self.current_params.clear();
        self.current_returns.clear();
        self.current_locals.clear();
        self.current_function_body = None;
    }

    fn constructor_shaped_app(&mut self, pred: PredId) -> Term {
        let mut args = vec![
            self.ctx.error_flag(),
            self.ctx.this_address(),
            self.ctx.state(),
        ];
        args.extend(self.state_var_slots_current());
        self.registry.get(pred).app(args)
    }

    // -----------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------

    fn visit_block_statements(&mut self, block: &Block, reg: &AstRegistry<'_>) {
        for statement in &block.statements {
            self.visit_statement(statement, reg);
        }
    }

    fn visit_statement(&mut self, statement: &Statement, reg: &AstRegistry<'_>) {
        match statement {
            Statement::Block(block) => self.visit_block_statements(block, reg),
            Statement::VariableDeclarationStatement {
                declaration,
                initial_value,
                ..
            } => {
                self.ctx.create_variable(declaration);
                match initial_value {
                    Some(expr) => {
                        let value = self.encode_expression(expr, reg);
                        self.assign_to_variable(declaration.id, value);
                    }
                    None => self.assign_default(declaration.id),
                }
            }
            Statement::ExpressionStatement { expression, .. } => {
                self.encode_expression(expression, reg);
            }
            Statement::Return { values, .. } => {
                // Assign returned values to the return parameters. Early
                // exit is not modeled; control falls through.
                let returns = self.current_returns.clone();
                for (ret, value) in returns.iter().zip(values) {
                    let encoded = self.encode_expression(value, reg);
                    self.assign_to_variable(*ret, encoded);
                }
            }
            Statement::If {
                id,
                condition,
                true_branch,
                false_branch,
            } => self.visit_if(*id, condition, true_branch, false_branch.as_deref(), reg),
            Statement::While {
                id,
                condition,
                body,
                is_do_while,
            } => self.visit_while(*id, condition, body, *is_do_while, reg),
            Statement::For {
                id,
                initialization,
                condition,
                loop_expression,
                body,
            } => self.visit_for(
                *id,
                initialization.as_deref(),
                condition.as_ref(),
                loop_expression.as_ref(),
                body,
                reg,
            ),
            Statement::Break { id } => {
                let dest = self.break_dest.expect("break outside loop");
                let from = self.current_block();
                let to = self.predicate_app(dest, reg);
                self.connect_blocks(from, to, Term::BoolLit(true));
                let ghost = self.create_block(*id, "break_ghost_", reg);
                self.current_block = Some(self.predicate_app(ghost, reg));
            }
            Statement::Continue { id } => {
                let dest = self.continue_dest.expect("continue outside loop");
                let from = self.current_block();
                let to = self.predicate_app(dest, reg);
                self.connect_blocks(from, to, Term::BoolLit(true));
                let ghost = self.create_block(*id, "continue_ghost_", reg);
                self.current_block = Some(self.predicate_app(ghost, reg));
            }
        }
    }

    fn visit_if(
        &mut self,
        node: NodeId,
        condition: &crate::ast::Expression,
        true_branch: &Statement,
        false_branch: Option<&Statement>,
        reg: &AstRegistry<'_>,
    ) {
        let unknown_seen_before = self.unknown_function_call_seen;
        self.unknown_function_call_seen = false;

        let body_node = self.current_function_body.expect("no function body");
        let header = self.create_block(node, "if_header_", reg);
        let true_block = self.create_block(true_branch.id(), "if_true_", reg);
        let false_block = false_branch.map(|f| self.create_block(f.id(), "if_false_", reg));
        let after = self.create_block(body_node, "", reg);

        let from = self.current_block();
        let header_app = self.predicate_app(header, reg);
        self.connect_blocks(from, header_app, Term::BoolLit(true));

        self.set_current_block(header, reg);
        let condition_term = self.encode_expression(condition, reg);

        let from = self.current_block();
        let true_app = self.predicate_app(true_block, reg);
        self.connect_blocks(from.clone(), true_app, condition_term.clone());
        match false_block {
            Some(false_block) => {
                let false_app = self.predicate_app(false_block, reg);
                self.connect_blocks(from, false_app, Term::not(condition_term.clone()));
            }
            None => {
                let after_app = self.predicate_app(after, reg);
                self.connect_blocks(from, after_app, Term::not(condition_term.clone()));
            }
        }

        self.set_current_block(true_block, reg);
        self.visit_statement(true_branch, reg);
        let from = self.current_block();
        let after_app = self.predicate_app(after, reg);
        self.connect_blocks(from, after_app, Term::BoolLit(true));

        if let (Some(false_block), Some(false_branch)) = (false_block, false_branch) {
            self.set_current_block(false_block, reg);
            self.visit_statement(false_branch, reg);
            let from = self.current_block();
            let after_app = self.predicate_app(after, reg);
            self.connect_blocks(from, after_app, Term::BoolLit(true));
        }

        self.set_current_block(after, reg);

        if self.unknown_function_call_seen {
            self.erase_knowledge();
        }
        self.unknown_function_call_seen = unknown_seen_before;
    }

    fn visit_while(
        &mut self,
        node: NodeId,
        condition: &crate::ast::Expression,
        body: &Statement,
        is_do_while: bool,
        reg: &AstRegistry<'_>,
    ) {
        let unknown_seen_before = self.unknown_function_call_seen;
        self.unknown_function_call_seen = false;

        let body_node = self.current_function_body.expect("no function body");
        let name_prefix = if is_do_while { "do_while" } else { "while" };
        let header = self.create_block(node, &format!("{name_prefix}_header_"), reg);
        let loop_body = self.create_block(body.id(), &format!("{name_prefix}_body_"), reg);
        let after = self.create_block(body_node, "", reg);

        let outer_break = self.break_dest;
        let outer_continue = self.continue_dest;
        self.break_dest = Some(after);
        self.continue_dest = Some(header);

        if is_do_while {
            self.visit_statement(body, reg);
        }

        let from = self.current_block();
        let header_app = self.predicate_app(header, reg);
        self.connect_blocks(from, header_app, Term::BoolLit(true));

        self.set_current_block(header, reg);
        let condition_term = self.encode_expression(condition, reg);

        let from = self.current_block();
        let body_app = self.predicate_app(loop_body, reg);
        self.connect_blocks(from.clone(), body_app, condition_term.clone());
        let after_app = self.predicate_app(after, reg);
        self.connect_blocks(from, after_app, Term::not(condition_term));

        self.set_current_block(loop_body, reg);
        self.visit_statement(body, reg);

        self.break_dest = outer_break;
        self.continue_dest = outer_continue;

        // Back edge.
        let from = self.current_block();
        let header_app = self.predicate_app(header, reg);
        self.connect_blocks(from, header_app, Term::BoolLit(true));
        self.set_current_block(after, reg);

        if self.unknown_function_call_seen {
            self.erase_knowledge();
        }
        self.unknown_function_call_seen = unknown_seen_before;
    }

    #[allow(clippy::too_many_arguments)]
    fn visit_for(
        &mut self,
        node: NodeId,
        initialization: Option<&Statement>,
        condition: Option<&crate::ast::Expression>,
        loop_expression: Option<&crate::ast::Expression>,
        body: &Statement,
        reg: &AstRegistry<'_>,
    ) {
        let unknown_seen_before = self.unknown_function_call_seen;
        self.unknown_function_call_seen = false;

        let body_node = self.current_function_body.expect("no function body");
        let header = self.create_block(node, "for_header_", reg);
        let loop_body = self.create_block(body.id(), "for_body_", reg);
        let after = self.create_block(body_node, "", reg);
        let post_block =
            loop_expression.map(|post| self.create_block(post.id(), "for_post_", reg));

        let outer_break = self.break_dest;
        let outer_continue = self.continue_dest;
        self.break_dest = Some(after);
        self.continue_dest = post_block.or(Some(header));

        if let Some(init) = initialization {
            self.visit_statement(init, reg);
        }

        let from = self.current_block();
        let header_app = self.predicate_app(header, reg);
        self.connect_blocks(from, header_app, Term::BoolLit(true));
        self.set_current_block(header, reg);

        let condition_term = match condition {
            Some(condition) => self.encode_expression(condition, reg),
            None => Term::BoolLit(true),
        };

        let from = self.current_block();
        let body_app = self.predicate_app(loop_body, reg);
        self.connect_blocks(from.clone(), body_app, condition_term.clone());
        let after_app = self.predicate_app(after, reg);
        self.connect_blocks(from, after_app, Term::not(condition_term));

        self.set_current_block(loop_body, reg);
        self.visit_statement(body, reg);

        if let (Some(post_block), Some(post)) = (post_block, loop_expression) {
            let from = self.current_block();
            let post_app = self.predicate_app(post_block, reg);
            self.connect_blocks(from, post_app, Term::BoolLit(true));
            self.set_current_block(post_block, reg);
            self.encode_expression(post, reg);
        }

        self.break_dest = outer_break;
        self.continue_dest = outer_continue;

        // Back edge.
        let from = self.current_block();
        let header_app = self.predicate_app(header, reg);
        self.connect_blocks(from, header_app, Term::BoolLit(true));
        self.set_current_block(after, reg);

        if self.unknown_function_call_seen {
            self.erase_knowledge();
        }
        self.unknown_function_call_seen = unknown_seen_before;
    }

    // -----------------------------------------------------------------
    // Knowledge erasure
    // -----------------------------------------------------------------

    /// Havoc every state variable and every reference-typed parameter or
    /// local: the solver sees fresh symbols afterwards, constrained only
    /// by their type's range.
    pub(crate) fn erase_knowledge(&mut self) {
        let state_vars = self.state_variables.clone();
        for var in state_vars {
            self.havoc_with_range(var);
        }
        let tracked: Vec<NodeId> = self
            .current_params
            .iter()
            .chain(&self.current_returns)
            .chain(&self.current_locals)
            .copied()
            .collect();
        for var in tracked {
            if self.ctx.variable_type(var).is_reference() {
                self.havoc_with_range(var);
            }
        }
    }

    /// Fresh symbol with only the type range known.
    pub(crate) fn havoc_with_range(&mut self, decl: NodeId) {
        self.ctx.havoc_variable(decl);
        self.assert_type_range(decl);
    }

    /// Constrain a variable's current value to its type's range: integer
    /// bounds for numeric types, a non-negative length for arrays.
    pub(crate) fn assert_type_range(&mut self, decl: NodeId) {
        let ty = self.ctx.variable_type(decl).clone();
        match ty {
            Type::Int { .. } | Type::Address => {
                let value = self.ctx.current_value(decl);
                self.ctx.add_assertion(Term::IntGe(
                    Box::new(value.clone()),
                    Box::new(crate::exprs::type_min_term(&ty)),
                ));
                self.ctx.add_assertion(Term::IntLe(
                    Box::new(value),
                    Box::new(crate::exprs::type_max_term(&ty)),
                ));
            }
            Type::Array(_) => {
                let length = self.ctx.current_length(decl);
                self.ctx
                    .add_assertion(Term::IntGe(Box::new(length), Box::new(Term::IntLit(0))));
            }
            Type::Bool | Type::Mapping(_, _) => {}
        }
    }

    // -----------------------------------------------------------------
    // Verification targets
    // -----------------------------------------------------------------

    /// Allocate a fresh nonzero error id for a target site.
    pub(crate) fn new_error_id(&mut self, node: NodeId) -> u32 {
        let mut id = self.ctx.new_unique_id();
        // Zero means "no error" in the encoding and can never identify
        // a target.
        if id == 0 {
            id = self.ctx.new_unique_id();
        }
        self.error_ids.entry(node).or_default().push(id);
        id
    }

    /// Register a target whose pre-state depends on the current scope:
    /// the constructor summary during construction, the interface plus
    /// the function summary otherwise.
    pub(crate) fn add_verification_target_auto(
        &mut self,
        scope: NodeId,
        kind: TargetKind,
        ty: Option<Type>,
        error_id: Term,
        reg: &AstRegistry<'_>,
    ) {
        let in_constructor = match self.current_function {
            Some(function_id) => reg.function(function_id).0.is_constructor,
            None => true,
        };
        let (from, constraints) = if in_constructor {
            (self.constructor_summary_app(), Term::BoolLit(true))
        } else {
            let (function, _) = reg.function(self.current_function.unwrap());
            (self.interface_pre_app(), self.summary_app(function))
        };
        self.verification_targets.push(VerificationTarget {
            scope,
            kind,
            from,
            constraints,
            error_id,
            ty,
        });
    }

    fn add_assert_verification_target(
        &mut self,
        scope: NodeId,
        from: Term,
        constraints: Term,
        error_id: Term,
    ) {
        self.verification_targets.push(VerificationTarget {
            scope,
            kind: TargetKind::Assert,
            from,
            constraints,
            error_id,
            ty: None,
        });
    }

    fn check_verification_targets(&mut self) {
        // Block-local constraints must not leak into target rules.
        while self.ctx.frame_depth() > 0 {
            self.ctx.pop_frame();
        }
        let targets = self.verification_targets.clone();
        for target in targets {
            match target.kind {
                TargetKind::Assert => self.check_assert_target(&target),
                TargetKind::UnderOverflow => {
                    let ids = self.error_ids.get(&target.scope).cloned().unwrap_or_default();
                    assert!(ids.len() >= 2, "under/overflow target needs two error ids");
                    let under_msg = sat_message(TargetKind::Underflow, target.ty.as_ref());
                    self.check_and_report_target(
                        target.scope,
                        &target,
                        TargetKind::Underflow,
                        ids[0],
                        report_ids::UNDERFLOW,
                        &under_msg,
                        None,
                    );
                    let over_msg = sat_message(TargetKind::Overflow, target.ty.as_ref());
                    self.check_and_report_target(
                        target.scope,
                        &target,
                        TargetKind::Overflow,
                        ids[1],
                        report_ids::OVERFLOW,
                        &over_msg,
                        None,
                    );
                }
                kind => {
                    let ids = self.error_ids.get(&target.scope).cloned().unwrap_or_default();
                    assert!(!ids.is_empty(), "target without an error id");
                    let report_id = match kind {
                        TargetKind::Underflow => report_ids::UNDERFLOW,
                        TargetKind::Overflow => report_ids::OVERFLOW,
                        TargetKind::DivByZero => report_ids::DIV_BY_ZERO,
                        TargetKind::PopEmptyArray => report_ids::POP_EMPTY_ARRAY,
                        TargetKind::Assert | TargetKind::UnderOverflow => unreachable!(),
                    };
                    let message = sat_message(kind, target.ty.as_ref());
                    self.check_and_report_target(
                        target.scope,
                        &target,
                        kind,
                        ids[0],
                        report_id,
                        &message,
                        unknown_message(kind),
                    );
                }
            }
        }
    }

    /// Assertion targets bind to transaction roots: every `assert`
    /// reachable through internal calls from the root gets its own query.
    fn check_assert_target(&mut self, target: &VerificationTarget) {
        let assertions = self
            .call_graph
            .transaction_assertions(target.scope, &self.function_assertions);
        for assertion in assertions {
            let ids = self.error_ids.get(&assertion).cloned().unwrap_or_default();
            assert!(!ids.is_empty(), "assertion without an error id");
            let message = sat_message(TargetKind::Assert, None);
            self.check_and_report_target(
                assertion,
                target,
                TargetKind::Assert,
                ids[0],
                report_ids::ASSERT,
                &message,
                None,
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn check_and_report_target(
        &mut self,
        scope: NodeId,
        target: &VerificationTarget,
        kind: TargetKind,
        error_id: u32,
        report_id: u32,
        sat_msg: &str,
        unknown_msg: Option<String>,
    ) {
        if self
            .unsafe_targets
            .get(&scope)
            .is_some_and(|kinds| kinds.contains(&kind))
        {
            return;
        }

        let error_pred = self.create_error_block();
        let error_app = self.registry.get(error_pred).app(vec![]);
        let error_name = self.registry.get(error_pred).name.clone();
        self.connect_blocks(
            target.from.clone(),
            error_app.clone(),
            Term::and(vec![
                target.constraints.clone(),
                Term::eq(target.error_id.clone(), Term::IntLit(error_id as i128)),
            ]),
        );

        let (result, cex) = self.query(&error_app, scope);
        match result {
            CheckResult::Unsatisfiable => {
                self.safe_targets.entry(scope).or_default().insert(kind);
            }
            CheckResult::Satisfiable => {
                self.unsafe_targets.entry(scope).or_default().insert(kind);
                let trace = generate_counterexample(&cex, &error_name, &self.registry);
                self.reporter.warning(
                    report_id,
                    scope,
                    &format!("CHC: {sat_msg}"),
                    trace.map(|t| format!("\nCounterexample:\n{t}")),
                );
            }
            CheckResult::Unknown => {
                if let Some(message) = unknown_msg {
                    self.reporter
                        .warning(report_id, scope, &format!("CHC: {message}"), None);
                }
            }
            // Already reported inside query().
            CheckResult::Conflicting | CheckResult::Error => {}
        }
    }

    /// Query the solver. Satisfiable answers are retried once with
    /// preprocessing disabled: Spacer's optimizations can leave the
    /// counterexample incomplete.
    fn query(
        &mut self,
        query: &Term,
        scope: NodeId,
    ) -> (CheckResult, contract_fv_solver::CexGraph) {
        let (result, mut cex) = self.solver.query(query);
        match result {
            CheckResult::Satisfiable => {
                self.solver.set_preprocessing(false);
                let (retried, retried_cex) = self.solver.query(query);
                if retried == CheckResult::Satisfiable {
                    cex = retried_cex;
                }
                self.solver.set_preprocessing(true);
            }
            CheckResult::Conflicting => {
                self.reporter.warning(
                    report_ids::CONFLICTING_SOLVERS,
                    scope,
                    "CHC: At least two SMT solvers provided conflicting answers. \
                     Results might not be sound.",
                    None,
                );
            }
            CheckResult::Error => {
                self.reporter.warning(
                    report_ids::SOLVER_ERROR,
                    scope,
                    "CHC: Error trying to invoke SMT solver.",
                    None,
                );
            }
            _ => {}
        }
        (result, cex)
    }

    // -----------------------------------------------------------------
    // Shared access for the expression encoder
    // -----------------------------------------------------------------

    pub(crate) fn current_block_app(&self) -> Term {
        self.current_block()
    }

    pub(crate) fn current_path_conditions(&self) -> Term {
        Term::and(self.path_conditions.clone())
    }

    pub(crate) fn summary_pred_of(&self, contract: NodeId, function: NodeId) -> PredId {
        self.summaries[&contract][&function]
    }
}
