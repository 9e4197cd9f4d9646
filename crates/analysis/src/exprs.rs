//! Expression encoding: program expressions to SMT terms.
//!
//! Arithmetic is over unbounded integers; machine bounds become
//! verification targets rather than wraparound semantics. Every target
//! preserves the previous error id disjunctively, so exactly one error
//! id flows out of a transaction even when several sites could fire.

use contract_fv_smtlib::term::Term;

use crate::ast::{
    AstRegistry, BinOp, Expression, FunctionCall, FunctionCallKind, NodeId, Type, UnOp,
};
use crate::chc::ChcAnalyzer;
use crate::targets::TargetKind;

/// Lower bound of a type as a term.
pub(crate) fn type_min_term(ty: &Type) -> Term {
    match ty {
        Type::Int {
            bits,
            signed: true,
        } => Term::IntNeg(Box::new(Term::pow2(bits - 1))),
        _ => Term::IntLit(0),
    }
}

/// Upper bound of a type as a term.
pub(crate) fn type_max_term(ty: &Type) -> Term {
    match ty {
        Type::Int {
            bits,
            signed: true,
        } => Term::pow2_minus_one(bits - 1),
        Type::Int { bits, .. } => Term::pow2_minus_one(*bits),
        Type::Address => Term::pow2_minus_one(160),
        _ => Term::IntLit(0),
    }
}

impl ChcAnalyzer {
    pub(crate) fn encode_expression(
        &mut self,
        expression: &Expression,
        reg: &AstRegistry<'_>,
    ) -> Term {
        match expression {
            Expression::BoolLiteral { value, .. } => Term::BoolLit(*value),
            Expression::NumberLiteral { value, .. } => Term::IntLit(*value),
            Expression::Identifier { decl, .. } => self.ctx.current_value(*decl),
            Expression::Assignment { lhs, op, rhs, .. } => {
                self.encode_assignment(lhs, *op, rhs, expression.id(), reg)
            }
            Expression::BinaryOp {
                id,
                op,
                lhs,
                rhs,
                ty,
            } => self.encode_binary_op(*id, *op, lhs, rhs, ty, reg),
            Expression::UnaryOp {
                op, operand, ty, ..
            } => {
                let encoded = self.encode_expression(operand, reg);
                match op {
                    UnOp::Not => Term::not(encoded),
                    UnOp::Neg => Term::IntNeg(Box::new(encoded)),
                    UnOp::BitNot => bitwise_not_bridge(encoded, ty),
                }
            }
            Expression::IndexAccess { base, index, .. } => {
                let base_term = self.encode_expression(base, reg);
                let index_term = self.encode_expression(index, reg);
                Term::Select(Box::new(base_term), Box::new(index_term))
            }
            Expression::Balance { address, .. } => {
                let address_term = self.encode_expression(address, reg);
                self.ctx.balance(address_term)
            }
            Expression::Call(call) => self.encode_call(call, reg),
        }
    }

    fn encode_binary_op(
        &mut self,
        node: NodeId,
        op: BinOp,
        lhs: &Expression,
        rhs: &Expression,
        ty: &Type,
        reg: &AstRegistry<'_>,
    ) -> Term {
        // Short-circuit operators condition the right operand.
        if op == BinOp::And || op == BinOp::Or {
            let left = self.encode_expression(lhs, reg);
            self.path_conditions.push(match op {
                BinOp::And => left.clone(),
                _ => Term::not(left.clone()),
            });
            let right = self.encode_expression(rhs, reg);
            self.path_conditions.pop();
            return match op {
                BinOp::And => Term::Ite(
                    Box::new(left),
                    Box::new(right),
                    Box::new(Term::BoolLit(false)),
                ),
                _ => Term::Ite(
                    Box::new(left),
                    Box::new(Term::BoolLit(true)),
                    Box::new(right),
                ),
            };
        }

        let left = self.encode_expression(lhs, reg);
        let right = self.encode_expression(rhs, reg);
        self.apply_binary_op(node, op, left, right, ty, reg)
    }

    /// Apply an already-encoded binary operator, registering arithmetic
    /// targets where required.
    fn apply_binary_op(
        &mut self,
        node: NodeId,
        op: BinOp,
        left: Term,
        right: Term,
        ty: &Type,
        reg: &AstRegistry<'_>,
    ) -> Term {
        match op {
            _ if op.is_arithmetic() => {
                self.arithmetic_operation(op, left, right, ty, node, reg)
            }
            _ if op.is_bitwise() => {
                let build: fn(Box<Term>, Box<Term>) -> Term = match op {
                    BinOp::BitAnd => Term::BvAnd,
                    BinOp::BitOr => Term::BvOr,
                    _ => Term::BvXor,
                };
                bitwise_bridge(build, left, right, ty)
            }
            BinOp::Eq => Term::eq(left, right),
            BinOp::Ne => Term::not(Term::eq(left, right)),
            BinOp::Lt => Term::IntLt(Box::new(left), Box::new(right)),
            BinOp::Le => Term::IntLe(Box::new(left), Box::new(right)),
            BinOp::Gt => Term::IntGt(Box::new(left), Box::new(right)),
            BinOp::Ge => Term::IntGe(Box::new(left), Box::new(right)),
            _ => unreachable!("logical operators handled by the caller"),
        }
    }

    /// Arithmetic with under/overflow target generation.
    ///
    /// `%` needs no target; `/` only the signed `min / -1` overflow;
    /// unsigned `-` underflows; `+` and `*` overflow; all signed
    /// operations can go out of range in both directions.
    pub(crate) fn arithmetic_operation(
        &mut self,
        op: BinOp,
        left: Term,
        right: Term,
        common_type: &Type,
        node: NodeId,
        reg: &AstRegistry<'_>,
    ) -> Term {
        let l = Box::new(left);
        let r = Box::new(right);
        let value = match op {
            BinOp::Add => Term::IntAdd(l, r),
            BinOp::Sub => Term::IntSub(l, r),
            BinOp::Mul => Term::IntMul(l, r),
            BinOp::Div => Term::IntDiv(l, r),
            BinOp::Mod => Term::IntMod(l, r),
            _ => unreachable!("not an arithmetic operator"),
        };

        let int_type = match common_type {
            Type::Int { .. } => common_type.clone(),
            _ => Type::uint256(),
        };
        let signed = int_type.is_signed();

        if op == BinOp::Mod || (op == BinOp::Div && !signed) {
            return value;
        }

        let previous_error = self.ctx.error_flag();
        let error = self.ctx.increase_error_index();

        let min = type_min_term(&int_type);
        let max = type_max_term(&int_type);

        let (kind, target) = if op == BinOp::Div {
            // Signed division overflows only for min / -1.
            let id = self.new_error_id(node);
            let condition = Term::and(vec![
                Term::IntGt(Box::new(value.clone()), Box::new(max)),
                Term::eq(error.clone(), Term::IntLit(id as i128)),
            ]);
            (TargetKind::Overflow, condition)
        } else if signed {
            let under_id = self.new_error_id(node);
            let over_id = self.new_error_id(node);
            let condition = Term::or2(
                Term::and(vec![
                    Term::IntLt(Box::new(value.clone()), Box::new(min)),
                    Term::eq(error.clone(), Term::IntLit(under_id as i128)),
                ]),
                Term::and(vec![
                    Term::IntGt(Box::new(value.clone()), Box::new(max)),
                    Term::eq(error.clone(), Term::IntLit(over_id as i128)),
                ]),
            );
            (TargetKind::UnderOverflow, condition)
        } else if op == BinOp::Sub {
            let id = self.new_error_id(node);
            let condition = Term::and(vec![
                Term::IntLt(Box::new(value.clone()), Box::new(min)),
                Term::eq(error.clone(), Term::IntLit(id as i128)),
            ]);
            (TargetKind::Underflow, condition)
        } else {
            let id = self.new_error_id(node);
            let condition = Term::and(vec![
                Term::IntGt(Box::new(value.clone()), Box::new(max)),
                Term::eq(error.clone(), Term::IntLit(id as i128)),
            ]);
            (TargetKind::Overflow, condition)
        };

        self.add_verification_target_auto(node, kind, Some(int_type), error.clone(), reg);
        self.ctx
            .add_assertion(Term::or2(Term::eq(error, previous_error), target));

        value
    }

    fn encode_assignment(
        &mut self,
        lhs: &Expression,
        op: Option<BinOp>,
        rhs: &Expression,
        node: NodeId,
        reg: &AstRegistry<'_>,
    ) -> Term {
        let rhs_term = self.encode_expression(rhs, reg);
        let value = match op {
            None => rhs_term,
            Some(op) => {
                let old = self.encode_expression(lhs, reg);
                let ty = self.expression_type(lhs, reg);
                self.apply_binary_op(node, op, old, rhs_term, &ty, reg)
            }
        };

        match lhs {
            Expression::Identifier { decl, .. } => {
                self.assign_to_variable(*decl, value.clone());
            }
            Expression::IndexAccess { base, index, .. } => {
                let Expression::Identifier { decl, .. } = base.as_ref() else {
                    unreachable!("nested index assignments are resolved by the front end")
                };
                let index_term = self.encode_expression(index, reg);
                let old = self.ctx.current_value(*decl);
                let new = self.ctx.increase_index(*decl);
                self.ctx.add_assertion(Term::eq(
                    new,
                    Term::Store(Box::new(old), Box::new(index_term), Box::new(value.clone())),
                ));
            }
            _ => unreachable!("assignment to a non-lvalue"),
        }
        value
    }

    /// Resolved type of an expression, for compound assignments.
    fn expression_type(&self, expression: &Expression, reg: &AstRegistry<'_>) -> Type {
        match expression {
            Expression::BoolLiteral { .. } => Type::Bool,
            Expression::NumberLiteral { .. } => Type::uint256(),
            Expression::Identifier { decl, .. } => reg.variable(*decl).ty.clone(),
            Expression::Assignment { lhs, .. } => self.expression_type(lhs, reg),
            Expression::BinaryOp { ty, .. } => ty.clone(),
            Expression::UnaryOp { ty, .. } => ty.clone(),
            Expression::IndexAccess { base, .. } => {
                match self.expression_type(base, reg) {
                    Type::Array(element) => *element,
                    Type::Mapping(_, value) => *value,
                    other => other,
                }
            }
            Expression::Balance { .. } => Type::uint256(),
            Expression::Call(call) => match &call.kind {
                FunctionCallKind::Internal { callee }
                | FunctionCallKind::External { callee, .. } => {
                    let (function, _) = reg.function(*callee);
                    function
                        .return_parameters
                        .first()
                        .map(|r| r.ty.clone())
                        .unwrap_or(Type::Bool)
                }
                FunctionCallKind::AddMod | FunctionCallKind::MulMod => Type::uint256(),
                _ => Type::Bool,
            },
        }
    }

    // -----------------------------------------------------------------
    // Calls
    // -----------------------------------------------------------------

    fn encode_call(&mut self, call: &FunctionCall, reg: &AstRegistry<'_>) -> Term {
        match &call.kind {
            FunctionCallKind::Assert => {
                self.visit_assert(call, reg);
                Term::BoolLit(true)
            }
            FunctionCallKind::Internal { callee } => {
                self.internal_function_call(call, *callee, reg)
            }
            FunctionCallKind::External { callee, is_static } => {
                self.external_function_call(call, *callee, *is_static, reg)
            }
            FunctionCallKind::Unknown(_) => {
                // Encode arguments for their side effects, then drop all
                // knowledge about state.
                for argument in &call.arguments {
                    self.encode_expression(argument, reg);
                }
                self.unknown_function_call();
                Term::BoolLit(true)
            }
            FunctionCallKind::AddMod | FunctionCallKind::MulMod => {
                self.visit_add_mul_mod(call, reg)
            }
            FunctionCallKind::ArrayPush { array } => self.array_push(call, *array, reg),
            FunctionCallKind::ArrayPop { array } => self.array_pop(call, *array, reg),
        }
    }

    /// `assert(condition)`: connect the current block straight to the
    /// enclosing summary when the condition fails, with a fresh error id.
    fn visit_assert(&mut self, call: &FunctionCall, reg: &AstRegistry<'_>) {
        assert_eq!(call.arguments.len(), 1, "assert takes one condition");
        let condition = self.encode_expression(&call.arguments[0], reg);

        let scope = match self.current_function {
            Some(function_id) if !reg.function(function_id).0.is_constructor => function_id,
            _ => self.current_contract.expect("no contract in scope"),
        };
        self.function_assertions
            .entry(scope)
            .or_default()
            .insert(call.id);

        let previous_error = self.ctx.error_flag();
        let error = self.ctx.increase_error_index();
        let error_id = self.new_error_id(call.id);

        let from = self.current_block_app();
        let to = self.enclosing_summary_app(reg);
        let constraints = Term::and(vec![
            self.current_path_conditions(),
            Term::not(condition),
            Term::eq(error.clone(), Term::IntLit(error_id as i128)),
        ]);
        self.connect_blocks(from, to, constraints);

        self.ctx
            .add_assertion(Term::eq(error, previous_error));
    }

    /// `addmod`/`mulmod`: a division-by-zero target on the modulus.
    fn visit_add_mul_mod(&mut self, call: &FunctionCall, reg: &AstRegistry<'_>) -> Term {
        assert_eq!(call.arguments.len(), 3);
        let a = self.encode_expression(&call.arguments[0], reg);
        let b = self.encode_expression(&call.arguments[1], reg);
        let modulus = self.encode_expression(&call.arguments[2], reg);

        let previous_error = self.ctx.error_flag();
        let error = self.ctx.increase_error_index();
        self.add_verification_target_auto(
            call.id,
            TargetKind::DivByZero,
            None,
            error.clone(),
            reg,
        );
        let error_id = self.new_error_id(call.id);
        let target = Term::and(vec![
            Term::eq(modulus.clone(), Term::IntLit(0)),
            Term::eq(error.clone(), Term::IntLit(error_id as i128)),
        ]);
        self.ctx
            .add_assertion(Term::or2(Term::eq(error, previous_error), target));

        let sum = match call.kind {
            FunctionCallKind::AddMod => Term::IntAdd(Box::new(a), Box::new(b)),
            _ => Term::IntMul(Box::new(a), Box::new(b)),
        };
        Term::Ite(
            Box::new(Term::eq(modulus.clone(), Term::IntLit(0))),
            Box::new(Term::IntLit(0)),
            Box::new(Term::IntMod(Box::new(sum), Box::new(modulus))),
        )
    }

    /// Internal call: apply the callee summary, then either propagate a
    /// nonzero error to the enclosing summary or continue with the
    /// previous error value restored.
    fn internal_function_call(
        &mut self,
        call: &FunctionCall,
        callee_id: NodeId,
        reg: &AstRegistry<'_>,
    ) -> Term {
        let contract = self.current_contract.expect("no contract in scope");
        let (callee, callee_contract_id) = reg.function(callee_id);
        let callee_contract = reg.contract(callee_contract_id);

        // Construction code calls are attributed to the contract.
        let caller_scope = match self.current_function {
            Some(function_id) if !reg.function(function_id).0.is_constructor => function_id,
            _ => contract,
        };
        self.call_graph.insert(caller_scope, callee_id);

        // Library "state" is constants, so the library must have been
        // constructed for its interface to hold.
        if callee_contract.is_library {
            let library_interface = self.interface_app_of(callee_contract_id, reg);
            self.ctx.add_assertion(library_interface);
        }

        let previous_error = self.ctx.error_flag();
        let summary = self.internal_call_summary(call, callee_id, reg);
        self.ctx.add_assertion(summary);

        let error = self.ctx.error_flag();
        let from = self.current_block_app();
        let to = self.enclosing_summary_app(reg);
        self.connect_blocks(
            from,
            to,
            Term::IntGt(Box::new(error.clone()), Box::new(Term::IntLit(0))),
        );
        self.ctx
            .add_assertion(Term::eq(error, Term::IntLit(0)));
        let restored = self.ctx.increase_error_index();
        self.ctx
            .add_assertion(Term::eq(restored, previous_error));

        match callee.return_parameters.first() {
            Some(ret) => self.ctx.current_value(ret.id),
            None => Term::BoolLit(true),
        }
    }

    /// Build the callee summary application for an internal call,
    /// advancing the SSA indices the call may touch.
    fn internal_call_summary(
        &mut self,
        call: &FunctionCall,
        callee_id: NodeId,
        reg: &AstRegistry<'_>,
    ) -> Term {
        let contract = self.current_contract.expect("no contract in scope");
        let (callee, callee_contract_id) = reg.function(callee_id);
        let callee_contract = reg.contract(callee_contract_id);

        // Library calls target the library's own predicates; everything
        // else resolves in the current contract's context.
        let called_contract_id = if callee_contract.is_library {
            callee_contract_id
        } else {
            contract
        };
        let called_state_vars: Vec<NodeId> = reg
            .state_variables_including_inherited(reg.contract(called_contract_id))
            .iter()
            .map(|v| v.id)
            .collect();

        let error = self.ctx.increase_error_index();
        let mut args = vec![error, self.ctx.this_address(), self.ctx.state()];
        for var in &called_state_vars {
            args.extend(self.ctx.slot_terms_current(*var));
        }
        for (param, argument) in callee.parameters.iter().zip(&call.arguments) {
            let encoded = self.encode_expression(argument, reg);
            args.push(encoded);
            if matches!(param.ty, Type::Array(_)) {
                let Expression::Identifier { decl, .. } = argument else {
                    unreachable!("array arguments are passed by reference")
                };
                args.push(self.ctx.current_length(*decl));
            }
        }

        let uses_static_call = callee.mutability.is_static();
        if !callee_contract.is_library && !uses_static_call {
            self.ctx.new_state();
            let state_vars = self.state_variables.clone();
            for var in state_vars {
                self.havoc_with_range(var);
            }
        }
        args.push(self.ctx.state());
        for var in &called_state_vars {
            args.extend(self.ctx.slot_terms_current(*var));
        }

        for var in callee
            .parameters
            .iter()
            .chain(&callee.return_parameters)
        {
            if !self.ctx.known_variable(var.id) {
                self.ctx.create_variable(var);
            }
            self.ctx.havoc_variable(var.id);
            args.extend(self.ctx.slot_terms_current(var.id));
        }

        let summary = self.summary_pred_of(called_contract_id, callee_id);
        self.registry.get(summary).app(args)
    }

    /// External call: the callee body is untrusted, so no summary is
    /// applied. Return values are havocked, observable state advances
    /// unless the call is static, and the nondet interface relates the
    /// pre and post states.
    fn external_function_call(
        &mut self,
        call: &FunctionCall,
        callee_id: NodeId,
        is_static: bool,
        reg: &AstRegistry<'_>,
    ) -> Term {
        for argument in &call.arguments {
            self.encode_expression(argument, reg);
        }
        let (callee, _) = reg.function(callee_id);

        for var in &callee.return_parameters {
            if !self.ctx.known_variable(var.id) {
                self.ctx.create_variable(var);
            }
            self.havoc_with_range(var.id);
        }

        let mut pre = vec![self.ctx.state()];
        let state_vars = self.state_variables.clone();
        for var in &state_vars {
            pre.extend(self.ctx.slot_terms_current(*var));
        }

        let uses_static_call = is_static || callee.mutability.is_static();
        if !uses_static_call {
            self.ctx.new_state();
            for var in &state_vars {
                self.havoc_with_range(*var);
            }
        }

        let mut post = vec![self.ctx.state()];
        for var in &state_vars {
            post.extend(self.ctx.slot_terms_current(*var));
        }

        let error = self.ctx.error_flag();
        let nondet = self.nondet_interface_app_terms(error.clone(), pre, post);
        self.ctx.add_assertion(nondet);
        self.ctx
            .add_assertion(Term::eq(error, Term::IntLit(0)));

        match callee.return_parameters.first() {
            Some(ret) => self.ctx.current_value(ret.id),
            None => Term::BoolLit(true),
        }
    }

    /// Unknown call (delegatecall, low-level call, creation): erase all
    /// knowledge and remember that enclosing control flow must erase
    /// again at its merge points.
    fn unknown_function_call(&mut self) {
        self.erase_knowledge();
        self.unknown_function_call_seen = true;
    }

    /// `a.push(v)`: append at the current length.
    fn array_push(
        &mut self,
        call: &FunctionCall,
        array: NodeId,
        reg: &AstRegistry<'_>,
    ) -> Term {
        assert_eq!(call.arguments.len(), 1);
        let value = self.encode_expression(&call.arguments[0], reg);
        let elements = self.ctx.current_value(array);
        let length = self.ctx.current_length(array);
        let new_elements = self.ctx.increase_index(array);
        let new_length = self.ctx.increase_length_index(array);
        self.ctx.add_assertion(Term::eq(
            new_elements,
            Term::Store(Box::new(elements), Box::new(length.clone()), Box::new(value)),
        ));
        self.ctx.add_assertion(Term::eq(
            new_length,
            Term::IntAdd(Box::new(length), Box::new(Term::IntLit(1))),
        ));
        Term::BoolLit(true)
    }

    /// `a.pop()`: a pop-empty-array target, then shrink by one.
    fn array_pop(
        &mut self,
        call: &FunctionCall,
        array: NodeId,
        reg: &AstRegistry<'_>,
    ) -> Term {
        let length = self.ctx.current_length(array);

        let previous_error = self.ctx.error_flag();
        let error = self.ctx.increase_error_index();
        self.add_verification_target_auto(
            call.id,
            TargetKind::PopEmptyArray,
            None,
            error.clone(),
            reg,
        );
        let error_id = self.new_error_id(call.id);
        let target = Term::and(vec![
            Term::IntLe(Box::new(length.clone()), Box::new(Term::IntLit(0))),
            Term::eq(error.clone(), Term::IntLit(error_id as i128)),
        ]);
        self.ctx
            .add_assertion(Term::or2(Term::eq(error, previous_error), target));

        let new_length = self.ctx.increase_length_index(array);
        self.ctx.add_assertion(Term::eq(
            new_length,
            Term::IntSub(Box::new(length), Box::new(Term::IntLit(1))),
        ));
        Term::BoolLit(true)
    }
}

fn type_bits(ty: &Type) -> u32 {
    match ty {
        Type::Int { bits, .. } => *bits,
        Type::Address => 160,
        _ => 256,
    }
}

/// Bridge a bitwise operation through fixed-width bitvectors:
/// `bv2int(op(int2bv(a), int2bv(b)))`.
fn bitwise_bridge(
    build: fn(Box<Term>, Box<Term>) -> Term,
    left: Term,
    right: Term,
    ty: &Type,
) -> Term {
    let bits = type_bits(ty);
    let l = Box::new(Term::Int2Bv(bits, Box::new(left)));
    let r = Box::new(Term::Int2Bv(bits, Box::new(right)));
    Term::Bv2Int(Box::new(build(l, r)))
}

/// `bv2int(bvnot(int2bv(a)))`.
fn bitwise_not_bridge(operand: Term, ty: &Type) -> Term {
    let bits = type_bits(ty);
    Term::Bv2Int(Box::new(Term::BvNot(Box::new(Term::Int2Bv(
        bits,
        Box::new(operand),
    )))))
}
