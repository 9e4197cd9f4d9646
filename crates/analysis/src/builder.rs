//! Programmatic AST construction.
//!
//! There is no parser in this workspace; the front end hands over a
//! resolved tree. This builder is the public way to assemble one — used
//! by embedders and throughout the test suites. Node ids are allocated
//! monotonically, so building the same program twice yields identical
//! trees and therefore identical encodings.

use crate::ast::*;

/// Allocates node ids and assembles AST nodes.
#[derive(Debug, Default)]
pub struct AstBuilder {
    next_id: NodeId,
}

impl AstBuilder {
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    pub fn id(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // --- Declarations ---

    pub fn var(&mut self, name: &str, ty: Type) -> VariableDeclaration {
        VariableDeclaration::new(self.id(), name, ty)
    }

    pub fn var_with_value(
        &mut self,
        name: &str,
        ty: Type,
        initial_value: Expression,
    ) -> VariableDeclaration {
        let mut declaration = self.var(name, ty);
        declaration.initial_value = Some(initial_value);
        declaration
    }

    // --- Expressions ---

    pub fn number(&mut self, value: i128) -> Expression {
        Expression::NumberLiteral {
            id: self.id(),
            value,
        }
    }

    pub fn boolean(&mut self, value: bool) -> Expression {
        Expression::BoolLiteral {
            id: self.id(),
            value,
        }
    }

    pub fn ident(&mut self, declaration: &VariableDeclaration) -> Expression {
        Expression::Identifier {
            id: self.id(),
            decl: declaration.id,
        }
    }

    pub fn bin(&mut self, op: BinOp, ty: Type, lhs: Expression, rhs: Expression) -> Expression {
        Expression::BinaryOp {
            id: self.id(),
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            ty,
        }
    }

    pub fn un(&mut self, op: UnOp, ty: Type, operand: Expression) -> Expression {
        Expression::UnaryOp {
            id: self.id(),
            op,
            operand: Box::new(operand),
            ty,
        }
    }

    pub fn assign(&mut self, lhs: Expression, rhs: Expression) -> Expression {
        Expression::Assignment {
            id: self.id(),
            lhs: Box::new(lhs),
            op: None,
            rhs: Box::new(rhs),
        }
    }

    pub fn compound_assign(&mut self, op: BinOp, lhs: Expression, rhs: Expression) -> Expression {
        Expression::Assignment {
            id: self.id(),
            lhs: Box::new(lhs),
            op: Some(op),
            rhs: Box::new(rhs),
        }
    }

    pub fn index(&mut self, base: Expression, index: Expression) -> Expression {
        Expression::IndexAccess {
            id: self.id(),
            base: Box::new(base),
            index: Box::new(index),
        }
    }

    pub fn balance(&mut self, address: Expression) -> Expression {
        Expression::Balance {
            id: self.id(),
            address: Box::new(address),
        }
    }

    pub fn call(&mut self, kind: FunctionCallKind, arguments: Vec<Expression>) -> Expression {
        Expression::Call(FunctionCall {
            id: self.id(),
            kind,
            arguments,
        })
    }

    // --- Statements ---

    pub fn expr_stmt(&mut self, expression: Expression) -> Statement {
        Statement::ExpressionStatement {
            id: self.id(),
            expression,
        }
    }

    pub fn assert_stmt(&mut self, condition: Expression) -> Statement {
        let call = self.call(FunctionCallKind::Assert, vec![condition]);
        self.expr_stmt(call)
    }

    pub fn declare(
        &mut self,
        declaration: VariableDeclaration,
        initial_value: Option<Expression>,
    ) -> Statement {
        Statement::VariableDeclarationStatement {
            id: self.id(),
            declaration,
            initial_value,
        }
    }

    pub fn if_stmt(
        &mut self,
        condition: Expression,
        true_branch: Statement,
        false_branch: Option<Statement>,
    ) -> Statement {
        Statement::If {
            id: self.id(),
            condition,
            true_branch: Box::new(true_branch),
            false_branch: false_branch.map(Box::new),
        }
    }

    pub fn while_stmt(&mut self, condition: Expression, body: Statement) -> Statement {
        Statement::While {
            id: self.id(),
            condition,
            body: Box::new(body),
            is_do_while: false,
        }
    }

    pub fn return_stmt(&mut self, values: Vec<Expression>) -> Statement {
        Statement::Return {
            id: self.id(),
            values,
        }
    }

    pub fn block(&mut self, statements: Vec<Statement>) -> Block {
        Block {
            id: self.id(),
            statements,
        }
    }

    pub fn block_stmt(&mut self, statements: Vec<Statement>) -> Statement {
        Statement::Block(self.block(statements))
    }

    // --- Definitions ---

    #[allow(clippy::too_many_arguments)]
    pub fn function(
        &mut self,
        name: &str,
        visibility: Visibility,
        mutability: Mutability,
        parameters: Vec<VariableDeclaration>,
        return_parameters: Vec<VariableDeclaration>,
        body: Option<Block>,
    ) -> FunctionDefinition {
        FunctionDefinition {
            id: self.id(),
            name: name.to_string(),
            visibility,
            mutability,
            is_constructor: false,
            parameters,
            return_parameters,
            body,
        }
    }

    pub fn public_function(
        &mut self,
        name: &str,
        parameters: Vec<VariableDeclaration>,
        body: Block,
    ) -> FunctionDefinition {
        self.function(
            name,
            Visibility::Public,
            Mutability::NonPayable,
            parameters,
            vec![],
            Some(body),
        )
    }

    pub fn constructor(&mut self, body: Block) -> FunctionDefinition {
        FunctionDefinition {
            id: self.id(),
            name: "constructor".to_string(),
            visibility: Visibility::Public,
            mutability: Mutability::NonPayable,
            is_constructor: true,
            parameters: vec![],
            return_parameters: vec![],
            body: Some(body),
        }
    }

    pub fn contract(
        &mut self,
        name: &str,
        state_variables: Vec<VariableDeclaration>,
        functions: Vec<FunctionDefinition>,
    ) -> ContractDefinition {
        let id = self.id();
        ContractDefinition {
            id,
            name: name.to_string(),
            linearized_base_contracts: vec![id],
            state_variables,
            functions,
            is_library: false,
            is_interface: false,
        }
    }

    pub fn source_unit(&mut self, contracts: Vec<ContractDefinition>) -> SourceUnit {
        SourceUnit {
            id: self.id(),
            contracts,
            imports: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_monotone() {
        let mut builder = AstBuilder::new();
        let x = builder.var("x", Type::uint256());
        let y = builder.var("y", Type::uint256());
        assert!(y.id > x.id);
    }

    #[test]
    fn same_program_builds_identical_trees() {
        let build = || {
            let mut builder = AstBuilder::new();
            let x = builder.var("x", Type::uint256());
            let ident = builder.ident(&x);
            let one = builder.number(1);
            let sum = builder.bin(BinOp::Add, Type::uint256(), ident, one);
            let assertion = builder_assert(&mut builder, sum);
            let body = builder.block(vec![assertion]);
            let f = builder.public_function("f", vec![x], body);
            let contract = builder.contract("C", vec![], vec![f]);
            builder.source_unit(vec![contract])
        };
        let a = build();
        let b = build();
        assert_eq!(a.id, b.id);
        assert_eq!(a.contracts[0].id, b.contracts[0].id);
        assert_eq!(a.contracts[0].functions[0].id, b.contracts[0].functions[0].id);
    }

    fn builder_assert(builder: &mut AstBuilder, value: Expression) -> Statement {
        let zero = builder.number(0);
        let cond = builder.bin(BinOp::Gt, Type::uint256(), value, zero);
        builder.assert_stmt(cond)
    }
}
