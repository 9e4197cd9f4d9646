//! Typed AST for annotated contract programs.
//!
//! This mirrors the front end's resolved syntax tree but is decoupled from
//! any parser, making the CHC encoding fully testable: the front end (out
//! of scope here) resolves names and types and hands over this tree.
//! Every node carries a stable id; predicate names and error ids are
//! derived from node identity, so identical inputs produce identical
//! encodings.

use std::collections::BTreeMap;

/// Stable AST node identifier assigned by the front end.
pub type NodeId = u32;

/// Resolved type of an expression or variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Bool,
    /// 160-bit account address.
    Address,
    /// Fixed-width machine integer. `bits` is a multiple of 8, up to 256.
    Int { bits: u32, signed: bool },
    /// Dynamically-sized array.
    Array(Box<Type>),
    /// Key-value mapping.
    Mapping(Box<Type>, Box<Type>),
}

impl Type {
    pub fn uint(bits: u32) -> Type {
        Type::Int {
            bits,
            signed: false,
        }
    }

    pub fn uint256() -> Type {
        Type::uint(256)
    }

    pub fn int(bits: u32) -> Type {
        Type::Int { bits, signed: true }
    }

    /// Reference types keep pointing at storage after an unknown call,
    /// so they must be havocked together with the state variables.
    pub fn is_reference(&self) -> bool {
        matches!(self, Type::Array(_) | Type::Mapping(_, _))
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, Type::Int { signed: true, .. })
    }

    /// Human-readable lower bound, in the `2**n` notation used by
    /// diagnostics.
    pub fn min_string(&self) -> String {
        match self {
            Type::Int {
                bits,
                signed: true,
            } => format!("-2**{}", bits - 1),
            _ => "0".to_string(),
        }
    }

    /// Human-readable upper bound.
    pub fn max_string(&self) -> String {
        match self {
            Type::Int {
                bits,
                signed: true,
            } => format!("2**{} - 1", bits - 1),
            Type::Int { bits, .. } => format!("2**{bits} - 1"),
            Type::Address => "2**160 - 1".to_string(),
            _ => "0".to_string(),
        }
    }
}

/// A declared variable: state variable, parameter, return parameter or local.
#[derive(Debug, Clone)]
pub struct VariableDeclaration {
    pub id: NodeId,
    pub name: String,
    pub ty: Type,
    /// Initializer for state variables, evaluated during construction.
    pub initial_value: Option<Expression>,
}

impl VariableDeclaration {
    pub fn new(id: NodeId, name: impl Into<String>, ty: Type) -> Self {
        Self {
            id,
            name: name.into(),
            ty,
            initial_value: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    External,
    Internal,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability {
    Pure,
    View,
    NonPayable,
    Payable,
}

impl Mutability {
    /// Pure and view functions cannot modify observable state, so calls
    /// to them do not advance the blockchain state symbol.
    pub fn is_static(&self) -> bool {
        matches!(self, Mutability::Pure | Mutability::View)
    }
}

/// Binary operators over the source language's expression grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinOp {
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod
        )
    }

    pub fn is_bitwise(&self) -> bool {
        matches!(self, BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Not,
    Neg,
    BitNot,
}

/// Calls the encoder cannot see into: the callee body is untrusted or
/// unavailable, so all knowledge about state is erased.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownCallKind {
    DelegateCall,
    BareCall,
    Creation,
}

#[derive(Debug, Clone)]
pub enum FunctionCallKind {
    /// `assert(condition)`
    Assert,
    /// Direct call to a function in the current hierarchy or a library.
    Internal { callee: NodeId },
    /// Message call to another contract (or `staticcall`).
    External { callee: NodeId, is_static: bool },
    /// Delegatecall, low-level call, or contract creation.
    Unknown(UnknownCallKind),
    /// `addmod(a, b, m)`
    AddMod,
    /// `mulmod(a, b, m)`
    MulMod,
    /// `a.push(v)` on a storage array.
    ArrayPush { array: NodeId },
    /// `a.pop()` on a storage array.
    ArrayPop { array: NodeId },
}

#[derive(Debug, Clone)]
pub struct FunctionCall {
    pub id: NodeId,
    pub kind: FunctionCallKind,
    pub arguments: Vec<Expression>,
}

#[derive(Debug, Clone)]
pub enum Expression {
    BoolLiteral {
        id: NodeId,
        value: bool,
    },
    NumberLiteral {
        id: NodeId,
        value: i128,
    },
    /// Resolved reference to a variable declaration.
    Identifier {
        id: NodeId,
        decl: NodeId,
    },
    /// `lhs = rhs`, or `lhs op= rhs` when `op` is set.
    Assignment {
        id: NodeId,
        lhs: Box<Expression>,
        op: Option<BinOp>,
        rhs: Box<Expression>,
    },
    BinaryOp {
        id: NodeId,
        op: BinOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
        /// Common type of the operands after implicit conversion.
        ty: Type,
    },
    UnaryOp {
        id: NodeId,
        op: UnOp,
        operand: Box<Expression>,
        ty: Type,
    },
    IndexAccess {
        id: NodeId,
        base: Box<Expression>,
        index: Box<Expression>,
    },
    /// `addr.balance`
    Balance {
        id: NodeId,
        address: Box<Expression>,
    },
    Call(FunctionCall),
}

impl Expression {
    pub fn id(&self) -> NodeId {
        match self {
            Expression::BoolLiteral { id, .. }
            | Expression::NumberLiteral { id, .. }
            | Expression::Identifier { id, .. }
            | Expression::Assignment { id, .. }
            | Expression::BinaryOp { id, .. }
            | Expression::UnaryOp { id, .. }
            | Expression::IndexAccess { id, .. }
            | Expression::Balance { id, .. } => *id,
            Expression::Call(call) => call.id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Block {
    pub id: NodeId,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone)]
pub enum Statement {
    Block(Block),
    VariableDeclarationStatement {
        id: NodeId,
        declaration: VariableDeclaration,
        initial_value: Option<Expression>,
    },
    ExpressionStatement {
        id: NodeId,
        expression: Expression,
    },
    If {
        id: NodeId,
        condition: Expression,
        true_branch: Box<Statement>,
        false_branch: Option<Box<Statement>>,
    },
    While {
        id: NodeId,
        condition: Expression,
        body: Box<Statement>,
        is_do_while: bool,
    },
    For {
        id: NodeId,
        initialization: Option<Box<Statement>>,
        condition: Option<Expression>,
        loop_expression: Option<Expression>,
        body: Box<Statement>,
    },
    Break {
        id: NodeId,
    },
    Continue {
        id: NodeId,
    },
    Return {
        id: NodeId,
        values: Vec<Expression>,
    },
}

impl Statement {
    pub fn id(&self) -> NodeId {
        match self {
            Statement::Block(b) => b.id,
            Statement::VariableDeclarationStatement { id, .. }
            | Statement::ExpressionStatement { id, .. }
            | Statement::If { id, .. }
            | Statement::While { id, .. }
            | Statement::For { id, .. }
            | Statement::Break { id }
            | Statement::Continue { id }
            | Statement::Return { id, .. } => *id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FunctionDefinition {
    pub id: NodeId,
    pub name: String,
    pub visibility: Visibility,
    pub mutability: Mutability,
    pub is_constructor: bool,
    pub parameters: Vec<VariableDeclaration>,
    pub return_parameters: Vec<VariableDeclaration>,
    /// `None` for declared-but-unimplemented functions.
    pub body: Option<Block>,
}

impl FunctionDefinition {
    pub fn is_public(&self) -> bool {
        matches!(self.visibility, Visibility::Public | Visibility::External)
    }

    pub fn is_implemented(&self) -> bool {
        self.body.is_some()
    }

    /// All locals declared anywhere in the body, in source order.
    pub fn local_variables(&self) -> Vec<&VariableDeclaration> {
        let mut locals = Vec::new();
        if let Some(body) = &self.body {
            collect_locals_block(body, &mut locals);
        }
        locals
    }
}

fn collect_locals_block<'a>(block: &'a Block, out: &mut Vec<&'a VariableDeclaration>) {
    for stmt in &block.statements {
        collect_locals(stmt, out);
    }
}

fn collect_locals<'a>(stmt: &'a Statement, out: &mut Vec<&'a VariableDeclaration>) {
    match stmt {
        Statement::Block(b) => collect_locals_block(b, out),
        Statement::VariableDeclarationStatement { declaration, .. } => out.push(declaration),
        Statement::If {
            true_branch,
            false_branch,
            ..
        } => {
            collect_locals(true_branch, out);
            if let Some(f) = false_branch {
                collect_locals(f, out);
            }
        }
        Statement::While { body, .. } => collect_locals(body, out),
        Statement::For {
            initialization,
            body,
            ..
        } => {
            if let Some(init) = initialization {
                collect_locals(init, out);
            }
            collect_locals(body, out);
        }
        _ => {}
    }
}

#[derive(Debug, Clone)]
pub struct ContractDefinition {
    pub id: NodeId,
    pub name: String,
    /// C3-linearized hierarchy, most derived first, starting with `id`.
    pub linearized_base_contracts: Vec<NodeId>,
    pub state_variables: Vec<VariableDeclaration>,
    pub functions: Vec<FunctionDefinition>,
    pub is_library: bool,
    pub is_interface: bool,
}

impl ContractDefinition {
    pub fn constructor(&self) -> Option<&FunctionDefinition> {
        self.functions.iter().find(|f| f.is_constructor)
    }
}

#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub id: NodeId,
    pub contracts: Vec<ContractDefinition>,
    pub imports: Vec<SourceUnit>,
}

/// Resolved lookup tables over a source unit and its imports.
///
/// Built once per analysis; all cross-references in the tree (callee ids,
/// variable declarations, base contracts) resolve through this.
pub struct AstRegistry<'a> {
    pub contracts: BTreeMap<NodeId, &'a ContractDefinition>,
    /// Function id to (definition, declaring contract id).
    pub functions: BTreeMap<NodeId, (&'a FunctionDefinition, NodeId)>,
    pub variables: BTreeMap<NodeId, &'a VariableDeclaration>,
    /// Source units in deterministic (id) order, duplicates removed.
    pub sources: Vec<&'a SourceUnit>,
}

impl<'a> AstRegistry<'a> {
    pub fn build(root: &'a SourceUnit) -> Self {
        let mut registry = AstRegistry {
            contracts: BTreeMap::new(),
            functions: BTreeMap::new(),
            variables: BTreeMap::new(),
            sources: Vec::new(),
        };
        let mut seen = std::collections::BTreeSet::new();
        collect_sources(root, &mut seen, &mut registry);
        registry.sources.sort_by_key(|s| s.id);
        registry
    }

    pub fn contract(&self, id: NodeId) -> &'a ContractDefinition {
        self.contracts
            .get(&id)
            .unwrap_or_else(|| panic!("unresolved contract reference {id}"))
    }

    pub fn function(&self, id: NodeId) -> (&'a FunctionDefinition, NodeId) {
        *self
            .functions
            .get(&id)
            .unwrap_or_else(|| panic!("unresolved function reference {id}"))
    }

    pub fn variable(&self, id: NodeId) -> &'a VariableDeclaration {
        self.variables
            .get(&id)
            .unwrap_or_else(|| panic!("unresolved variable reference {id}"))
    }

    /// State variables of a contract including inherited and private ones,
    /// base-most contract first so storage order is stable.
    pub fn state_variables_including_inherited(
        &self,
        contract: &ContractDefinition,
    ) -> Vec<&'a VariableDeclaration> {
        let mut vars = Vec::new();
        for base_id in contract.linearized_base_contracts.iter().rev() {
            let base = self.contract(*base_id);
            for var in &base.state_variables {
                vars.push(self.variable(var.id));
            }
        }
        vars
    }

    /// Override-resolved non-constructor functions of a hierarchy:
    /// for each function name the most derived definition wins.
    pub fn resolved_functions(
        &self,
        contract: &ContractDefinition,
    ) -> Vec<&'a FunctionDefinition> {
        let mut by_name: BTreeMap<&str, &'a FunctionDefinition> = BTreeMap::new();
        for base_id in contract.linearized_base_contracts.iter().rev() {
            let base = self.contract(*base_id);
            for function in &base.functions {
                if !function.is_constructor {
                    by_name.insert(function.name.as_str(), self.functions[&function.id].0);
                }
            }
        }
        let mut functions: Vec<_> = by_name.into_values().collect();
        functions.sort_by_key(|f| f.id);
        functions
    }
}

fn collect_sources<'a>(
    unit: &'a SourceUnit,
    seen: &mut std::collections::BTreeSet<NodeId>,
    registry: &mut AstRegistry<'a>,
) {
    if !seen.insert(unit.id) {
        return;
    }
    registry.sources.push(unit);
    for contract in &unit.contracts {
        registry.contracts.insert(contract.id, contract);
        for var in &contract.state_variables {
            registry.variables.insert(var.id, var);
        }
        for function in &contract.functions {
            registry.functions.insert(function.id, (function, contract.id));
            for var in function
                .parameters
                .iter()
                .chain(&function.return_parameters)
            {
                registry.variables.insert(var.id, var);
            }
            for var in function.local_variables() {
                registry.variables.insert(var.id, var);
            }
        }
    }
    for import in &unit.imports {
        collect_sources(import, seen, registry);
    }
}
