//! End-to-end verification scenarios against the scripted solver.

mod common;

use std::collections::BTreeMap;

use common::MockSolver;
use contract_fv_analysis::ast::{
    BinOp, FunctionCallKind, Mutability, Type, Visibility,
};
use contract_fv_analysis::builder::AstBuilder;
use contract_fv_analysis::chc::ChcAnalyzer;
use contract_fv_analysis::reporter::SharedReporter;
use contract_fv_analysis::targets::TargetKind;
use contract_fv_solver::{CheckResult, ChcSmtLib2Interface};

fn analyzer_with(mock: &MockSolver) -> (ChcAnalyzer, SharedReporter) {
    let reporter = SharedReporter::new();
    let analyzer = ChcAnalyzer::new(Box::new(mock.clone()), Box::new(reporter.clone()));
    (analyzer, reporter)
}

/// `function f(uint x) public { assert(x + 1 > x); }` — the addition can
/// overflow at `x = 2**256 - 1`.
#[test]
fn unsigned_addition_overflow_is_reported_unsafe() {
    let mut builder = AstBuilder::new();
    let x = builder.var("x", Type::uint256());
    let x_ref = builder.ident(&x);
    let one = builder.number(1);
    let sum = builder.bin(BinOp::Add, Type::uint256(), x_ref, one);
    let sum_id = sum.id();
    let x_ref2 = builder.ident(&x);
    let cond = builder.bin(BinOp::Gt, Type::uint256(), sum, x_ref2);
    let assert_stmt = builder.assert_stmt(cond);
    let body = builder.block(vec![assert_stmt]);
    let f = builder.public_function("f", vec![x], body);
    let contract = builder.contract("C", vec![], vec![f]);
    let unit = builder.source_unit(vec![contract]);

    let mock = MockSolver::new();
    // Overflow query: reachable (plus the no-preprocessing retry).
    // Assertion query: unreachable.
    mock.script([
        CheckResult::Satisfiable,
        CheckResult::Satisfiable,
        CheckResult::Unsatisfiable,
    ]);
    let (mut analyzer, reporter) = analyzer_with(&mock);
    analyzer.analyze(&unit);

    assert!(analyzer.unsafe_targets[&sum_id].contains(&TargetKind::Overflow));
    let warnings = reporter.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].report_id, 4984);
    assert_eq!(
        warnings[0].message,
        "CHC: Overflow (resulting value larger than 2**256 - 1) happens here."
    );
    // The assertion itself holds over unbounded integers.
    assert!(analyzer
        .safe_targets
        .values()
        .any(|kinds| kinds.contains(&TargetKind::Assert)));
    // A scope is never both safe and unsafe for the same kind.
    for (node, kinds) in &analyzer.safe_targets {
        if let Some(unsafe_kinds) = analyzer.unsafe_targets.get(node) {
            assert!(kinds.is_disjoint(unsafe_kinds));
        }
    }
}

/// `function f(uint x, uint y) public pure returns (uint) { return x / y; }`
/// — unsigned division produces no arithmetic target at all.
#[test]
fn unsigned_division_has_no_targets() {
    let mut builder = AstBuilder::new();
    let x = builder.var("x", Type::uint256());
    let y = builder.var("y", Type::uint256());
    let r = builder.var("r", Type::uint256());
    let x_ref = builder.ident(&x);
    let y_ref = builder.ident(&y);
    let quotient = builder.bin(BinOp::Div, Type::uint256(), x_ref, y_ref);
    let ret = builder.return_stmt(vec![quotient]);
    let body = builder.block(vec![ret]);
    let f = builder.function(
        "f",
        Visibility::Public,
        Mutability::Pure,
        vec![x, y],
        vec![r],
        Some(body),
    );
    let contract = builder.contract("C", vec![], vec![f]);
    let unit = builder.source_unit(vec![contract]);

    let mock = MockSolver::new();
    let (mut analyzer, reporter) = analyzer_with(&mock);
    analyzer.analyze(&unit);

    assert_eq!(mock.query_count(), 0);
    assert!(analyzer.unsafe_targets.is_empty());
    assert!(reporter.is_empty());
}

/// `function g(uint8 a) public pure { assert(a < 256); }` — a `uint8`
/// never reaches 256, so the assertion is provable.
#[test]
fn ranged_parameter_assertion_is_safe() {
    let mut builder = AstBuilder::new();
    let a = builder.var("a", Type::uint(8));
    let a_ref = builder.ident(&a);
    let bound = builder.number(256);
    let cond = builder.bin(BinOp::Lt, Type::uint(8), a_ref, bound);
    let assert_stmt = builder.assert_stmt(cond);
    let body = builder.block(vec![assert_stmt]);
    let f = builder.function(
        "g",
        Visibility::Public,
        Mutability::Pure,
        vec![a],
        vec![],
        Some(body),
    );
    let contract = builder.contract("C", vec![], vec![f]);
    let unit = builder.source_unit(vec![contract]);

    let mock = MockSolver::new();
    let (mut analyzer, reporter) = analyzer_with(&mock);
    analyzer.analyze(&unit);

    // One query for the reachable assertion site; the default scripted
    // answer is unsatisfiable.
    assert_eq!(mock.query_count(), 1);
    assert_eq!(analyzer.safe_targets.len(), 1);
    assert!(reporter.is_empty());

    // The entry rules constrain the parameter to its 8-bit range.
    let rendered: Vec<String> = mock.rules().iter().map(|r| r.to_string()).collect();
    assert!(rendered.iter().any(|r| r.contains("(<= a_1_1 255)")));
}

/// `a.pop()` on a freshly constructed (empty) array.
#[test]
fn pop_on_empty_array_is_reported_unsafe() {
    let mut builder = AstBuilder::new();
    let a = builder.var("a", Type::Array(Box::new(Type::uint256())));
    let pop = builder.call(FunctionCallKind::ArrayPop { array: a.id }, vec![]);
    let pop_id = pop.id();
    let statement = builder.expr_stmt(pop);
    let body = builder.block(vec![statement]);
    let g = builder.public_function("g", vec![], body);
    let contract = builder.contract("C", vec![a], vec![g]);
    let unit = builder.source_unit(vec![contract]);

    let mock = MockSolver::new();
    mock.script([CheckResult::Satisfiable, CheckResult::Satisfiable]);
    let (mut analyzer, reporter) = analyzer_with(&mock);
    analyzer.analyze(&unit);

    assert!(analyzer.unsafe_targets[&pop_id].contains(&TargetKind::PopEmptyArray));
    let warnings = reporter.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].report_id, 2529);
    assert_eq!(warnings[0].message, "CHC: Empty array \"pop\" detected here.");
}

/// Signed subtraction registers both directions with distinct ids.
#[test]
fn signed_arithmetic_registers_under_and_overflow() {
    let mut builder = AstBuilder::new();
    let v = builder.var("v", Type::int(8));
    let v_ref = builder.ident(&v);
    let one = builder.number(1);
    let difference = builder.bin(BinOp::Sub, Type::int(8), v_ref, one);
    let difference_id = difference.id();
    let statement = builder.expr_stmt(difference);
    let body = builder.block(vec![statement]);
    let f = builder.public_function("f", vec![v], body);
    let contract = builder.contract("C", vec![], vec![f]);
    let unit = builder.source_unit(vec![contract]);

    let mock = MockSolver::new();
    let (mut analyzer, _) = analyzer_with(&mock);
    analyzer.analyze(&unit);

    // Two queries, one per direction.
    assert_eq!(mock.query_count(), 2);
    let kinds = &analyzer.safe_targets[&difference_id];
    assert!(kinds.contains(&TargetKind::Underflow));
    assert!(kinds.contains(&TargetKind::Overflow));
}

/// `addmod(x, y, m)` can divide by zero when `m == 0`.
#[test]
fn addmod_zero_modulus_is_reported() {
    let mut builder = AstBuilder::new();
    let x = builder.var("x", Type::uint256());
    let y = builder.var("y", Type::uint256());
    let m = builder.var("m", Type::uint256());
    let x_ref = builder.ident(&x);
    let y_ref = builder.ident(&y);
    let m_ref = builder.ident(&m);
    let addmod = builder.call(FunctionCallKind::AddMod, vec![x_ref, y_ref, m_ref]);
    let addmod_id = addmod.id();
    let statement = builder.expr_stmt(addmod);
    let body = builder.block(vec![statement]);
    let f = builder.public_function("f", vec![x, y, m], body);
    let contract = builder.contract("C", vec![], vec![f]);
    let unit = builder.source_unit(vec![contract]);

    let mock = MockSolver::new();
    mock.script([CheckResult::Satisfiable, CheckResult::Satisfiable]);
    let (mut analyzer, reporter) = analyzer_with(&mock);
    analyzer.analyze(&unit);

    assert!(analyzer.unsafe_targets[&addmod_id].contains(&TargetKind::DivByZero));
    assert_eq!(reporter.warnings()[0].report_id, 4281);
    assert_eq!(
        reporter.warnings()[0].message,
        "CHC: Division by zero happens here."
    );
}

/// Bitwise compound assignment bridges through fixed-width bitvectors.
#[test]
fn bitwise_or_uses_the_bitvector_bridge() {
    let mut builder = AstBuilder::new();
    let b = builder.var("b", Type::uint(8));
    let init = builder.number(0xff);
    let decl = builder.declare(b.clone(), Some(init));
    let b_ref = builder.ident(&b);
    let mask = builder.number(0x0f);
    let or_assign = builder.compound_assign(BinOp::BitOr, b_ref, mask);
    let statement = builder.expr_stmt(or_assign);
    let body = builder.block(vec![decl, statement]);
    let f = builder.public_function("f", vec![], body);
    let contract = builder.contract("C", vec![], vec![f]);
    let unit = builder.source_unit(vec![contract]);

    let mock = MockSolver::new();
    let (mut analyzer, _) = analyzer_with(&mock);
    analyzer.analyze(&unit);

    let rendered: Vec<String> = mock.rules().iter().map(|r| r.to_string()).collect();
    assert!(rendered
        .iter()
        .any(|r| r.contains("(bvor ((_ int2bv 8)")));
}

/// External calls constrain the state transition with the nondet
/// interface instead of a callee summary.
#[test]
fn external_call_uses_the_nondet_interface() {
    let mut builder = AstBuilder::new();
    let callee_body = builder.block(vec![]);
    let callee = builder.public_function("poke", vec![], callee_body);
    let callee_id = callee.id;
    let other = builder.contract("D", vec![], vec![callee]);

    let x = builder.var("x", Type::uint256());
    let call = builder.call(
        FunctionCallKind::External {
            callee: callee_id,
            is_static: false,
        },
        vec![],
    );
    let statement = builder.expr_stmt(call);
    let body = builder.block(vec![statement]);
    let f = builder.public_function("f", vec![], body);
    let caller = builder.contract("C", vec![x], vec![f]);
    let unit = builder.source_unit(vec![other, caller]);

    let mock = MockSolver::new();
    let (mut analyzer, _) = analyzer_with(&mock);
    analyzer.analyze(&unit);

    let rendered: Vec<String> = mock.rules().iter().map(|r| r.to_string()).collect();
    assert!(rendered
        .iter()
        .any(|r| r.contains("(nondet_interface_C_")));
}

/// The text driver cannot answer without a cache, so every target stays
/// unknown — and unknown never counts as safe.
#[test]
fn unknown_results_never_classify_as_safe() {
    let mut builder = AstBuilder::new();
    let x = builder.var("x", Type::uint256());
    let x_ref = builder.ident(&x);
    let one = builder.number(1);
    let sum = builder.bin(BinOp::Add, Type::uint256(), x_ref, one);
    let statement = builder.expr_stmt(sum);
    let body = builder.block(vec![statement]);
    let f = builder.public_function("f", vec![x], body);
    let contract = builder.contract("C", vec![], vec![f]);
    let unit = builder.source_unit(vec![contract]);

    let solver = ChcSmtLib2Interface::new(BTreeMap::new(), None);
    let reporter = SharedReporter::new();
    let mut analyzer = ChcAnalyzer::new(Box::new(solver), Box::new(reporter.clone()));
    analyzer.analyze(&unit);

    assert!(analyzer.safe_targets.is_empty());
    assert!(analyzer.unsafe_targets.is_empty());
    let unhandled = analyzer.unhandled_queries();
    assert!(!unhandled.is_empty());
    assert!(unhandled[0].contains("(set-logic HORN)"));
}

/// Solver transport errors warn with the stable id and classify nothing.
#[test]
fn solver_error_reports_1218() {
    let mut builder = AstBuilder::new();
    let x = builder.var("x", Type::uint256());
    let x_ref = builder.ident(&x);
    let one = builder.number(1);
    let sum = builder.bin(BinOp::Add, Type::uint256(), x_ref, one);
    let statement = builder.expr_stmt(sum);
    let body = builder.block(vec![statement]);
    let f = builder.public_function("f", vec![x], body);
    let contract = builder.contract("C", vec![], vec![f]);
    let unit = builder.source_unit(vec![contract]);

    let mock = MockSolver::new();
    mock.script([CheckResult::Error]);
    let (mut analyzer, reporter) = analyzer_with(&mock);
    analyzer.analyze(&unit);

    assert!(analyzer.safe_targets.is_empty());
    assert!(analyzer.unsafe_targets.is_empty());
    assert_eq!(reporter.warnings()[0].report_id, 1218);
}

/// Conflicting redundant solvers warn with the stable id and record no
/// verdict for the conflicting target.
#[test]
fn conflicting_solvers_report_1988() {
    let mut builder = AstBuilder::new();
    let x = builder.var("x", Type::uint256());
    let x_ref = builder.ident(&x);
    let one = builder.number(1);
    let sum = builder.bin(BinOp::Add, Type::uint256(), x_ref, one);
    let sum_id = sum.id();
    let statement = builder.expr_stmt(sum);
    let body = builder.block(vec![statement]);
    let f = builder.public_function("f", vec![x], body);
    let contract = builder.contract("C", vec![], vec![f]);
    let unit = builder.source_unit(vec![contract]);

    let mock = MockSolver::new();
    mock.script([CheckResult::Conflicting]);
    let (mut analyzer, reporter) = analyzer_with(&mock);
    analyzer.analyze(&unit);

    assert!(!analyzer.safe_targets.contains_key(&sum_id));
    assert!(!analyzer.unsafe_targets.contains_key(&sum_id));
    assert_eq!(reporter.warnings()[0].report_id, 1988);
}
