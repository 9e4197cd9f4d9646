//! Structural properties of the emitted clause system.

mod common;

use std::collections::BTreeSet;

use common::MockSolver;
use contract_fv_analysis::ast::{BinOp, Mutability, Type, Visibility};
use contract_fv_analysis::builder::AstBuilder;
use contract_fv_analysis::chc::ChcAnalyzer;
use contract_fv_analysis::reporter::SharedReporter;
use contract_fv_smtlib::term::Term;

fn analyzer_with(mock: &MockSolver) -> (ChcAnalyzer, SharedReporter) {
    let reporter = SharedReporter::new();
    let analyzer = ChcAnalyzer::new(Box::new(mock.clone()), Box::new(reporter.clone()));
    (analyzer, reporter)
}

#[test]
fn empty_contract_creates_the_interface_family() {
    let mut builder = AstBuilder::new();
    let contract = builder.contract("C", vec![], vec![]);
    let unit = builder.source_unit(vec![contract]);

    let mock = MockSolver::new();
    let (mut analyzer, _) = analyzer_with(&mock);
    analyzer.analyze(&unit);

    let names = mock.relation_names();
    assert_eq!(
        names.iter().filter(|n| n.starts_with("interface_")).count(),
        1
    );
    assert_eq!(
        names
            .iter()
            .filter(|n| n.starts_with("nondet_interface_"))
            .count(),
        1
    );
    assert_eq!(
        names
            .iter()
            .filter(|n| n.starts_with("summary_constructor_"))
            .count(),
        1
    );
    assert_eq!(
        names
            .iter()
            .filter(|n| n.starts_with("implicit_constructor_"))
            .count(),
        1
    );

    // The zero-transaction base rule exists.
    assert!(mock.rule_names().iter().any(|n| n == "base_nondet"));

    // Implicit construction flows into the interface:
    // implicit constructor => constructor summary => interface.
    let rule_names = mock.rule_names();
    assert!(rule_names
        .iter()
        .any(|n| n.starts_with("implicit_constructor_") && n.contains("_to_summary_constructor_")));
    assert!(rule_names
        .iter()
        .any(|n| n.starts_with("summary_constructor_") && n.contains("_to_interface_")));

    // Nothing to verify, nothing queried.
    assert_eq!(mock.query_count(), 0);
}

#[test]
fn public_function_gets_the_inductive_transaction_rule() {
    let mut builder = AstBuilder::new();
    let x = builder.var("x", Type::uint256());
    let body = builder.block(vec![]);
    let f = builder.public_function("f", vec![x], body);
    let f_id = f.id;
    let contract = builder.contract("C", vec![], vec![f]);
    let unit = builder.source_unit(vec![contract]);

    let mock = MockSolver::new();
    let (mut analyzer, _) = analyzer_with(&mock);
    analyzer.analyze(&unit);

    let rule_names = mock.rule_names();
    assert!(rule_names
        .iter()
        .any(|n| n == &format!("nondet_transaction_f_{f_id}")));

    // The inductive rule is the only implication with the nondet
    // interface in the head; the base rule is a fact.
    let nondet_heads = mock
        .rules()
        .iter()
        .filter(|rule| match rule {
            Term::Implies(_, head) => head
                .app_name()
                .is_some_and(|n| n.starts_with("nondet_interface_")),
            _ => false,
        })
        .count();
    assert_eq!(nondet_heads, 1);
    let nondet_facts = mock
        .rules()
        .iter()
        .filter(|rule| {
            rule.app_name()
                .is_some_and(|n| n.starts_with("nondet_interface_"))
        })
        .count();
    assert_eq!(nondet_facts, 1);
}

#[test]
fn internal_function_gets_no_transaction_rule() {
    let mut builder = AstBuilder::new();
    let body = builder.block(vec![]);
    let f = builder.function(
        "helper",
        Visibility::Internal,
        Mutability::NonPayable,
        vec![],
        vec![],
        Some(body),
    );
    let contract = builder.contract("C", vec![], vec![f]);
    let unit = builder.source_unit(vec![contract]);

    let mock = MockSolver::new();
    let (mut analyzer, _) = analyzer_with(&mock);
    analyzer.analyze(&unit);

    assert!(!mock
        .rule_names()
        .iter()
        .any(|n| n.starts_with("nondet_transaction_")));
}

/// Every implication's head variables must be bound by its body. The
/// constructor and function entry rules are exempt: entry takes
/// arbitrary (range-constrained) argument values by design.
#[test]
fn rule_heads_are_bound_by_their_bodies() {
    let mut builder = AstBuilder::new();
    let x = builder.var("x", Type::uint256());
    let x_ref = builder.ident(&x);
    let one = builder.number(1);
    let sum = builder.bin(BinOp::Add, Type::uint256(), x_ref, one);
    let x_ref2 = builder.ident(&x);
    let cond = builder.bin(BinOp::Gt, Type::uint256(), sum, x_ref2);
    let assert_stmt = builder.assert_stmt(cond);
    let body = builder.block(vec![assert_stmt]);
    let f = builder.public_function("f", vec![x], body);
    let contract = builder.contract("C", vec![], vec![f]);
    let unit = builder.source_unit(vec![contract]);

    let mock = MockSolver::new();
    let (mut analyzer, _) = analyzer_with(&mock);
    analyzer.analyze(&unit);

    for rule in mock.rules() {
        let Term::Implies(rule_body, head) = &rule else {
            continue;
        };
        let head_name = head.app_name().unwrap_or_default();
        if head_name.starts_with("function_") || head_name.starts_with("constructor_") {
            continue;
        }
        let mut head_vars = BTreeSet::new();
        head.collect_consts(&mut head_vars);
        let mut body_vars = BTreeSet::new();
        rule_body.collect_consts(&mut body_vars);
        for var in &head_vars {
            assert!(
                body_vars.contains(var),
                "head variable {var} of rule with head {head_name} is unbound"
            );
        }
    }
}

#[test]
fn explicit_constructor_gets_an_exit_block() {
    let mut builder = AstBuilder::new();
    let x = builder.var("x", Type::uint256());
    let x_ref = builder.ident(&x);
    let one = builder.number(1);
    let init = builder.assign(x_ref, one);
    let init_stmt = builder.expr_stmt(init);
    let ctor_body = builder.block(vec![init_stmt]);
    let ctor = builder.constructor(ctor_body);

    let x_ref2 = builder.ident(&x);
    let zero = builder.number(0);
    let cond = builder.bin(BinOp::Gt, Type::uint256(), x_ref2, zero);
    let assert_stmt = builder.assert_stmt(cond);
    let f_body = builder.block(vec![assert_stmt]);
    let f = builder.public_function("f", vec![], f_body);

    let contract = builder.contract("C", vec![x], vec![ctor, f]);
    let unit = builder.source_unit(vec![contract]);

    let mock = MockSolver::new();
    let (mut analyzer, _) = analyzer_with(&mock);
    analyzer.analyze(&unit);

    let names = mock.relation_names();
    assert_eq!(
        names
            .iter()
            .filter(|n| n.starts_with("constructor_exit_"))
            .count(),
        1
    );
    // The assertion over the initialized state variable was discharged.
    assert_eq!(mock.query_count(), 1);
    assert_eq!(analyzer.safe_targets.len(), 1);
}

#[test]
fn reanalysis_is_deterministic() {
    let build = || {
        let mut builder = AstBuilder::new();
        let x = builder.var("x", Type::uint256());
        let x_ref = builder.ident(&x);
        let one = builder.number(1);
        let sum = builder.bin(BinOp::Add, Type::uint256(), x_ref, one);
        let statement = builder.expr_stmt(sum);
        let body = builder.block(vec![statement]);
        let f = builder.public_function("f", vec![x], body);
        let contract = builder.contract("C", vec![], vec![f]);
        builder.source_unit(vec![contract])
    };

    let run = |unit: &contract_fv_analysis::ast::SourceUnit| {
        let mock = MockSolver::new();
        let (mut analyzer, _) = analyzer_with(&mock);
        analyzer.analyze(unit);
        let mut names = mock.relation_names();
        names.sort();
        (names, mock.rule_names().len(), analyzer.safe_targets.clone())
    };

    let unit_a = build();
    let unit_b = build();
    let (names_a, rules_a, safe_a) = run(&unit_a);
    let (names_b, rules_b, safe_b) = run(&unit_b);
    assert_eq!(names_a, names_b);
    assert_eq!(rules_a, rules_b);
    assert_eq!(safe_a, safe_b);
}

#[test]
fn loops_and_break_build_the_expected_block_graph() {
    let mut builder = AstBuilder::new();
    let x = builder.var("x", Type::uint256());

    // while (x > 0) { if (x == 1) { break; } x = x - 1; }
    let x_ref = builder.ident(&x);
    let zero = builder.number(0);
    let loop_cond = builder.bin(BinOp::Gt, Type::uint256(), x_ref, zero);

    let x_ref2 = builder.ident(&x);
    let one = builder.number(1);
    let if_cond = builder.bin(BinOp::Eq, Type::uint256(), x_ref2, one);
    let break_stmt = contract_fv_analysis::ast::Statement::Break { id: builder.id() };
    let if_stmt = builder.if_stmt(if_cond, break_stmt, None);

    let x_ref3 = builder.ident(&x);
    let one2 = builder.number(1);
    let decrement = builder.bin(BinOp::Sub, Type::uint256(), x_ref3, one2);
    let decrement_id = decrement.id();
    let x_ref4 = builder.ident(&x);
    let assign = builder.assign(x_ref4, decrement);
    let assign_stmt = builder.expr_stmt(assign);

    let loop_body = builder.block_stmt(vec![if_stmt, assign_stmt]);
    let while_stmt = builder.while_stmt(loop_cond, loop_body);
    let body = builder.block(vec![while_stmt]);
    let f = builder.public_function("f", vec![x], body);
    let contract = builder.contract("C", vec![], vec![f]);
    let unit = builder.source_unit(vec![contract]);

    let mock = MockSolver::new();
    let (mut analyzer, _) = analyzer_with(&mock);
    analyzer.analyze(&unit);

    let names = mock.relation_names();
    assert!(names.iter().any(|n| n.contains("while_header_")));
    assert!(names.iter().any(|n| n.contains("while_body_")));
    assert!(names.iter().any(|n| n.contains("if_header_")));
    assert!(names.iter().any(|n| n.contains("break_ghost_")));

    // The subtraction inside the loop registered an underflow target.
    assert_eq!(mock.query_count(), 1);
    assert!(analyzer.safe_targets[&decrement_id]
        .contains(&contract_fv_analysis::targets::TargetKind::Underflow));
}

#[test]
fn analyze_resets_the_solver_between_runs() {
    let mut builder = AstBuilder::new();
    let contract = builder.contract("C", vec![], vec![]);
    let unit = builder.source_unit(vec![contract]);

    let mock = MockSolver::new();
    let (mut analyzer, _) = analyzer_with(&mock);
    analyzer.analyze(&unit);
    let first_relations = mock.relation_names();
    analyzer.analyze(&unit);
    let second_relations = mock.relation_names();

    assert_eq!(mock.state.borrow().resets, 2);
    assert_eq!(first_relations, second_relations);
}

#[test]
fn error_ids_are_unique_and_nonzero() {
    let mut builder = AstBuilder::new();
    let x = builder.var("x", Type::uint256());
    let y = builder.var("y", Type::uint256());
    let x_ref = builder.ident(&x);
    let y_ref = builder.ident(&y);
    let sum = builder.bin(BinOp::Add, Type::uint256(), x_ref, y_ref);
    let x_ref2 = builder.ident(&x);
    let y_ref2 = builder.ident(&y);
    let product = builder.bin(BinOp::Mul, Type::uint256(), x_ref2, y_ref2);
    let s1 = builder.expr_stmt(sum);
    let s2 = builder.expr_stmt(product);
    let body = builder.block(vec![s1, s2]);
    let f = builder.public_function("f", vec![x, y], body);
    let contract = builder.contract("C", vec![], vec![f]);
    let unit = builder.source_unit(vec![contract]);

    let mock = MockSolver::new();
    let (mut analyzer, _) = analyzer_with(&mock);
    analyzer.analyze(&unit);

    let ids = analyzer.registered_error_ids();
    assert!(!ids.is_empty());
    assert!(ids.iter().all(|id| *id != 0));
    let unique: BTreeSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len());
}
