//! Property tests over the target engine's bookkeeping.

mod common;

use std::collections::BTreeSet;

use common::MockSolver;
use proptest::prelude::*;

use contract_fv_analysis::ast::{BinOp, Type};
use contract_fv_analysis::builder::AstBuilder;
use contract_fv_analysis::chc::ChcAnalyzer;
use contract_fv_analysis::reporter::SharedReporter;

fn op_from_index(index: usize) -> BinOp {
    match index % 3 {
        0 => BinOp::Add,
        1 => BinOp::Sub,
        _ => BinOp::Mul,
    }
}

fn build_program(ops: &[usize], signed: bool) -> contract_fv_analysis::ast::SourceUnit {
    let ty = if signed { Type::int(64) } else { Type::uint(64) };
    let mut builder = AstBuilder::new();
    let x = builder.var("x", ty.clone());
    let y = builder.var("y", ty.clone());
    let mut statements = Vec::new();
    for op in ops {
        let lhs = builder.ident(&x);
        let rhs = builder.ident(&y);
        let expr = builder.bin(op_from_index(*op), ty.clone(), lhs, rhs);
        statements.push(builder.expr_stmt(expr));
    }
    let body = builder.block(statements);
    let f = builder.public_function("f", vec![x, y], body);
    let contract = builder.contract("C", vec![], vec![f]);
    builder.source_unit(vec![contract])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn error_ids_stay_unique_and_nonzero(
        ops in prop::collection::vec(0usize..3, 1..6),
        signed in any::<bool>(),
    ) {
        let unit = build_program(&ops, signed);
        let mock = MockSolver::new();
        let reporter = SharedReporter::new();
        let mut analyzer = ChcAnalyzer::new(Box::new(mock.clone()), Box::new(reporter.clone()));
        analyzer.analyze(&unit);

        let ids = analyzer.registered_error_ids();
        prop_assert!(!ids.is_empty());
        prop_assert!(ids.iter().all(|id| *id != 0));
        let unique: BTreeSet<_> = ids.iter().collect();
        prop_assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn verdict_sets_stay_disjoint(
        ops in prop::collection::vec(0usize..3, 1..6),
        signed in any::<bool>(),
    ) {
        let unit = build_program(&ops, signed);
        let mock = MockSolver::new();
        // Alternate answers so both verdict sets get populated.
        let mut answers = Vec::new();
        for i in 0..(2 * ops.len() + 2) {
            if i % 2 == 0 {
                answers.push(contract_fv_solver::CheckResult::Unsatisfiable);
            } else {
                answers.push(contract_fv_solver::CheckResult::Satisfiable);
                answers.push(contract_fv_solver::CheckResult::Satisfiable);
            }
        }
        mock.script(answers);
        let reporter = SharedReporter::new();
        let mut analyzer = ChcAnalyzer::new(Box::new(mock.clone()), Box::new(reporter.clone()));
        analyzer.analyze(&unit);

        for (node, kinds) in &analyzer.safe_targets {
            if let Some(unsafe_kinds) = analyzer.unsafe_targets.get(node) {
                prop_assert!(kinds.is_disjoint(unsafe_kinds));
            }
        }
    }
}
