//! SMT-LIB2 text formatting for AST types.
//!
//! Implements `Display` for [`Sort`], [`Term`], [`Command`], and [`Script`],
//! producing valid SMT-LIB2 output that can be parsed by Horn solvers such
//! as Spacer and Eldarica.

use std::fmt;

use crate::command::Command;
use crate::script::Script;
use crate::sort::Sort;
use crate::term::Term;

// ---------------------------------------------------------------------------
// Sort
// ---------------------------------------------------------------------------

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Bool => write!(f, "Bool"),
            Sort::Int => write!(f, "Int"),
            Sort::Array(index, element) => write!(f, "(Array {index} {element})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Term
// ---------------------------------------------------------------------------

/// Write a binary SMT-LIB operator: `(op lhs rhs)`.
fn fmt_binop(op: &str, lhs: &Term, rhs: &Term, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "({op} {lhs} {rhs})")
}

/// Write a unary SMT-LIB operator: `(op arg)`.
fn fmt_unop(op: &str, arg: &Term, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "({op} {arg})")
}

/// Write sorted variable bindings: `((x Sort) (y Sort) ...)`.
fn fmt_sorted_vars(vars: &[(String, Sort)], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "(")?;
    for (i, (name, sort)) in vars.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "({name} {sort})")?;
    }
    write!(f, ")")
}

/// Write a space-separated list of terms.
fn fmt_term_list(terms: &[Term], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, t) in terms.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{t}")?;
    }
    Ok(())
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // --- Literals ---
            Term::BoolLit(true) => write!(f, "true"),
            Term::BoolLit(false) => write!(f, "false"),
            Term::IntLit(n) => {
                if *n < 0 {
                    // SMT-LIB represents negative integers as `(- N)`
                    write!(f, "(- {})", -n)
                } else {
                    write!(f, "{n}")
                }
            }
            Term::Numeral(s) => write!(f, "{s}"),

            // --- Variables ---
            Term::Const(name) => write!(f, "{name}"),

            // --- Boolean operations ---
            Term::Not(inner) => fmt_unop("not", inner, f),
            Term::And(terms) => {
                if terms.is_empty() {
                    write!(f, "true")
                } else {
                    write!(f, "(and ")?;
                    fmt_term_list(terms, f)?;
                    write!(f, ")")
                }
            }
            Term::Or(terms) => {
                if terms.is_empty() {
                    write!(f, "false")
                } else {
                    write!(f, "(or ")?;
                    fmt_term_list(terms, f)?;
                    write!(f, ")")
                }
            }
            Term::Implies(lhs, rhs) => fmt_binop("=>", lhs, rhs, f),

            // --- Core ---
            Term::Eq(lhs, rhs) => fmt_binop("=", lhs, rhs, f),
            Term::Ite(cond, then_branch, else_branch) => {
                write!(f, "(ite {cond} {then_branch} {else_branch})")
            }

            // --- Integer arithmetic ---
            Term::IntAdd(a, b) => fmt_binop("+", a, b, f),
            Term::IntSub(a, b) => fmt_binop("-", a, b, f),
            Term::IntMul(a, b) => fmt_binop("*", a, b, f),
            Term::IntDiv(a, b) => fmt_binop("div", a, b, f),
            Term::IntMod(a, b) => fmt_binop("mod", a, b, f),
            Term::IntNeg(a) => fmt_unop("-", a, f),
            Term::IntLt(a, b) => fmt_binop("<", a, b, f),
            Term::IntLe(a, b) => fmt_binop("<=", a, b, f),
            Term::IntGt(a, b) => fmt_binop(">", a, b, f),
            Term::IntGe(a, b) => fmt_binop(">=", a, b, f),

            // --- Arrays ---
            Term::Select(array, index) => fmt_binop("select", array, index, f),
            Term::Store(array, index, value) => {
                write!(f, "(store {array} {index} {value})")
            }

            // --- Bitvector bridge ---
            Term::Int2Bv(n, a) => write!(f, "((_ int2bv {n}) {a})"),
            Term::Bv2Int(a) => fmt_unop("bv2int", a, f),
            Term::BvAnd(a, b) => fmt_binop("bvand", a, b, f),
            Term::BvOr(a, b) => fmt_binop("bvor", a, b, f),
            Term::BvXor(a, b) => fmt_binop("bvxor", a, b, f),
            Term::BvNot(a) => fmt_unop("bvnot", a, f),

            // --- Quantifiers ---
            Term::Forall(vars, body) => {
                write!(f, "(forall ")?;
                fmt_sorted_vars(vars, f)?;
                write!(f, " {body})")
            }

            // --- Application ---
            Term::App(name, args) => {
                if args.is_empty() {
                    write!(f, "{name}")
                } else {
                    write!(f, "({name} ")?;
                    fmt_term_list(args, f)?;
                    write!(f, ")")
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SetLogic(logic) => write!(f, "(set-logic {logic})"),
            Command::DeclareFun(name, params, ret) => {
                write!(f, "(declare-fun {name} (")?;
                for (i, s) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{s}")?;
                }
                write!(f, ") {ret})")
            }
            Command::Assert(term) => write!(f, "(assert {term})"),
            Command::CheckSat => write!(f, "(check-sat)"),
            Command::Comment(text) => write!(f, "; {text}"),
            Command::Exit => write!(f, "(exit)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Script
// ---------------------------------------------------------------------------

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for cmd in self.commands() {
            writeln!(f, "{cmd}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_format() {
        assert_eq!(Sort::Bool.to_string(), "Bool");
        assert_eq!(Sort::Int.to_string(), "Int");
        assert_eq!(Sort::state().to_string(), "(Array Int Int)");
    }

    #[test]
    fn negative_int_lit() {
        assert_eq!(Term::IntLit(-5).to_string(), "(- 5)");
        assert_eq!(Term::IntLit(5).to_string(), "5");
    }

    #[test]
    fn numeral_formats_verbatim() {
        let t = Term::pow2(256);
        assert!(t.to_string().starts_with("115792089237316195"));
    }

    #[test]
    fn application_with_and_without_args() {
        let nullary = Term::App("error_0".to_string(), vec![]);
        assert_eq!(nullary.to_string(), "error_0");
        let unary = Term::App("interface_C_1".to_string(), vec![Term::IntLit(0)]);
        assert_eq!(unary.to_string(), "(interface_C_1 0)");
    }

    #[test]
    fn forall_rule_shape() {
        let rule = Term::Forall(
            vec![("x".to_string(), Sort::Int)],
            Box::new(Term::implies(
                Term::App("p".to_string(), vec![Term::Const("x".into())]),
                Term::App("q".to_string(), vec![Term::Const("x".into())]),
            )),
        );
        assert_eq!(rule.to_string(), "(forall ((x Int)) (=> (p x) (q x)))");
    }

    #[test]
    fn bitwise_bridge_format() {
        let t = Term::Bv2Int(Box::new(Term::BvOr(
            Box::new(Term::Int2Bv(8, Box::new(Term::Const("a".into())))),
            Box::new(Term::Int2Bv(8, Box::new(Term::Const("b".into())))),
        )));
        assert_eq!(
            t.to_string(),
            "(bv2int (bvor ((_ int2bv 8) a) ((_ int2bv 8) b)))"
        );
    }

    #[test]
    fn declare_fun_format() {
        let cmd = Command::DeclareFun(
            "summary_3_function_f".to_string(),
            vec![Sort::Int, Sort::state()],
            Sort::Bool,
        );
        assert_eq!(
            cmd.to_string(),
            "(declare-fun summary_3_function_f (Int (Array Int Int)) Bool)"
        );
    }

    #[test]
    fn script_renders_line_per_command() {
        let script = Script::with_commands(vec![
            Command::SetLogic("HORN".to_string()),
            Command::CheckSat,
        ]);
        assert_eq!(script.to_string(), "(set-logic HORN)\n(check-sat)\n");
    }
}
