use std::collections::BTreeSet;

use crate::sort::Sort;

/// SMT-LIB term (expression) representation.
///
/// Integer arithmetic is over unbounded mathematical integers; machine
/// bounds are enforced by the encoder through explicit range constraints.
/// Fixed-width bitwise operators bridge through `int2bv`/`bv2int`.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    // === Literals ===
    /// Boolean literal
    BoolLit(bool),
    /// Integer literal
    IntLit(i128),
    /// Unbounded non-negative integer literal as a decimal string.
    /// Used for 256-bit type bounds that do not fit in `i128`.
    Numeral(String),

    // === Variables ===
    /// Named constant/variable reference
    Const(String),

    // === Boolean operations ===
    /// Logical NOT
    Not(Box<Term>),
    /// Logical AND (n-ary)
    And(Vec<Term>),
    /// Logical OR (n-ary)
    Or(Vec<Term>),
    /// Logical implication: `(=> a b)`
    Implies(Box<Term>, Box<Term>),

    // === Core ===
    /// Equality: `(= a b)`
    Eq(Box<Term>, Box<Term>),
    /// If-then-else: `(ite cond then else)`
    Ite(Box<Term>, Box<Term>, Box<Term>),

    // === Integer arithmetic ===
    /// `(+ a b)`
    IntAdd(Box<Term>, Box<Term>),
    /// `(- a b)`
    IntSub(Box<Term>, Box<Term>),
    /// `(* a b)`
    IntMul(Box<Term>, Box<Term>),
    /// `(div a b)` — integer division
    IntDiv(Box<Term>, Box<Term>),
    /// `(mod a b)`
    IntMod(Box<Term>, Box<Term>),
    /// `(- a)` — integer negation
    IntNeg(Box<Term>),
    /// `(< a b)`
    IntLt(Box<Term>, Box<Term>),
    /// `(<= a b)`
    IntLe(Box<Term>, Box<Term>),
    /// `(> a b)`
    IntGt(Box<Term>, Box<Term>),
    /// `(>= a b)`
    IntGe(Box<Term>, Box<Term>),

    // === Array operations ===
    /// `(select array index)`
    Select(Box<Term>, Box<Term>),
    /// `(store array index value)`
    Store(Box<Term>, Box<Term>, Box<Term>),

    // === Bitvector bridge for fixed-width bitwise operators ===
    /// `((_ int2bv n) a)`
    Int2Bv(u32, Box<Term>),
    /// `(bv2int a)`
    Bv2Int(Box<Term>),
    /// `(bvand a b)`
    BvAnd(Box<Term>, Box<Term>),
    /// `(bvor a b)`
    BvOr(Box<Term>, Box<Term>),
    /// `(bvxor a b)`
    BvXor(Box<Term>, Box<Term>),
    /// `(bvnot a)`
    BvNot(Box<Term>),

    // === Quantifiers ===
    /// `(forall ((x Sort) ...) body)`
    Forall(Vec<(String, Sort)>, Box<Term>),

    // === Function application ===
    /// `(f arg1 arg2 ...)` — predicate/relation application
    App(String, Vec<Term>),
}

impl Term {
    /// The integer literal `2^bits`, exact for any width.
    pub fn pow2(bits: u32) -> Term {
        if bits < 127 {
            Term::IntLit(1i128 << bits)
        } else {
            Term::Numeral(pow2_decimal(bits))
        }
    }

    /// The integer literal `2^bits - 1` (maximum of an unsigned type).
    pub fn pow2_minus_one(bits: u32) -> Term {
        if bits < 127 {
            Term::IntLit((1i128 << bits) - 1)
        } else {
            let mut digits = pow2_decimal(bits);
            decrement_decimal(&mut digits);
            Term::Numeral(digits)
        }
    }

    /// Conjunction that collapses trivial shapes.
    pub fn and(terms: Vec<Term>) -> Term {
        let mut flat: Vec<Term> = Vec::new();
        for t in terms {
            match t {
                Term::BoolLit(true) => {}
                Term::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Term::BoolLit(true),
            1 => flat.pop().unwrap(),
            _ => Term::And(flat),
        }
    }

    /// Disjunction of two terms.
    pub fn or2(a: Term, b: Term) -> Term {
        Term::Or(vec![a, b])
    }

    /// `(= a b)`
    pub fn eq(a: Term, b: Term) -> Term {
        Term::Eq(Box::new(a), Box::new(b))
    }

    /// `(not a)`
    pub fn not(a: Term) -> Term {
        Term::Not(Box::new(a))
    }

    /// `(=> a b)`
    pub fn implies(a: Term, b: Term) -> Term {
        Term::Implies(Box::new(a), Box::new(b))
    }

    /// The name of an applied relation, if this term is an application
    /// or a bare constant.
    pub fn app_name(&self) -> Option<&str> {
        match self {
            Term::App(name, _) => Some(name),
            Term::Const(name) => Some(name),
            _ => None,
        }
    }

    /// Collect the names of all free constants occurring in the term.
    ///
    /// Relation applications contribute only their arguments; bound
    /// quantifier variables are excluded.
    pub fn collect_consts(&self, out: &mut BTreeSet<String>) {
        match self {
            Term::BoolLit(_) | Term::IntLit(_) | Term::Numeral(_) => {}
            Term::Const(name) => {
                out.insert(name.clone());
            }
            Term::Not(a) | Term::IntNeg(a) | Term::Int2Bv(_, a) | Term::Bv2Int(a)
            | Term::BvNot(a) => a.collect_consts(out),
            Term::And(ts) | Term::Or(ts) => {
                for t in ts {
                    t.collect_consts(out);
                }
            }
            Term::Implies(a, b)
            | Term::Eq(a, b)
            | Term::IntAdd(a, b)
            | Term::IntSub(a, b)
            | Term::IntMul(a, b)
            | Term::IntDiv(a, b)
            | Term::IntMod(a, b)
            | Term::IntLt(a, b)
            | Term::IntLe(a, b)
            | Term::IntGt(a, b)
            | Term::IntGe(a, b)
            | Term::Select(a, b)
            | Term::BvAnd(a, b)
            | Term::BvOr(a, b)
            | Term::BvXor(a, b) => {
                a.collect_consts(out);
                b.collect_consts(out);
            }
            Term::Ite(a, b, c) | Term::Store(a, b, c) => {
                a.collect_consts(out);
                b.collect_consts(out);
                c.collect_consts(out);
            }
            Term::Forall(bound, body) => {
                let mut inner = BTreeSet::new();
                body.collect_consts(&mut inner);
                for (name, _) in bound {
                    inner.remove(name);
                }
                out.extend(inner);
            }
            Term::App(_, args) => {
                for a in args {
                    a.collect_consts(out);
                }
            }
        }
    }
}

/// Decimal representation of `2^bits`, computed by repeated doubling.
fn pow2_decimal(bits: u32) -> String {
    let mut digits = vec![1u8];
    for _ in 0..bits {
        let mut carry = 0u8;
        for d in digits.iter_mut() {
            let doubled = *d * 2 + carry;
            *d = doubled % 10;
            carry = doubled / 10;
        }
        if carry > 0 {
            digits.push(carry);
        }
    }
    digits.iter().rev().map(|d| (b'0' + d) as char).collect()
}

/// Subtract one from a positive decimal string in place.
fn decrement_decimal(s: &mut String) {
    let mut digits: Vec<u8> = s.bytes().map(|b| b - b'0').collect();
    let mut i = digits.len();
    while i > 0 {
        i -= 1;
        if digits[i] > 0 {
            digits[i] -= 1;
            break;
        }
        digits[i] = 9;
    }
    let trimmed: String = digits
        .iter()
        .map(|d| (b'0' + d) as char)
        .collect::<String>()
        .trim_start_matches('0')
        .to_string();
    *s = if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed
    };
}
