//! Operator typing table: maps (BinOp, lhs, rhs) → result type.
//!
//! Equality and logical operators are generic and handled in `result_type`;
//! everything else must be registered.

use std::collections::HashMap;

use crate::syntax::ast::{BinOp, UnOp};
use crate::types::Type;

pub struct OperatorTable {
    ops: HashMap<(BinOp, Type, Type), Type>,
}

impl OperatorTable {
    pub fn new() -> Self {
        Self { ops: HashMap::new() }
    }

    pub fn register(&mut self, op: BinOp, lhs: Type, rhs: Type, ret: Type) {
        self.ops.insert((op, lhs, rhs), ret);
    }

    /// Arithmetic and comparison on the numeric types, plus string concatenation.
    pub fn standard() -> Self {
        let mut t = Self::new();
        let numeric = [Type::Byte, Type::Short, Type::Int, Type::Long, Type::Float, Type::Double];

        for l in &numeric {
            for r in &numeric {
                let ret = promote(l, r);
                for op in [BinOp::Add, BinOp::Sub, BinOp::Mul, BinOp::Div, BinOp::Mod] {
                    t.register(op, l.clone(), r.clone(), ret.clone());
                }
                for op in [BinOp::Lt, BinOp::LtEq, BinOp::Gt, BinOp::GtEq] {
                    t.register(op, l.clone(), r.clone(), Type::Boolean);
                }
            }
        }

        for op in [BinOp::Lt, BinOp::LtEq, BinOp::Gt, BinOp::GtEq] {
            t.register(op, Type::Char, Type::Char, Type::Boolean);
            t.register(op, Type::String, Type::String, Type::Boolean);
        }
        t
    }

    /// Result type of `lhs op rhs`, or `None` if the operator does not apply.
    pub fn result_type(&self, op: BinOp, lhs: &Type, rhs: &Type) -> Option<Type> {
        if lhs.is_error() || rhs.is_error() {
            return Some(Type::error("operand has errors"));
        }
        match op {
            BinOp::Eq | BinOp::NotEq => Some(Type::Boolean),
            BinOp::And | BinOp::Or => {
                (*lhs == Type::Boolean && *rhs == Type::Boolean).then_some(Type::Boolean)
            }
            // `"a" + anything` concatenates
            BinOp::Add if *lhs == Type::String => Some(Type::String),
            _ => self.ops.get(&(op, lhs.clone(), rhs.clone())).cloned(),
        }
    }
}

impl Default for OperatorTable {
    fn default() -> Self {
        Self::standard()
    }
}

pub fn unary_result_type(op: UnOp, operand: &Type) -> Option<Type> {
    match (op, operand) {
        (_, t) if t.is_error() => Some(t.clone()),
        (UnOp::Neg, Type::Byte | Type::Short) => Some(Type::Int),
        (UnOp::Neg, t) if t.is_numeric() => Some(t.clone()),
        (UnOp::Not, Type::Boolean) => Some(Type::Boolean),
        _ => None,
    }
}

/// Kotlin-style numeric promotion: at least `Int`, otherwise the wider operand.
fn promote(l: &Type, r: &Type) -> Type {
    fn rank(t: &Type) -> u8 {
        match t {
            Type::Long   => 1,
            Type::Float  => 2,
            Type::Double => 3,
            _ => 0,
        }
    }
    match rank(l).max(rank(r)) {
        1 => Type::Long,
        2 => Type::Float,
        3 => Type::Double,
        _ => Type::Int,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_promotion() {
        let t = OperatorTable::standard();
        assert_eq!(t.result_type(BinOp::Add, &Type::Byte, &Type::Short), Some(Type::Int));
        assert_eq!(t.result_type(BinOp::Mul, &Type::Int, &Type::Long), Some(Type::Long));
        assert_eq!(t.result_type(BinOp::Sub, &Type::Float, &Type::Double), Some(Type::Double));
        assert_eq!(t.result_type(BinOp::Lt, &Type::Int, &Type::Double), Some(Type::Boolean));
    }

    #[test]
    fn string_concatenation() {
        let t = OperatorTable::standard();
        assert_eq!(t.result_type(BinOp::Add, &Type::String, &Type::Int), Some(Type::String));
        assert_eq!(t.result_type(BinOp::Add, &Type::Int, &Type::String), None);
    }

    #[test]
    fn logical_requires_booleans() {
        let t = OperatorTable::standard();
        assert_eq!(t.result_type(BinOp::And, &Type::Boolean, &Type::Boolean), Some(Type::Boolean));
        assert_eq!(t.result_type(BinOp::Or, &Type::Int, &Type::Boolean), None);
    }

    #[test]
    fn unary_operators() {
        assert_eq!(unary_result_type(UnOp::Neg, &Type::Short), Some(Type::Int));
        assert_eq!(unary_result_type(UnOp::Neg, &Type::Double), Some(Type::Double));
        assert_eq!(unary_result_type(UnOp::Not, &Type::Int), None);
    }
}
