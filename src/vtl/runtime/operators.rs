//! Operator semantics
//!
//!     `+` concatenates as soon as either side is a string, otherwise it adds. The other
//!     arithmetic operators coerce numeric-looking strings and yield null when a side has
//!     no numeric value. Division and modulo by zero give 0.
//!
//!     Comparisons are numeric when both sides are numeric, lexicographic between strings,
//!     and false otherwise. `&&` and `||` are short-circuited by the evaluator; the versions
//!     here are the eager fallbacks.

use super::value::Value;
use crate::vtl::ast::{BinaryOperator, UnaryOperator};
use std::cmp::Ordering;

pub fn binary(operator: BinaryOperator, left: &Value, right: &Value) -> Value {
    match operator {
        BinaryOperator::Or => Value::Bool(left.is_truthy() || right.is_truthy()),
        BinaryOperator::And => Value::Bool(left.is_truthy() && right.is_truthy()),
        BinaryOperator::Equal => Value::Bool(left.loose_eq(right)),
        BinaryOperator::NotEqual => Value::Bool(!left.loose_eq(right)),
        BinaryOperator::Less => relational(left, right, Ordering::is_lt),
        BinaryOperator::LessEqual => relational(left, right, Ordering::is_le),
        BinaryOperator::Greater => relational(left, right, Ordering::is_gt),
        BinaryOperator::GreaterEqual => relational(left, right, Ordering::is_ge),
        BinaryOperator::Add => add(left, right),
        BinaryOperator::Subtract => arithmetic(left, right, |a, b| a - b),
        BinaryOperator::Multiply => arithmetic(left, right, |a, b| a * b),
        BinaryOperator::Divide => arithmetic(left, right, |a, b| if b == 0.0 { 0.0 } else { a / b }),
        BinaryOperator::Modulo => arithmetic(left, right, |a, b| if b == 0.0 { 0.0 } else { a % b }),
    }
}

pub fn unary(operator: UnaryOperator, operand: &Value) -> Value {
    match operator {
        UnaryOperator::Not => Value::Bool(!operand.is_truthy()),
        UnaryOperator::Negate => operand.as_number().map_or(Value::Null, |n| Value::Number(-n)),
        UnaryOperator::Plus => operand.as_number().map_or(Value::Null, Value::Number),
    }
}

fn add(left: &Value, right: &Value) -> Value {
    if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
        return Value::String(format!("{}{}", left, right));
    }
    arithmetic(left, right, |a, b| a + b)
}

fn arithmetic(left: &Value, right: &Value, apply: impl Fn(f64, f64) -> f64) -> Value {
    match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => Value::Number(apply(a, b)),
        _ => {
            log::debug!("arithmetic on {} and {} yields null", left.kind(), right.kind());
            Value::Null
        }
    }
}

/// Ordering of two values, when they are comparable at all.
pub fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => match (left.as_number(), right.as_number()) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => Some(a.cmp(b)),
        },
        _ => match (left.as_number(), right.as_number()) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => None,
        },
    }
}

fn relational(left: &Value, right: &Value, test: fn(Ordering) -> bool) -> Value {
    Value::Bool(compare(left, right).is_some_and(test))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(BinaryOperator::Add, Value::from(5), Value::from(3), "8")]
    #[case(BinaryOperator::Add, Value::from("5"), Value::from("3"), "53")]
    #[case(BinaryOperator::Add, Value::from("a"), Value::from(1), "a1")]
    #[case(BinaryOperator::Add, Value::from("a"), Value::Null, "a")]
    #[case(BinaryOperator::Add, Value::Null, Value::from(1), "")]
    #[case(BinaryOperator::Subtract, Value::from("10"), Value::from(4), "6")]
    #[case(BinaryOperator::Multiply, Value::from(2.5), Value::from(2), "5")]
    #[case(BinaryOperator::Divide, Value::from(7), Value::from(2), "3.5")]
    #[case(BinaryOperator::Divide, Value::from(7), Value::from(0), "0")]
    #[case(BinaryOperator::Divide, Value::from("9"), Value::from("3"), "3")]
    #[case(BinaryOperator::Modulo, Value::from(7), Value::from(3), "1")]
    #[case(BinaryOperator::Modulo, Value::from(7), Value::from(0), "0")]
    #[case(BinaryOperator::Multiply, Value::from("x"), Value::from(2), "")]
    fn test_arithmetic(
        #[case] operator: BinaryOperator,
        #[case] left: Value,
        #[case] right: Value,
        #[case] expected: &str,
    ) {
        assert_eq!(binary(operator, &left, &right).to_string(), expected);
    }

    #[rstest]
    #[case(BinaryOperator::Equal, Value::from(1), Value::from("1"), true)]
    #[case(BinaryOperator::NotEqual, Value::from("a"), Value::from("b"), true)]
    #[case(BinaryOperator::Less, Value::from("5"), Value::from("10"), true)]
    #[case(BinaryOperator::Less, Value::from("b"), Value::from("a"), false)]
    #[case(BinaryOperator::GreaterEqual, Value::from("b"), Value::from("a"), true)]
    #[case(BinaryOperator::Greater, Value::Null, Value::from(0), false)]
    #[case(BinaryOperator::LessEqual, Value::Null, Value::from(0), false)]
    #[case(BinaryOperator::Equal, Value::Null, Value::Null, true)]
    #[case(BinaryOperator::And, Value::from(1), Value::from(""), false)]
    #[case(BinaryOperator::Or, Value::Null, Value::from("x"), true)]
    fn test_comparisons_and_logic(
        #[case] operator: BinaryOperator,
        #[case] left: Value,
        #[case] right: Value,
        #[case] expected: bool,
    ) {
        assert_eq!(binary(operator, &left, &right), Value::Bool(expected));
    }

    #[test]
    fn test_unary() {
        assert_eq!(unary(UnaryOperator::Not, &Value::Null), Value::Bool(true));
        assert_eq!(unary(UnaryOperator::Negate, &Value::from("4")), Value::from(-4));
        assert_eq!(unary(UnaryOperator::Plus, &Value::from("x")), Value::Null);
    }
}
