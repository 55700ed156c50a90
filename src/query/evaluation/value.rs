//! Literal semantics: typed comparison, arithmetic, effective boolean value
//! and wildcard matching.
//!
//! Numeric operands are promoted along integer < decimal < float < double
//! before they are compared or combined. Integer division yields a decimal.

use super::{ConditionEvaluationError, ConditionResult};
use crate::query::algebra::{CompareOp, MathOp};
use crate::rdf::{Literal, RdfTerm, TermFactory};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::str::FromStr;

const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

/// Local name of an XSD datatype, `None` for other datatypes
fn xsd_local(lit: &Literal) -> Option<&str> {
    lit.datatype_iri().strip_prefix(XSD)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum NumericType {
    Integer,
    Decimal,
    Float,
    Double,
}

#[derive(Debug, Clone, Copy)]
enum Numeric {
    Integer(i128),
    Decimal(Decimal),
    Float(f32),
    Double(f64),
}

fn numeric_type(lit: &Literal) -> Option<NumericType> {
    match xsd_local(lit)? {
        "integer" | "long" | "int" | "short" | "byte" | "nonNegativeInteger"
        | "positiveInteger" | "nonPositiveInteger" | "negativeInteger" | "unsignedLong"
        | "unsignedInt" | "unsignedShort" | "unsignedByte" => Some(NumericType::Integer),
        "decimal" => Some(NumericType::Decimal),
        "float" => Some(NumericType::Float),
        "double" => Some(NumericType::Double),
        _ => None,
    }
}

fn parse_numeric(lit: &Literal) -> Option<Numeric> {
    let label = lit.value().trim();
    match numeric_type(lit)? {
        NumericType::Integer => i128::from_str(label).ok().map(Numeric::Integer),
        NumericType::Decimal => Decimal::from_str(label).ok().map(Numeric::Decimal),
        NumericType::Float => parse_floating(label).map(|v| Numeric::Float(v as f32)),
        NumericType::Double => parse_floating(label).map(Numeric::Double),
    }
}

fn parse_floating(label: &str) -> Option<f64> {
    match label {
        "INF" | "+INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        _ => f64::from_str(label).ok(),
    }
}

impl Numeric {
    fn kind(&self) -> NumericType {
        match self {
            Numeric::Integer(_) => NumericType::Integer,
            Numeric::Decimal(_) => NumericType::Decimal,
            Numeric::Float(_) => NumericType::Float,
            Numeric::Double(_) => NumericType::Double,
        }
    }

    fn to_f64(self) -> Option<f64> {
        match self {
            Numeric::Integer(v) => Some(v as f64),
            Numeric::Decimal(v) => v.to_f64(),
            Numeric::Float(v) => Some(f64::from(v)),
            Numeric::Double(v) => Some(v),
        }
    }

    /// Convert to a wider type; never narrows
    fn promote(self, target: NumericType) -> Option<Numeric> {
        match (self, target) {
            (v, t) if v.kind() == t => Some(v),
            (Numeric::Integer(v), NumericType::Decimal) => {
                Decimal::try_from_i128_with_scale(v, 0).ok().map(Numeric::Decimal)
            }
            (v, NumericType::Float) => v.to_f64().map(|f| Numeric::Float(f as f32)),
            (v, NumericType::Double) => v.to_f64().map(Numeric::Double),
            _ => None,
        }
    }
}

fn promote_pair(left: Numeric, right: Numeric) -> Option<(Numeric, Numeric)> {
    let common = left.kind().max(right.kind());
    Some((left.promote(common)?, right.promote(common)?))
}

/// `None` when unordered (NaN involved)
fn compare_numeric(left: Numeric, right: Numeric) -> Option<Ordering> {
    match promote_pair(left, right)? {
        (Numeric::Integer(a), Numeric::Integer(b)) => Some(a.cmp(&b)),
        (Numeric::Decimal(a), Numeric::Decimal(b)) => Some(a.cmp(&b)),
        (Numeric::Float(a), Numeric::Float(b)) => a.partial_cmp(&b),
        (Numeric::Double(a), Numeric::Double(b)) => a.partial_cmp(&b),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy)]
enum DateTimeValue {
    Zoned(DateTime<FixedOffset>),
    Local(NaiveDateTime),
}

fn parse_date_time(label: &str) -> Option<DateTimeValue> {
    DateTime::parse_from_rfc3339(label)
        .ok()
        .map(DateTimeValue::Zoned)
        .or_else(|| {
            NaiveDateTime::parse_from_str(label, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(DateTimeValue::Local)
        })
}

/// `None` when the order is indeterminate (timezone on one side only)
fn compare_date_times(left: DateTimeValue, right: DateTimeValue) -> Option<Ordering> {
    match (left, right) {
        (DateTimeValue::Zoned(a), DateTimeValue::Zoned(b)) => Some(a.cmp(&b)),
        (DateTimeValue::Local(a), DateTimeValue::Local(b)) => Some(a.cmp(&b)),
        _ => None,
    }
}

fn parse_boolean(label: &str) -> Option<bool> {
    match label.trim() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn apply(op: CompareOp, ordering: Ordering) -> bool {
    match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
    }
}

/// Compare two terms with `op`
///
/// Literals are compared by value where their datatypes allow it; other
/// terms only support `=` and `!=`.
pub fn compare_terms(left: &RdfTerm, right: &RdfTerm, op: CompareOp) -> ConditionResult<bool> {
    match (left, right) {
        (RdfTerm::Literal(l), RdfTerm::Literal(r)) => compare_literals(l, r, op),
        _ => match op {
            CompareOp::Eq => Ok(left == right),
            CompareOp::Ne => Ok(left != right),
            _ => Err(ConditionEvaluationError::Incomparable(format!(
                "{} {} {}",
                left,
                op.symbol(),
                right
            ))),
        },
    }
}

fn compare_literals(left: &Literal, right: &Literal, op: CompareOp) -> ConditionResult<bool> {
    if left.is_simple() && right.is_simple() {
        return Ok(apply(op, left.value().cmp(right.value())));
    }

    if let (Some(a), Some(b)) = (parse_numeric(left), parse_numeric(right)) {
        return Ok(match compare_numeric(a, b) {
            Some(ordering) => apply(op, ordering),
            None => op == CompareOp::Ne,
        });
    }

    match (xsd_local(left), xsd_local(right)) {
        (Some("boolean"), Some("boolean")) => {
            if let (Some(a), Some(b)) = (parse_boolean(left.value()), parse_boolean(right.value())) {
                return Ok(apply(op, a.cmp(&b)));
            }
        }
        (Some("dateTime"), Some("dateTime")) => {
            if let (Some(a), Some(b)) = (parse_date_time(left.value()), parse_date_time(right.value())) {
                return Ok(match compare_date_times(a, b) {
                    Some(ordering) => apply(op, ordering),
                    None => false,
                });
            }
        }
        _ => {}
    }

    let equal = left == right;
    let is_typed = |lit: &Literal| !lit.is_simple() && !lit.is_language_tagged();
    if !equal && is_typed(left) && is_typed(right) {
        return Err(ConditionEvaluationError::Incomparable(format!(
            "unable to compare literals with unsupported types: {} and {}",
            left, right
        )));
    }

    match op {
        CompareOp::Eq => Ok(equal),
        CompareOp::Ne => Ok(!equal),
        _ => Err(ConditionEvaluationError::Incomparable(format!(
            "only literals with compatible, ordered datatypes support {}: {} and {}",
            op.symbol(),
            left,
            right
        ))),
    }
}

/// Effective boolean value of a term
pub fn effective_boolean_value(term: &RdfTerm) -> ConditionResult<bool> {
    let lit = match term {
        RdfTerm::Literal(lit) => lit,
        other => {
            return Err(ConditionEvaluationError::TypeError(format!(
                "no effective boolean value for {}",
                other
            )))
        }
    };

    if lit.is_simple() || lit.is_language_tagged() {
        return Ok(!lit.value().is_empty());
    }
    if xsd_local(lit) == Some("boolean") {
        return parse_boolean(lit.value()).ok_or_else(|| {
            ConditionEvaluationError::TypeError(format!("invalid boolean literal {}", lit))
        });
    }
    if numeric_type(lit).is_some() {
        return match parse_numeric(lit) {
            Some(Numeric::Integer(v)) => Ok(v != 0),
            Some(Numeric::Decimal(v)) => Ok(!v.is_zero()),
            Some(Numeric::Float(v)) => Ok(!(v == 0.0 || v.is_nan())),
            Some(Numeric::Double(v)) => Ok(!(v == 0.0 || v.is_nan())),
            None => Err(ConditionEvaluationError::TypeError(format!(
                "invalid numeric literal {}",
                lit
            ))),
        };
    }
    Err(ConditionEvaluationError::TypeError(format!(
        "no effective boolean value for {}",
        lit
    )))
}

/// Numeric arithmetic on two literal terms
pub(crate) fn evaluate_math(
    left: &RdfTerm,
    right: &RdfTerm,
    op: MathOp,
    factory: &TermFactory,
) -> ConditionResult<RdfTerm> {
    let operand = |term: &RdfTerm| {
        term.as_literal().and_then(parse_numeric).ok_or_else(|| {
            ConditionEvaluationError::TypeError(format!("not a numeric literal: {}", term))
        })
    };
    let (mut a, mut b) = (operand(left)?, operand(right)?);

    // Integer division is carried out on decimals
    if op == MathOp::Divide && a.kind() == NumericType::Integer && b.kind() == NumericType::Integer {
        a = a.promote(NumericType::Decimal).ok_or_else(|| overflow(op))?;
        b = b.promote(NumericType::Decimal).ok_or_else(|| overflow(op))?;
    }

    let literal = match promote_pair(a, b).ok_or_else(|| overflow(op))? {
        (Numeric::Integer(x), Numeric::Integer(y)) => {
            let result = match op {
                MathOp::Plus => x.checked_add(y),
                MathOp::Minus => x.checked_sub(y),
                MathOp::Multiply => x.checked_mul(y),
                MathOp::Divide => None,
            };
            factory.create_integer(result.ok_or_else(|| overflow(op))?)
        }
        (Numeric::Decimal(x), Numeric::Decimal(y)) => {
            let result = match op {
                MathOp::Plus => x.checked_add(y),
                MathOp::Minus => x.checked_sub(y),
                MathOp::Multiply => x.checked_mul(y),
                MathOp::Divide => x.checked_div(y),
            };
            factory.create_decimal(result.ok_or_else(|| overflow(op))?)
        }
        (Numeric::Float(x), Numeric::Float(y)) => factory.create_float(match op {
            MathOp::Plus => x + y,
            MathOp::Minus => x - y,
            MathOp::Multiply => x * y,
            MathOp::Divide => x / y,
        }),
        (Numeric::Double(x), Numeric::Double(y)) => factory.create_double(match op {
            MathOp::Plus => x + y,
            MathOp::Minus => x - y,
            MathOp::Multiply => x * y,
            MathOp::Divide => x / y,
        }),
        _ => return Err(overflow(op)),
    };
    Ok(literal.into())
}

fn overflow(op: MathOp) -> ConditionEvaluationError {
    ConditionEvaluationError::TypeError(format!(
        "numeric operation '{}' overflowed or divided by zero",
        op.symbol()
    ))
}

/// Match `value` against a pattern where `*` stands for any character run
pub fn like_matches(value: &str, pattern: &str, case_sensitive: bool) -> bool {
    if !case_sensitive {
        return like_matches(&value.to_lowercase(), &pattern.to_lowercase(), true);
    }

    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or("");
    let mut rest: Vec<&str> = parts.collect();
    let Some(last) = rest.pop() else {
        // No wildcard at all
        return value == pattern;
    };

    if !value.starts_with(first) {
        return false;
    }
    let mut pos = first.len();
    for part in rest {
        match value[pos..].find(part) {
            Some(idx) => pos += idx + part.len(),
            None => return false,
        }
    }
    value.len() - pos >= last.len() && value.ends_with(last)
}
