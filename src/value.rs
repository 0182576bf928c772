//! Typed compile-time values produced by constant evaluation
//!
//! Values keep the declared Java width (`Int` vs `Long`, `Float` vs `Double`,
//! and the narrow integral types) because binary numeric promotion depends on
//! the operand widths, not just the numeric magnitude.

use serde::{Deserialize, Serialize};
use std::fmt;

/// When a sized array construction resolves to a constant length, this is the
/// largest array we will materialize; for larger arrays an
/// [`ArrayValue::Reference`] is produced instead.
pub const LARGEST_LITERAL_ARRAY: usize = 12;

/// A compile-time constant value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Long(i64),
    Short(i16),
    Byte(i8),
    /// A UTF-16 code unit, like Java's `char`
    Char(u16),
    Float(f32),
    Double(f64),
    String(String),
    Array(ArrayValue),
    /// The `null` literal. This is a determined value, not "unknown" -
    /// "unknown" is the absence of a value at every evaluation boundary.
    Null,
}

/// Element type of a constant array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementKind {
    Bool,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
    String,
    /// Any reference type; also the kind inferred for heterogeneous
    /// initializer lists
    Object,
}

impl ElementKind {
    /// The default element value used when a slot of a materialized array is
    /// not (or cannot be) filled: the Java default for the element type.
    pub fn default_value(&self) -> Value {
        match self {
            ElementKind::Bool => Value::Bool(false),
            ElementKind::Byte => Value::Byte(0),
            ElementKind::Short => Value::Short(0),
            ElementKind::Char => Value::Char(0),
            ElementKind::Int => Value::Int(0),
            ElementKind::Long => Value::Long(0),
            ElementKind::Float => Value::Float(0.0),
            ElementKind::Double => Value::Double(0.0),
            ElementKind::String | ElementKind::Object => Value::Null,
        }
    }

    /// Whether `value` is admissible as an element of this kind
    pub fn admits(&self, value: &Value) -> bool {
        match (self, value) {
            (ElementKind::Bool, Value::Bool(_)) => true,
            (ElementKind::Byte, Value::Byte(_)) => true,
            (ElementKind::Short, Value::Short(_)) => true,
            (ElementKind::Char, Value::Char(_)) => true,
            (ElementKind::Int, Value::Int(_)) => true,
            (ElementKind::Long, Value::Long(_)) => true,
            (ElementKind::Float, Value::Float(_)) => true,
            (ElementKind::Double, Value::Double(_)) => true,
            (ElementKind::String, Value::String(_)) => true,
            (ElementKind::String, Value::Null) => true,
            (ElementKind::Object, _) => true,
            _ => false,
        }
    }

    /// The kind a concrete value would infer for an untyped initializer list
    pub fn of(value: &Value) -> ElementKind {
        match value {
            Value::Bool(_) => ElementKind::Bool,
            Value::Byte(_) => ElementKind::Byte,
            Value::Short(_) => ElementKind::Short,
            Value::Char(_) => ElementKind::Char,
            Value::Int(_) => ElementKind::Int,
            Value::Long(_) => ElementKind::Long,
            Value::Float(_) => ElementKind::Float,
            Value::Double(_) => ElementKind::Double,
            Value::String(_) => ElementKind::String,
            Value::Array(_) | Value::Null => ElementKind::Object,
        }
    }
}

/// A constant array: either concretely materialized, or a size-only
/// reference when the construction was too large to materialize eagerly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArrayValue {
    /// A concrete, homogeneous element sequence (single-dimension only)
    Materialized {
        kind: ElementKind,
        elements: Vec<Value>,
    },
    /// Kind, length and dimension count of an array whose element data was
    /// never computed
    Reference {
        kind: ElementKind,
        length: usize,
        dimensions: usize,
    },
}

impl ArrayValue {
    /// The array length; known for references too
    pub fn len(&self) -> usize {
        match self {
            ArrayValue::Materialized { elements, .. } => elements.len(),
            ArrayValue::Reference { length, .. } => *length,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The element kind
    pub fn kind(&self) -> ElementKind {
        match self {
            ArrayValue::Materialized { kind, .. } => *kind,
            ArrayValue::Reference { kind, .. } => *kind,
        }
    }
}

impl Value {
    /// Check if the value is the null literal
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether the value participates in binary numeric promotion.
    ///
    /// Booleans and chars do not: like the source language's boxed
    /// `Character`, a char only folds under the unary operators.
    pub fn is_number(&self) -> bool {
        matches!(
            self,
            Value::Int(_)
                | Value::Long(_)
                | Value::Short(_)
                | Value::Byte(_)
                | Value::Float(_)
                | Value::Double(_)
        )
    }

    /// Whether the value is a float or double
    pub fn is_floating(&self) -> bool {
        matches!(self, Value::Float(_) | Value::Double(_))
    }

    /// The value widened to `long`, truncating floats (Java `longValue()`)
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v as i64),
            Value::Long(v) => Some(*v),
            Value::Short(v) => Some(*v as i64),
            Value::Byte(v) => Some(*v as i64),
            Value::Float(v) => Some(*v as i64),
            Value::Double(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// The value converted to `int` (Java `intValue()`)
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Long(v) => Some(*v as i32),
            Value::Short(v) => Some(*v as i32),
            Value::Byte(v) => Some(*v as i32),
            Value::Float(v) => Some(*v as i32),
            Value::Double(v) => Some(*v as i32),
            _ => None,
        }
    }

    /// The value converted to `float` (Java `floatValue()`)
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Int(v) => Some(*v as f32),
            Value::Long(v) => Some(*v as f32),
            Value::Short(v) => Some(*v as f32),
            Value::Byte(v) => Some(*v as f32),
            Value::Float(v) => Some(*v),
            Value::Double(v) => Some(*v as f32),
            _ => None,
        }
    }

    /// The value converted to `double` (Java `doubleValue()`)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Long(v) => Some(*v as f64),
            Value::Short(v) => Some(*v as f64),
            Value::Byte(v) => Some(*v as f64),
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// The string value, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The array size, if this value is an array (materialized or reference)
    pub fn array_size(&self) -> Option<usize> {
        match self {
            Value::Array(array) => Some(array.len()),
            _ => None,
        }
    }
}

/// Render a float the way Java's `String.valueOf` does: `1.0` keeps its
/// decimal point, non-finite values use the Java spellings, and magnitudes
/// outside `1e-3..1e7` switch to `d.dddEn` scientific notation.
macro_rules! fmt_floating {
    ($f:expr, $v:expr) => {
        if $v.is_nan() {
            write!($f, "NaN")
        } else if $v.is_infinite() {
            write!($f, "{}Infinity", if $v < 0.0 { "-" } else { "" })
        } else {
            write!($f, "{}", java_floating(format!("{:e}", $v)))
        }
    };
}

/// Reshape Rust's `{:e}` rendering (`1.2345e2`) into Java's `toString`
/// form: plain decimal while the decimal exponent stays in `-3..7`,
/// `d.dddEn` with an uppercase `E` otherwise.
fn java_floating(exp_repr: String) -> String {
    let (sign, rest) = match exp_repr.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", exp_repr.as_str()),
    };
    let Some((mantissa, exp)) = rest.split_once('e') else {
        return exp_repr;
    };
    let exp: i32 = exp.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let body = if (-3..7).contains(&exp) {
        if exp >= 0 {
            let int_len = (exp + 1) as usize;
            if digits.len() <= int_len {
                format!("{digits}{}.0", "0".repeat(int_len - digits.len()))
            } else {
                format!("{}.{}", &digits[..int_len], &digits[int_len..])
            }
        } else {
            format!("0.{}{digits}", "0".repeat((-exp - 1) as usize))
        }
    } else {
        let (first, frac) = digits.split_at(1);
        let frac = if frac.is_empty() { "0" } else { frac };
        format!("{first}.{frac}E{exp}")
    };
    format!("{sign}{body}")
}

impl fmt::Display for Value {
    /// Java-style rendering, used for string concatenation folding
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::Short(v) => write!(f, "{v}"),
            Value::Byte(v) => write!(f, "{v}"),
            Value::Char(c) => {
                let c = char::from_u32(*c as u32).unwrap_or(char::REPLACEMENT_CHARACTER);
                write!(f, "{c}")
            }
            Value::Float(v) => fmt_floating!(f, *v),
            Value::Double(v) => fmt_floating!(f, *v),
            Value::String(s) => write!(f, "{s}"),
            Value::Null => write!(f, "null"),
            Value::Array(array) => {
                let kind = array.kind();
                match array {
                    ArrayValue::Materialized { elements, .. } => {
                        write!(f, "{kind:?}[{}]", elements.len())
                    }
                    ArrayValue::Reference {
                        length, dimensions, ..
                    } => {
                        write!(f, "{kind:?}")?;
                        for _ in 1..*dimensions {
                            write!(f, "[]")?;
                        }
                        write!(f, "[{length}]")
                    }
                }
            }
        }
    }
}
