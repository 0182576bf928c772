//! Constant array construction
//!
//! Two shapes of construction fold: sized constructions (`new int[n]`,
//! `IntArray(n)`, `arrayOfNulls(n)`) whose elements are all defaults, and
//! initializer lists (`new int[] {..}`, `arrayOf(..)`) whose elements are
//! evaluated individually. Small arrays materialize their elements; large
//! ones fold to a size-only reference so that `array.length` still works
//! without allocating element data.

use std::collections::HashMap;

use lazy_static::lazy_static;
use tracing::trace;

use crate::value::{ArrayValue, ElementKind, Value, LARGEST_LITERAL_ARRAY};

/// Initializer lists with this many elements or more never materialize;
/// callers bail before folding any element, so the cap also bounds
/// evaluation cost
pub const MAX_INITIALIZER_ELEMENTS: usize = 40;

/// How a library function call constructs an array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayIdiom {
    /// Elements come from the argument list; `None` means the element kind
    /// is inferred from the evaluated elements (`arrayOf`)
    Initializer(Option<ElementKind>),
    /// The single argument is the length and elements are defaults
    /// (`IntArray(n)`, `arrayOfNulls(n)`)
    Sized(ElementKind),
}

lazy_static! {
    /// Call names recognized as array constructors
    pub static ref ARRAY_CONSTRUCTORS: HashMap<&'static str, ArrayIdiom> = {
        let mut table = HashMap::new();
        table.insert("arrayOf", ArrayIdiom::Initializer(None));
        table.insert("booleanArrayOf", ArrayIdiom::Initializer(Some(ElementKind::Bool)));
        table.insert("byteArrayOf", ArrayIdiom::Initializer(Some(ElementKind::Byte)));
        table.insert("shortArrayOf", ArrayIdiom::Initializer(Some(ElementKind::Short)));
        table.insert("charArrayOf", ArrayIdiom::Initializer(Some(ElementKind::Char)));
        table.insert("intArrayOf", ArrayIdiom::Initializer(Some(ElementKind::Int)));
        table.insert("longArrayOf", ArrayIdiom::Initializer(Some(ElementKind::Long)));
        table.insert("floatArrayOf", ArrayIdiom::Initializer(Some(ElementKind::Float)));
        table.insert("doubleArrayOf", ArrayIdiom::Initializer(Some(ElementKind::Double)));
        table.insert("BooleanArray", ArrayIdiom::Sized(ElementKind::Bool));
        table.insert("ByteArray", ArrayIdiom::Sized(ElementKind::Byte));
        table.insert("ShortArray", ArrayIdiom::Sized(ElementKind::Short));
        table.insert("CharArray", ArrayIdiom::Sized(ElementKind::Char));
        table.insert("IntArray", ArrayIdiom::Sized(ElementKind::Int));
        table.insert("LongArray", ArrayIdiom::Sized(ElementKind::Long));
        table.insert("FloatArray", ArrayIdiom::Sized(ElementKind::Float));
        table.insert("DoubleArray", ArrayIdiom::Sized(ElementKind::Double));
        table.insert("arrayOfNulls", ArrayIdiom::Sized(ElementKind::Object));
        table
    };
}

/// Fold a sized construction with default-valued elements.
///
/// Multi-dimensional constructions and lengths above
/// [`LARGEST_LITERAL_ARRAY`] always fold to a reference.
pub fn fresh_array(kind: ElementKind, length: usize, dimensions: usize) -> Value {
    if dimensions > 1 || length > LARGEST_LITERAL_ARRAY {
        trace!(?kind, length, dimensions, "array too large, folding to reference");
        return Value::Array(ArrayValue::Reference {
            kind,
            length,
            dimensions,
        });
    }
    Value::Array(ArrayValue::Materialized {
        kind,
        elements: vec![kind.default_value(); length],
    })
}

/// Fold an initializer list from its already-evaluated elements.
///
/// `None` slots are elements that did not fold. In strict mode any such
/// slot makes the whole construction unevaluable; with `allow_unknown` they
/// fall back to the element default. Elements that folded to the wrong kind
/// also fall back to the default rather than poisoning the array.
pub fn array_from_initializer(
    kind: ElementKind,
    evaluated: Vec<Option<Value>>,
    allow_unknown: bool,
) -> Option<Value> {
    if evaluated.len() >= MAX_INITIALIZER_ELEMENTS {
        return Some(Value::Array(ArrayValue::Reference {
            kind,
            length: evaluated.len(),
            dimensions: 1,
        }));
    }

    let mut elements = Vec::with_capacity(evaluated.len());
    for slot in evaluated {
        match slot {
            Some(value) if kind.admits(&value) => elements.push(value),
            Some(_) => elements.push(kind.default_value()),
            None if allow_unknown => elements.push(kind.default_value()),
            None => return None,
        }
    }
    Some(Value::Array(ArrayValue::Materialized { kind, elements }))
}

/// Infer the element kind of an untyped initializer list (`arrayOf`):
/// the common kind of the folded elements, or `Object` when they disagree
/// or nothing folded
pub fn infer_kind(evaluated: &[Option<Value>]) -> ElementKind {
    let mut kinds = evaluated
        .iter()
        .flatten()
        .map(ElementKind::of);
    match kinds.next() {
        Some(first) if kinds.all(|k| k == first) => first,
        _ => ElementKind::Object,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_small_sized_construction_materializes_defaults() {
        assert_eq!(
            fresh_array(ElementKind::Int, 3, 1),
            Value::Array(ArrayValue::Materialized {
                kind: ElementKind::Int,
                elements: vec![Value::Int(0); 3],
            })
        );
    }

    #[test]
    fn test_large_sized_construction_folds_to_reference() {
        assert_eq!(
            fresh_array(ElementKind::Byte, 1024, 1),
            Value::Array(ArrayValue::Reference {
                kind: ElementKind::Byte,
                length: 1024,
                dimensions: 1,
            })
        );
        // boundary: exactly the ceiling still materializes
        assert!(matches!(
            fresh_array(ElementKind::Byte, LARGEST_LITERAL_ARRAY, 1),
            Value::Array(ArrayValue::Materialized { .. })
        ));
    }

    #[test]
    fn test_multi_dimensional_always_references() {
        assert_eq!(
            fresh_array(ElementKind::Int, 2, 2),
            Value::Array(ArrayValue::Reference {
                kind: ElementKind::Int,
                length: 2,
                dimensions: 2,
            })
        );
    }

    #[test]
    fn test_initializer_list_materializes_past_the_sized_ceiling() {
        // initializer lists materialize up to 39 elements, not 12
        let evaluated = (0..20).map(|i| Some(Value::Int(i))).collect::<Vec<_>>();
        match array_from_initializer(ElementKind::Int, evaluated, false) {
            Some(Value::Array(ArrayValue::Materialized { elements, .. })) => {
                assert_eq!(elements.len(), 20);
                assert_eq!(elements[7], Value::Int(7));
            }
            other => panic!("expected materialized array, got {other:?}"),
        }

        let below_cap = (0..39).map(|i| Some(Value::Int(i))).collect::<Vec<_>>();
        assert!(matches!(
            array_from_initializer(ElementKind::Int, below_cap, false),
            Some(Value::Array(ArrayValue::Materialized { .. }))
        ));

        // the cap itself already refuses to materialize
        let at_cap = (0..40).map(|i| Some(Value::Int(i))).collect::<Vec<_>>();
        assert_eq!(
            array_from_initializer(ElementKind::Int, at_cap, false),
            Some(Value::Array(ArrayValue::Reference {
                kind: ElementKind::Int,
                length: 40,
                dimensions: 1,
            }))
        );
    }

    #[test]
    fn test_unknown_element_strict_vs_relaxed() {
        let evaluated = vec![Some(Value::Int(1)), None, Some(Value::Int(3))];
        assert_eq!(
            array_from_initializer(ElementKind::Int, evaluated.clone(), false),
            None
        );
        assert_eq!(
            array_from_initializer(ElementKind::Int, evaluated, true),
            Some(Value::Array(ArrayValue::Materialized {
                kind: ElementKind::Int,
                elements: vec![Value::Int(1), Value::Int(0), Value::Int(3)],
            }))
        );
    }

    #[test]
    fn test_wrong_kind_element_falls_back_to_default() {
        let evaluated = vec![Some(Value::Int(1)), Some(Value::String("x".into()))];
        assert_eq!(
            array_from_initializer(ElementKind::Int, evaluated, false),
            Some(Value::Array(ArrayValue::Materialized {
                kind: ElementKind::Int,
                elements: vec![Value::Int(1), Value::Int(0)],
            }))
        );
    }

    #[test]
    fn test_kind_inference() {
        assert_eq!(
            infer_kind(&[Some(Value::Int(1)), Some(Value::Int(2))]),
            ElementKind::Int
        );
        assert_eq!(
            infer_kind(&[Some(Value::Int(1)), Some(Value::String("s".into()))]),
            ElementKind::Object
        );
        assert_eq!(infer_kind(&[]), ElementKind::Object);
        assert_eq!(infer_kind(&[None]), ElementKind::Object);
    }

    #[test]
    fn test_constructor_table() {
        assert_eq!(
            ARRAY_CONSTRUCTORS.get("intArrayOf"),
            Some(&ArrayIdiom::Initializer(Some(ElementKind::Int)))
        );
        assert_eq!(
            ARRAY_CONSTRUCTORS.get("IntArray"),
            Some(&ArrayIdiom::Sized(ElementKind::Int))
        );
        assert_eq!(
            ARRAY_CONSTRUCTORS.get("arrayOfNulls"),
            Some(&ArrayIdiom::Sized(ElementKind::Object))
        );
        assert_eq!(ARRAY_CONSTRUCTORS.get("listOf"), None);
    }
}
