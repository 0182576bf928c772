//! Property tests for operator folding: the folded results must agree with
//! JVM arithmetic on the whole operand domain, not just picked examples.

use jfold::{AstBuilder, BinaryOperator, SourceModel, UnaryOperator, Value};
use proptest::prelude::*;

fn fold(op: BinaryOperator, left: Value, right: Value) -> Option<Value> {
    let model = SourceModel::new();
    let mut b = AstBuilder::new();
    let l = b.literal(left);
    let r = b.literal(right);
    let expr = b.binary(op, l, r);
    jfold::evaluate(&model, &expr)
}

fn numeric_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i32>().prop_map(Value::Int),
        any::<i64>().prop_map(Value::Long),
        any::<i16>().prop_map(Value::Short),
        any::<i8>().prop_map(Value::Byte),
        any::<f32>().prop_map(Value::Float),
        any::<f64>().prop_map(Value::Double),
    ]
}

proptest! {
    #[test]
    fn int_addition_wraps_like_the_jvm(a in any::<i32>(), b in any::<i32>()) {
        prop_assert_eq!(
            fold(BinaryOperator::Add, Value::Int(a), Value::Int(b)),
            Some(Value::Int(a.wrapping_add(b)))
        );
    }

    #[test]
    fn int_multiplication_wraps_like_the_jvm(a in any::<i32>(), b in any::<i32>()) {
        prop_assert_eq!(
            fold(BinaryOperator::Multiply, Value::Int(a), Value::Int(b)),
            Some(Value::Int(a.wrapping_mul(b)))
        );
    }

    #[test]
    fn division_folds_exactly_when_divisor_is_nonzero(a in any::<i32>(), b in any::<i32>()) {
        let result = fold(BinaryOperator::Divide, Value::Int(a), Value::Int(b));
        if b == 0 {
            prop_assert_eq!(result, None);
        } else {
            prop_assert_eq!(result, Some(Value::Int(a.wrapping_div(b))));
        }
    }

    #[test]
    fn unsigned_shift_stays_in_the_unsigned_domain(v in any::<i32>(), s in any::<i32>()) {
        let expected = ((v as u32) >> (s as u32 % 32)) as i32;
        prop_assert_eq!(
            fold(BinaryOperator::UnsignedShiftRight, Value::Int(v), Value::Int(s)),
            Some(Value::Int(expected))
        );
    }

    #[test]
    fn promotion_picks_the_widest_operand(a in numeric_value(), b in numeric_value()) {
        // use addition so every numeric pairing folds
        let result = fold(BinaryOperator::Add, a.clone(), b.clone());
        let result = result.expect("numeric addition always folds");
        match (&a, &b) {
            (Value::Double(_), _) | (_, Value::Double(_)) => {
                prop_assert!(matches!(result, Value::Double(_)))
            }
            (Value::Float(_), _) | (_, Value::Float(_)) => {
                prop_assert!(matches!(result, Value::Float(_)))
            }
            (Value::Long(_), _) | (_, Value::Long(_)) => {
                prop_assert!(matches!(result, Value::Long(_)))
            }
            _ => prop_assert!(matches!(result, Value::Int(_))),
        }
    }

    #[test]
    fn concatenation_renders_integers_like_java(prefix in "[a-z]{0,8}", n in any::<i32>()) {
        prop_assert_eq!(
            fold(BinaryOperator::Add, Value::String(prefix.clone()), Value::Int(n)),
            Some(Value::String(format!("{prefix}{n}")))
        );
    }

    #[test]
    fn double_negation_is_identity_for_int(v in any::<i32>()) {
        let model = SourceModel::new();
        let mut b = AstBuilder::new();
        let lit = b.int(v);
        let neg = b.unary(UnaryOperator::Minus, lit);
        let double_neg = b.unary(UnaryOperator::Minus, neg);
        prop_assert_eq!(jfold::evaluate(&model, &double_neg), Some(Value::Int(v)));
    }

    #[test]
    fn folding_is_deterministic(a in numeric_value(), b in numeric_value()) {
        let model = SourceModel::new();
        let mut builder = AstBuilder::new();
        let l = builder.literal(a);
        let r = builder.literal(b);
        let expr = builder.binary(BinaryOperator::Modulo, l, r);
        let first = jfold::evaluate(&model, &expr);
        let second = jfold::evaluate(&model, &expr);
        // compare rendered forms so NaN results count as equal
        prop_assert_eq!(format!("{first:?}"), format!("{second:?}"));
    }
}
