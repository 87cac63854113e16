//! Rule predicates stored as JSON and interpreted against a context fact document.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Structured condition tree stored in the rule row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),
    Field { field: String, op: Operator, value: Value },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Neq,
    In,
    Gt,
    Lt,
    Exists,
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum PredicateError {
    #[error("operator `{op:?}` on `{field}` expects {expected}, got {found}")]
    InvalidOperand { field: String, op: Operator, expected: &'static str, found: String },
    #[error("field `{field}` holds {found}, which cannot be compared numerically")]
    NonNumericField { field: String, found: String },
}

impl Condition {
    pub fn field(field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Self::Field { field: field.into(), op, value: value.into() }
    }

    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(field, Operator::Eq, value)
    }

    pub fn not_equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(field, Operator::Neq, value)
    }

    pub fn one_of<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::field(field, Operator::In, Value::Array(values.into_iter().map(Into::into).collect()))
    }

    pub fn greater_than(field: impl Into<String>, value: f64) -> Self {
        Self::field(field, Operator::Gt, value)
    }

    pub fn less_than(field: impl Into<String>, value: f64) -> Self {
        Self::field(field, Operator::Lt, value)
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Self::field(field, Operator::Exists, true)
    }

    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    pub fn evaluate(&self, facts: &Value) -> Result<bool, PredicateError> {
        match self {
            Self::All(conditions) => {
                for condition in conditions {
                    if !condition.evaluate(facts)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::Any(conditions) => {
                for condition in conditions {
                    if condition.evaluate(facts)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Self::Not(inner) => Ok(!inner.evaluate(facts)?),
            Self::Field { field, op, value } => {
                evaluate_field(field, *op, value, lookup_path(facts, field))
            }
        }
    }
}

/// Dot-path lookup; a JSON null is treated as absent.
pub fn lookup_path<'a>(facts: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = facts;
    for segment in path.split('.').filter(|segment| !segment.is_empty()) {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

fn evaluate_field(
    field: &str,
    op: Operator,
    operand: &Value,
    actual: Option<&Value>,
) -> Result<bool, PredicateError> {
    match op {
        Operator::Exists => {
            let expected = match operand {
                Value::Null => true,
                Value::Bool(flag) => *flag,
                other => return Err(invalid_operand(field, op, "a boolean", other)),
            };
            Ok(actual.is_some() == expected)
        }
        Operator::Eq => Ok(actual.is_some_and(|actual| loosely_equal(actual, operand))),
        Operator::Neq => Ok(!actual.is_some_and(|actual| loosely_equal(actual, operand))),
        Operator::In => {
            let Value::Array(candidates) = operand else {
                return Err(invalid_operand(field, op, "an array", operand));
            };
            Ok(actual.is_some_and(|actual| {
                candidates.iter().any(|candidate| loosely_equal(actual, candidate))
            }))
        }
        Operator::Gt | Operator::Lt => {
            let Some(threshold) = operand.as_f64() else {
                return Err(invalid_operand(field, op, "a number", operand));
            };
            let Some(actual) = actual else {
                return Ok(false);
            };
            let Some(actual) = as_number(actual) else {
                return Err(PredicateError::NonNumericField {
                    field: field.to_string(),
                    found: describe(actual),
                });
            };
            Ok(if op == Operator::Gt { actual > threshold } else { actual < threshold })
        }
    }
}

fn loosely_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::String(left), Value::String(right)) => {
            left.trim().eq_ignore_ascii_case(right.trim())
        }
        (Value::Number(_), _) | (_, Value::Number(_)) => {
            match (as_number(actual), as_number(expected)) {
                (Some(left), Some(right)) => left == right,
                _ => false,
            }
        }
        _ => actual == expected,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok().filter(|number| number.is_finite()),
        _ => None,
    }
}

fn invalid_operand(
    field: &str,
    op: Operator,
    expected: &'static str,
    found: &Value,
) -> PredicateError {
    PredicateError::InvalidOperand { field: field.to_string(), op, expected, found: describe(found) }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "a boolean".to_string(),
        Value::Number(number) => format!("number {number}"),
        Value::String(text) => format!("string {text:?}"),
        Value::Array(_) => "an array".to_string(),
        Value::Object(_) => "an object".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{lookup_path, Condition, Operator, PredicateError};

    fn facts() -> serde_json::Value {
        json!({
            "wound_type": "DFU",
            "wound_characteristics": { "area_cm2": 12.5, "depth": "full_thickness", "exudate_level": null },
            "patient_factors": { "diabetic": true, "hba1c": "8.2", "allergies": ["collagen"] },
            "payer_context": { "payer_name": "Medicare" }
        })
    }

    #[test]
    fn lookup_follows_dot_paths_and_treats_null_as_missing() {
        let facts = facts();
        assert_eq!(lookup_path(&facts, "payer_context.payer_name"), Some(&json!("Medicare")));
        assert_eq!(lookup_path(&facts, "patient_factors.allergies.0"), Some(&json!("collagen")));
        assert_eq!(lookup_path(&facts, "wound_characteristics.exudate_level"), None);
        assert_eq!(lookup_path(&facts, "facility_context.place_of_service"), None);
    }

    #[test]
    fn equality_is_case_insensitive_and_numeric_aware() {
        let facts = facts();
        assert_eq!(Condition::equals("wound_type", "dfu").evaluate(&facts), Ok(true));
        assert_eq!(Condition::equals("patient_factors.hba1c", 8.2).evaluate(&facts), Ok(true));
        assert_eq!(Condition::equals("patient_factors.diabetic", true).evaluate(&facts), Ok(true));
        assert_eq!(Condition::not_equals("payer_context.payer_name", "Aetna").evaluate(&facts), Ok(true));
    }

    #[test]
    fn missing_fields_fail_equality_and_pass_inequality() {
        let facts = facts();
        assert_eq!(Condition::equals("provider_context.npi", "123").evaluate(&facts), Ok(false));
        assert_eq!(Condition::not_equals("provider_context.npi", "123").evaluate(&facts), Ok(true));
        assert_eq!(Condition::greater_than("wound_characteristics.length_cm", 1.0).evaluate(&facts), Ok(false));
    }

    #[test]
    fn membership_and_existence() {
        let facts = facts();
        assert_eq!(
            Condition::one_of("wound_characteristics.depth", ["partial_thickness", "Full_Thickness"])
                .evaluate(&facts),
            Ok(true)
        );
        assert_eq!(Condition::exists("patient_factors.diabetic").evaluate(&facts), Ok(true));
        assert_eq!(
            Condition::field("wound_characteristics.exudate_level", Operator::Exists, false)
                .evaluate(&facts),
            Ok(true)
        );
    }

    #[test]
    fn numeric_comparison_accepts_numeric_strings() {
        let facts = facts();
        assert_eq!(Condition::greater_than("wound_characteristics.area_cm2", 10.0).evaluate(&facts), Ok(true));
        assert_eq!(Condition::less_than("patient_factors.hba1c", 7.0).evaluate(&facts), Ok(false));
    }

    #[test]
    fn malformed_operands_are_reported() {
        let facts = facts();
        let not_an_array = Condition::field("wound_type", Operator::In, "DFU");
        assert!(matches!(
            not_an_array.evaluate(&facts),
            Err(PredicateError::InvalidOperand { op: Operator::In, .. })
        ));

        let non_numeric = Condition::greater_than("payer_context.payer_name", 1.0);
        assert!(matches!(non_numeric.evaluate(&facts), Err(PredicateError::NonNumericField { .. })));
    }

    #[test]
    fn combinators_short_circuit() {
        let facts = facts();
        let broken = Condition::greater_than("payer_context.payer_name", 1.0);

        let all = Condition::All(vec![Condition::equals("wound_type", "VLU"), broken.clone()]);
        assert_eq!(all.evaluate(&facts), Ok(false));

        let any = Condition::Any(vec![Condition::equals("wound_type", "DFU"), broken]);
        assert_eq!(any.evaluate(&facts), Ok(true));

        assert_eq!(Condition::All(Vec::new()).evaluate(&facts), Ok(true));
        assert_eq!(Condition::Any(Vec::new()).evaluate(&facts), Ok(false));
        assert_eq!(Condition::equals("wound_type", "DFU").negate().evaluate(&facts), Ok(false));
    }

    #[test]
    fn conditions_decode_from_stored_json() {
        let stored = json!({
            "all": [
                { "field": { "field": "wound_type", "op": "eq", "value": "DFU" } },
                { "not": { "field": { "field": "patient_factors.smoker", "op": "eq", "value": true } } }
            ]
        });
        let condition: Condition = serde_json::from_value(stored).expect("condition decodes");
        assert_eq!(condition.evaluate(&facts()), Ok(true));
    }
}
