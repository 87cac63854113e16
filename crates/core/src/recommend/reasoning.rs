use serde_json::Value;
use tera::{Context, Tera};
use thiserror::Error;

use crate::domain::context::RecommendationContext;

#[derive(Debug, Error)]
#[error("reasoning template could not be rendered: {0}")]
pub struct ReasoningError(String);

/// Values a rule's reasoning template may reference.
///
/// Templates use tera syntax, e.g. `{{ q_code }} suits {{ wound_type_label }}` or
/// `{{ facts.patient_factors.diabetic }}` for any attribute of the context.
#[derive(Clone, Debug)]
pub struct ReasoningVariables<'a> {
    pub q_code: &'a str,
    pub rule_name: &'a str,
    pub suggested_size_cm2: f64,
    pub context: &'a RecommendationContext,
    pub facts: &'a Value,
}

impl ReasoningVariables<'_> {
    fn to_tera_context(&self) -> Context {
        let mut context = Context::new();
        context.insert("q_code", self.q_code);
        context.insert("rule_name", self.rule_name);
        context.insert("suggested_size_cm2", &self.suggested_size_cm2);
        context.insert("wound_type", self.context.wound_type.code());
        context.insert("wound_type_label", self.context.wound_type.label());
        context.insert("facts", self.facts);
        context
    }
}

pub fn render_reasoning(
    template: Option<&str>,
    variables: &ReasoningVariables<'_>,
) -> Result<String, ReasoningError> {
    let Some(template) = template.filter(|template| !template.trim().is_empty()) else {
        return Ok(generic_reasoning(variables));
    };

    Tera::one_off(template, &variables.to_tera_context(), false)
        .map(|rendered| rendered.trim().to_string())
        .map_err(|error| ReasoningError(flatten_error(&error)))
}

pub fn generic_reasoning(variables: &ReasoningVariables<'_>) -> String {
    format!(
        "{} is recommended for this {} based on the \"{}\" rule.",
        variables.q_code,
        variables.context.wound_type.label(),
        variables.rule_name
    )
}

fn flatten_error(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::{render_reasoning, ReasoningVariables};
    use crate::domain::context::{RecommendationContext, WoundType};

    #[test]
    fn renders_template_with_context_values() {
        let context = RecommendationContext::new(WoundType::Dfu).with_patient_factor("diabetic", true);
        let facts = context.to_fact_document().expect("facts");
        let variables = ReasoningVariables {
            q_code: "Q4158",
            rule_name: "DFU first line",
            suggested_size_cm2: 16.0,
            context: &context,
            facts: &facts,
        };

        let rendered = render_reasoning(
            Some("{{ q_code }} for {{ wound_type }} at {{ suggested_size_cm2 }} cm2{% if facts.patient_factors.diabetic %} (diabetic){% endif %}"),
            &variables,
        )
        .expect("template renders");

        assert_eq!(rendered, "Q4158 for DFU at 16.0 cm2 (diabetic)");
    }

    #[test]
    fn missing_template_uses_generic_sentence() {
        let context = RecommendationContext::new(WoundType::Vlu);
        let facts = context.to_fact_document().expect("facts");
        let variables = ReasoningVariables {
            q_code: "Q4145",
            rule_name: "VLU compression adjunct",
            suggested_size_cm2: 4.0,
            context: &context,
            facts: &facts,
        };

        let rendered = render_reasoning(None, &variables).expect("generic");
        assert_eq!(
            rendered,
            "Q4145 is recommended for this venous leg ulcer based on the \"VLU compression adjunct\" rule."
        );
    }

    #[test]
    fn undefined_variables_are_reported() {
        let context = RecommendationContext::new(WoundType::Dfu);
        let facts = context.to_fact_document().expect("facts");
        let variables = ReasoningVariables {
            q_code: "Q4158",
            rule_name: "broken",
            suggested_size_cm2: 4.0,
            context: &context,
            facts: &facts,
        };

        assert!(render_reasoning(Some("{{ no_such_variable }}"), &variables).is_err());
    }
}
