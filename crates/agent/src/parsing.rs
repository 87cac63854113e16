use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use woundrx_core::domain::recommendation::{AiInsight, ProductInsight};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("AI response was empty")]
    Empty,
    #[error("AI response contained no recognizable recommendation list")]
    NoRecommendations,
    #[error("AI recommendation entry could not be decoded: {0}")]
    Entry(String),
}

/// Wire shape of one AI entry. Both the endpoint's `ai_`-prefixed names and the
/// plain names are accepted.
#[derive(Debug, Deserialize)]
struct WireInsight {
    q_code: String,
    #[serde(default, alias = "ai_reasoning")]
    reasoning: Option<String>,
    #[serde(default, alias = "ai_confidence_adjustment")]
    confidence_adjustment: Option<f64>,
    #[serde(default, alias = "ai_size_recommendation", alias = "size_recommendation")]
    size_recommendation_cm2: Option<f64>,
    #[serde(default, alias = "ai_insights")]
    insights: Vec<String>,
    #[serde(default)]
    risk_factors: Vec<String>,
    #[serde(default)]
    alternative_products: Vec<String>,
}

impl From<WireInsight> for ProductInsight {
    fn from(wire: WireInsight) -> Self {
        Self {
            q_code: wire.q_code.trim().to_ascii_uppercase(),
            insight: AiInsight {
                reasoning: wire.reasoning.filter(|text| !text.trim().is_empty()),
                confidence_adjustment: wire.confidence_adjustment.unwrap_or(0.0),
                size_recommendation_cm2: wire.size_recommendation_cm2,
                insights: wire.insights,
                risk_factors: wire.risk_factors,
                alternative_products: wire.alternative_products,
            },
        }
    }
}

/// Extracts product insights from an AI reply body.
///
/// Accepted shapes, tried in order:
/// 1. `{ "success": .., "recommendations": [..] }` envelope
/// 2. a bare JSON array
/// 3. a single JSON object with a `q_code`
/// 4. a JSON array inside a fenced code block
/// 5. the first `[` to the last `]` of free text
pub fn parse_insights(body: &str) -> Result<Vec<ProductInsight>, ParseError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if let Some(entries) = recommendation_entries(value) {
            return decode_entries(entries);
        }
    }

    if let Some(block) = fenced_block(trimmed) {
        if let Ok(Value::Array(entries)) = serde_json::from_str::<Value>(block) {
            return decode_entries(entries);
        }
    }

    if let Some(span) = bracket_span(trimmed) {
        if let Ok(Value::Array(entries)) = serde_json::from_str::<Value>(span) {
            return decode_entries(entries);
        }
    }

    Err(ParseError::NoRecommendations)
}

fn recommendation_entries(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(entries) => Some(entries),
        Value::Object(mut map) => match map.remove("recommendations") {
            Some(Value::Array(entries)) => Some(entries),
            Some(_) => None,
            None if map.contains_key("q_code") => Some(vec![Value::Object(map)]),
            None => None,
        },
        _ => None,
    }
}

fn decode_entries(entries: Vec<Value>) -> Result<Vec<ProductInsight>, ParseError> {
    entries
        .into_iter()
        .map(|entry| {
            serde_json::from_value::<WireInsight>(entry)
                .map(ProductInsight::from)
                .map_err(|error| ParseError::Entry(error.to_string()))
        })
        .collect()
}

fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    let body_start = after_fence.find('\n').map(|index| index + 1).unwrap_or(0);
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

fn bracket_span(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::{parse_insights, ParseError};

    #[test]
    fn envelope_with_prefixed_fields_is_decoded() {
        let body = r#"{
            "success": true,
            "recommendations": [
                {
                    "q_code": "q4158",
                    "rank": 1,
                    "ai_reasoning": "Good granulation expected",
                    "ai_confidence_adjustment": 0.1,
                    "ai_size_recommendation": 6.25,
                    "ai_insights": ["Offload the foot"],
                    "risk_factors": ["HbA1c above 9"],
                    "alternative_products": ["Q4145"]
                }
            ]
        }"#;

        let insights = parse_insights(body).expect("envelope parses");

        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].q_code, "Q4158");
        assert_eq!(insights[0].insight.confidence_adjustment, 0.1);
        assert_eq!(insights[0].insight.size_recommendation_cm2, Some(6.25));
        assert_eq!(insights[0].insight.insights, vec!["Offload the foot".to_string()]);
    }

    #[test]
    fn bare_array_and_single_object_are_accepted() {
        let array = parse_insights(r#"[{"q_code":"Q4145","confidence_adjustment":-0.05}]"#)
            .expect("array parses");
        assert_eq!(array[0].insight.confidence_adjustment, -0.05);

        let single = parse_insights(r#"{"q_code":"Q4161","reasoning":"ok"}"#).expect("object parses");
        assert_eq!(single[0].insight.reasoning.as_deref(), Some("ok"));
    }

    #[test]
    fn fenced_block_inside_prose_is_extracted() {
        let body = "Here is my analysis:\n```json\n[{\"q_code\":\"Q4158\",\"ai_confidence_adjustment\":0.2}]\n```\nThanks.";

        let insights = parse_insights(body).expect("fenced block parses");

        assert_eq!(insights[0].insight.confidence_adjustment, 0.2);
    }

    #[test]
    fn bracket_span_in_free_text_is_extracted() {
        let body = "Recommendations follow [{\"q_code\":\"Q4193\"}] end of reply";

        let insights = parse_insights(body).expect("span parses");

        assert_eq!(insights[0].q_code, "Q4193");
        assert_eq!(insights[0].insight.confidence_adjustment, 0.0);
    }

    #[test]
    fn unusable_bodies_are_rejected() {
        assert_eq!(parse_insights("   "), Err(ParseError::Empty));
        assert_eq!(parse_insights("no json here"), Err(ParseError::NoRecommendations));
        assert!(matches!(parse_insights(r#"[{"rank": 1}]"#), Err(ParseError::Entry(_))));
    }
}
