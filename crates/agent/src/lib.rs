//! AI enhancement client for wound care recommendations
//!
//! This crate provides the optional "second opinion" on top of the rule engine:
//! - Sends the rule-based recommendation list to an external AI endpoint
//! - Parses the endpoint's reply leniently (envelopes, bare arrays, fenced blocks)
//! - Applies guardrails before insights reach the core merge step
//!
//! # Safety Principle
//!
//! The AI is strictly advisory. It NEVER adds products, sets prices or overrides
//! contraindications. It may nudge confidence within a bounded range and annotate
//! records the rule engine already produced.

pub mod enhancer;
pub mod guardrails;
pub mod parsing;

pub use enhancer::HttpRecommendationEnhancer;
pub use guardrails::InsightGuardrails;
pub use parsing::{parse_insights, ParseError};
