use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, info};

use woundrx_core::config::AiConfig;
use woundrx_core::domain::context::RecommendationContext;
use woundrx_core::domain::recommendation::{ProductInsight, RecommendationRecord};
use woundrx_core::recommend::{EnhancementError, RecommendationEnhancer};

use crate::guardrails::InsightGuardrails;
use crate::parsing::parse_insights;

const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Serialize)]
struct EnhancementRequest<'a> {
    context: &'a RecommendationContext,
    rule_based_recommendations: &'a [RecommendationRecord],
}

/// Posts rule-based recommendations to an external AI endpoint and returns its
/// guarded insights.
pub struct HttpRecommendationEnhancer {
    client: Client,
    endpoint: String,
    api_key: Option<SecretString>,
    timeout: Duration,
    guardrails: InsightGuardrails,
}

impl HttpRecommendationEnhancer {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, EnhancementError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| EnhancementError::Transport(error.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            timeout,
            guardrails: InsightGuardrails::default(),
        })
    }

    /// `None` when AI enhancement is disabled or no endpoint is configured.
    pub fn from_config(config: &AiConfig) -> Result<Option<Self>, EnhancementError> {
        if !config.enabled {
            return Ok(None);
        }
        let Some(endpoint) = config.endpoint.as_deref().filter(|value| !value.trim().is_empty())
        else {
            return Ok(None);
        };
        Self::new(endpoint.trim(), config.api_key.clone(), config.timeout()).map(Some)
    }

    pub fn with_guardrails(mut self, guardrails: InsightGuardrails) -> Self {
        self.guardrails = guardrails;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RecommendationEnhancer for HttpRecommendationEnhancer {
    async fn enhance(
        &self,
        context: &RecommendationContext,
        records: &[RecommendationRecord],
    ) -> Result<Vec<ProductInsight>, EnhancementError> {
        let correlation_id = context.correlation_id();
        debug!(
            event_name = "enhancement.request.sent",
            correlation_id = %correlation_id,
            endpoint = %self.endpoint,
            records = records.len(),
            "requesting AI enhancement"
        );

        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&EnhancementRequest { context, rule_based_recommendations: records });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request.send().await.map_err(|error| self.transport_error(error))?;
        let status = response.status();
        let body = response.text().await.map_err(|error| self.transport_error(error))?;

        if !status.is_success() {
            return Err(EnhancementError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let parsed =
            parse_insights(&body).map_err(|error| EnhancementError::Decode(error.to_string()))?;
        let received = parsed.len();
        let insights = self.guardrails.apply(parsed);

        info!(
            event_name = "enhancement.response.accepted",
            correlation_id = %correlation_id,
            received,
            accepted = insights.len(),
            "AI enhancement response parsed"
        );
        Ok(insights)
    }
}

impl HttpRecommendationEnhancer {
    fn transport_error(&self, error: reqwest::Error) -> EnhancementError {
        if error.is_timeout() {
            EnhancementError::Timeout(self.timeout)
        } else {
            EnhancementError::Transport(error.to_string())
        }
    }
}
