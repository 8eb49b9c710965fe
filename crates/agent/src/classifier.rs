//! Triage classifier: one structured model call per message.

use mailgate_core::error::ProviderError;
use mailgate_core::inbound::{Disposition, InboundMessage};
use mailgate_core::message::Message;
use mailgate_core::provider::{Provider, ProviderRequest, ResponseFormat};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::AgentError;
use crate::prompts;

/// The classifier's verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub disposition: Disposition,
    pub reasoning: String,
}

#[derive(Debug, Deserialize)]
struct RouterOutput {
    #[serde(default)]
    reasoning: String,
    classification: String,
}

pub struct Classifier {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl Classifier {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Classify `message` against the current triage rules.
    ///
    /// Output outside the three dispositions is a classifier error; the call
    /// is never retried here.
    pub async fn classify(
        &self,
        message: &InboundMessage,
        triage_rules: &str,
        background: &str,
    ) -> Result<Classification, AgentError> {
        let mut request = ProviderRequest::new(
            self.model.clone(),
            vec![
                Message::system(prompts::triage_system_prompt(background, triage_rules)),
                Message::user(prompts::triage_user_prompt(message)),
            ],
        );
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;
        request.response_format = Some(router_format());

        debug!(subject = %message.subject, "Classifying message");
        let response = self.provider.complete(request).await?;
        let output: RouterOutput = response.parse_content().map_err(|e| match e {
            ProviderError::InvalidOutput(detail) => AgentError::Classifier(detail),
            other => AgentError::Provider(other),
        })?;

        let disposition = output
            .classification
            .parse::<Disposition>()
            .map_err(AgentError::Classifier)?;

        info!(
            subject = %message.subject,
            disposition = %disposition,
            reasoning = %output.reasoning,
            "Message classified"
        );
        Ok(Classification {
            disposition,
            reasoning: output.reasoning,
        })
    }
}

fn router_format() -> ResponseFormat {
    ResponseFormat {
        name: "router".into(),
        schema: serde_json::json!({
            "type": "object",
            "properties": {
                "reasoning": {
                    "type": "string",
                    "description": "Step-by-step reasoning behind the classification."
                },
                "classification": {
                    "type": "string",
                    "enum": ["ignore", "respond", "notify"],
                    "description": "ignore for irrelevant emails, notify for important information that doesn't need a response, respond for emails that need a reply"
                }
            },
            "required": ["reasoning", "classification"],
            "additionalProperties": false
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    fn message() -> InboundMessage {
        InboundMessage::new("news@shop.example", "me@example.com", "50% off", "Big sale this weekend")
    }

    #[tokio::test]
    async fn parses_structured_verdict() {
        let provider = Arc::new(SequentialMockProvider::new(vec![router_response(
            "ignore",
            "Promotional newsletter",
        )]));
        let classifier = Classifier::new(provider.clone(), "mock-model");

        let verdict = classifier.classify(&message(), "Ignore marketing", "bg").await.unwrap();
        assert_eq!(verdict.disposition, Disposition::Ignore);
        assert_eq!(verdict.reasoning, "Promotional newsletter");

        let request = provider.request(0);
        assert_eq!(request.response_format.unwrap().name, "router");
        assert!(request.messages[0].content.contains("Ignore marketing"));
        assert!(request.messages[1].content.contains("Subject: 50% off"));
    }

    #[tokio::test]
    async fn out_of_vocabulary_disposition_is_classifier_error() {
        let provider = Arc::new(SequentialMockProvider::new(vec![router_response("archive", "")]));
        let err = Classifier::new(provider, "m")
            .classify(&message(), "", "")
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Classifier(_)));
    }

    #[tokio::test]
    async fn unstructured_reply_is_classifier_error() {
        let provider = Arc::new(SequentialMockProvider::single_text("I think you should ignore it"));
        let err = Classifier::new(provider, "m")
            .classify(&message(), "", "")
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Classifier(_)));
    }

    #[tokio::test]
    async fn transport_failure_stays_a_provider_error() {
        let provider = Arc::new(SequentialMockProvider::failing(ProviderError::Timeout("30s".into())));
        let err = Classifier::new(provider, "m")
            .classify(&message(), "", "")
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Provider(ProviderError::Timeout(_))));
    }
}
