//! HTTP adapter for the external risk-scoring oracle.

use std::future::Future;
use std::pin::Pin;
use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;
use tracing::{info_span, Instrument};

use crate::models::action::ActionRequest;
use crate::models::assessment::RiskAssessment;
use crate::{AppError, GlobalConfig};

use super::{EvaluatorError, RiskEvaluator};

/// Score assigned when the oracle flags an action as high risk in prose
/// without an explicit numeric score.
const ESCALATION_SCORE: u8 = 85;

/// Risk evaluator backed by an HTTP inference endpoint.
///
/// The oracle may answer with structured JSON (`{"score": .., "rationale": ..}`),
/// a completion wrapper (`{"generated_text": ..}`), or free text; free text
/// is mined for an explicit score or escalation language.
pub struct HttpRiskEvaluator {
    client: reqwest::Client,
    endpoint_url: String,
    threshold: u8,
}

impl HttpRiskEvaluator {
    /// Build an evaluator from the global configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the HTTP client cannot be constructed.
    pub fn new(config: &GlobalConfig) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.evaluator_timeout())
            .build()
            .map_err(|err| AppError::Config(format!("failed to build oracle client: {err}")))?;

        Ok(Self {
            client,
            endpoint_url: config.evaluator.endpoint_url.clone(),
            threshold: config.risk_threshold,
        })
    }

    async fn call_oracle(&self, action: &ActionRequest) -> Result<RiskAssessment, EvaluatorError> {
        let body = serde_json::json!({
            "tool_name": action.tool_name,
            "arguments": action.arguments,
            "prompt": format_prompt(action),
        });

        let response = self
            .client
            .post(&self.endpoint_url)
            .json(&body)
            .send()
            .await
            .map_err(|err| EvaluatorError::Unavailable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EvaluatorError::Unavailable(format!(
                "oracle returned status {status}"
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|err| EvaluatorError::Unavailable(err.to_string()))?;

        let (score, rationale) = parse_oracle_response(&text)?;
        Ok(RiskAssessment::from_score(score, self.threshold, rationale))
    }
}

impl RiskEvaluator for HttpRiskEvaluator {
    fn assess<'a>(
        &'a self,
        action: &'a ActionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RiskAssessment, EvaluatorError>> + Send + 'a>> {
        let span = info_span!(
            "assess_risk",
            action_id = %action.action_id,
            tool_name = %action.tool_name,
        );
        Box::pin(self.call_oracle(action).instrument(span))
    }
}

/// Format the instruction prompt carried alongside the structured request.
fn format_prompt(action: &ActionRequest) -> String {
    let input_data = serde_json::json!({
        "structured_inputs": action.arguments,
        "decision_context": {
            "timestamp": Utc::now().to_rfc3339(),
        },
    });

    format!(
        "Below is an instruction that describes a task, paired with an input \
         that provides further context. Write a response that appropriately \
         completes the request.\n\n\
         ### Instruction:\n\
         Evaluate the risk for the following action: {tool}\n\n\
         ### Input:\n\
         {input}\n\n\
         ### Response:\n",
        tool = action.tool_name,
        input = input_data,
    )
}

fn score_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Pattern is a compile-time constant.
        #[allow(clippy::unwrap_used)]
        let re = Regex::new(r"(?i)risk\s*score\s*[:=]\s*(\d{1,3})").unwrap();
        re
    })
}

/// Parse the oracle response body into `(score, rationale)`.
///
/// Accepted shapes, in order:
/// 1. JSON object with a numeric `score` and optional `rationale`.
/// 2. JSON object with a `generated_text` completion, mined as free text.
/// 3. Free text mined for escalation language or an explicit `Risk Score: N`.
fn parse_oracle_response(body: &str) -> Result<(u8, Option<String>), EvaluatorError> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(score) = value.get("score").and_then(serde_json::Value::as_u64) {
            let score = u8::try_from(score)
                .ok()
                .filter(|s| *s <= 100)
                .ok_or_else(|| {
                    EvaluatorError::InvalidResponse(format!("score out of range: {score}"))
                })?;
            let rationale = value
                .get("rationale")
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned);
            return Ok((score, rationale));
        }

        if let Some(text) = value.get("generated_text").and_then(serde_json::Value::as_str) {
            return extract_score_from_text(text);
        }
    }

    extract_score_from_text(body)
}

/// Mine free oracle text for a risk score.
///
/// Escalation language ("high risk", "escalate") takes precedence over an
/// explicit numeric score.
fn extract_score_from_text(text: &str) -> Result<(u8, Option<String>), EvaluatorError> {
    let rationale = {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_owned())
        }
    };

    let lowered = text.to_lowercase();
    if lowered.contains("high risk") || lowered.contains("escalate") {
        return Ok((ESCALATION_SCORE, rationale));
    }

    if let Some(captures) = score_regex().captures(text) {
        let raw = &captures[1];
        let score: u8 = raw.parse().map_err(|_| {
            EvaluatorError::InvalidResponse(format!("unparseable score: {raw}"))
        })?;
        if score > 100 {
            return Err(EvaluatorError::InvalidResponse(format!(
                "score out of range: {score}"
            )));
        }
        return Ok((score, rationale));
    }

    Err(EvaluatorError::InvalidResponse(
        "no score found in oracle output".into(),
    ))
}
