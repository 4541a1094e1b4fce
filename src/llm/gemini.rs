use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::config::{Config, ANALYSIS_SYSTEM_PROMPT};
use crate::llm::media::ImagePayload;
use crate::llm::parser::extract_json;
use crate::llm::prompt::build_analysis_parts;
use crate::pipeline::RecommendationInput;
use crate::utils::http::get_http_client;
use crate::utils::timing::log_llm_timing;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Gemini rejected the API key: {0}")]
    AuthFailure(String),
    #[error("Gemini request timed out")]
    Timeout,
    #[error("Gemini unavailable with status {status}: {detail}")]
    Unavailable { status: StatusCode, detail: String },
    #[error("AI 回傳內容無法解析成 JSON。")]
    ParseFailure,
    #[error("{0}")]
    Other(String),
}

impl AnalysisError {
    /// Retry policy for one classified attempt failure. Auth failures are
    /// permanent for the lifetime of the process, so they short-circuit
    /// straight to the fallback analysis.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, AnalysisError::AuthFailure(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Completed,
    Fallback,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EstimatedDimensions {
    pub area_ping: String,
    #[serde(rename = "LxWxH")]
    pub lxwxh: String,
    pub analysis_basis: String,
}

/// Structured analysis as consumed by the product matcher and the result
/// renderer. Free-form sections keep the model's JSON shape as-is.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub ai_status: AnalysisStatus,
    pub estimated_dimensions: EstimatedDimensions,
    pub budget_allocation: Value,
    pub style_suggestions: Value,
    pub space_optimization: Value,
    pub product_focus: Value,
}

fn value_to_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

impl AnalysisResult {
    /// Lenient mapping from whatever object the model returned. Missing or
    /// oddly typed fields become empty rather than failing the attempt.
    pub fn from_model_value(value: &Value) -> Self {
        let dims = value.get("estimated_dimensions");
        AnalysisResult {
            ai_status: AnalysisStatus::Completed,
            estimated_dimensions: EstimatedDimensions {
                area_ping: value_to_text(dims.and_then(|d| d.get("area_ping"))),
                lxwxh: value_to_text(dims.and_then(|d| d.get("LxWxH"))),
                analysis_basis: value_to_text(dims.and_then(|d| d.get("analysis_basis"))),
            },
            budget_allocation: value
                .get("budget_allocation")
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new())),
            style_suggestions: value.get("style_suggestions").cloned().unwrap_or(Value::Null),
            space_optimization: value
                .get("space_optimization")
                .cloned()
                .unwrap_or(Value::Null),
            product_focus: value.get("product_focus").cloned().unwrap_or(Value::Null),
        }
    }
}

fn unavailable_text(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        "無法估算".to_string()
    } else {
        trimmed.to_string()
    }
}

/// The deterministic substitute returned whenever the model cannot be reached
/// or its reply cannot be parsed. Echoes whatever metrics the user supplied.
pub fn fallback_analysis(input: &RecommendationInput) -> AnalysisResult {
    AnalysisResult {
        ai_status: AnalysisStatus::Fallback,
        estimated_dimensions: EstimatedDimensions {
            area_ping: unavailable_text(&input.room_area),
            lxwxh: unavailable_text(&input.dimensions),
            analysis_basis: "AI 分析失敗，返回預設數據。".to_string(),
        },
        budget_allocation: json!({
            "flooring": "建議分配30%預算於地板",
            "ceiling": "建議分配20%預算於天花板",
            "wallpaper": "建議分配25%預算於壁紙",
        }),
        style_suggestions: json!("依空間與預算選擇合適風格"),
        space_optimization: json!("優化空間布局"),
        product_focus: json!("注重品質與性價比"),
    }
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

fn extract_text_from_response(response: GeminiResponse) -> String {
    let mut text_parts = Vec::new();
    for candidate in response.candidates.unwrap_or_default() {
        if let Some(content) = candidate.content {
            for part in content.parts.unwrap_or_default() {
                if let Some(text) = part.text {
                    if !text.trim().is_empty() {
                        text_parts.push(text);
                    }
                }
            }
        }
    }
    text_parts.join("\n")
}

fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

fn summarize_error_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if let Some(message) = value.pointer("/error/message").and_then(|v| v.as_str()) {
            return message.to_string();
        }
        return truncate_for_log(&value.to_string(), 2000);
    }

    truncate_for_log(trimmed, 2000)
}

fn is_auth_status(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

/// Client for the Gemini `generateContent` endpoint, constructed once at
/// startup and shared through the application state.
#[derive(Debug, Clone)]
pub struct AnalysisClient {
    api_key: String,
    model: String,
    api_base: String,
    temperature: f32,
    top_k: i32,
    top_p: f32,
    max_output_tokens: i32,
    max_retries: usize,
    retry_delay: Duration,
    attempt_timeout: Duration,
}

impl AnalysisClient {
    pub fn new(api_key: &str, model: &str, api_base: &str) -> Self {
        AnalysisClient {
            api_key: api_key.to_string(),
            model: model.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 2048,
            max_retries: 2,
            retry_delay: Duration::from_secs(2),
            attempt_timeout: Duration::from_secs(150),
        }
    }

    pub fn with_retry_policy(
        mut self,
        max_retries: usize,
        retry_delay: Duration,
        attempt_timeout: Duration,
    ) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self.attempt_timeout = attempt_timeout;
        self
    }

    pub fn from_config(config: &Config) -> Self {
        let mut client = AnalysisClient::new(
            &config.gemini_api_key,
            &config.gemini_model,
            &config.gemini_api_base,
        )
        .with_retry_policy(
            config.analysis_max_retries,
            Duration::from_millis(config.analysis_retry_delay_ms),
            Duration::from_secs(config.analysis_timeout_seconds),
        );
        client.temperature = config.gemini_temperature;
        client.top_k = config.gemini_top_k;
        client.top_p = config.gemini_top_p;
        client.max_output_tokens = config.gemini_max_output_tokens;
        client
    }

    fn redact_api_key(&self, text: &str) -> String {
        let key = self.api_key.trim();
        if key.is_empty() {
            return text.to_string();
        }
        text.replace(key, "[redacted]")
    }

    fn build_payload(&self, input: &RecommendationInput, images: &[ImagePayload]) -> Value {
        json!({
            "systemInstruction": { "parts": [{ "text": ANALYSIS_SYSTEM_PROMPT }] },
            "contents": [{ "role": "user", "parts": build_analysis_parts(input, images) }],
            "generationConfig": {
                "temperature": self.temperature,
                "topK": self.top_k,
                "topP": self.top_p,
                "maxOutputTokens": self.max_output_tokens,
            },
        })
    }

    async fn attempt(
        &self,
        input: &RecommendationInput,
        images: &[ImagePayload],
    ) -> Result<AnalysisResult, AnalysisError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base, self.model, self.api_key
        );
        let payload = self.build_payload(input, images);

        let response = get_http_client()
            .post(&url)
            .timeout(self.attempt_timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    AnalysisError::Timeout
                } else {
                    AnalysisError::Other(self.redact_api_key(&err.to_string()))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = summarize_error_body(&body);
            if is_auth_status(status) {
                return Err(AnalysisError::AuthFailure(detail));
            }
            return Err(AnalysisError::Unavailable { status, detail });
        }

        let response = response
            .json::<GeminiResponse>()
            .await
            .map_err(|err| AnalysisError::Other(self.redact_api_key(&err.to_string())))?;

        let raw_text = extract_text_from_response(response);
        debug!(target: "llm.gemini", reply = %truncate_for_log(&raw_text, 2000));

        let parsed = extract_json(&raw_text).ok_or(AnalysisError::ParseFailure)?;
        Ok(AnalysisResult::from_model_value(&parsed))
    }

    /// Runs the analysis with bounded retries and a per-attempt deadline.
    /// Never fails: once retries are exhausted (or an auth failure makes them
    /// pointless) the deterministic fallback analysis is returned instead.
    pub async fn analyze(
        &self,
        input: &RecommendationInput,
        images: &[ImagePayload],
    ) -> AnalysisResult {
        for attempt in 1..=self.max_retries + 1 {
            let outcome = log_llm_timing("gemini", &self.model, "analyze_user_requirements", || {
                self.attempt(input, images)
            })
            .await;

            match outcome {
                Ok(analysis) => return analysis,
                Err(err) => {
                    warn!(
                        "AI分析錯誤 (第 {} 次嘗試, 共 {} 次): {}",
                        attempt,
                        self.max_retries + 1,
                        err
                    );
                    if !err.is_retryable() {
                        break;
                    }
                    if attempt <= self.max_retries {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        warn!("AI分析失敗，回傳 fallback 結果。");
        fallback_analysis(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input() -> RecommendationInput {
        RecommendationInput {
            room_area: "8".to_string(),
            dimensions: String::new(),
            total_budget: "50000".to_string(),
            style_name: "現代風".to_string(),
            separate_budget: String::new(),
            special_requirements: String::new(),
        }
    }

    fn unroutable_client() -> AnalysisClient {
        AnalysisClient::new("test-key", "gemini-test", "http://127.0.0.1:9/v1beta")
            .with_retry_policy(1, Duration::ZERO, Duration::from_millis(500))
    }

    #[test]
    fn auth_failures_are_not_retryable() {
        assert!(!AnalysisError::AuthFailure("denied".to_string()).is_retryable());
        assert!(AnalysisError::Timeout.is_retryable());
        assert!(AnalysisError::ParseFailure.is_retryable());
        assert!(AnalysisError::Unavailable {
            status: StatusCode::SERVICE_UNAVAILABLE,
            detail: "down".to_string(),
        }
        .is_retryable());
    }

    #[test]
    fn fallback_echoes_supplied_metrics() {
        let analysis = fallback_analysis(&input());
        assert_eq!(analysis.ai_status, AnalysisStatus::Fallback);
        assert_eq!(analysis.estimated_dimensions.area_ping, "8");
        assert_eq!(analysis.estimated_dimensions.lxwxh, "無法估算");
        assert!(analysis.budget_allocation.get("flooring").is_some());
    }

    #[test]
    fn model_value_mapping_tolerates_odd_types() {
        let value = json!({
            "estimated_dimensions": {"area_ping": 8, "LxWxH": "4x3x2.6"},
            "budget_allocation": {"flooring": "30%"},
            "style_suggestions": ["現代風", "北歐風"],
        });
        let analysis = AnalysisResult::from_model_value(&value);
        assert_eq!(analysis.ai_status, AnalysisStatus::Completed);
        assert_eq!(analysis.estimated_dimensions.area_ping, "8");
        assert_eq!(analysis.estimated_dimensions.lxwxh, "4x3x2.6");
        assert_eq!(analysis.estimated_dimensions.analysis_basis, "");
        assert!(analysis.style_suggestions.is_array());
        assert!(analysis.product_focus.is_null());
    }

    #[test]
    fn error_bodies_are_summarized_from_the_error_envelope() {
        let body = r#"{"error": {"code": 503, "message": "overloaded"}}"#;
        assert_eq!(summarize_error_body(body), "overloaded");
        assert_eq!(summarize_error_body(""), "empty response body");
        assert_eq!(summarize_error_body("plain failure"), "plain failure");
    }

    #[tokio::test]
    async fn unreachable_endpoint_degrades_to_fallback() {
        let client = unroutable_client();
        let analysis = client.analyze(&input(), &[]).await;
        assert_eq!(analysis.ai_status, AnalysisStatus::Fallback);
        assert_eq!(analysis.estimated_dimensions.area_ping, "8");
    }
}
