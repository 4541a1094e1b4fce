use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::{ProductRecord, PRODUCT_CATALOG};
use crate::llm::media::normalize_image;
use crate::llm::{
    AnalysisClient, AnalysisResult, AnalysisStatus, ImageDecodeError, ImagePayload, UploadedImage,
};
use crate::matcher::{match_products, total_cost, RecommendationMode, Recommendations};

pub const INVALID_IMAGE_MESSAGE: &str =
    "圖片檔案無效或已損壞，請檢查圖片格式和完整性後重新上傳。";

/// The validated form fields of one recommendation request.
#[derive(Debug, Clone, Default)]
pub struct RecommendationInput {
    pub room_area: String,
    pub dimensions: String,
    pub total_budget: String,
    pub style_name: String,
    pub separate_budget: String,
    pub special_requirements: String,
}

impl RecommendationInput {
    pub fn parsed_budget(&self) -> f64 {
        self.total_budget.trim().parse::<f64>().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidImage,
    Internal,
}

#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Completed,
    Fallback,
    Failed,
}

impl ResultStatus {
    pub fn is_success(self) -> bool {
        matches!(self, ResultStatus::Completed | ResultStatus::Fallback)
    }
}

/// Everything one request produced, kept transiently in the result store.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationResult {
    pub id: String,
    pub status: ResultStatus,
    pub room_area: String,
    pub dimensions: String,
    pub total_budget: f64,
    pub style_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_recommendation: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Recommendations>,
    pub total_cost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
}

fn echo_or(estimate: &str, supplied: &str) -> String {
    if !estimate.trim().is_empty() {
        estimate.trim().to_string()
    } else if !supplied.trim().is_empty() {
        supplied.trim().to_string()
    } else {
        "N/A".to_string()
    }
}

/// Sequences the whole recommendation flow for one request. This is the only
/// failure boundary: every outcome is a `RecommendationResult`, never an
/// error bubbling up to the HTTP layer.
pub struct Pipeline {
    client: AnalysisClient,
    mode: RecommendationMode,
    catalog: &'static [ProductRecord],
}

impl Pipeline {
    pub fn new(client: AnalysisClient, mode: RecommendationMode) -> Self {
        Pipeline {
            client,
            mode,
            catalog: PRODUCT_CATALOG,
        }
    }

    pub async fn process(
        &self,
        input: RecommendationInput,
        uploads: Vec<UploadedImage>,
    ) -> RecommendationResult {
        match self.run(&input, &uploads).await {
            Ok(result) => result,
            Err(err) => {
                warn!("推薦流程錯誤: {err}");
                RecommendationResult {
                    id: Uuid::new_v4().to_string(),
                    status: ResultStatus::Failed,
                    room_area: input.room_area.clone(),
                    dimensions: input.dimensions.clone(),
                    total_budget: input.parsed_budget(),
                    style_name: input.style_name.clone(),
                    ai_recommendation: None,
                    recommendations: None,
                    total_cost: 0.0,
                    failure: Some(Failure {
                        kind: FailureKind::InvalidImage,
                        message: INVALID_IMAGE_MESSAGE.to_string(),
                    }),
                }
            }
        }
    }

    async fn run(
        &self,
        input: &RecommendationInput,
        uploads: &[UploadedImage],
    ) -> Result<RecommendationResult, ImageDecodeError> {
        let payloads = uploads
            .iter()
            .map(normalize_image)
            .collect::<Result<Vec<ImagePayload>, _>>()?;
        info!("已載入 {} 張圖片", payloads.len());

        let analysis = self.client.analyze(input, &payloads).await;
        let recommendations = match_products(self.mode, &input.style_name, self.catalog);
        let cost = total_cost(&recommendations);

        let status = match analysis.ai_status {
            AnalysisStatus::Completed => ResultStatus::Completed,
            AnalysisStatus::Fallback => ResultStatus::Fallback,
        };
        info!(
            "推薦流程完成: status={:?} 總金額約 {}",
            status, cost
        );

        Ok(RecommendationResult {
            id: Uuid::new_v4().to_string(),
            status,
            room_area: echo_or(&analysis.estimated_dimensions.area_ping, &input.room_area),
            dimensions: echo_or(&analysis.estimated_dimensions.lxwxh, &input.dimensions),
            total_budget: input.parsed_budget(),
            style_name: echo_or(&input.style_name, "未指定"),
            ai_recommendation: Some(analysis),
            recommendations: Some(recommendations),
            total_cost: cost,
            failure: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_pipeline(mode: RecommendationMode) -> Pipeline {
        // Endpoint nothing listens on: analysis always degrades to fallback.
        let client = AnalysisClient::new("test-key", "gemini-test", "http://127.0.0.1:9/v1beta")
            .with_retry_policy(0, Duration::ZERO, Duration::from_millis(500));
        Pipeline::new(client, mode)
    }

    fn budget_only_input() -> RecommendationInput {
        RecommendationInput {
            total_budget: "50000".to_string(),
            style_name: "現代風".to_string(),
            ..RecommendationInput::default()
        }
    }

    #[tokio::test]
    async fn produces_a_usable_result_without_images_or_a_reachable_model() {
        let result = test_pipeline(RecommendationMode::Tiered)
            .process(budget_only_input(), Vec::new())
            .await;
        assert!(result.status.is_success());
        assert_eq!(result.total_budget, 50000.0);
        assert_eq!(result.style_name, "現代風");
        assert!(!result.recommendations.unwrap().is_empty());
        assert!(result.total_cost > 0.0);
        assert!(!result.id.is_empty());
    }

    #[tokio::test]
    async fn random_mode_also_yields_recommendations() {
        let result = test_pipeline(RecommendationMode::Random)
            .process(budget_only_input(), Vec::new())
            .await;
        assert!(result.status.is_success());
        assert!(!result.recommendations.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_uploads_fail_with_the_invalid_image_kind() {
        let uploads = vec![UploadedImage {
            bytes: b"not an image at all".to_vec(),
            declared_mime: Some("image/jpeg".to_string()),
            filename: "broken.jpg".to_string(),
        }];
        let result = test_pipeline(RecommendationMode::Tiered)
            .process(budget_only_input(), uploads)
            .await;
        assert_eq!(result.status, ResultStatus::Failed);
        let failure = result.failure.unwrap();
        assert_eq!(failure.kind, FailureKind::InvalidImage);
        assert_eq!(failure.message, INVALID_IMAGE_MESSAGE);
        assert!(result.recommendations.is_none());
    }

    #[tokio::test]
    async fn echoes_supplied_metrics_into_the_result() {
        let input = RecommendationInput {
            room_area: "8".to_string(),
            dimensions: "4x3x2.6".to_string(),
            total_budget: "120000".to_string(),
            style_name: "北歐風".to_string(),
            ..RecommendationInput::default()
        };
        let result = test_pipeline(RecommendationMode::Tiered)
            .process(input, Vec::new())
            .await;
        // Fallback analysis echoes user metrics, so the result does too.
        assert_eq!(result.room_area, "8");
        assert_eq!(result.dimensions, "4x3x2.6");
        assert_eq!(result.total_budget, 120000.0);
    }
}
