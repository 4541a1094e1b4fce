use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::catalog::STYLE_OPTIONS;
use crate::llm::UploadedImage;
use crate::pipeline::{FailureKind, RecommendationInput, RecommendationResult};
use crate::state::AppState;
use crate::utils::timing::RequestTimer;

const IMAGE_FIELDS: [&str; 3] = ["image_files", "box1", "box2"];

fn error_response(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({ "success": false, "error": message })),
    )
}

/// Landing payload: the offered style options plus an empty form skeleton.
pub async fn index() -> Json<Value> {
    let styles: Vec<Value> = STYLE_OPTIONS
        .iter()
        .map(|name| json!({ "name": name, "description": format!("這是 {name} 的簡短描述。") }))
        .collect();
    Json(json!({
        "styles": styles,
        "initial_data": {
            "room_area": "",
            "dimensions": "",
            "total_budget": "",
            "style_name": "",
        },
    }))
}

struct SubmittedForm {
    input: RecommendationInput,
    images: Vec<UploadedImage>,
}

async fn read_form(multipart: &mut Multipart) -> Result<SubmittedForm, String> {
    let mut input = RecommendationInput::default();
    let mut images = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| err.to_string())?
    {
        let Some(name) = field.name().map(|name| name.to_string()) else {
            continue;
        };

        if IMAGE_FIELDS.contains(&name.as_str()) {
            let declared_mime = field.content_type().map(|mime| mime.to_string());
            let filename = field
                .file_name()
                .map(|value| value.to_string())
                .unwrap_or_else(|| "uploaded_image".to_string());
            let bytes = field.bytes().await.map_err(|err| err.to_string())?;
            if bytes.is_empty() {
                continue;
            }
            images.push(UploadedImage {
                bytes: bytes.to_vec(),
                declared_mime,
                filename,
            });
            continue;
        }

        let value = field.text().await.map_err(|err| err.to_string())?;
        let value = value.trim().to_string();
        match name.as_str() {
            "room_area" => input.room_area = value,
            "dimensions" => input.dimensions = value,
            "total_budget" => input.total_budget = value,
            "style_name" => input.style_name = value,
            "separate_budget" => input.separate_budget = value,
            "special_requirements" => input.special_requirements = value,
            other => info!("忽略未知表單欄位: {other}"),
        }
    }

    Ok(SubmittedForm { input, images })
}

/// Accepts the recommendation form, runs the pipeline and stores the result
/// under a fresh id for the result page to fetch.
pub async fn ai_recommend(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    let form = match read_form(&mut multipart).await {
        Ok(form) => form,
        Err(err) => {
            warn!("表單解析失敗: {err}");
            return error_response(StatusCode::BAD_REQUEST, "表單資料無法解析");
        }
    };

    info!(
        "收到推薦請求: room_area='{}' total_budget='{}' 圖片數量={}",
        form.input.room_area,
        form.input.total_budget,
        form.images.len()
    );

    if form.input.total_budget.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "缺少必要欄位: 總預算");
    }
    if form.input.room_area.is_empty()
        && form.input.dimensions.is_empty()
        && form.images.is_empty()
    {
        return error_response(StatusCode::BAD_REQUEST, "請提供房間坪數、長寬高或上傳圖片");
    }

    let mut timer = RequestTimer::start("ai_recommend", form.images.len());
    let result = state.pipeline.process(form.input, form.images).await;

    if result.status.is_success() {
        let result_id = state.store_result(result);
        timer.complete("success", None);
        info!("AI推薦完成，結果已存入 {result_id}");
        return (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "result_id": result_id,
                "redirect_url": format!("/recommend/{result_id}"),
            })),
        );
    }

    let failure = result.failure.as_ref();
    let message = failure.map(|f| f.message.clone()).unwrap_or_default();
    timer.complete("failed", Some(message.clone()));
    match failure.map(|f| f.kind) {
        Some(FailureKind::InvalidImage) => error_response(StatusCode::BAD_REQUEST, &message),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "error": "AI 服務內部錯誤，請稍後再試。",
                "detail": message,
            })),
        ),
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn format_ntd(value: f64) -> String {
    let rounded = value.round();
    if rounded < 0.0 {
        format!("NT$ -{}", group_thousands(rounded.abs() as u64))
    } else {
        format!("NT$ {}", group_thousands(rounded as u64))
    }
}

fn render_result(result: &RecommendationResult) -> Value {
    let analysis = result.ai_recommendation.as_ref();
    let basis = analysis
        .map(|a| a.estimated_dimensions.analysis_basis.clone())
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| "N/A".to_string());

    json!({
        "recommendation_id": result.id,
        "status": result.status,
        "room_area": result.room_area,
        "dimensions": result.dimensions,
        "total_budget": result.total_budget,
        "total_budget_display": format_ntd(result.total_budget),
        "style_name": result.style_name,
        "ai_recommendation": analysis,
        "display_analysis_basis": basis,
        "budget_breakdown": analysis.map(|a| a.budget_allocation.clone()).unwrap_or(Value::Null),
        "recommendations": result.recommendations,
        "total_cost": result.total_cost,
        "total_cost_display": format_ntd(result.total_cost),
    })
}

/// Renders a previously stored result, or 404 once it has expired.
pub async fn recommendation_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    match state.fetch_result(&id) {
        Some(result) => (StatusCode::OK, Json(render_result(&result))),
        None => {
            warn!("沒有推薦結果: {id}");
            error_response(StatusCode::NOT_FOUND, "找不到推薦結果，請重新提交")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::AnalysisClient;
    use crate::matcher::RecommendationMode;
    use crate::pipeline::Pipeline;
    use std::time::Duration;

    fn test_state() -> AppState {
        let client = AnalysisClient::new("test-key", "gemini-test", "http://127.0.0.1:9/v1beta")
            .with_retry_policy(0, Duration::ZERO, Duration::from_millis(200));
        AppState::new(Pipeline::new(client, RecommendationMode::Tiered), 60)
    }

    #[test]
    fn formats_budgets_with_thousand_separators() {
        assert_eq!(format_ntd(50000.0), "NT$ 50,000");
        assert_eq!(format_ntd(0.0), "NT$ 0");
        assert_eq!(format_ntd(1234567.4), "NT$ 1,234,567");
        assert_eq!(format_ntd(999.0), "NT$ 999");
    }

    #[tokio::test]
    async fn index_lists_the_five_style_options() {
        let Json(body) = index().await;
        let styles = body["styles"].as_array().unwrap();
        assert_eq!(styles.len(), 5);
        assert_eq!(styles[0]["name"], "現代風");
        assert!(styles[0]["description"].as_str().unwrap().contains("現代風"));
    }

    #[tokio::test]
    async fn rendered_results_carry_display_fields() {
        let state = test_state();
        let result = state
            .pipeline
            .process(
                RecommendationInput {
                    total_budget: "50000".to_string(),
                    style_name: "現代風".to_string(),
                    ..RecommendationInput::default()
                },
                Vec::new(),
            )
            .await;
        let id = state.store_result(result);

        let (status, Json(body)) = recommendation_detail(State(state), Path(id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_budget"], 50000.0);
        assert_eq!(body["total_budget_display"], "NT$ 50,000");
        assert_eq!(body["status"], "fallback");
        assert!(body["recommendations"].is_object());
        assert_eq!(
            body["display_analysis_basis"],
            "AI 分析失敗，返回預設數據。"
        );
    }

    #[tokio::test]
    async fn unknown_result_ids_are_not_found() {
        let (status, Json(body)) =
            recommendation_detail(State(test_state()), Path("missing".to_string())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }
}
