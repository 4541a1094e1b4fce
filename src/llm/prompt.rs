use serde_json::{json, Value};

use crate::config::{
    ANALYSIS_OUTPUT_SCHEMA, ANALYZE_GIVEN_DATA_INSTRUCTION, ESTIMATE_FROM_IMAGES_INSTRUCTION,
};
use crate::llm::media::ImagePayload;
use crate::pipeline::RecommendationInput;

fn field_or(value: &str, placeholder: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        placeholder.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Whether the model should be asked to estimate room metrics from the
/// photos: only when photos exist and the user supplied neither an area nor
/// linear dimensions.
pub fn should_estimate_from_images(input: &RecommendationInput, image_count: usize) -> bool {
    image_count > 0
        && input.room_area.trim().is_empty()
        && input.dimensions.trim().is_empty()
}

/// Assembles the ordered Gemini `parts` array: every image as an inline block
/// followed by a numbered caption, then the single instruction block with all
/// known fields and the required output schema. Deterministic for identical
/// inputs.
pub fn build_analysis_parts(input: &RecommendationInput, images: &[ImagePayload]) -> Vec<Value> {
    let mut parts = Vec::with_capacity(images.len() * 2 + 1);

    for (idx, payload) in images.iter().enumerate() {
        parts.push(json!({
            "inlineData": {
                "mimeType": payload.mime_type,
                "data": payload.base64_data(),
            }
        }));
        parts.push(json!({ "text": format!("這是第 {} 張圖片，用於分析。", idx + 1) }));
    }

    let instruction = if should_estimate_from_images(input, images.len()) {
        ESTIMATE_FROM_IMAGES_INSTRUCTION
    } else {
        ANALYZE_GIVEN_DATA_INSTRUCTION
    };

    let prompt_text = format!(
        "{instruction}\n\n用戶資料：\n- 風格: {style}\n- 總坪數: {area}\n- 長寬高: {dims}\n- 預算: {budget}\n- 分別預算: {separate}\n- 特殊需求: {special}\n\n{schema}",
        instruction = instruction,
        style = field_or(&input.style_name, "未指定"),
        area = field_or(&input.room_area, "待分析"),
        dims = field_or(&input.dimensions, "待分析"),
        budget = field_or(&input.total_budget, "未提供"),
        separate = field_or(&input.separate_budget, "無"),
        special = field_or(&input.special_requirements, "無"),
        schema = ANALYSIS_OUTPUT_SCHEMA,
    );
    parts.push(json!({ "text": prompt_text }));

    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(area: &str, dims: &str) -> RecommendationInput {
        RecommendationInput {
            room_area: area.to_string(),
            dimensions: dims.to_string(),
            total_budget: "50000".to_string(),
            style_name: "現代風".to_string(),
            separate_budget: String::new(),
            special_requirements: "要有貓跳台".to_string(),
        }
    }

    fn payload() -> ImagePayload {
        ImagePayload {
            mime_type: "image/jpeg".to_string(),
            width: 640,
            height: 480,
            data_uri: "data:image/jpeg;base64,aGVsbG8=".to_string(),
            filename: "room.jpg".to_string(),
        }
    }

    #[test]
    fn asks_for_estimation_only_when_both_metrics_are_missing() {
        assert!(should_estimate_from_images(&input("", ""), 1));
        assert!(!should_estimate_from_images(&input("8", ""), 1));
        assert!(!should_estimate_from_images(&input("", "4x3x2.6"), 1));
        assert!(!should_estimate_from_images(&input("", ""), 0));
    }

    #[test]
    fn interleaves_numbered_captions_with_image_blocks() {
        let images = vec![payload(), payload()];
        let parts = build_analysis_parts(&input("", ""), &images);
        assert_eq!(parts.len(), 5);
        assert!(parts[0].get("inlineData").is_some());
        assert_eq!(
            parts[1]["text"].as_str().unwrap(),
            "這是第 1 張圖片，用於分析。"
        );
        assert!(parts[2].get("inlineData").is_some());
        assert_eq!(
            parts[3]["text"].as_str().unwrap(),
            "這是第 2 張圖片，用於分析。"
        );
        let instruction = parts[4]["text"].as_str().unwrap();
        assert!(instruction.contains("估算房間長寬高與坪數"));
        assert!(instruction.contains("estimated_dimensions"));
    }

    #[test]
    fn image_blocks_carry_bare_base64_not_data_uris() {
        let parts = build_analysis_parts(&input("", ""), &[payload()]);
        assert_eq!(parts[0]["inlineData"]["data"].as_str().unwrap(), "aGVsbG8=");
    }

    #[test]
    fn embeds_user_fields_and_placeholders() {
        let parts = build_analysis_parts(&input("8", "4x3x2.6"), &[]);
        assert_eq!(parts.len(), 1);
        let text = parts[0]["text"].as_str().unwrap();
        assert!(text.starts_with("根據提供資訊分析。"));
        assert!(text.contains("- 風格: 現代風"));
        assert!(text.contains("- 總坪數: 8"));
        assert!(text.contains("- 分別預算: 無"));
        assert!(text.contains("- 特殊需求: 要有貓跳台"));
    }
}
