use std::env;

use anyhow::Result;
use once_cell::sync::Lazy;

use crate::matcher::RecommendationMode;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub bind_address: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub gemini_temperature: f32,
    pub gemini_top_k: i32,
    pub gemini_top_p: f32,
    pub gemini_max_output_tokens: i32,
    pub analysis_timeout_seconds: u64,
    pub analysis_max_retries: usize,
    pub analysis_retry_delay_ms: u64,
    pub recommendation_mode: RecommendationMode,
    pub result_ttl_seconds: u64,
}

pub static CONFIG: Lazy<Config> =
    Lazy::new(|| Config::load().expect("Failed to load configuration"));

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_f32(name: &str, default: f32) -> f32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<f32>().ok())
        .unwrap_or(default)
}

fn env_i32(name: &str, default: i32) -> i32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<i32>().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn load() -> Result<Self> {
        let gemini_api_key = env::var("GEMINI_API_KEY").unwrap_or_default();
        if gemini_api_key.trim().is_empty() {
            return Err(anyhow::anyhow!("GEMINI_API_KEY is required"));
        }

        Ok(Config {
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            bind_address: env_string("BIND_ADDRESS", "0.0.0.0:8080"),
            gemini_api_key,
            gemini_model: env_string("GEMINI_MODEL", "gemini-2.5-pro"),
            gemini_api_base: env_string(
                "GEMINI_API_BASE",
                "https://generativelanguage.googleapis.com/v1beta",
            ),
            gemini_temperature: env_f32("GEMINI_TEMPERATURE", 0.7),
            gemini_top_k: env_i32("GEMINI_TOP_K", 40),
            gemini_top_p: env_f32("GEMINI_TOP_P", 0.95),
            gemini_max_output_tokens: env_i32("GEMINI_MAX_OUTPUT_TOKENS", 2048),
            analysis_timeout_seconds: env_u64("ANALYSIS_TIMEOUT_SECONDS", 150),
            analysis_max_retries: env_usize("ANALYSIS_MAX_RETRIES", 2),
            analysis_retry_delay_ms: env_u64("ANALYSIS_RETRY_DELAY_MS", 2000),
            recommendation_mode: RecommendationMode::parse(&env_string(
                "RECOMMENDATION_MODE",
                "tiered",
            )),
            result_ttl_seconds: env_u64("RESULT_TTL_SECONDS", 1800),
        })
    }
}

pub const ANALYSIS_SYSTEM_PROMPT: &str = "你是一位專業室內設計師，提供精準的設計分析。";

pub const ESTIMATE_FROM_IMAGES_INSTRUCTION: &str =
    "請分析提供的圖片，估算房間長寬高與坪數，回傳 JSON。";

pub const ANALYZE_GIVEN_DATA_INSTRUCTION: &str = "根據提供資訊分析。";

pub const ANALYSIS_OUTPUT_SCHEMA: &str = r#"請輸出以下 JSON：
{
  "estimated_dimensions": {"area_ping": "AI估算坪數", "LxWxH": "AI估算長寬高", "analysis_basis": "依據"},
  "budget_allocation": {"flooring": "...", "ceiling": "...", "wallpaper": "..."},
  "style_suggestions": "...",
  "space_optimization": "...",
  "product_focus": "..."
}"#;
