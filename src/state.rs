use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use crate::pipeline::{Pipeline, RecommendationResult};

#[derive(Debug, Clone)]
struct StoredResult {
    result: RecommendationResult,
    expires_at: DateTime<Utc>,
}

/// Shared application state: the pipeline plus a short-lived keyed store of
/// finished results, purged lazily on every access.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    results: Arc<Mutex<HashMap<String, StoredResult>>>,
    ttl: Duration,
}

impl AppState {
    pub fn new(pipeline: Pipeline, result_ttl_seconds: u64) -> Self {
        AppState {
            pipeline: Arc::new(pipeline),
            results: Arc::new(Mutex::new(HashMap::new())),
            ttl: Duration::seconds(result_ttl_seconds as i64),
        }
    }

    pub fn store_result(&self, result: RecommendationResult) -> String {
        let key = result.id.clone();
        let now = Utc::now();
        let mut results = self.results.lock();
        results.retain(|_, stored| stored.expires_at > now);
        results.insert(
            key.clone(),
            StoredResult {
                result,
                expires_at: now + self.ttl,
            },
        );
        key
    }

    pub fn fetch_result(&self, id: &str) -> Option<RecommendationResult> {
        let now = Utc::now();
        let mut results = self.results.lock();
        results.retain(|_, stored| stored.expires_at > now);
        results.get(id).map(|stored| stored.result.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::AnalysisClient;
    use crate::matcher::RecommendationMode;
    use crate::pipeline::{RecommendationInput, ResultStatus};

    fn state(ttl_seconds: u64) -> AppState {
        let client = AnalysisClient::new("test-key", "gemini-test", "http://127.0.0.1:9/v1beta")
            .with_retry_policy(0, std::time::Duration::ZERO, std::time::Duration::from_millis(200));
        AppState::new(
            Pipeline::new(client, RecommendationMode::Tiered),
            ttl_seconds,
        )
    }

    async fn sample_result(state: &AppState) -> RecommendationResult {
        state
            .pipeline
            .process(
                RecommendationInput {
                    total_budget: "50000".to_string(),
                    ..RecommendationInput::default()
                },
                Vec::new(),
            )
            .await
    }

    #[tokio::test]
    async fn stored_results_can_be_fetched_by_id() {
        let state = state(60);
        let result = sample_result(&state).await;
        let key = state.store_result(result);

        let fetched = state.fetch_result(&key).expect("result should be present");
        assert_eq!(fetched.id, key);
        assert_eq!(fetched.status, ResultStatus::Fallback);
        assert!(state.fetch_result("missing").is_none());
    }

    #[tokio::test]
    async fn expired_results_are_purged_on_access() {
        let state = state(0);
        let result = sample_result(&state).await;
        let key = state.store_result(result);
        assert!(state.fetch_result(&key).is_none());
    }
}
