use std::future::Future;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::utils::logging::TIMING_TARGET;

/// Wall-clock and monotonic timing for one inbound request, logged as a
/// received/completed event pair on the timing target.
#[derive(Debug)]
pub struct RequestTimer {
    operation: String,
    image_count: usize,
    started_at: DateTime<Utc>,
    started_perf: Instant,
    completed: bool,
}

impl RequestTimer {
    pub fn start(operation: &str, image_count: usize) -> Self {
        let started_at = Utc::now();
        info!(
            target: TIMING_TARGET,
            "event=request_received operation={operation} image_count={image_count} received_at={}",
            started_at.to_rfc3339()
        );
        RequestTimer {
            operation: operation.to_string(),
            image_count,
            started_at,
            started_perf: Instant::now(),
            completed: false,
        }
    }

    pub fn complete(&mut self, status: &str, detail: Option<String>) {
        if self.completed {
            return;
        }
        self.completed = true;
        info!(
            target: TIMING_TARGET,
            "event=request_completed operation={} image_count={} started_at={} completed_at={} duration_s={:.3} status={} detail={}",
            self.operation,
            self.image_count,
            self.started_at.to_rfc3339(),
            Utc::now().to_rfc3339(),
            self.started_perf.elapsed().as_secs_f64(),
            status,
            detail.unwrap_or_default()
        );
    }
}

/// Wraps one model call in a request/response event pair. The call's own
/// error type passes through untouched.
pub async fn log_llm_timing<T, E, F, Fut>(
    provider: &str,
    model: &str,
    operation: &str,
    call: F,
) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let started_perf = Instant::now();
    info!(
        target: TIMING_TARGET,
        "event=llm_request provider={provider} model={model} operation={operation} started_at={}",
        Utc::now().to_rfc3339()
    );

    let result = call().await;

    info!(
        target: TIMING_TARGET,
        "event=llm_response provider={provider} model={model} operation={operation} completed_at={} duration_s={:.3} status={}",
        Utc::now().to_rfc3339(),
        started_perf.elapsed().as_secs_f64(),
        if result.is_ok() { "success" } else { "error" }
    );

    result
}
