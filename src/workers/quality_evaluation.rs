use crate::assessment::engine::AssessmentEngine;

pub async fn run(engine: &AssessmentEngine) {
    tracing::debug!("quality_evaluation: start");
    match engine.evaluate_batch().await {
        Ok(summary) => tracing::info!(
            processed = summary.processed,
            insufficient_data = summary.insufficient_data,
            write_failures = summary.write_failures,
            "quality_evaluation: done"
        ),
        Err(e) => tracing::error!(error = %e, "quality_evaluation failed"),
    }
}
