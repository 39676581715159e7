//! Metrics and observability utilities
//!
//! Prometheus metrics with standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all RecipeGuard metrics
pub const METRICS_PREFIX: &str = "recipeguard";

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Recipe lifecycle metrics
    describe_counter!(
        format!("{}_recipes_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total recipes created"
    );

    describe_counter!(
        format!("{}_recipes_updated_total", METRICS_PREFIX),
        Unit::Count,
        "Total recipe edits applied"
    );

    // Reconciliation metrics
    describe_counter!(
        format!("{}_reconcile_mutations_total", METRICS_PREFIX),
        Unit::Count,
        "Reconciliation mutations applied, by collection and kind"
    );

    // Image store metrics
    describe_counter!(
        format!("{}_image_store_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Image store calls that failed and were degraded"
    );

    // Recommendation model metrics
    describe_counter!(
        format!("{}_model_degrades_total", METRICS_PREFIX),
        Unit::Count,
        "Recommendation/allergy model calls that degraded to empty"
    );

    tracing::info!("Metrics registered");
}

/// Count one recipe creation
pub fn record_recipe_created() {
    counter!(format!("{}_recipes_created_total", METRICS_PREFIX)).increment(1);
}

/// Count one applied edit, with the mutation counts of both plans
pub fn record_recipe_updated(
    association_deletes: usize,
    association_updates: usize,
    association_inserts: usize,
    instruction_upserts: usize,
    instruction_deletes: usize,
) {
    counter!(format!("{}_recipes_updated_total", METRICS_PREFIX)).increment(1);

    let mutations = format!("{}_reconcile_mutations_total", METRICS_PREFIX);
    counter!(mutations.clone(), "collection" => "ingredients", "kind" => "delete")
        .increment(association_deletes as u64);
    counter!(mutations.clone(), "collection" => "ingredients", "kind" => "update")
        .increment(association_updates as u64);
    counter!(mutations.clone(), "collection" => "ingredients", "kind" => "insert")
        .increment(association_inserts as u64);
    counter!(mutations.clone(), "collection" => "instructions", "kind" => "upsert")
        .increment(instruction_upserts as u64);
    counter!(mutations, "collection" => "instructions", "kind" => "delete")
        .increment(instruction_deletes as u64);
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent() {
        register_metrics();
        register_metrics();
    }

    #[test]
    fn test_request_metrics_finish() {
        let m = RequestMetrics::start("GET", "/recipes");
        m.finish(200);
    }
}
