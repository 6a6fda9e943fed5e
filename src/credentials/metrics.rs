//! Credential lifecycle counters
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! host installs a recorder.
//!
//! - `credential_cache_hits_total{category}`: stored credential confirmed valid
//! - `credential_refresh_total{outcome}`: refresh grants by `success`/`failure`
//! - `credential_evictions_total{category,reason}`: stored credentials deleted
//! - `credential_duplicates_removed_total{category}`: duplicates deleted by lookup
//! - `credential_created_total{category}`: credentials acquired from scratch

use metrics::{counter, increment_counter};

pub(crate) fn record_cache_hit(category: &str) {
    increment_counter!("credential_cache_hits_total", "category" => category.to_string());
}

pub(crate) fn record_refresh(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    increment_counter!("credential_refresh_total", "outcome" => outcome);
}

pub(crate) fn record_eviction(category: &str, reason: &'static str) {
    increment_counter!(
        "credential_evictions_total",
        "category" => category.to_string(),
        "reason" => reason
    );
}

pub(crate) fn record_duplicates_removed(category: &str, removed: u64) {
    counter!(
        "credential_duplicates_removed_total",
        removed,
        "category" => category.to_string()
    );
}

pub(crate) fn record_created(category: &str) {
    increment_counter!("credential_created_total", "category" => category.to_string());
}
