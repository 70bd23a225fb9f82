//! Marks users whose `updateDateTime` is older than the staleness threshold as inactive.
//!
//! Every sweep reads the eligible set fresh and writes exactly that set in a
//! single batch. The write is idempotent, so overlapping or repeated sweeps
//! are harmless and a failed sweep is simply picked up by the next tick.

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::document::{Fields, Filter, WriteBatch, format_timestamp};
use crate::error::{StoreError, SweepError};
use crate::store::DocumentStore;

pub const UPDATE_TIME_FIELD: &str = "updateDateTime";
pub const STATUS_FIELD: &str = "status";
pub const INACTIVE_STATUS: &str = "inactive";

#[derive(Clone, Debug)]
pub struct SweepSettings {
    pub collection: String,
    pub staleness: TimeDelta,
    pub interval: Duration,
    /// Extra commit attempts after a transient failure.
    pub commit_retries: u32,
    pub retry_delay: Duration,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepResult {
    pub updated: usize,
}

/// 截止时间：`now - staleness`，溢出时取最早时间。
pub fn cutoff(now: DateTime<Utc>, staleness: TimeDelta) -> DateTime<Utc> {
    now.checked_sub_signed(staleness)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Runs one sweep and reports failures to the caller.
pub async fn sweep_inactive_users<S: DocumentStore>(
    store: &S,
    settings: &SweepSettings,
    now: DateTime<Utc>,
) -> Result<SweepResult, SweepError> {
    let cutoff = cutoff(now, settings.staleness);
    let filter = Filter::at_or_before(UPDATE_TIME_FIELD, cutoff);
    let stale = store
        .query(&settings.collection, &filter)
        .await
        .map_err(SweepError::Query)?;

    if stale.is_empty() {
        info!(
            collection = %settings.collection,
            cutoff = %format_timestamp(cutoff),
            "no inactive users found"
        );
        return Ok(SweepResult { updated: 0 });
    }

    let mut batch = WriteBatch::new();
    for snapshot in stale {
        debug!(
            document = %snapshot.reference,
            last_update = ?snapshot.fields.get(UPDATE_TIME_FIELD),
            "user is stale"
        );
        batch.update(snapshot.reference, inactive_status());
    }

    let updated = commit_with_retry(store, &batch, settings)
        .await
        .map_err(SweepError::Commit)?;
    info!(
        collection = %settings.collection,
        cutoff = %format_timestamp(cutoff),
        "{updated} users marked inactive"
    );
    Ok(SweepResult { updated })
}

/// Scheduled entry point: never fails, errors are logged and left for the next tick.
pub async fn run_sweep<S: DocumentStore>(
    store: &S,
    settings: &SweepSettings,
    now: DateTime<Utc>,
) -> SweepResult {
    match sweep_inactive_users(store, settings, now).await {
        Ok(result) => result,
        Err(err) => {
            error!(
                collection = %settings.collection,
                cutoff = %format_timestamp(cutoff(now, settings.staleness)),
                error = %err,
                "error updating inactive users"
            );
            SweepResult::default()
        }
    }
}

fn inactive_status() -> Fields {
    let mut fields = Fields::new();
    fields.insert(STATUS_FIELD.into(), Value::String(INACTIVE_STATUS.into()));
    fields
}

async fn commit_with_retry<S: DocumentStore>(
    store: &S,
    batch: &WriteBatch,
    settings: &SweepSettings,
) -> Result<usize, StoreError> {
    let mut attempt = 0;
    loop {
        match store.commit(batch).await {
            Ok(written) => return Ok(written),
            Err(err) if attempt < settings.commit_retries && is_transient(&err) => {
                attempt += 1;
                warn!(attempt, error = %err, "batch commit failed, retrying");
                tokio::time::sleep(settings.retry_delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

fn is_transient(err: &StoreError) -> bool {
    matches!(err, StoreError::Io(_))
}
