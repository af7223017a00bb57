//! A single nowcast run.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::info;

use nowcast::{NowcastConfig, ObjectStoreFetcher, SnapshotBuilder, StationPipeline, StatusSnapshot};
use storage::ObjectStorage;

/// Build the pipeline from `config` and compute a snapshot ending at `now`.
///
/// Station and region failures end up inside the snapshot; only setting up
/// the archive client can fail here.
pub async fn run_once(config: &NowcastConfig, now: DateTime<Utc>) -> Result<StatusSnapshot> {
    let storage = ObjectStorage::new(&config.source).context("Failed to create archive client")?;
    info!(
        source = %storage.bucket(),
        prefix = %config.pipeline.key_prefix,
        "Archive client ready"
    );

    let fetcher = ObjectStoreFetcher::new(
        Arc::new(storage),
        config.pipeline.key_prefix.clone(),
        config.pipeline.components_array(),
    );
    let pipeline = StationPipeline::new(
        Arc::new(fetcher),
        config.pipeline.engine(),
        config.pipeline.fetch_timeout(),
    );

    let snapshot = SnapshotBuilder::new(&config.registry, &pipeline, config.pipeline.snapshot_settings())
        .build(now)
        .await;
    Ok(snapshot)
}
