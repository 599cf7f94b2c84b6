use lazy_static::lazy_static;
use prometheus::exponential_buckets;
use prometheus::Encoder;
use prometheus::HistogramOpts;
use prometheus::HistogramVec;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;
use prometheus::TextEncoder;
use tracing::warn;

lazy_static! {
    /// Emitted changeset rows per table and tag.
    pub static ref SYNC_ROWS_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("sync_rows", "changeset rows emitted per table and tag"),
        &["table", "tag"]
    )
    .expect("metric can not be created");

    /// Rows skipped for a cycle (malformed macro, undecodable column).
    pub static ref SKIPPED_ROWS_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("sync_skipped_rows", "rows skipped during synchronization"),
        &["table"]
    )
    .expect("metric can not be created");

    pub static ref FAILED_TABLE_SYNCS: IntCounterVec = IntCounterVec::new(
        Opts::new("sync_failed_tables", "table passes aborted by a query failure"),
        &["table"]
    )
    .expect("metric can not be created");

    /// Duration of one stage in ms.
    pub static ref SYNC_DURATION_METRIC: HistogramVec = HistogramVec::new(
        HistogramOpts::new("sync_duration_ms", "Histogram of stage sync duration in ms")
            .buckets(exponential_buckets(1.0, 2.0, 16).expect("valid buckets")),
        &["stage"]
    )
    .expect("metric can not be created");

    pub static ref MACRO_CACHE_REVISION: IntGauge =
        IntGauge::new("macro_cache_revision", "revision of the published macro snapshot")
            .expect("metric can not be created");
}

/// Registers every synchronizer metric with `registry`.
pub fn register_custom_metrics(registry: &Registry) -> prometheus::Result<()> {
    registry.register(Box::new(SYNC_ROWS_METRIC.clone()))?;
    registry.register(Box::new(SKIPPED_ROWS_METRIC.clone()))?;
    registry.register(Box::new(FAILED_TABLE_SYNCS.clone()))?;
    registry.register(Box::new(SYNC_DURATION_METRIC.clone()))?;
    registry.register(Box::new(MACRO_CACHE_REVISION.clone()))?;
    Ok(())
}

/// Text exposition of everything registered in `registry`.
pub fn metrics_body(registry: &Registry) -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        warn!("could not encode custom metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_else(|e| {
        warn!("custom metrics could not be from_utf8'd: {}", e);
        String::default()
    })
}
