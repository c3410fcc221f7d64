use std::sync::LazyLock;

use prometheus::*;

static METRIC_INDEX_CELLS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "colorindex_index_cells",
        "count of the color cells visited by index workers",
        &["status"]
    )
    .unwrap()
});

static METRIC_BUILD_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "colorindex_build_duration",
        "duration of the whole index build in seconds",
        &["policy", "result"],
        vec![1., 10., 60., 300., 900., 1800., 3600., 7200., 14400.]
    )
    .unwrap()
});

static METRIC_LOOKUP_COUNT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!("colorindex_lookup_count", "count of the color lookups", &["result"]).unwrap()
});

/// 记录一行颜色的处理结果
pub fn inc_index_cells(written: u64, skipped: u64) {
    METRIC_INDEX_CELLS.with_label_values(&["written"]).inc_by(written);
    METRIC_INDEX_CELLS.with_label_values(&["skipped"]).inc_by(skipped);
}

pub fn observe_build_duration(policy: &str, ok: bool, duration: f64) {
    let result = if ok { "ok" } else { "error" };
    METRIC_BUILD_DURATION.with_label_values(&[policy, result]).observe(duration);
}

/// 记录一次颜色查询，`result` 为 `hit`、`miss`、`invalid` 或 `error`
pub fn inc_lookup(result: &str) {
    METRIC_LOOKUP_COUNT.with_label_values(&[result]).inc();
}

/// 导出文本格式的指标
pub fn encode() -> Result<String> {
    TextEncoder::new().encode_to_string(&prometheus::gather())
}
