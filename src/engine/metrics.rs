use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec,
};

pub const STATUS_OK: &str = "0";
pub const STATUS_ERR: &str = "100";

lazy_static! {
    /// 请求总数，按引擎名与状态打标
    pub static ref ENGINE_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "rule_engine_requests_total",
        "Total rule engine requests",
        &["name", "status"]
    )
    .expect("注册 rule_engine_requests_total 失败");

    /// 请求耗时
    pub static ref ENGINE_REQUEST_DURATION: HistogramVec = register_histogram_vec!(
        "rule_engine_request_duration_seconds",
        "Rule engine request latency",
        &["name"]
    )
    .expect("注册 rule_engine_request_duration_seconds 失败");
}

/// 每次 OnMsg 调用结束时记录一对指标
pub(crate) fn record_request(name: &str, ok: bool, seconds: f64) {
    let status = if ok { STATUS_OK } else { STATUS_ERR };
    ENGINE_REQUESTS_TOTAL
        .with_label_values(&[name, status])
        .inc();
    ENGINE_REQUEST_DURATION
        .with_label_values(&[name])
        .observe(seconds);
}
