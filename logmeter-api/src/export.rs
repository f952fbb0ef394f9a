//! Metrics export endpoints.
//!
//! - `GET /json`: every metric as a JSON array, sorted by name
//! - `GET /csv`: one row per metric: `name,value,time,type,unit`, then one
//!   `key=value` field per tag

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use logmeter_core::{Metric, MetricStore};
use std::sync::Arc;

use crate::error::ApiResult;

/// Build the export router over a shared store.
pub fn router(store: Arc<MetricStore>) -> Router {
    Router::new()
        .route("/json", get(export_json))
        .route("/csv", get(export_csv))
        .with_state(store)
}

async fn export_json(State(store): State<Arc<MetricStore>>) -> ApiResult<Json<Vec<Metric>>> {
    Ok(Json(store.snapshot()?))
}

async fn export_csv(State(store): State<Arc<MetricStore>>) -> ApiResult<impl IntoResponse> {
    let body = encode_csv(&store.snapshot()?);
    Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], body))
}

/// Render metrics as CSV. Rows have a variable number of fields since tags
/// are appended one per field.
pub fn encode_csv(metrics: &[Metric]) -> String {
    let mut out = String::new();
    for metric in metrics {
        let mut fields = vec![
            metric.name.clone(),
            format!("{:.6}", metric.value),
            metric.time.to_rfc3339(),
            metric.kind.code().to_string(),
            metric.unit.clone(),
        ];
        fields.extend(metric.tags.iter().map(|(k, v)| format!("{k}={v}")));

        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            write_field(&mut out, field);
        }
        out.push('\n');
    }
    out
}

fn write_field(out: &mut String, field: &str) {
    if field.contains([',', '"', '\n', '\r']) {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use logmeter_core::MetricKind;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_csv_row_layout() {
        let mut metric = Metric::new("requests", MetricKind::Counter, at(1_700_000_000));
        metric.value = 3.0;
        metric.tags.insert("verb".into(), "GET".into());
        metric.tags.insert("code".into(), "200".into());

        assert_eq!(
            encode_csv(&[metric]),
            "requests,3.000000,2023-11-14T22:13:20+00:00,0,,code=200,verb=GET\n"
        );
    }

    #[test]
    fn test_csv_quotes_special_fields() {
        let mut metric = Metric::new("latency", MetricKind::Gauge, at(0));
        metric.unit = "ms".into();
        metric.value = 1.5;
        metric.tags.insert("path".into(), "/a,b".into());
        metric.tags.insert("agent".into(), "say \"hi\"".into());

        assert_eq!(
            encode_csv(&[metric]),
            "latency,1.500000,1970-01-01T00:00:00+00:00,1,ms,\"agent=say \"\"hi\"\"\",\"path=/a,b\"\n"
        );
    }

    #[test]
    fn test_csv_empty_store() {
        assert_eq!(encode_csv(&[]), "");
    }
}
