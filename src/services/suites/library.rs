//! Documenting-library conformance: every request driven through the
//! service must show up as a sample on the collector, with method, query
//! parameters, headers, bodies and status codes captured faithfully.

use super::{SuiteContext, SuiteReport};
use crate::services::collector::{Sample, SampleCollector};
use reqwest::Method;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::time::Duration;

const SAMPLE_WAIT: Duration = Duration::from_secs(5);

pub fn run(ctx: &SuiteContext) -> SuiteReport {
    let mut report = SuiteReport::new();

    let Some(collector) = ctx.collector else {
        report.check(
            ctx.mux,
            "sample collector is reachable",
            Err("sample collector is not running".to_string()),
        );
        return report;
    };

    for method in [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::PATCH,
        Method::OPTIONS,
    ] {
        let name = format!("logs {} requests", method.as_str().to_lowercase());
        let outcome = logs_method(ctx, collector, method);
        report.check(ctx.mux, &name, outcome);
    }

    report.check(
        ctx.mux,
        "finds no query parameters when none are sent",
        no_query_parameters(ctx, collector),
    );
    report.check(
        ctx.mux,
        "finds a single query parameter",
        single_query_parameter(ctx, collector),
    );
    report.check(
        ctx.mux,
        "creates an array from duplicate query keys",
        duplicate_query_keys(ctx, collector),
    );
    report.check(
        ctx.mux,
        "finds application headers when set",
        application_headers(ctx, collector),
    );
    report.check(
        ctx.mux,
        "logs an empty body when none is sent",
        empty_body(ctx, collector),
    );
    report.check(
        ctx.mux,
        "logs a short json body",
        json_body(ctx, collector, &simple_json()),
    );
    report.check(
        ctx.mux,
        "logs a long json body",
        json_body(ctx, collector, &long_json()),
    );
    report.check(
        ctx.mux,
        "logs a plain text body",
        text_body(ctx, collector),
    );
    report.check(
        ctx.mux,
        "collects every observed status code",
        collects_status_codes(ctx, collector),
    );
    report.check(
        ctx.mux,
        "logs an empty response body when none is echoed",
        empty_response_body(ctx, collector),
    );
    report.check(
        ctx.mux,
        "logs a short echoed response body",
        response_body(ctx, collector, &simple_json()),
    );
    report.check(
        ctx.mux,
        "logs a long echoed response body",
        response_body(ctx, collector, &long_json()),
    );

    report
}

/// Drains the collector, performs one request, and returns the sample the
/// documenting library reported for it.
fn sampled(
    collector: &SampleCollector,
    send: impl FnOnce() -> Result<(), String>,
) -> Result<Sample, String> {
    collector.drain();
    send()?;
    collector
        .wait_for(1, SAMPLE_WAIT)
        .into_iter()
        .next()
        .ok_or_else(|| "no sample was reported".to_string())
}

fn logs_method(
    ctx: &SuiteContext,
    collector: &SampleCollector,
    method: Method,
) -> Result<(), String> {
    let sample = sampled(collector, || {
        ctx.client
            .request(method.clone(), ctx.url("/test-endpoint"))
            .send()
            .map(|_| ())
            .map_err(|e| e.to_string())
    })?;

    if !sample.request.method.eq_ignore_ascii_case(method.as_str()) {
        return Err(format!(
            "sent {method}, sample recorded {:?}",
            sample.request.method
        ));
    }
    Ok(())
}

fn no_query_parameters(ctx: &SuiteContext, collector: &SampleCollector) -> Result<(), String> {
    let sample = sampled(collector, || {
        ctx.client
            .get(ctx.url("/test-endpoint"))
            .send()
            .map(|_| ())
            .map_err(|e| e.to_string())
    })?;

    if !sample.request.query_parameters.is_empty() {
        return Err(format!(
            "expected no query parameters, got {:?}",
            sample.request.query_parameters
        ));
    }
    Ok(())
}

fn single_query_parameter(ctx: &SuiteContext, collector: &SampleCollector) -> Result<(), String> {
    let sample = sampled(collector, || {
        ctx.client
            .get(ctx.url("/test-endpoint?one=first"))
            .send()
            .map(|_| ())
            .map_err(|e| e.to_string())
    })?;

    if sample.request.query_parameters.len() != 1 {
        return Err(format!(
            "expected one query parameter, got {:?}",
            sample.request.query_parameters
        ));
    }
    if sample.request.query_parameters.get("one") != Some(&json!("first")) {
        return Err(format!(
            "parameter `one` recorded as {:?}",
            sample.request.query_parameters.get("one")
        ));
    }
    if sample.request.url != "/test-endpoint" {
        return Err(format!(
            "url should be the bare path, got {:?}",
            sample.request.url
        ));
    }
    Ok(())
}

fn duplicate_query_keys(ctx: &SuiteContext, collector: &SampleCollector) -> Result<(), String> {
    let sample = sampled(collector, || {
        ctx.client
            .get(ctx.url("/test-endpoint?one=first&one=second"))
            .send()
            .map(|_| ())
            .map_err(|e| e.to_string())
    })?;

    if sample.request.query_parameters.get("one") != Some(&json!(["first", "second"])) {
        return Err(format!(
            "duplicate keys recorded as {:?}",
            sample.request.query_parameters.get("one")
        ));
    }
    Ok(())
}

fn application_headers(ctx: &SuiteContext, collector: &SampleCollector) -> Result<(), String> {
    let sample = sampled(collector, || {
        ctx.client
            .get(ctx.url("/test-endpoint"))
            .header("MyApp", "Header")
            .send()
            .map(|_| ())
            .map_err(|e| e.to_string())
    })?;

    match sample.request.header("myapp") {
        Some(value) if value == &json!("Header") => Ok(()),
        other => Err(format!("header `MyApp` recorded as {other:?}")),
    }
}

fn empty_body(ctx: &SuiteContext, collector: &SampleCollector) -> Result<(), String> {
    let sample = sampled(collector, || {
        ctx.client
            .post(ctx.url("/test-endpoint"))
            .send()
            .map(|_| ())
            .map_err(|e| e.to_string())
    })?;

    if !body_is_empty(&sample.request.body) {
        return Err(format!("expected empty body, got {}", sample.request.body));
    }
    Ok(())
}

fn json_body(
    ctx: &SuiteContext,
    collector: &SampleCollector,
    body: &Value,
) -> Result<(), String> {
    let sample = sampled(collector, || {
        ctx.client
            .post(ctx.url("/test-endpoint"))
            .json(body)
            .send()
            .map(|_| ())
            .map_err(|e| e.to_string())
    })?;

    if &sample.request.body != body {
        return Err(format!("body recorded as {}", sample.request.body));
    }
    Ok(())
}

fn text_body(ctx: &SuiteContext, collector: &SampleCollector) -> Result<(), String> {
    let text = "Hello world \n I am Optic";

    let sample = sampled(collector, || {
        ctx.client
            .post(ctx.url("/test-endpoint"))
            .header("content-type", "text/plain")
            .body(text)
            .send()
            .map(|_| ())
            .map_err(|e| e.to_string())
    })?;

    if sample.request.body != json!(text) {
        return Err(format!("text body recorded as {}", sample.request.body));
    }
    Ok(())
}

fn collects_status_codes(ctx: &SuiteContext, collector: &SampleCollector) -> Result<(), String> {
    collector.drain();
    for status in ["200", "401", "404"] {
        ctx.client
            .get(ctx.url("/test-endpoint"))
            .header("return-status", status)
            .send()
            .map_err(|e| e.to_string())?;
    }

    let samples = collector.wait_for(3, SAMPLE_WAIT);
    let seen: HashSet<u16> = samples
        .iter()
        .filter_map(|sample| sample.response.status())
        .collect();

    for expected in [200u16, 401, 404] {
        if !seen.contains(&expected) {
            return Err(format!("status {expected} was never collected (saw {seen:?})"));
        }
    }
    Ok(())
}

fn empty_response_body(ctx: &SuiteContext, collector: &SampleCollector) -> Result<(), String> {
    let sample = sampled(collector, || {
        ctx.client
            .post(ctx.url("/test-endpoint"))
            .send()
            .map(|_| ())
            .map_err(|e| e.to_string())
    })?;

    if !body_is_empty(&sample.response.body) {
        return Err(format!(
            "expected empty response body, got {}",
            sample.response.body
        ));
    }
    Ok(())
}

fn response_body(
    ctx: &SuiteContext,
    collector: &SampleCollector,
    body: &Value,
) -> Result<(), String> {
    let sample = sampled(collector, || {
        ctx.client
            .post(ctx.url("/test-endpoint"))
            .json(body)
            .send()
            .map(|_| ())
            .map_err(|e| e.to_string())
    })?;

    if &sample.response.body != body {
        return Err(format!("response body recorded as {}", sample.response.body));
    }
    Ok(())
}

fn body_is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn simple_json() -> Value {
    json!({"name": "optic", "kind": "integration"})
}

fn long_json() -> Value {
    let users: Vec<Value> = (0..25)
        .map(|i| json!({"id": i, "name": format!("user-{i}"), "active": i % 2 == 0}))
        .collect();
    json!({"users": users, "pagination": {"page": 1, "total": 25}})
}
