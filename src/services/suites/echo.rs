//! Echo-behavior conformance: the service must answer any path, echo
//! request headers and bodies back, and let a `return-status` header pick
//! the response status.

use super::{SuiteContext, SuiteReport};
use reqwest::Method;
use serde_json::{Value, json};

pub fn run(ctx: &SuiteContext) -> SuiteReport {
    let mut report = SuiteReport::new();
    report.check(
        ctx.mux,
        "handles requests to any path with 200",
        any_path_returns_ok(ctx),
    );
    report.check(
        ctx.mux,
        "returns request headers as response headers",
        echoes_headers(ctx),
    );
    report.check(
        ctx.mux,
        "returns request body as response body with correct types",
        echoes_json_body(ctx),
    );
    report.check(
        ctx.mux,
        "return-status header overrides the status code",
        honors_return_status(ctx),
    );
    report
}

fn any_path_returns_ok(ctx: &SuiteContext) -> Result<(), String> {
    let cases = [
        ("/hello/world", Method::GET),
        ("/hello/world", Method::POST),
        ("/test-endpoint", Method::POST),
        ("/test/123", Method::POST),
        ("/any/12/route", Method::POST),
    ];

    for (path, method) in cases {
        let response = ctx
            .client
            .request(method.clone(), ctx.url(path))
            .send()
            .map_err(|e| format!("{method} {path}: {e}"))?;
        if response.status().as_u16() != 200 {
            return Err(format!("{method} {path} answered {}", response.status()));
        }
    }
    Ok(())
}

fn echoes_headers(ctx: &SuiteContext) -> Result<(), String> {
    let response = ctx
        .client
        .get(ctx.url("/test-endpoint"))
        .header("example-one", "set")
        .header("example-two", "set")
        .send()
        .map_err(|e| e.to_string())?;

    for name in ["example-one", "example-two"] {
        let value = response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| format!("response is missing header {name}"))?;
        if value != "set" {
            return Err(format!("header {name} came back as {value:?}"));
        }
    }
    Ok(())
}

fn echoes_json_body(ctx: &SuiteContext) -> Result<(), String> {
    let body = json!({"first": "one", "second": "two", "third": "third"});

    let response = ctx
        .client
        .post(ctx.url("/test-endpoint"))
        .json(&body)
        .send()
        .map_err(|e| e.to_string())?;

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !content_type.contains("application/json") {
        return Err(format!("content-type was {content_type:?}"));
    }

    let echoed: Value = response.json().map_err(|e| e.to_string())?;
    if echoed != body {
        return Err(format!("body came back as {echoed}"));
    }
    Ok(())
}

fn honors_return_status(ctx: &SuiteContext) -> Result<(), String> {
    for status in [200u16, 204, 405, 412, 311] {
        let response = ctx
            .client
            .get(ctx.url("/test-endpoint"))
            .header("return-status", status.to_string())
            .send()
            .map_err(|e| e.to_string())?;
        if response.status().as_u16() != status {
            return Err(format!(
                "asked for {status}, service answered {}",
                response.status()
            ));
        }
    }
    Ok(())
}
