use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tiny_http::{Response, Server};
use tracing::debug;

/// One request/response observation reported by the documenting library
/// running inside the service under test.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sample {
    #[serde(default)]
    pub request: SampleRequest,
    #[serde(default)]
    pub response: SampleResponse,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleRequest {
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub query_parameters: Map<String, Value>,
    #[serde(default)]
    pub headers: Map<String, Value>,
    #[serde(default)]
    pub body: Value,
}

impl SampleRequest {
    /// Case-insensitive header lookup; libraries disagree on casing.
    pub fn header(&self, name: &str) -> Option<&Value> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleResponse {
    #[serde(default)]
    pub status_code: Value,
    #[serde(default)]
    pub headers: Map<String, Value>,
    #[serde(default)]
    pub body: Value,
}

impl SampleResponse {
    /// Status code regardless of whether the library reported a number or a
    /// string.
    pub fn status(&self) -> Option<u16> {
        match &self.status_code {
            Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

/// Host-side HTTP endpoint the service under test reports samples to. The
/// container reaches it through the injected host alias.
pub struct SampleCollector {
    server: Arc<Server>,
    samples: Arc<Mutex<Vec<Sample>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    stopped: AtomicBool,
}

impl SampleCollector {
    /// Binds the collector and starts accepting samples. Port 0 picks an
    /// ephemeral port.
    pub fn start(port: u16) -> Result<Self> {
        let server = Arc::new(
            Server::http(("0.0.0.0", port))
                .map_err(|e| anyhow!("binding sample collector on port {port}: {e}"))?,
        );
        let samples: Arc<Mutex<Vec<Sample>>> = Arc::new(Mutex::new(Vec::new()));

        let worker = {
            let server = Arc::clone(&server);
            let samples = Arc::clone(&samples);
            thread::spawn(move || {
                while let Ok(mut request) = server.recv() {
                    let mut body = String::new();
                    let _ = request.as_reader().read_to_string(&mut body);
                    record(&samples, &body);
                    let _ = request.respond(Response::empty(200));
                }
            })
        };

        Ok(Self {
            server,
            samples,
            worker: Mutex::new(Some(worker)),
            stopped: AtomicBool::new(false),
        })
    }

    /// Port the collector actually bound.
    pub fn port(&self) -> u16 {
        self.server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .unwrap_or(0)
    }

    /// Snapshot of everything collected so far.
    pub fn samples(&self) -> Vec<Sample> {
        self.samples.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Discards everything collected so far.
    pub fn drain(&self) {
        if let Ok(mut samples) = self.samples.lock() {
            samples.clear();
        }
    }

    /// Waits until at least `count` samples arrived or the timeout elapses,
    /// returning whatever is there.
    pub fn wait_for(&self, count: usize, timeout: Duration) -> Vec<Sample> {
        let deadline = Instant::now() + timeout;
        loop {
            let snapshot = self.samples();
            if snapshot.len() >= count || Instant::now() >= deadline {
                return snapshot;
            }
            thread::sleep(Duration::from_millis(50));
        }
    }

    /// Stops accepting samples. Idempotent; also invoked by cleanup.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.server.unblock();
        if let Some(worker) = self.worker.lock().ok().and_then(|mut slot| slot.take()) {
            let _ = worker.join();
        }
    }
}

impl Drop for SampleCollector {
    fn drop(&mut self) {
        self.stop();
    }
}

fn record(samples: &Arc<Mutex<Vec<Sample>>>, body: &str) {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        debug!("ignoring unparseable sample payload");
        return;
    };

    let parsed: Vec<Sample> = match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        other => serde_json::from_value(other).into_iter().collect(),
    };

    if let Ok(mut slot) = samples.lock() {
        slot.extend(parsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post(port: u16, body: &Value) {
        reqwest::blocking::Client::new()
            .post(format!("http://localhost:{port}/samples"))
            .json(body)
            .send()
            .unwrap();
    }

    #[test]
    fn records_posted_samples() {
        let collector = SampleCollector::start(0).unwrap();

        post(
            collector.port(),
            &json!({
                "request": {
                    "method": "GET",
                    "url": "/test-endpoint",
                    "queryParameters": {"one": "first"},
                    "headers": {"myapp": "Header"},
                    "body": {}
                },
                "response": {"statusCode": "200", "headers": {}, "body": {}}
            }),
        );

        let samples = collector.wait_for(1, Duration::from_secs(2));
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].request.method, "GET");
        assert_eq!(samples[0].request.url, "/test-endpoint");
        assert_eq!(samples[0].response.status(), Some(200));
        assert_eq!(
            samples[0].request.header("MyApp"),
            Some(&json!("Header"))
        );

        collector.stop();
    }

    #[test]
    fn accepts_sample_batches() {
        let collector = SampleCollector::start(0).unwrap();

        post(
            collector.port(),
            &json!([
                {"request": {"method": "GET"}, "response": {"statusCode": 200}},
                {"request": {"method": "POST"}, "response": {"statusCode": 404}}
            ]),
        );

        let samples = collector.wait_for(2, Duration::from_secs(2));
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].response.status(), Some(404));

        collector.stop();
    }

    #[test]
    fn drain_discards_collected_samples() {
        let collector = SampleCollector::start(0).unwrap();

        post(
            collector.port(),
            &json!({"request": {"method": "GET"}, "response": {}}),
        );
        collector.wait_for(1, Duration::from_secs(2));
        collector.drain();

        assert!(collector.samples().is_empty());
        collector.stop();
    }

    #[test]
    fn stop_is_idempotent() {
        let collector = SampleCollector::start(0).unwrap();
        collector.stop();
        collector.stop();
    }
}
