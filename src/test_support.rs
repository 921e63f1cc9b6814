use crate::domain::{ContainerRuntime, ProcessHandle, RunSpec, Source};
use anyhow::{Result, bail};
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use tiny_http::{Header, Response, Server};

/// Scripted stand-in for a spawned child process. `running` handles stay
/// alive until `finish` or `terminate` is called.
pub struct MockProcess {
    source: Source,
    exit_code: Mutex<Option<i32>>,
    stdout: Mutex<Option<Box<dyn Read + Send>>>,
    stderr: Mutex<Option<Box<dyn Read + Send>>>,
    terminations: AtomicU32,
}

impl std::fmt::Debug for MockProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockProcess")
            .field("source", &self.source)
            .finish()
    }
}

impl MockProcess {
    /// A process that already exited with `code`.
    pub fn finished(source: Source, code: i32) -> Arc<Self> {
        Arc::new(Self {
            source,
            exit_code: Mutex::new(Some(code)),
            stdout: Mutex::new(None),
            stderr: Mutex::new(None),
            terminations: AtomicU32::new(0),
        })
    }

    /// A process that keeps running until finished or terminated.
    pub fn running(source: Source) -> Arc<Self> {
        Arc::new(Self {
            source,
            exit_code: Mutex::new(None),
            stdout: Mutex::new(None),
            stderr: Mutex::new(None),
            terminations: AtomicU32::new(0),
        })
    }

    /// Attaches canned output to the handle's streams.
    pub fn with_output(self: Arc<Self>, stdout: &str, stderr: &str) -> Arc<Self> {
        if let Ok(mut slot) = self.stdout.lock() {
            *slot = Some(Box::new(Cursor::new(stdout.as_bytes().to_vec())));
        }
        if let Ok(mut slot) = self.stderr.lock() {
            *slot = Some(Box::new(Cursor::new(stderr.as_bytes().to_vec())));
        }
        self
    }

    /// Makes a `running` process exit with `code`.
    pub fn finish(&self, code: i32) {
        if let Ok(mut slot) = self.exit_code.lock() {
            *slot = Some(code);
        }
    }

    pub fn termination_count(&self) -> u32 {
        self.terminations.load(Ordering::SeqCst)
    }
}

impl ProcessHandle for MockProcess {
    fn source(&self) -> Source {
        self.source
    }

    fn take_stdout(&self) -> Option<Box<dyn Read + Send>> {
        self.stdout.lock().ok().and_then(|mut slot| slot.take())
    }

    fn take_stderr(&self) -> Option<Box<dyn Read + Send>> {
        self.stderr.lock().ok().and_then(|mut slot| slot.take())
    }

    fn try_wait(&self) -> Result<Option<i32>> {
        Ok(self.exit_code.lock().ok().and_then(|slot| *slot))
    }

    fn terminate(&self) {
        self.terminations.fetch_add(1, Ordering::SeqCst);
        // Mirrors a real child receiving SIGTERM.
        if let Ok(mut slot) = self.exit_code.lock() {
            if slot.is_none() {
                *slot = Some(143);
            }
        }
    }
}

pub struct MockRuntime {
    commands: RwLock<Vec<String>>,
    fail_on: RwLock<Option<String>>,
    build: RwLock<Option<Arc<MockProcess>>>,
    run: RwLock<Option<Arc<MockProcess>>>,
    last_run_spec: RwLock<Option<RunSpec>>,
}

impl std::fmt::Debug for MockRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockRuntime").finish()
    }
}

impl MockRuntime {
    pub fn new() -> Self {
        Self {
            commands: RwLock::new(Vec::new()),
            fail_on: RwLock::new(None),
            build: RwLock::new(None),
            run: RwLock::new(None),
            last_run_spec: RwLock::new(None),
        }
    }

    /// Handle the next `spawn_build` returns instead of the default
    /// already-successful build.
    pub fn set_build_process(&self, process: Arc<MockProcess>) {
        *self.build.write().unwrap() = Some(process);
    }

    /// Handle the next `spawn_run` returns instead of the default
    /// still-running container.
    pub fn set_run_process(&self, process: Arc<MockProcess>) {
        *self.run.write().unwrap() = Some(process);
    }

    pub fn set_fail_on(&self, operation: &str) {
        *self.fail_on.write().unwrap() = Some(operation.to_string());
    }

    pub fn get_commands(&self) -> Vec<String> {
        self.commands.read().unwrap().clone()
    }

    pub fn last_run_spec(&self) -> Option<RunSpec> {
        self.last_run_spec.read().unwrap().clone()
    }

    fn record_command(&self, cmd: &str) {
        self.commands.write().unwrap().push(cmd.to_string());
    }

    fn check_fail(&self, operation: &str) -> Result<()> {
        if let Some(ref fail_on) = *self.fail_on.read().unwrap() {
            if fail_on == operation {
                bail!("Mock failure on: {}", operation);
            }
        }
        Ok(())
    }
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerRuntime for MockRuntime {
    fn spawn_build(&self, image: &str, _context_dir: &Path) -> Result<Arc<dyn ProcessHandle>> {
        self.record_command(&format!("build:{}", image));
        self.check_fail("build")?;

        let process = self
            .build
            .write()
            .unwrap()
            .take()
            .unwrap_or_else(|| MockProcess::finished(Source::DockerBuild, 0));
        Ok(process)
    }

    fn spawn_run(&self, spec: &RunSpec) -> Result<Arc<dyn ProcessHandle>> {
        self.record_command(&format!("run:{}", spec.image));
        self.check_fail("run")?;

        *self.last_run_spec.write().unwrap() = Some(spec.clone());
        let process = self
            .run
            .write()
            .unwrap()
            .take()
            .unwrap_or_else(|| MockProcess::running(Source::EchoServer));
        Ok(process)
    }

    fn is_command_available(&self) -> bool {
        self.record_command("is_available");
        true
    }
}

/// In-process service implementing the echo contract, used to exercise the
/// conformance suites without Docker. When given a collector port it also
/// reports a sample for every request it serves, the way a conforming
/// documenting library would.
pub struct FakeEchoServer {
    server: Arc<Server>,
    port: u16,
    worker: Mutex<Option<JoinHandle<()>>>,
    stopped: AtomicBool,
}

/// Which parts of the contract the fake deliberately violates.
#[derive(Debug, Clone, Copy, Default)]
pub struct FakeEchoBehavior {
    /// Ignore the `return-status` header and always answer 200.
    pub ignore_return_status: bool,
    /// Do not echo request headers back.
    pub drop_request_headers: bool,
}

impl FakeEchoServer {
    pub fn start(collector_port: Option<u16>) -> Self {
        Self::start_with(collector_port, FakeEchoBehavior::default())
    }

    pub fn start_with(collector_port: Option<u16>, behavior: FakeEchoBehavior) -> Self {
        let server = Arc::new(Server::http(("127.0.0.1", 0)).expect("binding fake echo server"));
        let port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .expect("fake echo server address");

        let worker = {
            let server = Arc::clone(&server);
            thread::spawn(move || {
                while let Ok(request) = server.recv() {
                    serve(request, collector_port, behavior);
                }
            })
        };

        Self {
            server,
            port,
            worker: Mutex::new(Some(worker)),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

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

impl Drop for FakeEchoServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn serve(mut request: tiny_http::Request, collector_port: Option<u16>, behavior: FakeEchoBehavior) {
    let method = request.method().as_str().to_string();
    let full_url = request.url().to_string();
    let (path, query) = match full_url.split_once('?') {
        Some((path, query)) => (path.to_string(), Some(query.to_string())),
        None => (full_url.clone(), None),
    };

    let mut headers: Vec<(String, String)> = Vec::new();
    for header in request.headers() {
        headers.push((
            header.field.as_str().as_str().to_lowercase(),
            header.value.as_str().to_string(),
        ));
    }

    let mut raw_body = String::new();
    let _ = request.as_reader().read_to_string(&mut raw_body);

    let header_value = |name: &str| {
        headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    };

    let status: u16 = if behavior.ignore_return_status {
        200
    } else {
        header_value("return-status")
            .and_then(|value| value.parse().ok())
            .unwrap_or(200)
    };

    let content_type = header_value("content-type").unwrap_or_default();
    let is_json = content_type.contains("application/json");

    let body_value: serde_json::Value = if raw_body.is_empty() {
        serde_json::json!({})
    } else if is_json {
        serde_json::from_str(&raw_body).unwrap_or(serde_json::Value::String(raw_body.clone()))
    } else {
        serde_json::Value::String(raw_body.clone())
    };

    // Report the sample before answering so a caller that drains the
    // collector right after receiving the response never races it.
    if let Some(port) = collector_port {
        let mut query_parameters = serde_json::Map::new();
        if let Some(query) = query {
            for pair in query.split('&') {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                let value = serde_json::Value::String(value.to_string());
                match query_parameters.entry(key.to_string()) {
                    serde_json::map::Entry::Vacant(slot) => {
                        slot.insert(value);
                    }
                    serde_json::map::Entry::Occupied(mut slot) => match slot.get_mut() {
                        serde_json::Value::Array(items) => items.push(value),
                        other => {
                            let first = other.take();
                            *other = serde_json::json!([first, value]);
                        }
                    },
                }
            }
        }

        let header_map: serde_json::Map<String, serde_json::Value> = headers
            .iter()
            .map(|(key, value)| (key.clone(), serde_json::Value::String(value.clone())))
            .collect();

        let reported_response_body = if status == 204 {
            serde_json::json!({})
        } else {
            body_value.clone()
        };
        let sample = serde_json::json!({
            "request": {
                "method": method,
                "url": path,
                "queryParameters": query_parameters,
                "headers": header_map,
                "body": body_value,
            },
            "response": {
                "statusCode": status.to_string(),
                "headers": {},
                "body": reported_response_body,
            }
        });

        let _ = reqwest::blocking::Client::new()
            .post(format!("http://localhost:{port}/samples"))
            .json(&sample)
            .send();
    }

    let response_body = if status == 204 { String::new() } else { raw_body };

    // from_data so no implicit content-type shadows the echoed one.
    let mut response = Response::from_data(response_body.into_bytes()).with_status_code(status);
    if !behavior.drop_request_headers {
        for (name, value) in &headers {
            if matches!(name.as_str(), "content-length" | "host" | "connection") {
                continue;
            }
            if let Ok(header) = Header::from_bytes(name.as_bytes(), value.as_bytes()) {
                response = response.with_header(header);
            }
        }
    }
    let _ = request.respond(response);
}
