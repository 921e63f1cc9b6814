use crate::domain::ReadinessResult;
use std::net::{SocketAddr, TcpStream};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// How a readiness probe polls.
#[derive(Debug, Clone, Copy)]
pub struct ProbeOptions {
    pub timeout: Duration,
    pub interval: Duration,
    /// Suppresses per-attempt logging.
    pub quiet: bool,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            interval: Duration::from_millis(250),
            quiet: false,
        }
    }
}

/// Polls `localhost:{port}` until a TCP connection is accepted or the
/// window elapses.
pub fn wait_for_port(port: u16, options: ProbeOptions) -> ReadinessResult {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let started = Instant::now();
    let deadline = started + options.timeout;

    loop {
        if TcpStream::connect_timeout(&addr, options.interval).is_ok() {
            return ReadinessResult {
                open: true,
                elapsed: started.elapsed(),
            };
        }

        if !options.quiet {
            debug!("port {port} not open yet");
        }

        if Instant::now() + options.interval > deadline {
            return ReadinessResult {
                open: false,
                elapsed: started.elapsed(),
            };
        }
        thread::sleep(options.interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn fast_options() -> ProbeOptions {
        ProbeOptions {
            timeout: Duration::from_millis(400),
            interval: Duration::from_millis(20),
            quiet: true,
        }
    }

    #[test]
    fn reports_open_when_something_listens() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let result = wait_for_port(port, fast_options());

        assert!(result.open);
        assert!(result.elapsed < Duration::from_millis(400));
    }

    #[test]
    fn gives_up_after_the_window() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let started = Instant::now();
        let result = wait_for_port(port, fast_options());

        assert!(!result.open);
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
