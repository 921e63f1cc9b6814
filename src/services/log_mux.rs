use crate::domain::{Channel, ProcessHandle, Source};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

const BLUE: &str = "\x1b[34m";
const MAGENTA: &str = "\x1b[35m";
const GREEN: &str = "\x1b[32m";
const GREY: &str = "\x1b[90m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

fn color(source: Source) -> &'static str {
    match source {
        Source::DockerBuild => BLUE,
        Source::EchoServer => MAGENTA,
        Source::TestRunner => GREEN,
        Source::Helper => GREY,
    }
}

/// Tags and color-labels byte streams arriving from concurrent child
/// processes. One reader thread per stream keeps lines from the same
/// source and channel in arrival order; nothing is promised across
/// streams.
pub struct LogMux {
    sink: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl LogMux {
    pub fn new() -> Self {
        Self::with_sink(Box::new(io::stdout()))
    }

    pub fn with_sink(sink: Box<dyn Write + Send>) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
        }
    }

    /// A mux that swallows everything. Keeps tests quiet.
    pub fn discard() -> Self {
        Self::with_sink(Box::new(io::sink()))
    }

    /// Emits one labeled line on the stdout channel.
    pub fn line(&self, source: Source, message: &str) {
        self.write_line(source, Channel::Stdout, message);
    }

    /// Emits one labeled line rendered as an error.
    pub fn error_line(&self, source: Source, message: &str) {
        self.write_line(source, Channel::Stderr, message);
    }

    /// Subscribes to both output channels of a process. Reader threads run
    /// until the streams close; the returned handles can be joined to flush
    /// remaining output before reporting on the process.
    pub fn attach(&self, handle: &dyn ProcessHandle) -> Vec<JoinHandle<()>> {
        let mut readers = Vec::new();
        if let Some(out) = handle.take_stdout() {
            readers.push(self.attach_stream(handle.source(), Channel::Stdout, out));
        }
        if let Some(err) = handle.take_stderr() {
            readers.push(self.attach_stream(handle.source(), Channel::Stderr, err));
        }
        readers
    }

    /// Subscribes to a single stream under `source`/`channel`.
    pub fn attach_stream(
        &self,
        source: Source,
        channel: Channel,
        reader: Box<dyn Read + Send>,
    ) -> JoinHandle<()> {
        let sink = Arc::clone(&self.sink);
        thread::spawn(move || {
            let buffered = BufReader::new(reader);
            for line in buffered.lines() {
                let Ok(line) = line else {
                    break;
                };
                write_to(&sink, source, channel, &line);
            }
        })
    }

    fn write_line(&self, source: Source, channel: Channel, message: &str) {
        write_to(&self.sink, source, channel, message);
    }
}

impl Default for LogMux {
    fn default() -> Self {
        Self::new()
    }
}

fn write_to(
    sink: &Arc<Mutex<Box<dyn Write + Send>>>,
    source: Source,
    channel: Channel,
    message: &str,
) {
    let message = message.trim();
    if message.is_empty() {
        return;
    }

    let tag_color = color(source);
    let label = source.label();
    let rendered = match channel {
        Channel::Stdout => format!("{tag_color}[{label}]{RESET} {message}\n"),
        Channel::Stderr => format!("{tag_color}[{label}]{RESET} {RED}{message}{RESET}\n"),
    };

    let Ok(mut sink) = sink.lock() else {
        return;
    };
    let _ = sink.write_all(rendered.as_bytes());
    let _ = sink.flush();
}
