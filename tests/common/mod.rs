//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use module_pipeline::config::ListenerConfig;
use module_pipeline::{Flow, Module, ModuleError, Options, Pipeline, PipelineServer, Registrar, Request, Response, Shutdown, Stage};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// Shared log of which module ran, in order.
pub type Trace = Arc<Mutex<Vec<String>>>;

/// Test module that records its label, optionally writes a status and
/// optionally halts the pipeline.
pub struct Recorder {
    label: String,
    stage: Stage,
    trace: Trace,
    status: Option<(u16, &'static str)>,
    halt: bool,
}

#[allow(dead_code)]
impl Recorder {
    pub fn new(label: &str, stage: Stage, trace: &Trace) -> Self {
        Self {
            label: label.to_string(),
            stage,
            trace: Arc::clone(trace),
            status: None,
            halt: false,
        }
    }

    pub fn responding(mut self, status: u16, reason: &'static str) -> Self {
        self.status = Some((status, reason));
        self
    }

    pub fn halting(mut self) -> Self {
        self.halt = true;
        self
    }
}

impl Module for Recorder {
    fn name(&self) -> &str {
        &self.label
    }

    fn start(self: Arc<Self>, registrar: &Registrar<'_>, _options: &Options) -> Result<(), ModuleError> {
        let stage = self.stage;
        registrar.hook(self, stage)?;
        Ok(())
    }

    fn stop(&self) -> Result<(), ModuleError> {
        Ok(())
    }

    fn handle_request(&self, _request: &Request, response: &mut Response) -> Flow {
        self.trace.lock().unwrap().push(self.label.clone());
        if let Some((status, reason)) = self.status {
            response.set_status(status, reason);
            response.append_body(format!("[{}]", self.label));
        }
        if self.halt {
            Flow::Halt
        } else {
            Flow::Continue
        }
    }
}

pub fn new_trace() -> Trace {
    Arc::new(Mutex::new(Vec::new()))
}

#[allow(dead_code)]
pub fn snapshot(trace: &Trace) -> Vec<String> {
    trace.lock().unwrap().clone()
}

/// Serve `pipeline` on an ephemeral port. The server stops when the
/// returned `Shutdown` is triggered.
#[allow(dead_code)]
pub async fn spawn_server(pipeline: Arc<Pipeline>) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let (_, config_updates) = mpsc::unbounded_channel();
    let server = PipelineServer::new(pipeline, &ListenerConfig::default());

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr, shutdown)
}

/// Send a raw HTTP/1.1 request and return the full response text, so the
/// status line can be checked verbatim.
#[allow(dead_code)]
pub async fn raw_request(addr: SocketAddr, method: &str, path: &str) -> String {
    let mut socket = TcpStream::connect(addr).await.unwrap();
    let request = format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    socket.write_all(request.as_bytes()).await.unwrap();

    let mut buf = Vec::new();
    socket.read_to_end(&mut buf).await.unwrap();
    String::from_utf8_lossy(&buf).into_owned()
}
