//! Fake JSON-RPC node for client tests.
//!
//! Serves one canned HTTP response per connection on an ephemeral port and
//! records each request body so tests can inspect the JSON-RPC envelope.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use serde_json::Value;

/// HTTP status and body returned for one request.
#[derive(Debug, Clone)]
pub struct CannedResponse {
    status: u16,
    body: String,
}

impl CannedResponse {
    /// A `200 OK` carrying a JSON-RPC result.
    pub fn result(result: Value) -> Self {
        Self::json(&serde_json::json!({"jsonrpc": "2.0", "id": 1, "result": result}))
    }

    /// A `200 OK` carrying a JSON-RPC error object.
    pub fn error(code: i64, message: &str) -> Self {
        Self::json(&serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": code, "message": message},
        }))
    }

    /// A `200 OK` with an arbitrary JSON body.
    pub fn json(body: &Value) -> Self {
        Self::raw(200, body.to_string())
    }

    /// An arbitrary status and body.
    pub fn raw(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// A node stand-in that answers a fixed sequence of requests.
pub struct FakeNode {
    port: u16,
    requests: Arc<Mutex<Vec<Value>>>,
    result: Arc<Mutex<Option<Result<()>>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FakeNode {
    /// Spawns a node that serves `responses` in order, one per connection.
    pub fn spawn(responses: Vec<CannedResponse>) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake node")?;
        listener
            .set_nonblocking(true)
            .context("fake node nonblocking")?;
        let port = listener.local_addr().context("local addr")?.port();
        let requests: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
        let result: Arc<Mutex<Option<Result<()>>>> = Arc::new(Mutex::new(None));
        let requests_clone = Arc::clone(&requests);
        let result_clone = Arc::clone(&result);
        let handle = thread::spawn(move || {
            let outcome = Self::serve(&listener, &responses, &requests_clone);
            if let Ok(mut guard) = result_clone.lock() {
                *guard = Some(outcome);
            }
        });
        Ok(Self {
            port,
            requests,
            result,
            handle: Some(handle),
        })
    }

    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Waits for the server thread and returns the recorded request bodies.
    pub fn take_requests(&mut self) -> Result<Vec<Value>> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("fake node thread panicked"))?;
        }
        if let Some(outcome) = self
            .result
            .lock()
            .map_err(|error| anyhow!("lock fake node result: {error}"))?
            .take()
        {
            outcome.context("fake node failed")?;
        }
        let requests = self
            .requests
            .lock()
            .map_err(|error| anyhow!("lock requests: {error}"))?;
        Ok(requests.clone())
    }

    fn serve(
        listener: &TcpListener,
        responses: &[CannedResponse],
        requests: &Arc<Mutex<Vec<Value>>>,
    ) -> Result<()> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut pending = responses.iter();
        let Some(mut next) = pending.next() else {
            return Ok(());
        };
        loop {
            match listener.accept() {
                Ok((stream, _)) => {
                    stream
                        .set_nonblocking(false)
                        .context("blocking client stream")?;
                    let body = read_request_body(&stream)?;
                    requests
                        .lock()
                        .map_err(|error| anyhow!("lock requests: {error}"))?
                        .push(serde_json::from_slice(&body).context("request is not JSON")?);
                    write_response(stream, next).context("write response")?;
                    match pending.next() {
                        Some(response) => next = response,
                        None => return Ok(()),
                    }
                }
                Err(ref error)
                    if error.kind() == io::ErrorKind::WouldBlock && Instant::now() < deadline =>
                {
                    thread::sleep(Duration::from_millis(10));
                }
                Err(ref error) if error.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(error) => return Err(error).context("accept connection"),
            }
        }
    }
}

impl Drop for FakeNode {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn read_request_body(stream: &TcpStream) -> Result<Vec<u8>> {
    let mut reader = BufReader::new(stream.try_clone().context("clone stream")?);
    let mut content_length = 0_usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).context("read header")? == 0 {
            break;
        }
        let header = line.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().context("parse content length")?;
            }
        }
    }
    let mut body = vec![0_u8; content_length];
    reader.read_exact(&mut body).context("read body")?;
    Ok(body)
}

fn write_response(mut stream: TcpStream, response: &CannedResponse) -> io::Result<()> {
    let head = format!(
        "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        response.body.len()
    );
    stream.write_all(head.as_bytes())?;
    stream.write_all(response.body.as_bytes())?;
    stream.flush()
}
