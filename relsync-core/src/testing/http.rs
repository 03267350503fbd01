//! Minimal HTTP/1.1 server for exercising real clients.
//!
//! Each stub runs on its own thread, answers a fixed number of connections
//! (one request per connection, `Connection: close`) and records what it
//! received.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::JoinHandle;
use std::time::Duration;

/// One request as seen by an [`HttpStub`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordedRequest {
    /// e.g. `GET /repos/acme/api/pulls?state=open HTTP/1.1`
    pub request_line: String,
    pub method: String,
    /// Path plus query string.
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Target without the query string.
    pub fn path(&self) -> &str {
        self.target
            .split_once('?')
            .map_or(self.target.as_str(), |(path, _)| path)
    }
}

/// A local HTTP server on an ephemeral port.
#[derive(Debug)]
pub struct HttpStub {
    url: String,
    handle: JoinHandle<Vec<RecordedRequest>>,
}

impl HttpStub {
    /// Answer `requests` connections, each with whatever `route` returns as
    /// `(status, json body)`.
    pub fn routed<F>(requests: usize, mut route: F) -> io::Result<Self>
    where
        F: FnMut(&RecordedRequest) -> (u16, String) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let url = format!("http://{}", listener.local_addr()?);
        let handle = std::thread::spawn(move || {
            let mut recorded = Vec::with_capacity(requests);
            for _ in 0..requests {
                let Ok((stream, _)) = listener.accept() else {
                    break;
                };
                match serve(stream, &mut route) {
                    Ok(request) => recorded.push(request),
                    Err(err) => {
                        tracing::debug!(error = %err, "stub connection failed");
                        break;
                    }
                }
            }
            recorded
        });
        Ok(Self { url, handle })
    }

    /// Answer one connection per scripted `(status, body)` pair, in order.
    pub fn scripted(script: Vec<(u16, String)>) -> io::Result<Self> {
        let requests = script.len();
        let mut script = script.into_iter();
        Self::routed(requests, move |_| {
            script
                .next()
                .unwrap_or_else(|| (500, r#"{"message":"script exhausted"}"#.to_owned()))
        })
    }

    /// Accept one connection and hold it open for `hold` without answering.
    pub fn stalled(hold: Duration) -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let url = format!("http://{}", listener.local_addr()?);
        let handle = std::thread::spawn(move || {
            if let Ok((stream, _)) = listener.accept() {
                std::thread::sleep(hold);
                drop(stream);
            }
            Vec::new()
        });
        Ok(Self { url, handle })
    }

    /// Base URL, without a trailing slash.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Wait for the stub to answer all its connections and return what it
    /// recorded.
    pub fn finish(self) -> Vec<RecordedRequest> {
        self.handle.join().unwrap_or_default()
    }
}

fn serve<F>(stream: TcpStream, route: &mut F) -> io::Result<RecordedRequest>
where
    F: FnMut(&RecordedRequest) -> (u16, String),
{
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    let request_line = request_line.trim_end().to_owned();

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_owned(), value.trim().to_owned()));
        }
    }

    let mut request = RecordedRequest {
        method: request_line
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_owned(),
        target: request_line
            .split_whitespace()
            .nth(1)
            .unwrap_or_default()
            .to_owned(),
        request_line,
        headers,
        body: String::new(),
    };
    let length = request
        .header("content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body)?;
    request.body = String::from_utf8_lossy(&body).into_owned();

    let (status, body) = route(&request);
    let response = format!(
        "HTTP/1.1 {status} STUB\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    reader.into_inner().write_all(response.as_bytes())?;
    Ok(request)
}
