//! Minimal HTTP/1.1 server that supports HEAD and Range GET for integration tests.
//!
//! Serves a single static body. Responds to HEAD with Content-Length and
//! Accept-Ranges: bytes; responds to GET with Range with 206 Partial Content.
//! Faults (missing length, ignored ranges, transient 503s, bodies cut short,
//! a slow HEAD) are opt-in.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RangeServerOptions {
    /// If false, HEAD returns 405 (simulates servers that block HEAD).
    pub head_allowed: bool,
    /// If false, HEAD omits Content-Length.
    pub report_length: bool,
    /// If false, GET ignores Range and always returns 200 with the full body.
    pub support_ranges: bool,
    /// GETs whose range starts here are answered 200 with the full body.
    pub ignore_range_from: Option<u64>,
    /// The first N GETs are answered 503.
    pub fail_first_gets: usize,
    /// The next N GETs announce the full Content-Length, send only the
    /// first half of the body and close the connection.
    pub truncate_first_gets: usize,
    /// HEAD answers are delayed by this long.
    pub head_delay: Option<Duration>,
}

impl Default for RangeServerOptions {
    fn default() -> Self {
        Self {
            head_allowed: true,
            report_length: true,
            support_ranges: true,
            ignore_range_from: None,
            fail_first_gets: 0,
            truncate_first_gets: 0,
            head_delay: None,
        }
    }
}

pub struct RangeServer {
    /// Base URL, e.g. "http://127.0.0.1:12345/".
    pub url: String,
    gets: Arc<AtomicUsize>,
}

impl RangeServer {
    /// Number of GET requests received so far.
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

/// Starts a server in a background thread serving `body`. Returns the base URL.
/// The server runs until the process exits.
pub fn start(body: Vec<u8>) -> String {
    start_with_options(body, RangeServerOptions::default()).url
}

/// Like `start` but allows customizing server behavior.
pub fn start_with_options(body: Vec<u8>, opts: RangeServerOptions) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let gets = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&gets);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let counter = Arc::clone(&counter);
            thread::spawn(move || handle(stream, &body, opts, &counter));
        }
    });
    RangeServer {
        url: format!("http://127.0.0.1:{}/", port),
        gets,
    }
}

fn handle(mut stream: std::net::TcpStream, body: &[u8], opts: RangeServerOptions, gets: &AtomicUsize) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, range) = parse_request(request);
    let total = body.len() as u64;

    if method.eq_ignore_ascii_case("HEAD") {
        if let Some(delay) = opts.head_delay {
            thread::sleep(delay);
        }
        if !opts.head_allowed {
            let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
            return;
        }
        let length = if opts.report_length {
            format!("Content-Length: {}\r\n", total)
        } else {
            String::new()
        };
        let accept_ranges = if opts.support_ranges { "Accept-Ranges: bytes\r\n" } else { "" };
        let response = format!(
            "HTTP/1.1 200 OK\r\n{}{}Content-Type: video/mp4\r\nConnection: close\r\n\r\n",
            length, accept_ranges
        );
        let _ = stream.write_all(response.as_bytes());
        return;
    }

    if method.eq_ignore_ascii_case("GET") {
        let seen = gets.fetch_add(1, Ordering::SeqCst);
        if seen < opts.fail_first_gets {
            let _ = stream.write_all(
                b"HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            );
            return;
        }
        let honour = opts.support_ranges
            && range.map_or(false, |(start, _)| Some(start) != opts.ignore_range_from);
        let (status, slice) = match range {
            Some((start, end_incl)) if honour => {
                let start = start.min(total);
                let end_incl = end_incl.min(total.saturating_sub(1));
                if start > end_incl {
                    ("416 Range Not Satisfiable", &body[0..0])
                } else {
                    let end_excl = (end_incl + 1).min(total) as usize;
                    ("206 Partial Content", &body[start as usize..end_excl])
                }
            }
            _ => ("200 OK", body),
        };
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            slice.len()
        );
        let _ = stream.write_all(response.as_bytes());
        if seen < opts.fail_first_gets + opts.truncate_first_gets {
            let _ = stream.write_all(&slice[..slice.len() / 2]);
            let _ = stream.shutdown(std::net::Shutdown::Both);
            return;
        }
        let _ = stream.write_all(slice);
        return;
    }
    let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
}

/// Returns (method, optional (start, end_inclusive) for Range: bytes=X-Y).
fn parse_request(request: &str) -> (&str, Option<(u64, u64)>) {
    let mut method = "";
    let mut range = None;
    for line in request.lines() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if method.is_empty() {
            method = line.split_whitespace().next().unwrap_or("");
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                let value = value.trim();
                if value.to_lowercase().starts_with("bytes=") {
                    if let Some((a, b)) = value[6..].trim().split_once('-') {
                        let start = a.trim().parse::<u64>().unwrap_or(0);
                        let end = b.trim();
                        let end_incl = if end.is_empty() {
                            u64::MAX
                        } else {
                            end.parse::<u64>().unwrap_or(0)
                        };
                        range = Some((start, end_incl));
                    }
                }
            }
        }
    }
    (method, range)
}
