//! Minimal HTTP/1.1 server serving paginated result XML for integration tests.
//!
//! Serves a fixed roster. Answers GET with `posStart`/`count` query
//! parameters with a dhtmlx-grid page; failures can be scripted per
//! offset. Records every request so tests can assert attempt counts.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone)]
pub struct TestRow {
    pub pos: u32,
    pub time: String,
    pub name: String,
    pub team: String,
}

pub fn row(pos: u32, time: &str, name: &str) -> TestRow {
    TestRow {
        pos,
        time: time.to_string(),
        name: name.to_string(),
        team: "AC".to_string(),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResultsServerOptions {
    /// Requests for this posStart fail with HTTP 500 while their count is
    /// at or below `fail_times` (u32::MAX = always).
    pub fail_pos_start: Option<u64>,
    pub fail_times: u32,
    /// Omit the total_count attribute from every response.
    pub omit_total: bool,
}

pub struct ResultsServer {
    /// Base endpoint, e.g. "http://127.0.0.1:12345".
    pub endpoint: String,
    /// (posStart, count) -> number of requests seen.
    pub hits: Arc<Mutex<HashMap<(u64, u64), u32>>>,
}

/// Starts a server in a background thread serving `rows`. The server runs
/// until the process exits.
pub fn start(rows: Vec<TestRow>, opts: ResultsServerOptions) -> ResultsServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let rows = Arc::new(rows);
    let hits: Arc<Mutex<HashMap<(u64, u64), u32>>> = Arc::new(Mutex::new(HashMap::new()));

    let accept_hits = Arc::clone(&hits);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let rows = Arc::clone(&rows);
            let hits = Arc::clone(&accept_hits);
            thread::spawn(move || handle(stream, &rows, opts, &hits));
        }
    });

    ResultsServer {
        endpoint: format!("http://127.0.0.1:{}", port),
        hits,
    }
}

fn handle(
    mut stream: std::net::TcpStream,
    rows: &[TestRow],
    opts: ResultsServerOptions,
    hits: &Mutex<HashMap<(u64, u64), u32>>,
) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
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

    let Some((pos_start, count)) = parse_request(request) else {
        let _ = stream.write_all(b"HTTP/1.1 400 Bad Request\r\n\r\n");
        return;
    };

    let seen = {
        let mut hits = hits.lock().unwrap();
        let entry = hits.entry((pos_start, count)).or_insert(0);
        *entry += 1;
        *entry
    };

    if opts.fail_pos_start == Some(pos_start) && seen <= opts.fail_times {
        let _ = stream.write_all(b"HTTP/1.1 500 Internal Server Error\r\n\r\n");
        return;
    }

    let body = page_xml(rows, pos_start, count, opts.omit_total);
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/xml\r\nContent-Length: {}\r\n\r\n",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.write_all(body.as_bytes());
}

fn page_xml(rows: &[TestRow], pos_start: u64, count: u64, omit_total: bool) -> String {
    let total_attr = if omit_total {
        String::new()
    } else {
        format!(" total_count=\"{}\"", rows.len())
    };
    let mut body = format!("<rows{} pos=\"{}\">", total_attr, pos_start);

    let start = (pos_start as usize).min(rows.len());
    let end = (start + count as usize).min(rows.len());
    for row in &rows[start..end] {
        body.push_str(&format!(
            "<row id=\"{}\"><cell class=\"grid_pos\">{}</cell>\
<cell class=\"grid_time\">{}</cell>\
<cell class=\"grid_name\">{}</cell>\
<cell class=\"grid_team\">{}</cell></row>",
            row.pos, row.pos, row.time, row.name, row.team
        ));
    }
    body.push_str("</rows>");
    body
}

/// Returns (posStart, count) from "GET /ss/results/data/<id>/?posStart=X&count=Y".
fn parse_request(request: &str) -> Option<(u64, u64)> {
    let first_line = request.lines().next()?;
    let mut parts = first_line.split_whitespace();
    if parts.next()? != "GET" {
        return None;
    }
    let path = parts.next()?;
    let query = path.split_once('?')?.1;

    let mut pos_start = None;
    let mut count = None;
    for pair in query.split('&') {
        let (key, value) = pair.split_once('=')?;
        match key {
            "posStart" => pos_start = value.parse::<u64>().ok(),
            "count" => count = value.parse::<u64>().ok(),
            _ => {}
        }
    }
    Some((pos_start?, count?))
}
