//! Minimal HTTP/1.1 handling for the trigger listener

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use mailsheet::TriggerRequest;

/// Bodies larger than this are refused
const MAX_BODY_BYTES: usize = 64 * 1024;

/// How long a client may take to send its request or accept the reply
pub const IO_TIMEOUT: Duration = Duration::from_secs(10);

/// Bound every read and write on `stream` by `timeout`
pub fn set_timeouts(stream: &TcpStream, timeout: Duration) -> Result<()> {
    stream
        .set_read_timeout(Some(timeout))
        .context("Failed to set read timeout")?;
    stream
        .set_write_timeout(Some(timeout))
        .context("Failed to set write timeout")
}

/// Read one request from `reader` into a [`TriggerRequest`]
pub fn read_request<R: Read>(reader: R) -> Result<TriggerRequest> {
    let mut reader = BufReader::new(reader);

    let mut request_line = String::new();
    reader
        .read_line(&mut request_line)
        .context("Failed to read request line")?;

    // POST /trigger?action=ping HTTP/1.1
    let target = request_line
        .split_whitespace()
        .nth(1)
        .context("Malformed request line")?;
    let query = target.split_once('?').map(|(_, q)| q).unwrap_or_default();
    let params: HashMap<String, String> = url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).context("Failed to read header")? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    let header = |name: &str| {
        headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    };

    let length: usize = header("content-length")
        .map(|v| v.parse())
        .transpose()
        .context("Invalid Content-Length")?
        .unwrap_or(0);
    if length > MAX_BODY_BYTES {
        anyhow::bail!("Request body too large ({} bytes)", length);
    }

    let mut body = vec![0; length];
    reader.read_exact(&mut body).context("Failed to read body")?;

    Ok(TriggerRequest {
        content_type: header("content-type"),
        headers,
        params,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

/// Write a JSON response and close the exchange
pub fn write_json(stream: &mut TcpStream, status: &str, json: &str) -> Result<()> {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        json.len(),
        json
    );
    stream
        .write_all(response.as_bytes())
        .context("Failed to write response")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_query_request() {
        let raw = "GET /?action=ping&token=a%20b HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let req = read_request(raw.as_bytes()).unwrap();
        assert_eq!(req.params.get("action").map(String::as_str), Some("ping"));
        assert_eq!(req.token().as_deref(), Some("a b"));
        assert!(req.body.is_empty());
    }

    #[test]
    fn test_read_json_post() {
        let body = r#"{"token":"t","action":"incremental"}"#;
        let raw = format!(
            "POST /trigger HTTP/1.1\r\nX-Run-Token: hdr\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        let req = read_request(raw.as_bytes()).unwrap();
        assert_eq!(req.content_type.as_deref(), Some("application/json"));
        assert_eq!(req.body, body);
        // Header wins over the body
        assert_eq!(req.token().as_deref(), Some("hdr"));
        assert_eq!(req.action_name().as_deref(), Some("incremental"));
    }

    #[test]
    fn test_truncated_body_is_an_error() {
        let raw = "POST / HTTP/1.1\r\nContent-Length: 50\r\n\r\n{\"token\":";
        assert!(read_request(raw.as_bytes()).is_err());
    }

    #[test]
    fn test_idle_client_times_out() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let _client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, _) = listener.accept().unwrap();

        set_timeouts(&server, Duration::from_millis(50)).unwrap();
        let started = std::time::Instant::now();
        assert!(read_request(&server).is_err());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_rejects_oversized_body() {
        let raw = format!("POST / HTTP/1.1\r\nContent-Length: {}\r\n\r\n", MAX_BODY_BYTES + 1);
        assert!(read_request(raw.as_bytes()).is_err());
    }
}
