//! Opening HTTP/1.1 Upgrade handshake (RFC 6455 Section 4).
//!
//! One-shot, line-based request/response exchange performed by the
//! connecting thread before any frame traffic.

use std::io::{BufRead, Write};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use sha1::{Digest, Sha1};
use url::Url;

use crate::error::{Error, Result};

/// The GUID appended to the client key in the `Sec-WebSocket-Accept`
/// calculation (RFC 6455 Section 1.3).
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Sub-protocol advertised in every upgrade request.
const ADVERTISED_PROTOCOL: &str = "chat";

/// Compute the expected `Sec-WebSocket-Accept` value for a client key:
/// `base64(SHA-1(key || GUID))`.
///
/// # Example
///
/// ```
/// use wsclient::protocol::compute_accept_key;
///
/// let accept = compute_accept_key("dGhlIHNhbXBsZSBub25jZQ==");
/// assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
#[must_use]
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// Write the upgrade request for `uri` with the given handshake key.
///
/// The request line carries the URI's path (`/` when absent), `Host`
/// carries the bare host, and `Origin` the full URI. The writer is
/// flushed so the request hits the wire before the response is awaited.
pub(crate) fn write_upgrade_request<W: Write>(
    writer: &mut W,
    uri: &Url,
    key: &str,
) -> std::io::Result<()> {
    let host = uri.host_str().unwrap_or_default();
    write!(writer, "GET {} HTTP/1.1\r\n", uri.path())?;
    write!(writer, "Upgrade: websocket\r\n")?;
    write!(writer, "Connection: Upgrade\r\n")?;
    write!(writer, "Host: {host}\r\n")?;
    write!(writer, "Origin: {uri}\r\n")?;
    write!(writer, "Sec-WebSocket-Key: {key}\r\n")?;
    write!(writer, "Sec-WebSocket-Protocol: {ADVERTISED_PROTOCOL}\r\n")?;
    write!(writer, "Sec-WebSocket-Version: 13\r\n")?;
    write!(writer, "\r\n")?;
    writer.flush()
}

/// Read and validate the server's upgrade response.
///
/// The status line must be `HTTP/1.1` with code 101. Header names are
/// case-insensitive. `Sec-WebSocket-Accept` must appear exactly once
/// and match [`compute_accept_key`] of the sent key. A response that
/// selects the `chat` sub-protocol is rejected.
///
/// # Errors
///
/// - [`Error::WrongResponse`] for any malformed or non-conforming
///   response.
/// - [`Error::Io`] if the stream fails or ends mid-response.
pub(crate) fn read_upgrade_response<R: BufRead>(reader: &mut R, key: &str) -> Result<()> {
    let status_line = read_line(reader)?;
    verify_status_line(&status_line)?;

    let mut accept: Option<String> = None;
    let mut protocol: Option<String> = None;
    loop {
        let line = read_line(reader)?;
        if line.is_empty() {
            break;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| Error::WrongResponse(format!("malformed header line `{line}`")))?;
        let name = name.trim();
        let value = value.trim();
        if name.eq_ignore_ascii_case("sec-websocket-accept") {
            if accept.is_some() {
                return Err(Error::WrongResponse(
                    "Sec-WebSocket-Accept should appear once".into(),
                ));
            }
            accept = Some(value.to_string());
        } else if name.eq_ignore_ascii_case("sec-websocket-protocol") {
            protocol = Some(value.to_string());
        }
    }

    let accept = accept.ok_or_else(|| {
        Error::WrongResponse("Sec-WebSocket-Accept did not appear".into())
    })?;
    if accept != compute_accept_key(key) {
        return Err(Error::WrongResponse("Sec-WebSocket-Accept is wrong".into()));
    }
    if protocol.as_deref() == Some(ADVERTISED_PROTOCOL) {
        return Err(Error::WrongResponse(format!(
            "server selected unsupported sub-protocol `{ADVERTISED_PROTOCOL}`"
        )));
    }
    Ok(())
}

fn verify_status_line(line: &str) -> Result<()> {
    if line.is_empty() {
        return Err(Error::WrongResponse("wrong HTTP response status line".into()));
    }
    let mut parts = line.split_whitespace();
    let version = parts.next().unwrap_or_default();
    let code = parts.next().unwrap_or_default();
    if version != "HTTP/1.1" {
        return Err(Error::WrongResponse(format!(
            "wrong HTTP version in `{line}`"
        )));
    }
    match code.parse::<u16>() {
        Ok(101) => Ok(()),
        Ok(_) => Err(Error::WrongResponse("wrong http response status".into())),
        Err(_) => Err(Error::WrongResponse(format!(
            "malformed status line `{line}`"
        ))),
    }
}

/// Read one CRLF-terminated line, without its terminator.
fn read_line<R: BufRead>(reader: &mut R) -> Result<String> {
    let mut buf = Vec::new();
    let n = reader.read_until(b'\n', &mut buf)?;
    if n == 0 {
        return Err(Error::Io("unexpected end of stream".into()));
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    String::from_utf8(buf)
        .map_err(|_| Error::WrongResponse("response is not valid utf-8".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const KEY: &str = "dGhlIHNhbXBsZSBub25jZQ==";
    const ACCEPT: &str = "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=";

    fn parse(response: &str) -> Result<()> {
        read_upgrade_response(&mut Cursor::new(response.as_bytes()), KEY)
    }

    #[test]
    fn test_accept_key_rfc_example() {
        // RFC 6455 Section 1.3 vector.
        assert_eq!(compute_accept_key(KEY), ACCEPT);
    }

    #[test]
    fn test_request_format() {
        let uri = Url::parse("ws://server.example.com/chat").unwrap();
        let mut buf = Vec::new();
        write_upgrade_request(&mut buf, &uri, KEY).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.starts_with("GET /chat HTTP/1.1\r\n"));
        assert!(text.contains("Upgrade: websocket\r\n"));
        assert!(text.contains("Connection: Upgrade\r\n"));
        assert!(text.contains("Host: server.example.com\r\n"));
        assert!(text.contains("Origin: ws://server.example.com/chat\r\n"));
        assert!(text.contains(&format!("Sec-WebSocket-Key: {KEY}\r\n")));
        assert!(text.contains("Sec-WebSocket-Protocol: chat\r\n"));
        assert!(text.contains("Sec-WebSocket-Version: 13\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_request_path_defaults_to_root() {
        let uri = Url::parse("ws://server.example.com").unwrap();
        let mut buf = Vec::new();
        write_upgrade_request(&mut buf, &uri, KEY).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("GET / HTTP/1.1\r\n"));
    }

    #[test]
    fn test_parse_valid_response() {
        let response = format!(
            "HTTP/1.1 101 Switching Protocols\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Accept: {ACCEPT}\r\n\
             \r\n"
        );
        assert!(parse(&response).is_ok());
    }

    #[test]
    fn test_parse_case_insensitive_headers() {
        let response = format!(
            "HTTP/1.1 101 Switching Protocols\r\n\
             SEC-WEBSOCKET-ACCEPT: {ACCEPT}\r\n\
             \r\n"
        );
        assert!(parse(&response).is_ok());
    }

    #[test]
    fn test_rejects_non_101_status() {
        let response = "HTTP/1.1 200 OK\r\n\r\n";
        assert!(matches!(
            parse(response),
            Err(Error::WrongResponse(msg)) if msg.contains("status")
        ));
    }

    #[test]
    fn test_rejects_wrong_http_version() {
        let response = format!(
            "HTTP/1.0 101 Switching Protocols\r\n\
             Sec-WebSocket-Accept: {ACCEPT}\r\n\
             \r\n"
        );
        assert!(matches!(
            parse(&response),
            Err(Error::WrongResponse(msg)) if msg.contains("version")
        ));
    }

    #[test]
    fn test_rejects_missing_accept() {
        let response = "HTTP/1.1 101 Switching Protocols\r\n\
                        Upgrade: websocket\r\n\
                        \r\n";
        assert!(matches!(
            parse(response),
            Err(Error::WrongResponse(msg)) if msg.contains("did not appear")
        ));
    }

    #[test]
    fn test_rejects_duplicate_accept() {
        let response = format!(
            "HTTP/1.1 101 Switching Protocols\r\n\
             Sec-WebSocket-Accept: {ACCEPT}\r\n\
             Sec-WebSocket-Accept: {ACCEPT}\r\n\
             \r\n"
        );
        assert!(matches!(
            parse(&response),
            Err(Error::WrongResponse(msg)) if msg.contains("once")
        ));
    }

    #[test]
    fn test_rejects_wrong_accept_value() {
        let response = "HTTP/1.1 101 Switching Protocols\r\n\
                        Sec-WebSocket-Accept: bm90IHRoZSByaWdodCBoYXNo\r\n\
                        \r\n";
        assert!(matches!(
            parse(response),
            Err(Error::WrongResponse(msg)) if msg.contains("wrong")
        ));
    }

    #[test]
    fn test_rejects_chat_subprotocol() {
        let response = format!(
            "HTTP/1.1 101 Switching Protocols\r\n\
             Sec-WebSocket-Accept: {ACCEPT}\r\n\
             Sec-WebSocket-Protocol: chat\r\n\
             \r\n"
        );
        assert!(matches!(
            parse(&response),
            Err(Error::WrongResponse(msg)) if msg.contains("sub-protocol")
        ));
    }

    #[test]
    fn test_accepts_other_subprotocol() {
        let response = format!(
            "HTTP/1.1 101 Switching Protocols\r\n\
             Sec-WebSocket-Accept: {ACCEPT}\r\n\
             Sec-WebSocket-Protocol: superchat\r\n\
             \r\n"
        );
        assert!(parse(&response).is_ok());
    }

    #[test]
    fn test_rejects_malformed_header_line() {
        let response = "HTTP/1.1 101 Switching Protocols\r\n\
                        this is not a header\r\n\
                        \r\n";
        assert!(matches!(
            parse(response),
            Err(Error::WrongResponse(msg)) if msg.contains("malformed header")
        ));
    }

    #[test]
    fn test_truncated_response_is_io_error() {
        let response = "HTTP/1.1 101 Switching Protocols\r\n";
        assert!(matches!(parse(response), Err(Error::Io(_))));
    }

    #[test]
    fn test_bare_lf_lines_accepted() {
        let response = format!(
            "HTTP/1.1 101 Switching Protocols\n\
             Sec-WebSocket-Accept: {ACCEPT}\n\
             \n"
        );
        assert!(parse(&response).is_ok());
    }
}
