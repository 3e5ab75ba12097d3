//! HTTP request parsing and representation.

use std::collections::HashMap;
use std::str::FromStr;
use serde::de::DeserializeOwned;

use crate::parser::error::Error;
use crate::parser::method::Method;
use crate::parser::version::HttpVersion;
use crate::router::Request;

/// Represents an HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The request target, including any query string
    pub path: String,
    /// The HTTP version
    pub version: HttpVersion,
    /// The HTTP headers
    pub headers: HashMap<String, String>,
    /// The request body
    pub body: Vec<u8>,
    /// Query parameters parsed from the path
    pub query_params: HashMap<String, String>,
}

impl HttpRequest {
    /// Create a new HTTP request with an empty body.
    pub fn new(method: Method, path: String, version: HttpVersion, headers: HashMap<String, String>) -> Self {
        let query_params = parse_query(&path);

        Self {
            method,
            path,
            version,
            headers,
            body: Vec::new(),
            query_params,
        }
    }

    /// Create a new HTTP request with a body.
    pub fn with_body(method: Method, path: String, version: HttpVersion, headers: HashMap<String, String>, body: Vec<u8>) -> Self {
        let mut request = Self::new(method, path, version, headers);
        request.body = body;
        request
    }

    /// Get a header value, ignoring the case of `name`.
    pub fn get_header(&self, name: &str) -> Option<&String> {
        self.headers
            .iter()
            .find_map(|(k, v)| k.eq_ignore_ascii_case(name).then_some(v))
    }

    /// Check if a header exists.
    pub fn has_header(&self, name: &str) -> bool {
        self.get_header(name).is_some()
    }

    /// Parse the request body as JSON.
    ///
    /// # Errors
    ///
    /// [`Error::MissingHeader`] if the request is not `application/json`,
    /// [`Error::JsonError`] if the body does not decode into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        if !self.is_json() {
            return Err(Error::MissingHeader("Content-Type: application/json".to_string()));
        }

        let json = serde_json::from_slice(&self.body)?;
        Ok(json)
    }

    /// Check if the Content-Type header is application/json.
    pub fn is_json(&self) -> bool {
        self.get_header("Content-Type")
            .is_some_and(|content_type| content_type.starts_with("application/json"))
    }

    /// The declared body length, if the header is present and numeric.
    pub fn content_length(&self) -> Option<usize> {
        self.get_header("Content-Length")?.parse().ok()
    }

    /// Get a query parameter value.
    pub fn get_query_param(&self, name: &str) -> Option<&String> {
        self.query_params.get(name)
    }

    /// Check if a query parameter exists.
    pub fn has_query_param(&self, name: &str) -> bool {
        self.query_params.contains_key(name)
    }
}

impl Request for HttpRequest {
    fn method(&self) -> &str {
        self.method.as_str()
    }

    fn uri(&self) -> &str {
        &self.path
    }
}

fn parse_query(path: &str) -> HashMap<String, String> {
    path.split_once('?')
        .map(|(_, query)| {
            query
                .split('&')
                .filter(|s| !s.is_empty())
                .map(|pair| match pair.split_once('=') {
                    Some((k, v)) => (k.to_string(), v.to_string()),
                    None => (pair.to_string(), String::new()),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Split raw input at the blank line ending the header section.
fn split_head(input: &[u8]) -> (&[u8], &[u8]) {
    for i in 0..input.len() {
        let rest = &input[i..];
        if rest.starts_with(b"\r\n\r\n") {
            return (&input[..i], &input[i + 4..]);
        }
        if rest.starts_with(b"\n\n") {
            return (&input[..i], &input[i + 2..]);
        }
    }
    (input, &[])
}

/// Parse an HTTP request from a byte slice.
///
/// The body is whatever follows the header section, cut to `Content-Length`
/// when that header is present.
///
/// # Errors
///
/// Returns a parser [`Error`] describing the first malformed part, or
/// [`Error::IncompleteBody`] when the input holds fewer body bytes than
/// `Content-Length` declares.
pub fn parse_request(input: &[u8]) -> Result<HttpRequest, Error> {
    let (head, body) = split_head(input);

    let head = std::str::from_utf8(head)
        .map_err(|_| Error::MalformedRequestLine("Invalid UTF-8".to_string()))?;

    let mut lines = head.lines();

    let request_line = match lines.next() {
        Some(line) => line,
        None => return Err(Error::EmptyRequest),
    };

    // METHOD TARGET VERSION
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(Error::MalformedRequestLine(request_line.to_string()));
    }

    let method = Method::from_str(parts[0])?;

    let path = parts[1].to_string();
    if path.is_empty() {
        return Err(Error::InvalidPath);
    }

    let version = HttpVersion::from_str(parts[2])?;

    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }

        let (name, value) = line.split_once(':').ok_or(Error::InvalidHeaderFormat)?;
        headers.insert(name.trim().to_string(), value.trim().to_string());
    }

    if version.requires_host() && !headers.keys().any(|k| k.eq_ignore_ascii_case("Host")) {
        return Err(Error::MissingHeader("Host".to_string()));
    }

    let mut request = HttpRequest::new(method, path, version, headers);
    let body_len = match request.content_length() {
        Some(expected) if expected > body.len() => {
            return Err(Error::IncompleteBody { expected, received: body.len() });
        }
        Some(expected) => expected,
        None => body.len(),
    };
    request.body = body[..body_len].to_vec();

    Ok(request)
}
