//! HTTP response framing.
use std::io::{self, Write};

const NOT_FOUND_PAGE: &[u8] = b"<html>  <head>    <title>Page Not Found</title>  </head>  \
<body>    <h1>Sorry that page doesn't exist</h1>  </body></html>";

/// Default reason phrase for a status code.
pub fn status_text(status_code: u16) -> &'static str {
    match status_code {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// An HTTP response.
///
/// # Example
/// ```
/// # use crvr::response::Response;
///
/// let response = Response::new(200)
///     .with_header("Content-Type", "text/plain")
///     .with_payload(b"Hello!".to_vec());
///
/// assert_eq!(
///     response.into_bytes(),
///     b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 6\r\n\r\nHello!".to_vec()
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status_code: u16,
    pub status: String,
    headers: Vec<(String, String)>,
    pub payload: Vec<u8>,
}

impl Response {
    /// Create a new Response. Status is set to the default reason phrase for
    /// the code (200 -> "OK", etc.)
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            status: status_text(status_code).to_string(),
            headers: vec![],
            payload: vec![],
        }
    }
    /// The page served when a requested resource does not exist.
    pub fn not_found() -> Self {
        Self::new(404)
            .with_header("Content-Type", "text/html")
            .with_payload(NOT_FOUND_PAGE.to_vec())
    }
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
    /// Change status.
    pub fn with_status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }
    /// Add header. `Content-Length` is always written from the payload and
    /// should not be added here.
    pub fn with_header(mut self, header: &str, value: &str) -> Self {
        self.headers.push((header.to_string(), value.to_string()));
        self
    }
    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }
    pub fn content_length(&self) -> usize {
        self.payload.len()
    }
    fn head(&self) -> Vec<u8> {
        let mut bytes: Vec<u8> = vec![];
        let status_line = format!("HTTP/1.1 {} {}\r\n", self.status_code, self.status);
        bytes.extend(status_line.into_bytes());
        for (header, value) in &self.headers {
            let header_line = format!("{}: {}\r\n", header, value);
            bytes.extend(header_line.into_bytes());
        }
        let content_length = format!("Content-Length: {}\r\n\r\n", self.content_length());
        bytes.extend(content_length.into_bytes());
        bytes
    }
    /// Write HTTP response bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        let mut bytes = self.head();
        bytes.extend(self.payload);
        bytes
    }
    /// Write the response to `writer` without copying the payload.
    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.head())?;
        writer.write_all(&self.payload)
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(200)
    }
}
