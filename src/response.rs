//! Outgoing HTTP response type.
//!
//! One [`Response`] exists per request. Handlers mutate it through the
//! [`Context`](crate::Context); the engine finalises it and hands it to the
//! transport. It is a plain value: no I/O happens here.

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::StatusCode;
use http_body_util::Full;
use serde::Serialize;
use tracing::warn;

use crate::error::Error;
use crate::status::Status;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Content-type values wren sets on its own.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentType {
    Html,  // text/html
    Json,  // application/json
    Text,  // text/plain; charset=utf-8
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Html => "text/html",
            Self::Json => "application/json",
            Self::Text => "text/plain; charset=utf-8",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// Defaults to `200`, an empty body and `Content-Type: text/plain;
/// charset=utf-8`.
///
/// ```rust
/// use wren::{Response, Status};
///
/// let mut res = Response::new();
/// res.write("Hello");
/// res.write(", world");
/// assert_eq!(res.body, "Hello, world");
/// assert_eq!(res.status_line().unwrap(), "200 OK");
///
/// res.set_status(Status::Created);
/// assert_eq!(res.code, 201);
/// ```
#[derive(Clone, Debug)]
pub struct Response {
    pub code: u16,
    pub body: String,
    headers: Vec<(String, String)>,
}

impl Response {
    pub fn new() -> Self {
        Self {
            code: Status::Ok.code(),
            body: String::new(),
            headers: vec![("Content-Type".to_owned(), ContentType::Text.as_str().to_owned())],
        }
    }

    pub fn set_status(&mut self, status: Status) {
        self.code = status.code();
    }

    /// Appends to the body.
    pub fn write(&mut self, text: impl AsRef<str>) {
        self.body.push_str(text.as_ref());
    }

    /// Appends `value` serialised as JSON and switches the content type to
    /// `application/json`.
    pub fn write_json<T: Serialize + ?Sized>(&mut self, value: &T) -> serde_json::Result<()> {
        let encoded = serde_json::to_string(value)?;
        self.set_content_type(ContentType::Json);
        self.body.push_str(&encoded);
        Ok(())
    }

    pub fn headers(&self) -> &[(String, String)] { &self.headers }

    /// Case-insensitive header lookup. Returns the first value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replaces every header named `name` with a single value.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_owned(), value.into()));
    }

    /// Adds a header without touching existing ones (e.g. `Set-Cookie`).
    pub fn append_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.push((name.to_owned(), value.into()));
    }

    pub fn remove_header(&mut self, name: &str) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }

    pub fn set_content_type(&mut self, content_type: ContentType) {
        self.set_header("Content-Type", content_type.as_str());
    }

    /// `true` while nothing has been written and the status is still `200`.
    pub fn is_untouched(&self) -> bool {
        self.body.is_empty() && self.code == Status::Ok.code()
    }

    /// Status line text from the fixed table. Codes missing from the table are
    /// an error, never a silent default.
    pub fn status_line(&self) -> Result<String, Error> {
        Status::from_code(self.code)
            .map(Status::line)
            .ok_or(Error::UnknownStatus(self.code))
    }

    /// Converts into the `http` crate's response type for hyper. Header values
    /// are passed through as raw bytes; invalid ones are dropped with a warning.
    pub(crate) fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(Bytes::from(self.body)));
        *res.status_mut() = StatusCode::from_u16(self.code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        for (name, value) in self.headers {
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_bytes(value.as_bytes())) {
                (Ok(name), Ok(value)) => {
                    res.headers_mut().append(name, value);
                }
                _ => warn!(%name, "dropping invalid response header"),
            }
        }
        res
    }
}

impl Default for Response {
    fn default() -> Self { Self::new() }
}
