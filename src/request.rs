//! Incoming HTTP request view.
//!
//! A [`Request`] is built once per inbound call by the transport (see
//! [`Server`](crate::Server)) or by a test, then handed read-only to the
//! engine. Query-string and urlencoded-form decoding happen here, at build
//! time, so handlers only ever see decoded values.

use percent_encoding::percent_decode_str;
use url::form_urlencoded;

use crate::method::Method;

/// Request parameter that overrides the request method (`:method=PUT`).
pub const METHOD_OVERRIDE: &str = ":method";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// An incoming HTTP request.
#[derive(Clone, Debug)]
pub struct Request {
    method: Method,
    path: String,
    query_string: String,
    headers: Vec<(String, String)>,
    params: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Request {
    /// Starts building a request for `method` and a raw request target
    /// (`/path?query`). The path is percent-decoded; the query string is kept
    /// verbatim and also decoded into parameters.
    pub fn builder(method: impl Into<Method>, target: &str) -> RequestBuilder {
        RequestBuilder {
            method: method.into(),
            target: target.to_owned(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// The effective method, after any `:method` override.
    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    /// Raw query string without the leading `?`. Empty when absent.
    pub fn query_string(&self) -> &str { &self.query_string }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// First value of a query or form parameter. Query parameters come first.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every decoded query and form parameter, in arrival order.
    pub fn params(&self) -> &[(String, String)] { &self.params }

    /// Value of the cookie `name` from the `Cookie` header(s).
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("cookie"))
            .flat_map(|(_, v)| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.trim_matches('"'))
    }

    /// `true` for requests sent with `X-Requested-With: XMLHttpRequest`.
    pub fn is_xhr(&self) -> bool {
        self.header("x-requested-with")
            .is_some_and(|v| v.eq_ignore_ascii_case("xmlhttprequest"))
    }
}

/// Builder returned by [`Request::builder`].
pub struct RequestBuilder {
    method: Method,
    target: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl RequestBuilder {
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Urlencoded form body; also sets the matching `Content-Type`.
    pub fn form(mut self, pairs: &[(&str, &str)]) -> Self {
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        self.headers.push(("Content-Type".to_owned(), FORM_CONTENT_TYPE.to_owned()));
        self.body = encoded.into_bytes();
        self
    }

    pub fn build(self) -> Request {
        let (raw_path, query_string) = match self.target.split_once('?') {
            Some((p, q)) => (p, q.to_owned()),
            None => (self.target.as_str(), String::new()),
        };
        let path = percent_decode_str(raw_path).decode_utf8_lossy().into_owned();

        let mut params: Vec<(String, String)> = form_urlencoded::parse(query_string.as_bytes())
            .into_owned()
            .collect();

        let is_form = self.headers.iter().any(|(k, v)| {
            k.eq_ignore_ascii_case("content-type") && v.starts_with(FORM_CONTENT_TYPE)
        });
        if is_form {
            params.extend(form_urlencoded::parse(&self.body).into_owned());
        }

        let method = params.iter()
            .find(|(k, _)| k == METHOD_OVERRIDE)
            .map(|(_, v)| Method::from(v.as_str()))
            .unwrap_or(self.method);

        Request {
            method,
            path,
            query_string,
            headers: self.headers,
            params,
            body: self.body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_and_decodes_the_target() {
        let req = Request::builder("GET", "/6-%D1%8E%D0%BD?hello=%D1%8E&a=b+c").build();
        assert_eq!(req.path(), "/6-юн");
        assert_eq!(req.query_string(), "hello=%D1%8E&a=b+c");
        assert_eq!(req.param("hello"), Some("ю"));
        assert_eq!(req.param("a"), Some("b c"));
        assert_eq!(req.param("missing"), None);
    }

    #[test]
    fn form_fields_and_method_override() {
        let req = Request::builder("POST", "/method")
            .form(&[(":method", "Publish"), ("hello", "earth")])
            .build();
        assert_eq!(req.method().as_str(), "PUBLISH");
        assert_eq!(req.param("hello"), Some("earth"));
    }

    #[test]
    fn form_body_is_ignored_without_form_content_type() {
        let req = Request::builder("POST", "/").body("hello=earth").build();
        assert_eq!(req.param("hello"), None);
        assert_eq!(req.body(), b"hello=earth");
    }

    #[test]
    fn cookies_headers_and_xhr() {
        let req = Request::builder("GET", "/")
            .header("Cookie", "foo=bar; session=\"a|1|b\"")
            .header("X-Requested-With", "XMLHttpRequest")
            .build();
        assert_eq!(req.cookie("foo"), Some("bar"));
        assert_eq!(req.cookie("session"), Some("a|1|b"));
        assert_eq!(req.cookie("nope"), None);
        assert_eq!(req.header("x-requested-with"), Some("XMLHttpRequest"));
        assert!(req.is_xhr());
        assert!(!Request::builder("GET", "/").build().is_xhr());
    }
}
