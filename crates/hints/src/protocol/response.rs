//! Response descriptors produced by handlers.
//!
//! A handler hands the connection a sequence of responses: zero or more interim heads
//! (status 1xx, never with a body) followed by exactly one final [`Response`]. Header
//! fields are kept as written by the caller: names are not case folded, repeated names are
//! allowed and the insertion order is the order on the wire.
//!
//! Header values are not validated. A `\r` or `\n` in a name or value ends up verbatim in
//! the header block, callers must sanitize untrusted input.

use http::StatusCode;
use http_body::Body;

/// Status code plus the ordered header list of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    status: StatusCode,
    headers: Vec<(String, String)>,
}

impl ResponseHead {
    pub fn new(status: StatusCode) -> Self {
        Self { status, headers: Vec::new() }
    }

    /// Appends a header field and returns the head, for building in one expression.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.append_header(name, value);
        self
    }

    /// Appends a header field, an existing field with the same name is kept.
    pub fn append_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[inline]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Returns true for 1xx heads, the only ones allowed before the final response
    #[inline]
    pub fn is_interim(&self) -> bool {
        self.status.is_informational()
    }
}

/// A complete response: head plus an optional body.
///
/// `None` means the response has no body at all, which frames as `Content-Length: 0`
/// where a length is allowed. `Some` bodies are always streamed chunked.
#[derive(Debug)]
pub struct Response<B> {
    head: ResponseHead,
    body: Option<B>,
}

impl<B> Response<B> {
    pub fn new(head: ResponseHead, body: Option<B>) -> Self {
        Self { head, body }
    }

    pub fn with_body(head: ResponseHead, body: B) -> Self {
        Self::new(head, Some(body))
    }

    pub fn empty(head: ResponseHead) -> Self {
        Self::new(head, None)
    }

    #[inline]
    pub fn head(&self) -> &ResponseHead {
        &self.head
    }

    #[inline]
    pub fn body(&self) -> Option<&B> {
        self.body.as_ref()
    }

    pub fn into_parts(self) -> (ResponseHead, Option<B>) {
        (self.head, self.body)
    }
}

/// Converts an `http::Response`, a body whose size hint is exactly zero becomes an absent body.
///
/// `http::HeaderMap` stores lowercase names and groups repeated names, so the head keeps
/// that order rather than the order the builder was called in.
impl<B: Body> From<http::Response<B>> for Response<B> {
    fn from(response: http::Response<B>) -> Self {
        let (parts, body) = response.into_parts();

        let mut head = ResponseHead::new(parts.status);
        for (name, value) in parts.headers.iter() {
            head.append_header(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
        }

        let body = match body.size_hint().exact() {
            Some(0) => None,
            _ => Some(body),
        };

        Self { head, body }
    }
}

/// One step of a handler's response production.
#[derive(Debug)]
pub enum Step<B> {
    /// An interim head, more responses follow
    Interim(ResponseHead),
    /// The final response, nothing follows
    Final(Response<B>),
}

impl<B> Step<B> {
    #[inline]
    pub fn is_final(&self) -> bool {
        matches!(self, Step::Final(_))
    }

    #[inline]
    pub fn head(&self) -> &ResponseHead {
        match self {
            Step::Interim(head) => head,
            Step::Final(response) => response.head(),
        }
    }
}

impl<B> From<ResponseHead> for Step<B> {
    fn from(head: ResponseHead) -> Self {
        Step::Interim(head)
    }
}

impl<B> From<Response<B>> for Step<B> {
    fn from(response: Response<B>) -> Self {
        Step::Final(response)
    }
}
