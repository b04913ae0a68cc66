use bytes::{Buf, Bytes};
use http::{Method, StatusCode};

/// Represents a HTTP message that can either be a header or payload.
///
/// The generic parameter `T` is the head handed to the header encoder, while `Data`
/// represents the type of the payload data (defaults to `Bytes`).
pub enum Message<T, Data: Buf = Bytes> {
    /// Contains the header information of type `T`
    Header(T),
    /// Contains a chunk of payload data or EOF marker
    Payload(PayloadItem<Data>),
}

/// Represents an item in the HTTP message payload stream.
///
/// A body is fed to the encoder as a run of `Chunk`s followed by exactly one `Eof`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem<Data: Buf = Bytes> {
    /// A chunk of payload data
    Chunk(Data),
    /// Marks the end of the payload stream
    Eof,
}

/// How the body of a response is framed on the wire.
///
/// The variant is decided once per message by [`BodyFraming::resolve`] and then drives both
/// the header block (which length header, if any, is emitted) and whether body bytes follow.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BodyFraming {
    /// Header block ends at the blank line, no length header and never any body bytes.
    ///
    /// Used for 1xx, 204 and responses to `HEAD`.
    Suppressed,
    /// `Content-Length: 0`, no body bytes.
    Empty,
    /// `Transfer-Encoding: chunked`, the body follows as chunks and a terminator.
    Chunked,
}

impl BodyFraming {
    /// Picks the framing for a response, first matching rule wins:
    ///
    /// 1. `205` and `304` always get `Content-Length: 0`
    /// 2. `204` and every `1xx` get no length header at all
    /// 3. a `HEAD` request (method compared case-insensitively) gets no length header
    /// 4. an absent body gets `Content-Length: 0`
    /// 5. anything else is streamed chunked, the length is never computed up front
    pub fn resolve(method: &Method, status: StatusCode, has_body: bool) -> Self {
        match status.as_u16() {
            205 | 304 => BodyFraming::Empty,
            204 => BodyFraming::Suppressed,
            s if s < 200 => BodyFraming::Suppressed,
            _ if is_head(method) => BodyFraming::Suppressed,
            _ if !has_body => BodyFraming::Empty,
            _ => BodyFraming::Chunked,
        }
    }

    /// Returns true if body bytes follow the header block
    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, BodyFraming::Chunked)
    }
}

#[inline]
fn is_head(method: &Method) -> bool {
    method.as_str().eq_ignore_ascii_case("HEAD")
}
